use clap::Parser;

/// Chat with large language models from your terminal.
#[derive(Parser, Debug)]
#[command(
    name = "ask",
    about = "Chat with large language models from your terminal",
    disable_version_flag = true
)]
pub struct Cli {
    /// Query text to send; piped stdin is read as additional input
    #[arg(value_name = "QUERY")]
    pub query: Vec<String>,

    /// Model profile to use (defaults to the config file's default_model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Disable streaming output for this invocation
    #[arg(long)]
    pub no_stream: bool,

    /// Answer a single exchange, then exit
    #[arg(long)]
    pub once: bool,

    /// Print version information
    #[arg(short = 'v', long = "version")]
    pub version: bool,
}

/// Combines piped stdin with positional query words into the initial query.
/// Piped content comes first, fenced so the model sees it as quoted material.
pub fn merge_query(piped: Option<&str>, positional: &[String]) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(piped) = piped
        && !piped.is_empty()
    {
        parts.push(format!("```\n{}\n```\n\n", piped));
    }
    parts.extend(positional.iter().cloned());
    parts.join(" ")
}
