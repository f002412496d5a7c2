pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod history;
pub mod logging;
pub mod model;
pub mod providers;
pub mod repl;
pub mod session;

use std::fs::File;
use std::io::{self, BufReader, IsTerminal, Read};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, FromArgMatches};
use reqwest::Client;
use tracing::info;

use cli::Cli;
use config::Config;
use gateway::HttpModelGateway;
use history::HistoryBuffer;
use session::ConversationSession;

#[cfg(windows)]
const TTY_DEVICE: &str = "CON";
#[cfg(not(windows))]
const TTY_DEVICE: &str = "/dev/tty";

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let config_path = Config::locate();
    let matches = Cli::command()
        .after_help(format!("Config file location: {}", config_path.display()))
        .get_matches();
    let args = match Cli::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(err) => err.exit(),
    };

    if args.version {
        println!("ask {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::load(&config_path)?;
    info!(
        path = %config_path.display(),
        default_model = %cfg.default_model,
        max_history = cfg.max_history,
        "loaded configuration"
    );

    let model_name = args.model.as_deref().unwrap_or(&cfg.default_model);
    let profile = cfg.resolve_profile(model_name)?;

    let client = cfg
        .proxy
        .apply(Client::builder())?
        .build()
        .context("Failed to initialize HTTP client")?;

    ctrlc::set_handler(|| {
        println!("\nGoodbye!");
        std::process::exit(0);
    })
    .context("Failed to install interrupt handler")?;

    let stream_output = cfg.stream_output && !args.no_stream;
    let mut history = HistoryBuffer::new(cfg.max_history);
    if let Some(prompt) = cfg.language.system_prompt() {
        history.set_system(prompt);
    }

    let gateway = HttpModelGateway::new(&client, &profile);
    let mut session = ConversationSession::new(gateway, history, stream_output, io::stdout());

    let stdin_piped = !io::stdin().is_terminal();
    let mut piped = String::new();
    if stdin_piped {
        io::stdin()
            .read_to_string(&mut piped)
            .context("Failed to read piped stdin")?;
    }
    let piped = piped.trim();

    let initial_query = cli::merge_query((!piped.is_empty()).then_some(piped), &args.query);

    if args.once && initial_query.is_empty() {
        bail!("--once requires query text (positional arguments or piped stdin)");
    }

    if !initial_query.is_empty() {
        match session.ask(&initial_query).await {
            Ok(reply) => {
                if stream_output {
                    println!("\n");
                } else {
                    println!("\n{}\n", reply.trim());
                }
            }
            Err(err) => {
                if args.once {
                    return Err(err.into());
                }
                eprintln!("error: {err}");
            }
        }
        if args.once {
            return Ok(());
        }
    }

    if stdin_piped {
        // Piped stdin was consumed by the initial query; interactive input
        // needs the terminal device reopened.
        match File::open(TTY_DEVICE) {
            Ok(tty) => repl::run_repl(&mut session, BufReader::new(tty)).await,
            Err(err) => {
                eprintln!("note: cannot reopen the terminal for interactive input: {err}");
                Ok(())
            }
        }
    } else {
        let stdin = io::stdin();
        repl::run_repl(&mut session, stdin.lock()).await
    }
}
