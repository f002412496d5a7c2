use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use crate::gateway::ModelGateway;
use crate::model::Message;
use crate::session::ConversationSession;

/// Interactive loop: reads one line per turn from `input`, dispatches it
/// through the session, and keeps going until an exit keyword, EOF, or an
/// interrupt. A failed exchange is reported and the loop continues.
pub async fn run_repl<G, W, R>(session: &mut ConversationSession<G, W>, mut input: R) -> Result<()>
where
    G: ModelGateway,
    W: Write,
    R: BufRead,
{
    println!("Entering interactive mode. Type 'exit' or 'quit' or press Ctrl+C to leave.");

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("Failed to read input")?;
        if read == 0 {
            println!();
            break;
        }

        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") || prompt.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }
        if prompt.eq_ignore_ascii_case("/reset") {
            session.reset();
            println!("conversation reset\n");
            continue;
        }
        if prompt.eq_ignore_ascii_case("/history") {
            print_history(session.history().as_messages());
            continue;
        }

        match session.ask(prompt).await {
            Ok(reply) => {
                if session.streams() {
                    // Chunks already went to the sink; close the line.
                    println!("\n");
                } else {
                    println!("\n{}\n", reply.trim());
                }
            }
            Err(err) => eprintln!("error: {err}"),
        }
    }

    Ok(())
}

fn print_history(history: &[Message]) {
    if history.is_empty() {
        println!("(history is empty)\n");
        return;
    }

    for (idx, msg) in history.iter().enumerate() {
        println!("[{}] {}: {}", idx, msg.role.as_str(), msg.content);
    }
    println!();
}
