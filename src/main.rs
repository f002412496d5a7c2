use std::process;

#[tokio::main]
async fn main() {
    if let Err(err) = ask::run().await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}
