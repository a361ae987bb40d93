use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = purgecast::cli::Cli::parse();
    if let Err(e) = purgecast::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
