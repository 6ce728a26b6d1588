use clap::Parser;

use codelens::cli::{self, Cli};

#[tokio::main]
async fn main() {
    // Reads RUST_LOG for module-level overrides; user output goes through
    // the notifier, so logging stays quiet by default.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    if let Err(err) = cli::run(cli).await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
