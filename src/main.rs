use anyhow::Result;
use bitsofpluto::cli::Cli;
use clap::Parser;

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run the main application logic from the library
    if let Err(e) = bitsofpluto::run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
