mod aggregate;
mod cli;
mod config;
mod counties;
mod download;
mod grid;
mod opendap;
mod parquet;
mod pipeline;
mod render;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config, output, show } => {
            match command::render(config.as_deref(), output.clone(), *show).await {
                Ok(filename) => println!("File saved to `{}`", filename),
                Err(e) => eprintln!("Error: {:#}", e),
            }
        }
        Commands::Series { config } => match command::series(config.as_deref()).await {
            Ok(filename) => println!("File saved to `{}`", filename),
            Err(e) => eprintln!("Error: {:#}", e),
        },
        Commands::Config {} => match command::config() {
            Ok(text) => print!("{}", text),
            Err(e) => eprintln!("Error: {:#}", e),
        },
    }

    Ok(())
}
