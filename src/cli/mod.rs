//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the anomaly infographic
    Render {
        /// Configuration file, instead of the per-user one
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output image, instead of the configured one
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Open the image once written
        #[arg(long)]
        show: bool,
    },
    /// Save the county series to parquet
    Series {
        /// Configuration file, instead of the per-user one
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration
    Config {},
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    )
}

/// Turns a spinner into a byte counter once the download size is known.
pub fn show_bytes(bar: &ProgressBar, total: u64) {
    bar.set_length(total);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn should_verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn should_parse_render_flags() {
        let cli = Cli::try_parse_from(["anomap", "render", "--output", "out.png", "--show"]).unwrap();

        match cli.command {
            Commands::Render { config, output, show } => {
                assert_eq!(config, None);
                assert_eq!(output, Some(PathBuf::from("out.png")));
                assert!(show);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn should_convert_spinner_to_byte_counter() {
        let bar = create_spinner("Downloading".to_string());
        show_bytes(&bar, 1000);
        bar.set_position(500);

        assert_eq!(bar.length(), Some(1000));
        assert_eq!(bar.position(), 500);
        bar.finish();
    }
}
