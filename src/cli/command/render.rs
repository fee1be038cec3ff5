//! Fetch, compute and render the infographic.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use super::{connect_source, fetch_boundaries};
use crate::{config::Config, pipeline, render};

pub async fn render(config_path: Option<&Path>, output: Option<PathBuf>, show: bool) -> Result<String> {
    let config = Config::load(config_path)?;
    let output = output.unwrap_or_else(|| config.figure.output.clone());

    let tmp_dir = TempDir::new()?;
    let boundaries = fetch_boundaries(&config.region, tmp_dir.path()).await?;
    let source = connect_source(&config.source)?;

    let infographic = pipeline::run(&source, boundaries, &config)?;
    render::save(&infographic, &config, &output)?;

    if show {
        open::that(&output)?;
    }

    Ok(output.to_string_lossy().to_string())
}
