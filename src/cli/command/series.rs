//! Save the county series without rendering.

use std::path::Path;

use anyhow::Result;
use tempfile::TempDir;

use super::{connect_source, fetch_boundaries, make_parquet_file_name};
use crate::{config::Config, parquet, pipeline::county_anomalies};

pub async fn series(config_path: Option<&Path>) -> Result<String> {
    let config = Config::load(config_path)?;

    let tmp_dir = TempDir::new()?;
    let boundaries = fetch_boundaries(&config.region, tmp_dir.path()).await?;
    let source = connect_source(&config.source)?;

    let rows = county_anomalies(
        &source,
        &config.region.county_bbox,
        &config.period,
        &boundaries.targets,
    )?;

    let parquet_file_name = make_parquet_file_name("series")?;
    parquet::save_series(&rows, &parquet_file_name)?;

    Ok(parquet_file_name.to_string_lossy().to_string())
}
