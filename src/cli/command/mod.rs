pub mod config;
pub mod render;
pub mod series;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{Datelike, Local};

pub use config::config;
pub use render::render;
pub use series::series;

use crate::{
    cli::create_spinner,
    config::{RegionConfig, SourceConfig},
    counties::{Boundaries, CountySet},
    download::{download_with_progress, extract_zip, find_file_with_extension},
    opendap::RemoteGrids,
};

pub fn make_parquet_file_name(name: &str) -> Result<PathBuf> {
    let today = Local::now();
    let file_name = format!(
        "anomap-{}-{}-{:02}-{:02}.parquet",
        name,
        today.year(),
        today.month(),
        today.day()
    );

    let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot locate the home directory"))?;

    Ok(home.join(file_name))
}

/// Downloads the county archive into `temp_dir` and selects the region and
/// target counties.
pub async fn fetch_boundaries(region: &RegionConfig, temp_dir: &Path) -> Result<Boundaries> {
    let url = region.boundaries_url.as_str();
    let file_name = url.rsplit('/').next().filter(|n| !n.is_empty()).unwrap_or("counties.zip");
    let archive_path = temp_dir.join(file_name);

    let bar = create_spinner("Downloading county boundaries...".to_string());
    download_with_progress(url, &archive_path, &bar).await?;
    bar.finish_with_message("County boundaries downloaded");

    let files = extract_zip(&archive_path, &temp_dir.join("counties"))?;
    let shapefile = find_file_with_extension(&files, "shp")?;
    let all = CountySet::read_shapefile(&shapefile)?;

    let boundaries = Boundaries::select(&all, region)?;
    log::info!(
        "{} counties in the region, targets {}",
        boundaries.region.len(),
        boundaries.targets.names().join(" and ")
    );

    Ok(boundaries)
}

/// Opens both remote grids and reads their coordinates.
pub fn connect_source(source: &SourceConfig) -> Result<RemoteGrids> {
    let bar = create_spinner("Connecting to the OPeNDAP servers...".to_string());
    let grids = RemoteGrids::open(source)?;
    bar.finish_with_message("Connected to the OPeNDAP servers");

    Ok(grids)
}

// -- Tests -------------------------------------------------------------------
