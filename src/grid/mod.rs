//! Gridded fields on a regular latitude/longitude grid.

pub mod anomaly;
pub mod mask;
pub mod reduce;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

pub use anomaly::{anomaly, ratio, ratio_value};
pub use mask::clip;
pub use reduce::{climatology, window_mean};

/// A rectangular longitude/latitude region in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.min_lon..=self.max_lon).contains(&lon) && (self.min_lat..=self.max_lat).contains(&lat)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_lon >= self.max_lon || self.min_lat >= self.max_lat {
            bail!("bounding box minimum must be below maximum: {:?}", self);
        }
        Ok(())
    }
}

/// Coordinate reference system tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crs {
    Epsg(u32),
    Unknown,
}

impl Crs {
    pub const WGS84: Crs = Crs::Epsg(4326);
    pub const NAD83: Crs = Crs::Epsg(4269);

    /// Longitude/latitude in degrees on WGS84 or NAD83.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Epsg(4326) | Crs::Epsg(4269))
    }
}

/// Daily values `[day, lat, lon]` as fetched from a source.
#[derive(Debug, Clone)]
pub struct DailyStack {
    pub days: Vec<NaiveDate>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub values: Array3<f64>,
    pub unit: String,
}

/// A 2-D field `[lat, lon]`; missing cells are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridField {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub values: Array2<f64>,
    pub unit: String,
    pub crs: Option<Crs>,
}

impl GridField {
    pub fn new(lat: Vec<f64>, lon: Vec<f64>, values: Array2<f64>, unit: &str) -> Result<Self> {
        if values.dim() != (lat.len(), lon.len()) {
            bail!(
                "values shape {:?} does not match {} lat x {} lon",
                values.dim(),
                lat.len(),
                lon.len()
            );
        }

        Ok(GridField {
            lat,
            lon,
            values,
            unit: unit.to_string(),
            crs: None,
        })
    }

    pub fn empty(unit: &str, crs: Option<Crs>) -> Self {
        GridField {
            lat: Vec::new(),
            lon: Vec::new(),
            values: Array2::zeros((0, 0)),
            unit: unit.to_string(),
            crs,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fails unless `other` sits on exactly the same grid.
    pub fn ensure_aligned(&self, other: &GridField) -> Result<()> {
        if self.values.dim() != other.values.dim() || self.lat != other.lat || self.lon != other.lon {
            bail!(
                "grids are not aligned: {:?} vs {:?}",
                self.values.dim(),
                other.values.dim()
            );
        }
        Ok(())
    }

    /// Iterates `(lon, lat, value)` over every cell.
    pub fn cells(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.values
            .indexed_iter()
            .map(move |((i, j), v)| (self.lon[j], self.lat[i], *v))
    }

    /// Minimum, mean and maximum over the valid cells.
    pub fn summary(&self) -> Option<(f64, f64, f64)> {
        let valid: Vec<f64> = self.values.iter().copied().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() {
            return None;
        }

        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = valid.iter().sum::<f64>() / valid.len() as f64;

        Some((min, mean, max))
    }

    /// Grid spacing `(dlon, dlat)`, used to draw cells.
    pub fn spacing(&self) -> (f64, f64) {
        (step(&self.lon), step(&self.lat))
    }
}

fn step(coords: &[f64]) -> f64 {
    match coords {
        [a, b, ..] => (b - a).abs(),
        _ => 0.0,
    }
}

/// Mean of the non-NaN values, `NaN` when there are none.
pub fn nan_mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

// -- Tests -------------------------------------------------------------------
