//! Remote gridded datasets over OPeNDAP, read through libnetcdf's DAP client.
//!
//! Each dataset is opened once: its coordinate vectors and packing
//! attributes are read up front, after which window requests translate a
//! bounding box and a date range into a single hyperslab read.

pub mod error;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use ndarray::Array3;
use netcdf::AttributeValue;

pub use error::{DapError, DapResult};

use crate::{
    config::{SourceConfig, VariableSource},
    grid::{BoundingBox, DailyStack},
    pipeline::{GridSource, Variable},
};

/// Decoding of packed integer storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
    pub fill_values: Vec<f64>,
}

impl Packing {
    pub fn from_variable(variable: &netcdf::Variable) -> Self {
        let fill_values = ["_FillValue", "missing_value"]
            .iter()
            .filter_map(|attr| get_f64_attr(variable, attr))
            .collect();

        Packing {
            scale_factor: get_f64_attr(variable, "scale_factor").unwrap_or(1.0),
            add_offset: get_f64_attr(variable, "add_offset").unwrap_or(0.0),
            fill_values,
        }
    }

    pub fn decode(&self, raw: f64) -> f64 {
        if self.fill_values.contains(&raw) {
            f64::NAN
        } else {
            raw * self.scale_factor + self.add_offset
        }
    }
}

/// One variable of a remote dataset, ready for window requests.
pub struct RemoteGrid {
    file: netcdf::File,
    url: String,
    variable: String,
    lat: Vec<f64>,
    lon: Vec<f64>,
    days: Vec<NaiveDate>,
    packing: Packing,
    offset: f64,
    unit: String,
}

impl RemoteGrid {
    /// Opens `source.url`, which may be an OPeNDAP URL or a local file.
    pub fn open(source: &VariableSource, coords: &SourceConfig) -> Result<Self> {
        let file = netcdf::open(&source.url)
            .map_err(DapError::from)
            .with_context(|| format!("Failed to open {}", source.url))?;

        let (packing, lat, lon, days) = {
            let variable = file
                .variable(&source.variable)
                .ok_or_else(|| DapError::MissingVariable(source.variable.clone()))?;
            if variable.dimensions().len() != 3 {
                return Err(DapError::Malformed(format!(
                    "{} has {} dimensions, expected time, latitude and longitude",
                    source.variable,
                    variable.dimensions().len()
                ))
                .into());
            }

            let time = file
                .variable(&coords.time)
                .ok_or_else(|| DapError::MissingVariable(coords.time.clone()))?;
            let units = get_text_attr(&time, "units").ok_or_else(|| DapError::MissingAttribute {
                variable: coords.time.clone(),
                attribute: "units".to_string(),
            })?;
            let epoch = parse_time_units(&units)?;

            let days = read_coordinate(&file, &coords.time)?
                .into_iter()
                .map(|offset| epoch + Duration::days(offset.floor() as i64))
                .collect::<Vec<_>>();

            (
                Packing::from_variable(&variable),
                read_coordinate(&file, &coords.lat)?,
                read_coordinate(&file, &coords.lon)?,
                days,
            )
        };

        log::info!(
            "Opened {} ({} days, {} x {} cells)",
            source.url,
            days.len(),
            lat.len(),
            lon.len()
        );

        Ok(RemoteGrid {
            file,
            url: source.url.clone(),
            variable: source.variable.clone(),
            lat,
            lon,
            days,
            packing,
            offset: source.offset,
            unit: source.unit.clone(),
        })
    }

    /// Daily values inside `bbox` between `start` and `end`, inclusive.
    pub fn load(&self, bbox: &BoundingBox, start: NaiveDate, end: NaiveDate) -> Result<DailyStack> {
        let (y0, y1) = index_span(&self.lat, bbox.min_lat, bbox.max_lat).ok_or_else(|| {
            DapError::EmptySelection {
                coordinate: "latitude".to_string(),
                min: bbox.min_lat.to_string(),
                max: bbox.max_lat.to_string(),
            }
        })?;
        let (x0, x1) = index_span(&self.lon, bbox.min_lon, bbox.max_lon).ok_or_else(|| {
            DapError::EmptySelection {
                coordinate: "longitude".to_string(),
                min: bbox.min_lon.to_string(),
                max: bbox.max_lon.to_string(),
            }
        })?;

        let lat = self.lat[y0..=y1].to_vec();
        let lon = self.lon[x0..=x1].to_vec();

        let Some((t0, t1)) = index_span(&self.days, start, end) else {
            log::warn!("{} has no days between {} and {}", self.variable, start, end);
            return Ok(DailyStack {
                days: Vec::new(),
                values: Array3::zeros((0, lat.len(), lon.len())),
                lat,
                lon,
                unit: self.unit.clone(),
            });
        };

        let days = self.days[t0..=t1].to_vec();
        let expected = (end - start).num_days() + 1;
        if (days.len() as i64) < expected {
            log::warn!(
                "{} has {} of the {} days between {} and {}",
                self.variable,
                days.len(),
                expected,
                start,
                end
            );
        }

        let variable = self
            .file
            .variable(&self.variable)
            .ok_or_else(|| DapError::MissingVariable(self.variable.clone()))?;
        let raw: Vec<f64> = variable
            .get_values([t0..t1 + 1, y0..y1 + 1, x0..x1 + 1])
            .map_err(DapError::from)
            .with_context(|| format!("Failed to read {} from {} for {} to {}", self.variable, self.url, start, end))?;

        let shape = (t1 - t0 + 1, y1 - y0 + 1, x1 - x0 + 1);
        let values = Array3::from_shape_vec(shape, raw)
            .map_err(|e| DapError::Malformed(e.to_string()))?
            .mapv(|v| self.packing.decode(v) + self.offset);

        Ok(DailyStack {
            days,
            lat,
            lon,
            values,
            unit: self.unit.clone(),
        })
    }
}

/// The temperature and precipitation datasets of a run.
pub struct RemoteGrids {
    max_temperature: RemoteGrid,
    precipitation: RemoteGrid,
}

impl RemoteGrids {
    pub fn open(source: &SourceConfig) -> Result<Self> {
        Ok(RemoteGrids {
            max_temperature: RemoteGrid::open(&source.max_temperature, source)?,
            precipitation: RemoteGrid::open(&source.precipitation, source)?,
        })
    }
}

impl GridSource for RemoteGrids {
    fn load_window(&self, variable: Variable, bbox: &BoundingBox, start: NaiveDate, end: NaiveDate) -> Result<DailyStack> {
        match variable {
            Variable::MaxTemperature => self.max_temperature.load(bbox, start, end),
            Variable::Precipitation => self.precipitation.load(bbox, start, end),
        }
    }
}

fn read_coordinate(file: &netcdf::File, name: &str) -> DapResult<Vec<f64>> {
    let variable = file
        .variable(name)
        .ok_or_else(|| DapError::MissingVariable(name.to_string()))?;
    if variable.dimensions().len() != 1 {
        return Err(DapError::Malformed(format!(
            "coordinate {} has {} dimensions",
            name,
            variable.dimensions().len()
        )));
    }

    Ok(variable.get_values(..)?)
}

// Checking first keeps HDF5 from printing errors for absent attributes
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_text_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(text) => Some(text),
        _ => None,
    }
}

/// First and last index of the values inside `[min, max]`, for ascending or
/// descending coordinates.
pub fn index_span<T: PartialOrd>(coords: &[T], min: T, max: T) -> Option<(usize, usize)> {
    let inside = |c: &T| *c >= min && *c <= max;
    let first = coords.iter().position(inside)?;
    let last = coords.iter().rposition(inside)?;
    Some((first, last))
}

/// Epoch of a CF `days since YYYY-MM-DD[ hh:mm:ss]` unit string.
pub fn parse_time_units(units: &str) -> DapResult<NaiveDate> {
    let malformed = || DapError::Malformed(format!("unsupported time units `{}`", units));

    let rest = units.trim().strip_prefix("days since").ok_or_else(malformed)?;
    let date = rest
        .split_whitespace()
        .next()
        .and_then(|d| d.split('T').next())
        .ok_or_else(malformed)?;

    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| malformed())
}

// -- Tests -------------------------------------------------------------------
