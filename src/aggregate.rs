//! County-level aggregation: grid points joined to county polygons.

use std::collections::HashMap;

use anyhow::Result;

use crate::{
    config::{Metric, YearRange},
    counties::CountySet,
    grid::{mask::PolygonIndex, nan_mean, ratio_value, GridField},
};

/// A grid cell centre carrying both variables.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub lon: f64,
    pub lat: f64,
    pub tmax: f64,
    pub pr: f64,
    pub year: i32,
}

/// Spatial means of one county in one year.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyYear {
    pub county: String,
    pub year: i32,
    pub tmax: f64,
    pub pr: f64,
}

/// A [`CountyYear`] joined with its county climatology.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyAnomaly {
    pub county: String,
    pub year: i32,
    pub tmax: f64,
    pub pr: f64,
    pub tmax_clim: f64,
    pub pr_clim: f64,
    pub tmax_anomaly: f64,
    pub pr_anomaly: f64,
    pub ratio: f64,
}

impl CountyAnomaly {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::TargetTemperature => self.tmax,
            Metric::TargetPrecipitation => self.pr,
            Metric::TemperatureAnomaly => self.tmax_anomaly,
            Metric::PrecipitationAnomaly => self.pr_anomaly,
            Metric::Ratio => self.ratio,
        }
    }
}

/// Converts every cell of two aligned fields into a point.
pub fn grid_points(tmax: &GridField, pr: &GridField, year: i32) -> Result<Vec<GridPoint>> {
    tmax.ensure_aligned(pr)?;

    Ok(tmax
        .cells()
        .zip(pr.values.iter())
        .map(|((lon, lat, t), p)| GridPoint {
            lon,
            lat,
            tmax: t,
            pr: *p,
            year,
        })
        .collect())
}

/// Pairs each point with every county it intersects, as `(county index, point)`.
pub fn spatial_join<'a>(points: &'a [GridPoint], counties: &CountySet) -> Vec<(usize, &'a GridPoint)> {
    let indexes: Vec<PolygonIndex> = counties
        .counties
        .iter()
        .map(|c| PolygonIndex::new(c.geometry.iter()))
        .collect();

    points
        .iter()
        .flat_map(|point| {
            indexes
                .iter()
                .enumerate()
                .filter(|(_, index)| index.intersects(point.lon, point.lat))
                .map(move |(county, _)| (county, point))
        })
        .collect()
}

/// One row per county with at least one point inside it, in county order.
pub fn county_means(tmax: &GridField, pr: &GridField, counties: &CountySet, year: i32) -> Result<Vec<CountyYear>> {
    let points = grid_points(tmax, pr, year)?;
    let joined = spatial_join(&points, counties);

    let rows = counties
        .counties
        .iter()
        .enumerate()
        .filter_map(|(i, county)| {
            let matched: Vec<&GridPoint> = joined
                .iter()
                .filter(|(c, _)| *c == i)
                .map(|(_, p)| *p)
                .collect();
            if matched.is_empty() {
                log::warn!("no grid points fall inside {} in {}", county.name, year);
                return None;
            }

            Some(CountyYear {
                county: county.name.clone(),
                year,
                tmax: nan_mean(matched.iter().map(|p| p.tmax)),
                pr: nan_mean(matched.iter().map(|p| p.pr)),
            })
        })
        .collect();

    Ok(rows)
}

/// Joins every row with the mean of its county over the climatology years.
/// Counties with no climatology rows are dropped.
pub fn with_climatology(rows: &[CountyYear], climatology: &YearRange) -> Vec<CountyAnomaly> {
    let mut baseline_rows: HashMap<&str, Vec<&CountyYear>> = HashMap::new();
    for row in rows.iter().filter(|r| climatology.contains(r.year)) {
        baseline_rows.entry(row.county.as_str()).or_default().push(row);
    }

    let baselines: HashMap<&str, (f64, f64)> = baseline_rows
        .into_iter()
        .map(|(county, rows)| {
            let tmax = nan_mean(rows.iter().map(|r| r.tmax));
            let pr = nan_mean(rows.iter().map(|r| r.pr));
            (county, (tmax, pr))
        })
        .collect();

    rows.iter()
        .filter_map(|row| {
            let &(tmax_clim, pr_clim) = baselines.get(row.county.as_str())?;
            let tmax_anomaly = row.tmax - tmax_clim;
            let pr_anomaly = row.pr - pr_clim;

            Some(CountyAnomaly {
                county: row.county.clone(),
                year: row.year,
                tmax: row.tmax,
                pr: row.pr,
                tmax_clim,
                pr_clim,
                tmax_anomaly,
                pr_anomaly,
                ratio: ratio_value(pr_anomaly, tmax_anomaly),
            })
        })
        .collect()
}

/// `(year, value)` pairs of one county in year order. Undefined values stay
/// `NaN` so gaps remain visible.
pub fn county_series(rows: &[CountyAnomaly], county: &str, metric: Metric) -> Vec<(i32, f64)> {
    let mut series: Vec<(i32, f64)> = rows
        .iter()
        .filter(|r| r.county == county)
        .map(|r| (r.year, r.value(metric)))
        .collect();
    series.sort_by_key(|(year, _)| *year);
    series
}

// -- Tests -------------------------------------------------------------------
