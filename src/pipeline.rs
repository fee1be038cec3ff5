//! The end-to-end computation: fetch, reduce, compare, mask, aggregate.
//!
//! Both the regional maps and the county series go through
//! [`yearly_means`]; only the bounding box and the years differ.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;

use crate::{
    aggregate::{county_means, with_climatology, CountyAnomaly},
    cli::create_progress_bar,
    config::{Config, DayWindow, Metric, PeriodConfig, YearRange},
    counties::{Boundaries, CountySet},
    grid::{self, anomaly, clip, ratio, window_mean, BoundingBox, Crs, DailyStack, GridField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    MaxTemperature,
    Precipitation,
}

/// Anything able to serve daily grids for a box and a date range.
pub trait GridSource {
    fn load_window(&self, variable: Variable, bbox: &BoundingBox, start: NaiveDate, end: NaiveDate) -> Result<DailyStack>;
}

/// Window means of both variables for one year.
#[derive(Debug, Clone)]
pub struct YearMeans {
    pub year: i32,
    pub tmax: GridField,
    pub pr: GridField,
}

/// The fields shown on the maps.
#[derive(Debug, Clone)]
pub struct DerivedFields {
    pub target_tmax: GridField,
    pub target_pr: GridField,
    pub tmax_anomaly: GridField,
    pub pr_anomaly: GridField,
    pub ratio: GridField,
}

impl DerivedFields {
    pub fn get(&self, metric: Metric) -> &GridField {
        match metric {
            Metric::TargetTemperature => &self.target_tmax,
            Metric::TargetPrecipitation => &self.target_pr,
            Metric::TemperatureAnomaly => &self.tmax_anomaly,
            Metric::PrecipitationAnomaly => &self.pr_anomaly,
            Metric::Ratio => &self.ratio,
        }
    }

    /// Tags every field as WGS84 and clips it to `counties`.
    pub fn clip_to(&self, counties: &CountySet) -> Result<DerivedFields> {
        let polygons = counties.geometry();
        let mask = |field: &GridField| clip(&field.clone().with_crs(Crs::WGS84), &polygons, counties.crs);

        Ok(DerivedFields {
            target_tmax: mask(&self.target_tmax)?,
            target_pr: mask(&self.target_pr)?,
            tmax_anomaly: mask(&self.tmax_anomaly)?,
            pr_anomaly: mask(&self.pr_anomaly)?,
            ratio: mask(&self.ratio)?,
        })
    }
}

/// Everything the renderer needs.
#[derive(Debug, Clone)]
pub struct Infographic {
    pub maps: DerivedFields,
    pub series: Vec<CountyAnomaly>,
    pub boundaries: Boundaries,
}

/// Fetches and averages the day window of each year inside `bbox`.
pub fn yearly_means<S: GridSource>(
    source: &S,
    bbox: &BoundingBox,
    window: &DayWindow,
    years: &[i32],
) -> Result<Vec<YearMeans>> {
    let pb = create_progress_bar(years.len() as u64, format!("Fetching {} years", years.len()));
    let mut means = Vec::with_capacity(years.len());

    for &year in years {
        let (start, end) = window.dates_in(year)?;
        pb.set_message(format!("Fetching {} to {}", start, end));

        let tmax = source.load_window(Variable::MaxTemperature, bbox, start, end)?;
        let pr = source.load_window(Variable::Precipitation, bbox, start, end)?;
        if tmax.days != pr.days {
            log::warn!(
                "{}: {} temperature days but {} precipitation days",
                year,
                tmax.days.len(),
                pr.days.len()
            );
        }

        means.push(YearMeans {
            year,
            tmax: window_mean(&tmax)?,
            pr: window_mean(&pr)?,
        });
        pb.inc(1);
    }

    pb.finish_with_message(format!("Fetched {} years", years.len()));

    Ok(means)
}

/// Climatology, target-year anomalies and the ratio from per-year means.
pub fn derive_fields(yearly: &[YearMeans], climatology: &YearRange, target_year: i32) -> Result<DerivedFields> {
    let baseline_years: Vec<&YearMeans> = yearly
        .iter()
        .filter(|y| climatology.contains(y.year))
        .collect();
    if baseline_years.is_empty() {
        bail!("no years inside the climatology {}-{}", climatology.start, climatology.end);
    }

    let tmax_clim = grid::climatology(&baseline_years.iter().map(|y| y.tmax.clone()).collect::<Vec<_>>())?;
    let pr_clim = grid::climatology(&baseline_years.iter().map(|y| y.pr.clone()).collect::<Vec<_>>())?;

    let target = yearly
        .iter()
        .find(|y| y.year == target_year)
        .ok_or_else(|| anyhow!("target year {} was not fetched", target_year))?;

    let tmax_anomaly = anomaly(&target.tmax, &tmax_clim)?;
    let pr_anomaly = anomaly(&target.pr, &pr_clim)?;
    let ratio = ratio(&pr_anomaly, &tmax_anomaly)?;

    Ok(DerivedFields {
        target_tmax: target.tmax.clone(),
        target_pr: target.pr.clone(),
        tmax_anomaly,
        pr_anomaly,
        ratio,
    })
}

/// Fields for the maps over `bbox`: climatology years plus the target year.
pub fn map_fields<S: GridSource>(source: &S, bbox: &BoundingBox, period: &PeriodConfig) -> Result<DerivedFields> {
    let mut years: Vec<i32> = period.climatology.years().collect();
    if !period.climatology.contains(period.target_year) {
        years.push(period.target_year);
    }

    let yearly = yearly_means(source, bbox, &period.window, &years)?;

    derive_fields(&yearly, &period.climatology, period.target_year)
}

/// Per-county, per-year means over `bbox` joined with the county climatology.
pub fn county_anomalies<S: GridSource>(
    source: &S,
    bbox: &BoundingBox,
    period: &PeriodConfig,
    targets: &CountySet,
) -> Result<Vec<CountyAnomaly>> {
    let yearly = yearly_means(source, bbox, &period.window, &period.series_years())?;

    let mut rows = Vec::new();
    for year in &yearly {
        rows.extend(county_means(&year.tmax, &year.pr, targets, year.year)?);
    }

    Ok(with_climatology(&rows, &period.climatology))
}

/// Runs the whole computation for `config`.
pub fn run<S: GridSource>(source: &S, boundaries: Boundaries, config: &Config) -> Result<Infographic> {
    let maps = map_fields(source, &config.region.map_bbox, &config.period)?.clip_to(&boundaries.region)?;

    for panel in &config.figure.panels {
        let field = maps.get(panel.metric);
        if field.is_empty() {
            log::warn!("{}: the region covers no grid cells", panel.title);
            continue;
        }
        match field.summary() {
            Some((min, mean, max)) => log::info!(
                "{}: min {:.2}, mean {:.2}, max {:.2} {}",
                panel.title,
                min,
                mean,
                max,
                panel.unit
            ),
            None => log::warn!("{}: no valid cells inside the region", panel.title),
        }
    }

    let series = county_anomalies(source, &config.region.county_bbox, &config.period, &boundaries.targets)?;

    Ok(Infographic {
        maps,
        series,
        boundaries,
    })
}

// -- Tests -------------------------------------------------------------------
