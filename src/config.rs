//! Run configuration.
//!
//! Every parameter of a run (date window, climatology years, bounding boxes,
//! county names, colour scales) lives in [`Config`]. The built-in defaults
//! describe the 3-4 July 2025 Texas Hill Country event; a TOML file can
//! override any section.

use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::grid::BoundingBox;

const CONFIG_DIR: &str = "anomap";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub period: PeriodConfig,
    pub source: SourceConfig,
    pub region: RegionConfig,
    pub figure: FigureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            period: PeriodConfig::default(),
            source: SourceConfig::default(),
            region: RegionConfig::default(),
            figure: FigureConfig::default(),
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, or from the user config directory
    /// when no path is given, falling back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        let config = match path {
            Some(path) => {
                log::info!("Reading configuration from {}", path.display());
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Config::from_toml_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Config::default(),
        };

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.region.map_bbox.validate().context("region.map_bbox")?;
        self.region.county_bbox.validate().context("region.county_bbox")?;

        let window = &self.period.window;
        if window.start > window.end {
            bail!("period.window: start {} is after end {}", window.start, window.end);
        }

        let clim = &self.period.climatology;
        let series = &self.period.series;
        clim.validate().context("period.climatology")?;
        series.validate().context("period.series")?;
        if clim.start < series.start || clim.end > series.end {
            bail!(
                "period.climatology {}-{} must lie within period.series {}-{}",
                clim.start,
                clim.end,
                series.start,
                series.end
            );
        }
        if self.period.target_year < clim.start {
            bail!("period.target_year {} precedes the climatology", self.period.target_year);
        }

        if self.region.targets.len() != 2 {
            bail!(
                "region.targets must name exactly two counties, found {}",
                self.region.targets.len()
            );
        }
        if self.region.states.is_empty() {
            bail!("region.states is empty");
        }

        if self.figure.panels.len() != 4 {
            bail!("figure.panels must hold four panels, found {}", self.figure.panels.len());
        }
        for (i, panel) in self.figure.panels.iter().enumerate() {
            if self.figure.panels[..i].iter().any(|p| p.metric == panel.metric) {
                bail!("figure.panels: metric {:?} appears twice", panel.metric);
            }
            panel.validate().with_context(|| format!("figure.panels[{}]", i))?;
        }
        if self.figure.dpi == 0 || self.figure.width_in <= 0.0 || self.figure.height_in <= 0.0 {
            bail!("figure size and dpi must be positive");
        }

        Ok(())
    }
}

/// `<config dir>/anomap/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

// -- Period ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodConfig {
    pub target_year: i32,
    pub window: DayWindow,
    pub climatology: YearRange,
    pub series: YearRange,
}

impl Default for PeriodConfig {
    fn default() -> Self {
        PeriodConfig {
            target_year: 2025,
            window: DayWindow {
                start: MonthDay::new(7, 3),
                end: MonthDay::new(7, 4),
            },
            climatology: YearRange { start: 1991, end: 2020 },
            series: YearRange { start: 1991, end: 2025 },
        }
    }
}

impl PeriodConfig {
    /// Years of the county series, always including the target year.
    pub fn series_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.series.years().collect();
        if !self.series.contains(self.target_year) {
            years.push(self.target_year);
            years.sort_unstable();
        }
        years
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    fn validate(&self) -> Result<()> {
        if self.start > self.end {
            bail!("start {} is after end {}", self.start, self.end);
        }
        Ok(())
    }
}

/// A calendar window applied to every year, e.g. `07-03` to `07-04`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl DayWindow {
    /// First and last date of the window in `year`.
    pub fn dates_in(&self, year: i32) -> Result<(NaiveDate, NaiveDate)> {
        Ok((self.start.in_year(year)?, self.end.in_year(year)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub const fn new(month: u32, day: u32) -> Self {
        MonthDay { month, day }
    }

    /// The date in `year`; 29 February falls back to the 28th in common years.
    pub fn in_year(&self, year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| {
                if self.month == 2 && self.day == 29 {
                    NaiveDate::from_ymd_opt(year, 2, 28)
                } else {
                    None
                }
            })
            .ok_or_else(|| anyhow!("{} is not a valid date in {}", self, year))
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (month, day) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow!("expected MM-DD, got `{}`", s))?;
        let month_day = MonthDay::new(month.parse()?, day.parse()?);

        // 2000 is a leap year, so this accepts every real calendar day
        if NaiveDate::from_ymd_opt(2000, month_day.month, month_day.day).is_none() {
            bail!("`{}` is not a calendar day", s);
        }

        Ok(month_day)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MonthDay> for String {
    fn from(value: MonthDay) -> Self {
        value.to_string()
    }
}

// -- Sources -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub max_temperature: VariableSource,
    pub precipitation: VariableSource,
    /// Coordinate variable names shared by both datasets.
    pub time: String,
    pub lat: String,
    pub lon: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            max_temperature: VariableSource {
                url: "http://thredds.northwestknowledge.net:8080/thredds/dodsC/agg_met_tmmx_1979_CurrentYear_CONUS.nc".to_string(),
                variable: "daily_maximum_temperature".to_string(),
                offset: -273.15,
                unit: "°C".to_string(),
            },
            precipitation: VariableSource {
                url: "http://thredds.northwestknowledge.net:8080/thredds/dodsC/agg_met_pr_1979_CurrentYear_CONUS.nc".to_string(),
                variable: "precipitation_amount".to_string(),
                offset: 0.0,
                unit: "mm/day".to_string(),
            },
            time: "day".to_string(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSource {
    /// OPeNDAP dataset URL or local NetCDF path.
    pub url: String,
    pub variable: String,
    /// Added to every decoded value (kelvin to Celsius for temperature).
    pub offset: f64,
    pub unit: String,
}

// -- Region ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub map_bbox: BoundingBox,
    pub county_bbox: BoundingBox,
    /// State FIPS codes of the region counties.
    pub states: Vec<String>,
    /// County names, first and second colour in the inset charts.
    pub targets: Vec<String>,
    pub boundaries_url: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        RegionConfig {
            map_bbox: BoundingBox {
                min_lon: -109.5,
                max_lon: -93.0,
                min_lat: 25.5,
                max_lat: 37.5,
            },
            county_bbox: BoundingBox {
                min_lon: -100.5,
                max_lon: -97.0,
                min_lat: 29.5,
                max_lat: 31.0,
            },
            states: vec!["48".to_string(), "40".to_string(), "35".to_string()],
            targets: vec!["Kerr".to_string(), "Travis".to_string()],
            boundaries_url: "https://www2.census.gov/geo/tiger/GENZ2023/shp/cb_2023_us_county_20m.zip"
                .to_string(),
        }
    }
}

// -- Figure ------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub output: PathBuf,
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
    pub title: String,
    pub caption: String,
    pub panels: Vec<PanelConfig>,
}

impl FigureConfig {
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        (
            (self.width_in * dpi).round() as u32,
            (self.height_in * dpi).round() as u32,
        )
    }
}

impl Default for FigureConfig {
    fn default() -> Self {
        FigureConfig {
            output: PathBuf::from("county_anomaly_infographic.png"),
            width_in: 16.0,
            height_in: 12.0,
            dpi: 150,
            title: "Hill Country flood, 3-4 July 2025: departures from the 1991-2020 normal".to_string(),
            caption: "Data: gridMET (Abatzoglou 2013) via OPeNDAP; county boundaries: U.S. Census Bureau cartographic boundary files".to_string(),
            panels: vec![
                PanelConfig {
                    metric: Metric::TargetPrecipitation,
                    title: "Precipitation".to_string(),
                    unit: "mm/day".to_string(),
                    edges: vec![1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 150.0],
                    colors: hex_list(&[
                        "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6",
                        "#2171b5", "#08519c", "#08306b",
                    ]),
                },
                PanelConfig {
                    metric: Metric::TemperatureAnomaly,
                    title: "Max temperature anomaly".to_string(),
                    unit: "°C".to_string(),
                    edges: vec![-8.0, -6.0, -4.0, -2.0, 0.0, 2.0, 4.0, 6.0, 8.0],
                    colors: hex_list(&[
                        "#053061", "#2166ac", "#4393c3", "#92c5de", "#d1e5f0", "#fddbc7",
                        "#f4a582", "#d6604d", "#b2182b", "#67001f",
                    ]),
                },
                PanelConfig {
                    metric: Metric::PrecipitationAnomaly,
                    title: "Precipitation anomaly".to_string(),
                    unit: "mm/day".to_string(),
                    edges: vec![-40.0, -20.0, -10.0, -5.0, 0.0, 5.0, 10.0, 20.0, 40.0],
                    colors: hex_list(&[
                        "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#c7eae5",
                        "#80cdc1", "#35978f", "#01665e", "#003c30",
                    ]),
                },
                PanelConfig {
                    metric: Metric::Ratio,
                    title: "Precipitation anomaly per °C of temperature anomaly".to_string(),
                    unit: "mm/day per °C".to_string(),
                    edges: vec![-20.0, -10.0, -5.0, -2.0, 0.0, 2.0, 5.0, 10.0, 20.0],
                    colors: hex_list(&[
                        "#2d004b", "#542788", "#8073ac", "#b2abd2", "#d8daeb", "#fee0b6",
                        "#fdb863", "#e08214", "#b35806", "#7f3b08",
                    ]),
                },
            ],
        }
    }
}

fn hex_list(colors: &[&str]) -> Vec<String> {
    colors.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub metric: Metric,
    pub title: String,
    pub unit: String,
    /// Bin edges, strictly increasing.
    pub edges: Vec<f64>,
    /// One colour per bin, including the open bins below and above the edges.
    pub colors: Vec<String>,
}

impl PanelConfig {
    fn validate(&self) -> Result<()> {
        if self.edges.is_empty() {
            bail!("no bin edges");
        }
        if self.edges.windows(2).any(|w| w[0] >= w[1]) {
            bail!("bin edges must be strictly increasing");
        }
        if self.colors.len() != self.edges.len() + 1 {
            bail!(
                "{} edges need {} colours, found {}",
                self.edges.len(),
                self.edges.len() + 1,
                self.colors.len()
            );
        }
        for color in &self.colors {
            crate::render::scale::parse_hex(color)?;
        }
        Ok(())
    }
}

/// The quantity a map panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TargetTemperature,
    TargetPrecipitation,
    TemperatureAnomaly,
    PrecipitationAnomaly,
    Ratio,
}

// -- Tests -------------------------------------------------------------------
