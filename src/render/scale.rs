//! Discrete colour scales with explicit bin edges.

use anyhow::{anyhow, bail, Result};
use plotters::style::RGBColor;

use crate::config::PanelConfig;

/// `n` edges split the line into `n + 1` bins; the first and last bins are
/// open-ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    edges: Vec<f64>,
    colors: Vec<RGBColor>,
}

impl ColorScale {
    pub fn new(edges: Vec<f64>, colors: Vec<RGBColor>) -> Result<Self> {
        if colors.len() != edges.len() + 1 {
            bail!("{} edges need {} colours", edges.len(), edges.len() + 1);
        }
        Ok(ColorScale { edges, colors })
    }

    pub fn from_panel(panel: &PanelConfig) -> Result<Self> {
        let colors = panel
            .colors
            .iter()
            .map(|c| parse_hex(c))
            .collect::<Result<Vec<_>>>()?;
        ColorScale::new(panel.edges.clone(), colors)
    }

    /// Bin index of `value`; a value on an edge belongs to the bin above it.
    pub fn bin(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            return None;
        }
        Some(self.edges.partition_point(|edge| *edge <= value))
    }

    pub fn color(&self, value: f64) -> Option<RGBColor> {
        self.bin(value).map(|i| self.colors[i])
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn colors(&self) -> &[RGBColor] {
        &self.colors
    }
}

/// `#rrggbb` or `rrggbb`.
pub fn parse_hex(hex: &str) -> Result<RGBColor> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("`{}` is not a #rrggbb colour", hex);
    }

    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| anyhow!("`{}` is not a #rrggbb colour", hex))
    };

    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// Edge label with no trailing zeros.
pub fn format_edge(edge: f64) -> String {
    if edge.fract() == 0.0 {
        format!("{:.0}", edge)
    } else {
        format!("{}", edge)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> ColorScale {
        ColorScale::new(
            vec![-2.0, 0.0, 2.0],
            vec![
                RGBColor(0, 0, 255),
                RGBColor(100, 100, 255),
                RGBColor(255, 100, 100),
                RGBColor(255, 0, 0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn should_bin_values() {
        let scale = scale();

        assert_eq!(scale.bin(-10.0), Some(0));
        assert_eq!(scale.bin(-2.0), Some(1));
        assert_eq!(scale.bin(-0.5), Some(1));
        assert_eq!(scale.bin(0.0), Some(2));
        assert_eq!(scale.bin(1.9), Some(2));
        assert_eq!(scale.bin(2.0), Some(3));
        assert_eq!(scale.bin(f64::INFINITY), Some(3));
        assert_eq!(scale.bin(f64::NAN), None);
        assert_eq!(scale.color(5.0), Some(RGBColor(255, 0, 0)));
    }

    #[test]
    fn should_parse_hex_colours() {
        assert_eq!(parse_hex("#08306b").unwrap(), RGBColor(8, 48, 107));
        assert_eq!(parse_hex("FFFFFF").unwrap(), RGBColor(255, 255, 255));
        assert!(parse_hex("#fff").is_err());
        assert!(parse_hex("#gg0000").is_err());
        assert!(parse_hex("#ééé").is_err());
    }

    #[test]
    fn should_require_one_colour_per_bin() {
        assert!(ColorScale::new(vec![0.0], vec![RGBColor(0, 0, 0)]).is_err());
    }

    #[test]
    fn should_build_default_panel_scales() {
        for panel in crate::config::FigureConfig::default().panels {
            let scale = ColorScale::from_panel(&panel).unwrap();
            assert_eq!(scale.colors().len(), scale.edges().len() + 1);
        }
    }

    #[test]
    fn should_format_edges() {
        assert_eq!(format_edge(-8.0), "-8");
        assert_eq!(format_edge(2.5), "2.5");
    }
}
