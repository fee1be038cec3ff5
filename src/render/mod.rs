//! Renders the infographic: a title, four map panels with insets and
//! colorbars, and the attribution caption.

pub mod scale;

mod inset;
mod map;

use std::path::Path;

use anyhow::{bail, Result};
use geo::BoundingRect;
use plotters::{
    prelude::*,
    style::text_anchor::{HPos, Pos, VPos},
};

use crate::{config::Config, counties::CountySet, grid::BoundingBox, pipeline::Infographic};
use scale::ColorScale;

pub(crate) const FONT: &str = "sans-serif";

const CAPTION_COLOR: RGBColor = RGBColor(80, 80, 80);

/// Degrees added around the region outline.
const MAP_PADDING: f64 = 0.25;

/// Size in pixels of `points` typographic points.
pub(crate) fn pt(points: f64, dpi: u32) -> f64 {
    points * f64::from(dpi) / 72.0
}

/// Writes the infographic to `output` as a PNG.
pub fn save(infographic: &Infographic, config: &Config, output: &Path) -> Result<()> {
    let figure = &config.figure;
    if figure.panels.len() != 4 {
        bail!("the figure needs 4 panels, got {}", figure.panels.len());
    }
    let scales = figure
        .panels
        .iter()
        .map(ColorScale::from_panel)
        .collect::<Result<Vec<_>>>()?;

    let extent = map_extent(&infographic.boundaries.region, &config.region.map_bbox);
    let targets = infographic.boundaries.targets.names();
    let dpi = figure.dpi;

    let (width, height) = figure.pixel_size();
    let root = BitMapBackend::new(output, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let header = pt(34.0, dpi) as u32;
    let footer = pt(22.0, dpi) as u32;
    let (top, rest) = root.split_vertically(header);
    let (body, bottom) = rest.split_vertically(height.saturating_sub(header + footer));

    let title_style = TextStyle::from((FONT, pt(18.0, dpi)).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    top.draw(&Text::new(
        figure.title.clone(),
        (width as i32 / 2, header as i32 / 2),
        title_style,
    ))?;

    for ((area, panel), scale) in body.split_evenly((2, 2)).iter().zip(&figure.panels).zip(&scales) {
        let (_, panel_height) = area.dim_in_pixel();
        let (map_area, bar_area) = area.split_vertically(panel_height * 83 / 100);

        let field = infographic.maps.get(panel.metric);
        map::draw_map(&map_area, panel, scale, field, &infographic.boundaries, &extent, dpi)?;
        inset::draw_inset(&map_area, panel, &infographic.series, &targets, dpi)?;
        map::draw_colorbar(&bar_area, scale, &panel.unit, dpi)?;
    }

    let caption_style = TextStyle::from((FONT, pt(9.0, dpi)).into_font())
        .color(&CAPTION_COLOR)
        .pos(Pos::new(HPos::Center, VPos::Center));
    bottom.draw(&Text::new(
        figure.caption.clone(),
        (width as i32 / 2, footer as i32 / 2),
        caption_style,
    ))?;

    root.present()?;
    log::info!("Rendered {}x{} px to {}", width, height, output.display());

    Ok(())
}

/// Bounding box of the region counties plus a margin, or `fallback` when the
/// region has no geometry.
pub fn map_extent(region: &CountySet, fallback: &BoundingBox) -> BoundingBox {
    match region.geometry().bounding_rect() {
        Some(rect) => BoundingBox {
            min_lon: rect.min().x - MAP_PADDING,
            max_lon: rect.max().x + MAP_PADDING,
            min_lat: rect.min().y - MAP_PADDING,
            max_lat: rect.max().y + MAP_PADDING,
        },
        None => *fallback,
    }
}

// -- Tests -------------------------------------------------------------------
