//! Map panels: coloured grid cells, county outlines and a colorbar.

use anyhow::Result;
use plotters::{coord::Shift, prelude::*, style::text_anchor::{HPos, Pos, VPos}};

use super::{pt, scale::{format_edge, ColorScale}, FONT};
use crate::{
    config::PanelConfig,
    counties::{Boundaries, CountySet},
    grid::{BoundingBox, GridField},
};

const REGION_OUTLINE: RGBColor = RGBColor(110, 110, 110);
const TARGET_OUTLINE: RGBColor = RGBColor(0, 0, 0);

/// Draws one panel's field clipped to the region, with the county outlines
/// on top.
pub fn draw_map(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &PanelConfig,
    scale: &ColorScale,
    field: &GridField,
    boundaries: &Boundaries,
    extent: &BoundingBox,
    dpi: u32,
) -> Result<()> {
    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (FONT, pt(12.0, dpi)))
        .margin(pt(4.0, dpi) as u32)
        .x_label_area_size(pt(14.0, dpi) as u32)
        .y_label_area_size(pt(22.0, dpi) as u32)
        .build_cartesian_2d(extent.min_lon..extent.max_lon, extent.min_lat..extent.max_lat)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|lon: &f64| format!("{:.0}°", lon))
        .y_label_formatter(&|lat: &f64| format!("{:.0}°", lat))
        .label_style((FONT, pt(8.0, dpi)))
        .draw()?;

    let (dlon, dlat) = field.spacing();
    chart.draw_series(field.cells().filter_map(|(lon, lat, value)| {
        scale.color(value).map(|color| {
            Rectangle::new(
                [
                    (lon - dlon / 2.0, lat - dlat / 2.0),
                    (lon + dlon / 2.0, lat + dlat / 2.0),
                ],
                color.filled(),
            )
        })
    }))?;

    chart.draw_series(outlines(&boundaries.region, REGION_OUTLINE.stroke_width(1)))?;
    chart.draw_series(outlines(
        &boundaries.targets,
        TARGET_OUTLINE.stroke_width(pt(1.5, dpi) as u32),
    ))?;

    Ok(())
}

fn outlines(counties: &CountySet, style: ShapeStyle) -> Vec<PathElement<(f64, f64)>> {
    counties
        .counties
        .iter()
        .flat_map(|county| county.geometry.iter())
        .map(|polygon| {
            let ring: Vec<(f64, f64)> = polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
            PathElement::new(ring, style)
        })
        .collect()
}

/// A horizontal bar of the scale's bins with the edges labelled below.
pub fn draw_colorbar(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    scale: &ColorScale,
    unit: &str,
    dpi: u32,
) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);

    let left = width / 8;
    let right = width - width / 8;
    let top = height / 10;
    let bottom = top + height / 3;

    let bins = scale.colors().len() as i32;
    let bin_width = (right - left) / bins;
    let label_style = TextStyle::from((FONT, pt(8.0, dpi)).into_font())
        .pos(Pos::new(HPos::Center, VPos::Top));

    for (i, color) in scale.colors().iter().enumerate() {
        let x0 = left + i as i32 * bin_width;
        area.draw(&Rectangle::new([(x0, top), (x0 + bin_width, bottom)], color.filled()))?;
    }
    area.draw(&Rectangle::new(
        [(left, top), (left + bins * bin_width, bottom)],
        BLACK.stroke_width(1),
    ))?;

    for (i, edge) in scale.edges().iter().enumerate() {
        let x = left + (i as i32 + 1) * bin_width;
        area.draw(&Text::new(format_edge(*edge), (x, bottom + 4), label_style.clone()))?;
    }

    let unit_style = TextStyle::from((FONT, pt(9.0, dpi)).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    area.draw(&Text::new(unit.to_string(), (width / 2, height - 2), unit_style))?;

    Ok(())
}
