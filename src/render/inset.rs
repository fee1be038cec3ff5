//! The small county time-series chart placed over each map.

use anyhow::Result;
use plotters::{coord::Shift, prelude::*};

use super::{pt, FONT};
use crate::{aggregate::{county_series, CountyAnomaly}, config::PanelConfig};

/// Line colours of the first and second target county.
pub const TARGET_COLORS: [RGBColor; 2] = [RGBColor(0xd6, 0x27, 0x28), RGBColor(0x1f, 0x77, 0xb4)];

/// Draws the inset into the upper right corner of `area`.
pub fn draw_inset(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &PanelConfig,
    series: &[CountyAnomaly],
    targets: &[&str],
    dpi: u32,
) -> Result<()> {
    let lines: Vec<(&str, Vec<(i32, f64)>)> = targets
        .iter()
        .map(|county| (*county, county_series(series, county, panel.metric)))
        .collect();

    let defined = lines
        .iter()
        .flat_map(|(_, points)| points.iter().copied())
        .filter(|(_, v)| v.is_finite());
    let Some((years, values)) = extent(defined) else {
        log::warn!("{}: no county values for the inset", panel.title);
        return Ok(());
    };

    let (width, height) = area.dim_in_pixel();
    let inset = area.clone().shrink(
        (width * 60 / 100, height * 9 / 100),
        (width * 37 / 100, height * 34 / 100),
    );
    inset.fill(&WHITE.mix(0.85))?;

    let mut chart = ChartBuilder::on(&inset)
        .margin(pt(3.0, dpi) as u32)
        .x_label_area_size(pt(10.0, dpi) as u32)
        .y_label_area_size(pt(16.0, dpi) as u32)
        .build_cartesian_2d(years.0..years.1, values.0..values.1)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(4)
        .y_labels(4)
        .y_label_formatter(&|v: &f64| format!("{:.1}", v))
        .label_style((FONT, pt(6.0, dpi)))
        .draw()?;

    chart.draw_series(LineSeries::new(
        vec![(years.0, 0.0), (years.1, 0.0)],
        BLACK.mix(0.5).stroke_width(1),
    ))?;

    let final_year = lines
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(year, _)| *year))
        .max();

    for ((county, points), color) in lines.iter().zip(TARGET_COLORS) {
        let style = color.stroke_width(pt(1.0, dpi) as u32);
        chart
            .draw_series(std::iter::empty::<PathElement<(i32, f64)>>())?
            .label(*county)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 12, y)], color.stroke_width(2)));

        for segment in segments(points) {
            chart.draw_series(LineSeries::new(segment, style))?;
        }

        if let Some(point) = final_year.and_then(|year| final_point(points, year)) {
            chart.draw_series(std::iter::once(TriangleMarker::new(
                point,
                pt(4.0, dpi) as i32,
                color.filled(),
            )))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font((FONT, pt(6.0, dpi)))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}

/// Runs of consecutive defined values; an undefined value breaks the line.
fn segments(points: &[(i32, f64)]) -> Vec<Vec<(i32, f64)>> {
    points
        .split(|(_, v)| !v.is_finite())
        .filter(|run| !run.is_empty())
        .map(|run| run.to_vec())
        .collect()
}

/// The value of `year`, when it is defined.
fn final_point(points: &[(i32, f64)], year: i32) -> Option<(i32, f64)> {
    points
        .iter()
        .copied()
        .find(|(y, v)| *y == year && v.is_finite())
}

/// Year range padded by one year each side and value range including zero,
/// padded by a tenth of its span.
fn extent(points: impl Iterator<Item = (i32, f64)>) -> Option<((i32, i32), (f64, f64))> {
    let mut range: Option<((i32, i32), (f64, f64))> = None;
    for (year, value) in points {
        let ((y0, y1), (v0, v1)) = range.get_or_insert(((year, year), (0.0, 0.0)));
        *y0 = (*y0).min(year);
        *y1 = (*y1).max(year);
        *v0 = (*v0).min(value);
        *v1 = (*v1).max(value);
    }

    range.map(|((y0, y1), (v0, v1))| {
        let pad = if v1 > v0 { (v1 - v0) / 10.0 } else { 1.0 };
        ((y0 - 1, y1 + 1), (v0 - pad, v1 + pad))
    })
}

// -- Tests -------------------------------------------------------------------
