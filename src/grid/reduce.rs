//! Temporal reduction: day-window means and multi-year climatologies.

use anyhow::{anyhow, Result};
use ndarray::{s, stack, Array2, Axis};

use super::{nan_mean, DailyStack, GridField};

/// Mean over the day axis. Missing days and NaN samples do not contribute.
pub fn window_mean(daily: &DailyStack) -> Result<GridField> {
    let (_, ny, nx) = daily.values.dim();
    let values = Array2::from_shape_fn((ny, nx), |(i, j)| {
        nan_mean(daily.values.slice(s![.., i, j]).iter().copied())
    });

    GridField::new(daily.lat.clone(), daily.lon.clone(), values, &daily.unit)
}

/// Stacks per-year fields along a year axis and collapses it with a mean.
pub fn climatology(years: &[GridField]) -> Result<GridField> {
    let first = years
        .first()
        .ok_or_else(|| anyhow!("climatology needs at least one year"))?;
    for field in &years[1..] {
        first.ensure_aligned(field)?;
    }

    let views: Vec<_> = years.iter().map(|f| f.values.view()).collect();
    let stacked = stack(Axis(0), &views)?;
    let values = stacked.map_axis(Axis(0), |lane| nan_mean(lane.iter().copied()));

    Ok(GridField {
        lat: first.lat.clone(),
        lon: first.lon.clone(),
        values,
        unit: first.unit.clone(),
        crs: first.crs,
    })
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ndarray::{array, Array3};

    use super::*;

    fn daily(year: i32, values: Array3<f64>) -> DailyStack {
        let days = (0..values.dim().0)
            .map(|d| NaiveDate::from_ymd_opt(year, 7, 3 + d as u32).unwrap())
            .collect();
        DailyStack {
            days,
            lat: vec![30.0],
            lon: vec![-99.0, -98.0],
            values,
            unit: "°C".to_string(),
        }
    }

    #[test]
    fn should_average_days() {
        let stack = daily(2025, array![[[1.0, 10.0]], [[3.0, 20.0]]]);
        let mean = window_mean(&stack).unwrap();

        assert_eq!(mean.values, array![[2.0, 15.0]]);
        assert_eq!(mean.lon, vec![-99.0, -98.0]);
    }

    #[test]
    fn should_ignore_missing_days() {
        let stack = daily(2025, array![[[1.0, f64::NAN]], [[3.0, f64::NAN]]]);
        let mean = window_mean(&stack).unwrap();

        assert_eq!(mean.values[[0, 0]], 2.0);
        assert!(mean.values[[0, 1]].is_nan());

        let no_days = daily(2025, Array3::zeros((0, 1, 2)));
        assert!(window_mean(&no_days).unwrap().values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn should_average_three_years_of_two_days() {
        let inputs = [
            array![[[1.0, 2.0]], [[3.0, 4.0]]],
            array![[[5.0, 6.0]], [[7.0, 8.0]]],
            array![[[9.0, 10.0]], [[11.0, 12.0]]],
        ];
        let yearly: Vec<GridField> = inputs
            .into_iter()
            .enumerate()
            .map(|(i, values)| window_mean(&daily(1991 + i as i32, values)).unwrap())
            .collect();

        let clim = climatology(&yearly).unwrap();

        let first_cell = (1.0 + 3.0 + 5.0 + 7.0 + 9.0 + 11.0) / 6.0;
        let second_cell = (2.0 + 4.0 + 6.0 + 8.0 + 10.0 + 12.0) / 6.0;
        assert_eq!(clim.values, array![[first_cell, second_cell]]);
    }

    #[test]
    fn should_reject_misaligned_years() {
        let a = GridField::new(vec![30.0], vec![-99.0], array![[1.0]], "°C").unwrap();
        let b = GridField::new(vec![31.0], vec![-99.0], array![[1.0]], "°C").unwrap();

        assert!(climatology(&[a, b]).is_err());
        assert!(climatology(&[]).is_err());
    }
}
