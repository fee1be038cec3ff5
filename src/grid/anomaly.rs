//! Anomalies against a baseline and the precipitation-per-degree ratio.

use anyhow::Result;
use ndarray::Zip;

use super::GridField;

/// `target - baseline`, cell by cell.
pub fn anomaly(target: &GridField, baseline: &GridField) -> Result<GridField> {
    target.ensure_aligned(baseline)?;

    let values = &target.values - &baseline.values;

    Ok(GridField {
        values,
        ..target.clone()
    })
}

/// Precipitation anomaly per degree of temperature anomaly.
///
/// Only an exactly zero temperature anomaly maps to NaN; near-zero
/// denominators pass through and can produce very large ratios.
pub fn ratio(pr_anomaly: &GridField, tmax_anomaly: &GridField) -> Result<GridField> {
    pr_anomaly.ensure_aligned(tmax_anomaly)?;

    let values = Zip::from(&pr_anomaly.values)
        .and(&tmax_anomaly.values)
        .map_collect(|&p, &t| ratio_value(p, t));

    Ok(GridField {
        values,
        unit: format!("{} per {}", pr_anomaly.unit, tmax_anomaly.unit),
        ..pr_anomaly.clone()
    })
}

pub fn ratio_value(pr_anomaly: f64, tmax_anomaly: f64) -> f64 {
    if tmax_anomaly == 0.0 {
        f64::NAN
    } else {
        pr_anomaly / tmax_anomaly
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};
    use proptest::prelude::*;

    use super::*;

    fn field(values: Array2<f64>, unit: &str) -> GridField {
        let (ny, nx) = values.dim();
        GridField::new(
            (0..ny).map(|i| 30.0 + i as f64).collect(),
            (0..nx).map(|j| -100.0 + j as f64).collect(),
            values,
            unit,
        )
        .unwrap()
    }

    #[test]
    fn should_subtract_baseline() {
        let target = field(array![[30.0, 31.0], [32.0, f64::NAN]], "°C");
        let baseline = field(array![[28.0, 31.5], [30.0, 30.0]], "°C");

        let anom = anomaly(&target, &baseline).unwrap();

        assert_eq!(anom.values[[0, 0]], 2.0);
        assert_eq!(anom.values[[0, 1]], -0.5);
        assert_eq!(anom.values[[1, 0]], 2.0);
        assert!(anom.values[[1, 1]].is_nan());
        assert_eq!(anom.unit, "°C");
    }

    #[test]
    fn should_mark_zero_denominator_undefined() {
        let pr = field(array![[10.0, 4.0, 0.0]], "mm/day");
        let tmax = field(array![[2.0, 0.0, -1.0]], "°C");

        let r = ratio(&pr, &tmax).unwrap();

        assert_eq!(r.values[[0, 0]], 5.0);
        assert!(r.values[[0, 1]].is_nan());
        assert_eq!(r.values[[0, 2]], -0.0);
        assert_eq!(r.unit, "mm/day per °C");
    }

    #[test]
    fn should_not_guard_near_zero_denominator() {
        assert_eq!(ratio_value(1.0, 2f64.powi(-30)), 2f64.powi(30));
        assert!((ratio_value(1.0, 1e-9) - 1e9).abs() / 1e9 < 1e-12);
        assert!(ratio_value(1.0, -0.0).is_nan());
    }

    #[test]
    fn should_reject_misaligned_fields() {
        let a = field(array![[1.0, 2.0]], "°C");
        let b = field(array![[1.0], [2.0]], "°C");

        assert!(anomaly(&a, &b).is_err());
        assert!(ratio(&a, &b).is_err());
    }

    fn grid_pair() -> impl Strategy<Value = (Array2<f64>, Array2<f64>)> {
        (1usize..6, 1usize..6).prop_flat_map(|(ny, nx)| {
            let cells = ny * nx;
            (
                prop::collection::vec(-1000.0f64..1000.0, cells),
                prop::collection::vec(prop_oneof![Just(0.0), -50.0f64..50.0], cells),
            )
                .prop_map(move |(a, b)| {
                    (
                        Array2::from_shape_vec((ny, nx), a).unwrap(),
                        Array2::from_shape_vec((ny, nx), b).unwrap(),
                    )
                })
        })
    }

    proptest! {
        #[test]
        fn anomaly_is_elementwise_difference((a, b) in grid_pair()) {
            let fa = field(a.clone(), "°C");
            let fb = field(b.clone(), "°C");

            let anom = anomaly(&fa, &fb).unwrap();
            for ((idx, v), (x, y)) in anom.values.indexed_iter().zip(a.iter().zip(b.iter())) {
                prop_assert_eq!(*v, x - y, "cell {:?}", idx);
            }

            let zero = anomaly(&fa, &fa).unwrap();
            prop_assert!(zero.values.iter().all(|v| *v == 0.0));
        }

        #[test]
        fn ratio_divides_or_is_undefined((p, t) in grid_pair()) {
            let r = ratio(&field(p.clone(), "mm/day"), &field(t.clone(), "°C")).unwrap();

            for (v, (x, y)) in r.values.iter().zip(p.iter().zip(t.iter())) {
                if *y == 0.0 {
                    prop_assert!(v.is_nan());
                } else {
                    prop_assert_eq!(*v, x / y);
                }
            }
        }
    }
}
