//! Clipping fields to polygon boundaries.

use anyhow::{anyhow, bail, Result};
use geo::{BoundingRect, Intersects, MultiPolygon, Point, Polygon, Rect};
use ndarray::Array2;

use super::{Crs, GridField};

/// Keeps the cells whose centre intersects `polygons`, blanks the rest and
/// crops the field to the kept cells. No kept cell gives an empty field.
pub fn clip(field: &GridField, polygons: &MultiPolygon<f64>, polygons_crs: Crs) -> Result<GridField> {
    let crs = field
        .crs
        .ok_or_else(|| anyhow!("field has no coordinate reference system"))?;
    if !crs.is_geographic() || !polygons_crs.is_geographic() {
        bail!(
            "clipping needs geographic coordinates, got field {:?} and polygons {:?}",
            crs,
            polygons_crs
        );
    }

    let index = PolygonIndex::new(polygons.iter());
    let (ny, nx) = field.values.dim();
    let keep = Array2::from_shape_fn((ny, nx), |(i, j)| index.intersects(field.lon[j], field.lat[i]));

    let rows: Vec<usize> = (0..ny).filter(|&i| keep.row(i).iter().any(|&k| k)).collect();
    let cols: Vec<usize> = (0..nx).filter(|&j| keep.column(j).iter().any(|&k| k)).collect();

    let (Some(&r0), Some(&r1), Some(&c0), Some(&c1)) =
        (rows.first(), rows.last(), cols.first(), cols.last())
    else {
        log::debug!("clip kept no cells of a {}x{} field", ny, nx);
        return Ok(GridField::empty(&field.unit, field.crs));
    };

    let values = Array2::from_shape_fn((r1 - r0 + 1, c1 - c0 + 1), |(i, j)| {
        let (i, j) = (i + r0, j + c0);
        if keep[[i, j]] {
            field.values[[i, j]]
        } else {
            f64::NAN
        }
    });

    Ok(GridField {
        lat: field.lat[r0..=r1].to_vec(),
        lon: field.lon[c0..=c1].to_vec(),
        values,
        unit: field.unit.clone(),
        crs: field.crs,
    })
}

/// Polygons with their bounding rectangles for quick point rejection.
pub struct PolygonIndex<'a> {
    entries: Vec<(Rect<f64>, &'a Polygon<f64>)>,
}

impl<'a> PolygonIndex<'a> {
    pub fn new(polygons: impl Iterator<Item = &'a Polygon<f64>>) -> Self {
        let entries = polygons
            .filter_map(|polygon| polygon.bounding_rect().map(|rect| (rect, polygon)))
            .collect();

        PolygonIndex { entries }
    }

    pub fn intersects(&self, lon: f64, lat: f64) -> bool {
        let point = Point::new(lon, lat);
        self.entries.iter().any(|(rect, polygon)| {
            rect.min().x <= lon
                && lon <= rect.max().x
                && rect.min().y <= lat
                && lat <= rect.max().y
                && polygon.intersects(&point)
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        Rect::new((x0, y0), (x1, y1)).to_polygon()
    }

    fn field() -> GridField {
        GridField::new(
            vec![0.5, 1.5],
            vec![0.5, 1.5],
            array![[1.0, 2.0], [3.0, 4.0]],
            "°C",
        )
        .unwrap()
        .with_crs(Crs::WGS84)
    }

    #[test]
    fn should_keep_field_inside_containing_polygon() {
        let polygons = MultiPolygon::new(vec![square(-1.0, -1.0, 3.0, 3.0)]);
        let clipped = clip(&field(), &polygons, Crs::NAD83).unwrap();

        assert_eq!(clipped, field());
    }

    #[test]
    fn should_return_empty_for_disjoint_polygon() {
        let polygons = MultiPolygon::new(vec![square(10.0, 10.0, 11.0, 11.0)]);
        let clipped = clip(&field(), &polygons, Crs::WGS84).unwrap();

        assert!(clipped.is_empty());
        assert!(clipped.lat.is_empty() && clipped.lon.is_empty());
    }

    #[test]
    fn should_crop_to_kept_cells() {
        let polygons = MultiPolygon::new(vec![square(0.0, 0.0, 1.0, 1.0)]);
        let clipped = clip(&field(), &polygons, Crs::WGS84).unwrap();

        assert_eq!(clipped.values, array![[1.0]]);
        assert_eq!(clipped.lat, vec![0.5]);
        assert_eq!(clipped.lon, vec![0.5]);
    }

    #[test]
    fn should_blank_cells_outside_polygons() {
        let polygons = MultiPolygon::new(vec![
            square(0.0, 0.0, 1.0, 1.0),
            square(1.0, 1.0, 2.0, 2.0),
        ]);
        let clipped = clip(&field(), &polygons, Crs::WGS84).unwrap();

        assert_eq!(clipped.values.dim(), (2, 2));
        assert_eq!(clipped.values[[0, 0]], 1.0);
        assert_eq!(clipped.values[[1, 1]], 4.0);
        assert!(clipped.values[[0, 1]].is_nan());
        assert!(clipped.values[[1, 0]].is_nan());
    }

    #[test]
    fn should_require_geographic_crs() {
        let polygons = MultiPolygon::new(vec![square(0.0, 0.0, 1.0, 1.0)]);
        let mut untagged = field();
        untagged.crs = None;

        assert!(clip(&untagged, &polygons, Crs::WGS84).is_err());
        assert!(clip(&field(), &polygons, Crs::Epsg(3857)).is_err());
        assert!(clip(&field(), &polygons, Crs::Unknown).is_err());
    }
}
