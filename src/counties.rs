//! County boundaries from the Census cartographic boundary shapefile.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{BoundingRect, Geometry, MultiPolygon};
use shapefile::dbase::{FieldValue, Record};

use crate::{
    config::RegionConfig,
    grid::{BoundingBox, Crs},
};

#[derive(Debug, Clone, PartialEq)]
pub struct County {
    pub name: String,
    pub state_fips: String,
    pub geoid: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountySet {
    pub crs: Crs,
    pub counties: Vec<County>,
}

impl CountySet {
    pub fn new(crs: Crs, counties: Vec<County>) -> Self {
        CountySet { crs, counties }
    }

    /// Reads a polygon shapefile with `NAME`, `STATEFP` and `GEOID` fields.
    /// The CRS comes from the `.prj` sidecar when there is one.
    pub fn read_shapefile(path: &Path) -> Result<Self> {
        let crs = match fs::read_to_string(path.with_extension("prj")) {
            Ok(wkt) => crs_from_prj(&wkt),
            Err(_) => Crs::Unknown,
        };

        let mut reader = shapefile::Reader::from_path(path)
            .with_context(|| format!("Failed to open shapefile {}", path.display()))?;

        let mut counties = Vec::new();
        for result in reader.iter_shapes_and_records() {
            let (shape, record) = result?;
            let name = text_field(&record, "NAME")?;
            let state_fips = text_field(&record, "STATEFP")?;
            let geoid = text_field(&record, "GEOID").unwrap_or_default();

            let geometry = match Geometry::<f64>::try_from(shape).map_err(|e| anyhow!(e))? {
                Geometry::MultiPolygon(polygons) => polygons,
                Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                _ => bail!("county {} ({}) is not a polygon", name, state_fips),
            };

            counties.push(County {
                name,
                state_fips,
                geoid,
                geometry,
            });
        }

        log::info!("Read {} counties from {}", counties.len(), path.display());

        Ok(CountySet::new(crs, counties))
    }

    pub fn in_states(&self, states: &[String]) -> CountySet {
        CountySet::new(
            self.crs,
            self.counties
                .iter()
                .filter(|c| states.contains(&c.state_fips))
                .cloned()
                .collect(),
        )
    }

    /// The counties called `names`, in that order. Each name must match once.
    pub fn named(&self, names: &[String]) -> Result<CountySet> {
        let counties = names
            .iter()
            .map(|name| -> Result<County> {
                let mut matches = self.counties.iter().filter(|c| &c.name == name);
                let county = matches
                    .next()
                    .ok_or_else(|| anyhow!("county `{}` not found in the region", name))?;
                if matches.next().is_some() {
                    bail!("county name `{}` is ambiguous in the region", name);
                }
                Ok(county.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CountySet::new(self.crs, counties))
    }

    /// All polygons of the set, undissolved.
    pub fn geometry(&self) -> MultiPolygon<f64> {
        MultiPolygon::new(
            self.counties
                .iter()
                .flat_map(|c| c.geometry.iter().cloned())
                .collect(),
        )
    }

    pub fn names(&self) -> Vec<&str> {
        self.counties.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }
}

/// Region counties and the two highlighted target counties.
#[derive(Debug, Clone)]
pub struct Boundaries {
    pub region: CountySet,
    pub targets: CountySet,
}

impl Boundaries {
    pub fn select(all: &CountySet, region: &RegionConfig) -> Result<Self> {
        let region_counties = all.in_states(&region.states);
        if region_counties.is_empty() {
            bail!("no counties in states {:?}", region.states);
        }
        let targets = region_counties.named(&region.targets)?;

        let boundaries = Boundaries {
            region: region_counties,
            targets,
        };
        for name in boundaries.targets_outside(&region.county_bbox) {
            log::warn!("{} reaches beyond region.county_bbox, cells outside it are not averaged", name);
        }

        Ok(boundaries)
    }

    /// Target counties whose bounding rectangle is not inside `bbox`.
    pub fn targets_outside(&self, bbox: &BoundingBox) -> Vec<&str> {
        self.targets
            .counties
            .iter()
            .filter(|county| match county.geometry.bounding_rect() {
                Some(rect) => !bbox.contains(rect.min().x, rect.min().y) || !bbox.contains(rect.max().x, rect.max().y),
                None => true,
            })
            .map(|county| county.name.as_str())
            .collect()
    }
}

/// Maps an ESRI `.prj` WKT string onto the geographic CRSs we handle.
pub fn crs_from_prj(wkt: &str) -> Crs {
    if wkt.contains("PROJCS") {
        Crs::Unknown
    } else if wkt.contains("North_American_1983") || wkt.contains("NAD83") {
        Crs::NAD83
    } else if wkt.contains("WGS_1984") || wkt.contains("WGS 84") || wkt.contains("WGS84") {
        Crs::WGS84
    } else {
        Crs::Unknown
    }
}

fn text_field(record: &Record, field: &str) -> Result<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(value))) => Ok(value.trim().to_string()),
        Some(other) => bail!("field {} is not text: {:?}", field, other),
        None => bail!("record has no {} field", field),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use geo::Rect;

    use super::*;

    pub fn county(name: &str, state: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> County {
        County {
            name: name.to_string(),
            state_fips: state.to_string(),
            geoid: format!("{}000", state),
            geometry: MultiPolygon::new(vec![Rect::new((x0, y0), (x1, y1)).to_polygon()]),
        }
    }

    fn fixture() -> CountySet {
        CountySet::new(
            Crs::NAD83,
            vec![
                county("Kerr", "48", 0.0, 0.0, 1.0, 1.0),
                county("Travis", "48", 1.0, 1.0, 2.0, 2.0),
                county("Grant", "35", 5.0, 5.0, 6.0, 6.0),
                county("Grant", "40", 7.0, 7.0, 8.0, 8.0),
                county("Orange", "06", 9.0, 9.0, 10.0, 10.0),
            ],
        )
    }

    #[test]
    fn should_filter_states() {
        let region = fixture().in_states(&["48".to_string(), "35".to_string()]);

        assert_eq!(region.names(), vec!["Kerr", "Travis", "Grant"]);
        assert_eq!(region.crs, Crs::NAD83);
    }

    #[test]
    fn should_select_targets_in_order() {
        let targets = fixture()
            .named(&["Travis".to_string(), "Kerr".to_string()])
            .unwrap();

        assert_eq!(targets.names(), vec!["Travis", "Kerr"]);
        assert_eq!(targets.geometry().0.len(), 2);
    }

    #[test]
    fn should_reject_missing_or_ambiguous_names() {
        assert!(fixture().named(&["Bexar".to_string()]).is_err());
        assert!(fixture().named(&["Grant".to_string()]).is_err());
    }

    #[test]
    fn should_select_boundaries() {
        let region = RegionConfig {
            states: vec!["48".to_string(), "40".to_string()],
            targets: vec!["Kerr".to_string(), "Grant".to_string()],
            ..RegionConfig::default()
        };
        let boundaries = Boundaries::select(&fixture(), &region).unwrap();

        assert_eq!(boundaries.region.len(), 3);
        assert_eq!(boundaries.targets.counties[1].state_fips, "40");

        let nowhere = RegionConfig {
            states: vec!["02".to_string()],
            ..RegionConfig::default()
        };
        assert!(Boundaries::select(&fixture(), &nowhere).is_err());
    }

    #[test]
    fn should_flag_targets_beyond_county_box() {
        let region = RegionConfig {
            states: vec!["48".to_string()],
            targets: vec!["Kerr".to_string(), "Travis".to_string()],
            ..RegionConfig::default()
        };
        let boundaries = Boundaries::select(&fixture(), &region).unwrap();
        let bbox = BoundingBox {
            min_lon: -0.5,
            max_lon: 1.5,
            min_lat: -0.5,
            max_lat: 1.5,
        };

        assert_eq!(boundaries.targets_outside(&bbox), vec!["Travis"]);
    }

    fn write_county(writer: &mut shapefile::Writer<std::io::BufWriter<fs::File>>, name: &str, state: &str, x0: f64, y0: f64) {
        let ring = vec![
            shapefile::Point::new(x0, y0),
            shapefile::Point::new(x0, y0 + 1.0),
            shapefile::Point::new(x0 + 1.0, y0 + 1.0),
            shapefile::Point::new(x0 + 1.0, y0),
            shapefile::Point::new(x0, y0),
        ];
        let polygon = shapefile::Polygon::new(shapefile::PolygonRing::Outer(ring));

        let mut record = Record::default();
        record.insert("NAME".to_string(), FieldValue::Character(Some(name.to_string())));
        record.insert("STATEFP".to_string(), FieldValue::Character(Some(state.to_string())));
        record.insert("GEOID".to_string(), FieldValue::Character(Some(format!("{}265", state))));
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }

    #[test]
    fn should_read_counties_from_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cb_2023_us_county_20m.shp");

        let table = shapefile::dbase::TableWriterBuilder::new()
            .add_character_field("NAME".try_into().unwrap(), 40)
            .add_character_field("STATEFP".try_into().unwrap(), 2)
            .add_character_field("GEOID".try_into().unwrap(), 5);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
        write_county(&mut writer, "Kerr", "48", -99.5, 29.5);
        write_county(&mut writer, "Dona Ana", "35", -107.0, 32.0);
        drop(writer);
        fs::write(
            path.with_extension("prj"),
            r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]]]"#,
        )
        .unwrap();

        let counties = CountySet::read_shapefile(&path).unwrap();

        assert_eq!(counties.crs, Crs::NAD83);
        assert_eq!(counties.names(), vec!["Kerr", "Dona Ana"]);
        assert_eq!(counties.counties[1].state_fips, "35");
        assert_eq!(counties.counties[0].geoid, "48265");
        let rect = counties.counties[0].geometry.bounding_rect().unwrap();
        assert_eq!((rect.min().x, rect.min().y), (-99.5, 29.5));
        assert_eq!((rect.max().x, rect.max().y), (-98.5, 30.5));
    }

    #[test]
    fn should_default_to_unknown_crs_without_prj() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counties.shp");

        let table = shapefile::dbase::TableWriterBuilder::new()
            .add_character_field("NAME".try_into().unwrap(), 40)
            .add_character_field("STATEFP".try_into().unwrap(), 2)
            .add_character_field("GEOID".try_into().unwrap(), 5);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();
        write_county(&mut writer, "Travis", "48", -98.0, 30.0);
        drop(writer);

        let counties = CountySet::read_shapefile(&path).unwrap();

        assert_eq!(counties.crs, Crs::Unknown);
        assert_eq!(counties.len(), 1);
    }

    #[test]
    fn should_read_crs_from_prj() {
        let nad83 = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        let wgs84 = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]]"#;
        let mercator = r#"PROJCS["WGS_1984_Web_Mercator",GEOGCS["GCS_WGS_1984"]]"#;

        assert_eq!(crs_from_prj(nad83), Crs::NAD83);
        assert_eq!(crs_from_prj(wgs84), Crs::WGS84);
        assert_eq!(crs_from_prj(mercator), Crs::Unknown);
    }
}
