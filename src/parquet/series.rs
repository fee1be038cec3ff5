use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, Int32Array, RecordBatch, StringArray},
    datatypes::{DataType, Field, Schema},
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::aggregate::CountyAnomaly;

/// Writes one row per county and year. Undefined values become nulls.
pub fn save_series(rows: &[CountyAnomaly], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("county", DataType::Utf8, false),
        Field::new("year", DataType::Int32, false),
        Field::new("tmax", DataType::Float64, true),
        Field::new("pr", DataType::Float64, true),
        Field::new("tmax_clim", DataType::Float64, true),
        Field::new("pr_clim", DataType::Float64, true),
        Field::new("tmax_anomaly", DataType::Float64, true),
        Field::new("pr_anomaly", DataType::Float64, true),
        Field::new("ratio", DataType::Float64, true),
    ]));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let column = |value: fn(&CountyAnomaly) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(
            rows.iter().map(|r| defined(value(r))).collect::<Vec<_>>(),
        ))
    };

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.county.as_str()).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Int32Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())) as ArrayRef,
            column(|r| r.tmax),
            column(|r| r.pr),
            column(|r| r.tmax_clim),
            column(|r| r.pr_clim),
            column(|r| r.tmax_anomaly),
            column(|r| r.pr_anomaly),
            column(|r| r.ratio),
        ],
    )?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

/// `None` for the NaN marker of undefined values.
fn defined(value: f64) -> Option<f64> {
    Some(value).filter(|v| !v.is_nan())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::TempDir;

    use super::*;

    fn row(county: &str, year: i32, ratio: f64) -> CountyAnomaly {
        CountyAnomaly {
            county: county.to_string(),
            year,
            tmax: 31.0,
            pr: 13.0,
            tmax_clim: 31.0,
            pr_clim: 3.0,
            tmax_anomaly: 0.0,
            pr_anomaly: 10.0,
            ratio,
        }
    }

    #[test]
    fn should_map_only_nan_to_none() {
        assert_eq!(defined(f64::NAN), None);
        assert_eq!(defined(-0.0), Some(-0.0));
        assert_eq!(defined(f64::INFINITY), Some(f64::INFINITY));
    }

    #[test]
    fn should_save_series_with_nulls() {
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("series.parquet");
        let rows = vec![row("Kerr", 2025, f64::NAN), row("Travis", 2025, 2.0)];

        save_series(&rows, &path).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 9);

        let counties = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(counties.value(1), "Travis");

        let ratio = batch
            .column_by_name("ratio")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(ratio.is_null(0));
        assert_eq!(ratio.value(1), 2.0);
    }
}
