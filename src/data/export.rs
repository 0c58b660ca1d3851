use super::model::{Cell, Dataset};

/// Token written for null cells; the analysis service reads it back as missing.
pub const NULL_TOKEN: &str = "na";

/// Serialise a dataset as CSV in column order, nulls as [`NULL_TOKEN`].
pub fn to_csv_bytes(dataset: &Dataset) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&dataset.columns)?;

    for record in &dataset.records {
        let row = dataset.columns.iter().map(|col| match record.get(col) {
            Some(Cell::Text(s)) => s.clone(),
            Some(Cell::Number(v)) => v.to_string(),
            Some(Cell::Null) | None => NULL_TOKEN.to_string(),
        });
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
