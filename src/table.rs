//! The long-format output table and its CSV/parquet writers.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Builder, StringBuilder},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use clap::ValueEnum;
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

/// One (point, raster file) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub point_id: Option<String>,
    /// ISO-8601 with UTC designator, from the file name stamp.
    pub timestamp: String,
    pub variable: String,
    pub value: f64,
    pub source_file: String,
}

/// Output columns. The sampler always fills every row field; this set only
/// controls which columns the writers emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Column {
    PointId,
    Timestamp,
    Variable,
    Value,
    SourceFile,
}

pub const ALL_COLUMNS: [Column; 5] = [
    Column::PointId,
    Column::Timestamp,
    Column::Variable,
    Column::Value,
    Column::SourceFile,
];

impl Column {
    fn field(&self) -> Field {
        match self {
            Column::PointId => Field::new("point_id", DataType::Utf8, true),
            Column::Timestamp => Field::new("timestamp", DataType::Utf8, false),
            Column::Variable => Field::new("variable", DataType::Utf8, false),
            Column::Value => Field::new("value", DataType::Float64, false),
            Column::SourceFile => Field::new("source_file", DataType::Utf8, false),
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Column::PointId => "point-id",
            Column::Timestamp => "timestamp",
            Column::Variable => "variable",
            Column::Value => "value",
            Column::SourceFile => "source-file",
        };
        write!(f, "{}", name)
    }
}

/// Ordered sample rows: file-chronological order first, point-set order
/// within a file. The order is part of the output contract, so appends only.
#[derive(Debug, Default)]
pub struct SampleTable {
    rows: Vec<SampleRow>,
}

impl SampleTable {
    pub fn new() -> Self {
        SampleTable { rows: Vec::new() }
    }

    pub fn append(&mut self, rows: Vec<SampleRow>) {
        self.rows.extend(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows whose point identifier is missing. These cannot be joined back
    /// to station metadata downstream, so runs warn when this is nonzero.
    pub fn missing_id_count(&self) -> usize {
        self.rows.iter().filter(|r| r.point_id.is_none()).count()
    }

    fn record_batch(&self, columns: &[Column]) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());

        for column in columns {
            fields.push(column.field());
            let array: ArrayRef = match column {
                Column::PointId => {
                    let mut builder = StringBuilder::new();
                    for row in &self.rows {
                        builder.append_option(row.point_id.as_deref());
                    }
                    Arc::new(builder.finish())
                }
                Column::Timestamp => {
                    let mut builder = StringBuilder::new();
                    for row in &self.rows {
                        builder.append_value(&row.timestamp);
                    }
                    Arc::new(builder.finish())
                }
                Column::Variable => {
                    let mut builder = StringBuilder::new();
                    for row in &self.rows {
                        builder.append_value(&row.variable);
                    }
                    Arc::new(builder.finish())
                }
                Column::Value => {
                    let mut builder = Float64Builder::with_capacity(self.rows.len());
                    for row in &self.rows {
                        builder.append_value(row.value);
                    }
                    Arc::new(builder.finish())
                }
                Column::SourceFile => {
                    let mut builder = StringBuilder::new();
                    for row in &self.rows {
                        builder.append_value(&row.source_file);
                    }
                    Arc::new(builder.finish())
                }
            };
            arrays.push(array);
        }

        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Writes the table as delimited text with a header row.
    pub fn write_csv(&self, path: &Path, columns: &[Column]) -> Result<()> {
        let batch = self.record_batch(columns)?;
        let file = File::create(path)?;
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(file);
        writer.write(&batch)?;
        Ok(())
    }

    /// Writes the table as parquet, dictionary-encoded and ZSTD-compressed
    /// for the repeated string columns.
    pub fn write_parquet(&self, path: &Path, columns: &[Column]) -> Result<()> {
        let batch = self.record_batch(columns)?;
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(parquet::basic::Compression::ZSTD(
                parquet::basic::ZstdLevel::default(),
            ))
            .set_dictionary_enabled(true)
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(())
    }
}

// -- Tests -------------------------------------------------------------------
