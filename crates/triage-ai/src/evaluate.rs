//! Batch evaluation of a bundle against a labelled triage dataset.
//!
//! Reads the dataset CSV into Arrow RecordBatches, rebuilds one
//! [`PatientRecord`] per row the way the fitting run parsed it, classifies
//! every row, and compares predictions with ground-truth labels when present.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{Array, ArrayRef, Float64Array, LargeStringArray, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use tracing::info;
use triage_core::PatientRecord;
use triage_core::patient::split_multi_value;

use crate::service::InferenceService;

/// Dataset column names as exported by the data collection pipeline.
pub mod columns {
    pub const AGE: &str = "Age";
    pub const GENDER: &str = "Gender";
    pub const SYMPTOMS: &str = "Symptoms";
    pub const SYSTOLIC_BP: &str = "Blood_Pressure_Systolic";
    pub const HEART_RATE: &str = "Heart_Rate";
    pub const TEMPERATURE_F: &str = "Temperature_F";
    pub const CONDITIONS: &str = "Pre_Existing_Conditions";
    pub const RISK_LEVEL: &str = "Risk_Level";
    pub const DEPARTMENT: &str = "Recommended_Department";
}

const SCHEMA_INFERENCE_ROWS: usize = 1000;

/// Agreement between a prediction and the dataset's ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationStatus {
    /// No ground truth for this row.
    Predicted,
    /// Ground truth exists and the prediction agrees.
    Confirmed,
    /// Ground truth exists and the prediction disagrees.
    Conflict,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predicted => "predicted",
            Self::Confirmed => "confirmed",
            Self::Conflict => "conflict",
        }
    }

    fn compare(predicted: &str, truth: Option<&str>) -> Self {
        match truth {
            None => Self::Predicted,
            Some(t) if t == predicted => Self::Confirmed,
            Some(_) => Self::Conflict,
        }
    }
}

/// One dataset row with its optional ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledRecord {
    pub row: usize,
    pub record: PatientRecord,
    pub risk_level: Option<String>,
    pub department: Option<String>,
}

/// Prediction for one target of one row.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetOutcome {
    pub predicted: String,
    pub confidence: f64,
    pub expected: Option<String>,
    pub status: ClassificationStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    pub row: usize,
    pub risk: TargetOutcome,
    pub department: TargetOutcome,
}

/// Accuracy over the rows that carry ground truth for one target.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetSummary {
    pub labelled: usize,
    pub confirmed: usize,
}

impl TargetSummary {
    pub fn conflicts(&self) -> usize {
        self.labelled - self.confirmed
    }

    /// `None` when no row had ground truth.
    pub fn accuracy(&self) -> Option<f64> {
        (self.labelled > 0).then(|| self.confirmed as f64 / self.labelled as f64)
    }

    fn record(&mut self, status: ClassificationStatus) {
        match status {
            ClassificationStatus::Predicted => {}
            ClassificationStatus::Confirmed => {
                self.labelled += 1;
                self.confirmed += 1;
            }
            ClassificationStatus::Conflict => self.labelled += 1,
        }
    }
}

pub struct Evaluation {
    pub rows: Vec<RowOutcome>,
    pub risk: TargetSummary,
    pub department: TargetSummary,
}

impl Evaluation {
    /// Rows where either target disagrees with its ground truth.
    pub fn conflicts(&self) -> impl Iterator<Item = &RowOutcome> {
        self.rows.iter().filter(|r| {
            r.risk.status == ClassificationStatus::Conflict
                || r.department.status == ClassificationStatus::Conflict
        })
    }
}

/// Read a dataset CSV with a header row, inferring column types.
pub fn read_csv(path: &Path) -> anyhow::Result<Vec<RecordBatch>> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let format = arrow::csv::reader::Format::default().with_header(true);
    let (schema, _) = format
        .infer_schema(&mut file, Some(SCHEMA_INFERENCE_ROWS))
        .context("inferring dataset schema")?;
    file.rewind()?;

    let reader = arrow::csv::ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("reading dataset rows")?;

    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    info!(rows, path = %path.display(), "read dataset");
    Ok(batches)
}

/// Rebuild patient records from dataset batches.
///
/// Multi-value columns are comma-separated text; a null cell is an empty list.
pub fn records_from_batches(batches: &[RecordBatch]) -> anyhow::Result<Vec<LabelledRecord>> {
    let mut out = Vec::new();
    let mut row_base = 0usize;

    for batch in batches {
        let age = numeric_column(batch, columns::AGE)?;
        let bp = numeric_column(batch, columns::SYSTOLIC_BP)?;
        let hr = numeric_column(batch, columns::HEART_RATE)?;
        let temp = numeric_column(batch, columns::TEMPERATURE_F)?;
        let gender = required_column(batch, columns::GENDER)?;
        let symptoms = required_column(batch, columns::SYMPTOMS)?;
        let conditions = required_column(batch, columns::CONDITIONS)?;
        let risk = batch.column_by_name(columns::RISK_LEVEL);
        let dept = batch.column_by_name(columns::DEPARTMENT);

        for i in 0..batch.num_rows() {
            let row = row_base + i;
            let number = |arr: &Float64Array, name: &str| -> anyhow::Result<f64> {
                anyhow::ensure!(!arr.is_null(i), "row {row}: missing or non-numeric {name}");
                Ok(arr.value(i))
            };

            let record = PatientRecord {
                age: number(&age, columns::AGE)? as i64,
                gender: get_string(gender.as_ref(), i)
                    .ok_or_else(|| anyhow::anyhow!("row {row}: missing {}", columns::GENDER))?,
                symptoms: get_string(symptoms.as_ref(), i)
                    .map(|s| split_multi_value(&s))
                    .unwrap_or_default(),
                blood_pressure_systolic: number(&bp, columns::SYSTOLIC_BP)? as i64,
                heart_rate: number(&hr, columns::HEART_RATE)? as i64,
                temperature_f: number(&temp, columns::TEMPERATURE_F)?,
                pre_existing_conditions: get_string(conditions.as_ref(), i)
                    .map(|s| split_multi_value(&s))
                    .unwrap_or_default(),
            };

            out.push(LabelledRecord {
                row,
                record,
                risk_level: risk.and_then(|c| get_string(c.as_ref(), i)),
                department: dept.and_then(|c| get_string(c.as_ref(), i)),
            });
        }
        row_base += batch.num_rows();
    }

    Ok(out)
}

/// Classify every record and compare against its ground truth.
pub fn evaluate(
    service: &InferenceService,
    records: &[LabelledRecord],
) -> anyhow::Result<Evaluation> {
    let mut rows = Vec::with_capacity(records.len());
    let mut risk_summary = TargetSummary::default();
    let mut dept_summary = TargetSummary::default();

    for labelled in records {
        let result = service
            .classify(&labelled.record)
            .with_context(|| format!("classifying row {}", labelled.row))?;

        let risk_status =
            ClassificationStatus::compare(&result.risk_level, labelled.risk_level.as_deref());
        let dept_status =
            ClassificationStatus::compare(&result.department, labelled.department.as_deref());
        risk_summary.record(risk_status);
        dept_summary.record(dept_status);

        rows.push(RowOutcome {
            row: labelled.row,
            risk: TargetOutcome {
                predicted: result.risk_level,
                confidence: result.risk_confidence,
                expected: labelled.risk_level.clone(),
                status: risk_status,
            },
            department: TargetOutcome {
                predicted: result.department,
                confidence: result.department_confidence,
                expected: labelled.department.clone(),
                status: dept_status,
            },
        });
    }

    info!(
        rows = rows.len(),
        risk_accuracy = ?risk_summary.accuracy(),
        department_accuracy = ?dept_summary.accuracy(),
        "evaluation complete"
    );
    Ok(Evaluation {
        rows,
        risk: risk_summary,
        department: dept_summary,
    })
}

// ── Arrow extraction helpers ──

fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow::anyhow!("missing '{name}' column"))
}

/// Cast an integer, float, or text column to Float64 (unparseable → null).
fn numeric_column(batch: &RecordBatch, name: &str) -> anyhow::Result<Float64Array> {
    let col = required_column(batch, name)?;
    let cast_col = cast(col, &DataType::Float64).with_context(|| format!("'{name}' column"))?;
    cast_col
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("'{name}' column is not numeric"))
}

/// Extract a string value from an Arrow array (handles Utf8 and LargeUtf8).
fn get_string(col: &dyn Array, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|arr| arr.value(row).to_string())
        .or_else(|| {
            col.as_any()
                .downcast_ref::<LargeStringArray>()
                .map(|arr| arr.value(row).to_string())
        })
}
