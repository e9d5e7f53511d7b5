//! Patient records and coercion of loosely-typed request bodies.
//!
//! Transport adapters receive JSON where numbers may arrive as strings and
//! multi-value fields may arrive as either arrays or comma-separated text.
//! [`PatientRequest`] captures the raw values; [`PatientRequest::into_record`]
//! coerces them into a typed [`PatientRecord`] or reports the first field
//! that cannot be coerced.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_AGE: i64 = 0;
pub const DEFAULT_GENDER: &str = "Other";
pub const DEFAULT_SYSTOLIC_BP: i64 = 120;
pub const DEFAULT_HEART_RATE: i64 = 80;
pub const DEFAULT_TEMPERATURE_F: f64 = 98.6;

/// A single patient's vitals and categorical observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub age: i64,
    pub gender: String,
    pub symptoms: Vec<String>,
    pub blood_pressure_systolic: i64,
    pub heart_rate: i64,
    pub temperature_f: f64,
    pub pre_existing_conditions: Vec<String>,
}

impl Default for PatientRecord {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            gender: DEFAULT_GENDER.to_string(),
            symptoms: Vec::new(),
            blood_pressure_systolic: DEFAULT_SYSTOLIC_BP,
            heart_rate: DEFAULT_HEART_RATE,
            temperature_f: DEFAULT_TEMPERATURE_F,
            pre_existing_conditions: Vec::new(),
        }
    }
}

impl PatientRecord {
    /// Conditions with "none" placeholders (any case) removed.
    pub fn present_conditions(&self) -> impl Iterator<Item = &str> {
        self.pre_existing_conditions
            .iter()
            .map(|c| c.as_str())
            .filter(|c| !is_none_marker(c))
    }
}

/// True for the "no condition" placeholder the dataset uses.
pub fn is_none_marker(value: &str) -> bool {
    value.to_lowercase() == "none"
}

/// Split a comma-separated multi-value field, trimming each segment.
///
/// Empty segments are kept, as the fitting run keeps them: `"Fever, , Cough"`
/// has three entries and `""` has one.
pub fn split_multi_value(text: &str) -> Vec<String> {
    text.split(',').map(|s| s.trim().to_string()).collect()
}

/// A field could not be coerced to the type the encoder needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' expected {expected}, got {found}")]
pub struct FieldError {
    pub field: &'static str,
    pub expected: &'static str,
    pub found: String,
}

impl FieldError {
    fn new(field: &'static str, expected: &'static str, found: &Value) -> Self {
        Self {
            field,
            expected,
            found: found.to_string(),
        }
    }
}

/// Raw request body as received by a transport adapter.
///
/// Every field is optional. Absent fields take the documented defaults
/// during [`into_record`](Self::into_record); an explicit `null` is kept as
/// `Some(Value::Null)` and coerced like any other value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientRequest {
    #[serde(default, deserialize_with = "keep_null")]
    pub age: Option<Value>,
    #[serde(default, deserialize_with = "keep_null")]
    pub gender: Option<Value>,
    #[serde(default, deserialize_with = "keep_null")]
    pub symptoms: Option<Value>,
    #[serde(default, deserialize_with = "keep_null")]
    pub blood_pressure_systolic: Option<Value>,
    #[serde(default, deserialize_with = "keep_null")]
    pub heart_rate: Option<Value>,
    #[serde(default, deserialize_with = "keep_null")]
    pub temperature_f: Option<Value>,
    #[serde(default, deserialize_with = "keep_null")]
    pub pre_existing_conditions: Option<Value>,
}

impl PatientRequest {
    /// Coerce the raw values into a typed record.
    pub fn into_record(&self) -> Result<PatientRecord, FieldError> {
        Ok(PatientRecord {
            age: coerce_int("age", self.age.as_ref(), DEFAULT_AGE)?,
            gender: coerce_text("gender", self.gender.as_ref(), DEFAULT_GENDER)?,
            symptoms: coerce_list("symptoms", self.symptoms.as_ref())?,
            blood_pressure_systolic: coerce_int(
                "blood_pressure_systolic",
                self.blood_pressure_systolic.as_ref(),
                DEFAULT_SYSTOLIC_BP,
            )?,
            heart_rate: coerce_int("heart_rate", self.heart_rate.as_ref(), DEFAULT_HEART_RATE)?,
            temperature_f: coerce_float(
                "temperature_f",
                self.temperature_f.as_ref(),
                DEFAULT_TEMPERATURE_F,
            )?,
            pre_existing_conditions: coerce_list(
                "pre_existing_conditions",
                self.pre_existing_conditions.as_ref(),
            )?,
        })
    }
}

/// `Option<Value>` would collapse `null` into `None`; keep the two apart.
fn keep_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn coerce_int(field: &'static str, value: Option<&Value>, default: i64) -> Result<i64, FieldError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let err = || FieldError::new(field, "an integer", value);
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                // Fractional input truncates toward zero.
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
                    .ok_or_else(err)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| err()),
        _ => Err(err()),
    }
}

fn coerce_float(
    field: &'static str,
    value: Option<&Value>,
    default: f64,
) -> Result<f64, FieldError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let err = || FieldError::new(field, "a number", value);
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(err),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| err()),
        _ => Err(err()),
    }
}

fn coerce_text(
    field: &'static str,
    value: Option<&Value>,
    default: &str,
) -> Result<String, FieldError> {
    match value {
        None => Ok(default.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        // `null` renders as "null", which matches no gender category.
        Some(v @ (Value::Null | Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
        Some(other) => Err(FieldError::new(field, "a string", other)),
    }
}

fn coerce_list(field: &'static str, value: Option<&Value>) -> Result<Vec<String>, FieldError> {
    const EXPECTED: &str = "a list of strings or a comma-separated string";
    match value {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(split_multi_value(s)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(FieldError::new(field, EXPECTED, item)),
            })
            .collect(),
        Some(other) => Err(FieldError::new(field, EXPECTED, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> PatientRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_request_takes_defaults() {
        let record = request(json!({})).into_record().unwrap();
        assert_eq!(record, PatientRecord::default());
        assert_eq!(record.gender, "Other");
        assert_eq!(record.blood_pressure_systolic, 120);
        assert_eq!(record.heart_rate, 80);
        assert!((record.temperature_f - 98.6).abs() < 1e-9);
    }

    #[test]
    fn null_numeric_fields_are_field_errors() {
        for field in ["age", "blood_pressure_systolic", "heart_rate", "temperature_f"] {
            let mut body = serde_json::Map::new();
            body.insert(field.to_string(), Value::Null);
            let err = request(Value::Object(body)).into_record().unwrap_err();
            assert_eq!(err.field, field);
            assert_eq!(err.found, "null");
        }
    }

    #[test]
    fn null_lists_are_field_errors() {
        let err = request(json!({"symptoms": null})).into_record().unwrap_err();
        assert_eq!(err.field, "symptoms");
    }

    #[test]
    fn null_gender_matches_no_category() {
        let req = request(json!({"gender": null}));
        assert_eq!(req.gender, Some(Value::Null));
        let record = req.into_record().unwrap();
        assert_ne!(record.gender, DEFAULT_GENDER);
        assert_eq!(record.gender, "null");
    }

    #[test]
    fn absent_and_null_are_distinguished() {
        let req = request(json!({"age": null}));
        assert_eq!(req.age, Some(Value::Null));
        assert_eq!(req.heart_rate, None);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let record = request(json!({
            "age": " 65 ",
            "blood_pressure_systolic": "165",
            "heart_rate": 110,
            "temperature_f": "99.2"
        }))
        .into_record()
        .unwrap();
        assert_eq!(record.age, 65);
        assert_eq!(record.blood_pressure_systolic, 165);
        assert_eq!(record.heart_rate, 110);
        assert!((record.temperature_f - 99.2).abs() < 1e-9);
    }

    #[test]
    fn fractional_integers_truncate() {
        let record = request(json!({"age": 41.9, "heart_rate": -3.7}))
            .into_record()
            .unwrap();
        assert_eq!(record.age, 41);
        assert_eq!(record.heart_rate, -3);
    }

    #[test]
    fn non_numeric_age_is_a_field_error() {
        let err = request(json!({"age": "sixty"})).into_record().unwrap_err();
        assert_eq!(err.field, "age");
        assert!(err.to_string().contains("expected an integer"));
    }

    #[test]
    fn non_numeric_temperature_is_a_field_error() {
        let err = request(json!({"temperature_f": [98.6]}))
            .into_record()
            .unwrap_err();
        assert_eq!(err.field, "temperature_f");
    }

    #[test]
    fn comma_separated_lists_are_split_and_trimmed() {
        let record = request(json!({
            "symptoms": "Chest Pain, Shortness of Breath ,",
            "pre_existing_conditions": "None"
        }))
        .into_record()
        .unwrap();
        assert_eq!(record.symptoms, vec!["Chest Pain", "Shortness of Breath", ""]);
        assert_eq!(record.pre_existing_conditions, vec!["None"]);
    }

    #[test]
    fn empty_comma_segments_are_kept() {
        let record = request(json!({"symptoms": "Fever, , Cough"}))
            .into_record()
            .unwrap();
        assert_eq!(record.symptoms, vec!["Fever", "", "Cough"]);
        assert_eq!(record.symptoms.len(), 3);

        let record = request(json!({"symptoms": ""})).into_record().unwrap();
        assert_eq!(record.symptoms, vec![""]);
    }

    #[test]
    fn list_with_non_string_item_is_rejected() {
        let err = request(json!({"symptoms": ["Cough", 3]}))
            .into_record()
            .unwrap_err();
        assert_eq!(err.field, "symptoms");
    }

    #[test]
    fn scalar_gender_is_rendered_as_text() {
        let record = request(json!({"gender": 1})).into_record().unwrap();
        assert_eq!(record.gender, "1");
        let err = request(json!({"gender": {"x": 1}})).into_record().unwrap_err();
        assert_eq!(err.field, "gender");
    }

    #[test]
    fn present_conditions_skip_none_markers() {
        let record = PatientRecord {
            pre_existing_conditions: vec![
                "none".into(),
                "Diabetes".into(),
                "NONE".into(),
                "Unlisted".into(),
            ],
            ..PatientRecord::default()
        };
        let present: Vec<&str> = record.present_conditions().collect();
        assert_eq!(present, vec!["Diabetes", "Unlisted"]);
    }
}
