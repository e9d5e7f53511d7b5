//! Patient record → fixed-schema feature vector.
//!
//! Reproduces the fit-time feature construction exactly: four raw vitals,
//! four derived buckets/flags, two counts, a gender one-hot block, then one
//! bit per symptom and per condition in vocabulary order.

use std::ops::Deref;

use tracing::debug;
use triage_core::patient::is_none_marker;
use triage_core::schema::features;
use triage_core::{CategoryKind, PatientRecord, Vocabulary};

/// How values missing from the vocabulary are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryPolicy {
    /// Unknown values contribute no bit (counts still include them).
    #[default]
    Lenient,
    /// Unknown values reject the whole record.
    Strict,
}

/// Encoded feature vector in fit-time column order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl Deref for FeatureVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

pub fn age_bucket(age: i64) -> u8 {
    match age {
        ..=12 => 0,
        ..=30 => 1,
        ..=50 => 2,
        ..=70 => 3,
        _ => 4,
    }
}

pub fn bp_bucket(systolic: i64) -> u8 {
    match systolic {
        ..=90 => 0,
        ..=120 => 1,
        ..=140 => 2,
        _ => 3,
    }
}

pub fn hr_bucket(heart_rate: i64) -> u8 {
    match heart_rate {
        ..=60 => 0,
        ..=80 => 1,
        ..=100 => 2,
        _ => 3,
    }
}

/// Strictly above 100.4 °F.
pub fn has_fever(temperature_f: f64) -> bool {
    temperature_f > 100.4
}

/// Encode a record against `vocab`.
///
/// Never fails: gender, symptom, and condition values absent from the
/// vocabulary simply leave their bits at zero.
pub fn encode(vocab: &Vocabulary, record: &PatientRecord) -> FeatureVector {
    let mut v = vec![0.0f64; vocab.feature_len()];

    v[features::AGE] = record.age as f64;
    v[features::SYSTOLIC_BP] = record.blood_pressure_systolic as f64;
    v[features::HEART_RATE] = record.heart_rate as f64;
    v[features::TEMPERATURE_F] = record.temperature_f;
    v[features::AGE_BUCKET] = age_bucket(record.age) as f64;
    v[features::BP_BUCKET] = bp_bucket(record.blood_pressure_systolic) as f64;
    v[features::HR_BUCKET] = hr_bucket(record.heart_rate) as f64;
    v[features::HAS_FEVER] = if has_fever(record.temperature_f) { 1.0 } else { 0.0 };
    v[features::SYMPTOM_COUNT] = record.symptoms.len() as f64;
    v[features::CONDITION_COUNT] = record.present_conditions().count() as f64;

    if let Some(pos) = Vocabulary::gender_position(&record.gender) {
        v[features::GENDER_OFFSET + pos] = 1.0;
    }

    for symptom in &record.symptoms {
        if let Some(pos) = vocab.symptom_position(symptom) {
            v[features::SYMPTOM_OFFSET + pos] = 1.0;
        }
    }

    let condition_offset = vocab.condition_offset();
    for condition in record.present_conditions() {
        if let Some(pos) = vocab.condition_position(condition) {
            v[condition_offset + pos] = 1.0;
        }
    }

    FeatureVector(v)
}

/// Values in `record` that the vocabulary does not know, in input order.
///
/// "none" condition placeholders are not reported.
pub fn unrecognised(vocab: &Vocabulary, record: &PatientRecord) -> Vec<(CategoryKind, String)> {
    let mut unknown = Vec::new();
    if Vocabulary::gender_position(&record.gender).is_none() {
        unknown.push((CategoryKind::Gender, record.gender.clone()));
    }
    unknown.extend(
        record
            .symptoms
            .iter()
            .filter(|s| vocab.symptom_position(s).is_none())
            .map(|s| (CategoryKind::Symptom, s.clone())),
    );
    unknown.extend(
        record
            .pre_existing_conditions
            .iter()
            .filter(|c| !is_none_marker(c) && vocab.condition_position(c).is_none())
            .map(|c| (CategoryKind::Condition, c.clone())),
    );
    if !unknown.is_empty() {
        debug!(count = unknown.len(), "record has values outside the vocabulary");
    }
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn vocab() -> Vocabulary {
        Vocabulary::new(
            strings(&["Chest Pain", "Cough", "Fever", "Shortness of Breath"]),
            strings(&["Asthma", "Diabetes", "Heart Disease"]),
            strings(&["High", "Low", "Medium"]),
            strings(&["Cardiology", "General Medicine", "Pulmonology"]),
        )
        .unwrap()
    }

    fn cardiac() -> PatientRecord {
        PatientRecord {
            age: 65,
            gender: "Male".into(),
            symptoms: strings(&["Chest Pain", "Shortness of Breath"]),
            blood_pressure_systolic: 165,
            heart_rate: 110,
            temperature_f: 99.2,
            pre_existing_conditions: strings(&["Heart Disease", "Diabetes"]),
        }
    }

    #[test]
    fn vector_length_matches_schema() {
        let v = vocab();
        let encoded = encode(&v, &cardiac());
        assert_eq!(encoded.len(), 10 + 3 + 4 + 3);
        assert_eq!(encoded.len(), v.feature_len());
    }

    #[test]
    fn cardiac_record_encodes_expected_layout() {
        let e = encode(&vocab(), &cardiac());
        assert_eq!(
            e.to_vec(),
            vec![
                65.0, 165.0, 110.0, 99.2, // raw vitals
                3.0, 3.0, 3.0, 0.0, // buckets, fever
                2.0, 2.0, // counts
                0.0, 1.0, 0.0, // gender
                1.0, 0.0, 0.0, 1.0, // symptoms
                0.0, 1.0, 1.0, // conditions
            ]
        );
    }

    #[test]
    fn age_bucket_boundaries() {
        let cases = [
            (12, 0),
            (13, 1),
            (30, 1),
            (31, 2),
            (50, 2),
            (51, 3),
            (70, 3),
            (71, 4),
            (-5, 0),
            (120, 4),
        ];
        for (age, bucket) in cases {
            assert_eq!(age_bucket(age), bucket, "age {age}");
        }
    }

    #[test]
    fn bp_and_hr_bucket_boundaries() {
        assert_eq!(bp_bucket(90), 0);
        assert_eq!(bp_bucket(91), 1);
        assert_eq!(bp_bucket(120), 1);
        assert_eq!(bp_bucket(140), 2);
        assert_eq!(bp_bucket(141), 3);
        assert_eq!(hr_bucket(60), 0);
        assert_eq!(hr_bucket(61), 1);
        assert_eq!(hr_bucket(80), 1);
        assert_eq!(hr_bucket(100), 2);
        assert_eq!(hr_bucket(101), 3);
        assert_eq!(hr_bucket(-10), 0);
    }

    #[test]
    fn fever_threshold_is_strict() {
        assert!(!has_fever(100.4));
        assert!(has_fever(100.5));
        let record = PatientRecord {
            temperature_f: 100.4,
            ..PatientRecord::default()
        };
        assert_eq!(encode(&vocab(), &record)[features::HAS_FEVER], 0.0);
        let record = PatientRecord {
            temperature_f: 100.5,
            ..PatientRecord::default()
        };
        assert_eq!(encode(&vocab(), &record)[features::HAS_FEVER], 1.0);
    }

    #[test]
    fn condition_count_skips_none_in_any_case() {
        let record = PatientRecord {
            pre_existing_conditions: strings(&["none", "None", "NONE", "Asthma", "Gout"]),
            ..PatientRecord::default()
        };
        let v = vocab();
        let e = encode(&v, &record);
        assert_eq!(e[features::CONDITION_COUNT], 2.0);
        let conds = &e[v.condition_offset()..];
        assert_eq!(conds, &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_symptom_counts_but_sets_no_bit() {
        let v = vocab();
        let with_unknown = PatientRecord {
            symptoms: strings(&["Cough", "Hiccups"]),
            ..PatientRecord::default()
        };
        let without = PatientRecord {
            symptoms: strings(&["Cough"]),
            ..PatientRecord::default()
        };
        let a = encode(&v, &with_unknown);
        let b = encode(&v, &without);
        assert_eq!(a[features::SYMPTOM_COUNT], 2.0);
        assert_eq!(b[features::SYMPTOM_COUNT], 1.0);
        let bits = features::SYMPTOM_OFFSET..v.condition_offset();
        assert_eq!(a[bits.clone()], b[bits]);
    }

    #[test]
    fn duplicate_symptoms_count_twice_set_one_bit() {
        let v = vocab();
        let record = PatientRecord {
            symptoms: strings(&["Cough", "Cough"]),
            ..PatientRecord::default()
        };
        let e = encode(&v, &record);
        assert_eq!(e[features::SYMPTOM_COUNT], 2.0);
        assert_eq!(e[features::SYMPTOM_OFFSET + 1], 1.0);
    }

    #[test]
    fn unknown_gender_zeroes_one_hot() {
        let record = PatientRecord {
            gender: "Unknown".into(),
            ..PatientRecord::default()
        };
        let e = encode(&vocab(), &record);
        let gender = &e[features::GENDER_OFFSET..features::SYMPTOM_OFFSET];
        assert_eq!(gender, &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn gender_match_is_case_sensitive() {
        let record = PatientRecord {
            gender: "female".into(),
            ..PatientRecord::default()
        };
        let e = encode(&vocab(), &record);
        assert_eq!(e[features::GENDER_OFFSET], 0.0);
    }

    #[test]
    fn empty_lists_encode_to_zero_counts_and_bits() {
        let v = vocab();
        let record = PatientRecord {
            gender: "Female".into(),
            ..PatientRecord::default()
        };
        let e = encode(&v, &record);
        assert_eq!(e[features::SYMPTOM_COUNT], 0.0);
        assert_eq!(e[features::CONDITION_COUNT], 0.0);
        assert!(e[features::SYMPTOM_OFFSET..].iter().all(|&b| b == 0.0));
    }

    #[test]
    fn unrecognised_lists_every_unknown_value() {
        let record = PatientRecord {
            gender: "Unknown".into(),
            symptoms: strings(&["Cough", "Hiccups"]),
            pre_existing_conditions: strings(&["None", "Gout", "Asthma"]),
            ..PatientRecord::default()
        };
        let unknown = unrecognised(&vocab(), &record);
        assert_eq!(
            unknown,
            vec![
                (CategoryKind::Gender, "Unknown".to_string()),
                (CategoryKind::Symptom, "Hiccups".to_string()),
                (CategoryKind::Condition, "Gout".to_string()),
            ]
        );
    }

    #[test]
    fn known_record_has_nothing_unrecognised() {
        assert!(unrecognised(&vocab(), &cardiac()).is_empty());
    }
}
