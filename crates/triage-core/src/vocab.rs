//! Frozen vocabularies and label spaces exported by the fitting run.
//!
//! Order is load-bearing everywhere in this module: the position of a
//! symptom or condition defines its multi-label bit, and the position of a
//! label defines which probability it decodes.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::ModelMetadata;
use crate::schema::features;

/// Gender one-hot categories in encoding order.
pub const GENDER_CATEGORIES: [&str; 3] = ["Female", "Male", "Other"];

/// Which categorical input a vocabulary entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Gender,
    Symptom,
    Condition,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gender => "gender",
            Self::Symptom => "symptom",
            Self::Condition => "condition",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabError {
    #[error("label space '{0}' is empty")]
    EmptyLabelSpace(String),

    #[error("label space '{space}' lists '{label}' more than once")]
    DuplicateLabel { space: String, label: String },

    #[error("{kind} vocabulary lists '{entry}' more than once")]
    DuplicateEntry { kind: CategoryKind, entry: String },

    #[error("gender categories must be {expected:?} in order, found {found:?}")]
    GenderCategories {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Ordered output classes of one classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSpace {
    name: String,
    labels: Vec<String>,
}

impl LabelSpace {
    /// Build a label space, rejecting empty or duplicated label lists.
    pub fn new(name: impl Into<String>, labels: Vec<String>) -> Result<Self, VocabError> {
        let name = name.into();
        if labels.is_empty() {
            return Err(VocabError::EmptyLabelSpace(name));
        }
        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(VocabError::DuplicateLabel {
                    space: name,
                    label: label.clone(),
                });
            }
        }
        Ok(Self { name, labels })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Multi-label vocabulary with a position lookup.
#[derive(Debug, Clone)]
struct IndexedVocab {
    entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl IndexedVocab {
    fn new(kind: CategoryKind, entries: Vec<String>) -> Result<Self, VocabError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if index.insert(entry.clone(), pos).is_some() {
                return Err(VocabError::DuplicateEntry {
                    kind,
                    entry: entry.clone(),
                });
            }
        }
        Ok(Self { entries, index })
    }
}

/// All lookup tables needed to encode a record and decode two classifiers.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    symptoms: IndexedVocab,
    conditions: IndexedVocab,
    risk_classes: LabelSpace,
    department_classes: LabelSpace,
}

impl Vocabulary {
    pub fn new(
        symptoms: Vec<String>,
        conditions: Vec<String>,
        risk_classes: Vec<String>,
        department_classes: Vec<String>,
    ) -> Result<Self, VocabError> {
        Ok(Self {
            symptoms: IndexedVocab::new(CategoryKind::Symptom, symptoms)?,
            conditions: IndexedVocab::new(CategoryKind::Condition, conditions)?,
            risk_classes: LabelSpace::new("risk", risk_classes)?,
            department_classes: LabelSpace::new("department", department_classes)?,
        })
    }

    /// Build from the fitting run's metadata document.
    ///
    /// Gender categories may carry the dummy-column prefix (`gender_Female`)
    /// and must resolve to exactly [`GENDER_CATEGORIES`] in order.
    pub fn from_metadata(meta: &ModelMetadata) -> Result<Self, VocabError> {
        let genders: Vec<String> = meta
            .gender_categories
            .iter()
            .map(|g| {
                g.strip_prefix(features::GENDER_PREFIX)
                    .unwrap_or(g)
                    .to_string()
            })
            .collect();
        if genders != GENDER_CATEGORIES {
            return Err(VocabError::GenderCategories {
                expected: GENDER_CATEGORIES.iter().map(|s| s.to_string()).collect(),
                found: meta.gender_categories.clone(),
            });
        }

        Self::new(
            meta.symptom_classes.clone(),
            meta.condition_classes.clone(),
            meta.risk_classes.clone(),
            meta.dept_classes.clone(),
        )
    }

    pub fn symptoms(&self) -> &[String] {
        &self.symptoms.entries
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions.entries
    }

    pub fn risk_classes(&self) -> &LabelSpace {
        &self.risk_classes
    }

    pub fn department_classes(&self) -> &LabelSpace {
        &self.department_classes
    }

    /// Position of `symptom` within the symptom vocabulary (exact match).
    pub fn symptom_position(&self, symptom: &str) -> Option<usize> {
        self.symptoms.index.get(symptom).copied()
    }

    /// Position of `condition` within the condition vocabulary (exact match).
    pub fn condition_position(&self, condition: &str) -> Option<usize> {
        self.conditions.index.get(condition).copied()
    }

    /// Position of `gender` among [`GENDER_CATEGORIES`] (exact match).
    pub fn gender_position(gender: &str) -> Option<usize> {
        GENDER_CATEGORIES.iter().position(|g| *g == gender)
    }

    /// Offset of the first condition bit in the feature vector.
    pub fn condition_offset(&self) -> usize {
        features::SYMPTOM_OFFSET + self.symptoms.entries.len()
    }

    /// Feature vector length implied by these vocabularies.
    pub fn feature_len(&self) -> usize {
        features::vector_len(self.symptoms.entries.len(), self.conditions.entries.len())
    }

    /// Column names in fit-time order, as the fitting pipeline names them.
    pub fn feature_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.feature_len());
        columns.extend(features::NUMERIC_COLUMNS.iter().map(|c| c.to_string()));
        columns.extend(
            GENDER_CATEGORIES
                .iter()
                .map(|g| format!("{}{g}", features::GENDER_PREFIX)),
        );
        columns.extend(
            self.symptoms
                .entries
                .iter()
                .map(|s| features::multi_label_column(features::SYMPTOM_PREFIX, s)),
        );
        columns.extend(
            self.conditions
                .entries
                .iter()
                .map(|c| features::multi_label_column(features::CONDITION_PREFIX, c)),
        );
        columns
    }
}
