use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use triage_core::{CategoryKind, FieldError, VocabError};

use crate::forest::ForestError;

/// Which of the two classifiers an error concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Risk,
    Department,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Risk => "risk",
            Self::Department => "department",
        })
    }
}

/// The artifact bundle could not be loaded; the process must not serve.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("artifact not found: {0}")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid {model} classifier export: {source}")]
    Forest {
        model: ModelKind,
        source: ForestError,
    },

    #[error("invalid vocabulary: {0}")]
    Vocab(#[from] VocabError),

    #[error("metadata declares {declared} features, vocabularies imply {derived}")]
    FeatureCount { declared: usize, derived: usize },

    #[error("feature column {position}: expected '{expected}', metadata lists '{found}'")]
    FeatureColumn {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{model} classifier expects {found} features, schema has {expected}")]
    Dimension {
        model: ModelKind,
        expected: usize,
        found: usize,
    },

    #[error("{model} classifier has {classes} classes, label space has {labels}")]
    ClassCount {
        model: ModelKind,
        labels: usize,
        classes: usize,
    },

    #[error("{model} classifier class {position} is '{found}', label space has '{expected}'")]
    ClassOrder {
        model: ModelKind,
        position: usize,
        expected: String,
        found: String,
    },
}

/// Per-request classification failure. The service keeps serving.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("unrecognised values: {}", format_unknown(.0))]
    UnknownCategory(Vec<(CategoryKind, String)>),

    #[error("failed to serialise result: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_unknown(values: &[(CategoryKind, String)]) -> String {
    values
        .iter()
        .map(|(kind, value)| format!("{kind} '{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
