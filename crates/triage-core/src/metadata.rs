//! Metadata document written by the offline fitting run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Contents of `feature_metadata.json`.
///
/// Keys this crate does not interpret are kept in `extra` so the metadata
/// endpoint can echo the document verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_columns: Vec<String>,
    pub symptom_classes: Vec<String>,
    pub condition_classes: Vec<String>,
    pub gender_categories: Vec<String>,
    pub risk_classes: Vec<String>,
    pub dept_classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub numeric_features: Vec<String>,
    pub model_metrics: ModelMetrics,
    pub training_samples: u64,
    pub feature_count: usize,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Hold-out and cross-validation accuracy reported at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub risk_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_cv_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_cv_std: Option<f64>,
    pub dept_accuracy: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept_cv_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept_cv_std: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Read-only summary served by health checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub risk_accuracy: f64,
    pub dept_accuracy: f64,
    pub features: usize,
    pub training_samples: u64,
    pub symptom_classes: Vec<String>,
    pub department_classes: Vec<String>,
    pub risk_classes: Vec<String>,
}

impl ModelMetadata {
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            risk_accuracy: self.model_metrics.risk_accuracy,
            dept_accuracy: self.model_metrics.dept_accuracy,
            features: self.feature_count,
            training_samples: self.training_samples,
            symptom_classes: self.symptom_classes.clone(),
            department_classes: self.dept_classes.clone(),
            risk_classes: self.risk_classes.clone(),
        }
    }
}
