//! Versioned artifact bundle: vocabularies, label spaces, and two fitted
//! classifiers, loaded once at startup and shared read-only afterwards.
//!
//! A bundle directory must contain:
//!
//! - `feature_metadata.json`: the fitting run's metadata document
//! - `risk_classifier.json`: forest export for the risk level
//! - `dept_classifier.json`: forest export for the department
//!
//! Every cross-artifact contract is checked here so that a schema drift
//! between fit time and encode time fails the load instead of producing
//! plausible but wrong answers at request time.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::info;
use triage_core::{LabelSpace, ModelInfo, ModelMetadata, Vocabulary};

use crate::error::{BundleError, ModelKind};
use crate::forest::{Classifier, Forest, ForestExport};

pub const METADATA_FILE: &str = "feature_metadata.json";
pub const RISK_MODEL_FILE: &str = "risk_classifier.json";
pub const DEPARTMENT_MODEL_FILE: &str = "dept_classifier.json";

/// Immutable, validated model bundle.
pub struct Bundle {
    metadata: ModelMetadata,
    vocab: Vocabulary,
    risk: Box<dyn Classifier>,
    department: Box<dyn Classifier>,
    loaded_at: DateTime<Utc>,
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("features", &self.vocab.feature_len())
            .field("risk_classes", &self.vocab.risk_classes().labels())
            .field("department_classes", &self.vocab.department_classes().labels())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

impl Bundle {
    /// Load and validate a bundle directory.
    pub fn load(dir: &Path) -> Result<Self, BundleError> {
        let metadata: ModelMetadata = read_json(&dir.join(METADATA_FILE))?;
        let risk = load_forest(&dir.join(RISK_MODEL_FILE), ModelKind::Risk)?;
        let department = load_forest(&dir.join(DEPARTMENT_MODEL_FILE), ModelKind::Department)?;

        let bundle = Self::from_parts(metadata, Box::new(risk), Box::new(department))?;
        info!(
            dir = %dir.display(),
            features = bundle.vocab.feature_len(),
            samples = bundle.metadata.training_samples,
            "loaded model bundle"
        );
        Ok(bundle)
    }

    /// Assemble a bundle from already-parsed parts, running every check
    /// [`load`](Self::load) runs.
    pub fn from_parts(
        metadata: ModelMetadata,
        risk: Box<dyn Classifier>,
        department: Box<dyn Classifier>,
    ) -> Result<Self, BundleError> {
        let vocab = Vocabulary::from_metadata(&metadata)?;
        let derived = vocab.feature_len();

        if metadata.feature_count != derived {
            return Err(BundleError::FeatureCount {
                declared: metadata.feature_count,
                derived,
            });
        }
        if !metadata.feature_columns.is_empty() {
            check_columns(&metadata.feature_columns, &vocab.feature_columns())?;
        }

        check_classifier(ModelKind::Risk, risk.as_ref(), vocab.risk_classes(), derived)?;
        check_classifier(
            ModelKind::Department,
            department.as_ref(),
            vocab.department_classes(),
            derived,
        )?;

        Ok(Self {
            metadata,
            vocab,
            risk,
            department,
            loaded_at: Utc::now(),
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn risk(&self) -> &dyn Classifier {
        self.risk.as_ref()
    }

    pub fn department(&self) -> &dyn Classifier {
        self.department.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn model_info(&self) -> ModelInfo {
        self.metadata.model_info()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    if !path.exists() {
        return Err(BundleError::Missing(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| BundleError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn load_forest(path: &Path, model: ModelKind) -> Result<Forest, BundleError> {
    let export: ForestExport = read_json(path)?;
    let forest =
        Forest::from_export(export).map_err(|source| BundleError::Forest { model, source })?;
    info!(%model, trees = forest.tree_count(), "loaded classifier");
    Ok(forest)
}

fn check_columns(declared: &[String], derived: &[String]) -> Result<(), BundleError> {
    let len = declared.len().max(derived.len());
    for position in 0..len {
        let expected = derived.get(position);
        let found = declared.get(position);
        if expected != found {
            return Err(BundleError::FeatureColumn {
                position,
                expected: expected.cloned().unwrap_or_default(),
                found: found.cloned().unwrap_or_default(),
            });
        }
    }
    Ok(())
}

fn check_classifier(
    model: ModelKind,
    classifier: &dyn Classifier,
    space: &LabelSpace,
    schema_len: usize,
) -> Result<(), BundleError> {
    if classifier.n_features() != schema_len {
        return Err(BundleError::Dimension {
            model,
            expected: schema_len,
            found: classifier.n_features(),
        });
    }
    if classifier.n_classes() != space.len() {
        return Err(BundleError::ClassCount {
            model,
            labels: space.len(),
            classes: classifier.n_classes(),
        });
    }
    if let Some(classes) = classifier.classes() {
        for (position, (found, expected)) in classes.iter().zip(space.labels()).enumerate() {
            if found != expected {
                return Err(BundleError::ClassOrder {
                    model,
                    position,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture_dir;
    use serde_json::Value;
    use std::path::PathBuf;

    /// Copy the fixture bundle into a temp dir, letting `edit` rewrite one file.
    fn patched_bundle(file: &str, edit: impl FnOnce(&mut Value)) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let mut edit = Some(edit);
        for name in [METADATA_FILE, RISK_MODEL_FILE, DEPARTMENT_MODEL_FILE] {
            let src = fixture_dir().join(name);
            let dst: PathBuf = tmp.path().join(name);
            if name == file {
                let mut doc: Value =
                    serde_json::from_str(&std::fs::read_to_string(&src).unwrap()).unwrap();
                (edit.take().unwrap())(&mut doc);
                std::fs::write(&dst, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
            } else {
                std::fs::copy(&src, &dst).unwrap();
            }
        }
        tmp
    }

    #[test]
    fn loads_fixture_bundle() {
        let bundle = Bundle::load(&fixture_dir()).unwrap();
        assert_eq!(bundle.vocab().feature_len(), 28);
        assert_eq!(bundle.risk().n_features(), 28);
        assert_eq!(bundle.department().n_classes(), 4);
        assert_eq!(bundle.model_info().training_samples, 1200);
    }

    #[test]
    fn missing_directory_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Bundle::load(&tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, BundleError::Missing(ref p) if p.ends_with(METADATA_FILE)));
    }

    #[test]
    fn missing_classifier_is_reported() {
        let tmp = patched_bundle(METADATA_FILE, |_| {});
        std::fs::remove_file(tmp.path().join(DEPARTMENT_MODEL_FILE)).unwrap();
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BundleError::Missing(ref p) if p.ends_with(DEPARTMENT_MODEL_FILE)));
    }

    #[test]
    fn corrupt_json_is_reported() {
        let tmp = patched_bundle(METADATA_FILE, |_| {});
        std::fs::write(tmp.path().join(RISK_MODEL_FILE), "{not json").unwrap();
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BundleError::Json { .. }));
    }

    #[test]
    fn feature_count_drift_is_fatal() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["feature_count"] = Value::from(27);
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::FeatureCount {
                declared: 27,
                derived: 28
            }
        ));
    }

    #[test]
    fn extra_vocabulary_entry_is_a_dimension_mismatch() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["symptom_classes"]
                .as_array_mut()
                .unwrap()
                .push(Value::from("Rash"));
            doc["feature_count"] = Value::from(29);
            doc.as_object_mut().unwrap().remove("feature_columns");
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::Dimension {
                model: ModelKind::Risk,
                expected: 29,
                found: 28
            }
        ));
    }

    #[test]
    fn reordered_vocabulary_is_caught_by_column_names() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["symptom_classes"].as_array_mut().unwrap().swap(0, 1);
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        match err {
            BundleError::FeatureColumn {
                position, expected, ..
            } => {
                assert_eq!(position, 13);
                assert_eq!(expected, "symptom_blurred_vision");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reordered_label_space_is_caught_by_class_names() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["risk_classes"].as_array_mut().unwrap().swap(0, 2);
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::ClassOrder {
                model: ModelKind::Risk,
                position: 0,
                ..
            }
        ));
    }

    #[test]
    fn label_space_size_mismatch_is_fatal() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["dept_classes"]
                .as_array_mut()
                .unwrap()
                .push(Value::from("Orthopedics"));
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::ClassCount {
                model: ModelKind::Department,
                labels: 5,
                classes: 4
            }
        ));
    }

    #[test]
    fn duplicate_label_is_fatal() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["risk_classes"] = serde_json::json!(["High", "Low", "Low"]);
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BundleError::Vocab(_)));
    }

    #[test]
    fn wrong_gender_categories_are_fatal() {
        let tmp = patched_bundle(METADATA_FILE, |doc| {
            doc["gender_categories"] = serde_json::json!(["gender_Female", "gender_Male"]);
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(err, BundleError::Vocab(_)));
    }

    #[test]
    fn invalid_forest_names_the_model() {
        let tmp = patched_bundle(DEPARTMENT_MODEL_FILE, |doc| {
            doc["trees"] = serde_json::json!([]);
        });
        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            BundleError::Forest {
                model: ModelKind::Department,
                ..
            }
        ));
    }
}
