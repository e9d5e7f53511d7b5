//! Inference orchestration: coerce → encode → score ×2 → decode ×2.
//!
//! [`InferenceService`] holds the bundle behind an `Arc` and never mutates
//! it, so one instance can be cloned into any number of concurrent request
//! handlers without locking.

use std::sync::Arc;

use tracing::debug;
use triage_core::{ModelInfo, ModelMetadata, PatientRecord, PatientRequest, TriageClassification};

use crate::bundle::Bundle;
use crate::encoder::{self, CategoryPolicy, FeatureVector};
use crate::error::ClassifyError;
use crate::forest::score;
use crate::labels::decode;

#[derive(Debug, Clone)]
pub struct InferenceService {
    bundle: Arc<Bundle>,
    policy: CategoryPolicy,
}

impl InferenceService {
    pub fn new(bundle: Arc<Bundle>) -> Self {
        Self {
            bundle,
            policy: CategoryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CategoryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    /// Coerce a raw request body, then classify it.
    pub fn classify_request(
        &self,
        request: &PatientRequest,
    ) -> Result<TriageClassification, ClassifyError> {
        let record = request.into_record()?;
        self.classify(&record)
    }

    /// Classify a typed record. Both classifiers are scored or neither is.
    pub fn classify(&self, record: &PatientRecord) -> Result<TriageClassification, ClassifyError> {
        let features = self.encode(record)?;
        let vocab = self.bundle.vocab();

        let risk = decode(vocab.risk_classes(), &score(self.bundle.risk(), &features));
        let department = decode(
            vocab.department_classes(),
            &score(self.bundle.department(), &features),
        );

        debug!(
            risk = %risk.label,
            risk_confidence = risk.confidence,
            department = %department.label,
            department_confidence = department.confidence,
            "classified patient"
        );
        Ok(TriageClassification::from_parts(risk, department))
    }

    /// Encode a record under the service's category policy.
    pub fn encode(&self, record: &PatientRecord) -> Result<FeatureVector, ClassifyError> {
        let vocab = self.bundle.vocab();
        if self.policy == CategoryPolicy::Strict {
            let unknown = encoder::unrecognised(vocab, record);
            if !unknown.is_empty() {
                return Err(ClassifyError::UnknownCategory(unknown));
            }
        }
        Ok(encoder::encode(vocab, record))
    }

    /// Static model summary for health checks.
    pub fn health(&self) -> ModelInfo {
        self.bundle.model_info()
    }

    pub fn metadata(&self) -> &ModelMetadata {
        self.bundle.metadata()
    }
}
