//! Inference layer: feature encoding, decision-forest scoring, label
//! decoding, and the bundle that ties them to one fitting run.

pub mod bundle;
pub mod encoder;
pub mod error;
pub mod evaluate;
pub mod forest;
pub mod labels;
pub mod service;

pub use bundle::Bundle;
pub use encoder::{CategoryPolicy, FeatureVector};
pub use error::{BundleError, ClassifyError, ModelKind};
pub use forest::{Classifier, Forest, ForestError, Scored};
pub use service::InferenceService;
