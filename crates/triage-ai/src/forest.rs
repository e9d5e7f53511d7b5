//! Decision-forest classifier over a portable JSON export.
//!
//! The fitting run exports each tree as a flat node list. A split node sends
//! a sample left when `x[feature] <= threshold`; a leaf holds per-class
//! weights. Scoring normalises each reached leaf into a distribution and
//! averages across trees.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const FORMAT_VERSION: u32 = 1;

/// Scoring contract shared by both classifiers.
///
/// Implementations must be deterministic and side-effect free.
pub trait Classifier: Send + Sync {
    /// Input dimensionality the model was fit with.
    fn n_features(&self) -> usize;

    /// Number of output classes.
    fn n_classes(&self) -> usize;

    /// Class names in output order, when the export records them.
    fn classes(&self) -> Option<&[String]> {
        None
    }

    /// Probability distribution over classes (length `n_classes`).
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;
}

/// Output of [`score`]: winning index plus the full distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub index: usize,
    pub probabilities: Vec<f64>,
}

/// Score `features` and pick the first class with the highest probability.
pub fn score(classifier: &dyn Classifier, features: &[f64]) -> Scored {
    let probabilities = classifier.predict_proba(features);
    let index = argmax(&probabilities);
    Scored {
        index,
        probabilities,
    }
}

/// Index of the first maximum; ties resolve to the lowest index.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForestError {
    #[error("unsupported export format version {0} (expected {FORMAT_VERSION})")]
    UnsupportedVersion(u32),

    #[error("forest has no trees")]
    NoTrees,

    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },

    #[error("tree {tree} node {node}: child {child} out of range or not after its parent")]
    BadChild {
        tree: usize,
        node: usize,
        child: usize,
    },

    #[error("tree {tree} node {node}: feature {feature} >= n_features {n_features}")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: usize,
        n_features: usize,
    },

    #[error("tree {tree} node {node}: non-finite split threshold")]
    BadThreshold { tree: usize, node: usize },

    #[error("tree {tree} node {node}: leaf has {found} class weights, expected {expected}")]
    LeafWidth {
        tree: usize,
        node: usize,
        expected: usize,
        found: usize,
    },

    #[error("tree {tree} node {node}: leaf weights must be finite, non-negative, and not all zero")]
    BadLeaf { tree: usize, node: usize },

    #[error("export lists {listed} class names but leaves have {found} weights")]
    ClassNames { listed: usize, found: usize },
}

/// One node of an exported tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeExport {
    pub nodes: Vec<Node>,
}

/// On-disk forest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestExport {
    pub format_version: u32,
    pub n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<String>>,
    pub trees: Vec<TreeExport>,
}

/// Validated tree with leaves pre-normalised to distributions.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Averaging ensemble of decision trees.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
    classes: Option<Vec<String>>,
}

impl Forest {
    /// Validate an export and build a scorer from it.
    ///
    /// Children must point strictly forward in the node list, so every
    /// traversal terminates at a leaf.
    pub fn from_export(export: ForestExport) -> Result<Self, ForestError> {
        if export.format_version != FORMAT_VERSION {
            return Err(ForestError::UnsupportedVersion(export.format_version));
        }
        if export.trees.is_empty() {
            return Err(ForestError::NoTrees);
        }

        let n_features = export.n_features;
        let mut n_classes: Option<usize> = None;
        let mut trees = Vec::with_capacity(export.trees.len());

        for (t, tree) in export.trees.into_iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ForestError::EmptyTree { tree: t });
            }
            let len = tree.nodes.len();
            let mut nodes = Vec::with_capacity(len);

            for (n, node) in tree.nodes.into_iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        for child in [left, right] {
                            if child <= n || child >= len {
                                return Err(ForestError::BadChild {
                                    tree: t,
                                    node: n,
                                    child,
                                });
                            }
                        }
                        if feature >= n_features {
                            return Err(ForestError::FeatureOutOfRange {
                                tree: t,
                                node: n,
                                feature,
                                n_features,
                            });
                        }
                        if !threshold.is_finite() {
                            return Err(ForestError::BadThreshold { tree: t, node: n });
                        }
                        nodes.push(Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        });
                    }
                    Node::Leaf { value } => {
                        let expected = *n_classes.get_or_insert(value.len());
                        if value.len() != expected || expected == 0 {
                            return Err(ForestError::LeafWidth {
                                tree: t,
                                node: n,
                                expected,
                                found: value.len(),
                            });
                        }
                        let value = normalise(value)
                            .ok_or(ForestError::BadLeaf { tree: t, node: n })?;
                        nodes.push(Node::Leaf { value });
                    }
                }
            }
            trees.push(Tree { nodes });
        }

        // Every tree has at least one node and the last node cannot be a
        // split (its children would be out of range), so a leaf was seen.
        let n_classes = n_classes.unwrap_or(0);

        if let Some(classes) = &export.classes
            && classes.len() != n_classes
        {
            return Err(ForestError::ClassNames {
                listed: classes.len(),
                found: n_classes,
            });
        }

        Ok(Self {
            trees,
            n_features,
            n_classes,
            classes: export.classes,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for Forest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn classes(&self) -> Option<&[String]> {
        self.classes.as_deref()
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        debug_assert_eq!(features.len(), self.n_features);
        let mut proba = vec![0.0f64; self.n_classes];
        for tree in &self.trees {
            for (acc, &p) in proba.iter_mut().zip(tree.leaf(features)) {
                *acc += p;
            }
        }
        let count = self.trees.len() as f64;
        for p in &mut proba {
            *p /= count;
        }
        proba
    }
}

/// Scale leaf weights to sum to 1.
fn normalise(mut weights: Vec<f64>) -> Option<Vec<f64>> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    for w in &mut weights {
        *w /= total;
    }
    Some(weights)
}
