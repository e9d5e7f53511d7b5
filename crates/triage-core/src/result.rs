use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Decoded output of one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Highest class probability.
    pub confidence: f64,
    /// label → probability; keys are exactly the label space.
    pub probabilities: BTreeMap<String, f64>,
}

/// Combined risk and department classification for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageClassification {
    pub risk_level: String,
    pub risk_confidence: f64,
    pub risk_probabilities: BTreeMap<String, f64>,
    pub department: String,
    pub department_confidence: f64,
    pub department_probabilities: BTreeMap<String, f64>,
}

impl TriageClassification {
    pub fn from_parts(risk: ClassificationResult, department: ClassificationResult) -> Self {
        Self {
            risk_level: risk.label,
            risk_confidence: risk.confidence,
            risk_probabilities: risk.probabilities,
            department: department.label,
            department_confidence: department.confidence,
            department_probabilities: department.probabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, probs: &[(&str, f64)]) -> ClassificationResult {
        ClassificationResult {
            label: label.into(),
            confidence: probs.iter().map(|(_, p)| *p).fold(0.0, f64::max),
            probabilities: probs.iter().map(|(l, p)| (l.to_string(), *p)).collect(),
        }
    }

    #[test]
    fn serialises_to_flat_response_fields() {
        let combined = TriageClassification::from_parts(
            result("High", &[("High", 0.75), ("Low", 0.0), ("Medium", 0.25)]),
            result("Cardiology", &[("Cardiology", 0.85), ("Neurology", 0.15)]),
        );
        let json = serde_json::to_value(&combined).unwrap();
        assert_eq!(json["risk_level"], "High");
        assert_eq!(json["risk_confidence"], 0.75);
        assert_eq!(json["risk_probabilities"]["Medium"], 0.25);
        assert_eq!(json["department"], "Cardiology");
        assert_eq!(json["department_probabilities"]["Neurology"], 0.15);
        assert_eq!(json.as_object().unwrap().len(), 6);
    }
}
