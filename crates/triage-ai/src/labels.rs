//! Decoding classifier output into named labels.
//!
//! Positional alignment between a [`LabelSpace`] and the classifier's
//! probability vector is checked when the bundle loads; decoding trusts it.

use triage_core::{ClassificationResult, LabelSpace};

use crate::forest::Scored;

/// Map a scored distribution onto `space`.
pub fn decode(space: &LabelSpace, scored: &Scored) -> ClassificationResult {
    debug_assert_eq!(space.len(), scored.probabilities.len());

    let label = space.get(scored.index).unwrap_or_default().to_string();
    let confidence = scored
        .probabilities
        .iter()
        .copied()
        .fold(0.0f64, f64::max);
    let probabilities = space
        .labels()
        .iter()
        .cloned()
        .zip(scored.probabilities.iter().copied())
        .collect();

    ClassificationResult {
        label,
        confidence,
        probabilities,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk_space() -> LabelSpace {
        LabelSpace::new(
            "risk",
            vec!["High".into(), "Low".into(), "Medium".into()],
        )
        .unwrap()
    }

    #[test]
    fn decodes_label_confidence_and_map() {
        let scored = Scored {
            index: 2,
            probabilities: vec![0.2, 0.1, 0.7],
        };
        let result = decode(&risk_space(), &scored);
        assert_eq!(result.label, "Medium");
        assert!((result.confidence - 0.7).abs() < 1e-12);
        assert_eq!(result.probabilities.len(), 3);
        assert_eq!(result.probabilities["High"], 0.2);
        assert_eq!(result.probabilities["Low"], 0.1);
    }

    #[test]
    fn probability_keys_are_exactly_the_label_space() {
        let scored = Scored {
            index: 0,
            probabilities: vec![0.5, 0.25, 0.25],
        };
        let result = decode(&risk_space(), &scored);
        let keys: Vec<&str> = result.probabilities.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["High", "Low", "Medium"]);
    }

    #[test]
    fn confidence_is_max_probability() {
        let scored = Scored {
            index: 1,
            probabilities: vec![0.3, 0.4, 0.3],
        };
        let result = decode(&risk_space(), &scored);
        assert_eq!(result.label, "Low");
        assert_eq!(result.confidence, 0.4);
        assert_eq!(result.confidence, result.probabilities[&result.label]);
    }
}
