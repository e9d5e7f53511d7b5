//! Vertical card display for the loaded bundle and evaluation reports.

use std::path::Path;

use triage_ai::Bundle;
use triage_ai::evaluate::{Evaluation, RowOutcome, TargetOutcome, TargetSummary};

const LABEL_WIDTH: usize = 26;

// ── Public API ──

/// Print the bundle's model card: metrics, vocabularies, label spaces.
pub fn print_model_card(dir: &Path, bundle: &Bundle) {
    let meta = bundle.metadata();
    let metrics = &meta.model_metrics;
    let vocab = bundle.vocab();

    println!("=== Triage model bundle ===");
    println!("{}", dir.display());
    println!();

    print_section(
        "Training",
        &[
            ("training_samples", meta.training_samples.to_string()),
            ("feature_count", meta.feature_count.to_string()),
            ("loaded_at", bundle.loaded_at().to_rfc3339()),
        ],
    );
    print_section(
        "Metrics",
        &[
            ("risk_accuracy", percent(metrics.risk_accuracy)),
            (
                "risk_cross_validation",
                cv(metrics.risk_cv_mean, metrics.risk_cv_std),
            ),
            ("dept_accuracy", percent(metrics.dept_accuracy)),
            (
                "dept_cross_validation",
                cv(metrics.dept_cv_mean, metrics.dept_cv_std),
            ),
        ],
    );
    print_section(
        "Vocabularies",
        &[
            ("symptoms", list(vocab.symptoms())),
            ("conditions", list(vocab.conditions())),
            ("gender", meta.gender_categories.join(", ")),
        ],
    );
    print_section(
        "Label Spaces",
        &[
            ("risk", list(vocab.risk_classes().labels())),
            ("department", list(vocab.department_classes().labels())),
        ],
    );
    print_section(
        "Classifiers",
        &[
            ("risk", classifier_shape(bundle.risk())),
            ("department", classifier_shape(bundle.department())),
        ],
    );
}

/// Print per-target accuracy and the first `show_conflicts` conflicting rows.
pub fn print_evaluation(path: &Path, evaluation: &Evaluation, show_conflicts: usize) {
    println!("=== Evaluation ===");
    println!("{}", path.display());
    println!();

    print_section(
        "Summary",
        &[
            ("rows", evaluation.rows.len().to_string()),
            ("risk", summary(&evaluation.risk)),
            ("department", summary(&evaluation.department)),
        ],
    );

    let conflicts: Vec<&RowOutcome> = evaluation.conflicts().collect();
    if conflicts.is_empty() || show_conflicts == 0 {
        return;
    }

    println!("Conflicts ({}):", conflicts.len());
    for row in conflicts.iter().take(show_conflicts) {
        println!("  row {}", row.row);
        print_outcome("risk", &row.risk);
        print_outcome("department", &row.department);
    }
    if conflicts.len() > show_conflicts {
        println!("  ... and {} more", conflicts.len() - show_conflicts);
    }
}

// ── Section rendering ──

fn print_section(header: &str, rows: &[(&str, String)]) {
    if rows.iter().all(|(_, value)| value.is_empty()) {
        return;
    }
    println!("{header}");
    for (label, value) in rows {
        if value.is_empty() {
            continue;
        }
        println!("  {:<LABEL_WIDTH$} {}", label, value);
    }
    println!();
}

fn print_outcome(target: &str, outcome: &TargetOutcome) {
    let expected = outcome.expected.as_deref().unwrap_or("-");
    println!(
        "    {:<12} {:<10} predicted {} ({}), expected {}",
        target,
        outcome.status.as_str(),
        outcome.predicted,
        percent(outcome.confidence),
        expected
    );
}

// ── Helpers ──

fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn cv(mean: Option<f64>, std: Option<f64>) -> String {
    match (mean, std) {
        (Some(m), Some(s)) => format!("{} ± {}", percent(m), percent(s)),
        (Some(m), None) => percent(m),
        _ => String::new(),
    }
}

fn list(items: &[String]) -> String {
    format!("({}) {}", items.len(), items.join(", "))
}

fn classifier_shape(classifier: &dyn triage_ai::Classifier) -> String {
    format!(
        "{} features → {} classes",
        classifier.n_features(),
        classifier.n_classes()
    )
}

fn summary(target: &TargetSummary) -> String {
    match target.accuracy() {
        Some(acc) => format!(
            "{} ({} of {} labelled rows, {} conflicts)",
            percent(acc),
            target.confirmed,
            target.labelled,
            target.conflicts()
        ),
        None => "no ground truth".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cv_formats_mean_and_spread() {
        assert_eq!(cv(Some(0.9058), Some(0.0141)), "90.6% ± 1.4%");
        assert_eq!(cv(Some(0.5), None), "50.0%");
        assert_eq!(cv(None, Some(0.1)), "");
    }

    #[test]
    fn summary_without_labels() {
        assert_eq!(summary(&TargetSummary::default()), "no ground truth");
        let target = TargetSummary {
            labelled: 4,
            confirmed: 3,
        };
        assert_eq!(summary(&target), "75.0% (3 of 4 labelled rows, 1 conflicts)");
    }
}
