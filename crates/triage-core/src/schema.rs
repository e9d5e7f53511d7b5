/// Feature vector layout shared by the encoder and the fitted classifiers.
///
/// The order is the fit-time column order and must never change without
/// re-exporting the model bundle.
pub mod features {
    /// Scalar columns that precede the one-hot and multi-label blocks.
    pub const NUMERIC_COLUMNS: [&str; 10] = [
        "Age",
        "Blood_Pressure_Systolic",
        "Heart_Rate",
        "Temperature_F",
        "age_group",
        "bp_category",
        "hr_category",
        "has_fever",
        "symptom_count",
        "condition_count",
    ];

    pub const AGE: usize = 0;
    pub const SYSTOLIC_BP: usize = 1;
    pub const HEART_RATE: usize = 2;
    pub const TEMPERATURE_F: usize = 3;
    pub const AGE_BUCKET: usize = 4;
    pub const BP_BUCKET: usize = 5;
    pub const HR_BUCKET: usize = 6;
    pub const HAS_FEVER: usize = 7;
    pub const SYMPTOM_COUNT: usize = 8;
    pub const CONDITION_COUNT: usize = 9;

    /// First gender one-hot position (`Female`, `Male`, `Other` follow in order).
    pub const GENDER_OFFSET: usize = NUMERIC_COLUMNS.len();
    /// First symptom multi-label bit.
    pub const SYMPTOM_OFFSET: usize = GENDER_OFFSET + crate::vocab::GENDER_CATEGORIES.len();

    /// Prefix the fitting pipeline puts on gender dummy columns.
    pub const GENDER_PREFIX: &str = "gender_";
    pub const SYMPTOM_PREFIX: &str = "symptom_";
    pub const CONDITION_PREFIX: &str = "cond_";

    /// Column name the fitting pipeline derives for a multi-label entry.
    ///
    /// "Shortness of Breath" with prefix `symptom_` → `symptom_shortness_of_breath`.
    pub fn multi_label_column(prefix: &str, entry: &str) -> String {
        format!("{prefix}{}", entry.to_lowercase().replace(' ', "_"))
    }

    /// Total vector length for vocabularies of the given sizes.
    pub fn vector_len(symptoms: usize, conditions: usize) -> usize {
        SYMPTOM_OFFSET + symptoms + conditions
    }
}
