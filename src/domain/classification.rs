//! Disease classification result types.
//!
//! The label table is fixed and ordered; it must match the order the model
//! weights were trained with, so it is defined once here and validated against
//! loaded weights rather than read from them.

use serde::{Deserialize, Serialize};

/// Closed set of disease categories recognized by the classifier.
///
/// Variant order matches the output order of the trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiseaseLabel {
    /// Diabetic retinopathy
    #[serde(rename = "DR")]
    Dr,
    /// Glaucoma
    Glaucoma,
    /// No detected disease
    Normal,
}

impl DiseaseLabel {
    /// All labels, in model output order.
    pub const ALL: [Self; 3] = [Self::Dr, Self::Glaucoma, Self::Normal];

    /// Map a model output index to a label.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The canonical label string as reported to clients.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dr => "DR",
            Self::Glaucoma => "Glaucoma",
            Self::Normal => "Normal",
        }
    }
}

impl std::fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal output of the pipeline for one admitted image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Predicted disease category.
    pub label: DiseaseLabel,

    /// Confidence as a percentage in `[0, 100]`, rounded to 2 decimals.
    pub confidence: f64,
}

impl ClassificationResult {
    /// Build a result from a probability distribution over `DiseaseLabel::ALL`.
    ///
    /// Picks the argmax label and converts its probability to a percentage
    /// rounded to 2 decimal places.
    ///
    /// # Returns
    /// `None` if the distribution length does not match the label table or if
    /// it contains no finite maximum.
    #[must_use]
    pub fn from_distribution(distribution: &[f64]) -> Option<Self> {
        if distribution.len() != DiseaseLabel::ALL.len() {
            return None;
        }

        let (index, &max) = distribution
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))?;
        if !max.is_finite() {
            return None;
        }

        Some(Self {
            label: DiseaseLabel::from_index(index)?,
            confidence: round2(max.clamp(0.0, 1.0) * 100.0),
        })
    }
}

/// Round to 2 decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table_order() {
        assert_eq!(DiseaseLabel::from_index(0), Some(DiseaseLabel::Dr));
        assert_eq!(DiseaseLabel::from_index(1), Some(DiseaseLabel::Glaucoma));
        assert_eq!(DiseaseLabel::from_index(2), Some(DiseaseLabel::Normal));
        assert_eq!(DiseaseLabel::from_index(3), None);
    }

    #[test]
    fn test_result_from_distribution() {
        let result = ClassificationResult::from_distribution(&[0.9234, 0.05, 0.0266])
            .expect("valid distribution");
        assert_eq!(result.label, DiseaseLabel::Dr);
        assert!((result.confidence - 92.34).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_is_rounded_to_two_decimals() {
        let result = ClassificationResult::from_distribution(&[0.1, 0.123456, 0.776544])
            .expect("valid distribution");
        assert_eq!(result.label, DiseaseLabel::Normal);
        assert!((result.confidence - 77.65).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_stays_in_range() {
        let result =
            ClassificationResult::from_distribution(&[0.0, 0.0, 1.0]).expect("valid distribution");
        assert!(result.confidence >= 0.0);
        assert!(result.confidence <= 100.0);
    }

    #[test]
    fn test_wrong_arity_is_refused() {
        assert!(ClassificationResult::from_distribution(&[0.5, 0.5]).is_none());
        assert!(ClassificationResult::from_distribution(&[]).is_none());
    }

    #[test]
    fn test_non_finite_distribution_is_refused() {
        assert!(ClassificationResult::from_distribution(&[f64::NAN, f64::NAN, f64::NAN]).is_none());
    }

    #[test]
    fn test_label_serializes_as_canonical_string() {
        let json = serde_json::to_string(&DiseaseLabel::Dr).expect("serialize");
        assert_eq!(json, "\"DR\"");
    }
}
