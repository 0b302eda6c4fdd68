use serde::Serialize;

use super::{ComparisonResult, FieldComparison, FieldStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldTally {
    pub correct: usize,
    pub difference: usize,
    pub not_visible: usize,
}

impl FieldTally {
    pub fn from_fields(fields: &[FieldComparison]) -> Self {
        let mut tally = Self::default();
        for field in fields {
            match field.status {
                FieldStatus::Correct => tally.correct += 1,
                FieldStatus::Difference => tally.difference += 1,
                FieldStatus::NotVisible => tally.not_visible += 1,
            }
        }
        tally
    }
}

/// Overall reading of a result for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AllClear,
    Unvalidated,
    NeedsChanges {
        differences: usize,
        not_visible: usize,
    },
}

impl Verdict {
    pub fn for_result(result: &ComparisonResult) -> Self {
        let tally = result.tally();
        if result.fields.is_empty() && !result.approved {
            Self::Unvalidated
        } else if result.approved && tally.difference == 0 {
            Self::AllClear
        } else {
            Self::NeedsChanges {
                differences: tally.difference,
                not_visible: tally.not_visible,
            }
        }
    }

    pub fn headline(&self) -> String {
        match self {
            Self::AllClear => "Veredicto: todo está perfecto.".to_string(),
            Self::Unvalidated => {
                "Veredicto: la IA no pudo validar campos suficientes, revisa el detalle."
                    .to_string()
            }
            Self::NeedsChanges {
                differences,
                not_visible,
            } => format!(
                "Veredicto: hay {differences} campo(s) con diferencia y {not_visible} no visible(s)."
            ),
        }
    }
}
