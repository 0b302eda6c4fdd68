mod normalize;
mod verdict;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use normalize::{
    mentions_not_visible, normalize_field, normalize_result, suggest_action, NormalizeMode,
    MISSING_SUMMARY, UNNAMED_FIELD,
};
pub use verdict::{FieldTally, Verdict};

/// Audit outcome for one compared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldStatus {
    #[serde(rename = "correcto")]
    Correct,
    #[serde(rename = "diferencia")]
    Difference,
    #[serde(rename = "no_visible")]
    NotVisible,
}

impl FieldStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Correct => "correcto",
            Self::Difference => "diferencia",
            Self::NotVisible => "no_visible",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        match lowered.as_str() {
            "correcto" | "correct" => Some(Self::Correct),
            "diferencia" | "difference" => Some(Self::Difference),
            "no_visible" | "no visible" | "not_visible" | "not visible" => Some(Self::NotVisible),
            _ => None,
        }
    }

    /// Absent or unrecognized statuses count as not visible.
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_str)
            .and_then(Self::parse)
            .unwrap_or(Self::NotVisible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldComparison {
    #[serde(rename = "campo")]
    pub field: String,
    #[serde(rename = "estado")]
    pub status: FieldStatus,
    #[serde(rename = "happyfox")]
    pub source_of_truth_value: String,
    #[serde(rename = "plataforma")]
    pub platform_value: String,
    #[serde(rename = "diferencia")]
    pub difference_note: String,
    #[serde(rename = "accion")]
    pub suggested_action: String,
}

impl FieldComparison {
    pub fn invisible_in_both(&self) -> bool {
        mentions_not_visible(&self.source_of_truth_value)
            && mentions_not_visible(&self.platform_value)
    }

    /// Field name with its first letter upper-cased, as shown to operators.
    pub fn display_name(&self) -> String {
        let mut chars = self.field.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Campo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    #[serde(rename = "resumen")]
    pub summary: String,
    #[serde(rename = "aprobado")]
    pub approved: bool,
    #[serde(rename = "campos", default)]
    pub fields: Vec<FieldComparison>,
    #[serde(rename = "alertas", default)]
    pub alerts: Vec<String>,
    #[serde(
        rename = "plataformaNombre",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub platform_name: Option<String>,
}

pub const EMPTY_COMPLETION_ALERT: &str = "Sin respuesta del modelo";

impl ComparisonResult {
    /// Renderable stand-in when nothing could be recovered from a completion.
    /// The raw text is surfaced as the only alert.
    pub fn unparsed(raw_text: &str) -> Self {
        let alert = if raw_text.trim().is_empty() {
            EMPTY_COMPLETION_ALERT.to_string()
        } else {
            raw_text.to_string()
        };
        Self {
            summary: MISSING_SUMMARY.to_string(),
            approved: false,
            fields: Vec::new(),
            alerts: vec![alert],
            platform_name: None,
        }
    }

    pub fn with_platform_name(mut self, platform_name: Option<String>) -> Self {
        self.platform_name = platform_name;
        self
    }

    pub fn tally(&self) -> FieldTally {
        FieldTally::from_fields(&self.fields)
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::for_result(self)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ComparisonResult, FieldComparison, FieldStatus};

    #[test]
    fn status_parses_spanish_and_english_labels() {
        assert_eq!(FieldStatus::parse("correcto"), Some(FieldStatus::Correct));
        assert_eq!(FieldStatus::parse(" Diferencia "), Some(FieldStatus::Difference));
        assert_eq!(FieldStatus::parse("NOT VISIBLE"), Some(FieldStatus::NotVisible));
        assert_eq!(FieldStatus::parse("parcial"), None);
        assert_eq!(
            FieldStatus::from_value(Some(&json!("parcial"))),
            FieldStatus::NotVisible
        );
        assert_eq!(FieldStatus::from_value(None), FieldStatus::NotVisible);
    }

    #[test]
    fn result_serializes_with_wire_keys() {
        let result = ComparisonResult {
            summary: "ok".to_string(),
            approved: true,
            fields: vec![FieldComparison {
                field: "fechas".to_string(),
                status: FieldStatus::Correct,
                source_of_truth_value: "1-10 mayo".to_string(),
                platform_value: "1-10 mayo".to_string(),
                difference_note: "Sin detalle de diferencia.".to_string(),
                suggested_action: "Sin cambios en fechas.".to_string(),
            }],
            alerts: Vec::new(),
            platform_name: None,
        };
        let value = result.to_value();
        assert_eq!(value["resumen"], json!("ok"));
        assert_eq!(value["campos"][0]["estado"], json!("correcto"));
        assert_eq!(value["campos"][0]["happyfox"], json!("1-10 mayo"));
        assert!(value.get("plataformaNombre").is_none());
    }

    #[test]
    fn unparsed_result_keeps_raw_text_as_alert() {
        let result = ComparisonResult::unparsed("no es json");
        assert_eq!(result.summary, "Sin resumen");
        assert!(!result.approved);
        assert!(result.fields.is_empty());
        assert_eq!(result.alerts, vec!["no es json".to_string()]);

        let empty = ComparisonResult::unparsed("  ");
        assert_eq!(empty.alerts, vec!["Sin respuesta del modelo".to_string()]);
    }

    #[test]
    fn display_name_capitalizes_first_letter() {
        let field = FieldComparison {
            field: "geografía".to_string(),
            status: FieldStatus::NotVisible,
            source_of_truth_value: String::new(),
            platform_value: String::new(),
            difference_note: String::new(),
            suggested_action: String::new(),
        };
        assert_eq!(field.display_name(), "Geografía");
    }
}
