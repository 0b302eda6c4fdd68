use serde_json::{Map, Value};

use super::{ComparisonResult, FieldComparison, FieldStatus};

pub const UNNAMED_FIELD: &str = "campo_sin_nombre";
pub const MISSING_SUMMARY: &str = "Sin resumen";

const SERVER_UNSPECIFIED_VALUE: &str = "No especificado claramente en la respuesta.";
const SERVER_MISSING_DIFFERENCE: &str = "Sin detalle de diferencia.";
const CLIENT_SOURCE_NOT_VISIBLE: &str = "No visible en captura de Happy Fox.";
const CLIENT_PLATFORM_NOT_VISIBLE: &str = "No visible en captura de plataforma.";
const CLIENT_MISSING_DIFFERENCE: &str = "Sin diferencia reportada.";

const SOURCE_PHRASE_MARKER: &str = "en happy fox";
const PLATFORM_PHRASE_MARKER: &str = "en la plataforma";

/// Which caller is normalizing. Both share one implementation and differ
/// only in their sentinels and in whether evidence may be derived from a
/// free-text `detalle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    #[default]
    Server,
    Client,
}

impl NormalizeMode {
    fn source_of_truth_sentinel(self) -> &'static str {
        match self {
            Self::Server => SERVER_UNSPECIFIED_VALUE,
            Self::Client => CLIENT_SOURCE_NOT_VISIBLE,
        }
    }

    fn platform_sentinel(self) -> &'static str {
        match self {
            Self::Server => SERVER_UNSPECIFIED_VALUE,
            Self::Client => CLIENT_PLATFORM_NOT_VISIBLE,
        }
    }

    fn difference_sentinel(self) -> &'static str {
        match self {
            Self::Server => SERVER_MISSING_DIFFERENCE,
            Self::Client => CLIENT_MISSING_DIFFERENCE,
        }
    }

    fn derives_from_detail(self) -> bool {
        matches!(self, Self::Client)
    }
}

/// Builds a fully populated field from an arbitrary record. Never fails;
/// non-object input is treated as an empty record.
pub fn normalize_field(record: &Value, mode: NormalizeMode) -> FieldComparison {
    let empty = Map::new();
    let record = record.as_object().unwrap_or(&empty);

    let field = value_as_text(record.get("campo")).unwrap_or_else(|| UNNAMED_FIELD.to_string());
    let mut status = FieldStatus::from_value(record.get("estado"));
    let detail = value_as_text(record.get("detalle"));

    let source_of_truth_value = value_as_text(record.get("happyfox"))
        .or_else(|| value_as_text(record.get("happyFox")))
        .or_else(|| derived_phrase(detail.as_deref(), SOURCE_PHRASE_MARKER, mode))
        .unwrap_or_else(|| mode.source_of_truth_sentinel().to_string());
    let platform_value = value_as_text(record.get("plataforma"))
        .or_else(|| derived_phrase(detail.as_deref(), PLATFORM_PHRASE_MARKER, mode))
        .unwrap_or_else(|| mode.platform_sentinel().to_string());

    // A field cannot be judged correct from evidence neither capture shows.
    if status == FieldStatus::Correct
        && mentions_not_visible(&source_of_truth_value)
        && mentions_not_visible(&platform_value)
    {
        status = FieldStatus::NotVisible;
    }

    let difference_note = value_as_text(record.get("diferencia"))
        .or(detail)
        .unwrap_or_else(|| mode.difference_sentinel().to_string());
    let suggested_action =
        value_as_text(record.get("accion")).unwrap_or_else(|| suggest_action(status, &field));

    FieldComparison {
        field,
        status,
        source_of_truth_value,
        platform_value,
        difference_note,
        suggested_action,
    }
}

pub fn suggest_action(status: FieldStatus, field: &str) -> String {
    match status {
        FieldStatus::Correct => format!("Sin cambios en {field}."),
        FieldStatus::NotVisible => {
            format!("Validar y documentar {field} en ambas capturas para auditoría.")
        }
        FieldStatus::Difference => {
            format!("Ajustar {field} en plataforma para que coincida con Happy Fox.")
        }
    }
}

pub fn mentions_not_visible(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("no visible") || lowered.contains("not visible")
}

/// Coerces a parsed model document into a result. Missing or mistyped
/// members fall back to empty/sentinel values.
pub fn normalize_result(value: &Value, mode: NormalizeMode) -> ComparisonResult {
    let empty = Map::new();
    let object = value.as_object().unwrap_or(&empty);

    let summary =
        value_as_text(object.get("resumen")).unwrap_or_else(|| MISSING_SUMMARY.to_string());
    let approved = object.get("aprobado").map(value_is_truthy).unwrap_or(false);
    let fields = object
        .get("campos")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().map(|row| normalize_field(row, mode)).collect())
        .unwrap_or_default();
    let alerts = object
        .get("alertas")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(alert_text).collect())
        .unwrap_or_default();

    ComparisonResult {
        summary,
        approved,
        fields,
        alerts,
        platform_name: value_as_text(object.get("plataformaNombre")),
    }
}

fn derived_phrase(detail: Option<&str>, marker: &str, mode: NormalizeMode) -> Option<String> {
    if !mode.derives_from_detail() {
        return None;
    }
    let detail = detail?;
    let start = detail.to_ascii_lowercase().find(marker)?;
    let phrase = &detail[start..];
    let end = phrase[marker.len()..]
        .find(['.', ',', ';'])
        .map(|offset| offset + marker.len())
        .unwrap_or(phrase.len());
    let phrase = phrase[..end].trim();
    if phrase.is_empty() {
        None
    } else {
        Some(phrase.to_string())
    }
}

pub(crate) fn value_as_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(raw) => raw.trim().to_string(),
        Value::Number(raw) => raw.to_string(),
        Value::Bool(raw) => raw.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn alert_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(raw) => Some(raw.clone()),
        other => Some(other.to_string()),
    }
}

fn value_is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(raw) => *raw,
        Value::Number(raw) => raw
            .as_f64()
            .map(|number| number != 0.0 && !number.is_nan())
            .unwrap_or(false),
        Value::String(raw) => {
            let lowered = raw.trim().to_lowercase();
            if matches!(lowered.as_str(), "1" | "true" | "yes" | "si" | "sí" | "on") {
                true
            } else if matches!(lowered.as_str(), "" | "0" | "false" | "no" | "off") {
                false
            } else {
                true
            }
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use super::{normalize_field, normalize_result, NormalizeMode};
    use crate::comparison::FieldStatus;

    #[test]
    fn correct_field_gets_no_change_action() {
        let field = normalize_field(
            &json!({
                "campo": "fechas",
                "estado": "correcto",
                "happyfox": "1-10 mayo",
                "plataforma": "1-10 mayo"
            }),
            NormalizeMode::Server,
        );
        assert_eq!(field.status, FieldStatus::Correct);
        assert_eq!(field.suggested_action, "Sin cambios en fechas.");
        assert_eq!(field.difference_note, "Sin detalle de diferencia.");
    }

    #[test]
    fn empty_record_uses_sentinels_for_each_mode() {
        let server = normalize_field(&json!({}), NormalizeMode::Server);
        assert_eq!(server.field, "campo_sin_nombre");
        assert_eq!(server.status, FieldStatus::NotVisible);
        assert_eq!(
            server.source_of_truth_value,
            "No especificado claramente en la respuesta."
        );
        assert_eq!(
            server.suggested_action,
            "Validar y documentar campo_sin_nombre en ambas capturas para auditoría."
        );

        let client = normalize_field(&json!({}), NormalizeMode::Client);
        assert_eq!(
            client.source_of_truth_value,
            "No visible en captura de Happy Fox."
        );
        assert_eq!(client.platform_value, "No visible en captura de plataforma.");
        assert_eq!(client.difference_note, "Sin diferencia reportada.");
    }

    #[test]
    fn correct_with_invisible_evidence_is_downgraded() {
        let field = normalize_field(
            &json!({
                "campo": "audiencias",
                "estado": "correcto",
                "happyfox": "No visible",
                "plataforma": "no visible en la captura"
            }),
            NormalizeMode::Server,
        );
        assert_eq!(field.status, FieldStatus::NotVisible);
        assert_eq!(
            field.suggested_action,
            "Validar y documentar audiencias en ambas capturas para auditoría."
        );

        let client_default = normalize_field(
            &json!({"campo": "ubicaciones", "estado": "correcto"}),
            NormalizeMode::Client,
        );
        assert_eq!(client_default.status, FieldStatus::NotVisible);
    }

    #[test]
    fn client_mode_derives_evidence_from_detail() {
        let record = json!({
            "campo": "inversión/presupuesto",
            "estado": "diferencia",
            "detalle": "En Happy Fox se piden 500 USD, en la plataforma figuran 450 USD."
        });
        let client = normalize_field(&record, NormalizeMode::Client);
        assert_eq!(client.source_of_truth_value, "En Happy Fox se piden 500 USD");
        assert_eq!(client.platform_value, "en la plataforma figuran 450 USD");
        assert_eq!(
            client.difference_note,
            "En Happy Fox se piden 500 USD, en la plataforma figuran 450 USD."
        );
        assert_eq!(
            client.suggested_action,
            "Ajustar inversión/presupuesto en plataforma para que coincida con Happy Fox."
        );

        let server = normalize_field(&record, NormalizeMode::Server);
        assert_eq!(
            server.source_of_truth_value,
            "No especificado claramente en la respuesta."
        );
    }

    #[test]
    fn camel_case_source_key_is_accepted() {
        let field = normalize_field(
            &json!({"campo": "fechas", "happyFox": "1 mayo"}),
            NormalizeMode::Server,
        );
        assert_eq!(field.source_of_truth_value, "1 mayo");
    }

    #[test]
    fn result_coerces_loose_members() {
        let result = normalize_result(
            &json!({
                "aprobado": 1,
                "campos": "not-an-array",
                "alertas": ["revisar fechas", null, 3]
            }),
            NormalizeMode::Server,
        );
        assert_eq!(result.summary, "Sin resumen");
        assert!(result.approved);
        assert!(result.fields.is_empty());
        assert_eq!(result.alerts, vec!["revisar fechas".to_string(), "3".to_string()]);

        let rejected = normalize_result(&json!({"aprobado": "false"}), NormalizeMode::Server);
        assert!(!rejected.approved);
        let non_object = normalize_result(&json!(42), NormalizeMode::Server);
        assert!(non_object.fields.is_empty());
        assert!(!non_object.approved);
    }

    fn optional_text() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            Just(Some("No visible".to_string())),
            "[a-zA-Z ,.;]{0,24}".prop_map(Some),
        ]
    }

    fn record_strategy() -> impl Strategy<Value = Value> {
        (
            optional_text(),
            prop_oneof![
                Just(None),
                Just(Some("correcto".to_string())),
                Just(Some("diferencia".to_string())),
                Just(Some("no_visible".to_string())),
                Just(Some("otro".to_string())),
            ],
            optional_text(),
            optional_text(),
            optional_text(),
            optional_text(),
        )
            .prop_map(|(campo, estado, happyfox, plataforma, diferencia, detalle)| {
                let mut record = serde_json::Map::new();
                for (key, value) in [
                    ("campo", campo),
                    ("estado", estado),
                    ("happyfox", happyfox),
                    ("plataforma", plataforma),
                    ("diferencia", diferencia),
                    ("detalle", detalle),
                ] {
                    if let Some(value) = value {
                        record.insert(key.to_string(), Value::String(value));
                    }
                }
                Value::Object(record)
            })
    }

    proptest! {
        #[test]
        fn normalized_fields_have_no_empty_text(record in record_strategy(), client in any::<bool>()) {
            let mode = if client { NormalizeMode::Client } else { NormalizeMode::Server };
            let field = normalize_field(&record, mode);
            prop_assert!(!field.field.is_empty());
            prop_assert!(!field.source_of_truth_value.is_empty());
            prop_assert!(!field.platform_value.is_empty());
            prop_assert!(!field.difference_note.is_empty());
            prop_assert!(!field.suggested_action.is_empty());
        }

        #[test]
        fn normalization_is_idempotent(record in record_strategy(), client in any::<bool>()) {
            let mode = if client { NormalizeMode::Client } else { NormalizeMode::Server };
            let once = normalize_field(&record, mode);
            let value = serde_json::to_value(&once).unwrap();
            let twice = normalize_field(&value, mode);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn correct_fields_never_rest_on_invisible_evidence(record in record_strategy(), client in any::<bool>()) {
            let mode = if client { NormalizeMode::Client } else { NormalizeMode::Server };
            let field = normalize_field(&record, mode);
            prop_assert!(!(field.status == FieldStatus::Correct && field.invisible_in_both()));
        }
    }
}
