use serde_json::Value;

use super::loose_json::parse_loose_json;
use super::NoJsonFoundError;

const BYTE_ORDER_MARK: char = '\u{feff}';
const CODE_FENCE: &str = "```";
const JSON_LABEL: &str = "json";

/// Strips formatting noise models wrap around JSON: a leading BOM, Markdown
/// fences, a leading `json` label and control characters.
pub fn clean_model_text(raw: &str) -> String {
    let text = raw.strip_prefix(BYTE_ORDER_MARK).unwrap_or(raw);
    let text = strip_code_fences(text);
    let text = strip_json_label(&text);
    collapse_control_chars(text).trim().to_string()
}

/// Best-guess JSON object substring: first `{` through last `}`, or the whole
/// cleaned text when there are no braces.
pub fn locate_json_candidate(raw: &str) -> Result<String, NoJsonFoundError> {
    let cleaned = clean_model_text(raw);
    if cleaned.is_empty() {
        return Err(NoJsonFoundError::EmptyText);
    }
    let candidate = outermost_braces(&cleaned).unwrap_or(&cleaned);
    Ok(strip_json_label(candidate).trim().to_string())
}

pub fn parse_json_from_model_output(raw: &str) -> Result<Value, NoJsonFoundError> {
    let candidate = locate_json_candidate(raw)?;
    if let Ok(value) = parse_loose_json(&candidate) {
        return Ok(value);
    }
    match outermost_braces(&candidate) {
        Some(sliced) => parse_loose_json(sliced).map_err(|_| NoJsonFoundError::Unparsable),
        None => Err(NoJsonFoundError::NoBraces),
    }
}

pub(crate) fn strip_code_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find(CODE_FENCE) {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + CODE_FENCE.len()..];
        if rest
            .get(..JSON_LABEL.len())
            .is_some_and(|label| label.eq_ignore_ascii_case(JSON_LABEL))
        {
            rest = &rest[JSON_LABEL.len()..];
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn strip_json_label(text: &str) -> &str {
    match text.get(..JSON_LABEL.len()) {
        Some(label) if label.eq_ignore_ascii_case(JSON_LABEL) => {
            text[JSON_LABEL.len()..].trim_start()
        }
        _ => text,
    }
}

/// Each run of characters below U+0020 becomes a single space.
pub(crate) fn collapse_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for ch in text.chars() {
        if (ch as u32) < 0x20 {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

pub(crate) fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use super::{
        clean_model_text, collapse_control_chars, locate_json_candidate,
        parse_json_from_model_output, strip_code_fences,
    };
    use crate::recovery::NoJsonFoundError;

    #[test]
    fn fences_and_labels_are_removed() {
        assert_eq!(strip_code_fences("```JSON\n{}\n```"), "\n{}\n");
        assert_eq!(clean_model_text("\u{feff}json {\"a\":1}"), "{\"a\":1}");
        assert_eq!(clean_model_text("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn control_character_runs_collapse_to_one_space() {
        assert_eq!(collapse_control_chars("a\r\n\tb\u{1f}c"), "a b c");
    }

    #[test]
    fn candidate_spans_first_to_last_brace() {
        let candidate =
            locate_json_candidate("Aquí tienes el resultado: {\"a\": {\"b\": 1}} saludos").unwrap();
        assert_eq!(candidate, "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn candidate_falls_back_to_cleaned_text() {
        assert_eq!(locate_json_candidate("no es json").unwrap(), "no es json");
        assert_eq!(
            locate_json_candidate(" \n```\n``` "),
            Err(NoJsonFoundError::EmptyText)
        );
    }

    #[test]
    fn parse_distinguishes_missing_and_broken_objects() {
        assert_eq!(
            parse_json_from_model_output("no es json"),
            Err(NoJsonFoundError::NoBraces)
        );
        assert_eq!(
            parse_json_from_model_output("{\"campos\": [{\"campo\": }"),
            Err(NoJsonFoundError::Unparsable)
        );
    }

    #[test]
    fn parses_fenced_document_with_trailing_commas() {
        let value = parse_json_from_model_output(
            "```json\n{\"resumen\": \"ok\",\n \"aprobado\": false,\n \"alertas\": [],\n}\n```",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"resumen": "ok", "aprobado": false, "alertas": []})
        );
    }

    fn result_document() -> impl Strategy<Value = Value> {
        (
            "[a-zA-Z0-9 áéíóúñ.,:]{0,40}",
            any::<bool>(),
            prop::collection::vec(
                (
                    "[a-z/ ]{1,20}",
                    prop_oneof![Just("correcto"), Just("diferencia"), Just("no_visible")],
                    "[a-zA-Z0-9 {}\\[\\]\"]{0,20}",
                ),
                0..8,
            ),
        )
            .prop_map(|(resumen, aprobado, campos)| {
                json!({
                    "resumen": resumen,
                    "aprobado": aprobado,
                    "campos": campos
                        .into_iter()
                        .map(|(campo, estado, valor)| json!({
                            "campo": campo,
                            "estado": estado,
                            "happyfox": valor,
                            "plataforma": valor,
                        }))
                        .collect::<Vec<Value>>(),
                    "alertas": ["revisar"],
                })
            })
    }

    proptest! {
        #[test]
        fn embedded_documents_are_recovered(
            document in result_document(),
            fenced in any::<bool>(),
            labelled in any::<bool>(),
            bom in any::<bool>(),
            pretty in any::<bool>(),
        ) {
            let body = if pretty {
                serde_json::to_string_pretty(&document).unwrap()
            } else {
                serde_json::to_string(&document).unwrap()
            };
            let mut text = String::new();
            if bom {
                text.push('\u{feff}');
            }
            if labelled {
                text.push_str("json ");
            }
            if fenced {
                text.push_str(&format!("```json\n{body}\n```"));
            } else {
                text.push_str(&body);
            }
            let parsed = parse_json_from_model_output(&text).unwrap();
            prop_assert_eq!(parsed, document);
        }
    }
}
