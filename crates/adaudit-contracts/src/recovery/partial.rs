use crate::comparison::{normalize_field, ComparisonResult, FieldComparison, NormalizeMode};

use super::locator::{collapse_control_chars, strip_code_fences, strip_json_label};
use super::loose_json::parse_loose_json;

pub const RECOVERED_SUMMARY: &str =
    "Resultado recuperado parcialmente por truncamiento de respuesta.";
pub const TRUNCATION_ALERT: &str =
    "Respuesta de IA truncada. Se muestran los campos recuperados parcialmente.";

/// Salvages the complete `campos` elements of a document the model cut off
/// mid-array. Returns `None` when no element survives.
///
/// Scanning stops at the first element that is cut off or at any token that
/// is not an element separator, keeping everything taken before it, so
/// text appended after a complete element never removes that element.
pub fn recover_partial_result(raw: &str, mode: NormalizeMode) -> Option<ComparisonResult> {
    let cleaned = clean_for_recovery(raw);
    let elements = campos_tail(&cleaned).map(complete_elements)?;

    let fields: Vec<FieldComparison> = elements
        .into_iter()
        .filter_map(|chunk| parse_loose_json(chunk).ok())
        .map(|record| normalize_field(&record, mode))
        .collect();
    if fields.is_empty() {
        return None;
    }

    Some(ComparisonResult {
        summary: recover_summary(&cleaned).unwrap_or_else(|| RECOVERED_SUMMARY.to_string()),
        approved: recover_approved(&cleaned),
        fields,
        alerts: vec![TRUNCATION_ALERT.to_string()],
        platform_name: None,
    })
}

fn clean_for_recovery(raw: &str) -> String {
    let text = strip_json_label(raw);
    let text = strip_code_fences(text);
    collapse_control_chars(&text).trim().to_string()
}

/// Byte offsets just past every `"key"\s*:\s*`, key matched ignoring ASCII case.
fn value_offsets(text: &str, key: &str) -> Vec<usize> {
    let lowered = text.to_ascii_lowercase();
    let needle = format!("\"{}\"", key.to_ascii_lowercase());
    let mut offsets = Vec::new();
    let mut from = 0;
    while let Some(found) = lowered[from..].find(&needle) {
        let after_key = from + found + needle.len();
        if let Some(after_colon) = text[after_key..].trim_start().strip_prefix(':') {
            let value = after_colon.trim_start();
            offsets.push(text.len() - value.len());
        }
        from = after_key;
    }
    offsets
}

fn recover_summary(text: &str) -> Option<String> {
    value_offsets(text, "resumen").into_iter().find_map(|offset| {
        let body = text[offset..].strip_prefix('"')?;
        body.match_indices('"')
            .map(|(idx, _)| idx)
            .find(|&idx| followed_by_approved_key(&body[idx + 1..]))
            .map(|idx| body[..idx].replace("\\\"", "\""))
    })
}

fn followed_by_approved_key(rest: &str) -> bool {
    rest.trim_start()
        .strip_prefix(',')
        .map(str::trim_start)
        .and_then(|rest| rest.get(.."\"aprobado\"".len()))
        .is_some_and(|key| key.eq_ignore_ascii_case("\"aprobado\""))
}

fn recover_approved(text: &str) -> bool {
    for offset in value_offsets(text, "aprobado") {
        let rest = &text[offset..];
        if rest
            .get(.."true".len())
            .is_some_and(|word| word.eq_ignore_ascii_case("true"))
        {
            return rest.starts_with("true");
        }
        if rest
            .get(.."false".len())
            .is_some_and(|word| word.eq_ignore_ascii_case("false"))
        {
            return false;
        }
    }
    false
}

/// Everything after the opening bracket of `"campos": [`.
fn campos_tail(text: &str) -> Option<&str> {
    value_offsets(text, "campos")
        .into_iter()
        .find_map(|offset| text[offset..].strip_prefix('['))
}

fn complete_elements(tail: &str) -> Vec<&str> {
    let bytes = tail.as_bytes();
    let mut elements = Vec::new();
    let mut cursor = skip_whitespace(tail, 0);

    while bytes.get(cursor) == Some(&b'{') {
        let Some(end) = object_end(bytes, cursor) else {
            break;
        };
        elements.push(&tail[cursor..=end]);
        cursor = skip_whitespace(tail, end + 1);
        if bytes.get(cursor) != Some(&b',') {
            break;
        }
        cursor = skip_whitespace(tail, cursor + 1);
    }
    elements
}

/// Index of the brace closing the object opened at `start`, ignoring braces
/// inside string literals. `None` when the input ends first.
fn object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Skips Unicode whitespace; `cursor` sits just after an ASCII byte or at 0.
fn skip_whitespace(text: &str, cursor: usize) -> usize {
    let Some(rest) = text.get(cursor..) else {
        return cursor;
    };
    cursor + (rest.len() - rest.trim_start().len())
}
