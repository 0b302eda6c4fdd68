use serde_json::Value;

use crate::comparison::{normalize_result, ComparisonResult, NormalizeMode};

use super::locator::parse_json_from_model_output;
use super::partial::recover_partial_result;

/// Full pass over one completion: locate, parse, recover, normalize.
/// Always yields a renderable result.
pub fn normalize_completion(text: &str, mode: NormalizeMode) -> ComparisonResult {
    match parse_json_from_model_output(text) {
        Ok(value) => normalize_result(&value, mode),
        Err(_) => recover_partial_result(text, mode)
            .unwrap_or_else(|| ComparisonResult::unparsed(text)),
    }
}

/// Second pass over whatever a server returned, accepting either a bare
/// result or an `{ok, resultado}` envelope.
///
/// A result without fields whose alerts carry an embedded JSON body (the raw
/// completion the server could not parse) is re-run through the pipeline.
pub fn reconcile_result(value: &Value, platform_name: Option<&str>) -> ComparisonResult {
    let result_value = value.get("resultado").unwrap_or(value);
    let base = normalize_result(result_value, NormalizeMode::Client);
    let platform_name = platform_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| base.platform_name.clone());

    let reconciled = if base.fields.is_empty() {
        recover_from_alerts(&base).unwrap_or(base)
    } else {
        base
    };
    reconciled.with_platform_name(platform_name)
}

/// First alert whose embedded body yields at least one field; a body with
/// no fields leaves the original alerts in place.
fn recover_from_alerts(base: &ComparisonResult) -> Option<ComparisonResult> {
    base.alerts
        .iter()
        .filter(|alert| alert.contains('{') && alert.contains('}'))
        .find_map(|alert| recover_from_alert(base, alert))
}

fn recover_from_alert(base: &ComparisonResult, alert: &str) -> Option<ComparisonResult> {
    if let Ok(value) = parse_json_from_model_output(alert) {
        let mut recovered = normalize_result(&value, NormalizeMode::Client);
        if !recovered.fields.is_empty() {
            if value.get("resumen").and_then(Value::as_str).is_none() {
                recovered.summary = base.summary.clone();
            }
            return Some(recovered);
        }
    }
    recover_partial_result(alert, NormalizeMode::Client)
}
