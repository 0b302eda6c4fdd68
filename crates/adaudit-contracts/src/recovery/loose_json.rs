use serde_json::Value;

use super::ParseError;

/// Strict parse, then exactly one repair pass (trailing commas, raw
/// newlines/tabs) and a single retry. Deeper repair is the recoverer's job.
pub fn parse_loose_json(text: &str) -> Result<Value, ParseError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    let repaired = repair_once(text);
    Ok(serde_json::from_str::<Value>(&repaired)?)
}

fn repair_once(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &ch) in chars.iter().enumerate() {
        if matches!(ch, '\r' | '\n' | '\t') {
            out.push(' ');
            escaped = false;
            continue;
        }
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' if closes_after_whitespace(&chars[idx + 1..]) => {}
            _ => out.push(ch),
        }
    }

    out.trim().to_string()
}

fn closes_after_whitespace(rest: &[char]) -> bool {
    rest.iter()
        .find(|ch| !ch.is_whitespace())
        .map(|ch| matches!(ch, '}' | ']'))
        .unwrap_or(false)
}
