use serde_json::Value;
use std::io::{self, Write};

/// Headline fields, most specific first.
const PRIORITY_KEYS: [&str; 4] = [
    "fair_value_per_share",
    "total_pv",
    "base_case_value",
    "free_cash_flow",
];

/// Print just the key answer value from the output.
///
/// Looks for well-known result fields in order of priority, then falls
/// back to the first field in the result object.
pub fn print_minimal<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in &PRIORITY_KEYS {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    return writeln!(out, "{}", format_minimal(val));
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return writeln!(out, "{}: {}", key, format_minimal(val));
        }
    }

    writeln!(out, "{}", format_minimal(result_obj))
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        print_minimal(&mut buf, value).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_prefers_fair_value_per_share() {
        let v = json!({ "result": { "total_pv": "1600", "fair_value_per_share": "1.6" } });
        assert_eq!(render(&v), "1.6\n");
    }

    #[test]
    fn test_falls_back_to_total_pv() {
        let v = json!({ "result": { "terminal_value": "2000", "total_pv": "1600" } });
        assert_eq!(render(&v), "1600\n");
    }

    #[test]
    fn test_sensitivity_base_case() {
        let v = json!({ "result": { "matrix": [], "base_case_value": "1600" } });
        assert_eq!(render(&v), "1600\n");
    }
}
