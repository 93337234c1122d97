use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::str::FromStr;
use tabled::{builder::Builder, Table};

/// Result fields rendered as their own tables rather than field/value rows.
const TABULATED_KEYS: [&str; 6] = [
    "projections",
    "matrix",
    "discount_rates",
    "growth_rates",
    "cash_flows",
    "present_values",
];

/// Format output as tables using the tabled crate.
pub fn print_table<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(out, result, map)
            } else {
                print_flat_object(out, map)
            }
        }
        Value::Array(arr) => print_array_table(out, arr),
        _ => writeln!(out, "{}", value),
    }
}

fn print_result_table<W: Write>(
    out: &mut W,
    result: &Value,
    envelope: &Map<String, Value>,
) -> io::Result<()> {
    if let Value::Object(res_map) = result {
        if let Some(Value::Array(matrix)) = res_map.get("matrix") {
            print_heatmap(out, res_map, matrix)?;
            writeln!(out)?;
        } else if let Some(Value::Array(projections)) = res_map.get("projections") {
            print_array_table(out, projections)?;
            writeln!(out)?;
        }

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if TABULATED_KEYS.contains(&key.as_str()) {
                continue;
            }
            builder.push_record([key.clone(), format_value(key, val)]);
        }
        writeln!(out, "{}", Table::from(builder))?;
    } else {
        print_flat_object(out, envelope)?;
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            writeln!(out, "\nWarnings:")?;
            for w in warnings {
                if let Value::String(s) = w {
                    writeln!(out, "  - {}", s)?;
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        writeln!(out, "\nMethodology: {}", meth)?;
    }
    Ok(())
}

/// Sensitivity grid: discount rates down the side, growth rates across the top.
fn print_heatmap<W: Write>(
    out: &mut W,
    res_map: &Map<String, Value>,
    matrix: &[Value],
) -> io::Result<()> {
    let label = |key: &str| {
        res_map
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let axis = |key: &str| -> Vec<Value> {
        res_map
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let discount_rates = axis("discount_rates");
    let growth_rates = axis("growth_rates");

    let mut builder = Builder::default();
    let mut header = vec![format!("{} \\ {}", label("row_label"), label("column_label"))];
    header.extend(growth_rates.iter().map(|g| format_value("growth_rate", g)));
    builder.push_record(header);

    for (row, rate) in matrix.iter().zip(&discount_rates) {
        let mut record = vec![format_value("discount_rate", rate)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(|c| match c {
                Value::Null => "n/a".to_string(),
                other => format_value("total_pv", other),
            }));
        }
        builder.push_record(record);
    }

    writeln!(out, "{}", Table::from(builder))
}

fn print_flat_object<W: Write>(out: &mut W, map: &Map<String, Value>) -> io::Result<()> {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.clone(), format_value(key, val)]);
    }
    writeln!(out, "{}", Table::from(builder))
}

fn print_array_table<W: Write>(out: &mut W, arr: &[Value]) -> io::Result<()> {
    if arr.is_empty() {
        return writeln!(out, "(empty)");
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(h.as_str())
                            .map(|v| format_value(h, v))
                            .unwrap_or_default()
                    })
                    .collect();
                builder.push_record(row);
            }
        }

        writeln!(out, "{}", Table::from(builder))
    } else {
        for item in arr {
            writeln!(out, "{}", format_value("", item))?;
        }
        Ok(())
    }
}

/// Display rounding: factors and fractions keep 4 places, money keeps 2.
fn format_value(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) => match Decimal::from_str(s) {
            Ok(d) => {
                let dp = if key.contains("factor") || key.ends_with("_pct") {
                    4
                } else {
                    2
                };
                d.round_dp(dp).to_string()
            }
            Err(_) => s.clone(),
        },
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(|v| format_value(key, v)).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
