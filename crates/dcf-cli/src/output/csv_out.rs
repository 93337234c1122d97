use serde_json::{Map, Value};
use std::io::{self, Write};

/// Write output as CSV.
pub fn print_csv<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    write_value(&mut wtr, value)?;
    wtr.flush()
}

fn write_value<W: Write>(wtr: &mut csv::Writer<W>, value: &Value) -> csv::Result<()> {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                if let Some(Value::Array(matrix)) = result.get("matrix") {
                    write_matrix_csv(wtr, result, matrix)
                } else if let Some(Value::Array(projections)) = result.get("projections") {
                    write_array_csv(wtr, projections)
                } else {
                    write_fields_csv(wtr, result)
                }
            }
            _ => write_fields_csv(wtr, map),
        },
        Value::Array(arr) => write_array_csv(wtr, arr),
        _ => wtr.write_record([&format_csv_value(value)]),
    }
}

fn write_fields_csv<W: Write>(
    wtr: &mut csv::Writer<W>,
    map: &Map<String, Value>,
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &format_csv_value(val)])?;
    }
    Ok(())
}

/// Header row of growth rates, then one row per discount rate.
fn write_matrix_csv<W: Write>(
    wtr: &mut csv::Writer<W>,
    result: &Map<String, Value>,
    matrix: &[Value],
) -> csv::Result<()> {
    let empty = Vec::new();
    let growth_rates = result
        .get("growth_rates")
        .and_then(Value::as_array)
        .unwrap_or(&empty);
    let discount_rates = result
        .get("discount_rates")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut header = vec!["discount_rate".to_string()];
    header.extend(growth_rates.iter().map(format_csv_value));
    wtr.write_record(&header)?;

    for (rate, row) in discount_rates.iter().zip(matrix) {
        let mut record = vec![format_csv_value(rate)];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        wtr.write_record(&record)?;
    }
    Ok(())
}

fn write_array_csv<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    if arr.is_empty() {
        return Ok(());
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        wtr.write_record(&headers)?;

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&row)?;
            }
        }
    } else {
        for item in arr {
            wtr.write_record([&format_csv_value(item)])?;
        }
    }
    Ok(())
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
