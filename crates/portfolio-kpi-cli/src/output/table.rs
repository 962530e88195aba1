use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::flatten_fields;

/// Format output as a table using the tabled crate.
///
/// Nested result objects are flattened into dotted field names. Arrays of
/// objects (debtor ranking, months, classified KPIs) get their own table
/// below the main one.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_field_table(value);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if result.is_object() {
        let fields = flatten_fields(result);
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        let mut sections: Vec<(&str, &[Value])> = Vec::new();
        for (key, val) in &fields {
            match val {
                Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                    builder.push_record([key.as_str(), &format!("({} rows below)", items.len())]);
                }
                _ => builder.push_record([key.as_str(), &format_value(val)]),
            }
        }
        println!("{}", Table::from(builder));

        collect_sections(result, &mut sections);
        for (name, rows) in sections {
            println!("\n{}:", name);
            print_array_table(rows);
        }
    } else {
        println!("{}", format_value(result));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn collect_sections<'a>(value: &'a Value, out: &mut Vec<(&'a str, &'a [Value])>) {
    if let Value::Object(map) = value {
        for (key, val) in map {
            match val {
                Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                    out.push((key.as_str(), items.as_slice()));
                }
                Value::Object(_) => collect_sections(val, out),
                _ => {}
            }
        }
    }
}

fn print_field_table(value: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten_fields(value) {
        builder.push_record([key.as_str(), &format_value(&val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
