use serde_json::Value;

/// Print just the headline value of the output.
///
/// Looks for well-known fields in order of priority, first in the result
/// object and then in its nested `kpis` record, then falls back to the first
/// field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "health_score",
        "noiYield",
        "gini_index",
        "top3_share",
        "consolidated_net",
        "volatility",
        "portfolioValue",
    ];

    if let Value::Object(map) = result_obj {
        let nested = map.get("kpis").and_then(|k| k.as_object());
        for key in &priority_keys {
            let found = map
                .get(*key)
                .or_else(|| nested.and_then(|n| n.get(*key)));
            if let Some(val) = found {
                if !val.is_null() {
                    println!("{}", format_minimal(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
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
