use std::collections::HashMap;

use serde_json::json;

use super::FieldValue;
use super::MetricsEncoder;

/// JSON encoder for metrics
pub struct JsonEncoder;

impl JsonEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsEncoder for JsonEncoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        let json_fields: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|(k, v)| {
                let json_value = match v {
                    FieldValue::UnsignedInteger(u) => {
                        serde_json::Value::Number(serde_json::Number::from(*u))
                    }
                    // JSON has no encoding for non-finite floats
                    FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                    FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
                };
                (k.clone(), json_value)
            })
            .collect();

        let metrics = json!({
            "measure": measurement,
            "ts": timestamp,
            "tag": tags,
            "field": json_fields,
        });
        metrics.to_string() + "\n"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::Value;

    use super::*;

    #[test]
    fn test_encode_metrics_basic() {
        let encoder = JsonEncoder::new();
        let mut tags = HashMap::new();
        tags.insert("direction".to_string(), "DL".to_string());

        let mut fields = HashMap::new();
        fields.insert("score".to_string(), 85.5.into());
        fields.insert("bytes".to_string(), 1024u64.into());

        let result = encoder.encode_metrics("lyapunov_grant", &tags, &fields, 1609459200);
        let parsed: Value = serde_json::from_str(&result).expect("Should be valid JSON");

        assert_eq!(parsed["measure"], "lyapunov_grant");
        assert_eq!(parsed["ts"], 1609459200);
        assert_eq!(parsed["tag"]["direction"], "DL");
        assert_eq!(parsed["field"]["score"], 85.5);
        assert_eq!(parsed["field"]["bytes"], 1024);
        assert!(result.ends_with('\n'));
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        let encoder = JsonEncoder::new();
        let mut fields = HashMap::new();
        fields.insert("score".to_string(), f64::INFINITY.into());

        let result = encoder.encode_metrics("lyapunov_grant", &HashMap::new(), &fields, 1);
        let parsed: Value = serde_json::from_str(&result).expect("Should be valid JSON");

        assert!(parsed["field"]["score"].is_null());
    }
}
