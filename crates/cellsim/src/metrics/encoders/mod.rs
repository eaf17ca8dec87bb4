use std::collections::HashMap;

pub mod influx;
pub mod json;

/// Represents a field value that can be encoded in metrics
#[derive(Debug, Clone, serde::Serialize)]
pub enum FieldValue {
    UnsignedInteger(u64),
    Float(f64),
    Boolean(bool),
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::UnsignedInteger(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Counters of one slot pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlotCounters {
    pub slot: u64,
    pub evaluated: u64,
    pub scored: u64,
    pub grants: u64,
    pub granted_bytes: u64,
    pub departed: u64,
    pub deactivated: u64,
    pub active_flows: u64,
    pub units_left: u64,
    pub terminated_early: bool,
}

/// Trait for encoding metrics data into different formats
pub trait MetricsEncoder: Send + Sync {
    /// Encode metrics with measurement name, tags, fields, and timestamp
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String;

    /// Encode a single grant (convenience method)
    fn encode_grant_metrics(
        &self,
        direction: &str,
        flow: &str,
        slot: u64,
        bytes: u64,
        score: f64,
        timestamp: i64,
    ) -> String {
        let mut tags = HashMap::new();
        tags.insert("direction".to_string(), direction.to_string());
        tags.insert("flow".to_string(), flow.to_string());

        let mut fields = HashMap::new();
        fields.insert("slot".to_string(), slot.into());
        fields.insert("bytes".to_string(), bytes.into());
        fields.insert("score".to_string(), score.into());

        self.encode_metrics("lyapunov_grant", &tags, &fields, timestamp)
    }

    /// Encode the summary of a slot pass (convenience method)
    fn encode_slot_metrics(&self, direction: &str, counters: &SlotCounters, timestamp: i64) -> String {
        let mut tags = HashMap::new();
        tags.insert("direction".to_string(), direction.to_string());

        let mut fields = HashMap::new();
        fields.insert("slot".to_string(), counters.slot.into());
        fields.insert("evaluated".to_string(), counters.evaluated.into());
        fields.insert("scored".to_string(), counters.scored.into());
        fields.insert("grants".to_string(), counters.grants.into());
        fields.insert("granted_bytes".to_string(), counters.granted_bytes.into());
        fields.insert("departed".to_string(), counters.departed.into());
        fields.insert("deactivated".to_string(), counters.deactivated.into());
        fields.insert("active_flows".to_string(), counters.active_flows.into());
        fields.insert("units_left".to_string(), counters.units_left.into());
        fields.insert(
            "terminated_early".to_string(),
            counters.terminated_early.into(),
        );

        self.encode_metrics("lyapunov_slot", &tags, &fields, timestamp)
    }
}

/// Factory function to create encoders based on format string
pub fn create_encoder(format: &str) -> Box<dyn MetricsEncoder + Send + Sync> {
    match format.to_lowercase().as_str() {
        "json" => Box::new(json::JsonEncoder::new()),
        _ => Box::new(influx::InfluxEncoder::new()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_field_value_from_u64() {
        let value: FieldValue = 42u64.into();
        match value {
            FieldValue::UnsignedInteger(u) => assert_eq!(u, 42),
            _ => panic!("Expected UnsignedInteger variant"),
        }
    }

    #[test]
    fn test_field_value_from_f64() {
        let value: FieldValue = 42.5f64.into();
        match value {
            FieldValue::Float(f) => assert_eq!(f, 42.5),
            _ => panic!("Expected Float variant"),
        }
    }

    #[test]
    fn test_create_encoder_json() {
        let encoder = create_encoder("JSON");
        let mut fields = HashMap::new();
        fields.insert("metric".to_string(), 42.0.into());
        let result = encoder.encode_metrics("test_measurement", &HashMap::new(), &fields, 1234567890);
        assert!(result.starts_with('{'));
        assert!(result.contains("test_measurement"));
    }

    #[test]
    fn test_create_encoder_default() {
        let encoder = create_encoder("unknown_format");
        let mut fields = HashMap::new();
        fields.insert("metric".to_string(), 42.0.into());
        let result = encoder.encode_metrics("test_measurement", &HashMap::new(), &fields, 1234567890);
        assert!(result.starts_with("test_measurement "));
    }

    #[test]
    fn test_encode_grant_metrics_influx() {
        let encoder = create_encoder("influx");
        let result = encoder.encode_grant_metrics("DL", "3:4", 17, 1200, 2.5, 1234567890);

        assert!(result.starts_with("lyapunov_grant"));
        assert!(result.contains("direction=DL"));
        assert!(result.contains("flow=3:4"));
        assert!(result.contains("bytes=1200u"));
        assert!(result.contains("slot=17u"));
        assert!(result.contains("score=2.5"));
        assert!(result.contains("1234567890"));
    }

    #[test]
    fn test_encode_slot_metrics_json() {
        let encoder = create_encoder("json");
        let counters = SlotCounters {
            slot: 5,
            evaluated: 4,
            scored: 3,
            grants: 2,
            granted_bytes: 900,
            departed: 1,
            deactivated: 1,
            active_flows: 2,
            units_left: 0,
            terminated_early: true,
        };
        let result = encoder.encode_slot_metrics("UL", &counters, 1234567890);
        let parsed: serde_json::Value = serde_json::from_str(&result).expect("valid JSON");

        assert_eq!(parsed["measure"], "lyapunov_slot");
        assert_eq!(parsed["tag"]["direction"], "UL");
        assert_eq!(parsed["field"]["granted_bytes"], 900);
        assert_eq!(parsed["field"]["terminated_early"], true);
    }
}
