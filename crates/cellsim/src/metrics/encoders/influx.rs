use std::collections::HashMap;

use influxdb_line_protocol::LineProtocolBuilder;

use super::FieldValue;
use super::MetricsEncoder;
use crate::metrics::BytesWrapper;

/// InfluxDB line protocol encoder
pub struct InfluxEncoder;

impl InfluxEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsEncoder for InfluxEncoder {
    fn encode_metrics(
        &self,
        measurement: &str,
        tags: &HashMap<String, String>,
        fields: &HashMap<String, FieldValue>,
        timestamp: i64,
    ) -> String {
        let mut builder = LineProtocolBuilder::new().measurement(measurement);

        let mut tag_entries: Vec<_> = tags.iter().collect();
        tag_entries.sort_by_key(|(k, _)| *k);
        for (key, value) in tag_entries {
            builder = builder.tag(key, value);
        }

        // the first field moves the builder into its after-field state
        let mut field_entries: Vec<_> = fields.iter().collect();
        field_entries.sort_by_key(|(k, _)| *k);

        let Some((first_key, first_value)) = field_entries.first() else {
            let lp_built = builder
                .field("_empty", true)
                .timestamp(timestamp)
                .close_line()
                .build();
            return BytesWrapper::from(lp_built).to_string();
        };

        let mut after_first_field = match first_value {
            FieldValue::UnsignedInteger(u) => builder.field(first_key, *u),
            FieldValue::Float(f) => builder.field(first_key, *f),
            FieldValue::Boolean(b) => builder.field(first_key, *b),
        };

        for (key, value) in field_entries.iter().skip(1) {
            after_first_field = match value {
                FieldValue::UnsignedInteger(u) => after_first_field.field(key, *u),
                FieldValue::Float(f) => after_first_field.field(key, *f),
                FieldValue::Boolean(b) => after_first_field.field(key, *b),
            };
        }

        let lp_built = after_first_field.timestamp(timestamp).close_line().build();
        BytesWrapper::from(lp_built).to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_encode_metrics_basic() {
        let encoder = InfluxEncoder::new();
        let mut tags = HashMap::new();
        tags.insert("direction".to_string(), "DL".to_string());
        tags.insert("flow".to_string(), "1:4".to_string());

        let mut fields = HashMap::new();
        fields.insert("score".to_string(), 85.5.into());
        fields.insert("bytes".to_string(), 1024u64.into());

        let result = encoder.encode_metrics("lyapunov_grant", &tags, &fields, 1609459200000000000);

        assert!(result.starts_with("lyapunov_grant,direction=DL,flow=1:4 "));
        assert!(result.contains("score=85.5"));
        assert!(result.contains("bytes=1024u"));
        assert!(result.ends_with(" 1609459200000000000\n"));
    }

    #[test]
    fn test_encode_metrics_empty_fields() {
        let encoder = InfluxEncoder::new();
        let mut tags = HashMap::new();
        tags.insert("direction".to_string(), "UL".to_string());

        let result = encoder.encode_metrics("lyapunov_slot", &tags, &HashMap::new(), 1234567890);

        assert!(result.starts_with("lyapunov_slot,direction=UL"));
        assert!(result.contains("_empty=true"));
    }

    #[test]
    fn test_field_ordering_consistency() {
        let encoder = InfluxEncoder::new();
        let mut fields = HashMap::new();
        fields.insert("z_field".to_string(), 1.0.into());
        fields.insert("a_field".to_string(), 2.0.into());
        fields.insert("m_field".to_string(), 3.0.into());

        let result = encoder.encode_metrics("ordering", &HashMap::new(), &fields, 1234567890);

        let a_pos = result.find("a_field").unwrap();
        let m_pos = result.find("m_field").unwrap();
        let z_pos = result.find("z_field").unwrap();
        assert!(a_pos < m_pos);
        assert!(m_pos < z_pos);
    }

    #[test]
    fn test_field_types() {
        let encoder = InfluxEncoder::new();
        let mut fields = HashMap::new();
        fields.insert("terminated_early".to_string(), false.into());
        fields.insert("units_left".to_string(), 0u64.into());
        fields.insert("score".to_string(), 0.25.into());

        let result = encoder.encode_metrics("types", &HashMap::new(), &fields, 1);

        assert!(result.contains("terminated_early=false"));
        assert!(result.contains("units_left=0u"));
        assert!(result.contains("score=0.25"));
    }
}
