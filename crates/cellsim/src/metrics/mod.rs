//! Per-slot metrics emitted on the `metrics` tracing target.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use api_types::LinkDirection;
use lyapunov::SlotReport;

pub mod encoders;

use encoders::{create_encoder, MetricsEncoder, SlotCounters};

// Wrapper struct for Vec<u8> that implements Display
pub struct BytesWrapper(Vec<u8>);

impl fmt::Display for BytesWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "");
        }

        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "{s}"),
            Err(_) => {
                tracing::error!("metrics line is not valid UTF-8");
                Err(fmt::Error)
            }
        }
    }
}

impl From<Vec<u8>> for BytesWrapper {
    fn from(bytes: Vec<u8>) -> Self {
        BytesWrapper(bytes)
    }
}

/// Encodes slot reports and stamps them on a simulated timeline.
///
/// Slot `n` is stamped `start + n * slot duration`, so a replayed run lines up
/// with the wall clock of its start.
pub struct SlotRecorder {
    encoder: Box<dyn MetricsEncoder + Send + Sync>,
    direction: LinkDirection,
    start_ns: i64,
    slot_duration_ns: i64,
}

impl SlotRecorder {
    pub fn new(format: &str, direction: LinkDirection, slot_duration_us: u64) -> Self {
        Self::with_start(format, direction, slot_duration_us, current_time_ns())
    }

    pub fn with_start(
        format: &str,
        direction: LinkDirection,
        slot_duration_us: u64,
        start_ns: i64,
    ) -> Self {
        Self {
            encoder: create_encoder(format),
            direction,
            start_ns,
            slot_duration_ns: i64::try_from(slot_duration_us.saturating_mul(1000))
                .unwrap_or(i64::MAX),
        }
    }

    pub fn timestamp(&self, slot: u64) -> i64 {
        let offset = i64::try_from(slot)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.slot_duration_ns);
        self.start_ns.saturating_add(offset)
    }

    /// One line per grant followed by the slot summary line.
    pub fn encode(&self, counters: &SlotCounters, report: &SlotReport) -> Vec<String> {
        let direction = self.direction.to_string();
        let timestamp = self.timestamp(counters.slot);
        let mut lines: Vec<String> = report
            .grants
            .iter()
            .map(|grant| {
                self.encoder.encode_grant_metrics(
                    &direction,
                    &grant.flow.to_string(),
                    counters.slot,
                    grant.bytes,
                    grant.score,
                    timestamp,
                )
            })
            .collect();
        lines.push(
            self.encoder
                .encode_slot_metrics(&direction, counters, timestamp),
        );
        lines
    }

    pub fn record(&self, counters: &SlotCounters, report: &SlotReport) {
        for lp_str in self.encode(counters, report) {
            tracing::info!(target: "metrics", msg = %lp_str);
        }
    }
}

fn current_time_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use api_types::FlowId;
    use lyapunov::Grant;
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn timestamps_follow_slot_duration() {
        let recorder = SlotRecorder::with_start("influx", LinkDirection::Downlink, 500, 1_000);
        assert_eq!(recorder.timestamp(0), 1_000);
        assert_eq!(recorder.timestamp(4), 1_000 + 4 * 500_000);
    }

    #[test]
    fn encodes_grants_before_summary() {
        let recorder = SlotRecorder::with_start("influx", LinkDirection::Uplink, 1000, 0);
        let report = SlotReport {
            grants: vec![
                Grant {
                    flow: FlowId::new(2, 1),
                    bytes: 300,
                    score: 12.0,
                },
                Grant {
                    flow: FlowId::new(1, 1),
                    bytes: 100,
                    score: 4.0,
                },
            ],
            ..Default::default()
        };
        let counters = SlotCounters {
            slot: 3,
            grants: 2,
            granted_bytes: 400,
            ..Default::default()
        };

        let lines = recorder.encode(&counters, &report);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("lyapunov_grant,direction=UL,flow=2:1 "));
        assert!(lines[1].contains("flow=1:1"));
        assert!(lines[2].starts_with("lyapunov_slot,direction=UL "));
        assert!(lines[2].contains("granted_bytes=400u"));
        assert!(lines[2].ends_with(" 3000000\n"));
    }
}
