use derive_more::Display;

/// Error type for allocator construction.
///
/// The per-slot pass itself never fails: missing inputs are ordinary control
/// flow and only surface in the slot report.
#[derive(Debug, Display)]
pub enum SchedulerError {
    /// The QoS context directory is a required collaborator.
    #[display("QoS context directory was not provided")]
    MissingQosDirectory,
    /// Configuration is invalid or inconsistent.
    #[display("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },
}

impl core::error::Error for SchedulerError {}

impl SchedulerError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
