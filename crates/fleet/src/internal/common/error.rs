use std::time::Duration;

use thiserror::Error;

use crate::CoreId;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Core element with signature `{0}` is not registered")]
    UnknownSignature(String),
    #[error("Core element {0} is not registered")]
    UnknownCore(CoreId),
    #[error("Invalid implementation: {0}")]
    InvalidImplementation(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Connector error: {0}")]
    ConnectorError(String),
    #[error("Resource user did not acknowledge busy resources within {0:?}")]
    AcknowledgeTimeout(Duration),
    #[error("Resource user dropped busy resources without acknowledging them")]
    AcknowledgeDropped,
    #[error("Shutdown timed out, {0} worker(s) did not confirm the stop")]
    ShutdownTimeout(usize),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<serde_json::error::Error> for FleetError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}
impl From<anyhow::Error> for FleetError {
    fn from(e: anyhow::Error) -> Self {
        Self::ConnectorError(format!("{e:#}"))
    }
}
impl From<String> for FleetError {
    fn from(e: String) -> Self {
        Self::GenericError(e)
    }
}
impl From<&str> for FleetError {
    fn from(e: &str) -> Self {
        Self::GenericError(e.to_string())
    }
}
