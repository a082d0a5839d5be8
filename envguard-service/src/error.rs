//! Service error types

use envguard_connectors::{IngestError, NotifyError, StoreError};
use envguard_core::ConfigError;
use envguard_ml::DetectorError;
use thiserror::Error;

/// Failures that stop a mode from starting or running
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid configuration, fatal at startup
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("notifier error: {0}")]
    Notify(#[from] NotifyError),

    #[error("ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("batch run failed: {0}")]
    Batch(#[from] BatchError),

    /// A background task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Outcome of a batch run that produced no report
#[derive(Debug, Error)]
pub enum BatchError {
    /// The window lacked data; informational, retried at the next tick
    #[error("nothing to analyze: {0}")]
    MissingData(DetectorError),

    #[error("detection failed: {0}")]
    Detector(DetectorError),

    #[error("reading window failed: {0}")]
    Store(#[from] StoreError),

    #[error("sending report failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BatchError {
    pub fn is_missing_data(&self) -> bool {
        matches!(self, BatchError::MissingData(_))
    }
}

impl From<DetectorError> for BatchError {
    fn from(err: DetectorError) -> Self {
        if err.is_missing_data() {
            BatchError::MissingData(err)
        } else {
            BatchError::Detector(err)
        }
    }
}
