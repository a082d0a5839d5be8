//! EnvGuard service
//!
//! Wires the detection crates to their adapters and runs one of two modes:
//!
//! - **edge**: subscribe to the broker, store every reading, alert on
//!   out-of-bounds values subject to a per-stream cooldown
//! - **batch**: re-analyze the trailing window with the statistical
//!   detector and send a report of anomaly periods, once or on a schedule

pub mod batch;
pub mod config;
pub mod edge;
pub mod error;

pub use batch::{report_outcome, BatchJob, BatchSummary};
pub use config::{BatchArgs, BatchSettings, EdgeArgs, EdgeSettings, NotifierArgs, NotifierKind, StoreArgs};
pub use edge::{run_edge, EdgeConsumer, EdgeStatus};
pub use error::{BatchError, ServiceError, ServiceResult};
