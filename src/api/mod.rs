//! HTTP API module for the Payroll Cycle Engine.
//!
//! This module exposes the employee pay cycle and the admin payroll batch
//! as REST endpoints. Execution runs in a background task; clients poll
//! `GET /batch` to observe progress.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    CreateBatchRequest, OverrideRequest, RescheduleRequest, ReviewRequest, StartCycleRequest,
};
pub use response::{ApiError, ApiErrorResponse};
pub use state::{AppState, SharedBatch};
