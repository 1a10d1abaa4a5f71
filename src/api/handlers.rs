//! HTTP request handlers for the Payroll Cycle API.
//!
//! This module contains the handler functions for all API endpoints. Every
//! request is tagged with a correlation id; the events a store queued while
//! serving it are drained and logged under that id.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{
    Adjustment, AdjustmentInput, LeaveRequest, LeaveRequestInput, PaymentReceipt,
    PayrollException, WindowState, WorkflowEvent,
};
use crate::workflow::{
    Actor, BatchStage, BatchSummary, CycleSummary, ExecutionOutcome, PayCycle, PayrollBatch,
    execute_batch, mark_viewed_after,
};

use super::request::{
    CreateBatchRequest, OverrideRequest, RescheduleRequest, ReviewRequest, StartCycleRequest,
};
use super::response::ApiErrorResponse;
use super::state::AppState;

type ApiResult<T> = Result<T, ApiErrorResponse>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/cycle", post(start_cycle_handler).get(get_cycle_handler))
        .route("/cycle/window/open", post(open_window_handler))
        .route("/cycle/window/close", post(close_window_handler))
        .route("/cycle/window/paid", post(mark_paid_handler))
        .route("/cycle/adjustments", post(add_adjustment_handler))
        .route("/cycle/adjustments/:id", delete(withdraw_adjustment_handler))
        .route("/cycle/adjustments/:id/review", post(review_adjustment_handler))
        .route("/cycle/leave", post(add_leave_handler))
        .route("/cycle/leave/:id", delete(withdraw_leave_handler))
        .route("/cycle/leave/:id/review", post(review_leave_handler))
        .route("/cycle/confirm", post(confirm_pay_handler))
        .route("/cycle/no-changes", post(submit_no_changes_handler))
        .route("/batch", post(create_batch_handler).get(get_batch_handler))
        .route("/batch/fx/lock", post(lock_fx_handler))
        .route("/batch/exceptions/:id/resolve", post(resolve_exception_handler))
        .route("/batch/exceptions/:id/snooze", post(snooze_exception_handler))
        .route("/batch/advance", post(advance_handler))
        .route("/batch/approval/request", post(request_approval_handler))
        .route("/batch/approval/view", post(view_approval_handler))
        .route("/batch/approval/approve", post(approve_handler))
        .route("/batch/approval/override", post(override_handler))
        .route("/batch/execute", post(execute_handler))
        .route("/batch/execute/cancel", post(cancel_execution_handler))
        .route(
            "/batch/receipts/:payee_id/reschedule",
            post(reschedule_handler),
        )
        .route("/batch/receipts.csv", get(export_csv_handler))
        .with_state(state)
}

// =============================================================================
// Helpers
// =============================================================================

fn begin(operation: &'static str) -> Uuid {
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, operation, "Processing request");
    correlation_id
}

fn reject(correlation_id: Uuid, operation: &'static str, err: WorkflowError) -> ApiErrorResponse {
    warn!(
        correlation_id = %correlation_id,
        operation,
        error = %err,
        "Request rejected"
    );
    err.into()
}

fn parse_body<T>(
    correlation_id: Uuid,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!(
                correlation_id = %correlation_id,
                error = %rejection.body_text(),
                "Invalid request body"
            );
            Err(rejection.into())
        }
    }
}

fn log_events(correlation_id: Uuid, events: Vec<WorkflowEvent>) {
    for event in events {
        info!(correlation_id = %correlation_id, event = ?event, "Workflow event");
    }
}

/// Runs `f` against the current pay cycle and logs the events it queued.
async fn with_cycle<T>(
    state: &AppState,
    correlation_id: Uuid,
    operation: &'static str,
    f: impl FnOnce(&mut PayCycle) -> WorkflowResult<T>,
) -> ApiResult<T> {
    let started = Instant::now();
    let mut slot = state.cycle().lock().await;
    let cycle = slot.as_mut().ok_or_else(|| {
        reject(
            correlation_id,
            operation,
            WorkflowError::not_found("PayCycle", "current"),
        )
    })?;

    let result = f(cycle);
    log_events(correlation_id, cycle.take_events());
    debug!(
        correlation_id = %correlation_id,
        operation,
        duration_us = started.elapsed().as_micros(),
        "Cycle operation finished"
    );
    result.map_err(|err| reject(correlation_id, operation, err))
}

/// Runs `f` against the current batch and logs the events it queued.
async fn with_batch<T>(
    state: &AppState,
    correlation_id: Uuid,
    operation: &'static str,
    f: impl FnOnce(&mut PayrollBatch) -> WorkflowResult<T>,
) -> ApiResult<T> {
    let started = Instant::now();
    let shared = state
        .current_batch()
        .await
        .map_err(|err| reject(correlation_id, operation, err))?;
    let mut batch = shared.lock().await;

    let result = f(&mut *batch);
    log_events(correlation_id, batch.take_events());
    debug!(
        correlation_id = %correlation_id,
        operation,
        duration_us = started.elapsed().as_micros(),
        "Batch operation finished"
    );
    result.map_err(|err| reject(correlation_id, operation, err))
}

// =============================================================================
// Employee pay cycle
// =============================================================================

/// Handler for POST /cycle.
///
/// Starts a new pay period with a fresh window. An `OPEN` cycle cannot be
/// replaced.
async fn start_cycle_handler(
    State(state): State<AppState>,
    payload: Result<Json<StartCycleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("start_cycle");
    let request = parse_body(correlation_id, payload)?;
    let period = request
        .to_period()
        .map_err(|err| reject(correlation_id, "start_cycle", err))?;

    let mut slot = state.cycle().lock().await;
    if let Some(current) = slot.as_ref() {
        if current.window_state() == WindowState::Open {
            return Err(reject(
                correlation_id,
                "start_cycle",
                WorkflowError::invalid_state(
                    "start_cycle",
                    format!("period '{}' is still OPEN", current.period().id),
                ),
            ));
        }
    }

    let mut cycle = PayCycle::new(period, state.clock().clone());
    if request.open {
        cycle
            .open_window()
            .map_err(|err| reject(correlation_id, "start_cycle", err))?;
    }
    log_events(correlation_id, cycle.take_events());
    info!(
        correlation_id = %correlation_id,
        period = %cycle.period().id,
        window_state = %cycle.window_state(),
        "Pay cycle started"
    );

    let summary = cycle.summary();
    *slot = Some(cycle);
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Handler for GET /cycle.
async fn get_cycle_handler(State(state): State<AppState>) -> ApiResult<Json<CycleSummary>> {
    let correlation_id = begin("get_cycle");
    with_cycle(&state, correlation_id, "get_cycle", |cycle| Ok(cycle.summary()))
        .await
        .map(Json)
}

/// Handler for POST /cycle/window/open.
async fn open_window_handler(State(state): State<AppState>) -> ApiResult<Json<CycleSummary>> {
    let correlation_id = begin("open_window");
    with_cycle(&state, correlation_id, "open_window", |cycle| {
        cycle.open_window()?;
        Ok(cycle.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/window/close.
async fn close_window_handler(State(state): State<AppState>) -> ApiResult<Json<CycleSummary>> {
    let correlation_id = begin("close_window");
    with_cycle(&state, correlation_id, "close_window", |cycle| {
        cycle.close_window()?;
        Ok(cycle.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/window/paid.
async fn mark_paid_handler(State(state): State<AppState>) -> ApiResult<Json<CycleSummary>> {
    let correlation_id = begin("mark_paid");
    with_cycle(&state, correlation_id, "mark_paid", |cycle| {
        cycle.mark_paid()?;
        Ok(cycle.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/adjustments.
async fn add_adjustment_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdjustmentInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("add_adjustment");
    let input = parse_body(correlation_id, payload)?;
    let adjustment = with_cycle(&state, correlation_id, "add_adjustment", |cycle| {
        cycle.add_adjustment(input)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(adjustment)))
}

/// Handler for DELETE /cycle/adjustments/:id.
async fn withdraw_adjustment_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Adjustment>> {
    let correlation_id = begin("withdraw_adjustment");
    with_cycle(&state, correlation_id, "withdraw_adjustment", |cycle| {
        cycle.withdraw_adjustment(id)
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/adjustments/:id/review.
async fn review_adjustment_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<Adjustment>> {
    let correlation_id = begin("review_adjustment");
    let request = parse_body(correlation_id, payload)?;
    with_cycle(&state, correlation_id, "review_adjustment", |cycle| {
        cycle.review_adjustment(id, request.status)
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/leave.
async fn add_leave_handler(
    State(state): State<AppState>,
    payload: Result<Json<LeaveRequestInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("add_leave_request");
    let input = parse_body(correlation_id, payload)?;
    let request = with_cycle(&state, correlation_id, "add_leave_request", |cycle| {
        cycle.add_leave_request(input)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Handler for DELETE /cycle/leave/:id.
async fn withdraw_leave_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<LeaveRequest>> {
    let correlation_id = begin("withdraw_leave_request");
    with_cycle(&state, correlation_id, "withdraw_leave_request", |cycle| {
        cycle.withdraw_leave_request(id)
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/leave/:id/review.
async fn review_leave_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<LeaveRequest>> {
    let correlation_id = begin("review_leave_request");
    let request = parse_body(correlation_id, payload)?;
    with_cycle(&state, correlation_id, "review_leave_request", |cycle| {
        cycle.review_leave_request(id, request.status)
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/confirm.
async fn confirm_pay_handler(State(state): State<AppState>) -> ApiResult<Json<CycleSummary>> {
    let correlation_id = begin("confirm_pay");
    with_cycle(&state, correlation_id, "confirm_pay", |cycle| {
        cycle.confirm_pay()?;
        Ok(cycle.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /cycle/no-changes.
async fn submit_no_changes_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<CycleSummary>> {
    let correlation_id = begin("submit_no_changes");
    with_cycle(&state, correlation_id, "submit_no_changes", |cycle| {
        cycle.submit_no_changes()?;
        Ok(cycle.summary())
    })
    .await
    .map(Json)
}

// =============================================================================
// Admin batch
// =============================================================================

/// Handler for POST /batch.
///
/// Exceptions are detected from the payments when the body omits them.
async fn create_batch_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateBatchRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("create_batch");
    let request = parse_body(correlation_id, payload)?;
    let config = state.config().clone();
    let clock = state.clock().clone();

    let batch = match request.exceptions {
        Some(exceptions) => PayrollBatch::new(
            request.id,
            request.pay_date,
            request.payments,
            exceptions,
            config,
            clock,
        ),
        None => PayrollBatch::with_detected_exceptions(
            request.id,
            request.pay_date,
            request.payments,
            config,
            clock,
        ),
    }
    .map_err(|err| reject(correlation_id, "create_batch", err))?;

    let summary = batch.summary();
    state
        .replace_batch(batch)
        .await
        .map_err(|err| reject(correlation_id, "create_batch", err))?;

    info!(
        correlation_id = %correlation_id,
        batch_id = %summary.id,
        payments = summary.payments.len(),
        exceptions = summary.exceptions.len(),
        requires_approval = summary.requires_approval,
        "Payroll batch created"
    );
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Handler for GET /batch.
async fn get_batch_handler(State(state): State<AppState>) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("get_batch");
    with_batch(&state, correlation_id, "get_batch", |batch| Ok(batch.summary()))
        .await
        .map(Json)
}

/// Handler for POST /batch/fx/lock.
async fn lock_fx_handler(State(state): State<AppState>) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("lock_fx_rates");
    with_batch(&state, correlation_id, "lock_fx_rates", |batch| {
        batch.lock_fx_rates()?;
        Ok(batch.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/exceptions/:id/resolve.
async fn resolve_exception_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PayrollException>> {
    let correlation_id = begin("resolve_exception");
    with_batch(&state, correlation_id, "resolve_exception", |batch| {
        batch.resolve_exception(&id)
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/exceptions/:id/snooze.
async fn snooze_exception_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PayrollException>> {
    let correlation_id = begin("snooze_exception");
    with_batch(&state, correlation_id, "snooze_exception", |batch| {
        batch.snooze_exception(&id)
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/advance.
async fn advance_handler(State(state): State<AppState>) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("advance_to_approval");
    with_batch(&state, correlation_id, "advance_to_approval", |batch| {
        batch.advance_to_approval()?;
        Ok(batch.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/approval/request.
///
/// Schedules the simulated approver view after the configured delay. A zero
/// delay leaves the view to `POST /batch/approval/view`.
async fn request_approval_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("request_approval");
    let summary = with_batch(&state, correlation_id, "request_approval", |batch| {
        batch.request_approval()?;
        Ok(batch.summary())
    })
    .await?;

    let delay = state.config().view_delay();
    if !delay.is_zero() {
        let shared = state
            .current_batch()
            .await
            .map_err(|err| reject(correlation_id, "request_approval", err))?;
        tokio::spawn(async move {
            match mark_viewed_after(&shared, delay).await {
                Ok(viewed) => {
                    log_events(correlation_id, shared.lock().await.take_events());
                    debug!(correlation_id = %correlation_id, viewed, "Approver view simulated");
                }
                Err(err) => {
                    warn!(correlation_id = %correlation_id, error = %err, "Approver view failed");
                }
            }
        });
    }

    Ok(Json(summary))
}

/// Handler for POST /batch/approval/view.
async fn view_approval_handler(State(state): State<AppState>) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("mark_approval_viewed");
    with_batch(&state, correlation_id, "mark_approval_viewed", |batch| {
        batch.mark_approval_viewed()?;
        Ok(batch.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/approval/approve.
async fn approve_handler(State(state): State<AppState>) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("approve");
    with_batch(&state, correlation_id, "approve", |batch| {
        batch.approve()?;
        Ok(batch.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/approval/override.
async fn override_handler(
    State(state): State<AppState>,
    payload: Result<Json<OverrideRequest>, JsonRejection>,
) -> ApiResult<Json<BatchSummary>> {
    let correlation_id = begin("admin_override");
    let actor: Actor = parse_body(correlation_id, payload)?.into();
    with_batch(&state, correlation_id, "admin_override", |batch| {
        batch.admin_override(&actor)?;
        Ok(batch.summary())
    })
    .await
    .map(Json)
}

/// Handler for POST /batch/execute.
///
/// Gating is checked before responding; the sequential run itself continues
/// in the background. Poll `GET /batch` for progress.
async fn execute_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("execute_batch");
    let (shared, token) = state
        .start_run()
        .await
        .map_err(|err| reject(correlation_id, "execute_batch", err))?;

    let summary = {
        let mut batch = shared.lock().await;
        let result = match batch.stage() {
            BatchStage::Approval => batch.begin_execution(),
            BatchStage::Execution => Ok(()),
            stage => Err(WorkflowError::invalid_state(
                "execute_batch",
                format!("batch is in {}, expected approval", stage),
            )),
        };
        log_events(correlation_id, batch.take_events());
        if let Err(err) = result {
            state.finish_run().await;
            return Err(reject(correlation_id, "execute_batch", err));
        }
        batch.summary()
    };

    let task_state = state.clone();
    tokio::spawn(async move {
        let outcome = execute_batch(&shared, task_state.latency().as_ref(), &token).await;
        log_events(correlation_id, shared.lock().await.take_events());
        match outcome {
            Ok(ExecutionOutcome::Completed { receipts }) => {
                info!(
                    correlation_id = %correlation_id,
                    receipts = receipts.len(),
                    "Execution run finished"
                );
            }
            Ok(ExecutionOutcome::Cancelled {
                completed,
                remaining,
            }) => {
                info!(
                    correlation_id = %correlation_id,
                    completed,
                    remaining,
                    "Execution run cancelled"
                );
            }
            Err(err) => {
                warn!(correlation_id = %correlation_id, error = %err, "Execution run failed");
            }
        }
        task_state.finish_run().await;
    });

    Ok((StatusCode::ACCEPTED, Json(summary)))
}

/// Handler for POST /batch/execute/cancel.
async fn cancel_execution_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("cancel_execution");
    state
        .cancel_run()
        .await
        .map_err(|err| reject(correlation_id, "cancel_execution", err))?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "cancelled": true }))))
}

/// Handler for POST /batch/receipts/:payee_id/reschedule.
async fn reschedule_handler(
    State(state): State<AppState>,
    Path(payee_id): Path<String>,
    payload: Result<Json<RescheduleRequest>, JsonRejection>,
) -> ApiResult<Json<PaymentReceipt>> {
    let correlation_id = begin("reschedule_receipt");
    let request = parse_body(correlation_id, payload)?;
    with_batch(&state, correlation_id, "reschedule_receipt", |batch| {
        batch.reschedule_receipt(&payee_id, request.new_date, request.reason, request.notify)
    })
    .await
    .map(Json)
}

/// Handler for GET /batch/receipts.csv.
async fn export_csv_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let correlation_id = begin("export_csv");
    let (batch_id, csv) = with_batch(&state, correlation_id, "export_csv", |batch| {
        Ok((batch.id().to_string(), batch.export_csv()?))
    })
    .await?;

    let disposition = format!("attachment; filename=\"receipts-{}.csv\"", batch_id);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let config = ConfigLoader::load("./config/payroll").expect("Failed to load config");
        AppState::from_loader(config)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        let body = body.map_or_else(Body::empty, |v| Body::from(v.to_string()));
        let response = router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_get_cycle_without_cycle_returns_404() {
        let router = create_router(create_test_state());
        let (status, body) = send(&router, "GET", "/cycle", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_start_cycle_returns_201() {
        let router = create_router(create_test_state());
        let (status, body) = send(
            &router,
            "POST",
            "/cycle",
            Some(json!({
                "id": "2026-03",
                "label": "March 2026",
                "start_date": "2026-03-01",
                "end_date": "2026-03-31",
                "open": true
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["window_state"], "OPEN");
        assert_eq!(body["confirmed"], false);
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cycle")
                    .header("Content-Type", "application/json")
                    .body(Body::from("{ not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch_routes_without_batch_return_404() {
        let router = create_router(create_test_state());
        for (method, uri) in [
            ("GET", "/batch"),
            ("POST", "/batch/fx/lock"),
            ("POST", "/batch/approval/approve"),
            ("GET", "/batch/receipts.csv"),
        ] {
            let (status, _) = send(&router, method, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_execute_without_batch_does_not_register_run() {
        let router = create_router(create_test_state());
        let (status, _) = send(&router, "POST", "/batch/execute", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // No run was left behind to cancel
        let (status, _) = send(&router, "POST", "/batch/execute/cancel", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_cancel_without_run_returns_409() {
        let router = create_router(create_test_state());
        let (status, body) = send(&router, "POST", "/batch/execute/cancel", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_STATE");
    }
}
