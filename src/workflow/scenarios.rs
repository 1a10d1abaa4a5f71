//! End-to-end workflow scenarios.
//!
//! These tests drive the employee cycle and the admin batch the way the
//! dashboards do, and check the cross-component guarantees: withdrawal
//! gating, approval thresholds, strictly sequential execution observed
//! mid-run, and the reconciliation export.

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use tokio::sync::{Mutex, Semaphore, mpsc};
    use tokio_util::sync::CancellationToken;

    use crate::config::WorkflowConfig;
    use crate::error::WorkflowError;
    use crate::models::{
        AdjustmentInput, AdjustmentType, ContractorPayment, EmploymentType, ExceptionType,
        LeaveRequestInput, LeaveType, PayPeriod, PayrollException, Severity, SubmissionStatus,
        WindowState,
    };
    use crate::workflow::{
        Actor, BatchStage, ExecutionOutcome, ItemStatus, Latency, ManualClock, PayCycle,
        PayrollBatch, Role, execute_batch, requires_approval,
    };

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap(),
        ))
    }

    fn march_cycle() -> PayCycle {
        let period =
            PayPeriod::new("2026-03", "March 2026", date(2026, 3, 1), date(2026, 3, 31)).unwrap();
        PayCycle::new(period, clock())
    }

    fn expense() -> AdjustmentInput {
        AdjustmentInput {
            adjustment_type: AdjustmentType::Expense,
            label: String::new(),
            amount: Some(dec("89.90")),
            description: "Train tickets to client site".to_string(),
            hours: None,
            receipt_ref: Some("RCPT-2231".to_string()),
        }
    }

    fn two_day_leave(start: NaiveDate) -> LeaveRequestInput {
        LeaveRequestInput {
            leave_type: LeaveType::Annual,
            start_date: start,
            end_date: start + chrono::Duration::days(1),
            total_days: dec("2"),
            reason: None,
        }
    }

    fn payment(id: &str, kind: EmploymentType, net_pay: &str, taxes: Option<&str>) -> ContractorPayment {
        ContractorPayment {
            id: id.to_string(),
            name: format!("Payee {}", id),
            country: "PT".to_string(),
            currency: "EUR".to_string(),
            net_pay: dec(net_pay),
            est_fees: dec("4.00"),
            fx_rate: dec("0.92"),
            employment_type: kind,
            employer_taxes: taxes.map(dec),
            bank_details_on_file: true,
            documents_expire_on: None,
        }
    }

    fn contractor(id: &str) -> ContractorPayment {
        payment(id, EmploymentType::Contractor, "3200", None)
    }

    fn new_batch(
        payments: Vec<ContractorPayment>,
        exceptions: Vec<PayrollException>,
    ) -> PayrollBatch {
        PayrollBatch::new(
            "2026-03-A",
            date(2026, 3, 31),
            payments,
            exceptions,
            Arc::new(WorkflowConfig::default()),
            clock(),
        )
        .unwrap()
    }

    /// Lets a test release payments one at a time and observe each start.
    struct GatedLatency {
        started: mpsc::UnboundedSender<String>,
        release: Semaphore,
    }

    #[async_trait]
    impl Latency for GatedLatency {
        async fn wait(&self, payment: &ContractorPayment) {
            let _ = self.started.send(payment.id.clone());
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }
    }

    fn statuses(batch: &PayrollBatch) -> Vec<ItemStatus> {
        batch
            .execution()
            .map(|s| s.items().iter().map(|i| i.status).collect())
            .unwrap_or_default()
    }

    // ==========================================================================
    // Leave request filed while OPEN, split by period, withdrawal gating
    // ==========================================================================

    #[test]
    fn test_leave_request_lifecycle() {
        let mut cycle = march_cycle();
        cycle.open_window().unwrap();

        let inside = cycle.add_leave_request(two_day_leave(date(2026, 3, 19))).unwrap();
        assert_eq!(cycle.leave_this_period().len(), 1);
        assert!(cycle.leave_upcoming().is_empty());

        cycle.withdraw_leave_request(inside.id).unwrap();
        assert!(cycle.leave_requests().is_empty());

        let upcoming = cycle.add_leave_request(two_day_leave(date(2026, 4, 9))).unwrap();
        assert!(cycle.leave_this_period().is_empty());
        assert_eq!(cycle.leave_upcoming()[0].id, upcoming.id);

        cycle.close_window().unwrap();
        let result = cycle.withdraw_leave_request(upcoming.id);
        assert!(matches!(result, Err(WorkflowError::InvalidState { .. })));
        assert_eq!(cycle.leave_requests().len(), 1);
    }

    #[test]
    fn test_leave_straddling_period_end_counts_this_period() {
        let mut cycle = march_cycle();
        cycle.open_window().unwrap();
        cycle.add_leave_request(two_day_leave(date(2026, 3, 31))).unwrap();
        assert_eq!(cycle.leave_this_period().len(), 1);
    }

    #[test]
    fn test_confirm_pay_never_succeeds_after_open() {
        let mut cycle = march_cycle();
        cycle.open_window().unwrap();
        cycle.confirm_pay().unwrap();
        cycle.confirm_pay().unwrap();

        cycle.close_window().unwrap();
        assert!(cycle.confirm_pay().is_err());
        cycle.mark_paid().unwrap();
        assert!(cycle.confirm_pay().is_err());
        assert!(cycle.submit_no_changes().is_err());
        assert!(cycle.is_confirmed());
    }

    #[test]
    fn test_duplicate_adjustments_are_accepted() {
        let mut cycle = march_cycle();
        cycle.open_window().unwrap();
        let first = cycle.add_adjustment(expense()).unwrap();
        let second = cycle.add_adjustment(expense()).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(cycle.adjustments().len(), 2);
        assert_eq!(cycle.summary().pending_adjustment_total, dec("179.80"));
    }

    // ==========================================================================
    // Approval threshold: 2 employees ($30K + $25K) and 3 contractors
    // ==========================================================================

    #[test]
    fn test_employee_cost_above_threshold_requires_approval() {
        let payments = vec![
            payment("emp_001", EmploymentType::Employee, "24000", Some("6000")),
            payment("emp_002", EmploymentType::Employee, "20000", Some("5000")),
            contractor("ctr_001"),
            contractor("ctr_002"),
            contractor("ctr_003"),
        ];
        let mut batch = new_batch(payments, vec![]);
        batch.lock_fx_rates().unwrap();
        batch.advance_to_approval().unwrap();

        assert!(batch.approval().requires_approval());
        assert_eq!(batch.approval().employee_total_cost(), dec("55000"));
        assert!(matches!(
            batch.begin_execution(),
            Err(WorkflowError::InvalidState { .. })
        ));

        batch.request_approval().unwrap();
        batch.mark_approval_viewed().unwrap();
        batch.approve().unwrap();
        batch.begin_execution().unwrap();
        assert_eq!(batch.stage(), BatchStage::Execution);
    }

    #[test]
    fn test_override_skips_request_and_view() {
        let payments = vec![payment("emp_001", EmploymentType::Employee, "52000", Some("0"))];
        let mut batch = new_batch(payments, vec![]);
        batch.lock_fx_rates().unwrap();
        batch.advance_to_approval().unwrap();

        batch.admin_override(&Actor::new("Dana", Role::Admin)).unwrap();
        let timeline = batch.approval().timeline();
        assert!(timeline.requested.is_none());
        assert!(timeline.viewed.is_none());
        assert!(timeline.approved.is_some());
        assert!(batch.can_execute());
    }

    // ==========================================================================
    // Exceptions gate the pipeline
    // ==========================================================================

    #[test]
    fn test_batch_cannot_execute_with_active_exceptions() {
        let exceptions = vec![
            PayrollException::new("exc_001", "ctr_001", ExceptionType::MissingBank, Severity::High),
            PayrollException::new("exc_002", "ctr_002", ExceptionType::HolidayRails, Severity::Low),
        ];
        let mut batch = new_batch(vec![contractor("ctr_001"), contractor("ctr_002")], exceptions);
        batch.lock_fx_rates().unwrap();

        assert!(batch.advance_to_approval().is_err());
        assert!(batch.begin_execution().is_err());
        assert!(!batch.can_execute());

        batch.resolve_exception("exc_001").unwrap();
        assert!(batch.snooze_exception("exc_001").is_err());
        batch.snooze_exception("exc_002").unwrap();

        batch.advance_to_approval().unwrap();
        assert!(batch.can_execute());
    }

    // ==========================================================================
    // 4 contractors executed one at a time, observed mid-run
    // ==========================================================================

    #[tokio::test]
    async fn test_execution_observed_mid_run() {
        let ids = ["ctr_001", "ctr_002", "ctr_003", "ctr_004"];
        let mut batch = new_batch(ids.iter().map(|id| contractor(id)).collect(), vec![]);
        batch.lock_fx_rates().unwrap();
        batch.advance_to_approval().unwrap();

        let batch = Arc::new(Mutex::new(batch));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let latency = Arc::new(GatedLatency {
            started: started_tx,
            release: Semaphore::new(0),
        });

        let run = tokio::spawn({
            let batch = batch.clone();
            let latency = latency.clone();
            async move {
                execute_batch(&batch, latency.as_ref(), &CancellationToken::new()).await
            }
        });

        for (i, expected) in ids.iter().enumerate() {
            let started = started_rx.recv().await.unwrap();
            assert_eq!(&started, expected);

            let observed = statuses(&*batch.lock().await);
            let mut want = vec![ItemStatus::Pending; ids.len()];
            for status in &mut want[..i] {
                *status = ItemStatus::Complete;
            }
            want[i] = ItemStatus::Processing;
            assert_eq!(observed, want);

            latency.release.add_permits(1);
        }

        let outcome = run.await.unwrap().unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Completed { ref receipts } if receipts.len() == 4));

        let guard = batch.lock().await;
        assert_eq!(guard.stage(), BatchStage::Reconciliation);
        assert_eq!(statuses(&guard), vec![ItemStatus::Complete; 4]);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_prefix_complete() {
        let ids = ["ctr_001", "ctr_002", "ctr_003", "ctr_004"];
        let mut batch = new_batch(ids.iter().map(|id| contractor(id)).collect(), vec![]);
        batch.lock_fx_rates().unwrap();
        batch.advance_to_approval().unwrap();

        let batch = Arc::new(Mutex::new(batch));
        let cancel = CancellationToken::new();
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let latency = Arc::new(GatedLatency {
            started: started_tx,
            release: Semaphore::new(0),
        });

        let run = tokio::spawn({
            let batch = batch.clone();
            let latency = latency.clone();
            let cancel = cancel.clone();
            async move { execute_batch(&batch, latency.as_ref(), &cancel).await }
        });

        started_rx.recv().await.unwrap();
        latency.release.add_permits(1);
        assert_eq!(started_rx.recv().await.unwrap(), "ctr_002");
        cancel.cancel();

        let outcome = run.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            ExecutionOutcome::Cancelled {
                completed: 1,
                remaining: 3
            }
        );
        let guard = batch.lock().await;
        assert_eq!(
            statuses(&guard),
            vec![
                ItemStatus::Complete,
                ItemStatus::Pending,
                ItemStatus::Pending,
                ItemStatus::Pending
            ]
        );
        assert_eq!(guard.reconciliation().len(), 1);
    }

    // ==========================================================================
    // Reconciliation export with 3 receipts
    // ==========================================================================

    #[test]
    fn test_export_three_receipts() {
        let mut eur = contractor("ctr_001");
        eur.net_pay = dec("4250.00");
        let mut usd = contractor("ctr_002");
        usd.currency = "USD".to_string();
        usd.country = "US".to_string();
        usd.fx_rate = Decimal::ONE;
        let mut gbp = contractor("ctr_003");
        gbp.currency = "GBP".to_string();
        gbp.country = "GB".to_string();
        gbp.fx_rate = dec("0.79");

        let mut batch = new_batch(vec![eur, usd, gbp], vec![]);
        batch.lock_fx_rates().unwrap();
        batch.advance_to_approval().unwrap();
        batch.begin_execution().unwrap();
        while batch.stage() == BatchStage::Execution {
            batch.start_next_payment().unwrap();
            batch.complete_current_payment().unwrap();
        }

        let csv = batch.export_csv().unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(
            headers,
            vec![
                "payee_id", "payee_name", "amount", "currency", "status", "rail", "reference",
                "paid_at", "fx_rate", "fx_fee", "processing_fee", "fx_spread", "eta"
            ]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][2], "4250.00");
        assert_eq!(&rows[1][4], "InTransit");
        assert_eq!(&rows[1][5], "ACH");
        assert_eq!(&rows[2][5], "Faster Payments");
        assert!(!csv.contains('$') && !csv.contains('£') && !csv.contains('€'));
    }

    // ==========================================================================
    // Properties
    // ==========================================================================

    fn window_state() -> impl Strategy<Value = WindowState> {
        prop_oneof![
            Just(WindowState::None),
            Just(WindowState::Open),
            Just(WindowState::Closed),
            Just(WindowState::Paid),
        ]
    }

    fn decision() -> impl Strategy<Value = Option<SubmissionStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(SubmissionStatus::AdminApproved)),
            Just(Some(SubmissionStatus::AdminRejected)),
            Just(Some(SubmissionStatus::QueuedForNextCycle)),
        ]
    }

    fn drive_to(cycle: &mut PayCycle, target: WindowState) {
        if target == WindowState::Open {
            return;
        }
        cycle.close_window().unwrap();
        if target == WindowState::Paid {
            cycle.mark_paid().unwrap();
        }
    }

    proptest! {
        #[test]
        fn prop_withdraw_succeeds_iff_pending_and_open(
            target in window_state(),
            review in decision(),
        ) {
            let mut cycle = march_cycle();
            cycle.open_window().unwrap();
            let adjustment = cycle.add_adjustment(expense()).unwrap();
            if let Some(status) = review {
                cycle.review_adjustment(adjustment.id, status).unwrap();
            }

            if target == WindowState::None {
                // A window never returns to NONE; a fresh cycle has no entries.
                let mut fresh = march_cycle();
                prop_assert!(fresh.withdraw_adjustment(adjustment.id).is_err());
                return Ok(());
            }
            drive_to(&mut cycle, target);

            let should_succeed = review.is_none() && target == WindowState::Open;
            let result = cycle.withdraw_adjustment(adjustment.id);
            prop_assert_eq!(result.is_ok(), should_succeed);
            if !should_succeed {
                prop_assert!(
                    matches!(result, Err(WorkflowError::InvalidState { .. })),
                    "expected InvalidState"
                );
                prop_assert_eq!(cycle.adjustments().len(), 1);
            } else {
                prop_assert!(cycle.adjustments().is_empty());
            }
        }

        #[test]
        fn prop_requires_approval_counts_employees_only(
            employees in prop::collection::vec((1_000i64..40_000, 0i64..10_000), 0..4),
            contractors in prop::collection::vec(1_000i64..200_000, 0..4),
        ) {
            let mut payments = Vec::new();
            let mut expected = Decimal::ZERO;
            for (i, (net, taxes)) in employees.iter().enumerate() {
                let mut p = payment(&format!("emp_{}", i), EmploymentType::Employee, "1", Some("0"));
                p.net_pay = Decimal::new(*net, 0);
                p.employer_taxes = Some(Decimal::new(*taxes, 0));
                expected += p.net_pay + Decimal::new(*taxes, 0);
                payments.push(p);
            }
            let employee_only = requires_approval(&payments, dec("50000"));
            for (i, net) in contractors.iter().enumerate() {
                let mut p = contractor(&format!("ctr_{}", i));
                p.net_pay = Decimal::new(*net, 0);
                payments.push(p);
            }

            prop_assert_eq!(requires_approval(&payments, dec("50000")), expected > dec("50000"));
            prop_assert_eq!(requires_approval(&payments, dec("50000")), employee_only);
        }
    }
}
