//! Budget threshold evaluation engine

use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{Budget, BudgetAlert, DeliveryState, NotificationChannel};

use super::message::render_alert_message;
use super::threshold::{candidate_alerts, percentage_used};
use super::{AlertStore, BudgetSource, SpendingSource};

/// Budget that could not be evaluated during a batch
#[derive(Debug, Clone, Serialize)]
pub struct BudgetFailure {
    pub budget_id: Uuid,
    pub error: String,
}

/// Outcome of evaluating a batch of budgets
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Budgets looked at
    pub evaluated: usize,
    /// Alerts created
    pub alerts: Vec<BudgetAlert>,
    /// Budgets whose evaluation failed
    pub failures: Vec<BudgetFailure>,
}

/// Evaluates budgets against spending and records deduplicated alerts
pub struct ThresholdEvaluator {
    budgets: Arc<dyn BudgetSource>,
    spending: Arc<dyn SpendingSource>,
    alerts: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    /// Lookback for suppressing repeat alerts of the same type
    dedup_window: Duration,
    /// Channels attached to new alerts
    channels: Vec<NotificationChannel>,
}

impl ThresholdEvaluator {
    /// Create an evaluator with a 24 hour dedup window and the default channels
    pub fn new(
        budgets: Arc<dyn BudgetSource>,
        spending: Arc<dyn SpendingSource>,
        alerts: Arc<dyn AlertStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            budgets,
            spending,
            alerts,
            clock,
            dedup_window: Duration::hours(24),
            channels: NotificationChannel::defaults(),
        }
    }

    pub fn with_dedup_window(mut self, window: std::time::Duration) -> Self {
        match Duration::from_std(window) {
            Ok(window) => self.dedup_window = window,
            Err(_) => warn!(?window, "Dedup window out of range, keeping default"),
        }
        self
    }

    pub fn with_channels(mut self, channels: Vec<NotificationChannel>) -> Self {
        if !channels.is_empty() {
            self.channels = channels;
        }
        self
    }

    /// Run the periodic sweep until the task is dropped.
    ///
    /// Only alerts marked sent suppress a repeat, so while budgets stay over
    /// a threshold every tick inserts another unsent row. `budget_alerts`
    /// keeps growing until those rows are marked sent or removed with
    /// `AlertRepository::delete_older_than` (the `purge-alerts` command).
    pub async fn start(self: Arc<Self>, every: std::time::Duration) {
        info!(interval = ?every, "Starting budget alert sweeper");

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.sweep().await {
                Ok(report) => info!(
                    evaluated = report.evaluated,
                    alerts = report.alerts.len(),
                    failures = report.failures.len(),
                    "Budget sweep finished"
                ),
                Err(e) => error!(error = %e, "Error sweeping budgets"),
            }
        }
    }

    /// Evaluate every active budget that covers today and has an alert toggle on
    pub async fn sweep(&self) -> Result<SweepReport> {
        let today = self.clock.today();
        let budgets = self.budgets.budgets_requiring_alert_check(today).await?;

        debug!(count = budgets.len(), %today, "Sweeping budgets");

        Ok(self.evaluate_batch(&budgets).await)
    }

    /// Evaluate every active budget of one customer
    pub async fn check_owner(&self, cif_id: &str) -> Result<SweepReport> {
        let budgets = self.budgets.active_budgets_for_owner(cif_id).await?;

        debug!(cif_id, count = budgets.len(), "Checking budget alerts");

        Ok(self.evaluate_batch(&budgets).await)
    }

    async fn evaluate_batch(&self, budgets: &[Budget]) -> SweepReport {
        let mut report = SweepReport {
            evaluated: budgets.len(),
            ..Default::default()
        };

        for budget in budgets {
            match self.evaluate_budget(budget).await {
                Ok(Some(alert)) => report.alerts.push(alert),
                Ok(None) => {}
                Err(e) => {
                    error!(budget_id = %budget.id, error = %e, "Error evaluating budget");
                    report.failures.push(BudgetFailure {
                        budget_id: budget.id,
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Fetch the budget's spending and evaluate it. Missing spending counts as zero.
    pub async fn evaluate_budget(&self, budget: &Budget) -> Result<Option<BudgetAlert>> {
        let (start, end) = budget.spending_window();
        let spending = self
            .spending
            .category_spending(&budget.cif_id, &budget.category, start, end)
            .await?
            .unwrap_or(Decimal::ZERO);

        self.evaluate(budget, spending).await
    }

    /// Evaluate `budget` at `spending` and persist at most one new alert
    pub async fn evaluate(&self, budget: &Budget, spending: Decimal) -> Result<Option<BudgetAlert>> {
        let pct = percentage_used(spending, budget.budget_amount);
        let now = self.clock.now();

        for alert_type in candidate_alerts(budget, pct) {
            let since = now - self.dedup_window;

            // Read-then-write; concurrent evaluations may both pass this check.
            if self
                .alerts
                .has_alert_been_sent(budget.id, alert_type, since)
                .await?
            {
                debug!(
                    budget_id = %budget.id,
                    alert_type = %alert_type,
                    "Alert already sent within window"
                );
                continue;
            }

            let alert = BudgetAlert {
                id: Uuid::new_v4(),
                budget_id: budget.id,
                cif_id: budget.cif_id.clone(),
                alert_type,
                current_spending: spending,
                budget_limit: budget.budget_amount,
                percentage_used: pct,
                category: budget.category.clone(),
                message: render_alert_message(
                    alert_type,
                    &budget.category,
                    spending,
                    budget.budget_amount,
                    pct,
                ),
                delivery: DeliveryState::Unsent,
                channels: self.channels.clone(),
                created_at: now,
            };

            let saved = self.alerts.insert_alert(&alert).await?;

            info!(
                budget_id = %budget.id,
                alert_id = %saved.id,
                alert_type = %alert_type,
                percentage_used = pct,
                "Budget alert created"
            );

            return Ok(Some(saved));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::Error;
    use crate::models::{AlertType, BudgetState, PeriodType};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryBudgets {
        budgets: Vec<Budget>,
    }

    #[async_trait]
    impl BudgetSource for InMemoryBudgets {
        async fn active_budgets_for_owner(&self, cif_id: &str) -> Result<Vec<Budget>> {
            Ok(self
                .budgets
                .iter()
                .filter(|b| b.cif_id == cif_id && b.is_active())
                .cloned()
                .collect())
        }

        async fn budgets_requiring_alert_check(&self, today: NaiveDate) -> Result<Vec<Budget>> {
            Ok(self
                .budgets
                .iter()
                .filter(|b| {
                    b.is_active()
                        && b.covers(today)
                        && (b.alert_threshold_80 || b.alert_threshold_100)
                })
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct InMemorySpending {
        by_category: HashMap<String, Decimal>,
    }

    #[async_trait]
    impl SpendingSource for InMemorySpending {
        async fn category_spending(
            &self,
            _cif_id: &str,
            category: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Option<Decimal>> {
            Ok(self.by_category.get(category).copied())
        }
    }

    #[derive(Default)]
    struct InMemoryAlerts {
        alerts: Mutex<Vec<BudgetAlert>>,
        failing_budget: Option<Uuid>,
    }

    impl InMemoryAlerts {
        fn mark_all_sent(&self, at: DateTime<Utc>) {
            for alert in self.alerts.lock().unwrap().iter_mut() {
                alert.delivery = alert.delivery.mark_sent(at);
            }
        }

        fn count(&self) -> usize {
            self.alerts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AlertStore for InMemoryAlerts {
        async fn has_alert_been_sent(
            &self,
            budget_id: Uuid,
            alert_type: AlertType,
            since: DateTime<Utc>,
        ) -> Result<bool> {
            Ok(self.alerts.lock().unwrap().iter().any(|a| {
                a.budget_id == budget_id
                    && a.alert_type == alert_type
                    && a.delivery.sent_at().is_some_and(|at| at >= since)
            }))
        }

        async fn insert_alert(&self, alert: &BudgetAlert) -> Result<BudgetAlert> {
            if self.failing_budget == Some(alert.budget_id) {
                return Err(Error::internal("insert rejected"));
            }
            self.alerts.lock().unwrap().push(alert.clone());
            Ok(alert.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-20T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn budget(category: &str, amount: Decimal) -> Budget {
        Budget {
            id: Uuid::new_v4(),
            cif_id: "CIF001".to_string(),
            category: category.to_string(),
            budget_amount: amount,
            period_type: PeriodType::Monthly,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            state: BudgetState::Active,
            alert_threshold_80: true,
            alert_threshold_100: true,
            rollover_enabled: false,
            created_at: now(),
            updated_at: now(),
        }
    }

    struct Harness {
        evaluator: ThresholdEvaluator,
        alerts: Arc<InMemoryAlerts>,
        clock: Arc<FixedClock>,
    }

    fn harness(
        budgets: Vec<Budget>,
        spending: &[(&str, Decimal)],
        failing_budget: Option<Uuid>,
    ) -> Harness {
        let alerts = Arc::new(InMemoryAlerts {
            failing_budget,
            ..Default::default()
        });
        let clock = Arc::new(FixedClock::new(now()));
        let spending = InMemorySpending {
            by_category: spending
                .iter()
                .map(|(c, v)| (c.to_string(), *v))
                .collect(),
        };

        let evaluator = ThresholdEvaluator::new(
            Arc::new(InMemoryBudgets { budgets }),
            Arc::new(spending),
            alerts.clone(),
            clock.clone(),
        );

        Harness {
            evaluator,
            alerts,
            clock,
        }
    }

    #[tokio::test]
    async fn test_threshold_80_alert_created() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);

        let alert = h.evaluator.evaluate(&food, dec!(8500)).await.unwrap().unwrap();

        assert_eq!(alert.alert_type, AlertType::Threshold80);
        assert_eq!(alert.percentage_used, 85);
        assert_eq!(alert.budget_limit, dec!(10000));
        assert_eq!(alert.delivery, DeliveryState::Unsent);
        assert_eq!(alert.channels, NotificationChannel::defaults());
        assert_eq!(alert.created_at, now());
        assert_eq!(
            alert.message,
            "Budget alert: 80% budget reached - You've used 85% (8500) of your Food budget (10000)"
        );
        assert_eq!(h.alerts.count(), 1);
    }

    #[tokio::test]
    async fn test_limit_reached_versus_exceeded() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);

        let reached = h.evaluator.evaluate(&food, dec!(10000)).await.unwrap().unwrap();
        assert_eq!(reached.alert_type, AlertType::Threshold100);

        let exceeded = h.evaluator.evaluate(&food, dec!(15000)).await.unwrap().unwrap();
        assert_eq!(exceeded.alert_type, AlertType::Exceeded);
        assert_eq!(exceeded.percentage_used, 150);
    }

    #[tokio::test]
    async fn test_zero_amount_budget_never_alerts() {
        let degenerate = budget("Food", Decimal::ZERO);
        let h = harness(vec![], &[], None);

        assert!(h.evaluator.evaluate(&degenerate, dec!(500)).await.unwrap().is_none());
        assert_eq!(h.alerts.count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_toggle_suppresses_alert() {
        let mut food = budget("Food", dec!(10000));
        food.alert_threshold_100 = false;
        let h = harness(vec![], &[], None);

        assert!(h.evaluator.evaluate(&food, dec!(12000)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sent_alert_suppresses_repeat_within_window() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);

        h.evaluator.evaluate(&food, dec!(8500)).await.unwrap().unwrap();
        h.alerts.mark_all_sent(now());

        h.clock.advance(Duration::hours(23));
        assert!(h.evaluator.evaluate(&food, dec!(8700)).await.unwrap().is_none());
        assert_eq!(h.alerts.count(), 1);

        h.clock.advance(Duration::hours(2));
        let repeat = h.evaluator.evaluate(&food, dec!(8700)).await.unwrap();
        assert!(repeat.is_some());
        assert_eq!(h.alerts.count(), 2);
    }

    #[tokio::test]
    async fn test_unsent_alert_does_not_suppress() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);

        h.evaluator.evaluate(&food, dec!(8500)).await.unwrap().unwrap();
        h.evaluator.evaluate(&food, dec!(8500)).await.unwrap().unwrap();

        assert_eq!(h.alerts.count(), 2);
    }

    #[tokio::test]
    async fn test_dedup_is_per_alert_type() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);

        h.evaluator.evaluate(&food, dec!(8500)).await.unwrap().unwrap();
        h.alerts.mark_all_sent(now());

        let exceeded = h.evaluator.evaluate(&food, dec!(11000)).await.unwrap().unwrap();
        assert_eq!(exceeded.alert_type, AlertType::Exceeded);
    }

    #[tokio::test]
    async fn test_missing_spending_counts_as_zero() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);

        assert!(h.evaluator.evaluate_budget(&food).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let food = budget("Food", dec!(10000));
        let transport = budget("Transport", dec!(2000));
        let failing = transport.id;
        let h = harness(
            vec![food.clone(), transport],
            &[("Food", dec!(9000)), ("Transport", dec!(2500))],
            Some(failing),
        );

        let report = h.evaluator.sweep().await.unwrap();

        assert_eq!(report.evaluated, 2);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].budget_id, food.id);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].budget_id, failing);
    }

    #[tokio::test]
    async fn test_sweep_skips_budgets_outside_period() {
        let mut expired = budget("Food", dec!(10000));
        expired.start_date = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        expired.end_date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let h = harness(vec![expired], &[("Food", dec!(9000))], None);

        let report = h.evaluator.sweep().await.unwrap();

        assert_eq!(report.evaluated, 0);
        assert!(report.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_check_owner_uses_owner_budgets() {
        let food = budget("Food", dec!(10000));
        let mut other = budget("Food", dec!(100));
        other.cif_id = "CIF999".to_string();
        let h = harness(vec![food, other], &[("Food", dec!(9500))], None);

        let report = h.evaluator.check_owner("CIF001").await.unwrap();

        assert_eq!(report.evaluated, 1);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].cif_id, "CIF001");
    }

    #[tokio::test]
    async fn test_custom_dedup_window_and_channels() {
        let food = budget("Food", dec!(10000));
        let h = harness(vec![], &[], None);
        let evaluator = h
            .evaluator
            .with_dedup_window(std::time::Duration::from_secs(3600))
            .with_channels(vec![NotificationChannel::InApp]);

        let alert = evaluator.evaluate(&food, dec!(8500)).await.unwrap().unwrap();
        assert_eq!(alert.channels, vec![NotificationChannel::InApp]);
        h.alerts.mark_all_sent(now());

        h.clock.advance(Duration::minutes(61));
        assert!(evaluator.evaluate(&food, dec!(8500)).await.unwrap().is_some());
    }
}
