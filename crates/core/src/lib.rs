//! Domain logic for the AWS billing dashboard: billing period resolution,
//! cost aggregation over an injected provider, and the external JSON
//! contract returned to the UI.

use async_trait::async_trait;
use futures::future::{try_join, try_join_all};
use serde::Serialize;

pub mod error;
pub mod money;
pub mod period;

pub use error::BillingError;
pub use money::{CostAmount, CurrencyConverter, DEFAULT_USD_TO_INR};
pub use period::{CalendarMonth, DateRange, resolve_period, trend_window};

/// One service's share of a month's spend. Entries keep the upstream
/// grouping order.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceCostEntry {
    pub name: String,
    pub cost: CostAmount,
}

/// Single-month report: total spend plus the per-service breakdown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostReport {
    pub month: CalendarMonth,
    pub total_cost: CostAmount,
    pub services: Vec<ServiceCostEntry>,
}

/// One month of a trend series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub month: CalendarMonth,
    pub formatted_month: String,
    pub total_cost: CostAmount,
}

/// Upstream cost-and-usage source. All queries are monthly granularity over
/// the unblended-cost metric, spanning a single calendar month.
#[async_trait]
pub trait CostUsageProvider: Send + Sync {
    async fn monthly_total(&self, range: &DateRange) -> Result<CostAmount, BillingError>;

    async fn monthly_costs_by_service(
        &self,
        range: &DateRange,
    ) -> Result<Vec<ServiceCostEntry>, BillingError>;
}

/// Fetch the total and the by-service breakdown for one month. The two
/// upstream queries run concurrently; either failure fails the whole report.
pub async fn fetch_cost_report<P>(
    provider: &P,
    range: DateRange,
) -> Result<CostReport, BillingError>
where
    P: CostUsageProvider + ?Sized,
{
    let (total_cost, services) = try_join(
        provider.monthly_total(&range),
        provider.monthly_costs_by_service(&range),
    )
    .await?;

    Ok(CostReport {
        month: range.month(),
        total_cost,
        services,
    })
}

/// One total-cost query per range, issued concurrently. Points come back in
/// input order regardless of completion order.
pub async fn fetch_trend_report<P>(
    provider: &P,
    ranges: &[DateRange],
) -> Result<Vec<TrendPoint>, BillingError>
where
    P: CostUsageProvider + ?Sized,
{
    try_join_all(ranges.iter().map(|range| async move {
        let total_cost = provider.monthly_total(range).await?;
        Ok(TrendPoint {
            month: range.month(),
            formatted_month: range.month().label(),
            total_cost,
        })
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn month_range(year: i32, month: u32) -> DateRange {
        DateRange::calendar_month(CalendarMonth::new(year, month).unwrap())
    }

    struct FixedProvider {
        total: f64,
        services: Vec<(&'static str, f64)>,
    }

    #[async_trait]
    impl CostUsageProvider for FixedProvider {
        async fn monthly_total(&self, _range: &DateRange) -> Result<CostAmount, BillingError> {
            Ok(CostAmount::from_f64(self.total))
        }

        async fn monthly_costs_by_service(
            &self,
            _range: &DateRange,
        ) -> Result<Vec<ServiceCostEntry>, BillingError> {
            Ok(self
                .services
                .iter()
                .map(|(name, cost)| ServiceCostEntry {
                    name: name.to_string(),
                    cost: CostAmount::from_f64(*cost),
                })
                .collect())
        }
    }

    struct FailingBreakdown;

    #[async_trait]
    impl CostUsageProvider for FailingBreakdown {
        async fn monthly_total(&self, _range: &DateRange) -> Result<CostAmount, BillingError> {
            Ok(CostAmount::from_f64(10.0))
        }

        async fn monthly_costs_by_service(
            &self,
            _range: &DateRange,
        ) -> Result<Vec<ServiceCostEntry>, BillingError> {
            Err(BillingError::from_upstream(
                Some("AccessDeniedException"),
                "denied",
            ))
        }
    }

    /// Completes earlier months later, recording completion order.
    struct StaggeredProvider {
        completed: Mutex<Vec<u32>>,
    }

    #[async_trait]
    impl CostUsageProvider for StaggeredProvider {
        async fn monthly_total(&self, range: &DateRange) -> Result<CostAmount, BillingError> {
            let month = range.month().month();
            tokio::time::sleep(Duration::from_millis(u64::from(13 - month) * 10)).await;
            self.completed.lock().unwrap().push(month);
            Ok(CostAmount::from_f64(f64::from(month)))
        }

        async fn monthly_costs_by_service(
            &self,
            _range: &DateRange,
        ) -> Result<Vec<ServiceCostEntry>, BillingError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn report_combines_total_and_breakdown() {
        let provider = FixedProvider {
            total: 123.456,
            services: vec![("Amazon EC2", 100.0), ("Amazon S3", 23.456)],
        };
        let report = fetch_cost_report(&provider, month_range(2025, 3))
            .await
            .unwrap();

        assert_eq!(report.month.to_string(), "2025-03");
        assert_eq!(report.total_cost, CostAmount::Valid(123.46));
        let names: Vec<&str> = report.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Amazon EC2", "Amazon S3"]);
        assert_eq!(report.services[1].cost, CostAmount::Valid(23.46));
    }

    #[tokio::test]
    async fn breakdown_failure_fails_the_whole_report() {
        let err = fetch_cost_report(&FailingBreakdown, month_range(2025, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::AccessDenied(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn trend_points_follow_input_order() {
        let provider = StaggeredProvider {
            completed: Mutex::new(Vec::new()),
        };
        let ranges = [
            month_range(2025, 1),
            month_range(2025, 2),
            month_range(2025, 3),
        ];
        let points = fetch_trend_report(&provider, &ranges).await.unwrap();

        let months: Vec<String> = points.iter().map(|p| p.month.to_string()).collect();
        assert_eq!(months, ["2025-01", "2025-02", "2025-03"]);
        assert_eq!(points[1].formatted_month, "Feb 2025");
        assert_eq!(points[2].total_cost, CostAmount::Valid(3.0));
        // later months slept less, so they finished first
        assert_eq!(*provider.completed.lock().unwrap(), vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn trend_failure_aborts_the_series() {
        struct AlwaysFails;

        #[async_trait]
        impl CostUsageProvider for AlwaysFails {
            async fn monthly_total(&self, _range: &DateRange) -> Result<CostAmount, BillingError> {
                Err(BillingError::Upstream("boom".into()))
            }

            async fn monthly_costs_by_service(
                &self,
                _range: &DateRange,
            ) -> Result<Vec<ServiceCostEntry>, BillingError> {
                Ok(Vec::new())
            }
        }

        let ranges = [month_range(2025, 1), month_range(2025, 2)];
        let err = fetch_trend_report(&AlwaysFails, &ranges).await.unwrap_err();
        assert!(matches!(err, BillingError::Upstream(_)));
    }

    #[test]
    fn report_serializes_to_the_wire_contract() {
        let report = CostReport {
            month: CalendarMonth::new(2025, 7).unwrap(),
            total_cost: CostAmount::from_f64(123.456),
            services: vec![ServiceCostEntry {
                name: "Amazon EC2".to_string(),
                cost: CostAmount::from_f64(100.0),
            }],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "month": "2025-07",
                "totalCost": "123.46",
                "services": [{"name": "Amazon EC2", "cost": "100.00"}],
            })
        );
    }

    #[test]
    fn trend_point_serializes_unavailable_as_null() {
        let point = TrendPoint {
            month: CalendarMonth::new(2025, 1).unwrap(),
            formatted_month: "Jan 2025".to_string(),
            total_cost: CostAmount::Unavailable,
        };

        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "month": "2025-01",
                "formattedMonth": "Jan 2025",
                "totalCost": null,
            })
        );
    }
}
