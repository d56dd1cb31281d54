//! Access diagnostics: who the configured credentials belong to and whether
//! they can actually read Cost Explorer data.

use aws_sdk_costexplorer::Client as CeClient;
use aws_sdk_costexplorer::types::Dimension;
use aws_sdk_sts::Client as StsClient;
use chrono::NaiveDate;

use billing_core::{BillingError, CalendarMonth, CostAmount, CostUsageProvider, DateRange};

use crate::{CostExplorerProvider, ExplorerConfig, classify_sdk_error, date_interval};

/// Identity behind the configured credentials.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub arn: String,
    pub account: String,
    pub user_id: String,
}

/// Outcome of the three independent access probes. A failing probe never
/// aborts the others; each failure is reported in place.
#[derive(Debug)]
pub struct AccessCheck {
    pub identity: Result<CallerIdentity, BillingError>,
    pub service_dimension: Result<usize, BillingError>,
    pub previous_month_total: Result<CostAmount, BillingError>,
}

impl AccessCheck {
    pub fn all_passed(&self) -> bool {
        self.identity.is_ok()
            && self.service_dimension.is_ok()
            && self.previous_month_total.is_ok()
    }
}

/// Probe the previous calendar month, the most recent one with finalized
/// data: STS caller identity, SERVICE dimension visibility, total cost.
pub async fn check_access(config: &ExplorerConfig, today: NaiveDate) -> AccessCheck {
    let sdk_config = config.load().await;
    let sts = StsClient::new(&sdk_config);
    let ce = CeClient::new(&sdk_config);

    let previous_month = CalendarMonth::containing(today).minus_months(1);
    let range = DateRange::calendar_month(previous_month);

    let identity = caller_identity(&sts).await;
    let service_dimension = service_dimension_values(&ce, &range).await;
    let previous_month_total = CostExplorerProvider::from_client(ce)
        .monthly_total(&range)
        .await;

    AccessCheck {
        identity,
        service_dimension,
        previous_month_total,
    }
}

async fn caller_identity(sts: &StsClient) -> Result<CallerIdentity, BillingError> {
    let resp = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(classify_sdk_error)?;

    Ok(CallerIdentity {
        arn: resp.arn().unwrap_or_default().to_string(),
        account: resp.account().unwrap_or_default().to_string(),
        user_id: resp.user_id().unwrap_or_default().to_string(),
    })
}

async fn service_dimension_values(ce: &CeClient, range: &DateRange) -> Result<usize, BillingError> {
    let resp = ce
        .get_dimension_values()
        .dimension(Dimension::Service)
        .time_period(date_interval(range)?)
        .send()
        .await
        .map_err(classify_sdk_error)?;

    Ok(resp.dimension_values().len())
}
