//! AWS Cost Explorer implementation of the dashboard's cost provider.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_costexplorer::Client as CeClient;
use aws_sdk_costexplorer::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_costexplorer::operation::get_cost_and_usage::GetCostAndUsageOutput;
use aws_sdk_costexplorer::types::{DateInterval, Granularity, GroupDefinition, GroupDefinitionType};

use billing_core::{BillingError, CostAmount, CostUsageProvider, DateRange, ServiceCostEntry};

pub mod diagnostics;

const COST_METRIC: &str = "UnblendedCost";

/// Statically supplied AWS credentials, typically lifted from the
/// environment.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl StaticCredentials {
    fn into_provider(self) -> Credentials {
        Credentials::new(
            self.access_key_id,
            self.secret_access_key,
            self.session_token,
            None,
            "billing-dashboard",
        )
    }
}

/// Immutable client configuration, constructed once and injected into the
/// provider instead of living in process-global SDK state.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub region: String,
    pub profile: Option<String>,
    pub static_credentials: Option<StaticCredentials>,
}

impl ExplorerConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            profile: None,
            static_credentials: None,
        }
    }

    /// Pick up `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` (and an
    /// optional `AWS_SESSION_TOKEN`) when both key parts are present,
    /// otherwise fall back to the profile or the default credential chain.
    pub fn from_env(region: impl Into<String>, profile: Option<String>) -> Self {
        let static_credentials = match (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Ok(access_key_id), Ok(secret_access_key)) => Some(StaticCredentials {
                access_key_id,
                secret_access_key,
                session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
            }),
            _ => None,
        };
        Self {
            region: region.into(),
            profile,
            static_credentials,
        }
    }

    pub(crate) async fn load(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()));
        if let Some(credentials) = self.static_credentials.clone() {
            loader = loader.credentials_provider(credentials.into_provider());
        } else if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }
}

/// Cost Explorer implementation of [`CostUsageProvider`].
#[derive(Debug, Clone)]
pub struct CostExplorerProvider {
    client: CeClient,
}

impl CostExplorerProvider {
    pub async fn connect(config: &ExplorerConfig) -> Self {
        let sdk_config = config.load().await;
        Self::from_client(CeClient::new(&sdk_config))
    }

    pub fn from_client(client: CeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CostUsageProvider for CostExplorerProvider {
    async fn monthly_total(&self, range: &DateRange) -> Result<CostAmount, BillingError> {
        tracing::debug!(start = %range.start(), end = %range.end_exclusive(), "querying monthly total");
        let resp = self
            .client
            .get_cost_and_usage()
            .time_period(date_interval(range)?)
            .granularity(Granularity::Monthly)
            .metrics(COST_METRIC)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(total_amount(&resp))
    }

    async fn monthly_costs_by_service(
        &self,
        range: &DateRange,
    ) -> Result<Vec<ServiceCostEntry>, BillingError> {
        tracing::debug!(start = %range.start(), end = %range.end_exclusive(), "querying per-service breakdown");
        let resp = self
            .client
            .get_cost_and_usage()
            .time_period(date_interval(range)?)
            .granularity(Granularity::Monthly)
            .metrics(COST_METRIC)
            .group_by(
                GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key("SERVICE")
                    .build(),
            )
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(service_entries(&resp))
    }
}

pub(crate) fn date_interval(range: &DateRange) -> Result<DateInterval, BillingError> {
    DateInterval::builder()
        .start(range.start().format("%Y-%m-%d").to_string())
        .end(range.end_exclusive().format("%Y-%m-%d").to_string())
        .build()
        .map_err(|err| BillingError::Upstream(err.to_string()))
}

pub(crate) fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> BillingError
where
    E: ProvideErrorMetadata,
    SdkError<E, R>: std::fmt::Display,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    BillingError::from_upstream(err.code(), message)
}

fn total_amount(resp: &GetCostAndUsageOutput) -> CostAmount {
    // A month with no result rows is reported as unavailable, not zero.
    let Some(result) = resp.results_by_time().first() else {
        return CostAmount::Unavailable;
    };
    match result
        .total()
        .and_then(|total| total.get(COST_METRIC))
        .and_then(|metric| metric.amount())
    {
        Some(raw) => CostAmount::parse(raw),
        None => CostAmount::Unavailable,
    }
}

fn service_entries(resp: &GetCostAndUsageOutput) -> Vec<ServiceCostEntry> {
    let Some(result) = resp.results_by_time().first() else {
        return Vec::new();
    };
    result
        .groups()
        .iter()
        .map(|group| {
            let name = group
                .keys()
                .first()
                .map(|key| key.as_str())
                .unwrap_or("Unknown")
                .to_string();
            let cost = group
                .metrics()
                .and_then(|metrics| metrics.get(COST_METRIC))
                .and_then(|metric| metric.amount())
                .map(CostAmount::parse)
                .unwrap_or(CostAmount::Unavailable);
            ServiceCostEntry { name, cost }
        })
        .collect()
}
