use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use clap::Parser;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billing_aws::{CostExplorerProvider, ExplorerConfig};
use billing_core::{
    BillingError, CostReport, TrendPoint, fetch_cost_report, fetch_trend_report, resolve_period,
    trend_window,
};

#[derive(Parser, Debug)]
#[command(name = "billing-api")]
#[command(about = "HTTP API for the AWS billing dashboard", long_about = None)]
struct Args {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:5000")]
    bind: String,

    /// Override AWS region (Cost Explorer is served from us-east-1)
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// AWS shared config profile to load credentials from
    #[arg(long)]
    profile: Option<String>,

    /// Serve the built frontend from this directory (production mode)
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

struct AppState {
    provider: CostExplorerProvider,
}

#[derive(Debug, Deserialize)]
struct CostsQuery {
    month: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrendQuery {
    months: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

struct ApiError(BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BillingError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            BillingError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            BillingError::AccessDenied(_) => StatusCode::FORBIDDEN,
            BillingError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "billing request failed");
        }
        let body = ErrorBody {
            error: self.0.label(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new("info"))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = ExplorerConfig::from_env(args.region, args.profile);
    let provider = CostExplorerProvider::connect(&config).await;
    let state = Arc::new(AppState { provider });

    let mut app = Router::new()
        .route("/health", get(health).options(options_handler))
        .route("/api/costs", get(get_costs).options(options_handler))
        .route("/api/costs/trend", get(get_cost_trend).options(options_handler))
        .with_state(state);

    if let Some(dir) = args.static_dir {
        // SPA fallback: unknown paths get index.html so client routing works
        let index = dir.join("index.html");
        app = app.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
    }
    let app = app.layer(map_response(with_cors));

    let addr: SocketAddr = args.bind.parse()?;
    tracing::info!("listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn get_costs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CostsQuery>,
) -> Result<Json<CostReport>, ApiError> {
    let today = Utc::now().date_naive();
    let range = resolve_period(query.month.as_deref(), today)?;
    let report = fetch_cost_report(&state.provider, range).await?;
    Ok(Json(report))
}

async fn get_cost_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, ApiError> {
    let today = Utc::now().date_naive();
    // a non-numeric count falls back to the default rather than a 400
    let requested = query
        .months
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok());
    let ranges = trend_window(requested, today);
    let points = fetch_trend_report(&state.provider, &ranges).await?;
    Ok(Json(points))
}

// Simple permissive CORS for local UI usage
async fn with_cors(mut res: Response) -> Response {
    let headers = res.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, authorization"),
    );
    res
}

async fn options_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
