// Vahan Insights - Web Server
// JSON API over registration aggregates and growth metrics

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use vahan_insights::{
    compute_kpis, init_logging, insight_lines, load_dataset, top_manufacturers, Config, Dimension,
    GrowthCache, GrowthConfig, GrowthTable, Kpis, RecordFilter, RegistrationRecord, Verbosity,
};

/// vahan-server - registration analytics API
#[derive(Debug, Parser)]
#[command(name = "vahan-server", version, about)]
struct ServerCli {
    /// Path to configuration file (default: ./vahan.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Bind address (overrides server.bind_addr)
    #[arg(short, long)]
    bind: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    records: Arc<Vec<RegistrationRecord>>,
    growth: GrowthConfig,
    cache: Arc<Mutex<GrowthCache>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Record filters shared by every data endpoint
#[derive(Debug, Default, Deserialize)]
struct FilterQuery {
    /// Comma separated vehicle categories
    category: Option<String>,
    /// Comma separated manufacturers
    manufacturer: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl FilterQuery {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter::new()
            .with_date_range(self.from, self.to)
            .with_categories(split_list(self.category.as_deref()))
            .with_manufacturers(split_list(self.manufacturer.as_deref()))
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct GrowthQuery {
    by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    records: usize,
}

#[derive(Serialize)]
struct KpiResponse {
    #[serde(flatten)]
    kpis: Kpis,
    insights: Vec<String>,
}

#[derive(Serialize)]
struct ManufacturerTotal {
    rank: usize,
    manufacturer: String,
    registrations: u64,
}

fn error_response(err: &vahan_insights::Error) -> Response {
    let status = if err.is_configuration_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    if status == StatusCode::BAD_REQUEST {
        warn!(error = %err, "rejected request");
    } else {
        error!(error = %err, "request failed");
    }

    (status, Json(ApiResponse::<()>::err(err.to_string()))).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "OK",
        version: vahan_insights::VERSION,
        records: state.records.len(),
    }))
}

/// GET /api/records - Filtered raw records
async fn get_records(
    State(state): State<AppState>,
    Query(filter): Query<FilterQuery>,
) -> impl IntoResponse {
    let records = filter.to_filter().apply(&state.records);
    (StatusCode::OK, Json(ApiResponse::ok(records))).into_response()
}

/// GET /api/kpis - Headline KPIs and insights
async fn get_kpis(
    State(state): State<AppState>,
    Query(filter): Query<FilterQuery>,
) -> Response {
    let records = filter.to_filter().apply(&state.records);
    let kpis = match compute_kpis(&records) {
        Ok(kpis) => kpis,
        Err(e) => return error_response(&e),
    };
    let insights = insight_lines(&kpis);

    (StatusCode::OK, Json(ApiResponse::ok(KpiResponse { kpis, insights }))).into_response()
}

/// GET /api/growth?by=vehicle_category,manufacturer - Quarterly growth table
async fn get_growth(
    State(state): State<AppState>,
    Query(params): Query<GrowthQuery>,
    Query(filter): Query<FilterQuery>,
) -> Response {
    let names = match params.by.as_deref() {
        Some(by) => split_list(Some(by)),
        None => vec![Dimension::VehicleCategory.as_str().to_string()],
    };

    let dimensions = match Dimension::parse_list(&names) {
        Ok(dims) => dims,
        Err(e) => return error_response(&e),
    };

    let records = filter.to_filter().apply(&state.records);

    let result = match state.cache.lock() {
        Ok(mut cache) => cache.get_or_compute(&records, &dimensions, &state.growth),
        Err(_) => {
            error!("growth cache lock poisoned");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<()>::err("growth cache unavailable")),
            )
                .into_response();
        }
    };

    match result {
        Ok(table) => {
            let table: GrowthTable = table.as_ref().clone();
            (StatusCode::OK, Json(ApiResponse::ok(table))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/manufacturers/top?limit=N - Manufacturers ranked by registrations
async fn get_top_manufacturers(
    State(state): State<AppState>,
    Query(params): Query<TopQuery>,
    Query(filter): Query<FilterQuery>,
) -> Response {
    let records = filter.to_filter().apply(&state.records);
    let limit = params.limit.unwrap_or(10);

    let ranked = match top_manufacturers(&records, limit) {
        Ok(ranked) => ranked,
        Err(e) => return error_response(&e),
    };

    let response: Vec<ManufacturerTotal> = ranked
        .into_iter()
        .enumerate()
        .map(|(i, (manufacturer, registrations))| ManufacturerTotal {
            rank: i + 1,
            manufacturer,
            registrations,
        })
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

// ============================================================================
// Main Server
// ============================================================================

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/records", get(get_records))
        .route("/kpis", get(get_kpis))
        .route("/growth", get(get_growth))
        .route("/manufacturers/top", get(get_top_manufacturers))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ServerCli::parse();
    init_logging(Verbosity::from_flags(false, cli.verbose.max(1)));

    println!("🌐 Vahan Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    let (records, source) = load_dataset(&config.data, Local::now().date_naive())
        .context("Failed to load dataset")?;
    println!("✓ Loaded {} records from {}", records.len(), source);

    let state = AppState {
        records: Arc::new(records),
        growth: config.growth,
        cache: Arc::new(Mutex::new(GrowthCache::new(config.server.cache_capacity))),
    };

    let app = build_router(state);

    let addr = cli.bind.unwrap_or(config.server.bind_addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "listening");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/growth?by=vehicle_category", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use vahan_insights::SampleGenerator;

    fn state() -> AppState {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        AppState {
            records: Arc::new(SampleGenerator::new(11).generate(start, end)),
            growth: GrowthConfig::default(),
            cache: Arc::new(Mutex::new(GrowthCache::new(8))),
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(build_router(state()), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["records"], 24 * 15);
    }

    #[tokio::test]
    async fn test_growth_by_category_uses_null_for_missing_history() {
        let (status, body) = get_json(build_router(state()), "/api/growth?by=vehicle_category").await;
        assert_eq!(status, StatusCode::OK);

        let rows = body["data"]["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 3 * 8);
        assert!(rows[0]["qoq_growth"].is_null());
        assert!(rows[0]["yoy_growth"].is_null());
        assert!(rows.last().unwrap()["yoy_growth"].is_number());
    }

    #[tokio::test]
    async fn test_growth_unknown_dimension_is_bad_request() {
        let (status, body) = get_json(build_router(state()), "/api/growth?by=color").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("color"));
    }

    #[tokio::test]
    async fn test_growth_is_memoized() {
        let state = state();
        let app = build_router(state.clone());
        get_json(app.clone(), "/api/growth?by=manufacturer&category=2W").await;
        get_json(app, "/api/growth?by=manufacturer&category=2W").await;
        assert_eq!(state.cache.lock().unwrap().stats(), (1, 1));
    }

    #[tokio::test]
    async fn test_records_filtered_by_query() {
        let (status, body) = get_json(
            build_router(state()),
            "/api/records?category=3W&from=2023-01-01&to=2023-03-31",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 3 * 5);
        assert!(rows.iter().all(|r| r["vehicle_category"] == "3W"));
    }

    #[tokio::test]
    async fn test_kpis_empty_selection() {
        let (_, body) = get_json(build_router(state()), "/api/kpis?category=9W").await;
        assert_eq!(body["data"]["total_registrations"], 0);
        assert!(body["data"]["overall_yoy_growth"].is_null());
        assert_eq!(
            body["data"]["insights"][0],
            "No data available for the selected filters."
        );
    }

    #[tokio::test]
    async fn test_top_manufacturers_limit() {
        let (_, body) = get_json(build_router(state()), "/api/manufacturers/top?limit=3").await;
        let rows = body["data"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["rank"], 1);
        assert!(rows[0]["registrations"].as_u64() >= rows[1]["registrations"].as_u64());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("2W, 4W,,")), vec!["2W", "4W"]);
        assert!(split_list(None).is_empty());
    }
}
