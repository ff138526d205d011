// Circular Trace - Web Server
// REST API over the configured dataset, plus the dashboard's static bundle

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use circular_trace::{
    client_breakdown, compose_report, dashboard_summary, exhibitor_totals, lot_series,
    ClientTotals, Config, CorrectionSet, DashboardSummary, Exhibitor, ExhibitorTotals,
    ExportDataset, ExportFormat, FlowType, Lot, LotFilter, LotRepository, LotStatus,
    ReportPeriod, ReportStandard, TraceError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

/// Shared application state
#[derive(Clone)]
struct AppState {
    repo: Arc<dyn LotRepository>,
    corrections: Arc<CorrectionSet>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        let body = ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

fn internal_error(context: &str, err: impl std::fmt::Display) -> Response {
    log::error!("{}: {}", context, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", context, err))
}

/// Validation failures are the caller's data, not a server fault
fn service_error(context: &str, err: anyhow::Error) -> Response {
    match err.downcast_ref::<TraceError>() {
        Some(TraceError::Validation(_)) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        _ => internal_error(context, err),
    }
}

/// `Content-Disposition` value; client names may hold spaces or accents
fn attachment_header(dataset: ExportDataset, client: Option<&str>) -> String {
    let name = match client {
        Some(client) => format!("{}_{}.csv", dataset.name(), client.trim().replace(' ', "_")),
        None => format!("{}.csv", dataset.name()),
    };
    format!(
        "attachment; filename=\"{}.csv\"; filename*=UTF-8''{}",
        dataset.name(),
        urlencoding::encode(&name)
    )
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ClientQuery {
    client: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LotQuery {
    client: Option<String>,
    flow_type: Option<String>,
    status: Option<String>,
}

impl LotQuery {
    fn to_filter(&self) -> Result<LotFilter, String> {
        let mut filter = LotFilter {
            client: self.client.clone(),
            ..LotFilter::default()
        };
        if let Some(flow) = &self.flow_type {
            filter = filter.with_flow_type(flow.parse::<FlowType>()?);
        }
        if let Some(status) = &self.status {
            filter = filter.with_status(status.parse::<LotStatus>()?);
        }
        Ok(filter)
    }
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    client: String,
    company: Option<String>,
    from: NaiveDate,
    to: NaiveDate,
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: DashboardSummary,
    clients: Vec<ClientTotals>,
}

#[derive(Serialize)]
struct ExhibitorsResponse {
    exhibitors: Vec<Exhibitor>,
    totals: ExhibitorTotals,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/lots - Lots matching client, flow type and status
async fn get_lots(State(state): State<AppState>, Query(query): Query<LotQuery>) -> Response {
    let filter = match query.to_filter() {
        Ok(filter) => filter,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.repo.fetch_lots(&filter) {
        Ok(lots) => ApiResponse::ok(lots),
        Err(e) => internal_error("Error getting lots", e),
    }
}

/// GET /api/lots/:id - One lot with its full cycle history
async fn get_lot(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.repo.find_lot(&id) {
        Ok(Some(lot)) => ApiResponse::<Lot>::ok(lot),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("lot not found: {}", id)),
        Err(e) => internal_error("Error getting lot", e),
    }
}

/// GET /api/lots/:id/series - Cumulative emissions chart data
async fn get_lot_series(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.repo.find_lot(&id) {
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("lot not found: {}", id)),
        Ok(Some(_)) => match lot_series(state.repo.as_ref(), &id) {
            Ok(series) => ApiResponse::ok(series),
            Err(e) => service_error("Error building series", e),
        },
        Err(e) => internal_error("Error getting lot", e),
    }
}

/// GET /api/exhibitors - Exhibitors with portfolio totals
async fn get_exhibitors(State(state): State<AppState>, Query(query): Query<ClientQuery>) -> Response {
    match state.repo.fetch_exhibitors(query.client.as_deref()) {
        Ok(exhibitors) => {
            let totals = exhibitor_totals(&exhibitors);
            ApiResponse::ok(ExhibitorsResponse { exhibitors, totals })
        }
        Err(e) => internal_error("Error getting exhibitors", e),
    }
}

/// GET /api/summary - Dashboard header figures and the per-client breakdown
async fn get_summary(State(state): State<AppState>, Query(query): Query<ClientQuery>) -> Response {
    let filter = LotFilter {
        client: query.client,
        ..LotFilter::default()
    };
    let lots = match state.repo.fetch_lots(&filter) {
        Ok(lots) => lots,
        Err(e) => return internal_error("Error getting lots", e),
    };

    match dashboard_summary(&lots) {
        Ok(summary) => ApiResponse::ok(SummaryResponse {
            summary,
            clients: client_breakdown(&lots),
        }),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// GET /api/reports/:standard - Compose a sustainability report
async fn get_report(
    State(state): State<AppState>,
    Path(standard): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Response {
    let standard: ReportStandard = match standard.parse() {
        Ok(standard) => standard,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };
    let period = match ReportPeriod::new(query.from, query.to) {
        Ok(period) => period,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let company = query.company.unwrap_or_else(|| query.client.clone());

    match compose_report(
        state.repo.as_ref(),
        &state.corrections,
        standard,
        &query.client,
        &company,
        &period,
    ) {
        Ok(document) => ApiResponse::ok(document),
        Err(e) => service_error("Error composing report", e),
    }
}

/// GET /api/exports/:dataset.csv - Download a dataset as CSV
async fn get_export(
    State(state): State<AppState>,
    Path(file): Path<String>,
    Query(query): Query<ClientQuery>,
) -> Response {
    let dataset: ExportDataset = match file.strip_suffix(".csv").unwrap_or(&file).parse() {
        Ok(dataset) => dataset,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let client = query.client.as_deref();
    let lots = match state.repo.fetch_lots(&LotFilter {
        client: client.map(str::to_string),
        ..LotFilter::default()
    }) {
        Ok(lots) => lots,
        Err(e) => return internal_error("Error getting lots", e),
    };
    let exhibitors = match state.repo.fetch_exhibitors(client) {
        Ok(exhibitors) => exhibitors,
        Err(e) => return internal_error("Error getting exhibitors", e),
    };

    match dataset.render(ExportFormat::Csv, &lots, &exhibitors) {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (header::CONTENT_DISPOSITION, attachment_header(dataset, client)),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e.to_string()),
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/lots", get(get_lots))
        .route("/lots/:id", get(get_lot))
        .route("/lots/:id/series", get(get_lot_series))
        .route("/exhibitors", get(get_exhibitors))
        .route("/summary", get(get_summary))
        .route("/reports/:standard", get(get_report))
        .route("/exports/:file", get(get_export))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    let repo = config.repository()?;
    log::info!("serving {} clients", repo.clients()?.len());

    let state = AppState {
        repo: Arc::new(repo),
        corrections: Arc::new(config.correction_set()),
    };

    // Unknown paths fall through to the single-page app
    let static_dir = &config.server.static_dir;
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let app = Router::new()
        .nest("/api", api_routes(state))
        .fallback_service(spa)
        .layer(CorsLayer::permissive());

    let addr = config.server.bind_addr.as_str();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {}", addr))?;

    log::info!("🚀 server running on http://{}", addr);
    log::info!("   static files from {:?}", static_dir);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use circular_trace::{sample_dataset, Dataset, InMemoryRepository};

    fn create_test_state(dataset: Dataset) -> AppState {
        AppState {
            repo: Arc::new(InMemoryRepository::new(dataset)),
            corrections: Arc::new(CorrectionSet::new()),
        }
    }

    #[tokio::test]
    async fn test_lot_id_with_percent_sign_is_not_decoded_twice() {
        let mut dataset = sample_dataset();
        dataset.lots[0].id = "LOT%25A".to_string();
        dataset.lots[1].id = "LOT%A".to_string();
        let state = create_test_state(dataset);

        // The router has already decoded "LOT%2525A" to "LOT%25A"
        let response = get_lot(State(state.clone()), Path("LOT%25A".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_lot(State(state), Path("LOT%2525A".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_lot_series_is_unprocessable() {
        let mut dataset = sample_dataset();
        dataset.lots[0].cycles[0].distance_km = -1.0;
        let id = dataset.lots[0].id.clone();

        let response = get_lot_series(State(create_test_state(dataset)), Path(id)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_attachment_header_encodes_client() {
        let value = attachment_header(ExportDataset::Lots, Some("Farmacias del Valle"));
        assert!(value.starts_with("attachment; filename=\"lots.csv\""));
        assert!(value.ends_with("filename*=UTF-8''lots_Farmacias_del_Valle.csv"));

        let value = attachment_header(ExportDataset::Cycles, Some("Añil"));
        assert!(value.ends_with("cycles_A%C3%B1il.csv"));
    }
}
