use std::str::FromStr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::cache::{self, ContentCache, CHART_CACHE_CAPACITY, TABLE_CACHE_CAPACITY};
use crate::charts::{self, ChartKind};
use crate::error::DashboardError;
use crate::ingest::{self, LoadedTable};
use crate::session::Session;
use crate::stats::{self, KpiMetric};
use crate::table::{Table, PREVIEW_ROWS, ROW_LIMIT};

const FORMAT_HINT: &str = "Please make sure your file is a valid Excel format (.xlsx or .xls)";
const GENERIC_ERROR: &str = "Something went wrong while processing your data";

pub struct AppState {
    session: Mutex<Session>,
    tables: Mutex<ContentCache<LoadedTable>>,
    charts: Mutex<ContentCache<Vec<u8>>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            session: Mutex::new(Session::default()),
            tables: Mutex::new(ContentCache::new(TABLE_CACHE_CAPACITY)),
            charts: Mutex::new(ContentCache::new(CHART_CACHE_CAPACITY)),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn run(addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new());
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    log::info!("listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .route("/api/upload", post(upload))
        .route("/api/state", get(dashboard_state))
        .route("/api/select", post(select))
        .route("/api/chart/:kind", get(chart))
        .with_state(state)
}

async fn serve_dashboard() -> Html<&'static str> {
    Html(include_str!("./static/dashboard.html"))
}

#[derive(Deserialize)]
struct SelectRequest {
    control: String,
    #[serde(default)]
    columns: Vec<String>,
}

/// Receive the uploaded spreadsheet, parse it (through the table cache, so
/// re-uploading the same bytes never re-parses) and make it the session's
/// current table.
async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut file_data = Vec::new();
    let mut filename = String::new();

    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            filename = field.file_name().unwrap_or("upload").to_string();
            file_data = field.bytes().await.unwrap_or_default().to_vec();
        }
    }

    if file_data.is_empty() {
        return error_response(&DashboardError::Parse(
            "no file data received".to_string(),
        ));
    }

    match load_table(&state, &filename, &file_data) {
        Ok(loaded) => {
            let table = &loaded.table;
            let body = json!({
                "status": "ok",
                "rows": table.row_count(),
                "columns": table.column_count(),
                "numeric_columns": table.numeric_columns().len(),
                "truncated": table.truncated(),
                "advisory": truncation_advisory(table),
            });
            state.session.lock().unwrap().install(loaded);
            Json(body).into_response()
        }
        Err(e) => error_response(&e),
    }
}

fn load_table(
    state: &AppState,
    filename: &str,
    bytes: &[u8],
) -> Result<Arc<LoadedTable>, DashboardError> {
    let key = ingest::fingerprint(bytes);
    let mut tables = state.tables.lock().unwrap();
    tables.get_or_try_insert(key, || ingest::load_workbook(filename, bytes))
}

/// Everything the page needs to render its current state, in one payload.
async fn dashboard_state(State(state): State<Arc<AppState>>) -> Response {
    let session = state.session.lock().unwrap();
    if !session.loaded() {
        return Json(json!({ "loaded": false })).into_response();
    }
    match build_state(&session) {
        Ok(body) => Json(body).into_response(),
        Err(e) => error_response(&e),
    }
}

fn build_state(session: &Session) -> Result<serde_json::Value, DashboardError> {
    let loaded = session.table()?;
    let table = &loaded.table;
    let numeric = table.numeric_columns();

    let mut body = json!({
        "loaded": true,
        "metrics": {
            "rows": table.row_count(),
            "columns": table.column_count(),
            "numeric_columns": numeric.len(),
        },
        "schema": {
            "numeric": numeric,
            "text": table.text_columns(),
            "unsupported": table.unsupported_columns(),
        },
        "selections": session.selections,
        "advisory": truncation_advisory(table),
        "preview": {
            "columns": table.column_names(),
            "rows": table.preview(PREVIEW_ROWS),
        },
    });

    // Without numeric columns there is nothing to aggregate: the page gets a
    // warning and the KPI/chart/summary sections stay absent.
    if numeric.is_empty() {
        body["warning"] = json!(DashboardError::NoNumericColumns.to_string());
        return Ok(body);
    }

    let kpis = session
        .selections
        .kpi
        .iter()
        .map(|c| stats::kpi(table, c))
        .collect::<Result<Vec<_>, _>>()?;
    body["kpis"] = json!(kpis.iter().map(kpi_card).collect::<Vec<_>>());
    body["summary"] = serde_json::to_value(stats::describe(table)).unwrap_or_default();

    Ok(body)
}

async fn select(State(state): State<Arc<AppState>>, Json(req): Json<SelectRequest>) -> Response {
    let mut session = state.session.lock().unwrap();
    match session.set_selection(&req.control, req.columns) {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Render (or fetch from the chart cache) one chart panel as PNG.
async fn chart(Path(kind): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match render_chart(&state, &kind) {
        Ok(png) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(png.to_vec()))
            .unwrap(),
        Err(e) => error_response(&e),
    }
}

fn render_chart(state: &AppState, kind_str: &str) -> Result<Arc<Vec<u8>>, DashboardError> {
    let kind = ChartKind::from_str(kind_str)?;

    let (loaded, selections) = {
        let session = state.session.lock().unwrap();
        (session.table()?, session.selections.clone())
    };
    let table = &loaded.table;

    let column_for = |choice: &Option<String>| -> Result<String, DashboardError> {
        choice.clone().ok_or_else(|| {
            DashboardError::Render(format!(
                "no column selected for the {} chart",
                kind.as_str()
            ))
        })
    };

    let params: Vec<String> = match kind {
        ChartKind::Bar => vec![column_for(&selections.bar)?],
        ChartKind::Line => vec![column_for(&selections.line)?],
        ChartKind::Histogram => vec![column_for(&selections.histogram)?],
        ChartKind::Pie => vec![
            column_for(&selections.pie_category)?,
            column_for(&selections.pie_value)?,
        ],
    };

    let key = cache::cache_key(&(loaded.fingerprint, kind.as_str(), &params));
    let mut chart_cache = state.charts.lock().unwrap();
    chart_cache.get_or_try_insert(key, || match kind {
        ChartKind::Bar => charts::bar_chart(table, &params[0]),
        ChartKind::Line => charts::line_chart(table, &params[0]),
        ChartKind::Histogram => charts::histogram(table, &params[0]),
        ChartKind::Pie => charts::pie_chart(table, &params[0], &params[1]),
    })
}

/// KPI card payload: label, total formatted with thousands separators, and
/// the average as the delta line.
fn kpi_card(m: &KpiMetric) -> serde_json::Value {
    json!({
        "label": m.column,
        "value": format_thousands(m.total),
        "delta": m.average.map(|a| format!("Avg: {:.2}", a)),
    })
}

fn truncation_advisory(table: &Table) -> Option<String> {
    if table.truncated() {
        Some(format!(
            "Large dataset detected ({} rows). Using first {} rows for performance.",
            table.source_row_count(),
            group_digits(ROW_LIMIT)
        ))
    } else {
        None
    }
}

/// Thousands grouping for whole numbers, e.g. 10000 -> "10,000".
fn group_digits(n: usize) -> String {
    let digits = n.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

/// Every failure is scoped to the current request. The two taxonomy errors
/// keep their own wording; anything else becomes the generic message, and
/// the client always gets the format hint alongside.
fn error_response(err: &DashboardError) -> Response {
    let message = if err.is_user_visible() {
        err.to_string()
    } else {
        log::warn!("request failed: {}", err);
        GENERIC_ERROR.to_string()
    };
    Json(json!({
        "status": "error",
        "message": message,
        "hint": FORMAT_HINT,
    }))
    .into_response()
}

/// Format with thousands separators and two decimals,
/// e.g. 1234567.5 -> "1,234,567.50".
fn format_thousands(v: f64) -> String {
    let formatted = format!("{:.2}", v.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if v < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
