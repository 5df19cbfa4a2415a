// ==========================================
// 工数管理系统 - HTTP 接口层
// ==========================================
// 职责: 将 API 层暴露为 JSON 接口
// 调用者通过 x-employee-id 请求头识别
// 响应格式: { success: true, data } / { success: false, code, message }
// ==========================================

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::api::{
    AggregationInput, ApiError, CreateWorkloadRequest, ExportRequest,
};
use crate::app::state::AppState;
use crate::domain::organization::Viewer;
use crate::domain::workload::YearMonth;
use crate::repository::AggregationFilter;

/// 调用者识别请求头
pub const EMPLOYEE_HEADER: &str = "x-employee-id";

type SharedState = Arc<AppState>;
type HttpResult = Result<Json<Value>, HttpError>;

/// 构建路由
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/status", get(status))
        // 下拉选项
        .route("/api/departments", get(departments))
        .route("/api/departments/{id}/sections", get(sections))
        .route("/api/projects", get(projects))
        .route("/api/projects/{id}/tickets", get(tickets))
        .route("/api/projects/{id}/summary", get(project_summary))
        // 工数
        .route("/api/calendar/{year_month}", get(calendar))
        .route("/api/workloads", get(month_view).post(create_workload))
        .route("/api/workloads/{id}", axum::routing::delete(delete_workload))
        .route("/api/workloads/{id}/days/{day}", put(update_cell))
        // 汇总
        .route("/api/aggregations", get(list_aggregations).post(create_aggregation))
        .route(
            "/api/aggregations/{id}",
            get(get_aggregation)
                .put(update_aggregation)
                .delete(delete_aggregation),
        )
        .route("/api/tickets/{id}/workdays", post(auto_calculate))
        // 驾驶舱
        .route("/api/dashboard", get(dashboard))
        .route("/api/home-stats", get(home_stats))
        .route("/api/outsourcing/summary/{year_month}", get(outsourcing_summary))
        // 报表导出
        .route("/api/exports", get(list_exports).post(request_export))
        .route("/api/exports/{id}", get(get_export))
        .route("/api/exports/{id}/download", get(download_export))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==========================================
// 响应/错误
// ==========================================

fn ok<T: Serialize>(data: T) -> HttpResult {
    let data = serde_json::to_value(data)
        .map_err(|e| HttpError(ApiError::InternalError(format!("响应序列化失败: {}", e))))?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// rusqlite 调用为同步阻塞, 放到阻塞线程池执行
async fn run_blocking<T, F>(state: &SharedState, f: F) -> Result<T, HttpError>
where
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| HttpError(ApiError::InternalError(format!("阻塞任务异常终止: {}", e))))?
        .map_err(HttpError)
}

async fn respond<T, F>(state: &SharedState, f: F) -> HttpResult
where
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
    T: Serialize + Send + 'static,
{
    ok(run_blocking(state, f).await?)
}

/// HTTP 错误包装
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl From<ApiError> for HttpError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl HttpError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_)
            | ApiError::ValidationError(_)
            | ApiError::FieldValidation(_)
            | ApiError::BusinessRuleViolation(_)
            | ApiError::InvalidStateTransition { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), "{}", self.0);
        } else {
            warn!(code = self.0.code(), "{}", self.0);
        }
        let mut body = json!({
            "success": false,
            "code": self.0.code(),
            "message": self.0.to_string(),
        });
        if let ApiError::FieldValidation(fields) = &self.0 {
            body["fields"] = json!(fields);
        }
        (status, Json(body)).into_response()
    }
}

// ==========================================
// 调用者
// ==========================================

/// 已识别的调用者
pub struct Caller(pub Viewer);

impl FromRequestParts<SharedState> for Caller {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let employee_id = parts
            .headers
            .get(EMPLOYEE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized(format!("缺少请求头 {}", EMPLOYEE_HEADER)))?
            .to_string();
        let viewer = run_blocking(state, move |s| s.organization_api.resolve_viewer(&employee_id)).await?;
        Ok(Caller(viewer))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ==========================================
// 系统
// ==========================================

async fn status(State(state): State<SharedState>) -> HttpResult {
    let settings = run_blocking(&state, |s| {
        s.config_manager
            .get_business_settings()
            .map_err(ApiError::from)
    })
    .await?;
    ok(json!({
        "app": crate::APP_NAME,
        "version": crate::VERSION,
        "db_version": crate::DB_VERSION,
        "settings": settings,
    }))
}

// ==========================================
// 下拉选项
// ==========================================

async fn departments(State(state): State<SharedState>, _caller: Caller) -> HttpResult {
    respond(&state, |s| s.organization_api.department_options()).await
}

async fn sections(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(department_id): Path<String>,
) -> HttpResult {
    respond(&state, move |s| s.organization_api.section_options(&department_id)).await
}

async fn projects(State(state): State<SharedState>, _caller: Caller) -> HttpResult {
    respond(&state, |s| s.organization_api.project_options()).await
}

async fn tickets(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(project_id): Path<String>,
) -> HttpResult {
    respond(&state, move |s| s.organization_api.ticket_options(&project_id)).await
}

// ==========================================
// 工数
// ==========================================

#[derive(Debug, Deserialize)]
struct MonthQuery {
    year_month: Option<YearMonth>,
}

#[derive(Debug, Deserialize)]
struct CellBody {
    hours: Decimal,
}

async fn calendar(State(state): State<SharedState>, Path(year_month): Path<YearMonth>) -> HttpResult {
    respond(&state, move |s| s.workload_api.calendar(year_month)).await
}

async fn month_view(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Query(query): Query<MonthQuery>,
) -> HttpResult {
    let year_month = query
        .year_month
        .unwrap_or_else(|| YearMonth::from_date(today()));
    respond(&state, move |s| s.workload_api.month_view(&viewer, year_month)).await
}

async fn create_workload(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Json(request): Json<CreateWorkloadRequest>,
) -> HttpResult {
    respond(&state, move |s| s.workload_api.create_row(&viewer, request)).await
}

async fn update_cell(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Path((workload_id, day)): Path<(String, u32)>,
    Json(body): Json<CellBody>,
) -> HttpResult {
    respond(&state, move |s| {
        s.workload_api
            .update_cell(&viewer, &workload_id, day, body.hours)
    })
    .await
}

async fn delete_workload(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Path(workload_id): Path<String>,
) -> HttpResult {
    let message = run_blocking(&state, move |s| s.workload_api.delete_row(&viewer, &workload_id)).await?;
    ok(json!({ "message": message }))
}

// ==========================================
// 工数汇总
// ==========================================

#[derive(Debug, Default, Deserialize)]
struct WorkdayBody {
    order_date: Option<NaiveDate>,
    actual_end_date: Option<NaiveDate>,
}

async fn list_aggregations(
    State(state): State<SharedState>,
    _caller: Caller,
    Query(filter): Query<AggregationFilter>,
) -> HttpResult {
    respond(&state, move |s| s.aggregation_api.list(&filter)).await
}

async fn create_aggregation(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Json(input): Json<AggregationInput>,
) -> HttpResult {
    respond(&state, move |s| s.aggregation_api.create(&viewer, input)).await
}

async fn get_aggregation(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(aggregation_id): Path<String>,
) -> HttpResult {
    respond(&state, move |s| s.aggregation_api.get(&aggregation_id)).await
}

async fn update_aggregation(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(aggregation_id): Path<String>,
    Json(input): Json<AggregationInput>,
) -> HttpResult {
    respond(&state, move |s| s.aggregation_api.update(&aggregation_id, input)).await
}

async fn delete_aggregation(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(aggregation_id): Path<String>,
) -> HttpResult {
    let id = aggregation_id.clone();
    run_blocking(&state, move |s| s.aggregation_api.delete(&id)).await?;
    ok(json!({ "aggregation_id": aggregation_id }))
}

async fn auto_calculate(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(ticket_id): Path<String>,
    body: Option<Json<WorkdayBody>>,
) -> HttpResult {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    respond(&state, move |s| {
        s.aggregation_api.auto_calculate(
            &ticket_id,
            body.order_date,
            body.actual_end_date,
            today(),
        )
    })
    .await
}

// ==========================================
// 驾驶舱
// ==========================================

async fn dashboard(State(state): State<SharedState>, Caller(viewer): Caller) -> HttpResult {
    respond(&state, move |s| s.dashboard_api.company_dashboard(&viewer, today())).await
}

async fn home_stats(State(state): State<SharedState>, Caller(viewer): Caller) -> HttpResult {
    respond(&state, move |s| s.dashboard_api.home_stats(&viewer, today())).await
}

async fn project_summary(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(project_id): Path<String>,
) -> HttpResult {
    respond(&state, move |s| s.dashboard_api.project_summary(&project_id)).await
}

async fn outsourcing_summary(
    State(state): State<SharedState>,
    _caller: Caller,
    Path(year_month): Path<YearMonth>,
) -> HttpResult {
    respond(&state, move |s| s.outsourcing_api.monthly_summary(year_month)).await
}

// ==========================================
// 报表导出
// ==========================================

/// 登记导出请求, 在阻塞线程池中执行
async fn request_export(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Json(request): Json<ExportRequest>,
) -> HttpResult {
    let job = run_blocking(&state, move |s| s.report_export_api.request(&viewer, request)).await?;

    let worker = state.clone();
    let export_id = job.export_id.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = worker.report_export_api.process(&export_id) {
            error!(export_id = %export_id, error = %e, "导出任务执行失败");
        }
    });

    ok(job)
}

async fn list_exports(State(state): State<SharedState>, Caller(viewer): Caller) -> HttpResult {
    respond(&state, move |s| s.report_export_api.list(&viewer)).await
}

async fn get_export(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Path(export_id): Path<String>,
) -> HttpResult {
    respond(&state, move |s| s.report_export_api.get(&viewer, &export_id)).await
}

async fn download_export(
    State(state): State<SharedState>,
    Caller(viewer): Caller,
    Path(export_id): Path<String>,
) -> Result<Response, HttpError> {
    let payload = run_blocking(&state, move |s| {
        s.report_export_api
            .download(&viewer, &export_id, Local::now().naive_local())
    })
    .await?;
    let headers = [
        (header::CONTENT_TYPE, payload.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", payload.file_name),
        ),
    ];
    Ok((headers, payload.bytes).into_response())
}
