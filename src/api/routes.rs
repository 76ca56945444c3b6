use crate::config::Config;
use crate::db::{Database, EntryRow, TemplateRow};
use crate::status::scheme::CategoryScheme;
use crate::status::{self, ValidationError};
use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/status/generate", post(status_generate))
        .route("/api/v1/entries", get(entries_list).post(entries_create))
        .route(
            "/api/v1/entries/:id",
            put(entries_update).delete(entries_delete),
        )
        .route(
            "/api/v1/templates",
            get(templates_list).post(templates_create),
        )
        .route(
            "/api/v1/templates/:id",
            get(templates_show)
                .put(templates_update)
                .delete(templates_delete),
        )
        .route(
            "/api/v1/settings/reminders",
            get(reminders_get).put(reminders_put),
        )
        .route("/api/v1/scheme", get(scheme_get).put(scheme_put))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct EntriesQuery {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntriesPayload {
    from: String,
    to: String,
    count: usize,
    entries: Vec<EntryRow>,
}

#[derive(Debug, Deserialize)]
struct EntryCreatePayload {
    content: String,
    category: Option<String>,
    logged_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EntryUpdatePayload {
    content: Option<String>,
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct TemplatesPayload {
    count: usize,
    templates: Vec<TemplateRow>,
}

#[derive(Debug, Deserialize)]
struct TemplateCreatePayload {
    name: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct TemplateUpdatePayload {
    name: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratePayload {
    template_id: Option<String>,
    template: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeneratedPayload {
    from: String,
    to: String,
    date_range: String,
    html: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    entry_count: i64,
    template_count: i64,
    last_logged_at: Option<i64>,
    category_scheme: String,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct RemindersPayload {
    enabled: bool,
    time: String,
    end_of_week: bool,
}

#[derive(Debug, Deserialize)]
struct RemindersUpdatePayload {
    enabled: Option<bool>,
    time: Option<String>,
    end_of_week: Option<bool>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let scheme = load_scheme(&state.config)?;

    let payload = StatusPayload {
        entry_count: database.entry_count()?,
        template_count: database.template_count()?,
        last_logged_at: database.latest_entry_timestamp()?,
        category_scheme: scheme.name,
        api_port: state.config.api_port,
    };

    Ok(Json(payload))
}

async fn entries_list(
    State(state): State<ApiState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<EntriesPayload>> {
    let from_date = query
        .from
        .as_deref()
        .map(parse_date)
        .transpose()
        .map_err(bad_request)?
        .unwrap_or_else(|| Local::now().date_naive());

    let to_date = query
        .to
        .as_deref()
        .map(parse_date)
        .transpose()
        .map_err(bad_request)?
        .unwrap_or(from_date);

    let database = Database::open(&state.config.db_path)?;
    let mut records = database.entries_between_dates(from_date, to_date)?;
    records.reverse();

    let payload = EntriesPayload {
        from: from_date.format("%Y-%m-%d").to_string(),
        to: to_date.format("%Y-%m-%d").to_string(),
        count: records.len(),
        entries: records,
    };

    Ok(Json(payload))
}

async fn entries_create(
    State(state): State<ApiState>,
    Json(payload): Json<EntryCreatePayload>,
) -> ApiResult<Json<EntryRow>> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            ValidationError::EmptyContent.to_string(),
        ));
    }

    let category = match normalized_category(payload.category.as_deref()) {
        Some(given) => given,
        None => load_scheme(&state.config)?.categorize(&payload.content),
    };
    let logged_at = payload
        .logged_at
        .unwrap_or_else(|| Local::now().timestamp_millis());

    let database = Database::open(&state.config.db_path)?;
    let entry = database.insert_entry(&payload.content, &category, logged_at)?;

    Ok(Json(entry))
}

async fn entries_update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<EntryUpdatePayload>,
) -> ApiResult<Json<EntryRow>> {
    if let Some(content) = payload.content.as_deref() {
        if content.trim().is_empty() {
            return Err(ApiError::BadRequest(
                ValidationError::EmptyContent.to_string(),
            ));
        }
    }

    // Changing the content without naming a category re-runs the categorizer.
    let category = match (
        normalized_category(payload.category.as_deref()),
        payload.content.as_deref(),
    ) {
        (Some(given), _) => Some(given),
        (None, Some(content)) => Some(load_scheme(&state.config)?.categorize(content)),
        (None, None) => None,
    };

    let database = Database::open(&state.config.db_path)?;
    let updated =
        database.update_entry(&id, payload.content.as_deref(), category.as_deref(), None)?;
    if !updated {
        return Err(ApiError::NotFound(format!("Entry not found: {id}")));
    }

    let entry = database.entry(&id)?.context("Failed to reload entry")?;
    Ok(Json(entry))
}

async fn entries_delete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;

    if !database.delete_entry(&id)? {
        return Err(ApiError::NotFound(format!("Entry not found: {id}")));
    }

    Ok(Json(json!({ "deleted": true, "id": id })))
}

async fn templates_list(State(state): State<ApiState>) -> ApiResult<Json<TemplatesPayload>> {
    let database = Database::open(&state.config.db_path)?;
    let templates = database.list_templates()?;

    Ok(Json(TemplatesPayload {
        count: templates.len(),
        templates,
    }))
}

async fn templates_show(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TemplateRow>> {
    let database = Database::open(&state.config.db_path)?;
    let template = database
        .template(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Template not found: {id}")))?;

    Ok(Json(template))
}

async fn templates_create(
    State(state): State<ApiState>,
    Json(payload): Json<TemplateCreatePayload>,
) -> ApiResult<Json<TemplateRow>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(ValidationError::EmptyName.to_string()));
    }
    if status::render::text_content(&payload.content).is_empty() {
        return Err(ApiError::BadRequest(
            ValidationError::EmptyTemplate.to_string(),
        ));
    }

    let database = Database::open(&state.config.db_path)?;
    if database.template_by_name(name)?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "Template name already exists: {name}"
        )));
    }

    let template = database.insert_template(name, &payload.content)?;
    Ok(Json(template))
}

async fn templates_update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<TemplateUpdatePayload>,
) -> ApiResult<Json<TemplateRow>> {
    let name = payload.name.as_deref().map(str::trim);
    if let Some(name) = name {
        if name.is_empty() {
            return Err(ApiError::BadRequest(ValidationError::EmptyName.to_string()));
        }
    }
    if let Some(content) = payload.content.as_deref() {
        if status::render::text_content(content).is_empty() {
            return Err(ApiError::BadRequest(
                ValidationError::EmptyTemplate.to_string(),
            ));
        }
    }

    let database = Database::open(&state.config.db_path)?;
    let current = database
        .template(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("Template not found: {id}")))?;

    if let Some(name) = name {
        if name != current.name && database.template_by_name(name)?.is_some() {
            return Err(ApiError::BadRequest(format!(
                "Template name already exists: {name}"
            )));
        }
    }

    database.update_template(&id, name, payload.content.as_deref())?;

    let template = database.template(&id)?.context("Failed to reload template")?;
    Ok(Json(template))
}

async fn templates_delete(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;

    if !database.delete_template(&id)? {
        return Err(ApiError::NotFound(format!("Template not found: {id}")));
    }

    Ok(Json(json!({ "deleted": true, "id": id })))
}

async fn status_generate(
    State(state): State<ApiState>,
    Json(payload): Json<GeneratePayload>,
) -> ApiResult<Json<GeneratedPayload>> {
    let (Some(from_raw), Some(to_raw)) = (payload.from.as_deref(), payload.to.as_deref()) else {
        return Err(ApiError::BadRequest(
            ValidationError::MissingDateRange.to_string(),
        ));
    };
    let from_date = parse_date(from_raw).map_err(bad_request)?;
    let to_date = parse_date(to_raw).map_err(bad_request)?;

    let database = Database::open(&state.config.db_path)?;
    let template_content = match (payload.template_id.as_deref(), payload.template) {
        (Some(id), _) => {
            database
                .template(id)?
                .ok_or_else(|| ApiError::NotFound(format!("Template not found: {id}")))?
                .content
        }
        (None, Some(inline)) => inline,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Provide template_id or template".to_string(),
            ));
        }
    };

    let scheme = load_scheme(&state.config)?;
    let report =
        status::generate_status(&database, &scheme, from_date, to_date, &template_content)
            .map_err(into_api_error)?;

    Ok(Json(GeneratedPayload {
        from: from_date.format("%Y-%m-%d").to_string(),
        to: to_date.format("%Y-%m-%d").to_string(),
        date_range: report.date_range,
        html: report.html,
        text: report.text,
    }))
}

async fn reminders_get(State(state): State<ApiState>) -> ApiResult<Json<RemindersPayload>> {
    let config = Config::load().unwrap_or_else(|_| state.config.as_ref().clone());

    Ok(Json(RemindersPayload {
        enabled: config.reminder_enabled,
        time: config.reminder_time,
        end_of_week: config.end_of_week_reminder,
    }))
}

async fn reminders_put(
    State(state): State<ApiState>,
    Json(payload): Json<RemindersUpdatePayload>,
) -> ApiResult<Json<Value>> {
    let mut config = Config::load().unwrap_or_else(|_| state.config.as_ref().clone());

    if let Some(enabled) = payload.enabled {
        config
            .set_value("reminder_enabled", &enabled.to_string())
            .map_err(bad_request)?;
    }
    if let Some(time) = payload.time.as_deref() {
        config
            .set_value("reminder_time", time.trim())
            .map_err(bad_request)?;
    }
    if let Some(end_of_week) = payload.end_of_week {
        config
            .set_value("end_of_week_reminder", &end_of_week.to_string())
            .map_err(bad_request)?;
    }
    config.save()?;

    Ok(Json(json!({
        "saved": true,
        "enabled": config.reminder_enabled,
        "time": config.reminder_time,
        "end_of_week": config.end_of_week_reminder
    })))
}

async fn scheme_get(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let content = fs::read_to_string(&state.config.scheme_path).with_context(|| {
        format!(
            "Failed to read scheme file: {}",
            state.config.scheme_path.display()
        )
    })?;
    let scheme: Value = serde_json::from_str(&content).context("Failed to parse scheme JSON")?;

    Ok(Json(scheme))
}

async fn scheme_put(
    State(state): State<ApiState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Value>> {
    let pretty =
        serde_json::to_string_pretty(&payload).context("Failed to serialize scheme JSON")?;
    CategoryScheme::parse(&pretty)
        .map_err(|error| ApiError::BadRequest(format!("Invalid scheme: {error}")))?;

    fs::write(&state.config.scheme_path, pretty).with_context(|| {
        format!(
            "Failed to save scheme file: {}",
            state.config.scheme_path.display()
        )
    })?;

    Ok(Json(json!({
        "saved": true,
        "path": state.config.scheme_path.display().to_string()
    })))
}

fn load_scheme(config: &Config) -> Result<CategoryScheme> {
    CategoryScheme::load(&config.scheme_path)
}

fn normalized_category(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-01-31"))
}

fn bad_request(error: anyhow::Error) -> ApiError {
    ApiError::BadRequest(error.to_string())
}

fn into_api_error(error: anyhow::Error) -> ApiError {
    match error.downcast_ref::<ValidationError>() {
        Some(validation) => ApiError::BadRequest(validation.to_string()),
        None => ApiError::Internal(error),
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": error.to_string() })),
            )
                .into_response(),
        }
    }
}
