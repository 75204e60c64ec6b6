use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    analytics::orchestrator::{self, Window},
    cache::keys,
    config::Config,
    envelope::Envelope,
    error::AppError,
    ingress,
    store::{EventFilter, NewEvent, PageMeta, Pagination},
    AppState,
};

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::Store(e.to_string()))?;
    Ok((StatusCode::OK, body))
}

// ---- Ingress (write) ----

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<NewEvent>,
) -> Result<impl IntoResponse, AppError> {
    ingress::validate_event(&event).map_err(AppError::Validation)?;
    let stored = state.db.append(event).await?;
    Ok((StatusCode::CREATED, Envelope::new(stored)))
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub events: Vec<NewEvent>,
}

pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    ingress::validate_batch(&body.events).map_err(AppError::Validation)?;
    let count = body.events.len();
    state.db.append_batch(body.events).await?;
    Ok((
        StatusCode::CREATED,
        Envelope::new(format!("Successfully created {count} behavior events")),
    ))
}

// ---- Event Store (read/delete) ----

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub event_type: Option<String>,
    pub url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl EventQuery {
    fn filter(&self) -> EventFilter {
        EventFilter {
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
            event_type: self.event_type.clone(),
            url_contains: self.url.clone(),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }

    /// Translates the dual wire-level pagination shapes into the single
    /// internal `Pagination` enum. `page`/`per_page` take precedence when
    /// both are present, since they are the only mode that surfaces
    /// pagination meta.
    fn pagination(&self, config: &Config) -> Pagination {
        if self.page.is_some() || self.per_page.is_some() {
            Pagination::Page {
                page: self.page.unwrap_or(1),
                per_page: self.per_page.unwrap_or(config.default_per_page),
            }
        } else {
            Pagination::Offset {
                offset: self.offset.unwrap_or(0),
                limit: self.limit.unwrap_or(config.default_offset_limit),
            }
        }
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .db
        .query(
            &query.filter(),
            query.pagination(&state.config),
            state.config.pagination_limits(),
        )
        .await?;
    match result.meta {
        Some(meta) => Ok(Envelope::with_meta(result.items, meta)),
        None => Ok(Envelope::new(result.items)),
    }
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let event = state.db.get(id).await?;
    Ok(Envelope::new(event))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.db.delete(id).await?;
    Ok(Envelope::new(format!("event {id} deleted")))
}

pub async fn user_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.user_id.as_deref().unwrap_or("").trim().is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    let result = state
        .db
        .query(
            &query.filter(),
            query.pagination(&state.config),
            state.config.pagination_limits(),
        )
        .await?;
    match result.meta {
        Some(meta) => Ok(Envelope::with_meta(result.items, meta)),
        None => Ok(Envelope::new(result.items)),
    }
}

// ---- Sessionizer (C2) ----

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl WindowQuery {
    fn window(&self) -> Window {
        Window {
            user_id: self.user_id.clone(),
            start: self.start_time,
            end: self.end_time,
            session_id: self.session_id.clone(),
        }
    }
}

pub async fn tracked_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
    Extension(token): Extension<CancellationToken>,
) -> Result<impl IntoResponse, AppError> {
    let window = query.window();
    let cache_key = keys::tracked_time(
        &query.user_id,
        &query.start_time.to_rfc3339(),
        &query.end_time.to_rfc3339(),
        query.session_id.as_deref(),
    );

    if token.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let (metric, hit) = state
        .cache
        .get_or_set_json(&cache_key, Duration::from_secs(60), || async {
            orchestrator::tracked_time_by_session(
                &state.db,
                &window,
                state.config.max_window_span_days,
                &token,
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

    observe_cache(&state, "tracked_time", hit);
    Ok(Envelope::new(metric))
}

#[derive(Debug, Deserialize)]
pub struct UserSessionQuery {
    pub user_id: String,
    pub session_id: Option<String>,
}

pub async fn tracked_time_total(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserSessionQuery>,
    Extension(token): Extension<CancellationToken>,
) -> Result<impl IntoResponse, AppError> {
    let cache_key = keys::tracked_time_total(&query.user_id, query.session_id.as_deref());

    if token.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let (metric, hit) = state
        .cache
        .get_or_set_json(&cache_key, Duration::from_secs(60), || async {
            orchestrator::tracked_time_total(
                &state.db,
                &query.user_id,
                query.session_id.as_deref(),
                &token,
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

    observe_cache(&state, "tracked_time_total", hit);
    Ok(Envelope::new(metric))
}

// ---- Engagement / Deep-Work composite (C3 + C4 + C5) ----

pub async fn engaged_time(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
    Extension(token): Extension<CancellationToken>,
) -> Result<impl IntoResponse, AppError> {
    let window = query.window();
    let result = orchestrator::engaged_time(
        &state.db,
        &window,
        state.config.max_window_span_days,
        state.ai_labeling.as_ref(),
        &state.config.analytics_thresholds,
        &token,
    )
    .await?;
    Ok(Envelope::new(result))
}

pub async fn deep_work_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
    Extension(token): Extension<CancellationToken>,
) -> Result<impl IntoResponse, AppError> {
    let window = query.window();
    let cache_key = keys::deep_work_sessions(
        &query.user_id,
        &query.start_time.to_rfc3339(),
        &query.end_time.to_rfc3339(),
        query.session_id.as_deref(),
    );

    if token.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let (result, hit) = state
        .cache
        .get_or_set_json(&cache_key, Duration::from_secs(60), || async {
            orchestrator::deep_work_sessions(
                &state.db,
                &window,
                state.config.max_window_span_days,
                &state.config.analytics_thresholds,
                &token,
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

    observe_cache(&state, "deep_work_sessions", hit);
    Ok(Envelope::new(result))
}

// ---- Domain Analyzer (C5) ----

#[derive(Debug, Deserialize)]
pub struct TopDomainsQuery {
    pub user_id: String,
    pub session_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

pub async fn top_domains(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopDomainsQuery>,
    Extension(token): Extension<CancellationToken>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(crate::analytics::domains::DEFAULT_TOP_DOMAINS_LIMIT);
    let start_rfc3339 = query.start_time.map(|t| t.to_rfc3339());
    let end_rfc3339 = query.end_time.map(|t| t.to_rfc3339());
    let cache_key = keys::top_domains(
        &query.user_id,
        query.session_id.as_deref(),
        start_rfc3339.as_deref(),
        end_rfc3339.as_deref(),
        limit,
    );

    if token.is_cancelled() {
        return Err(AppError::Cancelled);
    }

    let (result, hit) = state
        .cache
        .get_or_set_json(&cache_key, Duration::from_secs(120), || async {
            orchestrator::top_domains(
                &state.db,
                &query.user_id,
                query.session_id.as_deref(),
                query.start_time,
                query.end_time,
                limit,
                &token,
            )
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

    observe_cache(&state, "top_domains", hit);
    Ok(Envelope::new(result))
}

// ---- Sessions ----

pub async fn session_summary(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter {
        session_id: Some(session_id.clone()),
        ..Default::default()
    };
    let events = state.db.query_all(&filter).await?;
    match crate::analytics::sessionizer::session_summary(&session_id, &events) {
        Some(summary) => Ok(Envelope::new(summary)),
        None => Err(AppError::NotFound(format!("session {session_id} not found"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct UserSessionsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub async fn user_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<UserSessionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = EventFilter {
        user_id: Some(user_id),
        ..Default::default()
    };
    let events = state.db.query_all(&filter).await?;
    let sessions = crate::analytics::sessionizer::user_sessions(&events);

    let per_page = query
        .per_page
        .unwrap_or(state.config.default_per_page)
        .clamp(1, state.config.max_per_page);
    let page = query.page.unwrap_or(1).max(1);
    let total = sessions.len() as i64;
    let start = ((page - 1) * per_page).max(0) as usize;
    let page_items: Vec<_> = sessions
        .into_iter()
        .skip(start)
        .take(per_page as usize)
        .collect();

    Ok(Envelope::with_meta(page_items, PageMeta::new(page, per_page, total)))
}

// ---- Stats ----

pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let counts = state
        .db
        .user_event_type_counts(&query.user_id, query.start_time, query.end_time)
        .await?;
    Ok(Envelope::new(counts))
}

fn observe_cache(state: &AppState, endpoint: &str, hit: bool) {
    if hit {
        state.metrics.observe_hit("api", endpoint);
    } else {
        state.metrics.observe_miss("api", endpoint);
    }
}
