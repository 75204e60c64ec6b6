//! C1: Event Store — append-only persistence of behavior events.

mod postgres;

pub use postgres::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of recognized event types.
pub const RECOGNIZED_EVENT_TYPES: &[&str] = &[
    "pageshow",
    "click",
    "focus",
    "blur",
    "keydown",
    "visibility_hidden",
    "visibility_visible",
    "idle",
    "scrollend",
    "pagehide",
];

/// The subset of recognized event types treated as engagement signals.
///
/// Two source behaviors disagreed on whether `keyup` and `blur` belong here;
/// this takes the set used by the deep-work/engagement SQL, which includes
/// `keyup`. Named so it can be tuned without touching call sites.
pub const ACTIVE_EVENT_SET: &[&str] = &[
    "pageshow",
    "click",
    "focus",
    "keyup",
    "keydown",
    "scrollend",
    "pagehide",
    "visibility_visible",
];

/// Immutable behavior event record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub event_id: Uuid,
    pub session_id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub url: String,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A new event as submitted by a client, before server fields are assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEvent {
    pub session_id: String,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub url: String,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub event_type: Option<String>,
    /// Case-insensitive substring match against `url`.
    pub url_contains: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Pagination mode. The two wire-level shapes (offset/limit, page/per_page)
/// are translated to this single internal shape at the edge.
#[derive(Debug, Clone, Copy)]
pub enum Pagination {
    Offset { offset: i64, limit: i64 },
    Page { page: i64, per_page: i64 },
}

pub const DEFAULT_OFFSET_LIMIT: i64 = 100;
pub const MAX_OFFSET_LIMIT: i64 = 1000;
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 1000;
pub const MAX_BATCH_SIZE: usize = 1000;

/// Env-tunable ceilings for the two pagination modes, sourced from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct PaginationLimits {
    pub max_offset_limit: i64,
    pub max_per_page: i64,
}

impl Default for PaginationLimits {
    fn default() -> Self {
        Self {
            max_offset_limit: MAX_OFFSET_LIMIT,
            max_per_page: MAX_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn offset_and_limit(&self, limits: PaginationLimits) -> (i64, i64) {
        match *self {
            Pagination::Offset { offset, limit } => {
                (offset.max(0), limit.clamp(1, limits.max_offset_limit))
            }
            Pagination::Page { page, per_page } => {
                let per_page = per_page.clamp(1, limits.max_per_page);
                let page = page.max(1);
                ((page - 1) * per_page, per_page)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Populated only when `Pagination::Page` was used.
    pub meta: Option<PageMeta>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page <= 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: i64,
}
