use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{info, warn};

use crate::badges::external::matches_filter;
use crate::badges::store::{self, BadgeFilter};
use crate::errors::AppError;
use crate::export::create_excel_export;
use crate::models::badge::{Badge, BadgeEntry, BadgeStats, BadgeUpdate, NewBadge, SyncReport};
use crate::printer::handlers::attachment_headers;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFilter {
    #[default]
    All,
    Local,
    External,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// 0 or 1.
    pub valide: Option<i64>,
    pub search: Option<String>,
    #[serde(default)]
    pub source: SourceFilter,
}

impl ListQuery {
    fn filter(&self) -> BadgeFilter {
        BadgeFilter {
            validated: self.valide.map(|v| v != 0),
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

/// Local badges, then upstream badges, merged and sorted by id.
///
/// With `strict_external` unset, an unreachable upstream is logged and skipped.
async fn collect_badges(
    state: &AppState,
    filter: &BadgeFilter,
    source: SourceFilter,
    strict_external: bool,
) -> Result<Vec<BadgeEntry>, AppError> {
    let mut entries = Vec::new();

    if source != SourceFilter::External {
        entries.extend(
            store::list_badges(&state.db, filter)
                .await?
                .into_iter()
                .map(Badge::into_entry),
        );
    }

    if source != SourceFilter::Local {
        match state.external.fetch_all().await {
            Ok(badges) => entries.extend(
                badges
                    .into_iter()
                    .filter(|b| matches_filter(b, filter.validated, filter.search.as_deref()))
                    .map(|b| b.into_entry()),
            ),
            Err(e) if !strict_external => {
                warn!("Could not fetch external badges: {e}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    entries.sort_by_key(|entry| entry.id);
    Ok(entries)
}

fn check_names(last_name: Option<&str>, first_name: Option<&str>) -> Result<(), AppError> {
    if last_name.is_some_and(|s| s.trim().is_empty())
        || first_name.is_some_and(|s| s.trim().is_empty())
    {
        return Err(AppError::Validation(
            "last_name and first_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/getbadges
pub async fn handle_list_badges(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BadgeEntry>>, AppError> {
    let entries = collect_badges(&state, &query.filter(), query.source, false).await?;
    Ok(Json(entries))
}

/// GET /api/getbadges/local
pub async fn handle_list_local(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BadgeEntry>>, AppError> {
    let entries = collect_badges(&state, &query.filter(), SourceFilter::Local, false).await?;
    Ok(Json(entries))
}

/// GET /api/getbadges/external
pub async fn handle_list_external(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<BadgeEntry>>, AppError> {
    let entries = collect_badges(&state, &query.filter(), SourceFilter::External, true).await?;
    Ok(Json(entries))
}

/// GET /api/getbadges/:id
pub async fn handle_get_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BadgeEntry>, AppError> {
    if let Some(badge) = store::get_badge(&state.db, id).await? {
        return Ok(Json(badge.into_entry()));
    }

    match state.external.fetch_one(id).await {
        Ok(Some(badge)) => return Ok(Json(badge.into_entry())),
        Ok(None) => {}
        Err(e) => warn!("External lookup for badge {id} failed: {e}"),
    }

    Err(AppError::NotFound("Badge not found".to_string()))
}

/// POST /api/badges, POST /user_data
pub async fn handle_create_badge(
    State(state): State<AppState>,
    Json(new): Json<NewBadge>,
) -> Result<(StatusCode, Json<Badge>), AppError> {
    check_names(Some(new.last_name.as_str()), Some(new.first_name.as_str()))?;
    let badge = store::create_badge(&state.db, &new).await?;
    info!("Created badge {} for {}", badge.id, badge.full_name());
    Ok((StatusCode::CREATED, Json(badge)))
}

/// PUT /api/badges/:id
pub async fn handle_update_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<BadgeUpdate>,
) -> Result<Json<Badge>, AppError> {
    check_names(update.last_name.as_deref(), update.first_name.as_deref())?;
    let badge = store::update_badge(&state.db, id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Badge {id} not found")))?;
    Ok(Json(badge))
}

/// DELETE /api/badges/:id
pub async fn handle_delete_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    if store::delete_badge(&state.db, id).await? {
        info!("Deleted badge {id}");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Badge {id} not found")))
    }
}

/// POST /api/validate/:id
pub async fn handle_validate_badge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Badge>, AppError> {
    let badge = store::set_validated(&state.db, id, true)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Badge {id} not found")))?;
    Ok(Json(badge))
}

/// GET /api/search?q=
pub async fn handle_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BadgeEntry>>, AppError> {
    let q = query
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("query parameter 'q' is required".to_string()))?;
    let filter = BadgeFilter {
        validated: None,
        search: Some(q),
    };
    let entries = collect_badges(&state, &filter, SourceFilter::All, false).await?;
    Ok(Json(entries))
}

/// GET /api/stats
pub async fn handle_stats(State(state): State<AppState>) -> Result<Json<BadgeStats>, AppError> {
    Ok(Json(store::badge_stats(&state.db).await?))
}

/// POST /api/sync-external
///
/// Copies upstream badges whose name pair is not yet stored locally.
pub async fn handle_sync_external(
    State(state): State<AppState>,
) -> Result<Json<SyncReport>, AppError> {
    let upstream = state.external.fetch_all().await?;
    let mut report = SyncReport {
        fetched: upstream.len(),
        imported: 0,
        skipped: 0,
    };

    for badge in upstream {
        if badge.last_name.trim().is_empty() || badge.first_name.trim().is_empty() {
            report.skipped += 1;
            continue;
        }
        if store::find_by_name(&state.db, &badge.last_name, &badge.first_name)
            .await?
            .is_some()
        {
            report.skipped += 1;
            continue;
        }
        let new = NewBadge {
            last_name: badge.last_name,
            first_name: badge.first_name,
            validated: badge.validated,
        };
        store::create_badge(&state.db, &new).await?;
        report.imported += 1;
    }

    info!(
        "External sync: {} fetched, {} imported, {} skipped",
        report.fetched, report.imported, report.skipped
    );
    Ok(Json(report))
}

/// GET /api/export-excel
pub async fn handle_export_excel(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<(HeaderMap, Bytes), AppError> {
    let entries = collect_badges(&state, &query.filter(), query.source, false).await?;
    let count = entries.len();
    let workbook = tokio::task::spawn_blocking(move || create_excel_export(&entries))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("export task failed: {e}")))??;

    info!("Exported {count} badges to spreadsheet");
    let filename = format!(
        "badges_export_{}.xlsx",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let headers = attachment_headers(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        &filename,
    )?;
    Ok((headers, Bytes::from(workbook)))
}
