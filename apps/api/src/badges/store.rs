//! Badge record store over SQLite.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use sqlx::SqlitePool;

use crate::models::badge::{matches_search, same_name, Badge, BadgeStats, BadgeUpdate, NewBadge};

const BADGE_COLUMNS: &str = "id, last_name, first_name, validated, created_at, updated_at";

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Start of the local calendar day containing `at`, as a naive UTC timestamp.
fn local_midnight_utc<Tz: TimeZone>(at: DateTime<Tz>) -> NaiveDateTime {
    let tz = at.timezone();
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|day_start| tz.from_local_datetime(&day_start).earliest())
        .map(|start| start.naive_utc())
        .unwrap_or_else(|| at.naive_utc())
}

/// Optional filters for listing local badges.
#[derive(Debug, Clone, Default)]
pub struct BadgeFilter {
    pub validated: Option<bool>,
    /// Case-insensitive substring of last name, first name, or id.
    pub search: Option<String>,
}

pub async fn create_badge(pool: &SqlitePool, new: &NewBadge) -> Result<Badge, sqlx::Error> {
    let ts = now();
    sqlx::query_as::<_, Badge>(&format!(
        "INSERT INTO badges (last_name, first_name, validated, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {BADGE_COLUMNS}"
    ))
    .bind(new.last_name.trim())
    .bind(new.first_name.trim())
    .bind(new.validated)
    .bind(ts)
    .fetch_one(pool)
    .await
}

pub async fn get_badge(pool: &SqlitePool, id: i64) -> Result<Option<Badge>, sqlx::Error> {
    sqlx::query_as::<_, Badge>(&format!("SELECT {BADGE_COLUMNS} FROM badges WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Validation is filtered in SQL; the text search runs on the loaded rows so it
/// matches names the same way as upstream records.
pub async fn list_badges(pool: &SqlitePool, filter: &BadgeFilter) -> Result<Vec<Badge>, sqlx::Error> {
    let rows = sqlx::query_as::<_, Badge>(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges
         WHERE ($1 IS NULL OR validated = $1)
         ORDER BY id"
    ))
    .bind(filter.validated)
    .fetch_all(pool)
    .await?;

    let needle = filter.search.as_deref();
    Ok(rows
        .into_iter()
        .filter(|b| matches_search(b.id, &b.last_name, &b.first_name, needle))
        .collect())
}

/// Applies the present fields of `update`. Returns `None` if the badge does not exist.
pub async fn update_badge(
    pool: &SqlitePool,
    id: i64,
    update: &BadgeUpdate,
) -> Result<Option<Badge>, sqlx::Error> {
    sqlx::query_as::<_, Badge>(&format!(
        "UPDATE badges
         SET last_name  = COALESCE($1, last_name),
             first_name = COALESCE($2, first_name),
             validated  = COALESCE($3, validated),
             updated_at = $4
         WHERE id = $5
         RETURNING {BADGE_COLUMNS}"
    ))
    .bind(update.last_name.as_deref().map(str::trim))
    .bind(update.first_name.as_deref().map(str::trim))
    .bind(update.validated)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn set_validated(
    pool: &SqlitePool,
    id: i64,
    validated: bool,
) -> Result<Option<Badge>, sqlx::Error> {
    let update = BadgeUpdate {
        validated: Some(validated),
        ..BadgeUpdate::default()
    };
    update_badge(pool, id, &update).await
}

/// Deletes a badge and its print history. Returns whether the badge existed.
pub async fn delete_badge(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query("DELETE FROM print_logs WHERE badge_id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    let result = sqlx::query("DELETE FROM badges WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Exact name match, ignoring case (including accented letters).
pub async fn find_by_name(
    pool: &SqlitePool,
    last_name: &str,
    first_name: &str,
) -> Result<Option<Badge>, sqlx::Error> {
    let rows = sqlx::query_as::<_, Badge>(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .find(|b| same_name(&b.last_name, last_name) && same_name(&b.first_name, first_name)))
}

/// Records a printed label. Returns the log entry id.
pub async fn log_print(pool: &SqlitePool, badge_id: i64) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO print_logs (badge_id, printed_at) VALUES ($1, $2)")
        .bind(badge_id)
        .bind(now())
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn badge_stats(pool: &SqlitePool) -> Result<BadgeStats, sqlx::Error> {
    let (total, validated): (i64, i64) =
        sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(validated), 0) FROM badges")
            .fetch_one(pool)
            .await?;
    let total_prints: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM print_logs")
        .fetch_one(pool)
        .await?;

    let prints_today: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM print_logs WHERE printed_at >= $1")
            .bind(local_midnight_utc(Local::now()))
            .fetch_one(pool)
            .await?;

    Ok(BadgeStats {
        total,
        validated,
        pending: total - validated,
        total_prints,
        prints_today,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn new_badge(last: &str, first: &str) -> NewBadge {
        NewBadge {
            last_name: last.to_string(),
            first_name: first.to_string(),
            validated: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_badge() {
        let pool = memory_pool().await;
        let created = create_badge(&pool, &new_badge(" Smith ", "Jane")).await.unwrap();
        assert_eq!(created.last_name, "Smith");
        assert!(!created.validated);

        let fetched = get_badge(&pool, created.id).await.unwrap().unwrap();
        assert_eq!(fetched.full_name(), "Jane Smith");
        assert!(get_badge(&pool, created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_validation_and_search() {
        let pool = memory_pool().await;
        let jane = create_badge(&pool, &new_badge("Smith", "Jane")).await.unwrap();
        create_badge(&pool, &new_badge("Doe", "John")).await.unwrap();
        set_validated(&pool, jane.id, true).await.unwrap();

        let all = list_badges(&pool, &BadgeFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);

        let validated = list_badges(
            &pool,
            &BadgeFilter {
                validated: Some(true),
                search: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(validated.len(), 1);
        assert_eq!(validated[0].id, jane.id);

        let searched = list_badges(
            &pool,
            &BadgeFilter {
                validated: None,
                search: Some("doe".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].first_name, "John");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let pool = memory_pool().await;
        let badge = create_badge(&pool, &new_badge("Smith", "Jane")).await.unwrap();
        let update = BadgeUpdate {
            first_name: Some("Janet".to_string()),
            ..BadgeUpdate::default()
        };
        let updated = update_badge(&pool, badge.id, &update).await.unwrap().unwrap();
        assert_eq!(updated.first_name, "Janet");
        assert_eq!(updated.last_name, "Smith");
        assert!(updated.updated_at >= badge.updated_at);

        assert!(update_badge(&pool, 999, &update).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_print_history() {
        let pool = memory_pool().await;
        let badge = create_badge(&pool, &new_badge("Smith", "Jane")).await.unwrap();
        log_print(&pool, badge.id).await.unwrap();

        assert!(delete_badge(&pool, badge.id).await.unwrap());
        assert!(!delete_badge(&pool, badge.id).await.unwrap());
        assert_eq!(badge_stats(&pool).await.unwrap().total_prints, 0);
    }

    #[tokio::test]
    async fn test_find_by_name_ignores_case() {
        let pool = memory_pool().await;
        create_badge(&pool, &new_badge("Smith", "Jane")).await.unwrap();
        create_badge(&pool, &new_badge("Dupont", "Hélène")).await.unwrap();
        assert!(find_by_name(&pool, "SMITH", "jane").await.unwrap().is_some());
        assert!(find_by_name(&pool, "DUPONT", "HÉLÈNE").await.unwrap().is_some());
        assert!(find_by_name(&pool, "Smith", "John").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_is_literal_and_unicode_case_insensitive() {
        let pool = memory_pool().await;
        create_badge(&pool, &new_badge("Dupont", "Hélène")).await.unwrap();
        create_badge(&pool, &new_badge("Smith", "Jane")).await.unwrap();

        let search = |text: &str| BadgeFilter {
            validated: None,
            search: Some(text.to_string()),
        };
        let accented = list_badges(&pool, &search("HÉLÈNE")).await.unwrap();
        assert_eq!(accented.len(), 1);
        assert_eq!(accented[0].last_name, "Dupont");
        assert!(list_badges(&pool, &search("_")).await.unwrap().is_empty());
        assert!(list_badges(&pool, &search("%")).await.unwrap().is_empty());
    }

    #[test]
    fn test_day_boundary_follows_local_offset() {
        use chrono::FixedOffset;

        let paris = FixedOffset::east_opt(3600).unwrap();
        let just_after_midnight = paris.with_ymd_and_hms(2026, 3, 10, 0, 30, 0).unwrap();
        let start = local_midnight_utc(just_after_midnight);
        assert_eq!(
            start,
            Utc.with_ymd_and_hms(2026, 3, 9, 23, 0, 0).unwrap().naive_utc()
        );
    }

    #[tokio::test]
    async fn test_stats_counts_badges_and_prints() {
        let pool = memory_pool().await;
        let jane = create_badge(&pool, &new_badge("Smith", "Jane")).await.unwrap();
        create_badge(&pool, &new_badge("Doe", "John")).await.unwrap();
        set_validated(&pool, jane.id, true).await.unwrap();
        log_print(&pool, jane.id).await.unwrap();
        log_print(&pool, jane.id).await.unwrap();

        let stats = badge_stats(&pool).await.unwrap();
        assert_eq!(
            stats,
            BadgeStats {
                total: 2,
                validated: 1,
                pending: 1,
                total_prints: 2,
                prints_today: 2,
            }
        );
    }
}
