//! Client for the upstream event badge service.
//!
//! The upstream exposes `GET <base>` (all badges, JSON array) and `GET <base>/<id>`.
//! Records are read-only from our side; `POST /api/sync-external` copies them locally.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::models::badge::{matches_search, ExternalBadge};

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External badge service returned status {0}")]
    Status(u16),
}

#[derive(Clone)]
pub struct ExternalBadgeClient {
    client: Client,
    base_url: String,
}

impl ExternalBadgeClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ExternalError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_all(&self) -> Result<Vec<ExternalBadge>, ExternalError> {
        let response = self.client.get(&self.base_url).send().await?;
        if !response.status().is_success() {
            return Err(ExternalError::Status(response.status().as_u16()));
        }
        let badges: Vec<ExternalBadge> = response.json().await?;
        debug!("Fetched {} external badges", badges.len());
        Ok(badges)
    }

    /// Returns `Ok(None)` when the upstream answers 404.
    pub async fn fetch_one(&self, id: i64) -> Result<Option<ExternalBadge>, ExternalError> {
        let url = format!("{}/{id}", self.base_url);
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(ExternalError::Status(status.as_u16())),
        }
    }
}

/// Listing filter applied to upstream records, mirroring the local store's filter.
pub fn matches_filter(badge: &ExternalBadge, validated: Option<bool>, search: Option<&str>) -> bool {
    if validated.is_some_and(|v| v != badge.validated) {
        return false;
    }
    matches_search(badge.id, &badge.last_name, &badge.first_name, search)
}
