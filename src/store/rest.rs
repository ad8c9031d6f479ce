//! REST client for the match history service

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::game::EndReason;

use super::{MatchStore, StoreError};

/// Match history client. Local matches are sent like remote ones; their
/// negative ids keep them apart from externally assigned ones.
#[derive(Clone)]
pub struct RestMatchStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScoreUpdate {
    p1_score: u32,
    p2_score: u32,
}

#[derive(Debug, Serialize)]
struct MatchEnd {
    reason: EndReason,
    ended_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
struct MatchStart {
    started_at: chrono::DateTime<chrono::Utc>,
}

impl RestMatchStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build from config, if a persistence URL is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .persistence_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.persistence_token.clone()))
    }

    fn match_url(&self, match_id: i64, action: &str) -> String {
        format!("{}/matches/{}/{}", self.base_url, match_id, action)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Content-Type", "application/json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), StoreError> {
        debug!("Sending match history update");
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(StoreError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl MatchStore for RestMatchStore {
    fn start_match(&self, match_id: i64) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let body = MatchStart {
                started_at: chrono::Utc::now(),
            };
            let request = self.client.post(self.match_url(match_id, "start")).json(&body);
            self.execute(request).await
        }
        .boxed()
    }

    fn update_score(
        &self,
        match_id: i64,
        p1: u32,
        p2: u32,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let body = ScoreUpdate {
                p1_score: p1,
                p2_score: p2,
            };
            let request = self.client.patch(self.match_url(match_id, "score")).json(&body);
            self.execute(request).await
        }
        .boxed()
    }

    fn end_match(&self, match_id: i64, reason: EndReason) -> BoxFuture<'_, Result<(), StoreError>> {
        async move {
            let body = MatchEnd {
                reason,
                ended_at: chrono::Utc::now(),
            };
            let request = self.client.post(self.match_url(match_id, "end")).json(&body);
            self.execute(request).await
        }
        .boxed()
    }
}
