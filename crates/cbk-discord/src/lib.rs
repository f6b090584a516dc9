//! Discord adapter (REST over reqwest).
//!
//! This crate implements the `cbk-core` ports over the Discord HTTP API:
//! history reads, message sends, target resolution and the progress embed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{AUTHORIZATION, RETRY_AFTER},
    Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

pub mod api;
pub mod permissions;
pub mod progress;
pub mod references;
pub mod resolver;
pub mod send;

use cbk_core::{
    config::Config,
    domain::{ChannelId, MessageId, SourceMessage},
    errors::Error,
    messaging::port::HistorySource,
    Result,
};

use crate::api::{ApiMessage, ApiUser};

/// Reads are retried this many times on 429 before giving up.
const MAX_READ_RETRIES: usize = 3;

#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl DiscordClient {
    pub fn new(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                "DiscordBot (",
                env!("CARGO_PKG_NAME"),
                ", ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()
            .map_err(Self::map_err)?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.discord_token.clone(), cfg.api_base.clone(), cfg.http_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    fn map_err(e: reqwest::Error) -> Error {
        Error::External(format!("discord request error: {e}"))
    }

    /// GET with bounded retries on 429. Returns the final response, whatever its status.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let mut attempts = 0usize;
        loop {
            let resp = self
                .http
                .get(self.url(path))
                .header(AUTHORIZATION, self.auth())
                .query(query)
                .send()
                .await
                .map_err(Self::map_err)?;

            if resp.status() != StatusCode::TOO_MANY_REQUESTS || attempts >= MAX_READ_RETRIES {
                return Ok(resp);
            }
            attempts += 1;

            let (body, header) = drain_rate_limit(resp).await;
            let wait = api::retry_after(&body, header.as_deref()).unwrap_or(Duration::from_secs(1));
            tracing::warn!("GET {path} rate limited, waiting {}ms", wait.as_millis());
            sleep(wait).await;
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let resp = self.get(path, query).await?;
        decode(path, resp).await
    }

    /// Like `get_json`, but "unknown" or "not visible" resources yield `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let resp = self.get(path, &[]).await?;
        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => Ok(None),
            _ => decode(path, resp).await.map(Some),
        }
    }

    /// The bot account behind the token.
    pub async fn current_user(&self) -> Result<ApiUser> {
        self.get_json("/users/@me", &[]).await
    }
}

async fn drain_rate_limit(resp: Response) -> (String, Option<String>) {
    let header = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = resp.text().await.unwrap_or_default();
    (body, header)
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::External(format!(
            "discord {path} failed: {status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }
    resp.json::<T>()
        .await
        .map_err(|e| Error::External(format!("discord {path} json error: {e}")))
}

#[async_trait]
impl HistorySource for DiscordClient {
    async fn fetch_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<SourceMessage>> {
        let mut query = vec![("limit", limit.min(100).to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }

        let page: Vec<ApiMessage> = self
            .get_json(&format!("/channels/{channel}/messages"), &query)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        page.into_iter().map(ApiMessage::into_source).collect()
    }
}
