//! Discord REST wire types (the subset the backup needs).

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use cbk_core::{
    domain::{Attachment, ChannelId, ChannelInfo, Embed, MessageId, ServerId, SourceMessage},
    errors::Error,
    Result,
};

/// Channel types that carry a message history we can read or write.
const TEXT_CHANNEL_TYPES: [u8; 5] = [
    0,  // GUILD_TEXT
    5,  // GUILD_ANNOUNCEMENT
    10, // ANNOUNCEMENT_THREAD
    11, // PUBLIC_THREAD
    12, // PRIVATE_THREAD
];

const THREAD_CHANNEL_TYPES: [u8; 3] = [10, 11, 12];

#[derive(Clone, Debug, Deserialize)]
pub struct ApiMessage {
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default)]
    pub attachments: Vec<ApiAttachment>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiAttachment {
    pub url: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Parent text channel of a thread.
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub permission_overwrites: Vec<ApiOverwrite>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiOverwrite {
    pub id: String,
    /// 0 = role, 1 = member.
    #[serde(rename = "type")]
    pub kind: u8,
    pub allow: String,
    pub deny: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiGuild {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    #[serde(default)]
    pub roles: Vec<ApiRole>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiRole {
    pub id: String,
    pub permissions: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiMember {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub username: String,
}

/// Body of a 429 response.
#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitBody {
    /// Seconds, possibly fractional.
    pub retry_after: f64,
}

/// Wait requested by a 429, from the JSON body or the `Retry-After` header.
pub fn retry_after(body: &str, header: Option<&str>) -> Option<Duration> {
    if let Ok(parsed) = serde_json::from_str::<RateLimitBody>(body) {
        if parsed.retry_after.is_finite() && parsed.retry_after >= 0.0 {
            return Some(Duration::from_secs_f64(parsed.retry_after));
        }
    }
    header
        .and_then(|h| h.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

pub fn parse_snowflake(raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|_| Error::External(format!("discord returned an invalid id: {raw}")))
}

impl ApiMessage {
    pub fn into_source(self) -> Result<SourceMessage> {
        let created_at = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                Error::External(format!(
                    "discord message {} has an invalid timestamp {}: {e}",
                    self.id, self.timestamp
                ))
            })?;

        Ok(SourceMessage {
            id: MessageId(parse_snowflake(&self.id)?),
            created_at,
            text: Some(self.content).filter(|c| !c.is_empty()),
            embeds: self.embeds.into_iter().map(|raw| Embed { raw }).collect(),
            attachments: self
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    url: a.url,
                    filename: a.filename,
                })
                .collect(),
        })
    }
}

impl ApiChannel {
    pub fn is_text(&self) -> bool {
        TEXT_CHANNEL_TYPES.contains(&self.kind)
    }

    /// Threads carry no overwrites of their own; they inherit the parent's.
    pub fn is_thread(&self) -> bool {
        THREAD_CHANNEL_TYPES.contains(&self.kind)
    }

    pub fn server(&self) -> Option<ServerId> {
        self.guild_id
            .as_deref()
            .and_then(|g| g.parse::<u64>().ok())
            .map(ServerId)
    }

    pub fn to_info(&self) -> Result<ChannelInfo> {
        Ok(ChannelInfo {
            id: ChannelId(parse_snowflake(&self.id)?),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            server: self.server(),
        })
    }
}
