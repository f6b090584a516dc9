//! Progress embed: one status message, edited in place as the job advances.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use cbk_core::{
    domain::{ChannelId, MessageId, Requester},
    errors::Error,
    messaging::port::ProgressSink,
    migration::{
        progress::{ProgressPhase, ProgressSnapshot},
        validation::ResolvedTargets,
    },
    Result,
};

use crate::{send::Created, DiscordClient};

const BAR_CELLS: usize = 20;

const COLOR_RUNNING: u32 = 0x0099ff;
const COLOR_DONE: u32 = 0x00ff00;
const COLOR_EMPTY: u32 = 0xffaa00;
const COLOR_FAILED: u32 = 0xff0000;

/// `█` for done, `░` for remaining.
pub fn progress_bar(current: usize, total: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((BAR_CELLS * current.min(total)) as f64 / total as f64).round() as usize
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

fn color(phase: ProgressPhase) -> u32 {
    match phase {
        ProgressPhase::Fetching | ProgressPhase::Replaying => COLOR_RUNNING,
        ProgressPhase::Completed => COLOR_DONE,
        ProgressPhase::NothingToMigrate => COLOR_EMPTY,
        ProgressPhase::Aborted => COLOR_FAILED,
    }
}

fn progress_field(snapshot: &ProgressSnapshot) -> String {
    match snapshot.total {
        None => format!("{} messages fetched", snapshot.current),
        Some(total) => format!(
            "{} {}%\n{}/{total} messages",
            progress_bar(snapshot.current, total),
            snapshot.percentage(),
            snapshot.current
        ),
    }
}

fn field(name: &str, value: String, inline: bool) -> Value {
    json!({ "name": name, "value": value, "inline": inline })
}

pub fn render_embed(
    snapshot: &ProgressSnapshot,
    targets: Option<&ResolvedTargets>,
    requester: &Requester,
) -> Value {
    let mut fields = Vec::new();
    if let Some(t) = targets {
        fields.push(field("Source Channel", format!("#{}", t.source.name), true));
        fields.push(field("Destination Server", t.server.name.clone(), true));
        fields.push(field("Destination Channel", format!("#{}", t.destination.name), true));
    }
    if snapshot.phase != ProgressPhase::Aborted {
        fields.push(field("Progress", progress_field(snapshot), false));
    }

    json!({
        "title": "Channel Backup",
        "color": color(snapshot.phase),
        "description": snapshot.status,
        "fields": fields,
        "timestamp": Utc::now().to_rfc3339(),
        "footer": { "text": format!("Requested by {}", requester.name) },
    })
}

impl DiscordClient {
    async fn post_embed(&self, channel: ChannelId, embed: Value) -> Result<MessageId> {
        let path = format!("/channels/{channel}/messages");
        let resp = self
            .http
            .post(self.url(&path))
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "embeds": [embed] }))
            .send()
            .await
            .map_err(Self::map_err)?;
        let created: Created = crate::decode(&path, resp).await?;
        created
            .id
            .parse::<u64>()
            .map(MessageId)
            .map_err(|_| Error::External(format!("invalid message id {}", created.id)))
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: Value,
    ) -> Result<()> {
        let path = format!("/channels/{channel}/messages/{message}");
        let resp = self
            .http
            .patch(self.url(&path))
            .header(AUTHORIZATION, self.auth())
            .json(&json!({ "embeds": [embed] }))
            .send()
            .await
            .map_err(Self::map_err)?;
        let _: Value = crate::decode(&path, resp).await?;
        Ok(())
    }
}

#[derive(Default)]
struct ReporterState {
    targets: Option<ResolvedTargets>,
    message: Option<MessageId>,
}

/// `ProgressSink` that renders snapshots as an embed in a status channel.
pub struct EmbedProgressReporter {
    client: DiscordClient,
    channel: ChannelId,
    requester: Requester,
    state: Mutex<ReporterState>,
}

impl EmbedProgressReporter {
    pub fn new(client: DiscordClient, channel: ChannelId, requester: Requester) -> Self {
        Self {
            client,
            channel,
            requester,
            state: Mutex::new(ReporterState::default()),
        }
    }
}

#[async_trait]
impl ProgressSink for EmbedProgressReporter {
    async fn targets_resolved(&self, targets: &ResolvedTargets) -> Result<()> {
        self.state.lock().await.targets = Some(targets.clone());
        Ok(())
    }

    async fn publish(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        let mut state = self.state.lock().await;
        let embed = render_embed(snapshot, state.targets.as_ref(), &self.requester);
        match state.message {
            Some(message) => self.client.edit_embed(self.channel, message, embed).await,
            None => {
                state.message = Some(self.client.post_embed(self.channel, embed).await?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbk_core::domain::{ChannelInfo, ServerId, ServerInfo};

    fn targets() -> ResolvedTargets {
        ResolvedTargets {
            source: ChannelInfo {
                id: ChannelId(1),
                name: "general".to_string(),
                server: Some(ServerId(9)),
            },
            server: ServerInfo {
                id: ServerId(8),
                name: "Archive".to_string(),
            },
            destination: ChannelInfo {
                id: ChannelId(2),
                name: "general-old".to_string(),
                server: Some(ServerId(8)),
            },
        }
    }

    fn requester() -> Requester {
        Requester {
            id: None,
            name: "ops".to_string(),
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0, 10), "░".repeat(20));
        assert_eq!(progress_bar(5, 10), format!("{}{}", "█".repeat(10), "░".repeat(10)));
        assert_eq!(progress_bar(10, 10), "█".repeat(20));
        assert_eq!(progress_bar(0, 0), "░".repeat(20));
    }

    #[test]
    fn replaying_embed_has_targets_and_progress() {
        let embed = render_embed(
            &ProgressSnapshot::replaying(30, 120, 2),
            Some(&targets()),
            &requester(),
        );
        assert_eq!(embed["color"], json!(COLOR_RUNNING));
        assert_eq!(embed["description"], json!("Backing up messages... (2 failed)"));
        assert_eq!(embed["fields"][0]["value"], json!("#general"));
        assert_eq!(embed["fields"][1]["value"], json!("Archive"));
        let progress = embed["fields"][3]["value"].as_str().unwrap();
        assert!(progress.ends_with("25%\n30/120 messages"));
        assert_eq!(embed["footer"]["text"], json!("Requested by ops"));
    }

    #[test]
    fn fetching_embed_shows_count_without_bar() {
        let embed = render_embed(&ProgressSnapshot::fetching(300), None, &requester());
        assert_eq!(embed["fields"][0]["value"], json!("300 messages fetched"));
    }

    #[test]
    fn terminal_colors() {
        let done = render_embed(&ProgressSnapshot::completed(5, 0, "ok"), None, &requester());
        assert_eq!(done["color"], json!(COLOR_DONE));
        let empty = render_embed(&ProgressSnapshot::nothing_to_migrate(), None, &requester());
        assert_eq!(empty["color"], json!(COLOR_EMPTY));
        let failed = render_embed(&ProgressSnapshot::aborted("boom"), None, &requester());
        assert_eq!(failed["color"], json!(COLOR_FAILED));
        assert_eq!(failed["fields"], json!([]));
    }
}
