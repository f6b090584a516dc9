//! Fakes behind the messaging ports, shared by the pipeline tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    domain::{
        ChannelCapabilities, ChannelId, ChannelInfo, Embed, MessageId, OutgoingPayload, ServerId,
        ServerInfo, SourceMessage,
    },
    errors::{Error, SendError},
    messaging::port::{HistorySource, MessageSink, TargetResolver},
    Result,
};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub fn text_message(id: u64, secs: i64, text: &str) -> SourceMessage {
    SourceMessage {
        id: MessageId(id),
        created_at: ts(secs),
        text: Some(text.to_string()),
        embeds: vec![],
        attachments: vec![],
    }
}

pub fn empty_message(id: u64, secs: i64) -> SourceMessage {
    SourceMessage {
        id: MessageId(id),
        created_at: ts(secs),
        text: None,
        embeds: vec![],
        attachments: vec![],
    }
}

pub fn embed_message(id: u64, secs: i64) -> SourceMessage {
    SourceMessage {
        id: MessageId(id),
        created_at: ts(secs),
        text: None,
        embeds: vec![Embed {
            raw: serde_json::json!({ "title": format!("card {id}") }),
        }],
        attachments: vec![],
    }
}

/// `n` text messages "m0".."m{n-1}", oldest first, ids 1..=n.
pub fn channel_of(n: usize) -> Vec<SourceMessage> {
    (0..n)
        .map(|i| text_message(i as u64 + 1, i as i64, &format!("m{i}")))
        .collect()
}

/// In-memory channel served newest-first with `before` cursors.
pub struct FakeHistory {
    messages: Vec<SourceMessage>,
    fail_on_call: Option<usize>,
    pub calls: Mutex<Vec<(Option<MessageId>, u8)>>,
    pub page_sizes: Mutex<Vec<usize>>,
}

impl FakeHistory {
    pub fn new(messages: Vec<SourceMessage>) -> Self {
        Self {
            messages,
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
            page_sizes: Mutex::new(Vec::new()),
        }
    }

    /// Fail the n-th (0-based) fetch call.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn fetch_page(
        &self,
        _channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<SourceMessage>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((before, limit));
            calls.len() - 1
        };
        if self.fail_on_call == Some(call) {
            return Err(Error::External("503 Service Unavailable".to_string()));
        }

        let mut older: Vec<SourceMessage> = self
            .messages
            .iter()
            .filter(|m| before.map(|b| m.id < b).unwrap_or(true))
            .cloned()
            .collect();
        older.sort_by(|a, b| b.id.cmp(&a.id));
        older.truncate(limit as usize);

        self.page_sizes.lock().unwrap().push(older.len());
        Ok(older)
    }
}

/// Records every send; responses can be scripted per message text.
#[derive(Default)]
pub struct FakeSink {
    script: Mutex<HashMap<String, VecDeque<SendError>>>,
    pub attempts: Mutex<Vec<OutgoingPayload>>,
    pub delivered: Mutex<Vec<OutgoingPayload>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue errors returned (in order) for sends whose text is `text`.
    pub fn script(self, text: &str, errors: Vec<SendError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(text.to_string(), errors.into());
        self
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn delivered_texts(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.text.clone().unwrap_or_default())
            .collect()
    }
}

#[async_trait]
impl MessageSink for FakeSink {
    async fn send(
        &self,
        _channel: ChannelId,
        payload: &OutgoingPayload,
    ) -> std::result::Result<MessageId, SendError> {
        self.attempts.lock().unwrap().push(payload.clone());

        let key = payload.text.clone().unwrap_or_default();
        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        let mut delivered = self.delivered.lock().unwrap();
        delivered.push(payload.clone());
        Ok(MessageId(delivered.len() as u64))
    }
}

/// Resolver over a fixed world: one source channel, one server with one channel.
pub struct FakeResolver {
    pub source: Option<ChannelInfo>,
    pub server: Option<ServerInfo>,
    pub destination: Option<ChannelInfo>,
    pub capabilities: ChannelCapabilities,
}

impl FakeResolver {
    pub fn healthy() -> Self {
        Self {
            source: Some(ChannelInfo {
                id: ChannelId(10),
                name: "general".to_string(),
                server: Some(ServerId(1)),
            }),
            server: Some(ServerInfo {
                id: ServerId(2),
                name: "archive".to_string(),
            }),
            destination: Some(ChannelInfo {
                id: ChannelId(20),
                name: "general-backup".to_string(),
                server: Some(ServerId(2)),
            }),
            capabilities: ChannelCapabilities::all(),
        }
    }
}

#[async_trait]
impl TargetResolver for FakeResolver {
    async fn source_channel(&self, _reference: &str) -> Result<Option<ChannelInfo>> {
        Ok(self.source.clone())
    }

    async fn destination_server(&self, _reference: &str) -> Result<Option<ServerInfo>> {
        Ok(self.server.clone())
    }

    async fn destination_channel(
        &self,
        _server: &ServerInfo,
        _reference: &str,
    ) -> Result<Option<ChannelInfo>> {
        Ok(self.destination.clone())
    }

    async fn capabilities(&self, _channel: &ChannelInfo) -> Result<ChannelCapabilities> {
        Ok(self.capabilities)
    }
}
