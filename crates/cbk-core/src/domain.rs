use std::fmt;

use chrono::{DateTime, Utc};

/// Discord channel id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u64);

/// Discord guild ("server") id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(pub u64);

/// Discord message id. Snowflakes sort in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u64);

/// Discord user id (snowflake).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

macro_rules! display_inner {
    ($($t:ty),*) => {
        $(impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })*
    };
}

display_inner!(ChannelId, ServerId, MessageId, UserId);

/// A resolved, live channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub server: Option<ServerId>,
}

/// A resolved, live server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    pub id: ServerId,
    pub name: String,
}

/// Who asked for the backup (logged and shown in the progress footer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requester {
    pub id: Option<UserId>,
    pub name: String,
}

/// Permissions the bot needs on the destination channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    SendMessages,
    EmbedLinks,
    AttachFiles,
}

impl Capability {
    pub const REQUIRED: [Capability; 3] = [
        Capability::SendMessages,
        Capability::EmbedLinks,
        Capability::AttachFiles,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Capability::SendMessages => "Send Messages",
            Capability::EmbedLinks => "Embed Links",
            Capability::AttachFiles => "Attach Files",
        }
    }
}

/// Capability flags held by the acting bot on a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelCapabilities {
    pub send_messages: bool,
    pub embed_links: bool,
    pub attach_files: bool,
}

impl ChannelCapabilities {
    pub fn all() -> Self {
        Self {
            send_messages: true,
            embed_links: true,
            attach_files: true,
        }
    }

    pub fn has(&self, cap: Capability) -> bool {
        match cap {
            Capability::SendMessages => self.send_messages,
            Capability::EmbedLinks => self.embed_links,
            Capability::AttachFiles => self.attach_files,
        }
    }

    /// Required capabilities that are not held, in a stable order.
    pub fn missing(&self) -> Vec<Capability> {
        Capability::REQUIRED
            .into_iter()
            .filter(|c| !self.has(*c))
            .collect()
    }
}

/// Structured embed as delivered by the platform.
///
/// Kept as raw JSON: the pipeline only copies embeds, it never inspects them.
#[derive(Clone, Debug, PartialEq)]
pub struct Embed {
    pub raw: serde_json::Value,
}

/// File attachment, represented only by its retrievable URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub filename: Option<String>,
}

/// A message from the source channel. Immutable once fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMessage {
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    pub text: Option<String>,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<Attachment>,
}

/// What gets sent to the destination for one source message.
///
/// All three fields are independently optional; empty values normalize to `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutgoingPayload {
    pub text: Option<String>,
    pub embeds: Option<Vec<Embed>>,
    pub attachment_urls: Option<Vec<String>>,
}

impl OutgoingPayload {
    pub fn from_message(msg: &SourceMessage) -> Self {
        let text = msg.text.clone().filter(|t| !t.is_empty());
        let embeds = Some(msg.embeds.clone()).filter(|e| !e.is_empty());
        let attachment_urls = Some(
            msg.attachments
                .iter()
                .map(|a| a.url.clone())
                .collect::<Vec<_>>(),
        )
        .filter(|a| !a.is_empty());

        Self {
            text,
            embeds,
            attachment_urls,
        }
    }

    /// True when there is nothing to replay (system/structural messages).
    pub fn is_vacuous(&self) -> bool {
        self.text.is_none() && self.embeds.is_none() && self.attachment_urls.is_none()
    }
}
