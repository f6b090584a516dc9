use async_trait::async_trait;

use crate::{
    domain::{
        ChannelCapabilities, ChannelId, ChannelInfo, MessageId, OutgoingPayload, ServerInfo,
        SourceMessage,
    },
    errors::SendError,
    migration::{progress::ProgressSnapshot, validation::ResolvedTargets},
    Result,
};

/// Read side: reverse-chronological, cursor-paginated history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch up to `limit` (<= 100) messages older than `before`, newest first.
    ///
    /// `before = None` requests the newest page.
    async fn fetch_page(
        &self,
        channel: ChannelId,
        before: Option<MessageId>,
        limit: u8,
    ) -> Result<Vec<SourceMessage>>;
}

/// Write side: one outgoing message per call.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(
        &self,
        channel: ChannelId,
        payload: &OutgoingPayload,
    ) -> std::result::Result<MessageId, SendError>;
}

/// Resolves human-supplied references to live channels/servers.
///
/// `Ok(None)` means "does not exist or is not visible"; `Err` is reserved for
/// transport failures.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn source_channel(&self, reference: &str) -> Result<Option<ChannelInfo>>;

    async fn destination_server(&self, reference: &str) -> Result<Option<ServerInfo>>;

    /// Resolve a channel that must belong to `server`.
    async fn destination_channel(
        &self,
        server: &ServerInfo,
        reference: &str,
    ) -> Result<Option<ChannelInfo>>;

    /// Capabilities the acting bot holds on `channel`.
    async fn capabilities(&self, channel: &ChannelInfo) -> Result<ChannelCapabilities>;
}

/// Presentation-side consumer of progress snapshots. Best-effort.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Called once, after pre-flight checks pass and before fetching starts.
    async fn targets_resolved(&self, _targets: &ResolvedTargets) -> Result<()> {
        Ok(())
    }

    async fn publish(&self, snapshot: &ProgressSnapshot) -> Result<()>;
}
