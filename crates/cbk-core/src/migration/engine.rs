use std::time::Duration;

use tokio::time::sleep;

use crate::{
    config::MigrationConfig,
    domain::{ChannelId, OutgoingPayload, SourceMessage},
    errors::SendError,
    messaging::port::MessageSink,
    migration::{
        progress::{ProgressSnapshot, ProgressTracker},
        result::{MigrationResult, ResultAccumulator},
    },
};

/// Per-message state. `RateLimited` loops back to `Pending` for the same message.
#[derive(Clone, Debug, PartialEq, Eq)]
enum MessageState {
    Pending,
    RateLimited { wait: Duration },
    Done(Outcome),
}

/// Terminal outcome of one message.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Outcome {
    Sent,
    /// Nothing to replay; counts as sent without a network call.
    Vacuous,
    Failed(String),
}

/// The message currently being replayed, plus its retry bookkeeping.
struct PendingItem<'m> {
    position: usize,
    message: &'m SourceMessage,
    payload: OutgoingPayload,
    rate_limited: u32,
}

impl<'m> PendingItem<'m> {
    fn new(position: usize, message: &'m SourceMessage) -> Self {
        Self {
            position,
            message,
            payload: OutgoingPayload::from_message(message),
            rate_limited: 0,
        }
    }
}

/// Replays an ordered message sequence into one destination channel.
///
/// Sends are strictly sequential. Rate-limited sends are retried in place and
/// never touch the tallies; other send failures are counted and skipped.
pub struct MigrationEngine<'a> {
    sink: &'a dyn MessageSink,
    destination: ChannelId,
    cfg: &'a MigrationConfig,
    tracker: &'a ProgressTracker,
}

impl<'a> MigrationEngine<'a> {
    pub fn new(
        sink: &'a dyn MessageSink,
        destination: ChannelId,
        cfg: &'a MigrationConfig,
        tracker: &'a ProgressTracker,
    ) -> Self {
        Self {
            sink,
            destination,
            cfg,
            tracker,
        }
    }

    pub async fn replay(&self, messages: &[SourceMessage]) -> MigrationResult {
        let total = messages.len();
        let every = self.cfg.progress_every.max(1);
        let mut tally = ResultAccumulator::new();

        for (position, message) in messages.iter().enumerate() {
            let outcome = self.process(PendingItem::new(position, message), total).await;

            match &outcome {
                Outcome::Sent | Outcome::Vacuous => tally.record_success(),
                Outcome::Failed(detail) => {
                    tally.record_failure();
                    tracing::error!(
                        message_id = %message.id,
                        "Failed to send message {}/{total}: {detail}",
                        position + 1
                    );
                }
            }

            let is_last = position + 1 == total;
            if tally.processed() % every == 0 || is_last {
                self.tracker
                    .push(ProgressSnapshot::replaying(
                        tally.processed(),
                        total,
                        tally.fail_count(),
                    ))
                    .await;
            }

            if outcome == Outcome::Sent && !is_last && !self.cfg.send_interval.is_zero() {
                sleep(self.cfg.send_interval).await;
            }
        }

        tally.finish(total)
    }

    async fn process(&self, mut item: PendingItem<'_>, total: usize) -> Outcome {
        let mut state = MessageState::Pending;
        loop {
            state = match state {
                MessageState::Pending => self.attempt(&mut item).await,
                MessageState::RateLimited { wait } => {
                    tracing::warn!(
                        "Rate limited on message {}/{total}, waiting {}ms (attempt {})",
                        item.position + 1,
                        wait.as_millis(),
                        item.rate_limited
                    );
                    sleep(wait).await;
                    MessageState::Pending
                }
                MessageState::Done(outcome) => return outcome,
            };
        }
    }

    async fn attempt(&self, item: &mut PendingItem<'_>) -> MessageState {
        if item.payload.is_vacuous() {
            tracing::debug!(message_id = %item.message.id, "skipping message with no content");
            return MessageState::Done(Outcome::Vacuous);
        }

        match self.sink.send(self.destination, &item.payload).await {
            Ok(_) => MessageState::Done(Outcome::Sent),
            Err(SendError::Rejected(detail)) => MessageState::Done(Outcome::Failed(detail)),
            Err(SendError::RateLimited { retry_after }) => {
                item.rate_limited += 1;
                if !self.cfg.rate_limit_policy.allows_retry(item.rate_limited) {
                    return MessageState::Done(Outcome::Failed(format!(
                        "still rate limited after {} attempts",
                        item.rate_limited
                    )));
                }
                MessageState::RateLimited {
                    wait: retry_after.unwrap_or(self.cfg.rate_limit_fallback),
                }
            }
        }
    }
}
