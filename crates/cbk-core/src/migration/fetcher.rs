use std::collections::HashSet;

use crate::{
    config::MAX_PAGE_SIZE,
    domain::{ChannelId, MessageId, SourceMessage},
    errors::Error,
    messaging::port::HistorySource,
    migration::progress::{ProgressSnapshot, ProgressTracker},
    Result,
};

/// Pulls a channel's complete history, newest page first.
pub struct HistoryFetcher<'a> {
    source: &'a dyn HistorySource,
    page_size: u8,
}

impl<'a> HistoryFetcher<'a> {
    pub fn new(source: &'a dyn HistorySource, page_size: u8) -> Self {
        Self {
            source,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Every message in `channel`, in fetch order (not chronological).
    ///
    /// Any page failure aborts with `Error::Fetch`; a partial history is never returned.
    pub async fn fetch_all(
        &self,
        channel: ChannelId,
        tracker: &ProgressTracker,
    ) -> Result<Vec<SourceMessage>> {
        let page_size = self.page_size as usize;
        let mut all: Vec<SourceMessage> = Vec::new();
        let mut seen: HashSet<MessageId> = HashSet::new();
        let mut cursor: Option<MessageId> = None;

        loop {
            let page = self
                .source
                .fetch_page(channel, cursor, self.page_size)
                .await
                .map_err(into_fetch_error)?;
            if page.is_empty() {
                break;
            }

            let page_len = page.len();
            let oldest = page.iter().map(|m| m.id).min();
            let before = all.len();
            all.extend(page.into_iter().filter(|m| seen.insert(m.id)));

            if all.len() == before {
                return Err(Error::Fetch(format!(
                    "history cursor did not advance past {}",
                    cursor.map(|c| c.to_string()).unwrap_or_else(|| "newest".into())
                )));
            }
            tracing::debug!(channel = %channel, fetched = all.len(), "fetched history page");

            if before / page_size != all.len() / page_size {
                tracker.push(ProgressSnapshot::fetching(all.len())).await;
            }

            if page_len < page_size {
                break;
            }
            cursor = oldest;
        }

        Ok(all)
    }
}

fn into_fetch_error(e: Error) -> Error {
    match e {
        Error::Fetch(msg) => Error::Fetch(msg),
        other => Error::Fetch(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::test_support::{channel_of, FakeHistory};

    #[tokio::test]
    async fn fetches_every_message_exactly_once() {
        let history = FakeHistory::new(channel_of(345));
        let tracker = ProgressTracker::new();

        let all = HistoryFetcher::new(&history, 100)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap();

        assert_eq!(all.len(), 345);
        let unique: HashSet<MessageId> = all.iter().map(|m| m.id).collect();
        assert_eq!(unique.len(), 345);
        assert_eq!(*history.page_sizes.lock().unwrap(), vec![100, 100, 100, 45]);
    }

    #[tokio::test]
    async fn two_hundred_fifty_messages_take_three_calls() {
        let history = FakeHistory::new(channel_of(250));
        let tracker = ProgressTracker::new();

        let all = HistoryFetcher::new(&history, 100)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap();

        assert_eq!(all.len(), 250);
        assert_eq!(history.call_count(), 3);
        assert_eq!(*history.page_sizes.lock().unwrap(), vec![100, 100, 50]);

        let cursors: Vec<Option<MessageId>> =
            history.calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert_eq!(
            cursors,
            vec![None, Some(MessageId(151)), Some(MessageId(51))]
        );
    }

    #[tokio::test]
    async fn exact_multiple_needs_a_trailing_empty_page() {
        let history = FakeHistory::new(channel_of(200));
        let tracker = ProgressTracker::new();

        let all = HistoryFetcher::new(&history, 100)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap();

        assert_eq!(all.len(), 200);
        assert_eq!(*history.page_sizes.lock().unwrap(), vec![100, 100, 0]);
    }

    #[tokio::test]
    async fn empty_channel_is_one_call() {
        let history = FakeHistory::new(vec![]);
        let tracker = ProgressTracker::new();

        let all = HistoryFetcher::new(&history, 100)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap();

        assert!(all.is_empty());
        assert_eq!(history.call_count(), 1);
    }

    #[tokio::test]
    async fn page_failure_aborts_with_fetch_error() {
        let history = FakeHistory::new(channel_of(250)).failing_on(1);
        let tracker = ProgressTracker::new();

        let err = HistoryFetcher::new(&history, 100)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn reports_fetched_count_on_page_boundaries() {
        let history = FakeHistory::new(channel_of(250));
        let tracker = ProgressTracker::new();
        let mut rx = tracker.subscribe();

        HistoryFetcher::new(&history, 100)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap();

        assert!(rx.has_changed().unwrap());
        let last = rx.borrow_and_update().clone();
        assert_eq!(last.current, 200);
        assert_eq!(last.total, None);
        assert_eq!(last.status, "Fetched 200 messages...");
    }

    #[tokio::test]
    async fn page_size_is_clamped() {
        let history = FakeHistory::new(channel_of(5));
        let tracker = ProgressTracker::new();

        HistoryFetcher::new(&history, 250)
            .fetch_all(ChannelId(1), &tracker)
            .await
            .unwrap();

        assert_eq!(history.calls.lock().unwrap()[0].1, 100);
    }
}
