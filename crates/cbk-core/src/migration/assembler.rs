use crate::domain::SourceMessage;

/// Oldest first. Equal timestamps keep the order they were fetched in.
pub fn assemble_chronological(mut messages: Vec<SourceMessage>) -> Vec<SourceMessage> {
    // `sort_by_key` is stable.
    messages.sort_by_key(|m| m.created_at);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::test_support::text_message;

    #[test]
    fn orders_newest_first_pages_oldest_first() {
        let fetched = vec![
            text_message(3, 30, "c"),
            text_message(2, 20, "b"),
            text_message(1, 10, "a"),
        ];
        let ordered = assemble_chronological(fetched);
        let texts: Vec<_> = ordered.iter().map(|m| m.text.clone().unwrap()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_fetch_order() {
        let fetched = vec![
            text_message(9, 50, "late"),
            text_message(5, 10, "first-seen"),
            text_message(4, 10, "second-seen"),
            text_message(7, 10, "third-seen"),
        ];
        let ordered = assemble_chronological(fetched);
        let texts: Vec<_> = ordered.iter().map(|m| m.text.clone().unwrap()).collect();
        assert_eq!(
            texts,
            vec!["first-seen", "second-seen", "third-seen", "late"]
        );
        assert!(ordered
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }
}
