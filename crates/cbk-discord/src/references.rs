//! Parsing of human-typed channel/server references.
//!
//! Accepted forms: a raw id (`123`), a channel mention (`<#123>`), or a
//! message/channel link (`https://discord.com/channels/<guild>/<channel>`).

use std::sync::OnceLock;

use regex::Regex;

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<#(\d{1,20})>$").expect("valid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^https?://(?:(?:ptb|canary)\.)?discord(?:app)?\.com/channels/(\d{1,20}|@me)(?:/(\d{1,20}))?(?:/\d{1,20})?/?$",
        )
        .expect("valid regex")
    })
}

fn raw_id(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u64>().ok()
}

/// Channel id from a raw id, `<#id>` mention, or channel link.
pub fn parse_channel_ref(input: &str) -> Option<u64> {
    let s = input.trim();
    if let Some(id) = raw_id(s) {
        return Some(id);
    }
    if let Some(c) = mention_re().captures(s) {
        return c.get(1).and_then(|m| m.as_str().parse().ok());
    }
    link_re()
        .captures(s)
        .and_then(|c| c.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Server id from a raw id or any link under that server.
pub fn parse_server_ref(input: &str) -> Option<u64> {
    let s = input.trim();
    if let Some(id) = raw_id(s) {
        return Some(id);
    }
    link_re()
        .captures(s)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_refs() {
        assert_eq!(parse_channel_ref("123456789012345678"), Some(123456789012345678));
        assert_eq!(parse_channel_ref(" <#42> "), Some(42));
        assert_eq!(
            parse_channel_ref("https://discord.com/channels/111/222"),
            Some(222)
        );
        assert_eq!(
            parse_channel_ref("https://canary.discordapp.com/channels/111/222/333"),
            Some(222)
        );
        assert_eq!(parse_channel_ref("https://discord.com/channels/111"), None);
        assert_eq!(parse_channel_ref("#general"), None);
        assert_eq!(parse_channel_ref(""), None);
        assert_eq!(parse_channel_ref("-5"), None);
    }

    #[test]
    fn server_refs() {
        assert_eq!(parse_server_ref("987"), Some(987));
        assert_eq!(parse_server_ref("https://discord.com/channels/111"), Some(111));
        assert_eq!(parse_server_ref("https://discord.com/channels/111/222"), Some(111));
        assert_eq!(parse_server_ref("https://discord.com/channels/@me/222"), None);
        assert_eq!(parse_server_ref("<#987>"), None);
    }
}
