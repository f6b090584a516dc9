use std::{env, fs, path::Path, time::Duration};

use crate::{domain::ChannelId, errors::Error, Result};

pub const MAX_PAGE_SIZE: u8 = 100;

/// How long a single message may keep hitting rate limits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// Keep waiting and retrying the same message forever.
    #[default]
    Unbounded,
    /// After this many rate-limited attempts the message counts as failed.
    Capped(u32),
}

impl RateLimitPolicy {
    /// Whether another retry is allowed after `attempts` rate-limited tries.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        match self {
            RateLimitPolicy::Unbounded => true,
            RateLimitPolicy::Capped(max) => attempts <= *max,
        }
    }
}

/// Pipeline knobs. Constructed directly in tests; loaded from env by `Config::load`.
#[derive(Clone, Debug)]
pub struct MigrationConfig {
    pub page_size: u8,
    /// Pause after every successful send.
    pub send_interval: Duration,
    /// Emit a progress snapshot every N processed messages.
    pub progress_every: usize,
    /// Wait used when a rate-limit response carries no retry-after.
    pub rate_limit_fallback: Duration,
    pub rate_limit_policy: RateLimitPolicy,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            send_interval: Duration::from_millis(250),
            progress_every: 10,
            rate_limit_fallback: Duration::from_millis(5000),
            rate_limit_policy: RateLimitPolicy::Unbounded,
        }
    }
}

/// Typed configuration for the backup bot.
#[derive(Clone, Debug)]
pub struct Config {
    pub discord_token: String,
    pub owner_id: Option<u64>,
    pub api_base: String,
    pub http_timeout: Duration,
    pub report_channel: Option<ChannelId>,
    pub migration: MigrationConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let discord_token = env_str("DISCORD_TOKEN")
            .or_else(|| env_str("TOKEN"))
            .and_then(non_empty)
            .ok_or_else(|| Error::Config("DISCORD_TOKEN is required".to_string()))?;

        let owner_id = match env_str("OWNER_ID").and_then(non_empty) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| Error::Config(format!("OWNER_ID is not a valid id: {raw}")))?,
            ),
            None => None,
        };

        let api_base = env_str("DISCORD_API_BASE")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://discord.com/api/v10".to_string())
            .trim_end_matches('/')
            .to_string();
        let http_timeout = Duration::from_millis(env_u64("HTTP_TIMEOUT_MS").unwrap_or(30_000));
        let report_channel = env_u64("BACKUP_REPORT_CHANNEL").map(ChannelId);

        let defaults = MigrationConfig::default();
        let page_size = env_u64("BACKUP_PAGE_SIZE")
            .map(|n| n.clamp(1, MAX_PAGE_SIZE as u64) as u8)
            .unwrap_or(defaults.page_size);
        let send_interval = env_u64("BACKUP_SEND_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.send_interval);
        let progress_every = env_usize("BACKUP_PROGRESS_EVERY")
            .unwrap_or(defaults.progress_every)
            .max(1);
        let rate_limit_fallback = env_u64("BACKUP_RATE_LIMIT_FALLBACK_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.rate_limit_fallback);
        let rate_limit_policy = env_u32("BACKUP_MAX_RATE_LIMIT_RETRIES")
            .map(RateLimitPolicy::Capped)
            .unwrap_or(defaults.rate_limit_policy);

        Ok(Self {
            discord_token,
            owner_id,
            api_base,
            http_timeout,
            report_channel,
            migration: MigrationConfig {
                page_size,
                send_interval,
                progress_every,
                rate_limit_fallback,
                rate_limit_policy,
            },
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

/// `KEY=value` pairs; blank lines, `#` comments and keyless lines are skipped.
fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), unquote(v.trim())))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn unquote(val: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| val.strip_prefix(*q)?.strip_suffix(*q))
        .unwrap_or(val)
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nTOKEN=\"abc\"\n\nOWNER_ID = '42'\nbroken line\n=nokey\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TOKEN".to_string(), "abc".to_string()),
                ("OWNER_ID".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn capped_policy_stops_after_limit() {
        let p = RateLimitPolicy::Capped(2);
        assert!(p.allows_retry(1));
        assert!(p.allows_retry(2));
        assert!(!p.allows_retry(3));
        assert!(RateLimitPolicy::Unbounded.allows_retry(u32::MAX));
    }

    #[test]
    fn defaults_match_platform_limits() {
        let cfg = MigrationConfig::default();
        assert_eq!(cfg.page_size, 100);
        assert_eq!(cfg.send_interval, Duration::from_millis(250));
        assert_eq!(cfg.progress_every, 10);
        assert_eq!(cfg.rate_limit_fallback, Duration::from_millis(5000));
        assert_eq!(cfg.rate_limit_policy, RateLimitPolicy::Unbounded);
    }
}
