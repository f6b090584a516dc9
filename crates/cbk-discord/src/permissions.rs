//! Channel permission computation for the bot member.
//!
//! Base permissions come from `@everyone` plus the member's roles; owners and
//! administrators hold everything. Channel overwrites then apply in order:
//! `@everyone`, the union of role overwrites, the member overwrite.
//!
//! Threads have no overwrites of their own and are evaluated against their
//! parent channel; posting in them needs `SEND_MESSAGES_IN_THREADS`.

use cbk_core::domain::ChannelCapabilities;

use crate::api::{ApiChannel, ApiGuild, ApiOverwrite};

pub const ADMINISTRATOR: u64 = 1 << 3;
pub const VIEW_CHANNEL: u64 = 1 << 10;
pub const SEND_MESSAGES: u64 = 1 << 11;
pub const EMBED_LINKS: u64 = 1 << 14;
pub const ATTACH_FILES: u64 = 1 << 15;
pub const SEND_MESSAGES_IN_THREADS: u64 = 1 << 38;

const ALL: u64 = u64::MAX;

const OVERWRITE_ROLE: u8 = 0;
const OVERWRITE_MEMBER: u8 = 1;

fn bits(raw: &str) -> u64 {
    raw.parse::<u64>().unwrap_or(0)
}

fn apply(perms: u64, allow: u64, deny: u64) -> u64 {
    (perms & !deny) | allow
}

/// Effective permission bits of `user_id` (holding `member_roles`) in `channel`.
pub fn channel_permissions(
    guild: &ApiGuild,
    channel: &ApiChannel,
    user_id: &str,
    member_roles: &[String],
) -> u64 {
    if guild.owner_id == user_id {
        return ALL;
    }

    let mut base = guild
        .roles
        .iter()
        .find(|r| r.id == guild.id)
        .map(|r| bits(&r.permissions))
        .unwrap_or(0);
    for role in guild.roles.iter().filter(|r| member_roles.contains(&r.id)) {
        base |= bits(&role.permissions);
    }
    if base & ADMINISTRATOR != 0 {
        return ALL;
    }

    let overwrites = &channel.permission_overwrites;
    let mut perms = base;

    if let Some(everyone) = overwrites
        .iter()
        .find(|o| o.kind == OVERWRITE_ROLE && o.id == guild.id)
    {
        perms = apply(perms, bits(&everyone.allow), bits(&everyone.deny));
    }

    let (allow, deny) = overwrites
        .iter()
        .filter(|o| o.kind == OVERWRITE_ROLE && member_roles.contains(&o.id))
        .fold((0u64, 0u64), |(a, d), o: &ApiOverwrite| {
            (a | bits(&o.allow), d | bits(&o.deny))
        });
    perms = apply(perms, allow, deny);

    if let Some(member) = overwrites
        .iter()
        .find(|o| o.kind == OVERWRITE_MEMBER && o.id == user_id)
    {
        perms = apply(perms, bits(&member.allow), bits(&member.deny));
    }

    perms
}

/// Backup-relevant capabilities. Nothing is usable without `VIEW_CHANNEL`.
pub fn capabilities_from_bits(perms: u64, in_thread: bool) -> ChannelCapabilities {
    if perms & VIEW_CHANNEL == 0 {
        return ChannelCapabilities::default();
    }
    let send = if in_thread {
        SEND_MESSAGES_IN_THREADS
    } else {
        SEND_MESSAGES
    };
    ChannelCapabilities {
        send_messages: perms & send != 0,
        embed_links: perms & EMBED_LINKS != 0,
        attach_files: perms & ATTACH_FILES != 0,
    }
}

/// Capabilities in `channel`. A thread is evaluated against `parent`; a thread
/// whose parent could not be loaded gets nothing.
pub fn destination_capabilities(
    guild: &ApiGuild,
    channel: &ApiChannel,
    parent: Option<&ApiChannel>,
    user_id: &str,
    member_roles: &[String],
) -> ChannelCapabilities {
    if !channel.is_thread() {
        let perms = channel_permissions(guild, channel, user_id, member_roles);
        return capabilities_from_bits(perms, false);
    }
    match parent {
        Some(parent) => {
            let perms = channel_permissions(guild, parent, user_id, member_roles);
            capabilities_from_bits(perms, true)
        }
        None => ChannelCapabilities::default(),
    }
}
