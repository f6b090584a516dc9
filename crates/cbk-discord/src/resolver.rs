use async_trait::async_trait;

use cbk_core::{
    domain::{ChannelCapabilities, ChannelInfo, ServerId, ServerInfo},
    messaging::port::TargetResolver,
    Result,
};

use crate::{
    api::{parse_snowflake, ApiChannel, ApiGuild, ApiMember},
    permissions::destination_capabilities,
    references::{parse_channel_ref, parse_server_ref},
    DiscordClient,
};

impl DiscordClient {
    async fn text_channel(&self, reference: &str) -> Result<Option<ApiChannel>> {
        let Some(id) = parse_channel_ref(reference) else {
            return Ok(None);
        };
        let channel: Option<ApiChannel> = self.get_optional(&format!("/channels/{id}")).await?;
        Ok(channel.filter(ApiChannel::is_text))
    }
}

#[async_trait]
impl TargetResolver for DiscordClient {
    async fn source_channel(&self, reference: &str) -> Result<Option<ChannelInfo>> {
        self.text_channel(reference)
            .await?
            .map(|c| c.to_info())
            .transpose()
    }

    async fn destination_server(&self, reference: &str) -> Result<Option<ServerInfo>> {
        let Some(id) = parse_server_ref(reference) else {
            return Ok(None);
        };
        let guild: Option<ApiGuild> = self.get_optional(&format!("/guilds/{id}")).await?;
        guild
            .map(|g| {
                Ok(ServerInfo {
                    id: ServerId(parse_snowflake(&g.id)?),
                    name: g.name,
                })
            })
            .transpose()
    }

    async fn destination_channel(
        &self,
        server: &ServerInfo,
        reference: &str,
    ) -> Result<Option<ChannelInfo>> {
        let Some(channel) = self.text_channel(reference).await? else {
            return Ok(None);
        };
        if channel.server() != Some(server.id) {
            return Ok(None);
        }
        channel.to_info().map(Some)
    }

    async fn capabilities(&self, channel: &ChannelInfo) -> Result<ChannelCapabilities> {
        let Some(server) = channel.server else {
            return Ok(ChannelCapabilities::default());
        };

        let me = self.current_user().await?;
        let guild: ApiGuild = self.get_json(&format!("/guilds/{server}"), &[]).await?;
        let api_channel: ApiChannel = self
            .get_json(&format!("/channels/{}", channel.id), &[])
            .await?;
        let member: Option<ApiMember> = self
            .get_optional(&format!("/guilds/{server}/members/{}", me.id))
            .await?;
        let Some(member) = member else {
            tracing::warn!("bot is not a member of server {server}");
            return Ok(ChannelCapabilities::default());
        };

        let parent: Option<ApiChannel> = match api_channel.parent_id.as_deref() {
            Some(parent_id) if api_channel.is_thread() => {
                self.get_optional(&format!("/channels/{parent_id}")).await?
            }
            _ => None,
        };
        if api_channel.is_thread() && parent.is_none() {
            tracing::warn!("parent of thread {} is not visible", channel.id);
        }

        let caps =
            destination_capabilities(&guild, &api_channel, parent.as_ref(), &me.id, &member.roles);
        tracing::debug!(channel = %channel.id, ?caps, "destination capabilities");
        Ok(caps)
    }
}
