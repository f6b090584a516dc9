use crate::{
    domain::{ChannelInfo, ServerInfo},
    errors::ValidationError,
    messaging::port::TargetResolver,
    migration::MigrationRequest,
    Result,
};

/// Live targets for a job, after pre-flight checks passed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub source: ChannelInfo,
    pub server: ServerInfo,
    pub destination: ChannelInfo,
}

/// Resolve all references and check destination capabilities.
///
/// Performs no history reads and no sends.
pub async fn preflight(
    resolver: &dyn TargetResolver,
    request: &MigrationRequest,
) -> Result<ResolvedTargets> {
    let source = resolver
        .source_channel(&request.source_channel)
        .await?
        .ok_or(ValidationError::InvalidSourceChannel)?;

    let server = resolver
        .destination_server(&request.destination_server)
        .await?
        .ok_or(ValidationError::InvalidDestinationServer)?;

    let destination = resolver
        .destination_channel(&server, &request.destination_channel)
        .await?
        .ok_or(ValidationError::InvalidDestinationChannel)?;

    let missing = resolver.capabilities(&destination).await?.missing();
    if !missing.is_empty() {
        return Err(ValidationError::MissingCapabilities(missing).into());
    }

    Ok(ResolvedTargets {
        source,
        server,
        destination,
    })
}
