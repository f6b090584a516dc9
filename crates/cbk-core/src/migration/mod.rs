//! The channel backup pipeline.
//!
//! `run_migration` drives one job end to end on the calling task:
//! pre-flight validation, full history fetch, chronological assembly, then a
//! strictly sequential replay into the destination. Validation and fetch
//! failures abort the job; individual send failures do not.

pub mod assembler;
pub mod engine;
pub mod fetcher;
pub mod progress;
pub mod result;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use crate::{
    config::MigrationConfig,
    domain::{Requester, SourceMessage},
    errors::AbortReason,
    messaging::port::{HistorySource, MessageSink, TargetResolver},
    Result,
};

use self::{
    assembler::assemble_chronological,
    engine::MigrationEngine,
    fetcher::HistoryFetcher,
    progress::{ProgressSnapshot, ProgressTracker},
    result::MigrationResult,
    validation::{preflight, ResolvedTargets},
};

/// Human-supplied references, as typed by the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationRequest {
    pub source_channel: String,
    pub destination_server: String,
    pub destination_channel: String,
    pub requester: Requester,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Validating,
    Fetching,
    Replaying,
    Completed,
    Aborted,
}

/// Platform adapters a job runs against.
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    pub resolver: &'a dyn TargetResolver,
    pub history: &'a dyn HistorySource,
    pub sink: &'a dyn MessageSink,
}

/// One backup run. Owns the fetched history for its lifetime.
pub struct MigrationJob {
    request: MigrationRequest,
    status: JobStatus,
    targets: Option<ResolvedTargets>,
    messages: Vec<SourceMessage>,
}

impl MigrationJob {
    pub fn new(request: MigrationRequest) -> Self {
        Self {
            request,
            status: JobStatus::Validating,
            targets: None,
            messages: Vec::new(),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn targets(&self) -> Option<&ResolvedTargets> {
        self.targets.as_ref()
    }

    fn transition(&mut self, next: JobStatus) {
        tracing::debug!(from = ?self.status, to = ?next, "job status");
        self.status = next;
    }

    /// Run to completion. Exactly one final snapshot is pushed either way.
    pub async fn run(
        &mut self,
        ports: Ports<'_>,
        cfg: &MigrationConfig,
        tracker: &ProgressTracker,
    ) -> std::result::Result<MigrationResult, AbortReason> {
        match self.drive(ports, cfg, tracker).await {
            Ok(result) => {
                self.transition(JobStatus::Completed);
                let snapshot = match result.total_messages {
                    0 => ProgressSnapshot::nothing_to_migrate(),
                    total => ProgressSnapshot::completed(
                        total,
                        result.fail_count,
                        format!("Backup {}", result.status_label()),
                    ),
                };
                tracker.push(snapshot).await;
                tracing::info!(
                    requester = %self.request.requester.name,
                    "Backup completed: {} successful, {} failed",
                    result.success_count,
                    result.fail_count
                );
                Ok(result)
            }
            Err(e) => {
                self.transition(JobStatus::Aborted);
                let reason = AbortReason::from(e);
                tracing::error!(
                    requester = %self.request.requester.name,
                    "Backup aborted: {reason}"
                );
                tracker.push(ProgressSnapshot::aborted(reason.to_string())).await;
                Err(reason)
            }
        }
    }

    async fn drive(
        &mut self,
        ports: Ports<'_>,
        cfg: &MigrationConfig,
        tracker: &ProgressTracker,
    ) -> Result<MigrationResult> {
        self.transition(JobStatus::Validating);
        let targets = preflight(ports.resolver, &self.request).await?;
        tracker.announce(&targets).await;
        tracing::info!(
            requester = %self.request.requester.name,
            "Starting backup from #{} to #{} ({})",
            targets.source.name,
            targets.destination.name,
            targets.server.name
        );
        let source = targets.source.id;
        let destination = targets.destination.id;
        self.targets = Some(targets);

        self.transition(JobStatus::Fetching);
        tracker.push(ProgressSnapshot::fetching(0)).await;
        let fetched = HistoryFetcher::new(ports.history, cfg.page_size)
            .fetch_all(source, tracker)
            .await?;
        self.messages = assemble_chronological(fetched);

        let total = self.messages.len();
        tracing::info!("Fetched {total} messages to backup");
        if total == 0 {
            return Ok(MigrationResult::nothing_to_migrate());
        }

        self.transition(JobStatus::Replaying);
        tracker.push(ProgressSnapshot::replaying(0, total, 0)).await;
        let result = MigrationEngine::new(ports.sink, destination, cfg, tracker)
            .replay(&self.messages)
            .await;
        Ok(result)
    }
}

/// Run one backup job from human-supplied references.
pub async fn run_migration(
    request: MigrationRequest,
    ports: Ports<'_>,
    cfg: &MigrationConfig,
    tracker: &ProgressTracker,
) -> std::result::Result<MigrationResult, AbortReason> {
    MigrationJob::new(request).run(ports, cfg, tracker).await
}
