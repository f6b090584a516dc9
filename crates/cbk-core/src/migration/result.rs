/// Terminal status of a job that reached the replay stage (or found nothing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultStatus {
    Completed,
    CompletedWithFailures(usize),
    NothingToMigrate,
}

impl ResultStatus {
    pub fn label(&self) -> String {
        match self {
            ResultStatus::Completed => "completed successfully".to_string(),
            ResultStatus::CompletedWithFailures(n) => {
                format!("completed with {n} failed message(s)")
            }
            ResultStatus::NothingToMigrate => "nothing to migrate".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationResult {
    pub success_count: usize,
    pub fail_count: usize,
    pub total_messages: usize,
    pub status: ResultStatus,
}

impl MigrationResult {
    pub fn nothing_to_migrate() -> Self {
        Self {
            success_count: 0,
            fail_count: 0,
            total_messages: 0,
            status: ResultStatus::NothingToMigrate,
        }
    }

    pub fn status_label(&self) -> String {
        self.status.label()
    }
}

/// Running tallies for the replay stage.
#[derive(Clone, Debug, Default)]
pub struct ResultAccumulator {
    success: usize,
    failed: usize,
}

impl ResultAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn fail_count(&self) -> usize {
        self.failed
    }

    /// Messages with a terminal outcome so far.
    pub fn processed(&self) -> usize {
        self.success + self.failed
    }

    pub fn finish(self, total_messages: usize) -> MigrationResult {
        let status = if self.failed == 0 {
            ResultStatus::Completed
        } else {
            ResultStatus::CompletedWithFailures(self.failed)
        };
        MigrationResult {
            success_count: self.success,
            fail_count: self.failed,
            total_messages,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        let mut acc = ResultAccumulator::new();
        acc.record_success();
        acc.record_success();
        let r = acc.finish(2);
        assert_eq!(r.status_label(), "completed successfully");

        let mut acc = ResultAccumulator::new();
        acc.record_success();
        acc.record_failure();
        acc.record_failure();
        assert_eq!(acc.processed(), 3);
        let r = acc.finish(3);
        assert_eq!(r.status, ResultStatus::CompletedWithFailures(2));
        assert_eq!(r.status_label(), "completed with 2 failed message(s)");
        assert_eq!(r.success_count + r.fail_count, r.total_messages);
    }

    #[test]
    fn nothing_to_migrate_has_zero_counts() {
        let r = MigrationResult::nothing_to_migrate();
        assert_eq!(r.total_messages, 0);
        assert_eq!(r.status_label(), "nothing to migrate");
    }
}
