mod clear_expired_invites;
mod clear_old_notifications;

pub use clear_expired_invites::ClearExpiredInvitesJob;
pub use clear_old_notifications::ClearOldNotificationsJob;

use tally_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(DaoError),
    ConcurrencyError(JoinError),
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => {
                write!(f, "JobError: {e}")
            }
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(e)
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    pub struct MockJob {
        pub is_running: bool,
        pub runs: Arc<Mutex<usize>>,
    }

    impl MockJob {
        pub fn new() -> Self {
            Self {
                is_running: false,
                runs: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn is_ready(&self) -> bool {
            !self.is_running
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            *self.runs.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_mock_job_execute() {
        let mut job = MockJob::new();
        let run_count = Arc::clone(&job.runs);

        assert!(job.is_ready());
        assert_eq!(*run_count.lock().unwrap(), 0);

        job.execute().await.unwrap();
        assert_eq!(*run_count.lock().unwrap(), 1);

        job.execute().await.unwrap();
        assert_eq!(*run_count.lock().unwrap(), 2);
        assert!(job.is_ready());
    }
}
