//! Waiting on processes the child spawned before it exited.
//!
//! The launcher starts the long-running supervisor as its own child. When
//! the launcher exits on its own, the service must not report "stopped"
//! until that supervisor has finished shutting down too.

use crate::platform;
use biosvc_core::ProcessTablePort;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

/// How often a live descendant is re-checked.
pub const DESCENDANT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Finds descendants of the child by executable name and waits for each to
/// exit, one after the other.
#[derive(Clone)]
pub struct DescendantWaiter {
    table: Arc<dyn ProcessTablePort>,
    name: String,
    poll_interval: Duration,
}

impl DescendantWaiter {
    pub fn new(table: Arc<dyn ProcessTablePort>, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
            poll_interval: DESCENDANT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Block until every matching descendant of `child_pid` has exited.
    ///
    /// The process table is read once; descendants started after the
    /// snapshot are not waited for. A failed query is logged and treated as
    /// "no descendants". Returns how many descendants were waited on.
    pub async fn wait_for_descendants(&self, child_pid: u32) -> usize {
        let descendants = self.find(child_pid).await;

        if descendants.is_empty() {
            debug!(child_pid, name = %self.name, "No descendant processes found");
            return 0;
        }

        for &pid in &descendants {
            info!(pid, "Waiting for Supervisor to exit...");
            self.wait_for_exit(pid).await;
            platform::reap_adopted(pid);
            debug!(pid, "Descendant process exited");
        }

        descendants.len()
    }

    async fn find(&self, child_pid: u32) -> Vec<u32> {
        let table = Arc::clone(&self.table);
        let name = self.name.clone();
        let parents = platform::descendant_parents(child_pid);

        let result =
            tokio::task::spawn_blocking(move || table.find_children(&name, &parents)).await;

        match result {
            Ok(Ok(pids)) => pids,
            Ok(Err(e)) => {
                error!(child_pid, error = %e, "Failed to look up descendant processes");
                Vec::new()
            }
            Err(e) => {
                error!(child_pid, error = %e, "Descendant lookup task failed");
                Vec::new()
            }
        }
    }

    async fn wait_for_exit(&self, pid: u32) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.is_alive(pid).await {
                return;
            }
        }
    }

    async fn is_alive(&self, pid: u32) -> bool {
        let table = Arc::clone(&self.table);

        match tokio::task::spawn_blocking(move || table.is_alive(pid)).await {
            Ok(Ok(alive)) => alive,
            Ok(Err(e)) => {
                debug!(pid, error = %e, "Liveness check failed, treating as exited");
                false
            }
            Err(e) => {
                debug!(pid, error = %e, "Liveness task failed, treating as exited");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosvc_core::ProcessTableError;
    use mockall::mock;
    use mockall::predicate::eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub ProcessTable {}

        impl ProcessTablePort for ProcessTable {
            fn find_children(&self, name: &str, parents: &[u32]) -> Result<Vec<u32>, ProcessTableError>;
            fn is_alive(&self, pid: u32) -> Result<bool, ProcessTableError>;
        }
    }

    fn waiter(table: MockProcessTable) -> DescendantWaiter {
        DescendantWaiter::new(Arc::new(table), "bio-sup")
            .with_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn no_descendants_completes_immediately() {
        let mut table = MockProcessTable::new();
        table
            .expect_find_children()
            .withf(|name, parents| name == "bio-sup" && parents.contains(&42))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        table.expect_is_alive().never();

        assert_eq!(waiter(table).wait_for_descendants(42).await, 0);
    }

    #[tokio::test]
    async fn waits_until_descendant_is_gone() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);

        let mut table = MockProcessTable::new();
        table
            .expect_find_children()
            .returning(|_, _| Ok(vec![100]));
        table
            .expect_is_alive()
            .with(eq(100))
            .returning(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst) < 3));

        assert_eq!(waiter(table).wait_for_descendants(42).await, 1);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn waits_for_every_match_in_turn() {
        let mut table = MockProcessTable::new();
        table
            .expect_find_children()
            .returning(|_, _| Ok(vec![100, 101]));
        table
            .expect_is_alive()
            .with(eq(100))
            .times(1)
            .returning(|_| Ok(false));
        table
            .expect_is_alive()
            .with(eq(101))
            .times(1)
            .returning(|_| Ok(false));

        assert_eq!(waiter(table).wait_for_descendants(42).await, 2);
    }

    #[tokio::test]
    async fn query_failure_is_treated_as_no_descendants() {
        let mut table = MockProcessTable::new();
        table
            .expect_find_children()
            .returning(|_, _| Err(ProcessTableError::QueryFailed("denied".to_string())));
        table.expect_is_alive().never();

        assert_eq!(waiter(table).wait_for_descendants(42).await, 0);
    }

    #[tokio::test]
    async fn liveness_failure_counts_as_exited() {
        let mut table = MockProcessTable::new();
        table
            .expect_find_children()
            .returning(|_, _| Ok(vec![100]));
        table
            .expect_is_alive()
            .times(1)
            .returning(|_| Err(ProcessTableError::Unavailable("gone".to_string())));

        assert_eq!(waiter(table).wait_for_descendants(42).await, 1);
    }
}
