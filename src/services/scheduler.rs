use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

struct TaskEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Dispatches named one-shot delayed callbacks.
///
/// Every task has a unique logical name; scheduling under a live name
/// aborts the previous instance before registering the new one, so a
/// reschedule can never leave two copies pending. Cancellation by name or
/// by name prefix covers session teardown. A callback that still fires
/// after its session was replaced is expected to re-check state and no-op.
#[derive(Default)]
pub struct TaskScheduler {
    tasks: Mutex<HashMap<String, TaskEntry>>,
    generations: AtomicU64,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `task` after `delay`, superseding any pending task of the same
    /// name.
    pub async fn schedule_once<F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        delay: Duration,
        task: F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let scheduler = Arc::clone(self);
        let task_name = name.clone();

        // The map lock is held across the spawn so the new task cannot
        // deregister itself before it has been registered.
        let mut tasks = self.tasks.lock().await;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
            // Deregister, unless a newer task already took the name over.
            let mut tasks = scheduler.tasks.lock().await;
            if tasks
                .get(&task_name)
                .is_some_and(|entry| entry.generation == generation)
            {
                tasks.remove(&task_name);
            }
        });
        if let Some(previous) = tasks.insert(name.clone(), TaskEntry { generation, handle }) {
            previous.handle.abort();
            tracing::debug!("Superseded scheduled task '{}'", name);
        }
    }

    /// Cancels the named task; returns whether one was pending.
    pub async fn cancel(&self, name: &str) -> bool {
        let mut tasks = self.tasks.lock().await;
        match tasks.remove(name) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every task whose name starts with `prefix`; returns how many
    /// were cancelled.
    pub async fn cancel_with_prefix(&self, prefix: &str) -> usize {
        let mut tasks = self.tasks.lock().await;
        let names: Vec<String> = tasks
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        for name in &names {
            if let Some(entry) = tasks.remove(name) {
                entry.handle.abort();
            }
        }
        names.len()
    }

    pub async fn is_scheduled(&self, name: &str) -> bool {
        self.tasks.lock().await.contains_key(name)
    }

    /// Number of currently pending tasks.
    pub async fn pending_count(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Aborts everything; used on shutdown.
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for (_, entry) in tasks.drain() {
            entry.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn completed_task_deregisters_itself() {
        let scheduler = Arc::new(TaskScheduler::new());
        scheduler
            .schedule_once("t", Duration::from_millis(10), async {})
            .await;
        assert!(scheduler.is_scheduled("t").await);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!scheduler.is_scheduled("t").await);
    }

    #[tokio::test]
    async fn reschedule_supersedes_previous_task() {
        let scheduler = Arc::new(TaskScheduler::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let first = Arc::clone(&counter);
        scheduler
            .schedule_once("t", Duration::from_millis(30), async move {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let second = Arc::clone(&counter);
        scheduler
            .schedule_once("t", Duration::from_millis(30), async move {
                second.fetch_add(10, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(scheduler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn cancel_with_prefix_only_hits_matching_names() {
        let scheduler = Arc::new(TaskScheduler::new());
        scheduler
            .schedule_once("quiz:1:timeout:a", Duration::from_secs(60), async {})
            .await;
        scheduler
            .schedule_once("quiz:1:advance:0", Duration::from_secs(60), async {})
            .await;
        scheduler
            .schedule_once("quiz:2:timeout:b", Duration::from_secs(60), async {})
            .await;

        let cancelled = scheduler.cancel_with_prefix("quiz:1:").await;
        assert_eq!(cancelled, 2);
        assert!(scheduler.is_scheduled("quiz:2:timeout:b").await);
        assert!(!scheduler.is_scheduled("quiz:1:timeout:a").await);
    }

    #[tokio::test]
    async fn cancelled_task_never_runs() {
        let scheduler = Arc::new(TaskScheduler::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = Arc::clone(&counter);
        scheduler
            .schedule_once("t", Duration::from_millis(30), async move {
                task_counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(scheduler.cancel("t").await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!scheduler.cancel("t").await);
    }
}
