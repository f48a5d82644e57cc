use std::future::Future;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A boxed unit of background work
pub type TaskUnit = BoxFuture<'static, anyhow::Result<()>>;

/// Fan-in step of a chord. Receives every sibling outcome, in submission order.
pub type ChordCallback =
    Box<dyn FnOnce(Vec<TaskOutcome>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// A labelled unit of work handed to a [`TaskExecutor`]
pub struct Task {
    label: String,
    unit: TaskUnit,
}

impl Task {
    pub fn new<F>(label: impl Into<String>, unit: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            label: label.into(),
            unit: unit.boxed(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Terminal result of one task, with errors flattened to text
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskOutcome {
    pub label: String,
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn success(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            error: None,
        }
    }

    pub fn failure(label: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Handle to scheduled work. Dropping it does not cancel the work.
pub struct TaskHandle {
    label: String,
    inner: JoinHandle<TaskOutcome>,
}

impl TaskHandle {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Wait for the work to terminate. A panic or cancellation is reported as
    /// a failed outcome.
    pub async fn join(self) -> TaskOutcome {
        let label = self.label;
        match self.inner.await {
            Ok(outcome) => outcome,
            Err(join_error) => TaskOutcome::failure(label, join_error.to_string()),
        }
    }
}

/// Scheduling primitives the lifecycle pipelines are built from
pub trait TaskExecutor: Send + Sync {
    /// Run one task in the background
    fn submit(&self, task: Task) -> TaskHandle;

    /// Run tasks one after another, stopping at the first failure
    fn chain(&self, label: &str, tasks: Vec<Task>) -> TaskHandle;

    /// Run tasks concurrently and call `on_complete` once all of them have
    /// terminated, whether they succeeded or not
    fn chord(&self, label: &str, tasks: Vec<Task>, on_complete: ChordCallback) -> TaskHandle;
}

/// Executes tasks on the ambient tokio runtime
#[derive(Clone, Debug, Default)]
pub struct TokioTaskExecutor;

impl TokioTaskExecutor {
    pub fn new() -> Self {
        Self
    }
}

async fn run_task(task: Task) -> TaskOutcome {
    let Task { label, unit } = task;
    match unit.await {
        Ok(()) => TaskOutcome::success(label),
        Err(err) => {
            warn!(task = %label, error = %err, "Task failed");
            TaskOutcome::failure(label, format!("{:#}", err))
        }
    }
}

impl TaskExecutor for TokioTaskExecutor {
    fn submit(&self, task: Task) -> TaskHandle {
        let label = task.label.clone();
        debug!(task = %label, "Submitting task");
        TaskHandle {
            label,
            inner: tokio::spawn(run_task(task)),
        }
    }

    fn chain(&self, label: &str, tasks: Vec<Task>) -> TaskHandle {
        let chain_label = label.to_string();
        let inner = tokio::spawn({
            let chain_label = chain_label.clone();
            async move {
                for task in tasks {
                    let outcome = run_task(task).await;
                    if let Some(error) = outcome.error {
                        return TaskOutcome::failure(
                            chain_label,
                            format!("{}: {}", outcome.label, error),
                        );
                    }
                }
                TaskOutcome::success(chain_label)
            }
        });

        TaskHandle {
            label: chain_label,
            inner,
        }
    }

    fn chord(&self, label: &str, tasks: Vec<Task>, on_complete: ChordCallback) -> TaskHandle {
        let chord_label = label.to_string();
        let handles: Vec<TaskHandle> = tasks.into_iter().map(|task| self.submit(task)).collect();
        debug!(chord = %chord_label, units = handles.len(), "Chord scheduled");

        let inner = tokio::spawn({
            let chord_label = chord_label.clone();
            async move {
                let outcomes = join_all(handles.into_iter().map(TaskHandle::join)).await;
                match on_complete(outcomes).await {
                    Ok(()) => TaskOutcome::success(chord_label),
                    Err(err) => TaskOutcome::failure(chord_label, format!("{:#}", err)),
                }
            }
        });

        TaskHandle {
            label: chord_label,
            inner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_submit_reports_failure() {
        let executor = TokioTaskExecutor::new();
        let ok = executor.submit(Task::new("ok", async { Ok(()) })).join().await;
        assert!(ok.is_success());

        let failed = executor
            .submit(Task::new("bad", async { Err(anyhow::anyhow!("boom")) }))
            .join()
            .await;
        assert_eq!(failed, TaskOutcome::failure("bad", "boom"));
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_failure() {
        let executor = TokioTaskExecutor::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let tasks = (0..3)
            .map(|i| {
                let ran = ran.clone();
                Task::new(format!("step-{}", i), async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    if i == 1 {
                        anyhow::bail!("step {} failed", i);
                    }
                    Ok(())
                })
            })
            .collect();

        let outcome = executor.chain("steps", tasks).join().await;
        assert!(!outcome.is_success());
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chord_waits_for_every_sibling() {
        let executor = TokioTaskExecutor::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let tasks = (0..4)
            .map(|i| {
                let finished = finished.clone();
                Task::new(format!("unit-{}", i), async move {
                    tokio::time::sleep(std::time::Duration::from_millis(5 * (4 - i))).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    if i == 2 {
                        anyhow::bail!("unit {} failed", i);
                    }
                    Ok(())
                })
            })
            .collect();

        let callback_finished = finished.clone();
        let callback_seen = seen.clone();
        let outcome = executor
            .chord(
                "units",
                tasks,
                Box::new(move |outcomes: Vec<TaskOutcome>| {
                    async move {
                        assert_eq!(callback_finished.load(Ordering::SeqCst), 4);
                        callback_seen.lock().unwrap().extend(outcomes);
                        Ok(())
                    }
                    .boxed()
                }),
            )
            .join()
            .await;

        assert!(outcome.is_success());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen.iter().filter(|o| !o.is_success()).count(), 1);
        assert_eq!(seen[2].label, "unit-2");
    }

    #[tokio::test]
    async fn test_chord_survives_panicking_unit() {
        let executor = TokioTaskExecutor::new();
        let tasks = vec![
            Task::new("fine", async { Ok(()) }),
            Task::new("panics", async {
                if true {
                    panic!("unit exploded");
                }
                Ok(())
            }),
        ];

        let outcome = executor
            .chord(
                "panic",
                tasks,
                Box::new(|outcomes: Vec<TaskOutcome>| {
                    async move {
                        anyhow::ensure!(
                            outcomes.iter().any(|o| !o.is_success()),
                            "expected failure"
                        );
                        Ok(())
                    }
                    .boxed()
                }),
            )
            .join()
            .await;
        assert!(outcome.is_success());
    }
}
