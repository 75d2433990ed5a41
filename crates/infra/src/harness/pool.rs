//! Fixed-size worker pool with a join barrier.

use std::sync::{Mutex, mpsc};
use std::thread;

use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("worker thread '{0}' panicked")]
    WorkerPanicked(String),
}

/// A bounded pool of named OS threads draining a shared task queue.
///
/// [`WorkerPool::run`] blocks until every task has finished, so anything read
/// after it returns observes all of the tasks' effects.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: String,
    size: usize,
}

impl WorkerPool {
    /// `size` is clamped to at least one worker.
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size: size.max(1),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Execute `work` once per task on at most `size` threads.
    ///
    /// Results come back in task order.
    pub fn run<T, R, F>(&self, tasks: Vec<T>, work: F) -> Result<Vec<R>, PoolError>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let total = tasks.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        // Fill the queue up front; workers exit once it is drained.
        let (task_tx, task_rx) = mpsc::channel::<(usize, T)>();
        for task in tasks.into_iter().enumerate() {
            let _ = task_tx.send(task);
        }
        drop(task_tx);
        let task_rx = Mutex::new(task_rx);

        let (result_tx, result_rx) = mpsc::channel::<(usize, R)>();
        let workers = self.size.min(total);
        let work = &work;
        let task_rx = &task_rx;

        let mut failure: Option<PoolError> = None;

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);

            for n in 0..workers {
                let name = format!("{}-{}", self.name, n);
                let result_tx = result_tx.clone();
                let spawned = thread::Builder::new().name(name.clone()).spawn_scoped(scope, move || {
                    loop {
                        let next = match task_rx.lock() {
                            Ok(rx) => rx.recv(),
                            Err(_) => break,
                        };
                        let Ok((idx, task)) = next else { break };
                        trace!(worker = %name, task = idx, "running task");
                        if result_tx.send((idx, work(task))).is_err() {
                            break;
                        }
                    }
                });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        failure.get_or_insert(PoolError::Spawn(e));
                        break;
                    }
                }
            }

            // Barrier: wait for every worker before anyone reads the results.
            for handle in handles {
                let name = handle.thread().name().unwrap_or("worker").to_string();
                if handle.join().is_err() {
                    failure.get_or_insert(PoolError::WorkerPanicked(name));
                }
            }
        });
        drop(result_tx);

        if let Some(e) = failure {
            return Err(e);
        }

        let mut results: Vec<(usize, R)> = result_rx.into_iter().collect();
        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_task_and_keeps_order() {
        let pool = WorkerPool::new("test", 4);
        let out = pool.run((0..100).collect(), |n: u32| n * 2).unwrap();
        assert_eq!(out, (0..100).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn never_exceeds_pool_size() {
        let pool = WorkerPool::new("bounded", 3);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        pool.run((0..50).collect(), |_: usize| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(1));
            active.fetch_sub(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn workers_are_named_after_the_pool() {
        let pool = WorkerPool::new("named", 2);
        let names: HashSet<String> = pool
            .run((0..10).collect(), |_: usize| {
                std::thread::current().name().unwrap_or_default().to_string()
            })
            .unwrap()
            .into_iter()
            .collect();
        assert!(names.iter().all(|n| n.starts_with("named-")));
    }

    #[test]
    fn empty_task_list_spawns_nothing() {
        let pool = WorkerPool::new("empty", 0);
        assert_eq!(pool.size(), 1);
        let out: Vec<()> = pool.run(Vec::<()>::new(), |_| ()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn panicking_task_is_reported() {
        let pool = WorkerPool::new("panicky", 2);
        let err = pool
            .run(vec![1, 2, 3], |n: i32| {
                if n == 2 {
                    panic!("boom");
                }
                n
            })
            .unwrap_err();
        assert!(matches!(err, PoolError::WorkerPanicked(_)));
    }
}
