//! # Bounded Worker Pool
//!
//! `WorkerPool` runs fallible tasks in the background with at most `K` of
//! them in flight, and hands every outcome back at the next [`WorkerPool::wait`]
//! barrier. It is the "fire concurrently, join later" unit behind every
//! remote's fetch and push operations.
//!
//! - `push` never blocks: the task is queued on a dedicated rayon thread pool.
//! - A failing task never cancels the others; all of them run to completion.
//! - Outcomes are kept in submission order, so [`Outcomes::first_error`]
//!   reports the same error whatever order the tasks finished in.
//! - After `wait` returns the pool is empty and can be reused.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::error::{Error, Result};

struct PoolState<T> {
    slots: Vec<Option<Result<T>>>,
    pending: usize,
}

struct Shared<T> {
    state: Mutex<PoolState<T>>,
    done: Condvar,
}

/// Outcomes of the tasks joined by one [`WorkerPool::wait`], in submission
/// order.
#[derive(Debug)]
pub struct Outcomes<T> {
    results: Vec<Result<T>>,
}

impl<T> Outcomes<T> {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[Result<T>] {
        &self.results
    }

    /// Error of the earliest submitted task that failed.
    pub fn first_error(&self) -> Option<&Error> {
        self.results.iter().find_map(|result| result.as_ref().err())
    }

    /// Consume the outcomes, keeping only the earliest submitted error.
    pub fn into_result(self) -> Result<Vec<T>> {
        self.results.into_iter().collect()
    }
}

/// A reusable pool running at most `concurrency` tasks at the same time.
pub struct WorkerPool<T> {
    workers: rayon::ThreadPool,
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub fn new(name: &str, concurrency: usize) -> Result<Self> {
        let prefix = name.to_string();
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency.max(1))
            .thread_name(move |index| format!("{}-{}", prefix, index))
            .build()
            .map_err(|e| Error::Pool {
                message: format!("Fail to start workers for {}: {}", name, e),
            })?;

        Ok(Self {
            workers,
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    slots: Vec::new(),
                    pending: 0,
                }),
                done: Condvar::new(),
            }),
        })
    }

    /// Number of tasks allowed to run at the same time.
    pub fn concurrency(&self) -> usize {
        self.workers.current_num_threads()
    }

    /// Queue a task. Its outcome is collected by the next `wait`.
    pub fn push<F>(&self, task: F)
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let index = {
            let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.slots.push(None);
            state.pending += 1;
            state.slots.len() - 1
        };

        let shared = Arc::clone(&self.shared);
        self.workers.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                .unwrap_or_else(|_| Err(Error::TaskPanicked { index }));

            let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.slots[index] = Some(outcome);
            state.pending -= 1;
            if state.pending == 0 {
                shared.done.notify_all();
            }
        });
    }

    /// Block until every queued task has completed and return their outcomes.
    pub fn wait(&self) -> Outcomes<T> {
        let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        while state.pending > 0 {
            state = self
                .shared
                .done
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let results = std::mem::take(&mut state.slots).into_iter().flatten().collect();
        Outcomes { results }
    }
}
