//! Background jobs on dedicated worker threads.
//!
//! A submitted job runs to completion on its own thread and publishes its
//! outcome into a shared slot only once it is fully constructed. The caller
//! polls the handle; polling never blocks.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;
use thiserror::Error;

/// A worker thread died before producing an outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("worker panicked: {0}")]
pub struct JobPanicked(pub String);

impl JobPanicked {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_owned()
        };
        Self(message)
    }
}

/// Snapshot of a job's state at poll time.
#[derive(Debug)]
pub enum JobPoll<T, E> {
    /// Still running.
    Pending,
    Completed(T),
    Failed(E),
}

/// What the shared slot holds at any moment. `Taken` is terminal: the job
/// finished and its outcome has already moved out of the handle.
#[derive(Debug)]
enum Slot<T, E> {
    Running,
    Done(Result<T, E>),
    Taken,
}

/// Handle to a job running on a background thread.
///
/// The outcome moves out of the handle on the first poll that observes it;
/// later polls report [`JobPoll::Pending`] while [`Self::is_finished`] stays
/// true, so callers should poll from one place and store what they take.
#[derive(Debug)]
pub struct JobHandle<T, E> {
    slot: Arc<Mutex<Slot<T, E>>>,
}

impl<T, E> JobHandle<T, E> {
    /// True once the worker has published an outcome, whether or not it has
    /// been taken.
    pub fn is_finished(&self) -> bool {
        !matches!(*lock_slot(&self.slot), Slot::Running)
    }

    /// Take the outcome if the worker has published one.
    pub fn poll(&self) -> JobPoll<T, E> {
        let mut slot = lock_slot(&self.slot);
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Done(Ok(value)) => JobPoll::Completed(value),
            Slot::Done(Err(error)) => JobPoll::Failed(error),
            Slot::Running => {
                *slot = Slot::Running;
                JobPoll::Pending
            }
            Slot::Taken => JobPoll::Pending,
        }
    }
}

/// Run `job` on a new thread and return a handle for polling its outcome.
/// A panic in the job surfaces as [`JobPoll::Failed`] rather than tearing
/// down the caller.
pub fn submit<T, E, F>(job: F) -> JobHandle<T, E>
where
    T: Send + 'static,
    E: From<JobPanicked> + Send + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    let slot = Arc::new(Mutex::new(Slot::Running));
    let worker_slot = Arc::clone(&slot);
    thread::spawn(move || {
        let outcome = catch_unwind(AssertUnwindSafe(job))
            .unwrap_or_else(|payload| Err(JobPanicked::from_payload(payload).into()));
        *lock_slot(&worker_slot) = Slot::Done(outcome);
    });
    JobHandle { slot }
}

// A panicking job poisons nothing of interest; the slot only ever holds the
// published outcome, so recover it rather than bubbling the poison.
fn lock_slot<T, E>(slot: &Mutex<Slot<T, E>>) -> std::sync::MutexGuard<'_, Slot<T, E>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn wait_for<T, E>(handle: &JobHandle<T, E>) {
        for _ in 0..500 {
            if handle.is_finished() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("job did not finish in time");
    }

    #[test]
    fn completed_job_yields_its_value() {
        let handle = submit::<_, JobPanicked, _>(|| Ok(21 * 2));
        wait_for(&handle);
        assert!(matches!(handle.poll(), JobPoll::Completed(42)));
    }

    #[test]
    fn blocked_job_reports_pending() {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = submit::<_, JobPanicked, _>(move || {
            rx.recv().ok();
            Ok(1)
        });
        assert!(!handle.is_finished());
        assert!(matches!(handle.poll(), JobPoll::Pending));
        tx.send(()).unwrap();
        wait_for(&handle);
        assert!(matches!(handle.poll(), JobPoll::Completed(1)));
    }

    #[test]
    fn failed_job_yields_its_error() {
        let handle = submit::<i32, JobPanicked, _>(|| Err(JobPanicked("boom".into())));
        wait_for(&handle);
        match handle.poll() {
            JobPoll::Failed(JobPanicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected poll outcome: {other:?}"),
        }
    }

    #[test]
    fn panicking_job_becomes_a_failure() {
        let handle = submit::<i32, JobPanicked, _>(|| panic!("worker exploded"));
        wait_for(&handle);
        match handle.poll() {
            JobPoll::Failed(JobPanicked(message)) => {
                assert!(message.contains("worker exploded"));
            }
            other => panic!("unexpected poll outcome: {other:?}"),
        }
    }

    #[test]
    fn outcome_is_taken_exactly_once() {
        let handle = submit::<_, JobPanicked, _>(|| Ok("done"));
        wait_for(&handle);
        assert!(matches!(handle.poll(), JobPoll::Completed("done")));
        assert!(matches!(handle.poll(), JobPoll::Pending));
    }

    #[test]
    fn handle_stays_finished_after_the_outcome_is_taken() {
        let handle = submit::<_, JobPanicked, _>(|| Ok(7));
        wait_for(&handle);
        assert!(matches!(handle.poll(), JobPoll::Completed(7)));
        assert!(handle.is_finished());
    }
}
