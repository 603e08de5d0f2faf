//! Memoized, chainable async stages.
//!
//! A [`PipelineStage`] wraps a producer and runs it at most once successfully.
//! Each stage is a small state machine:
//!
//! - `Empty`: nothing computed yet, or the last attempt failed
//! - `InFlight`: one shared computation that every concurrent caller awaits
//! - `Completed`: the stored value, returned without running anything again
//!
//! A failure moves the stage back to `Empty`, so the next call retries. Stages
//! built with [`PipelineStage::then`] pull their input from the previous stage,
//! reusing its memoized value when there is one.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

type StageFuture<T, E> = Shared<BoxFuture<'static, Result<Arc<T>, E>>>;
type Producer<T, E> = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<T>, E>> + Send + Sync>;

enum StageState<T, E> {
  Empty,
  InFlight(StageFuture<T, E>),
  Completed(Arc<T>),
}

struct StageInner<T, E> {
  produce: Producer<T, E>,
  state: Mutex<StageState<T, E>>,
  runs: AtomicUsize,
}

pub struct PipelineStage<T, E> {
  inner: Arc<StageInner<T, E>>,
}

impl<T, E> Clone for PipelineStage<T, E> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl<T, E> std::fmt::Debug for PipelineStage<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match &*self.inner.lock_state() {
      StageState::Empty => "empty",
      StageState::InFlight(_) => "in-flight",
      StageState::Completed(_) => "completed",
    };
    f.debug_struct("PipelineStage")
      .field("state", &state)
      .field("runs", &self.runs())
      .finish()
  }
}

impl<T, E> PipelineStage<T, E> {
  /// How many times the producer has been started, failed attempts included.
  pub fn runs(&self) -> usize {
    self.inner.runs.load(Ordering::SeqCst)
  }
}

impl<T, E> StageInner<T, E> {
  fn lock_state(&self) -> std::sync::MutexGuard<'_, StageState<T, E>> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl<T, E> PipelineStage<T, E>
where
  T: Send + Sync + 'static,
  E: Clone + Send + Sync + 'static,
{
  /// A root stage running `producer`.
  pub fn new<F, Fut>(producer: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    Self::from_producer(Box::new(move || producer().map(|result| result.map(Arc::new)).boxed()))
  }

  fn from_producer(produce: Producer<T, E>) -> Self {
    Self {
      inner: Arc::new(StageInner {
        produce,
        state: Mutex::new(StageState::Empty),
        runs: AtomicUsize::new(0),
      }),
    }
  }

  /// A stage fed with this stage's value.
  pub fn then<U, F, Fut>(&self, next: F) -> PipelineStage<U, E>
  where
    U: Send + Sync + 'static,
    F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
  {
    let previous = self.clone();
    let next = Arc::new(next);
    PipelineStage::from_producer(Box::new(move || {
      let previous = previous.clone();
      let next = next.clone();
      async move {
        let input = previous.get_latest().await?;
        next(input).await.map(Arc::new)
      }
      .boxed()
    }))
  }

  /// The stage value, computing it (and any predecessors) on first use.
  ///
  /// Concurrent callers share one in-flight computation and all observe its
  /// outcome. Successful values are kept; failures are not.
  pub async fn get_latest(&self) -> Result<Arc<T>, E> {
    let computation = {
      let mut state = self.inner.lock_state();
      match &*state {
        StageState::Completed(value) => return Ok(value.clone()),
        StageState::InFlight(computation) => computation.clone(),
        StageState::Empty => {
          self.inner.runs.fetch_add(1, Ordering::SeqCst);
          let computation = (self.inner.produce)().shared();
          *state = StageState::InFlight(computation.clone());
          computation
        }
      }
    };

    let result = computation.clone().await;

    let mut state = self.inner.lock_state();
    let still_current = matches!(&*state, StageState::InFlight(current) if current.ptr_eq(&computation));
    if still_current {
      *state = match &result {
        Ok(value) => StageState::Completed(value.clone()),
        Err(_) => StageState::Empty,
      };
    }

    result
  }

  /// The memoized value, without triggering a computation.
  pub fn peek(&self) -> Option<Arc<T>> {
    match &*self.inner.lock_state() {
      StageState::Completed(value) => Some(value.clone()),
      _ => None,
    }
  }

  pub fn is_completed(&self) -> bool {
    self.peek().is_some()
  }
}
