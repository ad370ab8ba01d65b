use std::time::Instant;

use log::info;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to start worker pool")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

// ---------------------------------------------------------------------------
// Session – explicit execution context
// ---------------------------------------------------------------------------

/// Execution context shared by loading and training.
///
/// Owns the worker pool that parallel stages run on. Acquire one at program
/// start and call [`Session::stop`] (or drop it) at the end.
pub struct Session {
    app_name: String,
    pool: ThreadPool,
    started: Instant,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Number of worker threads.
    pub fn parallelism(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the worker pool; parallel iterators used by `op`
    /// execute on this session's threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Release the session.
    pub fn stop(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        info!(
            "Session '{}' stopped after {:.2?}",
            self.app_name,
            self.started.elapsed()
        );
    }
}

// ---------------------------------------------------------------------------
// SessionBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionBuilder {
    app_name: String,
    num_threads: Option<usize>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            num_threads: None,
        }
    }
}

impl SessionBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Worker thread count; `None` (or 0) lets rayon pick one per core.
    pub fn num_threads(mut self, threads: Option<usize>) -> Self {
        self.num_threads = threads;
        self
    }

    pub fn build(self) -> Result<Session, SessionError> {
        let name = self.app_name.clone();
        let mut pool = ThreadPoolBuilder::new().thread_name(move |i| format!("{name}-worker-{i}"));
        if let Some(n) = self.num_threads {
            pool = pool.num_threads(n);
        }
        let pool = pool.build()?;

        info!(
            "Session '{}' started with {} worker thread(s)",
            self.app_name,
            pool.current_num_threads()
        );
        Ok(Session {
            app_name: self.app_name,
            pool,
            started: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn builds_with_requested_threads() {
        let session = Session::builder()
            .app_name("test-session")
            .num_threads(Some(2))
            .build()
            .unwrap();
        assert_eq!(session.app_name(), "test-session");
        assert_eq!(session.parallelism(), 2);
        session.stop();
    }

    #[test]
    fn install_runs_parallel_work_on_pool() {
        let session = Session::builder().num_threads(Some(3)).build().unwrap();
        let threads = session.install(rayon::current_num_threads);
        assert_eq!(threads, 3);

        let squares: Vec<u64> = session.install(|| (0..100u64).into_par_iter().map(|x| x * x).collect());
        assert_eq!(squares[10], 100);
        assert_eq!(squares.len(), 100);
    }

    #[test]
    fn default_app_name_is_package_name() {
        let session = Session::builder().num_threads(Some(1)).build().unwrap();
        assert_eq!(session.app_name(), "vector-lda");
    }
}
