//! Thread pool management for the data-parallel parts of reconstruction
//!
//! Sample conversion, stiffness assembly and sparse products run through the
//! helpers here. They fall back to sequential iteration for small inputs or
//! when parallelism is switched off, and always preserve input order so
//! results do not depend on scheduling.

use crate::error::{ReconstructionError, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

static GLOBAL_THREAD_POOL: OnceLock<Arc<ThreadPool>> = OnceLock::new();
static PARALLEL_CONFIG: Mutex<ParallelConfig> = Mutex::new(ParallelConfig::new());

/// Thread pool configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelConfig {
    /// Number of worker threads (None = one per core)
    pub num_threads: Option<usize>,
    /// Worker stack size in bytes
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
    /// Run everything on the calling thread when false
    pub enabled: bool,
    /// Inputs shorter than this are processed sequentially
    pub min_parallel_len: usize,
}

impl ParallelConfig {
    const fn new() -> Self {
        Self {
            num_threads: None,
            stack_size: None,
            thread_name_prefix: String::new(),
            enabled: true,
            min_parallel_len: 256,
        }
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_min_parallel_len(mut self, len: usize) -> Self {
        self.min_parallel_len = len;
        self
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "poissurf".to_string(),
            ..Self::new()
        }
    }
}

/// Build the global thread pool. Only the first successful call has an effect.
pub fn init_thread_pool(config: ParallelConfig) -> Result<()> {
    if GLOBAL_THREAD_POOL.get().is_some() {
        return Ok(());
    }
    if config.num_threads == Some(0) {
        return Err(ReconstructionError::invalid_criteria("thread count must be positive"));
    }

    let mut builder = ThreadPoolBuilder::new();
    if let Some(num_threads) = config.num_threads {
        builder = builder.num_threads(num_threads);
    }
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }
    if !config.thread_name_prefix.is_empty() {
        let prefix = config.thread_name_prefix.clone();
        builder = builder.thread_name(move |index| format!("{}-{}", prefix, index));
    }

    let pool = builder
        .build()
        .map_err(|e| ReconstructionError::invalid_criteria(format!("failed to create thread pool: {}", e)))?;
    debug!("Thread pool ready with {} threads", pool.current_num_threads());

    if let Ok(mut global) = PARALLEL_CONFIG.lock() {
        *global = config;
    }
    // A concurrent initializer may have won the race; its pool is kept
    let _ = GLOBAL_THREAD_POOL.set(Arc::new(pool));
    Ok(())
}

/// The configured pool, if [`init_thread_pool`] has run
pub fn thread_pool() -> Option<Arc<ThreadPool>> {
    GLOBAL_THREAD_POOL.get().cloned()
}

pub fn get_config() -> ParallelConfig {
    PARALLEL_CONFIG
        .lock()
        .map(|config| config.clone())
        .unwrap_or_default()
}

/// Number of threads parallel work will be spread over
pub fn current_num_threads() -> usize {
    match thread_pool() {
        Some(pool) => pool.current_num_threads(),
        None => rayon::current_num_threads(),
    }
}

/// Run `op` inside the configured pool, or rayon's global pool without one
pub fn execute_parallel<F, R>(op: F) -> R
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    match thread_pool() {
        Some(pool) => pool.install(op),
        None => op(),
    }
}

fn run_sequential(len: usize) -> bool {
    let config = get_config();
    !config.enabled || len < config.min_parallel_len
}

/// Order-preserving parallel map
pub fn parallel_map<T, U, F>(data: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    if run_sequential(data.len()) {
        return data.iter().map(f).collect();
    }
    execute_parallel(|| data.par_iter().map(f).collect())
}

/// Order-preserving parallel map with index
pub fn parallel_map_indexed<T, U, F>(data: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
{
    if run_sequential(data.len()) {
        return data.iter().enumerate().map(|(i, x)| f(i, x)).collect();
    }
    execute_parallel(|| data.par_iter().enumerate().map(|(i, x)| f(i, x)).collect())
}

/// Parallel map-reduce. `reduce_op` must be associative and commutative
/// for the result to be independent of the thread count.
pub fn parallel_reduce<T, U, F, R>(data: &[T], identity: U, map_op: F, reduce_op: R) -> U
where
    T: Sync,
    U: Clone + Send + Sync,
    F: Fn(&T) -> U + Sync + Send,
    R: Fn(U, U) -> U + Sync + Send,
{
    if run_sequential(data.len()) {
        return data.iter().map(map_op).fold(identity, reduce_op);
    }
    execute_parallel(|| {
        data.par_iter()
            .map(map_op)
            .reduce(|| identity.clone(), reduce_op)
    })
}
