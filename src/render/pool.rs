//! Concurrency-bounded renderer pool.
//!
//! The pool is an owned component with an explicit lifecycle:
//!
//! 1. [`RendererPool::new`] only records configuration.
//! 2. The engine is launched on first use (or eagerly via
//!    [`open`](RendererPool::open)) and kept until close. A failed launch
//!    is returned to that caller as [`RenderError::PoolUnavailable`]; the
//!    next caller launches again.
//! 3. [`close`](RendererPool::close) refuses new work and shuts the engine down.
//!
//! Up to `max_concurrency` jobs run at once; the rest wait for a slot.
//! Each job runs in its own task under a timeout of
//! `min(job timeout, task ceiling)`. A job that times out is aborted and its
//! slot released; a job that panics is reported as
//! [`RenderError::Crashed`]. Neither affects other jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

use super::{EngineLauncher, RenderEngine, Renderer};
use crate::error::RenderError;
use crate::telemetry;
use crate::types::RenderJob;

/// Default number of concurrently executing render jobs.
pub const DEFAULT_MAX_CONCURRENCY: usize = 6;

/// Default hard ceiling on a single job, whatever timeout it asked for.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for [`RendererPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrently executing jobs. Default: 6. Zero is treated as one.
    pub max_concurrency: usize,
    /// Hard ceiling on any one job. Default: 60 seconds.
    pub task_timeout: Duration,
    /// Log every job start and finish at `info`. Default: off.
    pub verbose: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            verbose: false,
        }
    }
}

impl PoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Bounded pool of render slots over a lazily launched engine.
pub struct RendererPool {
    launcher: Arc<dyn EngineLauncher>,
    engine: OnceCell<Arc<dyn RenderEngine>>,
    slots: Arc<Semaphore>,
    config: PoolConfig,
    closed: AtomicBool,
}

impl RendererPool {
    pub fn new(launcher: Arc<dyn EngineLauncher>, config: PoolConfig) -> Self {
        let max_concurrency = config.max_concurrency.max(1);
        Self {
            launcher,
            engine: OnceCell::new(),
            slots: Arc::new(Semaphore::new(max_concurrency)),
            config: PoolConfig {
                max_concurrency,
                ..config
            },
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Launch the engine now instead of on first job.
    pub async fn open(&self) -> Result<(), RenderError> {
        self.engine().await.map(|_| ())
    }

    /// Whether an engine has been launched and the pool is still open.
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.engine.initialized()
    }

    /// Slots not currently held by a running job.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Refuse new jobs and shut the engine down.
    ///
    /// Jobs already holding a slot run to completion or timeout; queued jobs
    /// fail with [`RenderError::Closed`].
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.slots.close();
        if let Some(engine) = self.engine.get() {
            info!(engine = engine.name(), "closing renderer engine");
            engine.close().await;
        }
    }

    async fn engine(&self) -> Result<Arc<dyn RenderEngine>, RenderError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RenderError::Closed);
        }
        self.engine
            .get_or_try_init(|| async {
                let engine = self.launcher.launch().await.map_err(|err| match err {
                    RenderError::PoolUnavailable(_) => err,
                    other => RenderError::PoolUnavailable(other.to_string()),
                })?;
                info!(
                    engine = engine.name(),
                    max_concurrency = self.config.max_concurrency,
                    "renderer engine launched"
                );
                Ok::<_, RenderError>(engine)
            })
            .await
            .cloned()
    }

    fn effective_timeout(&self, job: &RenderJob) -> Duration {
        match job.timeout() {
            Some(timeout) => timeout.min(self.config.task_timeout),
            None => self.config.task_timeout,
        }
    }

    async fn execute(&self, job: RenderJob) -> Result<String, RenderError> {
        let started = Instant::now();
        let result = self.run(job).await;

        let status = match &result {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        metrics::counter!(telemetry::RENDERS_TOTAL, "status" => status).increment(1);
        metrics::histogram!(telemetry::RENDER_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, job: RenderJob) -> Result<String, RenderError> {
        if !job.wait_until.is_supported() {
            return Err(RenderError::UnsupportedWaitCondition(
                job.wait_until.as_str().to_string(),
            ));
        }

        let engine = self.engine().await?;
        let _slot = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RenderError::Closed)?;

        let limit = self.effective_timeout(&job);
        let url = job.url.clone();
        if self.config.verbose {
            info!(
                url = %url,
                wait_until = %job.wait_until,
                timeout_ms = limit.as_millis() as u64,
                "render job started"
            );
        }

        let mut task = tokio::spawn(async move { engine.render(&job).await });
        let result = match tokio::time::timeout(limit, &mut task).await {
            Ok(Ok(rendered)) => rendered,
            Ok(Err(join_err)) => {
                warn!(url = %url, error = %join_err, "render task crashed");
                Err(RenderError::Crashed(join_err.to_string()))
            }
            Err(_) => {
                task.abort();
                Err(RenderError::Timeout(limit))
            }
        };

        if self.config.verbose {
            info!(url = %url, ok = result.is_ok(), "render job finished");
        } else {
            debug!(url = %url, ok = result.is_ok(), "render job finished");
        }
        result
    }
}

#[async_trait]
impl Renderer for RendererPool {
    async fn render(&self, job: RenderJob) -> Result<String, RenderError> {
        self.execute(job).await
    }

    async fn probe(&self) -> Result<(), RenderError> {
        self.execute(RenderJob::probe()).await.map(|_| ())
    }
}
