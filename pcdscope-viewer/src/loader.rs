//! Background fetch+decode of point cloud frames
//!
//! Loads run on a [`LoadExecutor`]; each finished load sends a
//! [`LoadCompletion`] tagged with its request sequence number back over a
//! channel, which the viewer drains on its own thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use pcdscope_core::{Error, PointGeometry, Result};
use pcdscope_io::{load_point_cloud, AssetFetcher, DecoderRegistry};

/// A unit of blocking work
pub type LoadJob = Box<dyn FnOnce() + Send + 'static>;

/// Runs load jobs off the render thread
pub trait LoadExecutor {
    fn spawn(&self, job: LoadJob);
}

/// Runs jobs on the blocking pool of a dedicated tokio runtime
pub struct TokioLoadExecutor {
    /// Taken on drop
    runtime: Option<tokio::runtime::Runtime>,
}

impl TokioLoadExecutor {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("pcdscope-loader")
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }
}

impl LoadExecutor for TokioLoadExecutor {
    fn spawn(&self, job: LoadJob) {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        let task = runtime.spawn_blocking(job);
        runtime.spawn(async move {
            if let Err(e) = task.await {
                log::warn!("Load job did not finish: {}", e);
            }
        });
    }
}

impl Drop for TokioLoadExecutor {
    fn drop(&mut self) {
        // Loads still in flight are detached rather than awaited
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Queues jobs until they are run explicitly, in any order.
///
/// Clones share the queue.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    jobs: Arc<Mutex<VecDeque<LoadJob>>>,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Run the oldest queued job; returns `false` if none was queued
    pub fn run_next(&self) -> bool {
        let job = self.lock().pop_front();
        job.map(|job| job()).is_some()
    }

    /// Run the newest queued job; returns `false` if none was queued
    pub fn run_last(&self) -> bool {
        let job = self.lock().pop_back();
        job.map(|job| job()).is_some()
    }

    /// Run every queued job in submission order
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LoadJob>> {
        self.jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LoadExecutor for ManualExecutor {
    fn spawn(&self, job: LoadJob) {
        self.lock().push_back(job);
    }
}

/// Result of one load request
#[derive(Debug)]
pub struct LoadCompletion {
    pub seq: u64,
    pub location: String,
    pub result: Result<PointGeometry>,
}

/// Reports the outcome of one request exactly once.
///
/// A job that unwinds before reporting sends an [`Error::Aborted`] result
/// from `drop`, so the request still settles.
struct CompletionGuard {
    seq: u64,
    location: String,
    sender: flume::Sender<LoadCompletion>,
    sent: bool,
}

impl CompletionGuard {
    fn complete(mut self, result: Result<PointGeometry>) {
        self.sent = true;
        self.send(result);
    }

    fn send(&self, result: Result<PointGeometry>) {
        let completion = LoadCompletion {
            seq: self.seq,
            location: self.location.clone(),
            result,
        };
        if self.sender.send(completion).is_err() {
            log::debug!("Dropping completion of load {}: viewer is gone", self.seq);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if !self.sent {
            self.send(Err(Error::Aborted(format!(
                "load of {} stopped before finishing",
                self.location
            ))));
        }
    }
}

/// Fetches and decodes frames on an executor and collects the results
pub struct PointCloudLoader {
    fetcher: AssetFetcher,
    decoders: Arc<DecoderRegistry>,
    executor: Box<dyn LoadExecutor>,
    sender: flume::Sender<LoadCompletion>,
    receiver: flume::Receiver<LoadCompletion>,
}

impl PointCloudLoader {
    pub fn new(
        fetcher: AssetFetcher,
        decoders: DecoderRegistry,
        executor: Box<dyn LoadExecutor>,
    ) -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            fetcher,
            decoders: Arc::new(decoders),
            executor,
            sender,
            receiver,
        }
    }

    pub fn fetcher(&self) -> &AssetFetcher {
        &self.fetcher
    }

    /// Start loading `location` as request `seq`
    pub fn request(&self, seq: u64, location: &str) {
        let fetcher = self.fetcher.clone();
        let decoders = self.decoders.clone();
        let guard = CompletionGuard {
            seq,
            location: location.to_string(),
            sender: self.sender.clone(),
            sent: false,
        };

        self.executor.spawn(Box::new(move || {
            let result = load_point_cloud(&fetcher, &decoders, &guard.location);
            guard.complete(result);
        }));
    }

    /// Next finished load, if any
    pub fn try_completion(&self) -> Option<LoadCompletion> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next finished load
    pub fn wait_completion(&self) -> Result<LoadCompletion> {
        self.receiver
            .recv()
            .map_err(|e| Error::Unsupported(format!("Load channel closed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcdscope_io::{AssetSource, CachePolicy, IoError, PointCloudDecoder};

    const FRAME: &[u8] = b"VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
WIDTH 1
HEIGHT 1
POINTS 1
DATA ascii
1 2 3
";

    struct StaticSource;

    impl AssetSource for StaticSource {
        fn handles(&self, location: &str) -> bool {
            location.starts_with("mem://")
        }

        fn fetch(&self, location: &str, _policy: CachePolicy) -> std::result::Result<Vec<u8>, IoError> {
            match location {
                "mem://frame.pcd" => Ok(FRAME.to_vec()),
                _ => Err(IoError::FileNotFound {
                    path: location.to_string(),
                }),
            }
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn loader(executor: Box<dyn LoadExecutor>) -> PointCloudLoader {
        PointCloudLoader::new(
            AssetFetcher::empty().with_source(Arc::new(StaticSource)),
            DecoderRegistry::default(),
            executor,
        )
    }

    struct PanickingDecoder;

    impl PointCloudDecoder for PanickingDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<PointGeometry> {
            panic!("decoder bug");
        }

        fn format_name(&self) -> &'static str {
            "panicking"
        }
    }

    fn panicking_loader(executor: Box<dyn LoadExecutor>) -> PointCloudLoader {
        let mut decoders = DecoderRegistry::default();
        decoders.register("pcd", Arc::new(PanickingDecoder));
        PointCloudLoader::new(
            AssetFetcher::empty().with_source(Arc::new(StaticSource)),
            decoders,
            executor,
        )
    }

    #[test]
    fn test_manual_executor_defers_work() {
        let executor = ManualExecutor::new();
        let loader = loader(Box::new(executor.clone()));

        loader.request(1, "mem://frame.pcd");
        assert!(loader.try_completion().is_none());
        assert_eq!(executor.pending(), 1);

        assert!(executor.run_next());
        let completion = loader.try_completion().unwrap();
        assert_eq!(completion.seq, 1);
        assert_eq!(completion.location, "mem://frame.pcd");
        assert_eq!(completion.result.unwrap().len(), 1);
    }

    #[test]
    fn test_run_last_reverses_order() {
        let executor = ManualExecutor::new();
        let loader = loader(Box::new(executor.clone()));
        loader.request(1, "mem://frame.pcd");
        loader.request(2, "mem://missing.pcd");

        assert!(executor.run_last());
        assert!(executor.run_last());
        assert!(!executor.run_last());

        let first = loader.try_completion().unwrap();
        assert_eq!(first.seq, 2);
        assert!(matches!(first.result, Err(Error::Fetch(_))));
        assert_eq!(loader.try_completion().unwrap().seq, 1);
    }

    #[test]
    fn test_tokio_executor_delivers_completion() {
        let loader = loader(Box::new(TokioLoadExecutor::new().unwrap()));
        loader.request(7, "mem://frame.pcd");
        let completion = loader.wait_completion().unwrap();
        assert_eq!(completion.seq, 7);
        assert!(completion.result.is_ok());
    }

    #[test]
    fn test_panicking_job_still_completes_on_tokio() {
        let loader = panicking_loader(Box::new(TokioLoadExecutor::new().unwrap()));
        loader.request(3, "mem://frame.pcd");
        let completion = loader.wait_completion().unwrap();
        assert_eq!(completion.seq, 3);
        assert_eq!(completion.location, "mem://frame.pcd");
        assert!(matches!(completion.result, Err(Error::Aborted(_))));
    }

    #[test]
    fn test_panicking_job_still_completes_on_manual_executor() {
        let executor = ManualExecutor::new();
        let loader = panicking_loader(Box::new(executor.clone()));
        loader.request(1, "mem://frame.pcd");

        let ran = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| executor.run_next()));
        assert!(ran.is_err());
        let completion = loader.try_completion().unwrap();
        assert_eq!(completion.seq, 1);
        assert!(matches!(completion.result, Err(Error::Aborted(_))));
    }
}
