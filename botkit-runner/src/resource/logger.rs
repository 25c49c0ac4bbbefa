//! Entry/exit resource logging around a run

use botkit_core::domain::resource::{ResourceSample, SamplePoint};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::sampler::ResourceSampler;
use crate::error::ResourceSamplingError;
use crate::journal::RunLog;

/// Both samples of a run and the wall-clock time between them
#[derive(Debug, Clone)]
pub struct ResourceReport {
    pub entry: ResourceSample,
    pub exit: ResourceSample,
    pub elapsed: Duration,
}

impl ResourceReport {
    /// Elapsed time as `DD:HH:MM:SS`
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed)
    }

    /// One-line comparison of the entry and exit samples
    pub fn summary(&self) -> String {
        format!(
            "Resource summary: elapsed {}, CPU {}, RAM {}, GPU {}",
            self.elapsed_display(),
            delta(self.entry.cpu_percent, self.exit.cpu_percent),
            delta(
                self.entry.memory.map(|m| m.percent()),
                self.exit.memory.map(|m| m.percent())
            ),
            delta(self.entry.gpu_percent(), self.exit.gpu_percent()),
        )
    }
}

/// Samples resources when a run starts and when it ends
///
/// Whatever the wrapped future does, exactly one entry sample, one exit
/// sample and one summary record end up in the run log.
#[derive(Clone)]
pub struct ResourceLogger {
    sampler: Arc<dyn ResourceSampler>,
    log: RunLog,
}

impl ResourceLogger {
    pub fn new(sampler: Arc<dyn ResourceSampler>, log: RunLog) -> Self {
        Self { sampler, log }
    }

    /// Run `work` between an entry and an exit sample
    pub async fn measure<F>(&self, work: F) -> (F::Output, ResourceReport)
    where
        F: Future,
    {
        let entry = self.take(SamplePoint::Entry).await;
        let started = Instant::now();

        let output = work.await;

        let elapsed = started.elapsed();
        let exit = self.take(SamplePoint::Exit).await;

        let report = ResourceReport {
            entry,
            exit,
            elapsed,
        };
        self.log.info(report.summary());

        (output, report)
    }

    async fn take(&self, point: SamplePoint) -> ResourceSample {
        let sampled = self.sampler.sample(point).await;

        for err in &sampled.errors {
            match err {
                // Machines without a GPU are the common case
                ResourceSamplingError::GpuUnavailable(_) => debug!("{}", err),
                _ => self
                    .log
                    .warning(format!("Resource sampling degraded at {}: {}", point, err)),
            }
        }

        self.log
            .info(format!("Resource usage at {}: {}", point, sampled.sample));
        sampled.sample
    }
}

/// Format a duration as `DD:HH:MM:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let (minutes, seconds) = (rest / 60, rest % 60);
    format!("{:02}:{:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn delta(entry: Option<f64>, exit: Option<f64>) -> String {
    match (entry, exit) {
        (Some(a), Some(b)) => format!("{:.1}% -> {:.1}% ({:+.1})", a, b, b - a),
        (Some(a), None) => format!("{:.1}% -> n/a", a),
        (None, Some(b)) => format!("n/a -> {:.1}%", b),
        (None, None) => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::sampler::Sampled;
    use async_trait::async_trait;
    use botkit_core::domain::resource::MemoryUsage;
    use botkit_core::domain::run::{ExecutionMode, RunContext};
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSampler {
        calls: AtomicUsize,
        fail_cpu: bool,
    }

    impl FakeSampler {
        fn new(fail_cpu: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_cpu,
            }
        }
    }

    #[async_trait]
    impl ResourceSampler for FakeSampler {
        async fn sample(&self, point: SamplePoint) -> Sampled {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as f64;
            let mut errors = Vec::new();
            let cpu_percent = if self.fail_cpu {
                errors.push(ResourceSamplingError::Parse {
                    what: "/proc/stat",
                    reason: "truncated".to_string(),
                });
                None
            } else {
                Some(10.0 + n * 5.0)
            };
            errors.push(ResourceSamplingError::GpuUnavailable("none".to_string()));

            Sampled {
                sample: ResourceSample {
                    point,
                    taken_at: Utc::now(),
                    cpu_percent,
                    memory: Some(MemoryUsage {
                        used_bytes: 1024 * 1024,
                        total_bytes: 4 * 1024 * 1024,
                    }),
                    gpus: Vec::new(),
                },
                errors,
            }
        }
    }

    fn run_log(dir: &std::path::Path) -> RunLog {
        RunLog::create(&RunContext::new(ExecutionMode::Local, "bot", dir)).unwrap()
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "00:01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(90_061)), "01:01:01:01");
    }

    #[test]
    fn test_delta() {
        assert_eq!(delta(Some(10.0), Some(15.0)), "10.0% -> 15.0% (+5.0)");
        assert_eq!(delta(Some(20.0), Some(5.0)), "20.0% -> 5.0% (-15.0)");
        assert_eq!(delta(None, Some(1.0)), "n/a -> 1.0%");
        assert_eq!(delta(None, None), "n/a");
    }

    #[tokio::test]
    async fn test_measure_takes_two_samples() {
        let dir = tempfile::tempdir().unwrap();
        let log = run_log(dir.path());
        let sampler = Arc::new(FakeSampler::new(false));
        let logger = ResourceLogger::new(sampler.clone(), log.clone());

        let (value, report) = logger.measure(async { 42 }).await;

        assert_eq!(value, 42);
        assert_eq!(sampler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.entry.point, SamplePoint::Entry);
        assert_eq!(report.exit.point, SamplePoint::Exit);

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.matches("Resource usage at entry").count(), 1);
        assert_eq!(content.matches("Resource usage at exit").count(), 1);
        assert_eq!(content.matches("Resource summary").count(), 1);
        assert!(content.contains("CPU 10.0% -> 15.0% (+5.0)"));
        // A missing GPU is not worth a warning
        assert!(!content.contains("WARNING"));
    }

    #[tokio::test]
    async fn test_measure_keeps_failed_output() {
        let dir = tempfile::tempdir().unwrap();
        let logger = ResourceLogger::new(Arc::new(FakeSampler::new(false)), run_log(dir.path()));

        let (result, _) = logger
            .measure(async { Err::<(), _>("boom".to_string()) })
            .await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_degraded_sample_is_logged_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let log = run_log(dir.path());
        let logger = ResourceLogger::new(Arc::new(FakeSampler::new(true)), log.clone());

        let (_, report) = logger.measure(async {}).await;
        assert_eq!(report.entry.cpu_percent, None);

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.matches("Resource sampling degraded").count(), 2);
        assert!(content.contains("CPU n/a"));
    }
}
