//! Host resource readings
//!
//! CPU load comes from two `/proc/stat` readings separated by a short
//! window, memory from `/proc/meminfo`, GPU load from `nvidia-smi`. Each
//! source fails independently: a failed source leaves its field empty and
//! the error is handed back next to the sample.

use async_trait::async_trait;
use botkit_core::domain::resource::{GpuUsage, MemoryUsage, ResourceSample, SamplePoint};
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::error::ResourceSamplingError;

/// Default procfs mount point
pub const PROC_ROOT: &str = "/proc";

/// GPU query binary
pub const NVIDIA_SMI: &str = "nvidia-smi";

const NVIDIA_SMI_ARGS: [&str; 2] = [
    "--query-gpu=index,name,utilization.gpu,memory.used,memory.total",
    "--format=csv,noheader,nounits",
];

/// A sample plus whatever went wrong while taking it
#[derive(Debug)]
pub struct Sampled {
    pub sample: ResourceSample,
    pub errors: Vec<ResourceSamplingError>,
}

/// Source of resource samples
#[async_trait]
pub trait ResourceSampler: Send + Sync {
    /// Take one sample; never fails, degraded fields are left empty
    async fn sample(&self, point: SamplePoint) -> Sampled;
}

/// Sampler backed by procfs and `nvidia-smi`
#[derive(Debug, Clone)]
pub struct ProcSampler {
    proc_root: PathBuf,
    cpu_interval: Duration,
    gpu_command: Option<String>,
}

impl ProcSampler {
    pub fn new(cpu_interval: Duration, sample_gpu: bool) -> Self {
        Self {
            proc_root: PathBuf::from(PROC_ROOT),
            cpu_interval,
            gpu_command: sample_gpu.then(|| NVIDIA_SMI.to_string()),
        }
    }

    /// Read procfs files from another root (tests, containers)
    pub fn with_proc_root(mut self, proc_root: impl Into<PathBuf>) -> Self {
        self.proc_root = proc_root.into();
        self
    }

    /// Use another GPU query binary, or `None` to skip GPUs
    pub fn with_gpu_command(mut self, command: Option<String>) -> Self {
        self.gpu_command = command;
        self
    }

    async fn read_cpu_percent(&self) -> Result<f64, ResourceSamplingError> {
        let path = self.proc_root.join("stat");

        let before = parse_cpu_times(&read_file(&path).await?)?;
        tokio::time::sleep(self.cpu_interval).await;
        let after = parse_cpu_times(&read_file(&path).await?)?;

        Ok(cpu_percent(before, after))
    }

    async fn read_memory(&self) -> Result<MemoryUsage, ResourceSamplingError> {
        let path = self.proc_root.join("meminfo");
        parse_meminfo(&read_file(&path).await?)
    }

    async fn read_gpus(&self, command: &str) -> Result<Vec<GpuUsage>, ResourceSamplingError> {
        let output = Command::new(command)
            .args(NVIDIA_SMI_ARGS)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    ResourceSamplingError::GpuUnavailable(format!("{} not found", command))
                }
                _ => ResourceSamplingError::GpuUnavailable(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResourceSamplingError::GpuUnavailable(format!(
                "{} exited with {}: {}",
                command,
                output.status,
                stderr.trim()
            )));
        }

        let gpus = parse_gpu_csv(&String::from_utf8_lossy(&output.stdout))?;
        if gpus.is_empty() {
            return Err(ResourceSamplingError::GpuUnavailable(
                "no devices reported".to_string(),
            ));
        }
        Ok(gpus)
    }
}

#[async_trait]
impl ResourceSampler for ProcSampler {
    async fn sample(&self, point: SamplePoint) -> Sampled {
        let mut errors = Vec::new();

        let cpu_percent = self
            .read_cpu_percent()
            .await
            .map_err(|e| errors.push(e))
            .ok();

        let memory = self.read_memory().await.map_err(|e| errors.push(e)).ok();

        let gpus = match &self.gpu_command {
            Some(command) => self.read_gpus(command).await.unwrap_or_else(|e| {
                errors.push(e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        Sampled {
            sample: ResourceSample {
                point,
                taken_at: Utc::now(),
                cpu_percent,
                memory,
                gpus,
            },
            errors,
        }
    }
}

async fn read_file(path: &Path) -> Result<String, ResourceSamplingError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ResourceSamplingError::Read {
            path: path.to_path_buf(),
            source,
        })
}

/// Aggregate CPU jiffies from the first line of `/proc/stat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CpuTimes {
    idle: u64,
    total: u64,
}

fn parse_cpu_times(content: &str) -> Result<CpuTimes, ResourceSamplingError> {
    let line = content
        .lines()
        .find(|line| line.starts_with("cpu "))
        .ok_or_else(|| ResourceSamplingError::Parse {
            what: "/proc/stat",
            reason: "missing aggregate cpu line".to_string(),
        })?;

    // user nice system idle iowait irq softirq steal
    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|field| {
            field.parse::<u64>().map_err(|_| ResourceSamplingError::Parse {
                what: "/proc/stat",
                reason: format!("invalid counter '{}'", field),
            })
        })
        .collect::<Result<Vec<u64>, _>>()?;

    if fields.len() < 4 {
        return Err(ResourceSamplingError::Parse {
            what: "/proc/stat",
            reason: format!("expected at least 4 counters, got {}", fields.len()),
        });
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Ok(CpuTimes {
        idle,
        total: fields.iter().sum(),
    })
}

fn cpu_percent(before: CpuTimes, after: CpuTimes) -> f64 {
    let total = after.total.saturating_sub(before.total);
    if total == 0 {
        return 0.0;
    }
    let idle = after.idle.saturating_sub(before.idle).min(total);
    (total - idle) as f64 * 100.0 / total as f64
}

fn parse_meminfo(content: &str) -> Result<MemoryUsage, ResourceSamplingError> {
    let mut total_kb: Option<u64> = None;
    let mut available_kb: Option<u64> = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let slot = match parts.next() {
            Some("MemTotal:") => &mut total_kb,
            Some("MemAvailable:") => &mut available_kb,
            _ => continue,
        };
        let value = parts.next().unwrap_or_default();
        *slot = Some(value.parse().map_err(|_| ResourceSamplingError::Parse {
            what: "/proc/meminfo",
            reason: format!("invalid value '{}'", value),
        })?);
    }

    let total_kb = total_kb.ok_or_else(|| ResourceSamplingError::Parse {
        what: "/proc/meminfo",
        reason: "missing MemTotal".to_string(),
    })?;
    let available_kb = available_kb.ok_or_else(|| ResourceSamplingError::Parse {
        what: "/proc/meminfo",
        reason: "missing MemAvailable".to_string(),
    })?;

    Ok(MemoryUsage {
        used_bytes: total_kb.saturating_sub(available_kb) * 1024,
        total_bytes: total_kb * 1024,
    })
}

fn parse_gpu_csv(content: &str) -> Result<Vec<GpuUsage>, ResourceSamplingError> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_gpu_line)
        .collect()
}

fn parse_gpu_line(line: &str) -> Result<GpuUsage, ResourceSamplingError> {
    let invalid = |reason: String| ResourceSamplingError::Parse {
        what: "nvidia-smi output",
        reason,
    };

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(invalid(format!("expected 5 columns in '{}'", line)));
    }

    // Device names may contain commas; numeric columns are the last three
    let n = fields.len();
    let number = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|_| invalid(format!("invalid number '{}'", value)))
    };

    Ok(GpuUsage {
        index: fields[0]
            .parse()
            .map_err(|_| invalid(format!("invalid index '{}'", fields[0])))?,
        name: fields[1..n - 3].join(","),
        load_percent: number(fields[n - 3])?,
        memory_used_mb: number(fields[n - 2])? as u64,
        memory_total_mb: number(fields[n - 1])? as u64,
    })
}
