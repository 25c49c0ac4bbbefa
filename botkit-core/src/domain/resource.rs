//! Resource usage domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in the run a sample was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplePoint {
    Entry,
    Exit,
}

impl fmt::Display for SamplePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplePoint::Entry => write!(f, "entry"),
            SamplePoint::Exit => write!(f, "exit"),
        }
    }
}

/// System memory in use at sampling time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

impl MemoryUsage {
    pub fn used_mb(&self) -> f64 {
        self.used_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 * 100.0 / self.total_bytes as f64
    }
}

/// Load of a single GPU device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuUsage {
    pub index: u32,
    pub name: String,
    pub load_percent: f64,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

/// Point-in-time CPU/RAM/GPU measurement
///
/// Fields that could not be read are `None` (or an empty GPU list); a
/// degraded sample is still a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub point: SamplePoint,
    pub taken_at: DateTime<Utc>,
    pub cpu_percent: Option<f64>,
    pub memory: Option<MemoryUsage>,
    pub gpus: Vec<GpuUsage>,
}

impl ResourceSample {
    /// Average load across all GPUs, if any were found
    pub fn gpu_percent(&self) -> Option<f64> {
        if self.gpus.is_empty() {
            return None;
        }
        let total: f64 = self.gpus.iter().map(|gpu| gpu.load_percent).sum();
        Some(total / self.gpus.len() as f64)
    }
}

impl fmt::Display for ResourceSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cpu_percent {
            Some(cpu) => write!(f, "CPU Usage: {:.1}%", cpu)?,
            None => write!(f, "CPU Usage: unavailable")?,
        }

        match &self.memory {
            Some(mem) => write!(
                f,
                ", RAM Usage: {:.1}% ({:.1} MB)",
                mem.percent(),
                mem.used_mb()
            )?,
            None => write!(f, ", RAM Usage: unavailable")?,
        }

        for gpu in &self.gpus {
            write!(
                f,
                ", GPU {}: {}, Load: {:.1}%, Memory: {}MB/{}MB",
                gpu.index, gpu.name, gpu.load_percent, gpu.memory_used_mb, gpu.memory_total_mb
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(gpus: Vec<GpuUsage>) -> ResourceSample {
        ResourceSample {
            point: SamplePoint::Entry,
            taken_at: Utc::now(),
            cpu_percent: Some(12.5),
            memory: Some(MemoryUsage {
                used_bytes: 512 * 1024 * 1024,
                total_bytes: 2048 * 1024 * 1024,
            }),
            gpus,
        }
    }

    fn gpu(index: u32, load: f64) -> GpuUsage {
        GpuUsage {
            index,
            name: "Tesla T4".to_string(),
            load_percent: load,
            memory_used_mb: 100,
            memory_total_mb: 15360,
        }
    }

    #[test]
    fn test_memory_usage_math() {
        let mem = MemoryUsage {
            used_bytes: 512 * 1024 * 1024,
            total_bytes: 2048 * 1024 * 1024,
        };
        assert_eq!(mem.used_mb(), 512.0);
        assert_eq!(mem.percent(), 25.0);

        let empty = MemoryUsage {
            used_bytes: 0,
            total_bytes: 0,
        };
        assert_eq!(empty.percent(), 0.0);
    }

    #[test]
    fn test_gpu_field_omitted_when_unavailable() {
        let rendered = sample(vec![]).to_string();
        assert_eq!(rendered, "CPU Usage: 12.5%, RAM Usage: 25.0% (512.0 MB)");
        assert_eq!(sample(vec![]).gpu_percent(), None);
    }

    #[test]
    fn test_gpu_average_and_rendering() {
        let s = sample(vec![gpu(0, 20.0), gpu(1, 40.0)]);
        assert_eq!(s.gpu_percent(), Some(30.0));
        assert!(s.to_string().contains("GPU 1: Tesla T4, Load: 40.0%, Memory: 100MB/15360MB"));
    }

    #[test]
    fn test_degraded_sample_rendering() {
        let s = ResourceSample {
            point: SamplePoint::Exit,
            taken_at: Utc::now(),
            cpu_percent: None,
            memory: None,
            gpus: vec![],
        };
        assert_eq!(s.to_string(), "CPU Usage: unavailable, RAM Usage: unavailable");
    }
}
