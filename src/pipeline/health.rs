//! Memory-pressure gate checked before every model invocation.
//!
//! Stateless: the probe is read fresh on each check, with no hysteresis,
//! so the verdict can flip between consecutive calls.

use sysinfo::System;

/// Source of the current memory utilization reading. A trait seam so
/// tests can pin the value.
pub trait MemoryProbe: Send + Sync {
    fn utilization_percent(&self) -> f32;
}

/// Reads host memory via sysinfo.
pub struct SystemMemoryProbe;

impl MemoryProbe for SystemMemoryProbe {
    fn utilization_percent(&self) -> f32 {
        let mut sys = System::new();
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return 0.0;
        }
        (sys.used_memory() as f32 / total as f32) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub reason: String,
}

pub struct HealthGate {
    threshold_percent: f32,
    probe: Box<dyn MemoryProbe>,
}

impl HealthGate {
    pub fn new(threshold_percent: f32) -> Self {
        Self::with_probe(threshold_percent, Box::new(SystemMemoryProbe))
    }

    pub fn with_probe(threshold_percent: f32, probe: Box<dyn MemoryProbe>) -> Self {
        Self {
            threshold_percent,
            probe,
        }
    }

    pub fn check(&self) -> HealthStatus {
        let percent = self.probe.utilization_percent();
        if percent > self.threshold_percent {
            HealthStatus {
                healthy: false,
                reason: format!("Server Load High: {:.0}%", percent),
            }
        } else {
            HealthStatus {
                healthy: true,
                reason: "Healthy".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(f32);

    impl MemoryProbe for FixedProbe {
        fn utilization_percent(&self) -> f32 {
            self.0
        }
    }

    #[test]
    fn trips_above_threshold() {
        let gate = HealthGate::with_probe(90.0, Box::new(FixedProbe(95.5)));
        let status = gate.check();
        assert!(!status.healthy);
        assert_eq!(status.reason, "Server Load High: 96%");
    }

    #[test]
    fn passes_at_or_below_threshold() {
        let gate = HealthGate::with_probe(90.0, Box::new(FixedProbe(90.0)));
        let status = gate.check();
        assert!(status.healthy);
        assert_eq!(status.reason, "Healthy");
    }

    #[test]
    fn system_probe_reports_plausible_value() {
        let percent = SystemMemoryProbe.utilization_percent();
        assert!((0.0..=100.0).contains(&percent));
    }
}
