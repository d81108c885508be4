use std::env;
use std::path::Path;

use tracing::debug;

/// Answers whether accelerated (GPU) execution is available to engines.
pub trait CapabilityProbe: Send + Sync {
    fn accelerator_available(&self) -> bool;
}

/// Probe backed by the local machine: honours `OCR_FORCE_CPU` (through the
/// config), `CUDA_VISIBLE_DEVICES`, then looks for the NVIDIA driver.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    force_cpu: bool,
}

impl SystemProbe {
    pub fn new(force_cpu: bool) -> Self {
        Self { force_cpu }
    }
}

impl CapabilityProbe for SystemProbe {
    fn accelerator_available(&self) -> bool {
        if self.force_cpu {
            debug!("Accelerator disabled by configuration");
            return false;
        }

        if let Ok(devices) = env::var("CUDA_VISIBLE_DEVICES") {
            let devices = devices.trim();
            if devices.is_empty() || devices == "-1" {
                debug!("CUDA_VISIBLE_DEVICES hides every device");
                return false;
            }
        }

        let found = Path::new("/proc/driver/nvidia/version").exists()
            || Path::new("/dev/nvidia0").exists();
        debug!(found, "Probed for NVIDIA driver");
        found
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

impl CapabilityProbe for StaticProbe {
    fn accelerator_available(&self) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_force_cpu_wins() {
        assert!(!SystemProbe::new(true).accelerator_available());
    }

    #[test]
    #[serial]
    fn test_hidden_devices_disable_accelerator() {
        env::set_var("CUDA_VISIBLE_DEVICES", "-1");
        assert!(!SystemProbe::new(false).accelerator_available());
        env::remove_var("CUDA_VISIBLE_DEVICES");
    }

    #[test]
    fn test_static_probe() {
        assert!(StaticProbe(true).accelerator_available());
        assert!(!StaticProbe(false).accelerator_available());
    }
}
