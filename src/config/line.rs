use std::sync::{PoisonError, RwLock};

use super::DeviceConfiguration;

/// The live line configuration of one device.
///
/// `configure` replaces the whole value under a write lock, so readers see
/// either the old or the new configuration, never a mix.
#[derive(Debug, Default)]
pub struct LineConfig {
    current: RwLock<DeviceConfiguration>,
}

impl LineConfig {
    pub fn new(initial: DeviceConfiguration) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn configure(&self, cfg: DeviceConfiguration) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = cfg;
        log::info!(
            "Line configured: baud={} parity={} stop_bits={}",
            cfg.baud,
            cfg.parity,
            cfg.stop_bits
        );
    }

    pub fn current(&self) -> DeviceConfiguration {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_replaces_wholesale() {
        let line = LineConfig::default();
        assert_eq!(line.current(), DeviceConfiguration::default());

        let cfg = DeviceConfiguration {
            baud: 0,
            parity: 7,
            stop_bits: 0,
            reserved: [1, 2],
        };
        line.configure(cfg);
        assert_eq!(line.current(), cfg);

        line.configure(DeviceConfiguration::new(9600, 1, 2));
        assert_eq!(line.current().reserved, [0, 0]);
    }
}
