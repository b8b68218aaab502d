//! # Hardware Configuration
//!
//! Where the codec lives on the ISA bus. Sound cards of this class announce
//! themselves through an environment variable in the form
//! `base(hex),irq,dma`, e.g. `WSS=530,5,1`.

use crate::error::{AudioError, AudioResult};
use crate::wav::DEFAULT_SCAN_WINDOW;
use wss_hal::interrupts::irq_vector;
use wss_hal::pic::CASCADE_IRQ;

/// Name of the environment variable holding the hardware configuration
pub const ENV_VAR: &str = "WSS";

/// Default codec base I/O address
pub const DEFAULT_BASE: u16 = 0x530;
/// Default codec IRQ line
pub const DEFAULT_IRQ: u8 = 5;
/// Default 8-bit DMA channel
pub const DEFAULT_DMA: u8 = 1;

/// Codec resources on the ISA bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WssConfig {
    /// Base I/O address
    pub base: u16,
    /// IRQ line (0-15, not the cascade line)
    pub irq: u8,
    /// DMA channel (0-3)
    pub dma: u8,
}

impl Default for WssConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            irq: DEFAULT_IRQ,
            dma: DEFAULT_DMA,
        }
    }
}

impl WssConfig {
    /// Parse `base(hex),irq,dma`
    pub fn parse(value: &str) -> AudioResult<Self> {
        let mut fields = value.split(',').map(str::trim);

        let base = fields.next().ok_or(AudioError::invalid_argument("missing base address"))?;
        let base = base
            .strip_prefix("0x")
            .or_else(|| base.strip_prefix("0X"))
            .unwrap_or(base);
        let base = u16::from_str_radix(base, 16)
            .map_err(|_| AudioError::invalid_argument("base address"))?;

        let irq = fields
            .next()
            .and_then(|f| f.parse::<u8>().ok())
            .ok_or(AudioError::invalid_argument("irq"))?;
        let dma = fields
            .next()
            .and_then(|f| f.parse::<u8>().ok())
            .ok_or(AudioError::invalid_argument("dma channel"))?;

        if fields.next().is_some() {
            return Err(AudioError::invalid_argument("trailing fields"));
        }

        let config = Self { base, irq, dma };
        config.validate()?;
        Ok(config)
    }

    /// Check that every resource is usable
    pub fn validate(&self) -> AudioResult<()> {
        if irq_vector(self.irq).is_none() || self.irq == CASCADE_IRQ {
            return Err(AudioError::invalid_argument("irq"));
        }
        if self.dma > 3 {
            return Err(AudioError::invalid_argument("dma channel"));
        }
        Ok(())
    }

    /// Resolve the configuration from an optional variable value
    ///
    /// Absence or a malformed value falls back to the defaults.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value {
            None => Self::default(),
            Some(value) => match Self::parse(value) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("{}={:?} ignored ({}), using defaults", ENV_VAR, value, err);
                    Self::default()
                }
            },
        }
    }

    /// Resolve the configuration from the process environment
    #[cfg(feature = "std")]
    pub fn from_env() -> Self {
        let value = std::env::var(ENV_VAR).ok();
        Self::from_env_value(value.as_deref())
    }
}

/// Playback engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Codec resources
    pub wss: WssConfig,
    /// Bytes of each file searched for the `data` tag
    pub scan_window: usize,
    /// Volume applied when playback starts, in percent
    pub initial_volume: u8,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            wss: WssConfig::default(),
            scan_window: DEFAULT_SCAN_WINDOW,
            initial_volume: 100,
        }
    }
}

impl PlayerConfig {
    /// Default engine settings on the given codec resources
    pub fn with_wss(wss: WssConfig) -> Self {
        Self {
            wss,
            ..Self::default()
        }
    }
}
