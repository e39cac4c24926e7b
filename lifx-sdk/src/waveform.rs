//! Waveform effects
//!
//! A waveform alternates a light between its current color and a target
//! color. `transient` effects return to the original color once the cycles
//! complete; non-transient ones leave the light at the target color.

use std::time::Duration;

use lifx_protocol::{Hsbk, Payload, Waveform};

use crate::error::{Result, SdkError};

/// Parameters of a `SetWaveform` request.
///
/// # Example
///
/// ```rust,ignore
/// let red = Hsbk::new(0, 65535, 65535, 3500)?;
/// let pulse = WaveformEffect::new(red, Waveform::Pulse)
///     .with_period(Duration::from_millis(500))
///     .with_cycles(5.0);
/// light.set_waveform(&pulse, false)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformEffect {
    pub transient: bool,
    pub color: Hsbk,
    /// Length of one cycle
    pub period: Duration,
    pub cycles: f32,
    /// Bias towards either end of the cycle; `0` is balanced
    pub skew_ratio: i16,
    pub waveform: Waveform,
}

impl WaveformEffect {
    /// One transient one-second cycle towards `color`
    pub fn new(color: Hsbk, waveform: Waveform) -> Self {
        Self {
            transient: true,
            color,
            period: Duration::from_secs(1),
            cycles: 1.0,
            skew_ratio: 0,
            waveform,
        }
    }

    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_cycles(mut self, cycles: f32) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn with_skew_ratio(mut self, skew_ratio: i16) -> Self {
        self.skew_ratio = skew_ratio;
        self
    }

    pub(crate) fn to_payload(&self) -> Result<Payload> {
        if !self.cycles.is_finite() || self.cycles <= 0.0 {
            return Err(SdkError::InvalidParameter(format!(
                "'{}' is not a valid cycle count",
                self.cycles
            )));
        }
        self.color.validate()?;
        Ok(Payload::LightSetWaveform {
            transient: self.transient,
            color: self.color,
            period: duration_millis(self.period, "period")?,
            cycles: self.cycles,
            skew_ratio: self.skew_ratio,
            waveform: self.waveform,
        })
    }
}

/// Milliseconds as carried by the `duration` and `period` fields
pub(crate) fn duration_millis(duration: Duration, field: &str) -> Result<u32> {
    u32::try_from(duration.as_millis()).map_err(|_| {
        SdkError::InvalidParameter(format!("'{:?}' is not a valid {}", duration, field))
    })
}
