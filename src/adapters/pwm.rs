//! Rocker motor driver over `embedded-hal` PWM channels.
//!
//! Two channels feed the rocker's motor controller:
//! - amplitude: duty = amplitude percent of the cell
//! - rate: duty proportional to the rocking frequency, full scale at the
//!   fastest grid frequency
//!
//! The driver is generic over [`SetDutyCycle`], so any HAL's PWM channel
//! (or a mock in tests) plugs in unchanged. [`SysfsPwm`] provides one for
//! Linux boards that expose their PWM controller under `/sys/class/pwm`;
//! `lullaby node --role motor --pwm-chip <dir>` drives channels 0 and 1 of
//! that chip.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use embedded_hal::pwm::{self, ErrorKind, ErrorType, SetDutyCycle};
use log::{error, info};

use crate::app::ports::ActuatorPort;
use crate::control::grid::{FREQUENCY_HZ, GridCell, MAX_INDEX};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RockerState {
    Stopped,
    Rocking(GridCell),
}

pub struct PwmRocker<A, R> {
    amplitude: A,
    rate: R,
    state: RockerState,
}

impl<A: SetDutyCycle, R: SetDutyCycle> PwmRocker<A, R> {
    /// Wrap two channels. Both are driven to zero first.
    pub fn new(amplitude: A, rate: R) -> Self {
        let mut rocker = Self {
            amplitude,
            rate,
            state: RockerState::Stopped,
        };
        rocker.stop();
        rocker
    }

    pub fn state(&self) -> RockerState {
        self.state
    }

    pub fn stop(&mut self) {
        if let Err(e) = self.amplitude.set_duty_cycle_fully_off() {
            error!("rocker: amplitude channel stop failed: {e:?}");
        }
        if let Err(e) = self.rate.set_duty_cycle_fully_off() {
            error!("rocker: rate channel stop failed: {e:?}");
        }
        self.state = RockerState::Stopped;
    }

    /// Rate duty in percent for `cell`.
    pub fn rate_percent(cell: GridCell) -> u8 {
        let top = FREQUENCY_HZ[usize::from(MAX_INDEX)];
        ((cell.frequency_hz() / top) * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn drive(&mut self, cell: GridCell) -> bool {
        let amp = self.amplitude.set_duty_cycle_percent(cell.amplitude_percent());
        let rate = self.rate.set_duty_cycle_percent(Self::rate_percent(cell));
        match (amp, rate) {
            (Ok(()), Ok(())) => true,
            (amp, rate) => {
                error!("rocker: failed to drive {cell}: amplitude={amp:?} rate={rate:?}");
                false
            }
        }
    }
}

impl<A: SetDutyCycle, R: SetDutyCycle> ActuatorPort for PwmRocker<A, R> {
    fn apply_actuation(&mut self, cell: GridCell) {
        if self.drive(cell) {
            info!("rocker: {cell}");
            self.state = RockerState::Rocking(cell);
        } else {
            // Never leave the motor at a half-applied setting.
            self.stop();
        }
    }
}

// ── Linux sysfs channel ───────────────────────────────────────

/// A sysfs write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysfsPwmError(pub io::ErrorKind);

impl pwm::Error for SysfsPwmError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One exported channel of a sysfs PWM chip.
#[derive(Debug)]
pub struct SysfsPwm {
    dir: PathBuf,
    period_ns: u64,
}

impl SysfsPwm {
    /// Export `channel` of `chip` (if not already exported), program
    /// `period` and enable it at zero duty.
    pub fn open(chip: impl AsRef<Path>, channel: u32, period: Duration) -> io::Result<Self> {
        let chip = chip.as_ref();
        let dir = chip.join(format!("pwm{channel}"));
        if !dir.exists() {
            fs::write(chip.join("export"), channel.to_string())?;
        }
        let period_ns = u64::try_from(period.as_nanos())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "PWM period too long"))?;
        // Duty may never exceed the period, so clear it first.
        fs::write(dir.join("duty_cycle"), "0")?;
        fs::write(dir.join("period"), period_ns.to_string())?;
        fs::write(dir.join("enable"), "1")?;
        info!("pwm: {} at {period_ns} ns", dir.display());
        Ok(Self { dir, period_ns })
    }
}

impl ErrorType for SysfsPwm {
    type Error = SysfsPwmError;
}

impl SetDutyCycle for SysfsPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), SysfsPwmError> {
        let ns = self.period_ns * u64::from(duty) / u64::from(u16::MAX);
        fs::write(self.dir.join("duty_cycle"), ns.to_string()).map_err(|e| SysfsPwmError(e.kind()))
    }
}
