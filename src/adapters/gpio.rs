//! GPIO adapter — the only module that touches real pins.
//!
//! Implements [`GpioPort`] and [`DelayPort`] over ESP-IDF pin drivers.
//! On non-espidf targets the same type becomes an in-memory simulation
//! with settable input levels and recorded writes, which is what the
//! host-side tests and the simulated main loop drive.

use crate::app::ports::{DelayPort, GpioPort, InputLine, Level, OutputLine};

#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::FreeRtos;
#[cfg(target_os = "espidf")]
use esp_idf_hal::gpio::{AnyIOPin, Input, Output, PinDriver, Pull};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// The two local push-buttons, polled outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonLine {
    /// Momentary manual-reset button.
    Reset,
    /// Flash/boot button, doubles as the factory-reset hold.
    Flash,
}

/// Concrete pin bundle behind the port traits.
pub struct GpioAdapter {
    #[cfg(target_os = "espidf")]
    heartbeat: PinDriver<'static, AnyIOPin, Input>,
    #[cfg(target_os = "espidf")]
    power_sense: PinDriver<'static, AnyIOPin, Input>,
    #[cfg(target_os = "espidf")]
    reset_out: PinDriver<'static, AnyIOPin, Output>,
    #[cfg(target_os = "espidf")]
    power_out: PinDriver<'static, AnyIOPin, Output>,
    #[cfg(target_os = "espidf")]
    reset_button: PinDriver<'static, AnyIOPin, Input>,
    #[cfg(target_os = "espidf")]
    flash_button: PinDriver<'static, AnyIOPin, Input>,

    #[cfg(not(target_os = "espidf"))]
    pub sim: SimPins,
}

/// Simulated pin state for host builds. Inputs are set by the test or
/// the simulation driver; writes and delays are recorded.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimPins {
    pub heartbeat: Level,
    pub power_sense: Level,
    /// Buttons are active-low; released reads `High`.
    pub reset_button: Level,
    pub flash_button: Level,
    pub writes: Vec<(OutputLine, Level)>,
    pub delayed_ms: u64,
}

#[cfg(target_os = "espidf")]
impl GpioAdapter {
    /// Take ownership of the six watchdog pins and configure them.
    /// Outputs start released; buttons get internal pull-ups.
    pub fn new(
        heartbeat: AnyIOPin,
        power_sense: AnyIOPin,
        reset_out: AnyIOPin,
        power_out: AnyIOPin,
        reset_button: AnyIOPin,
        flash_button: AnyIOPin,
    ) -> Result<Self, EspError> {
        let heartbeat = PinDriver::input(heartbeat)?;
        let power_sense = PinDriver::input(power_sense)?;
        let mut reset_out = PinDriver::output(reset_out)?;
        let mut power_out = PinDriver::output(power_out)?;
        reset_out.set_low()?;
        power_out.set_low()?;
        let mut reset_button = PinDriver::input(reset_button)?;
        reset_button.set_pull(Pull::Up)?;
        let mut flash_button = PinDriver::input(flash_button)?;
        flash_button.set_pull(Pull::Up)?;
        Ok(Self {
            heartbeat,
            power_sense,
            reset_out,
            power_out,
            reset_button,
            flash_button,
        })
    }

    pub fn read_button(&self, line: ButtonLine) -> Level {
        let high = match line {
            ButtonLine::Reset => self.reset_button.is_high(),
            ButtonLine::Flash => self.flash_button.is_high(),
        };
        if high { Level::High } else { Level::Low }
    }
}

#[cfg(not(target_os = "espidf"))]
impl GpioAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sim: SimPins {
                // Released buttons and a live power rail by default.
                reset_button: Level::High,
                flash_button: Level::High,
                power_sense: Level::High,
                ..SimPins::default()
            },
        }
    }

    pub fn read_button(&self, line: ButtonLine) -> Level {
        match line {
            ButtonLine::Reset => self.sim.reset_button,
            ButtonLine::Flash => self.sim.flash_button,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for GpioAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort for GpioAdapter {
    #[cfg(target_os = "espidf")]
    fn read(&mut self, line: InputLine) -> Level {
        let high = match line {
            InputLine::Heartbeat => self.heartbeat.is_high(),
            InputLine::PowerSense => self.power_sense.is_high(),
        };
        if high { Level::High } else { Level::Low }
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, line: InputLine) -> Level {
        match line {
            InputLine::Heartbeat => self.sim.heartbeat,
            InputLine::PowerSense => self.sim.power_sense,
        }
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, line: OutputLine, level: Level) {
        let driver = match line {
            OutputLine::Reset => &mut self.reset_out,
            OutputLine::Power => &mut self.power_out,
        };
        let result = match level {
            Level::High => driver.set_high(),
            Level::Low => driver.set_low(),
        };
        if let Err(err) = result {
            // GpioPort writes are infallible by contract; a failed IDF
            // call here is unrecoverable, so record it and move on.
            log::error!("GPIO write {line:?}={level:?} failed: {err}");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, line: OutputLine, level: Level) {
        self.sim.writes.push((line, level));
    }
}

impl DelayPort for GpioAdapter {
    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        self.sim.delayed_ms += u64::from(ms);
    }
}
