//! A `no_std` driver for the DRV8825 stepper motor driver.
//!
//! This driver controls the DRV8825 using GPIO pins for step, direction,
//! enable, and microstep configuration, plus an axis-pulse emitter
//! implementing the DIR→wait→STEP-low→wait→STEP-high sequence the DRV8825's
//! datasheet requires (20µs minimum setup/hold around the STEP edge).

#![no_std]

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};

/// Minimum DIR setup time and STEP pulse width the DRV8825 datasheet
/// requires, in microseconds.
pub const STEP_PULSE_SETUP_US: u32 = 20;

/// Represents the microstepping resolution for the DRV8825.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Microsteps {
    Full,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

/// Represents the motor direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A DRV8825 driver instance: enable and microstep-select pins, generic over
/// any `embedded-hal` `OutputPin`.
pub struct Drv8825<EN, M0, M1, M2> {
    enable: EN,
    m0: M0,
    m1: M1,
    m2: M2,
}

impl<EN, M0, M1, M2, E> Drv8825<EN, M0, M1, M2>
where
    EN: OutputPin<Error = E>,
    M0: OutputPin<Error = E>,
    M1: OutputPin<Error = E>,
    M2: OutputPin<Error = E>,
{
    /// Creates a new DRV8825 driver from its control pins.
    pub fn new(enable: EN, m0: M0, m1: M1, m2: M2) -> Self {
        Self { enable, m0, m1, m2 }
    }

    /// Enables the driver (by pulling the nENABLE pin low).
    pub fn enable(&mut self) -> Result<(), E> {
        self.enable.set_low()
    }

    /// Disables the driver (by pulling the nENABLE pin high).
    pub fn disable(&mut self) -> Result<(), E> {
        self.enable.set_high()
    }

    /// Sets the microstepping resolution.
    pub fn set_microsteps(&mut self, microsteps: Microsteps) -> Result<(), E> {
        let (m0, m1, m2) = match microsteps {
            Microsteps::Full => (PinState::Low, PinState::Low, PinState::Low),
            Microsteps::Half => (PinState::High, PinState::Low, PinState::Low),
            Microsteps::Quarter => (PinState::Low, PinState::High, PinState::Low),
            Microsteps::Eighth => (PinState::High, PinState::High, PinState::Low),
            Microsteps::Sixteenth => (PinState::Low, PinState::Low, PinState::High),
            Microsteps::ThirtySecond => (PinState::High, PinState::Low, PinState::High),
        };
        self.m0.set_state(m0)?;
        self.m1.set_state(m1)?;
        self.m2.set_state(m2)
    }
}

/// One axis's DIR+STEP pulse emitter. `N` is the number of parallel STEP
/// lines the axis drives (1 for X, 2 for a dual-motor Y gantry wired off the
/// same STEP/DIR signal pair).
pub struct AxisDriver<STEP, DIR, const N: usize> {
    step: [STEP; N],
    dir: DIR,
    invert_dir: bool,
}

impl<STEP, DIR, const N: usize, E> AxisDriver<STEP, DIR, N>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
{
    pub fn new(step: [STEP; N], dir: DIR, invert_dir: bool) -> Self {
        Self { step, dir, invert_dir }
    }

    /// Emits one step pulse in the given direction (`dir >= 0` is forward,
    /// negative is backward, matching the planner's `StepSink` contract).
    ///
    /// Sequence: set DIR, hold 20µs, drive all STEP lines low, hold 20µs,
    /// drive all STEP lines high. The driver latches on the rising edge, so
    /// the low phase is the setup window and the high phase is what the
    /// DRV8825 actually steps on.
    pub fn pulse<D: DelayNs>(&mut self, dir: i32, delay: &mut D) -> Result<(), E> {
        let forward = dir >= 0;
        let level = if forward ^ self.invert_dir { PinState::High } else { PinState::Low };
        self.dir.set_state(level)?;
        delay.delay_us(STEP_PULSE_SETUP_US);
        for step in &mut self.step {
            step.set_low()?;
        }
        delay.delay_us(STEP_PULSE_SETUP_US);
        for step in &mut self.step {
            step.set_high()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction};

    struct NoopDelay;
    impl DelayNs for NoopDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn enable_disable_pulls_nenable_low_then_high() {
        let mut enable = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let m0 = PinMock::new(&[]);
        let m1 = PinMock::new(&[]);
        let m2 = PinMock::new(&[]);

        let mut driver = Drv8825::new(enable.clone(), m0, m1, m2);
        driver.enable().unwrap();
        driver.disable().unwrap();
        enable.done();
    }

    #[test]
    fn set_microsteps_drives_the_mode_pins() {
        let enable = PinMock::new(&[]);
        let mut m0 = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
        let mut m1 = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::Low)]);
        let mut m2 = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);

        let mut driver = Drv8825::new(enable, m0.clone(), m1.clone(), m2.clone());
        driver.set_microsteps(Microsteps::ThirtySecond).unwrap();
        driver.set_microsteps(Microsteps::Full).unwrap();

        m0.done();
        m1.done();
        m2.done();
    }

    #[test]
    fn single_step_line_axis_pulses_dir_then_low_then_high() {
        let dir = PinMock::new(&[Transaction::set(State::High)]);
        let step = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let mut axis = AxisDriver::new([step.clone()], dir.clone(), false);
        let mut delay = NoopDelay;
        axis.pulse(1, &mut delay).unwrap();
        dir.done();
        step.done();
    }

    #[test]
    fn dual_step_line_axis_pulses_both_lines_together() {
        let dir = PinMock::new(&[Transaction::set(State::Low)]);
        let step_a = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let step_b = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let mut axis = AxisDriver::new([step_a.clone(), step_b.clone()], dir.clone(), false);
        let mut delay = NoopDelay;
        axis.pulse(-1, &mut delay).unwrap();
        dir.done();
        step_a.done();
        step_b.done();
    }

    #[test]
    fn invert_dir_flips_the_forward_level() {
        let dir = PinMock::new(&[Transaction::set(State::Low)]);
        let step = PinMock::new(&[Transaction::set(State::Low), Transaction::set(State::High)]);
        let mut axis = AxisDriver::new([step.clone()], dir.clone(), true);
        let mut delay = NoopDelay;
        axis.pulse(1, &mut delay).unwrap();
        dir.done();
        step.done();
    }
}
