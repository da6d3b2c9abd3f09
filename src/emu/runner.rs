use super::{Chip8, Chip8Error, Chip8Result, Display};
use crate::u4;

pub const DEFAULT_CPU_HZ: f32 = 700.0;
pub const TIMER_HZ: f32 = 60.0;

const TIMER_TIME_STEP: f32 = 1.0 / TIMER_HZ;

/// High-level emulator runner that manages timing internally.
///
/// Interleaves `Chip8::step` at the configured CPU rate with `Chip8::tick_timers` at 60Hz.
pub struct Chip8Runner {
    chip8: Chip8,
    cpu_time_step: f32,
    cpu_dt_accumulator: f32,
    timer_dt_accumulator: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chip8RunnerResult {
    Ok,
    Halted,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8) -> Self {
        Self::with_cpu_hz(chip8, DEFAULT_CPU_HZ)
    }

    /// Creates a runner executing `cpu_hz` instructions per second.
    ///
    /// Panics if `cpu_hz` is not a finite, strictly positive rate.
    pub fn with_cpu_hz(chip8: Chip8, cpu_hz: f32) -> Self {
        assert!(
            cpu_hz.is_finite() && cpu_hz > 0.0,
            "CPU frequency must be finite and positive"
        );
        Self {
            chip8,
            cpu_time_step: 1.0 / cpu_hz,
            cpu_dt_accumulator: 0.0,
            timer_dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time, handles both CPU and timer cycles.
    ///
    /// Runs as many CPU cycles and timer updates as needed based on the elapsed time `dt`.
    /// Returns early if a frame has to be rendered before the next CPU cycle.
    pub fn update(&mut self, dt: f32) -> Result<Chip8RunnerResult, Chip8Error> {
        self.cpu_dt_accumulator += dt;
        self.timer_dt_accumulator += dt;

        while self.timer_dt_accumulator >= TIMER_TIME_STEP {
            self.timer_dt_accumulator -= TIMER_TIME_STEP;
            self.chip8.tick_timers();
        }

        while self.cpu_dt_accumulator >= self.cpu_time_step {
            self.cpu_dt_accumulator -= self.cpu_time_step;

            match self.chip8.step()? {
                Chip8Result::WaitForNextFrame => {
                    // If we need to wait for the next frame we stop executing cycles.
                    // We clear the accumulator to avoid "catching up" in the next frame.
                    self.cpu_dt_accumulator = 0.0;
                    break;
                }
                Chip8Result::Halted => {
                    self.cpu_dt_accumulator = 0.0;
                    return Ok(Chip8RunnerResult::Halted);
                }
                Chip8Result::Continue => {}
            }
        }

        Ok(Chip8RunnerResult::Ok)
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn get_display_pixel(&self, y: usize, x: usize) -> bool {
        self.chip8.get_display_pixel(y, x)
    }

    pub fn display(&self) -> &Display<bool> {
        self.chip8.display()
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::chip8::tests::load_program;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn runs_cpu_cycles_proportional_to_dt() {
        // Count up V0 in a tight loop
        let chip8 = load_program(&[0x7001, 0x1200]);
        let mut runner = Chip8Runner::with_cpu_hz(chip8, 600.0);

        runner.update(FRAME * 1.01).unwrap();

        // 10 instructions per frame, half of them increments
        assert_eq!(runner.chip8_ref().registers()[0], 5);
    }

    #[test]
    #[should_panic(expected = "finite and positive")]
    fn rejects_infinite_cpu_rate() {
        let chip8 = load_program(&[0x7001, 0x1200]);
        let _ = Chip8Runner::with_cpu_hz(chip8, f32::INFINITY);
    }

    #[test]
    #[should_panic(expected = "finite and positive")]
    fn rejects_zero_cpu_rate() {
        let chip8 = load_program(&[0x7001, 0x1200]);
        let _ = Chip8Runner::with_cpu_hz(chip8, 0.0);
    }

    #[test]
    fn timers_tick_at_sixty_hz() {
        let chip8 = load_program(&[0x603C, 0xF015, 0x1204]);
        let mut runner = Chip8Runner::new(chip8);

        runner.update(FRAME * 0.5).unwrap();
        assert_eq!(runner.chip8_ref().delay_timer(), 60);

        for _ in 0..30 {
            runner.update(FRAME).unwrap();
        }
        let remaining = runner.chip8_ref().delay_timer();
        assert!((29..=31).contains(&remaining), "delay timer at {remaining}");
    }

    #[test]
    fn draw_ends_the_frame_batch() {
        // Draw, then loop incrementing V1
        let chip8 = load_program(&[0xD001, 0x7101, 0x1202]);
        let mut runner = Chip8Runner::with_cpu_hz(chip8, 6000.0);

        runner.update(FRAME).unwrap();
        assert_eq!(runner.chip8_ref().registers()[1], 0);
        assert_eq!(runner.chip8_ref().pc(), 0x202);

        runner.update(FRAME).unwrap();
        assert!(runner.chip8_ref().registers()[1] > 0);
    }

    #[test]
    fn reports_halt() {
        let chip8 = load_program(&[0x00FD]);
        let mut runner = Chip8Runner::new(chip8);
        assert_eq!(runner.update(FRAME).unwrap(), Chip8RunnerResult::Halted);
    }

    #[test]
    fn propagates_fatal_errors() {
        let chip8 = load_program(&[0x00EE]);
        let mut runner = Chip8Runner::new(chip8);
        assert_eq!(
            runner.update(FRAME).unwrap_err(),
            Chip8Error::StackUnderflow { pc: 0x200 }
        );
    }

    #[test]
    fn forwards_key_events() {
        let chip8 = load_program(&[0xF50A, 0x1202]);
        let mut runner = Chip8Runner::new(chip8);

        runner.update(FRAME).unwrap();
        runner.set_key(u4::new(0xC), true);
        runner.update(FRAME).unwrap();

        assert_eq!(runner.chip8_ref().registers()[5], 0xC);
        assert!(runner.chip8_ref().keypad()[0xC]);
    }
}
