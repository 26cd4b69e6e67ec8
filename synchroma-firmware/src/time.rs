//! Time, delay, and randomness backends

use esp_hal::delay::Delay;
use esp_hal::rng::Rng;

use synchroma_core::traits::{Clock, CycleCounter, Delay as DelayTrait, JitterSource, TimedRegion};

/// Milliseconds since boot, from the esp-hal system timer
#[derive(Clone, Copy)]
pub struct Uptime;

impl Clock for Uptime {
    fn now_ms(&self) -> u64 {
        esp_hal::time::now().duration_since_epoch().to_millis()
    }
}

/// Blocking delay over the esp-hal delay driver
#[derive(Clone, Copy)]
pub struct HalDelay(pub Delay);

impl DelayTrait for HalDelay {
    fn delay_us(&mut self, us: u32) {
        self.0.delay_micros(us);
    }
}

/// The Xtensa CCOUNT register, one tick per CPU cycle
#[derive(Clone, Copy)]
pub struct CpuCycles;

impl CycleCounter for CpuCycles {
    fn count(&self) -> u32 {
        esp_hal::xtensa_lx::timer::get_cycle_count()
    }
}

/// Interrupts-off window for the bit-banged output path
pub struct IrqOff;

impl TimedRegion for IrqOff {
    fn with_disabled<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_| f())
    }
}

/// Ping-reply jitter from the hardware RNG
#[derive(Clone, Copy)]
pub struct HwJitter(pub Rng);

impl JitterSource for HwJitter {
    fn jitter_us(&mut self, bound_us: u32) -> u32 {
        self.0.random() % bound_us.max(1)
    }
}
