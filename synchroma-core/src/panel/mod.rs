//! Panel output driver core
//!
//! Turns frame and pattern data into a precisely timed digital waveform.
//! The preferred path precomputes u16 samples whose low bits encode the
//! output-line levels and hands them to a DMA peripheral; hardware paces
//! the output, so software timing jitter cannot reach the lines. The
//! fallback path bit-bangs the lines inside an interrupts-off window.
//!
//! - [`ring`]: DMA buffer ownership (`Free`/`Filled`/`InFlight`)
//! - [`waveform`]: sample building, chunking, zero-pad and silence tail
//! - [`bitbang`]: calibrated busy-wait fallback

pub mod bitbang;
pub mod ring;
pub mod waveform;

pub use ring::{DmaRing, SlotGrant, SlotState};
pub use waveform::WaveformWriter;

/// Upper bound on samples per DMA buffer the writer can assemble
pub const MAX_DMA_BUFFER_LEN: usize = 1024;

/// Fixed-cadence re-emission for the simple output mode
#[derive(Debug, Clone, Copy)]
pub struct RefreshPacer {
    period_ms: u32,
    last_ms: Option<u64>,
}

impl RefreshPacer {
    pub fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    /// True once per period; the first call is always due
    pub fn due(&mut self, now_ms: u64) -> bool {
        let fire = match self.last_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.period_ms as u64,
        };
        if fire {
            self.last_ms = Some(now_ms);
        }
        fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_fires_once_per_period() {
        let mut pacer = RefreshPacer::new(1000);
        assert!(pacer.due(5));
        assert!(!pacer.due(500));
        assert!(!pacer.due(1004));
        assert!(pacer.due(1005));
        assert!(!pacer.due(1900));
        assert!(pacer.due(2005));
    }

    #[test]
    fn test_pacer_repolled_at_time_zero() {
        let mut pacer = RefreshPacer::new(1000);
        assert!(pacer.due(0));
        assert!(!pacer.due(0));
        assert!(!pacer.due(999));
        assert!(pacer.due(1000));
    }

    #[test]
    fn test_pacer_tolerates_clock_step_backwards() {
        let mut pacer = RefreshPacer::new(1000);
        assert!(pacer.due(2000));
        assert!(!pacer.due(1500));
    }
}
