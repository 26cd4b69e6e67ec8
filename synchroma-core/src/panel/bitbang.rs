//! Fallback output mode (no DMA)
//!
//! Drives the output lines directly, pacing edges with the calibrated
//! cycle counter. The whole sequence runs inside one hardware-timed
//! region: interrupts stay off from the first edge to the last, which is
//! the only way software pacing holds sub-microsecond tolerances. The
//! DMA mode needs none of this and is preferred wherever the peripheral
//! is available; this path exists for lines the routing matrix cannot
//! reach.

use crate::timing::{busy_wait, ns_to_cycles, MAX_TIMED_NS};
use crate::traits::{CycleCounter, LineOutput, TimedRegion};

/// One step of a timed sequence: set the lines, hold the levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Edge {
    /// Bit `k` is the level of output line `k`
    pub levels: u16,
    /// How long to hold before the next edge, nanoseconds
    pub hold_ns: u32,
}

/// Emit one timed sequence with interrupts disabled.
///
/// # Panics
///
/// Panics if the sequence's total duration exceeds
/// [`MAX_TIMED_NS`]: the interrupts-off window is a hard design
/// constraint, not a tunable.
pub fn emit<L, C, T>(lines: &mut L, counter: &C, region: &mut T, cpu_hz: u32, edges: &[Edge])
where
    L: LineOutput,
    C: CycleCounter,
    T: TimedRegion,
{
    let total_ns: u64 = edges.iter().map(|e| e.hold_ns as u64).sum();
    assert!(total_ns <= MAX_TIMED_NS as u64);

    region.with_disabled(|| {
        for edge in edges {
            lines.set_levels(edge.levels);
            let start = counter.count();
            busy_wait(counter, start, ns_to_cycles(edge.hold_ns, cpu_hz));
        }
    });
}
