//! Single-writer event cells
//!
//! The platform's WiFi stack delivers link events (up, down, scan done)
//! from its own execution context. Each cell here has exactly one writer
//! (the event context) and one reader (the main loop), so plain atomic
//! loads and stores suffice; no lock is ever taken. The main loop's only
//! blocking behavior is a spin-with-yield wait on these cells.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// One-shot event flag. Raised by the event context, consumed by the
/// main context.
#[derive(Debug, Default)]
pub struct EventFlag(AtomicBool);

impl EventFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Raise the flag (event context)
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check without consuming (main context)
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Consume the flag, returning whether it was raised (main context)
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// Outcome of an asynchronous scan, as reported by the event context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanOutcome {
    Pending,
    Failed,
    Done,
}

/// Cell holding the latest scan outcome. Single writer, single reader.
#[derive(Debug)]
pub struct ScanCell(AtomicU8);

const SCAN_PENDING: u8 = 0;
const SCAN_FAILED: u8 = 1;
const SCAN_DONE: u8 = 2;

impl Default for ScanCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(SCAN_PENDING))
    }

    /// Reset before starting a scan (main context, before the scan is
    /// handed to the platform, so the single-writer rule holds)
    pub fn reset(&self) {
        self.0.store(SCAN_PENDING, Ordering::Release);
    }

    /// Record the outcome (event context)
    pub fn report(&self, outcome: ScanOutcome) {
        let raw = match outcome {
            ScanOutcome::Pending => SCAN_PENDING,
            ScanOutcome::Failed => SCAN_FAILED,
            ScanOutcome::Done => SCAN_DONE,
        };
        self.0.store(raw, Ordering::Release);
    }

    /// Read the current outcome (main context)
    pub fn get(&self) -> ScanOutcome {
        match self.0.load(Ordering::Acquire) {
            SCAN_FAILED => ScanOutcome::Failed,
            SCAN_DONE => ScanOutcome::Done,
            _ => ScanOutcome::Pending,
        }
    }
}

/// The link-event flags the formation wait loops observe
#[derive(Debug, Default)]
pub struct LinkFlags {
    /// Interface came up (station started or AP started)
    pub up: EventFlag,
    /// Interface went down
    pub down: EventFlag,
    /// Station associated with the network
    pub joined: EventFlag,
    /// Station lost the network
    pub left: EventFlag,
}

impl LinkFlags {
    pub const fn new() -> Self {
        Self {
            up: EventFlag::new(),
            down: EventFlag::new(),
            joined: EventFlag::new(),
            left: EventFlag::new(),
        }
    }
}
