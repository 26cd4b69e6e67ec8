//! Waveform building and DMA handoff
//!
//! A waveform is a stream of u16 samples emitted at the configured sample
//! period; bit `k` of each sample is the logic level of output line `k`.
//! The writer chunks a stream across the DMA ring, zero-padding the last
//! chunk to a full buffer, then queues one ring's worth of all-zero
//! buffers behind it: the peripheral does not clear stale descriptor data
//! between transfers, so without the silence tail it would re-emit the
//! end of the payload forever.

use heapless::Vec;

use super::ring::DmaRing;
use super::MAX_DMA_BUFFER_LEN;
use crate::frame::Frame;
use crate::traits::PanelBus;

/// Output line 0: serial frame data
pub const LINE_DATA: u16 = 1 << 0;
/// Output line 1: bit clock
pub const LINE_CLOCK: u16 = 1 << 1;

/// Chunks sample streams into the DMA ring of a [`PanelBus`]
pub struct WaveformWriter<'a, B: PanelBus, const N: usize> {
    bus: &'a mut B,
    ring: &'a mut DmaRing<N>,
}

impl<'a, B: PanelBus, const N: usize> WaveformWriter<'a, B, N> {
    /// # Panics
    ///
    /// Panics if the bus geometry violates the hardware contract: ring
    /// mirror and descriptor count must match, and buffers must be
    /// non-empty, word-aligned (even sample count) and within
    /// [`MAX_DMA_BUFFER_LEN`].
    pub fn new(bus: &'a mut B, ring: &'a mut DmaRing<N>) -> Self {
        assert_eq!(bus.buffer_count(), N);
        let len = bus.buffer_len();
        assert!(len > 0 && len <= MAX_DMA_BUFFER_LEN);
        // u16 samples; transfers are whole 32-bit words
        assert_eq!(len % 2, 0);

        Self { bus, ring }
    }

    /// Emit one waveform: the sample stream followed by the silence tail.
    ///
    /// Blocks on the ring while the hardware drains buffers; the spin is
    /// bounded by the transfer rate.
    pub fn write(&mut self, samples: impl Iterator<Item = u16>) {
        let len = self.bus.buffer_len();
        let mut chunk: Vec<u16, MAX_DMA_BUFFER_LEN> = Vec::new();

        for sample in samples {
            // Capacity proven in new()
            let _ = chunk.push(sample);
            if chunk.len() == len {
                self.flush(&chunk);
                chunk.clear();
            }
        }

        // Residual shorter than one buffer: pad with zeros to full size
        if !chunk.is_empty() {
            while chunk.len() < len {
                let _ = chunk.push(0);
            }
            self.flush(&chunk);
        }

        // Erratum workaround: one ring's worth of silence
        chunk.clear();
        while chunk.len() < len {
            let _ = chunk.push(0);
        }
        for _ in 0..N {
            self.flush(&chunk);
        }
    }

    fn flush(&mut self, chunk: &[u16]) {
        loop {
            self.ring.reclaim(self.bus.completed_marker());
            if let Some(grant) = self.ring.acquire() {
                self.bus.fill(grant.index(), chunk);
                self.ring.commit(grant);
                return;
            }
            core::hint::spin_loop();
        }
    }
}

/// Test pattern: 1 ms of output where line 0 flips every sample and
/// line 1 every second sample
pub fn test_pattern(sample_rate_hz: u32) -> impl Iterator<Item = u16> {
    let count = sample_rate_hz / 1000;
    (0..count).map(|i| (i & 3) as u16)
}

/// Serialize a frame onto the output lines: each pixel's 24 RGB bits
/// MSB-first on the data line, the clock line toggling once per bit
pub fn frame_waveform(frame: &Frame) -> impl Iterator<Item = u16> + '_ {
    frame.iter_pixels().flat_map(|px| {
        let word = (px.r as u32) << 16 | (px.g as u32) << 8 | px.b as u32;
        (0..24).rev().flat_map(move |bit| {
            let data = ((word >> bit) & 1) as u16 * LINE_DATA;
            [data, data | LINE_CLOCK]
        })
    })
}
