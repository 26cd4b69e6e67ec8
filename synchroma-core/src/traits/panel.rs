//! Panel output peripheral abstractions

/// DMA-capable parallel output peripheral.
///
/// The hardware owns a fixed ring of sample buffers, one per transfer
/// descriptor, and reads them in order forever. The core never touches
/// the buffers directly; it asks the bus to fill a slot it has proven
/// Free via [`crate::panel::ring::DmaRing`].
pub trait PanelBus {
    /// Number of buffers (= descriptors) in the hardware ring
    fn buffer_count(&self) -> usize;

    /// Samples per buffer
    fn buffer_len(&self) -> usize;

    /// Index of the descriptor the hardware most recently completed.
    ///
    /// This is the only handoff signal the hardware exposes; software
    /// polls it to learn which buffers have become reusable.
    fn completed_marker(&self) -> usize;

    /// Copy one full buffer of samples into slot `slot`.
    ///
    /// `samples.len()` must equal [`Self::buffer_len`]; the implementation
    /// performs the copy with accesses the compiler cannot reorder or
    /// elide, since the buffer is concurrently visible to hardware.
    fn fill(&mut self, slot: usize, samples: &[u16]);
}

/// Direct output-line control for the fallback (no-DMA) mode.
///
/// Bit `k` of `levels` is the logic level of output line `k`, the same
/// encoding the DMA samples use.
pub trait LineOutput {
    fn set_levels(&mut self, levels: u16);
}
