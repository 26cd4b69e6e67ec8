//! DMA buffer ring with explicit ownership states
//!
//! The hardware cycles through N descriptors forever and exposes exactly
//! one handoff signal: the index of the descriptor it most recently
//! completed. Software mirrors the ring here and tracks per-slot
//! ownership so a buffer is only ever written while it is `Free` and
//! only ever read by hardware while `Filled`/`InFlight`.
//!
//! Writing a slot requires a [`SlotGrant`], a move-only token handed out
//! by [`DmaRing::acquire`] for the next slot proven free. At most one
//! grant exists at a time, so software cannot hold two buffers open or
//! touch a buffer the hardware still owns.

/// Ownership state of one DMA buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotState {
    /// Software may write; hardware has consumed any previous contents
    Free,
    /// Written and queued; hardware has not reached it yet
    Filled,
    /// Hardware is reading it now
    InFlight,
}

/// Exclusive right to fill one slot. Move-only; surrender via
/// [`DmaRing::commit`].
#[derive(Debug)]
pub struct SlotGrant {
    index: usize,
}

impl SlotGrant {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Software-side mirror of the hardware descriptor ring
#[derive(Debug)]
pub struct DmaRing<const N: usize> {
    slots: [SlotState; N],
    /// Next slot software will fill
    next_write: usize,
    /// Last completed descriptor observed from hardware
    completed: usize,
    /// An acquire is outstanding; no second grant until commit
    grant_outstanding: bool,
}

impl<const N: usize> Default for DmaRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DmaRing<N> {
    pub fn new() -> Self {
        assert!(N >= 2);
        Self {
            slots: [SlotState::Free; N],
            next_write: 0,
            // Hardware starts at descriptor 0, so "last completed" is the
            // slot before it.
            completed: N - 1,
            grant_outstanding: false,
        }
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.slots[slot]
    }

    /// Fold the hardware's completed-descriptor marker into the ring.
    ///
    /// Every slot the marker passed has been consumed and becomes free.
    /// A free slot passed over means the hardware re-sent stale or
    /// silence data - the erratum the waveform writer pads against - and
    /// stays free.
    pub fn reclaim(&mut self, marker: usize) {
        assert!(marker < N);

        while self.completed != marker {
            self.completed = (self.completed + 1) % N;
            self.slots[self.completed] = SlotState::Free;
        }

        // The descriptor after the completed one is being read now
        let current = (self.completed + 1) % N;
        if self.slots[current] == SlotState::Filled {
            self.slots[current] = SlotState::InFlight;
        }
    }

    /// Grant the next slot if it is free and no grant is outstanding.
    ///
    /// Returns `None` while the hardware still owns the slot; callers
    /// poll [`Self::reclaim`] and retry, paced by the transfer rate.
    pub fn acquire(&mut self) -> Option<SlotGrant> {
        if self.grant_outstanding || self.slots[self.next_write] != SlotState::Free {
            return None;
        }
        self.grant_outstanding = true;
        Some(SlotGrant {
            index: self.next_write,
        })
    }

    /// Hand a written slot to the hardware
    pub fn commit(&mut self, grant: SlotGrant) {
        let i = grant.index;
        self.grant_outstanding = false;
        self.next_write = (i + 1) % N;

        // If the hardware's read position is already here, it is
        // consuming the buffer as of now.
        self.slots[i] = if (self.completed + 1) % N == i {
            SlotState::InFlight
        } else {
            SlotState::Filled
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ring_grants_slot_zero() {
        let mut ring: DmaRing<2> = DmaRing::new();
        let grant = ring.acquire().unwrap();
        assert_eq!(grant.index(), 0);
    }

    #[test]
    fn test_single_outstanding_grant() {
        let mut ring: DmaRing<4> = DmaRing::new();
        let grant = ring.acquire().unwrap();
        assert!(ring.acquire().is_none());
        ring.commit(grant);
        assert_eq!(ring.acquire().unwrap().index(), 1);
    }

    #[test]
    fn test_committed_head_slot_is_in_flight() {
        let mut ring: DmaRing<2> = DmaRing::new();
        let grant = ring.acquire().unwrap();
        ring.commit(grant);
        // Hardware read position was slot 0 already
        assert_eq!(ring.state(0), SlotState::InFlight);

        let grant = ring.acquire().unwrap();
        ring.commit(grant);
        assert_eq!(ring.state(1), SlotState::Filled);
    }

    #[test]
    fn test_full_ring_blocks_until_marker_advances() {
        let mut ring: DmaRing<2> = DmaRing::new();
        let grant = ring.acquire().unwrap();
        ring.commit(grant);
        let grant = ring.acquire().unwrap();
        ring.commit(grant);

        // Both slots hardware-owned; nothing to grant
        assert!(ring.acquire().is_none());

        // Hardware completes descriptor 0
        ring.reclaim(0);
        assert_eq!(ring.state(0), SlotState::Free);
        assert_eq!(ring.state(1), SlotState::InFlight);
        assert_eq!(ring.acquire().unwrap().index(), 0);
    }

    #[test]
    fn test_marker_wraparound() {
        let mut ring: DmaRing<2> = DmaRing::new();
        for _ in 0..3 {
            let grant = ring.acquire().unwrap();
            let filled = grant.index();
            ring.commit(grant);
            ring.reclaim(filled);
        }
    }

    #[test]
    fn test_reclaim_over_free_slots_is_harmless() {
        // Free-running hardware passes empty slots between payloads
        let mut ring: DmaRing<4> = DmaRing::new();
        ring.reclaim(1);
        ring.reclaim(3);
        for slot in 0..4 {
            assert_eq!(ring.state(slot), SlotState::Free);
        }
        assert_eq!(ring.acquire().unwrap().index(), 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_marker_is_contract_violation() {
        let mut ring: DmaRing<2> = DmaRing::new();
        ring.reclaim(2);
    }
}
