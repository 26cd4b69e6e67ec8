//! Board-agnostic core logic for Synchroma panel nodes
//!
//! This crate contains all application logic that does not depend on a
//! specific chip or network stack:
//!
//! - Hardware abstraction traits (network platform, datagram socket,
//!   clocks, panel DMA bus)
//! - Network formation state machine (scan, join-or-create, self-heal)
//! - Frame-sync protocol poll engine
//! - Panel driver core: DMA ring ownership and waveform building
//! - Cycle-accurate timing primitive for the fallback output mode
//! - Fixed frame arena
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod formation;
pub mod frame;
pub mod panel;
pub mod sync;
pub mod timing;
pub mod traits;
