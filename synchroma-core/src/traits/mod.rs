//! Hardware abstraction traits
//!
//! These traits define what the core logic needs from the platform. The
//! firmware crate implements them over the chip HAL and WiFi stack; host
//! tests implement them with mocks.

pub mod diag;
pub mod io;
pub mod net;
pub mod panel;
pub mod time;

pub use diag::Diagnostics;
pub use io::{Datagrams, Peer, SendError};
pub use net::{NetError, NetworkPlatform};
pub use panel::{LineOutput, PanelBus};
pub use time::{Clock, CycleCounter, Delay, JitterSource, TimedRegion};
