//! Formation state machine
//!
//! Pure transition logic: the runner feeds in what happened, the machine
//! says what to do next. A node with no network is useless, so no event
//! is terminal; every failure path leads back through `Down` to a fresh
//! scan.

use super::Role;

/// Formation states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Looking for the panel network; `attempt` counts completed misses
    Scanning { attempt: u8 },
    /// Network seen; connecting as a station
    Joining,
    /// Network not seen after the configured attempts; becoming the AP
    Creating,
    /// Connected with an assigned role
    Up(Role),
    /// Link torn down; waiting to restart the cycle
    Down,
}

/// Events fed to the machine by the formation runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Scan completed and the network name was seen
    NetworkFound,
    /// Scan completed without seeing the network
    NetworkMissed,
    /// Station connect completed
    JoinSucceeded,
    /// Station connect failed or timed out
    JoinFailed,
    /// Access point is up and configured
    CreateSucceeded,
    /// Access point could not be brought up
    CreateFailed,
    /// An underlying platform call failed
    PlatformFailed,
    /// The established link was lost
    LinkLost,
    /// Begin a fresh cycle from `Down`
    Restart,
}

/// The formation state machine
#[derive(Debug, Clone)]
pub struct FormationMachine {
    state: State,
    max_scan_attempts: u8,
}

impl FormationMachine {
    pub fn new(max_scan_attempts: u8) -> Self {
        Self {
            state: State::Scanning { attempt: 0 },
            max_scan_attempts: max_scan_attempts.max(1),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Process an event and return the new state
    pub fn step(&mut self, event: Event) -> State {
        use Event::*;
        use State::*;

        self.state = match (self.state, event) {
            // Scanning
            (Scanning { .. }, NetworkFound) => Joining,
            (Scanning { attempt }, NetworkMissed) => {
                if attempt + 1 >= self.max_scan_attempts {
                    Creating
                } else {
                    Scanning {
                        attempt: attempt + 1,
                    }
                }
            }
            (Scanning { .. }, PlatformFailed) => Down,

            // Joining
            (Joining, JoinSucceeded) => Up(Role::Station),
            (Joining, JoinFailed | PlatformFailed) => Down,

            // Creating
            (Creating, CreateSucceeded) => Up(Role::AccessPoint),
            (Creating, CreateFailed | PlatformFailed) => Down,

            // Up
            (Up(_), LinkLost | PlatformFailed) => Down,

            // Down
            (Down, Restart) => Scanning { attempt: 0 },

            // Default: stay in current state
            (state, _) => state,
        };

        self.state
    }
}
