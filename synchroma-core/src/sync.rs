//! Frame-sync protocol poll engine
//!
//! Consumes at most one datagram per poll and surfaces render work to the
//! runtime; everything else is handled in place. Deliberately stateless
//! per datagram: no sequence tracking, no retransmission, no
//! acknowledgment beyond the ping reply. On the intended single-hop LAN
//! the occasional lost datagram costs one frame, which the next command
//! replaces.

use synchroma_protocol::{Command, PingReply, RoleFlag, MAX_DATAGRAM_SIZE};

use crate::config::SyncConfig;
use crate::formation::Role;
use crate::frame::FrameId;
use crate::traits::{Clock, Datagrams, Delay, Diagnostics, JitterSource};

/// Polls the UDP socket and dispatches sync-protocol commands
pub struct SyncEngine<S, C, J, D> {
    socket: S,
    clock: C,
    jitter: J,
    delay: D,
    role: RoleFlag,
    config: SyncConfig,
    last_stats_ms: u64,
}

impl<S, C, J, D> SyncEngine<S, C, J, D>
where
    S: Datagrams,
    C: Clock,
    J: JitterSource,
    D: Delay,
{
    pub fn new(socket: S, clock: C, jitter: J, delay: D, role: Role, config: SyncConfig) -> Self {
        Self {
            socket,
            clock,
            jitter,
            delay,
            role: role.flag(),
            config,
            last_stats_ms: 0,
        }
    }

    /// One iteration of protocol work.
    ///
    /// Returns the frame id of the next unit of render work, if a
    /// RENDER_FRAME command arrived. This layer only decodes and
    /// surfaces; fetching and rendering the frame is the runtime's job.
    pub fn poll(&mut self, diag: &mut impl Diagnostics) -> Option<FrameId> {
        self.tick_stats(diag);

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (peer, len) = self.socket.try_recv(&mut buf)?;

        match Command::decode(&buf[..len]) {
            Ok(Command::Ping { seq }) => {
                // Broadcast pings hit every node in the same microsecond;
                // a random delay below the bound spreads the replies.
                let jitter = self.jitter.jitter_us(self.config.ping_jitter_bound_us);
                self.delay.delay_us(jitter);

                let reply = PingReply {
                    seq,
                    role: self.role,
                };
                if let Err(err) = self.socket.send(peer, &reply.encode()) {
                    diag.send_failed(err);
                }
                None
            }
            Ok(Command::RenderFrame { id }) => Some(FrameId(id)),
            Ok(reserved) => {
                diag.command_ignored(reserved);
                None
            }
            Err(err) => {
                diag.datagram_dropped(err);
                None
            }
        }
    }

    /// Periodic diagnostics, independent of datagram traffic
    fn tick_stats(&mut self, diag: &mut impl Diagnostics) {
        let now = self.clock.now_ms();
        if now - self.last_stats_ms >= self.config.stats_interval_ms as u64 {
            diag.periodic_stats();
            self.last_stats_ms = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Peer, SendError};
    use synchroma_protocol::DecodeError;

    extern crate std;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    use core::cell::Cell;

    const PEER: Peer = Peer {
        ip: [10, 0, 0, 99],
        port: 1972,
    };

    #[derive(Default)]
    struct MockSocket {
        inbox: VecDeque<Vec<u8>>,
        sent: Vec<(Peer, Vec<u8>)>,
        fail_sends: bool,
    }

    impl Datagrams for MockSocket {
        fn try_recv(&mut self, buf: &mut [u8]) -> Option<(Peer, usize)> {
            let datagram = self.inbox.pop_front()?;
            buf[..datagram.len()].copy_from_slice(&datagram);
            Some((PEER, datagram.len()))
        }

        fn send(&mut self, peer: Peer, payload: &[u8]) -> Result<(), SendError> {
            if self.fail_sends {
                return Err(SendError);
            }
            self.sent.push((peer, payload.to_vec()));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct MockClock(Rc<Cell<u64>>);

    impl Clock for MockClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }
    }

    struct FixedJitter {
        value: u32,
        seen_bound: Rc<Cell<u32>>,
    }

    impl JitterSource for FixedJitter {
        fn jitter_us(&mut self, bound_us: u32) -> u32 {
            self.seen_bound.set(bound_us);
            self.value.min(bound_us - 1)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDelay(Rc<Cell<u32>>);

    impl Delay for RecordingDelay {
        fn delay_us(&mut self, us: u32) {
            self.0.set(self.0.get() + us);
        }
    }

    #[derive(Default)]
    struct RecordingDiag {
        dropped: Vec<DecodeError>,
        ignored: Vec<Command>,
        send_failures: u32,
        stats: u32,
    }

    impl Diagnostics for RecordingDiag {
        fn datagram_dropped(&mut self, err: DecodeError) {
            self.dropped.push(err);
        }

        fn command_ignored(&mut self, cmd: Command) {
            self.ignored.push(cmd);
        }

        fn send_failed(&mut self, _err: SendError) {
            self.send_failures += 1;
        }

        fn periodic_stats(&mut self) {
            self.stats += 1;
        }
    }

    type TestEngine = SyncEngine<MockSocket, MockClock, FixedJitter, RecordingDelay>;

    fn engine(role: Role, inbox: &[&[u8]]) -> (TestEngine, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let mut socket = MockSocket::default();
        for d in inbox {
            socket.inbox.push_back(d.to_vec());
        }
        let delay_total = Rc::new(Cell::new(0));
        let seen_bound = Rc::new(Cell::new(0));
        let engine = SyncEngine::new(
            socket,
            MockClock::default(),
            FixedJitter {
                value: 500,
                seen_bound: seen_bound.clone(),
            },
            RecordingDelay(delay_total.clone()),
            role,
            SyncConfig::default(),
        );
        (engine, delay_total, seen_bound)
    }

    #[test]
    fn test_ping_gets_unicast_reply_with_role() {
        let (mut engine, _, _) = engine(Role::Station, &[&[0, 7]]);
        let mut diag = RecordingDiag::default();

        assert_eq!(engine.poll(&mut diag), None);
        assert_eq!(engine.socket.sent.len(), 1);
        let (peer, reply) = &engine.socket.sent[0];
        assert_eq!(*peer, PEER);
        assert_eq!(reply[..], [7, 1]);
    }

    #[test]
    fn test_access_point_role_flag_in_reply() {
        let (mut engine, _, _) = engine(Role::AccessPoint, &[&[0, 7]]);
        engine.poll(&mut RecordingDiag::default());
        assert_eq!(engine.socket.sent[0].1[..], [7, 0]);
    }

    #[test]
    fn test_reply_waits_jitter_below_bound() {
        let (mut engine, delay_total, seen_bound) = engine(Role::Station, &[&[0, 1]]);
        engine.poll(&mut RecordingDiag::default());

        assert_eq!(seen_bound.get(), SyncConfig::default().ping_jitter_bound_us);
        assert!(delay_total.get() < seen_bound.get());
        assert_eq!(delay_total.get(), 500);
    }

    #[test]
    fn test_render_frame_surfaces_id() {
        let (mut engine, _, _) = engine(Role::Station, &[&[5, 0x00, 0x01, 0x2C]]);
        let mut diag = RecordingDiag::default();

        assert_eq!(engine.poll(&mut diag), Some(FrameId(300)));
        // Decode-and-surface only: no reply traffic
        assert!(engine.socket.sent.is_empty());
    }

    #[test]
    fn test_malformed_datagrams_are_dropped_silently() {
        let (mut engine, delay_total, _) = engine(
            Role::Station,
            &[
                &[0, 7, 9],       // ping, wrong length
                &[5, 1],          // render, wrong length
                &[42, 0],         // unknown tag
            ],
        );
        let mut diag = RecordingDiag::default();

        assert_eq!(engine.poll(&mut diag), None);
        assert_eq!(engine.poll(&mut diag), None);
        assert_eq!(engine.poll(&mut diag), None);

        assert!(engine.socket.sent.is_empty());
        assert_eq!(delay_total.get(), 0);
        assert_eq!(
            engine.poll(&mut diag),
            None,
            "empty inbox polls return no work"
        );
        assert_eq!(diag.dropped.len(), 3);
        assert_eq!(diag.dropped[2], DecodeError::UnknownTag(42));
    }

    #[test]
    fn test_reserved_commands_are_ignored() {
        let (mut engine, _, _) = engine(Role::Station, &[&[2], &[3]]);
        let mut diag = RecordingDiag::default();

        assert_eq!(engine.poll(&mut diag), None);
        assert_eq!(engine.poll(&mut diag), None);
        assert_eq!(diag.ignored, &[Command::Prepare, Command::Start]);
        assert!(engine.socket.sent.is_empty());
    }

    #[test]
    fn test_one_datagram_per_poll() {
        let (mut engine, _, _) = engine(
            Role::Station,
            &[&[5, 0, 0, 1], &[5, 0, 0, 2]],
        );
        let mut diag = RecordingDiag::default();

        assert_eq!(engine.poll(&mut diag), Some(FrameId(1)));
        assert_eq!(engine.poll(&mut diag), Some(FrameId(2)));
    }

    #[test]
    fn test_failed_reply_is_surfaced_not_fatal() {
        let (mut engine, _, _) = engine(Role::Station, &[&[0, 1]]);
        engine.socket.fail_sends = true;
        let mut diag = RecordingDiag::default();

        assert_eq!(engine.poll(&mut diag), None);
        assert_eq!(diag.send_failures, 1);
    }

    #[test]
    fn test_stats_fire_on_interval_not_traffic() {
        let (mut engine, _, _) = engine(Role::Station, &[]);
        let clock = engine.clock.clone();
        let mut diag = RecordingDiag::default();

        engine.poll(&mut diag);
        assert_eq!(diag.stats, 0, "interval has not elapsed at boot");

        clock.0.set(5000);
        engine.poll(&mut diag);
        assert_eq!(diag.stats, 1);

        clock.0.set(9999);
        engine.poll(&mut diag);
        assert_eq!(diag.stats, 1);

        clock.0.set(10_000);
        engine.poll(&mut diag);
        assert_eq!(diag.stats, 2);
    }
}
