//! Command datagram decoding and encoding.
//!
//! Every command is a single UDP datagram: a 1-byte tag followed by a
//! fixed-size payload. Length is validated against the tag before any
//! payload byte is touched.

/// Tag byte: ping request, 1-byte sequence number payload
pub const TAG_PING: u8 = 0;
/// Tag byte: frame upload (reserved, unhandled by nodes)
pub const TAG_UPLOAD: u8 = 1;
/// Tag byte: prepare playback (reserved, unhandled by nodes)
pub const TAG_PREPARE: u8 = 2;
/// Tag byte: start playback (reserved, unhandled by nodes)
pub const TAG_START: u8 = 3;
/// Tag byte: stop playback (reserved, unhandled by nodes)
pub const TAG_STOP: u8 = 4;
/// Tag byte: render one frame, 3-byte big-endian frame id payload
pub const TAG_RENDER_FRAME: u8 = 5;

/// Total datagram length of a PING command
pub const PING_SIZE: usize = 2;
/// Total datagram length of a RENDER_FRAME command
pub const RENDER_FRAME_SIZE: usize = 4;

/// Receive buffer size for command datagrams.
///
/// Larger than any valid command so over-length datagrams are observed
/// whole and rejected by length, not silently truncated into validity.
pub const MAX_DATAGRAM_SIZE: usize = 64;

/// Errors that can occur while decoding a command datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Zero-length datagram, no tag byte
    Empty,
    /// Tag byte outside the known tag space
    UnknownTag(u8),
    /// Known tag but the datagram length does not match it
    WrongLength { tag: u8, len: usize },
}

/// A decoded command datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Ping request; the receiver replies unicast with [`crate::PingReply`]
    Ping { seq: u8 },
    /// Reserved: frame upload
    Upload,
    /// Reserved: prepare playback
    Prepare,
    /// Reserved: start playback
    Start,
    /// Reserved: stop playback
    Stop,
    /// Render the frame with the given id (24-bit on the wire)
    RenderFrame { id: u32 },
}

impl Command {
    /// Decode one datagram into a command.
    ///
    /// Reserved tags decode successfully regardless of payload so that
    /// future peers remain compatible with current nodes; the node runtime
    /// ignores them.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let &tag = datagram.first().ok_or(DecodeError::Empty)?;

        match tag {
            TAG_PING => {
                if datagram.len() != PING_SIZE {
                    return Err(DecodeError::WrongLength {
                        tag,
                        len: datagram.len(),
                    });
                }
                Ok(Command::Ping { seq: datagram[1] })
            }
            TAG_UPLOAD => Ok(Command::Upload),
            TAG_PREPARE => Ok(Command::Prepare),
            TAG_START => Ok(Command::Start),
            TAG_STOP => Ok(Command::Stop),
            TAG_RENDER_FRAME => {
                if datagram.len() != RENDER_FRAME_SIZE {
                    return Err(DecodeError::WrongLength {
                        tag,
                        len: datagram.len(),
                    });
                }
                let id = (datagram[1] as u32) << 16 | (datagram[2] as u32) << 8 | datagram[3] as u32;
                Ok(Command::RenderFrame { id })
            }
            other => Err(DecodeError::UnknownTag(other)),
        }
    }

    /// Encode this command into a datagram buffer.
    ///
    /// Returns the number of bytes written, or `None` if the buffer is too
    /// small or the command has no wire encoding (reserved tags carry
    /// unspecified payloads and cannot be produced here).
    pub fn encode(&self, buffer: &mut [u8]) -> Option<usize> {
        match *self {
            Command::Ping { seq } => {
                let out = buffer.get_mut(..PING_SIZE)?;
                out[0] = TAG_PING;
                out[1] = seq;
                Some(PING_SIZE)
            }
            Command::RenderFrame { id } => {
                debug_assert!(id < 1 << 24);
                let out = buffer.get_mut(..RENDER_FRAME_SIZE)?;
                out[0] = TAG_RENDER_FRAME;
                out[1] = (id >> 16) as u8;
                out[2] = (id >> 8) as u8;
                out[3] = id as u8;
                Some(RENDER_FRAME_SIZE)
            }
            Command::Upload | Command::Prepare | Command::Start | Command::Stop => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ping() {
        let cmd = Command::decode(&[TAG_PING, 42]).unwrap();
        assert_eq!(cmd, Command::Ping { seq: 42 });
    }

    #[test]
    fn test_decode_render_frame() {
        // 0x00012C = 300
        let cmd = Command::decode(&[TAG_RENDER_FRAME, 0x00, 0x01, 0x2C]).unwrap();
        assert_eq!(cmd, Command::RenderFrame { id: 300 });
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(Command::decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(Command::decode(&[9, 1, 2]), Err(DecodeError::UnknownTag(9)));
        assert_eq!(Command::decode(&[0xFF]), Err(DecodeError::UnknownTag(0xFF)));
    }

    #[test]
    fn test_decode_wrong_length() {
        // PING is exactly 2 bytes
        assert_eq!(
            Command::decode(&[TAG_PING]),
            Err(DecodeError::WrongLength { tag: TAG_PING, len: 1 })
        );
        assert_eq!(
            Command::decode(&[TAG_PING, 1, 2]),
            Err(DecodeError::WrongLength { tag: TAG_PING, len: 3 })
        );

        // RENDER_FRAME is exactly 4 bytes
        assert_eq!(
            Command::decode(&[TAG_RENDER_FRAME, 0, 1]),
            Err(DecodeError::WrongLength {
                tag: TAG_RENDER_FRAME,
                len: 3
            })
        );
    }

    #[test]
    fn test_decode_reserved_tags() {
        // Reserved tags are accepted with any payload
        assert_eq!(Command::decode(&[TAG_UPLOAD]), Ok(Command::Upload));
        assert_eq!(Command::decode(&[TAG_PREPARE, 1, 2, 3]), Ok(Command::Prepare));
        assert_eq!(Command::decode(&[TAG_START]), Ok(Command::Start));
        assert_eq!(Command::decode(&[TAG_STOP, 0]), Ok(Command::Stop));
    }

    #[test]
    fn test_encode_ping() {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = Command::Ping { seq: 7 }.encode(&mut buf).unwrap();
        assert_eq!(&buf[..len], &[TAG_PING, 7]);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buf = [0u8; 3];
        assert_eq!(Command::RenderFrame { id: 1 }.encode(&mut buf), None);
    }

    #[test]
    fn test_encode_reserved_has_no_encoding() {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        assert_eq!(Command::Upload.encode(&mut buf), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn render_frame_roundtrip(id in 0u32..(1 << 24)) {
                let mut buf = [0u8; MAX_DATAGRAM_SIZE];
                let len = Command::RenderFrame { id }.encode(&mut buf).unwrap();
                prop_assert_eq!(len, RENDER_FRAME_SIZE);
                prop_assert_eq!(
                    Command::decode(&buf[..len]).unwrap(),
                    Command::RenderFrame { id }
                );
            }

            #[test]
            fn ping_roundtrip(seq in 0u8..=255) {
                let mut buf = [0u8; MAX_DATAGRAM_SIZE];
                let len = Command::Ping { seq }.encode(&mut buf).unwrap();
                prop_assert_eq!(
                    Command::decode(&buf[..len]).unwrap(),
                    Command::Ping { seq }
                );
            }

            #[test]
            fn bad_length_never_decodes(tag in prop_oneof![Just(TAG_PING), Just(TAG_RENDER_FRAME)],
                                        extra in proptest::collection::vec(any::<u8>(), 0..16)) {
                let expected = if tag == TAG_PING { PING_SIZE } else { RENDER_FRAME_SIZE };
                let mut datagram = heapless::Vec::<u8, 32>::new();
                datagram.push(tag).unwrap();
                datagram.extend_from_slice(&extra).unwrap();

                if datagram.len() != expected {
                    prop_assert_eq!(
                        Command::decode(&datagram),
                        Err(DecodeError::WrongLength { tag, len: datagram.len() })
                    );
                }
            }
        }
    }
}
