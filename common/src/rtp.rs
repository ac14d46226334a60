//! RTP packet framing.
//!
//! Wraps raw audio payloads in the fixed 12-byte RTP header (RFC 3550,
//! no CSRC list, no extension) and decodes that header back into its
//! fields for inspection.

use thiserror::Error;

/// Size of the fixed RTP header in bytes.
pub const RTP_HEADER_SIZE: usize = 12;

/// RTP packet version 2 (as per RFC 3550)
pub const RTP_VERSION: u8 = 2;

/// Dynamic payload type stamped on every packet
pub const PAYLOAD_TYPE_DYNAMIC: u8 = 96;

/// Timestamp advance per packet (20ms frame at 8kHz)
pub const TIMESTAMP_STEP: u32 = 160;

/// Errors raised while decoding a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// The buffer is shorter than the fixed RTP header.
    #[error("malformed packet: {len} bytes is shorter than the 12-byte RTP header")]
    MalformedPacket { len: usize },
}

/// Header fields decoded from the first 12 bytes of a packet.
///
/// `timestamp` and `ssrc` are read as signed 32-bit integers, so a timestamp
/// past `i32::MAX` shows up negative. This matches the encoder's wire layout
/// bit for bit; reinterpret with `as u32` to get the unsigned counter back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFields {
    // ---
    /// Bits 6-7 of byte 0 (always 2 for packets from `StreamEncoder`)
    pub version: u8,

    /// Low 7 bits of byte 1
    pub payload_type: u8,

    /// Packet sequence number
    pub sequence: u16,

    /// RTP timestamp, signed interpretation
    pub timestamp: i32,

    /// Stream identifier, signed interpretation
    pub ssrc: i32,
}

/// Decodes the fixed RTP header of `packet`.
///
/// Pure function: no validation of version or payload type is performed,
/// the values are reported as found.
///
/// # Errors
///
/// Returns `PacketError::MalformedPacket` if `packet` is shorter than
/// `RTP_HEADER_SIZE`.
pub fn decode_header(packet: &[u8]) -> Result<HeaderFields, PacketError> {
    // ---
    if packet.len() < RTP_HEADER_SIZE {
        return Err(PacketError::MalformedPacket { len: packet.len() });
    }

    Ok(HeaderFields {
        version: (packet[0] >> 6) & 0x03,
        payload_type: packet[1] & 0x7F,
        sequence: u16::from_be_bytes([packet[2], packet[3]]),
        timestamp: i32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]),
        ssrc: i32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]),
    })
}

/// A decoded packet borrowing its payload from the wire buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpPacket<'a> {
    // ---
    pub header: HeaderFields,
    pub payload: &'a [u8],
}

impl<'a> RtpPacket<'a> {
    // ---
    /// Splits `data` into decoded header and payload.
    ///
    /// # Errors
    ///
    /// Returns `PacketError::MalformedPacket` if `data` is shorter than
    /// the fixed header.
    pub fn parse(data: &'a [u8]) -> Result<Self, PacketError> {
        // ---
        let header = decode_header(data)?;
        Ok(Self {
            header,
            payload: &data[RTP_HEADER_SIZE..],
        })
    }
}

/// Packetizer holding the per-stream RTP state.
///
/// Every call to [`StreamEncoder::encode`] stamps the current sequence
/// number and timestamp into the packet, then advances them. The SSRC is
/// fixed for the lifetime of the encoder.
///
/// `encode` takes `&mut self`, so packets from one encoder are always
/// produced one at a time. Share it across tasks only behind a mutex or by
/// confining it to a single task.
///
/// # Example
///
/// ```
/// use rtp_level_common::rtp::{decode_header, StreamEncoder};
///
/// let mut encoder = StreamEncoder::with_ssrc(0x1234_5678);
/// let packet = encoder.encode(&[1, 2, 3, 4]);
/// assert_eq!(packet.len(), 16);
///
/// let header = decode_header(&packet).unwrap();
/// assert_eq!(header.sequence, 0);
/// assert_eq!(encoder.sequence(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct StreamEncoder {
    // ---
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
}

impl StreamEncoder {
    // ---
    /// Creates an encoder with a random SSRC, starting at sequence 0 and
    /// timestamp 0.
    pub fn new() -> Self {
        // ---
        Self::with_ssrc(rand::random::<u32>())
    }

    /// Creates an encoder with a caller-chosen SSRC.
    pub fn with_ssrc(ssrc: u32) -> Self {
        // ---
        Self {
            sequence: 0,
            timestamp: 0,
            ssrc,
        }
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Timestamp the next packet will carry.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Stream identifier stamped into every packet.
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Restarts sequence and timestamp at 0. The SSRC is kept.
    pub fn reset(&mut self) {
        // ---
        self.sequence = 0;
        self.timestamp = 0;
    }

    /// Frames `payload` into a new RTP packet.
    ///
    /// The returned buffer is always `RTP_HEADER_SIZE + payload.len()` bytes.
    /// After writing, the sequence number advances by 1 and the timestamp
    /// by `TIMESTAMP_STEP`, both wrapping.
    ///
    /// # Wire Format
    ///
    /// ```text
    ///  0                   1                   2                   3
    ///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
    /// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    /// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
    /// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    /// |                           timestamp                           |
    /// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    /// |           synchronization source (SSRC) identifier            |
    /// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
    /// |                           payload...                          |
    /// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    /// ```
    pub fn encode(&mut self, payload: &[u8]) -> Vec<u8> {
        // ---
        let mut buf = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());

        // V=2, P=0, X=0, CC=0
        buf.push(RTP_VERSION << 6);

        // M=0, PT=96
        buf.push(PAYLOAD_TYPE_DYNAMIC);

        buf.extend_from_slice(&self.sequence.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&self.ssrc.to_be_bytes());
        buf.extend_from_slice(payload);

        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(TIMESTAMP_STEP);

        buf
    }
}

impl Default for StreamEncoder {
    fn default() -> Self {
        Self::new()
    }
}
