//! # Packet Ingestor
//!
//! Turns the UDP datagram stream into a sequence of validated [`CallRecord`]s.
//!
//! ## Frame Layout:
//! ```text
//!  0       4       8                                   328
//!  +-------+-------+-----------------------------------+-----
//!  | src   | dst   | payload (320 bytes, LE i16 PCM)    | ignored
//!  +-------+-------+-----------------------------------+-----
//! ```
//! Both identifiers are big-endian unsigned 32-bit integers. Datagrams shorter than
//! [`MIN_FRAME_LEN`] are logged and discarded without touching any session state.
//!
//! ## Stream Semantics:
//! [`PacketIngestor::into_records`] yields records lazily and forever. The stream only
//! ends when the socket reports an error, and it ends exactly once; that end is the
//! "stream closed" signal the recorder uses to finalize the open call.

use crate::error::{FrameError, RecorderError, RecorderResult};
use byteorder::{BigEndian, ByteOrder};
use futures_util::stream::{self, Stream};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Size of the source + destination identifier header.
pub const HEADER_LEN: usize = 8;

/// Where the audio payload starts in a datagram.
pub const PAYLOAD_OFFSET: usize = HEADER_LEN;

/// Audio bytes carried by every frame (160 samples of 16-bit PCM, 20 ms at 8 kHz).
pub const PAYLOAD_LEN: usize = 320;

/// Shortest datagram that is accepted.
pub const MIN_FRAME_LEN: usize = PAYLOAD_OFFSET + PAYLOAD_LEN;

/// Receive buffer size. Bytes past [`MIN_FRAME_LEN`] are ignored anyway.
const RECV_BUFFER_LEN: usize = 2048;

/// One parsed audio frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub source_id: u32,
    pub destination_id: u32,
    pub payload: [u8; PAYLOAD_LEN],
}

impl CallRecord {
    /// Parse a received datagram.
    ///
    /// ## Returns:
    /// - **Ok(record)**: The identifiers and the fixed-length payload
    /// - **Err(FrameError::TooShort)**: The datagram is shorter than [`MIN_FRAME_LEN`]
    pub fn parse(datagram: &[u8]) -> Result<Self, FrameError> {
        if datagram.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort {
                len: datagram.len(),
                min: MIN_FRAME_LEN,
            });
        }

        let mut payload = [0u8; PAYLOAD_LEN];
        payload.copy_from_slice(&datagram[PAYLOAD_OFFSET..MIN_FRAME_LEN]);

        Ok(Self {
            source_id: BigEndian::read_u32(&datagram[0..4]),
            destination_id: BigEndian::read_u32(&datagram[4..8]),
            payload,
        })
    }

    /// Build the wire form of a frame (used by tests and tooling that feed the recorder).
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = vec![0u8; MIN_FRAME_LEN];
        BigEndian::write_u32(&mut frame[0..4], self.source_id);
        BigEndian::write_u32(&mut frame[4..8], self.destination_id);
        frame[PAYLOAD_OFFSET..].copy_from_slice(&self.payload);
        frame
    }
}

/// Owns the receiving UDP socket.
pub struct PacketIngestor {
    socket: UdpSocket,
}

impl PacketIngestor {
    /// Open the receive endpoint.
    ///
    /// ## Errors:
    /// Returns [`RecorderError::Bind`] if the address is unusable or the port is taken.
    pub async fn bind(address: &str, port: u16) -> RecorderResult<Self> {
        let addr = format!("{}:{}", address, port);
        let socket = UdpSocket::bind(addr.as_str())
            .await
            .map_err(|source| RecorderError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!(addr = %addr, "Listening for audio datagrams");
        Ok(Self { socket })
    }

    /// Address the socket is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> RecorderResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Consume the ingestor and produce the lazy record stream.
    ///
    /// Malformed datagrams are skipped inside the stream, so a consumer never sees
    /// them and they cannot influence the inactivity deadline.
    pub fn into_records(self) -> impl Stream<Item = CallRecord> {
        let buffer = vec![0u8; RECV_BUFFER_LEN];

        stream::unfold((self.socket, buffer), |(socket, mut buffer)| async move {
            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, peer)) => match CallRecord::parse(&buffer[..len]) {
                        Ok(record) => {
                            debug!(
                                peer = %peer,
                                source_id = record.source_id,
                                destination_id = record.destination_id,
                                "Received audio frame"
                            );
                            return Some((record, (socket, buffer)));
                        }
                        Err(e) => {
                            warn!(peer = %peer, len, "Discarding datagram: {}", e);
                        }
                    },
                    Err(e) => {
                        error!("Receive socket closed: {}", e);
                        return None;
                    }
                }
            }
        })
    }
}
