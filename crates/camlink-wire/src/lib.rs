//! Checksummed framing for the camera control protocol.
//!
//! This is the integrity layer of camlink. Every frame carries:
//! - A 0xAA start-of-frame marker for stream synchronization
//! - A 10-bit total-length field so the reassembler knows what to await
//! - A CRC16 over the header and a CRC32 over the whole frame, both seeded
//!   with the firmware's 0x3AA3 register value
//!
//! Decoding is pure over a byte window; [`Reassembler`] owns buffering and
//! resynchronization for fragmented or corrupted transports.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod gps;
pub mod reassembler;

pub use checksum::{checksum16, checksum32, CHECKSUM_INIT};
pub use codec::{
    decode_frame, encode_frame, Frame, DATA_OFFSET, HEADER_SIZE, MAGIC, MAX_PAYLOAD,
    MIN_FRAME_SIZE,
};
pub use error::{ChecksumRegion, Result, WireError};
pub use gps::{decode_gps_payload, encode_gps_payload, GpsFix, GPS_PAYLOAD_SIZE};
pub use reassembler::Reassembler;
