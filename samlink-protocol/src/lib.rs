//! SAM UART Packet Protocol
//!
//! This crate defines the 4-byte packet protocol spoken between a Linux
//! host (SoM) and the RP2040 peripheral controller. The protocol is
//! designed for low latency and robust recovery on a noisy serial line.
//!
//! # Protocol Overview
//!
//! Every message is a fixed 4-byte packet:
//! ```text
//! ┌────────────┬───────┬───────┬──────────┐
//! │ type_flags │ data0 │ data1 │ checksum │
//! │ 1B         │ 1B    │ 1B    │ 1B       │
//! └────────────┴───────┴───────┴──────────┘
//! ```
//!
//! The top 3 bits of `type_flags` select the message family (buttons,
//! LEDs, power, display, debug, system, extended); the bottom 5 bits
//! carry family-specific command flags. The checksum is CRC-8
//! (polynomial 0x07, init 0x00) over the first three bytes.
//!
//! There is no start-of-frame delimiter: packet boundaries are
//! recovered by [`FrameSynchronizer`], which slips one byte at a time
//! past corruption until a window passes the checksum.

#![no_std]
#![deny(unsafe_code)]

pub mod messages;
pub mod packet;
pub mod sync;

pub use messages::{
    ButtonState, DebugCategory, DebugMessage, LedCommand, LedMode, PowerCommand, PowerControl,
    PowerMetric, SystemAction,
};
pub use packet::{crc8, ChecksumError, MessageType, Packet, PACKET_SIZE};
pub use sync::{FrameBuffer, FrameSynchronizer, SyncState, SyncStats};
