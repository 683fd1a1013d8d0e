//! Packet encoding and decoding for the SAM protocol.
//!
//! Packet format:
//! - TYPE_FLAGS (1 byte): top 3 bits = message family, bottom 5 bits = flags
//! - DATA0 (1 byte): family-specific
//! - DATA1 (1 byte): family-specific
//! - CHECKSUM (1 byte): CRC-8 (poly 0x07, init 0x00) over the first 3 bytes

/// Size of every packet on the wire
pub const PACKET_SIZE: usize = 4;

/// Mask selecting the message family bits of `type_flags`
pub const TYPE_MASK: u8 = 0xE0;

/// Mask selecting the command/flag bits of `type_flags`
pub const FLAGS_MASK: u8 = 0x1F;

/// Errors that can occur during packet decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChecksumError {
    /// Checksum byte found on the wire
    pub found: u8,
    /// Checksum computed over the first 3 bytes
    pub computed: u8,
}

/// Message families, encoded in the top 3 bits of `type_flags`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageType {
    /// Button state change events (device to host)
    Button,
    /// LED control commands and acknowledgments
    Led,
    /// Power management commands and metric reports
    Power,
    /// E-ink display control and status
    Display,
    /// Numeric debug codes (device to host)
    DebugCode,
    /// Chunked debug text (device to host)
    DebugText,
    /// Core system control commands
    System,
    /// Extended commands, routed opaquely
    Extended,
}

impl MessageType {
    /// Decode from a raw `type_flags` byte (total: 3 bits enumerate all 8)
    pub fn from_type_flags(type_flags: u8) -> Self {
        match type_flags & TYPE_MASK {
            0x00 => MessageType::Button,
            0x20 => MessageType::Led,
            0x40 => MessageType::Power,
            0x60 => MessageType::Display,
            0x80 => MessageType::DebugCode,
            0xA0 => MessageType::DebugText,
            0xC0 => MessageType::System,
            _ => MessageType::Extended,
        }
    }

    /// The family's base value, aligned in the top 3 bits
    pub fn base(self) -> u8 {
        match self {
            MessageType::Button => 0x00,
            MessageType::Led => 0x20,
            MessageType::Power => 0x40,
            MessageType::Display => 0x60,
            MessageType::DebugCode => 0x80,
            MessageType::DebugText => 0xA0,
            MessageType::System => 0xC0,
            MessageType::Extended => 0xE0,
        }
    }

    /// Index 0-7, usable for per-type statistics slots
    pub fn index(self) -> usize {
        (self.base() >> 5) as usize
    }
}

/// Calculate CRC-8 over `data` (polynomial 0x07, init 0x00, no
/// reflection, no final XOR)
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0x00;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x07;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// A validated or freshly constructed packet
///
/// Packets are immutable once built; a response is always a new packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    bytes: [u8; PACKET_SIZE],
}

impl Packet {
    /// Build a packet, computing the checksum over the first 3 bytes
    pub fn encode(type_flags: u8, data0: u8, data1: u8) -> Self {
        let checksum = crc8(&[type_flags, data0, data1]);
        Self {
            bytes: [type_flags, data0, data1, checksum],
        }
    }

    /// Validate 4 raw bytes as a packet
    ///
    /// Fails with [`ChecksumError`] when the stored checksum does not
    /// match the CRC-8 of the first 3 bytes.
    pub fn decode(bytes: &[u8; PACKET_SIZE]) -> Result<Self, ChecksumError> {
        let computed = crc8(&bytes[..3]);
        if computed != bytes[3] {
            return Err(ChecksumError {
                found: bytes[3],
                computed,
            });
        }
        Ok(Self { bytes: *bytes })
    }

    /// Message family from the top 3 bits
    pub fn message_type(&self) -> MessageType {
        MessageType::from_type_flags(self.bytes[0])
    }

    /// Raw `type_flags` byte
    pub fn type_flags(&self) -> u8 {
        self.bytes[0]
    }

    /// Command/flag bits (bottom 5 bits of `type_flags`)
    pub fn flags(&self) -> u8 {
        self.bytes[0] & FLAGS_MASK
    }

    /// First data byte
    pub fn data0(&self) -> u8 {
        self.bytes[1]
    }

    /// Second data byte
    pub fn data1(&self) -> u8 {
        self.bytes[2]
    }

    /// Stored checksum byte
    pub fn checksum(&self) -> u8 {
        self.bytes[3]
    }

    /// Wire representation, in transmission order
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.bytes
    }
}
