//! Typed views over packet payloads, one per message family
//!
//! These types decode the family-specific bit layouts out of a
//! validated [`Packet`] and build well-formed packets for the outgoing
//! direction. Field layouts follow the firmware protocol reference:
//!
//! - BUTTON: flag bits 0-3 = UP/DOWN/SELECT/POWER, bit 4 reserved
//! - LED: flags = `[E][ID3..ID0]`, `data0 = RRRRGGGG`, `data1 = BBBBMMTT`
//! - POWER: flags 0x00-0x0F control, 0x10-0x1F metric reporting
//! - SYSTEM: flags = action (ping/reset/version/status/config)
//! - DEBUG_CODE: flags = category, `data0` = code, `data1` = parameter
//! - DEBUG_TEXT: flags = `[F][C][SEQ2..SEQ0]`, data bytes carry 2 chars

use crate::packet::Packet;

/// Firmware version reported by the SYSTEM version action
pub const FIRMWARE_VERSION_MAJOR: u8 = 0;
pub const FIRMWARE_VERSION_MINOR: u8 = 2;
pub const FIRMWARE_VERSION_PATCH: u8 = 3;

// Button flag bits
pub const BTN_UP: u8 = 0x01;
pub const BTN_DOWN: u8 = 0x02;
pub const BTN_SELECT: u8 = 0x04;
pub const BTN_POWER: u8 = 0x08;

/// LED execute flag (bit 4 of `type_flags`); clear = queue
pub const LED_EXECUTE: u8 = 0x10;

/// Broadcast LED id
pub const LED_ALL: u8 = 0x0F;

// Debug text flags
pub const DEBUG_TEXT_FIRST: u8 = 0x10;
pub const DEBUG_TEXT_CONTINUE: u8 = 0x08;
pub const DEBUG_TEXT_SEQ_MASK: u8 = 0x07;

/// Pressed-button bitmask from a BUTTON packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonState {
    mask: u8,
}

impl ButtonState {
    /// Build from individual button states
    pub fn new(up: bool, down: bool, select: bool, power: bool) -> Self {
        let mut mask = 0;
        if up {
            mask |= BTN_UP;
        }
        if down {
            mask |= BTN_DOWN;
        }
        if select {
            mask |= BTN_SELECT;
        }
        if power {
            mask |= BTN_POWER;
        }
        Self { mask }
    }

    /// Extract from packet flags; the reserved bit is masked off
    pub fn from_packet(packet: &Packet) -> Self {
        Self {
            mask: packet.flags() & 0x0F,
        }
    }

    /// Encode as a BUTTON packet (data bytes are reserved, zero)
    pub fn to_packet(self) -> Packet {
        Packet::encode(self.mask, 0x00, 0x00)
    }

    pub fn up(self) -> bool {
        self.mask & BTN_UP != 0
    }

    pub fn down(self) -> bool {
        self.mask & BTN_DOWN != 0
    }

    pub fn select(self) -> bool {
        self.mask & BTN_SELECT != 0
    }

    pub fn power(self) -> bool {
        self.mask & BTN_POWER != 0
    }

    /// Raw 4-bit bitmask
    pub fn mask(self) -> u8 {
        self.mask
    }
}

/// LED animation mode (2-bit field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedMode {
    Static,
    Blink,
    Fade,
    Rainbow,
}

impl LedMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => LedMode::Static,
            1 => LedMode::Blink,
            2 => LedMode::Fade,
            _ => LedMode::Rainbow,
        }
    }

    fn bits(self) -> u8 {
        match self {
            LedMode::Static => 0,
            LedMode::Blink => 1,
            LedMode::Fade => 2,
            LedMode::Rainbow => 3,
        }
    }
}

/// A decoded LED control command
///
/// Channel values arrive as 4 bits and are scaled to 8 bits
/// (`value * 255 / 15`, i.e. `value * 17`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedCommand {
    /// LED identifier, 0-15 (15 = all LEDs)
    pub id: u8,
    /// Execute the queued sequence rather than append to it
    pub execute: bool,
    /// Red, scaled to 8 bits
    pub r: u8,
    /// Green, scaled to 8 bits
    pub g: u8,
    /// Blue, scaled to 8 bits
    pub b: u8,
    /// Animation mode
    pub mode: LedMode,
    /// Timing field, 0-3
    pub timing: u8,
}

impl LedCommand {
    /// Extract from an LED packet
    pub fn from_packet(packet: &Packet) -> Self {
        let flags = packet.flags();
        let data0 = packet.data0();
        let data1 = packet.data1();
        Self {
            id: flags & 0x0F,
            execute: flags & LED_EXECUTE != 0,
            r: ((data0 >> 4) & 0x0F) * 17,
            g: (data0 & 0x0F) * 17,
            b: ((data1 >> 4) & 0x0F) * 17,
            mode: LedMode::from_bits(data1 >> 2),
            timing: data1 & 0x03,
        }
    }

    /// Encode an LED packet from 4-bit channel values
    pub fn to_packet(id: u8, execute: bool, r4: u8, g4: u8, b4: u8, mode: LedMode, timing: u8) -> Packet {
        let mut type_flags = 0x20 | (id & 0x0F);
        if execute {
            type_flags |= LED_EXECUTE;
        }
        let data0 = ((r4 & 0x0F) << 4) | (g4 & 0x0F);
        let data1 = ((b4 & 0x0F) << 4) | (mode.bits() << 2) | (timing & 0x03);
        Packet::encode(type_flags, data0, data1)
    }

    /// Timing field translated to a delay in milliseconds
    pub fn delay_ms(&self) -> u16 {
        match self.timing {
            0 => 100,
            1 => 200,
            2 => 500,
            _ => 1000,
        }
    }
}

/// Power control commands (flag range 0x00-0x0F)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerControl {
    /// Query current power status
    Query,
    /// Set power state
    SetState { state: u8, flags: u8 },
    /// Enter sleep mode after an optional delay
    Sleep { delay_s: u8, flags: u8 },
    /// Prepare for shutdown (mode: 0=normal, 1=emergency, 2=reboot)
    Shutdown { mode: u8, reason: u8 },
}

/// Power metrics (flag range 0x10-0x1F)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMetric {
    /// Current draw in mA
    Current,
    /// Battery percentage
    Battery,
    /// Temperature in 0.1 degC units
    Temperature,
    /// Voltage in mV
    Voltage,
}

impl PowerMetric {
    /// Flag value for this metric
    pub fn command(self) -> u8 {
        match self {
            PowerMetric::Current => 0x10,
            PowerMetric::Battery => 0x11,
            PowerMetric::Temperature => 0x12,
            PowerMetric::Voltage => 0x13,
        }
    }

    fn from_command(command: u8) -> Option<Self> {
        match command {
            0x10 => Some(PowerMetric::Current),
            0x11 => Some(PowerMetric::Battery),
            0x12 => Some(PowerMetric::Temperature),
            0x13 => Some(PowerMetric::Voltage),
            _ => None,
        }
    }

    /// Encode a metric report packet with a 16-bit little-endian value
    pub fn report(self, value: u16) -> Packet {
        Packet::encode(0x40 | self.command(), value as u8, (value >> 8) as u8)
    }

    /// Reconstruct the 16-bit value from a metric packet's data bytes
    pub fn value_of(packet: &Packet) -> u16 {
        u16::from_le_bytes([packet.data0(), packet.data1()])
    }
}

/// A decoded POWER packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerCommand {
    /// Control-range command
    Control(PowerControl),
    /// Single-metric request or report
    Report(PowerMetric),
    /// Request every metric; `mask` selects a subset (0 = all)
    RequestAll { mask: u8 },
}

impl PowerCommand {
    /// Decode a POWER packet; `None` for command values the protocol
    /// does not define
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        let command = packet.flags();
        match command {
            0x00 => Some(PowerCommand::Control(PowerControl::Query)),
            0x01 => Some(PowerCommand::Control(PowerControl::SetState {
                state: packet.data0(),
                flags: packet.data1(),
            })),
            0x02 => Some(PowerCommand::Control(PowerControl::Sleep {
                delay_s: packet.data0(),
                flags: packet.data1(),
            })),
            0x03 => Some(PowerCommand::Control(PowerControl::Shutdown {
                mode: packet.data0(),
                reason: packet.data1(),
            })),
            0x1F => Some(PowerCommand::RequestAll {
                mask: packet.data0(),
            }),
            _ => PowerMetric::from_command(command).map(PowerCommand::Report),
        }
    }
}

/// System control actions (5-bit flag field of SYSTEM packets)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemAction {
    Ping,
    Reset,
    Version,
    Status,
    Config,
}

impl SystemAction {
    /// Decode from packet flags; `None` for undefined actions
    pub fn from_packet(packet: &Packet) -> Option<Self> {
        match packet.flags() {
            0x00 => Some(SystemAction::Ping),
            0x01 => Some(SystemAction::Reset),
            0x02 => Some(SystemAction::Version),
            0x03 => Some(SystemAction::Status),
            0x04 => Some(SystemAction::Config),
            _ => None,
        }
    }

    /// Flag value for this action
    pub fn flags(self) -> u8 {
        match self {
            SystemAction::Ping => 0x00,
            SystemAction::Reset => 0x01,
            SystemAction::Version => 0x02,
            SystemAction::Status => 0x03,
            SystemAction::Config => 0x04,
        }
    }
}

/// Build the firmware version report packet
///
/// `data0` = major, `data1` = minor in the high nibble, patch in the low.
pub fn version_packet() -> Packet {
    Packet::encode(
        0xC0 | SystemAction::Version.flags(),
        FIRMWARE_VERSION_MAJOR,
        (FIRMWARE_VERSION_MINOR << 4) | (FIRMWARE_VERSION_PATCH & 0x0F),
    )
}

/// Debug message categories carried in DEBUG_CODE flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebugCategory {
    System,
    Error,
    Button,
    Led,
    Power,
    Display,
    Comm,
    Performance,
}

impl DebugCategory {
    /// Category value on the wire
    pub fn code(self) -> u8 {
        match self {
            DebugCategory::System => 0,
            DebugCategory::Error => 1,
            DebugCategory::Button => 2,
            DebugCategory::Led => 3,
            DebugCategory::Power => 4,
            DebugCategory::Display => 5,
            DebugCategory::Comm => 6,
            DebugCategory::Performance => 7,
        }
    }
}

/// A decoded DEBUG_CODE or DEBUG_TEXT packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebugMessage {
    /// Numeric debug code: category from the flags, code and parameter
    /// from the data bytes
    Code { category: u8, code: u8, param: u8 },
    /// Two characters of a chunked text message
    Text {
        first: bool,
        continued: bool,
        seq: u8,
        bytes: [u8; 2],
    },
}

impl DebugMessage {
    /// Decode a DEBUG_CODE packet
    pub fn code_from_packet(packet: &Packet) -> Self {
        DebugMessage::Code {
            category: packet.flags(),
            code: packet.data0(),
            param: packet.data1(),
        }
    }

    /// Decode a DEBUG_TEXT packet
    pub fn text_from_packet(packet: &Packet) -> Self {
        let flags = packet.flags();
        DebugMessage::Text {
            first: flags & DEBUG_TEXT_FIRST != 0,
            continued: flags & DEBUG_TEXT_CONTINUE != 0,
            seq: flags & DEBUG_TEXT_SEQ_MASK,
            bytes: [packet.data0(), packet.data1()],
        }
    }

    /// Build a DEBUG_CODE packet
    pub fn code_packet(category: DebugCategory, code: u8, param: u8) -> Packet {
        Packet::encode(0x80 | (category.code() & 0x1F), code, param)
    }

    /// Build one DEBUG_TEXT chunk packet
    pub fn text_packet(first: bool, continued: bool, seq: u8, bytes: [u8; 2]) -> Packet {
        let mut type_flags = 0xA0 | (seq & DEBUG_TEXT_SEQ_MASK);
        if first {
            type_flags |= DEBUG_TEXT_FIRST;
        }
        if continued {
            type_flags |= DEBUG_TEXT_CONTINUE;
        }
        Packet::encode(type_flags, bytes[0], bytes[1])
    }
}
