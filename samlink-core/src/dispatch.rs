//! Packet routing to peripheral handlers
//!
//! A validated packet is classified by its message family and handed to
//! the matching method of the injected [`Peripherals`] implementation.
//! Handlers never see raw bytes; they get the typed views from
//! `samlink-protocol`. A handler rejection or an undefined command
//! value produces a DEBUG_CODE error packet carrying the offending
//! family and a detail code; nothing here is fatal.

use heapless::Vec;
use samlink_protocol::{
    ButtonState, DebugMessage, LedCommand, MessageType, Packet, PowerCommand, PowerControl,
    PowerMetric, SystemAction,
};

/// Error code: the 5-bit command value is not defined for the family
pub const ERR_UNKNOWN_COMMAND: u8 = 0x01;

/// Error code: the peripheral handler rejected a well-formed command
pub const ERR_REJECTED: u8 = 0x02;

/// Most responses a single packet can produce (a metrics request
/// answers with one packet per metric)
const MAX_PENDING: usize = 4;

/// Peripheral capability surface, one method per message family
///
/// Implementations are supplied by the peripheral drivers and injected
/// at construction. Methods must return promptly; long operations
/// belong on the worker context, reached through a queue.
pub trait Peripherals {
    /// Button state change (device-originated families also pass
    /// through here when the host echoes them back for test loops)
    fn buttons(&mut self, state: ButtonState);

    /// LED control command; `Err(detail)` produces an error packet
    fn led(&mut self, command: LedCommand) -> Result<(), u8>;

    /// Power control command; `Err(detail)` produces an error packet
    fn power_control(&mut self, control: PowerControl) -> Result<(), u8>;

    /// Report one power metric; `None` means no reading available and
    /// no response is sent
    fn power_report(&mut self, metric: PowerMetric) -> Option<u16>;

    /// System action other than ping/version; may return a response
    fn system(&mut self, action: SystemAction, data0: u8, data1: u8) -> Option<Packet>;

    /// Opaque display command; payload semantics live in the driver
    fn display(&mut self, flags: u8, data0: u8, data1: u8);

    /// Opaque extended command
    fn extended(&mut self, flags: u8, data0: u8, data1: u8);

    /// Debug traffic sink
    fn debug(&mut self, message: DebugMessage);
}

/// Dispatch counters, snapshot via [`Dispatcher::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispatchStats {
    /// Packets routed, indexed by `MessageType::index()`
    pub received_by_type: [u32; 8],
    /// Error packets emitted
    pub errors_emitted: u32,
}

/// Routes validated packets to the peripheral handlers
pub struct Dispatcher<P: Peripherals> {
    peripherals: P,
    stats: DispatchStats,
    pending: Vec<Packet, MAX_PENDING>,
}

/// Build a DEBUG_CODE error packet: flags carry the error code, data0
/// the offending family's base value, data1 a detail code
pub fn error_packet(code: u8, original: MessageType, detail: u8) -> Packet {
    Packet::encode(0x80 | (code & 0x1F), original.base(), detail)
}

impl<P: Peripherals> Dispatcher<P> {
    pub fn new(peripherals: P) -> Self {
        Self {
            peripherals,
            stats: DispatchStats::default(),
            pending: Vec::new(),
        }
    }

    /// Route one packet; the returned packet, if any, is an outgoing
    /// response or error
    ///
    /// A metrics request can produce several responses; the first is
    /// returned and the rest are held for [`Dispatcher::take_response`].
    pub fn handle(&mut self, packet: &Packet) -> Option<Packet> {
        let ty = packet.message_type();
        let slot = &mut self.stats.received_by_type[ty.index()];
        *slot = slot.wrapping_add(1);

        match ty {
            MessageType::Button => {
                self.peripherals.buttons(ButtonState::from_packet(packet));
                None
            }
            MessageType::Led => {
                let command = LedCommand::from_packet(packet);
                match self.peripherals.led(command) {
                    Ok(()) => None,
                    Err(detail) => Some(self.error(ERR_REJECTED, ty, detail)),
                }
            }
            MessageType::Power => self.handle_power(packet),
            MessageType::Display => {
                self.peripherals
                    .display(packet.flags(), packet.data0(), packet.data1());
                None
            }
            MessageType::DebugCode => {
                self.peripherals
                    .debug(DebugMessage::code_from_packet(packet));
                None
            }
            MessageType::DebugText => {
                self.peripherals
                    .debug(DebugMessage::text_from_packet(packet));
                None
            }
            MessageType::System => self.handle_system(packet),
            MessageType::Extended => {
                self.peripherals
                    .extended(packet.flags(), packet.data0(), packet.data1());
                None
            }
        }
    }

    /// Drain responses beyond the first from the last `handle` call
    pub fn take_response(&mut self) -> Option<Packet> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    fn handle_power(&mut self, packet: &Packet) -> Option<Packet> {
        let ty = MessageType::Power;
        match PowerCommand::from_packet(packet) {
            None => Some(self.error(ERR_UNKNOWN_COMMAND, ty, packet.flags())),
            Some(PowerCommand::Control(control)) => {
                match self.peripherals.power_control(control) {
                    Ok(()) => None,
                    Err(detail) => Some(self.error(ERR_REJECTED, ty, detail)),
                }
            }
            Some(PowerCommand::Report(metric)) => self
                .peripherals
                .power_report(metric)
                .map(|value| metric.report(value)),
            Some(PowerCommand::RequestAll { mask }) => {
                let metrics = [
                    PowerMetric::Current,
                    PowerMetric::Battery,
                    PowerMetric::Temperature,
                    PowerMetric::Voltage,
                ];
                let mut first = None;
                for (bit, metric) in metrics.into_iter().enumerate() {
                    if mask != 0 && mask & (1 << bit) == 0 {
                        continue;
                    }
                    if let Some(value) = self.peripherals.power_report(metric) {
                        let report = metric.report(value);
                        if first.is_none() {
                            first = Some(report);
                        } else {
                            // Capacity covers all four metrics.
                            let _ = self.pending.push(report);
                        }
                    }
                }
                first
            }
        }
    }

    fn handle_system(&mut self, packet: &Packet) -> Option<Packet> {
        let ty = MessageType::System;
        match SystemAction::from_packet(packet) {
            None => Some(self.error(ERR_UNKNOWN_COMMAND, ty, packet.flags())),
            // Ping answers with an exact echo, proving codec + link.
            Some(SystemAction::Ping) => Some(Packet::encode(
                packet.type_flags(),
                packet.data0(),
                packet.data1(),
            )),
            Some(SystemAction::Version) => Some(samlink_protocol::messages::version_packet()),
            Some(action) => self
                .peripherals
                .system(action, packet.data0(), packet.data1()),
        }
    }

    fn error(&mut self, code: u8, original: MessageType, detail: u8) -> Packet {
        self.stats.errors_emitted = self.stats.errors_emitted.wrapping_add(1);
        error_packet(code, original, detail)
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DispatchStats::default();
    }

    /// Access the injected peripheral handlers (used by tests and by
    /// platform glue that owns state inside its handler set)
    pub fn peripherals_mut(&mut self) -> &mut P {
        &mut self.peripherals
    }
}
