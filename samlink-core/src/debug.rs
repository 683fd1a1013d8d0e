//! Leveled debug channel over the packet link
//!
//! Debug output is opt-in per level and per category; anything below
//! the configured level (or in a disabled category) is suppressed and
//! counted rather than sent, so verbose instrumentation can stay
//! compiled in without flooding the wire. Text messages are chunked
//! into DEBUG_TEXT packets carrying two characters each.

use heapless::Vec;
use samlink_protocol::{DebugCategory, DebugMessage, Packet};

/// Longest text message, in packets (two characters per packet)
pub const TEXT_MAX_CHUNKS: usize = 8;

/// Debug verbosity threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebugLevel {
    /// Nothing goes out
    Off,
    /// Errors only
    Error,
    /// Errors and informational messages
    Info,
    /// Everything
    Verbose,
}

/// Debug message producer with level and category filtering
pub struct DebugChannel {
    level: DebugLevel,
    category_enabled: [bool; 8],
    emitted: u32,
    suppressed: u32,
}

impl DebugChannel {
    pub const fn new(level: DebugLevel) -> Self {
        Self {
            level,
            category_enabled: [true; 8],
            emitted: 0,
            suppressed: 0,
        }
    }

    pub fn level(&self) -> DebugLevel {
        self.level
    }

    /// Change the verbosity threshold at runtime
    pub fn set_level(&mut self, level: DebugLevel) {
        self.level = level;
    }

    /// Enable or disable a single category
    pub fn set_category(&mut self, category: DebugCategory, enabled: bool) {
        self.category_enabled[category.code() as usize] = enabled;
    }

    fn passes(&mut self, level: DebugLevel, category: DebugCategory) -> bool {
        let pass = level != DebugLevel::Off
            && level <= self.level
            && self.category_enabled[category.code() as usize];
        if !pass {
            self.suppressed = self.suppressed.wrapping_add(1);
        }
        pass
    }

    /// Build a DEBUG_CODE packet, or `None` when filtered out
    pub fn code(
        &mut self,
        level: DebugLevel,
        category: DebugCategory,
        code: u8,
        param: u8,
    ) -> Option<Packet> {
        if !self.passes(level, category) {
            return None;
        }
        self.emitted = self.emitted.wrapping_add(1);
        Some(DebugMessage::code_packet(category, code, param))
    }

    /// Chunk a text message into DEBUG_TEXT packets
    ///
    /// The first chunk carries the FIRST flag, later chunks CONTINUE;
    /// the sequence number wraps at 8. Messages longer than
    /// [`TEXT_MAX_CHUNKS`] packets are truncated. Returns an empty
    /// vector when filtered out.
    pub fn text(&mut self, level: DebugLevel, message: &str) -> Vec<Packet, TEXT_MAX_CHUNKS> {
        let mut packets = Vec::new();
        if !self.passes(level, DebugCategory::System) {
            return packets;
        }

        let bytes = message.as_bytes();
        for (seq, chunk) in bytes.chunks(2).take(TEXT_MAX_CHUNKS).enumerate() {
            let pair = [chunk[0], chunk.get(1).copied().unwrap_or(0)];
            let packet =
                DebugMessage::text_packet(seq == 0, seq > 0, (seq as u8) & 0x07, pair);
            if packets.push(packet).is_err() {
                break;
            }
        }
        self.emitted = self.emitted.wrapping_add(packets.len() as u32);
        packets
    }

    /// Report a task budget overrun on the Performance category
    ///
    /// `code` identifies the task, the parameter carries the elapsed
    /// time in milliseconds saturated to one byte.
    pub fn task_overrun(&mut self, task_index: u8, elapsed_ms: u32) -> Option<Packet> {
        let clamped = elapsed_ms.min(u8::MAX as u32) as u8;
        self.code(
            DebugLevel::Info,
            DebugCategory::Performance,
            task_index,
            clamped,
        )
    }

    /// Messages that cleared the filters
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    /// Messages dropped by level or category filtering
    pub fn suppressed(&self) -> u32 {
        self.suppressed
    }

    pub fn reset_stats(&mut self) {
        self.emitted = 0;
        self.suppressed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use samlink_protocol::messages::{DEBUG_TEXT_CONTINUE, DEBUG_TEXT_FIRST};
    use samlink_protocol::MessageType;

    #[test]
    fn test_level_gating() {
        let mut channel = DebugChannel::new(DebugLevel::Error);

        assert!(channel
            .code(DebugLevel::Error, DebugCategory::Comm, 1, 0)
            .is_some());
        assert!(channel
            .code(DebugLevel::Info, DebugCategory::Comm, 2, 0)
            .is_none());
        assert!(channel
            .code(DebugLevel::Verbose, DebugCategory::Comm, 3, 0)
            .is_none());

        assert_eq!(channel.emitted(), 1);
        assert_eq!(channel.suppressed(), 2);
    }

    #[test]
    fn test_off_suppresses_everything() {
        let mut channel = DebugChannel::new(DebugLevel::Off);
        assert!(channel
            .code(DebugLevel::Error, DebugCategory::Error, 1, 0)
            .is_none());
        assert!(channel.text(DebugLevel::Error, "boot").is_empty());
        assert_eq!(channel.emitted(), 0);
        assert_eq!(channel.suppressed(), 2);
    }

    #[test]
    fn test_category_filter() {
        let mut channel = DebugChannel::new(DebugLevel::Verbose);
        channel.set_category(DebugCategory::Led, false);

        assert!(channel
            .code(DebugLevel::Info, DebugCategory::Led, 1, 0)
            .is_none());
        assert!(channel
            .code(DebugLevel::Info, DebugCategory::Power, 1, 0)
            .is_some());
    }

    #[test]
    fn test_text_chunking() {
        let mut channel = DebugChannel::new(DebugLevel::Verbose);
        let packets = channel.text(DebugLevel::Info, "hello");
        assert_eq!(packets.len(), 3);

        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.message_type(), MessageType::DebugText);
            let flags = packet.flags();
            assert_eq!(flags & DEBUG_TEXT_FIRST != 0, i == 0);
            assert_eq!(flags & DEBUG_TEXT_CONTINUE != 0, i > 0);
            assert_eq!(flags & 0x07, i as u8);
        }

        assert_eq!([packets[0].data0(), packets[0].data1()], [b'h', b'e']);
        assert_eq!([packets[1].data0(), packets[1].data1()], [b'l', b'l']);
        // Odd-length message pads the final chunk with zero.
        assert_eq!([packets[2].data0(), packets[2].data1()], [b'o', 0]);
    }

    #[test]
    fn test_text_truncated_at_max_chunks() {
        let mut channel = DebugChannel::new(DebugLevel::Verbose);
        let packets = channel.text(DebugLevel::Info, "this message is far too long to fit");
        assert_eq!(packets.len(), TEXT_MAX_CHUNKS);
        assert_eq!(channel.emitted(), TEXT_MAX_CHUNKS as u32);
    }

    #[test]
    fn test_task_overrun_saturates_elapsed() {
        let mut channel = DebugChannel::new(DebugLevel::Info);
        let packet = channel.task_overrun(3, 5000).unwrap();
        assert_eq!(packet.message_type(), MessageType::DebugCode);
        assert_eq!(packet.flags(), DebugCategory::Performance.code());
        assert_eq!(packet.data0(), 3);
        assert_eq!(packet.data1(), 255);
    }

    #[test]
    fn test_runtime_level_change() {
        let mut channel = DebugChannel::new(DebugLevel::Off);
        assert!(channel
            .code(DebugLevel::Error, DebugCategory::Error, 1, 0)
            .is_none());

        channel.set_level(DebugLevel::Verbose);
        assert!(channel
            .code(DebugLevel::Verbose, DebugCategory::Error, 1, 0)
            .is_some());
    }
}
