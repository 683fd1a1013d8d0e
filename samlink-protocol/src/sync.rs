//! Stream framing and resynchronization
//!
//! The wire carries back-to-back 4-byte packets with no delimiter, so
//! boundary recovery relies on the checksum: any 4-byte window that
//! validates is a packet. After corruption or byte loss the
//! synchronizer slips forward one byte per failed window until a window
//! validates again. A single inserted or lost byte therefore costs at
//! most a handful of discarded windows, never a stalled link.
//!
//! Incoming bytes land in a bounded ring; when the producer outruns the
//! consumer the oldest unread bytes are dropped and counted. Memory
//! never grows.

use crate::packet::{Packet, PACKET_SIZE};

/// Bounded circular byte buffer with drop-oldest overflow policy
#[derive(Debug, Clone)]
pub struct FrameBuffer<const N: usize> {
    buf: [u8; N],
    /// Write position
    head: usize,
    /// Read position
    tail: usize,
    len: usize,
}

impl<const N: usize> Default for FrameBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameBuffer<N> {
    pub fn new() -> Self {
        Self {
            buf: [0; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Append one byte, dropping the oldest unread byte when full
    ///
    /// Returns `true` if an unread byte was dropped to make room.
    pub fn push(&mut self, byte: u8) -> bool {
        let mut dropped = false;
        if self.len == N {
            self.tail = (self.tail + 1) % N;
            self.len -= 1;
            dropped = true;
        }
        self.buf[self.head] = byte;
        self.head = (self.head + 1) % N;
        self.len += 1;
        dropped
    }

    /// Copy out `OUT` bytes starting at the read position, without
    /// consuming them
    pub fn peek<const OUT: usize>(&self) -> Option<[u8; OUT]> {
        if self.len < OUT {
            return None;
        }
        let mut out = [0u8; OUT];
        let mut pos = self.tail;
        for slot in out.iter_mut() {
            *slot = self.buf[pos];
            pos = (pos + 1) % N;
        }
        Some(out)
    }

    /// Discard up to `count` bytes from the front
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.len);
        self.tail = (self.tail + count) % N;
        self.len -= count;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// Synchronizer alignment state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncState {
    /// Fewer than 4 bytes buffered; no candidate packet start
    Seeking,
    /// The byte at the read position provisionally starts a packet
    Aligned,
}

/// Monotonic counters owned by the synchronizer
///
/// Reset only through [`FrameSynchronizer::reset_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncStats {
    /// Bytes accepted into the ring
    pub bytes_ingested: u32,
    /// Packets that passed checksum validation
    pub packets_decoded: u32,
    /// 4-byte windows rejected by the checksum
    pub checksum_failures: u32,
    /// Single-byte slips performed to regain alignment
    pub resync_slips: u32,
    /// Unread bytes dropped by the overflow policy
    pub overflow_drops: u32,
}

/// Recovers packet boundaries from a continuous byte stream
pub struct FrameSynchronizer<const N: usize> {
    buffer: FrameBuffer<N>,
    state: SyncState,
    stats: SyncStats,
}

impl<const N: usize> Default for FrameSynchronizer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameSynchronizer<N> {
    pub fn new() -> Self {
        Self {
            buffer: FrameBuffer::new(),
            state: SyncState::Seeking,
            stats: SyncStats::default(),
        }
    }

    /// Append raw bytes; never blocks
    ///
    /// Returns the number of bytes accepted. A chunk larger than the
    /// ring keeps only its trailing window; the skipped lead bytes are
    /// counted as overflow drops.
    pub fn ingest(&mut self, bytes: &[u8]) -> usize {
        let skip = bytes.len().saturating_sub(N);
        self.stats.overflow_drops = self.stats.overflow_drops.wrapping_add(skip as u32);

        let accepted = &bytes[skip..];
        for &byte in accepted {
            if self.buffer.push(byte) {
                self.stats.overflow_drops = self.stats.overflow_drops.wrapping_add(1);
            }
        }
        self.stats.bytes_ingested = self.stats.bytes_ingested.wrapping_add(accepted.len() as u32);
        accepted.len()
    }

    /// Try to extract one packet; never blocks
    ///
    /// On a checksum failure the read position advances by exactly one
    /// byte and the next window is tried, within this same call, until
    /// a packet validates or fewer than 4 bytes remain.
    pub fn poll(&mut self) -> Option<Packet> {
        loop {
            let Some(window) = self.buffer.peek::<PACKET_SIZE>() else {
                self.state = SyncState::Seeking;
                return None;
            };
            self.state = SyncState::Aligned;

            match Packet::decode(&window) {
                Ok(packet) => {
                    self.buffer.consume(PACKET_SIZE);
                    self.stats.packets_decoded = self.stats.packets_decoded.wrapping_add(1);
                    if self.buffer.len() < PACKET_SIZE {
                        self.state = SyncState::Seeking;
                    }
                    return Some(packet);
                }
                Err(_) => {
                    // Slip a single byte, not the whole window: a lone
                    // inserted byte must not take a trailing packet with it.
                    self.buffer.consume(1);
                    self.stats.checksum_failures = self.stats.checksum_failures.wrapping_add(1);
                    self.stats.resync_slips = self.stats.resync_slips.wrapping_add(1);
                }
            }
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }

    /// Bytes currently buffered and not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    const CAP: usize = 64;

    fn sync() -> FrameSynchronizer<CAP> {
        FrameSynchronizer::new()
    }

    #[test]
    fn test_clean_stream_yields_packets() {
        let mut s = sync();
        let a = Packet::encode(0xC0, 0x00, 0x00);
        let b = Packet::encode(0x01, 0x00, 0x00);

        let mut data = [0u8; 8];
        data[..4].copy_from_slice(a.as_bytes());
        data[4..].copy_from_slice(b.as_bytes());
        assert_eq!(s.ingest(&data), 8);

        assert_eq!(s.poll(), Some(a));
        assert_eq!(s.poll(), Some(b));
        assert_eq!(s.poll(), None);
        assert_eq!(s.stats().packets_decoded, 2);
        assert_eq!(s.stats().resync_slips, 0);
    }

    #[test]
    fn test_resync_after_single_garbage_byte() {
        let mut s = sync();
        let packet = Packet::encode(0x01, 0x00, 0x00);

        s.ingest(&[0x5A]);
        s.ingest(packet.as_bytes());

        assert_eq!(s.poll(), Some(packet));
        assert_eq!(s.stats().resync_slips, 1);
        assert_eq!(s.poll(), None);
    }

    #[test]
    fn test_no_packet_fused_with_garbage() {
        let mut s = sync();
        let packet = Packet::encode(0x20, 0xF0, 0x00);

        // Several polls interleaved with partial garbage: whatever
        // comes out must be exactly the embedded packet.
        s.ingest(&[0xDE, 0xAD, 0xBE]);
        assert_eq!(s.poll(), None);
        s.ingest(packet.as_bytes());

        let got = s.poll().expect("packet after garbage");
        assert_eq!(got, packet);
        assert_eq!(s.stats().resync_slips, 3);
    }

    #[test]
    fn test_split_delivery() {
        let mut s = sync();
        let packet = Packet::encode(0xC2, 0x00, 0x23);

        for &byte in packet.as_bytes().iter().take(3) {
            s.ingest(&[byte]);
            assert_eq!(s.poll(), None);
        }
        s.ingest(&[packet.as_bytes()[3]]);
        assert_eq!(s.poll(), Some(packet));
    }

    #[test]
    fn test_state_transitions() {
        let mut s = sync();
        assert_eq!(s.state(), SyncState::Seeking);

        let packet = Packet::encode(0x40, 0x00, 0x00);
        s.ingest(packet.as_bytes());
        s.ingest(packet.as_bytes());

        assert!(s.poll().is_some());
        assert_eq!(s.state(), SyncState::Aligned); // 4 bytes still buffered
        assert!(s.poll().is_some());
        assert_eq!(s.state(), SyncState::Seeking);
    }

    #[test]
    fn test_overflow_keeps_recent_window() {
        let mut s = sync();

        // Flood with garbage well past capacity, then a valid packet.
        for _ in 0..3 * CAP {
            s.ingest(&[0xAA]);
        }
        let packet = Packet::encode(0x01, 0x00, 0x00);
        s.ingest(packet.as_bytes());

        assert!(s.buffered() <= CAP);
        assert!(s.stats().overflow_drops > 0);

        // The trailing packet survived the drops.
        let mut found = None;
        while let Some(p) = s.poll() {
            found = Some(p);
        }
        assert_eq!(found, Some(packet));
    }

    #[test]
    fn test_oversized_ingest_truncates_to_window() {
        let mut s = sync();
        let packet = Packet::encode(0xC0, 0x00, 0x00);

        let mut flood = [0x55u8; 2 * CAP];
        flood[2 * CAP - 4..].copy_from_slice(packet.as_bytes());

        let accepted = s.ingest(&flood);
        assert_eq!(accepted, CAP);
        assert_eq!(s.stats().overflow_drops as usize, CAP);
        assert_eq!(s.buffered(), CAP);

        let mut found = None;
        while let Some(p) = s.poll() {
            found = Some(p);
        }
        assert_eq!(found, Some(packet));
    }

    #[test]
    fn test_stats_reset_is_explicit() {
        let mut s = sync();
        s.ingest(&[0x01, 0x02]);
        assert_eq!(s.stats().bytes_ingested, 2);
        s.reset_stats();
        assert_eq!(*s.stats(), SyncStats::default());
        // Buffered bytes are not discarded by a stats reset.
        assert_eq!(s.buffered(), 2);
    }
}
