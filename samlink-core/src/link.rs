//! The composed link engine
//!
//! [`Link`] wires the comm-side pieces together: raw bytes go in
//! through [`Link::ingest`], and one [`Link::comm_pass`] drains every
//! decodable packet through the dispatcher, pushes responses out
//! through the supplied transmit hook, then flushes whatever the
//! worker context queued for transmission. The pass never blocks; a
//! single call bounds the work by what is already buffered.
//!
//! Hardware stays outside: the transmit hook is a closure over the
//! platform's UART writer, and the worker side holds the matching
//! [`Sender`](crate::queue::Sender).

use samlink_protocol::{FrameSynchronizer, Packet, SyncStats};

use crate::debug::{DebugChannel, DebugLevel};
use crate::dispatch::{DispatchStats, Dispatcher, Peripherals};
use crate::queue::Receiver;

/// One snapshot of every counter the link maintains
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    pub sync: SyncStats,
    pub dispatch: DispatchStats,
    /// Worker-to-comm packets dropped on a full queue
    pub outbound_dropped: u32,
    /// Debug messages that cleared the filters
    pub debug_emitted: u32,
    /// Debug messages dropped by level or category filtering
    pub debug_suppressed: u32,
}

/// Comm-context link engine: frame sync, dispatch, outbound flush
///
/// `RX` is the ingest ring capacity in bytes; `TX` the outbound queue
/// backing size.
pub struct Link<'a, P: Peripherals, const RX: usize, const TX: usize> {
    sync: FrameSynchronizer<RX>,
    dispatcher: Dispatcher<P>,
    debug: DebugChannel,
    outbound: Receiver<'a, TX>,
}

impl<'a, P: Peripherals, const RX: usize, const TX: usize> Link<'a, P, RX, TX> {
    pub fn new(peripherals: P, debug_level: DebugLevel, outbound: Receiver<'a, TX>) -> Self {
        Self {
            sync: FrameSynchronizer::new(),
            dispatcher: Dispatcher::new(peripherals),
            debug: DebugChannel::new(debug_level),
            outbound,
        }
    }

    /// Feed raw received bytes; returns how many were accepted
    pub fn ingest(&mut self, bytes: &[u8]) -> usize {
        self.sync.ingest(bytes)
    }

    /// Process everything currently available, without blocking
    ///
    /// Decodes and dispatches every complete packet in the ingest ring,
    /// hands each response to `tx`, then drains the worker-to-comm
    /// queue. Returns the number of packets transmitted.
    pub fn comm_pass(&mut self, tx: &mut dyn FnMut(Packet)) -> u32 {
        let mut sent = 0;

        while let Some(packet) = self.sync.poll() {
            if let Some(response) = self.dispatcher.handle(&packet) {
                tx(response);
                sent += 1;
                while let Some(more) = self.dispatcher.take_response() {
                    tx(more);
                    sent += 1;
                }
            }
        }

        while let Some(packet) = self.outbound.recv() {
            tx(packet);
            sent += 1;
        }

        sent
    }

    /// Debug channel for comm-context instrumentation
    pub fn debug(&mut self) -> &mut DebugChannel {
        &mut self.debug
    }

    /// The injected peripheral handlers
    pub fn peripherals_mut(&mut self) -> &mut P {
        self.dispatcher.peripherals_mut()
    }

    pub fn stats(&self) -> LinkStats {
        LinkStats {
            sync: *self.sync.stats(),
            dispatch: *self.dispatcher.stats(),
            outbound_dropped: self.outbound.dropped(),
            debug_emitted: self.debug.emitted(),
            debug_suppressed: self.debug.suppressed(),
        }
    }

    /// Zero every resettable counter; queue drop counts are shared
    /// with the producer side and stay monotonic
    pub fn reset_stats(&mut self) {
        self.sync.reset_stats();
        self.dispatcher.reset_stats();
        self.debug.reset_stats();
    }
}
