//! Bounded cross-context packet queues
//!
//! One queue per direction between the communication context and the
//! worker context, single producer and single consumer each. Capacity
//! is fixed at construction; enqueueing onto a full queue drops the new
//! packet and bumps a shared counter instead of blocking. That keeps
//! the communication path latency-bounded at the cost of losing
//! telemetry under sustained overload.

use heapless::spsc::{Consumer, Producer, Queue};
use portable_atomic::{AtomicU32, Ordering};
use samlink_protocol::Packet;

/// The queue was full; the packet was dropped and counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// A bounded SPSC packet queue
///
/// `N` is the backing store size; `N - 1` packets fit at once. Split
/// into a [`Sender`] and [`Receiver`] before use; the halves may live
/// on different threads.
pub struct PacketQueue<const N: usize> {
    queue: Queue<Packet, N>,
    dropped: AtomicU32,
}

impl<const N: usize> Default for PacketQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketQueue<N> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Split into producer and consumer halves
    pub fn split(&mut self) -> (Sender<'_, N>, Receiver<'_, N>) {
        let Self { queue, dropped } = self;
        let (producer, consumer) = queue.split();
        (
            Sender { producer, dropped },
            Receiver { consumer, dropped },
        )
    }
}

/// Producer half of a [`PacketQueue`]
pub struct Sender<'a, const N: usize> {
    producer: Producer<'a, Packet, N>,
    dropped: &'a AtomicU32,
}

impl<const N: usize> Sender<'_, N> {
    /// Non-blocking enqueue; drops the packet when full
    pub fn send(&mut self, packet: Packet) -> Result<(), QueueFull> {
        match self.producer.enqueue(packet) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(QueueFull)
            }
        }
    }

    /// Packets dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half of a [`PacketQueue`]
pub struct Receiver<'a, const N: usize> {
    consumer: Consumer<'a, Packet, N>,
    dropped: &'a AtomicU32,
}

impl<const N: usize> Receiver<'_, N> {
    /// Non-blocking dequeue
    pub fn recv(&mut self) -> Option<Packet> {
        self.consumer.dequeue()
    }

    /// Packets dropped because the queue was full
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
