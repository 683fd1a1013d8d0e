//! Board-agnostic runtime for the SAM packet link
//!
//! This crate contains the pieces that sit between the raw byte stream
//! and the peripheral drivers, none of which depend on specific
//! hardware:
//!
//! - Message dispatcher with an injected peripheral capability trait
//! - Cooperative priority scheduler with two execution contexts
//! - Bounded SPSC packet queues for cross-context handoff
//! - Debug channel (leveled codes and chunked text over the wire)
//! - The composed link engine and its statistics surface
//!
//! The communication context (frame sync + dispatch) is never allowed
//! to block on peripheral work: queues fail fast when full, the
//! scheduler runs communication tasks to completion before any worker
//! task, and every failure degrades to a counter instead of a stall.

#![no_std]
#![deny(unsafe_code)]

pub mod debug;
pub mod dispatch;
pub mod link;
pub mod queue;
pub mod scheduler;

pub use debug::{DebugChannel, DebugLevel};
pub use dispatch::{DispatchStats, Dispatcher, Peripherals, ERR_REJECTED, ERR_UNKNOWN_COMMAND};
pub use link::{Link, LinkStats};
pub use queue::{PacketQueue, QueueFull, Receiver, Sender};
pub use scheduler::{
    Clock, ExecContext, PassReport, Priority, RegistryFull, Scheduler, TaskId, TaskKind,
};
