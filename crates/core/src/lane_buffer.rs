// SPDX-License-Identifier: BUSL-1.1

//! Four-lane priority buffer with a shared global capacity.
//!
//! Overflow policy is drop-oldest *globally*: when an enqueue would push the
//! combined size of all queued lanes past `capacity`, the chronologically
//! oldest message across all lanes is evicted — not just the oldest within
//! the lane being enqueued into. Each lane is itself FIFO, so only the three
//! lane heads are ever candidates; the one with the smallest arrival
//! sequence number is evicted. This preserves high-priority work under
//! pressure even when its arrival is late.

use std::sync::Arc;

use crate::fifo::BoundedFifo;
use crate::message::{Lane, LaneMessage};
use crate::subscription::{Disposer, HandlerSet};

type InterruptHandler = dyn Fn(&LaneMessage) + Send + Sync;
type OverflowHandler = dyn Fn(&LaneMessage) + Send + Sync;

/// A queued message tagged with its global arrival sequence, so cross-lane
/// age comparisons are possible without relying on wall-clock timestamps.
#[derive(Debug, Clone)]
struct Seated {
    seq: u64,
    message: LaneMessage,
}

/// Per-connection priority buffer. Not `Sync` on its own — callers wrap it
/// in a mutex; a single writer task is expected to drain it while many
/// producers enqueue concurrently.
pub struct LaneBuffer {
    capacity: usize,
    next_seq: u64,
    steer: BoundedFifo<Seated>,
    collect: BoundedFifo<Seated>,
    followup: BoundedFifo<Seated>,
    interrupt_handlers: Arc<HandlerSet<InterruptHandler>>,
    overflow_handlers: Arc<HandlerSet<OverflowHandler>>,
}

impl LaneBuffer {
    pub fn new(capacity: usize) -> Self {
        // Each lane's own FIFO must never evict on its own — overflow is
        // decided solely by the global count, in `dispatch`. Since the
        // global count is restored to at most `cap` after every dispatch, a
        // single lane can transiently hold at most `cap + 1` messages (the
        // one just enqueued, pending the global eviction check below); size
        // each lane's FIFO for that so it never self-evicts first.
        let cap = capacity.max(1);
        #[allow(clippy::expect_used)]
        let new_lane = || BoundedFifo::new(cap + 1).expect("capacity >= 1 by construction");
        Self {
            capacity: cap,
            next_seq: 0,
            steer: new_lane(),
            collect: new_lane(),
            followup: new_lane(),
            interrupt_handlers: Arc::new(HandlerSet::new()),
            overflow_handlers: Arc::new(HandlerSet::new()),
        }
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut BoundedFifo<Seated> {
        match lane {
            Lane::Steer => &mut self.steer,
            Lane::Collect => &mut self.collect,
            Lane::Followup => &mut self.followup,
            Lane::Interrupt => unreachable!("interrupt lane is never queued"),
        }
    }

    fn lane(&self, lane: Lane) -> &BoundedFifo<Seated> {
        match lane {
            Lane::Steer => &self.steer,
            Lane::Collect => &self.collect,
            Lane::Followup => &self.followup,
            Lane::Interrupt => unreachable!("interrupt lane is never queued"),
        }
    }

    /// Dispatch a message. `Lane::Interrupt` messages bypass the queue
    /// entirely and fire all registered interrupt handlers synchronously.
    pub fn dispatch(&mut self, message: LaneMessage) {
        if message.lane == Lane::Interrupt {
            for handler in self.interrupt_handlers.snapshot() {
                handler(&message);
            }
            return;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let lane = message.lane;
        // A lane's own FIFO is sized so this never evicts (see `new`); this
        // stays `None` in practice, and a self-eviction here is handled the
        // same as a global one rather than silently dropped.
        let self_evicted = self.lane_mut(lane).enqueue(Seated { seq, message }).map(|s| s.message);

        let global_evicted =
            if self.total_queued() > self.capacity { self.evict_oldest_globally() } else { None };

        for evicted in self_evicted.into_iter().chain(global_evicted) {
            for handler in self.overflow_handlers.snapshot() {
                handler(&evicted);
            }
        }
    }

    /// Remove the chronologically oldest queued message, comparing the
    /// arrival sequence of each lane's head (the only eviction candidates,
    /// since each lane is internally FIFO).
    fn evict_oldest_globally(&mut self) -> Option<LaneMessage> {
        let oldest_lane = Lane::queued_lanes()
            .into_iter()
            .filter_map(|lane| self.lane(lane).peek().map(|seated| (lane, seated.seq)))
            .min_by_key(|(_, seq)| *seq)
            .map(|(lane, _)| lane)?;

        self.lane_mut(oldest_lane).dequeue().map(|seated| seated.message)
    }

    /// Drain all lanes in priority order (steer, collect, followup), FIFO
    /// within each lane. Empties the buffer.
    pub fn drain(&mut self) -> Vec<LaneMessage> {
        let mut out = Vec::with_capacity(self.total_queued());
        for lane in Lane::queued_lanes() {
            out.extend(self.lane_mut(lane).drain().into_iter().map(|seated| seated.message));
        }
        out
    }

    pub fn queue_size(&self, lane: Lane) -> usize {
        if lane == Lane::Interrupt {
            return 0;
        }
        self.lane(lane).len()
    }

    pub fn total_queued(&self) -> usize {
        self.steer.len() + self.collect.len() + self.followup.len()
    }

    pub fn on_interrupt(
        self_arc: &Arc<parking_lot::Mutex<Self>>,
        handler: impl Fn(&LaneMessage) + Send + Sync + 'static,
    ) -> Disposer<InterruptHandler> {
        self_arc.lock().interrupt_handlers.register(Arc::new(handler))
    }

    pub fn on_overflow(
        self_arc: &Arc<parking_lot::Mutex<Self>>,
        handler: impl Fn(&LaneMessage) + Send + Sync + 'static,
    ) -> Disposer<OverflowHandler> {
        self_arc.lock().overflow_handlers.register(Arc::new(handler))
    }
}

#[cfg(test)]
#[path = "lane_buffer_tests.rs"]
mod tests;
