//! # Scalar Replication
//!
//! Replicates one continuously varying `f32` from its owner to everyone else
//! at a bounded rate, without visible stepping on the receiving side.
//!
//! ## Owner
//!
//! ```text
//!            set_value(new)                 unchanged > sleep_after
//! Sleeping ─────────────────> Active ──────────────────────────────> Sleeping
//!                               │        (reliable Terminal sent)
//!                               └─ every interval: unreliable Update
//! ```
//!
//! ## Receiver
//!
//! - Updates pass a [`SyncTagGate`]; stale and duplicate ones are dropped
//! - Accepted updates become crumbs; the current value is smoothed toward
//!   them (constant velocity, or a Catmull-Rom spline through the crumbs)
//! - A Terminal snaps the current value exactly and stops smoothing until
//!   the next update

mod crumbs;
mod set;

pub use crumbs::{Crumb, CrumbTrail};
pub use set::ReplicatorSet;

use kestrel_shared::constants::CRUMB_TRAIL_CAPACITY;
use kestrel_shared::math::{catmull_rom, interp_constant_to};
use kestrel_shared::{CosmeticEvent, EntityId, ReplicatorSettings, ScalarChannel, SmoothMode};

use crate::protocol::{Message, ScalarMessage};
use crate::sync_tag::{SyncTag, SyncTagAllocator, SyncTagGate};
use crate::transport::Delivery;

/// Shortest spline segment, as a fraction of the replication interval.
const MIN_SEGMENT_FRACTION: f32 = 0.25;
/// Longest spline segment, as a fraction of the replication interval.
const MAX_SEGMENT_FRACTION: f32 = 4.0;

/// Something the owner must put on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarSend {
    /// Unreliable intermediate value.
    Update(ScalarMessage),
    /// Reliable settled value.
    Terminal(ScalarMessage),
}

impl ScalarSend {
    /// Guarantee to send it with.
    #[must_use]
    pub const fn delivery(&self) -> Delivery {
        match self {
            Self::Update(_) => Delivery::Unreliable,
            Self::Terminal(_) => Delivery::Reliable,
        }
    }

    /// Wire message.
    #[must_use]
    pub const fn message(&self) -> Message {
        match *self {
            Self::Update(m) => Message::ScalarUpdate(m),
            Self::Terminal(m) => Message::ScalarTerminal(m),
        }
    }
}

/// Counters for the debug readout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplicatorStats {
    /// Unreliable updates sent.
    pub updates_sent: u64,
    /// Terminal values sent.
    pub terminals_sent: u64,
    /// Updates and terminals applied.
    pub received: u64,
    /// Updates and terminals discarded as stale.
    pub discarded: u64,
}

/// One replicated scalar.
#[derive(Clone, Debug)]
pub struct ScalarReplicator {
    entity: EntityId,
    channel: ScalarChannel,
    settings: ReplicatorSettings,

    target: f32,
    current: f32,
    last_sent: Option<f32>,
    static_time: f32,
    send_timer: f32,
    sleeping: bool,
    has_sent_terminal: bool,
    tags: SyncTagAllocator,

    gate: SyncTagGate,
    crumbs: CrumbTrail,
    has_received_terminal: bool,
    lerp_speed: f32,
    receiver_clock: f64,
    spline_prev: f32,
    spline_from: f32,
    spline_from_at: Option<f64>,
    segment_duration: f32,
    segment_remaining: f32,

    last_quantized: i64,
    pending_change: Option<f32>,
    stats: ReplicatorStats,
}

impl ScalarReplicator {
    /// Creates a settled replicator holding `initial` on every side.
    #[must_use]
    pub fn new(
        entity: EntityId,
        channel: ScalarChannel,
        settings: ReplicatorSettings,
        initial: f32,
    ) -> Self {
        let mut replicator = Self {
            entity,
            channel,
            settings,
            target: initial,
            current: initial,
            last_sent: Some(initial),
            static_time: 0.0,
            send_timer: 0.0,
            sleeping: true,
            has_sent_terminal: true,
            tags: SyncTagAllocator::new(),
            gate: SyncTagGate::new(),
            crumbs: CrumbTrail::new(CRUMB_TRAIL_CAPACITY),
            has_received_terminal: false,
            lerp_speed: 0.0,
            receiver_clock: 0.0,
            spline_prev: initial,
            spline_from: initial,
            spline_from_at: None,
            segment_duration: 0.0,
            segment_remaining: 0.0,
            last_quantized: 0,
            pending_change: None,
            stats: ReplicatorStats::default(),
        };
        replicator.last_quantized = replicator.quantize(initial);
        replicator
    }

    /// Scalar within its entity.
    #[must_use]
    pub const fn channel(&self) -> ScalarChannel {
        self.channel
    }

    /// Value as seen on this peer.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.current
    }

    /// Newest target (owner: last `set_value`; receiver: last accepted value).
    #[must_use]
    pub const fn target(&self) -> f32 {
        self.target
    }

    /// Owner side: no updates are being sent.
    #[must_use]
    pub const fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Owner side: the current target was sealed with a terminal value.
    #[must_use]
    pub const fn has_sent_terminal(&self) -> bool {
        self.has_sent_terminal
    }

    /// Receiver side: the last thing applied was a terminal value.
    #[must_use]
    pub const fn has_received_terminal(&self) -> bool {
        self.has_received_terminal
    }

    /// Receiver side: newest tag applied.
    #[must_use]
    pub const fn last_applied_tag(&self) -> Option<SyncTag> {
        self.gate.last_applied()
    }

    /// Receiver side: recent targets.
    #[must_use]
    pub const fn crumbs(&self) -> &CrumbTrail {
        &self.crumbs
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> ReplicatorStats {
        self.stats
    }

    /// Owner side: sets a new target and wakes the replicator.
    ///
    /// Setting the value it already holds changes nothing, so a caller may
    /// set every tick without keeping a settled scalar awake.
    #[allow(clippy::float_cmp)]
    pub fn set_value(&mut self, value: f32) {
        if value == self.target {
            return;
        }
        self.target = value;
        self.current = value;
        self.static_time = 0.0;
        self.has_sent_terminal = false;
        if self.sleeping {
            self.sleeping = false;
            self.send_timer = 0.0;
            tracing::debug!(entity = %self.entity, channel = self.channel.0, "replicator awake");
        }
        self.note_change();
    }

    /// Owner side: advances timers and returns what to send this tick.
    #[allow(clippy::float_cmp)]
    pub fn tick_owner(&mut self, dt: f32) -> Option<ScalarSend> {
        if self.sleeping {
            return None;
        }
        self.static_time += dt;
        self.send_timer -= dt;

        if self.static_time > self.settings.sleep_after && self.last_sent == Some(self.target) {
            self.sleeping = true;
            self.has_sent_terminal = true;
            self.stats.terminals_sent += 1;
            let message = self.outgoing();
            tracing::info!(
                entity = %self.entity,
                channel = self.channel.0,
                value = self.target,
                "replicator settled"
            );
            return Some(ScalarSend::Terminal(message));
        }

        if self.send_timer <= 0.0 {
            let interval = self.settings.interval();
            self.send_timer = interval + self.send_timer.max(-interval);
            self.last_sent = Some(self.target);
            self.stats.updates_sent += 1;
            let message = self.outgoing();
            tracing::trace!(entity = %self.entity, channel = self.channel.0, tag = message.tag.0, "scalar update");
            return Some(ScalarSend::Update(message));
        }
        None
    }

    /// Receiver side: applies an unreliable update. Returns false if stale.
    pub fn receive_update(&mut self, message: &ScalarMessage) -> bool {
        if !self.admit(message) {
            return false;
        }
        if self.crumbs.pending() == 0 {
            self.spline_prev = self.current;
            self.spline_from = self.current;
            self.segment_remaining = 0.0;
        }
        self.crumbs.push(message.value, self.receiver_clock);
        self.has_received_terminal = false;
        self.target = message.value;
        self.lerp_speed =
            (self.target - self.current).abs() * self.settings.replications_per_second.max(1) as f32;
        true
    }

    /// Receiver side: applies a terminal value. Returns false if stale.
    pub fn receive_terminal(&mut self, message: &ScalarMessage) -> bool {
        if !self.admit(message) {
            return false;
        }
        self.target = message.value;
        self.current = message.value;
        self.has_received_terminal = true;
        self.crumbs.clear();
        self.lerp_speed = 0.0;
        self.spline_prev = message.value;
        self.spline_from = message.value;
        self.spline_from_at = None;
        self.segment_remaining = 0.0;
        self.note_change();
        true
    }

    /// Receiver side: smooths the current value for one tick.
    pub fn tick_receiver(&mut self, dt: f32) {
        self.receiver_clock += f64::from(dt);
        if self.has_received_terminal {
            return;
        }
        match self.settings.mode {
            SmoothMode::ConstantVelocity => {
                self.current = interp_constant_to(self.current, self.target, dt, self.lerp_speed);
            }
            SmoothMode::Spline => self.play_spline(dt),
        }
        self.note_change();
    }

    /// Takes the pending change notification, if the quantized value moved.
    pub fn take_value_changed(&mut self) -> Option<CosmeticEvent> {
        self.pending_change.take().map(|value| CosmeticEvent::ValueChanged {
            entity: self.entity,
            channel: self.channel,
            value,
        })
    }

    fn outgoing(&mut self) -> ScalarMessage {
        ScalarMessage {
            entity: self.entity,
            channel: self.channel,
            tag: self.tags.allocate(),
            value: self.target,
        }
    }

    fn admit(&mut self, message: &ScalarMessage) -> bool {
        if self.gate.admit(message.tag) {
            self.stats.received += 1;
            true
        } else {
            self.stats.discarded += 1;
            tracing::debug!(
                entity = %self.entity,
                channel = self.channel.0,
                tag = message.tag.0,
                "stale scalar discarded"
            );
            false
        }
    }

    /// Plays the crumbs along a Catmull-Rom curve. Each segment lasts as
    /// long as the gap between the arrivals of its two crumbs, so uneven
    /// arrival plays back unevenly too.
    fn play_spline(&mut self, dt: f32) {
        let mut left = dt;
        while left > 0.0 {
            let Some((next, after)) = self.crumbs.upcoming() else {
                return;
            };
            if self.segment_remaining <= 0.0 {
                self.segment_duration = self.segment_duration_to(&next);
                self.segment_remaining = self.segment_duration;
            }
            let used = left.min(self.segment_remaining);
            self.segment_remaining -= used;
            left -= used;

            if self.segment_remaining <= 0.0 {
                self.spline_prev = self.spline_from;
                self.spline_from = next.value;
                self.spline_from_at = Some(next.received_at);
                self.current = next.value;
                self.crumbs.advance();
            } else {
                let t = 1.0 - self.segment_remaining / self.segment_duration;
                self.current = catmull_rom(
                    self.spline_prev,
                    self.spline_from,
                    next.value,
                    after.map_or(next.value, |c| c.value),
                    t,
                );
            }
        }
    }

    /// Playback time toward `next`: its arrival gap, bounded around the
    /// nominal interval. With no previous crumb the nominal interval is used.
    fn segment_duration_to(&self, next: &Crumb) -> f32 {
        let interval = self.settings.interval();
        self.spline_from_at.map_or(interval, |from| {
            next.gap_since(from).clamp(
                interval * MIN_SEGMENT_FRACTION,
                interval * MAX_SEGMENT_FRACTION,
            )
        })
    }

    fn quantize(&self, value: f32) -> i64 {
        (value / self.settings.quantum).round() as i64
    }

    fn note_change(&mut self) {
        let q = self.quantize(self.current);
        if q != self.last_quantized {
            self.last_quantized = q;
            self.pending_change = Some(q as f32 * self.settings.quantum);
        }
    }
}
