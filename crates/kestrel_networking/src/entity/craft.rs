//! The craft: one player-driven entity as seen by one peer.

use kestrel_shared::math::compress_axis_to_byte;
use kestrel_shared::{CosmeticEvent, EntityId, GameConfig, MovementProfile, ScalarChannel, Vec3};

use super::{AmmoHolder, Context, Damageable, DebugObservable, DebugStats, Movable, Role};
use crate::fire::{AmmoLedger, FireAuthority, FireDecision, FireRejection, ServerView, Shooter};
use crate::movement::{CraftInput, Kinematics, MovementPredictor};
use crate::pickup::PickupGrant;
use crate::projectile::{ExplosionCause, ProjectilePool, SlotIndex};
use crate::protocol::{FireOrder, Message};
use crate::reconciliation::{ReconcileOutcome, ReconciliationApplier};
use crate::replicator::ReplicatorSet;
use crate::transport::{Delivery, Envelope, PeerId, Target, Transport};
use crate::vitals::Health;

/// Distance in front of the craft where rockets spawn.
pub const MUZZLE_OFFSET: f32 = 60.0;

/// Name of the built-in lean scalar.
const LEAN_CHANNEL: &str = "lean";

/// A rocket hit, reported by the server's projectile simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitReport {
    /// Craft whose rocket hit.
    pub shooter: EntityId,
    /// Craft that was hit.
    pub target: EntityId,
    /// Damage to apply.
    pub damage: f32,
}

/// One craft replica.
#[derive(Clone, Debug)]
pub struct Craft {
    id: EntityId,
    owner: PeerId,
    profile: Option<MovementProfile>,
    kinematics: Kinematics,
    input: CraftInput,
    predictor: MovementPredictor,
    reconciliation: ReconciliationApplier,
    health: Health,
    ledger: AmmoLedger,
    shooter: Shooter,
    authority: FireAuthority,
    pool: ProjectilePool,
    scalars: ReplicatorSet,
    lean: ScalarChannel,
    missing_profile_reported: bool,
}

impl Craft {
    /// Creates a replica at rest.
    #[must_use]
    pub fn new(id: EntityId, owner: PeerId, config: &GameConfig, location: Vec3, yaw: f32) -> Self {
        let mut scalars = ReplicatorSet::new(id, config.replicator);
        let lean = scalars.add(LEAN_CHANNEL);
        Self {
            id,
            owner,
            profile: Some(config.movement),
            kinematics: Kinematics::at_rest(location, yaw),
            input: CraftInput::default(),
            predictor: MovementPredictor::new(),
            reconciliation: ReconciliationApplier::new(config.reconciliation),
            health: Health::new(config.movement.max_health),
            ledger: AmmoLedger::new(config.projectile.starting_ammo),
            shooter: Shooter::new(config.movement.fire_cooldown, config.projectile.unlimited),
            authority: FireAuthority::new(&config.projectile, MUZZLE_OFFSET),
            pool: ProjectilePool::new(id, config.projectile),
            scalars,
            lean,
            missing_profile_reported: false,
        }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Owning peer.
    #[must_use]
    pub const fn owner(&self) -> PeerId {
        self.owner
    }

    /// Role of this replica.
    #[must_use]
    pub fn role(&self, transport: &dyn Transport) -> Role {
        Role::resolve(self.owner, transport.local_peer(), transport.server_peer())
    }

    /// Returns true if input for this craft originates on this peer.
    #[must_use]
    pub fn is_locally_controlled(&self, transport: &dyn Transport) -> bool {
        self.owner == transport.local_peer()
    }

    /// Assigns or removes the Movement Profile.
    pub fn set_profile(&mut self, profile: Option<MovementProfile>) {
        self.profile = profile;
        self.missing_profile_reported = false;
    }

    /// Movement Profile, if assigned.
    #[must_use]
    pub const fn profile(&self) -> Option<&MovementProfile> {
        self.profile.as_ref()
    }

    /// Input applied on the next step.
    pub fn set_input(&mut self, input: CraftInput) {
        self.input = input;
    }

    /// Movement state.
    #[must_use]
    pub const fn kinematics(&self) -> &Kinematics {
        &self.kinematics
    }

    /// Rockets.
    #[must_use]
    pub const fn pool(&self) -> &ProjectilePool {
        &self.pool
    }

    /// Rocket counts.
    #[must_use]
    pub const fn ledger(&self) -> &AmmoLedger {
        &self.ledger
    }

    /// Fire arbiter (meaningful on the server).
    #[must_use]
    pub const fn authority(&self) -> &FireAuthority {
        &self.authority
    }

    /// Trigger state (meaningful on the controlling peer).
    #[must_use]
    pub const fn shooter(&self) -> &Shooter {
        &self.shooter
    }

    /// Observer-side movement state.
    #[must_use]
    pub const fn reconciliation(&self) -> &ReconciliationApplier {
        &self.reconciliation
    }

    /// Replicated scalars.
    #[must_use]
    pub const fn scalars(&self) -> &ReplicatorSet {
        &self.scalars
    }

    /// Mutable replicated scalars.
    pub fn scalars_mut(&mut self) -> &mut ReplicatorSet {
        &mut self.scalars
    }

    /// Channel of the built-in lean scalar.
    #[must_use]
    pub const fn lean_channel(&self) -> ScalarChannel {
        self.lean
    }

    /// Simulates one tick. Returns hits only on the server.
    pub fn step(&mut self, dt: f32, ctx: &mut Context<'_>) -> Vec<HitReport> {
        let Some(profile) = self.profile else {
            self.report_missing_profile();
            return Vec::new();
        };

        self.shooter.tick(dt);

        if self.is_locally_controlled(&*ctx.transport) {
            let sample = self.predictor.tick(
                &mut self.kinematics,
                &profile,
                self.input,
                dt,
                &mut *ctx.world,
                self.id,
            );
            Self::publish(
                ctx,
                Delivery::Unreliable,
                Message::Movement {
                    entity: self.id,
                    sample,
                },
            );

            let lean = self.input.turn * self.kinematics.speed_ratio(&profile);
            if let Some(replicator) = self.scalars.get_mut(self.lean) {
                replicator.set_value(lean);
            }
            for send in self.scalars.tick_owner(dt) {
                Self::publish(ctx, send.delivery(), send.message());
            }
        } else {
            // The server holds the owner's last sample; only observers dead-reckon.
            if !ctx.is_server() {
                self.reconciliation
                    .extrapolate(&mut self.kinematics, &profile, dt, &mut *ctx.world, self.id);
            }
            self.scalars.tick_receiver(dt);
        }

        for event in self.scalars.drain_changes() {
            ctx.events.emit(event);
        }

        let is_server = ctx.is_server();
        let mut hits = Vec::new();
        for event in self.pool.tick(dt, &*ctx.world) {
            ctx.events.emit(CosmeticEvent::RocketExploded {
                entity: self.id,
                slot: event.slot.0,
                location: event.location,
            });
            if let ExplosionCause::HitCraft(target) = event.cause {
                if is_server {
                    hits.push(HitReport {
                        shooter: self.id,
                        target,
                        damage: self.pool.damage(),
                    });
                }
            }
        }
        hits
    }

    /// Requests a rocket launch from the controlling peer.
    ///
    /// # Errors
    ///
    /// Returns the local check that refused the launch. A launch the server
    /// later refuses is undone by a rollback, not reported here.
    pub fn fire_rocket(&mut self, ctx: &mut Context<'_>) -> Result<SlotIndex, FireRejection> {
        if !self.is_locally_controlled(&*ctx.transport) {
            return Err(FireRejection::NotControlled);
        }
        let slot = self.shooter.prepare(&mut self.ledger, &self.pool)?;
        let facing = self.kinematics.forward();
        let order = FireOrder {
            entity: self.id,
            slot,
            origin: self.kinematics.location + facing * MUZZLE_OFFSET,
            facing,
        };
        self.emit_ammo(ctx);

        if ctx.is_server() {
            // Listen server: ask the authority first, never move twice.
            let view = self.server_view();
            match self
                .authority
                .handle_request(&mut self.ledger, &self.pool, &order, view)
            {
                FireDecision::Confirmed(confirmed) => {
                    self.shooter.confirm(slot);
                    self.launch(&confirmed, ctx);
                    ctx.transport
                        .send(Target::Broadcast, Delivery::Reliable, &Message::FireConfirmed(confirmed));
                    Ok(slot)
                }
                FireDecision::Rollback(slot) => {
                    self.shooter.rollback(&mut self.ledger, &mut self.pool, slot);
                    self.emit_ammo(ctx);
                    Err(FireRejection::OutOfAmmo)
                }
            }
        } else {
            self.launch(&order, ctx);
            ctx.transport
                .send(Target::Server, Delivery::Reliable, &Message::FireRequest(order));
            tracing::debug!(entity = %self.id, slot = slot.0, "fire requested");
            Ok(slot)
        }
    }

    /// Applies one incoming message addressed to this craft.
    pub fn handle_message(&mut self, envelope: &Envelope, ctx: &mut Context<'_>) {
        let is_server = ctx.is_server();
        let from_owner = envelope.from == self.owner;
        let from_server = envelope.from == ctx.transport.server_peer();
        let locally_controlled = self.is_locally_controlled(&*ctx.transport);
        if !(from_server || (is_server && from_owner)) {
            tracing::debug!(entity = %self.id, from = %envelope.from, kind = ?envelope.message.kind(), "message from unexpected peer");
            return;
        }

        match envelope.message {
            Message::Movement { sample, .. } => {
                if locally_controlled {
                    return;
                }
                let Some(profile) = self.profile else {
                    self.report_missing_profile();
                    return;
                };
                let outcome = if is_server {
                    self.reconciliation.apply_authoritative(
                        &mut self.kinematics,
                        &profile,
                        &sample,
                        &mut *ctx.world,
                        self.id,
                    )
                } else {
                    self.reconciliation.apply_sample(
                        &mut self.kinematics,
                        &profile,
                        &sample,
                        &mut *ctx.world,
                        self.id,
                    )
                };
                if let ReconcileOutcome::Applied {
                    correction: Some(c),
                    ..
                } = outcome
                {
                    ctx.events.emit(CosmeticEvent::CorrectionApplied {
                        entity: self.id,
                        error: c.error,
                        smoothed: c.smoothed,
                    });
                }
                if is_server && outcome != ReconcileOutcome::Stale {
                    self.relay(envelope, ctx);
                }
            }
            Message::ScalarUpdate(_) | Message::ScalarTerminal(_) => {
                if locally_controlled {
                    return;
                }
                if self.scalars.receive(&envelope.message) && is_server {
                    self.relay(envelope, ctx);
                }
                for event in self.scalars.drain_changes() {
                    ctx.events.emit(event);
                }
            }
            Message::FireRequest(order) => {
                if !is_server || !from_owner {
                    return;
                }
                self.handle_fire_request(&order, envelope.from, ctx);
            }
            Message::FireConfirmed(order) => {
                if is_server {
                    return;
                }
                if locally_controlled {
                    // Already moving since the trigger; only steer it.
                    self.shooter.confirm(order.slot);
                    self.pool.apply_correction(order.slot, order.facing);
                } else {
                    self.launch(&order, ctx);
                }
            }
            Message::FireRollback { slot, .. } => {
                if !locally_controlled || is_server {
                    return;
                }
                tracing::warn!(entity = %self.id, slot = slot.0, "fire rolled back");
                let location = self.pool.slot(slot).map(|s| s.location);
                if self.shooter.rollback(&mut self.ledger, &mut self.pool, slot) {
                    ctx.events.emit(CosmeticEvent::RocketExploded {
                        entity: self.id,
                        slot: slot.0,
                        location: location.unwrap_or(self.kinematics.location),
                    });
                }
                self.emit_ammo(ctx);
            }
            Message::AmmoGranted { amount, .. } => {
                if locally_controlled && !is_server {
                    self.ledger.grant_predicted(amount);
                    self.emit_ammo(ctx);
                }
            }
            Message::HealthUpdate { health, .. } => {
                if !is_server && self.health.set(health) {
                    self.emit_health(ctx);
                }
            }
        }
    }

    fn handle_fire_request(&mut self, order: &FireOrder, requester: PeerId, ctx: &mut Context<'_>) {
        let view = self.server_view();
        match self
            .authority
            .handle_request(&mut self.ledger, &self.pool, order, view)
        {
            FireDecision::Confirmed(confirmed) => {
                self.launch(&confirmed, ctx);
                ctx.transport
                    .send(Target::Broadcast, Delivery::Reliable, &Message::FireConfirmed(confirmed));
            }
            FireDecision::Rollback(slot) => {
                ctx.transport.send(
                    Target::Peer(requester),
                    Delivery::Reliable,
                    &Message::FireRollback {
                        entity: self.id,
                        slot,
                    },
                );
            }
        }
    }

    /// Starts a slot moving, recycling it if this peer still has it in flight.
    fn launch(&mut self, order: &FireOrder, ctx: &mut Context<'_>) {
        if let Some(location) = self.pool.explode(order.slot) {
            ctx.events.emit(CosmeticEvent::RocketExploded {
                entity: self.id,
                slot: order.slot.0,
                location,
            });
        }
        if self.pool.start_moving(order.slot, order.origin, order.facing) {
            ctx.events.emit(CosmeticEvent::RocketLaunched {
                entity: self.id,
                slot: order.slot.0,
                origin: order.origin,
            });
        }
    }

    fn server_view(&self) -> ServerView {
        ServerView {
            location: self.kinematics.location,
            yaw: self.kinematics.yaw,
        }
    }

    /// Owner-originated stream: straight to everyone on a listen server,
    /// otherwise through the server.
    fn publish(ctx: &mut Context<'_>, delivery: Delivery, message: Message) {
        let target = if ctx.is_server() {
            Target::Broadcast
        } else {
            Target::Server
        };
        ctx.transport.send(target, delivery, &message);
    }

    /// Server: forwards an owner's message to every other peer.
    fn relay(&self, envelope: &Envelope, ctx: &mut Context<'_>) {
        ctx.transport.send(
            Target::BroadcastExcept(self.owner),
            envelope.delivery,
            &envelope.message,
        );
    }

    fn emit_ammo(&self, ctx: &Context<'_>) {
        ctx.events.emit(CosmeticEvent::AmmoChanged {
            entity: self.id,
            count: self.ledger.predicted_count(),
        });
    }

    fn emit_health(&self, ctx: &Context<'_>) {
        ctx.events.emit(CosmeticEvent::HealthChanged {
            entity: self.id,
            health: self.health.current(),
            max_health: self.health.max(),
        });
    }

    fn report_missing_profile(&mut self) {
        if cfg!(debug_assertions) && !self.missing_profile_reported {
            self.missing_profile_reported = true;
            tracing::error!(entity = %self.id, "no movement profile assigned, craft simulation disabled");
        }
    }
}

impl Movable for Craft {
    fn location(&self) -> Vec3 {
        self.kinematics.location
    }

    fn facing_yaw(&self) -> f32 {
        self.kinematics.yaw
    }

    fn velocity(&self) -> f32 {
        self.kinematics.velocity
    }

    fn visual_location(&self) -> Vec3 {
        self.reconciliation.visual_location(&self.kinematics)
    }
}

impl Damageable for Craft {
    fn health(&self) -> Health {
        self.health
    }

    fn on_hit(&mut self, damage: f32, ctx: &mut Context<'_>) -> bool {
        if !ctx.is_server() {
            return false;
        }
        if !self.health.on_hit(damage) {
            return false;
        }
        tracing::info!(entity = %self.id, damage, health = self.health.current(), "craft hit");
        ctx.transport.send(
            Target::Broadcast,
            Delivery::Reliable,
            &Message::HealthUpdate {
                entity: self.id,
                health: self.health.current(),
            },
        );
        self.emit_health(ctx);
        true
    }
}

impl AmmoHolder for Craft {
    fn predicted_ammo(&self) -> u32 {
        self.ledger.predicted_count()
    }

    fn server_ammo(&self) -> u32 {
        self.ledger.server_count()
    }

    fn on_pickup(&mut self, grant: PickupGrant, ctx: &mut Context<'_>) {
        if !ctx.is_server() {
            return;
        }
        match grant {
            PickupGrant::Rockets(amount) => {
                self.authority.grant(&mut self.ledger, amount);
                if self.is_locally_controlled(&*ctx.transport) {
                    self.ledger.grant_predicted(amount);
                    self.emit_ammo(ctx);
                } else {
                    ctx.transport.send(
                        Target::Peer(self.owner),
                        Delivery::Reliable,
                        &Message::AmmoGranted {
                            entity: self.id,
                            amount,
                        },
                    );
                }
            }
            PickupGrant::Health(amount) => {
                if self.health.heal(amount) {
                    ctx.transport.send(
                        Target::Broadcast,
                        Delivery::Reliable,
                        &Message::HealthUpdate {
                            entity: self.id,
                            health: self.health.current(),
                        },
                    );
                    self.emit_health(ctx);
                }
            }
        }
    }
}

impl DebugObservable for Craft {
    fn debug_stats(&self, transport: &dyn Transport) -> DebugStats {
        let reconciliation = self.reconciliation.stats();
        DebugStats {
            entity: self.id,
            role: self.role(transport),
            location: self.kinematics.location,
            yaw_byte: compress_axis_to_byte(self.kinematics.yaw),
            velocity: self.kinematics.velocity,
            health: self.health.current(),
            predicted_ammo: self.ledger.predicted_count(),
            server_ammo: self.ledger.server_count(),
            rockets_in_flight: self.pool.in_flight(),
            stale_samples: reconciliation.discarded,
            corrections: reconciliation.corrections,
            round_trip: transport.round_trip_estimate(),
        }
    }
}
