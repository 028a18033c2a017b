//! # Optimistic Fire
//!
//! The controlling peer launches a rocket the moment the trigger is pulled;
//! the server decides afterwards whether it really happened.
//!
//! ## Protocol
//!
//! ```text
//! controlling peer              server                      observers
//! ────────────────              ──────                      ─────────
//! cooldown + predicted ammo
//! slot = find_free(awaiting answers)
//! start_moving(slot)  (skipped on a listen server)
//! FireRequest ────────────────> FireAuthority
//!                               server ammo? ──no──> FireRollback ──> make_free(slot)
//!                                   │ yes                             predicted += 1
//!                               correct facing
//! apply_correction(slot) <───── FireConfirmed ───────────────> start_moving(slot)
//! ```
//!
//! The server count is the only one that matters. The predicted count
//! exists so the firer gets instant feedback, and reconverges through
//! rollbacks and grants within one round trip.

use std::collections::BTreeSet;

use kestrel_shared::math::delta_angle_degrees;
use kestrel_shared::{ProjectileSettings, Vec3};
use thiserror::Error;

use crate::projectile::{ProjectilePool, SlotIndex};
use crate::protocol::FireOrder;

/// Local refusal to fire. Never sent over the network.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRejection {
    /// The fire cooldown has not elapsed.
    #[error("fire is cooling down")]
    CoolingDown,

    /// No rockets left in the predicted count.
    #[error("out of rockets")]
    OutOfAmmo,

    /// Every slot is already in flight.
    #[error("projectile pool exhausted")]
    PoolExhausted,

    /// This peer does not control the craft.
    #[error("craft is not controlled by this peer")]
    NotControlled,
}

/// Rocket counts of one craft.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AmmoLedger {
    server_count: u32,
    predicted_count: u32,
    granted_total: u64,
}

impl AmmoLedger {
    /// Creates a ledger with `starting` rockets on both sides.
    #[must_use]
    pub const fn new(starting: u32) -> Self {
        Self {
            server_count: starting,
            predicted_count: starting,
            granted_total: starting as u64,
        }
    }

    /// Authoritative count (meaningful on the server).
    #[must_use]
    pub const fn server_count(&self) -> u32 {
        self.server_count
    }

    /// Optimistic count (meaningful on the controlling peer).
    #[must_use]
    pub const fn predicted_count(&self) -> u32 {
        self.predicted_count
    }

    /// Rockets ever granted on the server, starting stock included.
    #[must_use]
    pub const fn granted_total(&self) -> u64 {
        self.granted_total
    }

    /// Server side: adds rockets.
    pub fn grant_server(&mut self, amount: u32) {
        self.server_count = self.server_count.saturating_add(amount);
        self.granted_total += u64::from(amount);
    }

    /// Server side: spends one rocket if there is one.
    pub fn consume_server(&mut self) -> bool {
        if self.server_count == 0 {
            return false;
        }
        self.server_count -= 1;
        true
    }

    /// Controlling side: adds granted rockets.
    pub fn grant_predicted(&mut self, amount: u32) {
        self.predicted_count = self.predicted_count.saturating_add(amount);
    }

    /// Controlling side: spends one rocket ahead of confirmation.
    pub fn consume_predicted(&mut self) -> bool {
        if self.predicted_count == 0 {
            return false;
        }
        self.predicted_count -= 1;
        true
    }

    /// Controlling side: gives back a rocket whose launch was rolled back.
    pub fn refund_predicted(&mut self) {
        self.predicted_count = self.predicted_count.saturating_add(1);
    }
}

/// Controlling-side trigger: cooldown and local checks.
///
/// A slot stays reserved from the trigger until the server answers, even if
/// its rocket already exploded locally, so a late rollback can never hit a
/// newer launch from the same slot.
#[derive(Clone, Debug)]
pub struct Shooter {
    cooldown: f32,
    remaining: f32,
    unlimited: bool,
    rollbacks: u64,
    awaiting: BTreeSet<SlotIndex>,
}

impl Shooter {
    /// Creates a trigger that is ready immediately.
    #[must_use]
    pub const fn new(cooldown: f32, unlimited: bool) -> Self {
        Self {
            cooldown,
            remaining: 0.0,
            unlimited,
            rollbacks: 0,
            awaiting: BTreeSet::new(),
        }
    }

    /// Counts the cooldown down.
    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    /// Returns true if the cooldown has elapsed.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Rollbacks received so far.
    #[must_use]
    pub const fn rollbacks(&self) -> u64 {
        self.rollbacks
    }

    /// Returns true if `slot` was requested and the server has not answered yet.
    #[must_use]
    pub fn is_awaiting(&self, slot: SlotIndex) -> bool {
        self.awaiting.contains(&slot)
    }

    /// The server confirmed the launch from `slot`.
    pub fn confirm(&mut self, slot: SlotIndex) {
        self.awaiting.remove(&slot);
    }

    /// Runs the local checks and reserves a slot and a predicted rocket.
    ///
    /// # Errors
    ///
    /// Returns the first check that failed; nothing is consumed then.
    pub fn prepare(
        &mut self,
        ledger: &mut AmmoLedger,
        pool: &ProjectilePool,
    ) -> Result<SlotIndex, FireRejection> {
        if !self.ready() {
            return Err(FireRejection::CoolingDown);
        }
        if !self.unlimited && ledger.predicted_count() == 0 {
            return Err(FireRejection::OutOfAmmo);
        }
        let slot = pool
            .find_free(&self.awaiting)
            .ok_or(FireRejection::PoolExhausted)?;
        if !self.unlimited {
            ledger.consume_predicted();
        }
        self.awaiting.insert(slot);
        self.remaining = self.cooldown;
        Ok(slot)
    }

    /// Undoes an optimistic launch. Returns true if the slot was still moving.
    pub fn rollback(
        &mut self,
        ledger: &mut AmmoLedger,
        pool: &mut ProjectilePool,
        slot: SlotIndex,
    ) -> bool {
        self.rollbacks += 1;
        self.awaiting.remove(&slot);
        if !self.unlimited {
            ledger.refund_predicted();
        }
        pool.make_free(slot)
    }
}

/// The server's current view of the firing craft.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServerView {
    /// Craft location as the server sees it.
    pub location: Vec3,
    /// Craft yaw as the server sees it.
    pub yaw: f32,
}

/// Outcome of a fire request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FireDecision {
    /// Launch everywhere with this order.
    Confirmed(FireOrder),
    /// Tell the requester to free this slot.
    Rollback(SlotIndex),
}

/// Server-side arbiter of every launch.
#[derive(Clone, Debug)]
pub struct FireAuthority {
    unlimited: bool,
    facing_blend: f32,
    muzzle_offset: f32,
    confirmed: u64,
    rejected: u64,
}

impl FireAuthority {
    /// Creates an authority.
    #[must_use]
    pub fn new(settings: &ProjectileSettings, muzzle_offset: f32) -> Self {
        Self {
            unlimited: settings.unlimited,
            facing_blend: settings.facing_blend,
            muzzle_offset,
            confirmed: 0,
            rejected: 0,
        }
    }

    /// Launches confirmed so far.
    #[must_use]
    pub const fn confirmed(&self) -> u64 {
        self.confirmed
    }

    /// Requests rolled back so far.
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Returns true if launches do not cost rockets.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        self.unlimited
    }

    /// Adds rockets to the authoritative count.
    pub fn grant(&mut self, ledger: &mut AmmoLedger, amount: u32) {
        ledger.grant_server(amount);
        tracing::info!(amount, total = ledger.server_count(), "rockets granted");
    }

    /// Validates a request against the authoritative count.
    pub fn handle_request(
        &mut self,
        ledger: &mut AmmoLedger,
        pool: &ProjectilePool,
        request: &FireOrder,
        view: ServerView,
    ) -> FireDecision {
        if request.slot.index() >= pool.capacity() {
            self.rejected += 1;
            tracing::warn!(entity = %request.entity, slot = request.slot.0, "fire request for unknown slot");
            return FireDecision::Rollback(request.slot);
        }
        if !self.unlimited && !ledger.consume_server() {
            self.rejected += 1;
            tracing::warn!(entity = %request.entity, slot = request.slot.0, "fire request without ammo, rolling back");
            return FireDecision::Rollback(request.slot);
        }

        let client_yaw = request.facing.yaw();
        let corrected_yaw =
            client_yaw + delta_angle_degrees(client_yaw, view.yaw) * self.facing_blend;
        let facing = Vec3::from_yaw(corrected_yaw);
        let origin = view.location + facing * self.muzzle_offset;

        self.confirmed += 1;
        tracing::info!(
            entity = %request.entity,
            slot = request.slot.0,
            remaining = ledger.server_count(),
            "fire confirmed"
        );
        FireDecision::Confirmed(FireOrder {
            entity: request.entity,
            slot: request.slot,
            origin,
            facing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_shared::EntityId;

    fn settings() -> ProjectileSettings {
        ProjectileSettings::default()
    }

    fn request(slot: u8, yaw: f32) -> FireOrder {
        FireOrder {
            entity: EntityId(1),
            slot: SlotIndex(slot),
            origin: Vec3::ZERO,
            facing: Vec3::from_yaw(yaw),
        }
    }

    fn view(yaw: f32) -> ServerView {
        ServerView {
            location: Vec3::ZERO,
            yaw,
        }
    }

    #[test]
    fn test_prepare_checks_in_order() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(1);
        let mut shooter = Shooter::new(0.45, false);

        assert_eq!(shooter.prepare(&mut ledger, &pool), Ok(SlotIndex(0)));
        assert_eq!(ledger.predicted_count(), 0);
        assert_eq!(shooter.prepare(&mut ledger, &pool), Err(FireRejection::CoolingDown));

        shooter.tick(0.5);
        assert_eq!(shooter.prepare(&mut ledger, &pool), Err(FireRejection::OutOfAmmo));
    }

    #[test]
    fn test_pool_exhaustion_consumes_nothing() {
        let mut pool = ProjectilePool::new(EntityId(1), settings());
        for i in 0..8 {
            pool.start_moving(SlotIndex(i), Vec3::ZERO, Vec3::X);
        }
        let mut ledger = AmmoLedger::new(3);
        let mut shooter = Shooter::new(0.0, false);
        assert_eq!(shooter.prepare(&mut ledger, &pool), Err(FireRejection::PoolExhausted));
        assert_eq!(ledger.predicted_count(), 3);
    }

    #[test]
    fn test_unlimited_skips_ammo() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(0);
        let mut shooter = Shooter::new(0.0, true);
        assert!(shooter.prepare(&mut ledger, &pool).is_ok());
        assert_eq!(ledger.predicted_count(), 0);
    }

    #[test]
    fn test_rollback_restores_prediction() {
        let mut pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(1);
        let mut shooter = Shooter::new(0.0, false);
        let slot = shooter.prepare(&mut ledger, &pool).unwrap();
        pool.start_moving(slot, Vec3::ZERO, Vec3::X);

        assert!(shooter.rollback(&mut ledger, &mut pool, slot));
        assert!(pool.is_free(slot));
        assert_eq!(ledger.predicted_count(), 1);
        assert_eq!(shooter.rollbacks(), 1);
    }

    #[test]
    fn test_unanswered_slot_is_not_reused() {
        let mut pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(3);
        let mut shooter = Shooter::new(0.0, false);

        let first = shooter.prepare(&mut ledger, &pool).unwrap();
        pool.start_moving(first, Vec3::ZERO, Vec3::X);
        // Exploded locally before the server answered.
        pool.make_free(first);
        assert!(shooter.is_awaiting(first));

        let second = shooter.prepare(&mut ledger, &pool).unwrap();
        assert_ne!(second, first);
        pool.start_moving(second, Vec3::ZERO, Vec3::X);

        // The late rollback for the first request leaves the second rocket alone.
        assert!(!shooter.rollback(&mut ledger, &mut pool, first));
        assert!(!pool.is_free(second));
        assert!(!shooter.is_awaiting(first));

        shooter.confirm(second);
        assert!(!shooter.is_awaiting(second));
        assert_eq!(shooter.prepare(&mut ledger, &pool), Ok(first));
    }

    #[test]
    fn test_authority_rejects_without_ammo() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(0);
        let mut authority = FireAuthority::new(&settings(), 60.0);

        let decision = authority.handle_request(&mut ledger, &pool, &request(2, 0.0), view(0.0));
        assert_eq!(decision, FireDecision::Rollback(SlotIndex(2)));
        assert_eq!(ledger.server_count(), 0);
        assert_eq!(authority.rejected(), 1);
    }

    #[test]
    fn test_authority_consumes_and_confirms() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(1);
        let mut authority = FireAuthority::new(&settings(), 60.0);

        let first = authority.handle_request(&mut ledger, &pool, &request(0, 0.0), view(0.0));
        let second = authority.handle_request(&mut ledger, &pool, &request(1, 0.0), view(0.0));

        assert!(matches!(first, FireDecision::Confirmed(o) if o.slot == SlotIndex(0)));
        assert_eq!(second, FireDecision::Rollback(SlotIndex(1)));
        assert_eq!(authority.confirmed(), 1);
        assert!(authority.confirmed() <= ledger.granted_total());
    }

    #[test]
    fn test_facing_drift_is_blended() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(1);
        let mut authority = FireAuthority::new(&settings(), 60.0);

        let decision = authority.handle_request(&mut ledger, &pool, &request(0, 10.0), view(30.0));
        let FireDecision::Confirmed(order) = decision else {
            panic!("Expected confirmation, got {decision:?}");
        };
        assert!((order.facing.yaw() - 20.0).abs() < 1e-3);
        assert!((order.origin - order.facing * 60.0).length() < 1e-3);
    }

    #[test]
    fn test_facing_blend_takes_short_way_round() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(1);
        let mut authority = FireAuthority::new(&settings(), 0.0);

        let decision = authority.handle_request(&mut ledger, &pool, &request(0, 170.0), view(-170.0));
        let FireDecision::Confirmed(order) = decision else {
            panic!("Expected confirmation, got {decision:?}");
        };
        assert!((order.facing.yaw().abs() - 180.0).abs() < 1e-2);
    }

    #[test]
    fn test_unknown_slot_is_rolled_back_for_free() {
        let pool = ProjectilePool::new(EntityId(1), settings());
        let mut ledger = AmmoLedger::new(5);
        let mut authority = FireAuthority::new(&settings(), 0.0);
        let decision = authority.handle_request(&mut ledger, &pool, &request(99, 0.0), view(0.0));
        assert_eq!(decision, FireDecision::Rollback(SlotIndex(99)));
        assert_eq!(ledger.server_count(), 5);
    }
}
