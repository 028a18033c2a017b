//! Named scalars of one entity.

use kestrel_shared::{CosmeticEvent, EntityId, ReplicatorSettings, ScalarChannel};

use super::{ScalarReplicator, ScalarSend};
use crate::protocol::Message;

/// Every replicated scalar of one entity, addressed by channel.
///
/// Channels are assigned in registration order, so every peer that
/// registers the same names in the same order agrees on them.
#[derive(Clone, Debug)]
pub struct ReplicatorSet {
    entity: EntityId,
    settings: ReplicatorSettings,
    entries: Vec<(String, ScalarReplicator)>,
}

impl ReplicatorSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new(entity: EntityId, settings: ReplicatorSettings) -> Self {
        Self {
            entity,
            settings,
            entries: Vec::new(),
        }
    }

    /// Registers a scalar starting at zero. Registering a name twice
    /// returns the existing channel.
    pub fn add(&mut self, name: &str) -> ScalarChannel {
        if let Some(channel) = self.channel(name) {
            return channel;
        }
        let channel = ScalarChannel(self.entries.len() as u16);
        self.entries.push((
            name.to_owned(),
            ScalarReplicator::new(self.entity, channel, self.settings, 0.0),
        ));
        channel
    }

    /// Channel registered under `name`.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<ScalarChannel> {
        self.entries
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| ScalarChannel(i as u16))
    }

    /// Replicator on `channel`.
    #[must_use]
    pub fn get(&self, channel: ScalarChannel) -> Option<&ScalarReplicator> {
        self.entries.get(usize::from(channel.0)).map(|(_, r)| r)
    }

    /// Mutable replicator on `channel`.
    pub fn get_mut(&mut self, channel: ScalarChannel) -> Option<&mut ScalarReplicator> {
        self.entries.get_mut(usize::from(channel.0)).map(|(_, r)| r)
    }

    /// Number of scalars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and replicators.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarReplicator)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Owner side: ticks every scalar and collects what to send.
    pub fn tick_owner(&mut self, dt: f32) -> Vec<ScalarSend> {
        self.entries
            .iter_mut()
            .filter_map(|(_, r)| r.tick_owner(dt))
            .collect()
    }

    /// Receiver side: smooths every scalar.
    pub fn tick_receiver(&mut self, dt: f32) {
        for (_, r) in &mut self.entries {
            r.tick_receiver(dt);
        }
    }

    /// Receiver side: routes a scalar message. Returns true if it was applied.
    pub fn receive(&mut self, message: &Message) -> bool {
        match message {
            Message::ScalarUpdate(m) => self
                .get_mut(m.channel)
                .is_some_and(|r| r.receive_update(m)),
            Message::ScalarTerminal(m) => self
                .get_mut(m.channel)
                .is_some_and(|r| r.receive_terminal(m)),
            _ => false,
        }
    }

    /// Change notifications pending on any scalar.
    pub fn drain_changes(&mut self) -> Vec<CosmeticEvent> {
        self.entries
            .iter_mut()
            .filter_map(|(_, r)| r.take_value_changed())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ScalarMessage;
    use crate::sync_tag::SyncTag;

    #[test]
    fn test_channels_follow_registration_order() {
        let mut set = ReplicatorSet::new(EntityId(1), ReplicatorSettings::default());
        let lean = set.add("lean");
        let pitch = set.add("pitch");
        assert_eq!(lean, ScalarChannel(0));
        assert_eq!(pitch, ScalarChannel(1));
        assert_eq!(set.add("lean"), lean);
        assert_eq!(set.channel("pitch"), Some(pitch));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unknown_channel_is_ignored() {
        let mut set = ReplicatorSet::new(EntityId(1), ReplicatorSettings::default());
        set.add("lean");
        let message = Message::ScalarUpdate(ScalarMessage {
            entity: EntityId(1),
            channel: ScalarChannel(9),
            tag: SyncTag(0),
            value: 1.0,
        });
        assert!(!set.receive(&message));
    }

    #[test]
    fn test_owner_tick_collects_sends() {
        let mut set = ReplicatorSet::new(EntityId(1), ReplicatorSettings::default());
        let a = set.add("a");
        let b = set.add("b");
        set.get_mut(a).unwrap().set_value(1.0);
        set.get_mut(b).unwrap().set_value(2.0);

        let sends = set.tick_owner(1.0 / 60.0);
        assert_eq!(sends.len(), 2);
        assert_eq!(set.drain_changes().len(), 2);
    }
}
