//! Structural change events
//!
//! The ECS publishes one [`EcsEvent`] per entity or component created or
//! removed. Subscribers each get their own channel and read at their own
//! pace; a subscriber that drops its receiver is forgotten on the next
//! publish.

use crossbeam_channel::{Receiver, Sender, unbounded};
use hecs::Entity;

use super::world::ComponentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsEvent {
    EntityCreated(Entity),
    EntityDestroyed(Entity),
    ComponentAdded { entity: Entity, kind: ComponentKind },
    ComponentRemoved { entity: Entity, kind: ComponentKind },
}

impl EcsEvent {
    /// Entity the event is about.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        match *self {
            Self::EntityCreated(entity)
            | Self::EntityDestroyed(entity)
            | Self::ComponentAdded { entity, .. }
            | Self::ComponentRemoved { entity, .. } => entity,
        }
    }
}

/// Fan-out of [`EcsEvent`]s to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<EcsEvent>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start receiving every event published from now on.
    pub fn subscribe(&mut self) -> Receiver<EcsEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: EcsEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        log::trace!("{event:?}");
        self.subscribers.retain(|subscriber| subscriber.send(event).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subscriber_sees_event() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(EcsEvent::EntityCreated(entity));

        assert_eq!(a.try_recv(), Ok(EcsEvent::EntityCreated(entity)));
        assert_eq!(b.try_recv(), Ok(EcsEvent::EntityCreated(entity)));
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(EcsEvent::EntityDestroyed(entity));

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.try_recv().map(|e| e.entity()), Ok(entity));
    }
}
