//! Deferred entity creation and destruction
//!
//! Any thread holding [`SceneCommands`] can queue structural changes; the
//! scene applies them on its own thread at a fixed point of the tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use hecs::Entity;
use parking_lot::{Condvar, Mutex};

use super::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    Ready(Entity),
    /// The scene went away before the request was applied
    Abandoned,
}

#[derive(Debug)]
struct Promise {
    slot: Mutex<Slot>,
    settled: Condvar,
}

impl Promise {
    fn settle(&self, slot: Slot) {
        *self.slot.lock() = slot;
        self.settled.notify_all();
    }

    fn abandon_if_pending(&self) {
        let mut slot = self.slot.lock();
        if *slot == Slot::Pending {
            *slot = Slot::Abandoned;
            self.settled.notify_all();
        }
    }
}

/// An entity that will exist after the scene's next tick.
#[derive(Debug, Clone)]
pub struct EntityFuture {
    promise: Arc<Promise>,
}

impl EntityFuture {
    fn pending() -> Self {
        Self {
            promise: Arc::new(Promise {
                slot: Mutex::new(Slot::Pending),
                settled: Condvar::new(),
            }),
        }
    }

    /// True once the request has been applied or abandoned.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.promise.slot.lock() != Slot::Pending
    }

    /// The entity, if already created.
    #[must_use]
    pub fn try_get(&self) -> Option<Entity> {
        match *self.promise.slot.lock() {
            Slot::Ready(entity) => Some(entity),
            Slot::Pending | Slot::Abandoned => None,
        }
    }

    /// Block until the scene has applied the request.
    ///
    /// Returns `None` if the scene was dropped first.
    pub fn wait(&self) -> Option<Entity> {
        let mut slot = self.promise.slot.lock();
        while *slot == Slot::Pending {
            self.promise.settled.wait(&mut slot);
        }
        match *slot {
            Slot::Ready(entity) => Some(entity),
            Slot::Pending | Slot::Abandoned => None,
        }
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Entity> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.promise.slot.lock();
        while *slot == Slot::Pending {
            if self.promise.settled.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        match *slot {
            Slot::Ready(entity) => Some(entity),
            Slot::Pending | Slot::Abandoned => None,
        }
    }
}

/// A queued creation. Dropping it unapplied abandons its future, which
/// covers requests still in the channel when the scene's receiver goes away.
pub(super) struct PendingCreate(EntityFuture);

impl PendingCreate {
    fn fulfil(self, entity: Entity) {
        self.0.promise.settle(Slot::Ready(entity));
    }
}

impl Drop for PendingCreate {
    fn drop(&mut self) {
        self.0.promise.abandon_if_pending();
    }
}

pub(super) enum SceneCommand {
    Create(PendingCreate),
    Destroy(Entity),
}

/// Cloneable, thread-safe queue of structural changes for one scene.
#[derive(Clone)]
pub struct SceneCommands {
    tx: Sender<SceneCommand>,
}

impl SceneCommands {
    /// Queue the creation of an empty entity.
    pub fn create_entity(&self) -> EntityFuture {
        let future = EntityFuture::pending();
        let request = SceneCommand::Create(PendingCreate(future.clone()));
        if self.tx.send(request).is_err() {
            log::warn!("entity creation requested after scene was dropped");
        }
        future
    }

    /// Queue the destruction of `entity`.
    pub fn destroy_entity(&self, entity: Entity) {
        if self.tx.send(SceneCommand::Destroy(entity)).is_err() {
            log::warn!("destruction of {entity:?} requested after scene was dropped");
        }
    }
}

impl Scene {
    /// Handle for queueing changes from other threads or from scripts.
    #[must_use]
    pub fn commands(&self) -> SceneCommands {
        SceneCommands {
            tx: self.commands_tx.clone(),
        }
    }

    /// Queue the creation of an entity; it exists after the next tick.
    pub fn create_entity_async(&self) -> EntityFuture {
        self.commands().create_entity()
    }

    /// Queue the destruction of `entity` for the next tick.
    pub fn destroy_entity_async(&self, entity: Entity) {
        self.commands().destroy_entity(entity);
    }

    /// Apply every queued command, creations fulfilling their futures.
    pub(super) fn drain_commands(&mut self) {
        let commands = self.commands_rx.clone();
        for command in commands.try_iter() {
            match command {
                SceneCommand::Create(request) => {
                    let entity = self.create_entity();
                    request.fulfil(entity);
                }
                SceneCommand::Destroy(entity) => self.destroy_entity(entity),
            }
        }
    }

    /// Settle queued creations that will never be applied.
    ///
    /// Requests sent after this returns are abandoned when the receiver
    /// drops them.
    pub(super) fn abandon_commands(&mut self) {
        self.commands_rx.try_iter().for_each(drop);
    }
}
