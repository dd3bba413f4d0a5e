//! Local UI state: panel open/closed, toast paused and similar.

use crate::dataflow::{Actor, Relay, relay};
use futures::StreamExt;
use zoon::Signal;

#[derive(Clone, Debug)]
enum AtomUpdate<T> {
    Set(T),
    Update(fn(&T) -> T),
}

/// Small Actor for state that belongs to one widget, not to a domain.
///
/// There is no getter; bind to [`Atom::signal`].
#[derive(Clone, Debug)]
pub struct Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    actor: Actor<T>,
    setter: Relay<AtomUpdate<T>>,
}

impl<T> Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (setter, updates) = relay();
        let actor = Actor::new(initial, async move |state| {
            let mut updates = updates;
            while let Some(update) = updates.next().await {
                match update {
                    AtomUpdate::Set(value) => state.set(value),
                    AtomUpdate::Update(update) => {
                        let mut lock = state.lock_mut();
                        *lock = update(&lock);
                    }
                }
            }
        });
        Self { actor, setter }
    }

    pub fn set(&self, value: T) {
        self.setter.send(AtomUpdate::Set(value));
    }

    pub fn signal(&self) -> impl Signal<Item = T> + use<T> {
        self.actor.signal()
    }
}

impl Atom<bool> {
    pub fn toggle(&self) {
        self.setter.send(AtomUpdate::Update(|open| !open));
    }
}
