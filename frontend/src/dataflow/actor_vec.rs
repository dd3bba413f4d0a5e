//! Collection Actor over a `MutableVec`.

use std::future::Future;
use std::sync::Arc;
use zoon::{MutableVec, SignalVec, Task, TaskHandle};

/// Reactive list mutated only by its processing loop. Views bind through
/// [`ActorVec::signal_vec`] and receive item-level diffs.
#[derive(Clone, Debug)]
pub struct ActorVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    vec: MutableVec<T>,
    #[allow(dead_code)]
    task_handle: Arc<TaskHandle>,
}

impl<T> ActorVec<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F, Fut>(initial_items: Vec<T>, processor: F) -> Self
    where
        F: FnOnce(ActorVecHandle<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let vec = MutableVec::new_with_values(initial_items);
        let handle = ActorVecHandle {
            mutable_vec: vec.clone(),
        };
        let task_handle = Arc::new(Task::start_droppable(processor(handle)));
        Self { vec, task_handle }
    }

    pub fn signal_vec(&self) -> impl SignalVec<Item = T> + use<T> {
        self.vec.signal_vec_cloned()
    }
}

/// Write access handed to the processor of an [`ActorVec`].
pub struct ActorVecHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    mutable_vec: MutableVec<T>,
}

impl<T> ActorVecHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Replaces the first item matching `f`, appends otherwise.
    pub fn upsert(&self, item: T, f: impl Fn(&T) -> bool) {
        let mut items = self.mutable_vec.lock_mut();
        match items.iter().position(|existing| f(existing)) {
            Some(index) => items.set_cloned(index, item),
            None => items.push_cloned(item),
        }
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        let mut items = self.mutable_vec.lock_mut();
        (index < items.len()).then(|| items.remove(index))
    }

    /// Keeps the items matching `f` and returns how many were removed.
    pub fn retain(&self, mut f: impl FnMut(&T) -> bool) -> usize {
        let mut items = self.mutable_vec.lock_mut();
        let before = items.len();
        items.retain(|item| f(item));
        before - items.len()
    }

    pub fn len(&self) -> usize {
        self.mutable_vec.lock_ref().len()
    }
}
