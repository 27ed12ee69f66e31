//! Per-thread serializer instances.
//!
//! A [`SerializerPool`] never shares an instance between threads. Each thread
//! that calls [`SerializerPool::borrow`] gets its own instance, created by the
//! pool's factory on first use and kept in thread-local storage. There is no
//! checkout/checkin and no lock: repeated borrows on one thread return the
//! same instance.
//!
//! Instances are keyed by pool identity, so two pools on the same thread hand
//! out independent instances. Clones of a pool share its identity. When the
//! last clone is dropped, the dropping thread releases its instance at once;
//! other threads release theirs the next time they create an instance for any
//! pool, or when they exit.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use protocol::Result;
use thiserror::Error;
use tracing::debug;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// A thread's instance for one pool, alive while the pool is.
struct Slot {
    owner: Weak<PoolIdentity>,
    instance: Rc<dyn Any>,
}

thread_local! {
    /// Serializer instances owned by the current thread, keyed by pool id.
    static HANDLES: RefCell<HashMap<u64, Slot>> = RefCell::new(HashMap::new());
}

/// Identity shared by a pool and its clones.
#[derive(Debug)]
struct PoolIdentity {
    id: u64,
}

impl Drop for PoolIdentity {
    fn drop(&mut self) {
        // Dropped outside the map borrow: an instance may itself own a pool.
        let released = HANDLES
            .try_with(|handles| {
                handles
                    .try_borrow_mut()
                    .ok()
                    .and_then(|mut handles| handles.remove(&self.id))
            })
            .ok()
            .flatten();
        drop(released);
    }
}

/// Removes the slots of pools that no longer exist from this thread.
fn purge_dead_slots() {
    let dead: Vec<Slot> = HANDLES.with(|handles| {
        let mut handles = handles.borrow_mut();
        let ids: Vec<u64> = handles
            .iter()
            .filter(|(_, slot)| slot.owner.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        ids.iter().filter_map(|id| handles.remove(id)).collect()
    });
    if !dead.is_empty() {
        debug!(released = dead.len(), "released serializer instances of dropped pools");
    }
}

type Factory<S> = dyn Fn() -> Result<S> + Send + Sync;
type Configurator<S> = dyn Fn(&mut S) -> Result<()> + Send + Sync;

/// Supplies exactly one serializer instance per thread.
pub struct SerializerPool<S: 'static> {
    identity: Arc<PoolIdentity>,
    factory: Arc<Factory<S>>,
    configurator: Option<Arc<Configurator<S>>>,
}

impl<S: 'static> SerializerPool<S> {
    /// Creates a pool whose instances are built by `factory`.
    pub fn new(factory: impl Fn() -> Result<S> + Send + Sync + 'static) -> Self {
        Self {
            identity: Arc::new(PoolIdentity {
                id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            }),
            factory: Arc::new(factory),
            configurator: None,
        }
    }

    /// Runs `configure` on every new instance before it is handed out, e.g.
    /// to register types.
    pub fn with_configurator(
        mut self,
        configure: impl Fn(&mut S) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.configurator = Some(Arc::new(configure));
        self
    }

    /// Returns the calling thread's instance, creating it on first use.
    ///
    /// # Errors
    ///
    /// Whatever the factory or configurator returns. Nothing is cached on
    /// failure; the next borrow on this thread tries again.
    pub fn borrow(&self) -> Result<SerializerHandle<S>> {
        let id = self.identity.id;
        let existing = HANDLES.with(|handles| {
            handles
                .borrow()
                .get(&id)
                .map(|slot| Rc::clone(&slot.instance))
        });
        if let Some(Ok(inner)) = existing.map(|any| any.downcast::<RefCell<S>>()) {
            return Ok(SerializerHandle { inner });
        }

        purge_dead_slots();

        let mut instance = (self.factory)()?;
        if let Some(configure) = &self.configurator {
            configure(&mut instance)?;
        }

        let inner = Rc::new(RefCell::new(instance));
        let slot = Slot {
            owner: Arc::downgrade(&self.identity),
            instance: inner.clone(),
        };
        HANDLES.with(|handles| handles.borrow_mut().insert(id, slot));
        debug!(
            pool = id,
            thread = ?std::thread::current().id(),
            "created serializer instance for thread"
        );
        Ok(SerializerHandle { inner })
    }
}

impl<S: 'static> Clone for SerializerPool<S> {
    fn clone(&self) -> Self {
        Self {
            identity: Arc::clone(&self.identity),
            factory: Arc::clone(&self.factory),
            configurator: self.configurator.clone(),
        }
    }
}

impl<S: 'static> std::fmt::Debug for SerializerPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerPool")
            .field("id", &self.identity.id)
            .field("configured", &self.configurator.is_some())
            .finish()
    }
}

/// The handle is already borrowed further up the current thread's stack.
#[derive(Debug, Error)]
#[error("serializer instance is already in use on this thread")]
pub struct HandleInUse;

/// One thread's serializer instance.
///
/// Neither `Send` nor `Sync`: a handle cannot leave the thread it was
/// borrowed on.
#[derive(Debug)]
pub struct SerializerHandle<S> {
    inner: Rc<RefCell<S>>,
}

impl<S> SerializerHandle<S> {
    /// Runs `f` with exclusive access to the instance.
    ///
    /// # Errors
    ///
    /// [`HandleInUse`] if called re-entrantly from inside another `with` on
    /// the same instance.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> std::result::Result<R, HandleInUse> {
        let mut instance = self.inner.try_borrow_mut().map_err(|_| HandleInUse)?;
        Ok(f(&mut instance))
    }

    /// Returns `true` if both handles refer to the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
