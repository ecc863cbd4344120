//! Lifecycle policies: how a pool creates, resets and destroys resources

use crate::errors::BoxError;

/// Create/reset/destroy strategy for one resource type.
///
/// The pool never constructs resources itself; every pool owns exactly one
/// policy and calls it outside of its internal lock, so hooks may block or
/// allocate freely.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{BoxError, LifecyclePolicy};
///
/// struct Buffers;
///
/// impl LifecyclePolicy<Vec<u8>> for Buffers {
///     fn create(&self) -> Result<Vec<u8>, BoxError> {
///         Ok(Vec::with_capacity(4096))
///     }
///
///     fn on_return(&self, buffer: &mut Vec<u8>) -> Result<(), BoxError> {
///         buffer.clear();
///         Ok(())
///     }
/// }
///
/// let mut buffer = Buffers.create().unwrap();
/// buffer.push(1);
/// Buffers.on_return(&mut buffer).unwrap();
/// assert!(buffer.is_empty());
/// ```
pub trait LifecyclePolicy<T>: Send + Sync {
    /// Build a new resource. Called on a miss and during warm-up.
    fn create(&self) -> Result<T, BoxError>;

    /// Reactivate an idle resource just before it is handed out.
    fn on_acquire(&self, _resource: &mut T) -> Result<(), BoxError> {
        Ok(())
    }

    /// Reset a released resource so it can be reused.
    fn on_return(&self, _resource: &mut T) -> Result<(), BoxError> {
        Ok(())
    }

    /// Release whatever the resource holds. The default just drops it.
    fn on_destroy(&self, resource: T) -> Result<(), BoxError> {
        drop(resource);
        Ok(())
    }

    /// Sanity check run when the pool is configured.
    fn validate(&self) -> bool {
        true
    }
}

type ResetFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;
type DestroyFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// Policy assembled from closures
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{FnPolicy, Pool, PoolConfiguration};
///
/// let policy = FnPolicy::new(|| String::with_capacity(64)).with_reset(|s: &mut String| s.clear());
/// let pool = Pool::with_configuration(policy, PoolConfiguration::default()).unwrap();
///
/// let mut text = pool.acquire().unwrap();
/// text.push_str("hello");
/// assert!(pool.release(text).unwrap());
///
/// let text = pool.acquire().unwrap();
/// assert!(text.is_empty());
/// ```
pub struct FnPolicy<T> {
    factory: Box<dyn Fn() -> Result<T, BoxError> + Send + Sync>,
    reset: Option<ResetFn<T>>,
    activate: Option<ResetFn<T>>,
    destroy: Option<DestroyFn<T>>,
}

impl<T: 'static> FnPolicy<T> {
    /// Policy around an infallible factory
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::fallible(move || Ok(factory()))
    }

    /// Policy around a factory that can fail
    pub fn fallible<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            reset: None,
            activate: None,
            destroy: None,
        }
    }

    /// Run `reset` on every release that keeps the resource
    pub fn with_reset<F>(mut self, reset: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Run `activate` on every hit
    pub fn with_activate<F>(mut self, activate: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.activate = Some(Box::new(activate));
        self
    }

    /// Run `destroy` instead of dropping
    pub fn with_destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.destroy = Some(Box::new(destroy));
        self
    }
}

impl<T> LifecyclePolicy<T> for FnPolicy<T> {
    fn create(&self) -> Result<T, BoxError> {
        (self.factory)()
    }

    fn on_acquire(&self, resource: &mut T) -> Result<(), BoxError> {
        if let Some(activate) = &self.activate {
            activate(resource);
        }
        Ok(())
    }

    fn on_return(&self, resource: &mut T) -> Result<(), BoxError> {
        if let Some(reset) = &self.reset {
            reset(resource);
        }
        Ok(())
    }

    fn on_destroy(&self, resource: T) -> Result<(), BoxError> {
        match &self.destroy {
            Some(destroy) => destroy(resource),
            None => drop(resource),
        }
        Ok(())
    }
}
