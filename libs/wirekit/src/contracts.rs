use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::component::{ComponentInstance, DependencyMap};

/// Type-erased provider value.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Opaque renderable unit produced by a [`Platform`].
pub type Renderable = Arc<dyn Any + Send + Sync>;

/// Rendering collaborator: turns a component instance into something a router can mount.
///
/// Called at most once per component instance; the factory caches the result.
#[async_trait]
pub trait Platform: Send + Sync {
    /// `deps` holds every declared dependency of the component, already resolved.
    /// Interceptors are attached to `component` before this is called.
    async fn generate_component(
        &self,
        component: &ComponentInstance,
        deps: &DependencyMap,
    ) -> anyhow::Result<Renderable>;
}

/// A dependency that runs before its component is shown.
///
/// Platforms await every interceptor of a component (see
/// [`ComponentInstance::intercept`]) and render the fallback meanwhile.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self) -> anyhow::Result<()>;
}

/// What an injectable constructor hands back to the factory.
pub struct Provided {
    pub(crate) value: Instance,
    pub(crate) interceptor: Option<Arc<dyn Interceptor>>,
}

impl Provided {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            interceptor: None,
        }
    }

    /// Same as [`Provided::new`], but the value also acts as an interceptor
    /// when a component lists it under `interceptors`.
    pub fn interceptor<T: Interceptor + Any>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            value: value.clone(),
            interceptor: Some(value),
        }
    }
}

impl std::fmt::Debug for Provided {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provided")
            .field("is_interceptor", &self.interceptor.is_some())
            .finish()
    }
}
