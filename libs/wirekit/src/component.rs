//! Component instances and their resolved dependency maps.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::OnceCell;

use crate::class::ClassId;
use crate::contracts::{Interceptor, Renderable};
use crate::error::FactoryError;
use crate::metadata::ComponentMetadata;
use crate::provider::ProviderInstance;

/// Runtime node for one component class.
///
/// Metadata is captured eagerly; the renderable unit is generated at most once
/// and cached. Concurrent requesters share the same in-flight generation.
pub struct ComponentInstance {
    class: ClassId,
    name: String,
    module: ClassId,
    metadata: ComponentMetadata,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
    renderable: OnceCell<Renderable>,
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("class", &self.class)
            .field("name", &self.name)
            .field("module", &self.module)
            .field("interceptors", &self.interceptors.read().len())
            .field("generated", &self.renderable.initialized())
            .finish()
    }
}

impl ComponentInstance {
    pub(crate) fn new(
        class: ClassId,
        name: impl Into<String>,
        module: ClassId,
        metadata: ComponentMetadata,
    ) -> Self {
        Self {
            class,
            name: name.into(),
            module,
            metadata,
            interceptors: RwLock::new(Vec::new()),
            renderable: OnceCell::new(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module that declares this component.
    pub fn module(&self) -> ClassId {
        self.module
    }

    pub fn metadata(&self) -> &ComponentMetadata {
        &self.metadata
    }

    /// Cached renderable unit, if already generated.
    pub fn renderable(&self) -> Option<Renderable> {
        self.renderable.get().cloned()
    }

    pub fn is_generated(&self) -> bool {
        self.renderable.initialized()
    }

    /// Resolved interceptors, in declaration order.
    pub fn interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.interceptors.read().clone()
    }

    /// Render gate: runs every interceptor and waits for all of them.
    pub async fn intercept(&self) -> anyhow::Result<()> {
        let interceptors = self.interceptors();
        futures::future::try_join_all(interceptors.iter().map(|i| i.intercept())).await?;
        Ok(())
    }

    pub(crate) fn set_interceptors(&self, interceptors: Vec<Arc<dyn Interceptor>>) {
        *self.interceptors.write() = interceptors;
    }

    pub(crate) async fn get_or_generate<F, Fut>(&self, generate: F) -> Result<Renderable, FactoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Renderable, FactoryError>>,
    {
        self.renderable.get_or_try_init(generate).await.cloned()
    }
}

/// A dependency bound for a component: a provider instance or another
/// component's renderable unit.
#[derive(Clone)]
pub enum Resolved {
    Provider(Arc<ProviderInstance>),
    Component(Renderable),
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolved::Provider(p) => f.debug_tuple("Provider").field(&p.class()).finish(),
            Resolved::Component(_) => f.write_str("Component(..)"),
        }
    }
}

impl Resolved {
    pub fn as_provider(&self) -> Option<&Arc<ProviderInstance>> {
        match self {
            Resolved::Provider(p) => Some(p),
            Resolved::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&Renderable> {
        match self {
            Resolved::Component(r) => Some(r),
            Resolved::Provider(_) => None,
        }
    }

    pub fn interceptor(&self) -> Option<Arc<dyn Interceptor>> {
        self.as_provider().and_then(|p| p.interceptor().cloned())
    }
}

/// Dependency class → resolved value, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct DependencyMap {
    entries: Vec<(ClassId, Resolved)>,
}

impl DependencyMap {
    pub(crate) fn insert(&mut self, class: ClassId, value: Resolved) {
        if let Some(slot) = self.entries.iter_mut().find(|(c, _)| *c == class) {
            slot.1 = value;
        } else {
            self.entries.push((class, value));
        }
    }

    pub fn get(&self, class: ClassId) -> Option<&Resolved> {
        self.entries
            .iter()
            .find(|(c, _)| *c == class)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.get(class).is_some()
    }

    /// Provider value for `class`, downcast to `T`.
    pub fn provider<T: Any + Send + Sync>(&self, class: ClassId) -> Option<Arc<T>> {
        self.get(class)?.as_provider()?.downcast::<T>()
    }

    /// Renderable unit of a depended component.
    pub fn component(&self, class: ClassId) -> Option<&Renderable> {
        self.get(class)?.as_component()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &Resolved)> {
        self.entries.iter().map(|(c, v)| (*c, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
