//! Factory - resolves a root module into wired providers, generated components
//! and an assembled route tree.
//!
//! Phases run strictly in order:
//! module graph → ownership index → providers → components → generation → routes.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::class::ClassId;
use crate::component::{ComponentInstance, DependencyMap, Resolved};
use crate::contracts::{Interceptor, Platform, Renderable};
use crate::error::FactoryError;
use crate::graph::ModuleGraph;
use crate::module_instance::ModuleInstance;
use crate::provider::{ProviderInstance, ProviderResolver};
use crate::registry::ClassRegistry;
use crate::routes::{RouteAssembler, RouteItem};

/// Entry point of the resolution core. Build a fresh factory per application bootstrap.
pub struct Factory {
    registry: Arc<ClassRegistry>,
    platform: Arc<dyn Platform>,
    created: bool,
    graph: Option<ModuleGraph>,
    provider_owners: HashMap<ClassId, ClassId>,
    component_owners: HashMap<ClassId, ClassId>,
    providers: HashMap<ClassId, Arc<ProviderInstance>>,
    provider_order: Vec<ClassId>,
    components: HashMap<ClassId, Arc<ComponentInstance>>,
    component_order: Vec<ClassId>,
    routes: Vec<RouteItem>,
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("created", &self.created)
            .field("modules", &self.graph.as_ref().map(ModuleGraph::len))
            .field("providers", &self.providers.len())
            .field("components", &self.components.len())
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl Factory {
    pub fn new(registry: Arc<ClassRegistry>, platform: Arc<dyn Platform>) -> Self {
        Self {
            registry,
            platform,
            created: false,
            graph: None,
            provider_owners: HashMap::new(),
            component_owners: HashMap::new(),
            providers: HashMap::new(),
            provider_order: Vec::new(),
            components: HashMap::new(),
            component_order: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Resolve the application rooted at `root` and return its route tree.
    pub async fn create(&mut self, root: ClassId) -> Result<Vec<RouteItem>, FactoryError> {
        if self.created {
            return Err(FactoryError::AlreadyCreated);
        }
        self.created = true;

        tracing::info!(root = %self.registry.class_name(root), "Phase: module graph");
        let graph = ModuleGraph::build(&self.registry, root)?;

        tracing::info!("Phase: ownership index");
        self.provider_owners = graph.owners(&self.registry, |m| m.providers.as_slice())?;
        self.component_owners = graph.owners(&self.registry, |m| m.components.as_slice())?;

        tracing::info!("Phase: providers");
        let (providers, provider_order) =
            ProviderResolver::new(&self.registry, &graph, &self.provider_owners).resolve_all()?;
        self.providers = providers;
        self.provider_order = provider_order;

        tracing::info!("Phase: components");
        self.create_component_instances(&graph)?;
        self.graph = Some(graph);

        tracing::info!("Phase: component generation");
        for class in self.component_order.clone() {
            self.ensure_component(class, Vec::new()).await?;
        }

        tracing::info!("Phase: routes");
        let routes = self.assemble_root_routes()?;
        tracing::info!(
            providers = self.providers.len(),
            components = self.components.len(),
            routes = routes.len(),
            "Application resolved"
        );
        self.routes = routes.clone();
        Ok(routes)
    }

    fn create_component_instances(&mut self, graph: &ModuleGraph) -> Result<(), FactoryError> {
        for module in graph.walk_from_root() {
            for &class in &module.metadata().components {
                if self.components.contains_key(&class) {
                    continue;
                }
                let metadata = self.registry.component_metadata(class).ok_or_else(|| {
                    FactoryError::NotAComponent {
                        component: self.registry.class_name(class).to_string(),
                        module: module.name().to_string(),
                    }
                })?;
                let instance = ComponentInstance::new(
                    class,
                    self.registry.class_name(class),
                    module.class(),
                    metadata.clone(),
                );
                self.components.insert(class, Arc::new(instance));
                self.component_order.push(class);
            }
        }
        Ok(())
    }

    fn assemble_root_routes(&self) -> Result<Vec<RouteItem>, FactoryError> {
        let graph = self.graph()?;
        RouteAssembler::new(&self.registry, graph, &self.components)
            .assemble_module(graph.root().class())
    }

    fn graph(&self) -> Result<&ModuleGraph, FactoryError> {
        self.graph
            .as_ref()
            .ok_or(FactoryError::NotCreated)
    }

    /// Generate (or fetch the cached) renderable unit of a component.
    ///
    /// `stack` holds the components currently being generated on this path.
    fn ensure_component(
        &self,
        class: ClassId,
        stack: Vec<ClassId>,
    ) -> BoxFuture<'_, Result<Renderable, FactoryError>> {
        async move {
            let instance = self.component(class)?;
            if let Some(renderable) = instance.renderable() {
                return Ok(renderable);
            }

            if let Some(start) = stack.iter().position(|&c| c == class) {
                let mut path: Vec<String> =
                    stack[start..].iter().map(|&c| self.name(c)).collect();
                path.push(self.name(class));
                return Err(FactoryError::CyclicDependency { path });
            }

            let mut stack = stack;
            stack.push(class);

            instance
                .get_or_generate(|| async {
                    let deps = self.build_dependency_map(&instance, &stack).await?;
                    instance.set_interceptors(Self::collect_interceptors(&instance, &deps));

                    tracing::debug!(
                        component = %instance.name(),
                        deps = deps.len(),
                        interceptors = instance.interceptors().len(),
                        "Generating component"
                    );

                    self.platform
                        .generate_component(&instance, &deps)
                        .await
                        .map_err(|source| FactoryError::Platform {
                            component: instance.name().to_string(),
                            source,
                        })
                })
                .await
        }
        .boxed()
    }

    async fn build_dependency_map(
        &self,
        instance: &ComponentInstance,
        stack: &[ClassId],
    ) -> Result<DependencyMap, FactoryError> {
        let class = instance.class();
        let module = self.module_of(instance)?;
        let metadata = instance.metadata();
        let mut map = DependencyMap::default();

        for &dep in metadata.declarations.iter().chain(&metadata.interceptors) {
            if dep == class {
                return Err(FactoryError::SelfDependency(instance.name().to_string()));
            }
            if map.contains(dep) {
                continue;
            }

            if self.components.contains_key(&dep) {
                let unit = self.ensure_component(dep, stack.to_vec()).await?;
                map.insert(dep, Resolved::Component(unit));
                continue;
            }

            let provider = self.providers.get(&dep).cloned().ok_or_else(|| {
                FactoryError::ProviderNotInjectable {
                    dependency: self.name(dep),
                    dependant: instance.name().to_string(),
                }
            })?;
            if !module.can_inject(dep) {
                return Err(FactoryError::ProviderNotExported {
                    dependency: self.name(dep),
                    dependant: instance.name().to_string(),
                    owner: self.name(provider.module()),
                    module: module.name().to_string(),
                });
            }
            map.insert(dep, Resolved::Provider(provider));
        }

        Ok(map)
    }

    /// Interceptor classes looked up in the dependency map; values that cannot
    /// intercept are dropped.
    fn collect_interceptors(
        instance: &ComponentInstance,
        deps: &DependencyMap,
    ) -> Vec<Arc<dyn Interceptor>> {
        instance
            .metadata()
            .interceptors
            .iter()
            .filter_map(|&class| deps.get(class).and_then(Resolved::interceptor))
            .collect()
    }

    fn module_of(&self, instance: &ComponentInstance) -> Result<&Arc<ModuleInstance>, FactoryError> {
        self.graph()?
            .get(instance.module())
            .ok_or_else(|| FactoryError::UnknownModule(self.name(instance.module())))
    }

    fn component(&self, class: ClassId) -> Result<Arc<ComponentInstance>, FactoryError> {
        self.components
            .get(&class)
            .cloned()
            .ok_or_else(|| FactoryError::UnknownComponent(self.name(class)))
    }

    fn name(&self, class: ClassId) -> String {
        self.registry.class_name(class).to_string()
    }

    // ---- accessors, meaningful after `create` ----

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn root_module_instance(&self) -> Option<&Arc<ModuleInstance>> {
        self.graph.as_ref().map(ModuleGraph::root)
    }

    pub fn module_instance(&self, class: ClassId) -> Option<&Arc<ModuleInstance>> {
        self.graph.as_ref()?.get(class)
    }

    pub fn module_graph(&self) -> Option<&ModuleGraph> {
        self.graph.as_ref()
    }

    /// Module declaring a provider or component.
    pub fn declaring_module(&self, class: ClassId) -> Option<ClassId> {
        self.provider_owners
            .get(&class)
            .or_else(|| self.component_owners.get(&class))
            .copied()
    }

    pub fn provider_instance(&self, class: ClassId) -> Option<&Arc<ProviderInstance>> {
        self.providers.get(&class)
    }

    /// Provider instances in construction order.
    pub fn provider_instances(&self) -> impl Iterator<Item = &Arc<ProviderInstance>> {
        self.provider_order
            .iter()
            .filter_map(|class| self.providers.get(class))
    }

    pub fn provider<T: std::any::Any + Send + Sync>(&self, class: ClassId) -> Option<Arc<T>> {
        self.providers.get(&class)?.downcast::<T>()
    }

    pub fn component_instance(&self, class: ClassId) -> Option<&Arc<ComponentInstance>> {
        self.components.get(&class)
    }

    /// Component instances in registration order.
    pub fn component_instances(&self) -> impl Iterator<Item = &Arc<ComponentInstance>> {
        self.component_order
            .iter()
            .filter_map(|class| self.components.get(class))
    }

    /// Routes returned by the last successful `create`.
    pub fn routes(&self) -> &[RouteItem] {
        &self.routes
    }

    /// Generate (or return the cached) renderable unit for `component`.
    pub async fn generate_component(&self, component: ClassId) -> Result<Renderable, FactoryError> {
        self.ensure_component(component, Vec::new()).await
    }

    /// Resolve the dependency map of one component.
    pub async fn dependency_map(&self, component: ClassId) -> Result<DependencyMap, FactoryError> {
        let instance = self.component(component)?;
        self.build_dependency_map(&instance, &[component]).await
    }

    /// Dependency maps of every component, in registration order.
    pub async fn dependency_maps(&self) -> Result<Vec<(ClassId, DependencyMap)>, FactoryError> {
        let mut maps = Vec::with_capacity(self.component_order.len());
        for &class in &self.component_order {
            maps.push((class, self.dependency_map(class).await?));
        }
        Ok(maps)
    }
}
