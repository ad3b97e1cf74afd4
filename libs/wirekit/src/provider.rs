//! Provider resolution: constructor injection with export visibility checks.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::class::ClassId;
use crate::contracts::{Instance, Interceptor};
use crate::error::FactoryError;
use crate::graph::ModuleGraph;
use crate::registry::ClassRegistry;

/// Singleton instance of one provider class, shared across the whole graph.
pub struct ProviderInstance {
    class: ClassId,
    module: ClassId,
    value: Instance,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderInstance")
            .field("class", &self.class)
            .field("module", &self.module)
            .field("is_interceptor", &self.interceptor.is_some())
            .finish()
    }
}

impl ProviderInstance {
    pub fn class(&self) -> ClassId {
        self.class
    }

    /// Module that declares this provider.
    pub fn module(&self) -> ClassId {
        self.module
    }

    pub fn value(&self) -> &Instance {
        &self.value
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// Present when the constructor returned [`Provided::interceptor`](crate::Provided::interceptor).
    pub fn interceptor(&self) -> Option<&Arc<dyn Interceptor>> {
        self.interceptor.as_ref()
    }
}

/// Resolved constructor arguments, in declaration order.
pub struct Injected<'a> {
    registry: &'a ClassRegistry,
    dependant: ClassId,
    deps: &'a [(ClassId, Arc<ProviderInstance>)],
}

impl<'a> Injected<'a> {
    pub(crate) fn new(
        registry: &'a ClassRegistry,
        dependant: ClassId,
        deps: &'a [(ClassId, Arc<ProviderInstance>)],
    ) -> Self {
        Self {
            registry,
            dependant,
            deps,
        }
    }

    /// The dependency declared for `class`, downcast to `T`.
    pub fn get<T: Any + Send + Sync>(&self, class: ClassId) -> anyhow::Result<Arc<T>> {
        let (_, instance) = self
            .deps
            .iter()
            .find(|(c, _)| *c == class)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "'{}' is not a declared dependency of '{}'",
                    self.registry.class_name(class),
                    self.registry.class_name(self.dependant)
                )
            })?;
        self.cast(instance)
    }

    /// The dependency at position `index` of the declared list, downcast to `T`.
    pub fn at<T: Any + Send + Sync>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        let (_, instance) = self.deps.get(index).ok_or_else(|| {
            anyhow::anyhow!(
                "'{}' declares {} dependencies, index {index} is out of range",
                self.registry.class_name(self.dependant),
                self.deps.len()
            )
        })?;
        self.cast(instance)
    }

    fn cast<T: Any + Send + Sync>(&self, instance: &ProviderInstance) -> anyhow::Result<Arc<T>> {
        instance.downcast::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "dependency '{}' of '{}' is not a {}",
                self.registry.class_name(instance.class()),
                self.registry.class_name(self.dependant),
                std::any::type_name::<T>()
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Arc<ProviderInstance>> + 'a {
        self.deps.iter().map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }
}

/// Depth-first constructor injection over the provider → module index.
pub(crate) struct ProviderResolver<'a> {
    registry: &'a ClassRegistry,
    graph: &'a ModuleGraph,
    owners: &'a HashMap<ClassId, ClassId>,
    instances: HashMap<ClassId, Arc<ProviderInstance>>,
    order: Vec<ClassId>,
    stack: Vec<ClassId>,
}

impl<'a> ProviderResolver<'a> {
    pub(crate) fn new(
        registry: &'a ClassRegistry,
        graph: &'a ModuleGraph,
        owners: &'a HashMap<ClassId, ClassId>,
    ) -> Self {
        Self {
            registry,
            graph,
            owners,
            instances: HashMap::new(),
            order: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Instantiate every provider of every module, root first then imports depth first.
    pub(crate) fn resolve_all(
        mut self,
    ) -> Result<(HashMap<ClassId, Arc<ProviderInstance>>, Vec<ClassId>), FactoryError> {
        for module in self.graph.walk_from_root() {
            for &provider in &module.metadata().providers {
                self.resolve(provider)?;
            }
        }
        Ok((self.instances, self.order))
    }

    pub(crate) fn resolve(&mut self, class: ClassId) -> Result<Arc<ProviderInstance>, FactoryError> {
        if let Some(found) = self.instances.get(&class) {
            return Ok(found.clone());
        }

        if let Some(start) = self.stack.iter().position(|&c| c == class) {
            let mut path: Vec<String> = self.stack[start..]
                .iter()
                .map(|&c| self.name(c))
                .collect();
            path.push(self.name(class));
            return Err(FactoryError::CyclicDependency { path });
        }

        let owner = *self
            .owners
            .get(&class)
            .ok_or_else(|| FactoryError::ProviderNotInjectable {
                dependency: self.name(class),
                dependant: self.stack.last().map(|&c| self.name(c)).unwrap_or_default(),
            })?;
        let module = self
            .graph
            .get(owner)
            .ok_or_else(|| FactoryError::UnknownModule(self.name(owner)))?;
        let injectable = self
            .registry
            .injectable(class)
            .ok_or_else(|| FactoryError::NotInjectable(self.name(class)))?;

        self.stack.push(class);
        let mut resolved = Vec::with_capacity(injectable.deps.len());
        for &dep in &injectable.deps {
            if dep == class {
                return Err(FactoryError::SelfDependency(self.name(class)));
            }

            let dep_owner = *self
                .owners
                .get(&dep)
                .ok_or_else(|| FactoryError::ProviderNotInjectable {
                    dependency: self.name(dep),
                    dependant: self.name(class),
                })?;

            if !module.can_inject(dep) {
                return Err(FactoryError::ProviderNotExported {
                    dependency: self.name(dep),
                    dependant: self.name(class),
                    owner: self.name(dep_owner),
                    module: module.name().to_string(),
                });
            }

            resolved.push((dep, self.resolve(dep)?));
        }
        self.stack.pop();

        let provided = (injectable.constructor)(&Injected::new(self.registry, class, &resolved))
            .map_err(|source| FactoryError::Construct {
                provider: self.name(class),
                source,
            })?;

        tracing::debug!(
            provider = %self.registry.class_name(class),
            module = %module.name(),
            deps = resolved.len(),
            is_interceptor = provided.interceptor.is_some(),
            "Provider instantiated"
        );

        let instance = Arc::new(ProviderInstance {
            class,
            module: owner,
            value: provided.value,
            interceptor: provided.interceptor,
        });
        self.instances.insert(class, instance.clone());
        self.order.push(class);
        Ok(instance)
    }

    fn name(&self, class: ClassId) -> String {
        self.registry.class_name(class).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Provided;
    use crate::metadata::ModuleMetadata;

    struct Config {
        url: String,
    }

    struct Client {
        config: Arc<Config>,
    }

    fn resolve_all(
        registry: &ClassRegistry,
        root: ClassId,
    ) -> Result<HashMap<ClassId, Arc<ProviderInstance>>, FactoryError> {
        let graph = ModuleGraph::build(registry, root)?;
        let owners = graph.owners(registry, |m| m.providers.as_slice())?;
        ProviderResolver::new(registry, &graph, &owners)
            .resolve_all()
            .map(|(instances, _)| instances)
    }

    #[test]
    fn dependencies_are_built_before_dependants() {
        let mut b = ClassRegistry::builder();
        let [app, config, client] = ["App", "Config", "Client"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_providers([client, config]));
        b.register_injectable(config, [], |_| {
            Ok(Provided::new(Config {
                url: "mem://".into(),
            }))
        });
        b.register_injectable(client, [config], move |deps| {
            Ok(Provided::new(Client {
                config: deps.get::<Config>(config)?,
            }))
        });
        let reg = b.build().unwrap();

        let instances = resolve_all(&reg, app).unwrap();
        let built = instances[&client].downcast::<Client>().unwrap();
        let shared = instances[&config].downcast::<Config>().unwrap();
        assert!(Arc::ptr_eq(&built.config, &shared));
        assert_eq!(built.config.url, "mem://");
    }

    #[test]
    fn self_dependency_rejected_without_recursion() {
        let mut b = ClassRegistry::builder();
        let [app, svc] = ["App", "Svc"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_providers([svc]));
        b.register_injectable(svc, [svc], |_| Ok(Provided::new(())));
        let reg = b.build().unwrap();

        match resolve_all(&reg, app).unwrap_err() {
            FactoryError::SelfDependency(name) => assert_eq!(name, "Svc"),
            other => panic!("expected SelfDependency, got: {other:?}"),
        }
    }

    #[test]
    fn missing_injectable_metadata() {
        let mut b = ClassRegistry::builder();
        let [app, svc] = ["App", "Svc"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_providers([svc]));
        let reg = b.build().unwrap();

        assert!(matches!(
            resolve_all(&reg, app),
            Err(FactoryError::NotInjectable(name)) if name == "Svc"
        ));
    }

    #[test]
    fn provider_cycle_reported_with_path() {
        let mut b = ClassRegistry::builder();
        let [app, a, bb, c] = ["App", "A", "B", "C"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_providers([a, bb, c]));
        b.register_injectable(a, [bb], |_| Ok(Provided::new(())));
        b.register_injectable(bb, [c], |_| Ok(Provided::new(())));
        b.register_injectable(c, [a], |_| Ok(Provided::new(())));
        let reg = b.build().unwrap();

        match resolve_all(&reg, app).unwrap_err() {
            FactoryError::CyclicDependency { path } => {
                assert_eq!(path, vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected CyclicDependency, got: {other:?}"),
        }
    }

    #[test]
    fn undeclared_dependency_is_not_injectable() {
        let mut b = ClassRegistry::builder();
        let [app, svc, stray] = ["App", "Svc", "Stray"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_providers([svc]));
        b.register_injectable(svc, [stray], |_| Ok(Provided::new(())));
        b.register_injectable(stray, [], |_| Ok(Provided::new(())));
        let reg = b.build().unwrap();

        match resolve_all(&reg, app).unwrap_err() {
            FactoryError::ProviderNotInjectable {
                dependency,
                dependant,
            } => {
                assert_eq!(dependency, "Stray");
                assert_eq!(dependant, "Svc");
            }
            other => panic!("expected ProviderNotInjectable, got: {other:?}"),
        }
    }

    #[test]
    fn constructor_errors_carry_the_provider() {
        let mut b = ClassRegistry::builder();
        let [app, svc] = ["App", "Svc"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_providers([svc]));
        b.register_injectable(svc, [], |_| Err(anyhow::anyhow!("boom")));
        let reg = b.build().unwrap();

        match resolve_all(&reg, app).unwrap_err() {
            FactoryError::Construct { provider, source } => {
                assert_eq!(provider, "Svc");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected Construct, got: {other:?}"),
        }
    }
}
