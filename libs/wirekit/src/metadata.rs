//! Declarative metadata records attached to classes in the registry.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::class::ClassId;
use crate::contracts::Provided;
use crate::provider::Injected;

fn push_unique(list: &mut Vec<ClassId>, items: impl IntoIterator<Item = ClassId>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}

/// Module descriptor: what a module imports, provides, exports, renders and routes.
///
/// Class lists keep declaration order and ignore repeats.
#[derive(Debug, Clone, Default)]
pub struct ModuleMetadata {
    pub imports: Vec<ClassId>,
    pub providers: Vec<ClassId>,
    pub exports: Vec<ClassId>,
    pub components: Vec<ClassId>,
    pub routes: Vec<RouteOption>,
    pub is_global: bool,
}

impl ModuleMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_imports(mut self, imports: impl IntoIterator<Item = ClassId>) -> Self {
        push_unique(&mut self.imports, imports);
        self
    }

    pub fn with_providers(mut self, providers: impl IntoIterator<Item = ClassId>) -> Self {
        push_unique(&mut self.providers, providers);
        self
    }

    pub fn with_exports(mut self, exports: impl IntoIterator<Item = ClassId>) -> Self {
        push_unique(&mut self.exports, exports);
        self
    }

    pub fn with_components(mut self, components: impl IntoIterator<Item = ClassId>) -> Self {
        push_unique(&mut self.components, components);
        self
    }

    pub fn with_routes(mut self, routes: impl IntoIterator<Item = RouteOption>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Mark the module global: its providers become visible to every other module.
    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }
}

/// Component descriptor.
///
/// `declarations` may name providers or other components. `interceptors` are
/// resolved through the same dependency map and gate rendering.
#[derive(Debug, Clone, Default)]
pub struct ComponentMetadata {
    pub declarations: Vec<ClassId>,
    pub interceptors: Vec<ClassId>,
    /// Shown by the platform while a lazy component loads.
    pub suspense_fallback: Option<String>,
    /// Shown by the platform while interceptors run.
    pub interceptors_fallback: Option<String>,
    pub lazy: bool,
    /// Platform specific fields, passed through untouched.
    pub options: Map<String, Value>,
}

impl ComponentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_declarations(mut self, declarations: impl IntoIterator<Item = ClassId>) -> Self {
        push_unique(&mut self.declarations, declarations);
        self
    }

    pub fn with_interceptors(mut self, interceptors: impl IntoIterator<Item = ClassId>) -> Self {
        push_unique(&mut self.interceptors, interceptors);
        self
    }

    pub fn with_suspense_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.suspense_fallback = Some(fallback.into());
        self
    }

    pub fn with_interceptors_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.interceptors_fallback = Some(fallback.into());
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Constructor signature for injectables.
pub type Constructor = Arc<dyn Fn(&Injected<'_>) -> anyhow::Result<Provided> + Send + Sync>;

/// Injectable descriptor: the constructor dependency list and the constructor itself.
#[derive(Clone)]
pub struct InjectableMetadata {
    pub deps: Vec<ClassId>,
    pub constructor: Constructor,
}

impl std::fmt::Debug for InjectableMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectableMetadata")
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

/// Declarative route descriptor.
///
/// Exactly one of `use_component` / `use_module` must be set; this is checked
/// when routes are assembled, not here.
#[derive(Debug, Clone, Default)]
pub struct RouteOption {
    pub path: String,
    pub use_component: Option<ClassId>,
    pub use_module: Option<ClassId>,
    pub children: Option<Vec<RouteOption>>,
    /// Fields the assembler does not interpret (title, display metadata, ...).
    pub options: Map<String, Value>,
}

impl RouteOption {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn component(path: impl Into<String>, component: ClassId) -> Self {
        Self::new(path).with_component(component)
    }

    pub fn module(path: impl Into<String>, module: ClassId) -> Self {
        Self::new(path).with_module(module)
    }

    pub fn with_component(mut self, component: ClassId) -> Self {
        self.use_component = Some(component);
        self
    }

    pub fn with_module(mut self, module: ClassId) -> Self {
        self.use_module = Some(module);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RouteOption>) -> Self {
        self.children
            .get_or_insert_with(Vec::new)
            .extend(children);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
