// wirekit/src/registry.rs
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::class::ClassId;
use crate::contracts::Provided;
use crate::metadata::{ComponentMetadata, InjectableMetadata, ModuleMetadata};
use crate::provider::Injected;

/// Which kind of metadata a class carries. A class carries at most one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    Module,
    Component,
    Injectable,
}

impl std::fmt::Display for ClassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClassKind::Module => "module",
            ClassKind::Component => "component",
            ClassKind::Injectable => "injectable",
        };
        f.write_str(s)
    }
}

/// The final, read-only metadata accessor used by the factory.
pub struct ClassRegistry {
    names: Vec<String>,
    modules: HashMap<ClassId, ModuleMetadata>,
    components: HashMap<ClassId, ComponentMetadata>,
    injectables: HashMap<ClassId, InjectableMetadata>,
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names.len())
            .field("modules", &self.modules.len())
            .field("components", &self.components.len())
            .field("injectables", &self.injectables.len())
            .finish()
    }
}

impl ClassRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Display name given at declaration time.
    pub fn class_name(&self, class: ClassId) -> &str {
        self.names
            .get(class.index())
            .map(String::as_str)
            .unwrap_or("<undeclared>")
    }

    /// Look a class up by its display name. First declaration wins.
    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(ClassId::from_index)
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.names.len()).map(ClassId::from_index)
    }

    pub fn kind(&self, class: ClassId) -> Option<ClassKind> {
        if self.modules.contains_key(&class) {
            Some(ClassKind::Module)
        } else if self.components.contains_key(&class) {
            Some(ClassKind::Component)
        } else if self.injectables.contains_key(&class) {
            Some(ClassKind::Injectable)
        } else {
            None
        }
    }

    pub fn module_metadata(&self, class: ClassId) -> Option<&ModuleMetadata> {
        self.modules.get(&class)
    }

    pub fn component_metadata(&self, class: ClassId) -> Option<&ComponentMetadata> {
        self.components.get(&class)
    }

    pub fn injectable(&self, class: ClassId) -> Option<&InjectableMetadata> {
        self.injectables.get(&class)
    }

    /// Declared dependency list: constructor deps for injectables, declarations
    /// for components. `None` means the class declares no dependency list at all.
    pub fn dependency_list(&self, class: ClassId) -> Option<&[ClassId]> {
        if let Some(injectable) = self.injectables.get(&class) {
            return Some(&injectable.deps);
        }
        self.components
            .get(&class)
            .map(|c| c.declarations.as_slice())
    }

    pub fn interceptor_list(&self, class: ClassId) -> &[ClassId] {
        self.components
            .get(&class)
            .map(|c| c.interceptors.as_slice())
            .unwrap_or(&[])
    }
}

/// Builder that collects declarations and metadata.
/// Registration problems are accumulated and reported by [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    names: Vec<String>,
    modules: HashMap<ClassId, ModuleMetadata>,
    components: HashMap<ClassId, ComponentMetadata>,
    injectables: HashMap<ClassId, InjectableMetadata>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    /// Declare a new class and get its handle. Metadata can be attached later,
    /// so forward references between classes are fine.
    pub fn declare(&mut self, name: impl Into<String>) -> ClassId {
        self.names.push(name.into());
        ClassId::from_index(self.names.len() - 1)
    }

    pub fn register_module(&mut self, class: ClassId, metadata: ModuleMetadata) -> &mut Self {
        if self.check_free(class, ClassKind::Module) {
            self.modules.insert(class, metadata);
        }
        self
    }

    pub fn register_component(&mut self, class: ClassId, metadata: ComponentMetadata) -> &mut Self {
        if self.check_free(class, ClassKind::Component) {
            self.components.insert(class, metadata);
        }
        self
    }

    /// Attach a dependency list and a constructor to a provider class.
    pub fn register_injectable<F>(
        &mut self,
        class: ClassId,
        deps: impl IntoIterator<Item = ClassId>,
        constructor: F,
    ) -> &mut Self
    where
        F: Fn(&Injected<'_>) -> anyhow::Result<Provided> + Send + Sync + 'static,
    {
        if self.check_free(class, ClassKind::Injectable) {
            self.injectables.insert(
                class,
                InjectableMetadata {
                    deps: deps.into_iter().collect(),
                    constructor: Arc::new(constructor),
                },
            );
        }
        self
    }

    fn name_of(&self, class: ClassId) -> &str {
        self.names
            .get(class.index())
            .map(String::as_str)
            .unwrap_or("<undeclared>")
    }

    fn kind_of(&self, class: ClassId) -> Option<ClassKind> {
        if self.modules.contains_key(&class) {
            Some(ClassKind::Module)
        } else if self.components.contains_key(&class) {
            Some(ClassKind::Component)
        } else if self.injectables.contains_key(&class) {
            Some(ClassKind::Injectable)
        } else {
            None
        }
    }

    fn check_free(&mut self, class: ClassId, kind: ClassKind) -> bool {
        if class.index() >= self.names.len() {
            self.errors
                .push(format!("Class {class} was not declared by this registry"));
            return false;
        }
        if let Some(existing) = self.kind_of(class) {
            let msg = if existing == kind {
                format!("Class '{}' is already registered as {existing}", self.name_of(class))
            } else {
                format!(
                    "Class '{}' cannot be registered as {kind}, it is already registered as {existing}",
                    self.name_of(class)
                )
            };
            self.errors.push(msg);
            return false;
        }
        true
    }

    /// Finalize; fails if any registration was rejected.
    pub fn build(self) -> Result<ClassRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }

        tracing::debug!(
            classes = self.names.len(),
            modules = self.modules.len(),
            components = self.components.len(),
            injectables = self.injectables.len(),
            "Class registry built"
        );

        Ok(ClassRegistry {
            names: self.names,
            modules: self.modules,
            components: self.components,
            injectables: self.injectables,
        })
    }
}

/// Structured errors for the class registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}
