//! Serialized application description (YAML or JSON) compiled into a [`ClassRegistry`].
//!
//! Every class is referenced by name. Injectables get a [`ManifestService`]
//! value, so a manifest can be resolved end to end without any user code.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::class::ClassId;
use crate::contracts::{Interceptor, Provided};
use crate::metadata::{ComponentMetadata, ModuleMetadata, RouteOption};
use crate::registry::{ClassRegistry, RegistryBuilder, RegistryError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Name of the root module.
    pub root: String,
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleEntry>,
    #[serde(default)]
    pub injectables: BTreeMap<String, InjectableEntry>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleEntry {
    pub imports: Vec<String>,
    pub providers: Vec<String>,
    pub exports: Vec<String>,
    pub components: Vec<String>,
    pub routes: Vec<RouteEntry>,
    pub global: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteEntry {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteEntry>>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectableEntry {
    pub deps: Vec<String>,
    /// Expose the service as an interceptor as well.
    pub interceptor: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentEntry {
    #[serde(default)]
    pub declarations: Vec<String>,
    #[serde(default)]
    pub interceptors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspense_fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interceptors_fallback: Option<String>,
    #[serde(default)]
    pub lazy: bool,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported manifest format '{0}': expected .yaml, .yml or .json")]
    UnsupportedFormat(PathBuf),
    #[error("invalid YAML manifest")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON manifest")]
    Json(#[from] serde_json::Error),
    #[error("'{name}' referenced by '{referenced_by}' is not defined in the manifest")]
    UnknownClass { name: String, referenced_by: String },
    #[error("'{0}' is defined more than once (module, injectable and component names share one namespace)")]
    DuplicateName(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Registry built from a manifest plus the resolved root handle.
#[derive(Debug, Clone)]
pub struct CompiledManifest {
    pub registry: Arc<ClassRegistry>,
    pub root: ClassId,
}

/// Value constructed for every manifest injectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestService {
    pub name: String,
    pub deps: Vec<String>,
}

#[async_trait]
impl Interceptor for ManifestService {
    async fn intercept(&self) -> anyhow::Result<()> {
        tracing::info!(service = %self.name, "Interceptor passed");
        Ok(())
    }
}

impl Manifest {
    pub fn from_yaml_str(src: &str) -> Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(src)?)
    }

    pub fn from_json_str(src: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(src)?)
    }

    /// Load a manifest; the extension picks the format.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })
        };

        match ext.as_deref() {
            Some("yaml" | "yml") => Self::from_yaml_str(&read()?),
            Some("json") => Self::from_json_str(&read()?),
            _ => Err(ManifestError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Declare every named class and register its metadata.
    pub fn into_registry(self) -> Result<CompiledManifest, ManifestError> {
        let mut compiler = Compiler::default();
        compiler.declare_all(&self)?;

        let root = compiler.lookup(&self.root, "root")?;

        for (name, entry) in &self.modules {
            let class = compiler.ids[name];
            let metadata = compiler.module_metadata(name, entry)?;
            compiler.builder.register_module(class, metadata);
        }

        for (name, entry) in &self.components {
            let class = compiler.ids[name];
            let metadata = compiler.component_metadata(name, entry)?;
            compiler.builder.register_component(class, metadata);
        }

        for (name, entry) in &self.injectables {
            let class = compiler.ids[name];
            let deps = compiler.lookup_all(&entry.deps, name)?;
            let service = ManifestService {
                name: name.clone(),
                deps: entry.deps.clone(),
            };
            let interceptor = entry.interceptor;
            compiler.builder.register_injectable(class, deps, move |injected| {
                anyhow::ensure!(
                    injected.len() == service.deps.len(),
                    "'{}' expected {} dependencies, got {}",
                    service.name,
                    service.deps.len(),
                    injected.len()
                );
                Ok(if interceptor {
                    Provided::interceptor(service.clone())
                } else {
                    Provided::new(service.clone())
                })
            });
        }

        let registry = compiler.builder.build()?;
        tracing::debug!(
            root = %self.root,
            modules = self.modules.len(),
            components = self.components.len(),
            injectables = self.injectables.len(),
            "Manifest compiled"
        );

        Ok(CompiledManifest {
            registry: Arc::new(registry),
            root,
        })
    }
}

#[derive(Default)]
struct Compiler {
    builder: RegistryBuilder,
    ids: HashMap<String, ClassId>,
}

impl Compiler {
    fn declare_all(&mut self, manifest: &Manifest) -> Result<(), ManifestError> {
        let names = manifest
            .modules
            .keys()
            .chain(manifest.components.keys())
            .chain(manifest.injectables.keys());
        for name in names {
            if self.ids.contains_key(name) {
                return Err(ManifestError::DuplicateName(name.clone()));
            }
            let class = self.builder.declare(name.clone());
            self.ids.insert(name.clone(), class);
        }
        Ok(())
    }

    fn lookup(&self, name: &str, referenced_by: &str) -> Result<ClassId, ManifestError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| ManifestError::UnknownClass {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    fn lookup_all(&self, names: &[String], referenced_by: &str) -> Result<Vec<ClassId>, ManifestError> {
        names.iter().map(|n| self.lookup(n, referenced_by)).collect()
    }

    fn module_metadata(&self, name: &str, entry: &ModuleEntry) -> Result<ModuleMetadata, ManifestError> {
        let mut metadata = ModuleMetadata::new()
            .with_imports(self.lookup_all(&entry.imports, name)?)
            .with_providers(self.lookup_all(&entry.providers, name)?)
            .with_exports(self.lookup_all(&entry.exports, name)?)
            .with_components(self.lookup_all(&entry.components, name)?)
            .with_routes(self.routes(&entry.routes, name)?);
        if entry.global {
            metadata = metadata.global();
        }
        Ok(metadata)
    }

    fn component_metadata(
        &self,
        name: &str,
        entry: &ComponentEntry,
    ) -> Result<ComponentMetadata, ManifestError> {
        let mut metadata = ComponentMetadata::new()
            .with_declarations(self.lookup_all(&entry.declarations, name)?)
            .with_interceptors(self.lookup_all(&entry.interceptors, name)?);
        metadata.suspense_fallback = entry.suspense_fallback.clone();
        metadata.interceptors_fallback = entry.interceptors_fallback.clone();
        metadata.lazy = entry.lazy;
        metadata.options = entry.options.clone();
        Ok(metadata)
    }

    fn routes(&self, entries: &[RouteEntry], module: &str) -> Result<Vec<RouteOption>, ManifestError> {
        entries
            .iter()
            .map(|entry| -> Result<RouteOption, ManifestError> {
                let mut route = RouteOption::new(entry.path.clone());
                route.use_component = entry
                    .use_component
                    .as_deref()
                    .map(|n| self.lookup(n, module))
                    .transpose()?;
                route.use_module = entry
                    .use_module
                    .as_deref()
                    .map(|n| self.lookup(n, module))
                    .transpose()?;
                route.children = entry
                    .children
                    .as_deref()
                    .map(|children| self.routes(children, module))
                    .transpose()?;
                route.options = entry.options.clone();
                Ok(route)
            })
            .collect()
    }
}
