//! # wirekit - module graph, dependency injection and route assembly
//!
//! Applications are described as modules that import each other, declare
//! providers (injectable services) and components, export providers to their
//! importers and define routes. The [`Factory`] turns a root module into:
//!
//! - one [`ModuleInstance`] per reachable module (diamond imports share it),
//! - one [`ProviderInstance`] per provider, built by constructor injection with
//!   export and global visibility enforced,
//! - one [`ComponentInstance`] per component, with a [`DependencyMap`] and a
//!   renderable unit generated once by a [`Platform`],
//! - a flat-or-nested [`RouteItem`] tree with composed paths, where routes
//!   pointing at modules are replaced by that module's own routes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use wirekit::{ClassRegistry, Factory, ModuleMetadata, Provided, RouteOption};
//!
//! let mut b = ClassRegistry::builder();
//! let app = b.declare("AppModule");
//! let home = b.declare("HomeView");
//! let config = b.declare("Config");
//! b.register_module(
//!     app,
//!     ModuleMetadata::new()
//!         .with_providers([config])
//!         .with_components([home])
//!         .with_routes([RouteOption::component("home", home)]),
//! );
//! b.register_component(home, ComponentMetadata::new().with_declarations([config]));
//! b.register_injectable(config, [], |_| Ok(Provided::new(AppConfig::default())));
//!
//! let mut factory = Factory::new(Arc::new(b.build()?), platform);
//! let routes = factory.create(app).await?;
//! ```
//!
//! Applications without Rust code can be described by a [`Manifest`].

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod class;
pub mod component;
pub mod contracts;
pub mod error;
pub mod factory;
pub mod graph;
pub mod manifest;
pub mod metadata;
pub mod module_instance;
pub mod provider;
pub mod registry;
pub mod routes;

pub use class::ClassId;
pub use component::{ComponentInstance, DependencyMap, Resolved};
pub use contracts::{Instance, Interceptor, Platform, Provided, Renderable};
pub use error::FactoryError;
pub use factory::Factory;
pub use graph::ModuleGraph;
pub use manifest::{
    CompiledManifest, ComponentEntry, InjectableEntry, Manifest, ManifestError, ManifestService,
    ModuleEntry, RouteEntry,
};
pub use metadata::{ComponentMetadata, Constructor, InjectableMetadata, ModuleMetadata, RouteOption};
pub use module_instance::ModuleInstance;
pub use provider::{Injected, ProviderInstance};
pub use registry::{ClassKind, ClassRegistry, RegistryBuilder, RegistryError};
pub use routes::{compose_path, RouteItem};
