use thiserror::Error;

/// Fatal resolution errors. Any of these aborts `Factory::create`; no partial
/// graph is returned.
#[derive(Debug, Error)]
pub enum FactoryError {
    // Module graph
    #[error("module '{0}' is not registered as a module")]
    UnknownModule(String),
    #[error("module '{0}' cannot import itself")]
    SelfImport(String),
    #[error("module '{imported}' cannot be imported into '{module}': it is not a registered module")]
    UnresolvedImport { module: String, imported: String },
    #[error("cyclic import detected: {}", path.join(" -> "))]
    CyclicImport { path: Vec<String> },
    #[error("'{class}' is declared by both '{first}' and '{second}'")]
    DuplicateDeclaration {
        class: String,
        first: String,
        second: String,
    },

    // Providers
    #[error("provider '{0}' cannot be injected: it has no injectable metadata")]
    NotInjectable(String),
    #[error("'{0}' cannot depend on itself")]
    SelfDependency(String),
    #[error("cyclic dependency detected: {}", path.join(" -> "))]
    CyclicDependency { path: Vec<String> },
    #[error(
        "cannot inject provider '{dependency}' into '{dependant}': it is provided by '{owner}', \
         did you import '{owner}' into '{module}' and export '{dependency}' from it?"
    )]
    ProviderNotExported {
        dependency: String,
        dependant: String,
        owner: String,
        module: String,
    },
    #[error("cannot find a provider '{dependency}' for '{dependant}': no module declares it")]
    ProviderNotInjectable { dependency: String, dependant: String },
    #[error("constructing provider '{provider}' failed")]
    Construct {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    // Components
    #[error("'{component}' is declared as a component of '{module}' but has no component metadata")]
    NotAComponent { component: String, module: String },
    #[error("platform failed to generate component '{component}'")]
    Platform {
        component: String,
        #[source]
        source: anyhow::Error,
    },

    // Routes
    #[error("route '{path}' must specify exactly one of 'use_component' and 'use_module'")]
    AmbiguousRouteTarget { path: String },
    #[error("route '{path}' targets '{target}', which is not part of the module graph")]
    UnknownRouteTarget { path: String, target: String },
    #[error("route '{path}' delegates back into its own module: {}", modules.join(" -> "))]
    CyclicRouteDelegation { path: String, modules: Vec<String> },

    #[error("'{0}' is not a component of the resolved application")]
    UnknownComponent(String),
    #[error("factory already ran; construct a new factory per application bootstrap")]
    AlreadyCreated,
    #[error("factory has not been created yet")]
    NotCreated,
}
