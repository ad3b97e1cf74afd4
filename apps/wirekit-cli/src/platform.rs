use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use wirekit::{ClassRegistry, ComponentInstance, DependencyMap, Platform, Renderable};

/// What the CLI "renders": a description of the component and its wiring.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedComponent {
    pub name: String,
    pub module: String,
    pub dependencies: Vec<String>,
    pub interceptors: usize,
    pub lazy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspense_fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interceptors_fallback: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

/// Platform that turns components into [`RenderedComponent`] descriptions.
pub struct DescriptorPlatform {
    registry: Arc<ClassRegistry>,
}

impl DescriptorPlatform {
    pub fn new(registry: Arc<ClassRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Platform for DescriptorPlatform {
    async fn generate_component(
        &self,
        component: &ComponentInstance,
        deps: &DependencyMap,
    ) -> anyhow::Result<Renderable> {
        let metadata = component.metadata();
        let rendered = RenderedComponent {
            name: component.name().to_string(),
            module: self.registry.class_name(component.module()).to_string(),
            dependencies: deps
                .iter()
                .map(|(class, _)| self.registry.class_name(class).to_string())
                .collect(),
            interceptors: component.interceptors().len(),
            lazy: metadata.lazy,
            suspense_fallback: metadata.suspense_fallback.clone(),
            interceptors_fallback: metadata.interceptors_fallback.clone(),
            options: metadata.options.clone(),
        };
        tracing::debug!(component = %rendered.name, deps = rendered.dependencies.len(), "Rendered");
        Ok(Arc::new(rendered))
    }
}
