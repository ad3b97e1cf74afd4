//! Route assembly: path composition and module-route flattening.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::class::ClassId;
use crate::component::ComponentInstance;
use crate::error::FactoryError;
use crate::graph::ModuleGraph;
use crate::metadata::RouteOption;
use crate::registry::ClassRegistry;

/// One node of the assembled route tree.
#[derive(Debug, Clone, Serialize)]
pub struct RouteItem {
    pub path: String,
    #[serde(flatten)]
    pub options: Map<String, Value>,
    #[serde(serialize_with = "serialize_component")]
    pub component: Arc<ComponentInstance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteItem>>,
}

fn serialize_component<S: Serializer>(
    component: &Arc<ComponentInstance>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(component.name())
}

fn trim_slashes(path: &str) -> &str {
    path.trim_matches('/')
}

/// Join a prefix and a segment with exactly one slash, dropping empty parts.
pub fn compose_path(prefix: &str, segment: &str) -> String {
    let prefix = trim_slashes(prefix);
    let segment = trim_slashes(segment);
    if prefix.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{segment}")
    }
}

pub(crate) struct RouteAssembler<'a> {
    registry: &'a ClassRegistry,
    graph: &'a ModuleGraph,
    components: &'a HashMap<ClassId, Arc<ComponentInstance>>,
}

impl<'a> RouteAssembler<'a> {
    pub(crate) fn new(
        registry: &'a ClassRegistry,
        graph: &'a ModuleGraph,
        components: &'a HashMap<ClassId, Arc<ComponentInstance>>,
    ) -> Self {
        Self {
            registry,
            graph,
            components,
        }
    }

    /// Assemble the routes declared by `module`.
    pub(crate) fn assemble_module(&self, module: ClassId) -> Result<Vec<RouteItem>, FactoryError> {
        let target = self.graph.get(module).ok_or_else(|| {
            FactoryError::UnknownModule(self.registry.class_name(module).to_string())
        })?;
        self.assemble(&target.metadata().routes, "", &mut vec![module])
    }

    /// `stack` holds the modules whose routes are being spliced; a module may
    /// appear on it only once.
    fn assemble(
        &self,
        routes: &[RouteOption],
        prefix: &str,
        stack: &mut Vec<ClassId>,
    ) -> Result<Vec<RouteItem>, FactoryError> {
        let mut result = Vec::new();

        for route in routes {
            let path = compose_path(prefix, &route.path);

            match (route.use_component, route.use_module) {
                (Some(component), None) => {
                    let instance = self.components.get(&component).cloned().ok_or_else(|| {
                        FactoryError::UnknownRouteTarget {
                            path: path.clone(),
                            target: self.registry.class_name(component).to_string(),
                        }
                    })?;
                    let children = route
                        .children
                        .as_deref()
                        .map(|children| self.assemble(children, "", stack))
                        .transpose()?;

                    result.push(RouteItem {
                        path,
                        options: route.options.clone(),
                        component: instance,
                        children,
                    });
                }
                (None, Some(module)) => {
                    let target = self.graph.get(module).ok_or_else(|| {
                        FactoryError::UnknownRouteTarget {
                            path: path.clone(),
                            target: self.registry.class_name(module).to_string(),
                        }
                    })?;

                    if stack.contains(&module) {
                        let mut cycle: Vec<String> = stack
                            .iter()
                            .map(|&m| self.registry.class_name(m).to_string())
                            .collect();
                        cycle.push(target.name().to_string());
                        return Err(FactoryError::CyclicRouteDelegation { path, modules: cycle });
                    }

                    // Splice the module's own routes into this level.
                    stack.push(module);
                    let spliced = self.assemble(&target.metadata().routes, &path, stack);
                    stack.pop();
                    let mut spliced = spliced?;
                    if let Some(children) = route.children.as_deref() {
                        let extra = self.assemble(children, "", stack)?;
                        for item in &mut spliced {
                            item.children
                                .get_or_insert_with(Vec::new)
                                .extend(extra.iter().cloned());
                        }
                    }

                    tracing::debug!(
                        path = %path,
                        module = %target.name(),
                        routes = spliced.len(),
                        "Module routes flattened"
                    );
                    result.extend(spliced);
                }
                _ => return Err(FactoryError::AmbiguousRouteTarget { path }),
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_composition() {
        assert_eq!(compose_path("app", "foo"), "app/foo");
        assert_eq!(compose_path("", "/foo/"), "foo");
        assert_eq!(compose_path("app/", ""), "app");
        assert_eq!(compose_path("/app/", "/foo/bar/"), "app/foo/bar");
        assert_eq!(compose_path("", ""), "");
        assert_eq!(compose_path("//", "x"), "x");
    }
}
