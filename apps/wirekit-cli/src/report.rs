use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write;
use wirekit::{Factory, RouteItem};
use wirekit_bootstrap::OutputFormat;

use crate::platform::RenderedComponent;

#[derive(Debug, Serialize)]
pub struct CheckSummary {
    pub root: String,
    pub modules: usize,
    pub providers: usize,
    pub components: usize,
    pub routes: usize,
}

#[derive(Debug, Serialize)]
pub struct ProviderRow {
    pub name: String,
    pub module: String,
    pub dependencies: Vec<String>,
    pub interceptor: bool,
}

#[derive(Debug, Serialize)]
pub struct ProvidersReport {
    pub providers: Vec<ProviderRow>,
    pub components: Vec<RenderedComponent>,
}

fn count_routes(routes: &[RouteItem]) -> usize {
    routes
        .iter()
        .map(|r| 1 + r.children.as_deref().map_or(0, count_routes))
        .sum()
}

pub fn check_summary(factory: &Factory) -> CheckSummary {
    CheckSummary {
        root: factory
            .root_module_instance()
            .map(|m| m.name().to_string())
            .unwrap_or_default(),
        modules: factory.module_graph().map_or(0, |g| g.len()),
        providers: factory.provider_instances().count(),
        components: factory.component_instances().count(),
        routes: count_routes(factory.routes()),
    }
}

pub fn providers_report(factory: &Factory) -> ProvidersReport {
    let registry = factory.registry();
    let providers = factory
        .provider_instances()
        .map(|p| ProviderRow {
            name: registry.class_name(p.class()).to_string(),
            module: registry.class_name(p.module()).to_string(),
            dependencies: registry
                .dependency_list(p.class())
                .unwrap_or_default()
                .iter()
                .map(|&d| registry.class_name(d).to_string())
                .collect(),
            interceptor: p.interceptor().is_some(),
        })
        .collect();

    let components = factory
        .component_instances()
        .filter_map(|c| c.renderable()?.downcast::<RenderedComponent>().ok())
        .map(|r| (*r).clone())
        .collect();

    ProvidersReport {
        providers,
        components,
    }
}

fn write_routes(out: &mut String, routes: &[RouteItem], depth: usize) {
    for route in routes {
        let lazy = if route.component.metadata().lazy {
            " [lazy]"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:indent$}/{} -> {}{lazy}",
            "",
            route.path,
            route.component.name(),
            indent = depth * 2
        );
        if let Some(children) = route.children.as_deref() {
            write_routes(out, children, depth + 1);
        }
    }
}

pub fn route_tree(routes: &[RouteItem]) -> String {
    let mut out = String::new();
    write_routes(&mut out, routes, 0);
    out
}

pub fn providers_tree(report: &ProvidersReport) -> String {
    let mut out = String::from("providers:\n");
    for p in &report.providers {
        let marker = if p.interceptor { " [interceptor]" } else { "" };
        let _ = writeln!(out, "  {} ({}){marker}", p.name, p.module);
        for dep in &p.dependencies {
            let _ = writeln!(out, "    <- {dep}");
        }
    }
    out.push_str("components:\n");
    for c in &report.components {
        let _ = writeln!(out, "  {} ({})", c.name, c.module);
        for dep in &c.dependencies {
            let _ = writeln!(out, "    <- {dep}");
        }
    }
    out
}

pub fn summary_line(summary: &CheckSummary) -> String {
    format!(
        "OK: root {} resolved ({} modules, {} providers, {} components, {} routes)\n",
        summary.root, summary.modules, summary.providers, summary.components, summary.routes
    )
}

/// Render `value` in the configured format; `tree` supplies the human view.
pub fn emit<T: Serialize>(
    value: &T,
    format: OutputFormat,
    tree: impl FnOnce(&T) -> String,
) -> Result<String> {
    match format {
        OutputFormat::Tree => Ok(tree(value)),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .context("Failed to serialize output as JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to serialize output as YAML"),
    }
}
