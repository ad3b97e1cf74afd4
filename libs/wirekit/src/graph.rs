//! Module graph: flattens the import graph into unique module instances,
//! links import edges, rejects cycles and computes visibility.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::class::ClassId;
use crate::error::FactoryError;
use crate::metadata::ModuleMetadata;
use crate::module_instance::ModuleInstance;
use crate::registry::ClassRegistry;

/// All module instances reachable from one root module, in creation order.
#[derive(Debug)]
pub struct ModuleGraph {
    modules: Vec<Arc<ModuleInstance>>,
    idx: HashMap<ClassId, usize>,
    globals: Vec<ClassId>,
}

impl ModuleGraph {
    /// Build, link and validate the graph rooted at `root`.
    pub fn build(registry: &ClassRegistry, root: ClassId) -> Result<Self, FactoryError> {
        if registry.module_metadata(root).is_none() {
            return Err(FactoryError::UnknownModule(
                registry.class_name(root).to_string(),
            ));
        }

        // 1) one instance per reachable module class
        let mut nodes = Vec::new();
        let mut idx = HashMap::new();
        Self::create_instances(registry, root, &mut nodes, &mut idx);

        // 2) attach import edges now that every node exists
        let globals = Self::link(registry, &mut nodes, &idx)?;

        // 3) reject longer cycles as well
        if let Some(cycle) = Self::detect_cycle_with_path(&nodes, &idx) {
            return Err(FactoryError::CyclicImport {
                path: cycle
                    .into_iter()
                    .map(|c| registry.class_name(c).to_string())
                    .collect(),
            });
        }

        // 4) visibility per module
        let visible: Vec<HashSet<ClassId>> = (0..nodes.len())
            .map(|i| Self::injectable_from(i, &nodes, &idx, &globals))
            .collect();
        for (node, set) in nodes.iter_mut().zip(visible) {
            node.set_injectable(set);
        }

        tracing::info!(
            modules = ?nodes.iter().map(|m| m.name()).collect::<Vec<_>>(),
            globals = globals.len(),
            "Module graph resolved"
        );

        Ok(Self {
            modules: nodes.into_iter().map(Arc::new).collect(),
            idx,
            globals,
        })
    }

    fn create_instances(
        registry: &ClassRegistry,
        class: ClassId,
        nodes: &mut Vec<ModuleInstance>,
        idx: &mut HashMap<ClassId, usize>,
    ) {
        if idx.contains_key(&class) {
            return;
        }
        // Classes without module metadata are left for the link pass to report.
        let Some(metadata) = registry.module_metadata(class) else {
            return;
        };

        idx.insert(class, nodes.len());
        nodes.push(ModuleInstance::new(
            class,
            registry.class_name(class),
            metadata.clone(),
        ));

        for &imported in &metadata.imports {
            Self::create_instances(registry, imported, nodes, idx);
        }
    }

    fn link(
        registry: &ClassRegistry,
        nodes: &mut [ModuleInstance],
        idx: &HashMap<ClassId, usize>,
    ) -> Result<Vec<ClassId>, FactoryError> {
        let mut globals = Vec::new();

        for i in 0..nodes.len() {
            let class = nodes[i].class();
            let imports = nodes[i].metadata().imports.clone();

            for imported in imports {
                if imported == class {
                    return Err(FactoryError::SelfImport(nodes[i].name().to_string()));
                }

                let j = *idx
                    .get(&imported)
                    .ok_or_else(|| FactoryError::UnresolvedImport {
                        module: nodes[i].name().to_string(),
                        imported: registry.class_name(imported).to_string(),
                    })?;

                if nodes[j].imports_directly(class) {
                    return Err(FactoryError::CyclicImport {
                        path: vec![
                            nodes[i].name().to_string(),
                            nodes[j].name().to_string(),
                            nodes[i].name().to_string(),
                        ],
                    });
                }

                nodes[i].add_imported(imported);
            }

            if nodes[i].is_global() {
                globals.push(class);
            }
        }

        Ok(globals)
    }

    /// Detect cycles in the import graph using DFS with path tracking.
    /// Returns the cycle path (first node repeated at the end) if found.
    fn detect_cycle_with_path(
        nodes: &[ModuleInstance],
        idx: &HashMap<ClassId, usize>,
    ) -> Option<Vec<ClassId>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White, // unvisited
            Gray,  // on current path
            Black, // finished
        }

        fn dfs(
            node: usize,
            nodes: &[ModuleInstance],
            idx: &HashMap<ClassId, usize>,
            colors: &mut [Color],
            path: &mut Vec<usize>,
        ) -> Option<Vec<ClassId>> {
            colors[node] = Color::Gray;
            path.push(node);

            for imported in nodes[node].imported_modules() {
                let Some(&next) = idx.get(imported) else {
                    continue;
                };
                match colors[next] {
                    Color::Gray => {
                        if let Some(start) = path.iter().position(|&n| n == next) {
                            let mut cycle: Vec<ClassId> =
                                path[start..].iter().map(|&i| nodes[i].class()).collect();
                            cycle.push(nodes[next].class());
                            return Some(cycle);
                        }
                    }
                    Color::White => {
                        if let Some(cycle) = dfs(next, nodes, idx, colors, path) {
                            return Some(cycle);
                        }
                    }
                    Color::Black => {}
                }
            }

            path.pop();
            colors[node] = Color::Black;
            None
        }

        let mut colors = vec![Color::White; nodes.len()];
        let mut path = Vec::new();
        for i in 0..nodes.len() {
            if colors[i] == Color::White {
                if let Some(cycle) = dfs(i, nodes, idx, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    /// The graph is acyclic here, so a plain visited set bounds the walk.
    fn injectable_from(
        i: usize,
        nodes: &[ModuleInstance],
        idx: &HashMap<ClassId, usize>,
        globals: &[ClassId],
    ) -> HashSet<ClassId> {
        let me = &nodes[i];
        let mut set: HashSet<ClassId> = me.metadata().providers.iter().copied().collect();

        let mut seen = HashSet::new();
        let mut stack: Vec<ClassId> = me.imported_modules().to_vec();
        while let Some(class) = stack.pop() {
            if !seen.insert(class) {
                continue;
            }
            if let Some(&j) = idx.get(&class) {
                set.extend(nodes[j].metadata().exports.iter().copied());
                stack.extend(nodes[j].imported_modules().iter().copied());
            }
        }

        for global in globals.iter().filter(|&&g| g != me.class()) {
            if let Some(&j) = idx.get(global) {
                set.extend(nodes[j].metadata().providers.iter().copied());
            }
        }

        set
    }

    pub fn root(&self) -> &Arc<ModuleInstance> {
        &self.modules[0]
    }

    pub fn get(&self, class: ClassId) -> Option<&Arc<ModuleInstance>> {
        self.idx.get(&class).map(|&i| &self.modules[i])
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.idx.contains_key(&class)
    }

    /// Every module instance, in creation order (root first).
    pub fn modules(&self) -> &[Arc<ModuleInstance>] {
        &self.modules
    }

    pub fn globals(&self) -> &[ClassId] {
        &self.globals
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Root first, then imported modules depth first; each module once.
    pub fn walk_from_root(&self) -> Vec<&Arc<ModuleInstance>> {
        fn visit<'g>(
            graph: &'g ModuleGraph,
            module: &'g Arc<ModuleInstance>,
            seen: &mut HashSet<ClassId>,
            out: &mut Vec<&'g Arc<ModuleInstance>>,
        ) {
            if !seen.insert(module.class()) {
                return;
            }
            out.push(module);
            for &imported in module.imported_modules() {
                if let Some(next) = graph.get(imported) {
                    visit(graph, next, seen, out);
                }
            }
        }

        let mut out = Vec::with_capacity(self.modules.len());
        visit(self, self.root(), &mut HashSet::new(), &mut out);
        out
    }

    /// Map each class listed by `select` to the single module declaring it.
    pub fn owners(
        &self,
        registry: &ClassRegistry,
        select: fn(&ModuleMetadata) -> &[ClassId],
    ) -> Result<HashMap<ClassId, ClassId>, FactoryError> {
        let mut owners: HashMap<ClassId, ClassId> = HashMap::new();
        for module in &self.modules {
            for &class in select(module.metadata()) {
                match owners.get(&class) {
                    Some(&first) if first != module.class() => {
                        return Err(FactoryError::DuplicateDeclaration {
                            class: registry.class_name(class).to_string(),
                            first: registry.class_name(first).to_string(),
                            second: module.name().to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(class, module.class());
                    }
                }
            }
        }
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryBuilder;

    fn module(b: &mut RegistryBuilder, class: ClassId, imports: &[ClassId]) {
        b.register_module(class, ModuleMetadata::new().with_imports(imports.iter().copied()));
    }

    #[test]
    fn diamond_creates_each_module_once() {
        let mut b = ClassRegistry::builder();
        let [app, left, right, shared] = ["App", "Left", "Right", "Shared"].map(|n| b.declare(n));
        module(&mut b, app, &[left, right]);
        module(&mut b, left, &[shared]);
        module(&mut b, right, &[shared]);
        module(&mut b, shared, &[]);
        let reg = b.build().unwrap();

        let graph = ModuleGraph::build(&reg, app).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.root().class(), app);
        let order: Vec<_> = graph.walk_from_root().iter().map(|m| m.name()).collect();
        assert_eq!(order, vec!["App", "Left", "Shared", "Right"]);
    }

    #[test]
    fn self_import_rejected() {
        let mut b = ClassRegistry::builder();
        let app = b.declare("App");
        module(&mut b, app, &[app]);
        let reg = b.build().unwrap();

        match ModuleGraph::build(&reg, app).unwrap_err() {
            FactoryError::SelfImport(name) => assert_eq!(name, "App"),
            other => panic!("expected SelfImport, got: {other:?}"),
        }
    }

    #[test]
    fn import_without_module_metadata_is_unresolved() {
        let mut b = ClassRegistry::builder();
        let app = b.declare("App");
        let ghost = b.declare("Ghost");
        module(&mut b, app, &[ghost]);
        let reg = b.build().unwrap();

        match ModuleGraph::build(&reg, app).unwrap_err() {
            FactoryError::UnresolvedImport { module, imported } => {
                assert_eq!(module, "App");
                assert_eq!(imported, "Ghost");
            }
            other => panic!("expected UnresolvedImport, got: {other:?}"),
        }
    }

    #[test]
    fn root_must_be_a_module() {
        let mut b = ClassRegistry::builder();
        let nothing = b.declare("Nothing");
        let reg = b.build().unwrap();
        assert!(matches!(
            ModuleGraph::build(&reg, nothing),
            Err(FactoryError::UnknownModule(_))
        ));
    }

    #[test]
    fn mutual_import_detected() {
        let mut b = ClassRegistry::builder();
        let [a, bb] = ["A", "B"].map(|n| b.declare(n));
        module(&mut b, a, &[bb]);
        module(&mut b, bb, &[a]);
        let reg = b.build().unwrap();

        match ModuleGraph::build(&reg, a).unwrap_err() {
            FactoryError::CyclicImport { path } => {
                assert!(path.contains(&"A".to_string()));
                assert!(path.contains(&"B".to_string()));
                assert_eq!(path.len(), 3);
            }
            other => panic!("expected CyclicImport, got: {other:?}"),
        }
    }

    #[test]
    fn longer_cycle_detected_with_path() {
        let mut b = ClassRegistry::builder();
        let [a, bb, c, d] = ["A", "B", "C", "D"].map(|n| b.declare(n));
        module(&mut b, a, &[bb, d]);
        module(&mut b, bb, &[c]);
        module(&mut b, c, &[a]);
        module(&mut b, d, &[]);
        let reg = b.build().unwrap();

        let err = ModuleGraph::build(&reg, a).unwrap_err();
        match &err {
            FactoryError::CyclicImport { path } => {
                assert_eq!(path, &vec!["A", "B", "C", "A"]);
            }
            other => panic!("expected CyclicImport, got: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("cyclic import detected"));
        assert!(msg.contains("A -> B -> C -> A"));
    }

    #[test]
    fn visibility_follows_exports_transitively_and_globals() {
        let mut b = ClassRegistry::builder();
        let [app, feature, shared, config] =
            ["App", "Feature", "Shared", "Config"].map(|n| b.declare(n));
        let [hidden, exported, deep, cfg] =
            ["Hidden", "Exported", "Deep", "Cfg"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_imports([feature, config]));
        b.register_module(
            feature,
            ModuleMetadata::new()
                .with_imports([shared])
                .with_providers([hidden, exported])
                .with_exports([exported]),
        );
        b.register_module(
            shared,
            ModuleMetadata::new().with_providers([deep]).with_exports([deep]),
        );
        b.register_module(config, ModuleMetadata::new().with_providers([cfg]).global());
        let reg = b.build().unwrap();

        let graph = ModuleGraph::build(&reg, app).unwrap();
        assert_eq!(graph.globals(), &[config]);

        let app_mod = graph.get(app).unwrap();
        assert!(app_mod.can_inject(exported));
        assert!(app_mod.can_inject(deep));
        assert!(app_mod.can_inject(cfg));
        assert!(!app_mod.can_inject(hidden));

        // Shared does not import Config; the global rule still applies.
        assert!(graph.get(shared).unwrap().can_inject(cfg));
        // Own providers stay visible inside the global module itself.
        assert!(graph.get(config).unwrap().can_inject(cfg));
        assert!(graph.get(feature).unwrap().can_inject(hidden));
    }

    #[test]
    fn duplicate_provider_owner_rejected() {
        let mut b = ClassRegistry::builder();
        let [app, other, svc] = ["App", "Other", "Svc"].map(|n| b.declare(n));
        b.register_module(app, ModuleMetadata::new().with_imports([other]).with_providers([svc]));
        b.register_module(other, ModuleMetadata::new().with_providers([svc]));
        let reg = b.build().unwrap();

        let graph = ModuleGraph::build(&reg, app).unwrap();
        match graph.owners(&reg, |m| m.providers.as_slice()).unwrap_err() {
            FactoryError::DuplicateDeclaration { class, first, second } => {
                assert_eq!(class, "Svc");
                assert_eq!(first, "App");
                assert_eq!(second, "Other");
            }
            other => panic!("expected DuplicateDeclaration, got: {other:?}"),
        }
    }
}
