//! Module Instance - one runtime node per module class, the unit of visibility scoping

use std::collections::HashSet;

use crate::class::ClassId;
use crate::metadata::ModuleMetadata;

/// Runtime node wrapping one module class.
///
/// Created once per class during graph construction, linked once, then
/// read-only. The visibility set is computed by the graph after linking.
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    class: ClassId,
    name: String,
    metadata: ModuleMetadata,
    imported: Vec<ClassId>,
    injectable: HashSet<ClassId>,
}

impl ModuleInstance {
    pub(crate) fn new(class: ClassId, name: impl Into<String>, metadata: ModuleMetadata) -> Self {
        Self {
            class,
            name: name.into(),
            metadata,
            imported: Vec::new(),
            injectable: HashSet::new(),
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &ModuleMetadata {
        &self.metadata
    }

    pub fn is_global(&self) -> bool {
        self.metadata.is_global
    }

    /// Directly imported modules, resolved during linking.
    pub fn imported_modules(&self) -> &[ClassId] {
        &self.imported
    }

    pub fn imports_directly(&self, module: ClassId) -> bool {
        self.imported.contains(&module)
    }

    /// Whether `provider` may be injected into classes owned by this module:
    /// its own providers, exports of any transitively imported module, and
    /// providers of global modules other than this one.
    pub fn can_inject(&self, provider: ClassId) -> bool {
        self.injectable.contains(&provider)
    }

    pub(crate) fn add_imported(&mut self, module: ClassId) {
        if !self.imported.contains(&module) {
            self.imported.push(module);
        }
    }

    pub(crate) fn set_injectable(&mut self, injectable: HashSet<ClassId>) {
        self.injectable = injectable;
    }
}
