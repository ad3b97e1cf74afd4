use std::fmt;

/// Opaque handle for a declared class (module, provider or component).
///
/// Handles are handed out by [`RegistryBuilder::declare`](crate::registry::RegistryBuilder::declare)
/// and compared by identity; two classes with the same display name are still
/// distinct classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
