//! Composite identifiers for cache entries.

use std::fmt;

use serde::Serialize;

/// Identifies a single entry across all namespaces.
///
/// Se renderiza como `namespace:key`. The parts are kept separate so that keys
/// containing `:` never get confused with a namespace boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryId {
    namespace: String,
    key: String,
}

impl EntryId {
    /// Crea un nuevo identificador compuesto.
    ///
    /// # Examples
    ///
    /// ```
    /// use evocache_core::EntryId;
    ///
    /// let id = EntryId::new("feed", "page:1");
    /// assert_eq!(id.namespace(), "feed");
    /// assert_eq!(id.key(), "page:1");
    /// assert_eq!(id.to_string(), "feed:page:1");
    /// ```
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Retorna el namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Retorna la key dentro del namespace.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}
