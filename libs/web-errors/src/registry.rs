//! Process-wide error vocabulary shared by independently deployed services.
//!
//! Readers load the current [`Catalog`] snapshot without blocking. Writers
//! serialize on a mutex, copy the snapshot, apply their additions and publish
//! the copy in a single swap, so a reader sees either the old or the new
//! catalog in full.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use http::StatusCode;
use parking_lot::Mutex;

use crate::catalog::Catalog;
use crate::error::WebError;

/// Returned by [`ErrorRegistry::lookup`] when no catalog has been published.
pub const CATALOG_NOT_INITIALIZED: &str = "Exception codes are not initialized!";

/// One caller's additions: `code -> label`.
pub type CodeMap = BTreeMap<String, String>;

/// Label reported for a code missing from the catalog.
#[must_use]
pub fn code_not_available(code: &str) -> String {
    format!("Exception code={code} is not available.")
}

/// Counts of what a [`ErrorRegistry::merge`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub overridden: usize,
    pub unchanged: usize,
}

impl MergeOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.overridden > 0
    }
}

/// Interface consumers depend on; construct one registry at startup and share it.
pub trait ErrorRegistry: Send + Sync {
    /// Label for `code`. Never fails: unknown codes yield [`code_not_available`],
    /// a registry without a catalog yields [`CATALOG_NOT_INITIALIZED`].
    fn lookup(&self, code: &str) -> String;

    /// Fold `maps` into a new catalog snapshot, in order. Conflicting labels
    /// override the existing ones and are reported with a warning.
    fn merge(&self, maps: &[CodeMap]) -> MergeOutcome;

    /// Currently published catalog.
    fn snapshot(&self) -> Option<Arc<Catalog>>;
}

/// Copy-on-write [`ErrorRegistry`] seeded with the built-in codes.
pub struct CodeRegistry {
    catalog: ArcSwapOption<Catalog>,
    write_lock: Mutex<()>,
}

impl CodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            catalog: ArcSwapOption::from_pointee(Catalog::builtin()),
            write_lock: Mutex::new(()),
        }
    }

    /// Registry that has not published any catalog yet.
    #[cfg(test)]
    pub(crate) fn unseeded() -> Self {
        Self {
            catalog: ArcSwapOption::empty(),
            write_lock: Mutex::new(()),
        }
    }
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRegistry")
            .field("catalog", &self.catalog.load_full())
            .finish_non_exhaustive()
    }
}

impl ErrorRegistry for CodeRegistry {
    fn lookup(&self, code: &str) -> String {
        match self.catalog.load().as_deref() {
            None => CATALOG_NOT_INITIALIZED.to_owned(),
            Some(catalog) => catalog
                .get(code)
                .map_or_else(|| code_not_available(code), ToOwned::to_owned),
        }
    }

    fn merge(&self, maps: &[CodeMap]) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        if maps.iter().all(BTreeMap::is_empty) {
            return outcome;
        }

        let _guard = self.write_lock.lock();
        let mut next = self
            .catalog
            .load()
            .as_deref()
            .cloned()
            .unwrap_or_default();

        for (code, label) in maps.iter().flatten() {
            match next.upsert(code.clone(), label.clone()) {
                None => outcome.inserted += 1,
                Some(old) if old == *label => outcome.unchanged += 1,
                Some(old) => {
                    tracing::warn!(
                        %code,
                        old = %old,
                        new = %label,
                        "Overriding error code label"
                    );
                    outcome.overridden += 1;
                }
            }
        }

        if outcome.changed() {
            self.catalog.store(Some(Arc::new(next)));
        }
        tracing::debug!(
            inserted = outcome.inserted,
            overridden = outcome.overridden,
            "Merged error code maps"
        );
        outcome
    }

    fn snapshot(&self) -> Option<Arc<Catalog>> {
        self.catalog.load_full()
    }
}

/// A service's view of the shared registry: its own name plus helpers that
/// build declared failures labelled from the catalog.
#[derive(Clone)]
pub struct ServiceErrors {
    service: String,
    registry: Arc<dyn ErrorRegistry>,
}

impl ServiceErrors {
    #[must_use]
    pub fn new(service: impl Into<String>, registry: Arc<dyn ErrorRegistry>) -> Self {
        Self {
            service: service.into(),
            registry,
        }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<dyn ErrorRegistry> {
        &self.registry
    }

    /// Register this service's codes.
    pub fn register(&self, maps: &[CodeMap]) -> MergeOutcome {
        self.registry.merge(maps)
    }

    /// Declared failure whose detail is the catalog label of `code`.
    #[must_use]
    pub fn create(&self, status: StatusCode, code: &str) -> WebError {
        let label = self.registry.lookup(code);
        self.create_with_message(status, code, label)
    }

    #[must_use]
    pub fn create_with_message(
        &self,
        status: StatusCode,
        code: &str,
        message: impl Into<String>,
    ) -> WebError {
        WebError::new(status, code, message)
            .with_title(self.registry.lookup(code))
            .with_service(self.service.clone())
    }
}

impl std::fmt::Debug for ServiceErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceErrors")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}
