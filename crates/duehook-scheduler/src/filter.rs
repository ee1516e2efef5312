//! Id filters for search and bulk delete.

use duehook_core::{DuehookError, Result};
use duehook_store::ScheduleStore;

/// Filter over stored hook ids. At least one criterion is required; an
/// unfiltered walk over every record is never implied.
#[derive(Debug, Clone, Default)]
pub struct IdFilter {
    pub prefix: Option<String>,
    pub contains: Option<String>,
}

impl IdFilter {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: Some(prefix.into()), contains: None }
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self { prefix: None, contains: Some(needle.into()) }
    }

    // Empty strings count as absent, same as omitting the parameter.
    fn criteria(&self) -> (Option<&str>, Option<&str>) {
        let prefix = self.prefix.as_deref().filter(|s| !s.is_empty());
        let contains = self.contains.as_deref().filter(|s| !s.is_empty());
        (prefix, contains)
    }

    pub fn validate(&self) -> Result<()> {
        let (prefix, contains) = self.criteria();
        if prefix.is_none() && contains.is_none() {
            return Err(DuehookError::InvalidArgument(
                "provide a prefix or contains filter".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the matching ids. A prefix narrows the scan to matching
    /// keys; a substring match walks every key and is kept as the
    /// documented scaling limit.
    pub fn resolve_ids(&self, store: &dyn ScheduleStore) -> Result<Vec<String>> {
        self.validate()?;
        let (prefix, contains) = self.criteria();

        let mut ids = store.scan_ids(prefix.unwrap_or(""))?;
        if let Some(needle) = contains {
            ids.retain(|id| id.contains(needle));
        }
        Ok(ids)
    }
}
