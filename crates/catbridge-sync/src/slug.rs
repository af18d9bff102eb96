//! Collision-free slug allocation.

use catbridge_core::{slugify, CatalogStore, SlugScope, StoreError};

pub const DEFAULT_MAX_PROBES: u32 = 100;

/// Allocates a slug that no row in the scope's table uses yet.
///
/// The probe is a plain read; nothing is reserved. Two concurrent writers
/// could be handed the same slug, which the single-worker import never does.
/// A collision that slips through anyway is caught by the table's unique
/// index and fails that one record.
pub struct SlugAllocator<'a> {
    store: &'a dyn CatalogStore,
    max_probes: u32,
}

impl<'a> SlugAllocator<'a> {
    #[must_use]
    pub fn new(store: &'a dyn CatalogStore, max_probes: u32) -> Self {
        Self {
            store,
            max_probes: max_probes.max(1),
        }
    }

    /// Returns a slug for `name`, unique within `scope`.
    ///
    /// Tries the normalized name, then `-1`, `-2`, … up to `max_probes`
    /// suffixes, then gives up probing and returns
    /// `{base}-{fallback_id}-{unix_millis}`. A name that normalizes to
    /// nothing uses `{category|product}-{fallback_id}` as its base.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a probe fails.
    pub async fn allocate(
        &self,
        scope: SlugScope,
        name: &str,
        fallback_id: &str,
    ) -> Result<String, StoreError> {
        let base = base_slug(scope, name, fallback_id);

        if !self.store.slug_exists(scope, &base).await? {
            return Ok(base);
        }

        for n in 1..=self.max_probes {
            let candidate = format!("{base}-{n}");
            if !self.store.slug_exists(scope, &candidate).await? {
                return Ok(candidate);
            }
        }

        let fallback = format!(
            "{base}-{}-{}",
            slugify(fallback_id),
            chrono::Utc::now().timestamp_millis()
        );
        tracing::warn!(
            scope = ?scope,
            base = %base,
            max_probes = self.max_probes,
            slug = %fallback,
            "slug probes exhausted; using timestamp fallback"
        );
        Ok(fallback)
    }
}

fn base_slug(scope: SlugScope, name: &str, fallback_id: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        slugify(&format!("{}-{fallback_id}", scope.fallback_prefix()))
    } else {
        slug
    }
}
