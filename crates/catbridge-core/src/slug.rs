//! URL-safe slug normalization.
//!
//! Only the pure string transform lives here; uniqueness probing against the
//! store is done by the sync crate's `SlugAllocator`.

use std::sync::OnceLock;

use regex::Regex;

/// Which table a slug must be unique in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlugScope {
    Category,
    Product,
}

impl SlugScope {
    /// Prefix used when a name normalizes to an empty slug.
    #[must_use]
    pub fn fallback_prefix(self) -> &'static str {
        match self {
            SlugScope::Category => "category",
            SlugScope::Product => "product",
        }
    }
}

impl std::fmt::Display for SlugScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlugScope::Category => write!(f, "category"),
            SlugScope::Product => write!(f, "product"),
        }
    }
}

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\s_-]").expect("valid slug regex"))
}

fn separator_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_-]+").expect("valid separator regex"))
}

/// Normalizes a display name into a slug base.
///
/// Lowercases, drops everything except ASCII alphanumerics, whitespace,
/// underscores and hyphens, collapses separator runs into a single hyphen
/// and trims hyphens from both ends. May return an empty string.
#[must_use]
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = disallowed_chars().replace_all(&lowered, "");
    let collapsed = separator_runs().replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}
