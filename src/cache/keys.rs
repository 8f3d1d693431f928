//! Cache key definitions.

use std::fmt;

/// Well-known cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Heavy content shown on the landing page: recent comments and gallery.
    Landing,
}

impl CacheKey {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::Landing => "landing",
        }
    }

    /// Storage key with the deployment prefix applied.
    pub fn storage_key(self, prefix: &str) -> String {
        if prefix.is_empty() {
            return self.as_str().to_string();
        }
        format!("{prefix}:{}", self.as_str())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
