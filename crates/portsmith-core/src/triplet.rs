//! Interned target-platform identifier.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::AHashSet;

static INTERNER: OnceLock<Mutex<AHashSet<Arc<str>>>> = OnceLock::new();

fn interner() -> &'static Mutex<AHashSet<Arc<str>>> {
    INTERNER.get_or_init(|| Mutex::new(AHashSet::default()))
}

/// A target-platform identifier such as `x64-linux` or `arm64-osx-dynamic`.
///
/// Two `Triplet`s naming the same text always compare equal and hash
/// identically; the canonical string is interned once per process so that
/// repeated lookups (one per feature edge evaluated during planning) don't
/// keep re-allocating.
#[derive(Clone, Eq, Serialize, Deserialize)]
pub struct Triplet(Arc<str>);

impl Triplet {
    /// Intern `name`, returning a cheap-to-clone handle to its canonical form.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        {
            let guard = interner().lock();
            if let Some(existing) = guard.get(name) {
                return Self(existing.clone());
            }
        }
        let arc: Arc<str> = Arc::from(name);
        let mut guard = interner().lock();
        // Re-check: another thread may have interned the same string while
        // we were allocating `arc` outside the lock.
        if let Some(existing) = guard.get(name) {
            return Self(existing.clone());
        }
        guard.insert(arc.clone());
        Self(arc)
    }

    /// The canonical string form, e.g. `x64-linux`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The host triplet `portsmith` is itself running under (used to evaluate
    /// `host = true` dependencies).
    #[must_use]
    pub fn detect_host() -> Self {
        let arch = if cfg!(target_arch = "x86_64") {
            "x64"
        } else if cfg!(target_arch = "aarch64") {
            "arm64"
        } else if cfg!(target_arch = "x86") {
            "x86"
        } else {
            "unknown"
        };
        let os = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "macos") {
            "osx"
        } else {
            "linux"
        };
        Self::new(format!("{arch}-{os}"))
    }
}

impl PartialEq for Triplet {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Hash for Triplet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for Triplet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Triplet {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Debug for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Triplet({})", self.0)
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Triplet {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Triplet {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Triplet;

    #[test]
    fn interning_deduplicates_equal_strings() {
        let a = Triplet::new("x64-linux");
        let b = Triplet::new("x64-linux".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = Triplet::new("arm64-osx");
        let b = Triplet::new("x64-linux");
        assert!(a < b);
    }
}
