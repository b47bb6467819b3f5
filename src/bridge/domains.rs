//! Ordered set of domain names.

// ============================================================================
// DomainSet
// ============================================================================

/// Insertion-ordered set of domain names.
///
/// Uniqueness is enforced by [`DomainSet::insert`]; there is no way to add a
/// duplicate entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSet {
    domains: Vec<String>,
}

impl DomainSet {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            domains: Vec::new(),
        }
    }

    /// Adds `domain`. Returns `false` if it was already present.
    pub fn insert(&mut self, domain: &str) -> bool {
        if self.contains(domain) {
            return false;
        }
        self.domains.push(domain.to_owned());
        true
    }

    /// Removes exactly the entry equal to `domain`. Returns `false` if absent.
    pub fn remove(&mut self, domain: &str) -> bool {
        match self.domains.iter().position(|d| d == domain) {
            Some(index) => {
                self.domains.remove(index);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `domain` is present.
    #[inline]
    #[must_use]
    pub fn contains(&self, domain: &str) -> bool {
        self.domains.iter().any(|d| d == domain)
    }

    /// Iterates in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(String::as_str)
    }

    /// Number of domains.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns `true` if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Copies the domains out in insertion order.
    #[inline]
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.domains.clone()
    }
}

impl<S: AsRef<str>> FromIterator<S> for DomainSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for domain in iter {
            set.insert(domain.as_ref());
        }
        set
    }
}

// ============================================================================
// Tests
// ============================================================================
