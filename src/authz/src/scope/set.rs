//! Normalized scope sets and their algebra

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pattern::{matches, more_specific, overlap};

/// A normalized set of scopes
///
/// No element is covered by a different, broader element of the same set.
/// Elements are kept sorted so two sets denoting the same scopes compare,
/// hash and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct ScopeSet {
    scopes: Vec<String>,
}

impl ScopeSet {
    /// Creates an empty scope set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a normalized set from any collection of scopes
    pub fn from_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: normalize(scopes.into_iter().map(Into::into).collect()),
        }
    }

    /// Number of scopes in the set
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if the set holds no scopes
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Iterates the scopes in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    /// Returns the scopes as a sorted slice
    pub fn as_slice(&self) -> &[String] {
        &self.scopes
    }

    /// Returns true if this exact scope string is an element
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.binary_search_by(|s| s.as_str().cmp(scope)).is_ok()
    }

    /// Returns true if some element covers `scope`
    pub fn covers(&self, scope: &str) -> bool {
        self.scopes.iter().any(|granted| matches(granted, scope))
    }

    /// Normalized union of two sets
    pub fn union(&self, other: &ScopeSet) -> ScopeSet {
        let mut all = Vec::with_capacity(self.len() + other.len());
        all.extend(self.scopes.iter().cloned());
        all.extend(other.scopes.iter().cloned());
        ScopeSet {
            scopes: normalize(all),
        }
    }

    /// Normalized intersection of two sets
    ///
    /// Every overlapping pair contributes its narrower member.
    pub fn intersection(&self, other: &ScopeSet) -> ScopeSet {
        let mut result = Vec::new();
        for a in &self.scopes {
            for b in &other.scopes {
                if overlap(a, b) {
                    result.push(more_specific(a, b).to_string());
                }
            }
        }
        ScopeSet {
            scopes: normalize(result),
        }
    }

    /// Consumes the set, returning its sorted scopes
    pub fn into_vec(self) -> Vec<String> {
        self.scopes
    }
}

impl From<Vec<String>> for ScopeSet {
    fn from(scopes: Vec<String>) -> Self {
        Self {
            scopes: normalize(scopes),
        }
    }
}

impl From<ScopeSet> for Vec<String> {
    fn from(set: ScopeSet) -> Self {
        set.scopes
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_scopes(iter)
    }
}

impl<'a> IntoIterator for &'a ScopeSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.iter()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.scopes.join(", "))
    }
}

/// Drops every scope covered by a different element and removes repeats
///
/// The result is sorted.
pub fn normalize(mut scopes: Vec<String>) -> Vec<String> {
    scopes.sort();
    scopes.dedup();

    let kept: Vec<bool> = scopes
        .iter()
        .map(|s| {
            !scopes
                .iter()
                .any(|p| p != s && matches(p, s))
        })
        .collect();

    scopes
        .into_iter()
        .zip(kept)
        .filter_map(|(s, keep)| keep.then_some(s))
        .collect()
}

/// Normalized union of two scope lists
///
/// # Examples
///
/// ```
/// use taskauth_authz::scope::union;
///
/// let a = vec!["abc".to_string(), "a*".to_string(), "d*".to_string()];
/// assert_eq!(union(&a, &[]), vec!["a*", "d*"]);
/// ```
pub fn union(a: &[String], b: &[String]) -> Vec<String> {
    ScopeSet::from_scopes(a.iter().chain(b.iter()).cloned()).into_vec()
}

/// Normalized intersection of two scope lists
///
/// # Examples
///
/// ```
/// use taskauth_authz::scope::intersection;
///
/// let a = vec!["bar:*".to_string()];
/// let b = vec!["foo:x".to_string(), "bar:x".to_string()];
/// assert_eq!(intersection(&a, &b), vec!["bar:x"]);
/// ```
pub fn intersection(a: &[String], b: &[String]) -> Vec<String> {
    let a = ScopeSet::from_scopes(a.iter().cloned());
    let b = ScopeSet::from_scopes(b.iter().cloned());
    a.intersection(&b).into_vec()
}
