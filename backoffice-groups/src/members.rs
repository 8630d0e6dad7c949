//! Group member sets
//!
//! Members are principal identifiers kept as an ordered set. Storage keeps
//! them as a single comma-delimited column; [`MemberSet::encode`] and
//! [`MemberSet::decode`] are the only way in and out of that form, so
//! membership is always a whole-identifier comparison.

use serde::{Deserialize, Serialize};

const DELIMITER: char = ',';
const ESCAPE: char = '\\';

/// Ordered set of principal identifiers.
///
/// # Examples
///
/// ```
/// use backoffice_groups::MemberSet;
///
/// let members = MemberSet::decode("12,5");
/// assert!(members.contains("5"));
/// assert!(!members.contains("1"));
/// assert_eq!(members.encode(), "12,5");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberSet {
    ids: Vec<String>,
}

impl MemberSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if id.is_empty() || self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove a member. Returns `false` if it was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|m| m != id);
        before != self.ids.len()
    }

    /// Whole-identifier membership test.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|m| m == id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Encode to the stored column form.
    ///
    /// `,` and `\` inside an identifier are escaped with `\`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, id) in self.ids.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }
            for c in id.chars() {
                if c == DELIMITER || c == ESCAPE {
                    out.push(ESCAPE);
                }
                out.push(c);
            }
        }
        out
    }

    /// Decode the stored column form.
    ///
    /// Empty segments are dropped, so legacy values with a leading comma
    /// (`",5"`) decode to `{5}`.
    pub fn decode(encoded: &str) -> Self {
        let mut set = Self::new();
        let mut current = String::new();
        let mut chars = encoded.chars();

        while let Some(c) = chars.next() {
            match c {
                ESCAPE => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                DELIMITER => {
                    set.insert(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }
        set.insert(current);
        set
    }
}

impl<S: Into<String>> FromIterator<S> for MemberSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}
