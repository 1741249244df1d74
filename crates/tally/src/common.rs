//! 📦 Common data structures, the building blocks of tally.
//!
//! 🎬 COLD OPEN. INT. OBJECT STORE. 3:47 AM.
//! A bucket sits in us-east-1, holding four million objects nobody has looked at
//! since the intern left. Somebody asks "how big is it?" and a pipeline wakes up.
//!
//! These are the humble structs that ferry keys and sizes from the listing call
//! to the workers. They don't ask questions. They carry the data. 🦆

use std::fmt;

/// 🗝️ The opaque name of a stored object. Unique within a bucket, immutable once listed.
///
/// A newtype over `String` so a key can never be confused with a bucket name,
/// a prefix, or the contents of your clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ObjectKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// 📄 One listing entry: a key and how many bytes the backend *claims* it holds.
///
/// Transient by nature. It lives just long enough for the lister to publish the
/// key and add the size to the running total, then it's gone. Like a mayfly,
/// but with a `u64`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub key: ObjectKey,
    pub size: u64,
}

impl ObjectRecord {
    pub fn new(key: impl Into<ObjectKey>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// 📚 A page of listing results, in the order the backend returned them.
pub type Page = Vec<ObjectRecord>;
