//! Book records produced by the host's cataloguing service.
//!
//! Folder scanning and tag extraction live outside the core. The core only
//! needs a stable identifier to key progress on, plus a few display fields
//! carried through to observers and logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a book in the host catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Wrap a catalogue identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A catalogued audiobook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Catalogue identifier; progress is keyed on it.
    pub id: BookId,
    /// Display title.
    pub title: String,
    /// Author, when the tags carry one.
    #[serde(default)]
    pub author: Option<String>,
    /// Narrator, when the tags carry one.
    #[serde(default)]
    pub narrator: Option<String>,
    /// File name inside the chosen folder.
    pub file_name: String,
    /// Duration reported by the metadata extractor, in seconds.
    #[serde(default)]
    pub duration_hint: Option<f64>,
}

impl Book {
    /// Create a book record with only the required fields set.
    pub fn new(id: impl Into<BookId>, title: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: None,
            narrator: None,
            file_name: file_name.into(),
            duration_hint: None,
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the narrator.
    pub fn with_narrator(mut self, narrator: impl Into<String>) -> Self {
        self.narrator = Some(narrator.into());
        self
    }

    /// Set the duration reported by metadata extraction.
    pub fn with_duration_hint(mut self, seconds: f64) -> Self {
        self.duration_hint = Some(seconds);
        self
    }
}
