//! History collaborator.

use router_core::Location;
use thiserror::Error;

/// Errors raised when moving through history.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Already at the first entry.
    #[error("no previous history entry")]
    AtStart,

    /// Already at the last entry.
    #[error("no next history entry")]
    AtEnd,
}

/// Source of locations and sink for navigation commands.
///
/// The router never writes to a URL transport itself; it records
/// navigations here.
pub trait History: Send {
    /// The current location.
    fn location(&self) -> Location;

    /// Add a new entry after the current one.
    fn push(&mut self, location: Location);

    /// Replace the current entry.
    fn replace(&mut self, location: Location);

    /// Move to the previous entry.
    fn back(&mut self) -> Result<Location, HistoryError>;

    /// Move to the next entry.
    fn forward(&mut self) -> Result<Location, HistoryError>;
}

/// In-memory history for server rendering and tests.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Location>,
    index: usize,
}

impl MemoryHistory {
    /// Create a history with a single entry.
    pub fn new(href: &str) -> Self {
        Self {
            entries: vec![Location::parse(href)],
            index: 0,
        }
    }

    /// Create a history from several entries, positioned at the last one.
    pub fn with_entries(hrefs: &[&str]) -> Self {
        let mut entries: Vec<Location> = hrefs.iter().map(|href| Location::parse(href)).collect();
        if entries.is_empty() {
            entries.push(Location::parse("/"));
        }
        let index = entries.len() - 1;
        Self { entries, index }
    }

    /// Position of the current entry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A history always has an entry.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        self.entries[self.index].clone()
    }

    fn push(&mut self, location: Location) {
        self.entries.truncate(self.index + 1);
        self.entries.push(location);
        self.index = self.entries.len() - 1;
    }

    fn replace(&mut self, location: Location) {
        self.entries[self.index] = location;
    }

    fn back(&mut self) -> Result<Location, HistoryError> {
        if self.index == 0 {
            return Err(HistoryError::AtStart);
        }
        self.index -= 1;
        Ok(self.location())
    }

    fn forward(&mut self) -> Result<Location, HistoryError> {
        if self.index + 1 >= self.entries.len() {
            return Err(HistoryError::AtEnd);
        }
        self.index += 1;
        Ok(self.location())
    }
}
