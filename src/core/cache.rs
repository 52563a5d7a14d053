//! Bounded parse cache
//!
//! The date-read phase already parses every submission once; caching the
//! documents lets the export phase reuse them instead of parsing twice.
//! Entries are consumed on lookup and the map is capacity-bounded, so the
//! cache never holds more than a window of documents and a miss only costs
//! a re-parse.

use crate::core::xml::XmlElement;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Path → parsed document association with a hard capacity bound.
#[derive(Debug)]
pub struct ParseCache {
    entries: Mutex<HashMap<PathBuf, XmlElement>>,
    capacity: usize,
}

impl ParseCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Stores a document unless the cache is full. Eviction is simply
    /// refusing new entries: callers must tolerate misses anyway.
    pub fn put(&self, path: &Path, document: XmlElement) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.len() < self.capacity {
            entries.insert(path.to_path_buf(), document);
        }
    }

    /// Removes and returns the cached document for `path`, if present.
    pub fn take(&self, path: &Path) -> Option<XmlElement> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        // Enough for the date-read window of a large form without pinning
        // tens of thousands of documents at once.
        Self::with_capacity(4096)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::xml::parse_str;

    #[test]
    fn test_take_consumes_entry() {
        let cache = ParseCache::with_capacity(8);
        let doc = parse_str("<data/>").unwrap();
        cache.put(Path::new("/a/submission.xml"), doc);
        assert_eq!(cache.len(), 1);
        assert!(cache.take(Path::new("/a/submission.xml")).is_some());
        assert!(cache.take(Path::new("/a/submission.xml")).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound_refuses_overflow() {
        let cache = ParseCache::with_capacity(1);
        cache.put(Path::new("/a"), parse_str("<a/>").unwrap());
        cache.put(Path::new("/b"), parse_str("<b/>").unwrap());
        assert_eq!(cache.len(), 1);
        // The dropped entry is a harmless miss
        assert!(cache.take(Path::new("/b")).is_none());
        assert!(cache.take(Path::new("/a")).is_some());
    }
}
