//! Ordered capture list keyed by request id
//!
//! Newest entries sit at the front. Once an entry is in the list its
//! position relative to the others never changes: streamed re-emissions of
//! a known id update the entry in place, and the snapshot merge only adds.

use gatewatch_common::CapturedRequest;

/// The console's view of the backend's captured requests
#[derive(Debug, Default)]
pub struct CaptureList {
    entries: Vec<CapturedRequest>,
}

impl CaptureList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one streamed capture: a known id is replaced in place, a new
    /// id is prepended. Returns true when the entry was new.
    pub fn upsert(&mut self, request: CapturedRequest) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == request.id) {
            Some(existing) => {
                *existing = request;
                false
            }
            None => {
                self.entries.insert(0, request);
                true
            }
        }
    }

    /// Merge the snapshot fetch: known ids update in place, unknown ids are
    /// appended in snapshot order. Entries that arrived on the stream before
    /// the snapshot completed keep their position at the front.
    pub fn merge_snapshot(&mut self, snapshot: Vec<CapturedRequest>) {
        for request in snapshot {
            match self.entries.iter_mut().find(|entry| entry.id == request.id) {
                Some(existing) => *existing = request,
                None => self.entries.push(request),
            }
        }
    }

    /// Look up an entry by exact id
    pub fn get(&self, id: &str) -> Option<&CapturedRequest> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Look up an entry by id or id prefix
    pub fn find(&self, id: &str) -> Option<&CapturedRequest> {
        self.entries
            .iter()
            .find(|entry| entry.id == id || entry.id.starts_with(id))
    }

    pub fn entries(&self) -> &[CapturedRequest] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, url: &str) -> CapturedRequest {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "method": "GET",
            "url": url,
        }))
        .unwrap()
    }

    #[test]
    fn test_streamed_entries_prepend_in_receipt_order() {
        let mut list = CaptureList::new();
        list.merge_snapshot(vec![request("old", "/old")]);

        assert!(list.upsert(request("a", "/a")));
        assert!(list.upsert(request("b", "/b")));

        let ids: Vec<&str> = list.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "old"]);
    }

    #[test]
    fn test_upsert_known_id_keeps_position() {
        let mut list = CaptureList::new();
        list.upsert(request("a", "/a"));
        list.upsert(request("b", "/b"));

        assert!(!list.upsert(request("a", "/a-rescored")));

        let ids: Vec<&str> = list.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(list.get("a").unwrap().url, "/a-rescored");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_snapshot_merge_keeps_streamed_entries() {
        let mut list = CaptureList::new();
        // the stream won the race: two entries arrived before the snapshot
        list.upsert(request("s1", "/s1"));
        list.upsert(request("s2", "/s2"));

        list.merge_snapshot(vec![request("s1", "/s1-snap"), request("k", "/k")]);

        let ids: Vec<&str> = list.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["s2", "s1", "k"]);
        assert_eq!(list.get("s1").unwrap().url, "/s1-snap");
    }

    #[test]
    fn test_find_accepts_id_prefix() {
        let mut list = CaptureList::new();
        list.upsert(request("abc123", "/x"));

        assert!(list.find("abc").is_some());
        assert!(list.find("abc123").is_some());
        assert!(list.find("zzz").is_none());
    }
}
