//! # Query pipeline
//!
//! ```text
//!     raw bytes ──► parse_payload ──► AreaTree ──► search first root ──► QueryResult
//!                        │
//!                        └──► ParseError (no search attempted)
//! ```
//!
//! The pipeline does not fetch, throttle, format or deliver anything. Each
//! call builds its own tree and drops it before returning, so a single
//! pipeline can be shared freely between threads.

use crate::area::{take_area, AreaRecord};
use crate::error::ParseError;
use crate::payload::parse_payload;
use serde::Serialize;
use tracing::debug;

/// Outcome of a successful parse: the located area, if any, and the
/// payload-level update time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    /// The matching area, `None` when the name is not in the tree.
    pub area: Option<AreaRecord>,

    /// Update time of the whole payload; empty when the feed omits it.
    pub last_update_time: String,
}

impl QueryResult {
    /// `true` when an area matched.
    #[inline]
    pub fn is_found(&self) -> bool {
        self.area.is_some()
    }
}

/// Parses a statistics payload and looks up one area by name.
///
/// ```rust
/// use epistat::QueryPipeline;
///
/// let body = br#"{"data":"{\"areaTree\":[{\"name\":\"China\",\"children\":[{\"name\":\"Hubei\"}]}]}"}"#;
/// let pipeline = QueryPipeline::new();
///
/// let result = pipeline.query(body, "Hubei").unwrap();
/// assert_eq!(result.area.unwrap().name, "Hubei");
///
/// let result = pipeline.query(body, "Atlantis").unwrap();
/// assert!(!result.is_found());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPipeline;

impl QueryPipeline {
    /// Creates a pipeline.
    pub fn new() -> Self {
        Self
    }

    /// Looks up `city` in the payload carried by `raw`.
    ///
    /// The search starts at the first root-level area. A missing city is a
    /// successful result with `area == None`.
    ///
    /// # Errors
    ///
    /// Any [`ParseError`] from decoding `raw`.
    pub fn query(&self, raw: &[u8], city: &str) -> Result<QueryResult, ParseError> {
        let payload = parse_payload(raw)?;
        let area = take_area(payload.tree.into_root(), city);

        match &area {
            Some(found) => debug!(
                "Located {:?} ({} sub-areas)",
                found.name,
                found.children.len()
            ),
            None => debug!("No area named {:?} in payload", city),
        }

        Ok(QueryResult {
            area,
            last_update_time: payload.last_update_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn body() -> Vec<u8> {
        let inner = json!({
            "lastUpdateTime": "2022-03-01 09:00:00",
            "areaTree": [
                {
                    "name": "China",
                    "lastUpdateTime": "2022-03-01 08:00:00",
                    "children": [
                        { "name": "Hubei", "total": { "confirm": 68135 },
                          "children": [{ "name": "Wuhan", "total": { "confirm": 50006 } }] },
                        { "name": "Beijing", "total": { "confirm": 1700 } }
                    ]
                },
                { "name": "Italy" }
            ]
        });
        json!({ "data": inner.to_string() }).to_string().into_bytes()
    }

    #[test]
    fn test_found() {
        let result = QueryPipeline::new().query(&body(), "Wuhan").unwrap();
        assert!(result.is_found());
        assert_eq!(result.area.unwrap().total.confirmed, 50006);
        assert_eq!(result.last_update_time, "2022-03-01 09:00:00");
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let result = QueryPipeline::new().query(&body(), "Shanghai").unwrap();
        assert!(!result.is_found());
        assert_eq!(result.last_update_time, "2022-03-01 09:00:00");
    }

    #[test]
    fn test_only_first_root_is_searched() {
        let result = QueryPipeline::new().query(&body(), "Italy").unwrap();
        assert!(result.area.is_none());
    }

    #[test]
    fn test_found_area_keeps_its_children() {
        let area = QueryPipeline::new().query(&body(), "Hubei").unwrap().area.unwrap();
        assert_eq!(area.children.len(), 1);
        assert_eq!(area.children[0].name, "Wuhan");
    }

    #[test]
    fn test_parse_failure_propagates() {
        let err = QueryPipeline::new().query(b"not json", "Hubei").unwrap_err();
        assert!(matches!(err, ParseError::Envelope(_)));
    }

    #[test]
    fn test_shared_between_threads() {
        let pipeline = Arc::new(QueryPipeline::new());
        let body = Arc::new(body());

        let handles: Vec<_> = ["Wuhan", "Beijing", "China", "Nowhere"]
            .into_iter()
            .map(|city| {
                let pipeline = pipeline.clone();
                let body = body.clone();
                thread::spawn(move || pipeline.query(&body, city).unwrap().is_found())
            })
            .collect();

        let found: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(found, [true, true, true, false]);
    }
}
