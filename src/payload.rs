//! # Payload decoding
//!
//! The feed double-encodes its statistics: the HTTP body is a JSON envelope
//! whose `data` field is a *string*, and that string is itself a JSON
//! document.
//!
//! ```text
//!     {"code": 10000, "data": "{\"lastUpdateTime\":\"...\",\"areaTree\":[...]}"}
//!      └──────────── stage 1: envelope ─┘ └──────── stage 2: payload ───────┘
//! ```
//!
//! Both stages must succeed; each has its own [`ParseError`] variant.

use crate::area::{null_as_default, AreaRecord, AreaTree};
use crate::error::ParseError;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct Envelope {
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    last_update_time: String,

    #[serde(default, deserialize_with = "null_as_default")]
    area_tree: Vec<AreaRecord>,
}

/// A decoded statistics payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// The area hierarchy.
    pub tree: AreaTree,

    /// Update time of the payload as a whole; empty when the feed omits it.
    pub last_update_time: String,
}

/// Decodes raw response bytes into a [`Payload`].
///
/// # Errors
///
/// - [`ParseError::Envelope`] if the body is not JSON or `data` is missing or
///   not a string,
/// - [`ParseError::Payload`] if the `data` string is not a valid payload,
/// - [`ParseError::EmptyAreaTree`] if `areaTree` is missing or empty.
///
/// ```rust
/// use epistat::parse_payload;
///
/// let body = br#"{"data": "{\"lastUpdateTime\":\"2022-03-01\",\"areaTree\":[{\"name\":\"China\"}]}"}"#;
/// let payload = parse_payload(body).unwrap();
///
/// assert_eq!(payload.tree.root().name, "China");
/// assert_eq!(payload.last_update_time, "2022-03-01");
/// ```
pub fn parse_payload(raw: &[u8]) -> Result<Payload, ParseError> {
    let envelope: Envelope = serde_json::from_slice(raw).map_err(|err| {
        warn!("Rejected payload envelope ({} bytes): {}", raw.len(), err);
        ParseError::Envelope(err)
    })?;

    let inner: RawPayload = serde_json::from_str(&envelope.data).map_err(|err| {
        warn!("Rejected inner statistics document: {}", err);
        ParseError::Payload(err)
    })?;

    let tree = AreaTree::new(inner.area_tree).map_err(|err| {
        warn!("Statistics payload has no areas");
        err
    })?;

    debug!(
        "Parsed statistics payload: {} root area(s), updated {:?}",
        tree.roots().len(),
        inner.last_update_time
    );

    Ok(Payload {
        tree,
        last_update_time: inner.last_update_time,
    })
}
