//! The connection path data model (`spec.md` §3): a `Connection` routes a
//! `Request` through an ordered `Path` of `PathSegment`s, one per
//! participating handler.

use std::collections::BTreeMap;
use std::time::SystemTime;

use uuid::Uuid;

use crate::error::{NsmError, Result};

/// Unique identifier of a path segment or a connection. The connection id
/// and `PathSegments[0].Id` are the same value — the path's first segment
/// *is* the connection's identity (`spec.md` §3: "The Path is the
/// authoritative identity of a connection across hops").
pub type SegmentId = Uuid;

/// One hop's claim on a connection: the handler that owns it, its stable
/// identity, a bearer token, and that token's absolute expiry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub id: SegmentId,
    pub token: String,
    pub expires: SystemTime,
}

impl PathSegment {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        self.expires <= now
    }
}

/// The ordered hop list plus a cursor naming which segment the current
/// handler occupies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<PathSegment>,
    index: usize,
}

impl Path {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            index: 0,
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn current(&self) -> Option<&PathSegment> {
        self.segments.get(self.index)
    }

    /// Connection identity per `spec.md` §3: the first segment's id.
    pub fn connection_id(&self) -> Option<SegmentId> {
        self.segments.first().map(|s| s.id)
    }

    /// Implements the forward-pass rule of `spec.md` §4.C for a handler at
    /// position `k` named `handler_name`:
    ///
    /// 1. If no segment exists at `k`, append a fresh one owned by this
    ///    handler and set the cursor to `k`.
    /// 2. If a segment exists at `k`, its `name` must match `handler_name`
    ///    (refresh case) — otherwise this is [`NsmError::path_mismatch`].
    /// 3. The cursor is set to `k` either way.
    pub fn advance(&mut self, index: usize, handler_name: &str, token: String, expires: SystemTime) -> Result<()> {
        if index > self.segments.len() {
            return Err(NsmError::internal(format!(
                "path advance at index {index} skips over {} missing segments",
                index - self.segments.len()
            )));
        }
        if index == self.segments.len() {
            self.segments.push(PathSegment {
                name: handler_name.to_string(),
                id: Uuid::new_v4(),
                token,
                expires,
            });
        } else {
            let existing = &mut self.segments[index];
            if existing.name != handler_name {
                return Err(NsmError::path_mismatch(handler_name, &existing.name));
            }
            // Refresh: the id is stable, only token/expires may change.
            existing.token = token;
            existing.expires = expires;
        }
        self.index = index;
        Ok(())
    }

    pub fn validate_invariants(&self) -> Result<()> {
        if self.index >= self.segments.len() {
            return Err(NsmError::new(
                crate::error::ErrorCategory::Internal,
                crate::error::codes::PATH_INDEX_OUT_OF_RANGE,
                format!("index {} out of range for {} segments", self.index, self.segments.len()),
            ));
        }
        Ok(())
    }

    /// `spec.md` §7: `TokenExpired` if *any* segment's token has expired.
    pub fn first_expired_segment(&self, now: SystemTime) -> Option<&PathSegment> {
        self.segments.iter().find(|s| s.is_expired(now))
    }
}

/// A kernel/vpp/memif/etc mechanism preference, keyed by type so repeated
/// identical Requests don't accumulate duplicates (S6, `spec.md` §8).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mechanism {
    pub mechanism_type: String,
    pub parameters: BTreeMap<String, String>,
}

/// The routed connection carried through every Request/Close chain call.
#[derive(Clone, Debug, Default)]
pub struct Connection {
    pub path: Path,
    pub context: BTreeMap<String, String>,
    pub network_service: String,
    pub network_service_endpoint_name: String,
    pub mechanism_preferences: Vec<Mechanism>,
    pub mechanism: Option<Mechanism>,
}

impl Connection {
    pub fn new(network_service: impl Into<String>) -> Self {
        Self {
            path: Path::new(),
            context: BTreeMap::new(),
            network_service: network_service.into(),
            network_service_endpoint_name: String::new(),
            mechanism_preferences: Vec::new(),
            mechanism: None,
        }
    }

    pub fn id(&self) -> Option<SegmentId> {
        self.path.connection_id()
    }

    /// Appends `mechanism` to preferences unless an entry of the same
    /// `mechanism_type` is already present — S6's idempotence requirement.
    pub fn add_mechanism_preference(&mut self, mechanism: Mechanism) {
        if !self
            .mechanism_preferences
            .iter()
            .any(|m| m.mechanism_type == mechanism.mechanism_type)
        {
            self.mechanism_preferences.push(mechanism);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn far_future() -> SystemTime {
        SystemTime::now() + Duration::from_secs(3600)
    }

    #[test]
    fn advance_appends_fresh_segment_at_new_index() {
        let mut path = Path::new();
        path.advance(0, "nsmgr-1", "tok".into(), far_future()).unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path.index(), 0);
        assert_eq!(path.current().unwrap().name, "nsmgr-1");
    }

    #[test]
    fn advance_on_refresh_keeps_id_stable() {
        let mut path = Path::new();
        path.advance(0, "nsmgr-1", "tok1".into(), far_future()).unwrap();
        let id = path.current().unwrap().id;
        path.advance(0, "nsmgr-1", "tok2".into(), far_future()).unwrap();
        assert_eq!(path.current().unwrap().id, id);
        assert_eq!(path.current().unwrap().token, "tok2");
    }

    #[test]
    fn advance_rejects_name_mismatch() {
        let mut path = Path::new();
        path.advance(0, "nsmgr-1", "tok".into(), far_future()).unwrap();
        let err = path.advance(0, "nsmgr-2", "tok".into(), far_future()).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::InvalidArgument);
    }

    #[test]
    fn mechanism_preference_is_idempotent() {
        let mut conn = Connection::new("my-service");
        for _ in 0..10 {
            conn.add_mechanism_preference(Mechanism {
                mechanism_type: "kernel".into(),
                parameters: BTreeMap::new(),
            });
        }
        assert_eq!(conn.mechanism_preferences.len(), 1);
    }

    #[test]
    fn first_expired_segment_detects_past_exp() {
        let mut path = Path::new();
        path.advance(0, "nsmgr-1", "tok".into(), SystemTime::now() - Duration::from_secs(1)).unwrap();
        assert!(path.first_expired_segment(SystemTime::now()).is_some());
    }
}
