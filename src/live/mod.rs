//! Live-state persistence.
//!
//! [`LiveState`] is the flat form of the aggregate tables, encoded with BCS
//! in this exact field order:
//!
//! ```text
//! stable_aggregates   ULEB128 count, then per entry: ULEB128 len, len × i32 (LE)
//! local_aggregates    same layout
//! stable_identifiers  ULEB128 count, then count × i32 (LE)
//! ```
//!
//! The payload has no header. Versioning and graph identity live in the
//! [`LiveStateFile`] envelope that wraps it on disk.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::LIVE_STATE_VERSION;
use crate::core::AggError;
use crate::graph::PackageGraph;
use crate::utils::fs::atomic_write;

/// Persisted aggregate tables.
///
/// Entries are listed in handle order, so reading them back in order
/// reproduces the same handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveState {
    /// Member indices of every stable aggregate.
    pub stable_aggregates: Vec<Vec<i32>>,
    /// Member indices of every local aggregate.
    pub local_aggregates: Vec<Vec<i32>>,
    /// Stable handles referenced from local-dependent packages.
    pub stable_identifiers: Vec<i32>,
}

impl LiveState {
    /// Encode the payload.
    pub fn encode(&self) -> Result<Vec<u8>, AggError> {
        bcs::to_bytes(self).map_err(|e| AggError::corrupt(format!("failed to encode live state: {e}")))
    }

    /// Decode a payload produced by [`LiveState::encode`].
    ///
    /// The input must be consumed exactly. Truncated input, trailing bytes
    /// and identifiers pointing past the stable table are all reported as
    /// [`AggError::CorruptLiveCache`].
    pub fn decode(bytes: &[u8]) -> Result<Self, AggError> {
        let state: Self = bcs::from_bytes(bytes)
            .map_err(|e| AggError::corrupt(format!("failed to decode live state: {e}")))?;

        let stable_count = state.stable_aggregates.len();
        if let Some(bad) = state
            .stable_identifiers
            .iter()
            .find(|&&id| usize::try_from(id).map_or(true, |id| id >= stable_count))
        {
            return Err(AggError::corrupt(format!(
                "stable identifier {bad} is outside the {stable_count} stable aggregates"
            )));
        }
        Ok(state)
    }
}

/// On-disk envelope around an encoded [`LiveState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStateFile {
    /// Envelope format version, see [`LIVE_STATE_VERSION`].
    pub version: u32,
    /// [`PackageGraph::stable_fingerprint`] of the graph the state was built from.
    pub fingerprint: String,
    /// Encoded [`LiveState`].
    pub payload: Vec<u8>,
}

impl LiveStateFile {
    /// Wrap `state` for the graph it was built from.
    pub fn new(graph: &PackageGraph, state: &LiveState) -> Result<Self, AggError> {
        Ok(Self {
            version: LIVE_STATE_VERSION,
            fingerprint: graph.stable_fingerprint(),
            payload: state.encode()?,
        })
    }

    /// Serialize the envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AggError> {
        bcs::to_bytes(self).map_err(|e| AggError::corrupt(format!("failed to encode live state file: {e}")))
    }

    /// Parse an envelope, rejecting other versions.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AggError> {
        let file: Self = bcs::from_bytes(bytes)
            .map_err(|e| AggError::corrupt(format!("failed to decode live state file: {e}")))?;
        if file.version != LIVE_STATE_VERSION {
            return Err(AggError::corrupt(format!(
                "live state version {} is not supported (expected {LIVE_STATE_VERSION})",
                file.version
            )));
        }
        Ok(file)
    }

    /// Unwrap the state, checking it was built from a graph with the same
    /// stable part as `graph`.
    pub fn into_state(self, graph: &PackageGraph) -> Result<LiveState, AggError> {
        let expected = graph.stable_fingerprint();
        if self.fingerprint != expected {
            return Err(AggError::corrupt(format!(
                "live state was built for graph {} but the current graph is {expected}",
                self.fingerprint
            )));
        }
        LiveState::decode(&self.payload)
    }

    /// Write the envelope atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        atomic_write(path, &bytes)
            .with_context(|| format!("Failed to write live state: {}", path.display()))?;
        tracing::debug!("Wrote {} bytes of live state to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Read an envelope. `Ok(None)` when the file does not exist.
    ///
    /// I/O failures are returned as-is; malformed content is a
    /// [`AggError::CorruptLiveCache`].
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No live state at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read live state: {}", path.display()));
            }
        };
        Ok(Some(Self::from_bytes(&bytes)?))
    }
}

/// Load the live state at `path` for `graph`.
///
/// Any problem with the file other than its absence is logged and treated
/// as no state, so the caller falls back to a full rebuild.
pub fn load_live_state(path: &Path, graph: &PackageGraph) -> Option<LiveState> {
    let loaded = LiveStateFile::load(path).and_then(|file| match file {
        Some(file) => Ok(Some(file.into_state(graph)?)),
        None => Ok(None),
    });

    match loaded {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!("Ignoring live state at {}: {e:#}", path.display());
            None
        }
    }
}
