use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version,
    store::{EventStore, validate_events_for_append},
};

/// Event store that keeps every stream in process memory.
///
/// Cloning yields another handle to the same streams. Appends take the write
/// lock for the whole compare-and-append, so two writers racing on one stream
/// are serialized and the loser observes the winner's version.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, Vec<EventEnvelope>>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of events across all streams.
    pub async fn event_count(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }

    /// Number of non-empty streams.
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Drops every stream and snapshot.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
        self.snapshots.write().await.clear();
    }
}

fn version_of(stream: Option<&Vec<EventEnvelope>>) -> Version {
    stream
        .and_then(|events| events.last())
        .map(|e| e.version)
        .unwrap_or_else(Version::initial)
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        Ok(streams.get(&stream_id).cloned().unwrap_or_default())
    }

    async fn read_stream_from(
        &self,
        stream_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let streams = self.streams.read().await;
        let events = streams
            .get(&stream_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn append_to_stream(
        &self,
        stream_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version> {
        validate_events_for_append(stream_id, expected_version, &events)?;

        let mut streams = self.streams.write().await;
        let current = version_of(streams.get(&stream_id));
        if current != expected_version {
            tracing::warn!(
                %stream_id,
                expected = %expected_version,
                actual = %current,
                "rejecting append on stale version"
            );
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: stream_id,
                expected: expected_version,
                actual: current,
            });
        }

        let appended = events.len();
        let stream = streams.entry(stream_id).or_default();
        stream.extend(events);
        let new_version = version_of(Some(&*stream));

        metrics::counter!("event_store_events_appended_total").increment(appended as u64);
        tracing::debug!(%stream_id, %new_version, appended, "appended events");

        Ok(new_version)
    }

    async fn stream_version(&self, stream_id: AggregateId) -> Result<Option<Version>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&stream_id)
            .and_then(|events| events.last())
            .map(|e| e.version))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.get(&snapshot.aggregate_id) {
            Some(current) if current.version > snapshot.version => {
                tracing::debug!(
                    aggregate_id = %snapshot.aggregate_id,
                    kept = %current.version,
                    skipped = %snapshot.version,
                    "ignoring older snapshot"
                );
            }
            _ => {
                snapshots.insert(snapshot.aggregate_id, snapshot);
            }
        }
        Ok(())
    }

    async fn get_snapshot(&self, stream_id: AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&stream_id).cloned())
    }
}
