use async_trait::async_trait;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Snapshot, Version};

/// Port to an append-only log of events, partitioned into one stream per
/// aggregate.
///
/// Implementations must be thread-safe; distinct streams may be written
/// concurrently.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Reads every event of a stream in version order.
    ///
    /// Returns an empty vector when the stream does not exist.
    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Reads the events of a stream starting at `from_version` (inclusive).
    async fn read_stream_from(
        &self,
        stream_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Appends `events` to a stream if, and only if, the stream is currently
    /// at `expected_version`.
    ///
    /// The version check and the write form one atomic operation: either every
    /// event is stored or none is. Fails with `ConcurrencyConflict` when the
    /// stored version differs. Returns the stream version after the append.
    async fn append_to_stream(
        &self,
        stream_id: AggregateId,
        expected_version: Version,
        events: Vec<EventEnvelope>,
    ) -> Result<Version>;

    /// Current version of a stream, or `None` if it holds no events.
    async fn stream_version(&self, stream_id: AggregateId) -> Result<Option<Version>>;

    /// Stores a snapshot, replacing any previous one for the same stream
    /// unless that one has a higher version.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    /// Latest snapshot of a stream, if any.
    async fn get_snapshot(&self, stream_id: AggregateId) -> Result<Option<Snapshot>>;
}

/// Convenience methods available on every event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Checks whether a stream has any events.
    async fn stream_exists(&self, stream_id: AggregateId) -> Result<bool> {
        Ok(self.stream_version(stream_id).await?.is_some())
    }

    /// Reads what is needed to rebuild an aggregate.
    ///
    /// With a snapshot, returns it together with the events appended after
    /// it; otherwise returns `None` and the full stream.
    async fn load_aggregate(
        &self,
        stream_id: AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        match self.get_snapshot(stream_id).await? {
            Some(snapshot) => {
                let events = self
                    .read_stream_from(stream_id, snapshot.version.next())
                    .await?;
                Ok((Some(snapshot), events))
            }
            None => Ok((None, self.read_stream(stream_id).await?)),
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch can be appended to `stream_id` at `expected_version`.
///
/// The batch must be non-empty, belong to a single stream and aggregate type,
/// and carry versions `expected_version + 1, + 2, ...` without gaps.
pub fn validate_events_for_append(
    stream_id: AggregateId,
    expected_version: Version,
    events: &[EventEnvelope],
) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut version = expected_version;
    for event in events {
        if event.aggregate_id != stream_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "event {} belongs to stream {}, not {}",
                event.event_id, event.aggregate_id, stream_id
            )));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidAppend(
                "all events must have the same aggregate type".to_string(),
            ));
        }
        version = version.next();
        if event.version != version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {}, got {}",
                version, event.version
            )));
        }
    }

    Ok(())
}
