//! Aggregate repository: rebuilds aggregates from their streams and appends
//! new events under an optimistic version check.

use std::marker::PhantomData;
use std::time::Duration;

use common::AggregateId;
use event_store::{EventEnvelope, EventStore, EventStoreExt, Snapshot, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable, crosses_snapshot_boundary};
use crate::command::CommandMetadata;
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The stream version after the command.
    pub new_version: Version,
}

/// How often a load-decide-save cycle is repeated after losing a
/// concurrency race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,

    /// Pause before retry `n` is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Surface the first conflict to the caller.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Pause before the given retry, saturating at `Duration::MAX`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(10),
        }
    }
}

/// Loads and saves one kind of aggregate through an [`EventStore`].
///
/// Aggregates are keyed directly by their id; nothing is cached between
/// calls, every command starts from a fresh replay.
pub struct AggregateRepository<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    snapshot_interval: usize,
    _phantom: PhantomData<A>,
}

impl<S, A> AggregateRepository<S, A>
where
    S: EventStore,
    A: Aggregate + Serialize + DeserializeOwned,
{
    /// Creates a repository that never writes snapshots.
    pub fn new(store: S) -> Self {
        Self {
            store,
            snapshot_interval: 0,
            _phantom: PhantomData,
        }
    }

    /// Writes a snapshot whenever a save crosses a multiple of `interval`
    /// events. Zero disables snapshots.
    pub fn with_snapshot_interval(mut self, interval: usize) -> Self {
        self.snapshot_interval = interval;
        self
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn snapshot_interval(&self) -> usize {
        self.snapshot_interval
    }

    /// Rebuilds an aggregate and returns it with its stream version.
    ///
    /// Starts from the latest snapshot when there is one, otherwise from
    /// `A::default()`. A stream with no events yields the default state at
    /// version 0.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<(A, Version), DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => {
                let version = snapshot.version;
                let mut restored: A = snapshot.into_state()?;
                restored.set_version(version);
                restored
            }
            None => A::default(),
        };

        for envelope in events {
            let event: A::Event = envelope.decode()?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        let version = aggregate.version();
        tracing::debug!(%aggregate_id, %version, "loaded aggregate");
        Ok((aggregate, version))
    }

    /// Loads an aggregate, returning None if no creation event exists.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let (aggregate, _) = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Appends `events` to the aggregate's stream at `expected_version`.
    ///
    /// Fails with a concurrency conflict if another writer appended since
    /// the aggregate was loaded. An empty slice writes nothing and returns
    /// `expected_version`.
    pub async fn save(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: &[A::Event],
    ) -> Result<Version, DomainError> {
        self.append(aggregate_id, expected_version, events, None)
            .await
    }

    /// Like [`save`](Self::save), stamping each envelope with the dispatch
    /// metadata.
    pub async fn save_with_metadata(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: &[A::Event],
        metadata: &CommandMetadata,
    ) -> Result<Version, DomainError> {
        self.append(aggregate_id, expected_version, events, Some(metadata))
            .await
    }

    /// Runs one load-decide-save cycle.
    ///
    /// `decide` sees the current state and returns the events to append or
    /// a rejection. Rejections and empty decisions persist nothing.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        metadata: &CommandMetadata,
        decide: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let (mut aggregate, current_version) = self.load(aggregate_id).await?;

        let events = decide(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let new_version = self
            .save_with_metadata(aggregate_id, current_version, &events, metadata)
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        if crosses_snapshot_boundary(current_version, new_version, self.snapshot_interval) {
            self.write_snapshot(aggregate_id, &aggregate).await;
        }

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Runs [`execute`](Self::execute), repeating the whole cycle with fresh
    /// state whenever the append loses a concurrency race.
    ///
    /// Any error other than a conflict is returned immediately. After
    /// `policy.max_retries` retries the last conflict is returned.
    pub async fn execute_with_retry<F>(
        &self,
        aggregate_id: AggregateId,
        metadata: &CommandMetadata,
        policy: RetryPolicy,
        decide: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 0;
        loop {
            match self.execute(aggregate_id, metadata, &decide).await {
                Err(e) if e.is_concurrency_conflict() && attempt < policy.max_retries => {
                    attempt += 1;
                    metrics::counter!("aggregate_concurrency_conflicts_total").increment(1);
                    tracing::warn!(
                        %aggregate_id,
                        correlation_id = %metadata.correlation_id,
                        attempt,
                        max_retries = policy.max_retries,
                        "concurrency conflict, retrying with fresh state"
                    );
                    tokio::time::sleep(policy.delay_for(attempt)).await;
                }
                Err(e) => {
                    if e.is_concurrency_conflict() {
                        metrics::counter!("aggregate_concurrency_conflicts_total").increment(1);
                    }
                    return Err(e);
                }
                Ok(result) => {
                    if attempt > 0 {
                        tracing::info!(%aggregate_id, attempt, "command succeeded after retry");
                    }
                    return Ok(result);
                }
            }
        }
    }

    async fn append(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: &[A::Event],
        metadata: Option<&CommandMetadata>,
    ) -> Result<Version, DomainError> {
        if events.is_empty() {
            return Ok(expected_version);
        }
        let envelopes = self.build_envelopes(aggregate_id, expected_version, events, metadata)?;
        let new_version = self
            .store
            .append_to_stream(aggregate_id, expected_version, envelopes)
            .await?;
        Ok(new_version)
    }

    fn build_envelopes(
        &self,
        aggregate_id: AggregateId,
        expected_version: Version,
        events: &[A::Event],
        metadata: Option<&CommandMetadata>,
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let stamped = metadata.map(CommandMetadata::to_envelope_metadata);
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = expected_version;

        for event in events {
            version = version.next();
            let mut builder = EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?;
            if let Some(entries) = &stamped {
                builder = builder.metadata_all(entries);
            }
            envelopes.push(builder.build()?);
        }

        Ok(envelopes)
    }

    /// Snapshot failures are logged only; the events are already durable.
    async fn write_snapshot(&self, aggregate_id: AggregateId, aggregate: &A) {
        let snapshot = match Snapshot::from_state(
            aggregate_id,
            A::aggregate_type(),
            aggregate.version(),
            aggregate,
        ) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(%aggregate_id, error = %e, "failed to serialize snapshot");
                return;
            }
        };

        match self.store.save_snapshot(snapshot).await {
            Ok(()) => {
                metrics::counter!("aggregate_snapshots_total").increment(1);
                tracing::debug!(%aggregate_id, version = %aggregate.version(), "saved snapshot");
            }
            Err(e) => tracing::warn!(%aggregate_id, error = %e, "failed to save snapshot"),
        }
    }
}

impl<S, A> AggregateRepository<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// Creates a repository using the aggregate's own snapshot interval.
    pub fn with_default_snapshots(store: S) -> Self {
        Self::new(store).with_snapshot_interval(A::snapshot_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use event_store::InMemoryEventStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data")]
    enum TallyEvent {
        Opened { id: AggregateId },
        Counted { amount: u32 },
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Opened { .. } => "Opened",
                TallyEvent::Counted { .. } => "Counted",
            }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Tally {
        id: Option<AggregateId>,
        total: u32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("tally rejected: {0}")]
    struct TallyError(&'static str);

    impl From<TallyError> for DomainError {
        fn from(e: TallyError) -> Self {
            DomainError::EventStore(event_store::EventStoreError::InvalidAppend(e.to_string()))
        }
    }

    impl Aggregate for Tally {
        type Event = TallyEvent;
        type Error = TallyError;

        fn aggregate_type() -> &'static str {
            "Tally"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                TallyEvent::Opened { id } => self.id = Some(id),
                TallyEvent::Counted { amount } => self.total += amount,
            }
        }
    }

    impl SnapshotCapable for Tally {
        fn snapshot_interval() -> usize {
            3
        }
    }

    struct Count(AggregateId);

    impl Command for Count {
        type Aggregate = Tally;

        fn aggregate_id(&self) -> AggregateId {
            self.0
        }

        fn command_type(&self) -> &'static str {
            "Count"
        }
    }

    fn metadata(id: AggregateId) -> CommandMetadata {
        CommandMetadata::for_command(&Count(id))
    }

    async fn open(repo: &AggregateRepository<InMemoryEventStore, Tally>, id: AggregateId) {
        repo.execute(id, &metadata(id), |_| Ok(vec![TallyEvent::Opened { id }]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn load_of_unknown_stream_is_default_at_version_zero() {
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(InMemoryEventStore::new());
        let (tally, version) = repo.load(AggregateId::new()).await.unwrap();

        assert!(tally.id.is_none());
        assert_eq!(version, Version::initial());
    }

    #[tokio::test]
    async fn save_then_load_replays_events() {
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(InMemoryEventStore::new());
        let id = AggregateId::new();

        let version = repo
            .save(
                id,
                Version::initial(),
                &[TallyEvent::Opened { id }, TallyEvent::Counted { amount: 4 }],
            )
            .await
            .unwrap();
        assert_eq!(version, Version::new(2));

        let (tally, version) = repo.load(id).await.unwrap();
        assert_eq!(tally.id, Some(id));
        assert_eq!(tally.total, 4);
        assert_eq!(version, Version::new(2));
    }

    #[tokio::test]
    async fn save_at_stale_version_conflicts() {
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(InMemoryEventStore::new());
        let id = AggregateId::new();
        open(&repo, id).await;

        let err = repo
            .save(id, Version::initial(), &[TallyEvent::Counted { amount: 1 }])
            .await
            .unwrap_err();
        assert!(err.is_concurrency_conflict());
    }

    #[tokio::test]
    async fn execute_stamps_metadata() {
        let store = InMemoryEventStore::new();
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(store.clone());
        let id = AggregateId::new();
        let meta = metadata(id);

        repo.execute(id, &meta, |_| Ok(vec![TallyEvent::Opened { id }]))
            .await
            .unwrap();

        let stored = store.read_stream(id).await.unwrap();
        assert_eq!(stored[0].correlation_id(), Some(meta.correlation_id));
        assert_eq!(stored[0].aggregate_type, "Tally");
        assert_eq!(stored[0].event_type, "Opened");
    }

    #[tokio::test]
    async fn rejected_decision_persists_nothing() {
        let store = InMemoryEventStore::new();
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(store.clone());
        let id = AggregateId::new();

        let result = repo
            .execute(id, &metadata(id), |_| Err(TallyError("closed")))
            .await;

        assert!(result.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn empty_decision_keeps_version() {
        let store = InMemoryEventStore::new();
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(store.clone());
        let id = AggregateId::new();
        open(&repo, id).await;

        let result = repo.execute(id, &metadata(id), |_| Ok(vec![])).await.unwrap();
        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn empty_save_keeps_version() {
        let store = InMemoryEventStore::new();
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(store.clone());
        let id = AggregateId::new();
        open(&repo, id).await;

        let version = repo.save(id, Version::first(), &[]).await.unwrap();
        assert_eq!(version, Version::first());

        let version = repo
            .save_with_metadata(id, Version::first(), &[], &metadata(id))
            .await
            .unwrap();
        assert_eq!(version, Version::first());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn snapshot_written_at_interval_and_used_on_load() {
        let store = InMemoryEventStore::new();
        let repo: AggregateRepository<_, Tally> =
            AggregateRepository::with_default_snapshots(store.clone());
        let id = AggregateId::new();
        open(&repo, id).await;

        for _ in 0..2 {
            repo.execute(id, &metadata(id), |_| Ok(vec![TallyEvent::Counted { amount: 2 }]))
                .await
                .unwrap();
        }
        let snapshot = store.get_snapshot(id).await.unwrap().unwrap();
        assert_eq!(snapshot.version, Version::new(3));

        repo.execute(id, &metadata(id), |_| Ok(vec![TallyEvent::Counted { amount: 5 }]))
            .await
            .unwrap();

        let (tally, version) = repo.load(id).await.unwrap();
        assert_eq!(tally.total, 9);
        assert_eq!(version, Version::new(4));
    }

    #[tokio::test]
    async fn snapshots_disabled_by_default() {
        let store = InMemoryEventStore::new();
        let repo: AggregateRepository<_, Tally> = AggregateRepository::new(store.clone());
        let id = AggregateId::new();
        open(&repo, id).await;
        for _ in 0..5 {
            repo.execute(id, &metadata(id), |_| Ok(vec![TallyEvent::Counted { amount: 1 }]))
                .await
                .unwrap();
        }

        assert!(store.get_snapshot(id).await.unwrap().is_none());
    }

    /// Store that lets a rival writer append just before the first
    /// `rival_appends` appends of the repository.
    struct Contended {
        inner: InMemoryEventStore,
        rival_appends: std::sync::atomic::AtomicU32,
    }

    impl Contended {
        fn new(inner: InMemoryEventStore, rival_appends: u32) -> Self {
            Self {
                inner,
                rival_appends: std::sync::atomic::AtomicU32::new(rival_appends),
            }
        }
    }

    #[async_trait::async_trait]
    impl EventStore for Contended {
        async fn read_stream(&self, id: AggregateId) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.read_stream(id).await
        }

        async fn read_stream_from(
            &self,
            id: AggregateId,
            from: Version,
        ) -> event_store::Result<Vec<EventEnvelope>> {
            self.inner.read_stream_from(id, from).await
        }

        async fn append_to_stream(
            &self,
            id: AggregateId,
            expected: Version,
            events: Vec<EventEnvelope>,
        ) -> event_store::Result<Version> {
            let remaining = self.rival_appends.load(std::sync::atomic::Ordering::SeqCst);
            if remaining > 0 {
                self.rival_appends
                    .store(remaining - 1, std::sync::atomic::Ordering::SeqCst);
                let rival = EventEnvelope::builder()
                    .aggregate_id(id)
                    .aggregate_type("Tally")
                    .event_type("Counted")
                    .version(expected.next())
                    .payload(&TallyEvent::Counted { amount: 10 })?
                    .build()?;
                self.inner.append_to_stream(id, expected, vec![rival]).await?;
            }
            self.inner.append_to_stream(id, expected, events).await
        }

        async fn stream_version(&self, id: AggregateId) -> event_store::Result<Option<Version>> {
            self.inner.stream_version(id).await
        }

        async fn save_snapshot(&self, snapshot: Snapshot) -> event_store::Result<()> {
            self.inner.save_snapshot(snapshot).await
        }

        async fn get_snapshot(&self, id: AggregateId) -> event_store::Result<Option<Snapshot>> {
            self.inner.get_snapshot(id).await
        }
    }

    async fn opened_contended(
        rival_appends: u32,
    ) -> (AggregateRepository<Contended, Tally>, AggregateId) {
        let inner = InMemoryEventStore::new();
        let id = AggregateId::new();
        open(&AggregateRepository::new(inner.clone()), id).await;
        (
            AggregateRepository::new(Contended::new(inner, rival_appends)),
            id,
        )
    }

    #[tokio::test]
    async fn retry_recovers_from_a_lost_race() {
        let (repo, id) = opened_contended(1).await;

        let result = repo
            .execute_with_retry(id, &metadata(id), RetryPolicy::default(), |_| {
                Ok(vec![TallyEvent::Counted { amount: 1 }])
            })
            .await
            .unwrap();

        assert_eq!(result.aggregate.total, 11);
        assert_eq!(result.new_version, Version::new(3));
    }

    #[tokio::test]
    async fn no_retry_policy_surfaces_conflict() {
        let (repo, id) = opened_contended(1).await;

        let err = repo
            .execute_with_retry(id, &metadata(id), RetryPolicy::no_retry(), |_| {
                Ok(vec![TallyEvent::Counted { amount: 1 }])
            })
            .await
            .unwrap_err();

        assert!(err.is_concurrency_conflict());
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let (repo, id) = opened_contended(10).await;
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: Duration::ZERO,
        };

        let err = repo
            .execute_with_retry(id, &metadata(id), policy, |_| {
                Ok(vec![TallyEvent::Counted { amount: 1 }])
            })
            .await
            .unwrap_err();

        assert!(err.is_concurrency_conflict());
        // Three attempts, each overtaken by one rival event.
        let (tally, version) = repo.load(id).await.unwrap();
        assert_eq!(version, Version::new(4));
        assert_eq!(tally.total, 30);
    }

    #[test]
    fn retry_delay_grows_linearly_and_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(3), Duration::from_millis(30));

        let huge = RetryPolicy {
            max_retries: 3,
            backoff: Duration::MAX,
        };
        assert_eq!(huge.delay_for(2), Duration::MAX);
        assert_eq!(RetryPolicy::no_retry().delay_for(5), Duration::ZERO);
    }
}
