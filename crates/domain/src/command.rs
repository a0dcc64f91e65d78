//! Command handling infrastructure.

use std::marker::PhantomData;
use std::time::Duration;

use common::TableNumber;
use rand::Rng;
use table_store::{SaveOptions, TableDocument, TableStore, TableStoreError, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Default number of attempts for a command that keeps losing the
/// optimistic concurrency race.
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 3;

/// Default base delay before retrying a command that lost a version race.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The document version after the command. Unchanged when the
    /// command produced no events.
    pub new_version: Version,
}

/// Trait for commands that can be executed against an aggregate.
///
/// Commands represent an intention to perform an action. They may be rejected
/// if the aggregate's current state doesn't allow the action.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the key of the aggregate this command targets.
    fn key(&self) -> TableNumber;
}

/// Handler for executing commands against aggregates.
///
/// The handler is responsible for:
/// 1. Loading the aggregate document together with its version
/// 2. Executing the command to produce events
/// 3. Applying the events and saving the document with the loaded version
///    as the expected version
/// 4. Starting over from a fresh load when another writer got there first
pub struct CommandHandler<S, A>
where
    S: TableStore,
    A: Aggregate,
{
    store: S,
    max_attempts: u32,
    retry_backoff: Duration,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: TableStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_WRITE_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            _phantom: PhantomData,
        }
    }

    /// Sets how many times a command is attempted before giving up with
    /// [`DomainError::WriteConflict`]. Values below 1 are treated as 1.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the base delay between attempts. Attempt `n` waits `n * base`
    /// plus up to `base` of random jitter; zero disables the wait.
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.retry_backoff = base;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Loads an aggregate, failing if it doesn't exist.
    pub async fn load(&self, key: TableNumber) -> Result<A, DomainError> {
        self.load_existing(key)
            .await?
            .ok_or(DomainError::TableNotFound(key))
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, key: TableNumber) -> Result<Option<A>, DomainError> {
        match self.store.get(key).await? {
            Some(document) => Ok(Some(Self::restore(document)?)),
            None => Ok(None),
        }
    }

    /// Loads every stored aggregate, ordered by key.
    pub async fn load_all(&self) -> Result<Vec<A>, DomainError> {
        self.store
            .list()
            .await?
            .into_iter()
            .map(Self::restore)
            .collect()
    }

    /// Stores a brand-new aggregate.
    ///
    /// Fails with [`DomainError::TableAlreadyExists`] if the key is taken.
    pub async fn create(&self, mut aggregate: A) -> Result<A, DomainError> {
        let document = TableDocument::from_state(aggregate.key(), Version::initial(), &aggregate)?;
        let version = self.store.insert(document).await?;
        aggregate.set_version(version);
        Ok(aggregate)
    }

    /// Executes a command and persists the resulting state.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error. It may run more than
    /// once: whenever the save loses a version race, the aggregate is reloaded
    /// and the function is called again against the fresh state.
    ///
    /// A command that produces no events persists nothing.
    pub async fn execute<F>(
        &self,
        key: TableNumber,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let started = std::time::Instant::now();
        let result = self.execute_with_retry(key, &command_fn).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        metrics::counter!(
            "table_commands_total",
            "aggregate" => A::aggregate_type(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!("table_command_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        result
    }

    async fn execute_with_retry<F>(
        &self,
        key: TableNumber,
        command_fn: &F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let mut aggregate = self.load(key).await?;
            let current_version = aggregate.version();

            // Execute command to get events
            let events = command_fn(&aggregate)?;

            if events.is_empty() {
                return Ok(CommandResult {
                    aggregate,
                    events: vec![],
                    new_version: current_version,
                });
            }

            for event in &events {
                tracing::debug!(
                    table_number = %key,
                    event_type = event.event_type(),
                    "applying event"
                );
                aggregate.apply(event.clone());
            }

            let document = TableDocument::from_state(key, current_version, &aggregate)?;
            match self
                .store
                .save(document, SaveOptions::expect_version(current_version))
                .await
            {
                Ok(new_version) => {
                    aggregate.set_version(new_version);
                    return Ok(CommandResult {
                        aggregate,
                        events,
                        new_version,
                    });
                }
                Err(TableStoreError::ConcurrencyConflict {
                    expected, actual, ..
                }) => {
                    metrics::counter!("table_write_conflicts_total").increment(1);
                    tracing::warn!(
                        table_number = %key,
                        attempt,
                        %expected,
                        %actual,
                        "concurrent modification, retrying"
                    );
                    if attempt >= self.max_attempts {
                        return Err(DomainError::WriteConflict {
                            table_number: key,
                            attempts: attempt,
                        });
                    }
                    tokio::time::sleep(self.backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        if self.retry_backoff.is_zero() {
            return Duration::ZERO;
        }
        let jitter_us = rand::thread_rng().gen_range(0..=self.retry_backoff.as_micros() as u64);
        self.retry_backoff * attempt + Duration::from_micros(jitter_us)
    }

    fn restore(document: TableDocument) -> Result<A, DomainError> {
        let version = document.version;
        let mut aggregate: A = document.into_state()?;
        aggregate.set_version(version);
        Ok(aggregate)
    }
}
