//! Replay protection: timestamp window, nonce bookkeeping and the full
//! validation pipeline for inbound messages.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use oauth1_config::{DEFAULT_MAX_VERSION, DEFAULT_TIMESTAMP_WINDOW_MS, ValidatorConfig};
use tracing::debug;

use crate::accessor::OAuthAccessor;
use crate::error::OAuthError;
use crate::message::OAuthMessage;
use crate::params::{
    OAUTH_NONCE, OAUTH_TIMESTAMP, OAUTH_VERSION, Parameter, SINGLE_PARAMETERS, percent_encode,
};
use crate::signature::{self, SignatureMethodRegistry};

/// Lowest `oauth_version` ever accepted.
pub const MIN_VERSION: f64 = 1.0;

/// Source of the current time.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
            })
    }
}

/// Accepted timestamps, in seconds, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRange {
    pub min: i64,
    pub max: i64,
}

/// A seen `(timestamp, nonce, consumer key, token)` tuple.
///
/// Ordered by timestamp first so the oldest records sit at the front of the set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct UsedNonce {
    timestamp: i64,
    sort_key: String,
}

impl UsedNonce {
    fn new(timestamp: i64, nonce: &str, consumer_key: Option<&str>, token: Option<&str>) -> Self {
        Self {
            timestamp,
            sort_key: format!(
                "{timestamp:020}&{}&{}&{}",
                percent_encode(nonce),
                encode_field(consumer_key),
                encode_field(token)
            ),
        }
    }
}

/// Percent-encode a key field; absent encodes as a space, which no encoded
/// value contains, so it never equals an empty value.
fn encode_field(value: Option<&str>) -> String {
    value.map_or_else(|| " ".to_owned(), percent_encode)
}

/// Decides whether an inbound message is acceptable.
pub trait OAuthValidator: Send + Sync {
    /// Check `message` against the credentials in `accessor`.
    fn validate_message(
        &self,
        message: &OAuthMessage,
        accessor: &OAuthAccessor,
    ) -> Result<(), OAuthError>;
}

/// In-memory validator for a single process.
///
/// Used nonces are remembered for as long as their timestamp stays inside the
/// window, so a restart forgets every nonce seen so far.
pub struct SimpleOAuthValidator {
    timestamp_window_ms: i64,
    max_version: f64,
    used_nonces: Mutex<BTreeSet<UsedNonce>>,
    registry: Arc<SignatureMethodRegistry>,
    clock: Arc<dyn Clock>,
}

impl SimpleOAuthValidator {
    /// Create a validator accepting timestamps within `timestamp_window_ms` of
    /// now and versions from 1.0 up to `max_version`.
    pub fn new(timestamp_window_ms: i64, max_version: f64) -> Self {
        Self {
            timestamp_window_ms,
            max_version,
            used_nonces: Mutex::new(BTreeSet::new()),
            registry: SignatureMethodRegistry::global(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self::new(config.timestamp_window_ms, config.max_version)
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<SignatureMethodRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Reject messages in which an OAuth protocol parameter occurs more than once.
    ///
    /// Application parameters may repeat freely.
    pub fn check_single_parameters(&self, message: &OAuthMessage) -> Result<(), OAuthError> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for parameter in message.parameters() {
            if SINGLE_PARAMETERS.contains(&parameter.name()) {
                *counts.entry(parameter.name()).or_default() += 1;
            }
        }
        let duplicated: Vec<&str> = counts
            .into_iter()
            .filter_map(|(name, count)| (count > 1).then_some(name))
            .collect();
        if duplicated.is_empty() {
            return Ok(());
        }

        let parameters: Vec<Parameter> = message
            .parameters()
            .iter()
            .filter(|p| duplicated.contains(&p.name()))
            .cloned()
            .collect();
        Err(OAuthError::DuplicateParameter { parameters })
    }

    /// Check `oauth_version`, treating an absent version as 1.0.
    pub fn validate_version(&self, message: &OAuthMessage) -> Result<(), OAuthError> {
        let Some(version) = message.parameter(OAUTH_VERSION) else {
            return Ok(());
        };
        let accepted = version
            .trim()
            .parse::<f64>()
            .is_ok_and(|v| (MIN_VERSION..=self.max_version).contains(&v));
        if accepted {
            return Ok(());
        }
        Err(OAuthError::VersionRejected {
            version: version.to_owned(),
            min: MIN_VERSION,
            max: self.max_version,
        })
    }

    /// The accepted timestamp range at the current time.
    ///
    /// Both ends are rounded to the nearest second.
    pub fn acceptable_timestamps(&self) -> TimestampRange {
        let now = self.clock.now_millis();
        TimestampRange {
            min: round_to_seconds(now.saturating_sub(self.timestamp_window_ms)),
            max: round_to_seconds(now.saturating_add(self.timestamp_window_ms)),
        }
    }

    /// Reject a timestamp (seconds) outside the window around now.
    pub fn check_timestamp(&self, timestamp: i64) -> Result<TimestampRange, OAuthError> {
        let range = self.acceptable_timestamps();
        if timestamp < range.min || timestamp > range.max {
            return Err(OAuthError::TimestampRefused {
                timestamp,
                min: range.min,
                max: range.max,
            });
        }
        Ok(range)
    }

    /// Record the tuple, failing if it was already recorded, then drop every
    /// record older than `min`.
    pub fn check_and_record_nonce(
        &self,
        timestamp: i64,
        nonce: &str,
        consumer_key: Option<&str>,
        token: Option<&str>,
        min: i64,
    ) -> Result<(), OAuthError> {
        let record = UsedNonce::new(timestamp, nonce, consumer_key, token);
        let mut used = self.lock_nonces();
        if !used.insert(record) {
            return Err(OAuthError::NonceAlreadyUsed);
        }
        evict(&mut used, min);
        Ok(())
    }

    /// Drop every record whose timestamp is below `min`. Returns the number removed.
    pub fn evict_older_than(&self, min: i64) -> usize {
        evict(&mut self.lock_nonces(), min)
    }

    /// Drop records that have aged out of the window at the current time.
    ///
    /// Suited to a periodic timer when traffic is too sparse for the eviction
    /// done on each check to bound memory. The cutoff is rounded to the nearest
    /// second like the lower end of [`Self::check_timestamp`], rather than
    /// truncated, so a sweep never keeps a record that check would refuse.
    pub fn release_garbage(&self) -> usize {
        let min = self.acceptable_timestamps().min;
        self.evict_older_than(min)
    }

    /// Number of tuples currently remembered.
    pub fn used_nonce_count(&self) -> usize {
        self.lock_nonces().len()
    }

    fn lock_nonces(&self) -> MutexGuard<'_, BTreeSet<UsedNonce>> {
        self.used_nonces
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_freshness(&self, message: &OAuthMessage) -> Result<(), OAuthError> {
        message.require_parameters(&[OAUTH_TIMESTAMP, OAUTH_NONCE])?;
        let raw = message.parameter(OAUTH_TIMESTAMP).unwrap_or_default();
        let timestamp = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| OAuthError::ParameterRejected {
                parameters: vec![Parameter::new(OAUTH_TIMESTAMP, raw)],
            })?;

        let range = self.check_timestamp(timestamp)?;
        self.check_and_record_nonce(
            timestamp,
            message.parameter(OAUTH_NONCE).unwrap_or_default(),
            message.consumer_key(),
            message.token(),
            range.min,
        )
    }

    fn validate(&self, message: &OAuthMessage, accessor: &OAuthAccessor) -> Result<(), OAuthError> {
        self.check_single_parameters(message)?;
        self.validate_version(message)?;
        self.check_freshness(message)?;
        signature::validate_signature(message, accessor, &self.registry)
    }
}

impl Default for SimpleOAuthValidator {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_WINDOW_MS, DEFAULT_MAX_VERSION)
    }
}

impl OAuthValidator for SimpleOAuthValidator {
    fn validate_message(
        &self,
        message: &OAuthMessage,
        accessor: &OAuthAccessor,
    ) -> Result<(), OAuthError> {
        self.validate(message, accessor).inspect_err(|err| {
            debug!(
                problem = err.problem(),
                consumer_key = message.consumer_key().unwrap_or_default(),
                error = %err,
                "Rejected OAuth message"
            );
        })
    }
}

impl fmt::Debug for SimpleOAuthValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleOAuthValidator")
            .field("timestamp_window_ms", &self.timestamp_window_ms)
            .field("max_version", &self.max_version)
            .field("used_nonces", &self.used_nonce_count())
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

/// Milliseconds to seconds, rounding half up.
fn round_to_seconds(millis: i64) -> i64 {
    millis.saturating_add(500) / 1000
}

fn evict(used: &mut BTreeSet<UsedNonce>, min: i64) -> usize {
    let mut removed = 0;
    while used.first().is_some_and(|oldest| oldest.timestamp < min) {
        used.pop_first();
        removed += 1;
    }
    if removed > 0 {
        debug!(removed, min, remaining = used.len(), "Evicted used nonces");
    }
    removed
}
