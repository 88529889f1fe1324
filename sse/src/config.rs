use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum number of concurrently registered subscribers.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 10_000;
/// Default per-subscriber outbound queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Default number of recent envelopes replayed to new subscribers.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
/// Default time a draining subscriber gets to finish one stalled write.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// What a hub does when a subscriber's outbound queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict the oldest unsent envelope to make room for the new one.
    #[default]
    DropOldest,
    /// Close the lagging subscriber and release its queue.
    DisconnectSlowConsumer,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OverflowPolicyParseError;

impl fmt::Display for OverflowPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "expected one of: drop-oldest, disconnect-slow-consumer"
        )
    }
}

impl std::error::Error for OverflowPolicyParseError {}

impl FromStr for OverflowPolicy {
    type Err = OverflowPolicyParseError;
    fn from_str(policy: &str) -> Result<OverflowPolicy, Self::Err> {
        match policy.to_lowercase().replace('_', "-").as_str() {
            "drop-oldest" => Ok(OverflowPolicy::DropOldest),
            "disconnect-slow-consumer" => Ok(OverflowPolicy::DisconnectSlowConsumer),
            _ => Err(OverflowPolicyParseError),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OverflowPolicy::DropOldest => write!(f, "drop-oldest"),
            OverflowPolicy::DisconnectSlowConsumer => write!(f, "disconnect-slow-consumer"),
        }
    }
}

/// Sizing and backpressure settings for one `Hub` instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HubConfig {
    pub max_subscribers: usize,
    /// Clamped to at least 1 when the hub is built.
    pub queue_capacity: usize,
    /// Zero disables history replay.
    pub history_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// How long a draining worker may wait on one write before giving up.
    pub drain_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            overflow_policy: OverflowPolicy::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}
