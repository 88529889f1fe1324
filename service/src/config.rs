use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use sse::config::{
    DEFAULT_DRAIN_TIMEOUT, DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_SUBSCRIBERS,
    DEFAULT_QUEUE_CAPACITY,
};
use sse::{HubConfig, OverflowPolicy};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Maximum number of concurrently connected event stream subscribers
    #[arg(long, env, default_value_t = DEFAULT_MAX_SUBSCRIBERS)]
    pub max_subscribers: usize,

    /// Number of pending events buffered per subscriber before the overflow policy applies
    #[arg(long, env, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Number of recent facts replayed to every newly connected subscriber
    #[arg(long, env, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    pub history_capacity: usize,

    /// What to do when a subscriber's queue is full: drop its oldest pending event,
    /// or disconnect it
    #[arg(
        long,
        env,
        default_value_t = OverflowPolicy::DropOldest,
        value_parser = clap::builder::PossibleValuesParser::new(["drop-oldest", "disconnect-slow-consumer"])
            .map(|s| s.parse::<OverflowPolicy>().unwrap()),
    )]
    pub overflow_policy: OverflowPolicy,

    /// Seconds a draining event stream may spend on one stalled write during shutdown
    #[arg(long, env, default_value_t = DEFAULT_DRAIN_TIMEOUT.as_secs())]
    pub drain_timeout_secs: u64,

    /// Maximum size in bytes of a submitted fact, measured as serialized JSON
    #[arg(long, env, default_value_t = 16_384)]
    pub max_payload_bytes: usize,

    /// Seconds between keep-alive comments sent on idle event streams
    #[arg(long, env, default_value_t = 15)]
    pub keep_alive_secs: u64,

    /// Directory of static frontend files served for unmatched routes
    #[arg(long, env, default_value = "./public")]
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Parse an explicit argument list (first item is the binary name) without
    /// reading `.env` or the process arguments.
    pub fn from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::parse_from(args)
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    /// Sizing and backpressure settings for the broadcast hub.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            max_subscribers: self.max_subscribers,
            queue_capacity: self.queue_capacity,
            history_capacity: self.history_capacity,
            overflow_policy: self.overflow_policy,
            drain_timeout: Duration::from_secs(self.drain_timeout_secs),
        }
    }
}
