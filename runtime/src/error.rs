use thiserror::Error;

/// Failures of the scheduler adapters, raised while wiring a loop up.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("no tokio runtime is available on this thread")]
    NoRuntime,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid tick strategy `{0}`, expected `yield`, `interval` or `interval:<ms>`")]
    InvalidTick(String),
}
