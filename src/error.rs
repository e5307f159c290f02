use thiserror::Error;

/// Errors raised while configuring or populating a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("lane {lane} is out of range (simulation has {num_lanes} lanes)")]
    InvalidLane { lane: usize, num_lanes: usize },
    #[error("invalid IDM parameters: {0}")]
    InvalidIdmParams(String),
    #[error("invalid MOBIL parameters: {0}")]
    InvalidMobilParams(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid JSON: {0}")]
    Config(#[from] serde_json::Error),
    #[error("failed to read configuration")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
