use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid bounding box: {0:?}")]
    InvalidBBox([f32; 4]),

    #[error("invalid detection: {0}")]
    InvalidDetection(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid side channel: {0}")]
    InvalidSideChannel(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown track id {0}")]
    UnknownTrack(u32),

    #[error("frame {got} is not after last processed frame {last}")]
    FrameOutOfOrder { last: u64, got: u64 },

    #[error("assignment could not be solved for a {0}x{0} cost matrix")]
    Assignment(usize),

    #[error("config parse error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
