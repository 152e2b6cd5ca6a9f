// lib.rs

mod checksum;
mod codec;
mod config;
mod dictionary;
mod drive;
mod session;

pub use checksum::{crc16, crc16_le};
pub use codec::{
    EXTENDED_WRITE, Frame, FrameError, ResponseCheck, WRITE_SINGLE_REGISTER, decode, encode,
    format_hex, function_code, validate_response,
};
pub use config::{
    CommandPacing, ConfigError, DEFAULT_COMMAND_PAUSE_MS, DEFAULT_MAX_RESPONSE_LEN,
    DEFAULT_MOTION_KEYWORDS, DEFAULT_MOTION_PAUSE_MS, DEFAULT_SETTLE_DELAY_MS, DEFAULT_UNIT_ID,
    DriveConfig, SessionConfig,
};
pub use dictionary::{
    DataType, DictionaryError, RegisterDescriptor, RegisterDictionary, UnknownRegisterError,
};
pub use drive::ServoDrive;
pub use session::{DuplexChannel, SessionState, TransportSession, TransportSessionBuilder};

#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("Dictionary error: {0}")]
    Dictionary(#[from] DictionaryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Why an exchange did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Channel I/O error: {0}")]
    ChannelIo(#[from] std::io::Error),

    #[error("No response received")]
    NoResponse,

    #[error("Response rejected: {0}")]
    Rejected(#[from] FrameError),
}

/// Outcome of one request/response cycle.
#[derive(Debug)]
pub struct ExchangeResult {
    pub success: bool,
    pub response: Vec<u8>,
    pub description: String,
    pub error: Option<ExchangeError>,
}

impl ExchangeResult {
    pub fn success(description: &str, response: Vec<u8>) -> Self {
        ExchangeResult {
            success: true,
            response,
            description: description.to_string(),
            error: None,
        }
    }

    pub fn failure(description: &str, response: Vec<u8>, error: ExchangeError) -> Self {
        ExchangeResult {
            success: false,
            response,
            description: description.to_string(),
            error: Some(error),
        }
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self.error, Some(ExchangeError::NoResponse))
    }
}
