use std::io::{self, ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use crate::ExchangeResult;
use crate::codec::{self, Frame, ResponseCheck, format_hex};
use crate::config::SessionConfig;

/// Byte channel a session talks through, typically a serial port.
///
/// `read_response` returns an empty buffer when nothing arrived before the
/// channel's own timeout expired.
pub trait DuplexChannel {
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<usize>;

    fn read_response(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;
}

impl<T: Read + Write> DuplexChannel for T {
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.write_all(bytes)?;
        self.flush()?;
        Ok(bytes.len())
    }

    fn read_response(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0u8; max_bytes];
        let mut filled = 0;
        while filled < max_bytes {
            match self.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
                Err(e) => return Err(e),
            }
        }
        buffer.truncate(filled);
        Ok(buffer)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

pub struct TransportSessionBuilder {
    settle_delay: Option<Duration>,
    max_response_len: Option<usize>,
    response_check: Option<ResponseCheck>,
}

impl TransportSessionBuilder {
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = Some(delay);
        self
    }

    pub fn max_response_len(mut self, len: usize) -> Self {
        self.max_response_len = Some(len);
        self
    }

    pub fn response_check(mut self, check: ResponseCheck) -> Self {
        self.response_check = Some(check);
        self
    }

    pub fn config(self, config: &SessionConfig) -> Self {
        self.settle_delay(config.settle_delay())
            .max_response_len(config.max_response_len)
            .response_check(config.response_check)
    }

    pub fn build<C: DuplexChannel>(self, channel: C) -> TransportSession<C> {
        let defaults = SessionConfig::default();
        TransportSession {
            channel,
            state: SessionState::Idle,
            settle_delay: self.settle_delay.unwrap_or_else(|| defaults.settle_delay()),
            max_response_len: self.max_response_len.unwrap_or(defaults.max_response_len),
            response_check: self.response_check.unwrap_or(defaults.response_check),
        }
    }
}

/// Runs one blocking request/response exchange at a time over an owned channel.
pub struct TransportSession<C> {
    channel: C,
    state: SessionState,
    settle_delay: Duration,
    max_response_len: usize,
    response_check: ResponseCheck,
}

impl TransportSession<()> {
    pub fn builder() -> TransportSessionBuilder {
        TransportSessionBuilder {
            settle_delay: None,
            max_response_len: None,
            response_check: None,
        }
    }
}

impl<C: DuplexChannel> TransportSession<C> {
    pub fn new(channel: C) -> Self {
        TransportSession::builder().build(channel)
    }

    /// Write `frame`, wait the settle delay, then read whatever the drive sent back.
    ///
    /// Channel failures are reported through the returned result, never as a
    /// panic or an `Err`. Nothing is retried.
    pub fn send(&mut self, frame: &Frame) -> ExchangeResult {
        log::info!("Sending command: {}", frame.description());
        log::debug!("Request: {}", format_hex(frame.as_bytes()));

        match self.begin(frame) {
            Ok(()) => self.finish(frame),
            Err(err) => {
                let result = ExchangeResult::failure(frame.description(), Vec::new(), err.into());
                log_failure(frame, &result);
                result
            }
        }
    }

    /// First half of `send`: put the request on the wire.
    ///
    /// On success the session is left in `AwaitingResponse`.
    pub fn begin(&mut self, frame: &Frame) -> io::Result<()> {
        self.channel.write_frame(frame.as_bytes())?;
        self.state = SessionState::AwaitingResponse;
        Ok(())
    }

    /// Second half of `send`: settle, read the response, return to `Idle`.
    pub fn finish(&mut self, frame: &Frame) -> ExchangeResult {
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        let result = match self.channel.read_response(self.read_len(frame)) {
            Ok(raw) => codec::decode(raw, frame, self.response_check),
            Err(err) => ExchangeResult::failure(frame.description(), Vec::new(), err.into()),
        };
        self.state = SessionState::Idle;

        if result.success {
            log::debug!("Response: {}", format_hex(&result.response));
        } else {
            log_failure(frame, &result);
        }
        result
    }

    /// Strict checking needs the whole echo, which is as long as the request.
    fn read_len(&self, frame: &Frame) -> usize {
        match self.response_check {
            ResponseCheck::Strict => self.max_response_len.max(frame.len()),
            ResponseCheck::Lenient => self.max_response_len,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn max_response_len(&self) -> usize {
        self.max_response_len
    }

    pub fn response_check(&self) -> ResponseCheck {
        self.response_check
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }
}

fn log_failure(frame: &Frame, result: &ExchangeResult) {
    if let Some(err) = &result.error {
        log::warn!("Command {:?} failed: {}", frame.description(), err);
    }
}
