use std::path::Path;
use std::thread;

use crate::codec::{self, Frame};
use crate::config::{CommandPacing, DriveConfig};
use crate::dictionary::{RegisterDictionary, UnknownRegisterError};
use crate::session::{DuplexChannel, TransportSession};
use crate::{ExchangeResult, ServoError};

/// A single servo drive addressed by symbolic register names.
pub struct ServoDrive<C> {
    dictionary: RegisterDictionary,
    session: TransportSession<C>,
    unit_id: u8,
    pacing: CommandPacing,
}

impl<C: DuplexChannel> ServoDrive<C> {
    pub fn new(dictionary: RegisterDictionary, session: TransportSession<C>, unit_id: u8) -> Self {
        ServoDrive {
            dictionary,
            session,
            unit_id,
            pacing: CommandPacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: CommandPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Load the dictionary named in `config` and wrap an already opened channel.
    pub fn open(config: &DriveConfig, channel: C) -> Result<Self, ServoError> {
        let dictionary = RegisterDictionary::load(&config.dictionary)?;
        let session = TransportSession::builder()
            .config(&config.session)
            .build(channel);
        Ok(Self::new(dictionary, session, config.unit_id).with_pacing(config.session.pacing()))
    }

    pub fn from_config_file(path: impl AsRef<Path>, channel: C) -> Result<Self, ServoError> {
        let config = DriveConfig::load(path)?;
        Self::open(&config, channel)
    }

    pub fn command(&self, name: &str, value: i64) -> Result<Frame, UnknownRegisterError> {
        let descriptor = self.dictionary.lookup(name)?;
        Ok(codec::encode(descriptor, value, self.unit_id))
    }

    /// An unknown name is returned as `Err`; everything that can go wrong on
    /// the wire is reported inside the `ExchangeResult`.
    pub fn send_command(
        &mut self,
        name: &str,
        value: i64,
    ) -> Result<ExchangeResult, UnknownRegisterError> {
        let frame = self.command(name, value)?;
        Ok(self.session.send(&frame))
    }

    /// Send `commands` in order, stopping at the first one that fails.
    ///
    /// Every name is resolved before anything is sent, so an unknown register
    /// leaves the drive untouched. The returned results end with the failed
    /// exchange, if any. Between commands the session sleeps for the pacing
    /// pause of the command just sent.
    pub fn run_sequence(
        &mut self,
        commands: &[(&str, i64)],
    ) -> Result<Vec<ExchangeResult>, UnknownRegisterError> {
        let frames = commands
            .iter()
            .map(|&(name, value)| self.command(name, value))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            log::info!("Executing command {}/{}", i + 1, frames.len());
            let result = self.session.send(frame);
            let success = result.success;
            results.push(result);

            if !success {
                log::warn!("Command sequence halted at step {}", i + 1);
                break;
            }
            if i + 1 < frames.len() {
                let pause = self.pacing.pause_after(frame.description());
                if !pause.is_zero() {
                    thread::sleep(pause);
                }
            }
        }
        Ok(results)
    }

    pub fn pacing(&self) -> &CommandPacing {
        &self.pacing
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn dictionary(&self) -> &RegisterDictionary {
        &self.dictionary
    }

    pub fn session(&self) -> &TransportSession<C> {
        &self.session
    }

    pub fn into_channel(self) -> C {
        self.session.into_channel()
    }
}
