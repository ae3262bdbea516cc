//! Fire-and-forget sound playback.
//!
//! Game logic never talks to the backend's audio directly. It sends
//! [`AudioCmd`]s through an [`AudioHandle`]; the [`AudioService`] applies
//! them at the tick boundary with [`AudioService::pump`]. A failed request is
//! logged and parked on the failure channel as
//! [`EngineError::SoundPlayback`], and never reaches the code that sent it.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::{trace, warn};

use runner_assets::backend::{AssetBackend, PlayOptions};
use runner_assets::key::ResourceKey;

use crate::error::EngineError;

/// A request for the audio backend.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCmd {
    Play { key: ResourceKey, options: PlayOptions },
    Stop { key: ResourceKey },
    Pause { key: ResourceKey },
    Resume { key: ResourceKey },
}

impl AudioCmd {
    pub fn key(&self) -> &ResourceKey {
        match self {
            AudioCmd::Play { key, .. }
            | AudioCmd::Stop { key }
            | AudioCmd::Pause { key }
            | AudioCmd::Resume { key } => key,
        }
    }
}

/// Cheap sending side, cloned into whoever needs to make noise.
#[derive(Debug, Clone)]
pub struct AudioHandle {
    tx_cmd: Sender<AudioCmd>,
}

impl AudioHandle {
    pub fn play(&self, key: impl Into<ResourceKey>, options: PlayOptions) {
        self.send(AudioCmd::Play {
            key: key.into(),
            options,
        });
    }

    pub fn stop(&self, key: impl Into<ResourceKey>) {
        self.send(AudioCmd::Stop { key: key.into() });
    }

    pub fn pause(&self, key: impl Into<ResourceKey>) {
        self.send(AudioCmd::Pause { key: key.into() });
    }

    pub fn resume(&self, key: impl Into<ResourceKey>) {
        self.send(AudioCmd::Resume { key: key.into() });
    }

    fn send(&self, cmd: AudioCmd) {
        // The service owns the receiver; a closed channel means it is gone
        // and there is nobody left to hear the sound.
        if self.tx_cmd.send(cmd).is_err() {
            trace!("audio service dropped, command discarded");
        }
    }
}

/// Failures kept for [`AudioService::take_failures`]; older ones stay,
/// newer ones are dropped once the queue is full.
pub const MAX_QUEUED_FAILURES: usize = 64;

/// Single consumer of audio commands.
#[derive(Debug)]
pub struct AudioService {
    tx_cmd: Sender<AudioCmd>,
    rx_cmd: Receiver<AudioCmd>,
    tx_failure: Sender<EngineError>,
    rx_failure: Receiver<EngineError>,
}

impl Default for AudioService {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioService {
    pub fn new() -> Self {
        let (tx_cmd, rx_cmd) = unbounded();
        let (tx_failure, rx_failure) = bounded(MAX_QUEUED_FAILURES);
        Self {
            tx_cmd,
            rx_cmd,
            tx_failure,
            rx_failure,
        }
    }

    pub fn handle(&self) -> AudioHandle {
        AudioHandle {
            tx_cmd: self.tx_cmd.clone(),
        }
    }

    /// Apply every queued command. Returns how many were processed.
    pub fn pump(&self, backend: &mut dyn AssetBackend) -> usize {
        let mut processed = 0;
        while let Ok(cmd) = self.rx_cmd.try_recv() {
            processed += 1;
            let result = match &cmd {
                AudioCmd::Play { key, options } => backend.play_sound(key, *options),
                AudioCmd::Stop { key } => backend.stop_sound(key),
                AudioCmd::Pause { key } => backend.pause_sound(key),
                AudioCmd::Resume { key } => backend.resume_sound(key),
            };
            if let Err(source) = result {
                let error = EngineError::SoundPlayback {
                    key: cmd.key().clone(),
                    source,
                };
                warn!(error = %error, "sound request failed");
                if let Err(TrySendError::Full(_)) = self.tx_failure.try_send(error) {
                    trace!("failure queue full, dropping");
                }
            }
        }
        processed
    }

    /// Commands not yet pumped.
    pub fn pending(&self) -> usize {
        self.rx_cmd.len()
    }

    /// Drop queued commands without running them.
    pub fn discard_pending(&self) {
        while self.rx_cmd.try_recv().is_ok() {}
    }

    /// Failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<EngineError> {
        self.rx_failure.try_iter().collect()
    }
}
