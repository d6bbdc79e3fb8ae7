//! Sound player implementation using rodio.
//!
//! The rodio output stream cannot move between threads, so it lives on a
//! dedicated audio thread. The player only holds the sending side of a
//! channel to that thread, which keeps `play` non-blocking and the player
//! itself `Send + Sync`.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rodio::source::SineWave;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use super::error::SoundError;
use super::SoundKind;

/// Output volume applied to every tone.
const VOLUME: f32 = 0.2;

/// A sound player that uses rodio for audio playback.
pub struct RodioSoundPlayer {
    sender: mpsc::Sender<SoundKind>,
}

impl RodioSoundPlayer {
    /// Creates a new sound player and its audio thread.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new() -> Result<Self, SoundError> {
        let (sender, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("focus-timer-audio".to_string())
            .spawn(move || audio_thread(receiver, ready_tx))
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))??;

        debug!("Audio output stream initialized");
        Ok(Self { sender })
    }

    /// Queues a sound for playback.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::PlaybackError` if the audio thread has stopped.
    pub fn play(&self, kind: SoundKind) -> Result<(), SoundError> {
        self.sender
            .send(kind)
            .map_err(|_| SoundError::PlaybackError("audio thread stopped".to_string()))
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer").finish_non_exhaustive()
    }
}

/// Owns the output stream and plays queued sounds until the player is dropped.
fn audio_thread(receiver: mpsc::Receiver<SoundKind>, ready: mpsc::Sender<Result<(), SoundError>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => {
            let _ = ready.send(Ok(()));
            pair
        }
        Err(e) => {
            let _ = ready.send(Err(SoundError::DeviceNotAvailable(e.to_string())));
            return;
        }
    };

    for kind in receiver {
        if let Err(e) = play_tones(&handle, kind) {
            warn!("Failed to play {:?} sound: {}", kind, e);
        }
    }
    debug!("Audio thread exiting");
}

fn play_tones(handle: &OutputStreamHandle, kind: SoundKind) -> Result<(), SoundError> {
    let sink = Sink::try_new(handle).map_err(|e| SoundError::StreamError(e.to_string()))?;

    for &(frequency, millis) in kind.tones() {
        sink.append(
            SineWave::new(frequency)
                .take_duration(Duration::from_millis(millis))
                .amplify(VOLUME),
        );
    }
    sink.detach(); // Non-blocking: sound continues after function returns

    Ok(())
}

/// Creates a sound player, returning None if audio is unavailable.
///
/// If audio initialization fails, a warning is logged and None is returned.
#[must_use]
pub fn try_create_player() -> Option<Arc<RodioSoundPlayer>> {
    match RodioSoundPlayer::new() {
        Ok(player) => Some(Arc::new(player)),
        Err(e) => {
            warn!("Audio not available, sound disabled: {}", e);
            None
        }
    }
}
