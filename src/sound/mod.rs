//! Sound playback for timer transitions.
//!
//! Three short generated tones mark the start of a focus interval, the
//! start of a break, and the completion of a focus interval. Playback is
//! fire-and-forget and degrades silently when no audio device exists.

mod error;
mod player;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use error::SoundError;
pub use player::{try_create_player, RodioSoundPlayer};

/// The sounds the timer can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundKind {
    /// A focus interval started (or a break ended)
    Start,
    /// A break started
    Break,
    /// A focus interval completed
    Complete,
}

impl SoundKind {
    /// Tone sequence as `(frequency Hz, duration ms)` pairs.
    pub fn tones(&self) -> &'static [(f32, u64)] {
        match self {
            SoundKind::Start => &[(660.0, 150), (880.0, 200)],
            SoundKind::Break => &[(523.25, 250), (392.0, 300)],
            SoundKind::Complete => &[(880.0, 150), (660.0, 150), (880.0, 300)],
        }
    }
}

/// Trait for sound playback implementations.
pub trait SoundPlayer: Send + Sync {
    /// Plays a sound. Must not block on playback.
    ///
    /// # Errors
    ///
    /// Returns an error if playback could not be started.
    fn play(&self, kind: SoundKind) -> Result<(), SoundError>;
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, kind: SoundKind) -> Result<(), SoundError> {
        RodioSoundPlayer::play(self, kind)
    }
}

/// Mock sound player for testing.
#[derive(Debug, Default)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<SoundKind>>,
    should_fail: AtomicBool,
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.lock().unwrap().len()
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<SoundKind> {
        self.play_calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.play_calls.lock().unwrap().clear();
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, kind: SoundKind) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        self.play_calls.lock().unwrap().push(kind);
        Ok(())
    }
}
