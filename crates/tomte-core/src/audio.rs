//! Ambient audio collaborator port.
//!
//! The narrative layer starts ambient audio at the top of a turn but never
//! owns playback state. The engine implementation is out of scope; hosts
//! supply their own player.

/// Playback interface exposed by the host's audio subsystem.
pub trait AudioPlayer: Send + Sync {
    fn is_playing(&self) -> bool;
    fn play(&self, track: &str, start_offset_secs: f32);
    fn pause(&self);
    fn resume(&self);
    /// Subscribe to playback-state changes. Dropping the returned guard
    /// unsubscribes.
    fn subscribe(&self, callback: Box<dyn Fn(bool) + Send + Sync>) -> AudioSubscription;
}

/// Unsubscribe guard returned by [`AudioPlayer::subscribe`].
pub struct AudioSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl AudioSubscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }
}

impl Drop for AudioSubscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}
