//! Fire-and-forget playback dispatch.

use crate::catalog::TrackResolver;
use crate::player::Player;
use std::sync::Arc;
use std::time::Duration;

/// What the player does with each resolved track.
#[derive(Debug, Clone, Copy)]
pub enum PlaybackMode {
    /// Play every track to completion.
    Full,
    /// Play each track for a fixed window, then stop it.
    Preview(Duration),
}

/// Resolves and plays music for a recognized identity on a worker thread.
///
/// The recognition loop calls [`dispatch`](Self::dispatch) and moves on;
/// resolution and playback failures are logged, never propagated.
pub struct ActionDispatcher {
    resolver: Arc<dyn TrackResolver>,
    player: Player,
    tracks_per_recognition: usize,
    mode: PlaybackMode,
}

impl ActionDispatcher {
    pub fn new(
        resolver: Arc<dyn TrackResolver>,
        player: Player,
        tracks_per_recognition: usize,
        mode: PlaybackMode,
    ) -> Self {
        Self {
            resolver,
            player,
            tracks_per_recognition,
            mode,
        }
    }

    /// Kick off playback for `identity` and return immediately.
    pub fn dispatch(&self, identity: &str) {
        let resolver = Arc::clone(&self.resolver);
        let player = self.player.clone();
        let n = self.tracks_per_recognition;
        let mode = self.mode;
        let identity = identity.to_string();

        std::thread::Builder::new()
            .name("anthem-playback".into())
            .spawn(move || {
                let tracks = match resolver.resolve(&identity, n) {
                    Ok(tracks) => tracks,
                    Err(err) => {
                        tracing::warn!(identity = %identity, error = %err, "track resolution failed");
                        return;
                    }
                };

                tracing::info!(identity = %identity, count = tracks.len(), "dispatching playback");

                let result = match mode {
                    PlaybackMode::Full => player.play(&tracks),
                    PlaybackMode::Preview(window) => player.play_for(&tracks, window),
                };
                if let Err(err) = result {
                    tracing::warn!(identity = %identity, error = %err, "playback failed");
                }
            })
            .expect("failed to spawn playback thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use std::sync::Mutex;

    struct RecordingResolver {
        calls: Arc<Mutex<Vec<(String, usize)>>>,
    }

    impl TrackResolver for RecordingResolver {
        fn resolve(&self, identity: &str, n: usize) -> Result<Vec<String>, CatalogError> {
            self.calls.lock().unwrap().push((identity.to_string(), n));
            Ok(vec!["0".to_string()])
        }
    }

    #[test]
    fn test_dispatch_returns_immediately_and_resolves() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = Arc::new(RecordingResolver { calls: Arc::clone(&calls) });
        // `true` exits instantly so the worker finishes fast.
        let dispatcher = ActionDispatcher::new(
            resolver,
            Player::from_command("true").unwrap(),
            2,
            PlaybackMode::Full,
        );

        dispatcher.dispatch("alice");

        // Worker runs asynchronously; poll briefly for the recorded call.
        for _ in 0..50 {
            if !calls.lock().unwrap().is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(calls.lock().unwrap().as_slice(), &[("alice".to_string(), 2)]);
    }
}
