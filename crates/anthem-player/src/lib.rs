//! anthem-player — Track resolution and playback.
//!
//! Maps a recognized identity to a small random selection of playable
//! track references (local files or streaming preview URLs) and plays
//! them sequentially through an external player process. The dispatcher
//! runs the whole thing on a worker thread so the recognition loop never
//! blocks on playback.

pub mod catalog;
pub mod dispatcher;
pub mod player;

pub use catalog::{CatalogError, LocalCatalog, SpotifyCatalog, SpotifyEntry, TrackResolver};
pub use dispatcher::{ActionDispatcher, PlaybackMode};
pub use player::{Player, PlayerError};
