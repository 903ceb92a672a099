//! Per-identity track catalogs.
//!
//! A [`TrackResolver`] turns an identity label into an ordered list of at
//! most `n` playable track references, randomly sampled from that
//! identity's catalog. Two backends: local file lists from configuration,
//! and Spotify playlists resolved to 30-second preview URLs via the
//! client-credentials flow.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no catalog configured for identity: {0}")]
    UnknownIdentity(String),
    #[error("catalog for {0} is empty")]
    EmptyCatalog(String),
    #[error("streaming request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected streaming response: {0}")]
    BadResponse(String),
}

/// Resolves an identity to a bounded, randomized track list.
pub trait TrackResolver: Send + Sync {
    /// Return at most `n` track references (paths or URLs) for `identity`,
    /// sampled without replacement from the identity's catalog.
    fn resolve(&self, identity: &str, n: usize) -> Result<Vec<String>, CatalogError>;
}

/// Catalog of local audio file paths keyed by identity.
pub struct LocalCatalog {
    tracks: HashMap<String, Vec<String>>,
}

impl LocalCatalog {
    pub fn new(tracks: HashMap<String, Vec<String>>) -> Self {
        Self { tracks }
    }
}

impl TrackResolver for LocalCatalog {
    fn resolve(&self, identity: &str, n: usize) -> Result<Vec<String>, CatalogError> {
        let all = self
            .tracks
            .get(identity)
            .ok_or_else(|| CatalogError::UnknownIdentity(identity.to_string()))?;

        if all.is_empty() {
            return Err(CatalogError::EmptyCatalog(identity.to_string()));
        }

        let mut rng = rand::thread_rng();
        let picked: Vec<String> = all
            .choose_multiple(&mut rng, n.min(all.len()))
            .cloned()
            .collect();

        Ok(picked)
    }
}

/// Per-identity Spotify credentials and playlist URI.
#[derive(Debug, Clone)]
pub struct SpotifyEntry {
    pub client_id: String,
    pub client_secret: String,
    /// Playlist URI or bare ID ("spotify:playlist:<id>" or "<id>").
    pub playlist: String,
}

/// Spotify-backed catalog.
///
/// Each identity carries its own application credentials, so recognizing
/// a person queries *their* playlist with *their* quota. Only tracks with
/// a preview URL are playable without a premium session, matching the
/// preview-playback contract.
pub struct SpotifyCatalog {
    entries: HashMap<String, SpotifyEntry>,
    http: reqwest::blocking::Client,
    token_url: String,
    api_base: String,
}

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

impl SpotifyCatalog {
    pub fn new(entries: HashMap<String, SpotifyEntry>) -> Self {
        Self {
            entries,
            http: reqwest::blocking::Client::new(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            api_base: SPOTIFY_API_BASE.to_string(),
        }
    }

    /// Override endpoints (tests).
    #[doc(hidden)]
    pub fn with_endpoints(mut self, token_url: &str, api_base: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base = api_base.to_string();
        self
    }

    fn access_token(&self, entry: &SpotifyEntry) -> Result<String, CatalogError> {
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&entry.client_id, Some(&entry.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()?;

        let body = resp.text()?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| CatalogError::BadResponse(format!("token response: {e}")))?;

        json.get("access_token")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| CatalogError::BadResponse("token response missing access_token".into()))
    }

    fn playlist_id(playlist: &str) -> &str {
        playlist.rsplit(':').next().unwrap_or(playlist)
    }

    /// Fetch the playlist and collect the non-null preview URLs.
    fn preview_urls(&self, entry: &SpotifyEntry, token: &str) -> Result<Vec<String>, CatalogError> {
        let id = Self::playlist_id(&entry.playlist);
        let url = format!("{}/playlists/{id}", self.api_base);

        let resp = self.http.get(&url).bearer_auth(token).send()?;
        let body = resp.text()?;
        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| CatalogError::BadResponse(format!("playlist response: {e}")))?;

        let items = json
            .pointer("/tracks/items")
            .and_then(|v| v.as_array())
            .ok_or_else(|| CatalogError::BadResponse("playlist response missing tracks.items".into()))?;

        Ok(items
            .iter()
            .filter_map(|item| item.pointer("/track/preview_url"))
            .filter_map(|u| u.as_str())
            .map(str::to_string)
            .collect())
    }
}

impl TrackResolver for SpotifyCatalog {
    fn resolve(&self, identity: &str, n: usize) -> Result<Vec<String>, CatalogError> {
        let entry = self
            .entries
            .get(identity)
            .ok_or_else(|| CatalogError::UnknownIdentity(identity.to_string()))?;

        let token = self.access_token(entry)?;
        let urls = self.preview_urls(entry, &token)?;

        if urls.is_empty() {
            return Err(CatalogError::EmptyCatalog(identity.to_string()));
        }

        let mut rng = rand::thread_rng();
        Ok(urls
            .choose_multiple(&mut rng, n.min(urls.len()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(identity: &str, tracks: &[&str]) -> LocalCatalog {
        let mut map = HashMap::new();
        map.insert(
            identity.to_string(),
            tracks.iter().map(|s| s.to_string()).collect(),
        );
        LocalCatalog::new(map)
    }

    #[test]
    fn test_local_resolve_bounded_by_n() {
        let catalog = local("alice", &["a.mp3", "b.mp3", "c.mp3"]);
        let tracks = catalog.resolve("alice", 2).unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| ["a.mp3", "b.mp3", "c.mp3"].contains(&t.as_str())));
    }

    #[test]
    fn test_local_resolve_bounded_by_catalog_size() {
        let catalog = local("alice", &["a.mp3"]);
        let tracks = catalog.resolve("alice", 5).unwrap();
        assert_eq!(tracks, vec!["a.mp3".to_string()]);
    }

    #[test]
    fn test_local_resolve_samples_without_replacement() {
        let catalog = local("alice", &["a.mp3", "b.mp3", "c.mp3"]);
        let tracks = catalog.resolve("alice", 3).unwrap();
        let mut sorted = tracks.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 3);
    }

    #[test]
    fn test_local_unknown_identity() {
        let catalog = local("alice", &["a.mp3"]);
        assert!(matches!(
            catalog.resolve("bob", 2),
            Err(CatalogError::UnknownIdentity(_))
        ));
    }

    #[test]
    fn test_local_empty_catalog() {
        let catalog = local("alice", &[]);
        assert!(matches!(
            catalog.resolve("alice", 2),
            Err(CatalogError::EmptyCatalog(_))
        ));
    }

    #[test]
    fn test_playlist_id_from_uri() {
        assert_eq!(SpotifyCatalog::playlist_id("spotify:playlist:37i9dQ"), "37i9dQ");
        assert_eq!(SpotifyCatalog::playlist_id("37i9dQ"), "37i9dQ");
    }

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;

    /// Minimal HTTP stub: serves the given JSON bodies to consecutive
    /// requests in order, ignoring paths.
    fn spawn_stub(bodies: Vec<String>) -> (String, std::thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = std::thread::spawn(move || {
            for body in bodies {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                    }
                }
                if content_length > 0 {
                    let mut buf = vec![0u8; content_length];
                    reader.read_exact(&mut buf).unwrap();
                }

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                reader.get_mut().write_all(response.as_bytes()).unwrap();
            }
        });

        (format!("http://{addr}"), handle)
    }

    fn spotify_catalog(base: &str) -> SpotifyCatalog {
        let mut entries = HashMap::new();
        entries.insert(
            "alice".to_string(),
            SpotifyEntry {
                client_id: "id".into(),
                client_secret: "secret".into(),
                playlist: "spotify:playlist:37i9dQ".into(),
            },
        );
        SpotifyCatalog::new(entries)
            .with_endpoints(&format!("{base}/api/token"), &format!("{base}/v1"))
    }

    #[test]
    fn test_spotify_resolve_keeps_only_tracks_with_previews() {
        let token = r#"{"access_token":"tok","token_type":"Bearer"}"#.to_string();
        let playlist = r#"{"tracks":{"items":[
            {"track":{"preview_url":"http://cdn/a.mp3"}},
            {"track":{"preview_url":null}},
            {"track":null},
            {"track":{"preview_url":"http://cdn/b.mp3"}}
        ]}}"#
            .to_string();
        let (base, handle) = spawn_stub(vec![token, playlist]);

        let catalog = spotify_catalog(&base);
        let mut tracks = catalog.resolve("alice", 5).unwrap();
        handle.join().unwrap();

        tracks.sort();
        assert_eq!(
            tracks,
            vec!["http://cdn/a.mp3".to_string(), "http://cdn/b.mp3".to_string()]
        );
    }

    #[test]
    fn test_spotify_malformed_token_response() {
        let (base, handle) = spawn_stub(vec!["not json".to_string()]);

        let catalog = spotify_catalog(&base);
        assert!(matches!(
            catalog.resolve("alice", 2),
            Err(CatalogError::BadResponse(_))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_spotify_token_response_missing_access_token() {
        let (base, handle) = spawn_stub(vec![r#"{"error":"invalid_client"}"#.to_string()]);

        let catalog = spotify_catalog(&base);
        assert!(matches!(
            catalog.resolve("alice", 2),
            Err(CatalogError::BadResponse(_))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_spotify_playlist_response_missing_items() {
        let token = r#"{"access_token":"tok"}"#.to_string();
        let (base, handle) = spawn_stub(vec![token, r#"{"name":"mix"}"#.to_string()]);

        let catalog = spotify_catalog(&base);
        assert!(matches!(
            catalog.resolve("alice", 2),
            Err(CatalogError::BadResponse(_))
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_spotify_all_previews_null_is_empty_catalog() {
        let token = r#"{"access_token":"tok"}"#.to_string();
        let playlist =
            r#"{"tracks":{"items":[{"track":{"preview_url":null}}]}}"#.to_string();
        let (base, handle) = spawn_stub(vec![token, playlist]);

        let catalog = spotify_catalog(&base);
        assert!(matches!(
            catalog.resolve("alice", 2),
            Err(CatalogError::EmptyCatalog(_))
        ));
        handle.join().unwrap();
    }
}
