use crate::config::Config;
use crate::error::LoadError;
use crate::pipeline::cursor::CursorResolver;
use crate::pipeline::load;
use crate::pipeline::playback::PlaybackController;
use crate::sink::{BroadcastSink, ReadoutEvent, ReadoutSink};
use crate::types::catalog::{Catalog, CatalogEntry};
use crate::types::track::LoadedTrack;
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    cache: Arc<DashMap<String, CachedTrack>>,
    session: Arc<RwLock<Option<Session>>>,
    loading: Arc<tokio::sync::Mutex<()>>,
    events: BroadcastSink,
}

struct CachedTrack {
    track: Arc<LoadedTrack>,
    inserted_at: Instant,
}

/// The active track and the components bound to it. Replaced as a whole on every load.
pub struct Session {
    pub track: Arc<LoadedTrack>,
    pub cursor: CursorResolver,
    pub player: PlaybackController,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let catalog = match Catalog::load(&config.catalog_path) {
            Ok(catalog) => {
                tracing::info!("Loaded {} catalog entries", catalog.entries.len());
                catalog
            }
            Err(e) => {
                tracing::warn!("Track catalog unavailable: {}", e);
                Catalog::default()
            }
        };
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: Config, catalog: Catalog) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            cache: Arc::new(DashMap::new()),
            session: Arc::new(RwLock::new(None)),
            loading: Arc::new(tokio::sync::Mutex::new(())),
            events: BroadcastSink::new(EVENT_CAPACITY),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadoutEvent> {
        self.events.subscribe()
    }

    /// Loads a catalog entry and makes it the active track. Playback is stopped first;
    /// on failure the previous track stays active and stopped.
    pub async fn select(&self, entry: &CatalogEntry) -> Result<Arc<LoadedTrack>, LoadError> {
        let _loading = self.loading.lock().await;
        self.stop_playback();

        let location = self.catalog.resolve(entry);
        let track = match self.cached(&location) {
            Some(track) => {
                tracing::info!("Track '{}' served from cache", entry.name);
                track
            }
            None => match load::load_from(&entry.name, &location).await {
                Ok(track) => {
                    let track = Arc::new(track);
                    self.insert(location, track.clone());
                    track
                }
                Err(e) => {
                    // playback may have been restarted while the fetch was pending
                    self.stop_playback();
                    return Err(e);
                }
            },
        };

        self.activate(track.clone());
        Ok(track)
    }

    /// Parses an uploaded file and makes it the active track.
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> Result<Arc<LoadedTrack>, LoadError> {
        let _loading = self.loading.lock().await;
        self.stop_playback();

        let track = Arc::new(load::load_bytes(name, bytes)?);
        self.activate(track.clone());
        Ok(track)
    }

    fn activate(&self, track: Arc<LoadedTrack>) {
        let sink: Arc<dyn ReadoutSink> = Arc::new(self.events.clone());
        let session = Session {
            cursor: CursorResolver::new(track.clone(), sink.clone()),
            player: PlaybackController::new(track.clone(), sink, self.config.tick_interval),
            track,
        };

        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.as_ref() {
            previous.player.stop();
        }
        *slot = Some(session);
    }

    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> Option<R> {
        let slot = self.session.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(f)
    }

    pub fn stop_playback(&self) {
        self.with_session(|session| session.player.stop());
    }

    fn cached(&self, location: &str) -> Option<Arc<LoadedTrack>> {
        self.cache.get(location).map(|entry| entry.track.clone())
    }

    fn insert(&self, location: String, track: Arc<LoadedTrack>) {
        self.cache.insert(
            location,
            CachedTrack {
                track,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn evict_expired(&self, ttl: Duration) {
        let now = Instant::now();
        self.cache.retain(|_, cached| now.duration_since(cached.inserted_at) < ttl);
        tracing::info!("Cache eviction complete. Current size: {}", self.cache.len());
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const GPX: &str = r#"<gpx version="1.1">
  <wpt lat="41.0005" lon="0.5"><name>Midway</name></wpt>
  <trk><trkseg>
    <trkpt lat="41.000" lon="0.5"><ele>100</ele></trkpt>
    <trkpt lat="41.001" lon="0.5"><ele>105</ele></trkpt>
    <trkpt lat="41.002" lon="0.5"><ele>103</ele></trkpt>
  </trkseg></trk>
</gpx>"#;

    fn state_with(entries: Vec<CatalogEntry>, base_dir: &std::path::Path) -> AppState {
        AppState::with_catalog(Config::from_env(), Catalog::new(entries, base_dir))
    }

    fn write_track(dir: &std::path::Path, name: &str, body: &str) {
        let mut file = std::fs::File::create(dir.join(name)).expect("create");
        file.write_all(body.as_bytes()).expect("write");
    }

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("trackplay-{}-{}", tag, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    #[tokio::test]
    async fn select_loads_and_caches() {
        let dir = scratch_dir("select");
        write_track(&dir, "loop.gpx", GPX);
        let entry = CatalogEntry {
            name: "Loop".into(),
            path: "loop.gpx".into(),
        };
        let state = state_with(vec![entry.clone()], &dir);

        let first = state.select(&entry).await.expect("select");
        assert_eq!(first.track.len(), 3);
        assert_eq!(first.track.features.len(), 1);
        assert_eq!(state.cache_len(), 1);

        let second = state.select(&entry).await.expect("select");
        assert_eq!(first.id, second.id);

        state.evict_expired(Duration::ZERO);
        assert_eq!(state.cache_len(), 0);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_track_and_stops_playback() {
        let dir = scratch_dir("failed");
        write_track(&dir, "good.gpx", GPX);
        write_track(&dir, "bad.gpx", "<gpx><trk></gpx>");
        let good = CatalogEntry { name: "Good".into(), path: "good.gpx".into() };
        let bad = CatalogEntry { name: "Bad".into(), path: "bad.gpx".into() };
        let state = state_with(vec![good.clone(), bad.clone()], &dir);

        let loaded = state.select(&good).await.expect("select");
        state.with_session(|s| s.player.start()).expect("session");
        assert_eq!(state.with_session(|s| s.player.is_playing()), Some(true));

        assert!(state.select(&bad).await.is_err());
        assert_eq!(state.with_session(|s| s.track.id), Some(loaded.id));
        assert_eq!(state.with_session(|s| s.player.is_playing()), Some(false));
    }

    #[tokio::test]
    async fn playback_started_during_a_failing_fetch_is_stopped() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("http://{}/slow.gpx", listener.local_addr().expect("addr"));
        let remote = CatalogEntry { name: "Slow".into(), path: url };
        let state = state_with(vec![remote.clone()], std::path::Path::new("."));
        state.upload("local.gpx", GPX.as_bytes()).await.expect("upload");

        let loader = state.clone();
        let pending = tokio::spawn(async move { loader.select(&remote).await });

        let (socket, _) = listener.accept().await.expect("accept");
        state.with_session(|s| s.player.start()).expect("session");
        assert_eq!(state.with_session(|s| s.player.is_playing()), Some(true));
        drop(socket);

        let result = pending.await.expect("join");
        assert!(matches!(result, Err(LoadError::Fetch(_))));
        assert_eq!(state.with_session(|s| s.track.name.clone()), Some("local.gpx".to_string()));
        assert_eq!(state.with_session(|s| s.player.is_playing()), Some(false));
    }

    #[tokio::test]
    async fn upload_replaces_the_active_session() {
        let state = state_with(vec![], std::path::Path::new("."));
        assert!(state.with_session(|_| ()).is_none());

        let first = state.upload("a.gpx", GPX.as_bytes()).await.expect("upload");
        state.with_session(|s| s.player.start());

        let second = state.upload("b.gpx", GPX.as_bytes()).await.expect("upload");
        assert_ne!(first.id, second.id);
        assert_eq!(state.with_session(|s| s.track.name.clone()), Some("b.gpx".to_string()));
        assert_eq!(state.with_session(|s| s.player.is_playing()), Some(false));
    }
}
