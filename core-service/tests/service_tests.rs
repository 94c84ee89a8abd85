//! Integration tests for the core service façade

use async_trait::async_trait;
use bridge_traits::{
    AudioEngine, AudioEngineFactory, Book, BookId, EngineLoad, EngineNotifier, EngineOptions,
    MemoryResource, Progress, ProgressStore, Settings, SettingsPatch, SettingsStore,
};
use bytes::Bytes;
use core_service::{
    CoreConfig, CoreError, CoreEvent, CoreService, PlaybackEvent, PlayerConfig,
};
use mockall::mock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct StubEngine {
    playing: bool,
    position: f64,
    rate: f64,
    duration: f64,
}

impl AudioEngine for StubEngine {
    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn duration(&self) -> f64 {
        self.duration
    }

    fn unload(&mut self) {
        self.playing = false;
    }
}

/// Engines are ready immediately; notifiers are kept so event channels stay open.
#[derive(Default)]
struct StubFactory {
    notifiers: Mutex<Vec<EngineNotifier>>,
    options: Mutex<Vec<EngineOptions>>,
}

impl AudioEngineFactory for StubFactory {
    fn create(&self, bytes: Bytes, options: EngineOptions) -> EngineLoad {
        let engine = StubEngine {
            playing: false,
            position: 0.0,
            rate: options.initial_rate,
            duration: bytes.len() as f64,
        };
        let (load, mut notifier) = EngineLoad::channel(Box::new(engine));
        notifier.ready();
        self.notifiers.lock().unwrap().push(notifier);
        self.options.lock().unwrap().push(options);
        load
    }
}

mock! {
    ProgressStore {}

    #[async_trait]
    impl ProgressStore for ProgressStore {
        async fn load(&self, book_id: &BookId) -> bridge_traits::Result<Option<Progress>>;
        async fn save(&self, book_id: &BookId, position: f64) -> bridge_traits::Result<()>;
    }
}

mock! {
    SettingsStore {}

    #[async_trait]
    impl SettingsStore for SettingsStore {
        async fn load(&self) -> bridge_traits::Result<Settings>;
        async fn save(&self, patch: SettingsPatch) -> bridge_traits::Result<()>;
    }
}

fn book() -> Book {
    Book::new("dune", "Dune", "dune.m4b")
}

fn resource() -> MemoryResource {
    MemoryResource::new("dune.m4b", vec![0u8; 3600])
}

#[tokio::test]
async fn test_missing_capability_is_reported() {
    let err = CoreConfig::builder()
        .settings_store(Arc::new(MockSettingsStore::new()))
        .engine_factory(Arc::new(StubFactory::default()))
        .build()
        .map_err(CoreError::from)
        .unwrap_err();

    match err {
        CoreError::CapabilityMissing { capability, .. } => {
            assert_eq!(capability, "ProgressStore");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_service_publishes_player_events() {
    let mut progress = MockProgressStore::new();
    progress.expect_load().returning(|_| Ok(None));
    progress.expect_save().returning(|_, _| Ok(()));

    let mut settings = MockSettingsStore::new();
    settings.expect_load().returning(|| Ok(Settings::default()));

    let config = CoreConfig::builder()
        .progress_store(Arc::new(progress))
        .settings_store(Arc::new(settings))
        .engine_factory(Arc::new(StubFactory::default()))
        .build()
        .unwrap();

    let service = CoreService::new(config, PlayerConfig::default()).unwrap();
    let mut events = service.subscribe_events();

    service.player().load_book(book(), &resource()).await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        CoreEvent::Playback(PlaybackEvent::Loaded {
            book_id,
            duration_ms,
            ..
        }) => {
            assert_eq!(book_id, "dune");
            assert_eq!(duration_ms, 3_600_000);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    service.shutdown().await;
    assert!(service.player().get_current_book().is_none());
}

#[tokio::test]
async fn test_invalid_player_config_is_rejected() {
    let config = CoreConfig::builder()
        .progress_store(Arc::new(MockProgressStore::new()))
        .settings_store(Arc::new(MockSettingsStore::new()))
        .engine_factory(Arc::new(StubFactory::default()))
        .build()
        .unwrap();

    let result = CoreService::new(
        config,
        PlayerConfig::default().with_autosave_interval(Duration::ZERO),
    );
    assert!(matches!(result, Err(CoreError::Playback(_))));
}

#[cfg(feature = "desktop-shims")]
#[tokio::test]
async fn test_desktop_bootstrap_restores_progress_and_speed() {
    use core_service::bootstrap_desktop;

    let dir = std::env::temp_dir().join(format!("core-service-{}", std::process::id()));
    let _ = tokio::fs::remove_dir_all(&dir).await;
    let db_path = dir.join("player.db");

    {
        let service = bootstrap_desktop(
            &db_path,
            Arc::new(StubFactory::default()),
            PlayerConfig::default(),
        )
        .await
        .unwrap();

        service.player().load_book(book(), &resource()).await.unwrap();
        service.player().seek(754.0).unwrap();
        service.player().set_speed(1.5).unwrap();
        service.shutdown().await;
    }

    let factory = Arc::new(StubFactory::default());
    let service = bootstrap_desktop(&db_path, factory.clone(), PlayerConfig::default())
        .await
        .unwrap();
    service.player().load_book(book(), &resource()).await.unwrap();

    assert_eq!(service.player().get_current_position(), 754.0);
    assert_eq!(service.player().get_state().speed, 1.5);
    assert_eq!(factory.options.lock().unwrap()[0].initial_rate, 1.5);

    service.shutdown().await;
    let _ = tokio::fs::remove_dir_all(&dir).await;
}
