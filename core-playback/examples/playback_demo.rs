//! # Player Usage Example
//!
//! Drives the playback session manager against a simulated engine and
//! in-memory stores: load with a saved position, play, skip, change speed,
//! then destroy.
//!
//! Run with: `cargo run --example playback_demo --package core-playback`

use anyhow::Context;
use async_trait::async_trait;
use bridge_traits::time::LogLevel;
use bridge_traits::{
    AudioEngine, AudioEngineFactory, Book, BookId, EngineLoad, EngineOptions, MemoryResource,
    Progress, ProgressStore, Settings, SettingsPatch, SettingsStore,
};
use bytes::Bytes;
use chrono::Utc;
use core_playback::{Player, PlayerConfig};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Simulated engine: one byte of payload is one second of audio
// ============================================================================

struct SimulatedEngine {
    duration: f64,
    base_position: f64,
    playing_since: Option<Instant>,
    rate: f64,
}

impl SimulatedEngine {
    fn elapsed(&self) -> f64 {
        self.playing_since
            .map_or(0.0, |since| since.elapsed().as_secs_f64() * self.rate)
    }
}

impl AudioEngine for SimulatedEngine {
    fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        self.base_position = self.position();
        self.playing_since = None;
    }

    fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn position(&self) -> f64 {
        (self.base_position + self.elapsed()).min(self.duration)
    }

    fn set_position(&mut self, seconds: f64) {
        self.base_position = seconds;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
    }

    fn rate(&self) -> f64 {
        self.rate
    }

    fn set_rate(&mut self, rate: f64) {
        self.base_position = self.position();
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        self.rate = rate;
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn duration(&self) -> f64 {
        self.duration
    }

    fn unload(&mut self) {
        self.playing_since = None;
        println!("  [engine] unloaded");
    }
}

struct SimulatedFactory;

impl AudioEngineFactory for SimulatedFactory {
    fn create(&self, bytes: Bytes, options: EngineOptions) -> EngineLoad {
        let engine = SimulatedEngine {
            duration: bytes.len() as f64,
            base_position: 0.0,
            playing_since: None,
            rate: options.initial_rate,
        };

        let (load, mut notifier) = EngineLoad::channel(Box::new(engine));
        // Decoding happens off-thread in a real engine.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            notifier.ready();
            // Keep the event channel open for the lifetime of the demo.
            std::future::pending::<()>().await;
        });
        load
    }
}

// ============================================================================
// In-memory stores
// ============================================================================

#[derive(Default)]
struct DemoProgressStore {
    positions: Mutex<HashMap<BookId, f64>>,
}

#[async_trait]
impl ProgressStore for DemoProgressStore {
    async fn load(&self, book_id: &BookId) -> bridge_traits::Result<Option<Progress>> {
        Ok(self.positions.lock().get(book_id).map(|position| Progress {
            book_id: book_id.clone(),
            position: *position,
            last_updated: Utc::now(),
        }))
    }

    async fn save(&self, book_id: &BookId, position: f64) -> bridge_traits::Result<()> {
        println!("  [store] {} saved at {:.1}s", book_id, position);
        self.positions.lock().insert(book_id.clone(), position);
        Ok(())
    }
}

#[derive(Default)]
struct DemoSettingsStore {
    settings: Mutex<Settings>,
}

#[async_trait]
impl SettingsStore for DemoSettingsStore {
    async fn load(&self) -> bridge_traits::Result<Settings> {
        Ok(*self.settings.lock())
    }

    async fn save(&self, patch: SettingsPatch) -> bridge_traits::Result<()> {
        let mut settings = self.settings.lock();
        *settings = settings.merged(&patch);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(
        LoggingConfig::default()
            .with_format(LogFormat::Compact)
            .with_level(LogLevel::Info),
    )
    .context("installing the log subscriber")?;

    println!("=== Player Demo ===\n");

    let progress = Arc::new(DemoProgressStore::default());
    progress.positions.lock().insert(BookId::new("dune"), 120.0);

    let config = CoreConfig::builder()
        .progress_store(progress.clone())
        .settings_store(Arc::new(DemoSettingsStore::default()))
        .engine_factory(Arc::new(SimulatedFactory))
        .build()?;

    let player = Player::new(
        &config,
        PlayerConfig::default().with_autosave_interval(Duration::from_millis(200)),
    )?;

    let _subscription = player.subscribe(|state| {
        println!(
            "  [state] playing={} position={:.1}/{:.1} speed={}",
            state.is_playing, state.current_position, state.duration, state.speed
        );
    });

    let book = Book::new("dune", "Dune", "dune.m4b").with_author("Frank Herbert");
    let resource = MemoryResource::new("dune.m4b", vec![0u8; 3600]);

    println!("Loading '{}'...", book.title);
    player.load_book(book, &resource).await?;

    println!("\nPlaying...");
    player.play()?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\nSkipping forward and speeding up...");
    player.skip_forward(None)?;
    player.set_speed(1.5)?;

    println!("\nSeeking near the end...");
    player.seek(3590.0)?;
    player.skip_forward(Some(60.0))?;

    println!("\nPausing...");
    player.pause()?;

    println!("\nInvalid speed is rejected: {}", player.set_speed(3.0).unwrap_err());

    println!("\nDestroying...");
    player.destroy();
    player.flush().await;

    println!(
        "\nSaved progress: {:?}",
        player
            .saved_progress(&BookId::new("dune"))
            .await
            .map(|progress| progress.position)
    );

    Ok(())
}
