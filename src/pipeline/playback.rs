//! Timed replay of a track.
//!
//! Each tick reports the sample at the current index and then moves `step_size` samples
//! ahead. Playback halts (without clamping to the last sample) once the next index would
//! run past the end. The timer is a task owned by the controller: stopping aborts it and
//! bumps a generation counter under the same lock, so a tick that was already waiting
//! for the lock sees it is stale and does nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::pipeline::cursor::reading_at_sample;
use crate::sink::{publish_reading, ChartHighlight, ReadoutSink};
use crate::types::readout::PlaybackState;
use crate::types::track::LoadedTrack;

pub struct PlaybackController {
    shared: Arc<Mutex<Player>>,
}

struct Player {
    track: Arc<LoadedTrack>,
    sink: Arc<dyn ReadoutSink>,
    chart: ChartHighlight,
    is_playing: bool,
    current_index: usize,
    step_size: usize,
    tick_interval: Duration,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl PlaybackController {
    pub fn new(track: Arc<LoadedTrack>, sink: Arc<dyn ReadoutSink>, tick_interval: Duration) -> Self {
        let player = Player {
            track,
            sink,
            chart: ChartHighlight::default(),
            is_playing: false,
            current_index: 0,
            step_size: 1,
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            timer: None,
            generation: 0,
        };
        Self {
            shared: Arc::new(Mutex::new(player)),
        }
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.shared).state()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.shared).is_playing
    }

    /// Begins ticking from the current index. Needs a Tokio runtime; a no-op while
    /// already playing or when the track has fewer than two samples.
    pub fn start(&self) {
        let mut player = lock(&self.shared);
        start_locked(&self.shared, &mut player);
    }

    /// Cancels the timer; the current index is kept.
    pub fn stop(&self) {
        let mut player = lock(&self.shared);
        if player.is_playing {
            tracing::info!("Playback stopped at index {}", player.current_index);
        }
        player.halt();
    }

    pub fn toggle(&self) {
        let mut player = lock(&self.shared);
        if player.is_playing {
            tracing::info!("Playback paused at index {}", player.current_index);
            player.halt();
        } else {
            start_locked(&self.shared, &mut player);
        }
    }

    /// Stops, rewinds to the first sample and reports it immediately.
    pub fn reset(&self) {
        let mut player = lock(&self.shared);
        player.halt();
        player.current_index = 0;
        if !player.track.track.is_empty() {
            player.emit(0);
        }
        tracing::info!("Playback reset");
    }

    /// Samples advanced per tick: `floor(multiplier)`, never below 1 nor above the track
    /// length. A running timer is replaced so the next tick already uses the new step.
    pub fn set_speed(&self, multiplier: f64) {
        let mut player = lock(&self.shared);
        let step_size = step_for_multiplier(multiplier).min(player.track.track.len().max(1));
        player.step_size = step_size;
        tracing::info!("Playback step size set to {}", step_size);

        if player.is_playing {
            player.halt();
            start_locked(&self.shared, &mut player);
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        lock(&self.shared).halt();
    }
}

impl Player {
    fn state(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.is_playing,
            current_index: self.current_index,
            step_size: self.step_size,
            tick_interval_ms: self.tick_interval.as_millis() as u64,
        }
    }

    fn halt(&mut self) {
        self.is_playing = false;
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Returns false once playback has run off the end.
    fn tick(&mut self) -> bool {
        let next_index = self.current_index.saturating_add(self.step_size);
        if next_index >= self.track.track.len() {
            tracing::info!("Playback finished at index {}", self.current_index);
            self.is_playing = false;
            self.generation += 1;
            // this task is the timer; dropping the handle just detaches it
            self.timer = None;
            return false;
        }

        tracing::debug!("Playback tick {} -> {}", self.current_index, next_index);
        self.emit(self.current_index);
        self.current_index = next_index;
        true
    }

    fn emit(&mut self, index: usize) {
        let Some(reading) = reading_at_sample(&self.track, index) else {
            return;
        };
        publish_reading(self.sink.as_ref(), &reading);
        self.chart.highlight(self.sink.as_ref(), index);
    }
}

fn start_locked(shared: &Arc<Mutex<Player>>, player: &mut Player) {
    if player.is_playing {
        return;
    }
    if player.track.track.len() < 2 {
        tracing::debug!("Playback not started: track has {} samples", player.track.track.len());
        return;
    }

    player.is_playing = true;
    player.generation += 1;
    let generation = player.generation;
    let period = player.tick_interval;
    player.timer = Some(tokio::spawn(run_timer(Arc::downgrade(shared), generation, period)));

    tracing::info!(
        "Playback started at index {} (step {}, every {:?})",
        player.current_index,
        player.step_size,
        period
    );
}

async fn run_timer(shared: Weak<Mutex<Player>>, generation: u64, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(strong) = shared.upgrade() else {
            break;
        };
        let mut player = lock(&strong);
        if player.generation != generation || !player.tick() {
            break;
        }
    }
}

fn step_for_multiplier(multiplier: f64) -> usize {
    if multiplier.is_finite() && multiplier >= 1.0 {
        multiplier.floor() as usize
    } else {
        1
    }
}

fn lock(shared: &Mutex<Player>) -> MutexGuard<'_, Player> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
