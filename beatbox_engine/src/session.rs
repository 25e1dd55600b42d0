use std::sync::Arc;

use beatbox_shared::{InstrumentKit, PatternGrid, SessionConfig, Timeline};
use crossbeam_channel::Receiver;

use crate::identity::LocalIdentity;
use crate::player::PlaybackEngine;
use crate::remote_store::RemotePatternStore;
use crate::sync::{ChannelState, SyncChannel, SyncError, SyncEvent};
use crate::tempo::TempoController;
use crate::track::TrackBuilder;

/// Everything a front end drives: the live grid, tempo, playback and the
/// relay connection.
///
/// The session lives on the editing thread. Only the sync channel's receive
/// thread runs elsewhere, and it touches nothing here except the shared
/// remote store.
pub struct BeatBoxSession {
    config: SessionConfig,
    grid: PatternGrid,
    kit: InstrumentKit,
    builder: TrackBuilder,
    tempo: TempoController,
    identity: LocalIdentity,
    store: Arc<RemotePatternStore>,
    channel: SyncChannel,
    player: Box<dyn PlaybackEngine>,
}

impl BeatBoxSession {
    pub fn new(config: SessionConfig, player: Box<dyn PlaybackEngine>) -> Self {
        Self::with_kit(config, InstrumentKit::default(), player)
    }

    pub fn with_kit(config: SessionConfig, kit: InstrumentKit, player: Box<dyn PlaybackEngine>) -> Self {
        let store = Arc::new(RemotePatternStore::new());
        let channel = SyncChannel::new(store.clone(), config.relay.decode_policy);
        let identity = LocalIdentity::resolve(&config.user_name);
        let tempo = TempoController::from_config(&config.tempo);

        Self {
            config,
            grid: PatternGrid::new(),
            kit,
            builder: TrackBuilder::default(),
            tempo,
            identity,
            store,
            channel,
            player,
        }
    }

    /// Connects to the configured relay. On failure the session keeps
    /// working locally and sends report `NotConnected`.
    pub fn connect(&mut self) -> Result<(), SyncError> {
        let address = self.config.relay.address.clone();
        self.channel.connect(address.as_str())
    }

    pub fn disconnect(&mut self) {
        self.channel.close();
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn events(&self) -> Receiver<SyncEvent> {
        self.channel.events()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn kit(&self) -> &InstrumentKit {
        &self.kit
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn store(&self) -> &Arc<RemotePatternStore> {
        &self.store
    }

    // --- grid ---

    pub fn current_grid(&self) -> PatternGrid {
        self.grid.clone()
    }

    pub fn grid(&self) -> &PatternGrid {
        &self.grid
    }

    pub fn set_grid(&mut self, grid: PatternGrid) {
        self.grid = grid;
    }

    pub fn toggle(&mut self, row: usize, step: usize) {
        self.grid.toggle(row, step);
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    // --- playback ---

    pub fn build_timeline(&self) -> Timeline {
        self.builder.build(&self.grid, &self.kit)
    }

    /// Rebuilds the timeline from the live grid and starts looping it
    pub fn play(&mut self) -> Result<(), anyhow::Error> {
        let timeline = self.build_timeline();
        self.player.load(&timeline)?;
        self.player.set_tempo_factor(self.tempo.factor());
        self.player.start()?;
        tracing::debug!("[Session] Playing {} events at {:.1} BPM", timeline.len(), self.current_bpm());
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), anyhow::Error> {
        self.player.stop()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    // --- tempo ---

    pub fn adjust_tempo(&mut self, multiplier: f64) {
        self.tempo.adjust(multiplier);
        self.player.set_tempo_factor(self.tempo.factor());
    }

    pub fn tempo_up(&mut self) {
        self.tempo.tempo_up();
        self.player.set_tempo_factor(self.tempo.factor());
    }

    pub fn tempo_down(&mut self) {
        self.tempo.tempo_down();
        self.player.set_tempo_factor(self.tempo.factor());
    }

    pub fn current_bpm(&self) -> f64 {
        self.tempo.current_bpm()
    }

    pub fn tempo(&self) -> &TempoController {
        &self.tempo
    }

    // --- remote patterns ---

    pub fn ordered_labels(&self) -> Vec<String> {
        self.store.ordered_labels()
    }

    pub fn lookup(&self, label: &str) -> Option<PatternGrid> {
        self.store.lookup(label)
    }

    /// Loads a received pattern into the live grid and restarts playback
    /// with it. Returns false if nothing is stored under `label`.
    pub fn select_remote(&mut self, label: &str) -> Result<bool, anyhow::Error> {
        let Some(grid) = self.store.lookup(label) else {
            return Ok(false);
        };
        self.grid = grid;
        self.player.stop()?;
        self.play()?;
        Ok(true)
    }

    /// Shares the live grid. Returns the label it went out under.
    pub fn send(&mut self, message: &str) -> Result<String, SyncError> {
        let label = self.identity.label_for(message);
        self.channel.send(&label, &self.grid)?;
        self.identity.advance();
        tracing::info!("[Session] Shared '{}'", label);
        Ok(label)
    }
}
