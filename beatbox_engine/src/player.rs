use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use beatbox_shared::{TimedEvent, Timeline};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::commands::PlayerCommand;
use crate::transport::{SharedTempo, tick_duration};

/// Longest loop the reference player accepts, in ticks (1024 beats)
pub const MAX_LOOP_TICKS: u64 = 4096;

/// What the session needs from whatever actually makes sound.
pub trait PlaybackEngine: Send {
    /// Replace the looped timeline
    fn load(&mut self, timeline: &Timeline) -> Result<(), anyhow::Error>;

    /// Start looping from tick 0
    fn start(&mut self) -> Result<(), anyhow::Error>;

    fn stop(&mut self) -> Result<(), anyhow::Error>;

    fn set_tempo_factor(&mut self, factor: f64);

    fn tempo_factor(&self) -> f64;

    fn is_playing(&self) -> bool;
}

/// Reference player: a worker thread that walks the timeline tick by tick
/// and pushes each event into a channel when it's due.
///
/// The loop spans ticks `0..end_tick`. Events on `end_tick` itself fire at
/// the wrap, just before the next pass's tick 0.
pub struct LoopPlayer {
    commands: Sender<PlayerCommand>,
    tempo: SharedTempo,
    playing: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl LoopPlayer {
    pub fn new(base_bpm: f64, sink: Sender<TimedEvent>) -> Result<Self, anyhow::Error> {
        let (commands, command_rx) = unbounded();
        let tempo = SharedTempo::default();

        let worker = Worker {
            commands: command_rx,
            sink,
            tempo: tempo.clone(),
            base_bpm,
            buckets: vec![Vec::new()],
            loop_len: 1,
            position: 0,
            playing: false,
        };
        let worker = thread::Builder::new()
            .name("beatbox-player".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            commands,
            tempo,
            playing: Arc::new(AtomicBool::new(false)),
            worker: Some(worker),
        })
    }

    fn command(&self, cmd: PlayerCommand) -> Result<(), anyhow::Error> {
        self.commands
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Player thread is gone"))
    }
}

impl PlaybackEngine for LoopPlayer {
    fn load(&mut self, timeline: &Timeline) -> Result<(), anyhow::Error> {
        let end = timeline.end_tick();
        if end > MAX_LOOP_TICKS {
            anyhow::bail!("Timeline ends at tick {}, the player loops at most {} ticks", end, MAX_LOOP_TICKS);
        }
        self.command(PlayerCommand::Load(timeline.clone()))
    }

    fn start(&mut self) -> Result<(), anyhow::Error> {
        self.command(PlayerCommand::Start)?;
        self.playing.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), anyhow::Error> {
        self.playing.store(false, Ordering::Relaxed);
        self.command(PlayerCommand::Stop)
    }

    fn set_tempo_factor(&mut self, factor: f64) {
        self.tempo.set(factor);
    }

    fn tempo_factor(&self) -> f64 {
        self.tempo.get()
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }
}

impl Drop for LoopPlayer {
    fn drop(&mut self) {
        let _ = self.commands.send(PlayerCommand::Quit);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct Worker {
    commands: Receiver<PlayerCommand>,
    sink: Sender<TimedEvent>,
    tempo: SharedTempo,
    base_bpm: f64,
    /// Events grouped by tick, index = tick
    buckets: Vec<Vec<TimedEvent>>,
    loop_len: usize,
    position: usize,
    playing: bool,
}

impl Worker {
    fn run(mut self) {
        let mut next_tick = Instant::now();
        loop {
            let cmd = if self.playing {
                match self.commands.recv_deadline(next_tick) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match self.commands.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                }
            };

            match cmd {
                Some(PlayerCommand::Load(timeline)) => self.load(&timeline),
                Some(PlayerCommand::Start) => {
                    self.playing = true;
                    self.position = 0;
                    next_tick = Instant::now();
                }
                Some(PlayerCommand::Stop) => self.playing = false,
                Some(PlayerCommand::Quit) => break,
                None => {
                    self.fire_tick();
                    next_tick += tick_duration(self.base_bpm, self.tempo.get());
                }
            }
        }
        tracing::debug!("[Player] Worker finished");
    }

    fn load(&mut self, timeline: &Timeline) {
        let end = timeline.end_tick() as usize;
        let mut buckets = vec![Vec::new(); end + 1];
        for event in timeline {
            buckets[event.tick() as usize].push(*event);
        }
        self.buckets = buckets;
        self.loop_len = end.max(1);
        if self.position > self.loop_len {
            self.position = 0;
        }
    }

    fn fire_tick(&mut self) {
        if self.position >= self.loop_len {
            self.dispatch(self.loop_len);
            self.position = 0;
        }
        self.dispatch(self.position);
        self.position += 1;
    }

    fn dispatch(&self, tick: usize) {
        if let Some(events) = self.buckets.get(tick) {
            for event in events {
                let _ = self.sink.send(*event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackBuilder;
    use beatbox_shared::{InstrumentKit, PatternGrid};
    use std::time::Duration;

    fn one_hit_timeline() -> Timeline {
        let mut grid = PatternGrid::new();
        grid.set(0, 0, true);
        TrackBuilder::new().build(&grid, &InstrumentKit::default())
    }

    #[test]
    fn test_plays_tick_zero_first() {
        let (tx, rx) = unbounded();
        // 6000 BPM: 2.5ms per tick
        let mut player = LoopPlayer::new(6000.0, tx).unwrap();
        player.load(&one_hit_timeline()).unwrap();
        player.start().unwrap();
        assert!(player.is_playing());

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, TimedEvent::NoteOn { channel: 9, key: 35, velocity: 100, tick: 0 });

        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(second.tick(), 1);

        player.stop().unwrap();
        assert!(!player.is_playing());
    }

    #[test]
    fn test_loops_continuously() {
        let (tx, rx) = unbounded();
        let mut player = LoopPlayer::new(6000.0, tx).unwrap();
        player.load(&one_hit_timeline()).unwrap();
        player.start().unwrap();

        let mut note_ons = 0;
        let mut boundaries = 0;
        while note_ons < 3 {
            match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                TimedEvent::NoteOn { .. } => note_ons += 1,
                TimedEvent::ControlChange { tick, .. } => {
                    assert_eq!(tick, 16);
                    boundaries += 1;
                }
                _ => {}
            }
        }
        player.stop().unwrap();

        // two full passes sit between three note-ons, 16 epilogues each
        assert_eq!(boundaries, 32);
    }

    #[test]
    fn test_stop_is_quiet() {
        let (tx, rx) = unbounded();
        let mut player = LoopPlayer::new(6000.0, tx).unwrap();
        player.load(&one_hit_timeline()).unwrap();
        player.start().unwrap();
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        player.stop().unwrap();

        // let anything already in flight land, then expect silence
        thread::sleep(Duration::from_millis(50));
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_rejects_far_ticks_and_keeps_running() {
        let (tx, rx) = unbounded();
        let mut player = LoopPlayer::new(6000.0, tx).unwrap();

        let far: Timeline = [TimedEvent::ProgramChange { channel: 9, program: 1, tick: u64::MAX }]
            .into_iter()
            .collect();
        assert!(player.load(&far).is_err());

        let mut longest = Timeline::new();
        longest.push(TimedEvent::ProgramChange { channel: 9, program: 1, tick: MAX_LOOP_TICKS });
        player.load(&longest).unwrap();

        player.load(&one_hit_timeline()).unwrap();
        player.start().unwrap();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.tick(), 0);
        player.stop().unwrap();
    }

    #[test]
    fn test_tempo_factor() {
        let (tx, _rx) = unbounded();
        let mut player = LoopPlayer::new(120.0, tx).unwrap();
        assert_eq!(player.tempo_factor(), 1.0);
        player.set_tempo_factor(1.03);
        assert_eq!(player.tempo_factor(), 1.03);
    }
}
