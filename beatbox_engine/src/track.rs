use beatbox_shared::{InstrumentKit, PatternGrid, TimedEvent, Timeline, ROWS, STEPS};

/// Percussion channel (zero based, GM channel 10)
pub const DRUM_CHANNEL: u8 = 9;

/// Turns a pattern grid into the event list the player loops over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackBuilder {
    pub channel: u8,
    pub velocity: u8,
    /// Controller sent after each row, marking the loop reset point
    pub epilogue_controller: u8,
    pub epilogue_value: u8,
    pub epilogue_tick: u64,
    /// Program sent once per build
    pub program: u8,
    pub program_tick: u64,
}

impl Default for TrackBuilder {
    fn default() -> Self {
        Self {
            channel: DRUM_CHANNEL,
            velocity: 100,
            epilogue_controller: 1,
            epilogue_value: 127,
            epilogue_tick: STEPS as u64,
            program: 1,
            program_tick: STEPS as u64 - 1,
        }
    }
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row by row, step by step: a NoteOn/NoteOff pair per hit, then the row
    /// epilogue. The program change closes the track. Output order depends
    /// only on the grid and the kit.
    pub fn build(&self, grid: &PatternGrid, kit: &InstrumentKit) -> Timeline {
        let mut timeline = Timeline::new();

        for row in 0..ROWS {
            let key = kit.key(row);
            for (step, &hit) in grid.row(row).iter().enumerate() {
                if !hit {
                    continue;
                }
                let tick = step as u64;
                timeline.push(TimedEvent::NoteOn {
                    channel: self.channel,
                    key,
                    velocity: self.velocity,
                    tick,
                });
                timeline.push(TimedEvent::NoteOff {
                    channel: self.channel,
                    key,
                    velocity: self.velocity,
                    tick: tick + 1,
                });
            }
            timeline.push(TimedEvent::ControlChange {
                channel: self.channel,
                controller: self.epilogue_controller,
                value: self.epilogue_value,
                tick: self.epilogue_tick,
            });
        }

        timeline.push(TimedEvent::ProgramChange {
            channel: self.channel,
            program: self.program,
            tick: self.program_tick,
        });

        timeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(timeline: &Timeline, pred: impl Fn(&TimedEvent) -> bool) -> usize {
        timeline.iter().filter(|e| pred(*e)).count()
    }

    #[test]
    fn test_empty_grid() {
        let timeline = TrackBuilder::new().build(&PatternGrid::new(), &InstrumentKit::default());

        assert_eq!(timeline.len(), ROWS + 1);
        assert_eq!(count(&timeline, |e| matches!(e, TimedEvent::ControlChange { .. })), ROWS);
        assert_eq!(count(&timeline, |e| matches!(e, TimedEvent::ProgramChange { .. })), 1);
        assert_eq!(count(&timeline, TimedEvent::is_note), 0);
        assert_eq!(
            timeline.events().last(),
            Some(&TimedEvent::ProgramChange { channel: 9, program: 1, tick: 15 })
        );
    }

    #[test]
    fn test_single_hit_at_origin() {
        let kit = InstrumentKit::default();
        let mut grid = PatternGrid::new();
        grid.set(0, 0, true);

        let timeline = TrackBuilder::new().build(&grid, &kit);
        let events = timeline.events();

        assert_eq!(events.len(), 2 + ROWS + 1);
        assert_eq!(events[0], TimedEvent::NoteOn { channel: 9, key: kit.key(0), velocity: 100, tick: 0 });
        assert_eq!(events[1], TimedEvent::NoteOff { channel: 9, key: kit.key(0), velocity: 100, tick: 1 });
        assert_eq!(
            events[2],
            TimedEvent::ControlChange { channel: 9, controller: 1, value: 127, tick: 16 }
        );
        // remaining rows contribute only their epilogue
        assert!(events[3..ROWS + 2]
            .iter()
            .all(|e| matches!(e, TimedEvent::ControlChange { .. })));
        assert!(matches!(events[ROWS + 2], TimedEvent::ProgramChange { .. }));
    }

    #[test]
    fn test_rows_use_their_own_key() {
        let kit = InstrumentKit::from_keys([
            10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
        ]);
        let mut grid = PatternGrid::new();
        grid.set(3, 15, true);

        let timeline = TrackBuilder::new().build(&grid, &kit);
        let notes: Vec<_> = timeline.iter().filter(|e| e.is_note()).collect();
        assert_eq!(
            notes,
            vec![
                &TimedEvent::NoteOn { channel: 9, key: 13, velocity: 100, tick: 15 },
                &TimedEvent::NoteOff { channel: 9, key: 13, velocity: 100, tick: 16 },
            ]
        );
        // three epilogues come before row 3's notes
        let first_note = timeline.iter().position(|e| e.is_note()).unwrap();
        assert_eq!(first_note, 3);
    }

    #[test]
    fn test_build_is_deterministic() {
        let mut grid = PatternGrid::new();
        for row in 0..ROWS {
            for step in (row % 3..STEPS).step_by(3) {
                grid.set(row, step, true);
            }
        }
        let kit = InstrumentKit::default();
        let builder = TrackBuilder::new();

        let first = builder.build(&grid, &kit);
        let second = builder.build(&grid.clone(), &kit);
        assert_eq!(first, second);
        assert_eq!(
            count(&first, |e| matches!(e, TimedEvent::NoteOn { .. })),
            grid.hit_count()
        );
    }
}
