use serde::{Deserialize, Serialize};

/// A MIDI-style event pinned to a step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimedEvent {
    NoteOn { channel: u8, key: u8, velocity: u8, tick: u64 },
    NoteOff { channel: u8, key: u8, velocity: u8, tick: u64 },
    ControlChange { channel: u8, controller: u8, value: u8, tick: u64 },
    ProgramChange { channel: u8, program: u8, tick: u64 },
}

impl TimedEvent {
    pub fn tick(&self) -> u64 {
        match *self {
            TimedEvent::NoteOn { tick, .. }
            | TimedEvent::NoteOff { tick, .. }
            | TimedEvent::ControlChange { tick, .. }
            | TimedEvent::ProgramChange { tick, .. } => tick,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self, TimedEvent::NoteOn { .. } | TimedEvent::NoteOff { .. })
    }

    /// Raw short message: status byte followed by one or two data bytes.
    pub fn to_midi_bytes(&self) -> Vec<u8> {
        match *self {
            TimedEvent::NoteOn { channel, key, velocity, .. } => {
                vec![0x90 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]
            }
            TimedEvent::NoteOff { channel, key, velocity, .. } => {
                vec![0x80 | (channel & 0x0F), key & 0x7F, velocity & 0x7F]
            }
            TimedEvent::ControlChange { channel, controller, value, .. } => {
                vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F]
            }
            TimedEvent::ProgramChange { channel, program, .. } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
        }
    }
}

/// Events in construction order. Not sorted by tick; the player buckets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    events: Vec<TimedEvent>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TimedEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimedEvent> {
        self.events.iter()
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    /// Largest tick of any event, 0 for an empty timeline
    pub fn end_tick(&self) -> u64 {
        self.events.iter().map(TimedEvent::tick).max().unwrap_or(0)
    }

    /// Events scheduled at `tick`, preserving construction order
    pub fn events_at(&self, tick: u64) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter().filter(move |e| e.tick() == tick)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimedEvent;
    type IntoIter = std::slice::Iter<'a, TimedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<TimedEvent> for Timeline {
    fn from_iter<I: IntoIterator<Item = TimedEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_bytes() {
        let on = TimedEvent::NoteOn { channel: 9, key: 35, velocity: 100, tick: 0 };
        assert_eq!(on.to_midi_bytes(), vec![0x99, 35, 100]);

        let off = TimedEvent::NoteOff { channel: 9, key: 35, velocity: 100, tick: 1 };
        assert_eq!(off.to_midi_bytes(), vec![0x89, 35, 100]);

        let cc = TimedEvent::ControlChange { channel: 9, controller: 1, value: 127, tick: 16 };
        assert_eq!(cc.to_midi_bytes(), vec![0xB9, 1, 127]);

        let pc = TimedEvent::ProgramChange { channel: 9, program: 1, tick: 15 };
        assert_eq!(pc.to_midi_bytes(), vec![0xC9, 1]);
    }

    #[test]
    fn test_end_tick_and_lookup() {
        let timeline: Timeline = [
            TimedEvent::NoteOn { channel: 9, key: 42, velocity: 100, tick: 3 },
            TimedEvent::NoteOff { channel: 9, key: 42, velocity: 100, tick: 4 },
            TimedEvent::ControlChange { channel: 9, controller: 1, value: 127, tick: 16 },
        ]
        .into_iter()
        .collect();

        assert_eq!(timeline.end_tick(), 16);
        assert_eq!(timeline.events_at(3).count(), 1);
        assert_eq!(timeline.events_at(5).count(), 0);
        assert_eq!(Timeline::new().end_tick(), 0);
    }
}
