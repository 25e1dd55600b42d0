use crate::grid::ROWS;

/// One row of the kit: display name and the percussion key it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub name: String,
    pub key: u8,
}

/// Maps every grid row to an instrument. Fixed for the life of a session.
///
/// Every constructor takes exactly `ROWS` entries, so `key` and `name` can
/// index any grid row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentKit {
    instruments: Vec<Instrument>,
}

// General MIDI percussion (channel 10)
const GM_DRUMS: [(&str, u8); ROWS] = [
    ("Bass Drum", 35),
    ("Closed Hi-Hat", 42),
    ("Open Hi-Hat", 46),
    ("Acoustic Snare", 38),
    ("Crash Cymbal", 49),
    ("Hand Clap", 39),
    ("High Tom", 50),
    ("Hi Bongo", 60),
    ("Maracas", 70),
    ("Whistle", 72),
    ("Low Conga", 64),
    ("Cowbell", 56),
    ("Vibraslap", 58),
    ("Low-mid Tom", 47),
    ("High Agogo", 67),
    ("Open Hi Conga", 63),
];

impl Default for InstrumentKit {
    fn default() -> Self {
        Self::from_pairs(GM_DRUMS)
    }
}

impl InstrumentKit {
    pub fn new(instruments: [Instrument; ROWS]) -> Self {
        Self {
            instruments: instruments.into(),
        }
    }

    /// Kit with generated names, for callers that only care about keys
    pub fn from_keys(keys: [u8; ROWS]) -> Self {
        Self {
            instruments: keys
                .iter()
                .enumerate()
                .map(|(row, &key)| Instrument {
                    name: format!("Row {}", row + 1),
                    key,
                })
                .collect(),
        }
    }

    fn from_pairs(pairs: [(&str, u8); ROWS]) -> Self {
        Self {
            instruments: pairs
                .iter()
                .map(|&(name, key)| Instrument {
                    name: name.to_string(),
                    key,
                })
                .collect(),
        }
    }

    pub fn key(&self, row: usize) -> u8 {
        self.instruments[row].key
    }

    pub fn name(&self, row: usize) -> &str {
        &self.instruments[row].name
    }

    pub fn keys(&self) -> impl Iterator<Item = u8> + '_ {
        self.instruments.iter().map(|i| i.key)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kit_matches_gm_table() {
        let kit = InstrumentKit::default();
        assert_eq!(kit.len(), ROWS);
        assert_eq!(kit.key(0), 35);
        assert_eq!(kit.name(0), "Bass Drum");
        assert_eq!(kit.key(15), 63);
        assert_eq!(
            kit.keys().collect::<Vec<_>>(),
            vec![35, 42, 46, 38, 49, 39, 50, 60, 70, 72, 64, 56, 58, 47, 67, 63]
        );
    }

    #[test]
    fn test_every_constructor_covers_all_rows() {
        let pads = std::array::from_fn(|row| Instrument {
            name: format!("Pad {}", row + 1),
            key: 36 + row as u8,
        });
        for kit in [InstrumentKit::new(pads), InstrumentKit::from_keys([40; ROWS]), InstrumentKit::default()] {
            assert_eq!(kit.len(), ROWS);
            assert_eq!(kit.keys().count(), ROWS);
            assert!(!kit.name(ROWS - 1).is_empty());
        }
    }

    #[test]
    fn test_from_keys() {
        let kit = InstrumentKit::from_keys([40; ROWS]);
        assert!(kit.keys().all(|k| k == 40));
        assert_eq!(kit.name(2), "Row 3");
    }
}
