//! Types shared by the BeatBox engine and its hosts: the pattern grid, the
//! instrument kit, timed events and the wire codec.

pub mod config;
pub mod event;
pub mod grid;
pub mod kit;
pub mod wire;

pub use config::{DecodePolicy, RelayConfig, SessionConfig, TempoConfig};
pub use event::{TimedEvent, Timeline};
pub use grid::{PatternGrid, ShapeError, CELLS, ROWS, STEPS};
pub use kit::{Instrument, InstrumentKit};
pub use wire::{Frame, WireError};
