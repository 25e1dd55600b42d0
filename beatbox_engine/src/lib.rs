pub mod commands;
pub mod identity;
pub mod player;
pub mod remote_store;
pub mod session;
pub mod sync;
pub mod tempo;
pub mod track;
pub mod transport;

// Re-exports
pub use identity::LocalIdentity;
pub use player::{LoopPlayer, PlaybackEngine};
pub use remote_store::RemotePatternStore;
pub use session::BeatBoxSession;
pub use sync::{ChannelState, SyncChannel, SyncError, SyncEvent};
pub use tempo::TempoController;
pub use track::TrackBuilder;
