use beatbox_shared::Timeline;

/// Messages from the control side to the loop player's worker thread
pub enum PlayerCommand {
    /// Swap in a new timeline. Playback continues if it was running.
    Load(Timeline),
    /// Rewind to tick 0 and loop until stopped
    Start,
    Stop,
    /// End the worker thread
    Quit,
}
