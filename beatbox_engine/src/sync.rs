//! Client side of the relay connection.
//!
//! Outgoing patterns are written from the caller's thread. Incoming ones are
//! decoded on a dedicated receive thread that owns the read half of the
//! socket and is the only writer of the [`RemotePatternStore`]. Everything
//! the host needs to hear about (new labels, bad frames, the connection
//! going away) arrives as a [`SyncEvent`] on a crossbeam channel.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

use beatbox_shared::wire::{self, Frame, WireError};
use beatbox_shared::{DecodePolicy, PatternGrid};
use crossbeam_channel::{Receiver, Sender, unbounded};
use thiserror::Error;

use crate::remote_store::RemotePatternStore;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("relay connection failed: {0}")]
    Transport(#[from] io::Error),
    #[error("not connected to a relay")]
    NotConnected,
    #[error("sync channel already closed")]
    SessionClosed,
    #[error("malformed message: {0}")]
    Decode(String),
}

impl SyncError {
    pub fn is_transport(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }
}

impl From<WireError> for SyncError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Io(e) => SyncError::Transport(e),
            other => SyncError::Decode(other.to_string()),
        }
    }
}

/// Notifications pushed to the host
#[derive(Debug)]
pub enum SyncEvent {
    /// A pattern was stored under this label
    LabelsChanged(String),
    /// Something went wrong. Decode errors may be followed by more traffic,
    /// transport errors are always followed by `Disconnected`.
    Error(SyncError),
    /// The receive loop has ended; the channel is closed for good.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Never connected, or the last attempt failed. `connect` may be retried.
    Disconnected,
    Connecting,
    Connected,
    /// Was connected and has since gone away. Terminal.
    Closed,
}

impl ChannelState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ChannelState::Connecting,
            2 => ChannelState::Connected,
            3 => ChannelState::Closed,
            _ => ChannelState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ChannelState::Disconnected => 0,
            ChannelState::Connecting => 1,
            ChannelState::Connected => 2,
            ChannelState::Closed => 3,
        }
    }
}

#[derive(Debug, Clone)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ChannelState::Disconnected.as_u8())))
    }

    fn get(&self) -> ChannelState {
        ChannelState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: ChannelState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

pub struct SyncChannel {
    store: Arc<RemotePatternStore>,
    policy: DecodePolicy,
    state: SharedState,
    closing: Arc<AtomicBool>,
    socket: Option<TcpStream>,
    writer: Option<BufWriter<TcpStream>>,
    receiver_thread: Option<JoinHandle<()>>,
    events_tx: Sender<SyncEvent>,
    events_rx: Receiver<SyncEvent>,
}

impl SyncChannel {
    pub fn new(store: Arc<RemotePatternStore>, policy: DecodePolicy) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            store,
            policy,
            state: SharedState::new(),
            closing: Arc::new(AtomicBool::new(false)),
            socket: None,
            writer: None,
            receiver_thread: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state.get()
    }

    /// Receiver for [`SyncEvent`]s. Every clone sees each event at most once.
    ///
    /// The queue is unbounded and lives as long as the channel, so a host
    /// has to keep draining it while connected.
    pub fn events(&self) -> Receiver<SyncEvent> {
        self.events_rx.clone()
    }

    pub fn store(&self) -> &Arc<RemotePatternStore> {
        &self.store
    }

    pub fn connect<A: ToSocketAddrs>(&mut self, addr: A) -> Result<(), SyncError> {
        match self.state() {
            ChannelState::Connected => return Ok(()),
            ChannelState::Closed => return Err(SyncError::SessionClosed),
            ChannelState::Disconnected | ChannelState::Connecting => {}
        }

        self.state.set(ChannelState::Connecting);
        let result = TcpStream::connect(addr)
            .map_err(SyncError::from)
            .and_then(|stream| self.attach(stream));

        if let Err(ref e) = result {
            tracing::warn!("[Sync] Could not reach relay: {}", e);
            self.state.set(ChannelState::Disconnected);
        }
        result
    }

    fn attach(&mut self, stream: TcpStream) -> Result<(), SyncError> {
        let peer = stream.peer_addr().ok();
        let read_half = stream.try_clone()?;
        let write_half = stream.try_clone()?;

        let receive_loop = ReceiveLoop {
            reader: BufReader::new(read_half),
            store: self.store.clone(),
            events: self.events_tx.clone(),
            policy: self.policy,
            state: self.state.clone(),
            closing: self.closing.clone(),
        };

        // Connected before the thread starts so a fast EOF can't be
        // overwritten by a late store.
        self.state.set(ChannelState::Connected);
        let handle = thread::Builder::new()
            .name("beatbox-sync-rx".to_string())
            .spawn(move || receive_loop.run());

        match handle {
            Ok(handle) => {
                self.receiver_thread = Some(handle);
                self.writer = Some(BufWriter::new(write_half));
                self.socket = Some(stream);
                tracing::info!("[Sync] Connected to relay {:?}", peer);
                Ok(())
            }
            Err(e) => {
                let _ = stream.shutdown(Shutdown::Both);
                Err(SyncError::Transport(e))
            }
        }
    }

    /// Sends one pattern: the label frame, then the flattened grid.
    ///
    /// A failed write leaves the relay with whatever made it out and closes
    /// the channel.
    pub fn send(&mut self, label: &str, grid: &PatternGrid) -> Result<(), SyncError> {
        match self.state() {
            ChannelState::Connected => {}
            ChannelState::Closed => return Err(SyncError::SessionClosed),
            _ => return Err(SyncError::NotConnected),
        }
        let writer = self.writer.as_mut().ok_or(SyncError::NotConnected)?;

        let result = write_message(writer, label, grid);
        match result {
            Ok(()) => {
                tracing::debug!("[Sync] Sent '{}' ({} hits)", label, grid.hit_count());
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[Sync] Send failed, closing channel: {}", e);
                self.close();
                Err(e)
            }
        }
    }

    /// Shuts the socket down, which unblocks the receive thread, and waits
    /// for the thread to finish. A channel that never connected stays
    /// `Disconnected` and can still connect later.
    pub fn close(&mut self) {
        let was_attached = self.socket.is_some() || self.receiver_thread.is_some();
        if !was_attached {
            return;
        }

        self.closing.store(true, Ordering::Release);
        self.writer = None;
        if let Some(socket) = self.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
        }
        if let Some(handle) = self.receiver_thread.take() {
            if handle.join().is_err() {
                tracing::error!("[Sync] Receive thread panicked");
            }
        }
        self.state.set(ChannelState::Closed);
    }
}

impl Drop for SyncChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn write_message<W: Write>(writer: &mut W, label: &str, grid: &PatternGrid) -> Result<(), SyncError> {
    wire::write_frame(writer, &Frame::Label(label.to_string()))?;
    wire::write_frame(writer, &Frame::Pattern(grid.to_flat()))?;
    writer.flush()?;
    Ok(())
}

struct ReceiveLoop {
    reader: BufReader<TcpStream>,
    store: Arc<RemotePatternStore>,
    events: Sender<SyncEvent>,
    policy: DecodePolicy,
    state: SharedState,
    closing: Arc<AtomicBool>,
}

impl ReceiveLoop {
    fn run(mut self) {
        let failure = self.pump();

        if let Some(err) = failure {
            if !self.closing.load(Ordering::Acquire) {
                tracing::warn!("[Sync] Relay connection lost: {}", err);
                let _ = self.events.send(SyncEvent::Error(err));
            }
        } else {
            tracing::info!("[Sync] Receive loop finished");
        }

        let _ = self.reader.get_ref().shutdown(Shutdown::Both);
        self.state.set(ChannelState::Closed);
        let _ = self.events.send(SyncEvent::Disconnected);
    }

    /// Reads until the stream ends or fails. Returns the transport error, if
    /// any, that ended it.
    fn pump(&mut self) -> Option<SyncError> {
        let mut pending_label: Option<String> = None;

        loop {
            let frame = match wire::read_frame(&mut self.reader) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    if let Some(label) = pending_label {
                        tracing::debug!("[Sync] Stream ended before the pattern for '{}'", label);
                    }
                    return None;
                }
                Err(e) if e.is_transport() => return Some(e.into()),
                Err(e) => {
                    pending_label = None;
                    if !self.reject(e.into()) {
                        return None;
                    }
                    continue;
                }
            };

            match (pending_label.take(), frame) {
                (None, Frame::Label(label)) => pending_label = Some(label),
                (None, Frame::Pattern(_)) => {
                    let err = SyncError::Decode("pattern frame without a label".to_string());
                    if !self.reject(err) {
                        return None;
                    }
                }
                (Some(label), Frame::Pattern(cells)) => match PatternGrid::try_from(cells) {
                    Ok(grid) => self.accept(label, grid),
                    Err(e) => {
                        let err = SyncError::Decode(format!("pattern for '{}': {}", label, e));
                        if !self.reject(err) {
                            return None;
                        }
                    }
                },
                (Some(orphan), Frame::Label(label)) => {
                    // the newer label may still start a good message
                    pending_label = Some(label);
                    let err = SyncError::Decode(format!("label '{}' arrived without a pattern", orphan));
                    if !self.reject(err) {
                        return None;
                    }
                }
            }
        }
    }

    fn accept(&self, label: String, grid: PatternGrid) {
        tracing::debug!("[Sync] Received '{}' ({} hits)", label, grid.hit_count());
        self.store.record(&label, grid);
        let _ = self.events.send(SyncEvent::LabelsChanged(label));
    }

    /// Reports a bad message. Returns whether the loop should keep going.
    fn reject(&self, err: SyncError) -> bool {
        tracing::warn!("[Sync] Dropping message: {}", err);
        let _ = self.events.send(SyncEvent::Error(err));
        self.policy == DecodePolicy::Skip
    }
}
