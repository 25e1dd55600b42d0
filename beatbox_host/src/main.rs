use anyhow::Result;
use beatbox_engine::{BeatBoxSession, LoopPlayer, SyncEvent};
use beatbox_shared::{DecodePolicy, SessionConfig, TimedEvent};
use clap::Parser;
use crossbeam_channel::{select, unbounded, Receiver};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

mod config_io;
mod console;

use console::{parse_command, render_grid, render_labels, Command, HELP};

/// Shared drum-machine session over a relay
#[derive(Parser, Debug)]
#[command(name = "beatbox", version)]
struct Args {
    /// Name shown in the labels of patterns you send
    name: Option<String>,

    /// Relay address (host:port)
    #[arg(long)]
    relay: Option<String>,

    /// JSON session config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Don't connect to the relay at startup
    #[arg(long)]
    offline: bool,

    /// Close the relay connection on the first malformed message
    #[arg(long)]
    strict: bool,

    /// Write the effective config to this path and exit
    #[arg(long)]
    save_config: Option<PathBuf>,
}

fn build_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => config_io::load_config_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(name) = &args.name {
        config.user_name = name.clone();
    }
    if let Some(relay) = &args.relay {
        config.relay.address = relay.clone();
    }
    if args.offline {
        config.relay.auto_connect = false;
    }
    if args.strict {
        config.relay.decode_policy = DecodePolicy::Disconnect;
    }
    Ok(config)
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn spawn_event_logger(events: Receiver<TimedEvent>) {
    thread::spawn(move || {
        for event in events {
            tracing::trace!("[Player] {:?} {:02X?}", event, event.to_midi_bytes());
        }
    });
}

fn connect(session: &mut BeatBoxSession) {
    match session.connect() {
        Ok(()) => println!("Connected to {}", session.config().relay.address),
        Err(e) => println!("Couldn't connect ({}); you'll have to play alone.", e),
    }
}

/// Returns false when the user asked to quit
fn handle_command(session: &mut BeatBoxSession, command: Command) -> Result<bool> {
    match command {
        Command::Toggle { row, step } => {
            session.toggle(row, step);
            println!("{}", render_grid(session));
        }
        Command::Clear => {
            session.clear();
            println!("{}", render_grid(session));
        }
        Command::Show => println!("{}", render_grid(session)),
        Command::Play => {
            session.play()?;
            println!("Playing at {:.1} BPM", session.current_bpm());
        }
        Command::Stop => session.stop()?,
        Command::TempoUp => {
            session.tempo_up();
            println!("{:.1} BPM", session.current_bpm());
        }
        Command::TempoDown => {
            session.tempo_down();
            println!("{:.1} BPM", session.current_bpm());
        }
        Command::Tempo(multiplier) => {
            session.adjust_tempo(multiplier);
            println!("{:.1} BPM", session.current_bpm());
        }
        Command::Send(message) => match session.send(&message) {
            Ok(label) => println!("Sent '{}'", label),
            Err(e) => println!("Not sent: {}. Playing locally only.", e),
        },
        Command::List => println!("{}", render_labels(&session.ordered_labels())),
        Command::Load(index) => {
            let labels = session.ordered_labels();
            match labels.get(index) {
                Some(label) => {
                    if session.select_remote(label)? {
                        println!("{}", render_grid(session));
                    }
                }
                None => println!("No pattern #{}", index + 1),
            }
        }
        Command::Connect => connect(session),
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

fn run_line(session: &mut BeatBoxSession, line: &str) -> bool {
    if line.trim().is_empty() {
        return true;
    }
    match parse_command(line) {
        Ok(command) => match handle_command(session, command) {
            Ok(keep_going) => keep_going,
            Err(e) => {
                println!("Error: {:#}", e);
                true
            }
        },
        Err(msg) => {
            println!("{}", msg);
            true
        }
    }
}

fn handle_sync_event(event: SyncEvent) {
    match event {
        SyncEvent::LabelsChanged(label) => println!("<< {}", label),
        SyncEvent::Error(e) => println!("Relay: {}", e),
        SyncEvent::Disconnected => println!("Relay connection closed. Playing locally only."),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    if let Some(path) = &args.save_config {
        config_io::save_config_file(&config, path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let (sink, played) = unbounded();
    spawn_event_logger(played);
    let player = LoopPlayer::new(config.tempo.base_bpm, sink)?;

    let auto_connect = config.relay.auto_connect;
    let mut session = BeatBoxSession::new(config, Box::new(player));
    tracing::info!("Cyber BeatBox ({})", session.identity().name());
    if auto_connect {
        connect(&mut session);
    }

    let sync_events = session.events();
    let lines = spawn_stdin_reader();
    println!("{}", render_grid(&session));
    println!("{}", HELP);

    loop {
        let keep_going = select! {
            recv(lines) -> line => match line {
                Ok(line) => run_line(&mut session, &line),
                Err(_) => false,
            },
            recv(sync_events) -> event => {
                if let Ok(event) = event {
                    handle_sync_event(event);
                }
                true
            }
        };
        if !keep_going {
            break;
        }
    }

    session.stop()?;
    session.disconnect();
    Ok(())
}
