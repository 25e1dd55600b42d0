//! Line-oriented front end: parses typed commands and renders session state.

use beatbox_engine::BeatBoxSession;
use beatbox_shared::{ROWS, STEPS};
use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Flip one cell (1-based row and step, as shown on screen)
    Toggle { row: usize, step: usize },
    Clear,
    Show,
    Play,
    Stop,
    TempoUp,
    TempoDown,
    /// Multiply the tempo factor directly
    Tempo(f64),
    Send(String),
    List,
    /// Load a received pattern by its 1-based position in the list
    Load(usize),
    Connect,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  t <row> <step>   toggle a cell (1-16 each)
  clear            clear the grid
  show             print the grid
  play | stop      start or stop the loop
  up | down        tempo +3% / -3%
  tempo <x>        multiply tempo by x
  send [message]   share the grid with everyone on the relay
  list             received patterns
  load <n>         load received pattern n and play it
  connect          try the relay again
  help | quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "t" | "toggle" => {
            let mut parts = rest.split_whitespace();
            let row = parse_index(parts.next(), ROWS, "row")?;
            let step = parse_index(parts.next(), STEPS, "step")?;
            Ok(Command::Toggle { row, step })
        }
        "clear" => Ok(Command::Clear),
        "show" | "s" => Ok(Command::Show),
        "play" | "start" => Ok(Command::Play),
        "stop" => Ok(Command::Stop),
        "up" => Ok(Command::TempoUp),
        "down" => Ok(Command::TempoDown),
        "tempo" => rest
            .parse::<f64>()
            .ok()
            .filter(|m| m.is_finite() && *m > 0.0)
            .map(Command::Tempo)
            .ok_or_else(|| format!("tempo needs a positive multiplier, got '{}'", rest)),
        "send" => Ok(Command::Send(rest.to_string())),
        "list" | "ls" => Ok(Command::List),
        "load" => {
            let n = rest
                .parse::<usize>()
                .ok()
                .filter(|&n| n >= 1)
                .ok_or_else(|| format!("load needs a list number, got '{}'", rest))?;
            Ok(Command::Load(n - 1))
        }
        "connect" => Ok(Command::Connect),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{}' (try 'help')", other)),
    }
}

// 1-based on screen, 0-based in the grid
fn parse_index(token: Option<&str>, limit: usize, what: &str) -> Result<usize, String> {
    let token = token.ok_or_else(|| format!("missing {}", what))?;
    match token.parse::<usize>() {
        Ok(n) if (1..=limit).contains(&n) => Ok(n - 1),
        _ => Err(format!("{} must be 1-{}, got '{}'", what, limit, token)),
    }
}

pub fn render_grid(session: &BeatBoxSession) -> String {
    let grid = session.grid();
    let kit = session.kit();
    let mut out = String::new();

    let _ = write!(out, "{:>17} ", "");
    for step in 0..STEPS {
        let _ = write!(out, "{}", if step % 4 == 0 { '|' } else { ' ' });
    }
    out.push('\n');

    for row in 0..ROWS {
        let _ = write!(out, "{:>2} {:>14} ", row + 1, kit.name(row));
        for &hit in grid.row(row) {
            out.push(if hit { 'x' } else { '.' });
        }
        out.push('\n');
    }
    let _ = write!(
        out,
        "{:.1} BPM, {}",
        session.current_bpm(),
        if session.is_playing() { "playing" } else { "stopped" }
    );
    out
}

pub fn render_labels(labels: &[String]) -> String {
    if labels.is_empty() {
        return "nothing received yet".to_string();
    }
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{:>3}. {}", i + 1, label))
        .collect::<Vec<_>>()
        .join("\n")
}
