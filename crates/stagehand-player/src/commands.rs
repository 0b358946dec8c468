//! Operator commands read from stdin
//!
//! One command per line. Songs and channels are numbered from 1 the way they
//! are printed by `list`; the parser converts them to 0-based indices.

use std::path::PathBuf;

use stagehand_core::mix::Bus;
use stagehand_core::pad::PadNote;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Toggle,
    /// Next song (crossfades while playing)
    Next,
    /// Restart, or previous song when near the start
    Prev,
    /// Previous song, whatever the position
    Back,
    Jump(usize),
    Restart,
    Mute(usize),
    Solo(usize),
    Volume { channel: usize, volume: f32 },
    Bus { channel: usize, bus: Bus },
    Master(f32),
    AutoPan(bool),
    Pad(PadNote),
    PadStop,
    PadVolume(f32),
    PadSet { note: PadNote, path: PathBuf },
    PadClear(PadNote),
    Rename { song: usize, name: String },
    Cover { song: usize, image: Option<String> },
    Move { from: usize, to: usize },
    Remove(usize),
    Clear,
    Load(PathBuf),
    List,
    Status,
    Devices,
    /// `None` selects the system default
    Device(Option<usize>),
    Help,
    Quit,
}

pub const HELP: &str = "\
transport: play | pause | toggle | next | prev | back | jump N | restart
mix:       mute N | solo N | vol N V | bus N l|r|s | master V | autopan on|off
pads:      pad NOTE | padstop | padvol V | padset NOTE FILE | padclear NOTE
setlist:   load DIR | list | rename N NAME | cover N [PATH] | move A B | remove N | clear
other:     status | devices | device N|default | help | quit";

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "play" => Command::Play,
        "pause" | "stop" => Command::Pause,
        "toggle" | "space" => Command::Toggle,
        "next" | "n" => Command::Next,
        "prev" | "p" => Command::Prev,
        "back" => Command::Back,
        "jump" | "j" => Command::Jump(number(&args, 0)?),
        "restart" => Command::Restart,
        "mute" | "m" => Command::Mute(number(&args, 0)?),
        "solo" | "s" => Command::Solo(number(&args, 0)?),
        "vol" | "volume" => Command::Volume {
            channel: number(&args, 0)?,
            volume: level(&args, 1)?,
        },
        "bus" => Command::Bus {
            channel: number(&args, 0)?,
            bus: arg(&args, 1)?.parse()?,
        },
        "master" => Command::Master(level(&args, 0)?),
        "autopan" => Command::AutoPan(switch(arg(&args, 0)?)?),
        "pad" => Command::Pad(arg(&args, 0)?.parse()?),
        "padstop" => Command::PadStop,
        "padvol" => Command::PadVolume(level(&args, 0)?),
        "padset" => {
            let (note, path) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: padset NOTE FILE".to_string())?;
            Command::PadSet {
                note: note.parse()?,
                path: PathBuf::from(path.trim()),
            }
        }
        "padclear" => Command::PadClear(arg(&args, 0)?.parse()?),
        "rename" => {
            let (song, name) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| "usage: rename N NAME".to_string())?;
            Command::Rename {
                song: index(song)?,
                name: name.trim().to_string(),
            }
        }
        "cover" => {
            let (song, image) = match rest.split_once(char::is_whitespace) {
                Some((song, image)) => (song, Some(image.trim().to_string())),
                None => (rest, None),
            };
            Command::Cover {
                song: index(song)?,
                image,
            }
        }
        "move" => Command::Move {
            from: number(&args, 0)?,
            to: number(&args, 1)?,
        },
        "remove" | "rm" => Command::Remove(number(&args, 0)?),
        "clear" => Command::Clear,
        "load" => {
            if rest.is_empty() {
                return Err("usage: load DIR".to_string());
            }
            Command::Load(PathBuf::from(rest))
        }
        "list" | "ls" => Command::List,
        "status" => Command::Status,
        "devices" => Command::Devices,
        "device" => match arg(&args, 0)? {
            "default" => Command::Device(None),
            n => Command::Device(Some(index(n)?)),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(Some(command))
}

fn arg<'a>(args: &[&'a str], i: usize) -> Result<&'a str, String> {
    args.get(i).copied().ok_or_else(|| "missing argument".to_string())
}

/// 1-based number as printed to the operator, returned 0-based
fn index(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("expected a number from 1, got '{}'", s.trim())),
    }
}

fn number(args: &[&str], i: usize) -> Result<usize, String> {
    index(arg(args, i)?)
}

fn level(args: &[&str], i: usize) -> Result<f32, String> {
    let s = arg(args, i)?;
    match s.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("expected a level, got '{}'", s)),
    }
}

fn switch(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on or off, got '{}'", other)),
    }
}
