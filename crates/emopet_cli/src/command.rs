//! Stdin commands
//!
//! One command per line: `tap`, `next`, an emotion name, `color <name>`,
//! `stop`, `mute`, `unmute`, `quit`.

use std::str::FromStr;

use emopet_core::{Emotion, EyeColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Blink, look up and cycle to the next emotion
    Tap,
    /// Cycle to the next emotion without the tap reaction
    Next,
    Set(Emotion),
    Color(EyeColor),
    Stop,
    Mute(bool),
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "tap" => Command::Tap,
            "next" => Command::Next,
            "stop" => Command::Stop,
            "mute" => Command::Mute(true),
            "unmute" => Command::Mute(false),
            "quit" | "exit" => Command::Quit,
            "color" | "colour" => {
                let name = words.next().ok_or("color needs a name")?;
                Command::Color(name.parse()?)
            }
            other => Command::Set(other.parse().map_err(|_| format!("unknown command: {other}"))?),
        };

        if words.next().is_some() {
            return Err(format!("trailing input after {head}"));
        }
        Ok(command)
    }
}
