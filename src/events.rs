//! Host commands delivered to the carousel runtime.

use std::str::FromStr;

use anyhow::{Context, anyhow, bail};

use crate::gesture::{PointerButton, PointerEvent};

/// Input delivered to the carousel runtime by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Next,
    Prev,
    JumpTo(usize),
    Pointer(PointerEvent),
    /// Rerun the load pipeline now.
    Reload,
    Shutdown,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    /// Parse one host command line, e.g. `next`, `jump 3`, `mouse-down 120 0`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| anyhow!("empty command"))?;
        let command = match verb.to_ascii_lowercase().as_str() {
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "jump" | "j" => {
                let raw = words
                    .next()
                    .ok_or_else(|| anyhow!("'jump' needs a slide index"))?;
                Self::JumpTo(
                    raw.parse()
                        .with_context(|| format!("invalid slide index '{raw}'"))?,
                )
            }
            "touch-start" => {
                Self::Pointer(PointerEvent::touch_start(coordinate(verb, &mut words)?))
            }
            "mouse-down" => {
                let x = coordinate(verb, &mut words)?;
                let button = match words.next() {
                    Some(raw) => raw
                        .parse::<u16>()
                        .with_context(|| format!("invalid mouse button '{raw}'"))?,
                    None => 0,
                };
                Self::Pointer(PointerEvent::mouse_down(PointerButton::from(button), x))
            }
            "move" => Self::Pointer(PointerEvent::Move {
                x: coordinate(verb, &mut words)?,
            }),
            "end" => Self::Pointer(PointerEvent::End {
                x: coordinate(verb, &mut words)?,
            }),
            "cancel" => Self::Pointer(PointerEvent::Cancel),
            "reload" => Self::Reload,
            "quit" | "exit" => Self::Shutdown,
            other => bail!("unknown command '{other}'"),
        };
        Ok(command)
    }
}

fn coordinate<'a>(verb: &str, words: &mut impl Iterator<Item = &'a str>) -> anyhow::Result<f64> {
    let raw = words
        .next()
        .ok_or_else(|| anyhow!("'{verb}' needs a coordinate"))?;
    raw.parse()
        .with_context(|| format!("invalid coordinate '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_and_gestures() {
        assert_eq!("next".parse::<Command>().unwrap(), Command::Next);
        assert_eq!(" jump 3 ".parse::<Command>().unwrap(), Command::JumpTo(3));
        assert_eq!(
            "mouse-down 12.5 2".parse::<Command>().unwrap(),
            Command::Pointer(PointerEvent::mouse_down(PointerButton::Secondary, 12.5))
        );
        assert_eq!(
            "end -4".parse::<Command>().unwrap(),
            Command::Pointer(PointerEvent::End { x: -4.0 })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
        assert!("jump -1".parse::<Command>().is_err());
        assert!("move left".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }
}
