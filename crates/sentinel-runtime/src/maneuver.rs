use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sentinel_types::SentinelError;

/// Operator-level movement requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    /// Translate one step forward.
    Forward,
    /// Translate one step backward.
    Backward,
    /// Look left, step forward, look ahead again.
    Left,
    /// Look right, step forward, look ahead again.
    Right,
    /// Closed-loop circular turn.
    Turn,
    /// Head scan with capture, then head reset.
    Scan,
    /// Leave the command loop; no motion.
    Quit,
}

impl Maneuver {
    pub const ALL: [Maneuver; 7] = [
        Maneuver::Forward,
        Maneuver::Backward,
        Maneuver::Left,
        Maneuver::Right,
        Maneuver::Turn,
        Maneuver::Scan,
        Maneuver::Quit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Maneuver::Forward => "forward",
            Maneuver::Backward => "backward",
            Maneuver::Left => "left",
            Maneuver::Right => "right",
            Maneuver::Turn => "turn",
            Maneuver::Scan => "scan",
            Maneuver::Quit => "quit",
        }
    }
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Maneuver {
    type Err = SentinelError;

    /// Case-insensitive; `up`/`down`/`back`/`exit` are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "up" => Ok(Maneuver::Forward),
            "backward" | "back" | "down" => Ok(Maneuver::Backward),
            "left" => Ok(Maneuver::Left),
            "right" => Ok(Maneuver::Right),
            "turn" => Ok(Maneuver::Turn),
            "scan" => Ok(Maneuver::Scan),
            "quit" | "exit" => Ok(Maneuver::Quit),
            other => Err(SentinelError::Config(format!(
                "unknown maneuver '{other}' (expected one of: forward, backward, left, right, turn, scan, quit)"
            ))),
        }
    }
}
