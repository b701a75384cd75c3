use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Play style for a game.
///
/// `Classic` bounds retries per round (five guesses, each miss costs
/// points). `Timed` allows one guess per round under a total wall-clock
/// budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Classic,
    Timed,
}

/// Error returned when parsing an unrecognized mode name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized mode: {name}")]
pub struct UnknownMode {
    pub name: String,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Classic, Mode::Timed];

    /// Storage name for the mode. Must stay consistent with the seeded
    /// `modes` rows.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Classic => "Classic",
            Mode::Timed => "Timed",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Classic" => Ok(Mode::Classic),
            "Timed" => Ok(Mode::Timed),
            other => Err(UnknownMode {
                name: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_roundtrips() {
        for mode in Mode::ALL {
            assert_eq!(mode.as_str().parse::<Mode>().unwrap(), mode);
        }
    }
}
