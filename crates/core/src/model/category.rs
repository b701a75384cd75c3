use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Course topic a question bank and leaderboard are partitioned by.
///
/// The set is closed: adding a category means a schema change and a
/// redeployment, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Csc111,
    Csc211,
    Csc231,
}

/// Error returned when parsing an unrecognized category name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized category: {name}")]
pub struct UnknownCategory {
    pub name: String,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Csc111, Category::Csc211, Category::Csc231];

    /// Storage name for the category. Must stay consistent with the
    /// seeded `categories` rows and the bank file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Csc111 => "CSC_111",
            Category::Csc211 => "CSC_211",
            Category::Csc231 => "CSC_231",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CSC_111" => Ok(Category::Csc111),
            "CSC_211" => Ok(Category::Csc211),
            "CSC_231" => Ok(Category::Csc231),
            other => Err(UnknownCategory {
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
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "CSC_999".parse::<Category>().unwrap_err();
        assert_eq!(err.name, "CSC_999");
    }
}
