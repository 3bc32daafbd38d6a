use std::fmt;
use std::str::FromStr;

use tracing::warn;

/// Feed pagination cursor: the `created_at` (epoch milliseconds) of the last
/// post on the previous page. The next page holds strictly older posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(i64);

impl Cursor {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    /// Parse a client-supplied cursor. Anything that is not an integer is
    /// treated as "no cursor" and the caller gets the first page.
    pub fn parse_lenient(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse() {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                warn!("Ignoring invalid feed cursor '{}': {}", raw, e);
                None
            }
        }
    }
}

impl FromStr for Cursor {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
