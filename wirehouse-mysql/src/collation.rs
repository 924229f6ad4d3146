use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

// The collation id sent in the greeting and in column definitions is informational for
// everything but `binary` (63), which is never transcoded. Clients mostly default to
// `latin1_swedish_ci` (8), `utf8mb4_general_ci` (45) or `utf8mb4_0900_ai_ci` (255).

/// A collation id as it appears on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Collation(pub u16);

impl Collation {
    /// Collation used for all non-string data.
    pub const BINARY: Self = Collation(63);

    /// Most broadly supported UTF-8 collation.
    pub const UTF8MB4_GENERAL_CI: Self = Collation(45);

    const NAMES: &'static [(&'static str, u16)] = &[
        ("big5_chinese_ci", 1),
        ("latin1_swedish_ci", 8),
        ("ascii_general_ci", 11),
        ("utf8_general_ci", 33),
        ("utf8mb3_general_ci", 33),
        ("utf8mb4_general_ci", 45),
        ("utf8mb4_bin", 46),
        ("latin1_bin", 47),
        ("binary", 63),
        ("utf8_bin", 83),
        ("utf8mb3_bin", 83),
        ("utf8_unicode_ci", 192),
        ("utf8mb4_unicode_ci", 224),
        ("utf8mb4_unicode_520_ci", 246),
        ("utf8mb4_0900_ai_ci", 255),
    ];

    pub fn id(self) -> u16 {
        self.0
    }

    pub fn name(self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(_, id)| *id == self.0)
            .map(|(name, _)| *name)
    }

    /// The low byte, as carried by the one-byte character set field of the greeting.
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_u8(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl Default for Collation {
    fn default() -> Self {
        Self::UTF8MB4_GENERAL_CI
    }
}

impl Display for Collation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Parses a collation name, case-insensitively, or a numeric id.
impl FromStr for Collation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if let Ok(id) = s.parse::<u16>() {
            return Ok(Collation(id));
        }

        Self::NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, id)| Collation(*id))
            .ok_or_else(|| Error::Configuration(format!("unknown collation: {s:?}").into()))
    }
}
