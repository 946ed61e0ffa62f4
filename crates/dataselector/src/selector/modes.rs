//! Connection mode flags.
//!
//! Selector JSON carries modes as free-form strings (`["up", "optional"]` or
//! `"up,optional"`). They are parsed once into [`LinkModes`] when the request
//! is deserialized so the compiler never re-scans strings.

use serde::{Deserialize, Serialize};

/// Parsed mode set of a connection row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ModeList", into = "Vec<String>")]
pub struct LinkModes {
    /// The row is the parent of the previous node (traverse upward).
    pub up: bool,
    /// Joins for this row and its fields are `LEFT JOIN`s.
    pub optional: bool,
}

impl LinkModes {
    /// Modes for a downward, required connection.
    pub const NONE: Self = Self {
        up: false,
        optional: false,
    };

    /// Parse mode strings. Matching is case-insensitive; unknown modes are ignored.
    pub fn parse<'a>(modes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut parsed = Self::NONE;
        for mode in modes {
            let mode = mode.trim();
            if mode.eq_ignore_ascii_case("up") {
                parsed.up = true;
            } else if mode.eq_ignore_ascii_case("optional") {
                parsed.optional = true;
            } else if !mode.is_empty() {
                tracing::warn!(mode, "ignoring unknown connection mode");
            }
        }
        parsed
    }

    /// Set the upward flag.
    pub fn with_up(mut self) -> Self {
        self.up = true;
        self
    }

    /// Set the optional flag.
    pub fn with_optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Accepted wire shapes for modes.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeList {
    Many(Vec<String>),
    One(String),
}

impl From<ModeList> for LinkModes {
    fn from(list: ModeList) -> Self {
        match list {
            ModeList::Many(modes) => LinkModes::parse(modes.iter().map(String::as_str)),
            ModeList::One(modes) => LinkModes::parse(modes.split(',')),
        }
    }
}

impl From<LinkModes> for Vec<String> {
    fn from(modes: LinkModes) -> Self {
        let mut list = Vec::new();
        if modes.up {
            list.push("up".to_string());
        }
        if modes.optional {
            list.push("optional".to_string());
        }
        list
    }
}
