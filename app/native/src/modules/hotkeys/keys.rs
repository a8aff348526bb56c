//! Key codes, modifier masks and the lookup tables between them.
//!
//! Key codes follow the toolkit convention of the hosting UI: printable keys
//! use their upper-case ASCII code, special keys use the `0x0100_0000` range.
//! The tables below are built once and never mutated.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Bitmask of keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u32);

impl Modifiers {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(0x0200_0000);
    pub const CONTROL: Self = Self(0x0400_0000);
    pub const ALT: Self = Self(0x0800_0000);
    pub const META: Self = Self(0x1000_0000);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self { Self(bits) }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 { self.0 }

    /// Returns whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool { self.0 & other.0 == other.0 }

    #[must_use]
    pub const fn is_empty(self) -> bool { self.0 == 0 }
}

impl std::ops::BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self { Self(self.0 | rhs.0) }
}

impl std::ops::BitOrAssign for Modifiers {
    fn bitor_assign(&mut self, rhs: Self) { self.0 |= rhs.0; }
}

/// Display names for non-printable keys.
///
/// Lookups try the low seven bits of a code first and then the full code.
static KEY_NAMES: LazyLock<HashMap<i32, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        (0x0100_0003, "Backspace"),
        (0x0100_0001, "tab"),
        (13, "enter"),
        (16, "ctrl"),
        (17, "alt"),
        (18, "pause/break"),
        (19, "caps lock"),
        (27, "escape"),
        (32, "Space"),
        (33, "page up"),
        (34, "page down"),
        (35, "end"),
        (36, "home"),
        (37, "left arrow"),
        (38, "up arrow"),
        (39, "right arrow"),
        (40, "down arrow"),
        (45, "insert"),
        (46, "delete"),
        (90, "left window key"),
        (91, "right window key"),
        (93, "numpad 0"),
        (96, "numpad 1"),
        (97, "numpad 2"),
        (98, "numpad 3"),
        (99, "numpad 4"),
        (100, "numpad 5"),
        (101, "numpad 6"),
        (102, "numpad 7"),
        (103, "numpad 8"),
        (104, "numpad 9"),
        (105, "numpad multiply"),
        (106, "numpad add"),
        (107, "numpad subtract"),
        (109, "numpad decimal point"),
        (110, "numpad divide"),
        (0x0100_0030, "F1"),
        (0x0100_0031, "F2"),
        (0x0100_0032, "F3"),
        (0x0100_0033, "F4"),
        (0x0100_0034, "F5"),
        (0x0100_0035, "F6"),
        (0x0100_0036, "F7"),
        (0x0100_0037, "F8"),
        (0x0100_0038, "F9"),
        (0x0100_0039, "F10"),
        (0x0100_003A, "F11"),
        (0x0100_003B, "F12"),
    ])
});

/// Raw key codes that contribute a modifier bit while held.
static KEY_TO_MODIFIER: LazyLock<HashMap<i32, Modifiers>> = LazyLock::new(|| {
    HashMap::from([
        (16, Modifiers::CONTROL),
        (17, Modifiers::ALT),
        (0x0100_0020, Modifiers::SHIFT),
        (0x0100_0021, Modifiers::CONTROL),
        (0x0100_0022, Modifiers::META),
        (0x0100_0023, Modifiers::ALT),
    ])
});

/// Returns the modifier bit contributed by a held key, if any.
#[must_use]
pub fn modifier_for_key(code: i32) -> Option<Modifiers> { KEY_TO_MODIFIER.get(&code).copied() }

/// Folds the modifier bits of every held key into one mask.
pub fn observed_modifiers<'a>(keys: impl IntoIterator<Item = &'a i32>) -> Modifiers {
    keys.into_iter()
        .filter_map(|code| modifier_for_key(*code))
        .fold(Modifiers::NONE, |mask, bit| mask | bit)
}

/// Renders a key code as a label, without modifiers.
#[must_use]
pub fn key_label(code: i32) -> String {
    if let Some(name) = KEY_NAMES.get(&(code & 127)).or_else(|| KEY_NAMES.get(&code)) {
        return (*name).to_string();
    }
    key_char(code & 127)
}

/// Renders the low byte of a key code as a character.
#[must_use]
pub fn key_char(code: i32) -> String {
    u8::try_from(code & 0xFF).map(|byte| char::from(byte).to_string()).unwrap_or_default()
}

/// Renders a binding such as `Ctrl+Shift+S`.
#[must_use]
pub fn sequence_label(code: i32, modifiers: Modifiers) -> String {
    let mut label = key_label(code);
    for (bit, prefix) in [
        (Modifiers::SHIFT, "Shift+"),
        (Modifiers::META, "Meta+"),
        (Modifiers::ALT, "Alt+"),
        (Modifiers::CONTROL, "Ctrl+"),
    ] {
        if modifiers.contains(bit) {
            label.insert_str(0, prefix);
        }
    }
    label
}

/// Errors produced while parsing a hotkey sequence string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("empty hotkey sequence")]
    Empty,

    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),
}

/// Parses a sequence such as `"Ctrl+Shift+S"` or `"Alt+page up"`.
///
/// Modifier names are case-insensitive and accept common aliases
/// (`Control`, `Cmd`, `Option`, ...). The last segment is the key: a single
/// character maps to its upper-case code, anything longer is looked up in
/// the key name table.
///
/// # Errors
///
/// Returns [`KeyParseError`] if the sequence is empty or names an unknown
/// modifier or key.
pub fn parse_sequence(sequence: &str) -> Result<(i32, Modifiers), KeyParseError> {
    let trimmed = sequence.trim();
    if trimmed.is_empty() {
        return Err(KeyParseError::Empty);
    }

    // A lone "+" (or a trailing "++") binds the plus key itself.
    let (head, key) = match trimmed.strip_suffix("++") {
        Some(rest) => (rest, "+"),
        None if trimmed == "+" => ("", "+"),
        None => trimmed.rsplit_once('+').unwrap_or(("", trimmed)),
    };

    let mut modifiers = Modifiers::NONE;
    for part in head.split('+').map(str::trim).filter(|p| !p.is_empty()) {
        modifiers |= parse_modifier(part)?;
    }

    Ok((parse_key(key.trim())?, modifiers))
}

fn parse_modifier(part: &str) -> Result<Modifiers, KeyParseError> {
    match part.to_ascii_lowercase().as_str() {
        "shift" => Ok(Modifiers::SHIFT),
        "ctrl" | "control" => Ok(Modifiers::CONTROL),
        "alt" | "opt" | "option" => Ok(Modifiers::ALT),
        "meta" | "cmd" | "command" | "super" => Ok(Modifiers::META),
        _ => Err(KeyParseError::UnknownModifier(part.to_string())),
    }
}

fn parse_key(key: &str) -> Result<i32, KeyParseError> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(KeyParseError::Empty),
        (Some(ch), None) if ch.is_ascii() => Ok(i32::from(ch.to_ascii_uppercase() as u8)),
        _ => KEY_NAMES
            .iter()
            .filter(|(_, name)| name.eq_ignore_ascii_case(key))
            .map(|(code, _)| *code)
            .min()
            .ok_or_else(|| KeyParseError::UnknownKey(key.to_string())),
    }
}
