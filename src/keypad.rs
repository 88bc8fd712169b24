//! Keypad translation: physical key characters and on-screen button labels
//! both end up as one of the sixteen CHIP-8 keys, then go to the engine.
//!
//! ```text
//!   keypad         conventional     literal
//!   1 2 3 C        1 2 3 4          1 2 3 c
//!   4 5 6 D        q w e r          4 5 6 d
//!   7 8 9 E        a s d f          7 8 9 e
//!   A 0 B F        z x c v          a 0 b f
//! ```
use crate::engine::Engine;
use log::trace;
use std::fmt;
use std::str::FromStr;

/// one of the sixteen keys on the COSMAC keypad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeypadKey {
    K0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF,
}

impl KeypadKey {
    pub const ALL: [KeypadKey; 16] = [
        KeypadKey::K0,
        KeypadKey::K1,
        KeypadKey::K2,
        KeypadKey::K3,
        KeypadKey::K4,
        KeypadKey::K5,
        KeypadKey::K6,
        KeypadKey::K7,
        KeypadKey::K8,
        KeypadKey::K9,
        KeypadKey::KA,
        KeypadKey::KB,
        KeypadKey::KC,
        KeypadKey::KD,
        KeypadKey::KE,
        KeypadKey::KF,
    ];

    /// keys in the order they sit on the physical pad, row by row
    pub const LAYOUT: [[KeypadKey; 4]; 4] = [
        [KeypadKey::K1, KeypadKey::K2, KeypadKey::K3, KeypadKey::KC],
        [KeypadKey::K4, KeypadKey::K5, KeypadKey::K6, KeypadKey::KD],
        [KeypadKey::K7, KeypadKey::K8, KeypadKey::K9, KeypadKey::KE],
        [KeypadKey::KA, KeypadKey::K0, KeypadKey::KB, KeypadKey::KF],
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// uppercase hex digit naming this key
    pub fn symbol(self) -> char {
        // index is always < 16
        std::char::from_digit(self.index() as u32, 16)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }

    /// accepts upper or lower case hex digits
    pub fn from_symbol(c: char) -> Option<Self> {
        c.to_digit(16).and_then(|d| Self::from_index(d as usize))
    }

    /// label of this key's on-screen button
    pub fn label(self) -> &'static str {
        // the virtual table is in key order
        VIRTUAL_KEYMAP[self.index()].0
    }
}

impl fmt::Display for KeypadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// map of characters typed on the keyboard to what the chip8 might expect,
/// where '1' => 0x01 and 'a' => 0x0a
const LITERAL_KEYMAP: [(char, KeypadKey); 16] = [
    ('0', KeypadKey::K0),
    ('1', KeypadKey::K1),
    ('2', KeypadKey::K2),
    ('3', KeypadKey::K3),
    ('4', KeypadKey::K4),
    ('5', KeypadKey::K5),
    ('6', KeypadKey::K6),
    ('7', KeypadKey::K7),
    ('8', KeypadKey::K8),
    ('9', KeypadKey::K9),
    ('a', KeypadKey::KA),
    ('b', KeypadKey::KB),
    ('c', KeypadKey::KC),
    ('d', KeypadKey::KD),
    ('e', KeypadKey::KE),
    ('f', KeypadKey::KF),
];

/// ditto using left-hand side of qwerty keyboard
const CONVENTIONAL_KEYMAP: [(char, KeypadKey); 16] = [
    ('x', KeypadKey::K0),
    ('1', KeypadKey::K1),
    ('2', KeypadKey::K2),
    ('3', KeypadKey::K3),
    ('q', KeypadKey::K4),
    ('w', KeypadKey::K5),
    ('e', KeypadKey::K6),
    ('a', KeypadKey::K7),
    ('s', KeypadKey::K8),
    ('d', KeypadKey::K9),
    ('z', KeypadKey::KA),
    ('c', KeypadKey::KB),
    ('4', KeypadKey::KC),
    ('r', KeypadKey::KD),
    ('f', KeypadKey::KE),
    ('v', KeypadKey::KF),
];

/// labels on the on-screen keypad buttons
const VIRTUAL_KEYMAP: [(&str, KeypadKey); 16] = [
    ("0", KeypadKey::K0),
    ("1", KeypadKey::K1),
    ("2", KeypadKey::K2),
    ("3", KeypadKey::K3),
    ("4", KeypadKey::K4),
    ("5", KeypadKey::K5),
    ("6", KeypadKey::K6),
    ("7", KeypadKey::K7),
    ("8", KeypadKey::K8),
    ("9", KeypadKey::K9),
    ("A", KeypadKey::KA),
    ("B", KeypadKey::KB),
    ("C", KeypadKey::KC),
    ("D", KeypadKey::KD),
    ("E", KeypadKey::KE),
    ("F", KeypadKey::KF),
];

/// which physical keymap is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Keymap {
    #[default]
    Conventional,
    Literal,
}

impl Keymap {
    fn table(self) -> &'static [(char, KeypadKey); 16] {
        match self {
            Keymap::Conventional => &CONVENTIONAL_KEYMAP,
            Keymap::Literal => &LITERAL_KEYMAP,
        }
    }

    /// look up a typed character; shifted letters map like unshifted ones
    pub fn lookup(self, c: char) -> Option<KeypadKey> {
        let c = c.to_ascii_lowercase();
        self.table()
            .iter()
            .find(|(k, _)| *k == c)
            .map(|(_, key)| *key)
    }

    /// the character that produces `key` under this keymap
    pub fn char_for(self, key: KeypadKey) -> char {
        self.table()
            .iter()
            .find(|(_, k)| *k == key)
            .map(|(c, _)| *c)
            .unwrap_or('?')
    }
}

impl FromStr for Keymap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conventional" => Ok(Keymap::Conventional),
            "literal" => Ok(Keymap::Literal),
            _ => Err(format!("unknown keymap '{}'", s)),
        }
    }
}

/// look up an on-screen button label
pub fn lookup_virtual(label: &str) -> Option<KeypadKey> {
    VIRTUAL_KEYMAP
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, key)| *key)
}

/// Where a key edge came from; both sources may be live at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Physical,
    Virtual,
}

fn forward(engine: &mut dyn Engine, source: Source, key: KeypadKey, pressed: bool) {
    trace!("{:?} key {} pressed={}", source, key, pressed);
    match source {
        Source::Physical => engine.keypress(key, pressed),
        Source::Virtual => engine.virtual_keypress(key.symbol(), pressed),
    }
}

/// A key went down or up on the keyboard. Returns whether it was forwarded;
/// keys outside the keymap are dropped.
pub fn physical_key(engine: &mut dyn Engine, keymap: Keymap, c: char, pressed: bool) -> bool {
    match keymap.lookup(c) {
        Some(key) => {
            forward(engine, Source::Physical, key, pressed);
            true
        }
        None => false,
    }
}

/// An on-screen button went down or up. Returns whether it was forwarded.
pub fn virtual_key(engine: &mut dyn Engine, label: &str, pressed: bool) -> bool {
    match lookup_virtual(label) {
        Some(key) => {
            forward(engine, Source::Virtual, key, pressed);
            true
        }
        None => false,
    }
}
