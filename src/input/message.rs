//! Wire format of the messages sent to the backend.

use serde::{Deserialize, Serialize};

/// Keys the backend understands. Everything else is dropped at the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameKey {
    #[serde(rename = "W")]
    W,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "S")]
    S,
    #[serde(rename = "D")]
    D,
    #[serde(rename = " ")]
    Space,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "1")]
    Digit1,
    #[serde(rename = "2")]
    Digit2,
    #[serde(rename = "3")]
    Digit3,
}

impl GameKey {
    /// Maps the text a key produces, case-insensitively.
    pub fn from_key_text(text: &str) -> Option<Self> {
        let key = match text.to_ascii_uppercase().as_str() {
            "W" => Self::W,
            "A" => Self::A,
            "S" => Self::S,
            "D" => Self::D,
            " " => Self::Space,
            "R" => Self::R,
            "C" => Self::C,
            "1" => Self::Digit1,
            "2" => Self::Digit2,
            "3" => Self::Digit3,
            _ => return None,
        };
        Some(key)
    }
}

/// A discrete event, sent in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Message {
    KeyDown(GameKey),
    KeyUp(GameKey),
    /// Pointer button in DOM numbering: 0 primary, 1 auxiliary, 2 secondary.
    MouseDown(u16),
}

/// Pointer motion summed over one window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseMove {
    pub mouse_move_x: f64,
    pub mouse_move_y: f64,
}

/// One entry of a combined `/mnkevent` batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Discrete(Message),
    Motion(MouseMove),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub events: Vec<BatchEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Key,
    Mouse,
    Combined,
    TexturesLoaded,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Key => "/keyevent",
            Self::Mouse => "/mouseevent",
            Self::Combined => "/mnkevent",
            Self::TexturesLoaded => "/texturesload",
        }
    }
}

/// Body of one outbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Message(Message),
    Motion(MouseMove),
    Batch(Batch),
    Empty {},
}
