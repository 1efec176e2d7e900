mod command;
mod communication;

pub use command::*;
pub use communication::*;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SendPacket {
    Communication(Communication),
    Command(Command),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ResponsePacket {
    CommunicationResponse(CommunicationResponse),
    CommandResponse(CommandResponse),
}

impl SendPacket {
    /// Serializes the packet as one line of the wire protocol (`\r\n` terminated).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string(self)? + "\r\n")
    }
}

impl ResponsePacket {
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(serde_json::to_string(self)? + "\r\n")
    }
}

/// Drains every complete `\n` terminated line from `buffer`, leaving a trailing
/// partial line in place. A `\r` before the newline is stripped.
pub fn extract_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let mut chunk = buffer.drain(..=pos).collect::<Vec<_>>();
        chunk.pop(); // remove the `\n`
        if chunk.last() == Some(&b'\r') {
            chunk.pop();
        }
        if let Ok(s) = String::from_utf8(chunk) {
            if !s.trim().is_empty() {
                lines.push(s);
            }
        }
    }
    lines
}
