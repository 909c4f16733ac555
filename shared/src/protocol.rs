//! Payload encoding for the three wire messages
//!
//! - identity: server → client, once, the raw UTF-8 session id
//! - state update: client → server, JSON [`PlayerState`]
//! - snapshot: server → client, JSON [`WorldSnapshot`]

use crate::{PlayerState, ProtocolError, SessionId, WorldSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode_identity(id: &SessionId) -> Vec<u8> {
    id.as_str().as_bytes().to_vec()
}

pub fn decode_identity(payload: &[u8]) -> Result<SessionId, ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidIdentity)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ProtocolError::InvalidIdentity);
    }
    Ok(SessionId::from(text))
}

fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

pub fn encode_state(state: &PlayerState) -> Result<Vec<u8>, ProtocolError> {
    encode(state)
}

pub fn decode_state(payload: &[u8]) -> Result<PlayerState, ProtocolError> {
    decode(payload)
}

pub fn encode_snapshot(snapshot: &WorldSnapshot) -> Result<Vec<u8>, ProtocolError> {
    encode(snapshot)
}

pub fn decode_snapshot(payload: &[u8]) -> Result<WorldSnapshot, ProtocolError> {
    decode(payload)
}
