//! Command encodings and telemetry decoders
//!
//! Commands produce the `data` bytes that go after the nonce in an
//! encrypted write. Decoders take the plaintext returned by a read.

use crate::core::{
    error::{DecodeError, RangeError},
    types::{BellTone, LockState, Sound},
};

/// Highest assist level the motor accepts
pub const MAX_POWER_LEVEL: i32 = 5;

/// Flag byte sent after the power level
const POWER_LEVEL_APPLY: u8 = 0x01;

pub fn lock_state_command(state: LockState) -> [u8; 1] {
    [state.into()]
}

pub fn bell_tone_command(tone: BellTone) -> [u8; 1] {
    [tone.into()]
}

/// `[level, 0x01]`; level must be within 0..=5
pub fn power_level_command(level: i32) -> Result<[u8; 2], RangeError> {
    match u8::try_from(level) {
        Ok(byte) if level <= MAX_POWER_LEVEL => Ok([byte, POWER_LEVEL_APPLY]),
        _ => Err(RangeError::PowerLevel(level)),
    }
}

/// `[sound, count]`; the sound is played `count` times
pub fn play_sound_command(sound: Sound, count: u8) -> Result<[u8; 2], RangeError> {
    if count == 0 {
        return Err(RangeError::RepeatCount);
    }
    Ok([sound.into(), count])
}

/// Motor battery charge in percent (first byte)
pub fn decode_battery_level(value: &[u8]) -> Result<u8, DecodeError> {
    value.first().copied().ok_or(DecodeError::EmptyPayload)
}

pub fn decode_lock_state(value: &[u8]) -> Result<LockState, DecodeError> {
    let byte = value.first().copied().ok_or(DecodeError::EmptyPayload)?;
    LockState::try_from(byte)
}

/// Little-endian unsigned integer spanning the whole value
///
/// Every byte of a single decrypted block is significant. Longer values are
/// accepted as long as bytes past the sixteenth are zero.
pub fn decode_little_endian(value: &[u8]) -> Result<u128, DecodeError> {
    if value.is_empty() {
        return Err(DecodeError::EmptyPayload);
    }

    let (low, high) = value.split_at(value.len().min(16));
    if high.iter().any(|b| *b != 0) {
        return Err(DecodeError::IntegerOverflow);
    }

    let mut bytes = [0u8; 16];
    bytes[..low.len()].copy_from_slice(low);
    Ok(u128::from_le_bytes(bytes))
}

/// Odometer in kilometers; the module counts hectometers
pub fn decode_distance_km(value: &[u8]) -> Result<f64, DecodeError> {
    Ok(decode_little_endian(value)? as f64 / 10.0)
}

/// ASCII text, returned unchanged
pub fn decode_ascii(value: &[u8]) -> Result<String, DecodeError> {
    if !value.is_ascii() {
        return Err(DecodeError::InvalidAscii);
    }
    Ok(value.iter().map(|b| char::from(*b)).collect())
}
