//! Domain types for the SX3 protocol

use serde::Serialize;
use std::{fmt, str::FromStr};

use super::error::DecodeError;

/// Lock state of the bike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0x00,
    Locked = 0x01,
    AwaitingUnlock = 0x02,
}

impl LockState {
    pub const ALL: [LockState; 3] = [
        LockState::Unlocked,
        LockState::Locked,
        LockState::AwaitingUnlock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LockState::Unlocked => "unlocked",
            LockState::Locked => "locked",
            LockState::AwaitingUnlock => "awaiting_unlock",
        }
    }
}

impl TryFrom<u8> for LockState {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(LockState::Unlocked),
            0x01 => Ok(LockState::Locked),
            0x02 => Ok(LockState::AwaitingUnlock),
            other => Err(DecodeError::UnknownLockState(other)),
        }
    }
}

impl From<LockState> for u8 {
    fn from(state: LockState) -> Self {
        state as u8
    }
}

/// Tone played by the handlebar bell button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BellTone {
    Bell = 0x16,
    Party = 0x17,
    Boat = 0x18,
}

impl BellTone {
    pub const ALL: [BellTone; 3] = [BellTone::Bell, BellTone::Party, BellTone::Boat];

    pub fn name(self) -> &'static str {
        match self {
            BellTone::Bell => "bell",
            BellTone::Party => "party",
            BellTone::Boat => "boat",
        }
    }
}

impl TryFrom<u8> for BellTone {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x16 => Ok(BellTone::Bell),
            0x17 => Ok(BellTone::Party),
            0x18 => Ok(BellTone::Boat),
            other => Err(DecodeError::UnknownBellTone(other)),
        }
    }
}

impl From<BellTone> for u8 {
    fn from(tone: BellTone) -> Self {
        tone as u8
    }
}

/// Sounds the module speaker can play on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Sound {
    ScrollingTone = 0x01,
    BeepNegative = 0x02,
    BeepPositive = 0x03,
    BeepBoth = 0x04,
    AlarmStageOne = 0x05,
    AlarmStageTwo = 0x06,
    SystemStartup = 0x07,
    SystemShutdown = 0x08,
    Countdown = 0x09,
    LockTone = 0x0a,
    UnlockTone = 0x0b,
    ConfirmTone = 0x0c,
    ErrorTone = 0x0d,
    BatteryLow = 0x0e,
    BatteryFull = 0x0f,
    ChargingStart = 0x10,
    ChargingStop = 0x11,
    FirmwareUpdateStart = 0x12,
    FirmwareUpdateDone = 0x13,
    PairingStart = 0x14,
    PairingDone = 0x15,
    Bell = 0x16,
    Party = 0x17,
    Boat = 0x18,
    Horn = 0x19,
    WrongCode = 0x1a,
    TheftAlert = 0x1b,
    KickLockConfirm = 0x1c,
    PowerLevelUp = 0x1d,
    PowerLevelDown = 0x1e,
    Tick = 0x1f,
}

impl Sound {
    pub const ALL: [Sound; 31] = [
        Sound::ScrollingTone,
        Sound::BeepNegative,
        Sound::BeepPositive,
        Sound::BeepBoth,
        Sound::AlarmStageOne,
        Sound::AlarmStageTwo,
        Sound::SystemStartup,
        Sound::SystemShutdown,
        Sound::Countdown,
        Sound::LockTone,
        Sound::UnlockTone,
        Sound::ConfirmTone,
        Sound::ErrorTone,
        Sound::BatteryLow,
        Sound::BatteryFull,
        Sound::ChargingStart,
        Sound::ChargingStop,
        Sound::FirmwareUpdateStart,
        Sound::FirmwareUpdateDone,
        Sound::PairingStart,
        Sound::PairingDone,
        Sound::Bell,
        Sound::Party,
        Sound::Boat,
        Sound::Horn,
        Sound::WrongCode,
        Sound::TheftAlert,
        Sound::KickLockConfirm,
        Sound::PowerLevelUp,
        Sound::PowerLevelDown,
        Sound::Tick,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sound::ScrollingTone => "scrolling_tone",
            Sound::BeepNegative => "beep_negative",
            Sound::BeepPositive => "beep_positive",
            Sound::BeepBoth => "beep_both",
            Sound::AlarmStageOne => "alarm_stage_one",
            Sound::AlarmStageTwo => "alarm_stage_two",
            Sound::SystemStartup => "system_startup",
            Sound::SystemShutdown => "system_shutdown",
            Sound::Countdown => "countdown",
            Sound::LockTone => "lock_tone",
            Sound::UnlockTone => "unlock_tone",
            Sound::ConfirmTone => "confirm_tone",
            Sound::ErrorTone => "error_tone",
            Sound::BatteryLow => "battery_low",
            Sound::BatteryFull => "battery_full",
            Sound::ChargingStart => "charging_start",
            Sound::ChargingStop => "charging_stop",
            Sound::FirmwareUpdateStart => "firmware_update_start",
            Sound::FirmwareUpdateDone => "firmware_update_done",
            Sound::PairingStart => "pairing_start",
            Sound::PairingDone => "pairing_done",
            Sound::Bell => "bell",
            Sound::Party => "party",
            Sound::Boat => "boat",
            Sound::Horn => "horn",
            Sound::WrongCode => "wrong_code",
            Sound::TheftAlert => "theft_alert",
            Sound::KickLockConfirm => "kick_lock_confirm",
            Sound::PowerLevelUp => "power_level_up",
            Sound::PowerLevelDown => "power_level_down",
            Sound::Tick => "tick",
        }
    }
}

impl TryFrom<u8> for Sound {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Sound::ALL
            .into_iter()
            .find(|sound| *sound as u8 == value)
            .ok_or(DecodeError::UnknownSound(value))
    }
}

impl From<Sound> for u8 {
    fn from(sound: Sound) -> Self {
        sound as u8
    }
}

impl From<BellTone> for Sound {
    fn from(tone: BellTone) -> Self {
        match tone {
            BellTone::Bell => Sound::Bell,
            BellTone::Party => Sound::Party,
            BellTone::Boat => Sound::Boat,
        }
    }
}

macro_rules! named_enum {
    ($ty:ty) => {
        impl FromStr for $ty {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
                <$ty>::ALL
                    .into_iter()
                    .find(|v| v.name() == wanted)
                    .ok_or_else(|| DecodeError::UnknownName(s.to_string()))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

named_enum!(LockState);
named_enum!(BellTone);
named_enum!(Sound);

/// Single-use challenge value read from the Security/Challenge characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; 2]);

impl Nonce {
    pub const LEN: usize = 2;

    pub fn new(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Nonce {
    type Error = DecodeError;

    /// Takes the first two bytes of a challenge read
    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        match value {
            [a, b, ..] => Ok(Self([*a, *b])),
            _ => Err(DecodeError::ShortNonce(value.len())),
        }
    }
}

/// Snapshot of the bike's telemetry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BikeStatus {
    pub frame_number: String,
    /// Motor battery charge in percent
    pub battery_level: u8,
    /// Odometer in kilometers
    pub distance_km: f64,
    /// Raw speed value as reported by the module
    pub speed: u128,
    pub power_level: u128,
    pub lock_state: LockState,
    pub sound_volume: u128,
}
