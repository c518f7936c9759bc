//! GATT service and characteristic UUIDs of the SX3 electronics module
//!
//! Every logical operation is a [`Characteristic`] variant. Resolution to
//! UUIDs is an exhaustive `match`, so an unknown operation cannot be named.

use uuid::Uuid;

use crate::core::error::DecodeError;

/// GATT service categories exposed by the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Security,
    Defense,
    Movement,
    BikeInfo,
    BikeState,
    Sound,
    Light,
}

impl Service {
    pub const ALL: [Service; 7] = [
        Service::Security,
        Service::Defense,
        Service::Movement,
        Service::BikeInfo,
        Service::BikeState,
        Service::Sound,
        Service::Light,
    ];

    pub const fn uuid(self) -> Uuid {
        match self {
            Service::Security => Uuid::from_u128(0x6acc5500_e631_4069_944d_b8ca7598ad50),
            Service::Defense => Uuid::from_u128(0x6acc5520_e631_4069_944d_b8ca7598ad50),
            Service::Movement => Uuid::from_u128(0x6acc5530_e631_4069_944d_b8ca7598ad50),
            Service::BikeInfo => Uuid::from_u128(0x6acc5540_e631_4069_944d_b8ca7598ad50),
            Service::BikeState => Uuid::from_u128(0x6acc5560_e631_4069_944d_b8ca7598ad50),
            Service::Sound => Uuid::from_u128(0x6acc5570_e631_4069_944d_b8ca7598ad50),
            Service::Light => Uuid::from_u128(0x6acc5580_e631_4069_944d_b8ca7598ad50),
        }
    }
}

/// Logical operations addressable on the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Characteristic {
    // Security
    /// Plaintext nonce issued per exchange
    Challenge,
    /// Authentication payload sink
    KeyIndex,
    BackupCode,
    BikeMessage,

    // Defense
    LockState,
    UnlockRequest,
    AlarmState,
    AlarmMode,

    // Movement
    /// Odometer in hectometers
    Distance,
    Speed,
    UnitSystem,
    PowerLevel,
    SpeedLimit,
    EShifterGear,
    EShiftingPoints,
    EShifterMode,

    // BikeInfo
    MotorBatteryLevel,
    MotorBatteryState,
    ModuleBatteryLevel,
    ModuleBatteryState,
    BikeFirmwareVersion,
    BleChipFirmwareVersion,
    ControllerFirmwareVersion,
    PcbaHardwareVersion,
    GsmFirmwareVersion,
    EShifterFirmwareVersion,
    BatteryFirmwareVersion,
    /// Plaintext ASCII frame number
    FrameNumber,

    // BikeState
    ModuleMode,
    ModuleState,
    Errors,
    WheelSize,
    Clock,

    // Sound
    PlaySound,
    SoundVolume,
    BellSound,

    // Light
    LightMode,
    Sensor,
}

impl Characteristic {
    pub const ALL: [Characteristic; 38] = [
        Characteristic::Challenge,
        Characteristic::KeyIndex,
        Characteristic::BackupCode,
        Characteristic::BikeMessage,
        Characteristic::LockState,
        Characteristic::UnlockRequest,
        Characteristic::AlarmState,
        Characteristic::AlarmMode,
        Characteristic::Distance,
        Characteristic::Speed,
        Characteristic::UnitSystem,
        Characteristic::PowerLevel,
        Characteristic::SpeedLimit,
        Characteristic::EShifterGear,
        Characteristic::EShiftingPoints,
        Characteristic::EShifterMode,
        Characteristic::MotorBatteryLevel,
        Characteristic::MotorBatteryState,
        Characteristic::ModuleBatteryLevel,
        Characteristic::ModuleBatteryState,
        Characteristic::BikeFirmwareVersion,
        Characteristic::BleChipFirmwareVersion,
        Characteristic::ControllerFirmwareVersion,
        Characteristic::PcbaHardwareVersion,
        Characteristic::GsmFirmwareVersion,
        Characteristic::EShifterFirmwareVersion,
        Characteristic::BatteryFirmwareVersion,
        Characteristic::FrameNumber,
        Characteristic::ModuleMode,
        Characteristic::ModuleState,
        Characteristic::Errors,
        Characteristic::WheelSize,
        Characteristic::Clock,
        Characteristic::PlaySound,
        Characteristic::SoundVolume,
        Characteristic::BellSound,
        Characteristic::LightMode,
        Characteristic::Sensor,
    ];

    /// Service category this characteristic belongs to
    pub const fn service(self) -> Service {
        use Characteristic::*;

        match self {
            Challenge | KeyIndex | BackupCode | BikeMessage => Service::Security,
            LockState | UnlockRequest | AlarmState | AlarmMode => Service::Defense,
            Distance | Speed | UnitSystem | PowerLevel | SpeedLimit | EShifterGear
            | EShiftingPoints | EShifterMode => Service::Movement,
            MotorBatteryLevel
            | MotorBatteryState
            | ModuleBatteryLevel
            | ModuleBatteryState
            | BikeFirmwareVersion
            | BleChipFirmwareVersion
            | ControllerFirmwareVersion
            | PcbaHardwareVersion
            | GsmFirmwareVersion
            | EShifterFirmwareVersion
            | BatteryFirmwareVersion
            | FrameNumber => Service::BikeInfo,
            ModuleMode | ModuleState | Errors | WheelSize | Clock => Service::BikeState,
            PlaySound | SoundVolume | BellSound => Service::Sound,
            LightMode | Sensor => Service::Light,
        }
    }

    pub const fn uuid(self) -> Uuid {
        use Characteristic::*;

        let prefix: u128 = match self {
            Challenge => 0x6acc5501,
            KeyIndex => 0x6acc5502,
            BackupCode => 0x6acc5503,
            BikeMessage => 0x6acc5505,

            LockState => 0x6acc5521,
            UnlockRequest => 0x6acc5522,
            AlarmState => 0x6acc5523,
            AlarmMode => 0x6acc5524,

            Distance => 0x6acc5531,
            Speed => 0x6acc5532,
            UnitSystem => 0x6acc5533,
            PowerLevel => 0x6acc5534,
            SpeedLimit => 0x6acc5535,
            EShifterGear => 0x6acc5536,
            EShiftingPoints => 0x6acc5537,
            EShifterMode => 0x6acc5538,

            MotorBatteryLevel => 0x6acc5541,
            MotorBatteryState => 0x6acc5542,
            ModuleBatteryLevel => 0x6acc5543,
            ModuleBatteryState => 0x6acc5544,
            BikeFirmwareVersion => 0x6acc554a,
            BleChipFirmwareVersion => 0x6acc554b,
            ControllerFirmwareVersion => 0x6acc554c,
            PcbaHardwareVersion => 0x6acc554d,
            GsmFirmwareVersion => 0x6acc554e,
            EShifterFirmwareVersion => 0x6acc554f,
            BatteryFirmwareVersion => 0x6acc5550,
            FrameNumber => 0x6acc5552,

            ModuleMode => 0x6acc5561,
            ModuleState => 0x6acc5562,
            Errors => 0x6acc5563,
            WheelSize => 0x6acc5564,
            Clock => 0x6acc5567,

            PlaySound => 0x6acc5571,
            SoundVolume => 0x6acc5572,
            BellSound => 0x6acc5574,

            LightMode => 0x6acc5581,
            Sensor => 0x6acc5584,
        };

        Uuid::from_u128((prefix << 96) | UUID_SUFFIX)
    }

    /// Resolve to `(service UUID, characteristic UUID)`
    pub const fn resolve(self) -> (Uuid, Uuid) {
        (self.service().uuid(), self.uuid())
    }

    pub fn name(self) -> &'static str {
        use Characteristic::*;

        match self {
            Challenge => "challenge",
            KeyIndex => "key_index",
            BackupCode => "backup_code",
            BikeMessage => "bike_message",
            LockState => "lock_state",
            UnlockRequest => "unlock_request",
            AlarmState => "alarm_state",
            AlarmMode => "alarm_mode",
            Distance => "distance",
            Speed => "speed",
            UnitSystem => "unit_system",
            PowerLevel => "power_level",
            SpeedLimit => "speed_limit",
            EShifterGear => "e_shifter_gear",
            EShiftingPoints => "e_shifting_points",
            EShifterMode => "e_shifter_mode",
            MotorBatteryLevel => "motor_battery_level",
            MotorBatteryState => "motor_battery_state",
            ModuleBatteryLevel => "module_battery_level",
            ModuleBatteryState => "module_battery_state",
            BikeFirmwareVersion => "bike_firmware_version",
            BleChipFirmwareVersion => "ble_chip_firmware_version",
            ControllerFirmwareVersion => "controller_firmware_version",
            PcbaHardwareVersion => "pcba_hardware_version",
            GsmFirmwareVersion => "gsm_firmware_version",
            EShifterFirmwareVersion => "e_shifter_firmware_version",
            BatteryFirmwareVersion => "battery_firmware_version",
            FrameNumber => "frame_number",
            ModuleMode => "module_mode",
            ModuleState => "module_state",
            Errors => "errors",
            WheelSize => "wheel_size",
            Clock => "clock",
            PlaySound => "play_sound",
            SoundVolume => "sound_volume",
            BellSound => "bell_sound",
            LightMode => "light_mode",
            Sensor => "sensor",
        }
    }
}

impl std::str::FromStr for Characteristic {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Characteristic::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| DecodeError::UnknownName(s.to_string()))
    }
}

impl std::fmt::Display for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lower 96 bits shared by every SX3 UUID
const UUID_SUFFIX: u128 = 0xe631_4069_944d_b8ca7598ad50;
