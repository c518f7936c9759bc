//! Command-line argument parsing

use clap::{Parser, Subcommand};

use crate::{
    core::types::{BellTone, Sound},
    protocol::registry::Characteristic,
};

#[derive(Parser, Debug, Clone)]
#[clap(name = "sx3", version, author)]
#[clap(about = "Control an SX3 e-bike over Bluetooth Low Energy")]
pub struct CliArgs {
    /// Bluetooth adapter name (defaults to the system default adapter)
    #[clap(short, long)]
    pub adapter: Option<String>,

    /// Bike Bluetooth address; the bike is discovered when omitted
    #[clap(short = 'd', long)]
    pub address: Option<String>,

    /// 128-bit bike key as 32 hex characters
    #[clap(short, long, env = "SX3_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Discovery and connection timeout in seconds
    #[clap(long, default_value = "10")]
    pub timeout: u64,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Scan for a nearby bike and print its address
    Discover,

    /// Print battery, lock state, speed and other telemetry
    Status {
        /// Print as JSON
        #[clap(long)]
        json: bool,
    },

    /// Lock the bike
    Lock,

    /// Unlock the bike
    Unlock,

    /// Select the bell tone (bell, party, boat)
    Bell { tone: BellTone },

    /// Set motor assistance level (0-5)
    Power {
        #[clap(allow_negative_numbers = true)]
        level: i32,
    },

    /// Play a sound
    Play {
        sound: Sound,

        /// Number of repetitions
        #[clap(short, long, default_value = "1")]
        count: u8,
    },

    /// Read a characteristic and print its bytes as hex
    Read {
        characteristic: Characteristic,

        /// Skip decryption
        #[clap(long)]
        plain: bool,
    },
}

impl Command {
    /// Whether the command talks to the bike with the key
    pub fn requires_key(&self) -> bool {
        match self {
            Command::Discover => false,
            Command::Read { plain, .. } => !plain,
            _ => true,
        }
    }

    /// Whether the bike must be authenticated before running the command
    pub fn requires_authentication(&self) -> bool {
        !matches!(self, Command::Discover | Command::Read { plain: true, .. })
    }
}
