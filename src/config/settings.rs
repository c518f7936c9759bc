//! Runtime settings

use bluer::Address;
use std::time::Duration;

use crate::{
    config::{CliArgs, cli::Command},
    core::{cipher::CipherEngine, error::ConfigError},
};

/// Runtime configuration settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub adapter: Option<String>,
    pub address: Option<Address>,
    /// Engine built from the bike key; the key itself is not kept
    pub cipher: Option<CipherEngine>,
    pub timeout: Duration,
    pub command: Command,
}

impl Settings {
    /// Cipher engine for commands that need the key
    pub fn require_cipher(&self) -> Result<&CipherEngine, ConfigError> {
        self.cipher.as_ref().ok_or(ConfigError::MissingKey)
    }
}

impl TryFrom<CliArgs> for Settings {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let address = args
            .address
            .as_deref()
            .map(|address| {
                address
                    .parse::<Address>()
                    .map_err(|_| ConfigError::InvalidAddress(address.to_string()))
            })
            .transpose()?;

        let cipher = args
            .key
            .as_deref()
            .map(CipherEngine::from_hex)
            .transpose()?;

        if cipher.is_none() && args.command.requires_key() {
            return Err(ConfigError::MissingKey);
        }

        Ok(Settings {
            adapter: args.adapter,
            address,
            cipher,
            timeout: Duration::from_secs(args.timeout),
            command: args.command,
        })
    }
}
