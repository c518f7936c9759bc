//! Nonce-challenge authentication handshake
//!
//! The module issues a fresh two-byte nonce on the Security/Challenge
//! characteristic. Authentication writes the key-encrypted nonce block plus
//! a fixed trailer to Security/KeyIndex. The module never acknowledges the
//! write, so the handshake can only reach `HandshakeSent`; a rejected key
//! shows up later as transport errors on privileged operations.

use tracing::{debug, warn};

use crate::{
    core::{cipher::CipherEngine, error::ClientResult, types::Nonce},
    protocol::registry::Characteristic,
    transport::GattTransport,
};

/// Handshake progress as observable from the client side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HandshakeState {
    #[default]
    Unauthenticated,
    HandshakeSent,
}

/// Authentication handshake state machine
#[derive(Debug, Default)]
pub struct Handshake {
    state: HandshakeState,
}

impl Handshake {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Send the authentication payload
    ///
    /// Any failure leaves the handshake `Unauthenticated` and returns the
    /// error. A successful write is assumed to be accepted.
    pub async fn perform<T: GattTransport>(
        &mut self,
        transport: &T,
        cipher: &CipherEngine,
    ) -> ClientResult<()> {
        self.state = HandshakeState::Unauthenticated;

        let nonce = read_nonce(transport).await?;
        let payload = cipher.build_authentication_payload(&nonce);

        let (service, characteristic) = Characteristic::KeyIndex.resolve();
        if let Err(e) = transport.write(service, characteristic, &payload).await {
            warn!("Authentication write failed: {}", e);
            return Err(e.into());
        }

        debug!("Authentication payload sent ({} bytes)", payload.len());
        self.state = HandshakeState::HandshakeSent;
        Ok(())
    }
}

/// Read a fresh nonce from the challenge characteristic (plaintext)
pub async fn read_nonce<T: GattTransport>(transport: &T) -> ClientResult<Nonce> {
    let (service, characteristic) = Characteristic::Challenge.resolve();
    let value = transport.read(service, characteristic).await?;
    Ok(Nonce::try_from(value.as_slice())?)
}
