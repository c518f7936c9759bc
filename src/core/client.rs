//! SX3 protocol client
//!
//! Every public operation is one of three exchanges:
//!
//! - plain read: challenge nonce and frame number
//! - decrypted read: everything else that is read
//! - encrypted write: fresh nonce, then the encrypted command payload
//!
//! Operations hold the link mutex for their whole exchange, so a nonce is
//! always consumed by the write that fetched it, even with concurrent callers.

use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::{
    core::{
        cipher::CipherEngine,
        error::ClientResult,
        handshake::{Handshake, HandshakeState, read_nonce},
        types::{BellTone, BikeStatus, LockState, Sound},
    },
    protocol::{payload, registry::Characteristic},
    transport::GattTransport,
};

/// Transport plus per-connection handshake state, guarded together
#[derive(Debug)]
struct Link<T> {
    transport: T,
    handshake: Handshake,
}

impl<T: GattTransport> Link<T> {
    async fn read_plain(&self, characteristic: Characteristic) -> ClientResult<Vec<u8>> {
        let (service, uuid) = characteristic.resolve();
        let value = self.transport.read(service, uuid).await?;
        debug!("Read {} ({} bytes)", characteristic, value.len());
        Ok(value)
    }

    async fn read_decrypted(
        &self,
        cipher: &CipherEngine,
        characteristic: Characteristic,
    ) -> ClientResult<Vec<u8>> {
        let value = self.read_plain(characteristic).await?;
        let plain = cipher.decrypt(&value)?;
        trace!("Decrypted {}: {}", characteristic, hex::encode(&plain));
        Ok(plain)
    }

    async fn write_encrypted(
        &self,
        cipher: &CipherEngine,
        characteristic: Characteristic,
        data: &[u8],
    ) -> ClientResult<()> {
        let nonce = read_nonce(&self.transport).await?;
        let payload = cipher.build_encrypted_payload(&nonce, data);

        let (service, uuid) = characteristic.resolve();
        self.transport.write(service, uuid, &payload).await?;
        debug!("Wrote {} ({} bytes)", characteristic, payload.len());
        Ok(())
    }
}

/// Client for the SX3 electronics module
///
/// Wraps one connected GATT transport and the bike's cipher engine for the
/// lifetime of the connection. Calls on one client are serialized; share it
/// behind an `Arc` to issue operations from several tasks.
#[derive(Debug)]
pub struct Sx3Client<T: GattTransport> {
    cipher: CipherEngine,
    link: Mutex<Link<T>>,
}

impl<T: GattTransport> Sx3Client<T> {
    /// Create a new client over a connected transport
    pub fn new(transport: T, cipher: CipherEngine) -> Self {
        Self {
            cipher,
            link: Mutex::new(Link {
                transport,
                handshake: Handshake::new(),
            }),
        }
    }

    /// Create a new client from a hexadecimal bike key
    pub fn with_hex_key(transport: T, key: &str) -> ClientResult<Self> {
        Ok(Self::new(transport, CipherEngine::from_hex(key)?))
    }

    pub fn cipher(&self) -> &CipherEngine {
        &self.cipher
    }

    /// Consume the client and hand back the transport
    pub fn into_transport(self) -> T {
        self.link.into_inner().transport
    }

    /// Perform the authentication handshake
    ///
    /// Success only means the payload was written; the module does not
    /// acknowledge it.
    pub async fn authenticate(&self) -> ClientResult<()> {
        let mut link = self.link.lock().await;
        let Link {
            transport,
            handshake,
        } = &mut *link;

        handshake.perform(transport, &self.cipher).await?;
        info!("Authentication handshake sent");
        Ok(())
    }

    pub async fn handshake_state(&self) -> HandshakeState {
        self.link.lock().await.handshake.state()
    }

    /// Read a characteristic without decryption
    pub async fn read_plain(&self, characteristic: Characteristic) -> ClientResult<Vec<u8>> {
        self.link.lock().await.read_plain(characteristic).await
    }

    /// Read and decrypt a characteristic
    pub async fn read_decrypted(&self, characteristic: Characteristic) -> ClientResult<Vec<u8>> {
        self.link
            .lock()
            .await
            .read_decrypted(&self.cipher, characteristic)
            .await
    }

    /// Encrypt `data` under a fresh nonce and write it to a characteristic
    pub async fn write_encrypted(
        &self,
        characteristic: Characteristic,
        data: &[u8],
    ) -> ClientResult<()> {
        self.link
            .lock()
            .await
            .write_encrypted(&self.cipher, characteristic, data)
            .await
    }

    pub async fn set_lock_state(&self, state: LockState) -> ClientResult<()> {
        info!("Setting lock state to {}", state);
        self.write_encrypted(
            Characteristic::LockState,
            &payload::lock_state_command(state),
        )
        .await
    }

    pub async fn set_bell_tone(&self, tone: BellTone) -> ClientResult<()> {
        info!("Setting bell tone to {}", tone);
        self.write_encrypted(Characteristic::BellSound, &payload::bell_tone_command(tone))
            .await
    }

    /// Set the motor assist level (0..=5)
    ///
    /// Out-of-range levels are rejected before touching the transport.
    pub async fn set_power_level(&self, level: i32) -> ClientResult<()> {
        let data = payload::power_level_command(level)?;
        info!("Setting power level to {}", level);
        self.write_encrypted(Characteristic::PowerLevel, &data).await
    }

    /// Play `sound` `count` times (count must be at least 1)
    pub async fn play_sound(&self, sound: Sound, count: u8) -> ClientResult<()> {
        let data = payload::play_sound_command(sound, count)?;
        info!("Playing {} x{}", sound, count);
        self.write_encrypted(Characteristic::PlaySound, &data).await
    }

    /// Motor battery charge in percent
    pub async fn get_battery_level(&self) -> ClientResult<u8> {
        let value = self.read_decrypted(Characteristic::MotorBatteryLevel).await?;
        Ok(payload::decode_battery_level(&value)?)
    }

    pub async fn get_lock_state(&self) -> ClientResult<LockState> {
        let value = self.read_decrypted(Characteristic::LockState).await?;
        Ok(payload::decode_lock_state(&value)?)
    }

    /// Odometer in kilometers
    pub async fn get_distance_travelled(&self) -> ClientResult<f64> {
        let value = self.read_decrypted(Characteristic::Distance).await?;
        Ok(payload::decode_distance_km(&value)?)
    }

    /// Current speed in raw device units
    pub async fn get_speed(&self) -> ClientResult<u128> {
        let value = self.read_decrypted(Characteristic::Speed).await?;
        Ok(payload::decode_little_endian(&value)?)
    }

    /// Frame number, read unencrypted
    pub async fn get_frame_number(&self) -> ClientResult<String> {
        let value = self.read_plain(Characteristic::FrameNumber).await?;
        Ok(payload::decode_ascii(&value)?)
    }

    /// Raw sound volume value
    pub async fn get_sound_volume(&self) -> ClientResult<u128> {
        let value = self.read_decrypted(Characteristic::SoundVolume).await?;
        Ok(payload::decode_little_endian(&value)?)
    }

    /// Raw power level value
    pub async fn get_power_level(&self) -> ClientResult<u128> {
        let value = self.read_decrypted(Characteristic::PowerLevel).await?;
        Ok(payload::decode_little_endian(&value)?)
    }

    /// Collect all telemetry in one locked sequence
    pub async fn status(&self) -> ClientResult<BikeStatus> {
        let link = self.link.lock().await;
        let cipher = &self.cipher;

        let frame_number =
            payload::decode_ascii(&link.read_plain(Characteristic::FrameNumber).await?)?;
        let battery_level = payload::decode_battery_level(
            &link
                .read_decrypted(cipher, Characteristic::MotorBatteryLevel)
                .await?,
        )?;
        let distance_km = payload::decode_distance_km(
            &link.read_decrypted(cipher, Characteristic::Distance).await?,
        )?;
        let speed = payload::decode_little_endian(
            &link.read_decrypted(cipher, Characteristic::Speed).await?,
        )?;
        let power_level = payload::decode_little_endian(
            &link.read_decrypted(cipher, Characteristic::PowerLevel).await?,
        )?;
        let lock_state = payload::decode_lock_state(
            &link.read_decrypted(cipher, Characteristic::LockState).await?,
        )?;
        let sound_volume = payload::decode_little_endian(
            &link.read_decrypted(cipher, Characteristic::SoundVolume).await?,
        )?;

        Ok(BikeStatus {
            frame_number,
            battery_level,
            distance_km,
            speed,
            power_level,
            lock_state,
            sound_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::{
            cipher::BLOCK_SIZE,
            error::{ClientError, DecodeError, FormatError, RangeError, TransportError},
            types::Nonce,
        },
        transport::{MockTransport, TransportCall},
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    const KEY_HEX: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    async fn create_test_client() -> (Sx3Client<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        transport.set_value(Characteristic::Challenge, *b"ab").await;
        let client = Sx3Client::with_hex_key(transport.clone(), KEY_HEX).unwrap();
        (client, transport)
    }

    /// Encrypt `plain` zero-padded to whole blocks, as the module would
    fn device_value(client: &Sx3Client<MockTransport>, plain: &[u8]) -> Vec<u8> {
        let mut padded = plain.to_vec();
        padded.resize(plain.len().div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE, 0);
        client.cipher().encrypt_blocks(&padded).unwrap()
    }

    /// Decrypt a written payload and strip the nonce
    fn written_data(client: &Sx3Client<MockTransport>, payload: &[u8]) -> (Nonce, Vec<u8>) {
        let plain = client.cipher().decrypt(payload).unwrap();
        (Nonce::new([plain[0], plain[1]]), plain[2..].to_vec())
    }

    #[tokio::test]
    async fn test_set_power_level_writes_level_and_flag() {
        let (client, transport) = create_test_client().await;

        for level in 0..=5 {
            transport.clear_calls().await;
            assert_ok!(client.set_power_level(level).await);

            let calls = transport.calls().await;
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[0].characteristic(), Characteristic::Challenge.uuid());
            assert!(!calls[0].is_write());
            assert_eq!(calls[1].characteristic(), Characteristic::PowerLevel.uuid());

            let writes = transport.writes_to(Characteristic::PowerLevel).await;
            assert_eq!(writes[0].len(), 16);
            let (nonce, data) = written_data(&client, &writes[0]);
            assert_eq!(nonce, Nonce::new(*b"ab"));
            assert_eq!(&data[..2], &[level as u8, 0x01]);
            assert!(data[2..].iter().all(|b| *b == 0));
        }
    }

    #[tokio::test]
    async fn test_set_power_level_out_of_range_skips_io() {
        let (client, transport) = create_test_client().await;

        for level in [-1, 6] {
            let result = client.set_power_level(level).await;
            assert!(matches!(
                result,
                Err(ClientError::Range(RangeError::PowerLevel(l))) if l == level
            ));
        }
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_play_sound() {
        let (client, transport) = create_test_client().await;

        client.play_sound(Sound::ScrollingTone, 2).await.unwrap();
        let writes = transport.writes_to(Characteristic::PlaySound).await;
        let (_, data) = written_data(&client, &writes[0]);
        assert_eq!(&data[..2], &[0x01u8, 0x02]);

        transport.clear_calls().await;
        let result = client.play_sound(Sound::Bell, 0).await;
        assert!(matches!(
            result,
            Err(ClientError::Range(RangeError::RepeatCount))
        ));
        assert!(transport.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_lock_state_and_bell_tone() {
        let (client, transport) = create_test_client().await;

        client.set_lock_state(LockState::Locked).await.unwrap();
        client.set_bell_tone(BellTone::Boat).await.unwrap();

        let lock = transport.writes_to(Characteristic::LockState).await;
        assert_eq!(written_data(&client, &lock[0]).1[0], 0x01);

        let bell = transport.writes_to(Characteristic::BellSound).await;
        assert_eq!(written_data(&client, &bell[0]).1[0], 0x18);
    }

    #[tokio::test]
    async fn test_each_write_uses_a_fresh_nonce() {
        let (client, transport) = create_test_client().await;
        transport.queue_value(Characteristic::Challenge, *b"n1").await;
        transport.queue_value(Characteristic::Challenge, *b"n2").await;

        client.set_lock_state(LockState::Unlocked).await.unwrap();
        client.set_lock_state(LockState::Locked).await.unwrap();

        let writes = transport.writes_to(Characteristic::LockState).await;
        assert_eq!(written_data(&client, &writes[0]).0, Nonce::new(*b"n1"));
        assert_eq!(written_data(&client, &writes[1]).0, Nonce::new(*b"n2"));
    }

    #[tokio::test]
    async fn test_get_distance_travelled() {
        let (client, transport) = create_test_client().await;
        let value = device_value(&client, &1234u32.to_le_bytes());
        transport.set_value(Characteristic::Distance, value).await;

        assert_eq!(client.get_distance_travelled().await.unwrap(), 123.4);
    }

    #[tokio::test]
    async fn test_get_battery_level() {
        let (client, transport) = create_test_client().await;
        let value = device_value(&client, &[87]);
        transport.set_value(Characteristic::MotorBatteryLevel, value).await;

        assert_eq!(client.get_battery_level().await.unwrap(), 87);
    }

    #[tokio::test]
    async fn test_get_lock_state() {
        let (client, transport) = create_test_client().await;

        let value = device_value(&client, &[0x01]);
        transport.set_value(Characteristic::LockState, value).await;
        assert_eq!(client.get_lock_state().await.unwrap(), LockState::Locked);

        let value = device_value(&client, &[0x05]);
        transport.set_value(Characteristic::LockState, value).await;
        assert!(matches!(
            client.get_lock_state().await,
            Err(ClientError::Decode(DecodeError::UnknownLockState(0x05)))
        ));
    }

    #[tokio::test]
    async fn test_get_raw_values() {
        let (client, transport) = create_test_client().await;
        transport
            .set_value(Characteristic::Speed, device_value(&client, &[0x2c, 0x01]))
            .await;
        transport
            .set_value(Characteristic::SoundVolume, device_value(&client, &[7]))
            .await;
        transport
            .set_value(Characteristic::PowerLevel, device_value(&client, &[3, 1]))
            .await;

        assert_eq!(client.get_speed().await.unwrap(), 300);
        assert_eq!(client.get_sound_volume().await.unwrap(), 7);
        assert_eq!(client.get_power_level().await.unwrap(), 0x0103);
    }

    #[tokio::test]
    async fn test_get_speed_reads_whole_block() {
        let (client, transport) = create_test_client().await;
        let mut plain = [0u8; BLOCK_SIZE];
        plain[0] = 0x2c;
        plain[12] = 0x01;
        transport
            .set_value(Characteristic::Speed, device_value(&client, &plain))
            .await;

        assert_eq!(client.get_speed().await.unwrap(), (1u128 << 96) | 0x2c);
    }

    #[tokio::test]
    async fn test_get_frame_number_is_plaintext() {
        let (client, transport) = create_test_client().await;

        transport.set_value(Characteristic::FrameNumber, *b"SX3-001").await;
        assert_eq!(client.get_frame_number().await.unwrap(), "SX3-001");

        transport
            .set_value(Characteristic::FrameNumber, vec![b'S', 0xc3, 0xa9])
            .await;
        assert!(matches!(
            client.get_frame_number().await,
            Err(ClientError::Decode(DecodeError::InvalidAscii))
        ));
    }

    #[tokio::test]
    async fn test_unaligned_ciphertext_is_format_error() {
        let (client, transport) = create_test_client().await;
        transport.set_value(Characteristic::Speed, vec![0u8; 15]).await;

        assert!(matches!(
            client.get_speed().await,
            Err(ClientError::Format(FormatError::UnalignedCiphertext(15)))
        ));
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let (client, transport) = create_test_client().await;
        transport.set_write_failure(Characteristic::LockState, true).await;

        let result = client.set_lock_state(LockState::Unlocked).await;
        assert!(matches!(
            result,
            Err(ClientError::Transport(TransportError::NotPermitted(_)))
        ));

        // Missing characteristic on read
        assert!(matches!(
            client.get_battery_level().await,
            Err(ClientError::Transport(TransportError::CharacteristicNotFound(_)))
        ));
        // One failed write, one failed read, no retries
        assert_eq!(transport.calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let (client, transport) = create_test_client().await;
        assert_eq!(client.handshake_state().await, HandshakeState::Unauthenticated);

        client.authenticate().await.unwrap();
        assert_eq!(client.handshake_state().await, HandshakeState::HandshakeSent);

        let writes = transport.writes_to(Characteristic::KeyIndex).await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].len(), 20);
        assert_eq!(&writes[0][16..], &[0u8, 0, 0, 2]);
    }

    #[tokio::test]
    async fn test_authenticate_failure_propagates() {
        let (client, transport) = create_test_client().await;
        transport.set_write_failure(Characteristic::KeyIndex, true).await;

        assert_err!(client.authenticate().await);
        assert_eq!(client.handshake_state().await, HandshakeState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let (client, transport) = create_test_client().await;
        transport.set_value(Characteristic::FrameNumber, *b"SX3-042").await;
        transport
            .set_value(Characteristic::MotorBatteryLevel, device_value(&client, &[64]))
            .await;
        transport
            .set_value(Characteristic::Distance, device_value(&client, &[0x10, 0x27]))
            .await;
        transport
            .set_value(Characteristic::Speed, device_value(&client, &[0]))
            .await;
        transport
            .set_value(Characteristic::PowerLevel, device_value(&client, &[2]))
            .await;
        transport
            .set_value(Characteristic::LockState, device_value(&client, &[0x02]))
            .await;
        transport
            .set_value(Characteristic::SoundVolume, device_value(&client, &[5]))
            .await;

        let status = client.status().await.unwrap();
        assert_eq!(
            status,
            BikeStatus {
                frame_number: "SX3-042".to_string(),
                battery_level: 64,
                distance_km: 1000.0,
                speed: 0,
                power_level: 2,
                lock_state: LockState::AwaitingUnlock,
                sound_volume: 5,
            }
        );
        // Reads only, never a nonce
        let calls = transport.calls().await;
        assert_eq!(calls.len(), 7);
        assert!(calls.iter().all(|c| !c.is_write()));
    }

    #[tokio::test]
    async fn test_concurrent_writes_do_not_interleave() {
        let (client, transport) = create_test_client().await;
        for nonce in [*b"n1", *b"n2", *b"n3", *b"n4"] {
            transport.queue_value(Characteristic::Challenge, nonce).await;
        }

        let client = Arc::new(client);
        let (a, b) = tokio::join!(
            async {
                let first = client.set_power_level(1).await;
                let second = client.set_lock_state(LockState::Locked).await;
                first.and(second)
            },
            async {
                let first = client.set_bell_tone(BellTone::Party).await;
                let second = client.play_sound(Sound::Horn, 1).await;
                first.and(second)
            },
        );
        a.unwrap();
        b.unwrap();

        let calls = transport.calls().await;
        assert_nonce_pairs(&client, &calls);

        // Nonces are consumed in read order, one per write
        let nonces: Vec<Nonce> = calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Write { value, .. } => Some(written_data(&client, value).0),
                _ => None,
            })
            .collect();
        assert_eq!(
            nonces,
            vec![
                Nonce::new(*b"n1"),
                Nonce::new(*b"n2"),
                Nonce::new(*b"n3"),
                Nonce::new(*b"n4"),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks_do_not_interleave() {
        let (client, transport) = create_test_client().await;
        let client = Arc::new(client);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let client = client.clone();
            tasks.push(tokio::spawn(async move {
                client.set_power_level(i % 6).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let calls = transport.calls().await;
        assert_eq!(calls.len(), 16);
        assert_nonce_pairs(&client, &calls);
    }

    /// Every write is immediately preceded by the challenge read whose nonce it carries
    fn assert_nonce_pairs(client: &Sx3Client<MockTransport>, calls: &[TransportCall]) {
        let challenge = Characteristic::Challenge.uuid();
        let mut pending_nonce = false;

        for call in calls {
            match call {
                TransportCall::Read { characteristic, .. } => {
                    assert_eq!(*characteristic, challenge);
                    assert!(!pending_nonce, "two challenge reads in a row");
                    pending_nonce = true;
                }
                TransportCall::Write { value, .. } => {
                    assert!(pending_nonce, "write without its nonce read");
                    assert!(client.cipher().decrypt(value).is_ok());
                    pending_nonce = false;
                }
            }
        }
        assert!(!pending_nonce);
    }
}
