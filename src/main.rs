//! SX3 Client - Main Entry Point

use clap::Parser;
use sx3_client::{
    GattTransport, LockState, Sx3Client,
    config::{CliArgs, Command, Settings},
    transport::ble::BleAdapter,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sx3_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Parse CLI arguments; the key never reaches the log
    let args = CliArgs::parse();
    info!(command = ?args.command, adapter = ?args.adapter, "Starting SX3 client");

    let settings = Settings::try_from(args).inspect_err(|e| error!("{}", e))?;

    let adapter = BleAdapter::new(settings.adapter.as_deref()).await?;

    if settings.command == Command::Discover {
        let bike = adapter.discover(settings.timeout).await?;
        println!(
            "{} {} {}",
            bike.address,
            bike.model,
            bike.name.as_deref().unwrap_or("")
        );
        return Ok(());
    }

    let address = match settings.address {
        Some(address) => address,
        None => adapter.discover(settings.timeout).await?.address,
    };

    let transport = adapter.connect(address, settings.timeout).await?;
    let cipher = settings.require_cipher().ok().cloned();

    let result = match cipher {
        Some(cipher) => {
            let client = Sx3Client::new(transport, cipher);
            let result = run(&client, &settings.command).await;
            let transport = client.into_transport();
            if let Err(e) = transport.disconnect().await {
                warn!("Failed to disconnect: {}", e);
            }
            result
        }
        None => {
            let result = read_plain(&transport, &settings.command).await;
            if let Err(e) = transport.disconnect().await {
                warn!("Failed to disconnect: {}", e);
            }
            result
        }
    };

    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}

/// Run a command that has the bike key available
async fn run<T: GattTransport>(
    client: &Sx3Client<T>,
    command: &Command,
) -> Result<(), Box<dyn std::error::Error>> {
    if command.requires_authentication() {
        client.authenticate().await?;
    }

    match command {
        Command::Discover => {}
        Command::Status { json } => {
            let status = client.status().await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Frame number:  {}", status.frame_number);
                println!("Battery:       {}%", status.battery_level);
                println!("Lock state:    {}", status.lock_state);
                println!("Distance:      {:.1} km", status.distance_km);
                println!("Speed:         {}", status.speed);
                println!("Power level:   {}", status.power_level);
                println!("Sound volume:  {}", status.sound_volume);
            }
        }
        Command::Lock => {
            client.set_lock_state(LockState::Locked).await?;
            info!("Bike locked");
        }
        Command::Unlock => {
            client.set_lock_state(LockState::Unlocked).await?;
            info!("Bike unlocked");
        }
        Command::Bell { tone } => {
            client.set_bell_tone(*tone).await?;
            info!("Bell tone set to {}", tone);
        }
        Command::Power { level } => {
            client.set_power_level(*level).await?;
            info!("Power level set to {}", level);
        }
        Command::Play { sound, count } => {
            client.play_sound(*sound, *count).await?;
            info!("Playing {} x{}", sound, count);
        }
        Command::Read {
            characteristic,
            plain,
        } => {
            let value = if *plain {
                client.read_plain(*characteristic).await?
            } else {
                client.read_decrypted(*characteristic).await?
            };
            println!("{}", hex::encode(value));
        }
    }

    Ok(())
}

/// Run a command that needs no key: only plain reads qualify
async fn read_plain<T: GattTransport>(
    transport: &T,
    command: &Command,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Read { characteristic, .. } = command {
        let (service, uuid) = characteristic.resolve();
        let value = transport.read(service, uuid).await?;
        println!("{}", hex::encode(value));
    }
    Ok(())
}
