use crate::cli::{
    CascadeCommand, DeviceListArgs, DevicesCommand, FileArgs, PlayArgs, PresetCommand,
    PresetTarget, PtzCommandArgs, StreamsCommand,
};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::sync::Arc;
use vsp_console::api::cascade::CascadeConfig;
use vsp_console::api::device::{Device, DeviceFilter};
use vsp_console::api::ptz::{PresetRequest, PtzCommand};
use vsp_console::api::stream::PlayRequest;
use vsp_console::api::{ApiClient, ApiError, CascadeApi, DeviceApi, PtzApi, StreamApi};

pub async fn run_devices(client: Arc<ApiClient>, command: DevicesCommand) -> Result<()> {
    let api = DeviceApi::new(client);
    match command {
        DevicesCommand::List(args) => list_devices(&api, &args).await?,
        DevicesCommand::Status => {
            let counts = api.status_counts().await.map_err(operator_error)?;
            println!(
                "Total: {}  Online: {}  Offline: {}",
                counts.total, counts.online, counts.offline
            );
        }
        DevicesCommand::Show(args) => {
            let device = api.detail(args.id).await.map_err(operator_error)?;
            println!("{}", serde_json::to_string_pretty(&device)?);
        }
        DevicesCommand::Add(args) => {
            let device: Device = read_json(&args)?;
            api.add(&device).await.map_err(operator_error)?;
            println!("Device added successfully");
        }
        DevicesCommand::Update(args) => {
            let device: Device = read_json(&args)?;
            api.update(&device).await.map_err(operator_error)?;
            println!("Device updated successfully");
        }
        DevicesCommand::Delete(args) => {
            api.delete(args.id).await.map_err(operator_error)?;
            println!("Device deleted successfully");
        }
        DevicesCommand::Channels(args) => {
            let channels = api
                .channels(&args.device_id)
                .await
                .map_err(operator_error)?;
            if args.json {
                return print_json(&channels);
            }
            if channels.is_empty() {
                println!("Device {} has no channels.", args.device_id);
                return Ok(());
            }
            println!("{:<22}  {:<8}  NAME", "CHANNEL", "STATUS");
            for channel in &channels {
                let status = if channel.is_on() { "ON" } else { "OFF" };
                println!(
                    "{:<22}  {:<8}  {}",
                    channel.channel_id,
                    status,
                    channel.display_name()
                );
            }
        }
        DevicesCommand::Sync(args) => {
            api.sync_channels(&args.device_id)
                .await
                .map_err(operator_error)?;
            println!("Channel sync started");
        }
    }
    Ok(())
}

async fn list_devices(api: &DeviceApi, args: &DeviceListArgs) -> Result<()> {
    let filter = DeviceFilter {
        status: args.status.map(Into::into),
        device_type: args.device_type.map(Into::into),
        keyword: args
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(str::to_owned),
    };
    let devices = api.list(&filter).await.map_err(operator_error)?;
    if args.json {
        return print_json(&devices);
    }
    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!(
        "{:<6}  {:<22}  {:<8}  {:<8}  {:<16}  NAME",
        "ID", "DEVICE", "TYPE", "STATUS", "ADDRESS"
    );
    for device in &devices {
        let address = match (&device.ip_address, device.port) {
            (Some(ip), Some(port)) => format!("{ip}:{port}"),
            (Some(ip), None) => ip.clone(),
            _ => "-".to_owned(),
        };
        println!(
            "{:<6}  {:<22}  {:<8}  {:<8}  {:<16}  {}",
            device.id.map_or_else(|| "-".to_owned(), |id| id.to_string()),
            device.device_id,
            device.device_type,
            device.status,
            address,
            device.device_name
        );
    }
    Ok(())
}

pub async fn run_streams(client: Arc<ApiClient>, command: StreamsCommand) -> Result<()> {
    let api = StreamApi::new(client);
    match command {
        StreamsCommand::List(args) => {
            let sessions = api.list().await.map_err(operator_error)?;
            if args.json {
                return print_json(&sessions);
            }
            if sessions.is_empty() {
                println!("No active stream sessions.");
                return Ok(());
            }
            println!(
                "{:<36}  {:<22}  {:<22}  {:<9}  FLV",
                "SESSION", "DEVICE", "CHANNEL", "TYPE"
            );
            for session in &sessions {
                println!(
                    "{:<36}  {:<22}  {:<22}  {:<9}  {}",
                    session.session_id,
                    session.device_id,
                    session.channel_id,
                    session.stream_type,
                    session.flv_url.as_deref().unwrap_or("-")
                );
            }
        }
        StreamsCommand::Info(args) => {
            let session = api.info(&args.session_id).await.map_err(operator_error)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        StreamsCommand::Play(args) => play_stream(&api, args).await?,
        StreamsCommand::Stop(args) => {
            api.stop(&args.session_id).await.map_err(operator_error)?;
            println!("Stream stopped");
        }
    }
    Ok(())
}

async fn play_stream(api: &StreamApi, args: PlayArgs) -> Result<()> {
    let response = if args.playback {
        let (Some(start), Some(end)) = (args.start, args.end) else {
            return Err(anyhow!("--playback needs both --start and --end"));
        };
        let request = PlayRequest::playback(args.device_id, args.channel_id, start, end);
        api.playback(&request).await
    } else {
        api.play(&PlayRequest::live(args.device_id, args.channel_id))
            .await
    }
    .map_err(operator_error)?;

    println!("Stream started");
    println!("session  {}", response.session_id);
    for (label, url) in [
        ("flv", &response.flv_url),
        ("hls", &response.hls_url),
        ("rtmp", &response.rtmp_url),
        ("rtsp", &response.rtsp_url),
        ("webrtc", &response.webrtc_url),
    ] {
        if !url.is_empty() {
            println!("{label:<7}  {url}");
        }
    }
    Ok(())
}

pub async fn run_ptz(client: Arc<ApiClient>, command: PtzCommandArgs) -> Result<()> {
    let api = PtzApi::new(client);
    match command {
        PtzCommandArgs::Move(args) => {
            let command = PtzCommand::new(
                args.device_id,
                args.channel_id,
                args.command.into(),
                Some(args.speed),
            );
            api.control(&command).await.map_err(operator_error)?;
            println!("PTZ {} sent", command.command);
        }
        PtzCommandArgs::Preset(args) => match args.command {
            PresetCommand::Set(target) => {
                api.set_preset(&preset_request(target))
                    .await
                    .map_err(operator_error)?;
                println!("Preset saved");
            }
            PresetCommand::Call(target) => {
                api.call_preset(&preset_request(target))
                    .await
                    .map_err(operator_error)?;
                println!("Preset called");
            }
            PresetCommand::Delete(target) => {
                api.delete_preset(&preset_request(target))
                    .await
                    .map_err(operator_error)?;
                println!("Preset deleted");
            }
            PresetCommand::List(target) => {
                let presets = api
                    .presets(&target.device_id, &target.channel_id)
                    .await
                    .map_err(operator_error)?;
                if target.json {
                    return print_json(&presets);
                }
                if presets.is_empty() {
                    println!("No presets stored.");
                    return Ok(());
                }
                println!("{:<8}  NAME", "PRESET");
                for preset in &presets {
                    println!(
                        "{:<8}  {}",
                        preset.preset_id,
                        preset.preset_name.as_deref().unwrap_or("-")
                    );
                }
            }
        },
    }
    Ok(())
}

fn preset_request(target: PresetTarget) -> PresetRequest {
    PresetRequest {
        device_id: target.device_id,
        channel_id: target.channel_id,
        preset_id: target.preset_id,
        preset_name: target.name,
    }
}

pub async fn run_cascade(client: Arc<ApiClient>, command: CascadeCommand) -> Result<()> {
    let api = CascadeApi::new(client);
    match command {
        CascadeCommand::List(args) => {
            let configs = api.list().await.map_err(operator_error)?;
            if args.json {
                return print_json(&configs);
            }
            if configs.is_empty() {
                println!("No cascade platforms configured.");
                return Ok(());
            }
            println!(
                "{:<6}  {:<22}  {:<22}  {:<13}  NAME",
                "ID", "PLATFORM", "SERVER", "STATUS"
            );
            for config in &configs {
                println!(
                    "{:<6}  {:<22}  {:<22}  {:<13}  {}",
                    config.id.map_or_else(|| "-".to_owned(), |id| id.to_string()),
                    config.platform_id,
                    format!("{}:{}", config.server_ip, config.server_port),
                    config.status,
                    config.platform_name
                );
            }
        }
        CascadeCommand::ShowStatus(args) => {
            let status = api.status(args.id).await.map_err(operator_error)?;
            println!("status          {}", status.status);
            println!(
                "registered at   {}",
                status.register_time.as_deref().unwrap_or("-")
            );
            println!(
                "last keepalive  {}",
                status.last_keepalive_time.as_deref().unwrap_or("-")
            );
        }
        CascadeCommand::Add(args) => {
            let config: CascadeConfig = read_json(&args)?;
            api.add(&config).await.map_err(operator_error)?;
            println!("Cascade added successfully");
        }
        CascadeCommand::Update(args) => {
            let config: CascadeConfig = read_json(&args)?;
            api.update(&config).await.map_err(operator_error)?;
            println!("Cascade updated successfully");
        }
        CascadeCommand::Delete(args) => {
            api.delete(args.id).await.map_err(operator_error)?;
            println!("Cascade deleted successfully");
        }
        CascadeCommand::Register(args) => {
            api.register(args.id).await.map_err(operator_error)?;
            println!("Registration started");
        }
        CascadeCommand::Unregister(args) => {
            api.unregister(args.id).await.map_err(operator_error)?;
            println!("Unregistration started");
        }
        CascadeCommand::SyncCatalog(args) => {
            api.sync_catalog(args.id).await.map_err(operator_error)?;
            println!("Catalog sync started");
        }
    }
    Ok(())
}

/// Surfaces the operator-facing text, keeping the technical detail in the chain.
fn operator_error(err: ApiError) -> anyhow::Error {
    let text = err.notification_text();
    anyhow::Error::new(err).context(text)
}

fn read_json<T: DeserializeOwned>(args: &FileArgs) -> Result<T> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed reading {}", args.file.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", args.file.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
