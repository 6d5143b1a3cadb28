use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vsp_console::api::device::{DeviceStatus, DeviceType};
use vsp_console::api::ptz::{DEFAULT_SPEED, MAX_SPEED, MIN_SPEED, PtzAction};

#[derive(Debug, Parser)]
#[command(
    name = "vsp-console",
    version,
    about = "Terminal console for a video-surveillance platform: live wall, devices, PTZ and cascade"
)]
pub struct Cli {
    /// Platform REST API base URL (overrides config and VSP_API_URL).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token (overrides config and VSP_TOKEN).
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Number of live wall windows.
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub windows: Option<u16>,

    /// Alternate config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the live video wall.
    Tui,
    /// Manage registered devices and their channels.
    Devices(DevicesArgs),
    /// Inspect, start and stop stream sessions.
    Streams(StreamsArgs),
    /// Drive a pan-tilt-zoom camera.
    Ptz(PtzArgs),
    /// Manage upstream cascade platforms.
    Cascade(CascadeArgs),
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices, optionally filtered.
    List(DeviceListArgs),
    /// Show total/online/offline counts.
    Status,
    /// Show one device by numeric id.
    Show(IdArgs),
    /// Register a device described by a JSON file.
    Add(FileArgs),
    /// Update a device described by a JSON file.
    Update(FileArgs),
    Delete(IdArgs),
    /// List the channels of a device.
    Channels(DeviceIdArgs),
    /// Ask the device for its current channel catalog.
    Sync(DeviceIdArgs),
}

#[derive(Debug, Args)]
pub struct DeviceListArgs {
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,

    #[arg(long = "type", value_enum)]
    pub device_type: Option<TypeFilter>,

    /// Matches device id or name.
    #[arg(long)]
    pub keyword: Option<String>,

    /// Print machine-readable JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Online,
    Offline,
}

impl From<StatusFilter> for DeviceStatus {
    fn from(value: StatusFilter) -> Self {
        match value {
            StatusFilter::Online => Self::Online,
            StatusFilter::Offline => Self::Offline,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum TypeFilter {
    Gb28181,
    Onvif,
}

impl From<TypeFilter> for DeviceType {
    fn from(value: TypeFilter) -> Self {
        match value {
            TypeFilter::Gb28181 => Self::Gb28181,
            TypeFilter::Onvif => Self::Onvif,
        }
    }
}

#[derive(Debug, Args)]
pub struct IdArgs {
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct DeviceIdArgs {
    /// National-standard device id.
    pub device_id: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct FileArgs {
    /// JSON document in the backend's wire format.
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct StreamsArgs {
    #[command(subcommand)]
    pub command: StreamsCommand,
}

#[derive(Debug, Subcommand)]
pub enum StreamsCommand {
    /// List active stream sessions.
    List(JsonArgs),
    Info(SessionIdArgs),
    /// Start a live or playback session and print its URLs.
    Play(PlayArgs),
    Stop(SessionIdArgs),
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SessionIdArgs {
    pub session_id: String,
}

#[derive(Debug, Args)]
pub struct PlayArgs {
    pub device_id: String,
    pub channel_id: String,

    /// Request recorded playback instead of live video.
    #[arg(long, default_value_t = false, requires = "start", requires = "end")]
    pub playback: bool,

    /// Playback start, `yyyy-MM-dd HH:mm:ss`.
    #[arg(long)]
    pub start: Option<String>,

    /// Playback end, `yyyy-MM-dd HH:mm:ss`.
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Debug, Args)]
pub struct PtzArgs {
    #[command(subcommand)]
    pub command: PtzCommandArgs,
}

#[derive(Debug, Subcommand)]
pub enum PtzCommandArgs {
    /// Send one movement command.
    Move(PtzMoveArgs),
    /// Manage presets.
    Preset(PresetArgs),
}

#[derive(Debug, Args)]
pub struct PtzMoveArgs {
    pub device_id: String,
    pub channel_id: String,

    #[arg(value_enum)]
    pub command: PtzDirection,

    #[arg(long, default_value_t = DEFAULT_SPEED, value_parser = clap::value_parser!(u8).range(i64::from(MIN_SPEED)..=i64::from(MAX_SPEED)))]
    pub speed: u8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum PtzDirection {
    Left,
    Right,
    Up,
    Down,
    ZoomIn,
    ZoomOut,
    Stop,
}

impl From<PtzDirection> for PtzAction {
    fn from(value: PtzDirection) -> Self {
        match value {
            PtzDirection::Left => Self::Left,
            PtzDirection::Right => Self::Right,
            PtzDirection::Up => Self::Up,
            PtzDirection::Down => Self::Down,
            PtzDirection::ZoomIn => Self::ZoomIn,
            PtzDirection::ZoomOut => Self::ZoomOut,
            PtzDirection::Stop => Self::Stop,
        }
    }
}

#[derive(Debug, Args)]
pub struct PresetArgs {
    #[command(subcommand)]
    pub command: PresetCommand,
}

#[derive(Debug, Subcommand)]
pub enum PresetCommand {
    /// Store the current position as a preset.
    Set(PresetTarget),
    /// Move to a stored preset.
    Call(PresetTarget),
    Delete(PresetTarget),
    List(ChannelTarget),
}

#[derive(Debug, Args)]
pub struct PresetTarget {
    pub device_id: String,
    pub channel_id: String,
    pub preset_id: u32,

    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args)]
pub struct ChannelTarget {
    pub device_id: String,
    pub channel_id: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct CascadeArgs {
    #[command(subcommand)]
    pub command: CascadeCommand,
}

#[derive(Debug, Subcommand)]
pub enum CascadeCommand {
    List(JsonArgs),
    /// Show registration state of one cascade.
    ShowStatus(IdArgs),
    Add(FileArgs),
    Update(FileArgs),
    Delete(IdArgs),
    /// Start registering to the upstream platform.
    Register(IdArgs),
    /// Cancel registration with the upstream platform.
    Unregister(IdArgs),
    /// Push the local catalog upstream.
    SyncCatalog(IdArgs),
}
