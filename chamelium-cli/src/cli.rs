//! Command-line surface of `chamelium`.
//!
//! Parsing only.  Every subcommand carries its own `--chameleon` so the
//! address can be given before or after the verb; [`crate::dispatch`]
//! decides which one wins.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use chamelium_core::device::EndLevel;

#[derive(Parser, Debug)]
#[command(
    name = "chamelium",
    version,
    about = "A cli utility for controlling the Chamelium",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted before the subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// The URL to the chameleond instance (defaults to $CHAMELEON_IP)
    #[arg(long, value_name = "URL")]
    pub chameleon: Option<String>,

    /// Log every remote call to stderr
    #[arg(long)]
    pub verbose: bool,
}

/// Per-command address override.
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceOptions {
    /// The URL to the chameleond instance (defaults to $CHAMELEON_IP)
    #[arg(long, value_name = "URL")]
    pub chameleon: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the status of each port on the Chameleon
    Status {
        #[command(flatten)]
        device: DeviceOptions,

        /// Print the port list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Plug ports on the Chameleon into the DUT
    Plug {
        #[command(flatten)]
        device: DeviceOptions,

        /// The ports to plug in
        #[arg(value_name = "PORT", required = true)]
        ports: Vec<u32>,
    },
    /// Unplug ports on the Chameleon from the DUT
    Unplug {
        #[command(flatten)]
        device: DeviceOptions,

        /// The ports to unplug
        #[arg(value_name = "PORT", required = true)]
        ports: Vec<u32>,
    },
    /// Send multiple identical HPD pulses
    Pulse(PulseArgs),
    /// Reset the Chameleon
    Reset {
        #[command(flatten)]
        device: DeviceOptions,
    },
    /// Manage EDID blobs for video ports on the Chamelium
    Edid {
        #[command(subcommand)]
        command: EdidCommand,
    },
    /// Take a screenshot using the Chameleon's video inputs
    Screenshot(ScreenshotArgs),
}

impl Command {
    /// The `--chameleon` given after the verb, if any.
    pub fn device_options(&self) -> &DeviceOptions {
        match self {
            Command::Status { device, .. }
            | Command::Plug { device, .. }
            | Command::Unplug { device, .. }
            | Command::Reset { device } => device,
            Command::Pulse(args) => &args.device,
            Command::Edid { command } => match command {
                EdidCommand::Get { device, .. } | EdidCommand::Set { device, .. } => device,
            },
            Command::Screenshot(args) => &args.device,
        }
    }
}

// ---------------------------------------------------------------------------
// pulse
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct PulseArgs {
    #[command(flatten)]
    pub device: DeviceOptions,

    /// The port to send the pulses on
    pub port: u32,

    /// The time in ms of the deassert pulse
    #[arg(value_name = "DEASSERT_MS")]
    pub deassert_interval: u32,

    /// How many HPD pulses to send
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// The time in ms of the assert pulse (defaults to the deassert interval)
    #[arg(long, value_name = "MS")]
    pub assert_interval: Option<u32>,

    /// Whether to end with the HPD line high or low (plugged or unplugged)
    #[arg(long, value_enum, default_value_t = EndLevelArg::High)]
    pub end_level: EndLevelArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndLevelArg {
    High,
    Low,
}

impl From<EndLevelArg> for EndLevel {
    fn from(arg: EndLevelArg) -> Self {
        match arg {
            EndLevelArg::High => EndLevel::High,
            EndLevelArg::Low => EndLevel::Low,
        }
    }
}

// ---------------------------------------------------------------------------
// edid
// ---------------------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum EdidCommand {
    /// Retrieve the current EDID blob being used on a port
    Get {
        #[command(flatten)]
        device: DeviceOptions,

        /// The port to retrieve the EDID from
        port: u32,

        /// Where to write the EDID to (defaults to stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Set the current EDID for a port on the Chamelium
    Set {
        #[command(flatten)]
        device: DeviceOptions,

        /// The port to set the EDID for
        port: u32,

        #[command(flatten)]
        source: EdidSourceArgs,

        /// Don't replug the display after setting the EDID
        #[arg(long)]
        no_replug: bool,
    },
}

/// Exactly one of a file or `--default-edid`.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct EdidSourceArgs {
    /// The file to read the EDID from
    #[arg(value_name = "FILE")]
    pub edid_file: Option<PathBuf>,

    /// Use the Chamelium's default EDID
    #[arg(long)]
    pub default_edid: bool,
}

// ---------------------------------------------------------------------------
// screenshot
// ---------------------------------------------------------------------------

#[derive(Args, Debug)]
pub struct ScreenshotArgs {
    #[command(flatten)]
    pub device: DeviceOptions,

    /// Unplug and plug before capturing screen
    #[arg(short, long)]
    pub replug: bool,

    /// Filename of the EDID to apply
    #[arg(short, long = "edid-file", value_name = "FILE")]
    pub edid_file: Option<PathBuf>,

    /// Only capture the given area WxH[+X+Y]
    #[arg(short, long, value_name = "WxH[+X+Y]")]
    pub area: Option<String>,

    /// The port to capture from (default: first auto-detected port)
    #[arg(short, long)]
    pub port: Option<u32>,

    /// The number of frames to capture
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Output file name of screenshot
    #[arg(short, long, value_name = "FILE", help_heading = "Single-frame capture")]
    pub output: Option<PathBuf>,

    /// Open the image with a viewer after downloading; CMD defaults to $CHAMELEON_VIEWER
    #[arg(
        short,
        long,
        value_name = "CMD",
        num_args = 0..=1,
        default_missing_value = "",
        help_heading = "Single-frame capture"
    )]
    pub view: Option<String>,

    /// The directory to output each frame in
    #[arg(short = 'd', long, value_name = "DIR", help_heading = "Multi-frame capture")]
    pub output_dir: Option<PathBuf>,

    /// The name to prefix each captured frame with
    #[arg(long, value_name = "NAME", help_heading = "Multi-frame capture")]
    pub file_prefix: Option<String>,
}
