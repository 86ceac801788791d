//! Screenshot capture workflow.
//!
//! One invocation of [`take_screenshot`] drives the board through a fixed
//! sequence: resolve the port, remember whether it was plugged, optionally
//! replug and apply an EDID, settle the capture geometry, check the frame
//! budget, capture, read the frames back and write them out.
//!
//! A port that started unplugged is unplugged again on every exit path once
//! its state has been recorded.  An uploaded EDID is destroyed after that,
//! also on every path.
//!
//! # Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`area`] | `WxH[+X+Y]` parsing and alignment rounding |
//! | [`plan`] | option validation and output resolution |
//! | [`frame`] | raw RGB frame encoding via `image` |

pub mod area;
pub mod frame;
pub mod plan;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use image::ImageFormat;

use crate::device::{Area, Device};
use crate::edid::EdidHandle;
use crate::errors::ChameliumError;
use crate::output::{progress, progress_tick, OutputTarget};

pub use area::{parse_area, round_area};
pub use frame::{encode_frame, format_for_path};
pub use plan::{CaptureOutput, ScreenshotRequest};

/// What a finished capture produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotReport {
    pub port: u32,
    /// Geometry actually captured, after rounding or detection.
    pub area: Area,
    /// Files written, in frame order; `-` for standard output.
    pub frames: Vec<PathBuf>,
}

/// Run one screenshot session.
///
/// `env_viewer` is the value of `$CHAMELEON_VIEWER`, consulted when the
/// viewer was requested without a command.  `out` is the command's standard
/// output: it receives the progress lines, or the encoded frame when the
/// output is `-`, in which case progress goes to stderr instead.
pub fn take_screenshot(
    device: &dyn Device,
    request: &ScreenshotRequest,
    env_viewer: Option<&str>,
    out: &mut dyn Write,
) -> Result<ScreenshotReport, ChameliumError> {
    let output = request.resolve_output(env_viewer)?;
    if output.writes_to_stdout() {
        session(device, request, output, &mut io::stderr(), Some(out))
    } else {
        session(device, request, output, out, None)
    }
}

/// Everything after output resolution; `frame_sink` replaces stdout for `-`.
fn session(
    device: &dyn Device,
    request: &ScreenshotRequest,
    mut output: CaptureOutput,
    out: &mut dyn Write,
    frame_sink: Option<&mut dyn Write>,
) -> Result<ScreenshotReport, ChameliumError> {
    let port = resolve_port(device, request.port, out)?;
    let was_plugged = device.is_plugged(port)?;
    log::info!("port {port} initially {}", if was_plugged { "plugged" } else { "unplugged" });

    let mut edid: Option<EdidHandle<'_>> = None;
    let captured = capture(device, request, port, was_plugged, &mut edid, out).and_then(|area| {
        save_frames(device, area, request.count, &mut output, out, frame_sink)
            .map(|frames| (area, frames))
    });

    let restored = if was_plugged {
        Ok(())
    } else {
        progress(out, format_args!("Unplugging to the original state..."));
        device.unplug(port)
    };
    let released = edid.take().map_or(Ok(()), EdidHandle::release);

    let mut result = captured;
    for (step, outcome) in [("restore plug state", restored), ("release EDID", released)] {
        if let Err(e) = outcome {
            if result.is_ok() {
                result = Err(e);
            } else {
                log::warn!("failed to {step} after an earlier error: {e}");
            }
        }
    }

    let (area, frames) = result?;
    Ok(ScreenshotReport { port, area, frames })
}

/// Explicit port, or the first one with a cable attached.
fn resolve_port(
    device: &dyn Device,
    requested: Option<u32>,
    out: &mut dyn Write,
) -> Result<u32, ChameliumError> {
    if let Some(port) = requested {
        return Ok(port);
    }
    let port = device
        .probe_inputs()?
        .first()
        .copied()
        .ok_or_else(|| ChameliumError::usage("No connected port found, use --port to pick one"))?;
    let connector = device.connector_type(port)?;
    progress(out, format_args!("Using auto-detected port {port} ({connector})"));
    Ok(port)
}

/// Replug, EDID, geometry, frame budget and the capture itself.
fn capture<'d>(
    device: &'d dyn Device,
    request: &ScreenshotRequest,
    port: u32,
    was_plugged: bool,
    edid: &mut Option<EdidHandle<'d>>,
    out: &mut dyn Write,
) -> Result<Area, ChameliumError> {
    if was_plugged && (request.replug || request.edid.is_some()) {
        progress(out, format_args!("Unplugging..."));
        device.unplug(port)?;
    }

    if let Some(blob) = &request.edid {
        let id = edid.insert(EdidHandle::upload(device, blob)?).id();
        device.apply_edid(port, id)?;
    }

    if !device.is_plugged(port)? {
        progress(out, format_args!("Plugging..."));
        device.plug(port)?;
    }

    let area = capture_area(device, port, request.area, out)?;
    progress(out, format_args!("screen size {}x{}", area.width, area.height));

    let limit = device.max_frame_limit(port, area.width, area.height)?;
    if request.count > limit {
        return Err(ChameliumError::usage(format!(
            "--count: Chameleon can only capture up to {limit} frames on port {port}"
        )));
    }

    progress(
        out,
        format_args!("Capturing {} frames with geometry {area}", request.count),
    );
    device.capture_video(port, request.count, area)?;
    Ok(area)
}

/// Read the captured frames back and write them to `output`.
fn save_frames(
    device: &dyn Device,
    area: Area,
    requested: u32,
    output: &mut CaptureOutput,
    out: &mut dyn Write,
    frame_sink: Option<&mut dyn Write>,
) -> Result<Vec<PathBuf>, ChameliumError> {
    match output {
        CaptureOutput::Single { target, viewer } => {
            save_single(device, area, target, viewer.as_deref(), out, frame_sink).map(|path| vec![path])
        }
        CaptureOutput::Multi { dir, prefix } => save_multi(device, area, requested, dir, prefix, out),
    }
}

/// Rounded explicit area, or the detected resolution at the origin.
fn capture_area(
    device: &dyn Device,
    port: u32,
    requested: Option<Area>,
    out: &mut dyn Write,
) -> Result<Area, ChameliumError> {
    match requested {
        Some(requested) => {
            let alignment = device.connector_type(port)?.capture_alignment();
            let rounded = round_area(requested, alignment)?;
            if rounded != requested {
                progress(
                    out,
                    format_args!("Rounded resolution from {requested} to {rounded}"),
                );
            }
            Ok(rounded)
        }
        None => {
            let (width, height) = device.detect_resolution(port)?;
            Ok(Area {
                x: 0,
                y: 0,
                width,
                height,
            })
        }
    }
}

fn save_single(
    device: &dyn Device,
    area: Area,
    target: &mut OutputTarget,
    viewer: Option<&str>,
    out: &mut dyn Write,
    frame_sink: Option<&mut dyn Write>,
) -> Result<PathBuf, ChameliumError> {
    progress(out, format_args!("Outputting to {target}..."));
    let raw = device.read_captured_frame(0)?;
    let encoded = encode_frame(raw, area.width, area.height, format_for_path(target.path()))?;
    match frame_sink {
        Some(sink) => target.write_bytes_to(&encoded, sink)?,
        None => target.write_bytes(&encoded)?,
    }

    let written = target
        .path()
        .map_or_else(|| PathBuf::from("-"), Path::to_path_buf);
    if let Some(cmd) = viewer {
        open_viewer(cmd, &written, out)?;
    }
    Ok(written)
}

fn save_multi(
    device: &dyn Device,
    area: Area,
    requested: u32,
    dir: &Path,
    prefix: &str,
    out: &mut dyn Write,
) -> Result<Vec<PathBuf>, ChameliumError> {
    progress(out, format_args!("Saving frames in {}...", dir.display()));
    let captured = device.captured_frame_count()?;
    if captured < requested {
        log::warn!("board captured {captured} of {requested} requested frames");
    }

    let mut frames = Vec::new();
    for index in 0..captured {
        let raw = device.read_captured_frame(index)?;
        let png = encode_frame(raw, area.width, area.height, ImageFormat::Png)?;
        let path = CaptureOutput::frame_path(dir, prefix, index);
        fs::write(&path, png).map_err(|e| ChameliumError::filesystem(path.clone(), e))?;
        progress_tick(out, ".");
        frames.push(path);
    }
    progress_tick(out, "\n");
    Ok(frames)
}

/// Run `cmd` (split on whitespace) with `file` appended.
fn open_viewer(cmd: &str, file: &Path, out: &mut dyn Write) -> Result<(), ChameliumError> {
    let mut words = cmd.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| ChameliumError::usage("--view: empty viewer command"))?;

    progress(out, format_args!("Opening with \"{cmd}\""));
    let status = Command::new(program)
        .args(words)
        .arg(file)
        .status()
        .map_err(|e| ChameliumError::usage(format!("cannot run viewer \"{cmd}\": {e}")))?;

    if !status.success() {
        return Err(ChameliumError::usage(format!(
            "viewer \"{cmd}\" failed: {status}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
