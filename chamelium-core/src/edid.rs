//! Scoped ownership of EDID blobs registered on the board.
//!
//! [`EdidHandle`] is created by uploading a blob and destroys it on the board
//! exactly once: either through [`EdidHandle::release`], which reports the
//! result, or from `Drop` when the handle goes out of scope unreleased (an
//! error unwound past it), in which case a failure can only be logged.
//!
//! [`Edid::Default`] stands for the board's built-in EDID (id 0).  It is
//! never uploaded and never destroyed.
//!
//! The `edid get` / `edid set` commands live here as [`dump`] and [`set`].

use std::io::Write;

use crate::device::Device;
use crate::errors::ChameliumError;
use crate::output::{progress, OutputTarget};

/// Id the board reserves for its built-in EDID.
pub const DEFAULT_EDID_ID: i32 = 0;

/// An uploaded EDID, destroyed on the board when released or dropped.
#[must_use = "dropping an EdidHandle immediately destroys the EDID on the board"]
pub struct EdidHandle<'d> {
    device: &'d dyn Device,
    id: i32,
    released: bool,
}

impl<'d> EdidHandle<'d> {
    /// Upload `blob`.  On failure no handle exists and nothing needs cleanup.
    pub fn upload(device: &'d dyn Device, blob: &[u8]) -> Result<Self, ChameliumError> {
        let id = device.create_edid(blob)?;
        log::info!("uploaded EDID ({} bytes) as id {id}", blob.len());
        Ok(Self {
            device,
            id,
            released: false,
        })
    }

    /// Board-assigned id of this EDID.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Destroy the EDID on the board and report the outcome.
    pub fn release(mut self) -> Result<(), ChameliumError> {
        self.released = true;
        log::debug!("destroying EDID {}", self.id);
        self.device.destroy_edid(self.id)
    }
}

impl Drop for EdidHandle<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.device.destroy_edid(self.id) {
            log::warn!("failed to destroy EDID {}: {e}", self.id);
        }
    }
}

/// The EDID to apply to a port.
pub enum Edid<'d> {
    /// The board's built-in EDID.
    Default,
    /// A blob uploaded for this invocation.
    Uploaded(EdidHandle<'d>),
}

impl<'d> Edid<'d> {
    /// Upload `blob`, or select the built-in EDID when `None`.
    pub fn from_blob(device: &'d dyn Device, blob: Option<&[u8]>) -> Result<Self, ChameliumError> {
        match blob {
            Some(blob) => EdidHandle::upload(device, blob).map(Edid::Uploaded),
            None => Ok(Edid::Default),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Edid::Default => DEFAULT_EDID_ID,
            Edid::Uploaded(handle) => handle.id(),
        }
    }

    /// Release an uploaded blob; a no-op for the built-in EDID.
    pub fn release(self) -> Result<(), ChameliumError> {
        match self {
            Edid::Default => Ok(()),
            Edid::Uploaded(handle) => handle.release(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Where `edid set` takes its EDID from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdidSource {
    Blob(Vec<u8>),
    Default,
}

impl EdidSource {
    fn blob(&self) -> Option<&[u8]> {
        match self {
            EdidSource::Blob(blob) => Some(blob),
            EdidSource::Default => None,
        }
    }
}

/// Write the raw EDID of `port` to `target`.
///
/// Refuses to put binary data on an interactive terminal; the check happens
/// before the board is queried.
pub fn dump(device: &dyn Device, port: u32, target: &mut OutputTarget) -> Result<(), ChameliumError> {
    if target.is_terminal() {
        return Err(ChameliumError::usage(
            "Refusing to print raw EDID blob to terminal",
        ));
    }
    let blob = device.read_edid(port)?;
    log::info!("read {} byte EDID from port {port}", blob.len());
    target.write_bytes(&blob)
}

/// Apply `source` to `port`.
///
/// With `replug`, a plugged port is unplugged before the change and plugged
/// back afterwards so the sink re-reads the EDID.  An uploaded blob is
/// destroyed on the board once applied, whether or not the apply worked.
pub fn set(
    device: &dyn Device,
    port: u32,
    source: &EdidSource,
    replug: bool,
    out: &mut dyn Write,
) -> Result<(), ChameliumError> {
    let edid = Edid::from_blob(device, source.blob())?;
    let applied = apply_with_replug(device, port, &edid, replug);
    let released = edid.release();

    applied?;
    released?;
    progress(out, format_args!("EDID changed"));
    Ok(())
}

fn apply_with_replug(
    device: &dyn Device,
    port: u32,
    edid: &Edid<'_>,
    replug: bool,
) -> Result<(), ChameliumError> {
    let do_replug = replug && device.is_plugged(port)?;
    if do_replug {
        log::info!("unplugging port {port} for EDID change");
        device.unplug(port)?;
    }

    device.apply_edid(port, edid.id())?;

    if do_replug {
        log::info!("replugging port {port}");
        device.plug(port)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
