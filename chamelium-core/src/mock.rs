//! In-memory [`Device`] that records every call.
//!
//! Used to exercise the hotplug commands and the capture workflow without a
//! board on the bench.  Plug state, EDID storage and the capture buffer are
//! simulated closely enough for the workflows to observe their own effects.
//!
//! # Thread safety
//!
//! State lives behind a `parking_lot::Mutex` because [`Device`] methods take
//! `&self`.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::device::{Area, ConnectorType, Device, EndLevel};
use crate::errors::ChameliumError;

// ---------------------------------------------------------------------------
// Recorded calls
// ---------------------------------------------------------------------------

/// One remote call as seen by the mock, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SupportedInputs,
    ConnectorType(u32),
    IsPhysicalPlugged(u32),
    IsPlugged(u32),
    Plug(u32),
    Unplug(u32),
    FireHpdPulse {
        port: u32,
        deassert_us: u64,
        assert_us: u64,
        count: u32,
        end_level: i32,
    },
    Reset,
    CreateEdid(usize),
    DestroyEdid(i32),
    ApplyEdid { port: u32, edid_id: i32 },
    ReadEdid(u32),
    ProbeInputs,
    DetectResolution(u32),
    GetMaxFrameLimit { port: u32, width: u32, height: u32 },
    CaptureVideo { port: u32, count: u32, area: Area },
    ReadCapturedFrame(u32),
    GetCapturedFrameCount,
}

impl Call {
    /// Remote procedure name, as used by [`MockDevice::fail_on`].
    pub fn method(&self) -> &'static str {
        match self {
            Call::SupportedInputs => "GetSupportedInputs",
            Call::ConnectorType(_) => "GetConnectorType",
            Call::IsPhysicalPlugged(_) => "IsPhysicalPlugged",
            Call::IsPlugged(_) => "IsPlugged",
            Call::Plug(_) => "Plug",
            Call::Unplug(_) => "Unplug",
            Call::FireHpdPulse { .. } => "FireHpdPulse",
            Call::Reset => "Reset",
            Call::CreateEdid(_) => "CreateEdid",
            Call::DestroyEdid(_) => "DestroyEdid",
            Call::ApplyEdid { .. } => "ApplyEdid",
            Call::ReadEdid(_) => "ReadEdid",
            Call::ProbeInputs => "ProbeInputs",
            Call::DetectResolution(_) => "DetectResolution",
            Call::GetMaxFrameLimit { .. } => "GetMaxFrameLimit",
            Call::CaptureVideo { .. } => "CaptureVideo",
            Call::ReadCapturedFrame(_) => "ReadCapturedFrame",
            Call::GetCapturedFrameCount => "GetCapturedFrameCount",
        }
    }
}

// ---------------------------------------------------------------------------
// Simulated board
// ---------------------------------------------------------------------------

/// EDID exposed by every port until another one is applied.
pub const DEFAULT_EDID: &[u8] = &[0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

#[derive(Debug, Clone)]
struct MockPort {
    connector: ConnectorType,
    physically_plugged: bool,
    plugged: bool,
    edid_id: i32,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    ports: BTreeMap<u32, MockPort>,
    edids: BTreeMap<i32, Vec<u8>>,
    next_edid_id: i32,
    resolution: (u32, u32),
    frame_limit: u32,
    captured_override: Option<u32>,
    reported_count: Option<u32>,
    frames: Vec<Vec<u8>>,
    failing: Vec<&'static str>,
}

/// Recording, in-memory stand-in for a Chameleon board.
pub struct MockDevice {
    state: Mutex<State>,
}

impl MockDevice {
    /// A board with no ports, 1920x1080 input and a 100-frame capture limit.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_edid_id: 1,
                resolution: (1920, 1080),
                frame_limit: 100,
                ..State::default()
            }),
        }
    }

    /// Add a port with a cable attached and the given logical plug state.
    pub fn with_port(self, port: u32, connector: ConnectorType, plugged: bool) -> Self {
        self.state.lock().ports.insert(
            port,
            MockPort {
                connector,
                physically_plugged: true,
                plugged,
                edid_id: 0,
            },
        );
        self
    }

    /// Add a port without a cable; it is never reported by `ProbeInputs`.
    pub fn with_disconnected_port(self, port: u32, connector: ConnectorType) -> Self {
        self.state.lock().ports.insert(
            port,
            MockPort {
                connector,
                physically_plugged: false,
                plugged: false,
                edid_id: 0,
            },
        );
        self
    }

    pub fn with_resolution(self, width: u32, height: u32) -> Self {
        self.state.lock().resolution = (width, height);
        self
    }

    pub fn with_frame_limit(self, limit: u32) -> Self {
        self.state.lock().frame_limit = limit;
        self
    }

    /// Make the board report fewer captured frames than requested.
    pub fn with_captured_frames(self, count: u32) -> Self {
        self.state.lock().captured_override = Some(count);
        self
    }

    /// Make `GetCapturedFrameCount` answer `count` whatever was captured.
    pub fn with_reported_frame_count(self, count: u32) -> Self {
        self.state.lock().reported_count = Some(count);
        self
    }

    /// Make every call to `method` fail (the call is still recorded).
    pub fn fail_on(self, method: &'static str) -> Self {
        self.state.lock().failing.push(method);
        self
    }

    /// Every call issued so far.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Names of the calls issued so far.
    pub fn methods(&self) -> Vec<&'static str> {
        self.state.lock().calls.iter().map(Call::method).collect()
    }

    pub fn is_port_plugged(&self, port: u32) -> bool {
        self.state
            .lock()
            .ports
            .get(&port)
            .is_some_and(|p| p.plugged)
    }

    /// Ids of EDIDs created and not yet destroyed.
    pub fn live_edids(&self) -> Vec<i32> {
        self.state.lock().edids.keys().copied().collect()
    }

    /// EDID id currently applied to `port` (0 = built-in default).
    pub fn applied_edid(&self, port: u32) -> Option<i32> {
        self.state.lock().ports.get(&port).map(|p| p.edid_id)
    }

    /// Record `call` and fail it if it was marked with [`Self::fail_on`].
    fn record(&self, call: Call) -> Result<(), ChameliumError> {
        let mut state = self.state.lock();
        let method = call.method();
        state.calls.push(call);
        if state.failing.contains(&method) {
            return Err(ChameliumError::remote(method, "injected failure"));
        }
        Ok(())
    }

    fn with_port_state<T>(
        &self,
        method: &'static str,
        port: u32,
        f: impl FnOnce(&mut MockPort) -> T,
    ) -> Result<T, ChameliumError> {
        let mut state = self.state.lock();
        state
            .ports
            .get_mut(&port)
            .map(f)
            .ok_or_else(|| ChameliumError::remote(method, format!("no such port {port}")))
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Device for MockDevice {
    fn supported_inputs(&self) -> Result<Vec<u32>, ChameliumError> {
        self.record(Call::SupportedInputs)?;
        Ok(self.state.lock().ports.keys().copied().collect())
    }

    fn connector_type(&self, port: u32) -> Result<ConnectorType, ChameliumError> {
        self.record(Call::ConnectorType(port))?;
        self.with_port_state("GetConnectorType", port, |p| p.connector)
    }

    fn is_physically_plugged(&self, port: u32) -> Result<bool, ChameliumError> {
        self.record(Call::IsPhysicalPlugged(port))?;
        self.with_port_state("IsPhysicalPlugged", port, |p| p.physically_plugged)
    }

    fn is_plugged(&self, port: u32) -> Result<bool, ChameliumError> {
        self.record(Call::IsPlugged(port))?;
        self.with_port_state("IsPlugged", port, |p| p.plugged)
    }

    fn plug(&self, port: u32) -> Result<(), ChameliumError> {
        self.record(Call::Plug(port))?;
        self.with_port_state("Plug", port, |p| p.plugged = true)
    }

    fn unplug(&self, port: u32) -> Result<(), ChameliumError> {
        self.record(Call::Unplug(port))?;
        self.with_port_state("Unplug", port, |p| p.plugged = false)
    }

    fn fire_hpd_pulse(
        &self,
        port: u32,
        deassert_interval_us: u64,
        assert_interval_us: u64,
        count: u32,
        end_level: EndLevel,
    ) -> Result<(), ChameliumError> {
        self.record(Call::FireHpdPulse {
            port,
            deassert_us: deassert_interval_us,
            assert_us: assert_interval_us,
            count,
            end_level: end_level.as_wire(),
        })?;
        self.with_port_state("FireHpdPulse", port, |p| {
            p.plugged = end_level == EndLevel::High;
        })
    }

    fn reset(&self) -> Result<(), ChameliumError> {
        self.record(Call::Reset)?;
        let mut state = self.state.lock();
        for port in state.ports.values_mut() {
            port.plugged = false;
            port.edid_id = 0;
        }
        state.frames.clear();
        Ok(())
    }

    fn create_edid(&self, blob: &[u8]) -> Result<i32, ChameliumError> {
        self.record(Call::CreateEdid(blob.len()))?;
        let mut state = self.state.lock();
        let id = state.next_edid_id;
        state.next_edid_id += 1;
        state.edids.insert(id, blob.to_vec());
        Ok(id)
    }

    fn destroy_edid(&self, edid_id: i32) -> Result<(), ChameliumError> {
        self.record(Call::DestroyEdid(edid_id))?;
        match self.state.lock().edids.remove(&edid_id) {
            Some(_) => Ok(()),
            None => Err(ChameliumError::remote(
                "DestroyEdid",
                format!("no such EDID {edid_id}"),
            )),
        }
    }

    fn apply_edid(&self, port: u32, edid_id: i32) -> Result<(), ChameliumError> {
        self.record(Call::ApplyEdid { port, edid_id })?;
        if edid_id != 0 && !self.state.lock().edids.contains_key(&edid_id) {
            return Err(ChameliumError::remote(
                "ApplyEdid",
                format!("no such EDID {edid_id}"),
            ));
        }
        self.with_port_state("ApplyEdid", port, |p| p.edid_id = edid_id)
    }

    fn read_edid(&self, port: u32) -> Result<Vec<u8>, ChameliumError> {
        self.record(Call::ReadEdid(port))?;
        let edid_id = self.with_port_state("ReadEdid", port, |p| p.edid_id)?;
        let state = self.state.lock();
        Ok(state
            .edids
            .get(&edid_id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_EDID.to_vec()))
    }

    fn probe_inputs(&self) -> Result<Vec<u32>, ChameliumError> {
        self.record(Call::ProbeInputs)?;
        Ok(self
            .state
            .lock()
            .ports
            .iter()
            .filter(|(_, p)| p.physically_plugged)
            .map(|(port, _)| *port)
            .collect())
    }

    fn detect_resolution(&self, port: u32) -> Result<(u32, u32), ChameliumError> {
        self.record(Call::DetectResolution(port))?;
        let plugged = self.with_port_state("DetectResolution", port, |p| p.plugged)?;
        if !plugged {
            return Err(ChameliumError::remote(
                "DetectResolution",
                format!("port {port} is not plugged"),
            ));
        }
        Ok(self.state.lock().resolution)
    }

    fn max_frame_limit(&self, port: u32, width: u32, height: u32) -> Result<u32, ChameliumError> {
        self.record(Call::GetMaxFrameLimit {
            port,
            width,
            height,
        })?;
        Ok(self.state.lock().frame_limit)
    }

    fn capture_video(&self, port: u32, count: u32, area: Area) -> Result<(), ChameliumError> {
        self.record(Call::CaptureVideo { port, count, area })?;
        let mut state = self.state.lock();
        let captured = state.captured_override.unwrap_or(count).min(count);
        let frame_len = (area.width * area.height * 3) as usize;
        state.frames = (0..captured)
            .map(|idx| vec![(idx % 256) as u8; frame_len])
            .collect();
        Ok(())
    }

    fn read_captured_frame(&self, index: u32) -> Result<Vec<u8>, ChameliumError> {
        self.record(Call::ReadCapturedFrame(index))?;
        self.state
            .lock()
            .frames
            .get(index as usize)
            .cloned()
            .ok_or_else(|| {
                ChameliumError::remote("ReadCapturedFrame", format!("no frame {index}"))
            })
    }

    fn captured_frame_count(&self) -> Result<u32, ChameliumError> {
        self.record(Call::GetCapturedFrameCount)?;
        let state = self.state.lock();
        Ok(state.reported_count.unwrap_or(state.frames.len() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        let device = MockDevice::new().with_port(1, ConnectorType::Hdmi, false);
        device.plug(1).unwrap();
        device.is_plugged(1).unwrap();
        assert_eq!(device.calls(), vec![Call::Plug(1), Call::IsPlugged(1)]);
        assert!(device.is_port_plugged(1));
    }

    #[test]
    fn test_fail_on_still_records() {
        let device = MockDevice::new()
            .with_port(1, ConnectorType::Vga, true)
            .fail_on("Unplug");
        assert!(device.unplug(1).is_err());
        assert_eq!(device.methods(), vec!["Unplug"]);
        assert!(device.is_port_plugged(1));
    }

    #[test]
    fn test_input_scan_skips_disconnected_ports() {
        let device = MockDevice::new()
            .with_disconnected_port(1, ConnectorType::DisplayPort)
            .with_port(3, ConnectorType::Hdmi, false);
        assert_eq!(device.probe_inputs().unwrap(), vec![3]);
    }

    #[test]
    fn test_capture_buffer_respects_override() {
        let device = MockDevice::new()
            .with_port(1, ConnectorType::Hdmi, true)
            .with_captured_frames(2);
        let area = Area { x: 0, y: 0, width: 4, height: 2 };
        device.capture_video(1, 5, area).unwrap();
        assert_eq!(device.captured_frame_count().unwrap(), 2);
        assert_eq!(device.read_captured_frame(1).unwrap(), vec![1u8; 24]);
        assert!(device.read_captured_frame(2).is_err());
    }
}
