//! Hotplug control: port status, plug/unplug, HPD pulses and reset.
//!
//! Each command writes human progress lines to a caller-provided writer and
//! forwards to the [`Device`].  Multi-port commands stop at the first failed
//! remote call; there is no partial-failure recovery.

use std::io::Write;

use serde::Serialize;

use crate::device::{ConnectorType, Device, EndLevel};
use crate::errors::ChameliumError;
use crate::output::progress;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Snapshot of one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortStatus {
    pub port: u32,
    pub connector: ConnectorType,
    pub physically_plugged: bool,
    pub plugged: bool,
}

/// Query every supported port.  Read-only.
pub fn port_statuses(device: &dyn Device) -> Result<Vec<PortStatus>, ChameliumError> {
    device
        .supported_inputs()?
        .into_iter()
        .map(|port| {
            Ok(PortStatus {
                port,
                connector: device.connector_type(port)?,
                physically_plugged: device.is_physically_plugged(port)?,
                plugged: device.is_plugged(port)?,
            })
        })
        .collect()
}

const STATUS_HEADERS: [&str; 4] = ["Port", "Type", "Physically plugged", "Plugged"];

/// Render statuses as a plain table with a dashed rule under the header.
pub fn render_status_table(statuses: &[PortStatus]) -> String {
    let rows: Vec<[String; 4]> = statuses
        .iter()
        .map(|s| {
            [
                s.port.to_string(),
                s.connector.to_string(),
                bool_cell(s.physically_plugged),
                bool_cell(s.plugged),
            ]
        })
        .collect();

    let mut widths = STATUS_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut table = String::new();
    push_row(&mut table, &STATUS_HEADERS, &widths);
    let rule = widths.map(|w| "-".repeat(w));
    push_row(&mut table, &rule, &widths);
    for row in &rows {
        push_row(&mut table, row, &widths);
    }
    table
}

fn bool_cell(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_owned()
}

fn push_row<S: AsRef<str>>(table: &mut String, cells: &[S], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    table.push_str(line.trim_end());
    table.push('\n');
}

// ---------------------------------------------------------------------------
// Plug / unplug / reset
// ---------------------------------------------------------------------------

/// Plug `ports` in order.
pub fn plug(device: &dyn Device, ports: &[u32], out: &mut dyn Write) -> Result<(), ChameliumError> {
    for &port in ports {
        progress(out, format_args!("Plugging {port}..."));
        device.plug(port)?;
    }
    Ok(())
}

/// Unplug `ports` in order.
pub fn unplug(device: &dyn Device, ports: &[u32], out: &mut dyn Write) -> Result<(), ChameliumError> {
    for &port in ports {
        progress(out, format_args!("Unplugging {port}..."));
        device.unplug(port)?;
    }
    Ok(())
}

pub fn reset(device: &dyn Device, out: &mut dyn Write) -> Result<(), ChameliumError> {
    progress(out, format_args!("Resetting chameleon..."));
    device.reset()
}

// ---------------------------------------------------------------------------
// HPD pulses
// ---------------------------------------------------------------------------

/// Parameters of an HPD pulse train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseRequest {
    pub port: u32,
    /// Time HPD is held low per pulse, in milliseconds.
    pub deassert_interval_ms: u32,
    /// Time HPD is held high per pulse; defaults to the deassert interval.
    pub assert_interval_ms: Option<u32>,
    pub count: u32,
    pub end_level: EndLevel,
}

impl PulseRequest {
    pub fn assert_interval_ms(&self) -> u32 {
        self.assert_interval_ms.unwrap_or(self.deassert_interval_ms)
    }
}

/// Fire one pulse train.
pub fn pulse(device: &dyn Device, request: &PulseRequest, out: &mut dyn Write) -> Result<(), ChameliumError> {
    let assert_ms = request.assert_interval_ms();
    let level = match request.end_level {
        EndLevel::High => "high",
        EndLevel::Low => "low",
    };
    progress(
        out,
        format_args!(
            "Firing {} HPD pulses on port {}, assert interval={}ms, deassert interval={}ms, end level={}...",
            request.count, request.port, assert_ms, request.deassert_interval_ms, level
        ),
    );

    device.fire_hpd_pulse(
        request.port,
        u64::from(request.deassert_interval_ms) * 1000,
        u64::from(assert_ms) * 1000,
        request.count,
        request.end_level,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockDevice};

    fn bench() -> MockDevice {
        MockDevice::new()
            .with_port(1, ConnectorType::DisplayPort, true)
            .with_port(3, ConnectorType::Hdmi, false)
            .with_disconnected_port(4, ConnectorType::Vga)
    }

    #[test]
    fn test_port_statuses() {
        let device = bench();
        let statuses = port_statuses(&device).unwrap();
        assert_eq!(statuses.len(), 3);
        assert_eq!(
            statuses[2],
            PortStatus {
                port: 4,
                connector: ConnectorType::Vga,
                physically_plugged: false,
                plugged: false,
            }
        );
        assert!(!device.methods().iter().any(|m| *m == "Plug" || *m == "Unplug"));
    }

    #[test]
    fn test_render_status_table() {
        let statuses = port_statuses(&bench()).unwrap();
        let table = render_status_table(&statuses);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Port  Type  Physically plugged  Plugged");
        assert_eq!(lines[1], "----  ----  ------------------  -------");
        assert_eq!(lines[2], "1     DP    True                True");
        assert_eq!(lines[4], "4     VGA   False               False");
    }

    #[test]
    fn test_status_serialization() {
        let statuses = port_statuses(&bench()).unwrap();
        let json = serde_json::to_string(&statuses[1]).unwrap();
        assert!(json.contains("\"connector\":\"HDMI\""));
        assert!(json.contains("\"plugged\":false"));
    }

    #[test]
    fn test_plug_in_order_with_progress() {
        let device = bench();
        let mut out = Vec::new();
        plug(&device, &[3, 1], &mut out).unwrap();
        assert_eq!(device.calls(), vec![Call::Plug(3), Call::Plug(1)]);
        assert_eq!(String::from_utf8(out).unwrap(), "Plugging 3...\nPlugging 1...\n");
    }

    #[test]
    fn test_unplug_stops_at_first_failure() {
        let device = MockDevice::new().with_port(1, ConnectorType::Hdmi, true);
        let mut out = Vec::new();
        // Port 2 does not exist, so the second call fails and port 1 is never reached.
        let err = unplug(&device, &[1, 2, 1], &mut out).unwrap_err();
        assert!(matches!(err, ChameliumError::RemoteCall { method: "Unplug", .. }));
        assert_eq!(device.calls(), vec![Call::Unplug(1), Call::Unplug(2)]);
    }

    #[test]
    fn test_reset() {
        let device = bench();
        let mut out = Vec::new();
        reset(&device, &mut out).unwrap();
        assert_eq!(device.calls(), vec![Call::Reset]);
        assert!(!device.is_port_plugged(1));
    }

    #[test]
    fn test_pulse_defaults_assert_to_deassert() {
        let device = bench();
        let request = PulseRequest {
            port: 3,
            deassert_interval_ms: 100,
            assert_interval_ms: None,
            count: 5,
            end_level: EndLevel::High,
        };
        let mut out = Vec::new();
        pulse(&device, &request, &mut out).unwrap();
        assert_eq!(
            device.calls(),
            vec![Call::FireHpdPulse {
                port: 3,
                deassert_us: 100_000,
                assert_us: 100_000,
                count: 5,
                end_level: 1,
            }]
        );
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Firing 5 HPD pulses on port 3"));
    }

    #[test]
    fn test_pulse_explicit_assert_low_end() {
        let device = bench();
        let request = PulseRequest {
            port: 1,
            deassert_interval_ms: 20,
            assert_interval_ms: Some(250),
            count: 1,
            end_level: EndLevel::Low,
        };
        pulse(&device, &request, &mut Vec::new()).unwrap();
        assert_eq!(
            device.calls(),
            vec![Call::FireHpdPulse {
                port: 1,
                deassert_us: 20_000,
                assert_us: 250_000,
                count: 1,
                end_level: 0,
            }]
        );
    }
}
