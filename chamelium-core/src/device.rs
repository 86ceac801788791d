//! The remote procedure set of a Chameleon board.
//!
//! [`Device`] names every remote operation the tool needs, with typed
//! arguments and results.  [`crate::rpc::RpcDevice`] implements it over
//! XML-RPC; `crate::mock::MockDevice` implements it in memory for tests.
//!
//! Every call is a blocking round-trip.  Nothing is cached and nothing is
//! retried.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::errors::ChameliumError;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Physical connector behind a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectorType {
    #[serde(rename = "VGA")]
    Vga,
    #[serde(rename = "HDMI")]
    Hdmi,
    #[serde(rename = "DP")]
    DisplayPort,
}

impl ConnectorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorType::Vga => "VGA",
            ConnectorType::Hdmi => "HDMI",
            ConnectorType::DisplayPort => "DP",
        }
    }

    /// Pixel alignment the capture engine requires for this connector.
    pub fn capture_alignment(self) -> u32 {
        match self {
            ConnectorType::Hdmi => 16,
            _ => 8,
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VGA" => Ok(ConnectorType::Vga),
            "HDMI" => Ok(ConnectorType::Hdmi),
            "DP" => Ok(ConnectorType::DisplayPort),
            other => Err(format!("unknown connector type '{other}'")),
        }
    }
}

/// Level the HPD line is left at after a pulse train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndLevel {
    Low,
    High,
}

impl EndLevel {
    /// Wire encoding: 0 for low, 1 for high.
    pub fn as_wire(self) -> i32 {
        match self {
            EndLevel::Low => 0,
            EndLevel::High => 1,
        }
    }
}

/// Capture rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Area {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Remote procedure set
// ---------------------------------------------------------------------------

/// Remote operations exposed by the board.
pub trait Device {
    /// Ports the board can drive.
    fn supported_inputs(&self) -> Result<Vec<u32>, ChameliumError>;

    fn connector_type(&self, port: u32) -> Result<ConnectorType, ChameliumError>;

    /// Whether a cable is physically attached.
    fn is_physically_plugged(&self, port: u32) -> Result<bool, ChameliumError>;

    /// Whether HPD is currently asserted by the board.
    fn is_plugged(&self, port: u32) -> Result<bool, ChameliumError>;

    fn plug(&self, port: u32) -> Result<(), ChameliumError>;

    fn unplug(&self, port: u32) -> Result<(), ChameliumError>;

    /// Fire `count` HPD pulses; intervals are in microseconds.
    fn fire_hpd_pulse(
        &self,
        port: u32,
        deassert_interval_us: u64,
        assert_interval_us: u64,
        count: u32,
        end_level: EndLevel,
    ) -> Result<(), ChameliumError>;

    /// Reset the whole board.
    fn reset(&self) -> Result<(), ChameliumError>;

    /// Register an EDID blob; returns its id.
    fn create_edid(&self, blob: &[u8]) -> Result<i32, ChameliumError>;

    fn destroy_edid(&self, edid_id: i32) -> Result<(), ChameliumError>;

    /// Apply a registered EDID (0 = built-in default) to `port`.
    fn apply_edid(&self, port: u32, edid_id: i32) -> Result<(), ChameliumError>;

    /// Raw EDID currently exposed on `port`.
    fn read_edid(&self, port: u32) -> Result<Vec<u8>, ChameliumError>;

    /// Ports with a live source attached.
    fn probe_inputs(&self) -> Result<Vec<u32>, ChameliumError>;

    /// Negotiated `(width, height)` of the incoming signal.
    fn detect_resolution(&self, port: u32) -> Result<(u32, u32), ChameliumError>;

    fn max_frame_limit(&self, port: u32, width: u32, height: u32) -> Result<u32, ChameliumError>;

    fn capture_video(&self, port: u32, count: u32, area: Area) -> Result<(), ChameliumError>;

    /// Raw 8-bit RGB pixels of captured frame `index`.
    fn read_captured_frame(&self, index: u32) -> Result<Vec<u8>, ChameliumError>;

    /// Frames actually captured by the last `capture_video`.
    fn captured_frame_count(&self) -> Result<u32, ChameliumError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_type_round_trip_names() {
        for ty in [ConnectorType::Vga, ConnectorType::Hdmi, ConnectorType::DisplayPort] {
            assert_eq!(ty.as_str().parse::<ConnectorType>().unwrap(), ty);
        }
        assert!("DVI".parse::<ConnectorType>().is_err());
    }

    #[test]
    fn test_capture_alignment() {
        assert_eq!(ConnectorType::Hdmi.capture_alignment(), 16);
        assert_eq!(ConnectorType::DisplayPort.capture_alignment(), 8);
        assert_eq!(ConnectorType::Vga.capture_alignment(), 8);
    }

    #[test]
    fn test_end_level_wire_encoding() {
        assert_eq!(EndLevel::Low.as_wire(), 0);
        assert_eq!(EndLevel::High.as_wire(), 1);
    }

    #[test]
    fn test_area_display() {
        let area = Area { x: 8, y: 16, width: 640, height: 480 };
        assert_eq!(area.to_string(), "640x480+8+16");
    }

    #[test]
    fn test_connector_type_serialization() {
        let json = serde_json::to_string(&ConnectorType::DisplayPort).unwrap();
        assert_eq!(json, "\"DP\"");
    }
}
