//! XML-RPC client for `chameleond`.
//!
//! [`RpcDevice`] implements [`Device`] by issuing one blocking HTTP `POST`
//! per operation.  The XML body is produced and decoded by the `xmlrpc`
//! crate; the HTTP exchange goes through a shared `ureq::Agent`.
//!
//! # Wire conventions
//!
//! - Ports, counts, and sizes travel as `<int>`.
//! - EDID blobs and captured frames travel as `<base64>`.
//! - Procedures without a result answer `<nil/>`, which decodes to `()`.
//!
//! A response of the wrong shape is reported as
//! [`ChameliumError::RemoteCall`] naming the procedure.

use std::error::Error as StdError;
use std::io::Read;
use std::time::Duration;

use xmlrpc::{Request, Transport, Value};

use crate::config::DeviceAddress;
use crate::device::{Area, ConnectorType, Device, EndLevel};
use crate::errors::ChameliumError;

/// How long to wait for the TCP connection before giving up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One-shot HTTP transport for a single request.
struct HttpTransport<'a> {
    agent: &'a ureq::Agent,
    url: &'a str,
}

impl Transport for HttpTransport<'_> {
    type Stream = Box<dyn Read + Send + Sync + 'static>;

    fn transmit(self, request: &Request<'_>) -> Result<Self::Stream, Box<dyn StdError + Send + Sync>> {
        let mut body = Vec::new();
        request.write_as_xml(&mut body)?;

        let response = self
            .agent
            .post(self.url)
            .set("Content-Type", "text/xml")
            .send_bytes(&body)?;

        Ok(response.into_reader())
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking XML-RPC proxy for a Chameleon board.
pub struct RpcDevice {
    agent: ureq::Agent,
    address: DeviceAddress,
}

impl RpcDevice {
    /// Build a client for `address`.  No request is sent until the first
    /// operation.
    pub fn connect(address: DeviceAddress) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .build();
        log::debug!("chameleond endpoint {address}");
        Self { agent, address }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    fn call(&self, method: &'static str, args: Vec<Value>) -> Result<Value, ChameliumError> {
        log::debug!("-> {method} ({} args)", args.len());

        let request = args
            .into_iter()
            .fold(Request::new(method), |request, arg| request.arg(arg));
        let transport = HttpTransport {
            agent: &self.agent,
            url: self.address.url(),
        };

        let value = request.call(transport).map_err(|e| match e.fault() {
            Some(fault) => ChameliumError::remote(
                method,
                format!("fault {}: {}", fault.fault_code, fault.fault_string),
            ),
            None => ChameliumError::remote(method, e.to_string()),
        })?;

        log::debug!("<- {method}");
        Ok(value)
    }
}

impl Device for RpcDevice {
    fn supported_inputs(&self) -> Result<Vec<u32>, ChameliumError> {
        let method = "GetSupportedInputs";
        expect_port_list(method, self.call(method, vec![])?)
    }

    fn connector_type(&self, port: u32) -> Result<ConnectorType, ChameliumError> {
        let method = "GetConnectorType";
        let name = expect_string(method, self.call(method, vec![int_arg(method, port)?])?)?;
        name.parse::<ConnectorType>()
            .map_err(|e| ChameliumError::remote(method, e))
    }

    fn is_physically_plugged(&self, port: u32) -> Result<bool, ChameliumError> {
        let method = "IsPhysicalPlugged";
        expect_bool(method, self.call(method, vec![int_arg(method, port)?])?)
    }

    fn is_plugged(&self, port: u32) -> Result<bool, ChameliumError> {
        let method = "IsPlugged";
        expect_bool(method, self.call(method, vec![int_arg(method, port)?])?)
    }

    fn plug(&self, port: u32) -> Result<(), ChameliumError> {
        let method = "Plug";
        expect_unit(method, self.call(method, vec![int_arg(method, port)?])?)
    }

    fn unplug(&self, port: u32) -> Result<(), ChameliumError> {
        let method = "Unplug";
        expect_unit(method, self.call(method, vec![int_arg(method, port)?])?)
    }

    fn fire_hpd_pulse(
        &self,
        port: u32,
        deassert_interval_us: u64,
        assert_interval_us: u64,
        count: u32,
        end_level: EndLevel,
    ) -> Result<(), ChameliumError> {
        let method = "FireHpdPulse";
        let args = vec![
            int_arg(method, port)?,
            int_arg(method, deassert_interval_us)?,
            int_arg(method, assert_interval_us)?,
            int_arg(method, count)?,
            Value::Int(end_level.as_wire()),
        ];
        expect_unit(method, self.call(method, args)?)
    }

    fn reset(&self) -> Result<(), ChameliumError> {
        let method = "Reset";
        expect_unit(method, self.call(method, vec![])?)
    }

    fn create_edid(&self, blob: &[u8]) -> Result<i32, ChameliumError> {
        let method = "CreateEdid";
        expect_int(method, self.call(method, vec![Value::Base64(blob.to_vec())])?)
    }

    fn destroy_edid(&self, edid_id: i32) -> Result<(), ChameliumError> {
        let method = "DestroyEdid";
        expect_unit(method, self.call(method, vec![Value::Int(edid_id)])?)
    }

    fn apply_edid(&self, port: u32, edid_id: i32) -> Result<(), ChameliumError> {
        let method = "ApplyEdid";
        let args = vec![int_arg(method, port)?, Value::Int(edid_id)];
        expect_unit(method, self.call(method, args)?)
    }

    fn read_edid(&self, port: u32) -> Result<Vec<u8>, ChameliumError> {
        let method = "ReadEdid";
        expect_bytes(method, self.call(method, vec![int_arg(method, port)?])?)
    }

    fn probe_inputs(&self) -> Result<Vec<u32>, ChameliumError> {
        let method = "ProbeInputs";
        expect_port_list(method, self.call(method, vec![])?)
    }

    fn detect_resolution(&self, port: u32) -> Result<(u32, u32), ChameliumError> {
        let method = "DetectResolution";
        expect_resolution(method, self.call(method, vec![int_arg(method, port)?])?)
    }

    fn max_frame_limit(&self, port: u32, width: u32, height: u32) -> Result<u32, ChameliumError> {
        let method = "GetMaxFrameLimit";
        let args = vec![
            int_arg(method, port)?,
            int_arg(method, width)?,
            int_arg(method, height)?,
        ];
        expect_u32(method, self.call(method, args)?)
    }

    fn capture_video(&self, port: u32, count: u32, area: Area) -> Result<(), ChameliumError> {
        let method = "CaptureVideo";
        let args = vec![
            int_arg(method, port)?,
            int_arg(method, count)?,
            int_arg(method, area.x)?,
            int_arg(method, area.y)?,
            int_arg(method, area.width)?,
            int_arg(method, area.height)?,
        ];
        expect_unit(method, self.call(method, args)?)
    }

    fn read_captured_frame(&self, index: u32) -> Result<Vec<u8>, ChameliumError> {
        let method = "ReadCapturedFrame";
        expect_bytes(method, self.call(method, vec![int_arg(method, index)?])?)
    }

    fn captured_frame_count(&self) -> Result<u32, ChameliumError> {
        let method = "GetCapturedFrameCount";
        expect_u32(method, self.call(method, vec![])?)
    }
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

/// Encode an unsigned quantity as `<int>`, rejecting values past `i32::MAX`.
fn int_arg(method: &'static str, value: impl Into<u64>) -> Result<Value, ChameliumError> {
    let value = value.into();
    i32::try_from(value)
        .map(Value::Int)
        .map_err(|_| ChameliumError::remote(method, format!("argument {value} does not fit in an XML-RPC int")))
}

fn unexpected(method: &'static str, expected: &str, got: &Value) -> ChameliumError {
    ChameliumError::remote(method, format!("expected {expected}, got {got:?}"))
}

fn expect_unit(method: &'static str, value: Value) -> Result<(), ChameliumError> {
    match value {
        // Some procedures answer with a bare `true` instead of `nil`.
        Value::Nil | Value::Bool(_) => Ok(()),
        other => Err(unexpected(method, "nil", &other)),
    }
}

fn expect_bool(method: &'static str, value: Value) -> Result<bool, ChameliumError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(unexpected(method, "boolean", &other)),
    }
}

fn expect_int(method: &'static str, value: Value) -> Result<i32, ChameliumError> {
    match value {
        Value::Int(i) => Ok(i),
        Value::Int64(i) => i32::try_from(i).map_err(|_| unexpected(method, "int", &Value::Int64(i))),
        other => Err(unexpected(method, "int", &other)),
    }
}

fn expect_u32(method: &'static str, value: Value) -> Result<u32, ChameliumError> {
    let i = expect_int(method, value)?;
    u32::try_from(i).map_err(|_| unexpected(method, "non-negative int", &Value::Int(i)))
}

fn expect_string(method: &'static str, value: Value) -> Result<String, ChameliumError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(unexpected(method, "string", &other)),
    }
}

fn expect_bytes(method: &'static str, value: Value) -> Result<Vec<u8>, ChameliumError> {
    match value {
        Value::Base64(bytes) => Ok(bytes),
        other => Err(unexpected(method, "base64 data", &other)),
    }
}

fn expect_array(method: &'static str, value: Value) -> Result<Vec<Value>, ChameliumError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(unexpected(method, "array", &other)),
    }
}

fn expect_port_list(method: &'static str, value: Value) -> Result<Vec<u32>, ChameliumError> {
    expect_array(method, value)?
        .into_iter()
        .map(|item| expect_u32(method, item))
        .collect()
}

fn expect_resolution(method: &'static str, value: Value) -> Result<(u32, u32), ChameliumError> {
    let items = expect_array(method, value)?;
    match <[Value; 2]>::try_from(items) {
        Ok([width, height]) => Ok((expect_u32(method, width)?, expect_u32(method, height)?)),
        Err(items) => Err(unexpected(method, "[width, height]", &Value::Array(items))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arg_in_range() {
        assert!(matches!(int_arg("Plug", 3u32).unwrap(), Value::Int(3)));
        assert!(matches!(int_arg("FireHpdPulse", 100_000u64).unwrap(), Value::Int(100_000)));
    }

    #[test]
    fn test_int_arg_overflow() {
        let err = int_arg("FireHpdPulse", u64::from(u32::MAX)).unwrap_err();
        assert!(err.to_string().starts_with("FireHpdPulse failed:"));
    }

    #[test]
    fn test_expect_unit_accepts_nil_and_bool() {
        assert!(expect_unit("Plug", Value::Nil).is_ok());
        assert!(expect_unit("Plug", Value::Bool(true)).is_ok());
        assert!(expect_unit("Plug", Value::Int(1)).is_err());
    }

    #[test]
    fn test_expect_u32_rejects_negative() {
        assert_eq!(expect_u32("GetMaxFrameLimit", Value::Int(10)).unwrap(), 10);
        assert!(expect_u32("GetMaxFrameLimit", Value::Int(-1)).is_err());
        assert_eq!(expect_u32("GetMaxFrameLimit", Value::Int64(7)).unwrap(), 7);
    }

    #[test]
    fn test_expect_port_list() {
        let value = Value::Array(vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(expect_port_list("ProbeInputs", value).unwrap(), vec![1, 3]);

        let bad = Value::Array(vec![Value::String("1".into())]);
        assert!(expect_port_list("ProbeInputs", bad).is_err());
    }

    #[test]
    fn test_expect_resolution() {
        let value = Value::Array(vec![Value::Int(1920), Value::Int(1080)]);
        assert_eq!(expect_resolution("DetectResolution", value).unwrap(), (1920, 1080));

        let short = Value::Array(vec![Value::Int(1920)]);
        let err = expect_resolution("DetectResolution", short).unwrap_err();
        assert!(err.to_string().contains("[width, height]"));
    }

    #[test]
    fn test_expect_bytes() {
        let value = Value::Base64(vec![0, 255, 0]);
        assert_eq!(expect_bytes("ReadEdid", value).unwrap(), vec![0, 255, 0]);
        assert!(expect_bytes("ReadEdid", Value::Nil).is_err());
    }

    #[test]
    fn test_connect_normalises_address() {
        let device = RpcDevice::connect(DeviceAddress::parse("bench").unwrap());
        assert_eq!(device.address().url(), "http://bench:9992");
    }
}
