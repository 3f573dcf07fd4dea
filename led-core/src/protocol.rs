//! JSON Wire-Protokoll
//!
//! Payloads sind an die ROS-Nachrichten angelehnt:
//! - Status: `std_msgs/Header` → `{"stamp":{"sec":..,"nanosec":..},"frame_id":".."}`
//! - Kommando: `std_msgs/Int32` → `{"data":42}` (nackte Zahl wird auch akzeptiert)
//! - Parameter: `rcl_interfaces/ParameterValue` mit Typ-Codes 1 (bool),
//!   2 (integer), 3 (double)
//!
//! Hinweis: serde-json-core unterstützt keine internally tagged Enums,
//! deshalb flache Structs mit optionalen Feldern.

use core::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::parameters::{
    Parameter, ParameterError, ParameterName, ParameterRequest, ParameterResponse,
};
use crate::types::{CommandMessage, NODE_NAME, ParameterValue, StatusMessage};

/// Topic für Parameter-Anfragen
pub const PARAMETER_REQUEST_TOPIC: &str = "led_node/parameters/request";

/// Topic für Parameter-Antworten
pub const PARAMETER_RESPONSE_TOPIC: &str = "led_node/parameters/response";

const TYPE_BOOL: u8 = 1;
const TYPE_INTEGER: u8 = 2;
const TYPE_DOUBLE: u8 = 3;

/// Fehler beim (De-)Serialisieren
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// Payload ist kein gültiges JSON für diese Nachricht
    Decode,
    /// Ausgabe-Buffer zu klein
    Encode,
    /// Unbekannter Typ-Code in `ParameterValue`
    UnsupportedType,
    /// Pflichtfeld fehlt
    MissingField,
    /// Parameter-Name zu lang
    NameTooLong,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Decode => f.write_str("decode failed"),
            ProtocolError::Encode => f.write_str("encode failed"),
            ProtocolError::UnsupportedType => f.write_str("unsupported parameter type"),
            ProtocolError::MissingField => f.write_str("missing field"),
            ProtocolError::NameTooLong => f.write_str("parameter name too long"),
        }
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Serialize)]
struct StampWire {
    sec: i64,
    nanosec: u32,
}

#[derive(Serialize)]
struct StatusWire<'a> {
    stamp: StampWire,
    frame_id: &'a str,
}

/// Serialisiert die Status-Nachricht, gibt die Länge zurück
pub fn encode_status(msg: &StatusMessage, buf: &mut [u8]) -> Result<usize, ProtocolError> {
    let wire = StatusWire {
        stamp: StampWire {
            sec: msg.stamp.sec,
            nanosec: msg.stamp.nanosec,
        },
        frame_id: msg.frame_id.as_str(),
    };
    serde_json_core::to_slice(&wire, buf).map_err(|_| ProtocolError::Encode)
}

// ============================================================================
// Kommando
// ============================================================================

#[derive(Deserialize)]
struct CommandWire {
    data: i32,
}

/// Dekodiert ein Kommando (`{"data":N}` oder nackte Zahl)
pub fn decode_command(payload: &[u8]) -> Result<CommandMessage, ProtocolError> {
    if let Ok((wire, _)) = serde_json_core::from_slice::<CommandWire>(payload) {
        return Ok(CommandMessage { data: wire.data });
    }

    core::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
        .map(CommandMessage::from)
        .ok_or(ProtocolError::Decode)
}

// ============================================================================
// Parameter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ParameterOp {
    Get,
    Set,
    List,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ParameterValueWire {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bool_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    integer_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    double_value: Option<f64>,
}

impl From<ParameterValue> for ParameterValueWire {
    fn from(value: ParameterValue) -> Self {
        match value {
            ParameterValue::Bool(v) => Self {
                kind: TYPE_BOOL,
                bool_value: Some(v),
                ..Default::default()
            },
            ParameterValue::Integer(v) => Self {
                kind: TYPE_INTEGER,
                integer_value: Some(v),
                ..Default::default()
            },
            ParameterValue::Double(v) => Self {
                kind: TYPE_DOUBLE,
                double_value: Some(v),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<ParameterValueWire> for ParameterValue {
    type Error = ProtocolError;

    fn try_from(wire: ParameterValueWire) -> Result<Self, Self::Error> {
        match wire.kind {
            TYPE_BOOL => wire
                .bool_value
                .map(ParameterValue::Bool)
                .ok_or(ProtocolError::MissingField),
            TYPE_INTEGER => wire
                .integer_value
                .map(ParameterValue::Integer)
                .ok_or(ProtocolError::MissingField),
            TYPE_DOUBLE => wire
                .double_value
                .map(ParameterValue::Double)
                .ok_or(ProtocolError::MissingField),
            _ => Err(ProtocolError::UnsupportedType),
        }
    }
}

#[derive(Deserialize)]
struct ParameterRequestWire<'a> {
    op: ParameterOp,
    #[serde(default, borrow)]
    name: Option<&'a str>,
    #[serde(default)]
    value: Option<ParameterValueWire>,
}

/// Dekodiert eine Parameter-Anfrage
pub fn decode_parameter_request(payload: &[u8]) -> Result<ParameterRequest, ProtocolError> {
    let (wire, _) = serde_json_core::from_slice::<ParameterRequestWire<'_>>(payload)
        .map_err(|_| ProtocolError::Decode)?;

    let name = || -> Result<ParameterName, ProtocolError> {
        let name = wire.name.ok_or(ProtocolError::MissingField)?;
        // Namen mit Node-Präfix ("led_node.red") werden akzeptiert
        let name = name
            .strip_prefix(NODE_NAME)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(name);
        ParameterName::try_from(name).map_err(|_| ProtocolError::NameTooLong)
    };

    match wire.op {
        ParameterOp::Get => Ok(ParameterRequest::Get { name: name()? }),
        ParameterOp::Set => {
            let name = name()?;
            let value = wire.value.ok_or(ProtocolError::MissingField)?;
            Ok(ParameterRequest::Set {
                name,
                value: value.try_into()?,
            })
        }
        ParameterOp::List => Ok(ParameterRequest::List),
    }
}

#[derive(Serialize)]
struct ParameterEntryWire<'a> {
    name: &'a str,
    value: ParameterValueWire,
}

struct ParameterListWire<'a>(&'a [Parameter]);

impl Serialize for ParameterListWire<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|p| ParameterEntryWire {
            name: p.name,
            value: p.value.into(),
        }))
    }
}

#[derive(Serialize)]
struct ParameterResponseWire<'a> {
    op: ParameterOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<ParameterValueWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<ParameterListWire<'a>>,
}

fn reason(e: &ParameterError) -> &'static str {
    match e {
        ParameterError::UnknownName => "unknown parameter",
        ParameterError::TypeMismatch { .. } => "type mismatch",
        ParameterError::AlreadyRegistered => "already registered",
        ParameterError::Locked => "locked",
        ParameterError::Full => "full",
        ParameterError::NameTooLong => "name too long",
    }
}

/// Serialisiert eine Parameter-Antwort, gibt die Länge zurück
pub fn encode_parameter_response(
    response: &ParameterResponse<'_>,
    buf: &mut [u8],
) -> Result<usize, ProtocolError> {
    let wire = match response {
        ParameterResponse::Get { name, result } => ParameterResponseWire {
            op: ParameterOp::Get,
            name: Some(*name),
            successful: result.is_ok(),
            reason: result.as_ref().err().map(reason),
            value: result.ok().map(ParameterValueWire::from),
            parameters: None,
        },
        ParameterResponse::Set { name, result } => ParameterResponseWire {
            op: ParameterOp::Set,
            name: Some(*name),
            successful: result.is_ok(),
            reason: result.as_ref().err().map(reason),
            value: None,
            parameters: None,
        },
        ParameterResponse::List { parameters } => ParameterResponseWire {
            op: ParameterOp::List,
            name: None,
            successful: true,
            reason: None,
            value: None,
            parameters: Some(ParameterListWire(*parameters)),
        },
    };
    serde_json_core::to_slice(&wire, buf).map_err(|_| ProtocolError::Encode)
}
