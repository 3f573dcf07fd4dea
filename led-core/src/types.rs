//! Core Types für den LED-Node
//!
//! Datenstrukturen ohne Hardware-Dependencies: Parameter-Werte,
//! Status- und Kommando-Nachrichten sowie Strings mit fester Kapazität.

use core::fmt::{self, Write};

use heapless::String;

/// Name des Nodes (Präfix für Parameter-Topics)
pub const NODE_NAME: &str = "led_node";

/// Outbound Topic für die periodische Status-Nachricht
pub const STATUS_TOPIC: &str = "led_publisher";

/// Inbound Topic für Kommandos (ein `i32`)
pub const COMMAND_TOPIC: &str = "led_subscriber";

/// Präfix der Frame-ID nach einem empfangenen Kommando
pub const FRAME_ID_PREFIX: &str = "led_node_";

/// Frame-ID vor dem ersten Kommando
pub const INITIAL_FRAME_ID: &str = "led_node_x";

/// Kapazität des Frame-ID-Buffers in Bytes
pub const FRAME_ID_CAPACITY: usize = 50;

// ============================================================================
// Parameter-Werte
// ============================================================================

/// Typ eines registrierten Parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParameterType {
    Bool,
    Integer,
    Double,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterType::Bool => "bool",
            ParameterType::Integer => "integer",
            ParameterType::Double => "double",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typisierter Parameter-Wert
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterType {
        match self {
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::Integer(_) => ParameterType::Integer,
            ParameterValue::Double(_) => ParameterType::Double,
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Double(value)
    }
}

// ============================================================================
// BoundedString
// ============================================================================

/// String mit fester Kapazität und Abschneide-Semantik
///
/// Schreibzugriffe über `set()` oder `core::fmt::Write` schlagen nie fehl:
/// alles jenseits von `N` Bytes wird an einer Zeichengrenze abgeschnitten.
/// `is_truncated()` meldet, ob der letzte Schreibvorgang gekürzt wurde.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedString<const N: usize> {
    inner: String<N>,
    truncated: bool,
}

impl<const N: usize> BoundedString<N> {
    pub const fn new() -> Self {
        Self {
            inner: String::new(),
            truncated: false,
        }
    }

    /// Erstellt einen String aus `value` (ggf. gekürzt)
    pub fn from_str_truncated(value: &str) -> Self {
        let mut s = Self::new();
        s.set(value);
        s
    }

    /// Ersetzt den Inhalt durch `value` (ggf. gekürzt)
    pub fn set(&mut self, value: &str) {
        self.clear();
        self.push_truncated(value);
    }

    /// Ersetzt den Inhalt durch formatierte Argumente (ggf. gekürzt)
    pub fn set_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.clear();
        // write_str() liefert nie einen Fehler, siehe unten
        let _ = self.write_fmt(args);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.truncated = false;
    }

    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn push_truncated(&mut self, value: &str) {
        if self.truncated {
            return;
        }
        for c in value.chars() {
            if self.inner.push(c).is_err() {
                self.truncated = true;
                return;
            }
        }
    }
}

impl<const N: usize> Write for BoundedString<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_truncated(s);
        Ok(())
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(feature = "defmt")]
impl<const N: usize> defmt::Format for BoundedString<N> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.as_str())
    }
}

// ============================================================================
// Nachrichten
// ============================================================================

/// Zeitstempel im Layout von `builtin_interfaces/Time`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stamp {
    pub sec: i64,
    pub nanosec: u32,
}

impl Stamp {
    const NANOS_PER_SEC: i64 = 1_000_000_000;

    /// Teilt Epoch-Nanosekunden in ganze Sekunden und Rest
    ///
    /// `nanosec` liegt immer in `[0, 1e9)`, auch für negative Zeiten.
    pub fn from_epoch_nanos(nanos: i64) -> Self {
        let sec = nanos.div_euclid(Self::NANOS_PER_SEC);
        let nanosec = nanos.rem_euclid(Self::NANOS_PER_SEC) as u32;
        Self { sec, nanosec }
    }
}

/// Status-Nachricht im Layout von `std_msgs/Header`
///
/// Gehört exklusiv dem Node-Kontext; publiziert wird immer eine
/// serialisierte Kopie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub stamp: Stamp,
    pub frame_id: BoundedString<FRAME_ID_CAPACITY>,
}

impl StatusMessage {
    pub fn new() -> Self {
        Self {
            stamp: Stamp::default(),
            frame_id: BoundedString::from_str_truncated(INITIAL_FRAME_ID),
        }
    }

    /// Setzt die Frame-ID auf `led_node_<data>`
    pub fn set_command_frame_id(&mut self, data: i32) {
        self.frame_id
            .set_fmt(format_args!("{}{}", FRAME_ID_PREFIX, data));
    }
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self::new()
    }
}

/// Kommando-Nachricht im Layout von `std_msgs/Int32`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandMessage {
    pub data: i32,
}

impl From<i32> for CommandMessage {
    fn from(data: i32) -> Self {
        Self { data }
    }
}
