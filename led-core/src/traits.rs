//! Hardware- und Transport-Abstraktionen
//!
//! Diese Traits definieren die Schnittstellen des Nodes nach außen
//! ohne konkrete Implementierung.
//!
//! # Implementierungen
//! - **Production:** RMT-Strip, MQTT-Kanäle, Embassy-Uhr (led-firmware)
//! - **Testing:** In-Memory Mocks (led-tests)

use core::fmt;
use core::time::Duration;

use rgb::RGB8;

use crate::parameters::{ParameterRequest, ParameterResponse};
use crate::types::{CommandMessage, StatusMessage};

/// Fehler-Typ für LED-Strip-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedError {
    /// Übertragung an den Strip fehlgeschlagen
    WriteFailed,
    /// Pixel-Index außerhalb des Strips
    IndexOutOfRange,
    /// Übertragung hat das Zeitbudget überschritten
    Timeout,
}

impl fmt::Display for LedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedError::WriteFailed => f.write_str("write failed"),
            LedError::IndexOutOfRange => f.write_str("pixel index out of range"),
            LedError::Timeout => f.write_str("transmit timeout"),
        }
    }
}

/// Trait für adressierbare LED-Strips (WS2812/Neopixel)
///
/// `clear()` und `refresh()` übertragen an die Hardware und erhalten ein
/// festes Zeitbudget, damit ein hängendes Backend den Dispatcher nicht
/// unbegrenzt blockiert. `set_pixel()` schreibt nur in den Frame-Buffer.
pub trait LedStripDriver {
    /// Anzahl der Pixel im Strip
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Setzt alle Pixel auf Schwarz und überträgt
    fn clear(&mut self, timeout: Duration) -> Result<(), LedError>;

    /// Setzt einen Pixel im Frame-Buffer
    ///
    /// # Fehlerbehandlung
    /// Gibt `LedError::IndexOutOfRange` zurück wenn `index >= len()`
    fn set_pixel(&mut self, index: usize, color: RGB8) -> Result<(), LedError>;

    /// Überträgt den Frame-Buffer an den Strip
    fn refresh(&mut self, timeout: Duration) -> Result<(), LedError>;
}

/// Fehler beim Publizieren (Best-Effort, kein Retry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// Nachricht passt nicht in den Serialisierungs-Buffer
    Encode,
    /// Ausgangs-Queue voll, Nachricht verworfen
    QueueFull,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Encode => f.write_str("encode failed"),
            PublishError::QueueFull => f.write_str("outbound queue full"),
        }
    }
}

/// Outbound-Stream für die Status-Nachricht
pub trait StatusPublisher {
    fn publish(&mut self, msg: &StatusMessage) -> Result<(), PublishError>;
}

/// Inbound-Stream für Kommandos (non-blocking)
pub trait CommandSource {
    fn try_receive(&mut self) -> Option<CommandMessage>;
}

/// Transport für Remote-Parameter-Anfragen (get/set/list)
pub trait ParameterTransport {
    /// Nächste Anfrage, falls vorhanden (non-blocking)
    fn try_receive(&mut self) -> Option<ParameterRequest>;

    /// Sendet die Antwort auf eine Anfrage
    fn respond(&mut self, response: &ParameterResponse<'_>) -> Result<(), PublishError>;
}

/// Zeitquelle des Nodes
pub trait Clock {
    /// Monotone Nanosekunden seit Start
    fn now_nanos(&self) -> u64;

    /// Epoch-Nanosekunden (einmalig beim Start synchronisiert)
    fn epoch_nanos(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_nanos(&self) -> u64 {
        (**self).now_nanos()
    }

    fn epoch_nanos(&self) -> i64 {
        (**self).epoch_nanos()
    }
}
