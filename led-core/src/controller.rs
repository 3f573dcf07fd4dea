//! Strip-Controller
//!
//! Übersetzt den Parameter-Satz in Aufrufe des LED-Strip-Treibers.
//! Jeder Aufruf baut den Frame komplett neu auf: erst alles löschen,
//! dann `count` Pixel setzen, dann übertragen.

use core::fmt;
use core::time::Duration;

use crate::logic::StripFrame;
use crate::parameters::{ParameterError, ParameterStore};
use crate::traits::{LedError, LedStripDriver};

/// Zeitbudget für `clear()` und `refresh()`
pub const STRIP_TIMEOUT: Duration = Duration::from_millis(100);

/// Fehler-Typ für ein Controller-Update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerError {
    /// Parameter fehlt oder hat falschen Typ, keine Treiber-Aufrufe
    Parameter(ParameterError),
    /// Treiber-Aufruf fehlgeschlagen, Frame verworfen
    Driver(LedError),
}

impl From<ParameterError> for ControllerError {
    fn from(e: ParameterError) -> Self {
        ControllerError::Parameter(e)
    }
}

impl From<LedError> for ControllerError {
    fn from(e: LedError) -> Self {
        ControllerError::Driver(e)
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Parameter(e) => write!(f, "parameter error: {}", e),
            ControllerError::Driver(e) => write!(f, "driver error: {}", e),
        }
    }
}

/// Controller ohne eigenen Zustand
#[derive(Debug, Clone, Copy, Default)]
pub struct StripController;

impl StripController {
    pub const fn new() -> Self {
        Self
    }

    /// Liest den Parameter-Satz und schreibt den Frame auf den Strip
    pub fn update<S: LedStripDriver + ?Sized>(
        &self,
        params: &ParameterStore,
        strip: &mut S,
    ) -> Result<StripFrame, ControllerError> {
        let frame = StripFrame::from_parameters(params)?;
        self.apply(frame, strip)?;
        Ok(frame)
    }

    /// Schreibt einen Frame: clear → set_pixel × count → refresh
    ///
    /// Schlägt ein Pixel fehl (z.B. Index jenseits des Strips), werden keine
    /// weiteren Pixel gesetzt, der Frame wird aber trotzdem übertragen.
    pub fn apply<S: LedStripDriver + ?Sized>(
        &self,
        frame: StripFrame,
        strip: &mut S,
    ) -> Result<(), LedError> {
        strip.clear(STRIP_TIMEOUT)?;

        for index in 0..frame.count {
            if let Err(e) = strip.set_pixel(index, frame.color) {
                warn!(
                    "Controller: pixel {} of {} rejected ({}), strip has {}",
                    index,
                    frame.count,
                    e,
                    strip.len()
                );
                break;
            }
        }

        strip.refresh(STRIP_TIMEOUT)
    }
}
