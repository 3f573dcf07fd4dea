//! Pure Business Logic Functions
//!
//! Funktionen ohne Hardware-Dependencies (testbar!)

use rgb::RGB8;

use crate::parameters::{
    PARAM_BLUE, PARAM_GREEN, PARAM_NUMBER, PARAM_RED, PARAM_TOGGLE, ParameterError,
    ParameterStore,
};

/// Pixel-Anzahl im ausgeschalteten Zustand
///
/// Unabhängig vom Parameter `number`: "aus" löscht immer genau 8 Pixel.
pub const OFF_PIXEL_COUNT: usize = 8;

/// Wandelt eine Intensität aus `[0, 1]` in einen 8-Bit-Kanal
///
/// Gerundet, außerhalb des Bereichs gesättigt, NaN ergibt 0.
///
/// # Beispiele
///
/// ```
/// # use led_core::channel_to_u8;
/// assert_eq!(channel_to_u8(1.0), 255);
/// assert_eq!(channel_to_u8(0.5), 128);
/// assert_eq!(channel_to_u8(-3.0), 0);
/// ```
pub fn channel_to_u8(intensity: f64) -> u8 {
    // `as` sättigt an den Grenzen und bildet NaN auf 0 ab
    (intensity * 255.0 + 0.5) as u8
}

/// Wandelt RGB-Intensitäten in eine RGB8-Farbe
pub fn color_from_intensities(red: f64, green: f64, blue: f64) -> RGB8 {
    RGB8 {
        r: channel_to_u8(red),
        g: channel_to_u8(green),
        b: channel_to_u8(blue),
    }
}

/// Soll-Zustand des Strips: die ersten `count` Pixel in `color`, Rest aus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripFrame {
    pub count: usize,
    pub color: RGB8,
}

impl StripFrame {
    /// Fester Frame für `toggle = false`
    pub const OFF: StripFrame = StripFrame {
        count: OFF_PIXEL_COUNT,
        color: RGB8 { r: 0, g: 0, b: 0 },
    };

    /// Berechnet den Frame aus dem aktuellen Parameter-Satz
    ///
    /// Liest immer den kompletten Satz neu. Negative Werte für `number`
    /// ergeben 0 Pixel.
    pub fn from_parameters(params: &ParameterStore) -> Result<Self, ParameterError> {
        if !params.get_bool(PARAM_TOGGLE)? {
            return Ok(Self::OFF);
        }

        let number = params.get_int(PARAM_NUMBER)?;
        let red = params.get_double(PARAM_RED)?;
        let green = params.get_double(PARAM_GREEN)?;
        let blue = params.get_double(PARAM_BLUE)?;

        Ok(Self {
            count: usize::try_from(number).unwrap_or(0),
            color: color_from_intensities(red, green, blue),
        })
    }
}
