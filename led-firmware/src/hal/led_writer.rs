// RMT Strip-Treiber
//
// Implementiert den LedStripDriver aus led-core für WS2812 LEDs am
// RMT Peripheral. Pixel werden im RAM gepuffert und erst bei refresh()
// übertragen.

use core::time::Duration;

use defmt::warn;
use embassy_time::Instant;
use esp_hal::Blocking;
use esp_hal::rmt::{PulseCode, Rmt};
use esp_hal::time::Rate;
use esp_hal_smartled::SmartLedsAdapter;
use led_core::{LedError, LedStripDriver};
use rgb::RGB8;
use smart_leds_trait::SmartLedsWrite;

use crate::config::STRIP_LENGTH;

/// RMT-Buffer-Größe: 24 Bits pro LED + 1 Reset-Puls
pub const RMT_BUFFER_SIZE: usize = STRIP_LENGTH * 24 + 1;

/// WS2812 Strip am RMT Channel 0
///
/// Der Pulse-Buffer muss 'static leben, daher wird er im Task erstellt
/// (smart_led_buffer! Macro) und hier nur ausgeliehen.
pub struct RmtStripDriver<'a> {
    led: SmartLedsAdapter<'a, RMT_BUFFER_SIZE>,
    pixels: [RGB8; STRIP_LENGTH],
}

impl<'a> RmtStripDriver<'a> {
    /// Erstellt den Treiber
    ///
    /// # Parameter
    /// - `gpio8`: GPIO8 Peripheral für die Datenleitung
    /// - `rmt_peripheral`: RMT Peripheral
    /// - `rmt_clock_mhz`: RMT Clock Frequenz in MHz (z.B. 80)
    /// - `buffer`: Pulse-Buffer für alle LEDs
    pub fn new(
        gpio8: esp_hal::peripherals::GPIO8<'a>,
        rmt_peripheral: esp_hal::peripherals::RMT<'a>,
        rmt_clock_mhz: u32,
        buffer: &'a mut [PulseCode; RMT_BUFFER_SIZE],
    ) -> Result<Self, LedError> {
        let rmt: Rmt<'a, Blocking> = Rmt::new(rmt_peripheral, Rate::from_mhz(rmt_clock_mhz))
            .map_err(|_| LedError::WriteFailed)?;

        let led = SmartLedsAdapter::new(rmt.channel0, gpio8, buffer);

        Ok(Self {
            led,
            pixels: [RGB8::default(); STRIP_LENGTH],
        })
    }

    /// Überträgt den Pixel-Buffer und prüft das Zeitbudget
    fn transmit(&mut self, timeout: Duration) -> Result<(), LedError> {
        let started = Instant::now();

        self.led
            .write(self.pixels.iter().copied())
            .map_err(|_| LedError::WriteFailed)?;

        let elapsed = started.elapsed().as_micros();
        if u128::from(elapsed) > timeout.as_micros() {
            warn!(
                "Strip: transmit took {} us (budget {} us)",
                elapsed,
                timeout.as_micros() as u64
            );
            return Err(LedError::Timeout);
        }
        Ok(())
    }
}

impl LedStripDriver for RmtStripDriver<'_> {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn clear(&mut self, timeout: Duration) -> Result<(), LedError> {
        self.pixels.fill(RGB8::default());
        self.transmit(timeout)
    }

    fn set_pixel(&mut self, index: usize, color: RGB8) -> Result<(), LedError> {
        let pixel = self
            .pixels
            .get_mut(index)
            .ok_or(LedError::IndexOutOfRange)?;
        *pixel = color;
        Ok(())
    }

    fn refresh(&mut self, timeout: Duration) -> Result<(), LedError> {
        self.transmit(timeout)
    }
}
