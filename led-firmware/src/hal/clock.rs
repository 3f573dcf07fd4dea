// Uhr des Nodes
//
// Monotone Zeit kommt von embassy-time. Der Epoch-Offset wird beim Start
// einmal vom SNTP-Task ermittelt und per `TimeSyncSignal` an den Node
// übergeben; danach ist er fest im `EpochClock` gespeichert.

use embassy_time::Instant;
use led_core::Clock;

/// Monotone Zeit seit Boot in Nanosekunden
fn monotonic_nanos() -> u64 {
    Instant::now().as_micros().saturating_mul(1_000)
}

/// Offset, mit dem `monotonic_nanos()` jetzt `epoch_now_nanos` ergibt
pub fn epoch_offset_for(epoch_now_nanos: i64) -> i64 {
    epoch_now_nanos.saturating_sub(monotonic_nanos() as i64)
}

/// Clock-Implementierung auf Basis von embassy-time
///
/// Offset 0 bedeutet: keine Synchronisation, Zeit zählt ab Boot.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochClock {
    offset_nanos: i64,
}

impl EpochClock {
    pub const fn new(offset_nanos: i64) -> Self {
        Self { offset_nanos }
    }
}

impl Clock for EpochClock {
    fn now_nanos(&self) -> u64 {
        monotonic_nanos()
    }

    fn epoch_nanos(&self) -> i64 {
        self.offset_nanos.saturating_add(monotonic_nanos() as i64)
    }
}
