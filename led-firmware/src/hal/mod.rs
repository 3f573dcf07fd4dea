// Hardware Abstraction Layer (HAL) Module
//
// Implementierungen der led-core Traits für die ESP32-C6 Hardware.

pub mod clock;
pub mod led_writer;

pub use clock::{EpochClock, epoch_offset_for};
pub use led_writer::{RMT_BUFFER_SIZE, RmtStripDriver};
