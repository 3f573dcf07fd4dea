//! LED Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Traits, Parameter-Store, Executor und Pure Functions
//! des LED-Nodes sowie die Rahmung eingehender MQTT-Pakete.

#![no_std]

// Muss als erstes Modul stehen (Log-Makros)
#[macro_use]
mod fmt;

pub mod controller;
pub mod executor;
pub mod framing;
pub mod logic;
pub mod node;
pub mod parameters;
#[cfg(feature = "serde")]
pub mod protocol;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use controller::{ControllerError, STRIP_TIMEOUT, StripController};
pub use executor::{
    Executor, ExecutorError, HasParameters, MessageHandler, ParameterHandler, TimerEvent,
    TimerHandler,
};
pub use framing::{FrameError, PacketFramer};
pub use logic::{OFF_PIXEL_COUNT, StripFrame, channel_to_u8, color_from_intensities};
pub use node::{
    CommandEcho, IDLE_SLEEP, LedNode, NodeContext, NodeExecutor, POLL_INTERVAL, STATUS_PERIOD,
    StatusTimer, StripParameterHandler,
};
pub use parameters::{
    Parameter, ParameterError, ParameterRequest, ParameterResponse, ParameterServer,
    ParameterStore, register_led_parameters,
};
pub use traits::{
    Clock, CommandSource, LedError, LedStripDriver, ParameterTransport, PublishError,
    StatusPublisher,
};
pub use types::{
    BoundedString, CommandMessage, ParameterType, ParameterValue, Stamp, StatusMessage,
};
