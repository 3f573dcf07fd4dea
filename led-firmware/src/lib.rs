// Library-Root: Hardware-Anbindung und Tasks des LED-Nodes
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;
pub mod transport;

// Embassy Channel-Typen
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;
use heapless::Vec;
use led_core::{CommandMessage, ParameterRequest};

use crate::config::{OUTBOUND_PAYLOAD_SIZE, OUTBOUND_QUEUE_DEPTH, PARAMETER_QUEUE_DEPTH};

/// Serialisierte Nachricht auf dem Weg zum Broker
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub topic: &'static str,
    pub payload: Vec<u8, OUTBOUND_PAYLOAD_SIZE>,
}

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================
//
// Statt:  Sender<'static, NoopRawMutex, OutboundMessage, 4>
// Nutze:  OutboundSender

/// Channel Node → MQTT (Status und Parameter-Antworten)
pub type OutboundChannel = Channel<NoopRawMutex, OutboundMessage, OUTBOUND_QUEUE_DEPTH>;
pub type OutboundSender = Sender<'static, NoopRawMutex, OutboundMessage, OUTBOUND_QUEUE_DEPTH>;
pub type OutboundReceiver = Receiver<'static, NoopRawMutex, OutboundMessage, OUTBOUND_QUEUE_DEPTH>;

/// Channel MQTT → Node für Kommandos
/// - 1: nur das neueste ungelesene Kommando wird gehalten
pub type CommandChannel = Channel<NoopRawMutex, CommandMessage, 1>;
pub type CommandReceiver = Receiver<'static, NoopRawMutex, CommandMessage, 1>;

/// Channel MQTT → Node für Parameter-Anfragen
pub type ParameterRequestChannel =
    Channel<NoopRawMutex, ParameterRequest, PARAMETER_QUEUE_DEPTH>;
pub type ParameterRequestSender =
    Sender<'static, NoopRawMutex, ParameterRequest, PARAMETER_QUEUE_DEPTH>;
pub type ParameterRequestReceiver =
    Receiver<'static, NoopRawMutex, ParameterRequest, PARAMETER_QUEUE_DEPTH>;

/// Einmalige Übergabe SNTP → Node: Epoch-Offset in Nanosekunden
/// (0, wenn die Synchronisation gescheitert ist)
pub type TimeSyncSignal = Signal<NoopRawMutex, i64>;
