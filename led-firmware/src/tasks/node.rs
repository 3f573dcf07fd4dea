// Node Task - Der Dispatcher des LED-Nodes
use defmt::info;
use embassy_time::Delay;
use esp_hal_smartled::smart_led_buffer;
use led_core::types::NODE_NAME;
use led_core::{IDLE_SLEEP, LedNode, NodeContext, NodeExecutor, POLL_INTERVAL};

use crate::config::{RMT_CLOCK_MHZ, STRIP_GPIO_PIN, STRIP_LENGTH};
use crate::hal::{EpochClock, RmtStripDriver};
use crate::transport::{ChannelCommandSource, ChannelParameterTransport, ChannelStatusPublisher};
use crate::{CommandReceiver, OutboundSender, ParameterRequestReceiver, TimeSyncSignal};

/// Node Task - initialisiert den Strip und dreht den Executor endlos
///
/// Wartet zuerst auf die einmalige Zeit-Synchronisation, damit schon der
/// erste Status einen Epoch-Zeitstempel trägt. Registrierungs-Reihenfolge:
/// Parameter-Server, Status-Timer, Kommando-Subscription. Fehler beim
/// Hochfahren von Strip oder Executor sind fatal.
///
/// # Parameter
/// - `gpio8`: GPIO8 Peripheral für die Datenleitung des Strips
/// - `rmt_peripheral`: RMT Peripheral für präzises Timing
/// - `outbound`: Queue zum MQTT-Task (Status + Parameter-Antworten)
/// - `commands`: Kommandos von `led_subscriber`
/// - `requests`: Parameter-Anfragen
/// - `synced`: Epoch-Offset vom Time-Sync-Task
#[embassy_executor::task]
pub async fn node_task(
    gpio8: esp_hal::peripherals::GPIO8<'static>,
    rmt_peripheral: esp_hal::peripherals::RMT<'static>,
    outbound: OutboundSender,
    commands: CommandReceiver,
    requests: ParameterRequestReceiver,
    synced: &'static TimeSyncSignal,
) {
    // Pulse-Buffer für alle LEDs im richtigen Format für RMT
    let mut rmt_buffer = smart_led_buffer!(STRIP_LENGTH);

    let strip = RmtStripDriver::new(gpio8, rmt_peripheral, RMT_CLOCK_MHZ, &mut rmt_buffer)
        .expect("Failed to initialize LED strip");
    info!(
        "Node: strip with {} LEDs on GPIO{}",
        STRIP_LENGTH, STRIP_GPIO_PIN
    );

    info!("Node: waiting for time sync...");
    let clock = EpochClock::new(synced.wait().await);

    let publisher = ChannelStatusPublisher::new(outbound);
    let mut ctx = NodeContext::new(strip, publisher, clock)
        .expect("Failed to register LED parameters");

    let mut transport = ChannelParameterTransport::new(requests, outbound);
    let mut commands = ChannelCommandSource::new(commands);
    let mut node = LedNode::new();

    let mut executor: NodeExecutor<'_, RmtStripDriver<'_>, ChannelStatusPublisher, EpochClock, Delay> =
        node.executor(clock, Delay, &mut transport, &mut commands)
            .expect("Failed to set up node executor");

    info!("Node: '{}' running", NODE_NAME);
    executor.spin(&mut ctx, POLL_INTERVAL, IDLE_SLEEP).await
}
