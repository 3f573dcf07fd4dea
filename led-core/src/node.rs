//! LED-Node: Kontext und Handler
//!
//! Der gesamte veränderliche Zustand (Parameter, Status-Nachricht,
//! Strip-Treiber, Publisher, Uhr) liegt in einem [`NodeContext`], den der
//! Executor besitzt und per Referenz an jeden Handler reicht.
//!
//! Registrierungs-Reihenfolge: Parameter-Server → Timer → Subscription.
//! Eine Parameter-Änderung wird damit vor einem gleichzeitig fälligen
//! Status-Publish bearbeitet.

use core::time::Duration;

use embedded_hal_async::delay::DelayNs;

use crate::controller::StripController;
use crate::executor::{
    Executor, ExecutorError, HasParameters, MessageHandler, ParameterHandler, TimerEvent,
    TimerHandler,
};
use crate::parameters::{ParameterError, ParameterServer, ParameterStore, register_led_parameters};
use crate::traits::{
    Clock, CommandSource, LedStripDriver, ParameterTransport, StatusPublisher,
};
use crate::types::{CommandMessage, Stamp, StatusMessage};

/// Periode des Status-Timers
pub const STATUS_PERIOD: Duration = Duration::from_millis(100);

/// Timeout für ein `spin_once()`
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ruhezeit zwischen zwei Iterationen (kleiner als `STATUS_PERIOD`)
pub const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Anzahl Handles im Executor des Nodes
pub const NODE_HANDLES: usize = 3;

/// Gesamter Laufzeit-Zustand des Nodes
pub struct NodeContext<S, P, K> {
    pub parameters: ParameterServer,
    pub status: StatusMessage,
    pub strip: S,
    pub publisher: P,
    pub clock: K,
}

impl<S, P, K> NodeContext<S, P, K>
where
    S: LedStripDriver,
    P: StatusPublisher,
    K: Clock,
{
    /// Registriert die LED-Parameter und stempelt die Status-Nachricht
    pub fn new(strip: S, publisher: P, clock: K) -> Result<Self, ParameterError> {
        let mut store = ParameterStore::new();
        register_led_parameters(&mut store)?;

        let mut status = StatusMessage::new();
        status.stamp = Stamp::from_epoch_nanos(clock.epoch_nanos());

        Ok(Self {
            parameters: ParameterServer::new(store),
            status,
            strip,
            publisher,
            clock,
        })
    }

    pub fn store(&self) -> &ParameterStore {
        self.parameters.store()
    }

    pub fn store_mut(&mut self) -> &mut ParameterStore {
        self.parameters.store_mut()
    }
}

impl<S, P, K> HasParameters for NodeContext<S, P, K> {
    fn parameter_server(&mut self) -> &mut ParameterServer {
        &mut self.parameters
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Timer-Handler: stempelt und publiziert die Status-Nachricht
#[derive(Debug, Default)]
pub struct StatusTimer {
    published: u32,
}

impl StatusTimer {
    pub fn published(&self) -> u32 {
        self.published
    }
}

impl<S, P, K> TimerHandler<NodeContext<S, P, K>> for StatusTimer
where
    P: StatusPublisher,
    K: Clock,
{
    fn on_timer(&mut self, ctx: &mut NodeContext<S, P, K>, _event: TimerEvent) {
        ctx.status.stamp = Stamp::from_epoch_nanos(ctx.clock.epoch_nanos());

        match ctx.publisher.publish(&ctx.status) {
            Ok(()) => self.published = self.published.wrapping_add(1),
            Err(e) => warn!("Node: status publish failed: {}", e),
        }
    }
}

/// Message-Handler: übernimmt das Kommando in die Frame-ID
#[derive(Debug, Default)]
pub struct CommandEcho;

impl<S, P, K> MessageHandler<NodeContext<S, P, K>> for CommandEcho {
    fn on_message(&mut self, ctx: &mut NodeContext<S, P, K>, msg: CommandMessage) {
        info!("Node: received command {}", msg.data);
        ctx.status.set_command_frame_id(msg.data);
        if ctx.status.frame_id.is_truncated() {
            warn!("Node: frame id truncated to '{}'", ctx.status.frame_id.as_str());
        }
    }
}

/// Parameter-Handler: liest den kompletten Satz und aktualisiert den Strip
///
/// Der Name des geänderten Parameters wird nur geloggt.
#[derive(Debug, Default)]
pub struct StripParameterHandler {
    controller: StripController,
}

impl<S, P, K> ParameterHandler<NodeContext<S, P, K>> for StripParameterHandler
where
    S: LedStripDriver,
{
    fn on_parameter_changed(&mut self, ctx: &mut NodeContext<S, P, K>, name: &'static str) {
        info!("Node: parameter modified: {}", name);
        if let Err(e) = self.controller.update(ctx.parameters.store(), &mut ctx.strip) {
            error!("Node: strip update skipped: {}", e);
        }
    }
}

// ============================================================================
// LedNode
// ============================================================================

/// Bündelt die drei Handler des Nodes
#[derive(Debug, Default)]
pub struct LedNode {
    pub parameters: StripParameterHandler,
    pub timer: StatusTimer,
    pub echo: CommandEcho,
}

/// Executor-Typ des LED-Nodes
pub type NodeExecutor<'a, S, P, K, D> = Executor<'a, NodeContext<S, P, K>, K, D, NODE_HANDLES>;

impl LedNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baut den Executor mit Parameter-Server, Status-Timer und Subscription
    pub fn executor<'a, S, P, K, D>(
        &'a mut self,
        clock: K,
        delay: D,
        parameter_transport: &'a mut dyn ParameterTransport,
        commands: &'a mut dyn CommandSource,
    ) -> Result<NodeExecutor<'a, S, P, K, D>, ExecutorError>
    where
        S: LedStripDriver,
        P: StatusPublisher,
        K: Clock,
        D: DelayNs,
    {
        let mut executor = Executor::new(clock, delay);
        executor.add_parameter_server(parameter_transport, &mut self.parameters)?;
        executor.add_timer(STATUS_PERIOD, &mut self.timer)?;
        executor.add_subscription(commands, &mut self.echo)?;
        Ok(executor)
    }
}
