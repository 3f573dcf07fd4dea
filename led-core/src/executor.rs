//! Event-Executor
//!
//! Ein kooperativer, single-threaded Dispatcher für drei Event-Quellen:
//! Parameter-Server, periodischer Timer und Kommando-Subscription.
//!
//! `spin_once()` wartet höchstens `timeout` auf ein bereites Handle und
//! bedient danach **jedes** bereite Handle genau einmal, in
//! Registrierungs-Reihenfolge. Die Reihenfolge ist nur Tie-Breaking;
//! Handler dürfen sich nicht auf sie verlassen.
//!
//! Handler laufen synchron im Executor und müssen kurz und
//! nicht-blockierend sein. Fehler werden im Handler geloggt und nicht
//! an den Executor zurückgegeben.

use core::fmt;
use core::time::Duration;

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;

use crate::parameters::ParameterServer;
use crate::traits::{Clock, CommandSource, ParameterTransport};
use crate::types::CommandMessage;

/// Schrittweite beim Warten auf ein bereites Handle
pub const POLL_GRANULARITY: Duration = Duration::from_millis(1);

/// Info an den Timer-Handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerEvent {
    /// Monotone Zeit beim Auslösen
    pub now_nanos: u64,
    /// Zeit seit dem letzten Auslösen (bzw. seit Registrierung)
    pub since_last_call_nanos: u64,
}

/// Handler für den periodischen Timer
pub trait TimerHandler<C: ?Sized> {
    fn on_timer(&mut self, ctx: &mut C, event: TimerEvent);
}

/// Handler für eingehende Kommandos
pub trait MessageHandler<C: ?Sized> {
    fn on_message(&mut self, ctx: &mut C, msg: CommandMessage);
}

/// Handler für Parameter-Änderungen
///
/// Erhält den Namen des geänderten Parameters.
pub trait ParameterHandler<C: ?Sized> {
    fn on_parameter_changed(&mut self, ctx: &mut C, name: &'static str);
}

/// Kontext, der einen Parameter-Server besitzt
pub trait HasParameters {
    fn parameter_server(&mut self) -> &mut ParameterServer;
}

/// Fehler beim Aufbau der Dispatch-Tabelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExecutorError {
    /// Alle Handle-Plätze belegt
    TableFull,
    /// Registrierung nach dem ersten `spin_once()`
    AlreadyStarted,
    /// Timer-Periode von 0
    ZeroPeriod,
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::TableFull => f.write_str("handle table full"),
            ExecutorError::AlreadyStarted => f.write_str("executor already started"),
            ExecutorError::ZeroPeriod => f.write_str("timer period must be non-zero"),
        }
    }
}

// ============================================================================
// Timer
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct PeriodicTimer {
    period: u64,
    next_due: u64,
    last_call: u64,
}

impl PeriodicTimer {
    fn new(period: u64, now: u64) -> Self {
        Self {
            period,
            next_due: now.saturating_add(period),
            last_call: now,
        }
    }

    fn is_ready(&self, now: u64) -> bool {
        now >= self.next_due
    }

    /// Löst aus und springt zur nächsten Deadline nach `now`
    ///
    /// Verpasste Perioden werden übersprungen, nicht nachgeholt.
    fn fire(&mut self, now: u64) -> TimerEvent {
        let missed = now.saturating_sub(self.next_due) / self.period;
        self.next_due = self
            .next_due
            .saturating_add(self.period.saturating_mul(missed + 1));

        let event = TimerEvent {
            now_nanos: now,
            since_last_call_nanos: now.saturating_sub(self.last_call),
        };
        self.last_call = now;
        event
    }
}

// ============================================================================
// Dispatch-Tabelle
// ============================================================================

enum Entry<'a, C> {
    Parameters {
        transport: &'a mut dyn ParameterTransport,
        handler: &'a mut dyn ParameterHandler<C>,
    },
    Timer {
        timer: PeriodicTimer,
        handler: &'a mut dyn TimerHandler<C>,
    },
    Subscription {
        source: &'a mut dyn CommandSource,
        pending: Option<CommandMessage>,
        handler: &'a mut dyn MessageHandler<C>,
    },
}

/// Executor mit fester Handle-Anzahl `N`
pub struct Executor<'a, C, K, D, const N: usize> {
    entries: Vec<Entry<'a, C>, N>,
    clock: K,
    delay: D,
    started: bool,
}

impl<'a, C, K, D, const N: usize> Executor<'a, C, K, D, N>
where
    C: HasParameters,
    K: Clock,
    D: DelayNs,
{
    pub fn new(clock: K, delay: D) -> Self {
        Self {
            entries: Vec::new(),
            clock,
            delay,
            started: false,
        }
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Anzahl registrierter Handles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Registriert den Parameter-Server des Kontexts
    pub fn add_parameter_server(
        &mut self,
        transport: &'a mut dyn ParameterTransport,
        handler: &'a mut dyn ParameterHandler<C>,
    ) -> Result<(), ExecutorError> {
        self.push(Entry::Parameters { transport, handler })
    }

    /// Registriert einen periodischen Timer; erste Auslösung nach `period`
    pub fn add_timer(
        &mut self,
        period: Duration,
        handler: &'a mut dyn TimerHandler<C>,
    ) -> Result<(), ExecutorError> {
        let period = duration_to_nanos(period);
        if period == 0 {
            return Err(ExecutorError::ZeroPeriod);
        }
        let timer = PeriodicTimer::new(period, self.clock.now_nanos());
        self.push(Entry::Timer { timer, handler })
    }

    /// Registriert eine Kommando-Subscription
    pub fn add_subscription(
        &mut self,
        source: &'a mut dyn CommandSource,
        handler: &'a mut dyn MessageHandler<C>,
    ) -> Result<(), ExecutorError> {
        self.push(Entry::Subscription {
            source,
            pending: None,
            handler,
        })
    }

    fn push(&mut self, entry: Entry<'a, C>) -> Result<(), ExecutorError> {
        if self.started {
            return Err(ExecutorError::AlreadyStarted);
        }
        self.entries
            .push(entry)
            .map_err(|_| ExecutorError::TableFull)
    }

    /// Pollt alle Handles einmal und ruft die Handler bereiter Handles auf
    ///
    /// Wartet höchstens `timeout`, falls noch nichts bereit ist. Gibt die
    /// Anzahl ausgeführter Handler-Aufrufe zurück.
    pub async fn spin_once(&mut self, ctx: &mut C, timeout: Duration) -> usize {
        if !self.started {
            self.started = true;
            ctx.parameter_server().store_mut().lock();
            debug!("Executor: started with {} handles", self.entries.len());
        }

        let deadline = self
            .clock
            .now_nanos()
            .saturating_add(duration_to_nanos(timeout));
        let granularity = duration_to_nanos(POLL_GRANULARITY);
        let mut ready = [false; N];

        loop {
            let now = self.clock.now_nanos();
            if self.poll_ready(ctx, now, &mut ready) {
                break;
            }
            if now >= deadline {
                return 0;
            }

            // Bis zur nächsten Timer-Deadline, höchstens eine Schrittweite
            let mut step = (deadline - now).min(granularity);
            if let Some(due) = self.next_timer_due() {
                step = step.min(due.saturating_sub(now).max(1));
            }
            self.delay
                .delay_ns(u32::try_from(step).unwrap_or(u32::MAX))
                .await;
        }

        self.dispatch(ctx, &ready)
    }

    /// Endlosschleife: `spin_once(poll_interval)`, dann `idle` schlafen
    pub async fn spin(&mut self, ctx: &mut C, poll_interval: Duration, idle: Duration) -> ! {
        let idle_us = u32::try_from(idle.as_micros()).unwrap_or(u32::MAX);
        loop {
            self.spin_once(ctx, poll_interval).await;
            self.delay.delay_us(idle_us).await;
        }
    }

    fn poll_ready(&mut self, ctx: &mut C, now: u64, ready: &mut [bool; N]) -> bool {
        let mut any = false;
        for (slot, entry) in ready.iter_mut().zip(self.entries.iter_mut()) {
            *slot = match entry {
                Entry::Parameters { transport, .. } => ctx.parameter_server().poll(&mut **transport),
                Entry::Timer { timer, .. } => timer.is_ready(now),
                Entry::Subscription {
                    source, pending, ..
                } => {
                    if pending.is_none() {
                        *pending = source.try_receive();
                    }
                    pending.is_some()
                }
            };
            any |= *slot;
        }
        any
    }

    fn next_timer_due(&self) -> Option<u64> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Timer { timer, .. } => Some(timer.next_due),
                _ => None,
            })
            .min()
    }

    fn dispatch(&mut self, ctx: &mut C, ready: &[bool; N]) -> usize {
        let mut calls = 0;
        for (entry, _) in self
            .entries
            .iter_mut()
            .zip(ready.iter())
            .filter(|(_, is_ready)| **is_ready)
        {
            match entry {
                Entry::Parameters { transport, handler } => {
                    let server = ctx.parameter_server();
                    server.serve_pending(&mut **transport);

                    // Nur die jetzt wartenden Änderungen; was ein Handler
                    // selbst setzt, kommt in der nächsten Iteration dran
                    let pending = server.store().pending_changes();
                    for _ in 0..pending {
                        let Some(name) = ctx.parameter_server().store_mut().take_change()
                        else {
                            break;
                        };
                        handler.on_parameter_changed(ctx, name);
                        calls += 1;
                    }
                }
                Entry::Timer { timer, handler } => {
                    let event = timer.fire(self.clock.now_nanos());
                    handler.on_timer(ctx, event);
                    calls += 1;
                }
                Entry::Subscription {
                    pending, handler, ..
                } => {
                    if let Some(msg) = pending.take() {
                        handler.on_message(ctx, msg);
                        calls += 1;
                    }
                }
            }
        }
        calls
    }
}

fn duration_to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_first_fire_after_period() {
        let timer = PeriodicTimer::new(100, 0);
        assert!(!timer.is_ready(99));
        assert!(timer.is_ready(100));
    }

    #[test]
    fn test_timer_skips_missed_periods() {
        let mut timer = PeriodicTimer::new(100, 0);
        let event = timer.fire(350);
        assert_eq!(event.since_last_call_nanos, 350);
        assert_eq!(timer.next_due, 400);
        assert!(!timer.is_ready(399));
    }

    #[test]
    fn test_timer_keeps_phase() {
        let mut timer = PeriodicTimer::new(100, 0);
        timer.fire(105);
        assert_eq!(timer.next_due, 200);
        let event = timer.fire(201);
        assert_eq!(event.since_last_call_nanos, 96);
        assert_eq!(timer.next_due, 300);
    }
}
