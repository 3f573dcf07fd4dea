//! Integration Tests für den Executor
//!
//! Eigener Test-Kontext mit Event-Log, damit Reihenfolge und Anzahl der
//! Handler-Aufrufe direkt sichtbar sind.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{MockClock, MockCommands, MockDelay, MockParameterTransport};
use embassy_futures::block_on;
use embassy_futures::select::{Either, select};
use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;
use led_core::parameters::{PARAM_NUMBER, PARAM_TOGGLE};
use led_core::{
    CommandMessage, Executor, ExecutorError, HasParameters, MessageHandler, ParameterError,
    ParameterHandler, ParameterServer, ParameterStore, TimerEvent, TimerHandler,
    register_led_parameters,
};

type Log = Rc<RefCell<Vec<String>>>;

struct TestCtx {
    parameters: ParameterServer,
    log: Log,
}

impl TestCtx {
    fn new() -> Self {
        let mut store = ParameterStore::new();
        register_led_parameters(&mut store).unwrap();
        Self {
            parameters: ParameterServer::new(store),
            log: Log::default(),
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl HasParameters for TestCtx {
    fn parameter_server(&mut self) -> &mut ParameterServer {
        &mut self.parameters
    }
}

#[derive(Default)]
struct LogTimer {
    events: Vec<TimerEvent>,
}

impl TimerHandler<TestCtx> for LogTimer {
    fn on_timer(&mut self, ctx: &mut TestCtx, event: TimerEvent) {
        ctx.log.borrow_mut().push("timer".into());
        self.events.push(event);
    }
}

struct LogMessages;

impl MessageHandler<TestCtx> for LogMessages {
    fn on_message(&mut self, ctx: &mut TestCtx, msg: CommandMessage) {
        ctx.log.borrow_mut().push(format!("message:{}", msg.data));
    }
}

/// Loggt jede Änderung; setzt optional selbst einen Parameter
#[derive(Default)]
struct LogParameters {
    set_number_on_toggle: bool,
}

impl ParameterHandler<TestCtx> for LogParameters {
    fn on_parameter_changed(&mut self, ctx: &mut TestCtx, name: &'static str) {
        ctx.log.borrow_mut().push(format!("param:{}", name));
        if self.set_number_on_toggle && name == PARAM_TOGGLE {
            ctx.parameters.store_mut().set(PARAM_NUMBER, 3i64).unwrap();
        }
    }
}

type TestExecutor<'a> = Executor<'a, TestCtx, MockClock, MockDelay, 3>;

const TIMER_PERIOD: Duration = Duration::from_millis(100);
const TIMEOUT: Duration = Duration::from_millis(100);

// ============================================================================
// Tests: Registrierung
// ============================================================================

#[test]
fn test_table_full() {
    let clock = MockClock::new();
    let mut timer = LogTimer::default();
    let mut commands = MockCommands::default();
    let mut messages = LogMessages;

    let mut executor: Executor<'_, TestCtx, MockClock, MockDelay, 1> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));

    assert_eq!(executor.add_timer(TIMER_PERIOD, &mut timer), Ok(()));
    assert_eq!(
        executor.add_subscription(&mut commands, &mut messages),
        Err(ExecutorError::TableFull)
    );
    assert_eq!(executor.len(), 1);
}

#[test]
fn test_zero_period_rejected() {
    let clock = MockClock::new();
    let mut timer = LogTimer::default();
    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));

    assert_eq!(
        executor.add_timer(Duration::ZERO, &mut timer),
        Err(ExecutorError::ZeroPeriod)
    );
    assert!(executor.is_empty());
}

#[test]
fn test_registration_after_start() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut transport = MockParameterTransport::default();
    let mut params = LogParameters::default();
    let mut commands = MockCommands::default();
    let mut messages = LogMessages;

    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor
        .add_parameter_server(&mut transport, &mut params)
        .unwrap();

    assert!(!ctx.parameters.store().is_locked());
    block_on(executor.spin_once(&mut ctx, Duration::from_millis(1)));

    assert!(executor.is_started());
    assert!(ctx.parameters.store().is_locked());
    assert_eq!(
        executor.add_subscription(&mut commands, &mut messages),
        Err(ExecutorError::AlreadyStarted)
    );
    assert_eq!(
        ctx.parameters.store_mut().register("late", 1i64),
        Err(ParameterError::Locked)
    );
}

// ============================================================================
// Tests: spin_once
// ============================================================================

#[test]
fn test_timeout_without_events() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut transport = MockParameterTransport::default();
    let mut params = LogParameters::default();
    let mut commands = MockCommands::default();
    let mut messages = LogMessages;

    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor
        .add_parameter_server(&mut transport, &mut params)
        .unwrap();
    executor
        .add_subscription(&mut commands, &mut messages)
        .unwrap();

    let calls = block_on(executor.spin_once(&mut ctx, Duration::from_millis(50)));

    assert_eq!(calls, 0);
    assert!(ctx.log().is_empty());
    // Wartet ungefähr den Timeout ab
    assert!(clock.elapsed() >= Duration::from_millis(50));
    assert!(clock.elapsed() <= Duration::from_millis(52));
}

#[test]
fn test_ready_handles_in_registration_order() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let transport = MockParameterTransport::default();
    let commands = MockCommands::default();
    let mut params = LogParameters::default();
    let mut timer = LogTimer::default();
    let mut messages = LogMessages;

    let mut transport_handle = transport.clone();
    let mut commands_handle = commands.clone();
    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor
        .add_parameter_server(&mut transport_handle, &mut params)
        .unwrap();
    executor.add_timer(TIMER_PERIOD, &mut timer).unwrap();
    executor
        .add_subscription(&mut commands_handle, &mut messages)
        .unwrap();

    // Alle drei gleichzeitig bereit
    commands.push(7);
    transport.set(PARAM_TOGGLE, true);
    clock.advance(TIMER_PERIOD);

    let calls = block_on(executor.spin_once(&mut ctx, TIMEOUT));

    assert_eq!(calls, 3);
    assert_eq!(ctx.log(), vec!["param:toggle", "timer", "message:7"]);
}

#[test]
fn test_timer_fires_after_period() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut timer = LogTimer::default();

    {
        let mut executor: TestExecutor<'_> =
            Executor::new(clock.clone(), MockDelay::new(clock.clone()));
        executor.add_timer(TIMER_PERIOD, &mut timer).unwrap();

        // Erster Aufruf wartet bis zur Timer-Deadline
        let calls = block_on(executor.spin_once(&mut ctx, Duration::from_millis(200)));
        assert_eq!(calls, 1);
        assert_eq!(clock.elapsed(), TIMER_PERIOD);

        // Zu kurzer Timeout: nichts passiert
        let calls = block_on(executor.spin_once(&mut ctx, Duration::from_millis(20)));
        assert_eq!(calls, 0);
    }

    assert_eq!(timer.events.len(), 1);
    assert_eq!(timer.events[0].since_last_call_nanos, 100_000_000);
}

#[test]
fn test_one_handler_call_per_set() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut transport = MockParameterTransport::default();
    let mut params = LogParameters::default();

    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor
        .add_parameter_server(&mut transport, &mut params)
        .unwrap();

    ctx.parameters.store_mut().set(PARAM_TOGGLE, true).unwrap();
    ctx.parameters.store_mut().set(PARAM_NUMBER, 4i64).unwrap();
    // Gleicher Wert löst trotzdem eine Benachrichtigung aus
    ctx.parameters.store_mut().set(PARAM_NUMBER, 4i64).unwrap();

    let calls = block_on(executor.spin_once(&mut ctx, TIMEOUT));

    assert_eq!(calls, 3);
    assert_eq!(
        ctx.log(),
        vec!["param:toggle", "param:number", "param:number"]
    );
    assert!(!ctx.parameters.store().has_pending_changes());
}

#[test]
fn test_set_inside_handler_is_deferred() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut transport = MockParameterTransport::default();
    let mut params = LogParameters {
        set_number_on_toggle: true,
    };

    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor
        .add_parameter_server(&mut transport, &mut params)
        .unwrap();

    ctx.parameters.store_mut().set(PARAM_TOGGLE, true).unwrap();

    assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 1);
    assert_eq!(ctx.log(), vec!["param:toggle"]);

    assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 1);
    assert_eq!(ctx.log(), vec!["param:toggle", "param:number"]);
}

#[test]
fn test_one_message_per_iteration() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let commands = MockCommands::default();
    let mut handle = commands.clone();
    let mut messages = LogMessages;

    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor.add_subscription(&mut handle, &mut messages).unwrap();

    commands.push(1);
    commands.push(2);

    assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 1);
    assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 1);
    assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 0);

    assert_eq!(ctx.log(), vec!["message:1", "message:2"]);
    assert_eq!(commands.pending(), 0);
}

#[test]
fn test_get_request_answered_without_handler_call() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let transport = MockParameterTransport::default();
    let mut handle = transport.clone();
    let mut params = LogParameters::default();

    let mut executor: TestExecutor<'_> =
        Executor::new(clock.clone(), MockDelay::new(clock.clone()));
    executor
        .add_parameter_server(&mut handle, &mut params)
        .unwrap();

    transport.get(PARAM_NUMBER);

    assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 0);
    assert_eq!(transport.responses().len(), 1);
    assert!(ctx.log().is_empty());
}

#[test]
fn test_timer_period_over_one_second() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut timer = LogTimer::default();

    {
        let mut executor: TestExecutor<'_> =
            Executor::new(clock.clone(), MockDelay::new(clock.clone()));
        executor.add_timer(TIMER_PERIOD, &mut timer).unwrap();

        while clock.elapsed() < Duration::from_secs(1) {
            block_on(executor.spin_once(&mut ctx, TIMEOUT));
            clock.advance(Duration::from_millis(10));
        }
    }

    let fired = timer.events.len();
    assert!((9..=11).contains(&fired), "fired {} times", fired);
    for event in &timer.events {
        assert!(event.since_last_call_nanos >= 100_000_000);
        assert!(event.since_last_call_nanos < 120_000_000);
    }
}

#[test]
fn test_late_timer_skips_missed_periods() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let mut timer = LogTimer::default();

    {
        let mut executor: TestExecutor<'_> =
            Executor::new(clock.clone(), MockDelay::new(clock.clone()));
        executor.add_timer(TIMER_PERIOD, &mut timer).unwrap();

        // 3,5 Perioden verpasst
        clock.advance(Duration::from_millis(350));
        assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 1);

        // Nächste Deadline liegt bei 400 ms, nicht bei 200 ms
        assert_eq!(
            block_on(executor.spin_once(&mut ctx, Duration::from_millis(10))),
            0
        );
        assert_eq!(block_on(executor.spin_once(&mut ctx, TIMEOUT)), 1);
        assert_eq!(clock.elapsed(), Duration::from_millis(400));
    }

    assert_eq!(timer.events.len(), 2);
}

// ============================================================================
// Tests: Endlosschleife
// ============================================================================

/// Delay, der jede Wartezeit ins Event-Log schreibt und einmal abgibt
struct TracingDelay {
    clock: MockClock,
    log: Log,
}

impl DelayNs for TracingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_nanos(ns as u64);
        self.log.borrow_mut().push(format!("delay:{}", ns));
        yield_now().await;
    }
}

#[test]
fn test_spin_sleeps_idle_between_polls() {
    let clock = MockClock::new();
    let mut ctx = TestCtx::new();
    let log = ctx.log.clone();
    let mut timer = LogTimer::default();
    let idle = Duration::from_millis(10);

    let mut executor: Executor<'_, TestCtx, MockClock, TracingDelay, 3> = Executor::new(
        clock.clone(),
        TracingDelay {
            clock: clock.clone(),
            log: log.clone(),
        },
    );
    executor.add_timer(TIMER_PERIOD, &mut timer).unwrap();

    let fired_three_times = async {
        while log.borrow().iter().filter(|e| *e == "timer").count() < 3 {
            yield_now().await;
        }
    };
    let result = block_on(select(
        executor.spin(&mut ctx, TIMEOUT, idle),
        fired_three_times,
    ));
    assert!(matches!(result, Either::Second(())));

    // Nach jedem Handler-Aufruf folgt genau der Idle-Sleep
    let events = ctx.log();
    let idle_entry = format!("delay:{}", idle.as_nanos());
    let timer_positions: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| *e == "timer")
        .map(|(i, _)| i)
        .collect();
    assert_eq!(timer_positions.len(), 3);
    for i in timer_positions {
        assert_eq!(events[i + 1], idle_entry);
    }
    assert_eq!(events.iter().filter(|e| **e == idle_entry).count(), 3);

    // Auslösungen bei 100, 200 und 300 ms, danach 10 ms Idle
    assert_eq!(clock.elapsed(), Duration::from_millis(310));
}
