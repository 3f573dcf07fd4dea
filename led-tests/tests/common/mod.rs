//! Gemeinsame Mocks für die Host-Tests
//!
//! Alle Mocks laufen auf dem Host (x86_64) ohne Hardware.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal_async::delay::DelayNs;
use led_core::{
    Clock, CommandMessage, CommandSource, LedError, LedStripDriver, NodeContext, NodeExecutor,
    ParameterError, ParameterRequest, ParameterResponse, ParameterTransport, ParameterValue,
    PublishError, StatusMessage, StatusPublisher,
};
use rgb::RGB8;

// ============================================================================
// Mock LED Strip
// ============================================================================

/// Ein aufgezeichneter Treiber-Aufruf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripCall {
    Clear(Duration),
    SetPixel(usize, RGB8),
    Refresh(Duration),
}

pub struct MockStrip {
    pub pixels: Vec<RGB8>,
    pub calls: Vec<StripCall>,
    /// Zuletzt übertragener Frame
    pub shown: Vec<RGB8>,
    pub fail_next_clear: bool,
    pub fail_next_refresh: bool,
}

impl MockStrip {
    pub fn new(len: usize) -> Self {
        Self {
            pixels: vec![RGB8::default(); len],
            calls: Vec::new(),
            shown: vec![RGB8::default(); len],
            fail_next_clear: false,
            fail_next_refresh: false,
        }
    }

    pub fn set_pixel_calls(&self) -> Vec<(usize, RGB8)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                StripCall::SetPixel(i, color) => Some((*i, *color)),
                _ => None,
            })
            .collect()
    }

    pub fn lit_pixels(&self) -> usize {
        self.shown.iter().filter(|p| **p != RGB8::default()).count()
    }
}

impl LedStripDriver for MockStrip {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn clear(&mut self, timeout: Duration) -> Result<(), LedError> {
        self.calls.push(StripCall::Clear(timeout));
        if self.fail_next_clear {
            self.fail_next_clear = false;
            return Err(LedError::WriteFailed);
        }
        self.pixels.fill(RGB8::default());
        self.shown.fill(RGB8::default());
        Ok(())
    }

    fn set_pixel(&mut self, index: usize, color: RGB8) -> Result<(), LedError> {
        self.calls.push(StripCall::SetPixel(index, color));
        let pixel = self.pixels.get_mut(index).ok_or(LedError::IndexOutOfRange)?;
        *pixel = color;
        Ok(())
    }

    fn refresh(&mut self, timeout: Duration) -> Result<(), LedError> {
        self.calls.push(StripCall::Refresh(timeout));
        if self.fail_next_refresh {
            self.fail_next_refresh = false;
            return Err(LedError::Timeout);
        }
        self.shown.copy_from_slice(&self.pixels);
        Ok(())
    }
}

// ============================================================================
// Mock Publisher
// ============================================================================

#[derive(Default)]
pub struct MockPublisher {
    pub published: Vec<StatusMessage>,
    pub fail_next_publish: bool,
}

impl StatusPublisher for MockPublisher {
    fn publish(&mut self, msg: &StatusMessage) -> Result<(), PublishError> {
        if self.fail_next_publish {
            self.fail_next_publish = false;
            return Err(PublishError::QueueFull);
        }
        self.published.push(msg.clone());
        Ok(())
    }
}

// ============================================================================
// Mock Clock / Delay
// ============================================================================

/// Manuell vorgestellte Uhr; Klone teilen sich die Zeit
#[derive(Clone, Default)]
pub struct MockClock {
    now: Rc<Cell<u64>>,
    epoch_offset: i64,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epoch_offset(epoch_offset: i64) -> Self {
        Self {
            now: Rc::default(),
            epoch_offset,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.advance_nanos(d.as_nanos() as u64);
    }

    pub fn advance_nanos(&self, nanos: u64) {
        self.now.set(self.now.get() + nanos);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.now.get())
    }
}

impl Clock for MockClock {
    fn now_nanos(&self) -> u64 {
        self.now.get()
    }

    fn epoch_nanos(&self) -> i64 {
        self.epoch_offset + self.now.get() as i64
    }
}

/// Delay, der statt zu schlafen die MockClock vorstellt
pub struct MockDelay {
    clock: MockClock,
}

impl MockDelay {
    pub fn new(clock: MockClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_nanos(ns as u64);
    }
}

// ============================================================================
// Mock Kommando-Quelle
// ============================================================================

/// Kommando-Queue; Klone teilen sich die Queue
#[derive(Clone, Default)]
pub struct MockCommands {
    queue: Rc<RefCell<VecDeque<CommandMessage>>>,
}

impl MockCommands {
    pub fn push(&self, data: i32) {
        self.queue.borrow_mut().push_back(CommandMessage { data });
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl CommandSource for MockCommands {
    fn try_receive(&mut self) -> Option<CommandMessage> {
        self.queue.borrow_mut().pop_front()
    }
}

// ============================================================================
// Mock Parameter-Transport
// ============================================================================

/// Eigenständige Kopie einer Parameter-Antwort
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedResponse {
    Get {
        name: String,
        result: Result<ParameterValue, ParameterError>,
    },
    Set {
        name: String,
        result: Result<(), ParameterError>,
    },
    List(Vec<(String, ParameterValue)>),
}

/// Anfrage-Queue und Antwort-Log; Klone teilen sich beides
#[derive(Clone, Default)]
pub struct MockParameterTransport {
    requests: Rc<RefCell<VecDeque<ParameterRequest>>>,
    responses: Rc<RefCell<Vec<RecordedResponse>>>,
}

impl MockParameterTransport {
    pub fn request(&self, request: ParameterRequest) {
        self.requests.borrow_mut().push_back(request);
    }

    pub fn set(&self, name: &str, value: impl Into<ParameterValue>) {
        self.request(ParameterRequest::Set {
            name: name.try_into().unwrap(),
            value: value.into(),
        });
    }

    pub fn get(&self, name: &str) {
        self.request(ParameterRequest::Get {
            name: name.try_into().unwrap(),
        });
    }

    pub fn responses(&self) -> Vec<RecordedResponse> {
        self.responses.borrow().clone()
    }
}

impl ParameterTransport for MockParameterTransport {
    fn try_receive(&mut self) -> Option<ParameterRequest> {
        self.requests.borrow_mut().pop_front()
    }

    fn respond(&mut self, response: &ParameterResponse<'_>) -> Result<(), PublishError> {
        let recorded = match response {
            ParameterResponse::Get { name, result } => RecordedResponse::Get {
                name: name.to_string(),
                result: *result,
            },
            ParameterResponse::Set { name, result } => RecordedResponse::Set {
                name: name.to_string(),
                result: *result,
            },
            ParameterResponse::List { parameters } => RecordedResponse::List(
                parameters
                    .iter()
                    .map(|p| (p.name.to_string(), p.value))
                    .collect(),
            ),
        };
        self.responses.borrow_mut().push(recorded);
        Ok(())
    }
}

// ============================================================================
// Node-Fixture
// ============================================================================

pub type TestContext = NodeContext<MockStrip, MockPublisher, MockClock>;
pub type TestExecutor<'a> = NodeExecutor<'a, MockStrip, MockPublisher, MockClock, MockDelay>;

/// Epoch-Offset der Test-Uhr: 2023-11-14T22:13:20Z
pub const TEST_EPOCH_NANOS: i64 = 1_700_000_000_000_000_000;

pub fn test_context(clock: &MockClock) -> TestContext {
    NodeContext::new(MockStrip::new(8), MockPublisher::default(), clock.clone()).unwrap()
}
