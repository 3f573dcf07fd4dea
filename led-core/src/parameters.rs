//! Parameter-Store und Parameter-Server
//!
//! Der Store hält eine feste Menge typisierter, benannter Werte. Registriert
//! wird nur beim Start; sobald der Executor läuft, ist der Store gesperrt.
//! Jeder erfolgreiche `set()` reiht eine Änderungs-Benachrichtigung ein,
//! auch wenn sich der Wert nicht geändert hat.

use core::fmt;

use heapless::{Deque, String, Vec};

use crate::traits::ParameterTransport;
use crate::types::{ParameterType, ParameterValue};

/// Maximale Anzahl registrierter Parameter
pub const MAX_PARAMETERS: usize = 5;

/// Maximale Länge eines Parameter-Namens in Bytes
pub const MAX_NAME_LEN: usize = 32;

/// Tiefe der Änderungs-Queue
pub const CHANGE_QUEUE_DEPTH: usize = 8;

/// Parameter-Name in Remote-Anfragen
pub type ParameterName = String<MAX_NAME_LEN>;

/// Fehler-Typ für Parameter-Zugriffe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParameterError {
    /// Kein Parameter mit diesem Namen registriert
    UnknownName,
    /// Gespeicherter Typ passt nicht zum angefragten Typ
    TypeMismatch {
        expected: ParameterType,
        actual: ParameterType,
    },
    /// Name ist bereits registriert
    AlreadyRegistered,
    /// Registrierung nach Start des Executors
    Locked,
    /// Alle Plätze belegt
    Full,
    /// Name länger als `MAX_NAME_LEN`
    NameTooLong,
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterError::UnknownName => f.write_str("unknown parameter"),
            ParameterError::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch (expected {}, stored {})", expected, actual)
            }
            ParameterError::AlreadyRegistered => f.write_str("parameter already registered"),
            ParameterError::Locked => f.write_str("parameter store locked"),
            ParameterError::Full => f.write_str("parameter store full"),
            ParameterError::NameTooLong => f.write_str("parameter name too long"),
        }
    }
}

/// Ein registrierter Parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub value: ParameterValue,
}

// ============================================================================
// ParameterStore
// ============================================================================

#[derive(Debug, Default)]
pub struct ParameterStore {
    parameters: Vec<Parameter, MAX_PARAMETERS>,
    changes: Deque<usize, CHANGE_QUEUE_DEPTH>,
    locked: bool,
}

impl ParameterStore {
    pub const fn new() -> Self {
        Self {
            parameters: Vec::new(),
            changes: Deque::new(),
            locked: false,
        }
    }

    /// Registriert einen Parameter mit Default-Wert
    ///
    /// Registrieren löst keine Änderungs-Benachrichtigung aus.
    pub fn register(
        &mut self,
        name: &'static str,
        default: impl Into<ParameterValue>,
    ) -> Result<(), ParameterError> {
        if self.locked {
            return Err(ParameterError::Locked);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ParameterError::NameTooLong);
        }
        if self.index_of(name).is_some() {
            return Err(ParameterError::AlreadyRegistered);
        }
        self.parameters
            .push(Parameter {
                name,
                value: default.into(),
            })
            .map_err(|_| ParameterError::Full)
    }

    /// Sperrt weitere Registrierungen (beim Start des Executors)
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn get(&self, name: &str) -> Result<ParameterValue, ParameterError> {
        self.index_of(name)
            .map(|i| self.parameters[i].value)
            .ok_or(ParameterError::UnknownName)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, ParameterError> {
        match self.get(name)? {
            ParameterValue::Bool(v) => Ok(v),
            other => Err(mismatch(ParameterType::Bool, other)),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64, ParameterError> {
        match self.get(name)? {
            ParameterValue::Integer(v) => Ok(v),
            other => Err(mismatch(ParameterType::Integer, other)),
        }
    }

    pub fn get_double(&self, name: &str) -> Result<f64, ParameterError> {
        match self.get(name)? {
            ParameterValue::Double(v) => Ok(v),
            other => Err(mismatch(ParameterType::Double, other)),
        }
    }

    /// Überschreibt einen Wert und reiht eine Benachrichtigung ein
    ///
    /// Der Typ eines Parameters ist fest. Ist die Queue voll, wird die
    /// Benachrichtigung verworfen: eine bereits wartende Benachrichtigung
    /// führt ohnehin zu einem vollständigen Neu-Lesen aller Parameter.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<ParameterValue>,
    ) -> Result<(), ParameterError> {
        let value = value.into();
        let index = self.index_of(name).ok_or(ParameterError::UnknownName)?;
        let slot = &mut self.parameters[index];
        if slot.value.kind() != value.kind() {
            return Err(mismatch(value.kind(), slot.value));
        }
        slot.value = value;
        let _ = self.changes.push_back(index);
        Ok(())
    }

    /// Alle Parameter in Registrierungs-Reihenfolge
    pub fn list(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Anzahl wartender Änderungs-Benachrichtigungen
    pub fn pending_changes(&self) -> usize {
        self.changes.len()
    }

    /// Nächste Änderungs-Benachrichtigung (Name des Parameters)
    pub fn take_change(&mut self) -> Option<&'static str> {
        self.changes
            .pop_front()
            .map(|index| self.parameters[index].name)
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }
}

fn mismatch(expected: ParameterType, actual: ParameterValue) -> ParameterError {
    ParameterError::TypeMismatch {
        expected,
        actual: actual.kind(),
    }
}

// ============================================================================
// Standard-Parameter des LED-Nodes
// ============================================================================

pub const PARAM_TOGGLE: &str = "toggle";
pub const PARAM_NUMBER: &str = "number";
pub const PARAM_RED: &str = "red";
pub const PARAM_GREEN: &str = "green";
pub const PARAM_BLUE: &str = "blue";

/// Registriert die fünf Parameter des LED-Nodes mit ihren Defaults
pub fn register_led_parameters(store: &mut ParameterStore) -> Result<(), ParameterError> {
    store.register(PARAM_TOGGLE, false)?;
    store.register(PARAM_NUMBER, 8i64)?;
    store.register(PARAM_RED, 1.0)?;
    store.register(PARAM_GREEN, 0.0)?;
    store.register(PARAM_BLUE, 0.0)?;
    Ok(())
}

// ============================================================================
// ParameterServer
// ============================================================================

/// Remote-Anfrage an den Parameter-Server
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterRequest {
    Get { name: ParameterName },
    Set { name: ParameterName, value: ParameterValue },
    List,
}

/// Antwort des Parameter-Servers
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterResponse<'a> {
    Get {
        name: &'a str,
        result: Result<ParameterValue, ParameterError>,
    },
    Set {
        name: &'a str,
        result: Result<(), ParameterError>,
    },
    List {
        parameters: &'a [Parameter],
    },
}

/// Store plus Bearbeitung von Remote-Anfragen
///
/// Pro Executor-Iteration wird höchstens eine Anfrage gepuffert und
/// beantwortet.
#[derive(Debug, Default)]
pub struct ParameterServer {
    store: ParameterStore,
    pending_request: Option<ParameterRequest>,
}

impl ParameterServer {
    pub const fn new(store: ParameterStore) -> Self {
        Self {
            store,
            pending_request: None,
        }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    /// Puffert die nächste Anfrage vom Transport und meldet Bereitschaft
    pub fn poll(&mut self, transport: &mut dyn ParameterTransport) -> bool {
        if self.pending_request.is_none() {
            self.pending_request = transport.try_receive();
        }
        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.pending_request.is_some() || self.store.has_pending_changes()
    }

    /// Beantwortet die gepufferte Anfrage (falls vorhanden)
    pub fn serve_pending(&mut self, transport: &mut dyn ParameterTransport) {
        let Some(request) = self.pending_request.take() else {
            return;
        };

        let response = match &request {
            ParameterRequest::Get { name } => ParameterResponse::Get {
                name: name.as_str(),
                result: self.store.get(name),
            },
            ParameterRequest::Set { name, value } => {
                let result = self.store.set(name, *value);
                if let Err(e) = result {
                    warn!("Parameter: set '{}' rejected: {}", name.as_str(), e);
                }
                ParameterResponse::Set {
                    name: name.as_str(),
                    result,
                }
            }
            ParameterRequest::List => ParameterResponse::List {
                parameters: self.store.list(),
            },
        };

        if let Err(e) = transport.respond(&response) {
            warn!("Parameter: response dropped: {}", e);
        }
    }
}
