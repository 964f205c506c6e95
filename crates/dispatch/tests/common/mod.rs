#![allow(dead_code)]

//! In-memory remote connections with scripted outcomes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dispatch::{
    ConnectError, ConnectionParams, FallbackExecutor, RemoteConnection, RemoteConnector,
    RemoteDiagnostics, RemoteOutcome, SendError,
};
use parking_lot::Mutex;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(usize),
    Send(String),
    Await(String),
    Close(usize),
    Fallback(String),
}

#[derive(Debug)]
enum Script {
    Outcome(RemoteOutcome),
    Gate(oneshot::Receiver<RemoteOutcome>),
    SendFails,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    scripts: HashMap<String, Script>,
    fail_next_open: Option<String>,
    next_conn: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    state: Arc<Mutex<State>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome for a statement. Unscripted statements succeed.
    pub fn set_outcome(&self, statement: &str, outcome: RemoteOutcome) {
        self.state
            .lock()
            .scripts
            .insert(statement.to_string(), Script::Outcome(outcome));
    }

    /// The statement only completes once the returned sender fires.
    pub fn gate(&self, statement: &str) -> oneshot::Sender<RemoteOutcome> {
        let (tx, rx) = oneshot::channel();
        self.state
            .lock()
            .scripts
            .insert(statement.to_string(), Script::Gate(rx));
        tx
    }

    pub fn fail_send(&self, statement: &str) {
        self.state
            .lock()
            .scripts
            .insert(statement.to_string(), Script::SendFails);
    }

    pub fn fail_next_open(&self, message: &str) {
        self.state.lock().fail_next_open = Some(message.to_string());
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn record(&self, event: Event) {
        self.state.lock().events.push(event);
    }

    pub fn opened(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, Event::Open(_)))
            .count()
    }

    /// Position of an event in the log.
    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Assert that every opened connection was closed exactly once.
    pub fn assert_all_closed_once(&self) {
        let events = self.events();
        let opened: HashSet<usize> = events
            .iter()
            .filter_map(|e| match e {
                Event::Open(id) => Some(*id),
                _ => None,
            })
            .collect();
        let closed: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                Event::Close(id) => Some(*id),
                _ => None,
            })
            .collect();

        assert_eq!(opened.len(), closed.len(), "events: {events:?}");
        assert_eq!(opened, closed.into_iter().collect::<HashSet<_>>());
    }
}

#[async_trait]
impl RemoteConnector for ScriptedConnector {
    type Connection = ScriptedConnection;

    async fn open(&self, _params: &ConnectionParams) -> Result<ScriptedConnection, ConnectError> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next_open.take() {
            return Err(ConnectError::new(message));
        }
        let id = state.next_conn;
        state.next_conn += 1;
        state.events.push(Event::Open(id));

        Ok(ScriptedConnection {
            id,
            state: self.state.clone(),
            statement: None,
            pending: None,
        })
    }
}

#[derive(Debug)]
pub struct ScriptedConnection {
    id: usize,
    state: Arc<Mutex<State>>,
    statement: Option<String>,
    pending: Option<Script>,
}

#[async_trait]
impl RemoteConnection for ScriptedConnection {
    fn send(&mut self, statement: &str) -> Result<(), SendError> {
        let mut state = self.state.lock();
        state.events.push(Event::Send(statement.to_string()));
        let script = state
            .scripts
            .remove(statement)
            .unwrap_or(Script::Outcome(RemoteOutcome::Ok));
        if let Script::SendFails = script {
            return Err(SendError::new("another command is already in progress"));
        }
        self.statement = Some(statement.to_string());
        self.pending = Some(script);
        Ok(())
    }

    async fn await_result(&mut self) -> RemoteOutcome {
        let statement = self.statement.clone().expect("statement to have been sent");
        self.state.lock().events.push(Event::Await(statement));

        match self.pending.take() {
            Some(Script::Outcome(outcome)) => outcome,
            Some(Script::Gate(rx)) => rx
                .await
                .unwrap_or_else(|_| RemoteOutcome::Failed(RemoteDiagnostics::default())),
            Some(Script::SendFails) | None => panic!("await without a successful send"),
        }
    }

    fn close(self) {
        self.state.lock().events.push(Event::Close(self.id));
    }
}

pub fn failure(code: &str, message: &str) -> RemoteOutcome {
    RemoteOutcome::Failed(RemoteDiagnostics {
        code: Some(code.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    })
}

/// Fallback that records into the connector's event log.
#[derive(Debug)]
pub struct RecordingFallback {
    connector: ScriptedConnector,
    fail: HashSet<String>,
}

impl RecordingFallback {
    pub fn new(connector: &ScriptedConnector) -> Self {
        RecordingFallback {
            connector: connector.clone(),
            fail: HashSet::new(),
        }
    }

    pub fn fail_on(&mut self, statement: &str) {
        self.fail.insert(statement.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.connector
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Fallback(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl FallbackExecutor for RecordingFallback {
    async fn execute(&mut self, statement: &str) -> dispatch::Result<()> {
        self.connector.record(Event::Fallback(statement.to_string()));
        if self.fail.contains(statement) {
            return Err(dispatch::DispatchError::Fallback(
                format!("local execution of '{statement}' failed").into(),
            ));
        }
        Ok(())
    }
}
