//! In-memory gateway with canned response bodies, mirroring the fixture
//! mocks the backend team publishes for the Allegro services.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::gateway::{AllegroGateway, Args, GatewayError, Operation, SessionId};

pub(crate) struct RecordedCall {
    pub operation: Operation,
    pub session: Option<String>,
    pub args: Args,
}

#[derive(Default)]
pub(crate) struct MockGateway {
    responses: HashMap<Operation, Value>,
    failing: HashSet<Operation>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, operation: Operation, body: Value) -> Self {
        self.responses.insert(operation, body);
        self
    }

    /// Simulates a transport failure (timeout, connection refused) for one
    /// operation while everything else keeps working.
    pub fn with_failure(mut self, operation: Operation) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn with_login_ok(self) -> Self {
        self.with_response(
            Operation::LoginTijdelijk,
            json!({
                "Result": true,
                "aUserInfo": { "SessionID": "{43B7DD35-848E-4F52-B90A-6D2E4071D9C6}" }
            }),
        )
    }

    pub fn args_for(&self, operation: Operation) -> Vec<Args> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .filter(|call| call.operation == operation)
            .map(|call| call.args.clone())
            .collect()
    }

    pub fn sessions_seen(&self, operation: Operation) -> Vec<Option<String>> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .iter()
            .filter(|call| call.operation == operation)
            .map(|call| call.session.clone())
            .collect()
    }

    pub fn call_count(&self, operation: Operation) -> usize {
        self.args_for(operation).len()
    }
}

#[async_trait]
impl AllegroGateway for MockGateway {
    async fn call(
        &self,
        operation: Operation,
        session: Option<&SessionId>,
        args: Args,
    ) -> Result<Value, GatewayError> {
        self.calls
            .lock()
            .expect("call log mutex poisoned")
            .push(RecordedCall {
                operation,
                session: session.map(|id| id.as_str().to_string()),
                args,
            });

        if self.failing.contains(&operation) {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }

        self.responses
            .get(&operation)
            .cloned()
            .ok_or_else(|| GatewayError::Transport(format!("no fixture for {operation}")))
    }
}
