//! Session lifecycle
//!
//! One [`Session`] per connection. It only changes on handshake messages:
//!
//! ```text
//! Uninitialized --initialize--> Initializing --notifications/initialized--> Ready
//!        \______________________________\__________________________________\--> Closed
//! ```

use std::fmt;

use serde_json::Value;
use tracing::{info, warn};

use crate::protocol::messages::{
    Implementation, InitializeRequest, InitializeResult, ServerCapabilities, ToolsCapability,
};
use crate::protocol::types::{JsonRpcError, MCP_VERSION, SUPPORTED_PROTOCOL_VERSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lifecycle violations. None of them change the session state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Method '{method}' is not allowed while the session is {state}")]
    OutOfOrder { method: String, state: SessionState },
    #[error("Server already initialized")]
    AlreadyInitialized,
    #[error("Invalid initialize params: {0}")]
    InvalidInitialize(String),
}

impl From<SessionError> for JsonRpcError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidInitialize(_) => JsonRpcError::invalid_params(&err.to_string()),
            SessionError::OutOfOrder { .. } | SessionError::AlreadyInitialized => {
                JsonRpcError::invalid_state(&err.to_string())
            }
        }
    }
}

/// Pick the protocol version to answer with: the client's own when we
/// support it, otherwise our latest.
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .copied()
        .find(|supported| *supported == requested)
        .unwrap_or(MCP_VERSION)
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    protocol_version: Option<String>,
    client_info: Option<Implementation>,
    server_info: Implementation,
    instructions: Option<String>,
}

impl Session {
    pub fn new(server_info: Implementation) -> Self {
        Self {
            state: SessionState::Uninitialized,
            protocol_version: None,
            client_info: None,
            server_info,
            instructions: None,
        }
    }

    /// Text sent to the client in the initialize result
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Negotiated version, once `initialize` has been accepted
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    pub fn client_info(&self) -> Option<&Implementation> {
        self.client_info.as_ref()
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Handle the `initialize` request. Valid only while uninitialized.
    pub fn begin_initialize(&mut self, params: Option<Value>) -> Result<InitializeResult, SessionError> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Closed => {
                return Err(SessionError::OutOfOrder {
                    method: "initialize".to_string(),
                    state: self.state,
                });
            }
            SessionState::Initializing | SessionState::Ready => {
                warn!("Rejecting repeated initialize (session is {})", self.state);
                return Err(SessionError::AlreadyInitialized);
            }
        }

        let params = params.ok_or_else(|| SessionError::InvalidInitialize("missing params".to_string()))?;
        let request: InitializeRequest = serde_json::from_value(params)
            .map_err(|e| SessionError::InvalidInitialize(e.to_string()))?;

        let negotiated = negotiate_version(&request.protocol_version);
        if negotiated != request.protocol_version {
            info!(
                "Client requested unsupported protocol version {}, offering {}",
                request.protocol_version, negotiated
            );
        }
        info!(
            client = %request.client_info.name,
            client_version = %request.client_info.version,
            "MCP session initializing with protocol version {}",
            negotiated
        );

        self.protocol_version = Some(negotiated.to_string());
        self.client_info = Some(request.client_info);
        self.state = SessionState::Initializing;

        Ok(InitializeResult {
            protocol_version: negotiated.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        })
    }

    /// Handle `notifications/initialized`. Returns whether the session moved
    /// to `Ready`; outside `Initializing` the notification is ignored.
    pub fn on_initialized(&mut self) -> bool {
        if self.state != SessionState::Initializing {
            warn!("Ignoring notifications/initialized while session is {}", self.state);
            return false;
        }
        self.state = SessionState::Ready;
        info!("MCP session ready");
        true
    }

    /// Gate for tool and other post-handshake methods
    pub fn require_ready(&self, method: &str) -> Result<(), SessionError> {
        if self.state == SessionState::Ready {
            return Ok(());
        }
        Err(SessionError::OutOfOrder {
            method: method.to_string(),
            state: self.state,
        })
    }

    /// `ping` is answered once the handshake has started
    pub fn require_handshake_started(&self, method: &str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Initializing | SessionState::Ready => Ok(()),
            state => Err(SessionError::OutOfOrder {
                method: method.to_string(),
                state,
            }),
        }
    }

    /// Terminal; every state may close
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            info!("MCP session closed (was {})", self.state);
            self.state = SessionState::Closed;
        }
    }
}
