//! Administrative commands
//!
//! A small command channel served by the leader body. The console (or any
//! RPC front end) holds an [`AdminHandle`]; the handle answers `help`
//! itself and refuses everything else while this process is a candidate.

use crate::use_cases::election_role::RoleReader;
use crate::use_cases::query_state::{EnsembleView, StateQuery};
use blacknight_domain::ObservedState;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Commands accepted by the leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Help,
    Query,
    Ensemble,
    Fail,
}

impl AdminCommand {
    pub const ALL: [AdminCommand; 4] = [
        AdminCommand::Help,
        AdminCommand::Fail,
        AdminCommand::Query,
        AdminCommand::Ensemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminCommand::Help => "help",
            AdminCommand::Query => "query",
            AdminCommand::Ensemble => "ensemble",
            AdminCommand::Fail => "fail",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AdminCommand::Help => "this message",
            AdminCommand::Query => "print current deployment state",
            AdminCommand::Ensemble => "print live ensemble members and their tags",
            AdminCommand::Fail => "step down and rejoin the election (simulate failover)",
        }
    }

    /// True for commands the leader must serve
    pub fn needs_leader(&self) -> bool {
        !matches!(self, AdminCommand::Help)
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminCommand {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "help" | "?" => Ok(AdminCommand::Help),
            "query" => Ok(AdminCommand::Query),
            "ensemble" => Ok(AdminCommand::Ensemble),
            "fail" => Ok(AdminCommand::Fail),
            other => Err(AdminError::UnknownCommand(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    #[error("Unknown command: {0} (try 'help')")]
    UnknownCommand(String),

    #[error("not the leader")]
    NotLeader,

    #[error("Leader is no longer accepting commands")]
    Unavailable,
}

/// Reply to an administrative command
#[derive(Debug, Clone, PartialEq)]
pub enum AdminResponse {
    /// `(command, description)` pairs
    Help(Vec<(&'static str, &'static str)>),
    State(ObservedState),
    Ensemble(EnsembleView),
    /// The leader is stepping down
    SteppingDown,
    /// The command was accepted but could not be answered
    Error(String),
}

impl AdminResponse {
    pub fn help() -> Self {
        AdminResponse::Help(
            AdminCommand::ALL
                .iter()
                .map(|c| (c.as_str(), c.description()))
                .collect(),
        )
    }
}

/// A command in flight to the leader body
#[derive(Debug)]
pub struct AdminRequest {
    pub command: AdminCommand,
    pub reply: oneshot::Sender<AdminResponse>,
}

/// Client side of the command channel
#[derive(Clone)]
pub struct AdminHandle {
    tx: mpsc::Sender<AdminRequest>,
    role: RoleReader,
}

impl AdminHandle {
    pub fn new(tx: mpsc::Sender<AdminRequest>, role: RoleReader) -> Self {
        Self { tx, role }
    }

    pub fn role(&self) -> &RoleReader {
        &self.role
    }

    pub async fn send(&self, command: AdminCommand) -> Result<AdminResponse, AdminError> {
        if !command.needs_leader() {
            return Ok(AdminResponse::help());
        }
        if !self.role.is_leader() {
            return Err(AdminError::NotLeader);
        }

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AdminRequest { command, reply })
            .await
            .map_err(|_| AdminError::Unavailable)?;
        // Leadership can end between the role check and the leader body
        // picking the request up; the dropped sender covers that case.
        rx.await.map_err(|_| AdminError::NotLeader)
    }
}

/// Answer a read-only command from a fresh store read
pub(crate) async fn answer(command: AdminCommand, query: &StateQuery) -> AdminResponse {
    debug!(command = %command, "Serving admin command");
    match command {
        AdminCommand::Help => AdminResponse::help(),
        AdminCommand::Fail => AdminResponse::SteppingDown,
        AdminCommand::Query => match query.query().await {
            Ok(state) => AdminResponse::State(state),
            Err(e) => AdminResponse::Error(e.to_string()),
        },
        AdminCommand::Ensemble => match query.ensemble_view().await {
            Ok(view) => AdminResponse::Ensemble(view),
            Err(e) => AdminResponse::Error(e.to_string()),
        },
    }
}
