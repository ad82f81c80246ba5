//! Application layer for blacknight
//!
//! This crate contains the election-driven control loop: ports for the
//! coordination service and the service controller, persistent watches with
//! debouncing, and the use cases that query, diff and remediate.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;
pub mod watch;

// Re-export commonly used types
pub use config::{NodeIdentity, ReconcileParams};
pub use ports::{
    action_journal::{ActionJournal, JournalEvent, NoActionJournal},
    coordination::{ChildrenWatch, CoordinationStore, Leadership, LockGuard, StoreError, WatchEvent},
    service_controller::{ActionError, ServiceController},
};
pub use use_cases::admin::{AdminCommand, AdminError, AdminHandle, AdminRequest, AdminResponse};
pub use use_cases::apply_actions::{ActionExecutor, ApplyError, ApplyReport, ReconfigOutcome};
pub use use_cases::election_controller::{ElectionController, ElectionError};
pub use use_cases::election_role::{ElectionRole, RoleReader};
pub use use_cases::ensemble_monitor::EnsembleMonitor;
pub use use_cases::load_spec::{SpecificationError, load_specification};
pub use use_cases::membership_watcher::MembershipWatcher;
pub use use_cases::query_state::{EnsembleView, StateQuery};
pub use use_cases::reconcile::ReconcileUseCase;
pub use watch::{Debouncer, PersistentWatch, Settled, SubtreeWatch, WatchNotification};
