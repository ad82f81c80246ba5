//! Application-level configuration.
//!
//! - [`ReconcileParams`]: settle windows and retry policy of the control loop
//! - [`NodeIdentity`]: who this process is and what it registers

pub mod node;
pub mod reconcile_params;

pub use node::NodeIdentity;
pub use reconcile_params::ReconcileParams;
