//! Identity of this process within the deployment.

use blacknight_domain::Role;

/// What this process registers in the coordination store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    /// Coordination-server address, registered under `/ensemble`
    pub id: String,
    /// Registration data stored on the ensemble node (space-separated tags)
    pub tags: String,
    /// Roles this process serves, registered under `/services/<role>`
    pub services: Vec<Role>,
}

impl NodeIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tags: String::new(),
            services: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn with_service(mut self, role: Role) -> Self {
        self.services.push(role);
        self
    }
}
