//! State query use case
//!
//! Reads the full observed state from the coordination store on demand.
//! A missing `/services` or `/args` subtree is an empty mapping, which is
//! what a freshly bootstrapped deployment looks like.

use crate::ports::coordination::{CoordinationStore, StoreError};
use blacknight_domain::{Ensemble, MemberId, ObservedState, Role, StorePaths};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ensemble member address → registration tags
pub type EnsembleView = BTreeMap<String, Vec<String>>;

/// Reads snapshots of the deployment
#[derive(Clone)]
pub struct StateQuery {
    store: Arc<dyn CoordinationStore>,
    paths: StorePaths,
}

impl StateQuery {
    pub fn new(store: Arc<dyn CoordinationStore>, paths: StorePaths) -> Self {
        Self { store, paths }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Build a fresh [`ObservedState`] snapshot
    pub async fn query(&self) -> Result<ObservedState, StoreError> {
        let mut state = ObservedState::new();

        for name in self.children_or_empty(&self.paths.services()).await? {
            let role = match Role::parse(name.as_str()) {
                Ok(role) => role,
                Err(e) => {
                    warn!(role = %name, error = %e, "Skipping unparseable role");
                    continue;
                }
            };
            let members = self.children_or_empty(&self.paths.service_role(&role)).await?;
            let roster = state.services.entry(role).or_default();
            for member in members {
                match MemberId::parse(member.as_str()) {
                    Ok(id) => {
                        roster.insert(id);
                    }
                    Err(e) => warn!(member = %member, error = %e, "Skipping unparseable member"),
                }
            }
        }

        for key in self.children_or_empty(&self.paths.args()).await? {
            match self.store.read(&self.paths.arg(&key)).await {
                Ok(value) => {
                    state
                        .args
                        .insert(key, String::from_utf8_lossy(&value).into_owned());
                }
                Err(e) if e.is_not_found() => {
                    debug!(key = %key, "Argument removed while querying");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(state)
    }

    /// Current quorum members
    pub async fn ensemble(&self) -> Result<Ensemble, StoreError> {
        let children = self.children_or_empty(&self.paths.ensemble()).await?;
        Ok(Ensemble::from_children(children))
    }

    /// Quorum members with the tags each registered
    pub async fn ensemble_view(&self) -> Result<EnsembleView, StoreError> {
        let mut view = EnsembleView::new();
        for address in self.children_or_empty(&self.paths.ensemble()).await? {
            let tags = match self.store.read(&self.paths.ensemble_member(&address)).await {
                Ok(data) => String::from_utf8_lossy(&data)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            view.insert(address, tags);
        }
        Ok(view)
    }

    async fn children_or_empty(&self, path: &str) -> Result<Vec<String>, StoreError> {
        match self.store.children(path).await {
            Ok(children) => Ok(children),
            Err(e) if e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::StubStore;

    fn query(store: StubStore) -> StateQuery {
        StateQuery::new(Arc::new(store), StorePaths::new("/bk"))
    }

    #[tokio::test]
    async fn test_empty_deployment_is_empty_state() {
        let state = query(StubStore::new()).query().await.unwrap();
        assert_eq!(state, ObservedState::new());
    }

    #[tokio::test]
    async fn test_reads_roles_members_and_args() {
        let store = StubStore::new()
            .with_node("/bk/services/nc/a", "")
            .with_node("/bk/services/nc/b", "")
            .with_node("/bk/services/head/h", "")
            .with_node("/bk/args/cloud", "euca");

        let state = query(store).query().await.unwrap();
        let nc = Role::parse("nc").unwrap();
        assert_eq!(state.member_count(&nc), 2);
        assert_eq!(state.member_count(&Role::parse("head").unwrap()), 1);
        assert_eq!(state.args.get("cloud").map(String::as_str), Some("euca"));
    }

    #[tokio::test]
    async fn test_role_without_members_is_listed_empty() {
        let store = StubStore::new().with_node("/bk/services/nc", "");
        let state = query(store).query().await.unwrap();
        assert_eq!(state.services.len(), 1);
        assert_eq!(state.member_count(&Role::parse("nc").unwrap()), 0);
    }

    #[tokio::test]
    async fn test_ensemble_view_splits_tags() {
        let store = StubStore::new()
            .with_node("/bk/ensemble/localhost:2181", "primary_head")
            .with_node("/bk/ensemble/localhost:2183", "nc hadoop hadoop");

        let q = query(store);
        let view = q.ensemble_view().await.unwrap();
        assert_eq!(view["localhost:2183"], vec!["nc", "hadoop", "hadoop"]);
        assert_eq!(
            q.ensemble().await.unwrap().to_server_list(),
            "localhost:2181,localhost:2183"
        );
    }
}
