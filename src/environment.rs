//! Environment: peer lookup for supervisor delegation and the hook point
//! where MCP-derived tools would be registered as ordinary [`Tool`]s.
//!
//! Grounded on the base crate's `Arc<Tool>` ownership convention in
//! `types.rs`/`tools.rs`, applied here to agents instead of tools.

use crate::actor::Agent;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Peer lookup shared by every agent in a deployment: `GetAgent`, `Agents`,
/// `Name`, `AddAgent`.
#[async_trait]
pub trait Environment: Send + Sync {
    fn name(&self) -> &str;
    async fn get_agent(&self, name: &str) -> Option<Arc<Agent>>;
    async fn agents(&self) -> Vec<Arc<Agent>>;
    async fn add_agent(&self, agent: Arc<Agent>) -> Result<()>;
}

/// In-process environment: a named registry of agents, keyed by their
/// unique name.
pub struct LocalEnvironment {
    name: String,
    agents: RwLock<HashMap<String, Arc<Agent>>>,
}

impl LocalEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agents: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Environment for LocalEnvironment {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_agent(&self, name: &str) -> Option<Arc<Agent>> {
        self.agents.read().await.get(name).cloned()
    }

    async fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.read().await.values().cloned().collect()
    }

    async fn add_agent(&self, agent: Arc<Agent>) -> Result<()> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(agent.name()) {
            return Err(Error::config(format!(
                "agent '{}' is already registered in environment '{}'",
                agent.name(),
                self.name
            )));
        }
        agents.insert(agent.name().to_string(), agent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::test_support::stub_agent;

    #[tokio::test]
    async fn add_and_lookup_round_trips() {
        let env = LocalEnvironment::new("team");
        env.add_agent(stub_agent("researcher")).await.unwrap();
        assert!(env.get_agent("researcher").await.is_some());
        assert!(env.get_agent("writer").await.is_none());
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let env = LocalEnvironment::new("team");
        env.add_agent(stub_agent("researcher")).await.unwrap();
        let err = env.add_agent(stub_agent("researcher")).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn agents_lists_every_registered_peer() {
        let env = LocalEnvironment::new("team");
        env.add_agent(stub_agent("a")).await.unwrap();
        env.add_agent(stub_agent("b")).await.unwrap();
        assert_eq!(env.agents().await.len(), 2);
    }
}
