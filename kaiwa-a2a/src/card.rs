//! The agent card served for A2A discovery.

use serde::{Deserialize, Serialize};

/// Self-description an agent publishes at `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCard {
    /// Agent name.
    pub name: String,
    /// What the agent does.
    pub description: String,
    /// Agent version string.
    pub version: String,
    /// Base URL where the agent's task API is reachable.
    pub url: String,
    /// Protocol capabilities.
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    /// What the agent can be asked to do.
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Create a card with no skills.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            url: url.into(),
            capabilities: AgentCapabilities::default(),
            skills: Vec::new(),
        }
    }

    /// Add a skill.
    #[must_use]
    pub fn skill(mut self, skill: AgentSkill) -> Self {
        self.skills.push(skill);
        self
    }
}

/// Protocol capabilities advertised on the card.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether the agent streams partial results.
    #[serde(default)]
    pub streaming: bool,
    /// Whether the agent pushes completion notifications.
    #[serde(default)]
    pub push_notifications: bool,
}

/// One advertised skill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSkill {
    /// Skill identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What the skill does.
    pub description: String,
}

impl AgentSkill {
    /// Create a skill.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_serde_shape() {
        let card = AgentCard::new("researcher", "Researches topics.", "http://localhost:8000")
            .skill(AgentSkill::new("research", "Research", "Dig into a topic."));

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["name"], "researcher");
        assert_eq!(value["capabilities"]["pushNotifications"], false);
        assert_eq!(value["skills"][0]["id"], "research");

        let back: AgentCard = serde_json::from_value(value).unwrap();
        assert_eq!(back.skills.len(), 1);
    }

    #[test]
    fn card_tolerates_minimal_json() {
        let card: AgentCard = serde_json::from_str(
            r#"{"name": "a", "description": "b", "version": "1.0", "url": "http://x"}"#,
        )
        .unwrap();
        assert!(card.skills.is_empty());
        assert!(!card.capabilities.streaming);
    }
}
