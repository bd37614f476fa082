//! Intent classification and routing.
//!
//! A front-desk layer for multi-agent applications: one cheap model call
//! classifies the user's message into a named intent, and the
//! [`IntentRouter`] hands the message to the agent registered for that
//! intent. Low-confidence classifications get a fixed clarification reply
//! instead of a guess.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::{Agent, RunConfig, Runner};
use crate::error::Result;
use crate::provider::{CompletionProvider, ConverseRequest};
use crate::conversation::Message;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DEFAULT_FALLBACK_REPLY: &str =
    "I'm not quite sure what you need. Could you rephrase your question or provide more details?";
const GENERAL_INTENT: &str = "general";

/// One intent the classifier may choose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentCategory {
    /// Intent name, unique within a router.
    pub name: String,
    /// What kinds of messages belong to this intent.
    pub description: String,
}

impl IntentCategory {
    /// Create a category.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The classifier's verdict for one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    /// The chosen intent name.
    pub intent: String,
    /// How clearly the message matched, 0.0 to 1.0.
    pub confidence: f32,
    /// Entities the classifier extracted (amounts, names, ...).
    #[serde(default)]
    pub entities: Value,
}

impl Classification {
    /// The degraded verdict used when the classifier's reply cannot be
    /// parsed: route to the general handler at middling confidence rather
    /// than fail the request.
    #[must_use]
    pub fn general() -> Self {
        Self {
            intent: GENERAL_INTENT.to_string(),
            confidence: 0.5,
            entities: Value::Object(serde_json::Map::new()),
        }
    }
}

/// A routed message's outcome.
#[derive(Debug, Clone)]
pub struct RoutedReply {
    /// The classification that drove the routing decision.
    pub classification: Classification,
    /// The reply text, from the handler agent or the fallback.
    pub text: String,
}

/// Routes messages to handler agents based on classified intent.
///
/// ```rust,ignore
/// let router = IntentRouter::new()
///     .category(IntentCategory::new("faq", "Questions about services, hours, policies"))
///     .category(IntentCategory::new("payment_help", "Transfers, payments, direct debits"))
///     .handler("faq", faq_agent)
///     .handler("payment_help", payment_agent)
///     .default_handler(general_agent);
///
/// let reply = router.route(&provider, "What are your opening hours?").await?;
/// ```
#[derive(Debug, Default)]
pub struct IntentRouter {
    categories: Vec<IntentCategory>,
    handlers: HashMap<String, Agent>,
    default_handler: Option<Agent>,
    confidence_threshold: f32,
    fallback_reply: String,
}

impl IntentRouter {
    /// Create a router with no categories or handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            ..Self::default()
        }
    }

    /// Add an intent category the classifier may choose.
    #[must_use]
    pub fn category(mut self, category: IntentCategory) -> Self {
        self.categories.push(category);
        self
    }

    /// Register the agent that handles an intent.
    #[must_use]
    pub fn handler(mut self, intent: impl Into<String>, agent: Agent) -> Self {
        self.handlers.insert(intent.into(), agent);
        self
    }

    /// Register the agent used when no handler matches the intent.
    #[must_use]
    pub fn default_handler(mut self, agent: Agent) -> Self {
        self.default_handler = Some(agent);
        self
    }

    /// Set the minimum confidence below which the router replies with the
    /// fallback text instead of invoking a handler.
    #[must_use]
    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the reply used for low-confidence classifications.
    #[must_use]
    pub fn fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    /// The classifier system prompt generated from the registered
    /// categories.
    #[must_use]
    pub fn classifier_prompt(&self) -> String {
        let mut intents = String::new();
        for category in &self.categories {
            intents.push_str(&format!("- {}: {}\n", category.name, category.description));
        }

        format!(
            "You are an intent classifier.\n\n\
             Available intents:\n{intents}\n\
             Analyze the user message and respond with ONLY a JSON object:\n\
             {{\"intent\": \"one of the intent names above\", \"confidence\": 0.0 to 1.0, \"entities\": {{}}}}\n\n\
             Rules:\n\
             - Choose the most specific intent that matches\n\
             - Set confidence based on how clearly the message matches\n\
             - Extract relevant entities (amounts, account types, etc.)"
        )
    }

    /// Classify a message with one completion call.
    ///
    /// A reply that carries no parseable JSON object degrades to
    /// [`Classification::general`] rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Provider`] when the completion call itself
    /// fails.
    pub async fn classify(
        &self,
        provider: &dyn CompletionProvider,
        message: &str,
    ) -> Result<Classification> {
        let request = ConverseRequest::new(vec![Message::user(message)])
            .system(self.classifier_prompt());
        let response = provider.converse(&request).await?;
        let text = response.message.text();

        let classification = extract_json_object(&text)
            .and_then(|json| serde_json::from_str::<Classification>(json).ok())
            .unwrap_or_else(|| {
                warn!(reply = %text, "classifier reply was not parseable, degrading to general");
                Classification::general()
            });

        debug!(
            intent = %classification.intent,
            confidence = classification.confidence,
            "classified message"
        );
        Ok(classification)
    }

    /// Classify a message and run the matching handler agent on it.
    ///
    /// Below the confidence threshold the fallback reply is returned
    /// without invoking any handler. An intent with no registered handler
    /// falls through to the default handler; with no default handler
    /// either, the fallback reply is returned.
    ///
    /// # Errors
    ///
    /// Propagates classification errors and any error from the handler
    /// agent's run.
    pub async fn route(
        &self,
        provider: &dyn CompletionProvider,
        message: &str,
    ) -> Result<RoutedReply> {
        let classification = self.classify(provider, message).await?;

        if classification.confidence < self.confidence_threshold {
            debug!(
                confidence = classification.confidence,
                threshold = self.confidence_threshold,
                "below confidence threshold, using fallback reply"
            );
            return Ok(RoutedReply {
                classification,
                text: self.fallback_reply.clone(),
            });
        }

        let handler = self
            .handlers
            .get(&classification.intent)
            .or(self.default_handler.as_ref());
        let Some(agent) = handler else {
            warn!(intent = %classification.intent, "no handler registered and no default");
            return Ok(RoutedReply {
                classification,
                text: self.fallback_reply.clone(),
            });
        };

        let result = Runner::run(provider, agent, message, RunConfig::default()).await?;
        Ok(RoutedReply {
            classification,
            text: result.output,
        })
    }
}

/// Extract the first balanced JSON object from free-form text.
///
/// Models often wrap the requested JSON in prose or code fences; this
/// scans for the first `{` and returns the slice up to its matching `}`.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (i, c) in text[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
