//! The tool registry: a typed name-to-implementation mapping.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{Tool, ToolDefinition};

/// Mapping from tool name to schema and implementation.
///
/// Replaces the dynamic name-to-function dispatch pattern with an explicit,
/// typed lookup: a name the model requests either resolves to a registered
/// tool or is reported back to the model as an error result.
///
/// The registry is read-only after construction and cheap to clone
/// (implementations are shared behind [`Arc`]), so one registry can back
/// any number of concurrent runs.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry. An empty registry is legal and simply
    /// means a tool-free conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its declared name.
    ///
    /// Registering a second tool with the same name replaces the first.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    /// Register an already-shared tool.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.definition().name, tool);
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.register(tool);
        self
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered definitions, ordered by name.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// All registered names, ordered.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::FnTool;
    use serde_json::json;

    fn echo_tool(description: &str) -> FnTool {
        FnTool::new(
            "echo",
            description,
            json!({"type": "object", "properties": {"x": {"type": "string"}}}),
            |args| async move { Ok(args.to_string()) },
        )
    }

    #[test]
    fn lookup_and_definitions() {
        let registry = ToolRegistry::new().with(echo_tool("Echo.")).with(FnTool::new(
            "add",
            "Add two numbers.",
            json!({"type": "object"}),
            |_| async move { Ok("0".into()) },
        ));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
        assert!(registry.lookup("missing").is_none());

        // Deterministic name ordering.
        assert_eq!(registry.names(), vec!["add", "echo"]);
        assert_eq!(
            registry
                .definitions()
                .iter()
                .map(|d| d.name.as_str())
                .collect::<Vec<_>>(),
            vec!["add", "echo"]
        );
    }

    #[test]
    fn duplicate_registration_replaces() {
        let registry = ToolRegistry::new()
            .with(echo_tool("first"))
            .with(echo_tool("second"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].description, "second");
    }
}
