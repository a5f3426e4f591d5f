//! Tool registry: maps tool names to implementations.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::traits::CopilotTool;

/// Registered tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn CopilotTool>>,
}

impl ToolRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any existing tool of the same name.
    pub fn register(&mut self, tool: Arc<dyn CopilotTool>) {
        debug!(tool_name = tool.name(), "tool registered");
        let _ = self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Look up a tool.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CopilotTool>> {
        self.tools.get(name).cloned()
    }

    /// Sorted tool names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::errors::ToolError;
    use crate::tools::ToolContext;

    struct StubTool(&'static str);

    #[async_trait]
    impl CopilotTool for StubTool {
        fn name(&self) -> &str {
            self.0
        }

        async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            Ok(arguments)
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(StubTool("b")));
        reg.register(Arc::new(StubTool("a")));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names(), vec!["a", "b"]);
        assert!(reg.get("a").is_some());
        assert!(reg.get("zzz").is_none());
    }

    #[test]
    fn defaults_are_safe() {
        let tool = StubTool("x");
        assert!(!tool.requires_approval());
        assert!(!tool.mutates_workflow());
    }

    #[test]
    fn reregister_replaces() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(StubTool("a")));
        reg.register(Arc::new(StubTool("a")));
        assert_eq!(reg.len(), 1);
    }
}
