//! Tool registry: an ordered, immutable name -> tool table.
//!
//! Built once at startup through `ToolRegistryBuilder` and shared read-only
//! (behind an `Arc`) by every dispatcher. Lookups are exact, case-sensitive
//! matches on the tool name.

use std::collections::HashMap;

use tracing::info;

use super::{RegisteredTool, ToolDescriptor};
use crate::error::RegistryError;

pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> Vec<&ToolDescriptor> {
        self.tools.iter().map(|t| &t.descriptor).collect()
    }

    pub fn describe(&self, name: &str) -> Option<&ToolDescriptor> {
        self.get(name).map(|t| &t.descriptor)
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, tool: RegisteredTool) -> Result<Self, RegistryError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        info!(
            "[tools] Registry built with {} tools: {}",
            self.tools.len(),
            self.tools
                .iter()
                .map(|t| t.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        ToolRegistry {
            tools: self.tools,
            by_name: self.by_name,
        }
    }
}
