//! Tool registry: the table the dispatch core routes `tools/call` through.
//!
//! The registry is built once at startup and injected into the server; it is
//! append-only and insertion-ordered, so `tools/list` always reports tools
//! in registration order. Duplicate names are a startup configuration error,
//! never a call-time surprise.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::ToolError;
use crate::mcp::protocol::ToolCallResult;

/// Errors raised while building the registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("duplicate tool name: {0}")]
    DuplicateName(String),
}

/// The capability interface every tool implements.
///
/// Handlers validate their own parameters and return either a result
/// envelope or a [`ToolError`]; the dispatch core maps the error into an
/// `isError: true` envelope at a single boundary.
pub trait ToolHandler: Send + Sync {
    /// Invokes the tool with the given `arguments` object.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when parameters are missing or an adapter
    /// call fails; the error text becomes the envelope content.
    fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError>;
}

/// A tool definition as projected into the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// A registered tool: its advertised definition plus its handler.
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: Value,
    handler: Box<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Creates a descriptor from a name, description, schema and handler.
    ///
    /// The schema is advertised to clients for their own validation; it is
    /// not enforced server-side beyond what the handler checks itself.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: Box<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the tool's handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`ToolError`].
    pub fn invoke(&self, arguments: &Value) -> Result<ToolCallResult, ToolError> {
        self.handler.invoke(arguments)
    }

    /// Projects this descriptor to its `tools/list` definition.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// An insertion-ordered collection of tool descriptors.
#[derive(Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if a tool with the same name
    /// is already registered.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.tools.insert(name, descriptor);
        Ok(())
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Returns all tool definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(ToolDescriptor::definition).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
