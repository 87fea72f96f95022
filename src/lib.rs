//! Ladle Library
//!
//! Streaming multi-part chat pipeline: model event multiplexing, part
//! reconciliation, tool dispatch, attachments, artifacts, and persistence.
//!
//! ## Main Components
//!
//! - [`stream`] - Event vocabulary, channel, and the generation multiplexer
//! - [`message`] - Message/part data model and the part reconciler
//! - [`model`] - Language model trait and the OpenAI-compatible client
//! - [`tools`] - Tool implementations, registry, and concurrent dispatch
//! - [`attachments`] - Upload validation, classification, and encoding
//! - [`artifact`] - Single-slot artifact view state
//! - [`store`] - SQLite-backed message persistence
//!
//! ## Quick Start
//!
//! ```ignore
//! use ladle::{ChatMode, GenerationRequest, Message, OpenAiModel, StreamMultiplexer, ToolRegistry};
//! use std::sync::Arc;
//!
//! let model = Arc::new(OpenAiModel::new(base_url, api_key, "gpt-4o-mini"));
//! let registry = Arc::new(ToolRegistry::default());
//! let mux = StreamMultiplexer::new(model, registry);
//! let mut events = mux.generate(GenerationRequest {
//!     chat_id: None,
//!     messages: vec![Message::user("weather in Bangalore?")],
//!     mode: ChatMode::Chat,
//! });
//! ```

#![allow(dead_code)] // Library APIs may not be used internally

pub mod artifact;
pub mod attachments;
pub mod message;
pub mod model;
pub mod modes;
pub mod related;
pub mod store;
pub mod stream;
pub mod tools;

// Re-export commonly used types
pub use artifact::{ArtifactData, ArtifactSlot, ArtifactType, RenderPlan};
pub use attachments::{ingest, FileUpload, IngestOutcome};
pub use message::{Attachment, Message, Part, PartReconciler, Role, ToolInvocation};
pub use model::{LanguageModel, ModelError, OpenAiModel};
pub use modes::ChatMode;
pub use related::{ModelRelatedQuestions, RelatedQuestionsSource};
pub use store::{MemoryStore, MessageStore, SqliteStore, StoreError};
pub use stream::{GenerationRequest, StreamEvent, StreamMultiplexer};
pub use tools::{Tool, ToolDispatcher, ToolError, ToolRegistry, ToolSecrets};
