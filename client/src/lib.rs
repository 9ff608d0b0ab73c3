pub mod api;
pub mod chat;
pub mod ingest;
pub mod sources;

pub use api::{ChatMessage, ChatRequest, Role, SourceDocument};
pub use chat::{ChatClient, ChatResponse, ResponseMetadata, MESSAGE_INDEX_HEADER, SOURCES_HEADER};
pub use ingest::IngestClient;
pub use sources::{decode_sources_header, encode_sources_header};
