use anyhow::anyhow;
use futures::stream::Stream;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use std::pin::Pin;

use crate::api::{ChatRequest, SourceDocument};
use crate::sources::decode_sources_header;

/// Response header carrying the base64-encoded source records for a turn.
pub const SOURCES_HEADER: &str = "x-sources";
/// Response header carrying the from-end turn key the sources belong to.
pub const MESSAGE_INDEX_HEADER: &str = "x-message-index";

pub type BoxedStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

/// Consumes the chat endpoint: posts the transcript, hands back the streamed
/// reply plus the citation metadata captured from the response headers.
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        ChatClient {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn stream_chat(&self, request: &ChatRequest) -> anyhow::Result<ChatResponse> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow!(
                "Chat request failed with status {}: {}",
                status,
                error_body
            ));
        }

        let metadata = ResponseMetadata::from_headers(response.headers());
        let chunks = decode_utf8_chunks(response.bytes_stream());
        Ok(ChatResponse {
            metadata,
            chunks: Box::pin(chunks),
        })
    }
}

/// The out-of-band citation metadata piggybacked on a chat response.
///
/// Captured when the response opens, resolved once the stream has been fully
/// consumed.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
    sources: Option<String>,
    message_index: Option<String>,
}

impl ResponseMetadata {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_string = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        ResponseMetadata {
            sources: header_string(SOURCES_HEADER),
            message_index: header_string(MESSAGE_INDEX_HEADER),
        }
    }

    /// Resolve the per-turn source list from the captured headers.
    ///
    /// Yields the turn key and decoded records only when the sources header
    /// decodes to a non-empty list and the index header is present; the
    /// literal value "0" is a valid key. A malformed header degrades to
    /// "no sources for this turn" with a warning.
    pub fn sources_for_turn(&self) -> Option<(String, Vec<SourceDocument>)> {
        let header = self.sources.as_deref()?;
        let turn_key = self.message_index.clone()?;
        match decode_sources_header(header) {
            Ok(docs) if !docs.is_empty() => Some((turn_key, docs)),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("ignoring malformed sources header: {:#}", err);
                None
            }
        }
    }
}

/// A live chat exchange: the streamed reply body plus the metadata read from
/// the response headers.
pub struct ChatResponse {
    metadata: ResponseMetadata,
    chunks: BoxedStream<anyhow::Result<String>>,
}

impl ChatResponse {
    pub fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }

    /// Next piece of reply text, in arrival order. `None` once the stream
    /// has closed.
    pub async fn next_chunk(&mut self) -> Option<anyhow::Result<String>> {
        self.chunks.next().await
    }
}

/// Reassemble a byte stream into text chunks without splitting multi-byte
/// sequences: a trailing incomplete sequence is carried into the next chunk.
/// Invalid bytes mid-stream are replaced rather than stalling the carry
/// buffer.
fn decode_utf8_chunks<S, E>(bytes: S) -> impl Stream<Item = anyhow::Result<String>>
where
    S: Stream<Item = Result<bytes::Bytes, E>>,
    E: Into<anyhow::Error>,
{
    bytes
        .scan(Vec::new(), |carry: &mut Vec<u8>, chunk| {
            let item = match chunk {
                Ok(chunk) => {
                    carry.extend_from_slice(&chunk);
                    match std::str::from_utf8(carry) {
                        Ok(text) => {
                            let text = text.to_string();
                            carry.clear();
                            Ok(text)
                        }
                        Err(e) if e.error_len().is_none() => {
                            // Incomplete trailing sequence: emit the valid
                            // prefix, keep the tail for the next chunk.
                            let rest = carry.split_off(e.valid_up_to());
                            let text = String::from_utf8_lossy(carry).into_owned();
                            *carry = rest;
                            Ok(text)
                        }
                        Err(_) => {
                            let text = String::from_utf8_lossy(carry).into_owned();
                            carry.clear();
                            Ok(text)
                        }
                    }
                }
                Err(e) => Err(e.into()),
            };
            futures::future::ready(Some(item))
        })
        .filter(|item| {
            futures::future::ready(match item {
                Ok(text) => !text.is_empty(),
                Err(_) => true,
            })
        })
}
