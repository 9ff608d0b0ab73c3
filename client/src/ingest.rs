use anyhow::anyhow;
use serde::Serialize;

#[derive(Serialize)]
struct IngestRequest<'a> {
    text: &'a str,
}

/// Submits raw document text to the ingestion endpoint. Chunking, embedding
/// and storage all happen server-side; the client only learns success or
/// failure.
#[derive(Clone)]
pub struct IngestClient {
    client: reqwest::Client,
    endpoint: String,
}

impl IngestClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        IngestClient {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ingest(&self, text: &str) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&IngestRequest { text })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(anyhow!(
                "Ingestion failed with status {}: {}",
                status,
                error_body
            ));
        }
        Ok(())
    }
}
