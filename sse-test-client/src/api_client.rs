use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

pub struct ApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Clone)]
pub struct Status {
    pub active_subscribers: u64,
    pub last_sequence: Option<u64>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// POST a fact and return the sequence number the server assigned to it.
    pub async fn publish_fact(&self, fact: &Value) -> Result<u64> {
        let url = format!("{}/fact", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(fact)
            .send()
            .await
            .context("Failed to publish fact")?;

        if response.status() != StatusCode::CREATED {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            anyhow::bail!("Failed to publish fact: {} - Response: {}", status, body);
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;

        // Extract the sequence from ApiResponse wrapper
        api_response["data"]["sequence"]
            .as_u64()
            .context("No sequence in response")
    }

    /// POST a raw JSON body and return only the response status.
    pub async fn publish_raw(&self, body: &str) -> Result<StatusCode> {
        let url = format!("{}/fact", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .context("Failed to publish fact")?;

        Ok(response.status())
    }

    pub async fn status(&self) -> Result<Status> {
        let url = format!("{}/status", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get status")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to get status: {}", response.status());
        }

        let api_response: Value = response.json().await.context("Failed to parse response")?;
        let data = &api_response["data"];

        Ok(Status {
            active_subscribers: data["active_subscribers"]
                .as_u64()
                .context("No active_subscribers in response")?,
            last_sequence: data["last_sequence"].as_u64(),
        })
    }
}
