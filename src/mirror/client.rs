//! HTTP client for the mirror node REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::NetworkConfig;
use crate::ledger::error::{LedgerError, LedgerResult};
use crate::ledger::ids::TopicId;
use crate::ledger::network::{MessageFeed, Query, QueryResponse, QueryService, Since};
use crate::ledger::types::TopicMessage;
use crate::mirror::wire::{BalancesPage, MessagesPage, WireNft, WireToken, WireTopic};

/// Largest page the mirror node serves.
pub const MAX_PAGE_SIZE: usize = 100;

/// Read-only access to a mirror node.
#[derive(Clone)]
pub struct MirrorClient {
    http: Client,
    base: Url,
}

impl MirrorClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> LedgerResult<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| LedgerError::Validation(format!("invalid mirror URL '{}': {}", base_url, e)))?;
        // relative joins keep the last path segment only behind a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LedgerError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, base })
    }

    pub fn from_config(config: &NetworkConfig, request_timeout: Duration) -> LedgerResult<Self> {
        Self::new(&config.mirror_url, request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> LedgerResult<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| LedgerError::Validation(format!("invalid mirror path '{}': {}", path, e)))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// GET a JSON document. `Ok(None)` on 404.
    ///
    /// Transport failures, 429 and 5xx are retryable network errors; any
    /// other failure is a query error.
    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> LedgerResult<Option<T>> {
        let url = self.url(path, params)?;
        tracing::debug!(url = %url, "Mirror request");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| LedgerError::Network(format!("mirror request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(LedgerError::Network(format!("mirror node returned {} for {}", status, url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Query(format!(
                "mirror node returned {} for {}: {}",
                status, url, body
            )));
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| LedgerError::Query(format!("unreadable mirror response from {}: {}", url, e)))
    }

    async fn require<T: DeserializeOwned>(&self, query: &Query, path: &str, params: &[(&str, String)]) -> LedgerResult<T> {
        self.get(path, params)
            .await?
            .ok_or_else(|| LedgerError::Query(format!("{} not found", query)))
    }

    /// Sequence number of the newest message, 0 for an empty topic.
    async fn latest_sequence_number(&self, topic_id: TopicId) -> LedgerResult<u64> {
        let params = [("limit", "1".to_string()), ("order", "desc".to_string())];
        let page: Option<MessagesPage> = self.get(&format!("api/v1/topics/{}/messages", topic_id), &params).await?;
        Ok(page
            .and_then(|p| p.messages.into_iter().next())
            .map(|m| m.sequence_number)
            .unwrap_or(0))
    }
}

fn timestamp_filter(since: Since) -> String {
    match since {
        Since::AtOrAfter(ts) => format!("gte:{}", ts),
        Since::After(ts) => format!("gt:{}", ts),
    }
}

#[async_trait]
impl QueryService for MirrorClient {
    async fn query(&self, query: &Query) -> LedgerResult<QueryResponse> {
        match *query {
            Query::AccountBalance(account_id) => {
                let page: BalancesPage = self
                    .require(query, "api/v1/balances", &[("account.id", account_id.to_string())])
                    .await?;
                page.into_balance(account_id)
                    .map(QueryResponse::AccountBalance)
                    .ok_or_else(|| LedgerError::Query(format!("{} not found", query)))
            }
            Query::TopicInfo(topic_id) => {
                let topic: WireTopic = self.require(query, &format!("api/v1/topics/{}", topic_id), &[]).await?;
                let sequence_number = self.latest_sequence_number(topic_id).await?;
                Ok(QueryResponse::TopicInfo(topic.into_info(sequence_number)))
            }
            Query::TokenInfo(token_id) => {
                let token: WireToken = self.require(query, &format!("api/v1/tokens/{}", token_id), &[]).await?;
                Ok(QueryResponse::TokenInfo(token.into_info()?))
            }
            Query::NftInfo(nft_id) => {
                let path = format!("api/v1/tokens/{}/nfts/{}", nft_id.token_id, nft_id.serial);
                let nft: WireNft = self.require(query, &path, &[]).await?;
                Ok(QueryResponse::NftInfo(nft.into_info()?))
            }
        }
    }
}

#[async_trait]
impl MessageFeed for MirrorClient {
    async fn messages(&self, topic_id: TopicId, since: Since, limit: usize) -> LedgerResult<Vec<TopicMessage>> {
        let params = [
            ("timestamp", timestamp_filter(since)),
            ("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
            ("order", "asc".to_string()),
        ];
        // a topic the mirror has not seen yet reads as empty
        let page: Option<MessagesPage> = self.get(&format!("api/v1/topics/{}/messages", topic_id), &params).await?;
        page.map(|p| p.messages)
            .unwrap_or_default()
            .into_iter()
            .map(|m| m.into_message())
            .collect()
    }
}
