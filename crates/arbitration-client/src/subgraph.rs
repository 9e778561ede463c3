//! MDC subgraph client
//!
//! Chain relations and MDC ownership come from a GraphQL endpoint. The
//! subgraph encodes every integer as a decimal string.

use crate::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use arbitration_types::{ChainRelation, MetadataError, MetadataSource};
use async_trait::async_trait;
use ethers::types::Address;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;

const CHAIN_RELS_QUERY: &str = r#"
query {
  chainRels {
    id
    nativeToken
    minVerifyChallengeSourceTxSecond
    minVerifyChallengeDestTxSecond
    maxVerifyChallengeSourceTxSecond
    maxVerifyChallengeDestTxSecond
    batchLimit
    enableTimestamp
    spvs
  }
}"#;

const MDCS_QUERY: &str = r#"
query ($owner: String!) {
  mdcs(where: { owner: $owner }) {
    id
    owner
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainRels {
    #[serde(default)]
    chain_rels: Vec<RawChainRel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChainRel {
    id: String,
    #[serde(default)]
    native_token: String,
    #[serde(default)]
    min_verify_challenge_source_tx_second: String,
    #[serde(default)]
    max_verify_challenge_source_tx_second: String,
    #[serde(default)]
    min_verify_challenge_dest_tx_second: String,
    #[serde(default)]
    max_verify_challenge_dest_tx_second: String,
    #[serde(default)]
    batch_limit: String,
    #[serde(default)]
    enable_timestamp: String,
    #[serde(default)]
    spvs: Vec<String>,
}

impl TryFrom<RawChainRel> for ChainRelation {
    type Error = MetadataError;

    fn try_from(raw: RawChainRel) -> Result<Self, Self::Error> {
        Ok(ChainRelation {
            id: number(&raw.id, "id")?,
            native_token: raw.native_token,
            min_challenge_delay_secs: number(&raw.min_verify_challenge_source_tx_second, "minVerifyChallengeSourceTxSecond")?,
            max_challenge_delay_secs: number(&raw.max_verify_challenge_source_tx_second, "maxVerifyChallengeSourceTxSecond")?,
            min_verify_dest_delay_secs: number(&raw.min_verify_challenge_dest_tx_second, "minVerifyChallengeDestTxSecond")?,
            max_verify_dest_delay_secs: number(&raw.max_verify_challenge_dest_tx_second, "maxVerifyChallengeDestTxSecond")?,
            batch_limit: number(&raw.batch_limit, "batchLimit")?,
            enable_timestamp: number(&raw.enable_timestamp, "enableTimestamp")?,
            spvs: raw.spvs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Mdcs {
    #[serde(default)]
    mdcs: Vec<RawMdc>,
}

#[derive(Debug, Deserialize)]
struct RawMdc {
    id: String,
}

fn number(value: &str, field: &str) -> Result<u64, MetadataError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|e| MetadataError::Decode(format!("{} {:?}: {}", field, value, e)))
}

fn parse_response<T: DeserializeOwned>(body: Value) -> Result<T, MetadataError> {
    let response: GraphQlResponse<T> =
        serde_json::from_value(body).map_err(|e| MetadataError::Decode(e.to_string()))?;
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(MetadataError::Query(messages.join("; ")));
    }
    response
        .data
        .ok_or_else(|| MetadataError::Decode("response has no data".to_string()))
}

/// GraphQL client for the MDC subgraph
#[derive(Clone, Debug)]
pub struct SubgraphClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SubgraphClient {
    pub fn new(endpoint: &str) -> Result<Self, MetadataError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MetadataError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim().to_string(),
        })
    }

    async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, MetadataError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| MetadataError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Transport(format!(
                "{} returned HTTP {}",
                self.endpoint,
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MetadataError::Decode(e.to_string()))?;
        parse_response(body)
    }
}

#[async_trait]
impl MetadataSource for SubgraphClient {
    async fn chain_relations(&self) -> Result<Vec<ChainRelation>, MetadataError> {
        let rels: ChainRels = self.query(CHAIN_RELS_QUERY, json!({})).await?;
        rels.chain_rels.into_iter().map(ChainRelation::try_from).collect()
    }

    async fn mdc_address(&self, owner: &str) -> Result<Option<Address>, MetadataError> {
        let owner = owner.trim().to_lowercase();
        let mdcs: Mdcs = self.query(MDCS_QUERY, json!({ "owner": owner })).await?;
        match mdcs.mdcs.into_iter().next() {
            Some(mdc) => Address::from_str(&mdc.id)
                .map(Some)
                .map_err(|e| MetadataError::Decode(format!("mdc id {:?}: {}", mdc.id, e))),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_rels_parse_string_numbers() {
        let body = json!({
            "data": {
                "chainRels": [{
                    "id": "5",
                    "nativeToken": "0x0000000000000000000000000000000000000000",
                    "minVerifyChallengeSourceTxSecond": "100",
                    "maxVerifyChallengeSourceTxSecond": "1000",
                    "minVerifyChallengeDestTxSecond": "200",
                    "maxVerifyChallengeDestTxSecond": "2000",
                    "batchLimit": "100",
                    "enableTimestamp": "1700000000",
                    "spvs": ["0x00000000000000000000000000000000000000bb"]
                }]
            }
        });
        let rels: ChainRels = parse_response(body).unwrap();
        let relations: Vec<ChainRelation> = rels
            .chain_rels
            .into_iter()
            .map(ChainRelation::try_from)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(relations.len(), 1);
        let chain = &relations[0];
        assert_eq!(chain.id, 5);
        assert_eq!(chain.min_challenge_delay_secs, 100);
        assert_eq!(chain.max_challenge_delay_secs, 1000);
        assert_eq!(chain.min_verify_dest_delay_secs, 200);
        assert_eq!(chain.spvs.len(), 1);
    }

    #[test]
    fn test_graphql_errors_surface_as_query_error() {
        let body = json!({ "data": null, "errors": [{ "message": "bad field" }] });
        let result: Result<Mdcs, _> = parse_response(body);
        match result {
            Err(MetadataError::Query(msg)) => assert_eq!(msg, "bad field"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_number_is_decode_error() {
        assert!(matches!(number("ten", "batchLimit"), Err(MetadataError::Decode(_))));
        assert_eq!(number("", "batchLimit").unwrap(), 0);
    }

    #[test]
    fn test_empty_mdcs() {
        let mdcs: Mdcs = parse_response(json!({ "data": { "mdcs": [] } })).unwrap();
        assert!(mdcs.mdcs.is_empty());
    }
}
