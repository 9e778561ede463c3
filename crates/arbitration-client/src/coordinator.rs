//! Coordinator REST client
//!
//! Every coordinator response is wrapped as `{ "data": ... }`; a missing or
//! null `data` is treated as "nothing there". List items are decoded one by
//! one so a single malformed entry is dropped instead of failing the list.

use crate::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use arbitration_types::{
    ArbitrationTransaction, CoordinatorApi, CoordinatorError, MakerChallenge, NeedProofSubmission, ProofData, Role,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Serialize)]
struct HashBody<'a> {
    hash: &'a str,
}

/// reqwest-backed coordinator client
#[derive(Clone, Debug)]
pub struct HttpCoordinator {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCoordinator {
    pub fn new(base_url: &str) -> Result<Self, CoordinatorError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CoordinatorError::InvalidUrl(base_url));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoordinatorError::Transport(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<T>, CoordinatorError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| CoordinatorError::Transport(e.to_string()))?;
        Self::decode(url, response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Option<Value>, CoordinatorError> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| CoordinatorError::Transport(e.to_string()))?;
        Self::decode(url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> Result<Option<T>, CoordinatorError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CoordinatorError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| CoordinatorError::Transport(e.to_string()))?;
        parse_envelope(&body)
    }
}

fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<Option<T>, CoordinatorError> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| CoordinatorError::Decode(e.to_string()))?;
    Ok(envelope.data)
}

/// Decode each list element on its own, skipping the ones that do not fit `T`
fn decode_list<T: DeserializeOwned>(data: Option<Value>, what: &str) -> Result<Vec<T>, CoordinatorError> {
    let items = match data {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(CoordinatorError::Decode(format!(
                "{}: expected a list, got {}",
                what, other
            )))
        }
    };

    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Dropping malformed {} entry #{}: {}", what, index, e);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        tracing::warn!("Decoded {} of {} {} entries", decoded.len(), total, what);
    }
    Ok(decoded)
}

#[async_trait]
impl CoordinatorApi for HttpCoordinator {
    async fn unreimbursed_transactions(
        &self,
        start_time_ms: i64,
        end_time_ms: i64,
    ) -> Result<Vec<ArbitrationTransaction>, CoordinatorError> {
        let query = [
            ("startTime", start_time_ms.to_string()),
            ("endTime", end_time_ms.to_string()),
        ];
        let data = self.get("transaction/unreimbursedTransactions", &query).await?;
        decode_list(data, "unreimbursed transaction")
    }

    async fn proof_params(&self, role: Role, hash: &str) -> Result<Vec<ProofData>, CoordinatorError> {
        let path = format!("proof/{}/{}", role.proof_params_path(), hash);
        decode_list(self.get(&path, &[]).await?, "proof")
    }

    async fn maker_need_response(&self, maker: &str) -> Result<Vec<MakerChallenge>, CoordinatorError> {
        let query = [("makerAddress", maker.to_string())];
        let data = self.get("transaction/makerNeedResponseTxList", &query).await?;
        decode_list(data, "maker challenge")
    }

    async fn transaction_status(&self, hash: &str) -> Result<Option<i64>, CoordinatorError> {
        let path = format!("transaction/status/{}", hash);
        let status: Option<Value> = self.get(&path, &[]).await?;
        Ok(status.and_then(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }))
    }

    async fn maker_ask_proof(&self, hash: &str) -> Result<(), CoordinatorError> {
        let response = self.post("proof/makerAskProof", &HashBody { hash }).await?;
        tracing::debug!("makerAskProof {} -> {:?}", hash, response);
        Ok(())
    }

    async fn need_proof_submission(&self, request: &NeedProofSubmission) -> Result<(), CoordinatorError> {
        let response = self.post("proof/needProofSubmission", request).await?;
        tracing::debug!("needProofSubmission {} -> {:?}", request.hash, response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let client = HttpCoordinator::new(" https://coordinator.example/api/ ").unwrap();
        assert_eq!(client.base_url(), "https://coordinator.example/api");
        assert_eq!(
            client.url("proof/makerAskProof"),
            "https://coordinator.example/api/proof/makerAskProof"
        );
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            HttpCoordinator::new("coordinator.example"),
            Err(CoordinatorError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_envelope_unwraps_data() {
        let txs: Option<Vec<ArbitrationTransaction>> = parse_envelope(
            r#"{"data":[{"sourceTxHash":"0xabc","sourceChainId":"5","sourceTxTime":1700000000}]}"#,
        )
        .unwrap();
        let txs = txs.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].source_chain_id, Some(5));
    }

    #[test]
    fn test_missing_data_is_none() {
        let none: Option<Vec<ProofData>> = parse_envelope(r#"{"data":null}"#).unwrap();
        assert!(none.is_none());
        let none: Option<Vec<ProofData>> = parse_envelope(r#"{"code":0}"#).unwrap();
        assert!(none.is_none());
        let none: Option<Vec<ProofData>> = parse_envelope("").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_proof_list_status_flags() {
        let proofs: Vec<ProofData> = parse_envelope(
            r#"{"data":[{"status":0,"proof":"0x01"},{"status":1,"proof":"0x02","challenger":"0xc1"}]}"#,
        )
        .unwrap()
        .unwrap();
        let ready = proofs.iter().find(|p| p.status).unwrap();
        assert_eq!(ready.proof.as_deref(), Some("0x02"));
    }

    #[test]
    fn test_malformed_transaction_is_dropped_from_list() {
        let data: Option<Value> = parse_envelope(
            r#"{"data":[
                {"sourceTxHash":"0xaa","sourceChainId":"5","sourceTxTime":1700000000},
                {"sourceTxHash":"0xbb","sourceChainId":"5","sourceTxTime":1700000000.5}
            ]}"#,
        )
        .unwrap();
        let txs: Vec<ArbitrationTransaction> = decode_list(data, "unreimbursed transaction").unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].source_tx_hash.as_deref(), Some("0xaa"));
    }

    #[test]
    fn test_maker_challenge_without_hash_is_dropped() {
        let data: Option<Value> =
            parse_envelope(r#"{"data":[{"sourceTxHash":"0xaa"},{"verifyPassChallenger":"0xc1"}]}"#).unwrap();
        let challenges: Vec<MakerChallenge> = decode_list(data, "maker challenge").unwrap();
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].source_tx_hash, "0xaa");
    }

    #[test]
    fn test_list_shape_errors() {
        let empty: Vec<ProofData> = decode_list(None, "proof").unwrap();
        assert!(empty.is_empty());
        let empty: Vec<ProofData> = decode_list(Some(Value::Null), "proof").unwrap();
        assert!(empty.is_empty());
        let result: Result<Vec<ProofData>, _> = decode_list(Some(serde_json::json!({"status": 1})), "proof");
        assert!(matches!(result, Err(CoordinatorError::Decode(_))));
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        let result: Result<Option<Vec<ProofData>>, _> = parse_envelope("<html>");
        assert!(matches!(result, Err(CoordinatorError::Decode(_))));
    }
}
