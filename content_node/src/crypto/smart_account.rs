use super::SignatureError;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// `isValidSignature(bytes32,bytes)` selector, also the success magic value
pub const ERC1654_MAGIC_VALUE: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// Evaluates a contract's `isValidSignature` over JSON-RPC
#[async_trait]
pub trait SmartAccountClient: Send + Sync {
    /// Returns the 4-byte result of `isValidSignature(hash, signature)` on
    /// the contract at `address`
    async fn call_is_valid_signature(
        &self,
        address: &str,
        hash: [u8; 32],
        signature: &[u8],
    ) -> Result<[u8; 4], SignatureError>;
}

/// ABI-encode `isValidSignature(bytes32 hash, bytes signature)`
pub fn encode_is_valid_signature(hash: &[u8; 32], signature: &[u8]) -> Vec<u8> {
    let padded_len = signature.len().div_ceil(32) * 32;
    let mut data = Vec::with_capacity(4 + 32 * 3 + padded_len);
    data.extend_from_slice(&ERC1654_MAGIC_VALUE);
    data.extend_from_slice(hash);
    data.extend_from_slice(&abi_word(64));
    data.extend_from_slice(&abi_word(signature.len() as u64));
    data.extend_from_slice(signature);
    data.resize(4 + 32 * 3 + padded_len, 0);
    data
}

fn abi_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// `eth_call` client against an Ethereum JSON-RPC endpoint
#[derive(Debug, Clone)]
pub struct JsonRpcSmartAccountClient {
    client: Client,
    rpc_url: String,
}

impl JsonRpcSmartAccountClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, SignatureError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignatureError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
        })
    }
}

#[async_trait]
impl SmartAccountClient for JsonRpcSmartAccountClient {
    async fn call_is_valid_signature(
        &self,
        address: &str,
        hash: [u8; 32],
        signature: &[u8],
    ) -> Result<[u8; 4], SignatureError> {
        let call_data = format!("0x{}", hex::encode(encode_is_valid_signature(&hash, signature)));
        debug!("eth_call isValidSignature on {}", address);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&serde_json::json!({
                "jsonrpc": "2.0",
                "method": "eth_call",
                "params": [{
                    "to": address,
                    "data": call_data
                }, "latest"],
                "id": 1
            }))
            .send()
            .await
            .map_err(|e| SignatureError::Transport(format!("RPC call failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SignatureError::Transport(format!(
                "RPC endpoint returned {}",
                response.status()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| SignatureError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        parse_call_result(body)
    }
}

fn parse_call_result(body: RpcResponse) -> Result<[u8; 4], SignatureError> {
    if let Some(err) = body.error {
        return Err(SignatureError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    let data = body
        .result
        .ok_or_else(|| SignatureError::InvalidResponse("missing result".to_string()))?;
    let bytes = hex::decode(data.trim_start_matches("0x"))
        .map_err(|e| SignatureError::InvalidResponse(e.to_string()))?;
    if bytes.len() < 4 {
        return Err(SignatureError::InvalidResponse(format!(
            "result too short: {} bytes",
            bytes.len()
        )));
    }
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes[..4]);
    Ok(out)
}

/// Used when no RPC endpoint is configured: every smart-account check is an
/// infrastructure error
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSmartAccountClient;

#[async_trait]
impl SmartAccountClient for DisabledSmartAccountClient {
    async fn call_is_valid_signature(
        &self,
        _address: &str,
        _hash: [u8; 32],
        _signature: &[u8],
    ) -> Result<[u8; 4], SignatureError> {
        Err(SignatureError::Unavailable)
    }
}
