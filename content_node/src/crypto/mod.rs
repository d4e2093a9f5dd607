//! Deploy signature verification.
//!
//! Plain ECDSA signatures are checked by public key recovery; long-form
//! signatures belong to smart accounts and are checked on chain.

pub mod signature;
pub mod smart_account;

pub use signature::{
    address_of, hash_message, is_smart_account_signature, recover_address, sign_message, verify,
    SignatureVerifier, SMART_ACCOUNT_SIGNATURE_THRESHOLD,
};
pub use smart_account::{
    DisabledSmartAccountClient, JsonRpcSmartAccountClient, SmartAccountClient, ERC1654_MAGIC_VALUE,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid signature encoding: {0}")]
    InvalidEncoding(String),

    #[error("signature recovery failed: {0}")]
    Recovery(String),

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("smart account verification is not configured")]
    Unavailable,
}
