//! Content addressing: identifiers, hashing and manifest verification.

pub mod cid;
pub mod validator;

pub use cid::{Cid, CidError, ContentHasher, Sha256RawHasher};
pub use validator::ContentValidator;
