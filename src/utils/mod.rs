pub mod signature;
pub use signature::{SIGNATURE_HEADER, SignatureError, verify_signature};
