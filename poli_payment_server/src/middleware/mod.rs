mod host_signature;

pub use host_signature::{sign_host_request, signing_message, verify_signature, HostSignature, SignatureError};

pub const HOST_HMAC_HEADER: &str = "X-Host-Hmac-Sha256";
