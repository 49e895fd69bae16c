use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::DispatchError;

/// Required secret length, in characters.
///
/// Secrets are fixed-length, high-entropy strings issued by the
/// registration subsystem.
pub const SECRET_LENGTH: usize = 64;

/// Compute the delivery signature for a serialized body.
///
/// HMAC-SHA256 keyed by the UTF-8 bytes of `secret`, applied to the
/// UTF-8 bytes of `content`, encoded as lowercase hex. The encoding is
/// part of the wire contract; subscribers verify against it.
///
/// Deterministic and side-effect free; safe to call concurrently.
pub fn sign(secret: &str, content: &str) -> Result<String, DispatchError> {
    let mac = keyed_mac(secret)?;
    Ok(hex::encode(finalize(mac, content.as_bytes())))
}

/// Verify a received signature against a payload.
///
/// Receiver-side counterpart of [`sign`]. Returns `false` on any
/// mismatch, including malformed hex; never errors past the secret
/// length check.
pub fn verify_signature(
    secret: &str,
    content: &str,
    signature_hex: &str,
) -> Result<bool, DispatchError> {
    let Ok(signature) = hex::decode(signature_hex) else {
        return Ok(false);
    };

    let mut mac = keyed_mac(secret)?;
    mac.update(content.as_bytes());
    Ok(mac.verify_slice(&signature).is_ok())
}

fn keyed_mac(secret: &str) -> Result<Hmac<Sha256>, DispatchError> {
    let length = secret.chars().count();
    if length != SECRET_LENGTH {
        return Err(DispatchError::InvalidSecret { length });
    }

    // HMAC-SHA256 accepts keys of any length, so this cannot fail for
    // a length-checked secret.
    Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| DispatchError::InvalidSecret { length })
}

fn finalize(mut mac: Hmac<Sha256>, content: &[u8]) -> Vec<u8> {
    mac.update(content);
    mac.finalize().into_bytes().to_vec()
}
