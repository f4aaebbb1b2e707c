//! Payment callback signatures: hex HMAC-SHA256 over `"{remote_order_id}|{payment_id}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::GatewayError;

type HmacSha256 = Hmac<Sha256>;

const DIGEST_LEN: usize = 32;

fn keyed(secret: &str, remote_order_id: &str, payment_id: &str) -> Result<HmacSha256, GatewayError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| GatewayError::InvalidKey)?;
    mac.update(remote_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(mac)
}

/// Computes the lowercase hex signature the processor sends with a callback.
pub fn sign(secret: &str, remote_order_id: &str, payment_id: &str) -> Result<String, GatewayError> {
    let mac = keyed(secret, remote_order_id, payment_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a callback signature in constant time.
///
/// Anything that is not exactly 64 hex characters is rejected before comparing.
pub fn verify(
    secret: &str,
    remote_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), GatewayError> {
    let provided = hex::decode(signature.trim()).map_err(|_| GatewayError::InvalidSignature)?;
    if provided.len() != DIGEST_LEN {
        return Err(GatewayError::InvalidSignature);
    }

    keyed(secret, remote_order_id, payment_id)?
        .verify_slice(&provided)
        .map_err(|_| GatewayError::InvalidSignature)
}
