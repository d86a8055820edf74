//! SIP-018 structured-message hashing and signature verification.
//!
//! Provides functions for:
//! - Building the message domain ([`message_domain`])
//! - Computing structured-data hashes ([`structured_data_hash`], [`signing_hash`])
//! - Recovering signers from RSV signatures ([`recover_public_key`])
//! - Proving control of a claimed address ([`verify_signed_message`])
//! - Client-side signing ([`sign_address_message`])

use alloy::primitives::{Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use sha2::{Digest, Sha256};

use crate::address::StacksAddress;
use crate::clarity::ClarityValue;
use crate::{GateConfig, GateError, Network};

/// Prefix bytes ("SIP018") of every structured-data hash.
pub const SIP018_PREFIX: &[u8; 6] = b"SIP018";

/// secp256k1 curve order N / 2. Signatures with s above this are malleable.
const SECP256K1_N_DIV_2: U256 = U256::from_limbs([
    0xDFE92F46681B20A0,
    0x5D576E7357A4501D,
    0xFFFFFFFFFFFFFFFF,
    0x7FFFFFFFFFFFFFFF,
]);

/// Domain tuple `{name, version, chain-id}` binding a signature to one app and chain.
pub fn message_domain(
    name: &str,
    version: &str,
    chain_id: u32,
) -> Result<ClarityValue, GateError> {
    Ok(ClarityValue::tuple([
        ("name", ClarityValue::string_ascii(name)?),
        ("version", ClarityValue::string_ascii(version)?),
        ("chain-id", ClarityValue::uint(u128::from(chain_id))),
    ]))
}

/// `SHA256("SIP018" || SHA256(domain) || SHA256(message))`.
pub fn structured_data_hash(
    domain: &ClarityValue,
    message: &ClarityValue,
) -> Result<B256, GateError> {
    let domain_hash = Sha256::digest(domain.serialize()?);
    let message_hash = Sha256::digest(message.serialize()?);

    let mut hasher = Sha256::new();
    hasher.update(SIP018_PREFIX);
    hasher.update(domain_hash);
    hasher.update(message_hash);
    Ok(B256::from_slice(&hasher.finalize()))
}

/// Hash a client signs to prove control of `address` on `network`.
pub fn signing_hash(
    config: &GateConfig,
    network: Network,
    address: &str,
) -> Result<B256, GateError> {
    let domain = message_domain(
        &config.domain_name,
        &config.domain_version,
        network.chain_id(),
    )?;
    let message = ClarityValue::string_ascii(address)?;
    structured_data_hash(&domain, &message)
}

/// Recover the compressed public key that produced `signature_hex` over `hash`.
///
/// Accepts 65-byte RSV signatures as hex, with or without `0x`. The recovery
/// byte may be 0/1 or 27/28.
pub fn recover_public_key(hash: &B256, signature_hex: &str) -> Result<Vec<u8>, GateError> {
    let trimmed = signature_hex.trim();
    let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = alloy::hex::decode(raw)
        .map_err(|e| GateError::SignatureError(format!("invalid hex: {e}")))?;

    if bytes.len() != 65 {
        return Err(GateError::SignatureError(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }

    // from_raw also accepts EIP-155 values; only 0/1 and 27/28 are valid here
    if !matches!(bytes[64], 0 | 1 | 27 | 28) {
        return Err(GateError::SignatureError(format!(
            "invalid recovery byte {}",
            bytes[64]
        )));
    }

    let sig = Signature::from_raw(&bytes)
        .map_err(|e| GateError::SignatureError(format!("invalid signature: {e}")))?;

    if sig.s() > SECP256K1_N_DIV_2 {
        return Err(GateError::SignatureError(
            "high-s signature rejected".to_string(),
        ));
    }

    let key = sig
        .recover_from_prehash(hash)
        .map_err(|e| GateError::SignatureError(format!("recovery failed: {e}")))?;
    Ok(key.to_encoded_point(true).as_bytes().to_vec())
}

/// Prove that `claimed` signed the structured message naming itself.
///
/// The recovered key is turned into a single-sig address with the network's
/// version byte and compared to `claimed` character for character.
pub fn verify_signed_message(
    config: &GateConfig,
    network: Network,
    claimed: &str,
    signature_hex: &str,
) -> Result<StacksAddress, GateError> {
    let hash = signing_hash(config, network, claimed)?;
    let public_key = recover_public_key(&hash, signature_hex)?;
    let recovered = StacksAddress::from_public_key(network.singlesig_version(), &public_key)?;

    let recovered_str = recovered.to_string();
    if recovered_str != claimed {
        return Err(GateError::AddressMismatch {
            claimed: claimed.to_string(),
            recovered: recovered_str,
        });
    }
    Ok(recovered)
}

/// Single-sig address of a local signer on `network`.
pub fn signer_address(
    signer: &PrivateKeySigner,
    network: Network,
) -> Result<StacksAddress, GateError> {
    let point = signer.credential().verifying_key().to_encoded_point(true);
    StacksAddress::from_public_key(network.singlesig_version(), point.as_bytes())
}

/// Sign the address message for `signer` and return `(address, rsv_hex)`.
///
/// The recovery byte is emitted as 0/1, the form Stacks wallets produce.
pub fn sign_address_message(
    signer: &PrivateKeySigner,
    config: &GateConfig,
    network: Network,
) -> Result<(String, String), GateError> {
    let address = signer_address(signer, network)?.to_string();
    let hash = signing_hash(config, network, &address)?;
    let sig = signer
        .sign_hash_sync(&hash)
        .map_err(|e| GateError::SignatureError(format!("signing failed: {e}")))?;

    let mut bytes = sig.as_bytes();
    bytes[64] = u8::from(sig.v());
    Ok((address, alloy::hex::encode(bytes)))
}
