//! Stacks account addresses in c32check encoding.
//!
//! An address is `S` + the c32 digit of its version byte + the c32 encoding of
//! `hash160 || checksum`, where the checksum is the first four bytes of
//! `SHA256(SHA256(version || hash160))`.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::{GateError, Network};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Map a c32 character to its 5-bit value, folding case and the
/// look-alike characters `O`, `I` and `L`.
fn c32_value(c: u8) -> Option<u8> {
    let c = match c.to_ascii_uppercase() {
        b'O' => b'0',
        b'I' | b'L' => b'1',
        other => other,
    };
    C32_ALPHABET.iter().position(|&a| a == c).map(|p| p as u8)
}

/// Encode bytes as c32 (big-endian, one leading `0` per leading zero byte).
pub fn c32_encode(input: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for &byte in input.iter().rev() {
        carry |= u16::from(byte) << carry_bits;
        carry_bits += 8;
        while carry_bits >= 5 {
            digits.push(C32_ALPHABET[usize::from(carry & 0x1f)]);
            carry >>= 5;
            carry_bits -= 5;
        }
    }
    if carry_bits > 0 {
        digits.push(C32_ALPHABET[usize::from(carry & 0x1f)]);
    }

    while digits.last() == Some(&b'0') {
        digits.pop();
    }
    for _ in input.iter().take_while(|b| **b == 0) {
        digits.push(b'0');
    }

    digits.iter().rev().map(|&d| char::from(d)).collect()
}

/// Decode a c32 string back into bytes.
pub fn c32_decode(input: &str) -> Result<Vec<u8>, GateError> {
    if !input.is_ascii() {
        return Err(GateError::InvalidAddress(
            "c32 input must be ASCII".to_string(),
        ));
    }

    let mut bytes: Vec<u8> = Vec::with_capacity(input.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u32 = 0;

    for c in input.bytes().rev() {
        let value = c32_value(c).ok_or_else(|| {
            GateError::InvalidAddress(format!("invalid c32 character '{}'", char::from(c)))
        })?;
        carry |= u16::from(value) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
            carry_bits -= 8;
        }
    }
    if carry_bits > 0 {
        bytes.push(carry as u8);
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    for _ in input.bytes().take_while(|c| c32_value(*c) == Some(0)) {
        bytes.push(0);
    }

    bytes.reverse();
    Ok(bytes)
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

fn checksum(version: u8, hash160: &[u8; 20]) -> [u8; 4] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(hash160);
    let once = hasher.finalize();
    let twice = Sha256::digest(once);
    [twice[0], twice[1], twice[2], twice[3]]
}

/// A decoded Stacks address: version byte plus the 20-byte account hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    version: u8,
    hash160: [u8; 20],
}

impl StacksAddress {
    pub fn new(version: u8, hash160: [u8; 20]) -> Result<Self, GateError> {
        if version >= 32 {
            return Err(GateError::InvalidAddress(format!(
                "version byte {version} does not fit in one c32 digit"
            )));
        }
        Ok(Self { version, hash160 })
    }

    /// Derive the address controlled by a SEC1-encoded public key.
    pub fn from_public_key(version: u8, public_key: &[u8]) -> Result<Self, GateError> {
        Self::new(version, hash160(public_key))
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn hash160(&self) -> &[u8; 20] {
        &self.hash160
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data = Vec::with_capacity(24);
        data.extend_from_slice(&self.hash160);
        data.extend_from_slice(&checksum(self.version, &self.hash160));
        write!(
            f,
            "S{}{}",
            char::from(C32_ALPHABET[usize::from(self.version)]),
            c32_encode(&data)
        )
    }
}

impl FromStr for StacksAddress {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix('S')
            .ok_or_else(|| GateError::InvalidAddress(format!("'{s}' must start with 'S'")))?;
        if body.len() < 2 || !body.is_ascii() {
            return Err(GateError::InvalidAddress(format!("'{s}' is too short")));
        }

        let version = c32_value(body.as_bytes()[0]).ok_or_else(|| {
            GateError::InvalidAddress(format!("'{s}' has an invalid version character"))
        })?;
        let data = c32_decode(&body[1..])?;
        if data.len() != 24 {
            return Err(GateError::InvalidAddress(format!(
                "'{s}' decodes to {} bytes, expected 24",
                data.len()
            )));
        }

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[..20]);
        if data[20..] != checksum(version, &hash) {
            return Err(GateError::InvalidAddress(format!("'{s}' has a bad checksum")));
        }

        Self::new(version, hash)
    }
}

/// Check that `address` is a canonical c32check address for `network`.
///
/// Never fails; anything that does not parse, uses another network's version
/// byte, or is not in canonical form is simply rejected.
pub fn validate_address(address: &str, network: Network) -> bool {
    match address.parse::<StacksAddress>() {
        Ok(parsed) => network.accepts_version(parsed.version()) && parsed.to_string() == address,
        Err(_) => false,
    }
}
