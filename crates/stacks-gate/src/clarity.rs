//! Clarity values and their consensus serialization.
//!
//! The ledger returns read-only call results as hex-encoded consensus bytes and
//! expects call arguments in the same form. [`ClarityValue`] is the tagged
//! representation; decoding is exhaustive so unknown type ids fail loudly.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::address::StacksAddress;
use crate::GateError;

const TYPE_INT: u8 = 0x00;
const TYPE_UINT: u8 = 0x01;
const TYPE_BUFFER: u8 = 0x02;
const TYPE_TRUE: u8 = 0x03;
const TYPE_FALSE: u8 = 0x04;
const TYPE_STANDARD_PRINCIPAL: u8 = 0x05;
const TYPE_CONTRACT_PRINCIPAL: u8 = 0x06;
const TYPE_RESPONSE_OK: u8 = 0x07;
const TYPE_RESPONSE_ERR: u8 = 0x08;
const TYPE_OPTIONAL_NONE: u8 = 0x09;
const TYPE_OPTIONAL_SOME: u8 = 0x0a;
const TYPE_LIST: u8 = 0x0b;
const TYPE_TUPLE: u8 = 0x0c;
const TYPE_STRING_ASCII: u8 = 0x0d;
const TYPE_STRING_UTF8: u8 = 0x0e;

/// Maximum nesting depth accepted when decoding.
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Buffer(Vec<u8>),
    Bool(bool),
    StandardPrincipal(StacksAddress),
    ContractPrincipal(StacksAddress, String),
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    OptionalNone,
    OptionalSome(Box<ClarityValue>),
    List(Vec<ClarityValue>),
    Tuple(BTreeMap<String, ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn uint(value: u128) -> Self {
        ClarityValue::UInt(value)
    }

    pub fn string_utf8(value: &str) -> Self {
        ClarityValue::StringUtf8(value.to_string())
    }

    pub fn string_ascii(value: &str) -> Result<Self, GateError> {
        if !value.is_ascii() {
            return Err(GateError::ClarityError(
                "string-ascii value contains non-ASCII characters".to_string(),
            ));
        }
        Ok(ClarityValue::StringAscii(value.to_string()))
    }

    /// A principal from its textual form: `SP...` or `SP....contract-name`.
    pub fn principal(value: &str) -> Result<Self, GateError> {
        match value.split_once('.') {
            Some((address, name)) => {
                validate_contract_name(name)?;
                Ok(ClarityValue::ContractPrincipal(
                    address.parse()?,
                    name.to_string(),
                ))
            }
            None => Ok(ClarityValue::StandardPrincipal(value.parse()?)),
        }
    }

    pub fn some(value: ClarityValue) -> Self {
        ClarityValue::OptionalSome(Box::new(value))
    }

    pub fn ok(value: ClarityValue) -> Self {
        ClarityValue::ResponseOk(Box::new(value))
    }

    pub fn err(value: ClarityValue) -> Self {
        ClarityValue::ResponseErr(Box::new(value))
    }

    pub fn tuple<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, ClarityValue)>,
        K: Into<String>,
    {
        ClarityValue::Tuple(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Short name of the value's type, used in decode errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClarityValue::Int(_) => "int",
            ClarityValue::UInt(_) => "uint",
            ClarityValue::Buffer(_) => "buff",
            ClarityValue::Bool(_) => "bool",
            ClarityValue::StandardPrincipal(_) | ClarityValue::ContractPrincipal(..) => {
                "principal"
            }
            ClarityValue::ResponseOk(_) | ClarityValue::ResponseErr(_) => "response",
            ClarityValue::OptionalNone | ClarityValue::OptionalSome(_) => "optional",
            ClarityValue::List(_) => "list",
            ClarityValue::Tuple(_) => "tuple",
            ClarityValue::StringAscii(_) => "string-ascii",
            ClarityValue::StringUtf8(_) => "string-utf8",
        }
    }

    /// Consensus serialization.
    pub fn serialize(&self) -> Result<Vec<u8>, GateError> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Consensus serialization as `0x`-prefixed hex (the API argument format).
    pub fn to_hex(&self) -> Result<String, GateError> {
        Ok(format!("0x{}", alloy::hex::encode(self.serialize()?)))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, GateError> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.read_value(0)?;
        if reader.pos != bytes.len() {
            return Err(GateError::ClarityError(format!(
                "{} trailing bytes after value",
                bytes.len() - reader.pos
            )));
        }
        Ok(value)
    }

    pub fn from_hex(hex: &str) -> Result<Self, GateError> {
        let raw = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = alloy::hex::decode(raw)
            .map_err(|e| GateError::ClarityError(format!("invalid hex: {e}")))?;
        Self::deserialize(&bytes)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<(), GateError> {
        match self {
            ClarityValue::Int(v) => {
                out.push(TYPE_INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::UInt(v) => {
                out.push(TYPE_UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::Buffer(bytes) => {
                out.push(TYPE_BUFFER);
                write_len_prefixed(out, bytes)?;
            }
            ClarityValue::Bool(true) => out.push(TYPE_TRUE),
            ClarityValue::Bool(false) => out.push(TYPE_FALSE),
            ClarityValue::StandardPrincipal(addr) => {
                out.push(TYPE_STANDARD_PRINCIPAL);
                out.push(addr.version());
                out.extend_from_slice(addr.hash160());
            }
            ClarityValue::ContractPrincipal(addr, name) => {
                validate_contract_name(name)?;
                out.push(TYPE_CONTRACT_PRINCIPAL);
                out.push(addr.version());
                out.extend_from_slice(addr.hash160());
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
            ClarityValue::ResponseOk(inner) => {
                out.push(TYPE_RESPONSE_OK);
                inner.write_to(out)?;
            }
            ClarityValue::ResponseErr(inner) => {
                out.push(TYPE_RESPONSE_ERR);
                inner.write_to(out)?;
            }
            ClarityValue::OptionalNone => out.push(TYPE_OPTIONAL_NONE),
            ClarityValue::OptionalSome(inner) => {
                out.push(TYPE_OPTIONAL_SOME);
                inner.write_to(out)?;
            }
            ClarityValue::List(items) => {
                out.push(TYPE_LIST);
                out.extend_from_slice(&length_u32(items.len())?.to_be_bytes());
                for item in items {
                    item.write_to(out)?;
                }
            }
            ClarityValue::Tuple(fields) => {
                out.push(TYPE_TUPLE);
                out.extend_from_slice(&length_u32(fields.len())?.to_be_bytes());
                // BTreeMap iterates in key order, which is the canonical field order.
                for (name, value) in fields {
                    if name.is_empty() || name.len() > 128 {
                        return Err(GateError::ClarityError(format!(
                            "invalid tuple key '{name}'"
                        )));
                    }
                    out.push(name.len() as u8);
                    out.extend_from_slice(name.as_bytes());
                    value.write_to(out)?;
                }
            }
            ClarityValue::StringAscii(s) => {
                if !s.is_ascii() {
                    return Err(GateError::ClarityError(
                        "string-ascii value contains non-ASCII characters".to_string(),
                    ));
                }
                out.push(TYPE_STRING_ASCII);
                write_len_prefixed(out, s.as_bytes())?;
            }
            ClarityValue::StringUtf8(s) => {
                out.push(TYPE_STRING_UTF8);
                write_len_prefixed(out, s.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Clarity literal syntax, e.g. `u1`, `u"name"`, `'SP...`.
    pub fn repr(&self) -> String {
        match self {
            ClarityValue::Int(v) => v.to_string(),
            ClarityValue::UInt(v) => format!("u{v}"),
            ClarityValue::Buffer(bytes) => format!("0x{}", alloy::hex::encode(bytes)),
            ClarityValue::Bool(b) => b.to_string(),
            ClarityValue::StandardPrincipal(addr) => format!("'{addr}"),
            ClarityValue::ContractPrincipal(addr, name) => format!("'{addr}.{name}"),
            ClarityValue::ResponseOk(inner) => format!("(ok {})", inner.repr()),
            ClarityValue::ResponseErr(inner) => format!("(err {})", inner.repr()),
            ClarityValue::OptionalNone => "none".to_string(),
            ClarityValue::OptionalSome(inner) => format!("(some {})", inner.repr()),
            ClarityValue::List(items) => {
                let mut s = String::from("(list");
                for item in items {
                    let _ = write!(s, " {}", item.repr());
                }
                s.push(')');
                s
            }
            ClarityValue::Tuple(fields) => {
                let mut s = String::from("(tuple");
                for (name, value) in fields {
                    let _ = write!(s, " ({name} {})", value.repr());
                }
                s.push(')');
                s
            }
            ClarityValue::StringAscii(v) => format!("\"{}\"", escape(v)),
            ClarityValue::StringUtf8(v) => format!("u\"{}\"", escape(v)),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn length_u32(len: usize) -> Result<u32, GateError> {
    u32::try_from(len).map_err(|_| GateError::ClarityError(format!("length {len} exceeds u32")))
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), GateError> {
    out.extend_from_slice(&length_u32(bytes.len())?.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

/// Clarity contract names: a letter, then letters, digits, `-` or `_`, at most 128 bytes.
pub fn validate_contract_name(name: &str) -> Result<(), GateError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name.as_bytes()[0].is_ascii_alphabetic()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(GateError::ClarityError(format!(
            "invalid contract name '{name}'"
        )))
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], GateError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                GateError::ClarityError(format!(
                    "unexpected end of input: need {n} bytes at offset {}",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, GateError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, GateError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_16(&mut self) -> Result<[u8; 16], GateError> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn read_len_prefixed(&mut self) -> Result<&'a [u8], GateError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    fn read_address(&mut self) -> Result<StacksAddress, GateError> {
        let version = self.read_u8()?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(self.take(20)?);
        StacksAddress::new(version, hash).map_err(|e| GateError::ClarityError(e.to_string()))
    }

    fn read_name(&mut self) -> Result<String, GateError> {
        let len = usize::from(self.read_u8()?);
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|_| GateError::ClarityError("name is not valid UTF-8".to_string()))
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue, GateError> {
        if depth > MAX_DEPTH {
            return Err(GateError::ClarityError(format!(
                "value nesting exceeds {MAX_DEPTH}"
            )));
        }

        let type_id = self.read_u8()?;
        let value = match type_id {
            TYPE_INT => ClarityValue::Int(i128::from_be_bytes(self.read_16()?)),
            TYPE_UINT => ClarityValue::UInt(u128::from_be_bytes(self.read_16()?)),
            TYPE_BUFFER => ClarityValue::Buffer(self.read_len_prefixed()?.to_vec()),
            TYPE_TRUE => ClarityValue::Bool(true),
            TYPE_FALSE => ClarityValue::Bool(false),
            TYPE_STANDARD_PRINCIPAL => ClarityValue::StandardPrincipal(self.read_address()?),
            TYPE_CONTRACT_PRINCIPAL => {
                let addr = self.read_address()?;
                let name = self.read_name()?;
                ClarityValue::ContractPrincipal(addr, name)
            }
            TYPE_RESPONSE_OK => ClarityValue::ResponseOk(Box::new(self.read_value(depth + 1)?)),
            TYPE_RESPONSE_ERR => ClarityValue::ResponseErr(Box::new(self.read_value(depth + 1)?)),
            TYPE_OPTIONAL_NONE => ClarityValue::OptionalNone,
            TYPE_OPTIONAL_SOME => {
                ClarityValue::OptionalSome(Box::new(self.read_value(depth + 1)?))
            }
            TYPE_LIST => {
                let count = self.read_u32()? as usize;
                // Every element is at least one byte; reject counts the input cannot hold.
                if count > self.bytes.len() - self.pos {
                    return Err(GateError::ClarityError(format!(
                        "list length {count} exceeds remaining input"
                    )));
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            TYPE_TUPLE => {
                let count = self.read_u32()? as usize;
                let mut fields = BTreeMap::new();
                for _ in 0..count {
                    let name = self.read_name()?;
                    let value = self.read_value(depth + 1)?;
                    if fields.insert(name.clone(), value).is_some() {
                        return Err(GateError::ClarityError(format!(
                            "duplicate tuple key '{name}'"
                        )));
                    }
                }
                ClarityValue::Tuple(fields)
            }
            TYPE_STRING_ASCII => {
                let raw = self.read_len_prefixed()?;
                if !raw.is_ascii() {
                    return Err(GateError::ClarityError(
                        "string-ascii contains non-ASCII bytes".to_string(),
                    ));
                }
                ClarityValue::StringAscii(String::from_utf8_lossy(raw).into_owned())
            }
            TYPE_STRING_UTF8 => {
                let raw = self.read_len_prefixed()?;
                let s = String::from_utf8(raw.to_vec()).map_err(|_| {
                    GateError::ClarityError("string-utf8 is not valid UTF-8".to_string())
                })?;
                ClarityValue::StringUtf8(s)
            }
            other => {
                return Err(GateError::ClarityError(format!(
                    "unknown type id 0x{other:02x}"
                )))
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_encoding() {
        assert_eq!(
            ClarityValue::uint(1).to_hex().unwrap(),
            "0x0100000000000000000000000000000001"
        );
    }

    #[test]
    fn test_string_ascii_encoding() {
        let v = ClarityValue::string_ascii("hi").unwrap();
        assert_eq!(v.serialize().unwrap(), vec![0x0d, 0, 0, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_string_ascii_rejects_unicode() {
        assert!(ClarityValue::string_ascii("héllo").is_err());
    }

    #[test]
    fn test_tuple_keys_are_sorted() {
        let v = ClarityValue::tuple([
            ("version", ClarityValue::uint(2)),
            ("chain-id", ClarityValue::uint(1)),
        ]);
        let bytes = v.serialize().unwrap();
        assert_eq!(&bytes[..5], &[0x0c, 0, 0, 0, 2]);
        assert_eq!(bytes[5], 8);
        assert_eq!(&bytes[6..14], b"chain-id");
    }

    #[test]
    fn test_principal_encoding() {
        let v = ClarityValue::principal("ST000000000000000000002AMW42H").unwrap();
        let bytes = v.serialize().unwrap();
        assert_eq!(bytes.len(), 22);
        assert_eq!(bytes[0], 0x05);
        assert_eq!(bytes[1], 26);
        assert!(bytes[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_contract_principal() {
        let v = ClarityValue::principal("ST000000000000000000002AMW42H.pox-4").unwrap();
        assert_eq!(v.repr(), "'ST000000000000000000002AMW42H.pox-4");
        let decoded = ClarityValue::deserialize(&v.serialize().unwrap()).unwrap();
        assert_eq!(decoded, v);
    }

    #[test]
    fn test_decode_nested_invoice_shape() {
        let v = ClarityValue::some(ClarityValue::tuple([
            ("amount", ClarityValue::uint(1000)),
            ("resourceName", ClarityValue::string_utf8("bitcoin-face")),
            ("hash", ClarityValue::Buffer(vec![0xab; 32])),
        ]));
        let hex = v.to_hex().unwrap();
        assert_eq!(ClarityValue::from_hex(&hex).unwrap(), v);
    }

    #[test]
    fn test_decode_none() {
        assert_eq!(
            ClarityValue::from_hex("0x09").unwrap(),
            ClarityValue::OptionalNone
        );
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let err = ClarityValue::from_hex("0x42").unwrap_err();
        assert!(err.to_string().contains("unknown type id 0x42"));
    }

    #[test]
    fn test_decode_truncated_fails() {
        assert!(ClarityValue::from_hex("0x01000000").is_err());
        assert!(ClarityValue::from_hex("0x0a").is_err());
    }

    #[test]
    fn test_decode_trailing_bytes_fails() {
        let err = ClarityValue::from_hex("0x0909").unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_decode_depth_limit() {
        let mut hex = "0a".repeat(MAX_DEPTH + 2);
        hex.push_str("09");
        assert!(ClarityValue::from_hex(&hex).is_err());
    }

    #[test]
    fn test_decode_huge_list_count_fails() {
        assert!(ClarityValue::from_hex("0x0bffffffff").is_err());
    }

    #[test]
    fn test_repr() {
        assert_eq!(ClarityValue::uint(7).repr(), "u7");
        assert_eq!(ClarityValue::Int(-3).repr(), "-3");
        assert_eq!(
            ClarityValue::string_utf8("bitcoin-face").repr(),
            "u\"bitcoin-face\""
        );
        assert_eq!(ClarityValue::OptionalNone.repr(), "none");
        assert_eq!(
            ClarityValue::ok(ClarityValue::Bool(true)).repr(),
            "(ok true)"
        );
        assert_eq!(
            ClarityValue::tuple([("a", ClarityValue::uint(1))]).repr(),
            "(tuple (a u1))"
        );
    }
}
