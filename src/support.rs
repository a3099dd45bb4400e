// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Comparable keys and the wire form of replicated values.
//!
//! The replicated data types never look inside the elements, keys and register values they
//! hold. All they need is:
//!
//! - a wire form ([`SerializedAny`]) to put into deltas, and to read back from deltas,
//! - a [`ComparableKey`] to index values by, such that two logically equal values collide.
//!
//! Both are provided by the [`AnyValue`] trait. The primitive implementations in this module
//! use a fixed-width big-endian encoding under the [`PRIMITIVE_TYPE_URL_PREFIX`], which is
//! deterministic and therefore also a valid comparable key.
use smallvec::SmallVec;
use std::fmt;

/// Type url prefix used for the built-in primitive encodings.
pub const PRIMITIVE_TYPE_URL_PREFIX: &str = "p.akkaserverless.com/";

/// A serialized value tagged with the url of its type.
///
/// This is the form in which every element, key and register value travels inside a
/// [`ReplicatedDataDelta`](crate::ReplicatedDataDelta).
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct SerializedAny {
    pub type_url: String,
    // NOTE: serde_bytes gets us an efficient encoding of byte-arrays for protocols that
    // support it.
    #[cfg_attr(feature = "serde", serde(with = "serde_bytes"))]
    pub value: Vec<u8>,
}

impl SerializedAny {
    pub fn new(type_url: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            type_url: type_url.into(),
            value: value.into(),
        }
    }

    /// Builds a value under the [`PRIMITIVE_TYPE_URL_PREFIX`].
    pub fn primitive(name: &str, value: impl Into<Vec<u8>>) -> Self {
        Self::new(format!("{PRIMITIVE_TYPE_URL_PREFIX}{name}"), value)
    }

    /// Returns the payload if this value has the given type url, and an error otherwise.
    pub fn expect_type(&self, type_url: &str) -> Result<&[u8], SupportError> {
        if self.type_url == type_url {
            Ok(&self.value)
        } else {
            Err(SupportError::TypeMismatch {
                expected: type_url.to_string(),
                found: self.type_url.clone(),
            })
        }
    }
}

impl fmt::Debug for SerializedAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02X?}", self.type_url, self.value)
    }
}

/// A canonical, totally ordered form of a value.
///
/// Two values have equal comparable keys if and only if they are the same logical value. The
/// replicated data types use this as the internal index of their maps and sets, and remember
/// the original value alongside it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(::serde::Deserialize, ::serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ComparableKey {
    type_url: String,
    // most keys are short strings or fixed-width integers, so keep them inline.
    bytes: SmallVec<[u8; 16]>,
}

impl ComparableKey {
    pub fn new(type_url: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            type_url: type_url.into(),
            bytes: SmallVec::from_slice(bytes),
        }
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<SerializedAny> for ComparableKey {
    fn from(any: SerializedAny) -> Self {
        Self {
            type_url: any.type_url,
            bytes: SmallVec::from_vec(any.value),
        }
    }
}

impl From<&SerializedAny> for ComparableKey {
    fn from(any: &SerializedAny) -> Self {
        Self::new(any.type_url.clone(), &any.value)
    }
}

impl fmt::Debug for ComparableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02X?}", self.type_url, self.bytes.as_slice())
    }
}

/// Renders the key for diagnostics: the last segment of the type url, followed by the payload
/// as text if it is printable UTF-8 and as hex otherwise.
impl fmt::Display for ComparableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .type_url
            .rsplit_once('/')
            .map_or(self.type_url.as_str(), |(_, kind)| kind);
        match std::str::from_utf8(&self.bytes) {
            Ok(s) if !s.chars().any(char::is_control) => write!(f, "{kind}:{s:?}"),
            _ => {
                write!(f, "{kind}:0x")?;
                for b in &self.bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Error returned when a [`SerializedAny`] cannot be turned back into a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportError {
    /// The value carries a different type url than the one being decoded.
    TypeMismatch { expected: String, found: String },
    /// The payload does not hold a valid encoding of the type.
    Malformed {
        type_url: String,
        reason: &'static str,
    },
    /// The payload is not valid JSON for the type.
    Json(String),
}

impl fmt::Display for SupportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportError::TypeMismatch { expected, found } => {
                write!(f, "expected a value of type {expected}, found {found}")
            }
            SupportError::Malformed { type_url, reason } => {
                write!(f, "malformed value of type {type_url}: {reason}")
            }
            SupportError::Json(e) => write!(f, "invalid json value: {e}"),
        }
    }
}

impl std::error::Error for SupportError {}

/// A value that can be held by a replicated data type.
///
/// Implementations must be deterministic: serializing the same logical value twice has to
/// produce the same [`SerializedAny`]. The default [`AnyValue::to_comparable`] relies on this.
pub trait AnyValue: Clone {
    /// Turns the value into its wire form.
    fn serialize(&self) -> SerializedAny;

    /// Reads a value back from its wire form.
    fn deserialize(any: &SerializedAny) -> Result<Self, SupportError>;

    /// Derives the key under which this value is indexed.
    fn to_comparable(&self) -> ComparableKey {
        ComparableKey::from(self.serialize())
    }
}

/// Values that are already serialized are their own wire form.
impl AnyValue for SerializedAny {
    fn serialize(&self) -> SerializedAny {
        self.clone()
    }

    fn deserialize(any: &SerializedAny) -> Result<Self, SupportError> {
        Ok(any.clone())
    }

    fn to_comparable(&self) -> ComparableKey {
        ComparableKey::from(self)
    }
}

fn primitive_type_url(name: &str) -> String {
    format!("{PRIMITIVE_TYPE_URL_PREFIX}{name}")
}

impl AnyValue for String {
    fn serialize(&self) -> SerializedAny {
        SerializedAny::primitive("string", self.as_bytes())
    }

    fn deserialize(any: &SerializedAny) -> Result<Self, SupportError> {
        let bytes = any.expect_type(&primitive_type_url("string"))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SupportError::Malformed {
            type_url: any.type_url.clone(),
            reason: "string is not valid utf-8",
        })
    }

    fn to_comparable(&self) -> ComparableKey {
        ComparableKey::new(primitive_type_url("string"), self.as_bytes())
    }
}

impl AnyValue for Vec<u8> {
    fn serialize(&self) -> SerializedAny {
        SerializedAny::primitive("bytes", self.as_slice())
    }

    fn deserialize(any: &SerializedAny) -> Result<Self, SupportError> {
        Ok(any.expect_type(&primitive_type_url("bytes"))?.to_vec())
    }
}

impl AnyValue for bool {
    fn serialize(&self) -> SerializedAny {
        SerializedAny::primitive("bool", [u8::from(*self)])
    }

    fn deserialize(any: &SerializedAny) -> Result<Self, SupportError> {
        match any.expect_type(&primitive_type_url("bool"))? {
            [0] => Ok(false),
            [1] => Ok(true),
            _ => Err(SupportError::Malformed {
                type_url: any.type_url.clone(),
                reason: "bool must be a single 0 or 1 byte",
            }),
        }
    }
}

macro_rules! impl_fixed_width {
    ($($t:ty => $name:literal),* $(,)?) => {
        $(
            impl AnyValue for $t {
                fn serialize(&self) -> SerializedAny {
                    SerializedAny::primitive($name, self.to_be_bytes())
                }

                fn deserialize(any: &SerializedAny) -> Result<Self, SupportError> {
                    let bytes = any.expect_type(&primitive_type_url($name))?;
                    let bytes = bytes.try_into().map_err(|_| SupportError::Malformed {
                        type_url: any.type_url.clone(),
                        reason: "unexpected payload length",
                    })?;
                    Ok(<$t>::from_be_bytes(bytes))
                }
            }
        )*
    };
}

// NOTE: f64 keys compare by bit pattern, so 0.0 and -0.0 are distinct keys.
impl_fixed_width!(
    i32 => "int32",
    i64 => "int64",
    u32 => "uint32",
    u64 => "uint64",
    f64 => "double",
);
