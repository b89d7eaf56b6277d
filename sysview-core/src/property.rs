//! Property type tags and the reserved identity properties.

use std::fmt;

use phf::phf_map;

use crate::name::{QName, NS_JCR_URI};

/// Declared type of a property, as carried by `sv:type`.
///
/// Discriminants follow the repository's numeric type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropertyType {
    Undefined = 0,
    String = 1,
    Binary = 2,
    Long = 3,
    Double = 4,
    Date = 5,
    Boolean = 6,
    Name = 7,
    Path = 8,
    Reference = 9,
}

/// `sv:type` tokens. Case-sensitive.
static TYPE_NAMES: phf::Map<&'static str, PropertyType> = phf_map! {
    "undefined" => PropertyType::Undefined,
    "String" => PropertyType::String,
    "Binary" => PropertyType::Binary,
    "Long" => PropertyType::Long,
    "Double" => PropertyType::Double,
    "Date" => PropertyType::Date,
    "Boolean" => PropertyType::Boolean,
    "Name" => PropertyType::Name,
    "Path" => PropertyType::Path,
    "Reference" => PropertyType::Reference,
};

impl PropertyType {
    /// Look up an `sv:type` token.
    pub fn from_name(token: &str) -> Option<Self> {
        TYPE_NAMES.get(token).copied()
    }

    /// The `sv:type` token for this type.
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Long => "Long",
            Self::Double => "Double",
            Self::Date => "Date",
            Self::Boolean => "Boolean",
            Self::Name => "Name",
            Self::Path => "Path",
            Self::Reference => "Reference",
        }
    }

    /// Numeric type code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Binary values are spilled to temporary storage.
    #[inline]
    pub fn is_binary(self) -> bool {
        self == Self::Binary
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Properties extracted into node identity instead of being imported as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reserved {
    /// `jcr:primaryType`
    PrimaryType,
    /// `jcr:mixinTypes`
    MixinTypes,
    /// `jcr:uuid`
    Identifier,
}

static RESERVED: phf::Map<&'static str, Reserved> = phf_map! {
    "primaryType" => Reserved::PrimaryType,
    "mixinTypes" => Reserved::MixinTypes,
    "uuid" => Reserved::Identifier,
};

impl Reserved {
    pub(crate) fn classify(name: &QName) -> Option<Self> {
        if name.namespace() != NS_JCR_URI {
            return None;
        }
        RESERVED.get(name.local_name()).copied()
    }
}
