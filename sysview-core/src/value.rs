//! Property value buffers and typed values.
//!
//! Character data of one `sv:value` element accumulates in a [`ValueBuffer`].
//! When the element ends the buffer is finished into a read-only
//! [`TextValue`], which is what identity extraction and the importer see.
//!
//! Binary values spill to a temporary file so that large payloads never sit
//! in memory. Both variants share one contract: append while open, retrieve
//! once finished, dispose exactly once. Dropping a buffer without disposing
//! it still removes its spill file.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use base64::engine::general_purpose::{GeneralPurpose, STANDARD};
use base64::read::DecoderReader;
use base64::Engine as _;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ImportConfig;
use crate::name::{NameError, NameResolver, QName};
use crate::property::PropertyType;

// ============================================================================
// ValueBuffer (open, appendable)
// ============================================================================

/// An open value buffer.
#[derive(Debug)]
pub enum ValueBuffer {
    /// Growable in-memory text.
    Inline(String),
    /// Text written through to a temporary file.
    Spilled(SpillWriter),
}

/// Write side of a spilled value.
#[derive(Debug)]
pub struct SpillWriter {
    file: BufWriter<NamedTempFile>,
    len: u64,
}

impl ValueBuffer {
    /// In-memory buffer with the given initial capacity.
    pub fn inline(capacity: usize) -> Self {
        ValueBuffer::Inline(String::with_capacity(capacity))
    }

    /// Buffer backed by a fresh temporary file.
    pub fn spilled(config: &ImportConfig) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("sysview-").suffix(".value");
        let file = match config.spill_dir() {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        debug!(path = %file.path().display(), "spilling value to temporary file");
        Ok(ValueBuffer::Spilled(SpillWriter {
            file: BufWriter::with_capacity(config.spill_write_buffer, file),
            len: 0,
        }))
    }

    /// Pick the variant for a declared property type: binary spills,
    /// everything else stays inline.
    pub fn for_type(ty: PropertyType, config: &ImportConfig) -> io::Result<Self> {
        if ty.is_binary() {
            Self::spilled(config)
        } else {
            Ok(Self::inline(config.inline_capacity))
        }
    }

    /// Append a chunk of character data.
    pub fn append(&mut self, chunk: &str) -> io::Result<()> {
        match self {
            ValueBuffer::Inline(text) => {
                text.push_str(chunk);
                Ok(())
            }
            ValueBuffer::Spilled(writer) => {
                writer.file.write_all(chunk.as_bytes())?;
                writer.len += chunk.len() as u64;
                Ok(())
            }
        }
    }

    /// Bytes appended so far.
    pub fn len(&self) -> u64 {
        match self {
            ValueBuffer::Inline(text) => text.len() as u64,
            ValueBuffer::Spilled(writer) => writer.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self, ValueBuffer::Spilled(_))
    }

    /// Close the buffer for appends.
    pub fn finish(self) -> io::Result<TextValue> {
        match self {
            ValueBuffer::Inline(text) => Ok(TextValue::Inline(text)),
            ValueBuffer::Spilled(writer) => {
                let file = writer.file.into_inner().map_err(io::IntoInnerError::into_error)?;
                Ok(TextValue::Spilled(SpilledText {
                    file,
                    len: writer.len,
                }))
            }
        }
    }

    /// Release an abandoned buffer without finishing it.
    pub fn dispose(self) -> io::Result<()> {
        match self {
            ValueBuffer::Inline(_) => Ok(()),
            ValueBuffer::Spilled(writer) => {
                let (file, _) = writer.file.into_parts();
                file.close()
            }
        }
    }
}

// ============================================================================
// TextValue (finished, readable)
// ============================================================================

/// A finished value, as handed to identity extraction and the importer.
#[derive(Debug)]
pub enum TextValue {
    Inline(String),
    Spilled(SpilledText),
}

/// Read side of a spilled value.
#[derive(Debug)]
pub struct SpilledText {
    file: NamedTempFile,
    len: u64,
}

impl TextValue {
    /// The complete content as text.
    ///
    /// Spilled values are read back from disk on every call.
    pub fn retrieve(&self) -> io::Result<Cow<'_, str>> {
        match self {
            TextValue::Inline(text) => Ok(Cow::Borrowed(text.as_str())),
            TextValue::Spilled(spilled) => {
                let mut text = String::with_capacity(spilled.len as usize);
                spilled.file.reopen()?.read_to_string(&mut text)?;
                Ok(Cow::Owned(text))
            }
        }
    }

    /// Stream the content without materializing it.
    pub fn reader(&self) -> io::Result<ValueReader<'_>> {
        match self {
            TextValue::Inline(text) => Ok(ValueReader::Inline(Cursor::new(text.as_bytes()))),
            TextValue::Spilled(spilled) => {
                Ok(ValueReader::Spilled(BufReader::new(spilled.file.reopen()?)))
            }
        }
    }

    /// Stream the base64-decoded bytes of a binary value.
    pub fn binary_reader(
        &self,
    ) -> io::Result<DecoderReader<'static, GeneralPurpose, ValueReader<'_>>> {
        Ok(DecoderReader::new(self.reader()?, &STANDARD))
    }

    /// Convert to a typed value.
    pub fn to_value(
        &self,
        ty: PropertyType,
        resolver: &dyn NameResolver,
    ) -> Result<Value, ValueError> {
        if ty.is_binary() {
            let mut bytes = Vec::with_capacity((self.len() / 4 * 3) as usize);
            self.binary_reader()?.read_to_end(&mut bytes)?;
            return Ok(Value::Binary(bytes));
        }
        let text = self.retrieve()?;
        Value::parse(&text, ty, resolver)
    }

    /// Content length in bytes.
    pub fn len(&self) -> u64 {
        match self {
            TextValue::Inline(text) => text.len() as u64,
            TextValue::Spilled(spilled) => spilled.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self, TextValue::Spilled(_))
    }

    /// Location of the spill file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            TextValue::Inline(_) => None,
            TextValue::Spilled(spilled) => Some(spilled.file.path()),
        }
    }

    /// Release backing storage.
    pub fn dispose(self) -> io::Result<()> {
        match self {
            TextValue::Inline(_) => Ok(()),
            TextValue::Spilled(spilled) => spilled.file.close(),
        }
    }
}

impl From<String> for TextValue {
    fn from(text: String) -> Self {
        TextValue::Inline(text)
    }
}

impl From<&str> for TextValue {
    fn from(text: &str) -> Self {
        TextValue::Inline(text.to_owned())
    }
}

/// Reader over a [`TextValue`].
#[derive(Debug)]
pub enum ValueReader<'a> {
    Inline(Cursor<&'a [u8]>),
    Spilled(BufReader<File>),
}

impl Read for ValueReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ValueReader::Inline(cursor) => cursor.read(buf),
            ValueReader::Spilled(reader) => reader.read(buf),
        }
    }
}

/// Dispose every value, logging failures instead of stopping at the first.
pub(crate) fn dispose_all<I>(values: I)
where
    I: IntoIterator<Item = TextValue>,
{
    for value in values {
        if let Err(err) = value.dispose() {
            warn!(error = %err, "failed to release spilled value");
        }
    }
}

// ============================================================================
// Value (typed)
// ============================================================================

/// Failure converting text to a typed value.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid {ty} value: {text:?}")]
    Invalid { ty: PropertyType, text: String },

    #[error(transparent)]
    Name(#[from] NameError),

    #[error("invalid base64 in binary value: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A property value converted according to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Binary(Vec<u8>),
    Long(i64),
    Double(f64),
    /// Kept as text; validation is left to the importer.
    Date(String),
    Boolean(bool),
    Name(QName),
    Path(String),
    Reference(String),
}

impl Value {
    /// Parse text as `ty`. `Undefined` is treated as `String`.
    pub fn parse(
        text: &str,
        ty: PropertyType,
        resolver: &dyn NameResolver,
    ) -> Result<Value, ValueError> {
        match ty {
            PropertyType::Undefined | PropertyType::String => Ok(Value::String(text.to_owned())),
            PropertyType::Binary => Ok(Value::Binary(STANDARD.decode(text)?)),
            PropertyType::Long => text
                .parse()
                .map(Value::Long)
                .map_err(|_| invalid(ty, text)),
            PropertyType::Double => text
                .parse()
                .map(Value::Double)
                .map_err(|_| invalid(ty, text)),
            PropertyType::Date => Ok(Value::Date(text.to_owned())),
            // Anything but a case-insensitive "true" is false
            PropertyType::Boolean => Ok(Value::Boolean(text.eq_ignore_ascii_case("true"))),
            PropertyType::Name => Ok(Value::Name(resolver.resolve(text)?)),
            PropertyType::Path => Ok(Value::Path(text.to_owned())),
            PropertyType::Reference => Ok(Value::Reference(text.to_owned())),
        }
    }

    /// The type this value carries.
    pub fn property_type(&self) -> PropertyType {
        match self {
            Value::String(_) => PropertyType::String,
            Value::Binary(_) => PropertyType::Binary,
            Value::Long(_) => PropertyType::Long,
            Value::Double(_) => PropertyType::Double,
            Value::Date(_) => PropertyType::Date,
            Value::Boolean(_) => PropertyType::Boolean,
            Value::Name(_) => PropertyType::Name,
            Value::Path(_) => PropertyType::Path,
            Value::Reference(_) => PropertyType::Reference,
        }
    }

    /// Try to get as text.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Date(s) | Value::Path(s) | Value::Reference(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Try to get as integer.
    #[inline]
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as float.
    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get as boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as name.
    #[inline]
    pub fn as_name(&self) -> Option<&QName> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Try to get as raw bytes.
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }
}

fn invalid(ty: PropertyType, text: &str) -> ValueError {
    ValueError::Invalid {
        ty,
        text: text.to_owned(),
    }
}
