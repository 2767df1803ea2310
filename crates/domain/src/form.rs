//! Incremental form decoding.
//!
//! A [`FormDecoder`] turns a POST body delivered in arbitrary chunks into a
//! fixed set of named text fields. The recognised names are given up front;
//! their order defines the field index. Unknown fields are skipped, file
//! uploads are never stored, and each recognised value is bounded by a
//! per-field byte budget.
//!
//! ```
//! use hpapower_domain::form::{FormDecoder, FormEncoding};
//!
//! let mut decoder = FormDecoder::new(&["state"], 1024, FormEncoding::UrlEncoded).unwrap();
//! decoder.feed(b"sta").unwrap();
//! decoder.feed(b"te=o").unwrap();
//! decoder.feed(b"n").unwrap();
//! decoder.finalize().unwrap();
//!
//! let field = decoder.get("state").unwrap();
//! assert_eq!(field.value, "on");
//! assert_eq!(field.len(), 2);
//! ```

mod multipart;
mod urlencoded;

use crate::error::FormError;

use multipart::MultipartParser;
use urlencoded::UrlEncodedParser;

/// Default per-field byte budget.
pub const DEFAULT_MAX_FIELD_LEN: usize = 1024;

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";
const MAX_BOUNDARY_LEN: usize = 70;

/// Wire encoding of a form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEncoding {
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// `multipart/form-data` with the given boundary.
    Multipart { boundary: String },
}

impl FormEncoding {
    /// Derive the encoding from a request `Content-Type` header value.
    ///
    /// A missing header is treated as url-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnsupportedContentType`] for any other media
    /// type and [`FormError::InvalidBoundary`] for a multipart type without
    /// a boundary of 1 to 70 bytes.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self, FormError> {
        let Some(content_type) = content_type else {
            return Ok(Self::UrlEncoded);
        };

        let mut params = content_type.split(';');
        let media_type = params.next().unwrap_or_default().trim();

        if media_type.eq_ignore_ascii_case(URLENCODED) {
            return Ok(Self::UrlEncoded);
        }
        if !media_type.eq_ignore_ascii_case(MULTIPART) {
            return Err(FormError::UnsupportedContentType(media_type.to_string()));
        }

        let boundary = params
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
            .map(|(_, value)| unquote(value.trim()))
            .ok_or(FormError::InvalidBoundary)?;

        if boundary.is_empty() || boundary.len() > MAX_BOUNDARY_LEN {
            return Err(FormError::InvalidBoundary);
        }

        Ok(Self::Multipart {
            boundary: boundary.to_string(),
        })
    }
}

pub(crate) fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// A decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// One of the recognised names.
    pub name: &'static str,
    /// Decoded value. May be empty when the field was present without a value.
    pub value: &'a str,
}

impl Field<'_> {
    /// Length of the decoded value in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the field was submitted with an empty value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Raw values of the recognised fields, bounded by the per-field budget.
#[derive(Default)]
struct FieldValues {
    names: &'static [&'static str],
    max_len: usize,
    raw: Vec<Option<Vec<u8>>>,
}

impl FieldValues {
    fn new(names: &'static [&'static str], max_len: usize) -> Result<Self, FormError> {
        let mut raw = Vec::new();
        raw.try_reserve_exact(names.len())
            .map_err(|_| FormError::Allocation)?;
        raw.resize_with(names.len(), || None);
        Ok(Self {
            names,
            max_len,
            raw,
        })
    }

    fn index_of(&self, name: &[u8]) -> Option<usize> {
        self.names.iter().position(|known| known.as_bytes() == name)
    }

    fn longest_name(&self) -> usize {
        self.names.iter().map(|n| n.len()).max().unwrap_or(0)
    }

    /// Mark the field as present, discarding any earlier occurrence.
    fn start(&mut self, index: usize) {
        self.raw[index] = Some(Vec::new());
    }

    fn extend(&mut self, index: usize, bytes: &[u8]) -> Result<(), FormError> {
        let limit = self.max_len;
        let field = self.names[index];
        let value = self.raw[index].get_or_insert_with(Vec::new);
        if value.len() + bytes.len() > limit {
            return Err(FormError::FieldTooLong { field, limit });
        }
        value
            .try_reserve(bytes.len())
            .map_err(|_| FormError::Allocation)?;
        value.extend_from_slice(bytes);
        Ok(())
    }

    fn into_text(self) -> Result<Vec<Option<String>>, FormError> {
        let names = self.names;
        self.raw
            .into_iter()
            .zip(names)
            .map(|(value, field)| {
                value
                    .map(|bytes| {
                        String::from_utf8(bytes).map_err(|_| FormError::InvalidUtf8 { field })
                    })
                    .transpose()
            })
            .collect()
    }
}

enum Parser {
    UrlEncoded(UrlEncodedParser),
    Multipart(MultipartParser),
}

enum Stage {
    Feeding(FieldValues),
    Finalized(Vec<Option<String>>),
}

/// Incremental decoder for a single form body.
pub struct FormDecoder {
    names: &'static [&'static str],
    parser: Parser,
    stage: Stage,
}

impl std::fmt::Debug for FormDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDecoder")
            .field("names", &self.names)
            .field("finalized", &self.is_finalized())
            .finish_non_exhaustive()
    }
}

impl FormDecoder {
    /// Create a decoder recognising `names`, each bounded by `max_field_len`
    /// decoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Allocation`] if the working buffers cannot be
    /// reserved.
    pub fn new(
        names: &'static [&'static str],
        max_field_len: usize,
        encoding: FormEncoding,
    ) -> Result<Self, FormError> {
        let values = FieldValues::new(names, max_field_len)?;
        let parser = match encoding {
            FormEncoding::UrlEncoded => {
                Parser::UrlEncoded(UrlEncodedParser::new(values.longest_name())?)
            }
            FormEncoding::Multipart { boundary } => {
                Parser::Multipart(MultipartParser::new(&boundary)?)
            }
        };
        Ok(Self {
            names,
            parser,
            stage: Stage::Feeding(values),
        })
    }

    /// Consume the next chunk of the body.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding is malformed, a recognised field
    /// exceeds its budget, or the decoder was already finalized.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), FormError> {
        let Stage::Feeding(values) = &mut self.stage else {
            return Err(FormError::AlreadyFinalized);
        };
        match &mut self.parser {
            Parser::UrlEncoded(parser) => parser.feed(chunk, values),
            Parser::Multipart(parser) => parser.feed(chunk, values),
        }
    }

    /// Signal the end of the body and make the decoded values available.
    ///
    /// # Errors
    ///
    /// Returns an error if the body ended in the middle of an escape or a
    /// multipart part, if a recognised value is not UTF-8, or if the decoder
    /// was already finalized.
    pub fn finalize(&mut self) -> Result<(), FormError> {
        let Stage::Feeding(values) = &mut self.stage else {
            return Err(FormError::AlreadyFinalized);
        };
        match &mut self.parser {
            Parser::UrlEncoded(parser) => parser.finish(values)?,
            Parser::Multipart(parser) => parser.finish()?,
        }

        let values = std::mem::take(values);
        self.stage = Stage::Finalized(values.into_text()?);
        Ok(())
    }

    /// Whether [`finalize`](Self::finalize) completed successfully.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(self.stage, Stage::Finalized(_))
    }

    /// Look up a field by name.
    ///
    /// Returns `None` before finalization, for unknown names, and for
    /// fields absent from the body.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Field<'_>> {
        let index = self.names.iter().position(|known| *known == name)?;
        self.get_by_index(index)
    }

    /// Look up a field by its index in the recognised name list.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<Field<'_>> {
        let Stage::Finalized(values) = &self.stage else {
            return None;
        };
        let value = values.get(index)?.as_deref()?;
        Some(Field {
            name: self.names[index],
            value,
        })
    }
}
