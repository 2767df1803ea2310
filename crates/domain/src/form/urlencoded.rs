//! `application/x-www-form-urlencoded` body parser.

use super::FieldValues;
use crate::error::FormError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Name,
    Value { target: Option<usize> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    Idle,
    /// Saw `%`.
    Percent,
    /// Saw `%` and the high nibble.
    High(u8),
}

/// What a raw byte turned into once the escape state has seen it.
enum Step {
    /// Not part of an escape sequence.
    Raw,
    /// Swallowed by an unfinished escape sequence.
    Pending,
    /// Completed a `%XY` escape.
    Decoded(u8),
}

/// Byte-at-a-time parser whose whole state survives chunk boundaries.
pub(super) struct UrlEncodedParser {
    part: Part,
    escape: Escape,
    name: Vec<u8>,
    name_limit: usize,
    name_overflow: bool,
}

impl UrlEncodedParser {
    pub(super) fn new(name_limit: usize) -> Result<Self, FormError> {
        let mut name = Vec::new();
        name.try_reserve_exact(name_limit)
            .map_err(|_| FormError::Allocation)?;
        Ok(Self {
            part: Part::Name,
            escape: Escape::Idle,
            name,
            name_limit,
            name_overflow: false,
        })
    }

    pub(super) fn feed(&mut self, chunk: &[u8], values: &mut FieldValues) -> Result<(), FormError> {
        for &byte in chunk {
            match self.unescape(byte)? {
                Step::Pending => continue,
                Step::Decoded(decoded) => {
                    self.push_decoded(decoded, values)?;
                    continue;
                }
                Step::Raw => {}
            }
            match (byte, self.part) {
                (b'&', Part::Name) => {
                    // A bare name without `=` counts as present with an empty value.
                    self.resolve_name(values);
                    self.reset();
                }
                (b'&', Part::Value { .. }) => self.reset(),
                (b'=', Part::Name) => {
                    let target = self.resolve_name(values);
                    self.part = Part::Value { target };
                }
                (b'%', _) => self.escape = Escape::Percent,
                (b'+', _) => self.push_decoded(b' ', values)?,
                _ => self.push_decoded(byte, values)?,
            }
        }
        Ok(())
    }

    pub(super) fn finish(&mut self, values: &mut FieldValues) -> Result<(), FormError> {
        if self.escape != Escape::Idle {
            return Err(FormError::MalformedEscape);
        }
        if self.part == Part::Name {
            self.resolve_name(values);
        }
        self.reset();
        Ok(())
    }

    fn unescape(&mut self, byte: u8) -> Result<Step, FormError> {
        match self.escape {
            Escape::Idle => Ok(Step::Raw),
            Escape::Percent => {
                self.escape = Escape::High(hex_value(byte)?);
                Ok(Step::Pending)
            }
            Escape::High(high) => {
                self.escape = Escape::Idle;
                Ok(Step::Decoded((high << 4) | hex_value(byte)?))
            }
        }
    }

    fn push_decoded(&mut self, byte: u8, values: &mut FieldValues) -> Result<(), FormError> {
        match self.part {
            Part::Name => {
                if self.name.len() < self.name_limit {
                    self.name.push(byte);
                } else {
                    self.name_overflow = true;
                }
                Ok(())
            }
            Part::Value {
                target: Some(index),
            } => values.extend(index, &[byte]),
            Part::Value { target: None } => Ok(()),
        }
    }

    fn resolve_name(&mut self, values: &mut FieldValues) -> Option<usize> {
        if self.name_overflow || self.name.is_empty() {
            return None;
        }
        let index = values.index_of(&self.name)?;
        values.start(index);
        Some(index)
    }

    fn reset(&mut self) {
        self.part = Part::Name;
        self.name.clear();
        self.name_overflow = false;
    }
}

fn hex_value(byte: u8) -> Result<u8, FormError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(FormError::MalformedEscape),
    }
}
