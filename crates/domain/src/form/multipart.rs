//! `multipart/form-data` body parser.
//!
//! Works on a small carry buffer: bytes that might be the start of a
//! delimiter are kept until the next chunk decides, everything else is
//! routed to the current part as soon as it arrives.

use super::{FieldValues, unquote};
use crate::error::FormError;

/// Budget for the header block of a single part.
pub(super) const MAX_PART_HEADERS: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first delimiter; content is discarded.
    Preamble,
    /// Right after a delimiter, waiting for `\r\n` or the closing `--`.
    AfterDelimiter,
    /// Inside the header block of a part.
    Headers,
    /// Inside the content of a part. `target` is the recognised field, if any.
    Body { target: Option<usize> },
    /// After the closing delimiter; content is discarded.
    Epilogue,
}

pub(super) struct MultipartParser {
    /// `\r\n--<boundary>`.
    delimiter: Vec<u8>,
    buf: Vec<u8>,
    state: State,
}

impl MultipartParser {
    pub(super) fn new(boundary: &str) -> Result<Self, FormError> {
        let mut delimiter = Vec::new();
        delimiter
            .try_reserve_exact(boundary.len() + 4)
            .map_err(|_| FormError::Allocation)?;
        delimiter.extend_from_slice(b"\r\n--");
        delimiter.extend_from_slice(boundary.as_bytes());

        let mut buf = Vec::new();
        buf.try_reserve(MAX_PART_HEADERS)
            .map_err(|_| FormError::Allocation)?;
        // The first delimiter may open the body without a preceding CRLF.
        buf.extend_from_slice(b"\r\n");

        Ok(Self {
            delimiter,
            buf,
            state: State::Preamble,
        })
    }

    pub(super) fn feed(&mut self, chunk: &[u8], values: &mut FieldValues) -> Result<(), FormError> {
        if self.state == State::Epilogue {
            return Ok(());
        }
        self.buf
            .try_reserve(chunk.len())
            .map_err(|_| FormError::Allocation)?;
        self.buf.extend_from_slice(chunk);

        let mut pos = 0;
        loop {
            let rest = &self.buf[pos..];
            match self.state {
                State::Preamble | State::Body { .. } => {
                    let target = match self.state {
                        State::Body { target } => target,
                        _ => None,
                    };
                    if let Some(at) = find(rest, &self.delimiter) {
                        if let Some(index) = target {
                            values.extend(index, &rest[..at])?;
                        }
                        pos += at + self.delimiter.len();
                        self.state = State::AfterDelimiter;
                    } else {
                        // Keep a tail that could still grow into a delimiter.
                        let safe = rest.len().saturating_sub(self.delimiter.len() - 1);
                        if let Some(index) = target {
                            values.extend(index, &rest[..safe])?;
                        }
                        pos += safe;
                        break;
                    }
                }
                State::AfterDelimiter => {
                    if rest.len() < 2 {
                        break;
                    }
                    if rest.starts_with(b"--") {
                        pos = self.buf.len();
                        self.state = State::Epilogue;
                        break;
                    }
                    // Transport padding may precede the line break.
                    let padding = rest
                        .iter()
                        .take_while(|&&byte| matches!(byte, b' ' | b'\t'))
                        .count();
                    let line = &rest[padding..];
                    if line.is_empty() || line == b"\r" {
                        if padding > MAX_PART_HEADERS {
                            return Err(FormError::HeadersTooLong {
                                limit: MAX_PART_HEADERS,
                            });
                        }
                        break;
                    }
                    if !line.starts_with(b"\r\n") {
                        return Err(FormError::MalformedMultipart("invalid delimiter line"));
                    }
                    pos += padding + 2;
                    self.state = State::Headers;
                }
                State::Headers => {
                    if rest.len() < 2 {
                        break;
                    }
                    let (block_len, consumed) = if rest.starts_with(b"\r\n") {
                        (0, 2)
                    } else if let Some(at) = find(rest, b"\r\n\r\n") {
                        (at, at + 4)
                    } else {
                        if rest.len() > MAX_PART_HEADERS {
                            return Err(FormError::HeadersTooLong {
                                limit: MAX_PART_HEADERS,
                            });
                        }
                        break;
                    };
                    if block_len > MAX_PART_HEADERS {
                        return Err(FormError::HeadersTooLong {
                            limit: MAX_PART_HEADERS,
                        });
                    }
                    let target = part_target(&rest[..block_len], values)?;
                    if let Some(index) = target {
                        values.start(index);
                    }
                    pos += consumed;
                    self.state = State::Body { target };
                }
                State::Epilogue => {
                    pos = self.buf.len();
                    break;
                }
            }
        }

        self.buf.drain(..pos);
        Ok(())
    }

    pub(super) fn finish(&mut self) -> Result<(), FormError> {
        if self.state != State::Epilogue {
            return Err(FormError::MalformedMultipart("body ended before closing delimiter"));
        }
        self.buf.clear();
        Ok(())
    }
}

/// Resolve which recognised field a part feeds, from its header block.
///
/// Parts without a `form-data` name, with an unknown name, or carrying a
/// `filename` (file uploads) feed nothing.
fn part_target(block: &[u8], values: &FieldValues) -> Result<Option<usize>, FormError> {
    let block = std::str::from_utf8(block)
        .map_err(|_| FormError::MalformedMultipart("part headers are not UTF-8"))?;

    for line in block.split("\r\n").filter(|line| !line.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            return Err(FormError::MalformedMultipart("part header without colon"));
        };
        if !name.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }

        let mut params = value.split(';').map(str::trim);
        if !params
            .next()
            .is_some_and(|kind| kind.eq_ignore_ascii_case("form-data"))
        {
            return Ok(None);
        }

        let mut field_name = None;
        for param in params {
            let Some((key, val)) = param.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.eq_ignore_ascii_case("filename") || key.eq_ignore_ascii_case("filename*") {
                return Ok(None);
            }
            if key.eq_ignore_ascii_case("name") {
                field_name = Some(unquote(val.trim()));
            }
        }
        return Ok(field_name.and_then(|name| values.index_of(name.as_bytes())));
    }

    Ok(None)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
