//! HTTP byte-range parsing for the streaming endpoint.

/// An inclusive byte range resolved against a known file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Not a `bytes=` range we understand; the header should be ignored.
    Malformed,
    /// Well-formed but entirely outside the file.
    Unsatisfiable,
}

impl ByteRange {
    /// Parse a `Range` header value against a file of `size` bytes.
    ///
    /// Supports `bytes=a-b`, `bytes=a-` and `bytes=-n`. Only the first range
    /// of a multi-range request is honored. `end` is clamped to the last byte.
    pub fn parse(header: &str, size: u64) -> Result<Self, RangeError> {
        let ranges = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or(RangeError::Malformed)?;
        let first = ranges.split(',').next().unwrap_or_default().trim();
        let (start, end) = first.split_once('-').ok_or(RangeError::Malformed)?;
        let (start, end) = (start.trim(), end.trim());

        let parse = |s: &str| s.parse::<u64>().map_err(|_| RangeError::Malformed);

        let range = match (start.is_empty(), end.is_empty()) {
            (true, true) => return Err(RangeError::Malformed),
            (true, false) => {
                let suffix = parse(end)?;
                if suffix == 0 || size == 0 {
                    return Err(RangeError::Unsatisfiable);
                }
                ByteRange {
                    start: size.saturating_sub(suffix),
                    end: size - 1,
                }
            }
            (false, open_ended) => {
                let start = parse(start)?;
                let end = if open_ended { u64::MAX } else { parse(end)? };
                if end < start {
                    return Err(RangeError::Malformed);
                }
                if start >= size {
                    return Err(RangeError::Unsatisfiable);
                }
                ByteRange {
                    start,
                    end: end.min(size - 1),
                }
            }
        };

        Ok(range)
    }

    /// Number of bytes covered; never zero.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a response.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }

    /// `Range` value for the upstream request.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}
