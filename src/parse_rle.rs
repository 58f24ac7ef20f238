use thiserror::Error;
use tracing::warn;

use crate::parse_util;
use crate::parse_util::ParseError;
use crate::quadtree::Coord;
use crate::quadtree::MAX_LEVEL;
use crate::quadtree::in_bounds;
use crate::rule_set::RuleError;
use crate::rule_set::RuleSet;

/// Metadata of an RLE file. The cells themselves are handed to a callback while reading.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RleFile<'a> {
    pub name: Option<&'a [u8]>,
    pub author: Option<&'a [u8]>,
    pub comments: Vec<&'a [u8]>,

    /// Position of the top left corner, from a `#P` or `#R` line.
    pub offset: Option<(Coord, Coord)>,

    /// Width and height, from the header line.
    pub size: Option<(Coord, Coord)>,

    pub rule: Option<RuleSet>,
}

impl RleFile<'_> {
    /// Where the top left cell of the pattern lands: the explicit offset if there is one,
    /// otherwise whatever centers the pattern on the origin.
    pub fn origin(&self) -> (Coord, Coord) {
        match (self.offset, self.size) {
            (Some(offset), _) => offset,
            (None, Some((w, h))) => (-(w / 2), -(h / 2)),
            (None, None) => (0, 0),
        }
    }
}

#[derive(Debug, Error)]
pub enum RleError {
    #[error("Comment line error: {0}")]
    CommentLine(#[from] RleCommentLineError),

    #[error("Header line error: {0}")]
    HeaderLine(#[from] RleHeaderLineError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] RleEncodingError),
}

/// Parse the RLE file format, calling `f(x, y)` for every live cell. Rows go south, towards
/// positive `y`.
///
/// See: https://conwaylife.com/wiki/Run_Length_Encoded
pub fn read_rle<F>(mut bytes: &'_ [u8], f: F) -> Result<RleFile<'_>, RleError>
where
    F: FnMut(Coord, Coord),
{
    let mut file = RleFile::default();

    // Parse as many comment lines as possible
    loop {
        bytes = parse_util::take_ws(bytes);

        let (Some(line), rest) = read_line_comment(bytes)? else {
            break;
        };

        match line {
            RleCommentLine::Comment { text } => file.comments.push(text),
            RleCommentLine::Name { name } => {
                if file.name.is_some() {
                    warn!("RLE file name already defined. Using latest");
                }

                file.name = Some(name);
            }
            RleCommentLine::Author { author } => {
                if file.author.is_some() {
                    warn!("RLE author already defined. Using latest");
                }

                file.author = Some(author);
            }
            RleCommentLine::Offset { x, y } => {
                if file.offset.is_some() {
                    warn!("RLE offset already defined. Using latest");
                }

                file.offset = Some((x, y));
            }
            RleCommentLine::Rule { rule } => {
                if file.rule.is_some() {
                    warn!("RLE rule already defined. Using latest");
                }

                file.rule = Some(rule);
            }
        }

        bytes = rest;
    }

    // Parse header line, if it's present
    if let (Some(header), rest) = read_line_header(bytes)? {
        let RleHeaderLine { width, height, rule } = header;

        file.size = Some((width, height));

        if let Some(rule) = rule {
            if file.rule.is_some() {
                warn!("RLE rule already defined. Using latest");
            }

            file.rule = Some(rule);
        }

        bytes = rest;
    }

    let (dx, dy) = file.origin();

    read_encoding(bytes, dx, dy, f)?;

    Ok(file)
}

enum RleCommentLine<'a> {
    Comment { text: &'a [u8] },
    Name { name: &'a [u8] },
    Author { author: &'a [u8] },
    Offset { x: Coord, y: Coord },
    Rule { rule: RuleSet },
}

#[derive(Debug, Error)]
pub enum RleCommentLineError {
    #[error("No comment type")]
    NoType,

    #[error("Empty name line")]
    EmptyName,

    #[error("Empty author line")]
    EmptyAuthor,

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Invalid coordinates: {0}")]
    InvalidCoord(#[from] RleCoordError),

    #[error("Invalid comment type, found '{got}'")]
    InvalidType { got: char },
}

/// Attempt to parse a comment line, otherwise leaves `bytes` as-is.
fn read_line_comment(
    bytes: &'_ [u8],
) -> Result<(Option<RleCommentLine<'_>>, &'_ [u8]), RleCommentLineError> {
    let Ok(rest) = parse_util::expect(b'#', bytes) else {
        return Ok((None, bytes));
    };

    let (Some(b), rest) = parse_util::take_1(rest) else {
        return Err(RleCommentLineError::NoType);
    };

    let (text, rest) = parse_util::take_line(rest);

    let line = match b {
        b'C' | b'c' => RleCommentLine::Comment { text },

        b'N' if text.is_empty() => return Err(RleCommentLineError::EmptyName),
        b'N' => RleCommentLine::Name { name: text },

        b'O' if text.is_empty() => return Err(RleCommentLineError::EmptyAuthor),
        b'O' => RleCommentLine::Author { author: text },

        b'P' | b'R' => {
            let (x, y) = read_coordinates(text)?;

            RleCommentLine::Offset { x, y }
        }

        b'r' => {
            let rule = String::from_utf8_lossy(text).parse::<RuleSet>()?;

            RleCommentLine::Rule { rule }
        }

        b => return Err(RleCommentLineError::InvalidType { got: b as char }),
    };

    Ok((Some(line), rest))
}

#[derive(Debug, Error)]
pub enum RleCoordError {
    #[error("Expected x coordinate, found end of line")]
    NoX,

    #[error("Expected y coordinate, found end of line")]
    NoY,

    #[error("Failed to parse coordinate: {0}")]
    Parse(#[from] ParseError),
}

/// Two integers separated by whitespace, as in `#P -12 4`.
fn read_coordinates(bytes: &[u8]) -> Result<(Coord, Coord), RleCoordError> {
    let bytes = parse_util::take_inline_ws(bytes);
    let (Some(x), bytes) = parse_util::take_integer(bytes) else {
        return Err(RleCoordError::NoX);
    };

    let bytes = parse_util::take_inline_ws(bytes);
    let (Some(y), _) = parse_util::take_integer(bytes) else {
        return Err(RleCoordError::NoY);
    };

    Ok((parse_util::convert(x)?, parse_util::convert(y)?))
}

struct RleHeaderLine {
    width: Coord,
    height: Coord,
    rule: Option<RuleSet>,
}

#[derive(Debug, Error)]
pub enum RleHeaderLineError {
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Invalid token: expected ',' or a line break, found '{got}'")]
    InvalidToken { got: char },

    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] RuleError),
}

/// Parse `key = value` where the value is an integer.
fn read_assignment<'a>(key: u8, bytes: &'a [u8]) -> Result<(Coord, &'a [u8]), ParseError> {
    let bytes = parse_util::expect(key, parse_util::take_inline_ws(bytes))?;
    let bytes = parse_util::expect(b'=', parse_util::take_inline_ws(bytes))?;
    let bytes = parse_util::take_inline_ws(bytes);

    let (Some(value), bytes) = parse_util::take_integer(bytes) else {
        let (got, _) = parse_util::take_line(bytes);

        return Err(ParseError::Convert {
            got: String::from_utf8_lossy(got).to_string(),
        });
    };

    Ok((parse_util::convert(value)?, bytes))
}

/// Attempt to parse a header line, `x = m, y = n[, rule = abc]`. Leaves `bytes` as-is if the
/// next line is not a header.
fn read_line_header(bytes: &[u8]) -> Result<(Option<RleHeaderLine>, &[u8]), RleHeaderLineError> {
    if parse_util::peek_1(bytes) != Some(b'x') {
        return Ok((None, bytes));
    }

    let (line, rest) = parse_util::take_line(bytes);

    let (width, after) = read_assignment(b'x', line)?;
    let after = parse_util::expect(b',', parse_util::take_inline_ws(after))?;
    let (height, after) = read_assignment(b'y', after)?;

    let after = parse_util::take_inline_ws(after);
    let rule = match parse_util::take_1(after) {
        (None, _) => None,
        (Some(b','), after) => {
            let after = parse_util::take_inline_ws(after);
            let after = parse_util::expect_slice(b"rule", after)?;
            let after = parse_util::expect(b'=', parse_util::take_inline_ws(after))?;
            let text = String::from_utf8_lossy(after.trim_ascii());

            Some(text.parse::<RuleSet>()?)
        }
        (Some(b), _) => return Err(RleHeaderLineError::InvalidToken { got: b as char }),
    };

    let line = RleHeaderLine {
        width,
        height,
        rule,
    };

    Ok((Some(line), rest))
}

#[derive(Debug, Error)]
pub enum RleEncodingError {
    #[error("Unexpected end of input, expected '!'")]
    UnexpectedEof,

    #[error("Failed to convert run length: {0}")]
    RunLength(#[from] ParseError),

    #[error("Run length at the very end of the pattern")]
    DanglingRunLength,

    #[error("Unrecognized byte: 0x{got:0X}")]
    UnrecognizedByte { got: u8 },

    #[error("Cell ({x} + {run}, {y}) lies outside the largest universe")]
    CoordinateOverflow { x: Coord, y: Coord, run: Coord },
}

fn read_encoding<F>(
    mut bytes: &[u8],
    dx: Coord,
    dy: Coord,
    mut f: F,
) -> Result<(), RleEncodingError>
where
    F: FnMut(Coord, Coord),
{
    let mut run: Option<Coord> = None;

    let (mut x, mut y) = (0, 0);

    loop {
        let (Some(b), rest) = parse_util::take_1(bytes) else {
            return Err(RleEncodingError::UnexpectedEof);
        };

        match b {
            w if w.is_ascii_whitespace() => {}

            // End of input
            b'!' if run.is_some() => return Err(RleEncodingError::DanglingRunLength),
            b'!' => break,

            // Dead cells
            b'b' => {
                let n = run.take().unwrap_or(1);
                x = advance(x, n).ok_or(RleEncodingError::CoordinateOverflow { x, y, run: n })?;
            }

            // Live cells
            b'o' => {
                let n = run.take().unwrap_or(1);
                let overflow = || RleEncodingError::CoordinateOverflow { x, y, run: n };

                // The whole run is checked before any of its cells goes out
                let end = advance(x, n).ok_or_else(overflow)?;
                let x0 = dx.checked_add(x).ok_or_else(overflow)?;
                let y0 = dy.checked_add(y).ok_or_else(overflow)?;
                let last = x0.checked_add(n - 1).ok_or_else(overflow)?;

                if n > 0 && !(in_bounds(MAX_LEVEL, x0, y0) && in_bounds(MAX_LEVEL, last, y0)) {
                    return Err(overflow());
                }

                for i in 0..n {
                    f(x0 + i, y0);
                }

                x = end;
            }

            // End of line
            b'$' => {
                let n = run.take().unwrap_or(1);
                y = advance(y, n).ok_or(RleEncodingError::CoordinateOverflow { x, y, run: n })?;
                x = 0;
            }

            d if d.is_ascii_digit() => {
                let (Some(digits), after) = parse_util::take_integer(bytes) else {
                    unreachable!("We found a digit")
                };

                run = Some(parse_util::convert(digits)?);
                bytes = after;

                continue;
            }

            b => return Err(RleEncodingError::UnrecognizedByte { got: b }),
        }

        bytes = rest;
    }

    Ok(())
}

/// `at + n`, unless it leaves the span a universe can ever cover.
fn advance(at: Coord, n: Coord) -> Option<Coord> {
    const SPAN: Coord = 1 << MAX_LEVEL;

    at.checked_add(n).filter(|&c| c <= SPAN)
}
