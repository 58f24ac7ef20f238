//! Small combinators over byte slices. Every function returns the unconsumed rest of the input
//! alongside what it read, and leaves the input untouched when it fails.

use std::str::FromStr;

use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected end of input, expected '{exp}'")]
    UnexpectedEof { exp: char },

    #[error("Expected '{exp}', but got '{got}'")]
    UnexpectedToken { exp: char, got: char },

    #[error("Expected \"{exp}\", but got \"{got}\"")]
    UnexpectedSlice { exp: String, got: String },

    #[error("Failed to convert \"{got}\"")]
    Convert { got: String },
}

/// Skip ascii whitespace, line breaks included.
pub fn take_ws(bytes: &[u8]) -> &[u8] {
    bytes.trim_ascii_start()
}

/// Skip spaces and tabs, stopping at line breaks.
pub fn take_inline_ws(bytes: &[u8]) -> &[u8] {
    let (_, rest) = take_while_fn(|b| b == b' ' || b == b'\t', bytes);

    rest
}

/// Takes the next byte. If there is none, the slice is left as-is.
pub const fn take_1(bytes: &[u8]) -> (Option<u8>, &[u8]) {
    match bytes {
        [b, rest @ ..] => (Some(*b), rest),
        [] => (None, bytes),
    }
}

/// Like `take_1`, but doesn't consume the byte.
pub fn peek_1(bytes: &[u8]) -> Option<u8> {
    bytes.first().copied()
}

/// Consume `b`, which must be the next byte.
pub fn expect(b: u8, bytes: &[u8]) -> ParseResult<&[u8]> {
    match take_1(bytes) {
        (Some(a), rest) if a == b => Ok(rest),
        (Some(a), _) => Err(ParseError::UnexpectedToken {
            exp: b as char,
            got: a as char,
        }),
        (None, _) => Err(ParseError::UnexpectedEof { exp: b as char }),
    }
}

/// Consume `bs`, which must be a prefix of `bytes`.
pub fn expect_slice<'a>(bs: &[u8], bytes: &'a [u8]) -> ParseResult<&'a [u8]> {
    match bytes.strip_prefix(bs) {
        Some(rest) => Ok(rest),
        None => {
            let n = bs.len().min(bytes.len());

            Err(ParseError::UnexpectedSlice {
                exp: String::from_utf8_lossy(bs).to_string(),
                got: String::from_utf8_lossy(&bytes[..n]).to_string(),
            })
        }
    }
}

/// Consume the longest prefix whose bytes all satisfy `p`. Returns `None` when it is empty.
pub fn take_while_fn<P>(p: P, bytes: &[u8]) -> (Option<&[u8]>, &[u8])
where
    P: Fn(u8) -> bool,
{
    let n = bytes.iter().position(|&b| !p(b)).unwrap_or(bytes.len());

    if n == 0 {
        return (None, bytes);
    }

    let (res, rest) = bytes.split_at(n);

    (Some(res), rest)
}

/// Consume a whole line, line break included. The returned line has neither its line break nor
/// surrounding whitespace.
///
/// A line break is any of `\n`, `\r` or `\r\n`.
pub fn take_line(bytes: &[u8]) -> (&[u8], &[u8]) {
    let Some(n) = bytes.iter().position(|&b| b == b'\n' || b == b'\r') else {
        return (bytes.trim_ascii(), &bytes[bytes.len()..]);
    };

    let (line, rest) = bytes.split_at(n);
    let rest = match rest {
        [b'\r', b'\n', rest @ ..] => rest,
        [_, rest @ ..] => rest,
        [] => rest,
    };

    (line.trim_ascii(), rest)
}

/// Consume an optionally signed decimal integer.
pub fn take_integer(bytes: &[u8]) -> (Option<&[u8]>, &[u8]) {
    let sign = match peek_1(bytes) {
        Some(b'-' | b'+') => 1,
        _ => 0,
    };

    let digits = bytes[sign..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();

    if digits == 0 {
        return (None, bytes);
    }

    let (res, rest) = bytes.split_at(sign + digits);

    (Some(res), rest)
}

/// Converts `&[u8]` to `T` if `T: FromStr`.
pub fn convert<T: FromStr>(bytes: &[u8]) -> ParseResult<T> {
    let convert_error = || ParseError::Convert {
        got: String::from_utf8_lossy(bytes).to_string(),
    };

    std::str::from_utf8(bytes)
        .map_err(|_| convert_error())?
        .parse::<T>()
        .map_err(|_| convert_error())
}

#[cfg(test)]
mod test {
    use super::ParseError;

    #[test]
    fn take_ws_full_ws() {
        assert_eq!(super::take_ws(b" \n\t "), b"");
        assert_eq!(super::take_ws(b" \n x"), b"x");
    }

    #[test]
    fn inline_ws_stops_at_newline() {
        assert_eq!(super::take_inline_ws(b"  \t\nx"), b"\nx");
    }

    #[test]
    fn expect_leaves_input_on_error() {
        assert_eq!(super::expect(b'x', b"x = 1"), Ok(b" = 1".as_slice()));
        assert_eq!(
            super::expect(b'x', b"y"),
            Err(ParseError::UnexpectedToken { exp: 'x', got: 'y' })
        );
        assert_eq!(
            super::expect(b'x', b""),
            Err(ParseError::UnexpectedEof { exp: 'x' })
        );
        assert_eq!(
            super::expect_slice(b"rule", b"ru"),
            Err(ParseError::UnexpectedSlice {
                exp: "rule".to_string(),
                got: "ru".to_string()
            })
        );
    }

    #[test]
    fn lines() {
        let (line, rest) = super::take_line(b"#N Glider \r\nbo$\n");
        assert_eq!(line, b"#N Glider");
        assert_eq!(rest, b"bo$\n");

        let (line, rest) = super::take_line(b"last");
        assert_eq!(line, b"last");
        assert_eq!(rest, b"");

        let (line, rest) = super::take_line(b"a\rb");
        assert_eq!(line, b"a");
        assert_eq!(rest, b"b");
    }

    #[test]
    fn integers() {
        assert_eq!(
            super::take_integer(b"-12 5"),
            (Some(b"-12".as_slice()), b" 5".as_slice())
        );
        assert_eq!(
            super::take_integer(b"3o"),
            (Some(b"3".as_slice()), b"o".as_slice())
        );
        assert_eq!(super::take_integer(b"-x"), (None, b"-x".as_slice()));

        assert_eq!(super::convert::<i64>(b"-12"), Ok(-12));
        assert_eq!(
            super::convert::<u8>(b"300"),
            Err(ParseError::Convert {
                got: "300".to_string()
            })
        );
    }
}
