//! Cursor and readers for the `_W` grammar.
//!
//! A [`Parser`] owns a position into the immutable input and the output
//! buffer being built. Every reader consumes from the front and appends to
//! the output; nothing is ever un-read.

use smallvec::SmallVec;

use crate::error::DemangleError;

/// Deepest function/tuple nesting (and longest pointer chain) we decode.
pub const MAX_TYPE_DEPTH: usize = 64;

type Result<T> = std::result::Result<T, DemangleError>;

/// Decoded list items (tuple fields, parameter types, arguments).
pub(crate) type Items = SmallVec<[String; 4]>;

pub(crate) struct Parser<'a>
{
    input: &'a str,
    pos: usize,
    output: String,
    depth: usize,
}

impl<'a> Parser<'a>
{
    pub(crate) fn new(input: &'a str) -> Self
    {
        Self {
            input,
            pos: 0,
            output: String::with_capacity(input.len() * 2),
            depth: 0,
        }
    }

    /// Unconsumed suffix of the input.
    pub(crate) fn remaining(&self) -> &'a str
    {
        &self.input[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<u8>
    {
        self.input.as_bytes().get(self.pos).copied()
    }

    /// Like [`Parser::peek`], but running out of input is an error.
    fn peek_required(&self) -> Result<u8>
    {
        self.peek().ok_or(DemangleError::Truncated)
    }

    pub(crate) fn bump(&mut self)
    {
        self.pos += 1;
    }

    /// Consume `byte` if it is next.
    pub(crate) fn eat(&mut self, byte: u8) -> bool
    {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn push_str(&mut self, text: &str)
    {
        self.output.push_str(text);
    }

    pub(crate) fn push(&mut self, c: char)
    {
        self.output.push(c);
    }

    /// Append `(a, b, c)`.
    pub(crate) fn push_list(&mut self, items: &[String])
    {
        self.output.push('(');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(item);
        }
        self.output.push(')');
    }

    pub(crate) fn finish(self) -> String
    {
        self.output
    }

    /// Run `read` against a fresh output buffer and hand back what it wrote.
    ///
    /// The cursor is shared, so consumption still happens in order.
    pub(crate) fn capture<F>(&mut self, read: F) -> Result<String>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let saved = std::mem::take(&mut self.output);
        let result = read(self);
        let captured = std::mem::replace(&mut self.output, saved);
        result.map(|()| captured)
    }

    fn nested<F>(&mut self, read: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.depth >= MAX_TYPE_DEPTH {
            return Err(DemangleError::NestingTooDeep(MAX_TYPE_DEPTH));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }

    /// Read a run of ASCII digits if one is next.
    ///
    /// Returns `Ok(None)` without consuming anything when no digit is next.
    /// A run that overflows `usize` is `MalformedInteger`.
    pub(crate) fn read_optional_integer(&mut self) -> Result<Option<usize>>
    {
        let rest = self.remaining();
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Ok(None);
        }
        let value = rest[..digits]
            .parse::<usize>()
            .map_err(|_| DemangleError::MalformedInteger)?;
        self.pos += digits;
        Ok(Some(value))
    }

    pub(crate) fn read_integer(&mut self) -> Result<usize>
    {
        self.read_optional_integer()?.ok_or(DemangleError::MalformedInteger)
    }

    /// `<length><bytes>`: copy `length` bytes of input to the output verbatim.
    pub(crate) fn read_identifier(&mut self) -> Result<()>
    {
        let len = self.read_integer()?;
        let end = self.pos.checked_add(len).ok_or(DemangleError::Truncated)?;
        // `get` also refuses to split a multi-byte character.
        let name = self.input.get(self.pos..end).ok_or(DemangleError::Truncated)?;
        self.output.push_str(name);
        self.pos = end;
        Ok(())
    }

    /// One type in any type position.
    ///
    /// A `P<count>T` prefix does not wrap a sub-type: it emits its `*`s and
    /// parsing carries on in the same position with whatever follows.
    pub(crate) fn read_type(&mut self) -> Result<()>
    {
        if self.eat(b'P') {
            let count = self.read_integer()?;
            match self.peek() {
                Some(b'T') => self.bump(),
                Some(_) => return Err(DemangleError::UnrecognizedFormat),
                None => return Err(DemangleError::Truncated),
            }
            // Markers are a flat run, not nesting; only refuse counts the
            // allocator cannot hold.
            self.output
                .try_reserve(count)
                .map_err(|_| DemangleError::MalformedInteger)?;
            for _ in 0..count {
                self.output.push('*');
            }
        }

        match self.peek_required()? {
            b'F' => {
                self.bump();
                self.nested(Self::read_function_type)
            }
            b't' => {
                self.bump();
                self.nested(Self::read_tuple_type)
            }
            b's' => {
                self.bump();
                self.read_builtin_type()
            }
            _ => self.read_identifier(),
        }
    }

    /// Types up to (and consuming) `terminator`.
    fn read_type_list(&mut self, terminator: u8) -> Result<Items>
    {
        let mut types = Items::new();
        while !self.eat(terminator) {
            types.push(self.capture(Self::read_type)?);
        }
        Ok(types)
    }

    // F{type}*R<type>
    fn read_function_type(&mut self) -> Result<()>
    {
        let params = self.read_type_list(b'R')?;
        self.push_list(&params);
        self.output.push_str(" -> ");
        self.read_type()
    }

    // t{type}*T
    fn read_tuple_type(&mut self) -> Result<()>
    {
        let fields = self.read_type_list(b'T')?;
        self.push_list(&fields);
        Ok(())
    }

    fn read_builtin_type(&mut self) -> Result<()>
    {
        let code = self.peek_required()?;
        let name = match code {
            b'i' => {
                self.bump();
                self.output.push_str("Int");
                if let Some(width) = self.read_optional_integer()? {
                    self.output.push_str(&width.to_string());
                }
                return Ok(());
            }
            b'I' => "Int",
            b'f' => "Float",
            b'd' => "Double",
            b'F' => "Float80",
            b'b' => "Bool",
            b'v' => "Void",
            _ => {
                let marker = self.remaining().chars().next().unwrap_or(char::from(code));
                return Err(DemangleError::UnknownTypeMarker(marker));
            }
        };
        self.bump();
        self.output.push_str(name);
        Ok(())
    }

    /// One labeled parameter: `[S | E<name>] <internal> <type>`.
    ///
    /// `S` drops the external label, `E` supplies one, and no marker means
    /// the `_` placeholder.
    pub(crate) fn read_argument(&mut self) -> Result<()>
    {
        match self.peek_required()? {
            b'S' => self.bump(),
            b'E' => {
                self.bump();
                self.read_identifier()?;
                self.output.push(' ');
            }
            _ => self.output.push_str("_ "),
        }
        self.read_identifier()?;
        self.output.push_str(": ");
        self.read_type()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn read_with<'a, F>(input: &'a str, read: F) -> Result<(String, usize)>
    where
        F: FnOnce(&mut Parser<'a>) -> Result<()>,
    {
        let mut parser = Parser::new(input);
        read(&mut parser)?;
        let consumed = parser.pos;
        Ok((parser.finish(), consumed))
    }

    #[test]
    fn test_read_integer_consumes_digit_run()
    {
        let mut parser = Parser::new("42abc");
        assert_eq!(parser.read_integer(), Ok(42));
        assert_eq!(parser.remaining(), "abc");
    }

    #[test]
    fn test_read_integer_without_digits_leaves_cursor()
    {
        let mut parser = Parser::new("abc");
        assert_eq!(parser.read_integer(), Err(DemangleError::MalformedInteger));
        assert_eq!(parser.remaining(), "abc");
    }

    #[test]
    fn test_read_integer_rejects_sign()
    {
        let mut parser = Parser::new("-3foo");
        assert_eq!(parser.read_integer(), Err(DemangleError::MalformedInteger));
        let mut parser = Parser::new("+3foo");
        assert_eq!(parser.read_integer(), Err(DemangleError::MalformedInteger));
    }

    #[test]
    fn test_read_integer_overflow()
    {
        let mut parser = Parser::new("99999999999999999999999999");
        assert_eq!(parser.read_integer(), Err(DemangleError::MalformedInteger));
    }

    #[test]
    fn test_read_identifier()
    {
        assert_eq!(read_with("3foobar", Parser::read_identifier), Ok(("foo".to_string(), 4)));
        assert_eq!(read_with("0rest", Parser::read_identifier), Ok((String::new(), 1)));
    }

    #[test]
    fn test_read_identifier_truncated()
    {
        assert_eq!(read_with("5abc", Parser::read_identifier), Err(DemangleError::Truncated));
    }

    #[test]
    fn test_read_identifier_does_not_split_characters()
    {
        // "é" is two bytes
        assert_eq!(read_with("1é", Parser::read_identifier), Err(DemangleError::Truncated));
        assert_eq!(read_with("2é", Parser::read_identifier), Ok(("é".to_string(), 3)));
    }

    #[test]
    fn test_builtin_types()
    {
        let cases = [
            ("sI", "Int"),
            ("si", "Int"),
            ("si8", "Int8"),
            ("si064", "Int64"),
            ("sf", "Float"),
            ("sd", "Double"),
            ("sF", "Float80"),
            ("sb", "Bool"),
            ("sv", "Void"),
        ];
        for (input, expected) in cases {
            let (text, consumed) = read_with(input, Parser::read_type).unwrap();
            assert_eq!(text, expected, "input {input}");
            assert_eq!(consumed, input.len(), "input {input}");
        }
    }

    #[test]
    fn test_unknown_builtin()
    {
        assert_eq!(read_with("sx", Parser::read_type), Err(DemangleError::UnknownTypeMarker('x')));
        assert_eq!(read_with("s", Parser::read_type), Err(DemangleError::Truncated));
    }

    #[test]
    fn test_empty_type_is_truncated()
    {
        assert_eq!(read_with("", Parser::read_type), Err(DemangleError::Truncated));
    }

    #[test]
    fn test_pointer_decorates_following_type()
    {
        assert_eq!(read_with("P2TsI", Parser::read_type).unwrap().0, "**Int");
        assert_eq!(read_with("P1T3Foo", Parser::read_type).unwrap().0, "*Foo");
        assert_eq!(read_with("P1TtsbT", Parser::read_type).unwrap().0, "*(Bool)");
    }

    #[test]
    fn test_pointer_requires_terminator()
    {
        assert_eq!(read_with("P2sI", Parser::read_type), Err(DemangleError::UnrecognizedFormat));
        assert_eq!(read_with("P2", Parser::read_type), Err(DemangleError::Truncated));
        assert_eq!(read_with("PT", Parser::read_type), Err(DemangleError::MalformedInteger));
    }

    #[test]
    fn test_pointer_count_is_not_a_nesting_level()
    {
        let input = format!("P{}TsI", MAX_TYPE_DEPTH + 1);
        let expected = format!("{}Int", "*".repeat(MAX_TYPE_DEPTH + 1));
        assert_eq!(read_with(&input, Parser::read_type).unwrap().0, expected);
    }

    #[test]
    fn test_pointer_prefix_does_not_repeat()
    {
        assert_eq!(read_with("P1TP1TsI", Parser::read_type), Err(DemangleError::MalformedInteger));
    }

    #[test]
    fn test_function_type()
    {
        assert_eq!(read_with("FsIsbRsv", Parser::read_type).unwrap().0, "(Int, Bool) -> Void");
        assert_eq!(read_with("FRsd", Parser::read_type).unwrap().0, "() -> Double");
    }

    #[test]
    fn test_tuple_type()
    {
        assert_eq!(read_with("tsI3FooT", Parser::read_type).unwrap().0, "(Int, Foo)");
        assert_eq!(read_with("tT", Parser::read_type).unwrap().0, "()");
        assert_eq!(read_with("tsI", Parser::read_type), Err(DemangleError::Truncated));
    }

    #[test]
    fn test_nesting_limit()
    {
        let deep = format!("{}sI{}", "t".repeat(MAX_TYPE_DEPTH + 1), "T".repeat(MAX_TYPE_DEPTH + 1));
        assert_eq!(
            read_with(&deep, Parser::read_type),
            Err(DemangleError::NestingTooDeep(MAX_TYPE_DEPTH))
        );

        let fits = format!("{}sI{}", "t".repeat(MAX_TYPE_DEPTH), "T".repeat(MAX_TYPE_DEPTH));
        assert!(read_with(&fits, Parser::read_type).is_ok());
    }

    #[test]
    fn test_arguments()
    {
        assert_eq!(read_with("1xsI", Parser::read_argument).unwrap().0, "_ x: Int");
        assert_eq!(read_with("S1xsI", Parser::read_argument).unwrap().0, "x: Int");
        assert_eq!(read_with("E2to1xsI", Parser::read_argument).unwrap().0, "to x: Int");
    }

    #[test]
    fn test_external_label_length_is_greedy()
    {
        // `06` is one length, so the label swallows `amount` and `sd` is left
        // where the internal label's length should be.
        assert_eq!(read_with("E06amountsd", Parser::read_argument), Err(DemangleError::MalformedInteger));
    }

    #[test]
    fn test_argument_requires_internal_label_and_type()
    {
        assert_eq!(read_with("S", Parser::read_argument), Err(DemangleError::MalformedInteger));
        assert_eq!(read_with("1x", Parser::read_argument), Err(DemangleError::Truncated));
        assert_eq!(read_with("", Parser::read_argument), Err(DemangleError::Truncated));
    }

    #[test]
    fn test_capture_restores_outer_output()
    {
        let mut parser = Parser::new("3Foo3Bar");
        parser.push_str("outer:");
        let inner = parser.capture(Parser::read_identifier).unwrap();
        parser.read_identifier().unwrap();
        assert_eq!(inner, "Foo");
        assert_eq!(parser.finish(), "outer:Bar");
    }
}
