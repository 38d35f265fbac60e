//! Content stream tokenizer.
//!
//! Splits raw content stream bytes into [`Operator`]s, each carrying the
//! [`Operand`]s that preceded it. Only the operand kinds that matter for
//! drawing and text are kept distinct; integers and reals are both numbers.

use crate::error::BackendError;

/// A content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Integer or real number.
    Number(f64),
    /// Name without the leading `/`.
    Name(String),
    /// Literal `(...)` or hex `<...>` string, as decoded bytes.
    String(Vec<u8>),
    Array(Vec<Operand>),
    Bool(bool),
    Null,
    /// Inline dictionary (`BDC` properties and the like).
    Dict(Vec<(String, Operand)>),
}

impl Operand {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::String(s) => Some(s.as_slice()),
            _ => None,
        }
    }
}

/// An operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    /// Operator keyword (e.g. `"re"`, `"Tj"`, `"T*"`).
    pub name: String,
    pub operands: Vec<Operand>,
}

impl Operator {
    /// The `i`-th operand as a number.
    pub fn number(&self, i: usize) -> Option<f64> {
        self.operands.get(i).and_then(Operand::as_number)
    }

    /// The first `N` operands as numbers, if all of them are numbers.
    pub fn numbers<const N: usize>(&self) -> Option<[f64; N]> {
        if self.operands.len() < N {
            return None;
        }
        let mut out = [0.0; N];
        for (slot, operand) in out.iter_mut().zip(&self.operands) {
            *slot = operand.as_number()?;
        }
        Some(out)
    }
}

/// Tokenize a content stream.
///
/// Comments are stripped. Inline image data (`BI ... ID ... EI`) is skipped
/// and reported as a bare `BI` operator.
///
/// # Errors
///
/// Returns [`BackendError::Interpreter`] for unterminated strings, arrays or
/// dictionaries and other malformed syntax.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    Lexer {
        input,
        pos: 0,
        depth: 0,
    }
    .run()
}

/// Deepest array/dictionary nesting accepted in an operand.
const MAX_NESTING: usize = 256;

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    /// Open arrays and dictionaries around the cursor.
    depth: usize,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_keyword_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'*' || b == b'\'' || b == b'"'
}

fn syntax(msg: impl Into<String>) -> BackendError {
    BackendError::Interpreter(msg.into())
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn run(mut self) -> Result<Vec<Operator>, BackendError> {
        let mut ops = Vec::new();
        let mut stack: Vec<Operand> = Vec::new();

        loop {
            self.skip_space();
            let Some(b) = self.peek() else {
                break;
            };
            match b {
                b']' => return Err(syntax("unexpected ']' outside array")),
                b'a'..=b'z' | b'A'..=b'Z' | b'*' | b'\'' | b'"' => {
                    let keyword = self.keyword();
                    match keyword.as_str() {
                        "true" => stack.push(Operand::Bool(true)),
                        "false" => stack.push(Operand::Bool(false)),
                        "null" => stack.push(Operand::Null),
                        "BI" => {
                            self.skip_inline_image()?;
                            stack.clear();
                            ops.push(Operator {
                                name: keyword,
                                operands: Vec::new(),
                            });
                        }
                        _ => ops.push(Operator {
                            name: keyword,
                            operands: std::mem::take(&mut stack),
                        }),
                    }
                }
                _ => match self.operand()? {
                    Some(operand) => stack.push(operand),
                    // stray byte
                    None => self.pos += 1,
                },
            }
        }
        Ok(ops)
    }

    fn skip_space(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Parse one non-keyword operand at the cursor, or `None` if the byte
    /// cannot start one.
    fn operand(&mut self) -> Result<Option<Operand>, BackendError> {
        let Some(b) = self.peek() else {
            return Ok(None);
        };
        let operand = match b {
            b'(' => Operand::String(self.literal_string()?),
            b'<' if self.peek_at(1) == Some(b'<') => Operand::Dict(self.dictionary()?),
            b'<' => Operand::String(self.hex_string()?),
            b'[' => Operand::Array(self.array()?),
            b'/' => Operand::Name(self.name()),
            b'0'..=b'9' | b'+' | b'-' | b'.' => Operand::Number(self.number()?),
            _ => return Ok(None),
        };
        Ok(Some(operand))
    }

    /// An operand inside an array or dictionary, where bare keywords are values.
    fn value(&mut self) -> Result<Operand, BackendError> {
        let Some(b) = self.peek() else {
            return Err(syntax("unexpected end of content stream"));
        };
        if b.is_ascii_alphabetic() {
            return Ok(match self.keyword().as_str() {
                "true" => Operand::Bool(true),
                "false" => Operand::Bool(false),
                "null" => Operand::Null,
                other => Operand::Name(other.to_string()),
            });
        }
        self.operand()?
            .ok_or_else(|| syntax(format!("unexpected byte 0x{b:02X} in value")))
    }

    fn keyword(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_keyword_byte) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| !is_whitespace(b) && !is_delimiter(b))
        {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];

        // #XX escapes
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                    out.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            out.push(raw[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn number(&mut self) -> Result<f64, BackendError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let token = String::from_utf8_lossy(&self.input[start..self.pos]);
        match token.as_ref() {
            // a lone sign or dot reads as zero
            "+" | "-" | "." | "+." | "-." => Ok(0.0),
            t => t
                .parse()
                .map_err(|_| syntax(format!("invalid number: {t}"))),
        }
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;

        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => {
                    let Some(escaped) = self.peek() else {
                        break;
                    };
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'\r' => {
                            // line continuation, CR or CRLF
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }
        Err(syntax("unterminated literal string"))
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(syntax("unterminated hex string"));
            };
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            digits.push(hex_value(b).ok_or_else(|| {
                syntax(format!("invalid hex digit: {:?}", b as char))
            })?);
        }
        // odd count: the missing last digit is 0
        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        Ok(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
    }

    /// Run `parse` one container level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        if self.depth >= MAX_NESTING {
            return Err(syntax("nesting too deep"));
        }
        self.depth += 1;
        let out = parse(self);
        self.depth -= 1;
        out
    }

    fn array(&mut self) -> Result<Vec<Operand>, BackendError> {
        self.nested(Self::array_items)
    }

    fn array_items(&mut self) -> Result<Vec<Operand>, BackendError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_space();
            match self.peek() {
                None => return Err(syntax("unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.value()?),
            }
        }
    }

    fn dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.nested(Self::dictionary_entries)
    }

    fn dictionary_entries(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.pos += 2;
        let mut entries = Vec::new();
        loop {
            self.skip_space();
            match (self.peek(), self.peek_at(1)) {
                (None, _) => return Err(syntax("unterminated dictionary")),
                (Some(b'>'), Some(b'>')) => {
                    self.pos += 2;
                    return Ok(entries);
                }
                (Some(b'/'), _) => {
                    let key = self.name();
                    self.skip_space();
                    let value = self.value()?;
                    entries.push((key, value));
                }
                (Some(_), _) => return Err(syntax("expected name key in dictionary")),
            }
        }
    }

    /// Skip an inline image after `BI`: its dictionary up to `ID`, then the
    /// binary data up to a whitespace-delimited `EI`.
    fn skip_inline_image(&mut self) -> Result<(), BackendError> {
        loop {
            self.skip_space();
            match (self.peek(), self.peek_at(1)) {
                (None, _) => return Err(syntax("inline image without ID")),
                (Some(b'I'), Some(b'D'))
                    if self.peek_at(2).is_none_or(is_whitespace) =>
                {
                    self.pos += 3;
                    break;
                }
                _ => {
                    self.value()?;
                }
            }
        }

        let data_start = self.pos;
        while self.pos + 1 < self.input.len() {
            let at_boundary = self.pos == data_start || is_whitespace(self.input[self.pos - 1]);
            if at_boundary
                && self.input[self.pos] == b'E'
                && self.input[self.pos + 1] == b'I'
                && self
                    .peek_at(2)
                    .is_none_or(|b| is_whitespace(b) || is_delimiter(b))
            {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(syntax("inline image without EI"))
    }
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
