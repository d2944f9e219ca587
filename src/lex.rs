// SPDX: CC0-1.0

use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

// view into the shared expression source, cheap to clone so every token and
// error can point back at the characters it came from
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    src: Arc<str>,
    start: usize,
    len: usize,
}

impl Span {
    #[inline]
    pub const fn new(src: Arc<str>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<str>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<str> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_str(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    fn grow(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    OpenParen,
    CloseParen,

    // tokens the grammar never accepts, kept distinct for targeted notes
    XEqual,
    XLess,
    XGreater,
    XPipe,
    XComma,
    XOpenSquare,
    XCloseSquare,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident
            | Self::Number
            | Self::Plus
            | Self::Minus
            | Self::Star
            | Self::Slash
            | Self::Caret
            | Self::OpenParen
            | Self::CloseParen => false,

            Self::XEqual
            | Self::XLess
            | Self::XGreater
            | Self::XPipe
            | Self::XComma
            | Self::XOpenSquare
            | Self::XCloseSquare
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    UnexpectedChar(char),
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(chr) => write!(f, "unexpected character '{chr}'"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: Span,
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<str>,
    cur: Peekable<CharIndices<'src>>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<str>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            has_errored: false,
        }
    }

    // the source is normalized before it gets here, but stay tolerant
    fn skip_whitespace(&mut self) {
        while let Some((_, chr)) = self.cur.peek() {
            if chr.is_ascii_whitespace() {
                self.cur.next();
            } else {
                break;
            }
        }
    }

    fn single(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Plus,
            '-' => TokTyp::Minus,
            '*' => TokTyp::Star,
            '/' => TokTyp::Slash,
            '^' => TokTyp::Caret,
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            '=' => TokTyp::XEqual,
            '<' => TokTyp::XLess,
            '>' => TokTyp::XGreater,
            '|' => TokTyp::XPipe,
            ',' => TokTyp::XComma,
            '[' => TokTyp::XOpenSquare,
            ']' => TokTyp::XCloseSquare,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next();
        Some(Tok {
            typ,
            loc: Span::new(Arc::clone(self.src), idx, chr.len_utf8()),
        })
    }

    fn run<P>(&mut self, start: usize, typ: TokTyp, predicate: P) -> Option<Tok>
    where
        P: Fn(char) -> bool,
    {
        let mut loc = Span::new(Arc::clone(self.src), start, 0);
        while let Some((_, chr)) = self.cur.peek().copied() {
            if predicate(chr) {
                loc.grow(chr.len_utf8());
                self.cur.next();
            } else {
                break;
            }
        }
        if loc.is_empty() {
            None
        } else {
            Some(Tok { typ, loc })
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.skip_whitespace();
        let (idx, chr) = self.cur.peek().copied()?;

        let tok = if let Some(tok) = self.single() {
            tok
        } else if let Some(tok) = self.run(idx, TokTyp::Ident, |chr| chr.is_ascii_lowercase()) {
            tok
        } else if let Some(tok) = self.run(idx, TokTyp::Number, |chr| {
            chr.is_ascii_digit() || chr == '.'
        }) {
            tok
        } else {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::UnexpectedChar(chr),
                loc: Span::new(Arc::clone(self.src), idx, chr.len_utf8()),
            }));
        };

        if tok.typ.is_unsupported() {
            self.has_errored = true;
            return Some(Err(LexErr {
                typ: LexErrTyp::Unsupported(tok.typ),
                loc: tok.loc,
            }));
        }

        Some(Ok(tok))
    }
}
