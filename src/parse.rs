// SPDX: CC0-1.0

// recursive descent over the lexed tokens, one routine per grammar
// production, each emitting postfix operations as it completes:
//
//   expression := term (('+' | '-') term)*
//   term       := power (('*' | '/') power)*
//   power      := factor ('^' power)?        right-associative
//   factor     := ('+' | '-') factor
//               | '(' expression ')'
//               | number
//               | identifier [factor]        function application, constant or variable

use crate::{
    eval::{Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, Span, Tok, TokTyp},
    stdlib::{self, Ident},
    Number,
};
use core::{fmt, num::ParseFloatError};
use std::sync::Arc;

// expressions are normalized before parsing: the grammar never sees whitespace
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|chr| !chr.is_whitespace()).collect()
}

#[derive(Debug)]
pub enum ParseErrTyp {
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    UnknownFunction { name: Span },
    MissingParen,
    Unexpected { text: Span },
    UnexpectedEnd,
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::UnknownFunction { name } => write!(f, "unknown function '{name}'"),
            Self::MissingParen => write!(f, "missing closing parenthesis"),
            Self::Unexpected { text } => match text.as_str().chars().next() {
                Some(chr) => write!(f, "unexpected character '{chr}'"),
                None => write!(f, "unexpected trailing input"),
            },
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
        }
    }
}

#[derive(Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: Span,
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

pub fn parse(src: &Arc<str>) -> Result<Program, ParseErr> {
    let toks = Lexer::new(src).collect::<Result<Vec<_>, LexErr>>()?;
    let mut parser = Parser {
        src: Arc::clone(src),
        toks,
        pos: 0,
        out: Vec::new(),
    };

    parser.expression()?;

    // anything left over is trailing garbage
    if let Some(tok) = parser.peek() {
        let loc = tok.loc.clone();
        return Err(ParseErr {
            typ: ParseErrTyp::Unexpected { text: loc.clone() },
            loc,
        });
    }

    Ok(Program::new(parser.out))
}

// normalize + parse in one step
pub fn compile(raw: &str) -> Result<Program, ParseErr> {
    let src: Arc<str> = normalize(raw).into();
    parse(&src)
}

struct Parser {
    src: Arc<str>,
    toks: Vec<Tok>,
    pos: usize,
    out: Vec<Operation>,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, typ: TokTyp) -> Option<Tok> {
        match self.peek() {
            Some(tok) if tok.typ == typ => self.bump(),
            _ => None,
        }
    }

    fn end_loc(&self) -> Span {
        Span::new(Arc::clone(&self.src), self.src.len(), 0)
    }

    fn push(&mut self, typ: OperationTyp, loc: Span) {
        self.out.push(Operation { typ, loc });
    }

    fn expression(&mut self) -> Result<(), ParseErr> {
        self.term()?;
        loop {
            if let Some(tok) = self.eat(TokTyp::Plus) {
                self.term()?;
                self.push(OperationTyp::Operator(OperatorTyp::Add), tok.loc);
            } else if let Some(tok) = self.eat(TokTyp::Minus) {
                self.term()?;
                self.push(OperationTyp::Operator(OperatorTyp::Sub), tok.loc);
            } else {
                return Ok(());
            }
        }
    }

    fn term(&mut self) -> Result<(), ParseErr> {
        self.power()?;
        loop {
            if let Some(tok) = self.eat(TokTyp::Star) {
                self.power()?;
                self.push(OperationTyp::Operator(OperatorTyp::Mul), tok.loc);
            } else if let Some(tok) = self.eat(TokTyp::Slash) {
                self.power()?;
                self.push(OperationTyp::Operator(OperatorTyp::Div), tok.loc);
            } else {
                return Ok(());
            }
        }
    }

    fn power(&mut self) -> Result<(), ParseErr> {
        self.factor()?;
        if let Some(tok) = self.eat(TokTyp::Caret) {
            self.power()?;
            self.push(OperationTyp::Operator(OperatorTyp::Pow), tok.loc);
        }
        Ok(())
    }

    fn factor(&mut self) -> Result<(), ParseErr> {
        if self.eat(TokTyp::Plus).is_some() {
            // unary plus: keep the operand as-is
            return self.factor();
        }
        if let Some(tok) = self.eat(TokTyp::Minus) {
            self.factor()?;
            self.push(OperationTyp::Neg, tok.loc);
            return Ok(());
        }

        let Some(tok) = self.bump() else {
            return Err(ParseErr {
                typ: ParseErrTyp::UnexpectedEnd,
                loc: self.end_loc(),
            });
        };
        match tok.typ {
            TokTyp::OpenParen => {
                self.expression()?;
                if self.eat(TokTyp::CloseParen).is_none() {
                    return Err(ParseErr {
                        typ: ParseErrTyp::MissingParen,
                        loc: tok.loc,
                    });
                }
                Ok(())
            }

            TokTyp::Number => {
                let num: Number = match tok.loc.as_str().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                self.push(OperationTyp::Val(num), tok.loc);
                Ok(())
            }

            TokTyp::Ident => match stdlib::resolve(tok.loc.as_str()) {
                Some(Ident::Var) => {
                    self.push(OperationTyp::Var, tok.loc);
                    Ok(())
                }
                Some(Ident::Const(val)) => {
                    self.push(OperationTyp::Val(val), tok.loc);
                    Ok(())
                }
                Some(Ident::Fun(fun)) => {
                    // function application binds exactly one factor
                    self.factor()?;
                    self.push(OperationTyp::Call(fun), tok.loc);
                    Ok(())
                }
                None => Err(ParseErr {
                    typ: ParseErrTyp::UnknownFunction {
                        name: tok.loc.clone(),
                    },
                    loc: tok.loc,
                }),
            },

            _ => Err(ParseErr {
                typ: ParseErrTyp::Unexpected {
                    text: tok.loc.clone(),
                },
                loc: tok.loc,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval;
    use approx::assert_relative_eq;
    use core::f64::consts;

    fn eval_str(raw: &str, x: Number) -> Number {
        let prog = compile(raw).expect("parse failed");
        eval::eval(&prog, x, &mut Vec::new()).expect("eval failed")
    }

    fn err(raw: &str) -> ParseErrTyp {
        compile(raw).expect_err("parse succeeded").typ
    }

    #[test]
    fn precedence_follows_infix_arithmetic() {
        assert_eq!(eval_str("2+3*4^2", 0.0), 50.0);
        assert_eq!(eval_str("2+3*4^2", 17.0), 50.0);
        assert_eq!(eval_str("(2+3)*4", 0.0), 20.0);
        assert_eq!(eval_str("10-4-3", 0.0), 3.0);
        assert_eq!(eval_str("12/3/2", 0.0), 2.0);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(eval_str("2^3^2", 0.0), 512.0);
    }

    #[test]
    fn unary_sign_chains() {
        assert_eq!(eval_str("--5", 0.0), 5.0);
        assert_eq!(eval_str("+-+5", 0.0), -5.0);
        assert_eq!(eval_str("-sin(0)", 0.0), 0.0);
    }

    #[test]
    fn negation_binds_before_power() {
        // '-x^2' parses the sign inside the factor, so it squares -x
        assert_eq!(eval_str("-x^2", 3.0), 9.0);
        assert_eq!(eval_str("-(x^2)", 3.0), -9.0);
    }

    #[test]
    fn application_binds_exactly_one_factor() {
        assert_relative_eq!(eval_str("sin x+1", 0.0), 1.0);
        assert_relative_eq!(eval_str("cos x^2", consts::PI), 1.0); // (cos pi)^2
        assert_relative_eq!(eval_str("sqrt 4*3", 0.0), 6.0); // (sqrt 4)*3
    }

    #[test]
    fn constants_ignore_the_bound_variable() {
        for x in [-3.0, 0.0, 42.0] {
            assert_eq!(eval_str("pi", x), consts::PI);
            assert_eq!(eval_str("e", x), consts::E);
        }
        assert_relative_eq!(eval_str("2*pi", 0.0), consts::TAU);
    }

    #[test]
    fn whitespace_is_stripped_before_lexing() {
        assert_relative_eq!(eval_str(" si n ( x ) ", 0.0), 0.0);
        assert_eq!(eval_str("1 + 2", 0.0), 3.0);
    }

    #[test]
    fn unknown_identifiers_fail_as_functions() {
        assert!(matches!(err("foo(1)"), ParseErrTyp::UnknownFunction { .. }));
        match err("sinx") {
            ParseErrTyp::UnknownFunction { name } => assert_eq!(name.as_str(), "sinx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_fails() {
        assert!(matches!(err("2+2)"), ParseErrTyp::Unexpected { .. }));
        assert!(matches!(err("2x"), ParseErrTyp::Unexpected { .. }));
    }

    #[test]
    fn missing_close_paren_fails() {
        assert!(matches!(err("(2+3"), ParseErrTyp::MissingParen));
        assert!(matches!(err("sin(x"), ParseErrTyp::MissingParen));
    }

    #[test]
    fn malformed_numbers_fail() {
        assert!(matches!(err("1.2.3"), ParseErrTyp::ParseNum(_)));
    }

    #[test]
    fn empty_and_truncated_input_fail() {
        assert!(matches!(err(""), ParseErrTyp::UnexpectedEnd));
        assert!(matches!(err("2+"), ParseErrTyp::UnexpectedEnd));
        assert!(matches!(err("sin"), ParseErrTyp::UnexpectedEnd));
    }

    #[test]
    fn unsupported_characters_surface_as_lex_errors() {
        assert!(matches!(
            err("x=1"),
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(TokTyp::XEqual))
        ));
        assert!(matches!(
            err("$"),
            ParseErrTyp::LexErr(LexErrTyp::UnexpectedChar('$'))
        ));
    }

    #[test]
    fn error_spans_point_at_the_offender() {
        let err = compile("2*foo(1)").unwrap_err();
        assert_eq!(err.loc.as_str(), "foo");
        assert_eq!(err.loc.start(), 2);
    }
}
