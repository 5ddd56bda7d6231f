//! Type annotations in scenario files.
//!
//! ```text
//! type     := receiver? '(' types? ')' '->' type
//!           | '(' type ')' '?'?
//!           | named '?'?
//! receiver := named '.'
//! named    := IDENT ('<' types '>')?
//! ```
//!
//! `Int.(String) -> R` is a function type with receiver `Int`.

use anyhow::{Result, bail};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSyntax {
    Named { name: String, args: Vec<TypeSyntax> },
    Nullable(Box<TypeSyntax>),
    Function {
        receiver: Option<Box<TypeSyntax>>,
        params: Vec<TypeSyntax>,
        ret: Box<TypeSyntax>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Punct(&'static str),
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '<' => tokens.push(Token::Punct("<")),
            '>' => tokens.push(Token::Punct(">")),
            '(' => tokens.push(Token::Punct("(")),
            ')' => tokens.push(Token::Punct(")")),
            ',' => tokens.push(Token::Punct(",")),
            '?' => tokens.push(Token::Punct("?")),
            '.' => tokens.push(Token::Punct(".")),
            '-' if chars.peek().is_some_and(|(_, c)| *c == '>') => {
                chars.next();
                tokens.push(Token::Punct("->"));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some((i, c)) = chars.peek().copied() {
                    if !(c.is_alphanumeric() || c == '_') {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Ident(input[start..end].to_string()));
            }
            other => bail!("unexpected character '{other}' in type '{input}'"),
        }
    }
    Ok(tokens)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == punct)
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.at(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<()> {
        if !self.eat(punct) {
            bail!("expected '{punct}' in type '{}'", self.source);
        }
        Ok(())
    }

    fn parse_type(&mut self) -> Result<TypeSyntax> {
        if self.eat("(") {
            let inner = self.parse_list(")")?;
            if self.eat("->") {
                return Ok(TypeSyntax::Function {
                    receiver: None,
                    params: inner,
                    ret: Box::new(self.parse_type()?),
                });
            }
            let [single] = <[TypeSyntax; 1]>::try_from(inner).map_err(|_| {
                anyhow::anyhow!("expected '->' after parameter list in type '{}'", self.source)
            })?;
            return Ok(self.nullable_suffix(single));
        }

        let named = self.parse_named()?;
        if self.at(".") {
            self.pos += 1;
            self.expect("(")?;
            let params = self.parse_list(")")?;
            self.expect("->")?;
            return Ok(TypeSyntax::Function {
                receiver: Some(Box::new(named)),
                params,
                ret: Box::new(self.parse_type()?),
            });
        }
        Ok(self.nullable_suffix(named))
    }

    fn nullable_suffix(&mut self, ty: TypeSyntax) -> TypeSyntax {
        if self.eat("?") {
            TypeSyntax::Nullable(Box::new(ty))
        } else {
            ty
        }
    }

    fn parse_named(&mut self) -> Result<TypeSyntax> {
        let Some(Token::Ident(name)) = self.peek().cloned() else {
            bail!("expected a type name in '{}'", self.source);
        };
        self.pos += 1;
        let args = if self.eat("<") {
            self.parse_list(">")?
        } else {
            Vec::new()
        };
        Ok(TypeSyntax::Named { name, args })
    }

    /// Comma-separated types up to and including `close`.
    fn parse_list(&mut self, close: &str) -> Result<Vec<TypeSyntax>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_type()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }
}

pub fn parse_type(source: &str) -> Result<TypeSyntax> {
    let mut parser = Parser {
        source,
        tokens: tokenize(source)?,
        pos: 0,
    };
    let ty = parser.parse_type()?;
    if parser.pos != parser.tokens.len() {
        bail!("trailing input in type '{source}'");
    }
    Ok(ty)
}

#[cfg(test)]
#[path = "../tests/type_syntax_tests.rs"]
mod type_syntax_tests;
