//! Parser for the netlist.

use std::collections::HashMap;

use super::ast::*;
use super::lexer::{parse_value, Lexer, Token, TokenKind};
use crate::error::{KirchhoffError, Result};

/// Line-oriented netlist parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser and prime the first token.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire netlist.
    pub fn parse(&mut self) -> Result<NetlistAst> {
        let mut ast = NetlistAst::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast)?,
                TokenKind::Identifier => self.parse_declaration(&mut ast)?,
                _ => {
                    return Err(KirchhoffError::parse(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(KirchhoffError::parse(
                        self.current.line,
                        format!("unexpected trailing token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn at_line_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(KirchhoffError::parse(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn parse_directive(&mut self, ast: &mut NetlistAst) -> Result<()> {
        let directive = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match directive.to_lowercase().as_str() {
            ".option" | ".options" => {
                while !self.at_line_end() {
                    let key = self.expect(TokenKind::Identifier)?.text.to_lowercase();
                    self.expect(TokenKind::Equals)?;
                    let text = self.expect(TokenKind::Number)?.text;
                    let value = parse_value(&text)
                        .ok_or_else(|| KirchhoffError::parse(line, format!("invalid number: {}", text)))?;
                    ast.options.insert(key, value);
                }
                Ok(())
            }
            _ => Err(KirchhoffError::parse(
                line,
                format!("unknown directive: {}", directive),
            )),
        }
    }

    fn parse_declaration(&mut self, ast: &mut NetlistAst) -> Result<()> {
        let name = self.current.text.clone();
        let line = self.current.line;
        self.advance()?;

        match Declaration::from_name(&name) {
            Some(Declaration::Wire) => {
                let wire = self.parse_wire(name, line)?;
                ast.wires.push(wire);
            }
            Some(Declaration::Device(kind)) => {
                let device = self.parse_device(kind, name, line)?;
                ast.devices.push(device);
            }
            None => {
                return Err(KirchhoffError::UnknownComponentType {
                    component_type: name,
                    line,
                })
            }
        }
        Ok(())
    }

    fn parse_device(&mut self, kind: DeviceKind, name: String, line: usize) -> Result<DeviceDef> {
        let mut values = Vec::new();
        let mut state = None;
        let mut params = HashMap::new();

        while !self.at_line_end() {
            match self.current.kind {
                TokenKind::Number => {
                    let text = self.current.text.clone();
                    self.advance()?;
                    let value = parse_value(&text).ok_or_else(|| {
                        KirchhoffError::invalid_component(&name, line, format!("invalid number: {}", text))
                    })?;
                    values.push(value);
                }
                TokenKind::Identifier => {
                    let word = self.current.text.clone();
                    self.advance()?;
                    if self.current.kind == TokenKind::Equals {
                        self.advance()?;
                        let value = self.parse_param_value(&name, line)?;
                        params.insert(word.to_lowercase(), value);
                    } else if state.is_none() {
                        state = Some(word);
                    } else {
                        return Err(KirchhoffError::invalid_component(
                            &name,
                            line,
                            format!("unexpected word '{}'", word),
                        ));
                    }
                }
                _ => {
                    return Err(KirchhoffError::invalid_component(
                        &name,
                        line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(DeviceDef {
            kind,
            name,
            values,
            state,
            params,
            line,
        })
    }

    fn parse_wire(&mut self, name: String, line: usize) -> Result<WireDef> {
        let mut ends: [Option<String>; 2] = [None, None];
        for end in ends.iter_mut() {
            let tok = self.current.clone();
            if tok.kind != TokenKind::Identifier {
                return Err(KirchhoffError::invalid_component(
                    &name,
                    line,
                    "a wire needs two endpoints (DEVICE.key or nc)",
                ));
            }
            self.advance()?;
            if !tok.text.eq_ignore_ascii_case("nc") {
                *end = Some(tok.text);
            }
        }

        let mut params = HashMap::new();
        while !self.at_line_end() {
            let key = self.expect(TokenKind::Identifier)?.text.to_lowercase();
            self.expect(TokenKind::Equals)?;
            let value = self.parse_param_value(&name, line)?;
            params.insert(key, value);
        }

        Ok(WireDef {
            name,
            ends,
            params,
            line,
        })
    }

    fn parse_param_value(&mut self, name: &str, line: usize) -> Result<ParamValue> {
        let tok = self.current.clone();
        let value = match tok.kind {
            TokenKind::Number => ParamValue::Number(parse_value(&tok.text).ok_or_else(|| {
                KirchhoffError::invalid_component(name, line, format!("invalid number: {}", tok.text))
            })?),
            TokenKind::Identifier => ParamValue::Word(tok.text.to_lowercase()),
            _ => {
                return Err(KirchhoffError::invalid_component(
                    name,
                    line,
                    "expected parameter value",
                ))
            }
        };
        self.advance()?;
        Ok(value)
    }
}
