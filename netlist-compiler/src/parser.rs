//! Recursive-descent parser for the netlist language
//!
//! One-token lookahead. Sections must appear in order: `INPUT`, `OUTPUT`,
//! `VAR`, `IN`, then one equation per non-input variable. All name, width,
//! and range checking happens here, so the later stages only ever see a
//! well-formed [`Netlist`].

use crate::ast::{Arg, BinaryOp, Constant, Expr, Netlist, VarId, VarInfo};
use crate::error::{CompileError, Result};
use crate::lexer::{Lexer, SourcePos, Token, TokenKind};
use netlist_spec::{bus_max_value, MAX_BUS_SIZE};
use std::collections::HashMap;

/// Parse a complete netlist source text into the typed IR.
pub fn parse(source: &str) -> Result<Netlist> {
    Parser::new(source)?.parse_program()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    token: Token<'a>,
    netlist: Netlist,
    assigned_at: HashMap<VarId, SourcePos>,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let token = lexer.next_token()?;
        Ok(Self {
            lexer,
            token,
            netlist: Netlist::new(),
            assigned_at: HashMap::new(),
        })
    }

    fn consume(&mut self) -> Result<()> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected(&self, expected: &[TokenKind]) -> CompileError {
        let expected = expected
            .iter()
            .map(|kind| kind.describe())
            .collect::<Vec<_>>()
            .join("' or '");
        let found = if self.token.text.is_empty() {
            self.token.kind.describe().to_string()
        } else {
            self.token.text.to_string()
        };
        CompileError::UnexpectedToken {
            found,
            expected: format!("'{}'", expected),
            pos: self.token.pos,
        }
    }

    fn expect(&self, kind: TokenKind) -> Result<()> {
        if self.token.kind != kind {
            return Err(self.unexpected(&[kind]));
        }
        Ok(())
    }

    fn token_assert(&self, kinds: &[TokenKind]) -> Result<()> {
        if !kinds.contains(&self.token.kind) {
            return Err(self.unexpected(kinds));
        }
        Ok(())
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn parse_program(mut self) -> Result<Netlist> {
        let input_refs = self.parse_io_list(TokenKind::Input, TokenKind::Output)?;
        let output_refs = self.parse_io_list(TokenKind::Output, TokenKind::Var)?;
        self.parse_var_decls()?;
        self.apply_io_flags(&input_refs, &output_refs)?;
        self.parse_equations()?;

        // Every declared non-input variable needs an equation.
        for id in 0..self.netlist.vars.len() {
            let var = self.netlist.var(id);
            if !var.is_input && !self.netlist.has_equation(id) {
                return Err(CompileError::MissingEquation {
                    name: var.name.clone(),
                    pos: var.pos,
                });
            }
        }

        Ok(self.netlist)
    }

    /// Parse an `INPUT`/`OUTPUT` identifier list, stopping at `terminator`.
    fn parse_io_list(
        &mut self,
        section: TokenKind,
        terminator: TokenKind,
    ) -> Result<Vec<(String, SourcePos)>> {
        self.expect(section)?;
        self.consume()?;

        let mut refs: Vec<(String, SourcePos)> = Vec::new();
        while self.token.kind != terminator {
            self.expect(TokenKind::Identifier)?;
            let name = self.token.text.to_string();
            let pos = self.token.pos;

            if let Some((_, prev)) = refs.iter().find(|(existing, _)| *existing == name) {
                let prev = *prev;
                return Err(if section == TokenKind::Input {
                    CompileError::DuplicateInput { name, pos, prev }
                } else {
                    CompileError::DuplicateOutput { name, pos, prev }
                });
            }
            refs.push((name, pos));
            self.consume()?;

            self.token_assert(&[TokenKind::Comma, terminator])?;
            if self.token.kind == TokenKind::Comma {
                self.consume()?;
            }
        }
        Ok(refs)
    }

    fn parse_var_decls(&mut self) -> Result<()> {
        self.expect(TokenKind::Var)?;
        self.consume()?;

        while self.token.kind != TokenKind::In {
            self.expect(TokenKind::Identifier)?;
            let name = self.token.text.to_string();
            let pos = self.token.pos;
            self.consume()?;

            let width = if self.token.kind == TokenKind::Colon {
                self.consume()?;
                self.parse_bus_size()?
            } else {
                1
            };

            if let Some(existing) = self.netlist.lookup(&name) {
                let prev = self.netlist.var(existing).pos;
                return Err(CompileError::DuplicateVariable { name, pos, prev });
            }
            let _ = self.netlist.declare(VarInfo {
                name,
                width,
                is_input: false,
                is_output: false,
                pos,
            });

            self.token_assert(&[TokenKind::Comma, TokenKind::In])?;
            if self.token.kind == TokenKind::Comma {
                self.consume()?;
                // A trailing comma before IN is not allowed.
                self.expect(TokenKind::Identifier)?;
            }
        }
        Ok(())
    }

    fn apply_io_flags(
        &mut self,
        input_refs: &[(String, SourcePos)],
        output_refs: &[(String, SourcePos)],
    ) -> Result<()> {
        for (name, pos) in input_refs {
            match self.netlist.lookup(name) {
                Some(id) => {
                    self.netlist.vars[id].is_input = true;
                    self.netlist.inputs.push(id);
                }
                None => {
                    return Err(CompileError::MissingInputDeclaration {
                        name: name.clone(),
                        pos: *pos,
                    })
                }
            }
        }
        for (name, pos) in output_refs {
            match self.netlist.lookup(name) {
                Some(id) => {
                    self.netlist.vars[id].is_output = true;
                    self.netlist.outputs.push(id);
                }
                None => {
                    return Err(CompileError::MissingOutputDeclaration {
                        name: name.clone(),
                        pos: *pos,
                    })
                }
            }
        }
        Ok(())
    }

    fn parse_equations(&mut self) -> Result<()> {
        self.expect(TokenKind::In)?;
        self.consume()?;

        while self.token.kind != TokenKind::Eoi {
            self.expect(TokenKind::Identifier)?;
            let name = self.token.text.to_string();
            let pos = self.token.pos;

            let var = self
                .netlist
                .lookup(&name)
                .ok_or_else(|| CompileError::UndeclaredVariable {
                    name: name.clone(),
                    pos,
                })?;
            if self.netlist.var(var).is_input {
                return Err(CompileError::AssignmentToInput { name, pos });
            }
            if let Some(prev) = self.assigned_at.get(&var) {
                return Err(CompileError::Reassignment {
                    name,
                    pos,
                    prev: *prev,
                });
            }

            self.consume()?;
            self.expect(TokenKind::Equal)?;
            self.consume()?;

            let expr = self.parse_expression()?;
            let inferred = self.netlist.expr_width(&expr);
            let declared = self.netlist.var(var).width;
            if inferred != declared {
                return Err(CompileError::EquationWidthMismatch {
                    name,
                    declared,
                    inferred,
                    pos,
                });
            }
            self.netlist.define(var, expr);
            self.assigned_at.insert(var, pos);
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self) -> Result<Expr> {
        let pos = self.token.pos;
        match self.token.kind {
            TokenKind::Identifier
            | TokenKind::Integer
            | TokenKind::BinaryConstant
            | TokenKind::DecimalConstant
            | TokenKind::HexadecimalConstant => Ok(Expr::Arg(self.parse_argument()?)),

            TokenKind::Not => {
                self.consume()?;
                Ok(Expr::Not(self.parse_argument()?))
            }

            TokenKind::And
            | TokenKind::Or
            | TokenKind::Nand
            | TokenKind::Nor
            | TokenKind::Xor
            | TokenKind::Xnor => {
                let op = match self.token.kind {
                    TokenKind::And => BinaryOp::And,
                    TokenKind::Or => BinaryOp::Or,
                    TokenKind::Nand => BinaryOp::Nand,
                    TokenKind::Nor => BinaryOp::Nor,
                    TokenKind::Xor => BinaryOp::Xor,
                    _ => BinaryOp::Xnor,
                };
                self.consume()?;
                let lhs = self.parse_argument()?;
                let rhs = self.parse_argument()?;
                self.assert_same_width(&lhs, &rhs, pos)?;
                Ok(Expr::Binary { op, lhs, rhs })
            }

            TokenKind::Mux => {
                self.consume()?;
                let choice = self.parse_argument()?;
                let a = self.parse_argument()?;
                let b = self.parse_argument()?;
                self.assert_width_eq(&choice, 1, pos)?;
                self.assert_same_width(&a, &b, pos)?;
                Ok(Expr::Mux { choice, a, b })
            }

            TokenKind::Reg => {
                self.consume()?;
                self.expect(TokenKind::Identifier)?;
                let var = self.netlist.lookup(self.token.text).ok_or_else(|| {
                    CompileError::UndeclaredVariable {
                        name: self.token.text.to_string(),
                        pos: self.token.pos,
                    }
                })?;
                self.consume()?;
                Ok(Expr::Reg(var))
            }

            TokenKind::Concat => {
                self.consume()?;
                let lhs = self.parse_argument()?;
                let rhs = self.parse_argument()?;
                let total =
                    self.netlist.arg_width(&lhs) as u16 + self.netlist.arg_width(&rhs) as u16;
                if total > MAX_BUS_SIZE as u16 {
                    return Err(CompileError::WidthOutOfRange {
                        width: total as u64,
                        pos,
                    });
                }
                Ok(Expr::Concat { lhs, rhs })
            }

            TokenKind::Select => {
                self.consume()?;
                let index = self.parse_decimal_int()?;
                let arg = self.parse_argument()?;
                let width = self.netlist.arg_width(&arg);
                if index >= width as u64 {
                    return Err(CompileError::SelectOutOfRange { index, width, pos });
                }
                Ok(Expr::Select {
                    bit: index as u8,
                    arg,
                })
            }

            TokenKind::Slice => {
                self.consume()?;
                let first = self.parse_decimal_int()?;
                let end = self.parse_decimal_int()?;
                let arg = self.parse_argument()?;
                let width = self.netlist.arg_width(&arg);
                if first > end || end >= width as u64 {
                    return Err(CompileError::SliceBounds {
                        first,
                        end,
                        width,
                        pos,
                    });
                }
                Ok(Expr::Slice {
                    first: first as u8,
                    end: end as u8,
                    arg,
                })
            }

            TokenKind::Rom => {
                self.consume()?;
                let addr_size = self.parse_bus_size()?;
                let word_size = self.parse_bus_size()?;
                let read_addr = self.parse_argument()?;
                self.assert_width_eq(&read_addr, addr_size, pos)?;
                Ok(Expr::Rom {
                    addr_size,
                    word_size,
                    read_addr,
                })
            }

            TokenKind::Ram => {
                self.consume()?;
                let addr_size = self.parse_bus_size()?;
                let word_size = self.parse_bus_size()?;
                let read_addr = self.parse_argument()?;
                let write_enable = self.parse_argument()?;
                let write_addr = self.parse_argument()?;
                let write_data = self.parse_argument()?;
                self.assert_width_eq(&read_addr, addr_size, pos)?;
                self.assert_width_eq(&write_enable, 1, pos)?;
                self.assert_width_eq(&write_addr, addr_size, pos)?;
                self.assert_width_eq(&write_data, word_size, pos)?;
                Ok(Expr::Ram {
                    addr_size,
                    word_size,
                    read_addr,
                    write_enable,
                    write_addr,
                    write_data,
                })
            }

            TokenKind::Eoi => Err(CompileError::MissingExpression { pos }),

            _ => Err(self.unexpected(&[
                TokenKind::Identifier,
                TokenKind::Integer,
                TokenKind::BinaryConstant,
                TokenKind::DecimalConstant,
                TokenKind::HexadecimalConstant,
                TokenKind::Not,
                TokenKind::And,
                TokenKind::Nand,
                TokenKind::Or,
                TokenKind::Nor,
                TokenKind::Xor,
                TokenKind::Xnor,
                TokenKind::Mux,
                TokenKind::Reg,
                TokenKind::Concat,
                TokenKind::Select,
                TokenKind::Slice,
                TokenKind::Rom,
                TokenKind::Ram,
            ])),
        }
    }

    fn parse_argument(&mut self) -> Result<Arg> {
        match self.token.kind {
            TokenKind::Identifier => {
                let var = self.netlist.lookup(self.token.text).ok_or_else(|| {
                    CompileError::UndeclaredVariable {
                        name: self.token.text.to_string(),
                        pos: self.token.pos,
                    }
                })?;
                self.consume()?;
                Ok(Arg::Var(var))
            }
            TokenKind::Integer => Ok(Arg::Const(self.parse_integer_literal()?)),
            TokenKind::BinaryConstant => Ok(Arg::Const(self.parse_binary_constant()?)),
            TokenKind::DecimalConstant => Ok(Arg::Const(self.parse_decimal_constant()?)),
            TokenKind::HexadecimalConstant => Ok(Arg::Const(self.parse_hexadecimal_constant()?)),
            _ => Err(self.unexpected(&[
                TokenKind::Identifier,
                TokenKind::Integer,
                TokenKind::BinaryConstant,
                TokenKind::DecimalConstant,
                TokenKind::HexadecimalConstant,
            ])),
        }
    }

    fn assert_same_width(&self, lhs: &Arg, rhs: &Arg, pos: SourcePos) -> Result<()> {
        let lhs_width = self.netlist.arg_width(lhs);
        let rhs_width = self.netlist.arg_width(rhs);
        if lhs_width != rhs_width {
            return Err(CompileError::ArgumentWidthMismatch {
                lhs: self.netlist.arg_repr(lhs),
                lhs_width,
                rhs: self.netlist.arg_repr(rhs),
                rhs_width,
                pos,
            });
        }
        Ok(())
    }

    fn assert_width_eq(&self, arg: &Arg, expected: u8, pos: SourcePos) -> Result<()> {
        let found = self.netlist.arg_width(arg);
        if found != expected {
            return Err(CompileError::ArgumentWidthNotEqual {
                arg: self.netlist.arg_repr(arg),
                found,
                expected,
                pos,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Numbers
    // ========================================================================

    /// Parse the current INTEGER token in base 10 without a range restriction.
    fn parse_decimal_int(&mut self) -> Result<u64> {
        self.expect(TokenKind::Integer)?;
        let value = u64::from_str_radix(self.token.text, 10).map_err(|_| {
            CompileError::MalformedLiteral {
                text: self.token.text.to_string(),
                base: 10,
                pos: self.token.pos,
            }
        })?;
        self.consume()?;
        Ok(value)
    }

    /// Parse the current INTEGER token as a bus size (1 to 64).
    fn parse_bus_size(&mut self) -> Result<u8> {
        let pos = self.token.pos;
        let value = self.parse_decimal_int()?;
        if value == 0 || value > MAX_BUS_SIZE as u64 {
            return Err(CompileError::WidthOutOfRange { width: value, pos });
        }
        Ok(value as u8)
    }

    /// `: N` after a constant, if present.
    fn parse_size_spec(&mut self) -> Result<Option<u8>> {
        if self.token.kind == TokenKind::Colon {
            self.consume()?;
            return Ok(Some(self.parse_bus_size()?));
        }
        Ok(None)
    }

    fn literal_value(&self, base: u32) -> Result<u64> {
        u64::from_str_radix(self.token.text, base).map_err(|_| CompileError::MalformedLiteral {
            text: self.token.text.to_string(),
            base,
            pos: self.token.pos,
        })
    }

    /// Bare digit run in argument position: all digits must be 0 or 1, the
    /// width is the digit count, the value the base-2 interpretation.
    fn parse_integer_literal(&mut self) -> Result<Constant> {
        self.expect(TokenKind::Integer)?;
        let pos = self.token.pos;
        let digits = self.token.text.len() as u64;
        if digits > MAX_BUS_SIZE as u64 {
            return Err(CompileError::WidthOutOfRange { width: digits, pos });
        }
        let value = self.literal_value(2)?;
        self.consume()?;
        Ok(Constant {
            width: digits as u8,
            value,
        })
    }

    fn parse_binary_constant(&mut self) -> Result<Constant> {
        self.expect(TokenKind::BinaryConstant)?;
        let text = self.token.text.to_string();
        let pos = self.token.pos;
        let value = self.literal_value(2)?;
        self.consume()?;

        match self.parse_size_spec()? {
            Some(width) => self.constant_with_width(text, value, width, pos),
            None => {
                let digits = text.len() as u64;
                if digits > MAX_BUS_SIZE as u64 {
                    return Err(CompileError::WidthOutOfRange { width: digits, pos });
                }
                Ok(Constant {
                    width: digits as u8,
                    value,
                })
            }
        }
    }

    fn parse_decimal_constant(&mut self) -> Result<Constant> {
        self.expect(TokenKind::DecimalConstant)?;
        let text = self.token.text.to_string();
        let pos = self.token.pos;
        let value = self.literal_value(10)?;
        self.consume()?;

        match self.parse_size_spec()? {
            Some(width) => self.constant_with_width(text, value, width, pos),
            // Decimal digits say nothing about a bus width, so the size
            // specifier is mandatory here.
            None => Err(CompileError::MissingWidthSpec { text, pos }),
        }
    }

    fn parse_hexadecimal_constant(&mut self) -> Result<Constant> {
        self.expect(TokenKind::HexadecimalConstant)?;
        let text = self.token.text.to_string();
        let pos = self.token.pos;
        let value = self.literal_value(16)?;
        self.consume()?;

        match self.parse_size_spec()? {
            Some(width) => self.constant_with_width(text, value, width, pos),
            None => {
                // One hexadecimal digit is four bits.
                let width = text.len() as u64 * 4;
                if width > MAX_BUS_SIZE as u64 {
                    return Err(CompileError::WidthOutOfRange { width, pos });
                }
                Ok(Constant {
                    width: width as u8,
                    value,
                })
            }
        }
    }

    fn constant_with_width(
        &self,
        text: String,
        value: u64,
        width: u8,
        pos: SourcePos,
    ) -> Result<Constant> {
        if value > bus_max_value(width) {
            return Err(CompileError::LiteralOverflow { text, width, pos });
        }
        Ok(Constant { width, value })
    }
}
