// ll(1) parser for the packet language, with a few bounded lookaheads to tell
// declarations from assignments.

use derive_more::Display;

use super::ast::*;
use super::lexer::{lex, parse_number, Token, TokenKind};
use TokenKind::*;

// SECTION: interface

pub fn parse(code: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(code)?;
    program_r(&mut parser)
}

// A parse error with explanatory message.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct ParseError(pub String);
impl std::error::Error for ParseError {}

impl std::str::FromStr for Program {
    type Err = ParseError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        parse(code)
    }
}

// SECTION: parser functionality

#[derive(Clone, Debug)]
struct Parser<'a> {
    code: &'a str,      // the source code being parsed
    tokens: Vec<Token>, // the token stream
    pos: usize,         // the position in the token stream
}

// utility functions for traversing the token stream and creating error
// messages.
impl<'a> Parser<'a> {
    // always use this to create new Parsers.
    fn new(code: &'a str) -> Result<Self, ParseError> {
        let tokens = lex(code);
        if let Some(pos) = tokens.iter().position(|t| t.kind == Error) {
            let parser = Parser { code, tokens, pos };
            return parser.error(pos, "unrecognized character");
        }
        Ok(Parser {
            code,
            tokens,
            pos: 0,
        })
    }

    // if the next token has the given kind advances the iterator and returns true,
    // otherwise returns false.
    fn eat(&mut self, kind: TokenKind) -> bool {
        match self.peek() {
            Some(k) if k == kind => {
                self.next();
                true
            }
            _ => false,
        }
    }

    // returns an Ok or Err result depending on whether the next token has the given
    // kind, advancing the iterator on an Ok result.
    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            self.error_next(&format!("expected `{kind}`"))
        }
    }

    // expects an identifier and returns its lexeme.
    fn expect_id(&mut self) -> Result<String, ParseError> {
        self.expect(Id)?;
        Ok(self.slice_prev().to_string())
    }

    // advances the iterator and returns the next token in the stream, or None if
    // there are no more tokens.
    fn next(&mut self) -> Option<TokenKind> {
        if !self.end() {
            self.pos += 1;
            Some(self.tokens[self.pos - 1].kind)
        } else {
            None
        }
    }

    // returns the next token (if it exists) without advancing the iterator.
    fn peek(&self) -> Option<TokenKind> {
        self.peek_nth(0)
    }

    // returns the token `n` positions ahead without advancing the iterator.
    fn peek_nth(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    // returns whether the next token has the given kind, without advancing the
    // iterator.
    fn next_is(&self, kind: TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    // returns whether the next token is one of the given kinds.
    fn next_is_one_of(&self, kinds: &[TokenKind]) -> bool {
        matches!(self.peek(), Some(k) if kinds.contains(&k))
    }

    // returns whether we're at the end of the token stream.
    fn end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // returns the lexeme of the token immediately prior to the current token.
    fn slice_prev(&self) -> &str {
        &self.code[self.tokens[self.pos - 1].span.clone()]
    }

    // returns a parse error knowing that the next token to be inspected causes an
    // error (based on a call to peek(), next_is(), etc).
    fn error_next<T>(&self, msg: &str) -> Result<T, ParseError> {
        // handle the case where we're at the end of the token stream.
        if self.pos >= self.tokens.len() {
            Err(ParseError(format!(
                "parse error: unexpected end of input ({msg})\n"
            )))
        } else {
            self.error(self.pos, msg)
        }
    }

    // constructs a parse error given the position of the error-causing token in the
    // token stream.
    fn error<T>(&self, pos: usize, msg: &str) -> Result<T, ParseError> {
        // the position of the error-causing lexeme in the source code.
        let span = &self.tokens[pos].span;

        // the row number and the index of the start of the row containing the
        // error-causing token.
        let (row, row_start) = {
            let mut row = 0;
            let mut row_start = 0;
            for (idx, _) in self.code.match_indices('\n') {
                if idx > span.start {
                    break;
                }
                row += 1;
                row_start = idx + 1;
            }
            (row, row_start)
        };

        // the column where the error-causing lexeme starts.
        let col = span.start - row_start;

        // the line containing the error-causing lexeme.
        let line = self.code.lines().nth(row).unwrap_or_default();

        Err(ParseError(format!(
            "parse error in line {row}, column {col}\n{line}\n{:width$}^\n{msg}\n",
            " ",
            width = col
        )))
    }
}

// SECTION: parsing functions

// FIRST(exp)
const EXP_FIRST: &[TokenKind] = &[
    Num, True, False, Id, OpenParen, OpenBrace, Bang, Dash, Tilde,
];

// program.
fn program_r(parser: &mut Parser) -> Result<Program, ParseError> {
    let mut program = Program::default();
    while let Some(kind) = parser.peek() {
        let decl = match kind {
            Header => Decl::Header(typedef_r(parser, Header)?),
            Struct => Decl::Struct(typedef_r(parser, Struct)?),
            Extern => Decl::Extern(extern_r(parser)?),
            Parser => Decl::Parser(parser_r(parser)?),
            Control => Decl::Control(control_r(parser)?),
            Void | Bit | Bool | Id => Decl::Function(function_r(parser)?),
            _ => parser.error_next(
                "TOP LEVEL: expected: Header, Struct, Extern, Parser, Control, or a function",
            )?,
        };
        program.decls.push(decl);
    }

    Ok(program)
}

// type.
fn type_r(parser: &mut Parser) -> Result<Type, ParseError> {
    let base = if parser.eat(Bit) {
        parser.expect(Lt)?;
        let width = num_r(parser)?;
        parser.expect(Gt)?;
        Type::Bit(width)
    } else if parser.eat(Bool) {
        Type::Bool
    } else if parser.eat(Id) {
        Type::Named(parser.slice_prev().to_string())
    } else {
        return parser.error_next("type_r: expected: Bit, Bool, Id");
    };

    if parser.eat(OpenBracket) {
        let size = num_r(parser)?;
        parser.expect(CloseBracket)?;
        Ok(Type::Stack(Box::new(base), size))
    } else {
        Ok(base)
    }
}

// return type of a function or extern.
fn rettyp_r(parser: &mut Parser) -> Result<Option<Type>, ParseError> {
    if parser.eat(Void) {
        Ok(None)
    } else {
        Ok(Some(type_r(parser)?))
    }
}

// a small unsigned constant (widths, sizes, slice bounds).
fn num_r(parser: &mut Parser) -> Result<u32, ParseError> {
    parser.expect(Num)?;
    match parse_number(parser.slice_prev()) {
        Some((n, None)) => match u32::try_from(n) {
            Ok(n) => Ok(n),
            Err(_) => parser.error(parser.pos - 1, "number too large"),
        },
        _ => parser.error(parser.pos - 1, "expected an unsized number"),
    }
}

// header or struct declaration.
fn typedef_r(parser: &mut Parser, keyword: TokenKind) -> Result<TypeDecl, ParseError> {
    parser.expect(keyword)?;
    let name = parser.expect_id()?;
    parser.expect(OpenBrace)?;

    let mut fields = vec![];
    while !parser.eat(CloseBrace) {
        let typ = type_r(parser)?;
        let name = parser.expect_id()?;
        parser.expect(Semicolon)?;
        fields.push(Field { name, typ });
    }

    Ok(TypeDecl { name, fields })
}

// parameter list, including the parentheses.
fn params_r(parser: &mut Parser) -> Result<Vec<Param>, ParseError> {
    parser.expect(OpenParen)?;
    let mut params = vec![];
    if !parser.eat(CloseParen) {
        loop {
            let direction = if parser.eat(In) {
                Direction::In
            } else if parser.eat(Out) {
                Direction::Out
            } else if parser.eat(InOut) {
                Direction::InOut
            } else {
                Direction::None
            };
            let typ = type_r(parser)?;
            let name = parser.expect_id()?;
            params.push(Param {
                direction,
                typ,
                name,
            });

            if !parser.eat(Comma) {
                break;
            }
        }
        parser.expect(CloseParen)?;
    }
    Ok(params)
}

// external function declaration.
fn extern_r(parser: &mut Parser) -> Result<ExternDecl, ParseError> {
    parser.expect(Extern)?;
    let rettyp = rettyp_r(parser)?;
    let name = parser.expect_id()?;
    let params = params_r(parser)?;
    parser.expect(Semicolon)?;

    Ok(ExternDecl {
        name,
        rettyp,
        params,
    })
}

// function definition.
fn function_r(parser: &mut Parser) -> Result<Function, ParseError> {
    let rettyp = rettyp_r(parser)?;
    let name = parser.expect_id()?;
    let params = params_r(parser)?;
    let body = block_r(parser)?;

    Ok(Function {
        name,
        rettyp,
        params,
        body,
    })
}

// parser definition.
fn parser_r(parser: &mut Parser) -> Result<crate::front_end::ast::Parser, ParseError> {
    parser.expect(Parser)?;
    let name = parser.expect_id()?;
    let params = params_r(parser)?;
    parser.expect(OpenBrace)?;

    let mut locals = vec![];
    while parser.next_is_one_of(&[Bit, Bool, Id]) {
        locals.push(var_decl_r(parser)?);
    }

    let mut states = vec![];
    while !parser.eat(CloseBrace) {
        states.push(state_r(parser)?);
    }

    Ok(crate::front_end::ast::Parser {
        name,
        params,
        locals,
        states,
    })
}

// parser state.
fn state_r(parser: &mut Parser) -> Result<ParserState, ParseError> {
    parser.expect(State)?;
    let name = parser.expect_id()?;
    parser.expect(OpenBrace)?;

    let mut body = vec![];
    while !parser.next_is(Transition) {
        body.push(stmt_r(parser)?);
    }
    let transition = transition_r(parser)?;
    parser.expect(CloseBrace)?;

    Ok(ParserState {
        name,
        body,
        transition,
    })
}

// state transition.
fn transition_r(parser: &mut Parser) -> Result<crate::front_end::ast::Transition, ParseError> {
    parser.expect(Transition)?;
    if !parser.eat(Select) {
        let next = parser.expect_id()?;
        parser.expect(Semicolon)?;
        return Ok(crate::front_end::ast::Transition::Direct(next));
    }

    parser.expect(OpenParen)?;
    let exprs = args_r(parser)?;
    parser.expect(CloseParen)?;
    parser.expect(OpenBrace)?;

    let mut cases = vec![];
    while !parser.eat(CloseBrace) {
        let keys = if parser.eat(Default) {
            None
        } else if parser.eat(OpenParen) {
            let keys = args_r(parser)?;
            parser.expect(CloseParen)?;
            Some(keys)
        } else {
            Some(vec![exp_r(parser)?])
        };
        parser.expect(Colon)?;
        let next = parser.expect_id()?;
        parser.expect(Semicolon)?;
        cases.push(SelectCase { keys, next });
    }

    Ok(crate::front_end::ast::Transition::Select { exprs, cases })
}

// control definition.
fn control_r(parser: &mut Parser) -> Result<crate::front_end::ast::Control, ParseError> {
    parser.expect(Control)?;
    let name = parser.expect_id()?;
    let params = params_r(parser)?;
    parser.expect(OpenBrace)?;

    let mut locals = vec![];
    while !parser.eat(Apply) {
        let local = match parser.peek() {
            Some(Action) => ControlLocal::Action(action_r(parser)?),
            Some(Table) => ControlLocal::Table(table_r(parser)?),
            Some(Bit | Bool | Id) => ControlLocal::Var(var_decl_r(parser)?),
            _ => parser.error_next("control_r: expected: Action, Table, Apply, or a declaration")?,
        };
        locals.push(local);
    }
    let body = block_r(parser)?;
    parser.expect(CloseBrace)?;

    Ok(crate::front_end::ast::Control {
        name,
        params,
        locals,
        body,
    })
}

// action definition.
fn action_r(parser: &mut Parser) -> Result<crate::front_end::ast::Action, ParseError> {
    parser.expect(Action)?;
    let name = parser.expect_id()?;
    let params = params_r(parser)?;
    let body = block_r(parser)?;

    Ok(crate::front_end::ast::Action { name, params, body })
}

// table definition: `key`, `actions`, and `default_action`, in that order.
fn table_r(parser: &mut Parser) -> Result<crate::front_end::ast::Table, ParseError> {
    parser.expect(Table)?;
    let name = parser.expect_id()?;
    parser.expect(OpenBrace)?;

    let mut keys = vec![];
    if parser.eat(Key) {
        parser.expect(Gets)?;
        parser.expect(OpenBrace)?;
        while !parser.eat(CloseBrace) {
            let expr = exp_r(parser)?;
            parser.expect(Colon)?;
            let match_kind = parser.expect_id()?;
            parser.expect(Semicolon)?;
            keys.push(KeyElement { expr, match_kind });
        }
    }

    parser.expect(Actions)?;
    parser.expect(Gets)?;
    parser.expect(OpenBrace)?;
    let mut actions = vec![];
    while !parser.eat(CloseBrace) {
        actions.push(parser.expect_id()?);
        parser.expect(Semicolon)?;
    }

    let mut default_action = None;
    if parser.eat(DefaultAction) {
        parser.expect(Gets)?;
        let name = parser.expect_id()?;
        parser.expect(OpenParen)?;
        let args = if parser.next_is(CloseParen) {
            vec![]
        } else {
            args_r(parser)?
        };
        parser.expect(CloseParen)?;
        parser.expect(Semicolon)?;
        default_action = Some(ActionRef { name, args });
    }
    parser.expect(CloseBrace)?;

    Ok(crate::front_end::ast::Table {
        name,
        keys,
        actions,
        default_action,
    })
}

// variable declaration, possibly initialized.
fn var_decl_r(parser: &mut Parser) -> Result<VarDecl, ParseError> {
    let typ = type_r(parser)?;
    let name = parser.expect_id()?;
    let init = if parser.eat(Gets) {
        Some(exp_r(parser)?)
    } else {
        None
    };
    parser.expect(Semicolon)?;

    Ok(VarDecl { name, typ, init })
}

// whether the next tokens start a declaration rather than an assignment or a
// call: `T x`, `T[4] x`, or a builtin type.
fn next_is_decl(parser: &Parser) -> bool {
    match parser.peek() {
        Some(Bit | Bool) => true,
        Some(Id) => match parser.peek_nth(1) {
            Some(Id) => true,
            Some(OpenBracket) => {
                parser.peek_nth(2) == Some(Num)
                    && parser.peek_nth(3) == Some(CloseBracket)
                    && parser.peek_nth(4) == Some(Id)
            }
            _ => false,
        },
        _ => false,
    }
}

// sequence of statements.
fn block_r(parser: &mut Parser) -> Result<Block, ParseError> {
    parser.expect(OpenBrace)?;
    let mut stmts = vec![];
    while !parser.eat(CloseBrace) {
        stmts.push(stmt_r(parser)?);
    }
    Ok(stmts)
}

// statement.
fn stmt_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    if parser.next_is(OpenBrace) {
        Ok(Stmt::Block(block_r(parser)?))
    } else if parser.eat(If) {
        parser.expect(OpenParen)?;
        let cond = exp_r(parser)?;
        parser.expect(CloseParen)?;
        let tt = block_r(parser)?;
        let ff = if !parser.eat(Else) {
            vec![]
        } else if parser.next_is(If) {
            vec![stmt_r(parser)?]
        } else {
            block_r(parser)?
        };
        Ok(Stmt::If { cond, tt, ff })
    } else if parser.eat(Switch) {
        switch_r(parser)
    } else if parser.eat(Return) {
        let value = if parser.next_is_one_of(EXP_FIRST) {
            Some(exp_r(parser)?)
        } else {
            None
        };
        parser.expect(Semicolon)?;
        Ok(Stmt::Return(value))
    } else if parser.eat(Exit) {
        parser.expect(Semicolon)?;
        Ok(Stmt::Exit)
    } else if next_is_decl(parser) {
        Ok(Stmt::Decl(var_decl_r(parser)?))
    } else if parser.next_is(Id) {
        assign_or_call_r(parser)
    } else {
        parser.error_next("stmt_r: expected: OpenBrace, If, Switch, Return, Exit, Id, or a type")
    }
}

// switch statement, after the `switch` keyword.
fn switch_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    parser.expect(OpenParen)?;
    let selector = exp_r(parser)?;
    parser.expect(CloseParen)?;
    parser.expect(OpenBrace)?;

    let mut cases = vec![];
    while !parser.eat(CloseBrace) {
        let label = if parser.eat(Default) {
            None
        } else {
            Some(parser.expect_id()?)
        };
        parser.expect(Colon)?;
        let body = if parser.next_is(OpenBrace) {
            Some(block_r(parser)?)
        } else {
            None
        };
        cases.push(SwitchCase { label, body });
    }

    Ok(Stmt::Switch { selector, cases })
}

// assignment or call statement.
fn assign_or_call_r(parser: &mut Parser) -> Result<Stmt, ParseError> {
    let start = parser.pos;
    let lhs = postfix_r(parser)?;
    if parser.eat(Gets) {
        let rhs = exp_r(parser)?;
        parser.expect(Semicolon)?;
        Ok(Stmt::Assign { lhs, rhs })
    } else if lhs.is_call() {
        parser.expect(Semicolon)?;
        Ok(Stmt::Call(lhs))
    } else {
        parser.error(start, "assign_or_call_r: expected an assignment or a call")
    }
}

// comma-separated expressions.
fn args_r(parser: &mut Parser) -> Result<Vec<Expr>, ParseError> {
    let mut exprs = vec![exp_r(parser)?];
    while parser.eat(Comma) {
        exprs.push(exp_r(parser)?);
    }
    Ok(exprs)
}

// expression (conditional).
fn exp_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    let cond = or_r(parser)?;
    if parser.eat(Question) {
        let tt = exp_r(parser)?;
        parser.expect(Colon)?;
        let ff = exp_r(parser)?;
        Ok(Expr::Mux {
            cond: Box::new(cond),
            tt: Box::new(tt),
            ff: Box::new(ff),
        })
    } else {
        Ok(cond)
    }
}

// a left-associative binary precedence level.
fn binary_r(
    parser: &mut Parser,
    ops: &[(TokenKind, BinOp)],
    operand: fn(&mut Parser) -> Result<Expr, ParseError>,
) -> Result<Expr, ParseError> {
    let mut base_exp = operand(parser)?;
    'outer: loop {
        for (token, op) in ops {
            if parser.eat(*token) {
                base_exp = Expr::Binary {
                    op: *op,
                    lhs: Box::new(base_exp),
                    rhs: Box::new(operand(parser)?),
                };
                continue 'outer;
            }
        }
        return Ok(base_exp);
    }
}

fn or_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Or, BinOp::Or)], and_r)
}

fn and_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(And, BinOp::And)], bitor_r)
}

fn bitor_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Pipe, BinOp::BitOr)], bitxor_r)
}

fn bitxor_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Caret, BinOp::BitXor)], bitand_r)
}

fn bitand_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Amp, BinOp::BitAnd)], equality_r)
}

fn equality_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Equal, BinOp::Eq), (NotEq, BinOp::NotEq)], relational_r)
}

fn relational_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(
        parser,
        &[
            (Lt, BinOp::Lt),
            (Lte, BinOp::Lte),
            (Gt, BinOp::Gt),
            (Gte, BinOp::Gte),
        ],
        shift_r,
    )
}

fn shift_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Shl, BinOp::Shl), (Shr, BinOp::Shr)], additive_r)
}

fn additive_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Plus, BinOp::Add), (Dash, BinOp::Sub)], mult_r)
}

fn mult_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    binary_r(parser, &[(Star, BinOp::Mul)], unary_r)
}

// prefix operators.
fn unary_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    let op = if parser.eat(Bang) {
        UnOp::Not
    } else if parser.eat(Dash) {
        UnOp::Neg
    } else if parser.eat(Tilde) {
        UnOp::Complement
    } else {
        return postfix_r(parser);
    };
    Ok(Expr::Unary {
        op,
        operand: Box::new(unary_r(parser)?),
    })
}

// member accesses, indexing, slicing, and calls.
fn postfix_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    let mut base_exp = primary_r(parser)?;
    loop {
        if parser.eat(Dot) {
            // `apply` is a keyword but also the method that applies a table.
            let field = if parser.eat(Apply) {
                "apply".to_string()
            } else {
                parser.expect_id()?
            };
            base_exp = Expr::Member {
                base: Box::new(base_exp),
                field,
            };
        } else if parser.eat(OpenBracket) {
            if parser.next_is(Num) && parser.peek_nth(1) == Some(Colon) {
                let hi = num_r(parser)?;
                parser.expect(Colon)?;
                let lo = num_r(parser)?;
                base_exp = Expr::Slice {
                    base: Box::new(base_exp),
                    hi,
                    lo,
                };
            } else {
                base_exp = Expr::Index {
                    base: Box::new(base_exp),
                    index: Box::new(exp_r(parser)?),
                };
            }
            parser.expect(CloseBracket)?;
        } else if parser.eat(OpenParen) {
            let args = if parser.next_is(CloseParen) {
                vec![]
            } else {
                args_r(parser)?
            };
            parser.expect(CloseParen)?;
            base_exp = Expr::Call {
                callee: Box::new(base_exp),
                args,
            };
        } else {
            return Ok(base_exp);
        }
    }
}

// literals, names, parenthesized expressions, and lists.
fn primary_r(parser: &mut Parser) -> Result<Expr, ParseError> {
    if parser.eat(Num) {
        match parse_number(parser.slice_prev()) {
            Some((value, width)) => Ok(Expr::Int { value, width }),
            None => parser.error(parser.pos - 1, "primary_r: malformed or too large number"),
        }
    } else if parser.eat(True) {
        Ok(Expr::Bool(true))
    } else if parser.eat(False) {
        Ok(Expr::Bool(false))
    } else if parser.eat(Id) {
        Ok(Expr::Path(parser.slice_prev().to_string()))
    } else if parser.eat(OpenParen) {
        let exp = exp_r(parser)?;
        parser.expect(CloseParen)?;
        Ok(exp)
    } else if parser.eat(OpenBrace) {
        let items = if parser.next_is(CloseBrace) {
            vec![]
        } else {
            args_r(parser)?
        };
        parser.expect(CloseBrace)?;
        Ok(Expr::List(items))
    } else {
        parser.error_next("primary_r: expected: Num, True, False, Id, OpenParen, OpenBrace")
    }
}
