// Canonical source form of the tree.
//
// The output parses back to the same tree, so tests compare programs by
// comparing printed text.  Nested operators are always parenthesized, which
// keeps the printer independent of the parser's precedence table.

use std::fmt::{Display, Formatter, Result as FmtResult, Write};

use super::*;

const INDENT: &str = "    ";

// SECTION: printer

struct Printer {
    out: String,
    level: usize,
}

impl Printer {
    fn new() -> Self {
        Printer {
            out: String::new(),
            level: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.level {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    // prints `header {`, the nested lines produced by `body`, and `}`.
    fn nested(&mut self, header: &str, body: impl FnOnce(&mut Self)) {
        self.line(&format!("{header}{{"));
        self.level += 1;
        body(self);
        self.level -= 1;
        self.line("}");
    }

    fn block(&mut self, header: &str, stmts: &[Stmt]) {
        self.nested(header, |p| {
            for stmt in stmts {
                p.stmt(stmt);
            }
        });
    }

    fn decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Header(t) => self.type_decl("header", t),
            Decl::Struct(t) => self.type_decl("struct", t),
            Decl::Extern(e) => self.line(&format!(
                "extern {} {}({});",
                RetType(&e.rettyp),
                e.name,
                Params(&e.params)
            )),
            Decl::Function(f) => self.block(
                &format!("{} {}({}) ", RetType(&f.rettyp), f.name, Params(&f.params)),
                &f.body,
            ),
            Decl::Parser(p) => self.parser(p),
            Decl::Control(c) => self.control(c),
        }
    }

    fn type_decl(&mut self, keyword: &str, t: &TypeDecl) {
        self.nested(&format!("{keyword} {} ", t.name), |p| {
            for field in &t.fields {
                p.line(&format!("{} {};", field.typ, field.name));
            }
        });
    }

    fn parser(&mut self, parser: &Parser) {
        self.nested(
            &format!("parser {}({}) ", parser.name, Params(&parser.params)),
            |p| {
                for local in &parser.locals {
                    p.line(&local.to_string());
                }
                for state in &parser.states {
                    p.nested(&format!("state {} ", state.name), |p| {
                        for stmt in &state.body {
                            p.stmt(stmt);
                        }
                        p.transition(&state.transition);
                    });
                }
            },
        );
    }

    fn transition(&mut self, transition: &Transition) {
        match transition {
            Transition::Direct(next) => self.line(&format!("transition {next};")),
            Transition::Select { exprs, cases } => self.nested(
                &format!("transition select ({}) ", Exprs(exprs)),
                |p| {
                    for case in cases {
                        match &case.keys {
                            None => p.line(&format!("default: {};", case.next)),
                            Some(keys) if keys.len() == 1 => {
                                p.line(&format!("{}: {};", keys[0], case.next))
                            }
                            Some(keys) => p.line(&format!("({}): {};", Exprs(keys), case.next)),
                        }
                    }
                },
            ),
        }
    }

    fn control(&mut self, control: &Control) {
        self.nested(
            &format!("control {}({}) ", control.name, Params(&control.params)),
            |p| {
                for local in &control.locals {
                    match local {
                        ControlLocal::Var(v) => p.line(&v.to_string()),
                        ControlLocal::Action(a) => p.block(
                            &format!("action {}({}) ", a.name, Params(&a.params)),
                            &a.body,
                        ),
                        ControlLocal::Table(t) => p.table(t),
                    }
                }
                p.block("apply ", &control.body);
            },
        );
    }

    fn table(&mut self, table: &Table) {
        self.nested(&format!("table {} ", table.name), |p| {
            if !table.keys.is_empty() {
                p.nested("key = ", |p| {
                    for key in &table.keys {
                        p.line(&format!("{} : {};", key.expr, key.match_kind));
                    }
                });
            }
            p.nested("actions = ", |p| {
                for action in &table.actions {
                    p.line(&format!("{action};"));
                }
            });
            if let Some(default) = &table.default_action {
                p.line(&format!(
                    "default_action = {}({});",
                    default.name,
                    Exprs(&default.args)
                ));
            }
        });
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(v) => self.line(&v.to_string()),
            Stmt::Assign { lhs, rhs } => self.line(&format!("{lhs} = {rhs};")),
            Stmt::Call(e) => self.line(&format!("{e};")),
            Stmt::If { cond, tt, ff } => {
                self.block(&format!("if ({cond}) "), tt);
                if !ff.is_empty() {
                    // glue `else` onto the closing brace of the true branch.
                    self.out.truncate(self.out.len() - 1);
                    self.out.push_str(" else {\n");
                    self.level += 1;
                    for s in ff {
                        self.stmt(s);
                    }
                    self.level -= 1;
                    self.line("}");
                }
            }
            Stmt::Block(stmts) => self.block("", stmts),
            Stmt::Switch { selector, cases } => {
                self.nested(&format!("switch ({selector}) "), |p| {
                    for case in cases {
                        let label = case.label.as_deref().unwrap_or("default");
                        match &case.body {
                            Some(body) => p.block(&format!("{label}: "), body),
                            None => p.line(&format!("{label}:")),
                        }
                    }
                })
            }
            Stmt::Return(None) => self.line("return;"),
            Stmt::Return(Some(e)) => self.line(&format!("return {e};")),
            Stmt::Exit => self.line("exit;"),
        }
    }
}

// SECTION: Display implementations

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut printer = Printer::new();
        for (i, decl) in self.decls.iter().enumerate() {
            if i > 0 {
                printer.out.push('\n');
            }
            printer.decl(decl);
        }
        f.write_str(&printer.out)
    }
}

impl Display for Decl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut printer = Printer::new();
        printer.decl(self);
        f.write_str(&printer.out)
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut printer = Printer::new();
        printer.stmt(self);
        f.write_str(printer.out.trim_end())
    }
}

impl Display for VarDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.init {
            Some(init) => write!(f, "{} {} = {};", self.typ, self.name, init),
            None => write!(f, "{} {};", self.typ, self.name),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Type::Bit(width) => write!(f, "bit<{width}>"),
            Type::Bool => write!(f, "bool"),
            Type::Named(name) => write!(f, "{name}"),
            Type::Stack(elem, size) => write!(f, "{elem}[{size}]"),
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.direction {
            Direction::None => write!(f, "{} {}", self.typ, self.name),
            dir => write!(f, "{dir} {} {}", self.typ, self.name),
        }
    }
}

struct RetType<'a>(&'a Option<Type>);

impl Display for RetType<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.0 {
            Some(t) => write!(f, "{t}"),
            None => write!(f, "void"),
        }
    }
}

struct Params<'a>(&'a [Param]);

impl Display for Params<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, param) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        Ok(())
    }
}

struct Exprs<'a>(&'a [Expr]);

impl Display for Exprs<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

// an operand, parenthesized unless it is atomic.
struct Operand<'a>(&'a Expr);

impl Display for Operand<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.0 {
            e @ (Expr::Unary { .. } | Expr::Binary { .. } | Expr::Mux { .. }) => {
                f.write_char('(')?;
                e.fmt(f)?;
                f.write_char(')')
            }
            e => e.fmt(f),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Expr::Int { value, width: None } => write!(f, "{value}"),
            Expr::Int {
                value,
                width: Some(w),
            } => write!(f, "{w}w{value}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Path(name) => write!(f, "{name}"),
            Expr::Member { base, field } => write!(f, "{}.{field}", Operand(base)),
            Expr::Index { base, index } => write!(f, "{}[{index}]", Operand(base)),
            Expr::Slice { base, hi, lo } => write!(f, "{}[{hi}:{lo}]", Operand(base)),
            Expr::Unary { op, operand } => match &**operand {
                e @ (Expr::Binary { .. } | Expr::Mux { .. }) => write!(f, "{op}({e})"),
                e => write!(f, "{op}{}", Operand(e)),
            },
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "{} {op} {}", Operand(lhs), Operand(rhs))
            }
            Expr::Mux { cond, tt, ff } => {
                write!(f, "{} ? {} : {}", Operand(cond), Operand(tt), Operand(ff))
            }
            Expr::Call { callee, args } => write!(f, "{}({})", Operand(callee), Exprs(args)),
            Expr::List(items) => write!(f, "{{{}}}", Exprs(items)),
        }
    }
}
