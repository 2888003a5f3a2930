// check whether a Program is valid:
//
// - no duplicates among top-level declarations, and no duplicate fields in a
//   header or struct.
// - every type names a declared header or struct; stacks hold headers; bit
//   widths are between 1 and 64.
// - no name is declared twice inside one control, parser, or function
//   (variables, parameters, actions, and tables share one namespace there).
// - every used variable is declared before its use and is visible at the use.
// - member accesses name existing fields or known methods (`apply`,
//   `isValid`, `setValid`, `setInvalid`, `push_front`, `pop_front`), and
//   table results (`hit`, `miss`, `action_run`) are only taken from
//   `t.apply()`.
// - calls target a declared function, extern, or action with the right number
//   of arguments; arguments bound to `out`/`inout` parameters are assignable.
// - tables list declared actions and their default action is one of them.
// - switch statements select on `t.apply().action_run` and their labels are
//   actions of `t`.
// - parser transitions name declared states (or `accept`/`reject`), and every
//   parser has a `start` state.
//
// widths of operands are not checked against each other.

use std::collections::{BTreeMap as Map, BTreeSet as Set};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::AddAssign;

use super::*;
use crate::front_end::type_map::TypeMap;

// SECTION: errors

// every problem found in a program, one message per problem.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationError {
    pub errors: Vec<String>,
}

impl ValidationError {
    pub fn new() -> Self {
        ValidationError::default()
    }

    pub fn from_string(msg: String) -> Self {
        ValidationError { errors: vec![msg] }
    }

    pub fn add_error(&mut self, msg: String) {
        self.errors.push(msg);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl AddAssign for ValidationError {
    fn add_assign(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for error in &self.errors {
            writeln!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// SECTION: program validation

pub fn validate(program: &Program) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    errors += check_duplicate_toplevels(program);
    errors += check_typedefs(program);

    // the unit checks rely on declared types, so they only run once the
    // declarations are sound.
    if errors.is_empty() {
        let types = TypeMap::new(program);
        let known = known_types(program);
        for decl in &program.decls {
            errors += check_unit(&types, &known, decl);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_duplicate_toplevels(program: &Program) -> ValidationError {
    let mut err = ValidationError::new();
    let mut seen = Set::new();
    for decl in &program.decls {
        if !seen.insert(decl.name()) {
            err.add_error(format!(
                "The identifier {} is declared at the top level more than once.",
                decl.name()
            ));
        }
    }
    err
}

fn check_typedefs(program: &Program) -> ValidationError {
    let mut err = ValidationError::new();
    let known = known_types(program);
    for decl in &program.decls {
        let (Decl::Header(t) | Decl::Struct(t)) = decl else {
            continue;
        };
        let mut fields = Set::new();
        for field in &t.fields {
            if !fields.insert(&field.name) {
                err.add_error(format!("[{}] duplicate field: {}", t.name, field.name));
            }
            if let Err(msg) = check_type(&known, &field.typ) {
                err.add_error(format!("[{}] {msg}", t.name));
            }
        }
    }
    err
}

// header and struct names, each tagged with whether it is a header.
fn known_types(program: &Program) -> Vec<(&str, bool)> {
    program
        .decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Header(t) => Some((t.name.as_str(), true)),
            Decl::Struct(t) => Some((t.name.as_str(), false)),
            _ => None,
        })
        .collect()
}

fn check_type(known: &[(&str, bool)], typ: &Type) -> Result<(), String> {
    match typ {
        Type::Bit(w) if *w == 0 || *w > 64 => Err(format!("unsupported width: bit<{w}>")),
        Type::Bit(_) | Type::Bool => Ok(()),
        Type::Named(name) if known.iter().any(|(n, _)| n == name) => Ok(()),
        Type::Named(name) => Err(format!("unknown type: {name}")),
        Type::Stack(elem, size) => match &**elem {
            Type::Named(name) if known.contains(&(name.as_str(), true)) => {
                if *size == 0 {
                    Err(format!("empty stack: {typ}"))
                } else {
                    Ok(())
                }
            }
            _ => Err(format!("stacks must hold headers: {typ}")),
        },
    }
}

// SECTION: per-unit checks

// name resolution state while checking one control, parser, or function.
struct Checker<'a> {
    types: &'a TypeMap,
    known: &'a [(&'a str, bool)],
    unit: &'a str,
    // every name declared so far anywhere in the unit.
    declared: Set<String>,
    // variables visible at the current point, innermost scope last.
    scopes: Vec<Set<String>>,
    actions: Set<String>,
    // table name -> the actions it lists.
    tables: Map<String, Vec<String>>,
    err: ValidationError,
}

fn check_unit<'a>(types: &'a TypeMap, known: &'a [(&'a str, bool)], decl: &'a Decl) -> ValidationError {
    let unit = decl.name();
    let mut checker = Checker {
        types,
        known,
        unit,
        declared: Set::new(),
        scopes: vec![Set::new()],
        actions: Set::new(),
        tables: Map::new(),
        err: ValidationError::new(),
    };

    match decl {
        Decl::Header(_) | Decl::Struct(_) => {}
        Decl::Extern(e) => {
            for param in &e.params {
                checker.check_type(&param.typ);
            }
            if let Some(t) = &e.rettyp {
                checker.check_type(t);
            }
        }
        Decl::Function(f) => {
            if let Some(t) = &f.rettyp {
                checker.check_type(t);
            }
            checker.params(&f.params);
            checker.block(&f.body);
        }
        Decl::Parser(p) => checker.parser(p),
        Decl::Control(c) => checker.control(c),
    }

    checker.err
}

impl<'a> Checker<'a> {
    fn error(&mut self, msg: String) {
        self.err.add_error(format!("[{}] {msg}", self.unit));
    }

    fn check_type(&mut self, typ: &Type) {
        if let Err(msg) = check_type(self.known, typ) {
            self.error(msg);
        }
    }

    // introduces a name into the unit's namespace.
    fn introduce(&mut self, name: &str) {
        if !self.declared.insert(name.to_string()) {
            self.error(format!("{name} is declared more than once"));
        }
    }

    fn declare_var(&mut self, name: &str, typ: &Type) {
        self.check_type(typ);
        self.introduce(name);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    fn visible(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.scopes.push(Set::new());
        f(self);
        self.scopes.pop();
    }

    fn params(&mut self, params: &[Param]) {
        for param in params {
            self.declare_var(&param.name, &param.typ);
        }
    }

    fn var_decl(&mut self, v: &VarDecl) {
        if let Some(init) = &v.init {
            self.expr(init);
        }
        self.declare_var(&v.name, &v.typ);
    }

    fn parser(&mut self, parser: &'a Parser) {
        self.params(&parser.params);
        for local in &parser.locals {
            self.var_decl(local);
        }

        let states: Set<&str> = parser.states.iter().map(|s| s.name.as_str()).collect();
        if states.len() != parser.states.len() {
            self.error("duplicate parser state".to_string());
        }
        if !states.contains("start") {
            self.error("parser has no start state".to_string());
        }

        for state in &parser.states {
            self.scoped(|c| {
                for stmt in &state.body {
                    c.stmt(stmt);
                }
                let next_states = match &state.transition {
                    Transition::Direct(next) => vec![next],
                    Transition::Select { exprs, cases } => {
                        c.exprs(exprs);
                        for keys in cases.iter().filter_map(|case| case.keys.as_ref()) {
                            if keys.len() != exprs.len() {
                                c.error(format!("select case arity mismatch in state {}", state.name));
                            }
                            c.exprs(keys);
                        }
                        cases.iter().map(|case| &case.next).collect()
                    }
                };
                for next in next_states {
                    if next != "accept" && next != "reject" && !states.contains(next.as_str()) {
                        c.error(format!("transition to undeclared state {next}"));
                    }
                }
            });
        }
    }

    fn control(&mut self, control: &'a Control) {
        self.params(&control.params);
        for local in &control.locals {
            match local {
                ControlLocal::Var(v) => self.var_decl(v),
                ControlLocal::Action(a) => {
                    self.introduce(&a.name);
                    self.scoped(|c| {
                        c.params(&a.params);
                        c.block(&a.body);
                    });
                    self.actions.insert(a.name.clone());
                }
                ControlLocal::Table(t) => {
                    self.introduce(&t.name);
                    self.table(t);
                    self.tables.insert(t.name.clone(), t.actions.clone());
                }
            }
        }
        self.scoped(|c| c.block(&control.body));
    }

    fn table(&mut self, table: &Table) {
        for key in &table.keys {
            self.expr(&key.expr);
        }
        for action in &table.actions {
            if !self.actions.contains(action) {
                self.error(format!("table {} lists undeclared action {action}", table.name));
            }
        }
        if let Some(default) = &table.default_action {
            if !table.actions.contains(&default.name) {
                self.error(format!(
                    "default action {} of table {} is not in its action list",
                    default.name, table.name
                ));
            }
            self.exprs(&default.args);
        }
    }

    fn block(&mut self, block: &[Stmt]) {
        for stmt in block {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl(v) => self.var_decl(v),
            Stmt::Assign { lhs, rhs } => {
                self.expr(rhs);
                self.lvalue(lhs);
            }
            Stmt::Call(e) => self.expr(e),
            Stmt::If { cond, tt, ff } => {
                self.expr(cond);
                self.scoped(|c| c.block(tt));
                self.scoped(|c| c.block(ff));
            }
            Stmt::Block(stmts) => self.scoped(|c| c.block(stmts)),
            Stmt::Switch { selector, cases } => {
                match applied_table(selector) {
                    Some((table, "action_run")) => {
                        let actions = self.tables.get(table).cloned().unwrap_or_default();
                        for label in cases.iter().filter_map(|c| c.label.as_ref()) {
                            if !actions.contains(label) {
                                self.error(format!("switch label {label} is not an action of {table}"));
                            }
                        }
                    }
                    _ => self.error(format!("cannot switch on {selector}")),
                }
                self.expr(selector);
                for body in cases.iter().filter_map(|c| c.body.as_ref()) {
                    self.scoped(|c| c.block(body));
                }
            }
            Stmt::Return(value) => {
                if let Some(e) = value {
                    self.expr(e);
                }
            }
            Stmt::Exit => {}
        }
    }

    fn lvalue(&mut self, e: &Expr) {
        fn assignable(e: &Expr) -> bool {
            match e {
                Expr::Path(_) => true,
                Expr::Member { base, .. } | Expr::Index { base, .. } | Expr::Slice { base, .. } => {
                    assignable(base)
                }
                _ => false,
            }
        }

        if !assignable(e) {
            self.error(format!("cannot assign to {e}"));
        }
        self.expr(e);
    }

    fn exprs(&mut self, es: &[Expr]) {
        for e in es {
            self.expr(e);
        }
    }

    fn expr(&mut self, e: &Expr) {
        match e {
            Expr::Int {
                value,
                width: Some(w),
            } => {
                if *w == 0 || *w > 64 || (*w < 64 && *value >> w != 0) {
                    self.error(format!("constant {e} does not fit its width"));
                }
            }
            Expr::Int { width: None, .. } | Expr::Bool(_) => {}
            Expr::Path(name) => {
                if !self.visible(name) {
                    self.error(format!("undefined variable: {name}"));
                }
            }
            Expr::Member { base, field } => match &**base {
                Expr::Call { .. } => {
                    if applied_table(e).is_none() {
                        self.error(format!("{field} can only be taken from a table apply: {e}"));
                    }
                    self.expr(base);
                }
                _ => {
                    self.expr(base);
                    if let Some(typ) = self.types.type_of(self.unit, base) {
                        if self.types.field_type(&typ, field).is_none() {
                            self.error(format!("{typ} has no field {field}"));
                        }
                    }
                }
            },
            Expr::Index { base, index } => {
                self.expr(base);
                self.expr(index);
                if !matches!(self.types.type_of(self.unit, base), Some(Type::Stack(..))) {
                    self.error(format!("cannot index {base}"));
                }
            }
            Expr::Slice { base, hi, lo } => {
                self.expr(base);
                if hi < lo {
                    self.error(format!("empty slice {e}"));
                }
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Mux { cond, tt, ff } => {
                self.expr(cond);
                self.expr(tt);
                self.expr(ff);
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::List(items) => self.exprs(items),
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) {
        match callee {
            Expr::Path(name) => {
                let params = if self.actions.contains(name) {
                    self.types
                        .control_scope(self.unit)
                        .and_then(|scope| scope.actions.get(name))
                        .cloned()
                } else {
                    self.types
                        .function_sig(name)
                        .or_else(|| self.types.extern_sig(name))
                        .map(|sig| sig.params.clone())
                };
                let Some(params) = params else {
                    self.error(format!("call to undeclared {name}"));
                    return self.exprs(args);
                };
                if params.len() != args.len() {
                    self.error(format!(
                        "{name} expects {} arguments but got {}",
                        params.len(),
                        args.len()
                    ));
                }
                for (param, arg) in params.iter().zip(args) {
                    if param.direction.writes() {
                        self.lvalue(arg);
                    } else {
                        self.expr(arg);
                    }
                }
            }
            Expr::Member { base, field } => {
                match field.as_str() {
                    "apply" => match &**base {
                        Expr::Path(t) if self.tables.contains_key(t) => {}
                        _ => self.error(format!("{base} is not a table")),
                    },
                    "isValid" | "setValid" | "setInvalid" => {
                        self.expr(base);
                        let header = self.types.type_of(self.unit, base);
                        if !header.is_some_and(|t| self.types.is_header(&t)) {
                            self.error(format!("{base} is not a header"));
                        }
                    }
                    "push_front" | "pop_front" => {
                        self.expr(base);
                        if !matches!(self.types.type_of(self.unit, base), Some(Type::Stack(..))) {
                            self.error(format!("{base} is not a header stack"));
                        }
                    }
                    _ => self.error(format!("unknown method {field}")),
                }
                self.exprs(args);
            }
            _ => {
                self.error(format!("cannot call {callee}"));
                self.exprs(args);
            }
        }
    }
}

// `t` and `field` for `t.apply().field`.
fn applied_table(e: &Expr) -> Option<(&str, &str)> {
    let Expr::Member { base, field } = e else {
        return None;
    };
    let Expr::Call { callee, args } = &**base else {
        return None;
    };
    match &**callee {
        Expr::Member { base, field: apply } if apply == "apply" && args.is_empty() => {
            match &**base {
                Expr::Path(t) if matches!(field.as_str(), "hit" | "miss" | "action_run") => {
                    Some((t, field))
                }
                _ => None,
            }
        }
        _ => None,
    }
}
