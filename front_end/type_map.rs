//! The resolved-type map.
//!
//! Built once from a program, then consumed read-only: it answers what a
//! name refers to (variable, action, table, function, extern), what a header
//! or struct looks like, and what type a storage expression has.  Variable
//! types are kept per top-level declaration (control, parser, or function);
//! the validator rejects shadowing inside one of those, so a name is enough
//! to identify a variable there.

use std::collections::{BTreeMap as Map, BTreeSet as Set};

use super::ast::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Header,
    Struct,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDef {
    pub kind: TypeKind,
    pub fields: Vec<Field>,
}

// signature of something callable by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub rettyp: Option<Type>,
    pub params: Vec<Param>,
}

// actions and tables declared inside a control.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlScope {
    pub actions: Map<String, Vec<Param>>,
    pub tables: Set<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TypeMap {
    typedefs: Map<String, TypeDef>,
    externs: Map<String, Signature>,
    functions: Map<String, Signature>,
    controls: Map<String, ControlScope>,
    // unit name -> variable name -> type.
    vars: Map<String, Map<String, Type>>,
}

impl TypeMap {
    pub fn new(program: &Program) -> Self {
        let mut map = TypeMap::default();
        for decl in &program.decls {
            match decl {
                Decl::Header(t) => map.add_typedef(t, TypeKind::Header),
                Decl::Struct(t) => map.add_typedef(t, TypeKind::Struct),
                Decl::Extern(e) => {
                    map.externs.insert(
                        e.name.clone(),
                        Signature {
                            rettyp: e.rettyp.clone(),
                            params: e.params.clone(),
                        },
                    );
                }
                Decl::Function(f) => {
                    map.functions.insert(
                        f.name.clone(),
                        Signature {
                            rettyp: f.rettyp.clone(),
                            params: f.params.clone(),
                        },
                    );
                    let vars = map.vars.entry(f.name.clone()).or_default();
                    add_params(vars, &f.params);
                    add_block(vars, &f.body);
                }
                Decl::Parser(p) => {
                    let vars = map.vars.entry(p.name.clone()).or_default();
                    add_params(vars, &p.params);
                    for local in &p.locals {
                        vars.insert(local.name.clone(), local.typ.clone());
                    }
                    for state in &p.states {
                        add_block(vars, &state.body);
                    }
                }
                Decl::Control(c) => {
                    let mut scope = ControlScope::default();
                    let vars = map.vars.entry(c.name.clone()).or_default();
                    add_params(vars, &c.params);
                    for local in &c.locals {
                        match local {
                            ControlLocal::Var(v) => {
                                vars.insert(v.name.clone(), v.typ.clone());
                            }
                            ControlLocal::Action(a) => {
                                add_params(vars, &a.params);
                                add_block(vars, &a.body);
                                scope.actions.insert(a.name.clone(), a.params.clone());
                            }
                            ControlLocal::Table(t) => {
                                scope.tables.insert(t.name.clone());
                            }
                        }
                    }
                    add_block(vars, &c.body);
                    map.controls.insert(c.name.clone(), scope);
                }
            }
        }
        map
    }

    fn add_typedef(&mut self, t: &TypeDecl, kind: TypeKind) {
        self.typedefs.insert(
            t.name.clone(),
            TypeDef {
                kind,
                fields: t.fields.clone(),
            },
        );
    }

    pub fn typedef(&self, name: &str) -> Option<&TypeDef> {
        self.typedefs.get(name)
    }

    pub fn extern_sig(&self, name: &str) -> Option<&Signature> {
        self.externs.get(name)
    }

    pub fn function_sig(&self, name: &str) -> Option<&Signature> {
        self.functions.get(name)
    }

    pub fn control_scope(&self, control: &str) -> Option<&ControlScope> {
        self.controls.get(control)
    }

    pub fn var_type(&self, unit: &str, name: &str) -> Option<&Type> {
        self.vars.get(unit)?.get(name)
    }

    pub fn is_header(&self, typ: &Type) -> bool {
        matches!(typ, Type::Named(n) if self.typedef(n).is_some_and(|t| t.kind == TypeKind::Header))
    }

    // type of a field of a header or struct type.
    pub fn field_type(&self, typ: &Type, field: &str) -> Option<&Type> {
        let Type::Named(name) = typ else {
            return None;
        };
        self.typedef(name)?
            .fields
            .iter()
            .find(|f| f.name == field)
            .map(|f| &f.typ)
    }

    // the type of `expr` as seen from inside `unit`, when it has a fixed one.
    // Unsized integer literals and lists have none.
    pub fn type_of(&self, unit: &str, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Int { width, .. } => width.map(Type::Bit),
            Expr::Bool(_) => Some(Type::Bool),
            Expr::Path(name) => self.var_type(unit, name).cloned(),
            Expr::Member { base, field } => match &**base {
                // `t.apply().hit` and `t.apply().miss`.
                Expr::Call { .. } if field == "hit" || field == "miss" => Some(Type::Bool),
                base => self.field_type(&self.type_of(unit, base)?, field).cloned(),
            },
            Expr::Index { base, .. } => match self.type_of(unit, base)? {
                Type::Stack(elem, _) => Some(*elem),
                _ => None,
            },
            Expr::Slice { hi, lo, .. } => Some(Type::Bit(hi - lo + 1)),
            Expr::Unary { op: UnOp::Not, .. } => Some(Type::Bool),
            Expr::Unary { operand, .. } => self.type_of(unit, operand),
            Expr::Binary { op, lhs, rhs } => match op {
                BinOp::Eq
                | BinOp::NotEq
                | BinOp::Lt
                | BinOp::Lte
                | BinOp::Gt
                | BinOp::Gte
                | BinOp::And
                | BinOp::Or => Some(Type::Bool),
                BinOp::Shl | BinOp::Shr => self.type_of(unit, lhs),
                _ => self
                    .type_of(unit, lhs)
                    .or_else(|| self.type_of(unit, rhs)),
            },
            Expr::Mux { tt, ff, .. } => self.type_of(unit, tt).or_else(|| self.type_of(unit, ff)),
            Expr::Call { callee, .. } => match &**callee {
                Expr::Path(name) => self
                    .function_sig(name)
                    .or_else(|| self.extern_sig(name))
                    .and_then(|sig| sig.rettyp.clone()),
                Expr::Member { field, .. } if field == "isValid" => Some(Type::Bool),
                _ => None,
            },
            Expr::List(_) => None,
        }
    }
}

fn add_params(vars: &mut Map<String, Type>, params: &[Param]) {
    for param in params {
        vars.insert(param.name.clone(), param.typ.clone());
    }
}

fn add_block(vars: &mut Map<String, Type>, block: &[Stmt]) {
    for stmt in block {
        match stmt {
            Stmt::Decl(v) => {
                vars.insert(v.name.clone(), v.typ.clone());
            }
            Stmt::If { tt, ff, .. } => {
                add_block(vars, tt);
                add_block(vars, ff);
            }
            Stmt::Block(stmts) => add_block(vars, stmts),
            Stmt::Switch { cases, .. } => {
                for body in cases.iter().filter_map(|c| c.body.as_ref()) {
                    add_block(vars, body);
                }
            }
            Stmt::Assign { .. } | Stmt::Call(_) | Stmt::Return(_) | Stmt::Exit => {}
        }
    }
}
