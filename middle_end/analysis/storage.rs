//! Storage names and the alias oracle.
//!
//! A storage name is the canonical access path of a piece of storage, such as
//! `hdr.ipv4.ttl` or `stk[2].f`.  Two names may refer to overlapping storage
//! exactly when one is a prefix of the other, segment by segment.  Accesses
//! the oracle cannot pin down to one element (dynamic or out-of-range indices,
//! bit slices) are described by the name of the enclosing storage, marked
//! inexact, so they conflict with everything inside it.

use std::fmt::{Display, Formatter, Result as FmtResult};

use super::*;

// SECTION: storage names

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Var(String),
    Field(String),
    Index(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StorageName(Vec<Segment>);

impl StorageName {
    pub fn var(name: &str) -> Self {
        StorageName(vec![Segment::Var(name.to_string())])
    }

    pub fn field(&self, field: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Field(field.to_string()));
        StorageName(segments)
    }

    pub fn index(&self, idx: u32) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(idx));
        StorageName(segments)
    }

    // the variable this name starts from.
    pub fn root(&self) -> &str {
        match self.0.first() {
            Some(Segment::Var(name)) => name,
            _ => "",
        }
    }

    // whether `other` is this name or something inside it.
    pub fn is_prefix_of(&self, other: &StorageName) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn overlaps(&self, other: &StorageName) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    // the enclosing names, nearest first, excluding this one.
    pub fn ancestors(&self) -> impl Iterator<Item = StorageName> + '_ {
        (1..self.0.len())
            .rev()
            .map(|len| StorageName(self.0[..len].to_vec()))
    }
}

impl Display for StorageName {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for segment in &self.0 {
            match segment {
                Segment::Var(name) => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

// The storage an expression accesses.  `exact` is false when the access
// touches only an unknown part of `name`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub name: StorageName,
    pub exact: bool,
}

// SECTION: the oracle

// Answers storage questions about expressions written inside one unit
// (control, parser, or function).
#[derive(Clone, Copy)]
pub struct Oracle<'a> {
    types: &'a TypeMap,
    unit: &'a str,
}

impl<'a> Oracle<'a> {
    pub fn new(types: &'a TypeMap, unit: &'a str) -> Self {
        Oracle { types, unit }
    }

    pub fn type_of(&self, e: &Expr) -> Option<Type> {
        self.types.type_of(self.unit, e)
    }

    // the storage `e` denotes, if it is a storage expression.
    pub fn location(&self, e: &Expr) -> Option<Location> {
        match e {
            Expr::Path(name) => Some(Location {
                name: StorageName::var(name),
                exact: true,
            }),
            Expr::Member { base, field } => {
                if base.is_call() {
                    return None;
                }
                let base_loc = self.location(base)?;
                if !base_loc.exact {
                    return Some(base_loc);
                }
                Some(Location {
                    name: base_loc.name.field(field),
                    exact: true,
                })
            }
            Expr::Index { base, index } => {
                let base_loc = self.location(base)?;
                if !base_loc.exact {
                    return Some(base_loc);
                }
                let size = match self.type_of(base) {
                    Some(Type::Stack(_, size)) => size,
                    _ => 0,
                };
                match **index {
                    Expr::Int { value, .. } if value < u64::from(size) => Some(Location {
                        // in range, so it fits in a u32.
                        name: base_loc.name.index(value as u32),
                        exact: true,
                    }),
                    _ => Some(Location {
                        name: base_loc.name,
                        exact: false,
                    }),
                }
            }
            Expr::Slice { base, .. } => {
                let base_loc = self.location(base)?;
                Some(Location {
                    name: base_loc.name,
                    exact: false,
                })
            }
            _ => None,
        }
    }

    // every storage location `e` reads, in evaluation order.  Receivers of
    // method calls count as read; table names in `t.apply()` do not.
    pub fn uses(&self, e: &Expr) -> Vec<Location> {
        let mut out = vec![];
        self.collect_uses(e, &mut out);
        out
    }

    fn collect_uses(&self, e: &Expr, out: &mut Vec<Location>) {
        if let Some(loc) = self.location(e) {
            // indices are read too.
            self.collect_index_uses(e, out);
            out.push(loc);
            return;
        }
        match e {
            Expr::Call { callee, args } => {
                if let Expr::Member { base, field } = &**callee {
                    if field != "apply" {
                        self.collect_uses(base, out);
                    }
                }
                for arg in args {
                    self.collect_uses(arg, out);
                }
            }
            e => {
                for child in e.children() {
                    self.collect_uses(child, out);
                }
            }
        }
    }

    // uses inside the index expressions of a storage expression.
    fn collect_index_uses(&self, e: &Expr, out: &mut Vec<Location>) {
        match e {
            Expr::Member { base, .. } | Expr::Slice { base, .. } => {
                self.collect_index_uses(base, out)
            }
            Expr::Index { base, index } => {
                self.collect_index_uses(base, out);
                self.collect_uses(index, out);
            }
            _ => {}
        }
    }
}
