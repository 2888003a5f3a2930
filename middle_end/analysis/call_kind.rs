//! What a call expression invokes.

use super::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    IsValid,
    SetValid,
    SetInvalid,
    PushFront,
    PopFront,
}

impl Builtin {
    pub fn from_method(name: &str) -> Option<Self> {
        match name {
            "isValid" => Some(Builtin::IsValid),
            "setValid" => Some(Builtin::SetValid),
            "setInvalid" => Some(Builtin::SetInvalid),
            "push_front" => Some(Builtin::PushFront),
            "pop_front" => Some(Builtin::PopFront),
            _ => None,
        }
    }

    // whether the call changes its receiver.
    pub fn writes_receiver(self) -> bool {
        self != Builtin::IsValid
    }

    // whether the call observes the receiver's previous content.  Stack
    // pushes and pops move the existing elements.
    pub fn reads_receiver(self) -> bool {
        matches!(self, Builtin::IsValid | Builtin::PushFront | Builtin::PopFront)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallKind {
    TableApply(String),
    Action(String),
    Function(String),
    Extern(String),
    // a builtin method of the callee's receiver.
    Builtin(Builtin),
    // anything else; treated as having arbitrary effects.
    Unknown,
}

// classifies a call to `callee` made inside `unit`.
pub fn classify(types: &TypeMap, unit: &str, callee: &Expr) -> CallKind {
    let scope = types.control_scope(unit);
    match callee {
        Expr::Path(name) => {
            if scope.is_some_and(|s| s.actions.contains_key(name)) {
                CallKind::Action(name.clone())
            } else if types.function_sig(name).is_some() {
                CallKind::Function(name.clone())
            } else if types.extern_sig(name).is_some() {
                CallKind::Extern(name.clone())
            } else {
                CallKind::Unknown
            }
        }
        Expr::Member { base, field } => match (&**base, field.as_str()) {
            (Expr::Path(t), "apply") if scope.is_some_and(|s| s.tables.contains(t)) => {
                CallKind::TableApply(t.clone())
            }
            (_, method) => match Builtin::from_method(method) {
                Some(method) => CallKind::Builtin(method),
                None => CallKind::Unknown,
            },
        },
        _ => CallKind::Unknown,
    }
}

// the parameters of whatever `kind` invokes, when they are declared.
pub fn params<'t>(types: &'t TypeMap, unit: &str, kind: &CallKind) -> Option<&'t [Param]> {
    match kind {
        CallKind::Action(name) => types
            .control_scope(unit)?
            .actions
            .get(name)
            .map(Vec::as_slice),
        CallKind::Function(name) => types.function_sig(name).map(|sig| sig.params.as_slice()),
        CallKind::Extern(name) => types.extern_sig(name).map(|sig| sig.params.as_slice()),
        CallKind::TableApply(_) | CallKind::Builtin(_) | CallKind::Unknown => None,
    }
}
