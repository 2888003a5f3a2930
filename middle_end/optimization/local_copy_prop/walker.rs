//! The forward walk over statements and expressions.

use crate::middle_end::analysis::call_kind::{self, Builtin, CallKind};
use crate::middle_end::analysis::side_effects::{has_side_effects, is_pure};

use super::*;

impl<'a> AnalysisContext<'a> {
    // SECTION: statements

    pub(super) fn block(&mut self, stmts: &mut Block) -> Result<(), PassError> {
        self.frame.blocks.push(vec![]);
        for stmt in stmts.iter_mut() {
            self.stmt(stmt)?;
        }
        // values reading a variable of this block would be meaningless after it.
        for var in self.frame.blocks.pop().unwrap_or_default() {
            self.frame.table.forget_mentions(&var);
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &mut Stmt) -> Result<(), PassError> {
        if matches!(stmt, Stmt::If { .. }) {
            elim_dead::fold_if(stmt);
        }

        match stmt {
            Stmt::Decl(v) => self.var_decl(v),
            Stmt::Assign { lhs, rhs } => {
                self.expr(rhs, Position::Rhs)?;
                self.assign(lhs, rhs)
            }
            Stmt::Call(e) => self.expr(e, Position::Rhs),
            Stmt::If { cond, tt, ff } => {
                self.expr(cond, Position::Condition)?;
                let before = self.frame.table.clone();
                self.block(tt)?;
                let after_tt = mem::replace(&mut self.frame.table, before);
                self.block(ff)?;
                let after_ff = mem::take(&mut self.frame.table);
                self.frame.table = after_tt.merge(after_ff);
                Ok(())
            }
            Stmt::Block(stmts) => self.block(stmts),
            Stmt::Switch { selector, cases } => self.switch(selector, cases),
            Stmt::Return(value) => {
                if let Some(e) = value {
                    self.expr(e, Position::Return)?;
                }
                self.frame.table.set_unreachable();
                Ok(())
            }
            Stmt::Exit => {
                self.frame.table.set_unreachable();
                Ok(())
            }
        }
    }

    pub(super) fn var_decl(&mut self, v: &mut VarDecl) -> Result<(), PassError> {
        if let Some(init) = &mut v.init {
            self.expr(init, Position::Rhs)?;
        }
        self.frame.table.declare_local(&v.name);
        if let Some(declared) = self.frame.blocks.last_mut() {
            declared.push(v.name.clone());
        }

        let name = StorageName::var(&v.name);
        let value = v.init.as_ref().and_then(|init| self.value_of(init));
        self.frame.table.write(&Location { name: name.clone(), exact: true }, value);
        if v.init.as_ref().is_some_and(|init| !init.is_call() && has_side_effects(init)) {
            // the declaration stays for the sake of its initializer.
            self.frame.table.mark_live(&name);
        }
        Ok(())
    }

    fn assign(&mut self, lhs: &mut Expr, rhs: &Expr) -> Result<(), PassError> {
        self.indices(lhs)?;
        let Some(loc) = self.oracle().location(lhs) else {
            return internal(format!("cannot assign to {lhs}"));
        };
        trace!("write {} ({})", loc.name, if loc.exact { "exact" } else { "partial" });
        let value = self.value_of(rhs);
        self.write(&loc, value);
        if has_side_effects(lhs) || (!rhs.is_call() && has_side_effects(rhs)) {
            // the assignment cannot go, so neither can its target.
            self.frame.table.mark_live(&loc.name);
        }
        Ok(())
    }

    // the value an assignment of `e` leaves behind, with the storage it reads.
    fn value_of(&self, e: &Expr) -> Option<(Expr, Vec<StorageName>)> {
        if !is_pure(e) {
            return None;
        }
        let uses = self.oracle().uses(e).into_iter().map(|loc| loc.name).collect();
        Some((e.clone(), uses))
    }

    fn write(&mut self, loc: &Location, value: Option<(Expr, Vec<StorageName>)>) {
        self.frame.table.write(loc, value);
        self.record_write(&loc.name);
    }

    fn switch(&mut self, selector: &mut Expr, cases: &mut [SwitchCase]) -> Result<(), PassError> {
        self.expr(selector, Position::Condition)?;
        let before = self.frame.table.clone();

        // without a default, no case may run at all.
        let has_default = cases.iter().any(|case| case.label.is_none());
        let mut merged = if has_default { None } else { Some(before.clone()) };
        for body in cases.iter_mut().filter_map(|case| case.body.as_mut()) {
            self.frame.table = before.clone();
            self.block(body)?;
            let arm = mem::take(&mut self.frame.table);
            merged = Some(match merged {
                Some(m) => m.merge(arm),
                None => arm,
            });
        }
        self.frame.table = merged.unwrap_or(before);
        Ok(())
    }

    pub(super) fn transition(&mut self, transition: &mut Transition) -> Result<(), PassError> {
        if let Transition::Select { exprs, .. } = transition {
            for e in exprs {
                self.expr(e, Position::Select)?;
            }
        }
        Ok(())
    }

    // SECTION: expressions

    // Walks `e`, which is evaluated at `pos`, replacing reads of storage with
    // a known value.
    fn expr(&mut self, e: &mut Expr, pos: Position) -> Result<(), PassError> {
        if !matches!(e, Expr::Slice { .. }) {
            if let Some(loc) = self.oracle().location(e) {
                return self.read(e, &loc, pos);
            }
        }

        match e {
            Expr::Int { .. } | Expr::Bool(_) | Expr::Path(_) => Ok(()),
            Expr::Slice { base, .. } => self.expr(base, Position::SliceBase),
            // `t.apply().hit` and friends.
            Expr::Member { base, .. } => self.expr(base, Position::Operand),
            Expr::Index { base, index } => {
                self.expr(base, Position::Operand)?;
                self.expr(index, Position::Index)
            }
            Expr::Unary { operand, .. } => self.expr(operand, Position::Operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs, Position::Operand)?;
                self.expr(rhs, Position::Operand)
            }
            Expr::Mux { cond, tt, ff } => {
                self.expr(cond, Position::Condition)?;
                self.expr(tt, Position::Operand)?;
                self.expr(ff, Position::Operand)
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::List(items) => {
                for item in items {
                    self.expr(item, Position::Operand)?;
                }
                Ok(())
            }
        }
    }

    // a read of the storage expression `e`, which denotes `loc`.
    fn read(&mut self, e: &mut Expr, loc: &Location, pos: Position) -> Result<(), PassError> {
        self.indices(e)?;
        // the indices may have changed.
        let loc = self.oracle().location(e).unwrap_or_else(|| loc.clone());
        let pass = self.pass;
        let site = UseSite {
            position: pos,
            name: &loc.name,
        };
        match self.frame.table.read(&loc, |value| pass.accepts(&site, value)) {
            Some(value) => {
                trace!("replacing {e} by {value}");
                *e = value;
            }
            None => self.record_read(&loc.name),
        }
        Ok(())
    }

    // a read of `e` that must stay as written.
    fn read_in_place(&mut self, e: &mut Expr) -> Result<(), PassError> {
        match self.oracle().location(e) {
            Some(loc) => {
                self.indices(e)?;
                self.frame.table.mark_live(&loc.name);
                self.record_read(&loc.name);
                Ok(())
            }
            None => self.expr(e, Position::Operand),
        }
    }

    // walks the index expressions inside the storage expression `e`.
    fn indices(&mut self, e: &mut Expr) -> Result<(), PassError> {
        match e {
            Expr::Member { base, .. } | Expr::Slice { base, .. } => self.indices(base),
            Expr::Index { base, index } => {
                self.indices(base)?;
                self.expr(index, Position::Index)
            }
            _ => Ok(()),
        }
    }

    // the written storage of an out or inout argument.
    fn overwrite(&mut self, e: &mut Expr) -> Result<(), PassError> {
        let Some(loc) = self.oracle().location(e) else {
            return internal(format!("cannot write to {e}"));
        };
        self.write(&loc, None);
        // it stays referenced by the call.
        self.frame.table.mark_live(&loc.name);
        Ok(())
    }

    // SECTION: calls

    fn call(&mut self, callee: &mut Expr, args: &mut [Expr]) -> Result<(), PassError> {
        let unit = self.frame.unit.clone();
        let kind = call_kind::classify(self.types, &unit, callee);
        let directions: Vec<Direction> = match call_kind::params(self.types, &unit, &kind) {
            Some(params) => params.iter().map(|p| p.direction).collect(),
            // nothing is known about what the callee does with its arguments.
            None => vec![Direction::InOut; args.len()],
        };
        trace!("call of {callee}: {kind:?}");

        if let CallKind::Builtin(method) = kind {
            return self.builtin(method, callee, args);
        }

        for (arg, dir) in args.iter_mut().zip(&directions) {
            match dir {
                Direction::None | Direction::In => self.expr(arg, Position::Argument)?,
                Direction::InOut => self.read_in_place(arg)?,
                Direction::Out => self.indices(arg)?,
            }
        }

        match &kind {
            CallKind::TableApply(table) => self.apply_table(table)?,
            CallKind::Action(action) => self.apply_action(action)?,
            CallKind::Function(function) => self.apply_function(function)?,
            CallKind::Extern(_) | CallKind::Unknown => self.clobber(),
            CallKind::Builtin(_) => {}
        }

        for (arg, dir) in args.iter_mut().zip(&directions) {
            if dir.writes() {
                self.overwrite(arg)?;
            }
        }
        Ok(())
    }

    fn builtin(&mut self, method: Builtin, callee: &mut Expr, args: &mut [Expr]) -> Result<(), PassError> {
        let Expr::Member { base: receiver, .. } = callee else {
            return internal(format!("{callee} has no receiver"));
        };
        for arg in args.iter_mut() {
            self.expr(arg, Position::Argument)?;
        }
        if method.reads_receiver() {
            self.read_in_place(receiver)?;
        } else {
            self.indices(receiver)?;
        }
        if method.writes_receiver() {
            // the call goes away with the receiver when nothing reads it.
            let Some(loc) = self.oracle().location(receiver) else {
                return internal(format!("cannot write to {receiver}"));
            };
            self.write(&loc, None);
        }
        Ok(())
    }
}
