//! Local copy propagation and dead-code elimination.
//!
//! Each unit (action, function, parser state, parser, control) is walked
//! once, front to back, with a table of the values currently known for each
//! storage name and whether anything reads it.  Reads of storage with a known
//! value are replaced by the value; afterwards, declarations and assignments
//! of the unit's own storage that nothing reads are removed.  Calls are
//! handled through summaries of what the callee reads and writes, built the
//! first time they are needed.  Table keys whose value is the same at every
//! apply site are rewritten to that value once the enclosing control is done.
//!
//! The pass never changes what a program observes; anything it cannot see
//! through (externs, unknown methods) is assumed to read and write all
//! storage outside the current unit.

use std::collections::{BTreeMap as Map, BTreeSet as Set};
use std::mem;

use derive_more::Display;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::commons::Valid;
use crate::front_end::ast::*;
use crate::front_end::type_map::TypeMap;
use crate::middle_end::analysis::storage::{Location, Oracle, StorageName};

mod elim_dead;
mod summaries;
mod table_keys;
mod var_table;
mod walker;

#[cfg(test)]
mod tests;

use summaries::{FuncInfo, Slot, TableInfo};
use var_table::VarTable;

// SECTION: interface

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    // remove tables and actions that are never applied.
    pub eliminate_unused: bool,
    // allow list values to be propagated into assignment right-hand sides.
    pub propagate_compound: bool,
    // bound on the passes made by `run_to_fixpoint`.
    pub max_iterations: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            eliminate_unused: true,
            propagate_compound: false,
            max_iterations: 8,
        }
    }
}

// Where a read that could be replaced by a known value occurs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    // the whole right-hand side of an assignment or initializer.
    Rhs,
    // inside a larger expression.
    Operand,
    Argument,
    Condition,
    Index,
    SliceBase,
    TableKey,
    Return,
    Select,
}

#[derive(Clone, Copy, Debug)]
pub struct UseSite<'a> {
    pub position: Position,
    pub name: &'a StorageName,
}

#[derive(Clone, Debug, Display, PartialEq, Eq)]
pub enum PassError {
    #[display(fmt = "internal error: {}", _0)]
    Internal(String),
}

impl std::error::Error for PassError {}

fn internal<T>(msg: impl Into<String>) -> Result<T, PassError> {
    Err(PassError::Internal(msg.into()))
}

type Policy = Box<dyn Fn(&UseSite, &Expr) -> bool>;
type KeyContext = Box<dyn Fn(&UseSite) -> bool>;

// The pass, with its configuration.
#[derive(Default)]
pub struct LocalCopyProp {
    options: Options,
    policy: Option<Policy>,
    key_context: Option<KeyContext>,
}

impl LocalCopyProp {
    pub fn new(options: Options) -> Self {
        LocalCopyProp {
            options,
            policy: None,
            key_context: None,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // Restricts propagation: a known value is substituted at a use site only
    // if `policy` returns true for it.
    pub fn with_policy(mut self, policy: impl Fn(&UseSite, &Expr) -> bool + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    // Decides which table keys may be replaced by their value.  By default,
    // every key that is a plain storage expression may be.
    pub fn with_key_context(mut self, key_context: impl Fn(&UseSite) -> bool + 'static) -> Self {
        self.key_context = Some(Box::new(key_context));
        self
    }

    fn accepts(&self, site: &UseSite, value: &Expr) -> bool {
        let shape_ok = match value {
            Expr::List(_) => self.options.propagate_compound && site.position == Position::Rhs,
            _ => true,
        };
        shape_ok && self.policy.as_ref().map_or(true, |policy| policy(site, value))
    }

    fn key_replaceable(&self, site: &UseSite) -> bool {
        self.key_context.as_ref().map_or(true, |f| f(site))
    }

    pub fn run(&self, program: Valid<Program>) -> Result<Valid<Program>, PassError> {
        let Valid(mut program) = program;
        let types = TypeMap::new(&program);
        let mut cx = AnalysisContext::new(self, &types);
        cx.program(&mut program)?;
        program
            .validate()
            .or_else(|err| internal(format!("the optimized program is invalid:\n{err}")))
    }

    // Runs the pass until the program stops changing, or at most
    // `max_iterations` times.
    pub fn run_to_fixpoint(&self, program: Valid<Program>) -> Result<Valid<Program>, PassError> {
        let mut program = program;
        for iteration in 0..self.options.max_iterations {
            let next = self.run(program.clone())?;
            if next == program {
                debug!("fixed point reached after {iteration} iterations");
                return Ok(next);
            }
            program = next;
        }
        Ok(program)
    }
}

// Runs the pass once with the default options.
pub fn local_copy_prop(program: Valid<Program>) -> Result<Valid<Program>, PassError> {
    LocalCopyProp::default().run(program)
}

// SECTION: analysis state

// What is being walked right now.
struct Frame {
    // the top-level declaration the code belongs to, for type lookups.
    unit: String,
    table: VarTable,
    // effects of the unit visible to its callers.
    summary: FuncInfo,
    // parameters of the unit; callers see their effects through arguments.
    params: Set<String>,
    // names visible where the tables of the current control are declared.
    control_level: Set<String>,
    // variables declared by each enclosing block, innermost last.
    blocks: Vec<Vec<String>>,
}

impl Frame {
    fn new(unit: &str, params: &[Param]) -> Self {
        Frame {
            unit: unit.to_string(),
            table: VarTable::new(),
            summary: FuncInfo::default(),
            params: params.iter().map(|p| p.name.clone()).collect(),
            control_level: Set::new(),
            blocks: vec![],
        }
    }

    // whether reads and writes of `name` are invisible outside the unit.
    fn is_private(&self, name: &StorageName) -> bool {
        self.table.is_local(name.root()) || self.params.contains(name.root())
    }
}

// All state of one run of the pass.
struct AnalysisContext<'a> {
    pass: &'a LocalCopyProp,
    types: &'a TypeMap,
    functions: Map<String, Slot<Function>>,
    // actions and tables of the control being processed.
    actions: Map<String, Slot<Action>>,
    tables: Map<String, (Table, TableInfo)>,
    // whether some apply site proposed a key replacement.
    need_key_rewrite: bool,
    frame: Frame,
}

impl<'a> AnalysisContext<'a> {
    fn new(pass: &'a LocalCopyProp, types: &'a TypeMap) -> Self {
        AnalysisContext {
            pass,
            types,
            functions: Map::new(),
            actions: Map::new(),
            tables: Map::new(),
            need_key_rewrite: false,
            frame: Frame::new("", &[]),
        }
    }

    fn oracle(&self) -> Oracle<'_> {
        Oracle::new(self.types, &self.frame.unit)
    }

    // Walks `body` as a unit of its own and returns its final frame.  The
    // frame of the caller is restored afterwards.
    fn in_frame(
        &mut self,
        frame: Frame,
        body: impl FnOnce(&mut Self) -> Result<(), PassError>,
    ) -> Result<Frame, PassError> {
        let saved = mem::replace(&mut self.frame, frame);
        let result = body(self);
        let done = mem::replace(&mut self.frame, saved);
        result.map(|()| done)
    }

    // SECTION: program

    fn program(&mut self, program: &mut Program) -> Result<(), PassError> {
        // functions are taken out so that calls can reach them from anywhere;
        // `None` marks where each one goes back.
        let mut decls: Vec<Option<Decl>> = vec![];
        let mut function_order = vec![];
        for decl in mem::take(&mut program.decls) {
            match decl {
                Decl::Function(f) => {
                    function_order.push(f.name.clone());
                    self.functions.insert(f.name.clone(), Slot::Pending(f));
                    decls.push(None);
                }
                decl => decls.push(Some(decl)),
            }
        }

        for decl in decls.iter_mut().flatten() {
            match decl {
                Decl::Parser(p) => self.parser(p)?,
                Decl::Control(c) => self.control(c)?,
                Decl::Header(_) | Decl::Struct(_) | Decl::Extern(_) | Decl::Function(_) => {}
            }
        }

        // functions nobody calls are still optimized.
        for name in &function_order {
            self.function_summary(name)?;
        }

        let mut functions = function_order.into_iter();
        for decl in decls {
            let decl = match decl {
                Some(decl) => decl,
                None => {
                    let name = functions.next().unwrap_or_default();
                    match self.functions.remove(&name) {
                        Some(Slot::Done(f, _)) => Decl::Function(f),
                        _ => return internal(format!("function {name} was not analysed")),
                    }
                }
            };
            program.decls.push(decl);
        }
        Ok(())
    }

    // SECTION: scope drivers

    // Walks and cleans up a function, returning its summary.
    fn function(&mut self, f: &mut Function) -> Result<FuncInfo, PassError> {
        debug!("function {}", f.name);
        let frame = self.in_frame(Frame::new(&f.name, &f.params), |cx| cx.block(&mut f.body))?;
        let oracle = Oracle::new(self.types, &frame.unit);
        elim_dead::eliminate(&frame.table, &oracle, &mut f.body);
        Ok(frame.summary)
    }

    // Walks and cleans up an action of the current control.
    fn action(&mut self, a: &mut Action) -> Result<FuncInfo, PassError> {
        debug!("action {}", a.name);
        let unit = self.frame.unit.clone();
        let frame = self.in_frame(Frame::new(&unit, &a.params), |cx| cx.block(&mut a.body))?;
        let oracle = Oracle::new(self.types, &frame.unit);
        elim_dead::eliminate(&frame.table, &oracle, &mut a.body);
        Ok(frame.summary)
    }

    fn control(&mut self, control: &mut Control) -> Result<(), PassError> {
        debug!("control {}", control.name);

        // actions and tables move into the context while the control is
        // walked; `order` remembers where they go back.
        let mut order = vec![];
        let mut vars = vec![];
        for local in mem::take(&mut control.locals) {
            match local {
                ControlLocal::Var(v) => {
                    order.push(LocalRef::Var(vars.len()));
                    vars.push(v);
                }
                ControlLocal::Action(a) => {
                    order.push(LocalRef::Action(a.name.clone()));
                    self.actions.insert(a.name.clone(), Slot::Pending(a));
                }
                ControlLocal::Table(t) => {
                    order.push(LocalRef::Table(t.name.clone()));
                    let oracle = Oracle::new(self.types, &control.name);
                    let info = table_keys::table_info(self.pass, &oracle, &t);
                    self.tables.insert(t.name.clone(), (t, info));
                }
            }
        }
        self.need_key_rewrite = false;

        let mut frame = Frame::new(&control.name, &control.params);
        frame.control_level = frame.params.clone();
        frame.control_level.extend(vars.iter().map(|v| v.name.clone()));

        let frame = self.in_frame(frame, |cx| {
            for v in &mut vars {
                cx.var_decl(v)?;
            }
            cx.block(&mut control.body)?;
            cx.finish_control()
        })?;

        // the actions' own dead code went when their summaries were built;
        // this removes what only the control's table can tell is dead.
        let oracle = Oracle::new(self.types, &control.name);
        let mut vars: Vec<Option<VarDecl>> = vars
            .into_iter()
            .map(|v| elim_dead::keep_var(&frame.table, &v).then_some(v))
            .collect();
        for slot in self.actions.values_mut() {
            if let Slot::Done(a, _) = slot {
                elim_dead::eliminate(&frame.table, &oracle, &mut a.body);
            }
        }
        elim_dead::eliminate(&frame.table, &oracle, &mut control.body);

        let keep_unused = !self.pass.options.eliminate_unused;
        for r in order {
            let local = match r {
                LocalRef::Var(i) => vars[i].take().map(ControlLocal::Var),
                LocalRef::Action(name) => match self.actions.remove(&name) {
                    Some(Slot::Done(a, info)) if info.apply_count > 0 || keep_unused => {
                        Some(ControlLocal::Action(a))
                    }
                    Some(Slot::Done(..)) => {
                        debug!("removing unused action {name}");
                        None
                    }
                    _ => return internal(format!("action {name} was not analysed")),
                },
                LocalRef::Table(name) => match self.tables.remove(&name) {
                    Some((t, info)) if info.apply_count > 0 || keep_unused => {
                        Some(ControlLocal::Table(t))
                    }
                    Some(_) => {
                        debug!("removing unused table {name}");
                        None
                    }
                    None => return internal(format!("table {name} disappeared")),
                },
            };
            control.locals.extend(local);
        }
        Ok(())
    }

    // Everything a control does after its body has been walked, while its
    // frame is still current.
    fn finish_control(&mut self) -> Result<(), PassError> {
        if self.need_key_rewrite {
            for (table, info) in self.tables.values_mut() {
                table_keys::rewrite_keys(table, info);
            }
        }

        if !self.pass.options.eliminate_unused {
            // kept tables and actions may still run, so what they read
            // stays alive.
            let unused: Vec<String> = self
                .tables
                .iter()
                .filter(|(_, (_, info))| info.apply_count == 0)
                .map(|(name, _)| name.clone())
                .collect();
            for name in unused {
                self.keep_table(&name)?;
            }
        }

        // actions nobody applies are still optimized.
        let pending: Vec<String> = self
            .actions
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Pending(_)))
            .map(|(name, _)| name.clone())
            .collect();
        for name in pending {
            let info = self.action_summary(&name)?;
            if !self.pass.options.eliminate_unused {
                self.apply_summary(&info);
            }
        }
        Ok(())
    }

    fn parser(&mut self, parser: &mut Parser) -> Result<(), PassError> {
        debug!("parser {}", parser.name);

        // every state on its own: parser locals are not local to a state.
        let mut summaries = vec![];
        for state in &mut parser.states {
            trace!("state {}", state.name);
            let frame = self.in_frame(Frame::new(&parser.name, &[]), |cx| {
                cx.block(&mut state.body)?;
                cx.transition(&mut state.transition)
            })?;
            let oracle = Oracle::new(self.types, &parser.name);
            elim_dead::eliminate(&frame.table, &oracle, &mut state.body);
            summaries.push(frame.summary);
        }

        // then the parser as a whole, with its locals.
        let frame = self.in_frame(Frame::new(&parser.name, &parser.params), |cx| {
            for local in &mut parser.locals {
                cx.var_decl(local)?;
            }
            cx.apply_in_any_order(&summaries);
            Ok(())
        })?;
        let oracle = Oracle::new(self.types, &parser.name);
        parser.locals.retain_mut(|v| elim_dead::keep_var(&frame.table, v));
        for state in &mut parser.states {
            elim_dead::eliminate(&frame.table, &oracle, &mut state.body);
        }
        Ok(())
    }
}

// position of a control local while the control is being processed.
enum LocalRef {
    Var(usize),
    Action(String),
    Table(String),
}
