//! Summaries of actions, functions, and tables, and their application at call
//! sites.

use super::*;

// What a unit does to storage outside itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FuncInfo {
    // storage read without a known value.
    pub reads: Set<StorageName>,
    pub writes: Set<StorageName>,
    pub apply_count: usize,
    // the unit calls something whose effects are unknown.
    pub opaque: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyRemap {
    // every apply site so far had this value for the key.
    Agreed(Expr),
    Conflict,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableInfo {
    // key storage that may be replaced by a value.
    pub keyreads: Set<StorageName>,
    // everything else the key expressions and the default action read.
    pub fixed_reads: Set<StorageName>,
    // for each key element, the storage it names if it is in `keyreads`.
    pub key_slots: Vec<Option<StorageName>>,
    pub actions: Vec<String>,
    pub key_remap: Map<StorageName, KeyRemap>,
    pub apply_count: usize,
}

// A unit whose summary is built on first use.
pub enum Slot<T> {
    Pending(T),
    // the summary is being built.
    Busy,
    Done(T, FuncInfo),
}

impl<'a> AnalysisContext<'a> {
    pub(super) fn action_summary(&mut self, name: &str) -> Result<FuncInfo, PassError> {
        let slot = match self.actions.get_mut(name) {
            Some(slot) => mem::replace(slot, Slot::Busy),
            None => return internal(format!("unknown action {name}")),
        };
        let (action, info) = match slot {
            Slot::Done(a, info) => (a, info),
            Slot::Busy => return internal(format!("action {name} is used while it is analysed")),
            Slot::Pending(mut a) => {
                let info = self.action(&mut a)?;
                (a, info)
            }
        };
        self.actions
            .insert(name.to_string(), Slot::Done(action, info.clone()));
        Ok(info)
    }

    pub(super) fn function_summary(&mut self, name: &str) -> Result<FuncInfo, PassError> {
        let slot = match self.functions.get_mut(name) {
            Some(slot) => mem::replace(slot, Slot::Busy),
            None => return internal(format!("unknown function {name}")),
        };
        let (function, info) = match slot {
            Slot::Done(f, info) => (f, info),
            Slot::Busy => return internal(format!("function {name} is recursive")),
            Slot::Pending(mut f) => {
                let info = self.function(&mut f)?;
                (f, info)
            }
        };
        self.functions
            .insert(name.to_string(), Slot::Done(function, info.clone()));
        Ok(info)
    }

    // an application of action `name` at the current point.
    pub(super) fn apply_action(&mut self, name: &str) -> Result<(), PassError> {
        let info = self.action_summary(name)?;
        if let Some(Slot::Done(_, info)) = self.actions.get_mut(name) {
            info.apply_count += 1;
        }
        self.apply_summary(&info);
        Ok(())
    }

    // a call of function `name` at the current point.
    pub(super) fn apply_function(&mut self, name: &str) -> Result<(), PassError> {
        let info = self.function_summary(name)?;
        if let Some(Slot::Done(_, info)) = self.functions.get_mut(name) {
            info.apply_count += 1;
        }
        self.apply_summary(&info);
        Ok(())
    }

    // The effects described by `info`, as if the unit ran here.
    pub(super) fn apply_summary(&mut self, info: &FuncInfo) {
        self.apply_reads(info);
        self.apply_writes(info);
    }

    // Summaries of units that may run in any order and any number of times,
    // like parser states.  Every write comes first so that each read also
    // covers storage some other unit writes.
    pub(super) fn apply_in_any_order(&mut self, infos: &[FuncInfo]) {
        for info in infos {
            self.apply_writes(info);
        }
        for info in infos {
            self.apply_reads(info);
        }
    }

    fn apply_reads(&mut self, info: &FuncInfo) {
        for name in &info.reads {
            self.frame.table.mark_live(name);
            self.record_read(name);
        }
    }

    fn apply_writes(&mut self, info: &FuncInfo) {
        for name in &info.writes {
            let loc = Location {
                name: name.clone(),
                exact: true,
            };
            self.frame.table.write(&loc, None);
            self.record_write(name);
        }
        if info.opaque {
            self.clobber();
        }
    }

    // a call whose effects are unknown.
    pub(super) fn clobber(&mut self) {
        trace!("clobbering everything outside {}", self.frame.unit);
        self.frame.table.clobber();
        self.frame.summary.opaque = true;
    }

    pub(super) fn record_read(&mut self, name: &StorageName) {
        if !self.frame.is_private(name) {
            self.frame.summary.reads.insert(name.clone());
        }
    }

    pub(super) fn record_write(&mut self, name: &StorageName) {
        if !self.frame.is_private(name) {
            self.frame.summary.writes.insert(name.clone());
        }
    }

    // an application of table `name` at the current point.
    pub(super) fn apply_table(&mut self, name: &str) -> Result<(), PassError> {
        let Some((_, info)) = self.tables.get_mut(name) else {
            return internal(format!("unknown table {name}"));
        };
        info.apply_count += 1;
        let keyreads = info.keyreads.clone();
        let fixed_reads = info.fixed_reads.clone();
        let actions = info.actions.clone();

        for key in &keyreads {
            self.propose_key(name, key);
        }
        for read in &fixed_reads {
            self.frame.table.mark_live(read);
            self.record_read(read);
        }
        // any one of the actions may run.
        for action in &actions {
            self.apply_action(action)?;
        }
        Ok(())
    }

    // Keeps what table `name` reads alive without applying it here.
    pub(super) fn keep_table(&mut self, name: &str) -> Result<(), PassError> {
        let Some((_, info)) = self.tables.get(name) else {
            return internal(format!("unknown table {name}"));
        };
        let reads: Vec<StorageName> = info.keyreads.iter().chain(&info.fixed_reads).cloned().collect();
        let actions = info.actions.clone();
        for read in &reads {
            self.frame.table.mark_live(read);
            self.record_read(read);
        }
        for action in &actions {
            self.apply_action(action)?;
        }
        Ok(())
    }
}
