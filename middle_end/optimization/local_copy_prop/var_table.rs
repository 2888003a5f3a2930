//! The available-value table: what is known about each storage name at the
//! current point of a walk.

use super::*;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VarInfo {
    // expression currently equal to the storage, if one is known.
    pub value: Option<Expr>,
    // whether some read observes the storage.  Never reset within a scope.
    pub live: bool,
    // whether the storage belongs to the scope being walked.
    pub local: bool,
    // storage the value reads.
    uses: Vec<StorageName>,
}

#[derive(Clone, Debug, Default)]
pub struct VarTable {
    entries: Map<StorageName, VarInfo>,
    // variables declared by the scope being walked.
    locals: Set<String>,
    // set after `return` and `exit`.
    unreachable: bool,
}

impl VarTable {
    pub fn new() -> Self {
        VarTable::default()
    }

    pub fn get(&self, name: &StorageName) -> Option<&VarInfo> {
        self.entries.get(name)
    }

    pub fn is_local(&self, root: &str) -> bool {
        self.locals.contains(root)
    }

    pub fn set_unreachable(&mut self) {
        self.unreachable = true;
    }

    // introduces a variable of the current scope.
    pub fn declare_local(&mut self, var: &str) {
        self.locals.insert(var.to_string());
        self.entry(&StorageName::var(var));
    }

    fn entry(&mut self, name: &StorageName) -> &mut VarInfo {
        let local = self.locals.contains(name.root());
        self.entries.entry(name.clone()).or_insert_with(|| VarInfo {
            local,
            ..VarInfo::default()
        })
    }

    // the names of existing entries that overlap `name`.
    fn overlapping(&self, name: &StorageName) -> Vec<StorageName> {
        let inside = self
            .entries
            .range(name.clone()..)
            .map(|(k, _)| k)
            .take_while(|k| name.is_prefix_of(k))
            .cloned();
        let around = name.ancestors().filter(|a| self.entries.contains_key(a));
        inside.chain(around).collect()
    }

    pub fn mark_live(&mut self, name: &StorageName) {
        self.entry(name);
        for k in self.overlapping(name) {
            if let Some(info) = self.entries.get_mut(&k) {
                info.live = true;
            }
        }
    }

    // The value to substitute for a read of `loc`, if there is one that
    // `accept` agrees to.  Otherwise the read observes the storage, which
    // becomes live.
    pub fn read(&mut self, loc: &Location, accept: impl FnOnce(&Expr) -> bool) -> Option<Expr> {
        if loc.exact {
            if let Some(value) = self.entries.get(&loc.name).and_then(|i| i.value.as_ref()) {
                if accept(value) {
                    return Some(value.clone());
                }
            }
        }
        self.mark_live(&loc.name);
        None
    }

    // Records a write of `loc`.  Everything overlapping it, and every value
    // that reads something overlapping it, is forgotten.  `value` is the new
    // content together with the storage it reads; it is kept only when the
    // write is exact and the value does not read the written storage.
    pub fn write(&mut self, loc: &Location, value: Option<(Expr, Vec<StorageName>)>) {
        self.invalidate(&loc.name);
        let info = self.entry(&loc.name);
        if let Some((value, uses)) = value {
            if loc.exact && !uses.iter().any(|u| u.overlaps(&loc.name)) {
                info.value = Some(value);
                info.uses = uses;
            }
        }
    }

    fn invalidate(&mut self, name: &StorageName) {
        for info in self.entries.values_mut() {
            if info.uses.iter().any(|u| u.overlaps(name)) {
                info.forget();
            }
        }
        for k in self.overlapping(name) {
            if let Some(info) = self.entries.get_mut(&k) {
                info.forget();
            }
        }
    }

    // forgets every value reading `var`, which is going out of scope.
    pub fn forget_mentions(&mut self, var: &str) {
        for info in self.entries.values_mut() {
            if info.uses.iter().any(|u| u.root() == var) {
                info.forget();
            }
        }
    }

    // The effect of something that may read and write any storage that does
    // not belong to this scope.
    pub fn clobber(&mut self) {
        let locals = &self.locals;
        for info in self.entries.values_mut() {
            if !info.local {
                info.forget();
                info.live = true;
            } else if info.uses.iter().any(|u| !locals.contains(u.root())) {
                info.forget();
            }
        }
    }

    // Whether writes to `name` are unobservable: the entry for `name`, or
    // for the nearest enclosing name that has one, is local and not live.
    pub fn is_dead(&self, name: &StorageName) -> bool {
        let nearest = std::iter::once(name.clone())
            .chain(name.ancestors())
            .find_map(|n| self.entries.get(&n));
        matches!(nearest, Some(info) if info.local && !info.live)
    }

    // The state after two alternative paths.  A value survives only where
    // both paths agree on it; storage is live if either path reads it.  A
    // path that ended in `return` or `exit` contributes only its liveness.
    pub fn merge(self, other: VarTable) -> VarTable {
        match (self.unreachable, other.unreachable) {
            (true, false) => other.absorb_liveness(self),
            (false, true) => self.absorb_liveness(other),
            _ => {
                let mut merged = VarTable {
                    entries: Map::new(),
                    locals: &self.locals | &other.locals,
                    unreachable: self.unreachable,
                };
                let mut rhs = other.entries;
                for (name, mut info) in self.entries {
                    match rhs.remove(&name) {
                        Some(theirs) => {
                            if info.value != theirs.value {
                                info.forget();
                            }
                            info.live |= theirs.live;
                            info.local |= theirs.local;
                        }
                        None => info.forget(),
                    }
                    merged.entries.insert(name, info);
                }
                for (name, mut info) in rhs {
                    info.forget();
                    merged.entries.insert(name, info);
                }
                merged
            }
        }
    }

    fn absorb_liveness(mut self, other: VarTable) -> VarTable {
        self.locals.extend(other.locals);
        for (name, theirs) in other.entries {
            let info = self.entries.entry(name).or_insert_with(|| VarInfo {
                local: theirs.local,
                ..VarInfo::default()
            });
            info.live |= theirs.live;
            info.local |= theirs.local;
        }
        self
    }
}

impl VarInfo {
    fn forget(&mut self) {
        self.value = None;
        self.uses.clear();
    }
}
