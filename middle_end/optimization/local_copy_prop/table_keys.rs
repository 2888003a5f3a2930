//! Replacing table keys by the value they have at every apply site.

use super::summaries::KeyRemap;
use super::*;

// What the key expressions and the default action of `table` read.
pub fn table_info(pass: &LocalCopyProp, oracle: &Oracle, table: &Table) -> TableInfo {
    let mut info = TableInfo::default();
    for key in &table.keys {
        let slot = match oracle.location(&key.expr) {
            Some(loc)
                if loc.exact
                    && pass.key_replaceable(&UseSite {
                        position: Position::TableKey,
                        name: &loc.name,
                    }) =>
            {
                info.keyreads.insert(loc.name.clone());
                Some(loc.name)
            }
            _ => {
                info.fixed_reads
                    .extend(oracle.uses(&key.expr).into_iter().map(|l| l.name));
                None
            }
        };
        info.key_slots.push(slot);
    }

    info.actions = table.actions.clone();
    if let Some(default) = &table.default_action {
        for arg in &default.args {
            info.fixed_reads
                .extend(oracle.uses(arg).into_iter().map(|l| l.name));
        }
        if !info.actions.contains(&default.name) {
            info.actions.push(default.name.clone());
        }
    }
    info
}

// Rewrites every key of `table` that all apply sites agreed on.
pub fn rewrite_keys(table: &mut Table, info: &TableInfo) {
    for (key, slot) in table.keys.iter_mut().zip(&info.key_slots) {
        let Some(name) = slot else {
            continue;
        };
        if let Some(KeyRemap::Agreed(value)) = info.key_remap.get(name) {
            debug!("table {}: key {name} becomes {value}", table.name);
            key.expr = value.clone();
        }
    }
}

impl<'a> AnalysisContext<'a> {
    // The apply site of `table` at the current point proposes its value of
    // `key`.  A value is proposed only if it could be written where the table
    // is declared; a site without one, or with a different one, rules the
    // replacement out and keeps the key storage alive.
    pub(super) fn propose_key(&mut self, table: &str, key: &StorageName) {
        let site = UseSite {
            position: Position::TableKey,
            name: key,
        };
        let proposal = self
            .frame
            .table
            .get(key)
            .and_then(|info| info.value.clone())
            .filter(|value| self.pass.accepts(&site, value) && self.visible_at_control_level(value));

        let Some((_, info)) = self.tables.get_mut(table) else {
            return;
        };
        let agreed = match proposal {
            Some(value) => {
                self.need_key_rewrite = true;
                let remap = info
                    .key_remap
                    .entry(key.clone())
                    .or_insert_with(|| KeyRemap::Agreed(value.clone()));
                if *remap != KeyRemap::Agreed(value) {
                    *remap = KeyRemap::Conflict;
                }
                *remap != KeyRemap::Conflict
            }
            None => {
                info.key_remap.insert(key.clone(), KeyRemap::Conflict);
                false
            }
        };

        if !agreed {
            trace!("table {table}: key {key} keeps being read");
            self.frame.table.mark_live(key);
            self.record_read(key);
        }
    }

    fn visible_at_control_level(&self, value: &Expr) -> bool {
        self.oracle()
            .uses(value)
            .iter()
            .all(|loc| self.frame.control_level.contains(loc.name.root()))
    }
}
