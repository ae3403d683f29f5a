use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThingDefId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThingDefKind {
    Placeholder,
    Wrapper,
}

#[derive(Debug, Clone)]
pub struct ThingDef {
    pub id: ThingDefId,
    pub def_name: String,
    pub label: String,
    pub kind: ThingDefKind,
    pub blocks_standing: bool,
}

#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    thing_defs: Vec<ThingDef>,
    thing_ids_by_name: HashMap<String, ThingDefId>,
    source_hash_sha256_hex: String,
}

impl DefDatabase {
    pub(crate) fn from_thing_defs(
        mut thing_defs: Vec<ThingDef>,
        source_hash_sha256_hex: String,
    ) -> Self {
        let mut thing_ids_by_name = HashMap::with_capacity(thing_defs.len());
        for (idx, def) in thing_defs.iter_mut().enumerate() {
            let id = ThingDefId(idx as u32);
            def.id = id;
            thing_ids_by_name.insert(def.def_name.clone(), id);
        }
        Self {
            thing_defs,
            thing_ids_by_name,
            source_hash_sha256_hex,
        }
    }

    pub fn thing_def_id_by_name(&self, name: &str) -> Option<ThingDefId> {
        self.thing_ids_by_name.get(name).copied()
    }

    pub fn thing_def(&self, id: ThingDefId) -> Option<&ThingDef> {
        self.thing_defs.get(id.0 as usize)
    }

    pub fn thing_defs(&self) -> &[ThingDef] {
        &self.thing_defs
    }

    pub fn source_hash(&self) -> &str {
        &self.source_hash_sha256_hex
    }
}
