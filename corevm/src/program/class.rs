//! Class representation

use serde::{Deserialize, Serialize};

use super::method::Method;

/// Dense, zero-based class identifier. Class ids form a dense range
/// `[0, N)`; the loader does not assume parent ids precede child ids and
/// always resolves through [`crate::program::Program::get_class`].
pub type ClassId = i32;

/// The kind of slot a declaration-list entry describes, used by both the
/// interpreter (typed variable access) and the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Bool,
    Byte,
    Char,
    Int,
    Float,
    ObjParm(ClassId),
    ByteAryParm,
    CharAryParm,
    IntAryParm,
    FloatAryParm,
    ObjAryParm(ClassId),
    /// A closure/function-pair slot occupies two consecutive words.
    FuncParm,
}

impl ParamKind {
    /// Whether the collector must trace this slot as a heap reference
    /// when walking a declaration list exactly.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ParamKind::ObjParm(_)
                | ParamKind::ByteAryParm
                | ParamKind::CharAryParm
                | ParamKind::IntAryParm
                | ParamKind::FloatAryParm
                | ParamKind::ObjAryParm(_)
                | ParamKind::FuncParm
        )
    }
}

/// Flags carried by a class record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClassFlags {
    pub is_virtual: bool,
    pub is_interface: bool,
    pub is_debug: bool,
    pub is_public: bool,
    pub is_library: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub file_name: Option<String>,
    /// `None` for the root of a hierarchy (the source's `-1` sentinel).
    pub parent_id: Option<ClassId>,
    pub interface_ids: Vec<ClassId>,
    pub class_space: i32,
    pub instance_space: i32,
    pub class_declarations: Vec<ParamKind>,
    pub instance_declarations: Vec<ParamKind>,
    /// Keyed by the id of the enclosing method; yields that closure's own
    /// declaration list.
    pub closure_declarations: std::collections::BTreeMap<i32, Vec<ParamKind>>,
    pub methods: std::collections::BTreeMap<i32, Method>,
    pub flags: ClassFlags,
}

impl Class {
    /// Does `self` equal `target`, or inherit from it transitively, or
    /// implement it as an interface? Used by `OBJ_TYPE_OF`/`OBJ_INST_CAST`
    /// via a parent/interface walk.
    pub fn is_a(&self, target: ClassId, classes: &std::collections::BTreeMap<ClassId, Class>) -> bool {
        if self.id == target {
            return true;
        }
        if self.interface_ids.contains(&target) {
            return true;
        }
        let mut cur = self.parent_id;
        while let Some(pid) = cur {
            let Some(parent) = classes.get(&pid) else {
                break;
            };
            if parent.id == target || parent.interface_ids.contains(&target) {
                return true;
            }
            cur = parent.parent_id;
        }
        false
    }
}
