//! In-memory program model
//!
//! An arena of classes, methods, enums, and constant pools addressed by
//! dense ids rather than pointers: `ClassId` is a plain `i32`,
//! `(ClassId, MethodId)` a value pair. Cycles between a class and its
//! methods resolve because ids carry no ownership — unlike the source's
//! class→parent and method→class back-pointers.

pub mod class;
pub mod dispatch_cache;
pub mod enum_decl;
pub mod instr;
pub mod method;
pub mod name_grammar;

pub use class::{Class, ClassFlags, ClassId, ParamKind};
pub use dispatch_cache::DispatchCache;
pub use enum_decl::{EnumDecl, EnumItem};
pub use instr::{ArrayElemKind, Instr, Instruction, JumpPredicate, LabelId, MemoryContext, ReturnKind};
pub use method::{Method, MethodFlags, MethodId, NativeEntry};

use std::collections::BTreeMap;

/// Names of the two hard-coded reflective classes every reachability scan
/// must mark as "called" regardless of whether bytecode references them
/// directly.
pub const REFLECTIVE_CLASSES: &[&str] = &[
    "System.Introspection.Class",
    "System.Introspection.Method",
    "System.Introspection.DataType",
];

/// The fully linked, in-memory program produced by the loader.
#[derive(Debug)]
pub struct Program {
    pub classes: BTreeMap<ClassId, Class>,
    pub class_names: std::collections::HashMap<String, ClassId>,
    pub enums: std::collections::HashMap<String, EnumDecl>,

    pub float_pool: Vec<f64>,
    pub int_pool: Vec<i64>,
    pub char_pool: Vec<String>,

    /// Present only for executable images.
    pub string_class_id: Option<ClassId>,
    pub start_class_id: Option<ClassId>,
    pub start_method_id: Option<MethodId>,

    pub dispatch_cache: DispatchCache,
}

impl Program {
    pub fn get_class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(&id)
    }

    pub fn get_class_mut(&mut self, id: ClassId) -> Option<&mut Class> {
        self.classes.get_mut(&id)
    }

    pub fn get_class_by_name(&self, name: &str) -> Option<&Class> {
        self.class_names.get(name).and_then(|id| self.classes.get(id))
    }

    pub fn get_method(&self, class_id: ClassId, method_id: MethodId) -> Option<&Method> {
        self.classes.get(&class_id)?.methods.get(&method_id)
    }

    pub fn get_method_mut(&mut self, class_id: ClassId, method_id: MethodId) -> Option<&mut Method> {
        self.classes.get_mut(&class_id)?.methods.get_mut(&method_id)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumDecl> {
        self.enums.get(name)
    }

    /// Resolve a `(receiver class, dispatch key)` pair to a concrete
    /// method by walking the receiver's class, then its parent chain, then
    /// any implemented interface, stopping at the first match. Consults and
    /// populates the dispatch cache.
    pub fn resolve_virtual(&self, receiver_class: ClassId, dispatch_key: &str) -> Option<(ClassId, MethodId)> {
        if let Some(hit) = self.dispatch_cache.get(receiver_class, dispatch_key) {
            return Some(hit);
        }
        let resolved = self.resolve_virtual_uncached(receiver_class, dispatch_key)?;
        self.dispatch_cache.install(receiver_class, dispatch_key, resolved);
        Some(resolved)
    }

    /// The uncached linear walk, exposed separately so tests can verify
    /// dispatch agreement against the cached path.
    pub fn resolve_virtual_uncached(&self, receiver_class: ClassId, dispatch_key: &str) -> Option<(ClassId, MethodId)> {
        let mut candidates: Vec<ClassId> = Vec::new();
        let mut cur = Some(receiver_class);
        while let Some(cid) = cur {
            let class = self.classes.get(&cid)?;
            candidates.push(cid);
            cur = class.parent_id;
        }
        // interfaces of the most-derived class, after the class chain
        if let Some(class) = self.classes.get(&receiver_class) {
            candidates.extend(class.interface_ids.iter().copied());
        }
        for cid in candidates {
            let class = self.classes.get(&cid)?;
            for method in class.methods.values() {
                if method.dispatch_key() == dispatch_key {
                    return Some((cid, method.id));
                }
            }
        }
        None
    }
}
