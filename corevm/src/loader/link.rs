//! Linking passes: `LIB_*` rewrite and reachability pruning

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::FatalError;
use crate::program::{Class, ClassId, Instr, MethodId, REFLECTIVE_CLASSES};
use crate::program::name_grammar::split_class_segment;
use crate::vm::exec::memory_ops::pack_func;

/// Shift every already-resolved class-id operand in `op` by `offset`. Used
/// when a bundled library's classes are renumbered to avoid colliding with
/// ids already taken by the executable's own class table or an
/// earlier-merged library.
pub fn offset_class_refs(op: &mut Instr, offset: ClassId) {
    match op {
        Instr::NewObjInst { class_id } => *class_id += offset,
        Instr::ObjInstCast { target_class_id } | Instr::ObjTypeOf { target_class_id } => *target_class_id += offset,
        Instr::MthdCall { class_id, .. } => *class_id += offset,
        _ => {}
    }
}

fn find_method_by_encoded_name(classes: &BTreeMap<ClassId, Class>, class_id: ClassId, encoded_name: &str) -> Option<(ClassId, MethodId)> {
    let mut cur = Some(class_id);
    while let Some(cid) = cur {
        let class = classes.get(&cid)?;
        if let Some(method) = class.methods.values().find(|m| m.encoded_name == encoded_name) {
            return Some((cid, method.id));
        }
        cur = class.parent_id;
    }
    None
}

/// Rewrite every `LIB_*` pre-link instruction in place: `LIB_NEW_OBJ_INST`,
/// `LIB_OBJ_INST_CAST`, `LIB_OBJ_TYPE_OF`, and `LIB_MTHD_CALL` resolve a
/// class/method name to a dense id pair; `LIB_FUNC_DEF` resolves to a
/// packed function-pair literal. An unresolved name is fatal.
///
/// `aliases` maps an alias name to the real class name it stands for. Per
/// Open Question (1) (spec.md §9), a library's alias table is consulted
/// only when that library also declared a non-empty bundle-name list at
/// load time ([`super::build_aliases`] enforces this before the map ever
/// reaches here); an alias name not found in `aliases` resolves as a plain
/// class name, so a fully empty table is a no-op.
pub fn rewrite_lib_instructions(
    classes: &mut BTreeMap<ClassId, Class>,
    class_names: &HashMap<String, ClassId>,
    aliases: &HashMap<String, String>,
) -> Result<(), FatalError> {
    let class_ids: Vec<ClassId> = classes.keys().copied().collect();
    for class_id in class_ids {
        let method_ids: Vec<MethodId> = classes[&class_id].methods.keys().copied().collect();
        for method_id in method_ids {
            let len = classes[&class_id].methods[&method_id].instructions.len();
            for i in 0..len {
                let op = classes[&class_id].methods[&method_id].instructions[i].op.clone();
                let resolved = match &op {
                    Instr::LibNewObjInst { class_name } => {
                        let target = resolve_class(class_names, aliases, class_name)?;
                        Some(Instr::NewObjInst { class_id: target })
                    }
                    Instr::LibObjInstCast { class_name } => {
                        let target = resolve_class(class_names, aliases, class_name)?;
                        Some(Instr::ObjInstCast { target_class_id: target })
                    }
                    Instr::LibObjTypeOf { class_name } => {
                        let target = resolve_class(class_names, aliases, class_name)?;
                        Some(Instr::ObjTypeOf { target_class_id: target })
                    }
                    Instr::LibMthdCall { encoded_name, is_native } => {
                        let (target_class, target_method) = resolve_method(classes, class_names, aliases, encoded_name)?;
                        Some(Instr::MthdCall {
                            class_id: target_class,
                            mthd_id: target_method,
                            is_native: *is_native,
                        })
                    }
                    Instr::LibFuncDef { encoded_name } => {
                        let (target_class, target_method) = resolve_method(classes, class_names, aliases, encoded_name)?;
                        Some(Instr::LoadIntLit(pack_func(target_class, target_method)))
                    }
                    _ => None,
                };
                if let Some(new_op) = resolved {
                    classes.get_mut(&class_id).unwrap().methods.get_mut(&method_id).unwrap().instructions[i].op = new_op;
                }
            }
        }
    }
    Ok(())
}

fn resolve_class(class_names: &HashMap<String, ClassId>, aliases: &HashMap<String, String>, name: &str) -> Result<ClassId, FatalError> {
    let real_name = aliases.get(name).map(String::as_str).unwrap_or(name);
    class_names.get(real_name).copied().ok_or_else(|| FatalError::UnresolvedSymbol {
        symbol: name.to_string(),
        searched: "linked class table and bundled libraries".to_string(),
    })
}

fn resolve_method(
    classes: &BTreeMap<ClassId, Class>,
    class_names: &HashMap<String, ClassId>,
    aliases: &HashMap<String, String>,
    encoded_name: &str,
) -> Result<(ClassId, MethodId), FatalError> {
    let (class_name, _) = split_class_segment(encoded_name).ok_or_else(|| FatalError::UnresolvedSymbol {
        symbol: encoded_name.to_string(),
        searched: "malformed encoded method name".to_string(),
    })?;
    let class_id = resolve_class(class_names, aliases, class_name)?;
    find_method_by_encoded_name(classes, class_id, encoded_name).ok_or_else(|| FatalError::UnresolvedSymbol {
        symbol: encoded_name.to_string(),
        searched: format!("class '{class_name}' and its ancestors"),
    })
}

/// Prune every library class not transitively referenced from the
/// executable's own classes, the start class, or the hard-coded reflective
/// classes every image implicitly depends on.
pub fn prune_unreachable(classes: &mut BTreeMap<ClassId, Class>, class_names: &mut HashMap<String, ClassId>, start_class_id: Option<ClassId>) {
    let mut keep: HashSet<ClassId> = HashSet::new();
    let mut queue: VecDeque<ClassId> = VecDeque::new();

    for (id, class) in classes.iter() {
        if !class.flags.is_library && keep.insert(*id) {
            queue.push_back(*id);
        }
    }
    for name in REFLECTIVE_CLASSES {
        if let Some(&id) = class_names.get(*name) {
            if keep.insert(id) {
                queue.push_back(id);
            }
        }
    }
    if let Some(start) = start_class_id {
        if keep.insert(start) {
            queue.push_back(start);
        }
    }

    while let Some(id) = queue.pop_front() {
        let Some(class) = classes.get(&id) else { continue };
        let mut referenced = Vec::new();
        referenced.extend(class.parent_id);
        referenced.extend(class.interface_ids.iter().copied());
        for method in class.methods.values() {
            for instr in &method.instructions {
                match &instr.op {
                    Instr::NewObjInst { class_id } => referenced.push(*class_id),
                    Instr::ObjInstCast { target_class_id } | Instr::ObjTypeOf { target_class_id } => referenced.push(*target_class_id),
                    Instr::MthdCall { class_id, .. } => referenced.push(*class_id),
                    _ => {}
                }
            }
        }
        for r in referenced {
            if keep.insert(r) {
                queue.push_back(r);
            }
        }
    }

    classes.retain(|id, _| keep.contains(id));
    class_names.retain(|_, id| keep.contains(id));
}
