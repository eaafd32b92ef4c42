//! Image loader and linker
//!
//! Opens a compressed image and reads it in the fixed order the format
//! defines: version word, magic word, (executable only) the string-class
//! id, the three constant pools, (library only) the bundle-name and
//! alias-encoding lists, (executable only) the start class/method ids,
//! (library only) the enum table, then the class table. Each method's
//! label pass (building its jump table) happens as it is decoded
//! ([`Method::build_jump_table`](crate::program::Method::build_jump_table)).
//! Linking — bundling library images found on the search path, rewriting
//! `LIB_*` instructions to resolved ids, and pruning unreachable library
//! classes — happens once every file named by the search path has been
//! decoded (see [`link`]).

pub mod bootstrap;
pub mod builder;
pub mod instr_codec;
pub mod link;
pub mod record_codec;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::config::Properties;
use crate::error::FatalError;
use crate::image::codec::{decompress, Reader};
use crate::image::format::{LIB_EXTENSION, MAGIC_EXE, MAGIC_LIB, VER_NUM};
use crate::program::{Class, ClassId, DispatchCache, EnumDecl, MethodId, Program};

use record_codec::{read_class, read_enum};

/// One decoded image, before cross-file linking.
struct RawImage {
    is_exe: bool,
    string_class_id: Option<ClassId>,
    float_pool: Vec<f64>,
    int_pool: Vec<i64>,
    char_pool: Vec<String>,
    bundle_names: Vec<String>,
    aliases: Vec<(String, String)>,
    start_class_id: Option<ClassId>,
    start_method_id: Option<MethodId>,
    enums: Vec<EnumDecl>,
    classes: Vec<Class>,
}

fn read_f64_pool(r: &mut Reader) -> Result<Vec<f64>, FatalError> {
    let n = r.read_i32()?;
    (0..n).map(|_| r.read_f64()).collect()
}

fn read_i64_pool(r: &mut Reader) -> Result<Vec<i64>, FatalError> {
    let n = r.read_i32()?;
    (0..n).map(|_| r.read_i64()).collect()
}

fn read_string_pool(r: &mut Reader) -> Result<Vec<String>, FatalError> {
    let n = r.read_i32()?;
    (0..n).map(|_| r.read_string()).collect()
}

/// Read one image's fixed-order byte stream
fn read_raw_image(bytes: &[u8]) -> Result<RawImage, FatalError> {
    let mut r = Reader::new(bytes);

    let version = r.read_i32()?;
    if version != VER_NUM {
        return Err(FatalError::ImageVersionMismatch { expected: VER_NUM, found: version });
    }

    let magic = r.read_i32()?;
    let is_exe = if magic == MAGIC_EXE {
        true
    } else if magic == MAGIC_LIB {
        false
    } else {
        return Err(FatalError::ImageInvalid(format!("unrecognized magic word {magic:#x}")));
    };

    let string_class_id = if is_exe { Some(r.read_i32()?) } else { None };

    let float_pool = read_f64_pool(&mut r)?;
    let int_pool = read_i64_pool(&mut r)?;
    let char_pool = read_string_pool(&mut r)?;

    let (bundle_names, aliases) = if is_exe {
        (Vec::new(), Vec::new())
    } else {
        let n_bundles = r.read_i32()?;
        let mut bundles = Vec::with_capacity(n_bundles.max(0) as usize);
        for _ in 0..n_bundles {
            bundles.push(r.read_string()?);
        }
        let n_alias = r.read_i32()?;
        let mut aliases = Vec::with_capacity(n_alias.max(0) as usize);
        for _ in 0..n_alias {
            let alias = r.read_string()?;
            let real = r.read_string()?;
            aliases.push((alias, real));
        }
        (bundles, aliases)
    };

    let (start_class_id, start_method_id) = if is_exe {
        (Some(r.read_i32()?), Some(r.read_i32()?))
    } else {
        (None, None)
    };

    let enums = if is_exe {
        Vec::new()
    } else {
        let n = r.read_i32()?;
        let mut v = Vec::with_capacity(n.max(0) as usize);
        for _ in 0..n {
            v.push(read_enum(&mut r)?);
        }
        v
    };

    let n_classes = r.read_i32()?;
    let mut classes = Vec::with_capacity(n_classes.max(0) as usize);
    for _ in 0..n_classes {
        classes.push(read_class(&mut r)?);
    }

    Ok(RawImage {
        is_exe,
        string_class_id,
        float_pool,
        int_pool,
        char_pool,
        bundle_names,
        aliases,
        start_class_id,
        start_method_id,
        enums,
        classes,
    })
}

/// Load an executable image already sitting in memory (decompressed by the
/// caller's choice of source — disk, embedded bytes, or, in tests, a
/// freshly built [`builder::ExeImageBuilder`]) and link it against any
/// library images found on `properties`' library search path.
pub fn load_executable_bytes(compressed: &[u8], properties: &Properties) -> Result<Program, FatalError> {
    let decompressed = decompress(compressed)?;
    let exe = read_raw_image(&decompressed)?;
    if !exe.is_exe {
        return Err(FatalError::ImageInvalid("expected an executable image, found a library image".to_string()));
    }
    link_program(exe, properties)
}

pub fn load_executable_file(path: &Path, properties: &Properties) -> Result<Program, FatalError> {
    let bytes = std::fs::read(path).map_err(|e| FatalError::ImageInvalid(format!("cannot read '{}': {e}", path.display())))?;
    load_executable_bytes(&bytes, properties)
}

/// Merge the executable's own class table with every library image found
/// on the search path, rewrite
/// `LIB_*` instructions to resolved ids, and prune library classes that
/// turn out to be unreachable from the executable's own code.
fn link_program(exe: RawImage, properties: &Properties) -> Result<Program, FatalError> {
    let mut classes: BTreeMap<ClassId, Class> = BTreeMap::new();
    let mut class_names: HashMap<String, ClassId> = HashMap::new();
    let mut enums: HashMap<String, EnumDecl> = HashMap::new();
    let mut aliases: HashMap<String, String> = HashMap::new();
    let mut next_id: ClassId = 0;

    for class in exe.classes {
        next_id = next_id.max(class.id + 1);
        class_names.insert(class.name.clone(), class.id);
        classes.insert(class.id, class);
    }

    for dir in properties.lib_search_path() {
        let Ok(entries) = std::fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LIB_EXTENSION) {
                continue;
            }
            let Ok(raw_bytes) = std::fs::read(&path) else { continue };
            let Ok(decompressed) = decompress(&raw_bytes) else { continue };
            let lib = read_raw_image(&decompressed)?;
            if lib.is_exe {
                continue;
            }

            let offset = next_id;
            for enum_decl in lib.enums {
                enums.insert(enum_decl.name.clone(), enum_decl);
            }
            // Open Question (1): a library's alias table is consulted only
            // when it also declared a non-empty bundle-name list; an empty
            // bundle-name list falls back to plain class-name resolution.
            if !lib.bundle_names.is_empty() {
                for (alias, real) in lib.aliases {
                    aliases.insert(alias, real);
                }
            }
            for mut class in lib.classes {
                class.id += offset;
                class.parent_id = class.parent_id.map(|p| p + offset);
                class.interface_ids.iter_mut().for_each(|i| *i += offset);
                for method in class.methods.values_mut() {
                    for instr in method.instructions.iter_mut() {
                        link::offset_class_refs(&mut instr.op, offset);
                    }
                }
                next_id = next_id.max(class.id + 1);
                class_names.insert(class.name.clone(), class.id);
                classes.insert(class.id, class);
            }
        }
    }

    link::rewrite_lib_instructions(&mut classes, &class_names, &aliases)?;
    link::prune_unreachable(&mut classes, &mut class_names, exe.start_class_id);

    Ok(Program {
        classes,
        class_names,
        enums,
        float_pool: exe.float_pool,
        int_pool: exe.int_pool,
        char_pool: exe.char_pool,
        string_class_id: exe.string_class_id,
        start_class_id: exe.start_class_id,
        start_method_id: exe.start_method_id,
        dispatch_cache: DispatchCache::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Class, ClassFlags, Instr, Instruction, Method, MethodFlags, ReturnKind};

    fn main_class_returning(value: i64) -> Class {
        let mut methods = BTreeMap::new();
        let mut m = Method {
            class_id: 0,
            id: 0,
            encoded_name: "Main:main:o.System.String[]*".to_string(),
            return_kind: ReturnKind::IntLike,
            param_count: 1,
            local_space: 1,
            param_declarations: vec![crate::program::ParamKind::ObjAryParm(-1)],
            instructions: vec![
                Instruction::new(Instr::LoadIntLit(value)),
                Instruction::new(Instr::Rtrn),
            ],
            jump_table: Default::default(),
            flags: MethodFlags { is_function: true, ..Default::default() },
            native_entry: None,
        };
        m.build_jump_table();
        methods.insert(0, m);
        Class {
            id: 0,
            name: "Main".to_string(),
            file_name: Some("main.obs".to_string()),
            parent_id: None,
            interface_ids: Vec::new(),
            class_space: 0,
            instance_space: 0,
            class_declarations: Vec::new(),
            instance_declarations: Vec::new(),
            closure_declarations: Default::default(),
            methods,
            flags: ClassFlags { is_public: true, ..Default::default() },
        }
    }

    #[test]
    fn loads_a_synthetic_executable_image() {
        let mut b = builder::ExeImageBuilder::new();
        b.string_class_id = -1;
        b.start_class_id = 0;
        b.start_method_id = 0;
        b.classes.push(main_class_returning(42));
        let bytes = b.build();

        let properties = Properties::new();
        let program = load_executable_bytes(&bytes, &properties).unwrap();

        assert_eq!(program.start_class_id, Some(0));
        assert_eq!(program.start_method_id, Some(0));
        let method = program.get_method(0, 0).unwrap();
        assert_eq!(method.instructions[0].op, Instr::LoadIntLit(42));
    }

    #[test]
    fn rejects_mismatched_version() {
        let mut w = crate::image::codec::Writer::new();
        w.write_i32(VER_NUM + 1);
        w.write_i32(MAGIC_EXE);
        let bytes = crate::image::codec::compress(&w.into_bytes()).unwrap();
        let err = load_executable_bytes(&bytes, &Properties::new()).unwrap_err();
        assert!(matches!(err, FatalError::ImageVersionMismatch { .. }));
    }

    #[test]
    fn rejects_library_image_as_executable() {
        let mut w = crate::image::codec::Writer::new();
        w.write_i32(VER_NUM);
        w.write_i32(MAGIC_LIB);
        for _ in 0..7 {
            w.write_i32(0); // float/int/char pools, bundle names, aliases, enums, classes — all empty
        }
        let bytes = crate::image::codec::compress(&w.into_bytes()).unwrap();
        let err = load_executable_bytes(&bytes, &Properties::new()).unwrap_err();
        assert!(matches!(err, FatalError::ImageInvalid(_)));
    }
}
