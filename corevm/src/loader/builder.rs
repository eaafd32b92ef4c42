//! Hand-assembles an in-memory executable image byte stream, mirroring
//! [`super::read_raw_image`]'s field order exactly. Exists so tests can
//! drive the real loader end to end
//! without a foreign compiler to produce a `.obe` file.

use crate::image::codec::{compress, Writer};
use crate::image::format::{MAGIC_EXE, VER_NUM};
use crate::program::{Class, ClassId, MethodId};

use super::record_codec::write_class;

#[derive(Default)]
pub struct ExeImageBuilder {
    pub string_class_id: ClassId,
    pub start_class_id: ClassId,
    pub start_method_id: MethodId,
    pub float_pool: Vec<f64>,
    pub int_pool: Vec<i64>,
    pub char_pool: Vec<String>,
    pub classes: Vec<Class>,
}

impl ExeImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize and zlib-compress this image exactly as
    /// [`super::load_executable_bytes`] expects to decompress it.
    pub fn build(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_i32(VER_NUM);
        w.write_i32(MAGIC_EXE);
        w.write_i32(self.string_class_id);

        w.write_i32(self.float_pool.len() as i32);
        for v in &self.float_pool {
            w.write_f64(*v);
        }
        w.write_i32(self.int_pool.len() as i32);
        for v in &self.int_pool {
            w.write_i64(*v);
        }
        w.write_i32(self.char_pool.len() as i32);
        for s in &self.char_pool {
            w.write_string(s);
        }

        w.write_i32(self.start_class_id);
        w.write_i32(self.start_method_id);

        w.write_i32(self.classes.len() as i32);
        for class in &self.classes {
            write_class(&mut w, class);
        }

        compress(&w.into_bytes()).expect("zlib compression never fails for in-memory buffers")
    }
}
