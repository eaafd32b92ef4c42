//! Enum representation
//!
//! Enums are referenced from bytecode only via their resolved `i64` item
//! values and by reflective lookups; the interpreter never dispatches on
//! an enum id the way it does for classes/methods.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumItem {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub offset: i32,
    pub items: Vec<EnumItem>,
}

impl EnumDecl {
    pub fn item_value(&self, name: &str) -> Option<i64> {
        self.items.iter().find(|i| i.name == name).map(|i| i.value)
    }
}
