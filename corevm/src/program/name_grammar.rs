//! Encoded method/field name grammar
//!
//! A type is a single character followed by zero or more `*` per array
//! dimension: `l` bool, `b` byte, `c` char, `i` int, `f` float, `n` nil,
//! `v` var, `o.<ClassName>[<GenericList>]` for classes, `m.(...)~<ReturnType>`
//! for functions. A full method name is
//! `<ClassName>:<MethodName>:<ParamType1>,<ParamType2>,...`; the return
//! type is carried separately in the image rather than in this string.
//!
//! Virtual dispatch keys on the *suffix* starting after the class segment
//! (`<MethodName>:<ParamType1>,...`), since that is what distinguishes
//! overloads of the same name across a class hierarchy.

/// A single encoded parameter/field type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedType {
    Bool,
    Byte,
    Char,
    Int,
    Float,
    Nil,
    Var,
    Class { name: String, generics: Vec<EncodedType> },
    Function { params: Vec<EncodedType>, ret: Box<EncodedType> },
    Array { inner: Box<EncodedType>, dims: u32 },
}

impl EncodedType {
    /// Parse a single encoded type starting at `s`, returning the parsed
    /// type and the remaining unparsed suffix.
    pub fn parse(s: &str) -> Option<(EncodedType, &str)> {
        let mut chars = s.char_indices();
        let (_, c) = chars.next()?;
        let (base, rest) = match c {
            'l' => (EncodedType::Bool, &s[1..]),
            'b' => (EncodedType::Byte, &s[1..]),
            'c' => (EncodedType::Char, &s[1..]),
            'i' => (EncodedType::Int, &s[1..]),
            'f' => (EncodedType::Float, &s[1..]),
            'n' => (EncodedType::Nil, &s[1..]),
            'v' => (EncodedType::Var, &s[1..]),
            'o' => parse_class(&s[1..])?,
            'm' => parse_function(&s[1..])?,
            _ => return None,
        };
        let mut dims = 0u32;
        let mut tail = rest;
        while let Some(stripped) = tail.strip_prefix('*') {
            dims += 1;
            tail = stripped;
        }
        if dims == 0 {
            Some((base, tail))
        } else {
            Some((
                EncodedType::Array {
                    inner: Box::new(base),
                    dims,
                },
                tail,
            ))
        }
    }
}

fn parse_class(s: &str) -> Option<(EncodedType, &str)> {
    let s = s.strip_prefix('.')?;
    let name_end = s
        .find(|c: char| c == '[' || c == ',' || c == ':')
        .unwrap_or(s.len());
    let name = s[..name_end].to_string();
    let rest = &s[name_end..];
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = after_bracket.find(']')?;
        let generics_str = &after_bracket[..close];
        let mut generics = Vec::new();
        let mut cursor = generics_str;
        while !cursor.is_empty() {
            let (ty, tail) = EncodedType::parse(cursor)?;
            generics.push(ty);
            cursor = tail.strip_prefix(',').unwrap_or(tail);
        }
        Some((
            EncodedType::Class { name, generics },
            &after_bracket[close + 1..],
        ))
    } else {
        Some((
            EncodedType::Class {
                name,
                generics: Vec::new(),
            },
            rest,
        ))
    }
}

fn parse_function(s: &str) -> Option<(EncodedType, &str)> {
    let s = s.strip_prefix('.')?;
    let s = s.strip_prefix('(')?;
    let close = s.find(')')?;
    let params_str = &s[..close];
    let mut params = Vec::new();
    let mut cursor = params_str;
    while !cursor.is_empty() {
        let (ty, tail) = EncodedType::parse(cursor)?;
        params.push(ty);
        cursor = tail.strip_prefix(',').unwrap_or(tail);
    }
    let rest = &s[close + 1..];
    let rest = rest.strip_prefix('~')?;
    let (ret, tail) = EncodedType::parse(rest)?;
    Some((
        EncodedType::Function {
            params,
            ret: Box::new(ret),
        },
        tail,
    ))
}

/// Split a full encoded method name `<ClassName>:<MethodName>:<Params>`
/// into its class segment and the dispatch-key suffix
/// (`<MethodName>:<Params>`).
pub fn split_class_segment(full_name: &str) -> Option<(&str, &str)> {
    let idx = full_name.find(':')?;
    Some((&full_name[..idx], &full_name[idx + 1..]))
}

/// The dispatch key for a full encoded method name: everything after the
/// class segment. Two methods with the same dispatch key on different
/// classes are considered overrides of one another.
pub fn dispatch_key(full_name: &str) -> &str {
    split_class_segment(full_name).map_or(full_name, |(_, suffix)| suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitives() {
        assert_eq!(EncodedType::parse("i").unwrap().0, EncodedType::Int);
        assert_eq!(EncodedType::parse("f").unwrap().0, EncodedType::Float);
    }

    #[test]
    fn parses_array_dims() {
        let (ty, rest) = EncodedType::parse("i**").unwrap();
        assert_eq!(
            ty,
            EncodedType::Array {
                inner: Box::new(EncodedType::Int),
                dims: 2
            }
        );
        assert_eq!(rest, "");
    }

    #[test]
    fn parses_class_with_generics() {
        let (ty, _) = EncodedType::parse("o.Pair[i,f]").unwrap();
        match ty {
            EncodedType::Class { name, generics } => {
                assert_eq!(name, "Pair");
                assert_eq!(generics.len(), 2);
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn dispatch_key_strips_class_segment() {
        assert_eq!(dispatch_key("Shape:area:"), "area:");
        assert_eq!(dispatch_key("Shape:set:i,f"), "set:i,f");
    }
}
