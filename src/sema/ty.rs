// src/sema/ty.rs
//
// Type predicates and compatibility rules.
// These are pure functions over the structural DataType representation:
// the lexeme prefix carries pointer/array shape, the code carries the base
// type.

use crate::frontend::ast::{DataType, TypeCode};

/// Reports whether the type has pointer shape (`*` prefix).
pub fn is_pointer(t: &DataType) -> bool {
    t.lexeme.starts_with('*')
}

/// Reports whether the type has array/slice shape (`[` prefix).
pub fn is_array(t: &DataType) -> bool {
    t.lexeme.starts_with('[')
}

/// Reports whether the type is a map without pointer/array shape.
pub fn is_map(t: &DataType) -> bool {
    t.code == TypeCode::Map && !is_pointer(t) && !is_array(t)
}

/// A single type has no `*`/`[` prefix and is not a function or map.
pub fn is_single(t: &DataType) -> bool {
    !is_pointer(t) && !is_array(t) && t.code != TypeCode::Func && !is_map(t)
}

/// Only nil-compatible types accept the `nil` literal.
pub fn is_nil_compatible(t: &DataType) -> bool {
    t.code == TypeCode::Func || is_pointer(t) || is_map(t)
}

/// Reports whether values of the type denote storage locations.
pub fn is_lvalue(t: &DataType) -> bool {
    is_pointer(t) || is_array(t) || is_map(t)
}

/// Reports whether the type has mutable-reference semantics.
pub fn is_mut(t: &DataType) -> bool {
    is_pointer(t)
}

/// Only array/slice values can be spread with `...`.
pub fn is_variadicable(t: &DataType) -> bool {
    is_array(t)
}

/// Reports whether the type is a void, non-multi return type.
pub fn is_void_ret(t: &DataType) -> bool {
    t.code == TypeCode::Void && !t.multi_typed
}

/// Reports whether `foreach` can iterate values of the type.
pub fn is_enumerable(t: &DataType) -> bool {
    is_array(t) || (is_single(t) && t.code == TypeCode::Str)
}

/// Element type of an array/slice: the lexeme without its `[]` prefix.
pub fn element_type(t: &DataType) -> DataType {
    let mut elem = t.clone();
    elem.lexeme = t.lexeme[2..].to_string();
    elem
}

/// Primitive-code compatibility with widening.
///
/// `Any` matches everything unless `ignore_any`; identical codes match;
/// integers widen within their signedness class, floats widen F32 to F64.
/// Signed and unsigned never silently mix.
pub fn codes_are_compatible(src: TypeCode, dst: TypeCode, ignore_any: bool) -> bool {
    if src == dst {
        return true;
    }
    if src == TypeCode::Any || dst == TypeCode::Any {
        return !ignore_any;
    }
    if (src.is_signed() && dst.is_signed())
        || (src.is_unsigned() && dst.is_unsigned())
        || (src.is_float() && dst.is_float())
    {
        return src.rank() <= dst.rank();
    }
    false
}

fn check_array_compatibility(arr_t: &DataType, t: &DataType) -> bool {
    t.code == TypeCode::Nil || arr_t.lexeme == t.lexeme
}

/// Structural type compatibility.
///
/// Arrays compare by lexeme (or accept nil); nil-compatible types accept
/// only `nil`; everything else falls to the primitive table.
pub fn types_are_compatible(t1: &DataType, t2: &DataType, ignore_any: bool) -> bool {
    if is_array(t1) || is_array(t2) {
        let (arr, other) = if is_array(t1) { (t1, t2) } else { (t2, t1) };
        return check_array_compatibility(arr, other);
    }
    if is_nil_compatible(t1) || is_nil_compatible(t2) {
        return t1.code == TypeCode::Nil || t2.code == TypeCode::Nil;
    }
    codes_are_compatible(t1.code, t2.code, ignore_any)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(code: TypeCode, lexeme: &str) -> DataType {
        DataType {
            code,
            lexeme: lexeme.to_string(),
            ..DataType::default()
        }
    }

    #[test]
    fn shape_predicates() {
        let ptr = ty(TypeCode::I32, "*i32");
        let arr = ty(TypeCode::I32, "[]i32");
        let arr_ptr = ty(TypeCode::I32, "[]*i32");
        let plain = ty(TypeCode::I32, "i32");
        assert!(is_pointer(&ptr) && !is_single(&ptr));
        assert!(is_array(&arr) && !is_single(&arr));
        assert!(is_array(&arr_ptr) && !is_pointer(&arr_ptr));
        assert!(is_single(&plain));
        assert_eq!(element_type(&arr_ptr).lexeme, "*i32");
    }

    #[test]
    fn nil_compatibility() {
        assert!(is_nil_compatible(&ty(TypeCode::I32, "*i32")));
        assert!(!is_nil_compatible(&ty(TypeCode::I32, "i32")));
        let nil = ty(TypeCode::Nil, "nil");
        assert!(types_are_compatible(&ty(TypeCode::I32, "*i32"), &nil, true));
        assert!(types_are_compatible(&ty(TypeCode::I32, "[]i32"), &nil, true));
        assert!(!types_are_compatible(
            &ty(TypeCode::I32, "*i32"),
            &ty(TypeCode::I32, "*i32"),
            true
        ));
    }

    #[test]
    fn widening_is_ordered_and_class_bound() {
        assert!(codes_are_compatible(TypeCode::I8, TypeCode::I64, true));
        assert!(!codes_are_compatible(TypeCode::I64, TypeCode::I8, true));
        assert!(codes_are_compatible(TypeCode::U8, TypeCode::U32, true));
        assert!(codes_are_compatible(TypeCode::F32, TypeCode::F64, true));
        // Signed and unsigned never silently mix.
        assert!(!codes_are_compatible(TypeCode::I32, TypeCode::U32, true));
        assert!(!codes_are_compatible(TypeCode::U8, TypeCode::I64, true));
    }

    #[test]
    fn any_matches_unless_ignored() {
        assert!(codes_are_compatible(TypeCode::Any, TypeCode::I32, false));
        assert!(codes_are_compatible(TypeCode::Str, TypeCode::Any, false));
        assert!(!codes_are_compatible(TypeCode::Any, TypeCode::I32, true));
    }

    #[test]
    fn arrays_compare_by_lexeme() {
        let a = ty(TypeCode::I32, "[]i32");
        let b = ty(TypeCode::I32, "[]i32");
        let c = ty(TypeCode::Str, "[]str");
        assert!(types_are_compatible(&a, &b, true));
        assert!(!types_are_compatible(&a, &c, true));
    }
}
