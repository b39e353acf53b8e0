// src/sema/scope.rs
//
// Per-package symbol tables. Identifiers are unique across the combined
// namespaces of a package; ignore identifiers never enter the index and so
// can never be read back.

use std::path::Path;

use rustc_hash::FxHashMap;

use crate::frontend::{is_ignore_ident, Token};
use crate::sema::defs::{Enum, Fn, Package, Struct, Trait, TypeAlias, Var};

#[derive(Debug, Clone, Copy)]
enum SymbolRef {
    TypeAlias(usize),
    Struct(usize),
    Trait(usize),
    Enum(usize),
    Fn(usize),
    Global(usize),
}

/// Symbol table of one package (or one translation unit).
#[derive(Debug, Default)]
pub struct SymbolTable {
    pub type_aliases: Vec<TypeAlias>,
    pub structs: Vec<Struct>,
    pub traits: Vec<Trait>,
    pub enums: Vec<Enum>,
    pub funcs: Vec<Fn>,
    pub globals: Vec<Var>,
    pub packages: Vec<Package>,
    index: FxHashMap<String, SymbolRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declaration token of an existing identifier, across all namespaces.
    pub fn exist_ident(&self, ident: &str) -> Option<&Token> {
        match *self.index.get(ident)? {
            SymbolRef::TypeAlias(i) => Some(&self.type_aliases[i].token),
            SymbolRef::Struct(i) => Some(&self.structs[i].token),
            SymbolRef::Trait(i) => Some(&self.traits[i].token),
            SymbolRef::Enum(i) => Some(&self.enums[i].token),
            SymbolRef::Fn(i) => Some(&self.funcs[i].token),
            SymbolRef::Global(i) => Some(&self.globals[i].token),
        }
    }

    fn insert(&mut self, ident: &str, sym: SymbolRef) {
        if !is_ignore_ident(ident) {
            self.index.insert(ident.to_string(), sym);
        }
    }

    pub fn push_type_alias(&mut self, alias: TypeAlias) {
        self.insert(&alias.ident, SymbolRef::TypeAlias(self.type_aliases.len()));
        self.type_aliases.push(alias);
    }

    pub fn push_struct(&mut self, decl: Struct) {
        self.insert(&decl.ident, SymbolRef::Struct(self.structs.len()));
        self.structs.push(decl);
    }

    pub fn push_trait(&mut self, decl: Trait) {
        self.insert(&decl.ident, SymbolRef::Trait(self.traits.len()));
        self.traits.push(decl);
    }

    pub fn push_enum(&mut self, decl: Enum) {
        self.insert(&decl.ident, SymbolRef::Enum(self.enums.len()));
        self.enums.push(decl);
    }

    pub fn push_fn(&mut self, decl: Fn) {
        self.insert(&decl.ident, SymbolRef::Fn(self.funcs.len()));
        self.funcs.push(decl);
    }

    pub fn push_global(&mut self, var: Var) {
        self.insert(&var.ident, SymbolRef::Global(self.globals.len()));
        self.globals.push(var);
    }

    pub fn find_type_alias(&self, ident: &str) -> Option<&TypeAlias> {
        match *self.index.get(ident)? {
            SymbolRef::TypeAlias(i) => Some(&self.type_aliases[i]),
            _ => None,
        }
    }

    pub fn find_struct(&self, ident: &str) -> Option<&Struct> {
        match *self.index.get(ident)? {
            SymbolRef::Struct(i) => Some(&self.structs[i]),
            _ => None,
        }
    }

    pub fn find_trait(&self, ident: &str) -> Option<&Trait> {
        match *self.index.get(ident)? {
            SymbolRef::Trait(i) => Some(&self.traits[i]),
            _ => None,
        }
    }

    pub fn find_enum(&self, ident: &str) -> Option<&Enum> {
        match *self.index.get(ident)? {
            SymbolRef::Enum(i) => Some(&self.enums[i]),
            _ => None,
        }
    }

    pub fn find_fn(&self, ident: &str) -> Option<&Fn> {
        match *self.index.get(ident)? {
            SymbolRef::Fn(i) => Some(&self.funcs[i]),
            _ => None,
        }
    }

    pub fn find_global(&self, ident: &str) -> Option<&Var> {
        match *self.index.get(ident)? {
            SymbolRef::Global(i) => Some(&self.globals[i]),
            _ => None,
        }
    }

    pub fn find_package_by_path(&self, path: &Path) -> Option<&Package> {
        self.packages.iter().find(|p| p.path == path)
    }

    pub fn find_package_by_link_path(&self, link_path: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.link_path == link_path)
    }
}
