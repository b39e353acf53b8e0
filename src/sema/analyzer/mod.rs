// src/sema/analyzer/mod.rs

mod assign;
mod expr;
mod solver;
mod stmt;

#[cfg(test)]
mod tests;

use rayon::prelude::*;

use crate::errors::{DiagnosticSink, ErrorKey};
use crate::frontend::ast::{
    Attribute, Comment, DataType, EnumDecl, FnDecl, Item, Program, StructDecl, TraitDecl,
    TypeAliasDecl, VarDecl,
};
use crate::frontend::{is_ignore_ident, Token};
use crate::sema::defs::{self, Var};
use crate::sema::resolve::ready_type;
use crate::sema::scope::SymbolTable;
use crate::sema::ty;

use assign::PendingCheck;

/// Analysis configuration.
#[derive(Debug, Clone)]
pub struct SemaOptions {
    /// Ident of the entry-point function.
    pub entry_ident: String,
    /// Executables require an entry point; libraries do not.
    pub executable: bool,
}

impl Default for SemaOptions {
    fn default() -> Self {
        Self {
            entry_ident: "main".to_string(),
            executable: true,
        }
    }
}

/// The semantic analysis driver.
///
/// A single-threaded walk registers symbols and checks statements while
/// queuing independent compatibility checks; the queue is then drained by
/// a parallel fan-out whose join is the completion barrier. Tasks read the
/// symbol table and append to the sink; only the driver annotates the AST.
pub struct Analyzer<'s> {
    pub(crate) table: SymbolTable,
    pub(crate) block_vars: Vec<Var>,
    pub(crate) waiting_globals: Vec<VarDecl>,
    pub(crate) pending: Vec<PendingCheck>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) doc_text: String,
    pub(crate) iter_depth: u32,
    pub(crate) unsafety: bool,
    /// Expected type for `{…}` literals without a type prefix.
    pub(crate) eval_prefix: Option<DataType>,
    pub(crate) options: SemaOptions,
    pub(crate) sink: &'s DiagnosticSink,
}

impl<'s> Analyzer<'s> {
    pub fn new(options: SemaOptions, sink: &'s DiagnosticSink) -> Self {
        Self {
            table: SymbolTable::new(),
            block_vars: Vec::new(),
            waiting_globals: Vec::new(),
            pending: Vec::new(),
            attributes: Vec::new(),
            doc_text: String::new(),
            iter_depth: 0,
            unsafety: false,
            eval_prefix: None,
            options,
            sink,
        }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Check a translation unit. Expression models are annotated onto the
    /// program; diagnostics accumulate in the sink.
    pub fn analyze(&mut self, program: &mut Program) {
        let _span = tracing::debug_span!("analyze").entered();
        self.register_items(&program.items);
        if !self.doc_text.is_empty() {
            self.sink.flat(ErrorKey::ExistUndefinedDoc);
            self.doc_text.clear();
        }
        self.check_entry_point();
        self.check_types();
        self.check_waiting_globals();
        self.check_funcs(program);
        self.run_pending_checks();
    }

    /// Register a unit's definitions without checking bodies. Used when
    /// importing packages.
    pub fn build_symbols(program: &Program, sink: &DiagnosticSink) -> SymbolTable {
        let options = SemaOptions {
            executable: false,
            ..SemaOptions::default()
        };
        let mut analyzer = Analyzer::new(options, sink);
        analyzer.register_items(&program.items);
        for decl in std::mem::take(&mut analyzer.waiting_globals) {
            analyzer.table.push_global(Var::from_decl(&decl));
        }
        analyzer.table
    }

    // =========================================================================
    // Registration
    // =========================================================================

    fn register_items(&mut self, items: &[Item]) {
        for item in items {
            match item {
                Item::Attribute(attr) => self.push_attribute(attr),
                Item::Comment(comment) => self.comment(comment),
                Item::Fn(decl) => self.register_fn(decl),
                Item::GlobalVar(decl) => self.register_global(decl),
                Item::TypeAlias(decl) => self.register_type_alias(decl),
                Item::Struct(decl) => self.register_struct(decl),
                Item::Trait(decl) => self.register_trait(decl),
                Item::Enum(decl) => self.register_enum(decl),
            }
            self.check_doc(item);
            self.check_attributes_consumed(item);
        }
    }

    /// Doc comments attach to the next declaration; one left dangling over
    /// a non-documentable item is reported and dropped.
    fn check_doc(&mut self, item: &Item) {
        if self.doc_text.is_empty() {
            return;
        }
        if matches!(item, Item::Comment(_) | Item::Attribute(_)) {
            return;
        }
        self.sink.warn(&item.token(), ErrorKey::DocIgnored);
        self.doc_text.clear();
    }

    /// Attributes not consumed by a function declaration do not apply to
    /// anything else.
    fn check_attributes_consumed(&mut self, item: &Item) {
        if self.attributes.is_empty() {
            return;
        }
        if matches!(item, Item::Comment(_) | Item::Attribute(_)) {
            return;
        }
        self.sink
            .error(&item.token(), ErrorKey::AttributeNotSupports);
        self.attributes.clear();
    }

    fn push_attribute(&mut self, attr: &Attribute) {
        match attr.tag.lexeme.as_str() {
            "inline" => {}
            _ => {
                self.sink.error(&attr.tag, ErrorKey::UndefinedTag);
            }
        }
        if self.attributes.iter().any(|a| a.tag.lexeme == attr.tag.lexeme) {
            self.sink.error(&attr.tag, ErrorKey::AttributeRepeat);
            return;
        }
        self.attributes.push(attr.clone());
    }

    fn comment(&mut self, comment: &Comment) {
        let content = comment.content.trim();
        if self.doc_text.is_empty() {
            match content.strip_prefix("doc:") {
                Some(rest) => {
                    let rest = if rest.is_empty() { " " } else { rest };
                    self.doc_text.push_str(rest);
                }
                None => {}
            }
            return;
        }
        self.doc_text.push('\n');
        self.doc_text.push_str(content);
    }

    fn take_doc(&mut self) -> String {
        std::mem::take(&mut self.doc_text)
    }

    fn exist_ident(&self, ident: &str) -> Option<Token> {
        if let Some(token) = self.table.exist_ident(ident) {
            return Some(token.clone());
        }
        self.waiting_globals
            .iter()
            .find(|v| v.ident == ident)
            .map(|v| v.ident_token.clone())
    }

    fn register_type_alias(&mut self, decl: &TypeAliasDecl) {
        if self.exist_ident(&decl.ident).is_some() {
            self.sink.error(&decl.token, ErrorKey::ExistId);
            return;
        }
        if is_ignore_ident(&decl.ident) {
            self.sink.error(&decl.token, ErrorKey::IgnoreId);
            return;
        }
        let doc = self.take_doc();
        self.table.push_type_alias(defs::TypeAlias {
            token: decl.token.clone(),
            ident: decl.ident.clone(),
            public: decl.public,
            doc,
            kind: decl.kind.clone(),
        });
    }

    fn register_fn(&mut self, decl: &FnDecl) {
        if self.exist_ident(&decl.ident).is_some() {
            self.sink.error(&decl.token, ErrorKey::ExistId);
        } else if is_ignore_ident(&decl.ident) {
            self.sink.error(&decl.token, ErrorKey::IgnoreId);
        }
        let mut attributes = decl.attributes.clone();
        attributes.append(&mut self.attributes);
        self.check_fn_attributes(&attributes);
        let doc = self.take_doc();
        self.table.push_fn(defs::Fn {
            token: decl.token.clone(),
            ident: decl.ident.clone(),
            public: decl.public,
            doc,
            attributes,
            params: decl.params.clone(),
            ret: decl.ret.clone(),
        });
    }

    fn check_fn_attributes(&mut self, attributes: &[Attribute]) {
        for attribute in attributes {
            match attribute.tag.lexeme.as_str() {
                "inline" => {}
                _ => self.sink.error(&attribute.token, ErrorKey::InvalidAttribute),
            }
        }
    }

    fn register_global(&mut self, decl: &VarDecl) {
        if self.exist_ident(&decl.ident).is_some() {
            self.sink.error(&decl.ident_token, ErrorKey::ExistId);
            return;
        }
        let mut decl = decl.clone();
        decl.doc = self.take_doc();
        self.waiting_globals.push(decl);
    }

    fn register_struct(&mut self, decl: &StructDecl) {
        if self.exist_ident(&decl.ident).is_some() {
            self.sink.error(&decl.token, ErrorKey::ExistId);
            return;
        }
        if is_ignore_ident(&decl.ident) {
            self.sink.error(&decl.token, ErrorKey::IgnoreId);
            return;
        }
        let doc = self.take_doc();
        self.table.push_struct(defs::Struct {
            token: decl.token.clone(),
            ident: decl.ident.clone(),
            public: decl.public,
            doc,
            fields: decl
                .fields
                .iter()
                .map(|f| defs::Field {
                    token: f.token.clone(),
                    ident: f.ident.clone(),
                    public: f.public,
                    mutable: f.mutable,
                    kind: f.kind.clone(),
                })
                .collect(),
            implements: decl.implements.clone(),
        });
    }

    fn register_trait(&mut self, decl: &TraitDecl) {
        if self.exist_ident(&decl.ident).is_some() {
            self.sink.error(&decl.token, ErrorKey::ExistId);
            return;
        }
        if is_ignore_ident(&decl.ident) {
            self.sink.error(&decl.token, ErrorKey::IgnoreId);
            return;
        }
        let doc = self.take_doc();
        self.table.push_trait(defs::Trait {
            token: decl.token.clone(),
            ident: decl.ident.clone(),
            public: decl.public,
            doc,
            methods: decl.methods.iter().map(|m| m.sig()).collect(),
        });
    }

    fn register_enum(&mut self, decl: &EnumDecl) {
        if self.exist_ident(&decl.ident).is_some() {
            self.sink.error(&decl.token, ErrorKey::ExistId);
            return;
        }
        if is_ignore_ident(&decl.ident) {
            self.sink.error(&decl.token, ErrorKey::IgnoreId);
            return;
        }
        let doc = self.take_doc();
        self.table.push_enum(defs::Enum {
            token: decl.token.clone(),
            ident: decl.ident.clone(),
            public: decl.public,
            doc,
            kind: decl.kind.clone(),
            items: decl
                .items
                .iter()
                .map(|item| defs::EnumItem {
                    token: item.token.clone(),
                    ident: item.ident.clone(),
                })
                .collect(),
        });
    }

    // =========================================================================
    // Driver passes
    // =========================================================================

    fn check_entry_point(&mut self) {
        if !self.options.executable {
            return;
        }
        let Some(entry) = self.table.find_fn(&self.options.entry_ident).cloned() else {
            self.sink.flat(ErrorKey::NoEntryPoint);
            return;
        };
        if !entry.params.is_empty() {
            self.sink
                .error(&entry.token, ErrorKey::EntrypointHaveParameters);
        }
        if !ty::is_void_ret(&entry.ret) {
            let token = if entry.ret.token.kind == crate::frontend::TokenKind::Na {
                entry.token.clone()
            } else {
                entry.ret.token.clone()
            };
            self.sink.error(&token, ErrorKey::EntrypointHaveReturn);
        }
        if !entry.attributes.is_empty() {
            self.sink
                .error(&entry.token, ErrorKey::EntrypointHaveAttributes);
        }
    }

    /// Resolve every registered alias so unknown names and cycles surface
    /// even when the alias is never used.
    fn check_types(&mut self) {
        for index in 0..self.table.type_aliases.len() {
            let kind = self.table.type_aliases[index].kind.clone();
            let _ = ready_type(&self.table, kind, true, self.sink);
        }
    }

    fn check_waiting_globals(&mut self) {
        for mut decl in std::mem::take(&mut self.waiting_globals) {
            self.parse_var(&mut decl);
            self.table.push_global(Var::from_decl(&decl));
        }
    }

    fn check_funcs(&mut self, program: &mut Program) {
        for item in &mut program.items {
            if let Item::Fn(decl) = item {
                tracing::trace!(ident = %decl.ident, "checking function");
                self.block_vars = self.vars_from_params(&decl.params);
                self.check_fn(decl);
            }
        }
    }

    /// Parameters become the function's outermost block variables; a
    /// variadic parameter binds as a slice of its element type.
    fn vars_from_params(&mut self, params: &[crate::frontend::ast::Param]) -> Vec<Var> {
        let mut vars = Vec::with_capacity(params.len());
        let count = params.len();
        for (index, param) in params.iter().enumerate() {
            if param.variadic && count - index > 1 {
                self.sink
                    .error(&param.token, ErrorKey::VariadicParameterNotlast);
            }
            let mut kind = param.kind.clone();
            if param.variadic {
                kind.lexeme = format!("[]{}", kind.lexeme);
            }
            vars.push(Var {
                token: param.token.clone(),
                ident: param.ident.clone(),
                public: false,
                constant: param.constant,
                mutable: !param.constant,
                doc: String::new(),
                kind,
            });
        }
        vars
    }

    /// Drain the queued compatibility checks through a parallel fan-out.
    /// Completion of the iterator is the barrier; diagnostic order across
    /// tasks is unspecified.
    fn run_pending_checks(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return;
        }
        tracing::debug!(count = pending.len(), "running deferred checks");
        let table = &self.table;
        let sink = self.sink;
        pending
            .into_par_iter()
            .for_each(|check| check.run(table, sink));
    }
}
