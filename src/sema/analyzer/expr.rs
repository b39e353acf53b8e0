// src/sema/analyzer/expr.rs
//
// Expression evaluation. The evaluator reduces a process list (operand
// runs and operator tokens) to a Data record while building the output
// expression model post-order. It never aborts: failed subexpressions
// yield a void Data so the surrounding walk can continue.

use smallvec::SmallVec;

use crate::errors::ErrorKey;
use crate::frontend::ast::{
    safe_ident, split_processes, type_from_tokens, DataType, Expr, ExprModel, FnSig, TypeCode,
    TypeTag,
};
use crate::frontend::{is_ignore_ident, Token, TokenKind};
use crate::sema::bits::{check_bit_int, is_const_num};
use crate::sema::defs;
use crate::sema::resolve::ready_type;
use crate::sema::scope::SymbolTable;
use crate::sema::ty;
use crate::sema::value::Data;

use super::assign::PendingCheck;
use super::solver::Solver;
use super::Analyzer;

/// One reduced or not-yet-reduced entry of the precedence climber.
enum ProcessItem {
    Operand(Vec<Token>),
    Operator(Token),
    Solved(Data, ExprModel),
}

fn precedence(lexeme: &str) -> u8 {
    match lexeme {
        "*" | "/" | "%" | "<<" | ">>" | "&" => 5,
        "+" | "-" | "|" | "^" => 4,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "&&" => 2,
        "||" => 1,
        _ => 0,
    }
}

/// Definition lookup result; owned clones so evaluation can keep borrowing
/// the analyzer mutably.
enum DefLookup {
    Var(defs::Var),
    Fn(defs::Fn),
    TypeAlias(defs::TypeAlias),
    Struct(defs::Struct),
    Enum(defs::Enum),
}

fn find_def(table: &SymbolTable, ident: &str, public_only: bool) -> Option<DefLookup> {
    let public = |p: bool| !public_only || p;
    if let Some(v) = table.find_global(ident) {
        if public(v.public) {
            return Some(DefLookup::Var(v.clone()));
        }
    }
    if let Some(f) = table.find_fn(ident) {
        if public(f.public) {
            return Some(DefLookup::Fn(f.clone()));
        }
    }
    if let Some(a) = table.find_type_alias(ident) {
        if public(a.public) {
            return Some(DefLookup::TypeAlias(a.clone()));
        }
    }
    if let Some(s) = table.find_struct(ident) {
        if public(s.public) {
            return Some(DefLookup::Struct(s.clone()));
        }
    }
    if let Some(e) = table.find_enum(ident) {
        if public(e.public) {
            return Some(DefLookup::Enum(e.clone()));
        }
    }
    None
}

impl Analyzer<'_> {
    /// Evaluate an expression to its value data and output model.
    ///
    /// A declaration (struct/enum name) is not a value; it is rejected
    /// here so it can still flow through member positions internally.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> (Data, ExprModel) {
        let (data, model) = self.eval_processes(&expr.processes);
        if data.decl {
            self.sink.error(&expr.token(), ErrorKey::InvalidSyntax);
            return (Data::void(), model);
        }
        (data, model)
    }

    pub(crate) fn eval_tokens(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let processes = split_processes(tokens);
        self.eval_processes(&processes)
    }

    /// Precedence climber: repeatedly reduce at the leftmost operator of
    /// the highest remaining precedence, strictly left-to-right for ties.
    fn eval_processes(&mut self, processes: &[Vec<Token>]) -> (Data, ExprModel) {
        if processes.is_empty() {
            return (Data::void(), ExprModel::empty());
        }
        if processes.len() == 1 {
            return self.eval_expr_part(&processes[0]);
        }

        let mut items: Vec<ProcessItem> = Vec::with_capacity(processes.len());
        for process in processes {
            if process.len() == 1 && process[0].kind == TokenKind::Operator {
                if precedence(&process[0].lexeme) == 0 {
                    self.sink.error(&process[0], ErrorKey::InvalidOperator);
                    return (Data::void(), ExprModel::empty());
                }
                items.push(ProcessItem::Operator(process[0].clone()));
            } else {
                items.push(ProcessItem::Operand(process.clone()));
            }
        }

        while let Some(j) = next_operator(&items) {
            if j == 0 || j + 1 >= items.len() {
                let op = match &items[j] {
                    ProcessItem::Operator(op) => op.clone(),
                    _ => Token::na(),
                };
                self.sink.error(&op, ErrorKey::InvalidSyntax);
                return (Data::void(), ExprModel::empty());
            }
            let right = items.remove(j + 1);
            let op = match items.remove(j) {
                ProcessItem::Operator(op) => op,
                _ => Token::na(),
            };
            let left = std::mem::replace(&mut items[j - 1], ProcessItem::Operand(Vec::new()));
            let (left_data, left_model) = self.resolve_item(left);
            let (right_data, right_model) = self.resolve_item(right);
            let solver = Solver {
                left: left_data,
                right: right_data,
                operator: op.clone(),
            };
            let data = solver.solve(self.sink);
            let model = ExprModel::Binary {
                op: op.lexeme,
                left: Box::new(left_model),
                right: Box::new(right_model),
            };
            items[j - 1] = ProcessItem::Solved(data, model);
        }

        match items.into_iter().next() {
            Some(ProcessItem::Solved(data, model)) => (data, model),
            Some(ProcessItem::Operand(tokens)) => self.eval_expr_part(&tokens),
            _ => (Data::void(), ExprModel::empty()),
        }
    }

    fn resolve_item(&mut self, item: ProcessItem) -> (Data, ExprModel) {
        match item {
            ProcessItem::Operand(tokens) => self.eval_expr_part(&tokens),
            ProcessItem::Solved(data, model) => (data, model),
            ProcessItem::Operator(op) => {
                self.sink.error(&op, ErrorKey::InvalidSyntax);
                (Data::void(), ExprModel::empty())
            }
        }
    }

    /// Evaluate one operand run.
    pub(crate) fn eval_expr_part(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let Some(first) = tokens.first() else {
            return (Data::void(), ExprModel::empty());
        };
        if tokens.len() == 1 {
            return self.eval_single(first);
        }
        if first.kind == TokenKind::Name && first.lexeme == "unsafe" {
            return self.eval_unsafe(tokens);
        }
        match first.kind {
            TokenKind::Operator => return self.eval_unary(tokens),
            TokenKind::New => return self.eval_heap_alloc(tokens),
            TokenKind::Brace if first.lexeme == "(" => {
                if let Some(result) = self.eval_try_cast(tokens) {
                    return result;
                }
                if let Some(result) = self.eval_try_assign(tokens) {
                    return result;
                }
            }
            _ => {}
        }
        let last = tokens.last().unwrap();
        match last.kind {
            TokenKind::Operator if last.lexeme != "::" => self.eval_postfix(tokens),
            TokenKind::Brace if last.lexeme == ")" => self.eval_parentheses_range(tokens),
            TokenKind::Brace if last.lexeme == "}" => self.eval_brace_range(tokens),
            TokenKind::Brace if last.lexeme == "]" => self.eval_bracket_range(tokens),
            _ if has_top_level_operator(tokens, "::") => self.eval_ns_selection(tokens),
            _ => {
                self.sink.error(first, ErrorKey::InvalidSyntax);
                (Data::void(), ExprModel::empty())
            }
        }
    }

    fn eval_single(&mut self, token: &Token) -> (Data, ExprModel) {
        match token.kind {
            TokenKind::Value => self.eval_value_literal(token),
            TokenKind::Name => self.eval_ident(token),
            _ => {
                self.sink.error(token, ErrorKey::InvalidSyntax);
                (Data::void(), ExprModel::empty())
            }
        }
    }

    // =========================================================================
    // Literals and identifiers
    // =========================================================================

    fn eval_value_literal(&mut self, token: &Token) -> (Data, ExprModel) {
        let lexeme = &token.lexeme;
        let kind = if lexeme.starts_with('"') {
            DataType::primitive(TypeCode::Str)
        } else if lexeme.starts_with('\'') {
            if is_byte_lit(lexeme) {
                DataType::primitive(TypeCode::U8)
            } else {
                DataType::primitive(TypeCode::Rune)
            }
        } else if lexeme == "true" || lexeme == "false" {
            DataType::primitive(TypeCode::Bool)
        } else if lexeme == "nil" {
            DataType::nil()
        } else {
            numeric_literal_kind(lexeme)
        };
        let data = Data {
            kind,
            lexeme: lexeme.clone(),
            token: token.clone(),
            constant: true,
            ..Data::default()
        };
        (data, ExprModel::Literal(lexeme.clone()))
    }

    fn eval_ident(&mut self, token: &Token) -> (Data, ExprModel) {
        let ident = &token.lexeme;
        let model = ExprModel::Ident(safe_ident(ident));
        if let Some(v) = self.find_var(ident) {
            let data = Data {
                kind: v.kind.clone(),
                lexeme: ident.clone(),
                token: token.clone(),
                lvalue: !v.constant,
                mutable: v.mutable,
                constant: v.constant,
                ..Data::default()
            };
            return (data, model);
        }
        let def = find_def(&self.table, ident, false);
        match def {
            Some(DefLookup::Var(v)) => {
                let data = Data {
                    kind: v.kind,
                    lexeme: ident.clone(),
                    token: token.clone(),
                    lvalue: !v.constant,
                    mutable: v.mutable,
                    constant: v.constant,
                    ..Data::default()
                };
                (data, model)
            }
            Some(def) => (self.eval_def(def, token), model),
            None => {
                self.sink
                    .error_args(token, ErrorKey::IdNoexist, vec![ident.clone()]);
                (Data::void(), model)
            }
        }
    }

    fn eval_def(&mut self, def: DefLookup, token: &Token) -> Data {
        match def {
            DefLookup::Var(v) => Data {
                kind: v.kind,
                lexeme: token.lexeme.clone(),
                token: token.clone(),
                lvalue: !v.constant,
                mutable: v.mutable,
                constant: v.constant,
                ..Data::default()
            },
            DefLookup::Fn(f) => Data {
                kind: DataType::func(f.sig()),
                lexeme: token.lexeme.clone(),
                token: token.clone(),
                ..Data::default()
            },
            DefLookup::TypeAlias(alias) => {
                let (resolved, ok) = ready_type(&self.table, alias.kind, true, self.sink);
                if !ok {
                    return Data::void();
                }
                match resolved.code {
                    TypeCode::Struct | TypeCode::Enum => Data {
                        kind: resolved,
                        token: token.clone(),
                        decl: true,
                        ..Data::default()
                    },
                    _ => {
                        self.sink.error(token, ErrorKey::InvalidSyntax);
                        Data::void()
                    }
                }
            }
            DefLookup::Struct(s) => Data {
                kind: DataType {
                    code: TypeCode::Struct,
                    lexeme: s.ident.clone(),
                    tag: Some(Box::new(TypeTag::Decl(s.ident))),
                    token: token.clone(),
                    ..DataType::default()
                },
                token: token.clone(),
                decl: true,
                ..Data::default()
            },
            DefLookup::Enum(e) => Data {
                kind: DataType {
                    code: TypeCode::Enum,
                    lexeme: e.ident.clone(),
                    tag: Some(Box::new(TypeTag::Decl(e.ident))),
                    token: token.clone(),
                    ..DataType::default()
                },
                token: token.clone(),
                decl: true,
                ..Data::default()
            },
        }
    }

    /// Block-local variables shadow globals; ignore identifiers are never
    /// readable.
    pub(crate) fn find_var(&self, ident: &str) -> Option<defs::Var> {
        if is_ignore_ident(ident) {
            return None;
        }
        self.block_vars
            .iter()
            .rev()
            .find(|v| v.ident == ident)
            .cloned()
    }

    // =========================================================================
    // Unary operators and heap allocation
    // =========================================================================

    fn eval_unary(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let op = tokens[0].clone();
        let rest = &tokens[1..];
        if rest.is_empty() {
            self.sink.error(&op, ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        }
        let (mut v, model) = self.eval_expr_part(rest);
        match op.lexeme.as_str() {
            "-" => {
                if !ty::is_single(&v.kind) || !v.kind.code.is_numeric() {
                    self.sink.error(&op, ErrorKey::InvalidDataUnary);
                }
                if is_const_num(&v.lexeme) {
                    v.lexeme = format!("-{}", v.lexeme);
                }
            }
            "+" => {
                if !ty::is_single(&v.kind) || !v.kind.code.is_numeric() {
                    self.sink.error(&op, ErrorKey::InvalidDataPlus);
                }
            }
            "~" => {
                if !ty::is_single(&v.kind) || !v.kind.code.is_integer() {
                    self.sink.error(&op, ErrorKey::InvalidDataTilde);
                }
            }
            "!" => {
                if !ty::is_single(&v.kind) || v.kind.code != TypeCode::Bool {
                    self.sink.error(&op, ErrorKey::InvalidDataLogicalNot);
                }
                v.kind = DataType::primitive(TypeCode::Bool);
            }
            "*" => {
                if !self.unsafety {
                    self.sink
                        .error(&op, ErrorKey::UnsafeBehaviorAtOutOfUnsafeScope);
                }
                if !ty::is_pointer(&v.kind) {
                    self.sink.error(&op, ErrorKey::InvalidDataStar);
                } else {
                    v.kind.lexeme = v.kind.lexeme[1..].to_string();
                }
                v.lvalue = true;
                v.constant = false;
            }
            "&" => {
                let addressable = v.kind.code != TypeCode::Func && v.token.kind == TokenKind::Name;
                if !addressable {
                    self.sink.error(&op, ErrorKey::InvalidDataAmper);
                }
                v.kind.lexeme = format!("*{}", v.kind.lexeme);
                v.lvalue = true;
                v.mutable = true;
                v.constant = false;
            }
            _ => {
                self.sink.error(&op, ErrorKey::InvalidSyntax);
                return (Data::void(), ExprModel::empty());
            }
        }
        v.token = op.clone();
        (
            v,
            ExprModel::Unary {
                op: op.lexeme,
                expr: Box::new(model),
            },
        )
    }

    fn eval_heap_alloc(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        if tokens.len() == 1 {
            self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        }
        let rest = &tokens[1..];
        let mut index = 0;
        let Some(mut dt) = type_from_tokens(rest, &mut index) else {
            self.sink.error(&rest[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        };
        if index + 1 < rest.len() {
            self.sink.error(&rest[index + 1], ErrorKey::InvalidSyntax);
        }
        let model = ExprModel::Unary {
            op: "new".to_string(),
            expr: Box::new(ExprModel::Literal(dt.lexeme.clone())),
        };
        dt.lexeme = format!("*{}", dt.lexeme);
        let data = Data {
            kind: dt,
            token: tokens[0].clone(),
            lvalue: true,
            mutable: true,
            ..Data::default()
        };
        (data, model)
    }

    // =========================================================================
    // Postfix forms
    // =========================================================================

    fn eval_postfix(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let op = tokens.last().unwrap().clone();
        match op.lexeme.as_str() {
            "..." => self.eval_variadic(&tokens[..tokens.len() - 1], &op),
            _ => {
                self.sink.error(&op, ErrorKey::InvalidSyntax);
                (Data::void(), ExprModel::empty())
            }
        }
    }

    fn eval_variadic(&mut self, tokens: &[Token], op: &Token) -> (Data, ExprModel) {
        let (mut v, model) = self.eval_expr_part(tokens);
        if !ty::is_variadicable(&v.kind) {
            self.sink.error_args(
                op,
                ErrorKey::VariadicWithNonvariadicable,
                vec![v.kind.lexeme.clone()],
            );
            return (Data::void(), ExprModel::empty());
        }
        v.kind = ty::element_type(&v.kind);
        v.variadiced = true;
        (v, ExprModel::Variadic(Box::new(model)))
    }

    fn eval_unsafe(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let mut inner = &tokens[1..];
        if inner.first().is_some_and(|t| t.is_brace("{"))
            && inner.last().is_some_and(|t| t.is_brace("}"))
        {
            inner = &inner[1..inner.len() - 1];
        }
        let saved = self.unsafety;
        self.unsafety = true;
        let (data, model) = self.eval_tokens(inner);
        self.unsafety = saved;
        (data, ExprModel::Unsafe(Box::new(model)))
    }

    // =========================================================================
    // Bracketed forms
    // =========================================================================

    fn eval_parentheses_range(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let Some(j) = range_start(tokens) else {
            self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        };
        let value_tokens = &tokens[..j];
        if value_tokens.is_empty() {
            let inner = &tokens[1..tokens.len() - 1];
            if inner.is_empty() {
                self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
                return (Data::void(), ExprModel::empty());
            }
            return self.eval_tokens(inner);
        }
        let (v, callee_model) = self.eval_expr_part(value_tokens);
        let sig = match (v.kind.code, v.kind.tag.as_deref()) {
            (TypeCode::Func, Some(TypeTag::Func(sig))) => sig.clone(),
            _ => {
                self.sink.error(&tokens[j], ErrorKey::InvalidSyntax);
                return (Data::void(), ExprModel::empty());
            }
        };
        let args = self.parse_fn_call(&sig, &tokens[j..], &tokens[j]);
        let data = Data {
            lvalue: ty::is_lvalue(&sig.ret),
            kind: sig.ret,
            token: v.token,
            ..Data::default()
        };
        let model = ExprModel::Call {
            callee: Box::new(callee_model),
            args,
        };
        (data, model)
    }

    fn parse_fn_call(&mut self, sig: &FnSig, tokens: &[Token], errtok: &Token) -> Vec<ExprModel> {
        let inner = range_tokens(tokens).unwrap_or(&[]);
        let parts = self.split_parts(inner);
        self.parse_args(sig, parts, errtok)
    }

    /// Positional argument checking with trailing-variadic absorption.
    fn parse_args(
        &mut self,
        sig: &FnSig,
        mut parts: Vec<Vec<Token>>,
        errtok: &Token,
    ) -> Vec<ExprModel> {
        let params = &sig.params;
        let mut models = Vec::with_capacity(parts.len());
        let variadic = params.last().is_some_and(|p| p.variadic);

        if variadic {
            if parts.is_empty() && params.len() == 1 {
                return models;
            }
            if parts.len() < params.len() - 1 {
                self.sink.error(errtok, ErrorKey::MissingArgument);
            } else if parts.len() > params.len() - 1 {
                let variadic_parts = parts.split_off(params.len() - 1);
                let param = params.last().unwrap().clone();
                for part in &parts {
                    models.push(self.parse_arg(sig, models.len(), part));
                }
                let mut variadiced = false;
                let mut elems = Vec::with_capacity(variadic_parts.len());
                for part in &variadic_parts {
                    let (value, model) = self.eval_tokens(part);
                    if value.variadiced {
                        variadiced = true;
                    }
                    self.push_arg_check(&param, value, part.first().unwrap_or(errtok));
                    elems.push(model);
                }
                if variadiced && variadic_parts.len() > 1 {
                    self.sink.error(errtok, ErrorKey::MoreArgsWithVaridiced);
                }
                models.push(ExprModel::SliceLit {
                    kind: format!("[]{}", param.kind.lexeme),
                    elems,
                });
                return models;
            }
        } else if parts.len() < params.len() {
            self.sink.error(errtok, ErrorKey::MissingArgument);
        } else if parts.len() > params.len() {
            self.sink.error(errtok, ErrorKey::ArgumentOverflow);
            return models;
        }

        for part in &parts {
            models.push(self.parse_arg(sig, models.len(), part));
        }
        models
    }

    fn parse_arg(&mut self, sig: &FnSig, index: usize, part: &[Token]) -> ExprModel {
        let (value, model) = self.eval_tokens(part);
        if let Some(param) = sig.params.get(index).cloned() {
            let token = part.first().cloned().unwrap_or_else(|| param.token.clone());
            self.push_arg_check(&param, value, &token);
        }
        model
    }

    fn push_arg_check(&mut self, param: &crate::frontend::ast::Param, value: Data, token: &Token) {
        self.pending.push(PendingCheck::assign(
            param.constant,
            param.kind.clone(),
            value,
            false,
            token.clone(),
        ));
    }

    fn eval_bracket_range(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let Some(j) = range_start(tokens) else {
            self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        };
        let expr_tokens = &tokens[..j];
        if expr_tokens.is_empty() {
            self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        }
        let (v, model) = self.eval_tokens(expr_tokens);
        let inner = &tokens[j + 1..tokens.len() - 1];
        if let Some(colon) = top_level_colon(inner) {
            return self.eval_slicing(v, model, inner, colon, &tokens[j]);
        }
        if inner.is_empty() {
            self.sink.error(&tokens[j], ErrorKey::MissingExpression);
            return (Data::void(), ExprModel::empty());
        }
        let (selectv, select_model) = self.eval_tokens(inner);
        let data = self.eval_enumerable_select(v, selectv, &inner[0]);
        let model = ExprModel::Index {
            expr: Box::new(model),
            index: Box::new(select_model),
        };
        (data, model)
    }

    fn eval_enumerable_select(&mut self, mut d: Data, selectv: Data, errtok: &Token) -> Data {
        let kind = d.kind.clone();
        if ty::is_pointer(&kind) {
            if kind.lexeme == "*any" {
                self.sink.error(errtok, ErrorKey::UnsafePtrIndexing);
                return d;
            }
            if !self.unsafety {
                self.sink
                    .error(errtok, ErrorKey::UnsafeBehaviorAtOutOfUnsafeScope);
            }
            self.check_integer_index(&selectv, errtok, ErrorKey::NotintArraySelect);
            d.kind.lexeme = kind.lexeme[1..].to_string();
            d.lvalue = true;
        } else if ty::is_array(&kind) {
            self.check_integer_index(&selectv, errtok, ErrorKey::NotintArraySelect);
            d.kind = ty::element_type(&kind);
            d.lvalue = true;
        } else if ty::is_map(&kind) {
            if let Some(TypeTag::Map { key, value }) = kind.tag.as_deref() {
                self.pending.push(PendingCheck::compat(
                    key.clone(),
                    selectv.kind.clone(),
                    false,
                    errtok.clone(),
                ));
                d.kind = value.clone();
            }
            d.lvalue = true;
        } else if ty::is_single(&kind) && kind.code == TypeCode::Str {
            self.check_integer_index(&selectv, errtok, ErrorKey::NotintStringSelect);
            d.kind = DataType::primitive(TypeCode::U8);
            d.lvalue = true;
            d.constant = d.constant && selectv.constant;
        } else {
            self.sink.error_args(
                errtok,
                ErrorKey::NotSupportsIndexing,
                vec![kind.lexeme.clone()],
            );
            return Data::void();
        }
        d
    }

    fn eval_slicing(
        &mut self,
        mut d: Data,
        model: ExprModel,
        inner: &[Token],
        colon: usize,
        errtok: &Token,
    ) -> (Data, ExprModel) {
        let kind = d.kind.clone();
        let str_target = ty::is_single(&kind) && kind.code == TypeCode::Str;
        let index_key = if str_target {
            ErrorKey::NotintStringSelect
        } else {
            ErrorKey::NotintArraySelect
        };
        let start_tokens = &inner[..colon];
        let to_tokens = &inner[colon + 1..];
        let start = if start_tokens.is_empty() {
            None
        } else {
            let (value, m) = self.eval_tokens(start_tokens);
            self.check_integer_index(&value, errtok, index_key);
            Some(Box::new(m))
        };
        let to = if to_tokens.is_empty() {
            None
        } else {
            let (value, m) = self.eval_tokens(to_tokens);
            self.check_integer_index(&value, errtok, index_key);
            Some(Box::new(m))
        };
        if !ty::is_array(&kind) && !str_target {
            self.sink.error_args(
                errtok,
                ErrorKey::NotSupportsSlicing,
                vec![kind.lexeme.clone()],
            );
            return (Data::void(), ExprModel::empty());
        }
        d.lvalue = false;
        let model = ExprModel::Slice {
            expr: Box::new(model),
            start,
            to,
        };
        (d, model)
    }

    fn check_integer_index(&mut self, d: &Data, errtok: &Token, key: ErrorKey) {
        if !ty::is_single(&d.kind) || !d.kind.code.is_integer() {
            self.sink.error(errtok, key);
        } else if d.constant && d.lexeme.starts_with('-') {
            self.sink.error(errtok, key);
        }
    }

    fn eval_brace_range(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let Some(j) = range_start(tokens) else {
            self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        };
        let expr_tokens = &tokens[..j];
        let inner = &tokens[j + 1..tokens.len() - 1];

        if expr_tokens.is_empty() {
            return self.eval_untyped_slice_lit(tokens, inner);
        }
        match expr_tokens[0].kind {
            TokenKind::Brace if expr_tokens[0].lexeme == "[" => {
                let mut index = 0;
                let Some(dt) = type_from_tokens(expr_tokens, &mut index) else {
                    self.sink.error(&expr_tokens[0], ErrorKey::InvalidSyntax);
                    return (Data::void(), ExprModel::empty());
                };
                if index + 1 < expr_tokens.len() {
                    self.sink.error(&expr_tokens[index + 1], ErrorKey::InvalidSyntax);
                }
                let parts = self.split_parts(inner);
                self.build_array(parts, dt, &tokens[j])
            }
            TokenKind::Name => self.eval_struct_lit(expr_tokens, inner, &tokens[j]),
            _ => {
                self.sink.error(&expr_tokens[0], ErrorKey::InvalidSyntax);
                (Data::void(), ExprModel::empty())
            }
        }
    }

    /// `{…}` with no type prefix: use the expected type when one is set,
    /// otherwise infer the element type from the first element.
    fn eval_untyped_slice_lit(&mut self, tokens: &[Token], inner: &[Token]) -> (Data, ExprModel) {
        let parts = self.split_parts(inner);
        if let Some(prefix) = self.eval_prefix.clone() {
            if ty::is_array(&prefix) {
                return self.build_array(parts, prefix, &tokens[0]);
            }
        }
        if parts.is_empty() {
            self.sink
                .error(&tokens[0], ErrorKey::DynamicTypeAnnotationFailed);
            return (Data::void(), ExprModel::empty());
        }
        let saved = self.eval_prefix.take();
        let (first, first_model) = self.eval_tokens(&parts[0]);
        let elem = first.kind.clone();
        let dt = DataType {
            code: elem.code,
            lexeme: format!("[]{}", elem.lexeme),
            tag: elem.tag.clone(),
            token: first.token.clone(),
            ..DataType::default()
        };
        let mut elems = vec![first_model];
        for part in parts.iter().skip(1) {
            let (value, model) = self.eval_tokens(part);
            self.pending.push(PendingCheck::assign(
                false,
                elem.clone(),
                value,
                false,
                part.first().cloned().unwrap_or_else(|| tokens[0].clone()),
            ));
            elems.push(model);
        }
        self.eval_prefix = saved;
        let data = Data {
            kind: dt.clone(),
            token: tokens[0].clone(),
            ..Data::default()
        };
        (data, ExprModel::SliceLit { kind: dt.lexeme, elems })
    }

    fn build_array(
        &mut self,
        parts: Vec<Vec<Token>>,
        t: DataType,
        errtok: &Token,
    ) -> (Data, ExprModel) {
        let elem = ty::element_type(&t);
        let saved = self.eval_prefix.replace(elem.clone());
        let mut elems = Vec::with_capacity(parts.len());
        for part in &parts {
            let (value, model) = self.eval_tokens(part);
            self.pending.push(PendingCheck::assign(
                false,
                elem.clone(),
                value,
                false,
                part.first().cloned().unwrap_or_else(|| errtok.clone()),
            ));
            elems.push(model);
        }
        self.eval_prefix = saved;
        let data = Data {
            kind: t.clone(),
            token: errtok.clone(),
            ..Data::default()
        };
        (data, ExprModel::SliceLit { kind: t.lexeme, elems })
    }

    fn eval_struct_lit(
        &mut self,
        expr_tokens: &[Token],
        inner: &[Token],
        errtok: &Token,
    ) -> (Data, ExprModel) {
        let mut index = 0;
        let Some(dt) = type_from_tokens(expr_tokens, &mut index) else {
            self.sink.error(&expr_tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        };
        let (resolved, ok) = ready_type(&self.table, dt, true, self.sink);
        if !ok {
            return (Data::void(), ExprModel::empty());
        }
        if resolved.code != TypeCode::Struct || !ty::is_single(&resolved) {
            self.sink.error(&expr_tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        }
        let decl = match resolved.tag.as_deref() {
            Some(TypeTag::Decl(ident)) => self.table.find_struct(ident).cloned(),
            _ => None,
        };
        let parts = self.split_parts(inner);
        let mut fields = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let (value, model) = self.eval_tokens(part);
            match decl.as_ref().and_then(|d| d.fields.get(i)) {
                Some(field) => self.pending.push(PendingCheck::assign(
                    false,
                    field.kind.clone(),
                    value,
                    false,
                    part.first().cloned().unwrap_or_else(|| errtok.clone()),
                )),
                None => self.sink.error(errtok, ErrorKey::ArgumentOverflow),
            }
            fields.push(model);
        }
        let data = Data {
            kind: resolved.clone(),
            token: expr_tokens[0].clone(),
            mutable: true,
            ..Data::default()
        };
        (
            data,
            ExprModel::StructLit {
                kind: resolved.lexeme,
                fields,
            },
        )
    }

    // =========================================================================
    // Casts and parenthesized assignment
    // =========================================================================

    fn eval_try_cast(&mut self, tokens: &[Token]) -> Option<(Data, ExprModel)> {
        let mut brace_count = 0i32;
        for (index, token) in tokens.iter().enumerate() {
            if token.kind == TokenKind::Brace {
                match token.lexeme.as_str() {
                    "(" | "[" | "{" => {
                        brace_count += 1;
                        continue;
                    }
                    _ => brace_count -= 1,
                }
            }
            if brace_count > 0 {
                continue;
            }
            let type_tokens = &tokens[1..index];
            let mut type_index = 0;
            let dt = type_from_tokens(type_tokens, &mut type_index)?;
            let (dt, ok) = ready_type(&self.table, dt, false, self.sink);
            if !ok || type_index + 1 < type_tokens.len() {
                return None;
            }
            if index + 1 >= tokens.len() {
                self.sink.error(token, ErrorKey::CastingMissingExpr);
                return Some((Data::void(), ExprModel::empty()));
            }
            let (value, model) = self.eval_expr_part(&tokens[index + 1..]);
            let value = self.eval_cast(value, dt.clone(), &tokens[0]);
            return Some((
                value,
                ExprModel::Cast {
                    kind: dt.lexeme,
                    expr: Box::new(model),
                },
            ));
        }
        None
    }

    fn eval_cast(&mut self, mut v: Data, t: DataType, errtok: &Token) -> Data {
        let (src, _) = ready_type(&self.table, v.kind.clone(), false, self.sink);
        if ty::is_pointer(&t) {
            self.check_cast_ptr(&src, errtok, &t);
        } else if ty::is_array(&t) {
            self.check_cast_array(&t, &src, errtok);
        } else if ty::is_single(&t) {
            self.check_cast_single(&t, &src, errtok);
        } else {
            self.push_cast_error(errtok, &t);
        }
        v.kind = t.clone();
        v.constant = false;
        v.lvalue = ty::is_lvalue(&t);
        v.mutable = ty::is_mut(&t);
        v
    }

    fn push_cast_error(&mut self, errtok: &Token, t: &DataType) {
        self.sink.error_args(
            errtok,
            ErrorKey::TypeNotsupportsCasting,
            vec![t.lexeme.clone()],
        );
    }

    fn check_cast_ptr(&mut self, src: &DataType, errtok: &Token, t: &DataType) {
        if ty::is_pointer(src) {
            return;
        }
        if ty::is_single(src) && src.code.is_integer() {
            if !self.unsafety {
                self.sink
                    .error(errtok, ErrorKey::UnsafeBehaviorAtOutOfUnsafeScope);
            }
            return;
        }
        self.push_cast_error(errtok, t);
    }

    fn check_cast_array(&mut self, t: &DataType, src: &DataType, errtok: &Token) {
        if !ty::is_single(src) || src.code != TypeCode::Str {
            self.push_cast_error(errtok, t);
            return;
        }
        let elem = ty::element_type(t);
        if !ty::is_single(&elem) || !matches!(elem.code, TypeCode::Rune | TypeCode::U8) {
            self.push_cast_error(errtok, t);
        }
    }

    fn check_cast_single(&mut self, t: &DataType, src: &DataType, errtok: &Token) {
        match t.code {
            TypeCode::Any => {}
            TypeCode::Str => self.check_cast_str(src, errtok, t),
            TypeCode::Struct => self.check_cast_struct(t, src, errtok),
            code if code.is_integer() || code == TypeCode::Rune => {
                self.check_cast_integer(src, errtok, t)
            }
            code if code.is_float() => self.check_cast_numeric(src, errtok, t),
            _ => self.push_cast_error(errtok, t),
        }
    }

    fn check_cast_str(&mut self, src: &DataType, errtok: &Token, t: &DataType) {
        if !ty::is_array(src) {
            self.push_cast_error(errtok, t);
            return;
        }
        let elem = ty::element_type(src);
        if !ty::is_single(&elem) || !matches!(elem.code, TypeCode::Rune | TypeCode::U8) {
            self.push_cast_error(errtok, t);
        }
    }

    fn check_cast_integer(&mut self, src: &DataType, errtok: &Token, t: &DataType) {
        if ty::is_pointer(src) {
            return;
        }
        if ty::is_single(src)
            && (src.code.is_numeric() || matches!(src.code, TypeCode::Rune | TypeCode::Enum))
        {
            return;
        }
        self.push_cast_error(errtok, t);
    }

    fn check_cast_numeric(&mut self, src: &DataType, errtok: &Token, t: &DataType) {
        if ty::is_single(src)
            && (src.code.is_numeric() || matches!(src.code, TypeCode::Rune | TypeCode::Enum))
        {
            return;
        }
        self.push_cast_error(errtok, t);
    }

    /// A struct cast accepts only a trait the struct implements.
    fn check_cast_struct(&mut self, t: &DataType, src: &DataType, errtok: &Token) {
        let trait_ident = match (src.code, src.tag.as_deref()) {
            (TypeCode::Trait, Some(TypeTag::Decl(ident))) => ident.clone(),
            _ => {
                self.push_cast_error(errtok, t);
                return;
            }
        };
        let implements = match t.tag.as_deref() {
            Some(TypeTag::Decl(ident)) => self
                .table
                .find_struct(ident)
                .is_some_and(|s| s.is_implements(&trait_ident)),
            _ => false,
        };
        if !implements {
            self.push_cast_error(errtok, t);
        }
    }

    /// `(lhs = rhs)` — assignment as expression. Delegates to the
    /// statement-level assignment checker, then reports the left-hand
    /// value.
    fn eval_try_assign(&mut self, tokens: &[Token]) -> Option<(Data, ExprModel)> {
        if tokens.len() < 4 || !tokens.last().is_some_and(|t| t.is_brace(")")) {
            return None;
        }
        let inner = &tokens[1..tokens.len() - 1];
        let eq = top_level_setter(inner)?;
        if eq == 0 {
            return None;
        }
        let mut setter = inner[eq].clone();
        let mut lhs_end = eq;
        if eq >= 2 {
            let prev = &inner[eq - 1];
            let compound = prev.kind == TokenKind::Operator
                && matches!(
                    prev.lexeme.as_str(),
                    "+" | "-" | "*" | "/" | "%" | "<<" | ">>" | "&" | "|" | "^"
                )
                && prev.row == setter.row
                && prev.column + prev.lexeme.len() as u32 == setter.column;
            if compound {
                setter.lexeme = format!("{}=", prev.lexeme);
                setter.column = prev.column;
                lhs_end = eq - 1;
            }
        }
        let lhs = &inner[..lhs_end];
        let rhs = &inner[eq + 1..];
        if rhs.is_empty() {
            self.sink.error(&setter, ErrorKey::MissingExpression);
            return Some((Data::void(), ExprModel::empty()));
        }
        let single_name = lhs.len() == 1 && lhs[0].kind == TokenKind::Name;
        let mut assign = crate::frontend::ast::Assign {
            setter: setter.clone(),
            selectors: vec![crate::frontend::ast::AssignSelector {
                var: crate::frontend::ast::VarDecl {
                    ident: if single_name {
                        lhs[0].lexeme.clone()
                    } else {
                        String::new()
                    },
                    ident_token: lhs[0].clone(),
                    ..Default::default()
                },
                expr: Expr::from_tokens(lhs.to_vec()),
                new_variable: false,
                ignore: single_name && is_ignore_ident(&lhs[0].lexeme),
            }],
            values: vec![Expr::from_tokens(rhs.to_vec())],
            just_declare: false,
            multiple_return: false,
        };
        self.check_assign(&mut assign);
        let (v, lhs_model) = self.eval_tokens(lhs);
        let rhs_model = assign.values[0].model.clone().unwrap_or_else(ExprModel::empty);
        Some((
            v,
            ExprModel::Binary {
                op: setter.lexeme,
                left: Box::new(lhs_model),
                right: Box::new(rhs_model),
            },
        ))
    }

    // =========================================================================
    // Namespace selection
    // =========================================================================

    fn eval_ns_selection(&mut self, tokens: &[Token]) -> (Data, ExprModel) {
        let mut idents: SmallVec<[&Token; 4]> = SmallVec::new();
        let mut expect_ident = true;
        for token in tokens {
            if expect_ident {
                if token.kind != TokenKind::Name {
                    self.sink.error(token, ErrorKey::InvalidSyntax);
                    return (Data::void(), ExprModel::empty());
                }
                idents.push(token);
            } else if !token.is_operator("::") {
                self.sink.error(token, ErrorKey::InvalidSyntax);
                return (Data::void(), ExprModel::empty());
            }
            expect_ident = !expect_ident;
        }
        if idents.len() < 2 || expect_ident {
            self.sink.error(&tokens[0], ErrorKey::InvalidSyntax);
            return (Data::void(), ExprModel::empty());
        }
        let ident = idents[idents.len() - 1].clone();
        let path: Vec<String> = idents[..idents.len() - 1]
            .iter()
            .map(|t| t.lexeme.clone())
            .collect();
        let link_path = path.join("::");
        let model = ExprModel::NsSelect {
            path: path.clone(),
            ident: safe_ident(&ident.lexeme),
        };
        let found = self
            .table
            .find_package_by_link_path(&link_path)
            .and_then(|pkg| {
                pkg.tables
                    .iter()
                    .find_map(|table| find_def(table, &ident.lexeme, true))
            });
        match found {
            Some(def) => (self.eval_def(def, &ident), model),
            None => {
                self.sink
                    .error_args(&ident, ErrorKey::IdNoexist, vec![ident.lexeme.clone()]);
                (Data::void(), model)
            }
        }
    }

    // =========================================================================
    // Token-run helpers
    // =========================================================================

    /// Split a token run at top-level commas. Empty parts report
    /// `missing_expression` and are dropped.
    pub(crate) fn split_parts(&mut self, tokens: &[Token]) -> Vec<Vec<Token>> {
        let mut parts = Vec::new();
        let mut depth = 0i32;
        let mut last = 0usize;
        for (index, token) in tokens.iter().enumerate() {
            if token.kind == TokenKind::Brace {
                match token.lexeme.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    _ => depth -= 1,
                }
            }
            if depth > 0 || token.kind != TokenKind::Comma {
                continue;
            }
            if index == last {
                self.sink.error(token, ErrorKey::MissingExpression);
                last = index + 1;
                continue;
            }
            parts.push(tokens[last..index].to_vec());
            last = index + 1;
        }
        if last < tokens.len() {
            parts.push(tokens[last..].to_vec());
        }
        parts
    }
}

/// Index of the opening brace that starts the final bracketed range, i.e.
/// the length of the prefix before it.
fn range_start(tokens: &[Token]) -> Option<usize> {
    let mut brace_count = 0i32;
    for j in (0..tokens.len()).rev() {
        let token = &tokens[j];
        if token.kind != TokenKind::Brace {
            continue;
        }
        match token.lexeme.as_str() {
            ")" | "}" | "]" => brace_count += 1,
            _ => brace_count -= 1,
        }
        if brace_count > 0 {
            continue;
        }
        return Some(j);
    }
    None
}

/// Tokens between the leading open brace and its match.
fn range_tokens(tokens: &[Token]) -> Option<&[Token]> {
    if tokens.first()?.kind != TokenKind::Brace {
        return None;
    }
    let open = tokens[0].lexeme.as_str();
    let close = match open {
        "(" => ")",
        "[" => "]",
        "{" => "}",
        _ => return None,
    };
    let mut brace_count = 0i32;
    for (index, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Brace {
            continue;
        }
        if token.lexeme == open {
            brace_count += 1;
        } else if token.lexeme == close {
            brace_count -= 1;
        }
        if brace_count > 0 {
            continue;
        }
        return Some(&tokens[1..index]);
    }
    None
}

fn has_top_level_operator(tokens: &[Token], lexeme: &str) -> bool {
    let mut depth = 0i32;
    for token in tokens {
        if token.kind == TokenKind::Brace {
            match token.lexeme.as_str() {
                "(" | "[" | "{" => depth += 1,
                _ => depth -= 1,
            }
        }
        if depth == 0 && token.is_operator(lexeme) {
            return true;
        }
    }
    false
}

fn top_level_colon(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0i32;
    for (index, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Brace {
            match token.lexeme.as_str() {
                "(" | "[" | "{" => depth += 1,
                _ => depth -= 1,
            }
        }
        if depth == 0 && token.kind == TokenKind::Colon {
            return Some(index);
        }
    }
    None
}

fn top_level_setter(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0i32;
    for (index, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Brace {
            match token.lexeme.as_str() {
                "(" | "[" | "{" => depth += 1,
                _ => depth -= 1,
            }
        }
        if depth == 0 && token.is_operator("=") {
            return Some(index);
        }
    }
    None
}

fn next_operator(items: &[ProcessItem]) -> Option<usize> {
    let mut best: Option<(u8, usize)> = None;
    for (index, item) in items.iter().enumerate() {
        let ProcessItem::Operator(op) = item else {
            continue;
        };
        let level = precedence(&op.lexeme);
        match best {
            Some((best_level, _)) if best_level >= level => {}
            _ => best = Some((level, index)),
        }
    }
    best.map(|(_, index)| index)
}

/// Byte-literal forms of a rune literal: a single-byte character, `\xHH`,
/// or octal `\NNN`.
fn is_byte_lit(lexeme: &str) -> bool {
    if lexeme.len() < 3 {
        return false;
    }
    let inner = &lexeme[1..lexeme.len() - 1];
    let bytes = inner.as_bytes();
    inner.len() == 1
        || (bytes[0] == b'\\' && bytes.get(1) == Some(&b'x'))
        || (bytes[0] == b'\\' && bytes.get(1).is_some_and(|b| (b'0'..=b'7').contains(b)))
}

/// Integer literals take the smallest fitting width among I32 and I64,
/// falling back to U64; floats are F64.
fn numeric_literal_kind(lexeme: &str) -> DataType {
    let is_float = !lexeme.starts_with("0x")
        && (lexeme.contains('.') || lexeme.contains('e') || lexeme.contains('E'));
    if is_float {
        return DataType::primitive(TypeCode::F64);
    }
    if check_bit_int(lexeme, 32) {
        DataType::primitive(TypeCode::I32)
    } else if check_bit_int(lexeme, 64) {
        DataType::primitive(TypeCode::I64)
    } else {
        DataType::primitive(TypeCode::U64)
    }
}
