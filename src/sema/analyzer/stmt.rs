// src/sema/analyzer/stmt.rs
//
// Statement and block checking. The walk is an ordinary imperative pass;
// only the compatibility checks it queues run concurrently later.

use crate::errors::ErrorKey;
use crate::frontend::ast::{
    Assign, Block, DataType, ExprModel, FnDecl, ForeachProfile, Iter, IterProfile, Ret, StmtKind,
    TypeCode, TypeTag, VarDecl,
};
use crate::frontend::{is_ignore_ident, Token, TokenKind};
use crate::sema::defs::Var;
use crate::sema::resolve::{check_validity_for_auto_type, default_value_of_type, ready_type};
use crate::sema::ty;
use crate::sema::value::Data;

use super::assign::{check_assign_const, PendingCheck};
use super::solver::Solver;
use super::Analyzer;

impl Analyzer<'_> {
    pub(crate) fn check_fn(&mut self, decl: &mut FnDecl) {
        self.check_block(&mut decl.block);
        self.check_rets(decl);
    }

    /// Walk a block linearly. Variables declared inside go out of scope at
    /// the end.
    pub(crate) fn check_block(&mut self, block: &mut Block) {
        let saved_vars = self.block_vars.len();
        let mut index = 0;
        while index < block.stmts.len() {
            match &mut block.stmts[index].kind {
                StmtKind::Expr(expr) => {
                    let (_, model) = self.eval_expr(&expr.clone());
                    expr.model = Some(model);
                }
                StmtKind::Var(var) => {
                    let mut var = std::mem::take(var);
                    self.check_var_stmt(&mut var, false);
                    block.stmts[index].kind = StmtKind::Var(var);
                }
                StmtKind::Assign(assign) => {
                    let mut assign = std::mem::take(assign);
                    self.check_assign(&mut assign);
                    block.stmts[index].kind = StmtKind::Assign(assign);
                }
                StmtKind::Free(free) => {
                    let expr = free.expr.clone();
                    let (val, model) = self.eval_expr(&expr);
                    if !ty::is_pointer(&val.kind) {
                        let token = block.stmts[index].token.clone();
                        self.sink.error(&token, ErrorKey::FreeNonpointer);
                    }
                    if let StmtKind::Free(free) = &mut block.stmts[index].kind {
                        free.expr.model = Some(model);
                    }
                }
                StmtKind::Iter(_) => {
                    let StmtKind::Iter(mut iter) =
                        std::mem::replace(&mut block.stmts[index].kind, StmtKind::Break)
                    else {
                        unreachable!()
                    };
                    self.check_iter(&mut iter);
                    block.stmts[index].kind = StmtKind::Iter(iter);
                }
                StmtKind::Break => {
                    if self.iter_depth == 0 {
                        let token = block.stmts[index].token.clone();
                        self.sink.error(&token, ErrorKey::BreakAtOutiter);
                    }
                }
                StmtKind::Continue => {
                    if self.iter_depth == 0 {
                        let token = block.stmts[index].token.clone();
                        self.sink.error(&token, ErrorKey::ContinueAtOutiter);
                    }
                }
                StmtKind::If(_) => self.check_if_chain(block, &mut index),
                StmtKind::Ret(_) => {}
                StmtKind::ElseIf(_) | StmtKind::Else(_) => {
                    let token = block.stmts[index].token.clone();
                    self.sink.error(&token, ErrorKey::InvalidSyntax);
                }
            }
            index += 1;
        }
        self.block_vars.truncate(saved_vars);
    }

    /// Check an `if` and the `else if`/`else` statements chained behind it.
    fn check_if_chain(&mut self, block: &mut Block, index: &mut usize) {
        let StmtKind::If(mut ifst) =
            std::mem::replace(&mut block.stmts[*index].kind, StmtKind::Break)
        else {
            unreachable!()
        };
        let (val, model) = self.eval_expr(&ifst.expr);
        ifst.expr.model = Some(model);
        if val.kind.code != TypeCode::Bool {
            self.sink.error(&ifst.token, ErrorKey::IfNotboolExpr);
        }
        self.check_block(&mut ifst.block);
        let terminated = block.stmts[*index].with_terminator;
        block.stmts[*index].kind = StmtKind::If(ifst);
        if terminated {
            return;
        }
        loop {
            if *index + 1 >= block.stmts.len() {
                return;
            }
            match &block.stmts[*index + 1].kind {
                StmtKind::ElseIf(_) => {
                    *index += 1;
                    let StmtKind::ElseIf(mut elif) =
                        std::mem::replace(&mut block.stmts[*index].kind, StmtKind::Break)
                    else {
                        unreachable!()
                    };
                    let (val, model) = self.eval_expr(&elif.expr);
                    elif.expr.model = Some(model);
                    if val.kind.code != TypeCode::Bool {
                        self.sink.error(&elif.token, ErrorKey::IfNotboolExpr);
                    }
                    self.check_block(&mut elif.block);
                    let terminated = block.stmts[*index].with_terminator;
                    block.stmts[*index].kind = StmtKind::ElseIf(elif);
                    if terminated {
                        return;
                    }
                }
                StmtKind::Else(_) => {
                    *index += 1;
                    let StmtKind::Else(mut els) =
                        std::mem::replace(&mut block.stmts[*index].kind, StmtKind::Break)
                    else {
                        unreachable!()
                    };
                    self.check_block(&mut els.block);
                    block.stmts[*index].kind = StmtKind::Else(els);
                    return;
                }
                _ => return,
            }
        }
    }

    // =========================================================================
    // Variable declarations
    // =========================================================================

    pub(crate) fn check_var_stmt(&mut self, var: &mut VarDecl, no_parse: bool) {
        if !is_ignore_ident(&var.ident) && self.exist_ident_except_globals(&var.ident) {
            self.sink.error(&var.ident_token, ErrorKey::ExistId);
        }
        if !no_parse {
            self.parse_var(var);
        }
        self.block_vars.push(Var::from_decl(var));
    }

    pub(crate) fn parse_var(&mut self, var: &mut VarDecl) {
        self.parse_var_valued(var, None);
    }

    /// Check one declaration. `value` carries the pre-evaluated data for
    /// multi-return unpacking; otherwise the initializer is evaluated here.
    pub(crate) fn parse_var_valued(&mut self, var: &mut VarDecl, value: Option<Data>) {
        if var.ident == "_" && value.is_none() {
            // Bare `_` never binds storage; prefixed ignore idents may.
            self.sink.error(&var.ident_token, ErrorKey::IgnoreId);
        }
        let explicit = var.kind.code != TypeCode::Void;
        let mut val = value;
        if val.is_none() && var.has_initializer() {
            if explicit {
                self.eval_prefix = Some(var.kind.clone());
            }
            let (evaluated, model) = self.eval_expr(&var.value.clone());
            self.eval_prefix = None;
            var.value.model = Some(model);
            val = Some(evaluated);
        }
        if explicit {
            match val {
                Some(val) => self.pending.push(PendingCheck::assign(
                    var.constant,
                    var.kind.clone(),
                    val,
                    false,
                    var.ident_token.clone(),
                )),
                None => {
                    let (resolved, ok) =
                        ready_type(&self.table, var.kind.clone(), true, self.sink);
                    if ok {
                        let default = default_value_of_type(&resolved);
                        var.value.model = Some(ExprModel::Literal(default.to_string()));
                    }
                }
            }
        } else {
            match &val {
                None => {
                    self.sink
                        .error(&var.ident_token, ErrorKey::MissingAutotypeValue);
                }
                Some(val) => {
                    var.kind = val.kind.clone();
                    check_validity_for_auto_type(&var.kind, &var.setter, self.sink);
                    check_assign_const(var.constant, &var.kind, val, &var.setter, self.sink);
                }
            }
        }
        if var.constant && !var.has_initializer() {
            self.sink.error(&var.ident_token, ErrorKey::MissingConstValue);
        }
    }

    fn exist_ident_except_globals(&self, ident: &str) -> bool {
        if self.block_vars.iter().any(|v| v.ident == ident) {
            return true;
        }
        match self.table.exist_ident(ident) {
            Some(_) => self.table.find_global(ident).is_none(),
            None => false,
        }
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    /// The left side must denote assignable storage: an lvalue that is not
    /// a constant and not a plain function name.
    fn check_assignment_target(&mut self, selected: &Data, errtok: &Token) -> bool {
        let mut state = true;
        if selected.constant {
            self.sink.error(errtok, ErrorKey::AssignConst);
            state = false;
        } else if !selected.lvalue {
            self.sink.error(errtok, ErrorKey::AssignNonlvalue);
            state = false;
        }
        if selected.kind.code == TypeCode::Func
            && self.table.find_fn(&selected.token.lexeme).is_some()
        {
            self.sink
                .error(errtok, ErrorKey::AssignTypeNotSupportValue);
            state = false;
        }
        state
    }

    pub(crate) fn check_assign(&mut self, assign: &mut Assign) {
        if assign.just_declare {
            for selector in &mut assign.selectors {
                let mut var = std::mem::take(&mut selector.var);
                self.check_var_stmt(&mut var, false);
                selector.var = var;
            }
            return;
        }
        if assign.selectors.len() == 1 && !assign.selectors[0].new_variable {
            self.check_single_assign(assign);
            return;
        }
        if assign.setter.lexeme != "=" {
            self.sink.error(&assign.setter, ErrorKey::InvalidSyntax);
            return;
        }
        if assign.values.len() == 1 {
            let (first, model) = self.eval_expr(&assign.values[0]);
            assign.values[0].model = Some(model);
            if first.kind.multi_typed {
                assign.multiple_return = true;
                self.process_fn_multi_assign(assign, first);
                return;
            }
        }
        if assign.selectors.len() > assign.values.len() {
            self.sink
                .error(&assign.setter, ErrorKey::OverflowMultiassignIdentifiers);
            return;
        }
        if assign.selectors.len() < assign.values.len() {
            self.sink
                .error(&assign.setter, ErrorKey::MissingMultiassignIdentifiers);
            return;
        }
        let values: Vec<Data> = (0..assign.values.len())
            .map(|i| {
                let (val, model) = self.eval_expr(&assign.values[i].clone());
                assign.values[i].model = Some(model);
                val
            })
            .collect();
        self.process_multi_assign(assign, values);
    }

    fn check_single_assign(&mut self, assign: &mut Assign) {
        let selector_expr = assign.selectors[0].expr.clone();
        if selector_expr.tokens.len() == 1
            && selector_expr.tokens[0].kind == TokenKind::Name
            && is_ignore_ident(&selector_expr.tokens[0].lexeme)
        {
            return;
        }
        let (selected, _) = self.eval_expr(&selector_expr);
        if !self.check_assignment_target(&selected, &assign.setter.clone()) {
            return;
        }
        let (mut val, model) = self.eval_expr(&assign.values[0]);
        assign.values[0].model = Some(model);
        if assign.setter.lexeme != "=" {
            // `lhs op= rhs` checks as `lhs = lhs op rhs`.
            let mut op = assign.setter.clone();
            op.lexeme = op.lexeme[..op.lexeme.len() - 1].to_string();
            let solver = Solver {
                left: selected.clone(),
                right: val,
                operator: op,
            };
            val = solver.solve(self.sink);
        }
        self.pending.push(PendingCheck::assign(
            selected.constant,
            selected.kind,
            val,
            false,
            assign.setter.clone(),
        ));
    }

    /// `a, b, … = call()` where the callee is multi-typed.
    fn process_fn_multi_assign(&mut self, assign: &mut Assign, value: Data) {
        let Some(TypeTag::Multi(types)) = value.kind.tag.as_deref() else {
            self.sink
                .error(&assign.setter, ErrorKey::MissingMultiassignIdentifiers);
            return;
        };
        if types.len() != assign.selectors.len() {
            self.sink
                .error(&assign.setter, ErrorKey::MissingMultiassignIdentifiers);
            return;
        }
        let values: Vec<Data> = types
            .iter()
            .map(|t| Data {
                kind: t.clone(),
                token: t.token.clone(),
                ..Data::default()
            })
            .collect();
        self.process_multi_assign(assign, values);
    }

    fn process_multi_assign(&mut self, assign: &mut Assign, values: Vec<Data>) {
        let setter = assign.setter.clone();
        for (index, selector) in assign.selectors.iter_mut().enumerate() {
            selector.ignore = is_ignore_ident(&selector.var.ident);
            let value = values[index].clone();
            if !selector.new_variable {
                if selector.ignore {
                    continue;
                }
                let expr = selector.expr.clone();
                let (selected, _) = self.eval_expr(&expr);
                if !self.check_assignment_target(&selected, &setter) {
                    return;
                }
                self.pending.push(PendingCheck::assign(
                    selected.constant,
                    selected.kind,
                    value,
                    false,
                    setter.clone(),
                ));
                continue;
            }
            if selector.ignore {
                continue;
            }
            let mut var = std::mem::take(&mut selector.var);
            if var.setter.kind == TokenKind::Na {
                var.setter = setter.clone();
            }
            if !is_ignore_ident(&var.ident) && self.exist_ident_except_globals(&var.ident) {
                self.sink.error(&var.ident_token, ErrorKey::ExistId);
            }
            self.parse_var_valued(&mut var, Some(value));
            self.block_vars.push(Var::from_decl(&var));
            selector.var = var;
        }
    }

    // =========================================================================
    // Iterations
    // =========================================================================

    fn check_iter(&mut self, iter: &mut Iter) {
        self.iter_depth += 1;
        match &mut iter.profile {
            None => self.check_block(&mut iter.block),
            Some(IterProfile::While(profile)) => {
                let (val, model) = self.eval_expr(&profile.expr);
                profile.expr.model = Some(model);
                if val.kind.code != TypeCode::Bool {
                    self.sink.error(&iter.token, ErrorKey::IterWhileNotboolExpr);
                }
                self.check_block(&mut iter.block);
            }
            Some(IterProfile::Foreach(_)) => self.check_foreach(iter),
        }
        self.iter_depth -= 1;
    }

    fn check_foreach(&mut self, iter: &mut Iter) {
        let Some(IterProfile::Foreach(profile)) = &mut iter.profile else {
            return;
        };
        let mut profile = std::mem::replace(
            profile,
            Box::new(ForeachProfile {
                key_a: VarDecl::default(),
                key_b: VarDecl::default(),
                in_token: Token::na(),
                expr: crate::frontend::ast::Expr::empty(),
                expr_type: DataType::void(),
            }),
        );
        let (val, model) = self.eval_expr(&profile.expr);
        profile.expr.model = Some(model);
        profile.expr_type = val.kind.clone();
        if !ty::is_enumerable(&val.kind) {
            self.sink
                .error(&iter.token, ErrorKey::IterForeachNonenumerableExpr);
        } else {
            self.check_foreach_keys(&mut profile);
        }

        let saved_vars = self.block_vars.len();
        if profile.key_a.new_variable && !is_ignore_ident(&profile.key_a.ident) {
            let mut key = std::mem::take(&mut profile.key_a);
            self.check_var_stmt(&mut key, true);
            profile.key_a = key;
        }
        if profile.key_b.new_variable && !is_ignore_ident(&profile.key_b.ident) {
            let mut key = std::mem::take(&mut profile.key_b);
            self.check_var_stmt(&mut key, true);
            profile.key_b = key;
        }
        self.check_block(&mut iter.block);
        self.block_vars.truncate(saved_vars);

        if let Some(IterProfile::Foreach(slot)) = &mut iter.profile {
            **slot = *profile;
        }
    }

    /// The index key auto-types to the size type; the element key to the
    /// element type (rune for strings). Declared key types are verified.
    fn check_foreach_keys(&mut self, profile: &mut ForeachProfile) {
        let expr_type = profile.expr_type.clone();
        if !is_ignore_ident(&profile.key_a.ident) {
            if profile.key_a.kind.code == TypeCode::Void {
                profile.key_a.kind = DataType::primitive(TypeCode::U64);
            } else {
                let (kind, ok) =
                    ready_type(&self.table, profile.key_a.kind.clone(), true, self.sink);
                if ok {
                    if !ty::is_single(&kind) || !kind.code.is_numeric() {
                        self.sink
                            .error(&profile.key_a.ident_token, ErrorKey::IncompatibleDatatype);
                    }
                    profile.key_a.kind = kind;
                }
            }
        }
        if !is_ignore_ident(&profile.key_b.ident) {
            let elem = if ty::is_array(&expr_type) {
                ty::element_type(&expr_type)
            } else {
                DataType::primitive(TypeCode::Rune)
            };
            if profile.key_b.kind.code == TypeCode::Void && profile.key_b.kind.lexeme.is_empty() {
                profile.key_b.kind = elem;
            } else {
                self.pending.push(PendingCheck::compat(
                    elem,
                    profile.key_b.kind.clone(),
                    true,
                    profile.in_token.clone(),
                ));
            }
        }
    }

    // =========================================================================
    // Returns
    // =========================================================================

    /// A function with a non-void return type must contain at least one
    /// `ret` in its top-level block.
    fn check_rets(&mut self, decl: &mut FnDecl) {
        let ret_type = decl.ret.clone();
        let fn_token = decl.token.clone();
        let mut missed = true;
        for stmt in &mut decl.block.stmts {
            if let StmtKind::Ret(ret) = &mut stmt.kind {
                let mut ret = std::mem::replace(
                    ret,
                    Ret {
                        token: Token::na(),
                        expr: crate::frontend::ast::Expr::empty(),
                        models: Vec::new(),
                    },
                );
                self.check_ret(&ret_type, &mut ret);
                stmt.kind = StmtKind::Ret(ret);
                missed = false;
            }
        }
        if missed && !ty::is_void_ret(&ret_type) {
            self.sink.error(&fn_token, ErrorKey::MissingReturn);
        }
    }

    fn check_ret(&mut self, ret_type: &DataType, ret: &mut Ret) {
        if ret.expr.tokens.is_empty() {
            if !ty::is_void_ret(ret_type) {
                self.sink.error(&ret.token, ErrorKey::RequireReturnValue);
            }
            return;
        }
        if ty::is_void_ret(ret_type) {
            self.sink
                .error(&ret.token, ErrorKey::VoidFunctionReturnValue);
        }
        let tokens = ret.expr.tokens.clone();
        let parts = self.split_parts(&tokens);
        let mut values = Vec::with_capacity(parts.len());
        for part in &parts {
            if part.is_empty() {
                self.sink.error(&ret.token, ErrorKey::MissingExpression);
                continue;
            }
            let (value, model) = self.eval_tokens(part);
            values.push(value);
            ret.models.push(model);
        }
        if ty::is_void_ret(ret_type) || values.is_empty() {
            return;
        }
        if !ret_type.multi_typed {
            if values.len() > 1 {
                self.sink.error(&ret.token, ErrorKey::OverflowReturn);
            }
            self.pending.push(PendingCheck::assign(
                false,
                ret_type.clone(),
                values.remove(0),
                true,
                ret.token.clone(),
            ));
            return;
        }
        let Some(TypeTag::Multi(types)) = ret_type.tag.as_deref() else {
            return;
        };
        if values.len() == 1 {
            self.sink.error(&ret.token, ErrorKey::MissingMultiReturn);
        } else if values.len() > types.len() {
            self.sink.error(&ret.token, ErrorKey::OverflowReturn);
        }
        for (index, t) in types.iter().enumerate() {
            if index >= values.len() {
                break;
            }
            self.pending.push(PendingCheck::assign(
                false,
                t.clone(),
                values[index].clone(),
                true,
                ret.token.clone(),
            ));
        }
    }
}
