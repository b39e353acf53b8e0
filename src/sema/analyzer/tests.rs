use super::*;
use crate::errors::{Diagnostic, Severity};
use crate::frontend::ast::{
    type_from_tokens, Assign, AssignSelector, Block, Else, ElseIf, Expr, FieldDecl,
    ForeachProfile, Free, If, Iter, IterProfile, Param, Ret, Stmt, StmtKind, StructDecl,
    TraitDecl,
};
use crate::frontend::{Lexer, SourceFile, TokenKind};

fn toks(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source, SourceFile::new("test.st"));
    let tokens = lexer.tokenize();
    assert!(!lexer.has_errors(), "lex errors in {source:?}");
    tokens
}

fn tok(source: &str) -> Token {
    toks(source).remove(0)
}

fn op(lexeme: &str) -> Token {
    Token {
        kind: TokenKind::Operator,
        lexeme: lexeme.to_string(),
        row: 1,
        column: 1,
        file: SourceFile::new("test.st"),
    }
}

fn expr(source: &str) -> Expr {
    Expr::from_tokens(toks(source))
}

fn ty(source: &str) -> DataType {
    let tokens = toks(source);
    let mut index = 0;
    type_from_tokens(&tokens, &mut index).expect("type tokens")
}

fn stmt(kind: StmtKind) -> Stmt {
    Stmt::new(tok(";"), kind)
}

fn var_decl(ident: &str, kind: Option<DataType>, init: Option<&str>) -> VarDecl {
    let ident_token = tok(ident);
    VarDecl {
        token: ident_token.clone(),
        ident_token,
        ident: ident.to_string(),
        constant: false,
        public: false,
        kind: kind.unwrap_or_default(),
        setter: init.map(|_| op("=")).unwrap_or_default(),
        value: init.map(expr).unwrap_or_default(),
        doc: String::new(),
        new_variable: false,
    }
}

fn const_decl(ident: &str, kind: Option<DataType>, init: Option<&str>) -> VarDecl {
    let mut decl = var_decl(ident, kind, init);
    decl.constant = true;
    decl
}

fn stmt_var(ident: &str, kind: Option<DataType>, init: Option<&str>) -> Stmt {
    stmt(StmtKind::Var(var_decl(ident, kind, init)))
}

fn stmt_expr(source: &str) -> Stmt {
    stmt(StmtKind::Expr(expr(source)))
}

fn stmt_assign(lhs: &str, setter: &str, rhs: &str) -> Stmt {
    stmt(StmtKind::Assign(Assign {
        setter: op(setter),
        selectors: vec![AssignSelector {
            var: var_decl(lhs, None, None),
            expr: expr(lhs),
            new_variable: false,
            ignore: false,
        }],
        values: vec![expr(rhs)],
        just_declare: false,
        multiple_return: false,
    }))
}

fn stmt_multi_assign(selectors: Vec<(&str, bool)>, values: Vec<&str>) -> Stmt {
    stmt(StmtKind::Assign(Assign {
        setter: op("="),
        selectors: selectors
            .into_iter()
            .map(|(ident, new_variable)| AssignSelector {
                var: {
                    let mut var = var_decl(ident, None, None);
                    var.new_variable = new_variable;
                    var
                },
                expr: expr(ident),
                new_variable,
                ignore: false,
            })
            .collect(),
        values: values.into_iter().map(expr).collect(),
        just_declare: false,
        multiple_return: false,
    }))
}

fn stmt_ret(source: Option<&str>) -> Stmt {
    stmt(StmtKind::Ret(Ret {
        token: tok("ret"),
        expr: source.map(expr).unwrap_or_default(),
        models: Vec::new(),
    }))
}

fn stmt_while(cond: &str, stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Iter(Iter {
        token: tok("x"),
        profile: Some(IterProfile::While(crate::frontend::ast::WhileProfile {
            expr: expr(cond),
        })),
        block: Block { stmts },
    }))
}

fn foreach_key(ident: &str, kind: Option<DataType>) -> VarDecl {
    let mut key = var_decl(ident, kind, None);
    key.new_variable = true;
    key
}

fn stmt_foreach(key_a: VarDecl, key_b: VarDecl, over: &str, stmts: Vec<Stmt>) -> Stmt {
    stmt(StmtKind::Iter(Iter {
        token: tok("x"),
        profile: Some(IterProfile::Foreach(Box::new(ForeachProfile {
            key_a,
            key_b,
            in_token: tok("x"),
            expr: expr(over),
            expr_type: DataType::void(),
        }))),
        block: Block { stmts },
    }))
}

fn param(ident: &str, kind: DataType) -> Param {
    Param {
        token: tok(ident),
        ident: ident.to_string(),
        constant: false,
        variadic: false,
        kind,
    }
}

fn fn_item(ident: &str, params: Vec<Param>, ret: DataType, stmts: Vec<Stmt>) -> Item {
    Item::Fn(FnDecl {
        token: tok(ident),
        ident: ident.to_string(),
        public: false,
        params,
        ret,
        block: Block { stmts },
        attributes: Vec::new(),
        doc: String::new(),
    })
}

fn check_items(items: Vec<Item>) -> Vec<Diagnostic> {
    let sink = DiagnosticSink::new();
    let options = SemaOptions {
        executable: false,
        ..SemaOptions::default()
    };
    let mut analyzer = Analyzer::new(options, &sink);
    let mut program = Program {
        use_decls: Vec::new(),
        items,
    };
    analyzer.analyze(&mut program);
    sink.take()
}

fn check_executable(items: Vec<Item>) -> Vec<Diagnostic> {
    let sink = DiagnosticSink::new();
    let mut analyzer = Analyzer::new(SemaOptions::default(), &sink);
    let mut program = Program {
        use_decls: Vec::new(),
        items,
    };
    analyzer.analyze(&mut program);
    sink.take()
}

fn check_body(stmts: Vec<Stmt>) -> Vec<Diagnostic> {
    check_items(vec![fn_item("f", Vec::new(), DataType::void(), stmts)])
}

fn keys_of(diagnostics: &[Diagnostic]) -> Vec<ErrorKey> {
    diagnostics.iter().map(|d| d.key).collect()
}

fn assert_key(diagnostics: &[Diagnostic], key: ErrorKey) {
    assert!(
        diagnostics.iter().any(|d| d.key == key),
        "expected {key}, got {:?}",
        keys_of(diagnostics)
    );
}

fn assert_clean(diagnostics: &[Diagnostic]) {
    assert!(
        diagnostics.is_empty(),
        "expected no diagnostics, got {:?}",
        keys_of(diagnostics)
    );
}

// =============================================================================
// Variable declarations
// =============================================================================

#[test]
fn float_literal_into_int_annotation() {
    let diagnostics = check_body(vec![stmt_var("x", Some(ty("int32")), Some("3.14"))]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn int_literal_fits_annotation() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("5")),
        stmt_var("y", Some(ty("int8")), Some("127")),
        stmt_var("z", Some(ty("uint16")), Some("65535")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn int_literal_overflow_annotation() {
    let diagnostics = check_body(vec![stmt_var("x", Some(ty("int8")), Some("128"))]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn autotype_infers_initializer_kind() {
    let diagnostics = check_body(vec![
        stmt_var("x", None, Some("5")),
        stmt_var("y", Some(ty("int32")), Some("x")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn nil_for_autotype() {
    let diagnostics = check_body(vec![stmt_var("x", None, Some("nil"))]);
    assert_key(&diagnostics, ErrorKey::NilForAutotype);
}

#[test]
fn missing_autotype_value() {
    let diagnostics = check_body(vec![stmt_var("x", None, None)]);
    assert_key(&diagnostics, ErrorKey::MissingAutotypeValue);
}

#[test]
fn const_requires_initializer() {
    let diagnostics = check_body(vec![stmt(StmtKind::Var(const_decl(
        "x",
        Some(ty("int32")),
        None,
    )))]);
    assert_key(&diagnostics, ErrorKey::MissingConstValue);
}

#[test]
fn duplicate_block_var() {
    let diagnostics = check_body(vec![
        stmt_var("x", None, Some("1")),
        stmt_var("x", None, Some("2")),
    ]);
    assert_key(&diagnostics, ErrorKey::ExistId);
}

#[test]
fn bare_ignore_var_rejected() {
    let diagnostics = check_body(vec![stmt_var("_", None, Some("5"))]);
    assert_key(&diagnostics, ErrorKey::IgnoreId);
}

#[test]
fn default_value_for_annotated_var() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), None),
        stmt_var("n", Some(ty("int32")), None),
        stmt_var("s", Some(ty("str")), None),
    ]);
    assert_clean(&diagnostics);
}

// =============================================================================
// Assignments
// =============================================================================

#[test]
fn assign_to_const() {
    let diagnostics = check_body(vec![
        stmt(StmtKind::Var(const_decl("x", None, Some("5")))),
        stmt_assign("x", "=", "6"),
    ]);
    assert_key(&diagnostics, ErrorKey::AssignConst);
}

#[test]
fn assign_to_nonlvalue() {
    let diagnostics = check_body(vec![stmt_assign("5", "=", "6")]);
    assert_key(&diagnostics, ErrorKey::AssignNonlvalue);
}

#[test]
fn assign_to_function_name() {
    let diagnostics = check_items(vec![
        fn_item("g", Vec::new(), DataType::void(), Vec::new()),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_assign("g", "=", "5")],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::AssignTypeNotSupportValue);
}

#[test]
fn compound_assign_solves_through_operator() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_assign("x", "+=", "2"),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn compound_assign_type_error() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_assign("x", "+=", "\"s\""),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn assign_incompatible_value() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_assign("x", "=", "\"s\""),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn ignore_selector_discards() {
    let diagnostics = check_body(vec![stmt_assign("_", "=", "5")]);
    assert_clean(&diagnostics);
}

#[test]
fn multiassign_identifier_overflow() {
    let diagnostics = check_body(vec![
        stmt_var("a", None, Some("1")),
        stmt_var("b", None, Some("2")),
        stmt_multi_assign(vec![("a", false), ("b", false)], vec!["3"]),
    ]);
    assert_key(&diagnostics, ErrorKey::OverflowMultiassignIdentifiers);
}

#[test]
fn multiassign_identifier_missing() {
    let diagnostics = check_body(vec![
        stmt_var("a", None, Some("1")),
        stmt_var("b", None, Some("2")),
        stmt_multi_assign(vec![("a", false), ("b", false)], vec!["3", "4", "5"]),
    ]);
    assert_key(&diagnostics, ErrorKey::MissingMultiassignIdentifiers);
}

#[test]
fn multi_return_unpacks_into_new_vars() {
    let pair_ret = DataType::multi(vec![ty("int32"), ty("str")]);
    let diagnostics = check_items(vec![
        fn_item(
            "pair",
            Vec::new(),
            pair_ret,
            vec![stmt_ret(Some("1, \"s\""))],
        ),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![
                stmt_multi_assign(vec![("a", true), ("b", true)], vec!["pair()"]),
                stmt_var("n", Some(ty("int32")), Some("a")),
                stmt_var("s", Some(ty("str")), Some("b")),
            ],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn multi_return_selector_count_mismatch() {
    let pair_ret = DataType::multi(vec![ty("int32"), ty("str")]);
    let diagnostics = check_items(vec![
        fn_item(
            "pair",
            Vec::new(),
            pair_ret,
            vec![stmt_ret(Some("1, \"s\""))],
        ),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_multi_assign(
                vec![("a", true), ("b", true), ("c", true)],
                vec!["pair()"],
            )],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::MissingMultiassignIdentifiers);
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn if_condition_must_be_bool() {
    let diagnostics = check_body(vec![stmt(StmtKind::If(If {
        token: tok("x"),
        expr: expr("1"),
        block: Block { stmts: Vec::new() },
    }))]);
    assert_key(&diagnostics, ErrorKey::IfNotboolExpr);
}

#[test]
fn if_else_chain_checks_all_branches() {
    let diagnostics = check_body(vec![
        stmt(StmtKind::If(If {
            token: tok("x"),
            expr: expr("true"),
            block: Block { stmts: Vec::new() },
        })),
        stmt(StmtKind::ElseIf(ElseIf {
            token: tok("x"),
            expr: expr("1"),
            block: Block { stmts: Vec::new() },
        })),
        stmt(StmtKind::Else(Else {
            token: tok("x"),
            block: Block { stmts: Vec::new() },
        })),
    ]);
    assert_key(&diagnostics, ErrorKey::IfNotboolExpr);
}

#[test]
fn block_vars_scope_to_their_block() {
    let diagnostics = check_body(vec![
        stmt(StmtKind::If(If {
            token: tok("x"),
            expr: expr("true"),
            block: Block {
                stmts: vec![stmt_var("inner", None, Some("1"))],
            },
        })),
        stmt_expr("inner"),
    ]);
    assert_key(&diagnostics, ErrorKey::IdNoexist);
}

#[test]
fn while_condition_must_be_bool() {
    let diagnostics = check_body(vec![stmt_while("1", Vec::new())]);
    assert_key(&diagnostics, ErrorKey::IterWhileNotboolExpr);
}

#[test]
fn break_outside_iteration() {
    let diagnostics = check_body(vec![stmt(StmtKind::Break)]);
    assert_key(&diagnostics, ErrorKey::BreakAtOutiter);
}

#[test]
fn continue_outside_iteration() {
    let diagnostics = check_body(vec![stmt(StmtKind::Continue)]);
    assert_key(&diagnostics, ErrorKey::ContinueAtOutiter);
}

#[test]
fn break_inside_iteration() {
    let diagnostics = check_body(vec![stmt_while("true", vec![stmt(StmtKind::Break)])]);
    assert_clean(&diagnostics);
}

#[test]
fn foreach_over_string_autotypes_keys() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_foreach(
            foreach_key("i", None),
            foreach_key("c", None),
            "s",
            vec![
                stmt_var("index", Some(ty("uint64")), Some("i")),
                stmt_var("elem", Some(ty("rune")), Some("c")),
            ],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn foreach_over_array_element_key() {
    let diagnostics = check_body(vec![
        stmt_var("a", Some(ty("[]int32")), Some("{1, 2, 3}")),
        stmt_foreach(
            foreach_key("_", None),
            foreach_key("x", None),
            "a",
            vec![stmt_var("elem", Some(ty("int32")), Some("x"))],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn foreach_requires_enumerable() {
    let diagnostics = check_body(vec![
        stmt_var("n", Some(ty("int32")), Some("1")),
        stmt_foreach(foreach_key("i", None), foreach_key("_", None), "n", Vec::new()),
    ]);
    assert_key(&diagnostics, ErrorKey::IterForeachNonenumerableExpr);
}

#[test]
fn foreach_index_key_must_be_numeric() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_foreach(
            foreach_key("i", Some(ty("str"))),
            foreach_key("_", None),
            "s",
            Vec::new(),
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn free_requires_pointer() {
    let diagnostics = check_body(vec![
        stmt_var("n", Some(ty("int32")), Some("1")),
        stmt(StmtKind::Free(Free {
            token: tok("x"),
            expr: expr("n"),
        })),
    ]);
    assert_key(&diagnostics, ErrorKey::FreeNonpointer);
}

#[test]
fn free_pointer_ok() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt(StmtKind::Free(Free {
            token: tok("x"),
            expr: expr("p"),
        })),
    ]);
    assert_clean(&diagnostics);
}

// =============================================================================
// Returns
// =============================================================================

#[test]
fn missing_return_in_nonvoid_fn() {
    let diagnostics = check_items(vec![fn_item("f", Vec::new(), ty("int32"), Vec::new())]);
    assert_key(&diagnostics, ErrorKey::MissingReturn);
}

#[test]
fn void_fn_returning_value() {
    let diagnostics = check_body(vec![stmt_ret(Some("5"))]);
    assert_key(&diagnostics, ErrorKey::VoidFunctionReturnValue);
}

#[test]
fn nonvoid_ret_requires_value() {
    let diagnostics = check_items(vec![fn_item(
        "f",
        Vec::new(),
        ty("int32"),
        vec![stmt_ret(None)],
    )]);
    assert_key(&diagnostics, ErrorKey::RequireReturnValue);
}

#[test]
fn overflow_return_in_single_typed_fn() {
    let diagnostics = check_items(vec![fn_item(
        "f",
        Vec::new(),
        ty("int32"),
        vec![stmt_ret(Some("1, 2"))],
    )]);
    assert_key(&diagnostics, ErrorKey::OverflowReturn);
}

#[test]
fn multi_return_accepts_matching_values() {
    let ret_type = DataType::multi(vec![ty("int32"), ty("int32")]);
    let diagnostics = check_items(vec![fn_item(
        "g",
        Vec::new(),
        ret_type,
        vec![stmt_ret(Some("1, 2"))],
    )]);
    assert_clean(&diagnostics);
}

#[test]
fn single_value_in_multi_typed_fn() {
    let ret_type = DataType::multi(vec![ty("int32"), ty("int32")]);
    let diagnostics = check_items(vec![fn_item(
        "g",
        Vec::new(),
        ret_type,
        vec![stmt_ret(Some("1"))],
    )]);
    assert_key(&diagnostics, ErrorKey::MissingMultiReturn);
}

#[test]
fn overflow_return_in_multi_typed_fn() {
    let ret_type = DataType::multi(vec![ty("int32"), ty("int32")]);
    let diagnostics = check_items(vec![fn_item(
        "g",
        Vec::new(),
        ret_type,
        vec![stmt_ret(Some("1, 2, 3"))],
    )]);
    assert_key(&diagnostics, ErrorKey::OverflowReturn);
}

// =============================================================================
// Expressions
// =============================================================================

#[test]
fn undefined_identifier() {
    let diagnostics = check_body(vec![stmt_expr("nope")]);
    assert_key(&diagnostics, ErrorKey::IdNoexist);
}

#[test]
fn ignore_ident_is_never_readable() {
    let diagnostics = check_body(vec![
        stmt_var("_tmp", None, Some("1")),
        stmt_expr("_tmp"),
    ]);
    assert_key(&diagnostics, ErrorKey::IdNoexist);
}

#[test]
fn array_index_must_be_integer() {
    let diagnostics = check_body(vec![
        stmt_var("a", Some(ty("[]int32")), Some("{1, 2, 3}")),
        stmt_expr("a[1.5]"),
    ]);
    assert_key(&diagnostics, ErrorKey::NotintArraySelect);
}

#[test]
fn negative_constant_index_rejected() {
    let diagnostics = check_body(vec![
        stmt_var("a", Some(ty("[]int32")), Some("{1, 2, 3}")),
        stmt_expr("a[-1]"),
    ]);
    assert_key(&diagnostics, ErrorKey::NotintArraySelect);
}

#[test]
fn string_index_yields_byte() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_var("b", Some(ty("uint8")), Some("s[0]")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn string_index_is_not_rune() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_var("r", Some(ty("rune")), Some("s[0]")),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn string_index_requires_integer() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_expr("s[1.5]"),
    ]);
    assert_key(&diagnostics, ErrorKey::NotintStringSelect);
}

#[test]
fn indexing_unsupported_type() {
    let diagnostics = check_body(vec![
        stmt_var("n", Some(ty("int32")), Some("1")),
        stmt_expr("n[0]"),
    ]);
    assert_key(&diagnostics, ErrorKey::NotSupportsIndexing);
}

#[test]
fn slicing_array_and_string() {
    let diagnostics = check_body(vec![
        stmt_var("a", Some(ty("[]int32")), Some("{1, 2, 3}")),
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_var("sub", Some(ty("[]int32")), Some("a[1:2]")),
        stmt_var("tail", Some(ty("str")), Some("s[1:]")),
        stmt_var("head", Some(ty("str")), Some("s[:2]")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn slicing_unsupported_type() {
    let diagnostics = check_body(vec![
        stmt_var("n", Some(ty("int32")), Some("1")),
        stmt_expr("n[1:2]"),
    ]);
    assert_key(&diagnostics, ErrorKey::NotSupportsSlicing);
}

#[test]
fn pointer_arithmetic_with_integer() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_var("q", Some(ty("*int32")), Some("p + 4")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn pointer_plus_pointer_rejected() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_expr("p + p"),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleType);
}

#[test]
fn pointer_comparison_with_nil() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_var("b", Some(ty("bool")), Some("p == nil")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn pointer_modulo_rejected() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_expr("p % 2"),
    ]);
    assert_key(&diagnostics, ErrorKey::OperatorNotforPointer);
}

#[test]
fn string_concat_and_comparison() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"a\" + \"b\"")),
        stmt_var("b", Some(ty("bool")), Some("s == \"ab\"")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn string_subtraction_rejected() {
    let diagnostics = check_body(vec![stmt_expr("\"a\" - \"b\"")]);
    assert_key(&diagnostics, ErrorKey::OperatorNotforString);
}

#[test]
fn logical_operands_must_be_bool() {
    let diagnostics = check_body(vec![stmt_expr("true && 1")]);
    assert_key(&diagnostics, ErrorKey::LogicalNotBool);
}

#[test]
fn precedence_reduces_left_to_right() {
    let diagnostics = check_body(vec![stmt_var(
        "b",
        Some(ty("bool")),
        Some("1 + 2 * 3 == 7 && true"),
    )]);
    assert_clean(&diagnostics);
}

#[test]
fn shift_right_operand_must_be_unsigned() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_var("y", Some(ty("int32")), Some("2")),
        stmt_expr("x << y"),
    ]);
    assert_key(&diagnostics, ErrorKey::BitshiftMustUnsigned);
}

#[test]
fn shift_with_unsigned_or_constant_operand() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_var("u", Some(ty("uint32")), Some("2")),
        stmt_expr("x << u"),
        stmt_expr("x << 2"),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn signed_unsigned_mix_rejected() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_var("u", Some(ty("uint32")), Some("2")),
        stmt_expr("x + u"),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleType);
}

#[test]
fn constant_escapes_numeric_compat() {
    let diagnostics = check_body(vec![
        stmt_var("u", Some(ty("uint32")), Some("2")),
        stmt_var("v", Some(ty("uint32")), Some("u + 1")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn unary_operators() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("-5")),
        stmt_var("y", Some(ty("int32")), Some("~x")),
        stmt_var("b", Some(ty("bool")), Some("!true")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn unary_minus_requires_numeric() {
    let diagnostics = check_body(vec![stmt_expr("-\"s\"")]);
    assert_key(&diagnostics, ErrorKey::InvalidDataUnary);
}

#[test]
fn tilde_requires_integer() {
    let diagnostics = check_body(vec![stmt_expr("~3.14")]);
    assert_key(&diagnostics, ErrorKey::InvalidDataTilde);
}

#[test]
fn logical_not_requires_bool() {
    let diagnostics = check_body(vec![stmt_expr("!5")]);
    assert_key(&diagnostics, ErrorKey::InvalidDataLogicalNot);
}

#[test]
fn deref_outside_unsafe_scope() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_expr("*p"),
    ]);
    assert_key(&diagnostics, ErrorKey::UnsafeBehaviorAtOutOfUnsafeScope);
}

#[test]
fn deref_inside_unsafe_scope() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_var("x", Some(ty("int32")), Some("unsafe { *p }")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn address_of_identifier() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_var("p", Some(ty("*int32")), Some("&x")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn address_of_literal_rejected() {
    let diagnostics = check_body(vec![stmt_expr("&5")]);
    assert_key(&diagnostics, ErrorKey::InvalidDataAmper);
}

#[test]
fn heap_allocation_yields_pointer() {
    let diagnostics = check_body(vec![stmt_var("p", Some(ty("*int32")), Some("new int32"))]);
    assert_clean(&diagnostics);
}

#[test]
fn rune_and_byte_literals() {
    let diagnostics = check_body(vec![
        stmt_var("r", Some(ty("rune")), Some("'é'")),
        stmt_var("b", Some(ty("uint8")), Some("'a'")),
        stmt_var("h", Some(ty("uint8")), Some("'\\x41'")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn variadic_spread_marks_value() {
    let diagnostics = check_body(vec![
        stmt_var("a", Some(ty("[]int32")), Some("{1, 2}")),
        stmt_var("x", Some(ty("int32")), Some("a...")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn spread_requires_array() {
    let diagnostics = check_body(vec![
        stmt_var("n", Some(ty("int32")), Some("1")),
        stmt_expr("n..."),
    ]);
    assert_key(&diagnostics, ErrorKey::VariadicWithNonvariadicable);
}

#[test]
fn assignment_as_expression() {
    let diagnostics = check_body(vec![
        stmt_var("x", Some(ty("int32")), Some("1")),
        stmt_var("y", Some(ty("int32")), Some("(x = 2)")),
    ]);
    assert_clean(&diagnostics);
}

// =============================================================================
// Calls
// =============================================================================

fn add_fn() -> Item {
    fn_item(
        "add",
        vec![param("a", ty("int32")), param("b", ty("int32"))],
        ty("int32"),
        vec![stmt_ret(Some("a + b"))],
    )
}

#[test]
fn call_with_matching_args() {
    let diagnostics = check_items(vec![
        add_fn(),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_var("x", Some(ty("int32")), Some("add(1, 2)"))],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn call_with_missing_argument() {
    let diagnostics = check_items(vec![
        add_fn(),
        fn_item("f", Vec::new(), DataType::void(), vec![stmt_expr("add(1)")]),
    ]);
    assert_key(&diagnostics, ErrorKey::MissingArgument);
}

#[test]
fn call_with_argument_overflow() {
    let diagnostics = check_items(vec![
        add_fn(),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_expr("add(1, 2, 3)")],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::ArgumentOverflow);
}

#[test]
fn call_with_incompatible_argument() {
    let diagnostics = check_items(vec![
        add_fn(),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_expr("add(1, \"s\")")],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

fn sum_fn() -> Item {
    let mut variadic = param("xs", ty("int32"));
    variadic.variadic = true;
    fn_item("sum", vec![variadic], ty("int32"), vec![stmt_ret(Some("0"))])
}

#[test]
fn variadic_call_absorbs_trailing_args() {
    let diagnostics = check_items(vec![
        sum_fn(),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![
                stmt_expr("sum()"),
                stmt_expr("sum(1)"),
                stmt_expr("sum(1, 2, 3)"),
            ],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn variadic_call_accepts_spread() {
    let diagnostics = check_items(vec![
        sum_fn(),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![
                stmt_var("a", Some(ty("[]int32")), Some("{1, 2}")),
                stmt_expr("sum(a...)"),
            ],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn spread_mixed_with_other_args() {
    let diagnostics = check_items(vec![
        sum_fn(),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![
                stmt_var("a", Some(ty("[]int32")), Some("{1, 2}")),
                stmt_expr("sum(1, a...)"),
            ],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::MoreArgsWithVaridiced);
}

#[test]
fn variadic_parameter_must_be_last() {
    let mut variadic = param("xs", ty("int32"));
    variadic.variadic = true;
    let diagnostics = check_items(vec![fn_item(
        "f",
        vec![variadic, param("y", ty("int32"))],
        DataType::void(),
        Vec::new(),
    )]);
    assert_key(&diagnostics, ErrorKey::VariadicParameterNotlast);
}

// =============================================================================
// Casts
// =============================================================================

#[test]
fn cast_pointer_to_integer() {
    let diagnostics = check_body(vec![
        stmt_var("p", Some(ty("*int32")), Some("nil")),
        stmt_var("n", Some(ty("int64")), Some("(int64)p")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn cast_integer_to_pointer_requires_unsafe() {
    let diagnostics = check_body(vec![stmt_expr("(*int32)5")]);
    assert_key(&diagnostics, ErrorKey::UnsafeBehaviorAtOutOfUnsafeScope);
}

#[test]
fn cast_string_to_bytes_and_back() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"abc\"")),
        stmt_var("bs", Some(ty("[]uint8")), Some("([]uint8)s")),
        stmt_var("t", Some(ty("str")), Some("(str)bs")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn cast_unsupported_target() {
    let diagnostics = check_body(vec![
        stmt_var("n", Some(ty("int32")), Some("1")),
        stmt_expr("(bool)n"),
    ]);
    assert_key(&diagnostics, ErrorKey::TypeNotsupportsCasting);
}

#[test]
fn cast_to_any_always_allowed() {
    let diagnostics = check_body(vec![
        stmt_var("s", Some(ty("str")), Some("\"x\"")),
        stmt_var("a", Some(ty("any")), Some("(any)s")),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn cast_missing_expression() {
    let diagnostics = check_body(vec![stmt_expr("(int32)")]);
    assert_key(&diagnostics, ErrorKey::CastingMissingExpr);
}

fn shape_trait() -> Item {
    Item::Trait(TraitDecl {
        token: tok("Shape"),
        ident: "Shape".to_string(),
        public: true,
        methods: Vec::new(),
        doc: String::new(),
    })
}

fn circle_struct(implements: Vec<String>) -> Item {
    Item::Struct(StructDecl {
        token: tok("Circle"),
        ident: "Circle".to_string(),
        public: true,
        fields: vec![FieldDecl {
            token: tok("radius"),
            ident: "radius".to_string(),
            public: true,
            mutable: true,
            kind: ty("int32"),
        }],
        implements,
        doc: String::new(),
    })
}

#[test]
fn cast_trait_to_implementing_struct() {
    let diagnostics = check_items(vec![
        shape_trait(),
        circle_struct(vec!["Shape".to_string()]),
        fn_item(
            "f",
            vec![param("s", ty("Shape"))],
            DataType::void(),
            vec![stmt_expr("(Circle)s")],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn cast_trait_to_non_implementing_struct() {
    let diagnostics = check_items(vec![
        shape_trait(),
        circle_struct(Vec::new()),
        fn_item(
            "f",
            vec![param("s", ty("Shape"))],
            DataType::void(),
            vec![stmt_expr("(Circle)s")],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::TypeNotsupportsCasting);
}

// =============================================================================
// Struct literals, maps, aliases
// =============================================================================

#[test]
fn struct_literal_checks_field_types() {
    let diagnostics = check_items(vec![
        circle_struct(Vec::new()),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_expr("Circle{\"oops\"}")],
        ),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
}

#[test]
fn struct_literal_ok() {
    let diagnostics = check_items(vec![
        circle_struct(Vec::new()),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_expr("Circle{3}")],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn map_indexing_checks_key_type() {
    let diagnostics = check_body(vec![
        stmt_var("m", Some(ty("map[str]int32")), Some("nil")),
        stmt_var("v", Some(ty("int32")), Some("m[\"k\"]")),
        stmt_expr("m[5]"),
    ]);
    assert_key(&diagnostics, ErrorKey::IncompatibleDatatype);
    // The well-keyed lookup itself is clean.
    assert_eq!(keys_of(&diagnostics), vec![ErrorKey::IncompatibleDatatype]);
}

#[test]
fn type_alias_resolves_in_annotations() {
    let diagnostics = check_items(vec![
        Item::TypeAlias(TypeAliasDecl {
            token: tok("MyInt"),
            ident: "MyInt".to_string(),
            public: false,
            kind: ty("int32"),
            doc: String::new(),
        }),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![
                stmt_var("x", Some(ty("MyInt")), Some("5")),
                stmt_var("y", Some(ty("int32")), Some("x")),
            ],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn alias_cycle_reported() {
    let diagnostics = check_items(vec![
        Item::TypeAlias(TypeAliasDecl {
            token: tok("A"),
            ident: "A".to_string(),
            public: false,
            kind: ty("B"),
            doc: String::new(),
        }),
        Item::TypeAlias(TypeAliasDecl {
            token: tok("B"),
            ident: "B".to_string(),
            public: false,
            kind: ty("A"),
            doc: String::new(),
        }),
    ]);
    assert_key(&diagnostics, ErrorKey::InvalidTypeSource);
}

#[test]
fn unknown_type_annotation() {
    let diagnostics = check_body(vec![stmt_var("x", Some(ty("Missing")), Some("5"))]);
    assert_key(&diagnostics, ErrorKey::InvalidTypeSource);
}

// =============================================================================
// Entry point, attributes, docs
// =============================================================================

#[test]
fn entry_point_required_for_executables() {
    let diagnostics = check_executable(Vec::new());
    assert_key(&diagnostics, ErrorKey::NoEntryPoint);
}

#[test]
fn entry_point_ok() {
    let diagnostics = check_executable(vec![fn_item(
        "main",
        Vec::new(),
        DataType::void(),
        Vec::new(),
    )]);
    assert_clean(&diagnostics);
}

#[test]
fn entry_point_with_parameters() {
    let diagnostics = check_executable(vec![fn_item(
        "main",
        vec![param("x", ty("int32"))],
        DataType::void(),
        Vec::new(),
    )]);
    assert_key(&diagnostics, ErrorKey::EntrypointHaveParameters);
}

#[test]
fn entry_point_with_return_type() {
    let diagnostics = check_executable(vec![fn_item(
        "main",
        Vec::new(),
        ty("int32"),
        vec![stmt_ret(Some("0"))],
    )]);
    assert_key(&diagnostics, ErrorKey::EntrypointHaveReturn);
}

fn attribute(tag: &str) -> Item {
    Item::Attribute(crate::frontend::ast::Attribute {
        token: tok(tag),
        tag: tok(tag),
    })
}

#[test]
fn entry_point_with_attributes() {
    let diagnostics = check_executable(vec![
        attribute("inline"),
        fn_item("main", Vec::new(), DataType::void(), Vec::new()),
    ]);
    assert_key(&diagnostics, ErrorKey::EntrypointHaveAttributes);
}

#[test]
fn inline_attribute_accepted() {
    let diagnostics = check_items(vec![
        attribute("inline"),
        fn_item("f", Vec::new(), DataType::void(), Vec::new()),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn unknown_attribute_tag() {
    let diagnostics = check_items(vec![
        attribute("fastcall"),
        fn_item("f", Vec::new(), DataType::void(), Vec::new()),
    ]);
    assert_key(&diagnostics, ErrorKey::UndefinedTag);
}

#[test]
fn repeated_attribute() {
    let diagnostics = check_items(vec![
        attribute("inline"),
        attribute("inline"),
        fn_item("f", Vec::new(), DataType::void(), Vec::new()),
    ]);
    assert_key(&diagnostics, ErrorKey::AttributeRepeat);
}

#[test]
fn attribute_on_unsupported_item() {
    let diagnostics = check_items(vec![
        attribute("inline"),
        Item::GlobalVar(var_decl("g", Some(ty("int32")), Some("1"))),
    ]);
    assert_key(&diagnostics, ErrorKey::AttributeNotSupports);
}

fn comment(content: &str) -> Item {
    Item::Comment(crate::frontend::ast::Comment {
        token: tok("x"),
        content: content.to_string(),
    })
}

#[test]
fn doc_comment_attaches_to_next_fn() {
    let sink = DiagnosticSink::new();
    let options = SemaOptions {
        executable: false,
        ..SemaOptions::default()
    };
    let mut analyzer = Analyzer::new(options, &sink);
    let mut program = Program {
        use_decls: Vec::new(),
        items: vec![
            comment("doc: adds two numbers"),
            fn_item("f", Vec::new(), DataType::void(), Vec::new()),
        ],
    };
    analyzer.analyze(&mut program);
    assert!(sink.take().is_empty());
    assert_eq!(
        analyzer.table().find_fn("f").unwrap().doc,
        " adds two numbers"
    );
}

#[test]
fn dangling_doc_comment_warns() {
    let diagnostics = check_items(vec![comment("doc: orphaned")]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].key, ErrorKey::ExistUndefinedDoc);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
}

// =============================================================================
// Globals and duplicate symbols
// =============================================================================

#[test]
fn global_visible_in_function_bodies() {
    let diagnostics = check_items(vec![
        Item::GlobalVar(var_decl("g", Some(ty("int32")), Some("1"))),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![stmt_var("x", Some(ty("int32")), Some("g + 1"))],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn duplicate_top_level_symbol() {
    let diagnostics = check_items(vec![
        Item::GlobalVar(var_decl("thing", Some(ty("int32")), Some("1"))),
        fn_item("thing", Vec::new(), DataType::void(), Vec::new()),
    ]);
    assert_key(&diagnostics, ErrorKey::ExistId);
}

#[test]
fn block_var_shadows_global() {
    let diagnostics = check_items(vec![
        Item::GlobalVar(var_decl("g", Some(ty("int32")), Some("1"))),
        fn_item(
            "f",
            Vec::new(),
            DataType::void(),
            vec![
                stmt_var("g", Some(ty("str")), Some("\"shadow\"")),
                stmt_var("s", Some(ty("str")), Some("g")),
            ],
        ),
    ]);
    assert_clean(&diagnostics);
}

#[test]
fn diagnostics_sort_by_location() {
    let sink = DiagnosticSink::new();
    let mut early = tok("x");
    early.row = 1;
    let mut late = tok("x");
    late.row = 9;
    sink.error(&late, ErrorKey::IdNoexist);
    sink.error(&early, ErrorKey::ExistId);
    let sorted = sink.sorted();
    assert_eq!(sorted[0].key, ErrorKey::ExistId);
    assert_eq!(sorted[1].key, ErrorKey::IdNoexist);
}
