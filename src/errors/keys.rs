// src/errors/keys.rs
//! Error keys for the stoat compiler.
//!
//! Every diagnostic the core emits carries one of these keys. Message text
//! is produced by the consumer from an external table keyed by
//! [`ErrorKey::as_str`]; the core only reports structure.

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Closed set of diagnostic keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKey {
    // Lexer
    InvalidToken,
    MissingBlockComment,
    MissingStringEnd,
    MissingRuneEnd,
    RuneEmpty,
    RuneOverflow,
    InvalidEscapeSequence,

    // Declarations and symbols
    InvalidSyntax,
    ExistId,
    IgnoreId,
    IdNoexist,
    NoEntryPoint,

    // Types and operators
    IncompatibleType,
    IncompatibleDatatype,
    OperatorNotforPointer,
    OperatorNotforString,
    OperatorNotforBool,
    OperatorNotforFloat,
    OperatorNotforInt,
    OperatorNotforUint,
    OperatorNotforRune,
    OperatorNotforArray,
    OperatorNotforNil,
    OperatorNotforAny,
    BitshiftMustUnsigned,
    LogicalNotBool,
    InvalidOperator,
    InvalidDataUnary,
    InvalidDataPlus,
    InvalidDataTilde,
    InvalidDataLogicalNot,
    InvalidDataStar,
    InvalidDataAmper,

    // Assignment
    AssignNonlvalue,
    AssignConst,
    AssignTypeNotSupportValue,
    ConstantAssigntoNonconstant,

    // Calls and expressions
    MissingArgument,
    ArgumentOverflow,
    MoreArgsWithVaridiced,
    MissingExpression,
    CastingMissingExpr,
    TypeNotsupportsCasting,
    VariadicWithNonvariadicable,
    VariadicParameterNotlast,
    NotintArraySelect,
    NotintStringSelect,
    NotEnumerable,
    NotSupportsIndexing,
    NotSupportsSlicing,
    UnsafeBehaviorAtOutOfUnsafeScope,
    UnsafePtrIndexing,

    // Statements
    IterWhileNotboolExpr,
    IterForeachNonenumerableExpr,
    IfNotboolExpr,
    BreakAtOutiter,
    ContinueAtOutiter,
    FreeNonpointer,
    NilForAutotype,
    VoidForAutotype,
    MissingAutotypeValue,
    MissingConstValue,
    DynamicTypeAnnotationFailed,

    // Returns
    MissingReturn,
    RequireReturnValue,
    VoidFunctionReturnValue,
    OverflowReturn,
    MissingMultiReturn,
    OverflowMultiassignIdentifiers,
    MissingMultiassignIdentifiers,

    // Entry point
    EntrypointHaveParameters,
    EntrypointHaveReturn,
    EntrypointHaveAttributes,

    // Type sources and attributes
    InvalidTypeSource,
    InvalidAttribute,
    UndefinedTag,
    AttributeRepeat,
    AttributeNotSupports,

    // Imports
    UseNotFound,
    DuplicateUseDecl,
    UsedPackageHasErrors,
    InvalidHeaderExt,

    // Warnings
    DocIgnored,
    ExistUndefinedDoc,
}

impl ErrorKey {
    /// The stable key string consumers use for message lookup.
    pub fn as_str(self) -> &'static str {
        use ErrorKey::*;
        match self {
            InvalidToken => "invalid_token",
            MissingBlockComment => "missing_block_comment",
            MissingStringEnd => "missing_string_end",
            MissingRuneEnd => "missing_rune_end",
            RuneEmpty => "rune_empty",
            RuneOverflow => "rune_overflow",
            InvalidEscapeSequence => "invalid_escape_sequence",
            InvalidSyntax => "invalid_syntax",
            ExistId => "exist_id",
            IgnoreId => "ignore_id",
            IdNoexist => "id_noexist",
            NoEntryPoint => "no_entry_point",
            IncompatibleType => "incompatible_type",
            IncompatibleDatatype => "incompatible_datatype",
            OperatorNotforPointer => "operator_notfor_pointer",
            OperatorNotforString => "operator_notfor_string",
            OperatorNotforBool => "operator_notfor_bool",
            OperatorNotforFloat => "operator_notfor_float",
            OperatorNotforInt => "operator_notfor_int",
            OperatorNotforUint => "operator_notfor_uint",
            OperatorNotforRune => "operator_notfor_rune",
            OperatorNotforArray => "operator_notfor_array",
            OperatorNotforNil => "operator_notfor_nil",
            OperatorNotforAny => "operator_notfor_any",
            BitshiftMustUnsigned => "bitshift_must_unsigned",
            LogicalNotBool => "logical_not_bool",
            InvalidOperator => "invalid_operator",
            InvalidDataUnary => "invalid_data_unary",
            InvalidDataPlus => "invalid_data_plus",
            InvalidDataTilde => "invalid_data_tilde",
            InvalidDataLogicalNot => "invalid_data_logical_not",
            InvalidDataStar => "invalid_data_star",
            InvalidDataAmper => "invalid_data_amper",
            AssignNonlvalue => "assign_nonlvalue",
            AssignConst => "assign_const",
            AssignTypeNotSupportValue => "assign_type_not_support_value",
            ConstantAssigntoNonconstant => "constant_assignto_nonconstant",
            MissingArgument => "missing_argument",
            ArgumentOverflow => "argument_overflow",
            MoreArgsWithVaridiced => "more_args_with_varidiced",
            MissingExpression => "missing_expression",
            CastingMissingExpr => "casting_missing_expr",
            TypeNotsupportsCasting => "type_notsupports_casting",
            VariadicWithNonvariadicable => "variadic_with_nonvariadicable",
            VariadicParameterNotlast => "variadic_parameter_notlast",
            NotintArraySelect => "notint_array_select",
            NotintStringSelect => "notint_string_select",
            NotEnumerable => "not_enumerable",
            NotSupportsIndexing => "not_supports_indexing",
            NotSupportsSlicing => "not_supports_slicing",
            UnsafeBehaviorAtOutOfUnsafeScope => "unsafe_behavior_at_out_of_unsafe_scope",
            UnsafePtrIndexing => "unsafe_ptr_indexing",
            IterWhileNotboolExpr => "iter_while_notbool_expr",
            IterForeachNonenumerableExpr => "iter_foreach_nonenumerable_expr",
            IfNotboolExpr => "if_notbool_expr",
            BreakAtOutiter => "break_at_outiter",
            ContinueAtOutiter => "continue_at_outiter",
            FreeNonpointer => "free_nonpointer",
            NilForAutotype => "nil_for_autotype",
            VoidForAutotype => "void_for_autotype",
            MissingAutotypeValue => "missing_autotype_value",
            MissingConstValue => "missing_const_value",
            DynamicTypeAnnotationFailed => "dynamic_type_annotation_failed",
            MissingReturn => "missing_return",
            RequireReturnValue => "require_return_value",
            VoidFunctionReturnValue => "void_function_return_value",
            OverflowReturn => "overflow_return",
            MissingMultiReturn => "missing_multi_return",
            OverflowMultiassignIdentifiers => "overflow_multiassign_identifiers",
            MissingMultiassignIdentifiers => "missing_multiassign_identifiers",
            EntrypointHaveParameters => "entrypoint_have_parameters",
            EntrypointHaveReturn => "entrypoint_have_return",
            EntrypointHaveAttributes => "entrypoint_have_attributes",
            InvalidTypeSource => "invalid_type_source",
            InvalidAttribute => "invalid_attribute",
            UndefinedTag => "undefined_tag",
            AttributeRepeat => "attribute_repeat",
            AttributeNotSupports => "attribute_not_supports",
            UseNotFound => "use_not_found",
            DuplicateUseDecl => "duplicate_use_decl",
            UsedPackageHasErrors => "used_package_has_errors",
            InvalidHeaderExt => "invalid_header_ext",
            DocIgnored => "doc_ignored",
            ExistUndefinedDoc => "exist_undefined_doc",
        }
    }

    /// Severity of diagnostics carrying this key.
    pub fn severity(self) -> Severity {
        match self {
            ErrorKey::DocIgnored | ErrorKey::ExistUndefinedDoc => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
