//! End-to-end analyzer tests: lex → parse → assemble → analyze, checking
//! the resulting diagnostics and annotated AST.

use brc_ir::{BinaryOp, ExprKind, LiteralValue, Statement, ValueType};
use brc_modules::assemble;
use brc_typeck::analyze_module;

fn analyze_one(src: &str) -> (brc_ir::Module, brc_diagnostic::Diagnostics) {
    let tokens = brc_lexer::tokenize(src, "t.brc").expect("lex");
    let parsed = brc_parse::parse(&tokens).expect("parse");
    let assembly = assemble(vec![parsed]);
    let mut modules = assembly.modules;
    let mut module = modules.remove(0);
    let diagnostics = analyze_module(&mut module, &assembly.exported_headers);
    (module, diagnostics)
}

#[test]
fn binary_expression_folds_precedence_and_casts() {
    let (module, diagnostics) = analyze_one("a s32 <- 1 + 2 * 3\n");
    assert!(diagnostics.is_empty());
    let Statement::Variable { value_type, initializer: Some(init), .. } = &module.body[0] else {
        panic!("expected variable definition")
    };
    assert_eq!(*value_type, ValueType::S32);
    assert_eq!(init.value_type, Some(ValueType::S32));
    let ExprKind::Chained(links) = &init.kind else { panic!("expected a cast chain") };
    let ExprKind::Binary(BinaryOp::Add, lhs, rhs) = &links[0].kind else { panic!("expected +") };
    assert!(matches!(lhs.kind, ExprKind::Literal(LiteralValue::Int(1))));
    assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Mul, _, _)));
}

#[test]
fn main_function_returns_s32() {
    let (module, diagnostics) = analyze_one("main fun -> s32 :\nret 42\n;\n");
    assert!(diagnostics.is_empty());
    let Statement::Function { return_type, .. } = &module.body[0] else {
        panic!("expected function definition")
    };
    assert_eq!(*return_type, ValueType::S32);
}

#[test]
fn composite_literal_promotes_to_blob_and_casts_fields() {
    let (module, diagnostics) =
        analyze_one("point blob : x s32, y s32\np point <- { 1, 2 }\n");
    assert!(diagnostics.is_empty());
    let Statement::Variable { initializer: Some(init), .. } = &module.body[0] else {
        panic!("expected variable definition")
    };
    assert_eq!(init.value_type, Some(ValueType::Blob("point".into())));
    let ExprKind::CompositeLiteral(elements) = &init.kind else { panic!("expected composite literal") };
    assert_eq!(elements[0].value_type, Some(ValueType::S32));
    assert_eq!(elements[1].value_type, Some(ValueType::S32));
}

#[test]
fn repeat_condition_must_be_bool_and_scopes_induction_variable() {
    let (_, diagnostics) = analyze_one(
        "loop fun :\nrep i s32 <- 0, i < 10, i <- i + 1:\n;\n;\n",
    );
    assert!(diagnostics.is_empty());
}

#[test]
fn unknown_identifier_reports_exactly_one_error() {
    let (_, diagnostics) = analyze_one("main fun :\nret zzz\n;\n");
    assert_eq!(diagnostics.len(), 1);
    let err = diagnostics.iter().next().unwrap();
    assert!(matches!(
        &err.kind,
        brc_diagnostic::ErrorKind::Semantic(brc_diagnostic::SemanticErrorKind::UnknownIdentifier(name))
            if &**name == "zzz"
    ));
}

#[test]
fn invalid_cast_from_float_to_bool_is_reported() {
    let (_, diagnostics) = analyze_one("b bool <- (1 f32)\n");
    assert_eq!(diagnostics.len(), 1);
    let err = diagnostics.iter().next().unwrap();
    assert!(matches!(
        &err.kind,
        brc_diagnostic::ErrorKind::Semantic(brc_diagnostic::SemanticErrorKind::InvalidCast { from, to })
            if *from == ValueType::F32 && *to == ValueType::Bool
    ));
}

#[test]
fn data_variable_without_count_adopts_initializer_count() {
    let (module, diagnostics) = analyze_one("a data s32[0] <- { 1, 2, 3 }\n");
    assert!(diagnostics.is_empty());
    let Statement::Variable { value_type, .. } = &module.body[0] else {
        panic!("expected variable definition")
    };
    let ValueType::Data(_, count) = value_type else { panic!("expected DATA type") };
    assert_eq!(brc_ir::literal_uint_value(count), Some(3));
}

#[test]
fn duplicate_function_definition_does_not_overwrite_first() {
    let (_, diagnostics) = analyze_one(
        "f fun -> s32 :\nret 1\n;\nf fun -> s32 :\nret 2\n;\n",
    );
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.iter().any(|e| matches!(
        &e.kind,
        brc_diagnostic::ErrorKind::Semantic(brc_diagnostic::SemanticErrorKind::DuplicateDefinition(name))
            if &**name == "f"
    )));
}

#[test]
fn import_brings_in_qualified_exported_symbols() {
    let geometry_src = "@module geometry\n@export origin s32 <- 7\n";
    let main_src = "@import geometry\nmain fun -> s32 :\nret geometry.origin\n;\n";

    let geometry_tokens = brc_lexer::tokenize(geometry_src, "geometry.brc").expect("lex geometry");
    let geometry_parsed = brc_parse::parse(&geometry_tokens).expect("parse geometry");
    let main_tokens = brc_lexer::tokenize(main_src, "main.brc").expect("lex main");
    let main_parsed = brc_parse::parse(&main_tokens).expect("parse main");

    let assembly = assemble(vec![geometry_parsed, main_parsed]);
    let mut modules = assembly.modules;
    let main_index = modules.iter().position(|m| &*m.name == "main").expect("main module");
    let mut main_module = modules.remove(main_index);

    let diagnostics = analyze_module(&mut main_module, &assembly.exported_headers);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
}

#[test]
fn chained_val_ptr_to_fun_arg_count_checked_before_promotion() {
    // `fnPtr.val(args)` validates the call's own argument count against
    // the function type before the `.val` promotion narrows the parent
    // from PTR(FUN(...)) to the function's return type.
    let src = "f fun -> s32 :\nret 1\n;\ncaller fun -> s32 :\nfp ptr fun : -> s32 <- f\nret fp.val(1)\n;\n";
    let (_, diagnostics) = analyze_one(src);
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics.iter().any(|e| matches!(
        &e.kind,
        brc_diagnostic::ErrorKind::Semantic(brc_diagnostic::SemanticErrorKind::InvalidArgumentsCount { .. })
    )));
}
