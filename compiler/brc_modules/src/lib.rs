//! Module assembly: merges one or more parsed files into
//! named `Module`s, synthesizes forward declarations from definitions,
//! and builds the shared exported-header map consulted by `@import`.

use brc_ir::{
    BlobField, ExportedHeaderMap, FunctionArg, Module, Statement, ValueType, DEFAULT_MODULE_NAME,
};
use brc_parse::ParsedModule;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;

/// Everything module assembly produces: one `Module` per distinct module
/// name (in first-appearance order) plus the frozen exported-header map.
pub struct Assembly {
    pub modules: Vec<Module>,
    pub exported_headers: ExportedHeaderMap,
}

/// Raw, not-yet-synthesized accumulation for one module name across every
/// file that declares it, preserving input order.
#[derive(Default)]
struct RawModule {
    name: Rc<str>,
    header: Vec<Statement>,
    body: Vec<Statement>,
}

pub fn assemble(parsed_files: Vec<ParsedModule>) -> Assembly {
    let mut order: Vec<Rc<str>> = Vec::new();
    let mut raw: FxHashMap<Rc<str>, RawModule> = FxHashMap::default();

    for file in parsed_files {
        let entry = raw.entry(file.name.clone()).or_insert_with(|| {
            order.push(file.name.clone());
            RawModule { name: file.name.clone(), header: Vec::new(), body: Vec::new() }
        });
        entry.header.extend(file.header);
        entry.body.extend(file.body);
    }

    let mut modules = Vec::with_capacity(order.len());
    for name in order {
        let raw_module = raw.remove(&name).unwrap_or_else(|| RawModule {
            name: name.clone(),
            header: Vec::new(),
            body: Vec::new(),
        });
        modules.push(build_module(raw_module));
    }

    let mut exported_headers = ExportedHeaderMap::default();
    for module in &modules {
        exported_headers.insert(module.name.clone(), module.exported_header.clone());
    }

    Assembly { modules, exported_headers }
}

/// Builds one module's `header`/`body`/`exported_header` out of a raw,
/// merged accumulation.
fn build_module(raw_module: RawModule) -> Module {
    let RawModule { name, header: raw_header, body: raw_body } = raw_module;
    let is_default = &*name == DEFAULT_MODULE_NAME;

    let mut imports = Vec::new();
    let mut blob_defs = Vec::new();
    let mut extern_functions = Vec::new();
    let mut extern_variables = Vec::new();
    for stmt in raw_header {
        match stmt {
            Statement::MetaImport { .. } => imports.push(stmt),
            Statement::Blob { .. } => blob_defs.push(stmt),
            Statement::MetaExternFunction { .. } => extern_functions.push(stmt),
            Statement::MetaExternVariable { .. } => extern_variables.push(stmt),
            _ => {}
        }
    }

    let own_blob_names: FxHashSet<Rc<str>> =
        blob_defs.iter().filter_map(Statement::name).cloned().collect();

    let mut variable_defs = Vec::new();
    let mut function_defs = Vec::new();
    for stmt in raw_body {
        match &stmt {
            Statement::Variable { .. } => variable_defs.push(stmt),
            Statement::Function { .. } | Statement::RawFunction { .. } => function_defs.push(stmt),
            _ => {}
        }
    }

    let mut header = Vec::new();
    header.extend(imports.iter().cloned());

    let mut blob_declarations = Vec::new();
    for blob in &blob_defs {
        let Statement::Blob { should_export, name: blob_name, location, .. } = blob else {
            unreachable!("filtered to Blob above")
        };
        blob_declarations.push(Statement::BlobDeclaration {
            should_export: *should_export,
            name: blob_name.clone(),
            location: location.clone(),
        });
    }
    header.extend(blob_declarations);
    header.extend(blob_defs.iter().cloned());

    let mut variable_declarations = Vec::new();
    for var in &variable_defs {
        let Statement::Variable { should_export, name: var_name, value_type, location, .. } = var
        else {
            unreachable!("filtered to Variable above")
        };
        variable_declarations.push(Statement::VariableDeclaration {
            should_export: *should_export,
            name: var_name.clone(),
            value_type: value_type.clone(),
            location: location.clone(),
        });
    }
    header.extend(extern_variables.iter().cloned());
    header.extend(variable_declarations);

    let mut function_declarations = Vec::new();
    for func in &function_defs {
        match func {
            Statement::Function { should_export, name: fn_name, args, return_type, location, .. } => {
                function_declarations.push(Statement::FunctionDeclaration {
                    should_export: *should_export,
                    name: fn_name.clone(),
                    args: args.clone(),
                    return_type: return_type.clone(),
                    location: location.clone(),
                });
            }
            Statement::RawFunction { name: fn_name, args, return_type, location, .. } => {
                function_declarations.push(Statement::FunctionDeclaration {
                    should_export: false,
                    name: fn_name.clone(),
                    args: args.clone(),
                    return_type: return_type.clone(),
                    location: location.clone(),
                });
            }
            _ => unreachable!("filtered to Function/RawFunction above"),
        }
    }
    header.extend(extern_functions.iter().cloned());
    header.extend(function_declarations);

    let mut body = Vec::new();
    body.extend(variable_defs.iter().cloned());
    body.extend(function_defs.iter().cloned());

    let exported_header = build_exported_header(&name, is_default, &blob_defs, &variable_defs, &function_defs, &own_blob_names);

    Module { name, header, body, exported_header }
}

/// The subset flagged `@export`, with blob/function/variable types
/// rewritten to module-qualify any reference to one of this module's own
/// blobs.
fn build_exported_header(
    module_name: &Rc<str>,
    is_default: bool,
    blob_defs: &[Statement],
    variable_defs: &[Statement],
    function_defs: &[Statement],
    own_blob_names: &FxHashSet<Rc<str>>,
) -> Vec<Statement> {
    let mut exported = Vec::new();

    for blob in blob_defs {
        let Statement::Blob { should_export, name, fields, location } = blob else {
            unreachable!("filtered to Blob above")
        };
        if !should_export {
            continue;
        }
        let fields = fields
            .iter()
            .map(|field| BlobField {
                name: field.name.clone(),
                value_type: qualify_type(&field.value_type, module_name, is_default, own_blob_names),
            })
            .collect();
        exported.push(Statement::Blob {
            should_export: true,
            name: name.clone(),
            fields,
            location: location.clone(),
        });
    }

    for var in variable_defs {
        let Statement::Variable { should_export, name, value_type, location, .. } = var else {
            unreachable!("filtered to Variable above")
        };
        if !should_export {
            continue;
        }
        exported.push(Statement::VariableDeclaration {
            should_export: true,
            name: name.clone(),
            value_type: qualify_type(value_type, module_name, is_default, own_blob_names),
            location: location.clone(),
        });
    }

    for func in function_defs {
        let Statement::Function { should_export, name, args, return_type, location, .. } = func else {
            continue;
        };
        if !should_export {
            continue;
        }
        let args = args
            .iter()
            .map(|arg| FunctionArg {
                name: arg.name.clone(),
                value_type: qualify_type(&arg.value_type, module_name, is_default, own_blob_names),
            })
            .collect();
        exported.push(Statement::FunctionDeclaration {
            should_export: true,
            name: name.clone(),
            args,
            return_type: qualify_type(return_type, module_name, is_default, own_blob_names),
            location: location.clone(),
        });
    }

    exported
}

/// Recursively rewrites `BLOB(name)` references that name one of this
/// module's own blobs to `BLOB(module.name)`, unless this is the default
/// module.
fn qualify_type(
    value_type: &ValueType,
    module_name: &str,
    is_default: bool,
    own_blob_names: &FxHashSet<Rc<str>>,
) -> ValueType {
    match value_type {
        ValueType::Blob(name) if !is_default && own_blob_names.contains(name) => {
            ValueType::Blob(Rc::from(format!("{module_name}.{name}")))
        }
        ValueType::Data(sub, count) => {
            ValueType::data(qualify_type(sub, module_name, is_default, own_blob_names), (**count).clone())
        }
        ValueType::Ptr(sub) => ValueType::ptr(qualify_type(sub, module_name, is_default, own_blob_names)),
        ValueType::Fun(args, ret) => ValueType::fun(
            args.iter().map(|a| qualify_type(a, module_name, is_default, own_blob_names)).collect(),
            qualify_type(ret, module_name, is_default, own_blob_names),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brc_lexer::tokenize;

    fn parse_file(src: &str, file: &str) -> ParsedModule {
        let tokens = tokenize(src, file).expect("lex");
        brc_parse::parse(&tokens).expect("parse")
    }

    #[test]
    fn default_module_blob_type_is_not_qualified() {
        let parsed = parse_file("point blob : x s32, y s32\n@export p point <- { 1, 2 }\n", "a.brc");
        let assembly = assemble(vec![parsed]);
        let module = &assembly.modules[0];
        assert_eq!(&*module.name, DEFAULT_MODULE_NAME);
        let exported_var = module
            .exported_header
            .iter()
            .find(|s| matches!(s, Statement::VariableDeclaration { .. }))
            .expect("exported variable");
        let Statement::VariableDeclaration { value_type, .. } = exported_var else { unreachable!() };
        assert_eq!(*value_type, ValueType::Blob(Rc::from("point")));
    }

    #[test]
    fn non_default_module_blob_type_is_qualified() {
        let parsed =
            parse_file("@module geometry\npoint blob : x s32, y s32\n@export p point <- { 1, 2 }\n", "a.brc");
        let assembly = assemble(vec![parsed]);
        let module = &assembly.modules[0];
        let exported_var = module
            .exported_header
            .iter()
            .find(|s| matches!(s, Statement::VariableDeclaration { .. }))
            .expect("exported variable");
        let Statement::VariableDeclaration { value_type, .. } = exported_var else { unreachable!() };
        assert_eq!(*value_type, ValueType::Blob(Rc::from("geometry.point")));
    }

    #[test]
    fn unexported_definitions_are_absent_from_exported_header() {
        let parsed = parse_file("x s32 <- 1\n", "a.brc");
        let assembly = assemble(vec![parsed]);
        assert!(assembly.modules[0].exported_header.is_empty());
    }

    #[test]
    fn header_declares_before_defining() {
        let parsed = parse_file("f fun -> s32 :\nret 1\n;\n", "a.brc");
        let assembly = assemble(vec![parsed]);
        let module = &assembly.modules[0];
        assert!(matches!(module.header.last(), Some(Statement::FunctionDeclaration { .. })));
        assert!(matches!(module.body.last(), Some(Statement::Function { .. })));
    }

    #[test]
    fn blob_declaration_precedes_its_definition() {
        let parsed = parse_file("point blob : x s32\n", "a.brc");
        let assembly = assemble(vec![parsed]);
        let module = &assembly.modules[0];
        assert!(matches!(module.header[0], Statement::BlobDeclaration { .. }));
        assert!(matches!(module.header[1], Statement::Blob { .. }));
    }

    #[test]
    fn merging_two_files_concatenates_in_input_order() {
        let a = parse_file("a s32 <- 1\n", "a.brc");
        let b = parse_file("b s32 <- 2\n", "b.brc");
        let assembly = assemble(vec![a, b]);
        assert_eq!(assembly.modules.len(), 1);
        let module = &assembly.modules[0];
        assert_eq!(module.body.len(), 2);
        let names: Vec<_> = module.body.iter().filter_map(Statement::name).map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn exported_header_map_is_keyed_by_module_name() {
        let parsed = parse_file("@module geometry\n@export n s32 <- 1\n", "a.brc");
        let assembly = assemble(vec![parsed]);
        let key: Rc<str> = Rc::from("geometry");
        assert!(assembly.exported_headers.contains_key(&key));
    }
}
