//! Statement AST nodes.

use crate::{Expression, Location, ValueType};
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct FunctionArg {
    pub name: Rc<str>,
    pub value_type: ValueType,
}

#[derive(Clone, Debug)]
pub struct BlobField {
    pub name: Rc<str>,
    pub value_type: ValueType,
}

#[derive(Clone, Debug)]
pub enum Statement {
    /// `@module name` directive. Consumed by module assembly and absent
    /// from every `Module`'s header/body/exported-header lists.
    Module { name: Rc<str>, location: Location },

    MetaImport { module_name: Rc<str>, location: Location },

    MetaExternFunction {
        name: Rc<str>,
        args: Vec<FunctionArg>,
        return_type: ValueType,
        location: Location,
    },
    MetaExternVariable {
        name: Rc<str>,
        value_type: ValueType,
        location: Location,
    },

    Blob {
        should_export: bool,
        name: Rc<str>,
        fields: Vec<BlobField>,
        location: Location,
    },
    /// Synthesized by module assembly from a `Blob` definition: the
    /// forward declaration of a blob's name with no field list yet
    /// resolved cross-module.
    BlobDeclaration {
        should_export: bool,
        name: Rc<str>,
        location: Location,
    },

    Variable {
        should_export: bool,
        name: Rc<str>,
        value_type: ValueType,
        initializer: Option<Expression>,
        location: Location,
    },
    /// Synthesized forward declaration of a `Variable` definition.
    VariableDeclaration {
        should_export: bool,
        name: Rc<str>,
        value_type: ValueType,
        location: Location,
    },

    Function {
        should_export: bool,
        name: Rc<str>,
        args: Vec<FunctionArg>,
        return_type: ValueType,
        body: Box<Expression>,
        location: Location,
    },
    /// Synthesized forward declaration of a `Function` definition.
    FunctionDeclaration {
        should_export: bool,
        name: Rc<str>,
        args: Vec<FunctionArg>,
        return_type: ValueType,
        location: Location,
    },

    RawFunction {
        name: Rc<str>,
        constraints: Rc<str>,
        args: Vec<FunctionArg>,
        return_type: ValueType,
        assembly_lines: Vec<Rc<str>>,
        location: Location,
    },

    Assignment {
        target: Expression,
        value: Expression,
        location: Location,
    },

    Return {
        value: Option<Expression>,
        location: Location,
    },

    Repeat {
        init: Option<Box<Statement>>,
        pre_condition: Option<Expression>,
        post_statement: Option<Box<Statement>>,
        post_condition: Option<Expression>,
        body: Box<Statement>,
        location: Location,
    },

    Block {
        statements: Vec<Statement>,
        location: Location,
    },

    Expression { expr: Expression, location: Location },
}

impl Statement {
    pub fn location(&self) -> &Location {
        match self {
            Statement::Module { location, .. }
            | Statement::MetaImport { location, .. }
            | Statement::MetaExternFunction { location, .. }
            | Statement::MetaExternVariable { location, .. }
            | Statement::Blob { location, .. }
            | Statement::BlobDeclaration { location, .. }
            | Statement::Variable { location, .. }
            | Statement::VariableDeclaration { location, .. }
            | Statement::Function { location, .. }
            | Statement::FunctionDeclaration { location, .. }
            | Statement::RawFunction { location, .. }
            | Statement::Assignment { location, .. }
            | Statement::Return { location, .. }
            | Statement::Repeat { location, .. }
            | Statement::Block { location, .. }
            | Statement::Expression { location, .. } => location,
        }
    }

    pub fn should_export(&self) -> bool {
        match self {
            Statement::Blob { should_export, .. }
            | Statement::BlobDeclaration { should_export, .. }
            | Statement::Variable { should_export, .. }
            | Statement::VariableDeclaration { should_export, .. }
            | Statement::Function { should_export, .. }
            | Statement::FunctionDeclaration { should_export, .. } => *should_export,
            _ => false,
        }
    }

    pub fn name(&self) -> Option<&Rc<str>> {
        match self {
            Statement::Blob { name, .. }
            | Statement::BlobDeclaration { name, .. }
            | Statement::Variable { name, .. }
            | Statement::VariableDeclaration { name, .. }
            | Statement::Function { name, .. }
            | Statement::FunctionDeclaration { name, .. }
            | Statement::RawFunction { name, .. } => Some(name),
            _ => None,
        }
    }
}
