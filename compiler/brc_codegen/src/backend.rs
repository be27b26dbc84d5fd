//! `CodegenBackend`: the narrow interface `brc_codegen` exposes to an
//! external code-generation library. The real backend
//! (LLVM or equivalent) is explicitly out of scope; this trait is the only
//! thing the core commits to.

use crate::config::CompileConfig;
use crate::ir::IrModule;
use brc_diagnostic::BrcError;
use std::path::PathBuf;

/// Turns a verified `IrModule` into an on-disk artifact (object, assembly,
/// or textual IR per `config.output_kind`), returning the path written.
pub trait CodegenBackend {
    fn emit(&self, module: &IrModule, config: &CompileConfig) -> Result<PathBuf, BrcError>;
}

/// A backend that does nothing but report the path it would have written
/// to. Used by tests and by `brcc` when no real code generator is linked
/// in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullBackend;

impl CodegenBackend for NullBackend {
    fn emit(&self, module: &IrModule, config: &CompileConfig) -> Result<PathBuf, BrcError> {
        Ok(PathBuf::from(format!("{}.{}", module.name, config.output_kind.extension())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_backend_names_output_by_module_and_kind() {
        let module = IrModule::new("main");
        let config = CompileConfig::default();
        let path = NullBackend.emit(&module, &config).unwrap();
        assert_eq!(path, PathBuf::from("main.asm"));
    }
}
