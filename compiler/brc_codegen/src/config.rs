//! `CompileConfig`: everything a `CodegenBackend` needs besides the IR
//! module itself.

use std::rc::Rc;

/// What artifact kind the backend should emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OutputKind {
    Object,
    #[default]
    Assembly,
    Ir,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Object => "o",
            OutputKind::Assembly => "asm",
            OutputKind::Ir => "ir",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RelocModel {
    Static,
    #[default]
    Pic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CodeModel {
    Tiny,
    #[default]
    Small,
    Kernel,
    Medium,
    Large,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OptLevel {
    O0,
    O1,
    #[default]
    O2,
    O3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CallingConvention {
    #[default]
    Cdecl,
    Stdcall,
    Fastcall,
    Tail,
}

/// Option bits: independent toggles, not mutually exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct OptionFlags {
    pub section_per_function: bool,
    pub no_bss: bool,
    pub stack_sizes: bool,
}

/// Everything the driver (`brcc`) collects from argv and hands to the
/// emitted `IrModule` plus an implementing `CodegenBackend`. Target triple
/// and CPU default to the host when absent, which is a backend concern —
/// `brc_codegen` only carries the strings through.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompileConfig {
    pub output_kind: OutputKind,
    pub target_triple: Option<Rc<str>>,
    pub cpu: Option<Rc<str>>,
    pub reloc_model: RelocModel,
    pub code_model: CodeModel,
    pub opt_level: OptLevel,
    pub calling_convention: CallingConvention,
    pub options: OptionFlags,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            output_kind: OutputKind::default(),
            target_triple: None,
            cpu: None,
            reloc_model: RelocModel::default(),
            code_model: CodeModel::default(),
            opt_level: OptLevel::default(),
            calling_convention: CallingConvention::default(),
            options: OptionFlags::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_pic_small_o2_cdecl() {
        let config = CompileConfig::default();
        assert_eq!(config.reloc_model, RelocModel::Pic);
        assert_eq!(config.code_model, CodeModel::Small);
        assert_eq!(config.opt_level, OptLevel::O2);
        assert_eq!(config.calling_convention, CallingConvention::Cdecl);
    }

    #[test]
    fn output_kind_extensions() {
        assert_eq!(OutputKind::Object.extension(), "o");
        assert_eq!(OutputKind::Assembly.extension(), "asm");
        assert_eq!(OutputKind::Ir.extension(), "ir");
    }
}
