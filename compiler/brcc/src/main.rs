//! BRC compiler driver.
//!
//! Reads one or more source files, runs them through lex → parse → module
//! assembly → analysis → IR building → backend emission, in that order,
//! and prints diagnostics as they accumulate. Mirrors spec'd exit codes:
//! 0 on success, 1 if any phase accumulated errors or no input files were
//! given.

mod tracing_setup;

use brc_codegen::backend::{CodegenBackend, NullBackend};
use brc_codegen::config::{CallingConvention, CodeModel, CompileConfig, OptLevel, OptionFlags, OutputKind, RelocModel};
use brc_diagnostic::{Diagnostics, Logger, Verbosity};
use brc_modules::assemble;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;
use tracing::info_span;

struct Options {
    inputs: Vec<String>,
    verbosity: Verbosity,
    config: CompileConfig,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut inputs = Vec::new();
    let mut verbosity = Verbosity::V1;
    let mut config = CompileConfig::default();

    for arg in args {
        if let Some(value) = arg.strip_prefix("--verbosity=") {
            verbosity = match value {
                "0" => Verbosity::V0,
                "1" => Verbosity::V1,
                "2" => Verbosity::V2,
                "3" => Verbosity::V3,
                other => return Err(format!("invalid --verbosity value \"{other}\"")),
            };
        } else if let Some(value) = arg.strip_prefix("--gen=") {
            config.output_kind = match value {
                "object" => OutputKind::Object,
                "assembly" => OutputKind::Assembly,
                "ir" => OutputKind::Ir,
                other => return Err(format!("invalid --gen value \"{other}\"")),
            };
        } else if let Some(value) = arg.strip_prefix("--triple=") {
            config.target_triple = Some(Rc::from(value));
        } else if let Some(value) = arg.strip_prefix("--arch=") {
            config.cpu = Some(Rc::from(value));
        } else if let Some(value) = arg.strip_prefix("--reloc=") {
            config.reloc_model = match value {
                "static" => RelocModel::Static,
                "pic" => RelocModel::Pic,
                other => return Err(format!("invalid --reloc value \"{other}\"")),
            };
        } else if let Some(value) = arg.strip_prefix("--code-model=") {
            config.code_model = match value {
                "tiny" => CodeModel::Tiny,
                "small" => CodeModel::Small,
                "kernel" => CodeModel::Kernel,
                "medium" => CodeModel::Medium,
                "large" => CodeModel::Large,
                other => return Err(format!("invalid --code-model value \"{other}\"")),
            };
        } else if let Some(value) = arg.strip_prefix("--opt=") {
            config.opt_level = match value {
                "0" => OptLevel::O0,
                "1" => OptLevel::O1,
                "2" => OptLevel::O2,
                "3" => OptLevel::O3,
                other => return Err(format!("invalid --opt value \"{other}\"")),
            };
        } else if let Some(value) = arg.strip_prefix("--cc=") {
            config.calling_convention = match value {
                "cdecl" => CallingConvention::Cdecl,
                "stdcall" => CallingConvention::Stdcall,
                "fastcall" => CallingConvention::Fastcall,
                "tail" => CallingConvention::Tail,
                other => return Err(format!("invalid --cc value \"{other}\"")),
            };
        } else if arg == "--section-per-function" {
            config.options.section_per_function = true;
        } else if arg == "--no-bss" {
            config.options.no_bss = true;
        } else if arg == "--stack-sizes" {
            config.options.stack_sizes = true;
        } else if arg.starts_with('-') {
            return Err(format!("unknown option \"{arg}\""));
        } else {
            inputs.push(arg.clone());
        }
    }

    Ok(Options { inputs, verbosity, config })
}

fn print_usage() {
    println!("BRC Compiler");
    println!();
    println!("Usage: brcc [options] <file.brc>...");
    println!();
    println!("Options:");
    println!("  --verbosity=<0-3>     0 errors only, 1 phase status (default), 2 + timings, 3 + dumps");
    println!("  --gen=<kind>          object (default assembly), assembly, ir");
    println!("  --triple=<triple>     target triple (default: host)");
    println!("  --arch=<cpu>          target CPU name (default: host)");
    println!("  --reloc=<model>       static, pic (default)");
    println!("  --code-model=<model>  tiny, small (default), kernel, medium, large");
    println!("  --opt=<level>         0, 1, 2 (default), 3");
    println!("  --cc=<convention>     cdecl (default), stdcall, fastcall, tail");
    println!("  --section-per-function  place each function in its own section");
    println!("  --no-bss              disable BSS zero-init");
    println!("  --stack-sizes         emit a stack-sizes section");
    println!("  --version             show version information");
    println!("  --help                show this help message");
}

fn read_source(path: &str) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("cannot open file {path}: {e}"))
}

fn main() -> ExitCode {
    tracing_setup::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h" || a == "help") {
        print_usage();
        return ExitCode::SUCCESS;
    }
    if args.iter().any(|a| a == "--version" || a == "-v" || a == "version") {
        println!("brcc {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    if options.inputs.is_empty() {
        eprintln!("no input files given");
        print_usage();
        return ExitCode::FAILURE;
    }

    run(options)
}

fn run(options: Options) -> ExitCode {
    let logger = Logger::new(options.verbosity);

    let lex_parse_span = info_span!("lex_parse");
    let _enter = lex_parse_span.enter();
    logger.print_phase_status("lex + parse");
    let lex_parse_start = Instant::now();

    let mut diagnostics = Diagnostics::new();
    let mut parsed_files = Vec::new();
    for path in &options.inputs {
        let source = match read_source(path) {
            Ok(source) => source,
            Err(message) => {
                eprintln!("{message}");
                return ExitCode::FAILURE;
            }
        };
        let tokens = match brc_lexer::tokenize(&source, path.as_str()) {
            Ok(tokens) => tokens,
            Err(error) => {
                diagnostics.push(error);
                continue;
            }
        };
        if logger.dumps_enabled() {
            for token in &tokens {
                println!("  {}", brc_diagnostic::token_kind_symbol(&token.kind, &token.lexeme));
            }
        }
        match brc_parse::parse(&tokens) {
            Ok(parsed) => parsed_files.push(parsed),
            Err(error) => diagnostics.push(error),
        }
    }
    logger.print_phase_timing("lex + parse", lex_parse_start.elapsed().as_secs_f64() * 1000.0);
    drop(_enter);

    if !diagnostics.is_empty() {
        logger.print_errors(&diagnostics);
        return ExitCode::FAILURE;
    }

    let assembly = assemble(parsed_files);

    let analyze_span = info_span!("analyze");
    let _enter = analyze_span.enter();
    logger.print_phase_status("analyze");
    let analyze_start = Instant::now();
    let mut modules = assembly.modules;
    for module in &mut modules {
        diagnostics.extend(brc_typeck::analyze_module(module, &assembly.exported_headers));
    }
    logger.print_phase_timing("analyze", analyze_start.elapsed().as_secs_f64() * 1000.0);
    drop(_enter);

    if !diagnostics.is_empty() {
        logger.print_errors(&diagnostics);
        return ExitCode::FAILURE;
    }

    let build_span = info_span!("build");
    let _enter = build_span.enter();
    logger.print_phase_status("build");
    let build_start = Instant::now();
    let mut ir_modules = Vec::with_capacity(modules.len());
    for module in &modules {
        let (ir_module, module_diagnostics) = brc_codegen::build_module(module, &assembly.exported_headers, options.config.clone());
        diagnostics.extend(module_diagnostics);
        ir_modules.push(ir_module);
    }
    logger.print_phase_timing("build", build_start.elapsed().as_secs_f64() * 1000.0);
    drop(_enter);

    if !diagnostics.is_empty() {
        logger.print_errors(&diagnostics);
        return ExitCode::FAILURE;
    }

    logger.print_phase_status("emit");
    let backend = NullBackend;
    for ir_module in &ir_modules {
        match backend.emit(ir_module, &options.config) {
            Ok(path) => {
                if options.verbosity >= Verbosity::V1 {
                    println!("Generated: {}", path.display());
                }
            }
            Err(error) => {
                eprintln!("{error}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
