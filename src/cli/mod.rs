//! Command implementations

pub mod check;
pub mod generate;
pub mod graph;

use std::path::{Path, PathBuf};
use stitch::core::{CollectingSink, Severity, StitchError, StitchResult};
use stitch::di::ServiceContainer;
use stitch::setup::Setup;
use stitch::{GenerationOutput, Generator};

/// Flags shared by every command
pub struct Options {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// A finished generator pass and everything it reported
pub struct Pass {
    pub output: GenerationOutput,
    pub sink: CollectingSink,
    pub verbose: bool,
    pub emit_graph: bool,
}

/// Load config and setup document, then run one generator pass
///
/// When the pass fails outright, whatever was reported before the failure
/// is printed before the error is returned.
pub fn run_pass(options: &Options, setup_path: &Path) -> StitchResult<Pass> {
    let setup = Setup::load(setup_path)?;
    let mut sink = CollectingSink::new();

    match generate(options, &setup, &mut sink) {
        Ok((output, verbose, emit_graph)) => Ok(Pass {
            output,
            sink,
            verbose,
            emit_graph,
        }),
        Err(e) => {
            report(&sink, options.verbose);
            Err(e)
        }
    }
}

fn generate(
    options: &Options,
    setup: &Setup,
    sink: &mut CollectingSink,
) -> StitchResult<(GenerationOutput, bool, bool)> {
    let compiled = setup.compile(sink)?;

    let container = ServiceContainer::new(options.config.as_deref(), compiled.metadata)?;
    let config = container.config();
    let generator = Generator::new(compiled.registry.snapshot(), container.metadata(), config);
    let output = generator.run(&compiled.composition, &compiled.roots, sink)?;

    Ok((output, options.verbose || config.verbose(), config.emit_graph()))
}

/// Print diagnostics to stderr; informational ones only in verbose mode
pub fn print_diagnostics(pass: &Pass) {
    report(&pass.sink, pass.verbose);
}

fn report(sink: &CollectingSink, verbose: bool) {
    for diagnostic in sink.diagnostics() {
        if diagnostic.severity == Severity::Info && !verbose {
            continue;
        }
        eprintln!("{}", diagnostic);
        if let Some(root) = &diagnostic.root {
            eprintln!("  in root '{}'", root);
        }
        if !diagnostic.chain.is_empty() {
            eprintln!("  chain: {}", diagnostic.chain_text());
        }
    }
}

/// Fail when any error diagnostic was reported
pub fn finish(pass: &Pass) -> StitchResult<()> {
    match pass.sink.error_count() {
        0 => Ok(()),
        count => Err(StitchError::GenerationFailed(count)),
    }
}
