use super::{finish, print_diagnostics, run_pass, Options};
use std::path::Path;
use stitch::core::{Severity, StitchResult};

pub fn run(options: &Options, setup: &Path) -> StitchResult<()> {
    let pass = run_pass(options, setup)?;
    print_diagnostics(&pass);

    let roots = pass.output.graph.roots();
    let resolved = roots.iter().filter(|r| r.is_resolved()).count();
    let warnings = pass
        .sink
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();

    if resolved == roots.len() && !pass.sink.has_errors() {
        println!("✓ All {} root(s) of '{}' resolved", roots.len(), pass.output.code.composition);
    } else {
        println!("❌ {} of {} root(s) resolved", resolved, roots.len());
        println!("  {} error(s)", pass.sink.error_count());
    }
    if warnings > 0 {
        println!("  {} warning(s)", warnings);
    }

    finish(&pass)
}
