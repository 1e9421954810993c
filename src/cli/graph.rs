use super::{finish, print_diagnostics, run_pass, Options};
use std::path::Path;
use stitch::core::StitchResult;

pub fn run(options: &Options, setup: &Path, dot: bool) -> StitchResult<()> {
    let pass = run_pass(options, setup)?;
    print_diagnostics(&pass);

    let snapshot = pass.output.graph.snapshot();
    if dot {
        print!("{}", snapshot.to_dot());
    } else {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    finish(&pass)
}
