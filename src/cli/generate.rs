use super::{finish, print_diagnostics, run_pass, Options};
use crate::Format;
use serde::Serialize;
use std::fs;
use std::path::Path;
use stitch::core::StitchResult;
use stitch::emit::CompositionCode;
use stitch::graph::GraphSnapshot;

/// What `generate` writes: the composition, plus the graph when configured
#[derive(Serialize)]
struct Document<'a> {
    #[serde(flatten)]
    code: &'a CompositionCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph: Option<&'a GraphSnapshot>,
}

pub fn run(
    options: &Options,
    setup: &Path,
    format: Format,
    out: Option<&Path>,
    graph_out: Option<&Path>,
) -> StitchResult<()> {
    let pass = run_pass(options, setup)?;
    print_diagnostics(&pass);

    let snapshot = pass.output.graph.snapshot();
    let document = Document {
        code: &pass.output.code,
        graph: pass.emit_graph.then_some(&snapshot),
    };
    let rendered = render(&document, format)?;

    match out {
        Some(path) => {
            fs::write(path, rendered)?;
            eprintln!(
                "✓ Wrote {} root(s) of '{}' to {}",
                pass.output.code.roots.len(),
                pass.output.code.composition,
                path.display()
            );
        }
        None => print!("{}", rendered),
    }

    if let Some(path) = graph_out {
        fs::write(path, serde_json::to_string_pretty(&snapshot)? + "\n")?;
    }

    finish(&pass)
}

fn render(document: &Document<'_>, format: Format) -> StitchResult<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(document)? + "\n",
        Format::Yaml => serde_yaml::to_string(document)?,
    })
}
