use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use tiller_core::catalog::{Catalog, WorkflowDefinition};
use tiller_core::docs::DocFile;
use tiller_core::engine::{execution_mode, ExecutionMode};

pub fn run(_root: &Path, json: bool) -> anyhow::Result<()> {
    let catalog = Catalog::new().context("failed to build workflow catalog")?;

    if json {
        #[derive(serde::Serialize)]
        struct Entry<'a> {
            name: &'a str,
            display_name: &'a str,
            mode: ExecutionMode,
            risk: String,
            reads: Vec<&'static str>,
            writes: Vec<&'static str>,
            steps: Vec<&'a str>,
        }

        let entries: Vec<Entry> = catalog
            .all()
            .iter()
            .map(|d| Entry {
                name: d.name,
                display_name: d.display_name,
                mode: execution_mode(d),
                risk: d.risk.to_string(),
                reads: doc_names(d.reads),
                writes: doc_names(d.writes),
                steps: d.combined_steps.to_vec(),
            })
            .collect();
        return print_json(&entries);
    }

    let rows: Vec<Vec<String>> = catalog.all().iter().map(row).collect();
    print_table(&["NAME", "MODE", "RISK", "READS", "WRITES"], rows);
    Ok(())
}

fn doc_names(files: &[DocFile]) -> Vec<&'static str> {
    files.iter().map(|f| f.as_str()).collect()
}

fn row(d: &WorkflowDefinition) -> Vec<String> {
    let mode = match execution_mode(d) {
        ExecutionMode::NonAi => "direct",
        ExecutionMode::Combined => "combined",
        ExecutionMode::FocusedFile => "ai (focused)",
        ExecutionMode::InputModal => "ai (input)",
        ExecutionMode::StandardAi => "ai",
    };
    vec![
        d.name.to_string(),
        mode.to_string(),
        d.risk.to_string(),
        doc_names(d.reads).join(","),
        doc_names(d.writes).join(","),
    ]
}
