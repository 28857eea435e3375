use crate::output::print_json;
use anyhow::{bail, Context};
use std::path::Path;
use tiller_core::config::ProjectConfig;
use tiller_core::docs::FsStore;
use tiller_core::engine::{execution_mode, Engine, ExecutionMode, WorkflowStart};
use tiller_core::proposal::{ProposalSet, Selection, SelectionAction};

pub fn run(root: &Path, workflow: &str, yes: bool, json: bool) -> anyhow::Result<()> {
    let config = ProjectConfig::load(root).context("failed to load tiller.yaml")?;
    let docs_dir = config.docs_path(root);
    let mut store = FsStore::new(&docs_dir);
    let mut engine = Engine::new(config).context("failed to build workflow catalog")?;

    let def = engine.catalog().get(workflow)?;
    match execution_mode(def) {
        ExecutionMode::NonAi => {}
        _ => bail!(
            "workflow '{}' needs a text-generation host; run it from an \
             integrated editor or agent",
            workflow
        ),
    }

    match engine.start(workflow, &store)? {
        WorkflowStart::Nothing { status, .. } => {
            if json {
                #[derive(serde::Serialize)]
                struct Nothing<'a> {
                    workflow: &'a str,
                    status: &'a str,
                }
                return print_json(&Nothing { workflow, status: &status });
            }
            println!("{}: {}", workflow, status);
            Ok(())
        }
        WorkflowStart::PendingReady { count, .. } => {
            let pending = engine
                .pending()
                .context("pending proposals missing after start")?;

            if !yes {
                if json {
                    return print_json(pending);
                }
                print_preview(&pending.set);
                println!("\n{} proposal(s). Re-run with --yes to apply all.", count);
                return Ok(());
            }

            let selections = select_all(&pending.set);
            let report = engine.apply(&selections, &mut store)?;
            if json {
                return print_json(&report);
            }
            let written: Vec<&str> = report.written.iter().map(|f| f.filename()).collect();
            println!(
                "{}: applied {} proposal(s), wrote [{}]",
                report.workflow,
                report.applied,
                written.join(", ")
            );
            Ok(())
        }
        other => bail!("unexpected start outcome: {other:?}"),
    }
}

/// The apply-all selection for each direct family.
fn select_all(set: &ProposalSet) -> Vec<Selection> {
    let action = match set {
        ProposalSet::Harvest { .. } => SelectionAction::Move,
        ProposalSet::ArchiveCompleted { .. } => SelectionAction::Archive,
        ProposalSet::PromoteNext { .. } => SelectionAction::Current,
        _ => SelectionAction::Accept,
    };
    (0..set.len()).map(|id| Selection::new(id, action)).collect()
}

fn print_preview(set: &ProposalSet) {
    match set {
        ProposalSet::Harvest { entities } => {
            for block in entities {
                match &block.entry {
                    Some(entry) => println!("block at {} ({})", block.span.start + 1, entry.time),
                    None => println!("block at line {}", block.span.start + 1),
                }
                for task in &block.tasks {
                    println!("  [{}] {}", task.id, task.text);
                }
            }
        }
        ProposalSet::ArchiveCompleted { entities } => {
            for group in entities {
                match &group.slice {
                    Some(slice) => println!("{}", slice.heading()),
                    None => println!("Completed Tasks"),
                }
                for task in &group.tasks {
                    println!("  [{}] {}", task.id, task.text);
                }
            }
        }
        ProposalSet::PromoteNext { pool } => {
            println!("pool status: {:?}", pool.status);
            for task in &pool.tasks {
                println!("  [{}] {}", task.id, task.text);
            }
        }
        // AI-backed sets never reach the CLI preview.
        _ => {}
    }
}
