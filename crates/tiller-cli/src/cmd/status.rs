use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use tiller_core::config::ProjectConfig;
use tiller_core::docs::DocFile;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = ProjectConfig::load(root).context("failed to load tiller.yaml")?;
    let docs_dir = config.docs_path(root);

    if json {
        #[derive(serde::Serialize)]
        struct DocStatus {
            document: &'static str,
            filename: &'static str,
            present: bool,
        }

        #[derive(serde::Serialize)]
        struct StatusOutput {
            docs_dir: String,
            repo: Option<String>,
            documents: Vec<DocStatus>,
        }

        let documents = DocFile::all()
            .iter()
            .map(|f| DocStatus {
                document: f.as_str(),
                filename: f.filename(),
                present: docs_dir.join(f.filename()).is_file(),
            })
            .collect();
        return print_json(&StatusOutput {
            docs_dir: docs_dir.display().to_string(),
            repo: config.repo.clone(),
            documents,
        });
    }

    println!("Documents: {}", docs_dir.display());
    match &config.repo {
        Some(repo) => println!("Repository: {}", repo),
        None => println!("Repository: (not configured)"),
    }
    println!();

    let rows: Vec<Vec<String>> = DocFile::all()
        .iter()
        .map(|f| {
            let present = docs_dir.join(f.filename()).is_file();
            vec![
                f.filename().to_string(),
                if present { "present" } else { "missing" }.to_string(),
            ]
        })
        .collect();
    print_table(&["FILE", "STATUS"], rows);
    Ok(())
}
