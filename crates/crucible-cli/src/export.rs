//! Writes a finished run to disk

use anyhow::{Context, Result};
use crucible_orchestrator::Solution;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written for every run, relative to the project directory
pub const EXPORTED_FILES: [&str; 6] = [
    "architecture.md",
    "code.md",
    "tests.md",
    "documentation.md",
    "solution.json",
    "REPORT.txt",
];

/// Write `solution` under `<output_dir>/<project>/`, returning that directory
pub async fn export_solution(solution: &Solution, project: &str, output_dir: &Path) -> Result<PathBuf> {
    let dir = output_dir.join(project);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let artifacts = &solution.artifacts;
    let documents = [
        ("architecture.md", "Architecture", &artifacts.architecture),
        ("code.md", "Code", &artifacts.code),
        ("tests.md", "Tests", &artifacts.tests),
        ("documentation.md", "Documentation", &artifacts.documentation),
    ];
    for (file, title, body) in documents {
        let text = format!("# {}: {}\n\n{}\n", title, project, body);
        write(&dir.join(file), &text).await?;
    }

    let json = serde_json::to_string_pretty(solution).context("Failed to serialize solution")?;
    write(&dir.join("solution.json"), &json).await?;

    let report = solution.report(project).to_string();
    write(&dir.join("REPORT.txt"), &report).await?;

    info!("Exported {} files to {}", EXPORTED_FILES.len(), dir.display());
    Ok(dir)
}

async fn write(path: &Path, contents: &str) -> Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Directory-safe project name derived from free text
pub fn project_slug(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(4)
        .map(|w| w.to_lowercase())
        .collect();

    if words.is_empty() {
        "project".to_string()
    } else {
        words.join("-")
    }
}
