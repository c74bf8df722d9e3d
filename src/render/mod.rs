// src/render/mod.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use glob::glob;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info};

/// Renderer invocations run at once.
pub const DEFAULT_WORKERS: usize = 4;

/// One renderer invocation's result.
#[derive(Debug, Serialize)]
pub struct RenderOutcome {
    pub source: PathBuf,
    /// `None` on success; otherwise the renderer or spawn error text.
    pub error: Option<String>,
}

/// Bookkeeping for a whole render run, written out as JSON.
#[derive(Debug, Serialize)]
pub struct RenderSummary {
    pub total: usize,
    pub rendered: usize,
    pub failed: usize,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub outcomes: Vec<RenderOutcome>,
}

/// Find every `.puml` source under `dir`, recursively, sorted by path.
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.puml", dir.display());
    let mut sources: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("bad glob pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    sources.sort();
    Ok(sources)
}

/// Render one diagram to PNG next to its source.
fn render_one(jar: &Path, source: &Path) -> Result<()> {
    let output = Command::new("java")
        .arg("-jar")
        .arg(jar)
        .arg("-tpng")
        .arg(source)
        .output()
        .with_context(|| format!("spawning renderer for {}", source.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("renderer exited with {}: {}", output.status, stderr.trim());
    }
    Ok(())
}

/// Render every source on a fixed-size pool.
///
/// Each file is an independent unit: a failure is captured in its outcome and
/// the rest of the batch still runs. No retries, and completion order is
/// whatever the pool produces; outcomes come back in source order regardless.
pub fn render_all(jar: &Path, sources: Vec<PathBuf>, workers: usize) -> Result<RenderSummary> {
    let started = Utc::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building render pool")?;

    let outcomes: Vec<RenderOutcome> = pool.install(|| {
        sources
            .into_par_iter()
            .map(|source| {
                info!("processing {}", source.display());
                let error = render_one(jar, &source).err().map(|e| format!("{:#}", e));
                if let Some(err) = &error {
                    error!("error processing {}: {}", source.display(), err);
                }
                RenderOutcome { source, error }
            })
            .collect()
    });

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    Ok(RenderSummary {
        total: outcomes.len(),
        rendered: outcomes.len() - failed,
        failed,
        started,
        finished: Utc::now(),
        outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "@startuml\n@enduml\n").unwrap();
        path
    }

    #[test]
    fn discovers_nested_sources_sorted() {
        let tmp = TempDir::new().unwrap();
        let b = touch(tmp.path(), "sub/deep/b.puml");
        let a = touch(tmp.path(), "a.puml");
        touch(tmp.path(), "sub/readme.md");

        let sources = discover_sources(tmp.path()).unwrap();
        assert_eq!(sources, vec![a, b]);
    }

    #[test]
    fn no_sources_is_fine() {
        let tmp = TempDir::new().unwrap();
        assert!(discover_sources(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn failures_are_contained_per_file() {
        let tmp = TempDir::new().unwrap();
        let sources = vec![
            touch(tmp.path(), "one.puml"),
            touch(tmp.path(), "two.puml"),
        ];

        // A jar that doesn't exist: whether java itself is present or not,
        // every invocation fails, and every file still gets an outcome.
        let jar = tmp.path().join("missing.jar");
        let summary = render_all(&jar, sources.clone(), 2).unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.rendered, 0);
        assert_eq!(summary.outcomes.len(), 2);
        for (outcome, source) in summary.outcomes.iter().zip(&sources) {
            assert_eq!(&outcome.source, source);
            assert!(outcome.error.is_some());
        }
        assert!(summary.finished >= summary.started);
    }
}
