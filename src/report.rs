// src/report.rs
//! Report model, its text rendering, and the store that keeps the last
//! completed report both in memory and on disk.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::listing::PostDescriptor;
use crate::sentiment::SentimentScores;

const SEPARATOR_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostResult {
    pub descriptor: PostDescriptor,
    pub resolved_url: String,
    pub content: String,
    pub scores: SentimentScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub average_compound: f64,
    /// Listing order.
    pub results: Vec<PostResult>,
}

impl Report {
    /// Build from results in listing order; the average over zero posts is 0.
    pub fn from_results(results: Vec<PostResult>) -> Self {
        Self {
            average_compound: average_compound(&results),
            results,
        }
    }

    /// The flat text artifact: average first, then one block per post.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let sep = "=".repeat(SEPARATOR_WIDTH);
        let _ = write!(
            out,
            "Average Compound Score: {}\n\n",
            py_float(self.average_compound)
        );
        for r in &self.results {
            let _ = write!(
                out,
                "Title: {}\nLink: {}\nDate: {}\nContent:\n{}\n\nSentiment Scores: {}\n{}\n\n",
                r.descriptor.title, r.resolved_url, r.descriptor.date, r.content, r.scores, sep
            );
        }
        out
    }
}

/// Float text the way Python's `repr` writes it: shortest round-trip digits,
/// a decimal point for integral values, and a signed two-digit exponent
/// (`5e-06`, `1e+16`) outside `1e-4..1e16`.
pub fn py_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let s = format!("{v:?}");
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp.trim_start_matches('+')),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => s,
    }
}

pub fn average_compound(results: &[PostResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.scores.compound).sum::<f64>() / results.len() as f64
}

/// Last completed report: a memory slot plus the file artifact it mirrors.
/// Failed runs never touch either.
#[derive(Debug)]
pub struct ReportStore {
    path: PathBuf,
    latest: RwLock<Option<Arc<str>>>,
}

impl ReportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            latest: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name offered to downloads.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sentiment_analysis.txt".to_string())
    }

    /// Sibling file the next artifact is staged in before the rename.
    fn staging_path(&self) -> PathBuf {
        self.path.with_file_name(format!(".{}.tmp", self.file_name()))
    }

    /// Write the artifact, then swap the memory slot. The slot only changes
    /// once the file is on disk; readers of the file see the old or the new
    /// report, never a partial one.
    pub async fn publish(&self, text: String) -> Result<Arc<str>> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let staging = self.staging_path();
        tokio::fs::write(&staging, text.as_bytes())
            .await
            .with_context(|| format!("writing report to {}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("moving report into {}", self.path.display()))?;

        let text: Arc<str> = Arc::from(text);
        match self.latest.write() {
            Ok(mut slot) => *slot = Some(text.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(text.clone()),
        }
        Ok(text)
    }

    pub fn latest(&self) -> Option<Arc<str>> {
        match self.latest.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Raw bytes of the artifact on disk, `None` if nothing was written yet.
    pub async fn read_artifact(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}
