//! Page naming sequencer.
//!
//! Capture files live under `<workflow>/raw/` as zero-padded, width-3
//! numeric names (`000.jpg`, `001.jpg`, ...). Zero padding keeps the
//! lexicographic sort order numerically correct, which the sequencer relies
//! on when it reads the last existing number.

use std::path::{Path, PathBuf};

use crate::device::TargetPage;

pub fn raw_dir(workflow_path: &Path) -> PathBuf {
    workflow_path.join("raw")
}

pub fn out_dir(workflow_path: &Path) -> PathBuf {
    workflow_path.join("out")
}

/// Sorted listing of the raw capture files, empty when none were shot yet.
pub fn list_raw_files(workflow_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    list_sorted(&raw_dir(workflow_path))
}

/// Sorted listing of the generated output files.
pub fn list_out_files(workflow_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    list_sorted(&out_dir(workflow_path))
}

fn list_sorted(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        files.push(entry?.path());
    }
    files.sort();
    Ok(files)
}

fn last_page_number(raw_files: &[PathBuf]) -> i64 {
    raw_files
        .last()
        .and_then(|path| path.file_stem())
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse::<i64>().ok())
        .unwrap_or(-1)
}

/// Number the next capture should be stored under.
///
/// With two devices in alternating odd/even roles this yields an interleaved
/// sequence as long as both devices shoot every round; a lone odd or even
/// device will leave gaps. A role-less device just follows the shot counter.
pub fn next_page_number(raw_files: &[PathBuf], pages_shot: usize, target: Option<TargetPage>) -> i64 {
    match target {
        None => pages_shot as i64,
        Some(TargetPage::Odd) => last_page_number(raw_files) + 2,
        Some(TargetPage::Even) => last_page_number(raw_files) + 1,
    }
}

/// Absolute path the next capture for `target` should be stored as.
pub fn next_capture_path(
    workflow_path: &Path,
    raw_files: &[PathBuf],
    pages_shot: usize,
    target: Option<TargetPage>,
    extension: &str,
) -> PathBuf {
    let number = next_page_number(raw_files, pages_shot, target);
    raw_dir(workflow_path).join(format!("{number:03}.{extension}"))
}
