//! Application enumeration on Linux

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use warden_host_api::{AppCatalog, HostError, HostResult};

const DEFAULT_XDG_DATA_DIRS: &str = "/usr/local/share:/usr/share";

/// Catalog backed by `/proc` and `.desktop` files
#[derive(Debug, Clone)]
pub struct LinuxCatalog {
    proc_root: PathBuf,
    application_dirs: Vec<PathBuf>,
}

impl LinuxCatalog {
    /// Catalog over the live system
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            application_dirs: default_application_dirs(),
        }
    }

    /// Catalog over custom roots (used by tests and containers)
    pub fn with_roots(proc_root: impl Into<PathBuf>, application_dirs: Vec<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            application_dirs,
        }
    }

    /// Names of running processes: `comm` plus the basename of `argv[0]`
    fn scan_processes(&self) -> HostResult<BTreeSet<String>> {
        let entries = fs::read_dir(&self.proc_root).map_err(|e| {
            HostError::EnumerationFailed(format!(
                "Failed to read {}: {}",
                self.proc_root.display(),
                e
            ))
        })?;

        let mut names = BTreeSet::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str() else {
                continue;
            };
            if !pid.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }

            // Processes can exit mid-scan; unreadable entries are skipped.
            let dir = entry.path();
            if let Ok(comm) = fs::read_to_string(dir.join("comm")) {
                let comm = comm.trim();
                if !comm.is_empty() {
                    names.insert(comm.to_string());
                }
            }
            if let Ok(cmdline) = fs::read(dir.join("cmdline"))
                && let Some(name) = argv0_basename(&cmdline)
            {
                names.insert(name);
            }
        }

        trace!(count = names.len(), "Scanned running processes");
        Ok(names)
    }

    /// Desktop entry stems and `Exec=` binaries from application directories
    fn scan_desktop_entries(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();

        for dir in &self.application_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("desktop") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.insert(stem.to_string());
                }
                if let Some(exec) = read_exec_name(&path) {
                    names.insert(exec);
                }
            }
        }

        debug!(count = names.len(), "Scanned desktop entries");
        names
    }
}

impl Default for LinuxCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl AppCatalog for LinuxCatalog {
    fn known_apps(&self) -> HostResult<BTreeSet<String>> {
        let mut apps = self.scan_desktop_entries();
        apps.extend(self.scan_processes()?);
        Ok(apps)
    }

    fn running_apps(&self) -> HostResult<BTreeSet<String>> {
        self.scan_processes()
    }
}

fn default_application_dirs() -> Vec<PathBuf> {
    let mut dirs_out = Vec::new();

    if let Some(data_dir) = dirs::data_dir() {
        dirs_out.push(data_dir.join("applications"));
    }

    let data_dirs = std::env::var("XDG_DATA_DIRS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_XDG_DATA_DIRS.to_string());
    for dir in data_dirs.split(':').filter(|d| !d.is_empty()) {
        dirs_out.push(PathBuf::from(dir).join("applications"));
    }

    dirs_out
}

fn argv0_basename(cmdline: &[u8]) -> Option<String> {
    let argv0 = cmdline.split(|b| *b == 0).next()?;
    let argv0 = std::str::from_utf8(argv0).ok()?;
    // Kernel threads have an empty cmdline; some processes rewrite argv[0] with spaces.
    let program = argv0.split_whitespace().next()?;
    basename(program)
}

fn read_exec_name(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let exec = content
        .lines()
        .find_map(|line| line.trim().strip_prefix("Exec="))?;
    // Skip `env VAR=value` wrappers to reach the real program.
    let program = exec
        .split_whitespace()
        .find(|token| *token != "env" && !token.contains('='))?;
    basename(program.trim_matches('"'))
}

fn basename(program: &str) -> Option<String> {
    let name = Path::new(program).file_name()?.to_str()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
