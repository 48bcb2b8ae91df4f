//! # Program Cache
//!
//! Composite filters reference precompiled GPU programs by file name. The
//! cache resolves a file name under the shader directory, asks the host's
//! compiler for it once, and hands the same `Arc` to every filter that asks
//! again. Entries are never evicted.
//!
//! Lookups for different paths do not block each other: the map lock is only
//! held long enough to fetch the per-path cell, and the cell guarantees a
//! single compilation even when several graphs are built concurrently.

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::filters;

#[derive(Debug, Clone, Error)]
pub enum ProgramError {
    #[error("Program not found: {0:?}")]
    NotFound(PathBuf),
    #[error("Failed to compile {path:?}: {message}")]
    Compile { path: PathBuf, message: String },
}

/// Host-side handle identity of a compiled program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ProgramId(pub u64);

#[derive(Debug, PartialEq, Eq)]
pub struct CompiledProgram {
    pub id: ProgramId,
    /// Resolved path the program was compiled from
    pub path: PathBuf,
    /// Number of textures the program samples
    pub input_count: usize,
}

impl CompiledProgram {
    /// File name without directories, for diagnostics
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Host primitive that turns a program file into a reusable handle
pub trait ProgramCompiler: Send + Sync {
    fn compile(&self, path: &Path) -> Result<CompiledProgram, ProgramError>;
}

type ProgramCell = Arc<OnceCell<Arc<CompiledProgram>>>;

pub struct ProgramCache {
    root: PathBuf,
    compiler: Arc<dyn ProgramCompiler>,
    entries: Mutex<HashMap<PathBuf, ProgramCell>>,
}

impl ProgramCache {
    pub fn new(root: impl Into<PathBuf>, compiler: Arc<dyn ProgramCompiler>) -> Self {
        Self {
            root: root.into(),
            compiler,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Absolute paths are kept, relative ones are joined onto the root
    pub fn resolve(&self, file_name: &Path) -> PathBuf {
        if file_name.is_absolute() {
            file_name.to_path_buf()
        } else {
            self.root.join(file_name)
        }
    }

    pub fn get_or_compile(
        &self,
        file_name: impl AsRef<Path>,
    ) -> Result<Arc<CompiledProgram>, ProgramError> {
        let path = self.resolve(file_name.as_ref());
        let cell = {
            let mut entries = self.entries.lock();
            entries.entry(path.clone()).or_default().clone()
        };

        let program = cell.get_or_try_init(|| {
            tracing::info!("Compiling program {:?}", path);
            self.compiler.compile(&path).map(Arc::new)
        })?;
        Ok(Arc::clone(program))
    }

    /// Number of successfully compiled programs
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProgramCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramCache")
            .field("root", &self.root)
            .field("programs", &self.len())
            .finish()
    }
}

// ============================================================================
// Dry-run compiler
// ============================================================================

/// Compiler that knows the built-in merge programs and compiles nothing.
///
/// Used by headless runs and tests; counts how often it was asked.
#[derive(Debug, Default)]
pub struct DryRunCompiler {
    next_id: AtomicU64,
    compilations: AtomicUsize,
}

impl DryRunCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::SeqCst)
    }
}

impl ProgramCompiler for DryRunCompiler {
    fn compile(&self, path: &Path) -> Result<CompiledProgram, ProgramError> {
        self.compilations.fetch_add(1, Ordering::SeqCst);

        let input_count = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(filters::builtin_input_count)
            .ok_or_else(|| ProgramError::NotFound(path.to_path_buf()))?;

        Ok(CompiledProgram {
            id: ProgramId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            path: path.to_path_buf(),
            input_count,
        })
    }
}
