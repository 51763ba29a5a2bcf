use std::env;
use std::io;
use std::path::{Path, PathBuf};

/// Switches the process working directory and switches it back when dropped.
///
/// Restoration happens exactly once, on every exit path out of the guarded scope, unwinding
/// included.
#[derive(Debug)]
pub struct WorkdirGuard {
    original: PathBuf,
}

impl WorkdirGuard {
    pub fn enter(dir: impl AsRef<Path>) -> io::Result<Self> {
        let original = env::current_dir()?;
        let dir = dir.as_ref();
        env::set_current_dir(dir)?;
        tracing::info!(
            from = %original.display(),
            to = %dir.display(),
            "working directory changed"
        );
        Ok(Self { original })
    }
}

impl Drop for WorkdirGuard {
    fn drop(&mut self) {
        match env::set_current_dir(&self.original) {
            Ok(()) => tracing::info!(to = %self.original.display(), "working directory restored"),
            Err(e) => tracing::error!(
                to = %self.original.display(),
                error = %e,
                "could not restore working directory"
            ),
        }
    }
}
