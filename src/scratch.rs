use std::fs;
use std::path::{Path, PathBuf};

/// Session-scoped scratch directory. Removed when dropped.
///
/// Layout:
///   baseline/<file name>
///   mutants/<mutant id>/<file name>
///   tests/<test slug>.py
pub struct Scratch {
    session_id: String,
    dir: tempfile::TempDir,
}

pub fn generate_session_id() -> String {
    format!("{:08x}", fastrand::u32(..))
}

/// Filesystem-safe form of an id.
pub fn slug(id: &str) -> String {
    let slug: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if slug.is_empty() { "_".to_string() } else { slug }
}

impl Scratch {
    pub fn create(session_id: &str) -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("mutkernel-{}-", slug(session_id)))
            .tempdir()?;
        for sub in ["baseline", "mutants", "tests"] {
            fs::create_dir_all(dir.path().join(sub))?;
        }
        Ok(Scratch {
            session_id: session_id.to_string(),
            dir,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn baseline_path(&self, file_name: &str) -> PathBuf {
        self.root().join("baseline").join(file_name)
    }

    pub fn mutant_path(&self, mutant_id: &str, file_name: &str) -> PathBuf {
        self.root().join("mutants").join(slug(mutant_id)).join(file_name)
    }

    pub fn test_path(&self, test_id: &str) -> PathBuf {
        self.root().join("tests").join(format!("test_{}.py", slug(test_id)))
    }

    /// Write `content` to `path`, creating its directory.
    pub fn write(&self, path: &Path, content: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    /// Remove the directory now, reporting failures.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}
