use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::domain::{AssemblyFormat, AssemblyName};
use crate::error::KiraError;

/// What currently sits at an output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Missing,
    File,
    Other,
}

/// Why an atomic write did not produce the final file. The temporary file is
/// gone in both cases.
#[derive(Debug)]
pub enum WriteFailure {
    Write(String),
    Rename(String),
}

/// Pre-existing directory that receives fetched assembly files.
#[derive(Debug, Clone)]
pub struct OutputDir {
    root: Utf8PathBuf,
}

impl OutputDir {
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, KiraError> {
        let root = root.into();
        let metadata = fs::metadata(root.as_std_path())
            .map_err(|err| KiraError::OutputDir(format!("{root}: {err}")))?;
        if !metadata.is_dir() {
            return Err(KiraError::OutputDir(format!("{root}: not a directory")));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn output_path(&self, assembly: &AssemblyName, format: AssemblyFormat) -> Utf8PathBuf {
        self.root.join(format.file_name(assembly))
    }

    /// Hidden in-progress name used for a file before it is renamed into place.
    pub fn temp_prefix(file_name: &str) -> String {
        format!(".{file_name}")
    }

    pub fn probe(path: &Utf8Path) -> PathState {
        match fs::metadata(path.as_std_path()) {
            Ok(metadata) if metadata.is_file() => PathState::File,
            Ok(_) => PathState::Other,
            // A dangling symlink still occupies the name.
            Err(_) if fs::symlink_metadata(path.as_std_path()).is_ok() => PathState::Other,
            Err(_) => PathState::Missing,
        }
    }

    /// Writes `content` next to `path` under a hidden name and renames it into
    /// place. An existing file at `path` is never replaced.
    pub fn write_atomic(&self, path: &Utf8Path, content: &[u8]) -> Result<(), WriteFailure> {
        let file_name = path
            .file_name()
            .ok_or_else(|| WriteFailure::Write(format!("{path}: no file name")))?;
        let parent = path.parent().unwrap_or(self.root.as_path());
        let mut temp = Builder::new()
            .prefix(&Self::temp_prefix(file_name))
            .suffix(".part")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| WriteFailure::Write(err.to_string()))?;
        temp.write_all(content)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|err| WriteFailure::Write(err.to_string()))?;
        temp.persist_noclobber(path.as_std_path())
            .map_err(|err| WriteFailure::Rename(err.error.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECOLI_FTP: &str =
        "ftp://ftp.ncbi.nlm.nih.gov/genomes/all/GCF/000/005/845/GCF_000005845.2_ASM584v2";

    #[test]
    fn layout_paths() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let output = OutputDir::open(root).unwrap();
        let location = ECOLI_FTP.parse().unwrap();
        let name = AssemblyName::from_location(&location).unwrap();

        let path = output.output_path(&name, AssemblyFormat::Gff);
        assert!(path.ends_with("GCF_000005845.2_ASM584v2_genomic.gff.gz"));
        assert!(path.starts_with(output.root()));
    }
}
