use camino::Utf8PathBuf;

use assert_matches::assert_matches;
use kira_assembly_fetch::error::KiraError;
use kira_assembly_fetch::store::{OutputDir, PathState, WriteFailure};

fn output_dir() -> (tempfile::TempDir, OutputDir) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let output = OutputDir::open(root).unwrap();
    (temp, output)
}

fn entries(output: &OutputDir) -> Vec<String> {
    let mut names = std::fs::read_dir(output.root().as_std_path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn output_dir_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let missing = Utf8PathBuf::from_path_buf(temp.path().join("missing")).unwrap();
    assert_matches!(OutputDir::open(missing.clone()), Err(KiraError::OutputDir(_)));
    assert!(!missing.as_std_path().exists());

    let file = Utf8PathBuf::from_path_buf(temp.path().join("file")).unwrap();
    std::fs::write(file.as_std_path(), b"x").unwrap();
    assert_matches!(OutputDir::open(file), Err(KiraError::OutputDir(_)));
}

#[test]
fn probe_distinguishes_files() {
    let (_temp, output) = output_dir();
    let file = output.root().join("a.gz");
    let dir = output.root().join("b.gz");
    std::fs::write(file.as_std_path(), b"x").unwrap();
    std::fs::create_dir(dir.as_std_path()).unwrap();

    assert_eq!(OutputDir::probe(&file), PathState::File);
    assert_eq!(OutputDir::probe(&dir), PathState::Other);
    assert_eq!(OutputDir::probe(&output.root().join("c.gz")), PathState::Missing);
}

#[test]
fn atomic_write_leaves_only_final_file() {
    let (_temp, output) = output_dir();
    let path = output.root().join("GCF_1_A_genomic.fna.gz");

    output.write_atomic(&path, b"ACGT").unwrap();

    assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b"ACGT");
    assert_eq!(entries(&output), vec!["GCF_1_A_genomic.fna.gz"]);
}

#[test]
fn atomic_write_never_replaces_existing_file() {
    let (_temp, output) = output_dir();
    let path = output.root().join("GCF_1_A_genomic.fna.gz");
    std::fs::write(path.as_std_path(), b"keep").unwrap();

    let result = output.write_atomic(&path, b"new");

    assert_matches!(result, Err(WriteFailure::Rename(_)));
    assert_eq!(std::fs::read(path.as_std_path()).unwrap(), b"keep");
    assert_eq!(entries(&output), vec!["GCF_1_A_genomic.fna.gz"]);
}

#[test]
fn temp_names_are_hidden() {
    assert_eq!(
        OutputDir::temp_prefix("GCF_1_A_genomic.fna.gz"),
        ".GCF_1_A_genomic.fna.gz"
    );
}
