use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use kira_assembly_fetch::config::{Config, ConfigLoader, ConfigOverrides, read_url_list};
use kira_assembly_fetch::domain::AssemblyFormat;
use kira_assembly_fetch::error::KiraError;

#[test]
fn url_list_skips_blank_lines() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("urls.txt");
    std::fs::write(
        &input,
        "https://ftp.example.org/g/GCF_1_A\n\n  https://ftp.example.org/g/GCF_2_B  \n",
    )
    .unwrap();

    let urls = read_url_list(&input).unwrap();
    assert_eq!(
        urls,
        vec![
            "https://ftp.example.org/g/GCF_1_A",
            "https://ftp.example.org/g/GCF_2_B"
        ]
    );
}

#[test]
fn json_config_resolves_with_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let input = temp.path().join("urls.txt");
    std::fs::write(&input, "https://ftp.example.org/g/GCF_2_B\n").unwrap();
    let config_path = temp.path().join("kira-fetch.json");
    let config = serde_json::json!({
        "assemblies": ["https://ftp.example.org/g/GCF_1_A"],
        "input": input,
        "output_dir": "genomes",
        "timeout_secs": 5
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let resolved =
        ConfigLoader::resolve(Some(config_path.as_path()), ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.schema_version, 1);
    assert_eq!(resolved.urls.len(), 2);
    assert_eq!(resolved.formats, vec![AssemblyFormat::Fna]);
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("genomes"));
    assert_eq!(resolved.timeout, Duration::from_secs(5));
}

#[test]
fn cli_output_dir_wins() {
    let config = Config {
        assemblies: vec!["ftp://example.org/g/GCF_1_A".to_string()],
        output_dir: Some(Utf8PathBuf::from("from-config")),
        ..Config::default()
    };
    let overrides = ConfigOverrides {
        output_dir: Some(Utf8PathBuf::from("from-cli")),
        timeout_secs: Some(10),
        ..ConfigOverrides::default()
    };

    let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("from-cli"));
    assert_eq!(resolved.timeout, Duration::from_secs(10));
}

#[test]
fn missing_sources_are_reported() {
    let err = ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default())
        .unwrap_err();
    assert_matches!(err, KiraError::MissingInput);

    let config = Config {
        assemblies: vec!["ftp://example.org/g/GCF_1_A".to_string()],
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, KiraError::MissingOutputDir);
}

#[test]
fn unknown_format_in_config_fails_to_parse() {
    let temp = tempfile::tempdir().unwrap();
    let config_path = temp.path().join("kira-fetch.json");
    std::fs::write(&config_path, r#"{"formats": ["fasta"]}"#).unwrap();

    let err = ConfigLoader::load(&config_path).unwrap_err();
    assert_matches!(err, KiraError::ConfigParse(_));
}
