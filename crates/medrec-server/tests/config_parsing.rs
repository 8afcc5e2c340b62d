use std::{env, fs, path::PathBuf};

use medrec_db::BackendKind;
use medrec_server::config::loader::{load_config, load_config_with_default_path};

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("medrec.toml");

    let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8081
request_timeout_ms = 1000
body_limit_bytes = 4096

[storage]
backend = "file"
path = "/var/lib/medrec/patients.json"
persist_derived = true
pretty = false

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.port, 8081);
    assert_eq!(cfg.server.request_timeout_ms, 1000);
    assert_eq!(cfg.server.body_limit_bytes, 4096);
    assert_eq!(cfg.storage.backend, BackendKind::File);
    assert_eq!(cfg.storage.path, PathBuf::from("/var/lib/medrec/patients.json"));
    assert!(cfg.storage.persist_derived);
    assert!(!cfg.storage.pretty);
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override wins over the file
    unsafe {
        env::set_var("MEDREC__SERVER__PORT", "9090");
        env::set_var("MEDREC__STORAGE__BACKEND", "memory");
    }
    let cfg_env = load_config_with_default_path(Some(&path)).expect("should parse with env overrides");
    assert_eq!(cfg_env.server.port, 9090);
    assert_eq!(cfg_env.storage.backend, BackendKind::Memory);
    unsafe {
        env::remove_var("MEDREC__SERVER__PORT");
        env::remove_var("MEDREC__STORAGE__BACKEND");
    }

    // 3) A missing file falls back to defaults
    let cfg_default = load_config(dir.path().join("absent.toml").to_str()).expect("defaults");
    assert_eq!(cfg_default.server.port, 8000);
    assert_eq!(cfg_default.storage.path, PathBuf::from("patients.json"));

    // 4) Invalid values are rejected
    let invalid_path = dir.path().join("invalid.toml");
    fs::write(
        &invalid_path,
        r#"
[server]
port = 0
"#,
    )
    .expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("server.port must be > 0"));

    let bad_level = dir.path().join("bad_level.toml");
    fs::write(&bad_level, "[logging]\nlevel = \"chatty\"\n").expect("write toml");
    let err = load_config(bad_level.to_str()).expect_err("expected validation error");
    assert!(err.contains("logging.level"));
}
