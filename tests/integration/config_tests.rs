// tests/integration/config_tests.rs
use std::io::Write;

use lwe_secure_link::utils::config::{Config, KeyScope};
use lwe_secure_link::AppError;

#[test]
fn test_environment_overrides_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"[lattice]\nn = 256\nkey_scope = \"per_session\"\n").unwrap();

    // the only test in this binary that touches the process environment
    std::env::set_var("LWE_AUTH__SECRET", "from-env");
    std::env::set_var("LWE_LATTICE__N", "64");
    let config = Config::load(Some(file.path()));
    std::env::remove_var("LWE_AUTH__SECRET");
    std::env::remove_var("LWE_LATTICE__N");

    let config = config.unwrap();
    assert_eq!(config.auth.secret, "from-env");
    assert_eq!(config.lattice.n, 64);
    assert_eq!(config.lattice.key_scope, KeyScope::PerSession);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    let err = Config::load(Some(missing.as_path())).unwrap_err();
    assert!(matches!(err, AppError::Config(msg) if msg.contains("absent.toml")));
}
