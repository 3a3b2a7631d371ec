use super::*;

// =============================================================================
// parse_bool / env_bool
// =============================================================================

#[test]
fn parse_bool_true_variants() {
    for val in ["1", "true", "yes", "on", "TRUE", " On "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
}

#[test]
fn parse_bool_false_variants() {
    for val in ["0", "false", "no", "off", "False"] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
}

#[test]
fn parse_bool_rejects_garbage() {
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

#[test]
fn env_bool_unset_returns_none() {
    assert_eq!(env_bool("__TEST_YT_SURELY_UNSET_BOOL_17__"), None);
}

// =============================================================================
// env_parse_strict — unique env var names to avoid races with parallel tests.
// =============================================================================

#[test]
fn env_parse_strict_uses_default_when_unset() {
    let value: i64 = env_parse_strict("__TEST_YT_UNSET_NUM_41__", 7).unwrap();
    assert_eq!(value, 7);
}

#[test]
fn env_parse_strict_reads_trimmed_value() {
    let key = "__TEST_YT_NUM_SET_42__";
    unsafe { std::env::set_var(key, " 25 ") };
    let value: u64 = env_parse_strict(key, 1).unwrap();
    assert_eq!(value, 25);
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_parse_strict_rejects_non_numeric() {
    let key = "__TEST_YT_NUM_BAD_43__";
    unsafe { std::env::set_var(key, "ten") };
    let result: Result<u64, _> = env_parse_strict(key, 1);
    assert!(matches!(result, Err(ConfigError::Invalid { value, .. }) if value == "ten"));
    unsafe { std::env::remove_var(key) };
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn with_database_url_uses_defaults() {
    let config = Config::with_database_url("postgres://localhost/yatube");
    assert_eq!(config.database_url, "postgres://localhost/yatube");
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.page_size, 10);
    assert_eq!(config.index_cache_ttl, Duration::from_secs(20));
    assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    assert!(!config.cookie_secure);
    assert!(config.groups_file.is_none());
}

#[test]
fn config_error_messages_name_the_variable() {
    let missing = ConfigError::Missing("DATABASE_URL");
    assert!(missing.to_string().contains("DATABASE_URL"));

    let invalid = ConfigError::Invalid { var: "PORT", value: "abc".into() };
    let msg = invalid.to_string();
    assert!(msg.contains("PORT"));
    assert!(msg.contains("abc"));
}
