use std::collections::HashMap;

use super::*;

fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
    let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    ServerConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn empty_environment_uses_defaults() {
    assert_eq!(config_from(&[]), ServerConfig::default());
}

#[test]
fn overrides_are_parsed() {
    let cfg = config_from(&[
        ("PORT", "8080"),
        ("DATABASE_URL", "postgres://localhost/drawroom"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("CLIENT_CHANNEL_CAPACITY", "64"),
        ("CURSOR_STALE_SECS", "30"),
        ("CURSOR_SWEEP_INTERVAL_SECS", "5"),
    ]);
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/drawroom"));
    assert_eq!(cfg.db_max_connections, 12);
    assert_eq!(cfg.client_channel_capacity, 64);
    assert_eq!(cfg.cursor_stale, Duration::from_secs(30));
    assert_eq!(cfg.cursor_sweep_interval, Duration::from_secs(5));
}

#[test]
fn garbage_values_fall_back() {
    let cfg = config_from(&[("PORT", "not-a-port"), ("DB_MAX_CONNECTIONS", "-1"), ("CURSOR_STALE_SECS", "")]);
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(cfg.cursor_stale, Duration::from_secs(DEFAULT_CURSOR_STALE_SECS));
}

#[test]
fn out_of_range_port_falls_back() {
    assert_eq!(config_from(&[("PORT", "70000")]).port, DEFAULT_PORT);
}

#[test]
fn blank_database_url_means_memory() {
    assert_eq!(config_from(&[("DATABASE_URL", "  ")]).database_url, None);
}

#[test]
fn zero_capacity_and_interval_are_clamped() {
    let cfg = config_from(&[("CLIENT_CHANNEL_CAPACITY", "0"), ("CURSOR_SWEEP_INTERVAL_SECS", "0")]);
    assert_eq!(cfg.client_channel_capacity, 1);
    assert_eq!(cfg.cursor_sweep_interval, Duration::from_secs(1));
}

#[test]
fn env_parse_trims() {
    assert_eq!(env_parse(Some(" 42 ".into()), 0u32), 42);
    assert_eq!(env_parse(None, 7u32), 7);
}
