use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_uses_defaults_when_unset() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(cfg.api_url, DEFAULT_API_URL);
    assert_eq!(cfg.session_max_age, Duration::from_secs(604_800));
    assert_eq!(cfg.startup_delay, Duration::from_millis(100));
}

#[test]
fn from_lookup_parses_overrides_and_trims_slash() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("WELLNESS_API_URL", "https://wellness.example/api/"),
        ("WELLNESS_SESSION_MAX_AGE_SECS", "3600"),
        ("WELLNESS_STARTUP_DELAY_MS", "0"),
        ("WELLNESS_REQUEST_TIMEOUT_SECS", "5"),
        ("WELLNESS_CONNECT_TIMEOUT_SECS", "2"),
    ]))
    .unwrap();
    assert_eq!(cfg.api_url, "https://wellness.example/api");
    assert_eq!(cfg.session_max_age, Duration::from_secs(3600));
    assert_eq!(cfg.startup_delay, Duration::ZERO);
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 5, connect_secs: 2 });
}

#[test]
fn from_lookup_ignores_unparseable_numbers() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[("WELLNESS_SESSION_MAX_AGE_SECS", "soon")])).unwrap();
    assert_eq!(cfg.session_max_age, Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS));
}

#[test]
fn from_lookup_rejects_url_without_scheme() {
    let err = ClientConfig::from_lookup(lookup_from(&[("WELLNESS_API_URL", "localhost:8000/api")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidApiUrl(url) if url == "localhost:8000/api"));
}

#[test]
fn session_max_age_millis_matches_seven_days() {
    assert_eq!(ClientConfig::default().session_max_age_millis(), 604_800_000);
}
