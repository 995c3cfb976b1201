use super::*;

#[test]
fn endpoint_url_joins_without_double_slash() {
    assert_eq!(endpoint_url("http://localhost:8000/api", LOGIN_PATH), "http://localhost:8000/api/login/");
    assert_eq!(endpoint_url("http://localhost:8000/api/", PROFILE_UPDATE_PATH), "http://localhost:8000/api/settings/update/");
}

#[test]
fn bearer_formats_authorization_header() {
    assert_eq!(bearer("tok1"), "Bearer tok1");
}

#[test]
fn new_rejects_base_url_without_scheme() {
    let config = ClientConfig { api_url: "localhost:8000/api".to_owned(), ..ClientConfig::default() };
    assert!(matches!(HttpAuthApi::new(&config), Err(ApiError::InvalidUrl(_))));
}

#[test]
fn new_trims_trailing_slash() {
    let config = ClientConfig { api_url: "https://wellness.example/api/".to_owned(), ..ClientConfig::default() };
    let api = HttpAuthApi::new(&config).unwrap();
    assert_eq!(api.base_url(), "https://wellness.example/api");
}

#[tokio::test]
async fn unreachable_server_maps_to_network_error() {
    // Port 9 (discard) on loopback is closed on test hosts.
    let config = ClientConfig { api_url: "http://127.0.0.1:9".to_owned(), ..ClientConfig::default() };
    let api = HttpAuthApi::new(&config).unwrap();
    let err = api.fetch_profile("tok").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
}
