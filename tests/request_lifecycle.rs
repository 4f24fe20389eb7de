//! One request served end to end through services of a booted provider

use std::sync::Arc;
use std::thread;

use elgg_config::Config;
use elgg_kernel::{Runtime, ServiceProvider};
use elgg_services::http::Response;
use elgg_services::LogLevel;
use serde_json::json;
use tempfile::TempDir;

fn boot(dir: &TempDir, runtime: Runtime) -> ServiceProvider {
    let mut config = Config::new();
    config.wwwroot = "https://example.org/".to_string();
    config.dataroot = dir.path().to_string_lossy().into_owned();
    config.debug = Some("info".to_string());
    ServiceProvider::with_runtime(config, runtime).unwrap()
}

#[test]
fn test_web_response_written_once() {
    let dir = TempDir::new().unwrap();
    let provider = boot(&dir, Runtime::web());
    let responses = provider.response_factory().unwrap();

    assert!(responses.respond(Response::ok("<p>hi</p>")).unwrap());
    assert!(!responses.redirect("/login").unwrap());

    let sent = String::from_utf8(responses.transport.sent()).unwrap();
    assert!(sent.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(sent.ends_with("<p>hi</p>"));
}

#[test]
fn test_cli_response_is_body_only() {
    let dir = TempDir::new().unwrap();
    let provider = boot(&dir, Runtime::cli());
    let responses = provider.response_factory().unwrap();
    responses.respond(Response::ok("done")).unwrap();
    assert_eq!(responses.transport.sent(), b"done".to_vec());
}

#[test]
fn test_log_hook_registered_through_provider() {
    let dir = TempDir::new().unwrap();
    let provider = boot(&dir, Runtime::cli());
    let logger = provider.logger().unwrap();

    assert!(logger.log(LogLevel::Notice, "visible"));
    assert!(!logger.log(LogLevel::Debug, "below threshold"));

    provider
        .hooks()
        .unwrap()
        .register_handler("debug", "log", 500, |call| {
            (call.params["msg"] == "secret").then(|| json!(false))
        });
    assert!(!logger.warn("secret"));
    assert!(logger.warn("public"));
}

#[test]
fn test_login_redirect_round_trip() {
    let dir = TempDir::new().unwrap();
    let provider = boot(&dir, Runtime::web());
    let session = provider.session().unwrap();
    let redirects = provider.redirects().unwrap();

    redirects.set_last_forward_from();
    assert_eq!(
        redirects.last_forward_from().as_deref(),
        Some(redirects.current_url.as_str())
    );
    assert_eq!(redirects.normalize_url("/blog"), "https://example.org/blog");

    let persistent = provider.persistent_login().unwrap();
    let token = persistent.make_login_persistent(42);
    assert_eq!(persistent.user_for_token(&token), Some(42));
    assert_eq!(session.get("code"), Some(json!(token)));

    let messages = provider.system_messages().unwrap();
    messages.add_success("Welcome back");
    assert_eq!(messages.count("success"), 1);
}

#[test]
fn test_signed_file_urls_share_site_secret() {
    let dir = TempDir::new().unwrap();
    let provider = boot(&dir, Runtime::web());
    let files = provider.serve_file_handler().unwrap();
    assert!(Arc::ptr_eq(&files.hmac, &provider.hmac().unwrap()));

    let token = provider.hmac().unwrap().hmac("blog:5").token().unwrap();
    assert!(provider.hmac().unwrap().hmac("blog:5").matches_token(&token));
    assert!(!provider.hmac().unwrap().hmac("blog:6").matches_token(&token));
}

#[test]
fn test_concurrent_first_access_builds_once() {
    let dir = TempDir::new().unwrap();
    let provider = boot(&dir, Runtime::cli());

    let instances: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| provider.entity_table().unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }
    assert!(Arc::ptr_eq(&instances[0].db, &provider.db().unwrap()));
}
