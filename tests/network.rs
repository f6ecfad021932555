// ABOUTME: Integration tests for host network discovery.
// ABOUTME: Drives the loopback probe and IP enumeration against a scripted engine.

mod support;

use cluster_up::engine::{EngineClient, EngineError};
use cluster_up::network::{
    DialPolicy, ENUMERATE_CONTAINER, LISTENER_CONTAINER, NetworkConfig, NetworkError,
    NetworkOptions, ProbeErrorKind, ProxyConfig,
};
use cluster_up::runner::RunnerError;
use cluster_up::types::ImageRef;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use support::fake_engine::{Call, FakeEngine, Script};
use tokio::net::TcpListener;

fn options() -> NetworkOptions {
    NetworkOptions::new(ImageRef::parse("openshift/origin:v3.11").unwrap())
}

fn ip(value: &str) -> IpAddr {
    value.parse().unwrap()
}

/// A loopback port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn handle(fake: &Arc<FakeEngine>) -> Arc<dyn EngineClient> {
    Arc::clone(fake) as Arc<dyn EngineClient>
}

#[tokio::test]
async fn port_forward_skips_the_listener() {
    let fake = FakeEngine::new()
        .script(ENUMERATE_CONTAINER, Script::exits(0).stdout("10.0.0.5 172.17.0.1\n"))
        .into_arc();
    let mut opts = options();
    opts.port_forward = true;

    let config = NetworkConfig::build(handle(&fake), opts).await.unwrap();

    assert_eq!(config.server_ip(), ip("127.0.0.1"));
    assert_eq!(config.additional_ips(), &[ip("10.0.0.5"), ip("172.17.0.1")]);
    assert_eq!(fake.creates(LISTENER_CONTAINER), 0);
    assert_eq!(fake.creates(ENUMERATE_CONTAINER), 1);
    assert_eq!(config.to_string(), "server: 127.0.0.1, additional: 10.0.0.5,172.17.0.1");
}

#[tokio::test]
async fn public_ip_is_used_directly() {
    let fake = FakeEngine::new()
        .script(ENUMERATE_CONTAINER, Script::exits(0).stdout("192.168.99.100 10.1.1.1"))
        .into_arc();
    let mut opts = options();
    opts.public_hostname = Some("192.168.99.100".to_string());

    let config = NetworkConfig::build(handle(&fake), opts).await.unwrap();

    assert_eq!(config.server_ip(), ip("192.168.99.100"));
    assert_eq!(config.additional_ips(), &[ip("10.1.1.1")]);
    assert_eq!(fake.creates(LISTENER_CONTAINER), 0);
}

#[tokio::test]
async fn successful_dial_selects_loopback_and_stops_listener() {
    support::init_tracing();
    let listening = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listening.local_addr().unwrap().port();

    let fake = FakeEngine::new()
        .script(LISTENER_CONTAINER, Script::until_killed(0))
        .script(
            ENUMERATE_CONTAINER,
            Script::exits(0).stdout("127.0.0.1 10.0.0.5 fe80::1\n"),
        )
        .into_arc();
    let mut opts = options();
    opts.probe.port = port;

    let config = NetworkConfig::build(handle(&fake), opts).await.unwrap();

    assert_eq!(config.server_ip(), ip("127.0.0.1"));
    assert_eq!(config.additional_ips(), &[ip("10.0.0.5")]);
    assert_eq!(fake.kills(LISTENER_CONTAINER), vec!["TERM".to_string()]);

    let spec = fake.spec(LISTENER_CONTAINER).unwrap();
    assert_eq!(spec.entrypoint, Some(vec!["socat".to_string()]));
    assert_eq!(
        spec.command,
        Some(vec![
            format!("TCP-LISTEN:{port},crlf,reuseaddr,fork"),
            "SYSTEM:\"echo 'hello world'\"".to_string(),
        ])
    );
    assert!(spec.host_network);
    assert!(spec.privileged);
    assert!(spec.auto_remove);
}

#[tokio::test]
async fn failed_dial_reports_attempts() {
    let fake = FakeEngine::new()
        .script(LISTENER_CONTAINER, Script::until_killed(0))
        .into_arc();
    let mut opts = options();
    opts.probe.port = closed_port().await;
    opts.probe.dial = DialPolicy {
        attempt_timeout: Duration::from_millis(200),
        interval: Duration::from_millis(10),
        attempts: 2,
    };

    let err = NetworkConfig::build(handle(&fake), opts).await.unwrap_err();

    match err {
        NetworkError::Probe(probe) => {
            assert_eq!(probe.kind(), ProbeErrorKind::Dial);
            assert!(probe.to_string().contains("after 2 attempts"));
        }
        other => panic!("expected probe failure, got {other:?}"),
    }
    assert_eq!(fake.kills(LISTENER_CONTAINER), vec!["TERM".to_string()]);
    assert_eq!(fake.creates(ENUMERATE_CONTAINER), 0);
}

#[tokio::test(start_paused = true)]
async fn loopback_check_gives_up_after_timeout() {
    let fake = FakeEngine::new()
        .script(LISTENER_CONTAINER, Script::until_killed(0))
        .into_arc();
    let mut opts = options();
    opts.probe.port = closed_port().await;
    opts.probe.timeout = Duration::from_secs(2);
    opts.probe.dial = DialPolicy {
        attempt_timeout: Duration::from_millis(200),
        interval: Duration::from_secs(1),
        attempts: 50,
    };

    let err = NetworkConfig::build(handle(&fake), opts).await.unwrap_err();

    match err {
        NetworkError::Probe(probe) => {
            assert_eq!(probe.kind(), ProbeErrorKind::Timeout);
            assert_eq!(
                probe.to_string(),
                "failed to determine the host IP address: no answer within 2s"
            );
        }
        other => panic!("expected probe timeout, got {other:?}"),
    }
    assert_eq!(fake.kills(LISTENER_CONTAINER), vec!["TERM".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn late_listener_is_still_torn_down() {
    let fake = FakeEngine::new()
        .script(LISTENER_CONTAINER, Script::until_killed(0))
        .create_delay(LISTENER_CONTAINER, Duration::from_secs(5))
        .into_arc();
    let mut opts = options();
    opts.probe.port = closed_port().await;
    opts.probe.timeout = Duration::from_secs(2);
    opts.probe.dial = DialPolicy {
        attempt_timeout: Duration::from_millis(200),
        interval: Duration::from_secs(1),
        attempts: 50,
    };
    let started = tokio::time::Instant::now();

    let err = NetworkConfig::build(handle(&fake), opts).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(8));
    match err {
        NetworkError::Probe(probe) => assert_eq!(probe.kind(), ProbeErrorKind::Timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
    // TERM arrives before the container exists; the runner kills it once started.
    assert_eq!(
        fake.kills(LISTENER_CONTAINER),
        vec!["TERM".to_string(), "KILL".to_string()]
    );
    assert!(fake.removes(LISTENER_CONTAINER) >= 1);
    assert_eq!(fake.creates(ENUMERATE_CONTAINER), 0);
}

#[tokio::test]
async fn dial_retries_until_listener_binds() {
    support::init_tracing();
    let port = closed_port().await;
    let server = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        loop {
            let _ = listener.accept().await;
        }
    });

    let fake = FakeEngine::new()
        .script(LISTENER_CONTAINER, Script::until_killed(0))
        .script(ENUMERATE_CONTAINER, Script::exits(0).stdout("10.0.0.5"))
        .into_arc();
    let mut opts = options();
    opts.probe.port = port;
    opts.probe.dial = DialPolicy {
        attempt_timeout: Duration::from_millis(200),
        interval: Duration::from_millis(100),
        attempts: 10,
    };

    let config = NetworkConfig::build(handle(&fake), opts).await.unwrap();
    server.abort();

    assert_eq!(config.server_ip(), ip("127.0.0.1"));
    assert_eq!(fake.kills(LISTENER_CONTAINER), vec!["TERM".to_string()]);
}

#[tokio::test]
async fn listener_create_failure_is_reported() {
    let fake = FakeEngine::new()
        .fail(
            "create",
            LISTENER_CONTAINER,
            EngineError::Api("image not found".to_string()),
        )
        .into_arc();

    let err = NetworkConfig::build(handle(&fake), options()).await.unwrap_err();

    match err {
        NetworkError::Probe(probe) => {
            assert_eq!(probe.kind(), ProbeErrorKind::Listener);
            assert!(probe.to_string().contains("image not found"));
        }
        other => panic!("expected listener failure, got {other:?}"),
    }
    // The teardown kill finds nothing to stop.
    assert!(
        fake.calls()
            .contains(&Call::Kill(LISTENER_CONTAINER.to_string(), "TERM".to_string()))
    );
}

#[tokio::test]
async fn enumeration_failure_is_reported() {
    let fake = FakeEngine::new()
        .script(
            ENUMERATE_CONTAINER,
            Script::exits(1).stderr("hostname: command not found"),
        )
        .into_arc();
    let mut opts = options();
    opts.port_forward = true;

    let err = NetworkConfig::build(handle(&fake), opts).await.unwrap_err();

    match err {
        NetworkError::AdditionalIps(RunnerError::ExitStatus { code, output, .. }) => {
            assert_eq!(code, 1);
            assert_eq!(output, "hostname: command not found");
        }
        other => panic!("expected enumeration failure, got {other:?}"),
    }
}

#[tokio::test]
async fn proxy_config_includes_cluster_addresses() {
    let fake = FakeEngine::new()
        .script(ENUMERATE_CONTAINER, Script::exits(0).stdout("10.0.0.5"))
        .into_arc();
    let mut opts = options();
    opts.public_hostname = Some("10.0.0.5".to_string());
    opts.proxy = Some(ProxyConfig {
        http_proxy: Some("http://proxy.corp:3128".to_string()),
        https_proxy: None,
        no_proxy: vec![".corp".to_string()],
    });

    let config = NetworkConfig::build(handle(&fake), opts).await.unwrap();
    let proxy = config.proxy_config().unwrap();

    assert!(config.additional_ips().is_empty());
    assert_eq!(
        proxy.no_proxy,
        vec![".corp", "127.0.0.1", "10.0.0.5", "localhost", "172.30.1.1"]
    );
    assert_eq!(proxy.http_proxy.as_deref(), Some("http://proxy.corp:3128"));
}
