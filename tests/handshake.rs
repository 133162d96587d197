mod common;

use common::{closed_port, tcp_server, tls_server, Script};
use handshake_check::protocol::catalog::{Http, Https, Rdp, Ssh, Vnc, RDP_CONNECTION_REQUEST};
use handshake_check::{
    cancel_pair, test_handshake, CertificateValidator, CustomProtocol, HandshakeError,
    ProbeOptions, Stage,
};
use std::net::SocketAddr;
use std::num::NonZeroU16;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn options_for(addr: SocketAddr) -> ProbeOptions {
    ProbeOptions::default()
        .with_port(NonZeroU16::new(addr.port()).unwrap())
        .with_timeout(Duration::from_secs(2))
}

/// Options that record every error handed to the exception handler.
fn recording(addr: SocketAddr) -> (ProbeOptions, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let options = options_for(addr).with_exception_handler(move |err: &HandshakeError| {
        sink.lock().unwrap().push(format!("{}|{}", err.stage(), err));
    });
    (options, seen)
}

#[tokio::test]
async fn http_succeeds_on_any_reply() {
    let addr = tcp_server(Script::Reply(b"x")).await;
    assert!(test_handshake(&Http, addr.ip(), &options_for(addr)).await);
}

#[tokio::test]
async fn http_sends_bare_request_line() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 64];
        let n = socket.read(&mut buf).await.unwrap();
        socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await.unwrap();
        buf[..n].to_vec()
    });

    assert!(test_handshake(&Http, addr.ip(), &options_for(addr)).await);
    assert_eq!(server.await.unwrap(), b"GET / HTTP/1.1\r\n\r\n");
}

#[tokio::test]
async fn rdp_sends_connection_request_verbatim() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; RDP_CONNECTION_REQUEST.len()];
        socket.read_exact(&mut buf).await.unwrap();
        socket.write_all(&[0x03, 0x00, 0x00, 0x13]).await.unwrap();
        buf
    });

    assert!(test_handshake(&Rdp, addr.ip(), &options_for(addr)).await);
    assert_eq!(server.await.unwrap(), RDP_CONNECTION_REQUEST);
}

#[tokio::test]
async fn send_first_fails_when_peer_closes_without_reply() {
    let addr = tcp_server(Script::Swallow).await;
    let (options, seen) = recording(addr);
    assert!(!test_handshake(&Vnc, addr.ip(), &options).await);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn ssh_banner_matches_prefix() {
    let addr = tcp_server(Script::Greet(b"SSH-2.0-OpenSSH_9.6\r\n")).await;
    assert!(test_handshake(&Ssh, addr.ip(), &options_for(addr)).await);
}

#[tokio::test]
async fn ssh_rejects_http_greeting() {
    let addr = tcp_server(Script::Greet(b"HTTP/1.1 400 Bad Request\r\n\r\n")).await;
    assert!(!test_handshake(&Ssh, addr.ip(), &options_for(addr)).await);
}

#[tokio::test]
async fn ssh_rejects_short_greeting() {
    let addr = tcp_server(Script::Greet(b"SSH")).await;
    assert!(!test_handshake(&Ssh, addr.ip(), &options_for(addr)).await);
}

#[tokio::test]
async fn refused_connection_is_reported_not_raised() {
    let addr = closed_port().await;
    let (options, seen) = recording(addr);
    assert!(!test_handshake(&Https, addr.ip(), &options).await);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("connect|connect failed"), "{seen:?}");
}

#[tokio::test]
async fn silent_server_times_out_without_reporting() {
    let addr = tcp_server(Script::Silent).await;
    let (options, seen) = recording(addr);
    let options = options.with_timeout(Duration::from_millis(200));

    let started = tokio::time::Instant::now();
    assert!(!test_handshake(&Ssh, addr.ip(), &options).await);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reset_during_receive_is_reported() {
    let addr = tcp_server(Script::Reset).await;
    let (options, seen) = recording(addr);
    assert!(!test_handshake(&Ssh, addr.ip(), &options).await);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with("receive|receive failed"), "{seen:?}");
}

#[tokio::test]
async fn zero_timeout_fails_before_connecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (options, seen) = recording(addr);
    let options = options.with_timeout(Duration::ZERO);

    assert!(!test_handshake(&Http, addr.ip(), &options).await);
    assert!(seen.lock().unwrap().is_empty());
    let accepted = tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
    assert!(accepted.is_err(), "no connection should have been opened");
}

#[tokio::test]
async fn stalled_send_times_out_without_reporting() {
    let addr = tcp_server(Script::Silent).await;
    let flood = CustomProtocol::send_first("FLOOD", 9, false, vec![0x5a; 32 << 20]).unwrap();
    let (options, seen) = recording(addr);
    let options = options.with_timeout(Duration::from_millis(300));

    let started = tokio::time::Instant::now();
    assert!(!test_handshake(&flood, addr.ip(), &options).await);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unbounded_timeout_still_completes() {
    let addr = tcp_server(Script::Greet(b"SSH-2.0-OpenSSH_9.6\r\n")).await;
    let options = options_for(addr).with_timeout(Duration::MAX);
    assert!(test_handshake(&Ssh, addr.ip(), &options).await);
}

#[tokio::test]
async fn cancellation_abandons_the_attempt() {
    let addr = tcp_server(Script::Silent).await;
    let (handle, signal) = cancel_pair();
    let (options, seen) = recording(addr);
    let options = options
        .with_timeout(Duration::from_secs(30))
        .with_cancel(signal);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let started = tokio::time::Instant::now();
    assert!(!test_handshake(&Ssh, addr.ip(), &options).await);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn tls_handshake_alone_satisfies_empty_payload() {
    let addr = tls_server(None).await;
    let tls_only = CustomProtocol::send_first("TLS", 443, true, Vec::new()).unwrap();
    assert!(test_handshake(&tls_only, addr.ip(), &options_for(addr)).await);
}

#[tokio::test]
async fn https_sends_request_after_handshake() {
    let addr = tls_server(Some(b"HTTP/1.1 200 OK\r\n\r\n")).await;
    assert!(test_handshake(&Https, addr.ip(), &options_for(addr)).await);
}

#[tokio::test]
async fn system_trust_rejects_self_signed_certificate() {
    let addr = tls_server(Some(b"HTTP/1.1 200 OK\r\n\r\n")).await;
    let (options, seen) = recording(addr);
    let options = options.with_certificate_validator(CertificateValidator::system_trust());

    assert!(!test_handshake(&Https, addr.ip(), &options).await);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].starts_with(&format!("{}|", Stage::TlsHandshake)), "{seen:?}");
}

#[tokio::test]
async fn custom_validator_decides_trust() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let accepting = CertificateValidator::from_fn(move |_preverified, ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.current_cert().is_some()
    });

    let addr = tls_server(None).await;
    let tls_only = CustomProtocol::send_first("TLS", 443, true, Vec::new()).unwrap();
    let options = options_for(addr).with_certificate_validator(accepting);
    assert!(test_handshake(&tls_only, addr.ip(), &options).await);
    assert!(calls.load(Ordering::SeqCst) >= 1);

    let addr = tls_server(None).await;
    let rejecting = CertificateValidator::from_fn(|_, _| false);
    let options = options_for(addr).with_certificate_validator(rejecting);
    assert!(!test_handshake(&tls_only, addr.ip(), &options).await);
}

#[tokio::test]
async fn tls_against_plaintext_service_fails() {
    let addr = tcp_server(Script::Greet(b"SSH-2.0-OpenSSH_9.6\r\n")).await;
    let (options, seen) = recording(addr);
    assert!(!test_handshake(&Https, addr.ip(), &options).await);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn tls_handshake_is_bounded_by_the_deadline() {
    let addr = tcp_server(Script::Silent).await;
    let (options, seen) = recording(addr);
    let options = options.with_timeout(Duration::from_millis(200));

    let started = tokio::time::Instant::now();
    assert!(!test_handshake(&Https, addr.ip(), &options).await);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(seen.lock().unwrap().is_empty());
}
