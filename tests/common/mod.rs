#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::ssl::{Ssl, SslAcceptor, SslMethod};
use openssl::x509::{X509NameBuilder, X509};
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// How a mock server behaves once a client is connected.
#[derive(Clone, Copy, Debug)]
pub enum Script {
    /// Write a greeting straight away, then hang up.
    Greet(&'static [u8]),
    /// Read one request, answer it, then hang up.
    Reply(&'static [u8]),
    /// Read one request and hang up without answering.
    Swallow,
    /// Accept and stay silent.
    Silent,
    /// Accept and abort the connection with a reset.
    Reset,
}

pub async fn tcp_server(script: Script) -> SocketAddr {
    tcp_server_on("127.0.0.1:0".parse().unwrap(), script).await
}

pub async fn tcp_server_on(bind: SocketAddr, script: Script) -> SocketAddr {
    let listener = TcpListener::bind(bind).await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 512];
                match script {
                    Script::Greet(bytes) => {
                        let _ = socket.write_all(bytes).await;
                    }
                    Script::Reply(bytes) => {
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(bytes).await;
                    }
                    Script::Swallow => {
                        let _ = socket.read(&mut buf).await;
                    }
                    Script::Silent => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Script::Reset => {
                        let _ = socket.set_linger(Some(Duration::ZERO));
                        drop(socket);
                    }
                }
            });
        }
    });

    addr
}

/// Binds a port and releases it, leaving nothing listening there.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn self_signed_acceptor() -> SslAcceptor {
    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "localhost").unwrap();
    let name = name.build();

    let mut cert = X509::builder().unwrap();
    cert.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    cert.set_serial_number(&serial).unwrap();
    cert.set_subject_name(&name).unwrap();
    cert.set_issuer_name(&name).unwrap();
    cert.set_pubkey(&key).unwrap();
    cert.set_not_before(&Asn1Time::days_from_now(0).unwrap()).unwrap();
    cert.set_not_after(&Asn1Time::days_from_now(1).unwrap()).unwrap();
    cert.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = cert.build();

    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
    acceptor.set_private_key(&key).unwrap();
    acceptor.set_certificate(&cert).unwrap();
    acceptor.build()
}

/// A TLS server with a fresh self-signed certificate. With `reply`, it reads
/// one request after the handshake and answers it.
pub async fn tls_server(reply: Option<&'static [u8]>) -> SocketAddr {
    let acceptor = self_signed_acceptor();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let ssl = Ssl::new(acceptor.context()).unwrap();
        let mut stream = tokio_openssl::SslStream::new(ssl, socket).unwrap();
        if Pin::new(&mut stream).accept().await.is_err() {
            return;
        }
        if let Some(reply) = reply {
            let mut buf = [0u8; 512];
            let _ = stream.read(&mut buf).await;
            let _ = stream.write_all(reply).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    });

    addr
}
