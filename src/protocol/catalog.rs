//! Built-in protocol descriptors.

use super::{Exchange, HandshakeProtocol, ProtocolError};
use std::num::NonZeroU16;

const fn port(value: u16) -> NonZeroU16 {
    match NonZeroU16::new(value) {
        Some(port) => port,
        None => panic!("built-in protocol port must be non-zero"),
    }
}

/// Bare request line; enough for any HTTP server to answer.
pub const HTTP_REQUEST: &[u8] = b"GET / HTTP/1.1\r\n\r\n";

pub const SSH_BANNER_PREFIX: &[u8] = b"SSH-";

/// RFB protocol version handshake, version 3.8.
pub const RFB_VERSION: &[u8] = b"RFB 003.008\n";

/// Client X.224 Connection Request PDU (MS-RDPBCGR 2.2.1.1).
pub const RDP_CONNECTION_REQUEST: &[u8] = &[
    // TPKT: version, reserved, total length (47)
    0x03, 0x00, 0x00, 0x2f,
    // X.224: length indicator (42), CR TPDU code
    0x2a, 0xe0,
    // X.224: DST-REF, SRC-REF, class 0, then the leading 'C' of the cookie
    0x00, 0x00, 0x00, 0x00, 0x00, 0x43,
    // "ookie: mstshash=Microsoft\r\n"
    0x6f, 0x6f, 0x6b, 0x69, 0x65, 0x3a, 0x20, 0x6d, 0x73, 0x74, 0x73, 0x68, 0x61, 0x73, 0x68,
    0x3d, 0x4d, 0x69, 0x63, 0x72, 0x6f, 0x73, 0x6f, 0x66, 0x74, 0x0d, 0x0a,
    // RDP_NEG_REQ: type, flags, length (8, little endian)
    0x01, 0x00, 0x08, 0x00,
    // RDP_NEG_REQ: requested protocols (standard RDP security)
    0x00, 0x00, 0x00, 0x00,
];

pub struct Http;
pub struct Https;
pub struct Ssh;
pub struct Rdp;
pub struct Vnc;
pub struct WinRm;

impl HandshakeProtocol for Http {
    fn name(&self) -> &str {
        "HTTP"
    }

    fn default_port(&self) -> NonZeroU16 {
        port(80)
    }

    fn requires_tls(&self) -> bool {
        false
    }

    fn exchange(&self) -> Exchange<'_> {
        Exchange::SendFirst(HTTP_REQUEST)
    }
}

impl HandshakeProtocol for Https {
    fn name(&self) -> &str {
        "HTTPS"
    }

    fn default_port(&self) -> NonZeroU16 {
        port(443)
    }

    fn requires_tls(&self) -> bool {
        true
    }

    // Written only once the TLS handshake is done.
    fn exchange(&self) -> Exchange<'_> {
        Exchange::SendFirst(HTTP_REQUEST)
    }
}

impl HandshakeProtocol for Ssh {
    fn name(&self) -> &str {
        "SSH"
    }

    fn default_port(&self) -> NonZeroU16 {
        port(22)
    }

    fn requires_tls(&self) -> bool {
        false
    }

    fn exchange(&self) -> Exchange<'_> {
        Exchange::ReceiveFirst(SSH_BANNER_PREFIX)
    }
}

impl HandshakeProtocol for Rdp {
    fn name(&self) -> &str {
        "RDP"
    }

    fn default_port(&self) -> NonZeroU16 {
        port(3389)
    }

    fn requires_tls(&self) -> bool {
        false
    }

    fn exchange(&self) -> Exchange<'_> {
        Exchange::SendFirst(RDP_CONNECTION_REQUEST)
    }
}

impl HandshakeProtocol for Vnc {
    fn name(&self) -> &str {
        "VNC"
    }

    fn default_port(&self) -> NonZeroU16 {
        port(5900)
    }

    fn requires_tls(&self) -> bool {
        false
    }

    fn exchange(&self) -> Exchange<'_> {
        Exchange::SendFirst(RFB_VERSION)
    }
}

impl HandshakeProtocol for WinRm {
    fn name(&self) -> &str {
        "WinRM"
    }

    fn default_port(&self) -> NonZeroU16 {
        port(5985)
    }

    fn requires_tls(&self) -> bool {
        false
    }

    fn exchange(&self) -> Exchange<'_> {
        Exchange::SendFirst(HTTP_REQUEST)
    }
}

static HTTP: Http = Http;
static HTTPS: Https = Https;
static SSH: Ssh = Ssh;
static RDP: Rdp = Rdp;
static VNC: Vnc = Vnc;
static WINRM: WinRm = WinRm;

/// Every built-in descriptor, in a stable order.
pub fn builtin() -> [&'static dyn HandshakeProtocol; 6] {
    [&HTTP, &HTTPS, &SSH, &RDP, &VNC, &WINRM]
}

/// Looks a built-in descriptor up by name, ignoring case.
pub fn find(name: &str) -> Result<&'static dyn HandshakeProtocol, ProtocolError> {
    let wanted = name.trim();
    if wanted.eq_ignore_ascii_case("ms-rdp") {
        return Ok(&RDP);
    }

    builtin()
        .into_iter()
        .find(|protocol| protocol.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| ProtocolError::UnknownProtocol(wanted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rdp_request_matches_tpkt_length() {
        assert_eq!(RDP_CONNECTION_REQUEST.len(), 47);
        assert_eq!(RDP_CONNECTION_REQUEST[3] as usize, RDP_CONNECTION_REQUEST.len());
        assert_eq!(RDP_CONNECTION_REQUEST[4] as usize, RDP_CONNECTION_REQUEST.len() - 5);
        assert_eq!(&RDP_CONNECTION_REQUEST[11..39], b"Cookie: mstshash=Microsoft\r\n");
    }

    #[test]
    fn builtin_shapes() {
        let shapes: Vec<_> = builtin()
            .iter()
            .map(|p| (p.name().to_string(), p.default_port().get(), p.requires_tls()))
            .collect();
        assert_eq!(
            shapes,
            vec![
                ("HTTP".to_string(), 80, false),
                ("HTTPS".to_string(), 443, true),
                ("SSH".to_string(), 22, false),
                ("RDP".to_string(), 3389, false),
                ("VNC".to_string(), 5900, false),
                ("WinRM".to_string(), 5985, false),
            ]
        );
    }

    #[test]
    fn payloads_are_byte_exact() {
        assert_eq!(
            HTTP_REQUEST,
            &[
                0x47, 0x45, 0x54, 0x20, 0x2f, 0x20, 0x48, 0x54, 0x54, 0x50, 0x2f, 0x31, 0x2e,
                0x31, 0x0d, 0x0a, 0x0d, 0x0a
            ]
        );
        assert_eq!(
            RFB_VERSION,
            &[0x52, 0x46, 0x42, 0x20, 0x30, 0x30, 0x33, 0x2e, 0x30, 0x30, 0x38, 0x0a]
        );
        assert_eq!(Ssh.exchange(), Exchange::ReceiveFirst(&[0x53, 0x53, 0x48, 0x2d]));
        assert_eq!(WinRm.exchange(), Http.exchange());
        assert_eq!(Https.exchange(), Http.exchange());
    }

    #[test]
    fn finds_by_name_and_alias() {
        assert_eq!(find("https").unwrap().name(), "HTTPS");
        assert_eq!(find(" winrm ").unwrap().name(), "WinRM");
        assert_eq!(find("MS-RDP").unwrap().name(), "RDP");
        assert_eq!(
            find("gopher").unwrap_err(),
            ProtocolError::UnknownProtocol("gopher".into())
        );
    }
}
