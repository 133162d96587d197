use super::{Exchange, HandshakeProtocol, ProtocolError};
use std::num::NonZeroU16;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    Send(Vec<u8>),
    Expect(Vec<u8>),
}

/// A descriptor assembled at runtime, e.g. from command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomProtocol {
    name: String,
    default_port: NonZeroU16,
    requires_tls: bool,
    payload: Payload,
}

impl CustomProtocol {
    pub fn send_first(
        name: impl Into<String>,
        default_port: u16,
        requires_tls: bool,
        payload: impl Into<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: name.into(),
            default_port: NonZeroU16::new(default_port).ok_or(ProtocolError::ZeroPort)?,
            requires_tls,
            payload: Payload::Send(payload.into()),
        })
    }

    pub fn receive_first(
        name: impl Into<String>,
        default_port: u16,
        requires_tls: bool,
        expected_prefix: impl Into<Vec<u8>>,
    ) -> Result<Self, ProtocolError> {
        let expected_prefix = expected_prefix.into();
        if expected_prefix.is_empty() {
            return Err(ProtocolError::EmptyExpectedPrefix);
        }

        Ok(Self {
            name: name.into(),
            default_port: NonZeroU16::new(default_port).ok_or(ProtocolError::ZeroPort)?,
            requires_tls,
            payload: Payload::Expect(expected_prefix),
        })
    }
}

impl HandshakeProtocol for CustomProtocol {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_port(&self) -> NonZeroU16 {
        self.default_port
    }

    fn requires_tls(&self) -> bool {
        self.requires_tls
    }

    fn exchange(&self) -> Exchange<'_> {
        match &self.payload {
            Payload::Send(bytes) => Exchange::SendFirst(bytes),
            Payload::Expect(bytes) => Exchange::ReceiveFirst(bytes),
        }
    }
}
