//! Wake-on-LAN magic packets.
use std::{fmt, str::FromStr};

use {async_trait::async_trait, tokio::net::UdpSocket, tracing::debug};

/// Six bytes of `0xFF` followed by sixteen copies of the MAC.
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

#[derive(Debug, thiserror::Error)]
pub enum WakeError {
    #[error("invalid MAC address '{0}'")]
    InvalidMac(String),
    #[error("failed to send magic packet: {0}")]
    Io(#[from] std::io::Error),
}

/// Hardware address of the host to wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn magic_packet(&self) -> [u8; MAGIC_PACKET_LEN] {
        let mut packet = [0xFF; MAGIC_PACKET_LEN];
        for chunk in packet[6..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&self.0);
        }
        packet
    }
}

impl FromStr for MacAddress {
    type Err = WakeError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` and `aabbccddeeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WakeError::InvalidMac(s.to_string());
        let hex: String = s.trim().chars().filter(|c| *c != ':' && *c != '-').collect();
        let separators = s.trim().len() - hex.len();
        if hex.len() != 12 || !(separators == 0 || separators == 5) {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(invalid)?;
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Powers on the remote host.
#[async_trait]
pub trait WakeSignal: Send + Sync {
    async fn wake(&self) -> Result<(), WakeError>;
}

/// Sends the magic packet for one MAC over UDP broadcast.
#[derive(Debug, Clone)]
pub struct MagicPacketSender {
    mac: MacAddress,
    target: String,
}

impl MagicPacketSender {
    /// `target` is a `host:port` destination, usually `255.255.255.255:9`.
    pub fn new(mac: MacAddress, target: impl Into<String>) -> Self {
        Self {
            mac,
            target: target.into(),
        }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }
}

#[async_trait]
impl WakeSignal for MagicPacketSender {
    async fn wake(&self) -> Result<(), WakeError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        let sent = socket
            .send_to(&self.mac.magic_packet(), self.target.as_str())
            .await?;
        debug!(mac = %self.mac, target = %self.target, bytes = sent, "magic packet sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("00:11:22:aa:BB:cc")]
    #[case("00-11-22-AA-bb-CC")]
    #[case("001122aabbcc")]
    #[case("  00:11:22:aa:bb:cc ")]
    fn parses_common_notations(#[case] input: &str) {
        let mac: MacAddress = input.parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc]);
        assert_eq!(mac.to_string(), "00:11:22:aa:bb:cc");
    }

    #[rstest]
    #[case("")]
    #[case("00:11:22:33:44")]
    #[case("00:11:22:33:44:55:66")]
    #[case("zz:11:22:33:44:55")]
    #[case("0011:2233:4455")]
    #[case("00:11:22:33:44:5é")]
    fn rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            input.parse::<MacAddress>(),
            Err(WakeError::InvalidMac(_))
        ));
    }

    #[test]
    fn magic_packet_layout() {
        let mac = MacAddress::new([1, 2, 3, 4, 5, 6]);
        let packet = mac.magic_packet();
        assert_eq!(packet.len(), 102);
        assert_eq!(&packet[..6], &[0xFF; 6]);
        for chunk in packet[6..].chunks(6) {
            assert_eq!(chunk, &[1, 2, 3, 4, 5, 6]);
        }
    }

    #[tokio::test]
    async fn sends_packet_to_target() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = receiver.local_addr().unwrap().to_string();
        let mac = MacAddress::new([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);

        MagicPacketSender::new(mac, target).wake().await.unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &mac.magic_packet()[..]);
    }

    #[tokio::test]
    async fn unresolvable_target_is_an_io_error() {
        let sender = MagicPacketSender::new(MacAddress::new([0; 6]), "not a socket address");
        assert!(matches!(sender.wake().await, Err(WakeError::Io(_))));
    }
}
