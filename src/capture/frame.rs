// Link-layer frame decoding: Ethernet -> IPv4 -> TCP/UDP ports. No payload inspection.

use pnet_packet::Packet;
use pnet_packet::ethernet::{EtherTypes, EthernetPacket};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::Ipv4Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame {
    pub transport: Transport,
    pub src_port: u16,
    pub dst_port: u16,
    /// Full on-wire frame length in bytes.
    pub length: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    NotIpv4,
    UnsupportedTransport,
    /// Too short for one of the fixed offsets, or an IHL below 5.
    Truncated,
    Parsed(ParsedFrame),
}

const MIN_IPV4_HEADER_LEN: usize = 20;

/// Classify a raw Ethernet frame. Never reads past the end of `frame`.
pub fn parse_frame(frame: &[u8]) -> FrameOutcome {
    let Some(eth) = EthernetPacket::new(frame) else {
        return FrameOutcome::Truncated;
    };
    if eth.get_ethertype() != EtherTypes::Ipv4 {
        return FrameOutcome::NotIpv4;
    }

    let ip_bytes = eth.payload();
    let Some(ip) = Ipv4Packet::new(ip_bytes) else {
        return FrameOutcome::Truncated;
    };
    let transport = match ip.get_next_level_protocol() {
        IpNextHeaderProtocols::Tcp => Transport::Tcp,
        IpNextHeaderProtocols::Udp => Transport::Udp,
        _ => return FrameOutcome::UnsupportedTransport,
    };

    let header_len = ip.get_header_length() as usize * 4;
    if header_len < MIN_IPV4_HEADER_LEN {
        return FrameOutcome::Truncated;
    }
    let Some(ports) = ip_bytes.get(header_len..header_len + 4) else {
        return FrameOutcome::Truncated;
    };

    FrameOutcome::Parsed(ParsedFrame {
        transport,
        src_port: u16::from_be_bytes([ports[0], ports[1]]),
        dst_port: u16::from_be_bytes([ports[2], ports[3]]),
        length: frame.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ethernet + IPv4 (given IHL/protocol) + 4 port bytes, zero padded to `len`.
    fn frame(ethertype: u16, ihl: u8, protocol: u8, src: u16, dst: u16, len: usize) -> Vec<u8> {
        let mut f = vec![0u8; len];
        f[12..14].copy_from_slice(&ethertype.to_be_bytes());
        f[14] = 0x40 | ihl;
        f[14 + 9] = protocol;
        let t = 14 + ihl as usize * 4;
        f[t..t + 2].copy_from_slice(&src.to_be_bytes());
        f[t + 2..t + 4].copy_from_slice(&dst.to_be_bytes());
        f
    }

    #[test]
    fn parses_tcp_ports_and_length() {
        let f = frame(0x0800, 5, 6, 51000, 8096, 150);
        assert_eq!(
            parse_frame(&f),
            FrameOutcome::Parsed(ParsedFrame {
                transport: Transport::Tcp,
                src_port: 51000,
                dst_port: 8096,
                length: 150,
            })
        );
    }

    #[test]
    fn parses_udp() {
        let f = frame(0x0800, 5, 17, 53, 40000, 80);
        let FrameOutcome::Parsed(p) = parse_frame(&f) else {
            panic!("expected parsed frame");
        };
        assert_eq!(p.transport, Transport::Udp);
        assert_eq!(p.src_port, 53);
    }

    #[test]
    fn honours_ip_options_via_ihl() {
        let f = frame(0x0800, 6, 6, 443, 60000, 100);
        let FrameOutcome::Parsed(p) = parse_frame(&f) else {
            panic!("expected parsed frame");
        };
        assert_eq!((p.src_port, p.dst_port), (443, 60000));
    }

    #[test]
    fn rejects_non_ipv4() {
        let mut f = frame(0x0800, 5, 6, 1, 2, 80);
        f[12..14].copy_from_slice(&0x86DDu16.to_be_bytes());
        assert_eq!(parse_frame(&f), FrameOutcome::NotIpv4);
        f[12..14].copy_from_slice(&0x0806u16.to_be_bytes());
        assert_eq!(parse_frame(&f), FrameOutcome::NotIpv4);
    }

    #[test]
    fn rejects_other_transports() {
        let f = frame(0x0800, 5, 1, 0, 0, 80);
        assert_eq!(parse_frame(&f), FrameOutcome::UnsupportedTransport);
    }

    #[test]
    fn truncated_frames_are_rejected_not_indexed() {
        let full = frame(0x0800, 5, 6, 1234, 8096, 60);
        for cut in [0, 5, 13, 14, 20, 33, 34, 36, 37] {
            assert_eq!(parse_frame(&full[..cut]), FrameOutcome::Truncated, "cut at {cut}");
        }
        assert!(matches!(parse_frame(&full[..38]), FrameOutcome::Parsed(_)));
    }

    #[test]
    fn ihl_below_minimum_is_rejected() {
        let mut f = frame(0x0800, 5, 6, 1, 2, 80);
        f[14] = 0x42;
        assert_eq!(parse_frame(&f), FrameOutcome::Truncated);
    }

    #[test]
    fn ihl_pointing_past_end_is_rejected() {
        let mut f = frame(0x0800, 5, 6, 1, 2, 40);
        f[14] = 0x4F;
        assert_eq!(parse_frame(&f), FrameOutcome::Truncated);
    }
}
