/// Destination policy for outbound resolver requests (SSRF protection).
///
/// Pure checks only; the resolver performs DNS and applies these to every hop.
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// What the host part of a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostTarget<'a> {
    Literal(IpAddr),
    Domain(&'a str),
}

/// Extract the host of a parsed URL. `None` when the URL has no host.
pub fn host_target(url: &url::Url) -> Option<HostTarget<'_>> {
    match url.host()? {
        url::Host::Ipv4(v4) => Some(HostTarget::Literal(IpAddr::V4(v4))),
        url::Host::Ipv6(v6) => Some(HostTarget::Literal(IpAddr::V6(v6))),
        url::Host::Domain(d) => Some(HostTarget::Domain(d)),
    }
}

/// Why a destination was refused. Logged, never returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    Hostname(String),
    Address(IpAddr),
    NoAddresses,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::Hostname(h) => write!(f, "internal hostname {h}"),
            BlockReason::Address(ip) => write!(f, "non-public address {ip}"),
            BlockReason::NoAddresses => write!(f, "host resolved to no addresses"),
        }
    }
}

/// Names that must never be contacted regardless of what DNS says.
pub fn is_blocked_hostname(host: &str) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
        || host == "metadata.google.com"
}

pub fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_non_global_v4(*v4),
        IpAddr::V6(v6) => is_non_global_v6(*v6),
    }
}

fn is_non_global_v4(v4: Ipv4Addr) -> bool {
    let [a, b, c, _] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local() // includes 169.254.169.254 metadata
        || v4.is_unspecified()
        || v4.is_broadcast()
        || v4.is_multicast()
        || a == 0
        || (a == 100 && (64..=127).contains(&b))
        || a >= 240
        || (a == 192 && b == 0 && (c == 0 || c == 2))
        || (a == 198 && b == 51 && c == 100)
        || (a == 203 && b == 0 && c == 113)
        || (a == 198 && (18..=19).contains(&b))
}

fn is_non_global_v6(v6: Ipv6Addr) -> bool {
    let segs = v6.segments();
    v6.is_loopback()
        || v6.is_unspecified()
        || v6.is_multicast()
        || (segs[0] & 0xfe00) == 0xfc00
        || (segs[0] & 0xffc0) == 0xfe80
        || (segs[0] == 0x2001 && segs[1] == 0x0db8)
        || is_ipv4_compatible(&segs)
        || (segs[0] == 0x64 && segs[1] == 0xff9b && segs[2] == 1)
        || embedded_v4(v6).is_some_and(is_non_global_v4)
}

/// Deprecated `::/96` form. `::` and `::1` are caught before this.
fn is_ipv4_compatible(segs: &[u16; 8]) -> bool {
    segs[..6].iter().all(|&s| s == 0)
}

/// IPv4 address carried inside a translation or tunnelling prefix:
/// `::ffff:0:0/96` mapped, `64:ff9b::/96` NAT64 and `2002::/16` 6to4.
fn embedded_v4(v6: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return Some(v4);
    }
    let segs = v6.segments();
    let from_pair = |hi: u16, lo: u16| {
        let [a, b] = hi.to_be_bytes();
        let [c, d] = lo.to_be_bytes();
        Ipv4Addr::new(a, b, c, d)
    };
    if segs[0] == 0x64 && segs[1] == 0xff9b && segs[2..6].iter().all(|&s| s == 0) {
        return Some(from_pair(segs[6], segs[7]));
    }
    if segs[0] == 0x2002 {
        return Some(from_pair(segs[1], segs[2]));
    }
    None
}

/// Check an IP-literal or domain host before any lookup.
pub fn check_host(target: HostTarget<'_>) -> Result<(), BlockReason> {
    match target {
        HostTarget::Literal(ip) if is_blocked_ip(&ip) => Err(BlockReason::Address(ip)),
        HostTarget::Literal(_) => Ok(()),
        HostTarget::Domain(d) if is_blocked_hostname(d) => {
            Err(BlockReason::Hostname(d.to_string()))
        }
        HostTarget::Domain(_) => Ok(()),
    }
}

/// Every resolved address must be public; one bad address taints the host.
pub fn check_addrs(addrs: &[IpAddr]) -> Result<(), BlockReason> {
    if addrs.is_empty() {
        return Err(BlockReason::NoAddresses);
    }
    match addrs.iter().find(|ip| is_blocked_ip(ip)) {
        Some(ip) => Err(BlockReason::Address(*ip)),
        None => Ok(()),
    }
}
