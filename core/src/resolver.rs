//! # DNS Resolution
//!
//! [`DnsResolver`] is the seam the enumerator depends on. [`UdpResolver`] is the
//! production implementation: plain UDP queries against an ordered list of
//! recursive nameservers.
//!
//! Retry policy per query:
//! * timeout / SERVFAIL: ask the same nameserver again, up to `retries` times.
//! * REFUSED / unparsable reply: move on to the next nameserver.
//! * NXDOMAIN: authoritative, stop immediately.
//!
//! A truncated UDP answer is asked again over TCP on the same nameserver.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use subrank_common::config::DnsSettings;
use subrank_common::error::{ConfigurationError, ResolutionFailure};
use subrank_common::models::{RecordType, Resolution, ResolvedHost};
use subrank_protocols::dns::{self, AnswerData, DnsReply, ReplyCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, trace};

#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolves a fully qualified name. Not-found conditions are reported
    /// through [`ResolvedHost::outcome`], never as an error.
    async fn resolve(&self, name: &str) -> ResolvedHost;
}

pub struct UdpResolver {
    nameservers: Vec<SocketAddr>,
    record_types: Vec<RecordType>,
    timeout: Duration,
    retries: u32,
    max_cname_depth: usize,
}

impl UdpResolver {
    pub fn new(settings: &DnsSettings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            nameservers: settings.nameserver_addrs()?,
            record_types: settings.record_types.clone(),
            timeout: settings.timeout,
            retries: settings.retries,
            max_cname_depth: settings.max_cname_depth,
        })
    }

    /// Runs one query against the nameserver list until some server gives a
    /// usable answer.
    async fn query(&self, name: &str, record_type: RecordType) -> Result<DnsReply, ResolutionFailure> {
        let mut worst: Option<ResolutionFailure> = None;

        for nameserver in &self.nameservers {
            for attempt in 0..=self.retries {
                let failure = match self.exchange(*nameserver, name, record_type).await {
                    Ok(reply) => match reply.code {
                        ReplyCode::NoError | ReplyCode::NxDomain => return Ok(reply),
                        ReplyCode::ServFail => ResolutionFailure::ServerFailure,
                        ReplyCode::Refused => ResolutionFailure::Refused,
                        ReplyCode::Other(code) => {
                            ResolutionFailure::Malformed(format!("unexpected rcode {code}"))
                        }
                    },
                    Err(failure) => failure,
                };

                trace!("{record_type} {name} @{nameserver} attempt {attempt}: {failure}");
                let retryable: bool = failure.is_retryable();
                if failure != ResolutionFailure::Timeout {
                    worst = Some(failure);
                }
                if !retryable {
                    break;
                }
            }
        }

        Err(worst.unwrap_or(ResolutionFailure::Timeout))
    }

    async fn exchange(
        &self,
        nameserver: SocketAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<DnsReply, ResolutionFailure> {
        let id: u16 = dns::new_transaction_id();
        let packet: Vec<u8> = dns::create_query_packet(name, record_type, id)
            .map_err(|e| ResolutionFailure::Malformed(e.to_string()))?;

        let local: SocketAddr = match nameserver {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await.map_err(io_failure)?;
        socket.connect(nameserver).await.map_err(io_failure)?;
        socket.send(&packet).await.map_err(io_failure)?;

        let deadline = Instant::now() + self.timeout;
        let mut buffer: Vec<u8> = vec![0u8; dns::MAX_REPLY_LEN];

        let reply: DnsReply = loop {
            let len: usize = match timeout_at(deadline, socket.recv(&mut buffer)).await {
                Err(_) => return Err(ResolutionFailure::Timeout),
                Ok(Err(e)) => return Err(io_failure(e)),
                Ok(Ok(len)) => len,
            };

            match dns::parse_reply(&buffer[..len]) {
                Ok(reply) if reply.id == id => break reply,
                Ok(reply) => debug!("Discarding reply with stale id {} from {nameserver}", reply.id),
                Err(e) => return Err(ResolutionFailure::Malformed(e.to_string())),
            }
        };

        if !reply.truncated {
            return Ok(reply);
        }
        debug!("Truncated {record_type} reply for {name} from {nameserver}, retrying over TCP");
        match exchange_tcp(nameserver, &packet, id, deadline).await {
            Ok(full) => Ok(full),
            Err(e) => {
                debug!("TCP retry for {name} failed ({e}), keeping the truncated answer");
                Ok(reply)
            }
        }
    }
}

/// One query over TCP, framed with the two-byte length prefix.
async fn exchange_tcp(
    nameserver: SocketAddr,
    packet: &[u8],
    id: u16,
    deadline: Instant,
) -> Result<DnsReply, ResolutionFailure> {
    let exchange = async {
        let mut stream = TcpStream::connect(nameserver).await.map_err(io_failure)?;
        let len: u16 = u16::try_from(packet.len())
            .map_err(|_| ResolutionFailure::Malformed("query too large".to_string()))?;
        let mut framed: Vec<u8> = Vec::with_capacity(packet.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(packet);
        stream.write_all(&framed).await.map_err(io_failure)?;

        let reply_len: usize = usize::from(stream.read_u16().await.map_err(io_failure)?);
        let mut reply: Vec<u8> = vec![0u8; reply_len];
        stream.read_exact(&mut reply).await.map_err(io_failure)?;

        let reply: DnsReply =
            dns::parse_reply(&reply).map_err(|e| ResolutionFailure::Malformed(e.to_string()))?;
        if reply.id != id {
            return Err(ResolutionFailure::Malformed(format!("TCP reply id {} does not match", reply.id)));
        }
        Ok(reply)
    };

    timeout_at(deadline, exchange)
        .await
        .unwrap_or(Err(ResolutionFailure::Timeout))
}

#[async_trait]
impl DnsResolver for UdpResolver {
    async fn resolve(&self, name: &str) -> ResolvedHost {
        let name: String = name.trim_end_matches('.').to_ascii_lowercase();
        let mut host = ResolvedHost::new(name.clone());
        let mut last_failure: Option<ResolutionFailure> = None;
        let mut nxdomain: bool = false;
        let mut current: String = name.clone();

        loop {
            let mut next_alias: Option<String> = None;

            for &record_type in &self.record_types {
                if record_type == RecordType::Cname && !host.cname_chain.is_empty() {
                    continue;
                }

                match self.query(&current, record_type).await {
                    Ok(reply) if reply.code == ReplyCode::NxDomain => {
                        nxdomain = current == name;
                        break;
                    }
                    Ok(reply) => {
                        let unresolved = absorb_reply(&mut host, &reply, &current);
                        if record_type != RecordType::Cname && next_alias.is_none() {
                            next_alias = unresolved;
                        }
                    }
                    Err(failure) => last_failure = Some(failure),
                }
            }

            match next_alias {
                Some(alias) if host.cname_chain.len() < self.max_cname_depth && alias != current => {
                    debug!("Following CNAME {current} -> {alias}");
                    current = alias;
                }
                Some(alias) => {
                    debug!("CNAME chain for {name} stopped at {alias}");
                    break;
                }
                None => break,
            }
        }

        host.outcome = if host.has_records() {
            Resolution::Success
        } else if nxdomain {
            Resolution::NxDomain
        } else {
            match last_failure {
                Some(ResolutionFailure::Timeout) => Resolution::Timeout,
                Some(failure) => Resolution::Error(failure),
                None => Resolution::NxDomain,
            }
        };
        host
    }
}

/// Copies the chain and addresses out of a reply. Returns the terminal alias
/// when the reply stops at a CNAME without any address for it.
fn absorb_reply(host: &mut ResolvedHost, reply: &DnsReply, queried: &str) -> Option<String> {
    let mut terminal: String = queried.to_string();
    let mut hops: usize = 0;
    while let Some(target) = reply.cname_for(&terminal) {
        if host.cname_chain.iter().any(|seen| seen == target) || hops > reply.answers.len() {
            break;
        }
        host.add_cname(target.to_string());
        terminal = target.to_string();
        hops += 1;
    }

    let mut found_address: bool = false;
    for answer in &reply.answers {
        if let AnswerData::Address(ip) = answer.data {
            host.add_address(ip);
            found_address = true;
        }
    }

    (hops > 0 && !found_address).then_some(terminal)
}

fn io_failure(e: std::io::Error) -> ResolutionFailure {
    ResolutionFailure::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns_parser::{Packet, QueryType};
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    enum Fake {
        Address(IpAddr),
        Alias(&'static str),
        NxDomain,
        ServFail,
        Silent,
    }

    fn encode_name(name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for label in name.split('.').filter(|l| !l.is_empty()) {
            out.push(label.len() as u8);
            out.extend_from_slice(label.as_bytes());
        }
        out.push(0);
        out
    }

    fn build_reply(query: &[u8], qname: &str, answer: &Fake) -> Vec<u8> {
        let (rcode, records): (u8, Vec<(u16, Vec<u8>)>) = match answer {
            Fake::Address(IpAddr::V4(ip)) => (0, vec![(1, ip.octets().to_vec())]),
            Fake::Address(IpAddr::V6(ip)) => (0, vec![(28, ip.octets().to_vec())]),
            Fake::Alias(target) => (0, vec![(5, encode_name(target))]),
            Fake::NxDomain => (3, vec![]),
            Fake::ServFail => (2, vec![]),
            Fake::Silent => unreachable!(),
        };

        let mut pkt = query[..2].to_vec();
        pkt.extend_from_slice(&[0x81, 0x80 | rcode, 0, 1, 0, records.len() as u8, 0, 0, 0, 0]);
        pkt.extend_from_slice(&query[12..]);
        for (rtype, rdata) in records {
            pkt.extend_from_slice(&encode_name(qname));
            pkt.extend_from_slice(&rtype.to_be_bytes());
            pkt.extend_from_slice(&[0, 1, 0, 0, 0, 30]);
            pkt.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
            pkt.extend_from_slice(&rdata);
        }
        pkt
    }

    /// A nameserver on localhost answering from a static table. Names absent
    /// from the table are NXDOMAIN. Only A queries get address answers.
    async fn fake_nameserver(table: HashMap<&'static str, Fake>) -> (SocketAddr, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let queries = Arc::new(AtomicUsize::new(0));
        let counter = queries.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let query = buf[..len].to_vec();
                let packet = Packet::parse(&query).unwrap();
                let qname = packet.questions[0].qname.to_string();
                let qtype = packet.questions[0].qtype;

                let answer = match table.get(qname.as_str()).cloned() {
                    Some(Fake::Address(_)) if qtype != QueryType::A => {
                        let mut empty = build_reply(&query, &qname, &Fake::NxDomain);
                        empty[3] &= 0xF0;
                        let _ = socket.send_to(&empty, peer).await;
                        continue;
                    }
                    Some(Fake::Silent) => continue,
                    Some(other) => other,
                    None => Fake::NxDomain,
                };
                let reply = build_reply(&query, &qname, &answer);
                let _ = socket.send_to(&reply, peer).await;
            }
        });

        (addr, queries)
    }

    /// Answers A queries for `name` over UDP with the TC bit and no records,
    /// and with the full answer over TCP on the same port.
    async fn truncating_nameserver(name: &'static str, ip: IpAddr) -> (SocketAddr, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        let tcp_queries = Arc::new(AtomicUsize::new(0));
        let counter = tcp_queries.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else { break };
                let query = buf[..len].to_vec();
                let packet = Packet::parse(&query).unwrap();
                let qname = packet.questions[0].qname.to_string();
                let mut reply = build_reply(&query, &qname, &Fake::NxDomain);
                reply[3] &= 0xF0;
                if qname == name && packet.questions[0].qtype == QueryType::A {
                    reply[2] |= 0x02;
                }
                let _ = socket.send_to(&reply, peer).await;
            }
        });

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let len = stream.read_u16().await.unwrap() as usize;
                let mut query = vec![0u8; len];
                stream.read_exact(&mut query).await.unwrap();
                let reply = build_reply(&query, name, &Fake::Address(ip));
                stream.write_all(&(reply.len() as u16).to_be_bytes()).await.unwrap();
                stream.write_all(&reply).await.unwrap();
            }
        });

        (addr, tcp_queries)
    }

    fn resolver(nameservers: Vec<SocketAddr>, retries: u32) -> UdpResolver {
        UdpResolver {
            nameservers,
            record_types: vec![RecordType::A, RecordType::Aaaa, RecordType::Cname],
            timeout: Duration::from_millis(200),
            retries,
            max_cname_depth: 3,
        }
    }

    #[tokio::test]
    async fn resolves_address() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        let (ns, _) = fake_nameserver(HashMap::from([("www.example.com", Fake::Address(ip))])).await;

        let host = resolver(vec![ns], 0).resolve("WWW.example.com.").await;
        assert_eq!(host.name, "www.example.com");
        assert_eq!(host.outcome, Resolution::Success);
        assert_eq!(host.ips(), vec![ip]);
    }

    #[tokio::test]
    async fn nxdomain_is_not_an_error() {
        let (ns, queries) = fake_nameserver(HashMap::new()).await;

        let host = resolver(vec![ns], 2).resolve("ghost.example.com").await;
        assert_eq!(host.outcome, Resolution::NxDomain);
        assert!(!host.is_live());
        assert_eq!(queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn follows_cname_chain_to_address() {
        let ip: IpAddr = "198.51.100.9".parse().unwrap();
        let (ns, _) = fake_nameserver(HashMap::from([
            ("shop.example.com", Fake::Alias("shops.saas.net")),
            ("shops.saas.net", Fake::Alias("edge.cdn.net")),
            ("edge.cdn.net", Fake::Address(ip)),
        ]))
        .await;

        let host = resolver(vec![ns], 0).resolve("shop.example.com").await;
        assert_eq!(host.outcome, Resolution::Success);
        assert_eq!(host.cname_chain, vec!["shops.saas.net", "edge.cdn.net"]);
        assert_eq!(host.ips(), vec![ip]);
    }

    #[tokio::test]
    async fn cname_loop_is_bounded() {
        let (ns, _) = fake_nameserver(HashMap::from([
            ("a.example.com", Fake::Alias("b.example.com")),
            ("b.example.com", Fake::Alias("a.example.com")),
        ]))
        .await;

        let host = resolver(vec![ns], 0).resolve("a.example.com").await;
        assert!(host.cname_chain.len() <= 3);
        assert!(host.ips().is_empty());
        assert_eq!(host.outcome, Resolution::Success);
    }

    #[tokio::test]
    async fn servfail_retries_then_advances_to_next_nameserver() {
        let ip: IpAddr = "10.9.9.9".parse().unwrap();
        let (broken, broken_queries) =
            fake_nameserver(HashMap::from([("api.example.com", Fake::ServFail)])).await;
        let (healthy, _) =
            fake_nameserver(HashMap::from([("api.example.com", Fake::Address(ip))])).await;

        let host = resolver(vec![broken, healthy], 2).resolve("api.example.com").await;
        assert_eq!(host.outcome, Resolution::Success);
        assert_eq!(host.ips(), vec![ip]);
        // One A query: first attempt plus two retries against the broken server.
        assert!(broken_queries.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn silent_nameservers_yield_timeout() {
        let (ns, queries) =
            fake_nameserver(HashMap::from([("slow.example.com", Fake::Silent)])).await;

        let host = resolver(vec![ns], 1).resolve("slow.example.com").await;
        assert_eq!(host.outcome, Resolution::Timeout);
        // Three record types, two attempts each.
        assert_eq!(queries.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn truncated_answer_is_retried_over_tcp() {
        let ip: IpAddr = "10.4.4.4".parse().unwrap();
        let (ns, tcp_queries) = truncating_nameserver("big.example.com", ip).await;

        let host = resolver(vec![ns], 0).resolve("big.example.com").await;
        assert_eq!(host.outcome, Resolution::Success);
        assert_eq!(host.ips(), vec![ip]);
        assert_eq!(tcp_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn malformed_nameserver_fails_construction() {
        let settings = DnsSettings {
            nameservers: vec!["dns.google".into()],
            ..DnsSettings::default()
        };
        assert!(matches!(
            UdpResolver::new(&settings),
            Err(ConfigurationError::InvalidNameserver(_))
        ));
    }
}
