use std::net::IpAddr;

use anyhow::{Context, ensure};
use dns_parser::{Packet, RData, ResponseCode};
use pnet::packet::dns::{DnsClass, DnsType, DnsTypes, MutableDnsPacket, Opcode, Retcode};

use subrank_common::models::RecordType;

pub const DNS_HDR_LEN: usize = 12;
/// Large enough for any reply to a single-question query without EDNS.
pub const MAX_REPLY_LEN: usize = 4096;

const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    NoError,
    NxDomain,
    ServFail,
    Refused,
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerData {
    Address(IpAddr),
    Cname(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub name: String,
    pub data: AnswerData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsReply {
    pub id: u16,
    pub code: ReplyCode,
    pub truncated: bool,
    pub answers: Vec<Answer>,
}

impl DnsReply {
    pub fn addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.answers.iter().filter_map(|answer| match answer.data {
            AnswerData::Address(ip) => Some(ip),
            AnswerData::Cname(_) => None,
        })
    }

    /// The canonical name `name` is aliased to, if the reply carries one.
    pub fn cname_for(&self, name: &str) -> Option<&str> {
        self.answers.iter().find_map(|answer| match &answer.data {
            AnswerData::Cname(target) if names_match(&answer.name, name) => Some(target.as_str()),
            _ => None,
        })
    }
}

pub fn new_transaction_id() -> u16 {
    rand::random()
}

/// Builds a recursive standard query for `name`.
pub fn create_query_packet(name: &str, record_type: RecordType, id: u16) -> anyhow::Result<Vec<u8>> {
    let question = Question::new(name, record_type)?;
    let mut buffer: Vec<u8> = vec![0u8; DNS_HDR_LEN];
    QueryHeader::recursive(id).write(&mut buffer)?;
    question.append_to(&mut buffer);
    Ok(buffer)
}

/// Header of an outgoing query. Every field left out here is zero on the wire.
#[derive(Debug, Clone, Copy)]
struct QueryHeader {
    id: u16,
    recursion_desired: bool,
}

impl QueryHeader {
    fn recursive(id: u16) -> Self {
        Self {
            id,
            recursion_desired: true,
        }
    }

    fn write(&self, buffer: &mut [u8]) -> anyhow::Result<()> {
        let mut dns: MutableDnsPacket =
            MutableDnsPacket::new(buffer).context("buffer too small for a DNS header")?;
        dns.set_id(self.id);
        dns.set_opcode(Opcode::StandardQuery);
        dns.set_is_recursion_desirable(u8::from(self.recursion_desired));
        dns.set_rcode(Retcode::NoError);
        dns.set_query_count(1);
        Ok(())
    }
}

/// One IN-class question for an address or alias record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Question {
    qname: Vec<u8>,
    qtype: DnsType,
}

impl Question {
    fn new(name: &str, record_type: RecordType) -> anyhow::Result<Self> {
        Ok(Self {
            qname: encode_dns_name(name)?,
            qtype: dns_type(record_type),
        })
    }

    fn append_to(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.qname);
        buffer.extend_from_slice(&self.qtype.0.to_be_bytes());
        buffer.extend_from_slice(&CLASS_IN.0.to_be_bytes());
    }
}

const CLASS_IN: DnsClass = DnsClass(1);

fn dns_type(record_type: RecordType) -> DnsType {
    match record_type {
        RecordType::A => DnsTypes::A,
        RecordType::Aaaa => DnsTypes::AAAA,
        RecordType::Cname => DnsTypes::CNAME,
    }
}

/// Parses a reply, keeping only the A, AAAA and CNAME answers.
pub fn parse_reply(payload: &[u8]) -> anyhow::Result<DnsReply> {
    let packet = Packet::parse(payload).context("failed to parse DNS reply")?;
    ensure!(!packet.header.query, "packet is a query, not a reply");

    let code: ReplyCode = match packet.header.response_code {
        ResponseCode::NoError => ReplyCode::NoError,
        ResponseCode::NameError => ReplyCode::NxDomain,
        ResponseCode::ServerFailure => ReplyCode::ServFail,
        ResponseCode::Refused => ReplyCode::Refused,
        other => ReplyCode::Other(other.into()),
    };

    let answers: Vec<Answer> = packet
        .answers
        .iter()
        .filter_map(|record| {
            let data = match &record.data {
                RData::A(a) => AnswerData::Address(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => AnswerData::Address(IpAddr::V6(aaaa.0)),
                RData::CNAME(cname) => AnswerData::Cname(normalize_name(&cname.0.to_string())),
                _ => return None,
            };
            Some(Answer {
                name: normalize_name(&record.name.to_string()),
                data,
            })
        })
        .collect();

    Ok(DnsReply {
        id: packet.header.id,
        code,
        truncated: packet.header.truncated,
        answers,
    })
}

pub fn names_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('.').eq_ignore_ascii_case(b.trim_end_matches('.'))
}

fn normalize_name(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

fn encode_dns_name(name: &str) -> anyhow::Result<Vec<u8>> {
    let name: &str = name.trim_end_matches('.');
    ensure!(name.len() <= MAX_NAME_LEN, "name longer than {MAX_NAME_LEN} bytes");

    let mut encoded: Vec<u8> = Vec::with_capacity(name.len() + 2);
    for label in name.split('.') {
        if label.is_empty() {
            continue;
        }
        ensure!(label.len() <= MAX_LABEL_LEN, "label '{label}' too long");
        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }
    encoded.push(0);
    Ok(encoded)
}
