// 16-byte binary values (UUID, IPADDR, INT128) are held as the little-endian
// bytes of a u128, matching the wire layout. All-zero is null.

use crate::types::DataType;
use dolphin_base::{parse_err, type_err, Result};
use std::net::{Ipv4Addr, Ipv6Addr};

pub type Fixed16 = [u8; 16];

pub const FIXED_NULL: Fixed16 = [0u8; 16];

pub fn is_null(v: &Fixed16) -> bool {
    *v == FIXED_NULL
}

pub fn to_u128(v: &Fixed16) -> u128 {
    u128::from_le_bytes(*v)
}

pub fn from_u128(v: u128) -> Fixed16 {
    v.to_le_bytes()
}

pub fn format(ty: DataType, v: &Fixed16) -> String {
    if is_null(v) {
        return String::new();
    }
    let n = to_u128(v);
    match ty {
        DataType::Uuid => {
            let h = format!("{:032x}", n);
            format!("{}-{}-{}-{}-{}", &h[0..8], &h[8..12], &h[12..16], &h[16..20], &h[20..32])
        }
        DataType::IpAddr => {
            if n >> 32 == 0 {
                Ipv4Addr::from(n as u32).to_string()
            } else {
                Ipv6Addr::from(n).to_string()
            }
        }
        _ => format!("{:032x}", n),
    }
}

fn parse_hex128(s: &str) -> Option<u128> {
    if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u128::from_str_radix(s, 16).ok()
}

/// Parses text into a 16-byte value; empty text is null.
pub fn parse(ty: DataType, text: &str) -> Result<Fixed16> {
    let s = text.trim();
    if s.is_empty() {
        return Ok(FIXED_NULL);
    }
    let parsed = match ty {
        DataType::Uuid => {
            let groups: Vec<&str> = s.split('-').collect();
            let lens: Vec<usize> = groups.iter().map(|g| g.len()).collect();
            if lens == [8, 4, 4, 4, 12] || lens == [32] {
                parse_hex128(&groups.concat())
            } else {
                None
            }
        }
        DataType::IpAddr => match s.parse::<Ipv4Addr>() {
            Ok(v4) => Some(u32::from(v4) as u128),
            Err(_) => s.parse::<Ipv6Addr>().ok().map(u128::from),
        },
        DataType::Int128 => parse_hex128(s),
        _ => return Err(type_err(format!("{} is not a 16-byte binary type", ty))),
    };
    parsed
        .map(from_u128)
        .ok_or_else(|| parse_err(format!("cannot parse '{}' as {}", text, ty)))
}
