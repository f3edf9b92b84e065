/*
 * Copyright (c) 2024 The flowstore Authors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Token-to-value parsers. Every parser takes a trimmed token and reports
//! failures with the exact message and result kind the command surface
//! exposes.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::num::IntErrorKind;

use public::utils::net::{MacAddr, MAC_ADDR_LEN};

use crate::error::{Error, Result, ResultKind};
use crate::field::AliasTable;

const TRIM_CHARS: &[char] = &[' ', '\t', '\r', '\n'];

pub fn trim(s: &str) -> &str {
    s.trim_matches(TRIM_CHARS)
}

fn invalid(token: &str) -> Error {
    Error::BadValue {
        kind: ResultKind::InvalidArgs,
        token: token.to_string(),
    }
}

/// Parse a u64 in decimal or `0x` hex. Overflowing 64 bits is a range
/// error carrying the raw token; anything non-numeric is a syntax error.
pub fn parse_u64(token: &str) -> Result<u64> {
    if token.is_empty() {
        return Err(Error::EmptyValue);
    }
    let (digits, radix) = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (token, 10),
    };
    if digits.is_empty() {
        return Err(invalid(token));
    }
    u64::from_str_radix(digits, radix).map_err(|e| {
        if matches!(e.kind(), IntErrorKind::PosOverflow) {
            Error::BadValue {
                kind: ResultKind::OutOfRange,
                token: token.to_string(),
            }
        } else {
            invalid(token)
        }
    })
}

/// Numeric field parser: u64 parse, bound check against the field's max,
/// and symbolic alias fallback when the numeric parse was a syntax error.
///
/// A value above a sub-64-bit max reports the *parsed number*, not the raw
/// token (hex input surfaces in decimal).
pub fn parse_uint(token: &str, max: u64, alias: Option<AliasTable>) -> Result<u64> {
    match parse_u64(token) {
        Ok(v) => {
            if max != u64::MAX && v > max {
                return Err(Error::BadValue {
                    kind: ResultKind::TooLong,
                    token: v.to_string(),
                });
            }
            Ok(v)
        }
        Err(
            e @ Error::BadValue {
                kind: ResultKind::InvalidArgs,
                ..
            },
        ) => {
            if let Some(table) = alias {
                if let Some(v) = table.lookup(token) {
                    return Ok(v);
                }
            }
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn bad_mac(token: &str) -> Error {
    Error::BadValue {
        kind: ResultKind::OutOfRange,
        token: token.to_string(),
    }
}

/// Exactly six colon-separated two-hex-digit octets.
pub fn parse_mac(token: &str) -> Result<MacAddr> {
    let mut octets = [0u8; MAC_ADDR_LEN];
    let mut n = 0;
    for part in token.split(':') {
        if n >= MAC_ADDR_LEN || part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(bad_mac(token));
        }
        octets[n] = u8::from_str_radix(part, 16).map_err(|_| bad_mac(token))?;
        n += 1;
    }
    if n != MAC_ADDR_LEN {
        return Err(bad_mac(token));
    }
    Ok(MacAddr::from(octets))
}

fn bad_addr(token: &str) -> Error {
    Error::BadValue {
        kind: ResultKind::AddrResolverFailure,
        token: token.to_string(),
    }
}

pub fn parse_ipv4(token: &str) -> Result<Ipv4Addr> {
    token.parse().map_err(|_| bad_addr(token))
}

pub fn parse_ipv6(token: &str) -> Result<Ipv6Addr> {
    token.parse().map_err(|_| bad_addr(token))
}

/// Split `value[/mask]`. Both halves come back trimmed; an empty half or
/// more than one `/` is malformed.
pub fn mask_split(token: &str) -> Result<(&str, Option<&str>)> {
    let mut parts = token.split('/');
    let value = trim(parts.next().unwrap_or(""));
    match parts.next() {
        None => Ok((value, None)),
        Some(mask) => {
            let mask = trim(mask);
            if value.is_empty() || mask.is_empty() || parts.next().is_some() {
                return Err(Error::BadMask);
            }
            Ok((value, Some(mask)))
        }
    }
}
