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

use thiserror::Error;

/// Wire-visible result categories. The string forms appear verbatim in the
/// `ret` member of every command result object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Ok,
    InvalidArgs,
    OutOfRange,
    TooLong,
    NotFound,
    AddrResolverFailure,
    OfpError,
}

impl ResultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::InvalidArgs => "INVALID_ARGS",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::TooLong => "TOO_LONG",
            Self::NotFound => "NOT_FOUND",
            Self::AddrResolverFailure => "ADDR_RESOLVER_FAILURE",
            Self::OfpError => "OFP_ERROR",
        }
    }
}

/// Command errors. The `#[error]` strings are a compatibility contract:
/// consumers match on them byte for byte, so they are never reworded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A value token failed to parse. The kind records which parser
    /// rejected it (syntax, range, width or address resolution).
    #[error("Bad value ({token}).")]
    BadValue { kind: ResultKind, token: String },
    /// A field that requires a value got none.
    #[error("Bad value.")]
    EmptyValue,
    #[error("Bad mask.")]
    BadMask,
    #[error("Bad comma.")]
    BadComma,
    #[error("Bad action.")]
    BadAction,
    #[error("Bad opt ({0}).")]
    BadOpt(String),
    #[error("opt = {0}.")]
    UnknownOpt(String),
    #[error("Bad opt value.")]
    MissingOptValue,
    #[error("Bad opt value = {0}.")]
    BadOptValue(String),
    #[error("Not found cmd ({0}).")]
    NotFoundCmd(String),
    #[error("Not found bridge ({0}).")]
    NotFoundBridge(String),
    /// Flow-mod rejected by the table with an OpenFlow protocol error.
    #[error("Can't flow mod ({verb}), ofp_error[type = {etype}, code = {code}].")]
    FlowModOfp {
        verb: &'static str,
        etype: &'static str,
        code: &'static str,
    },
    /// Empty argument list. The result object carries no `data` member.
    #[error("invalid args")]
    InvalidArgs,
}

impl Error {
    pub fn kind(&self) -> ResultKind {
        match self {
            Self::BadValue { kind, .. } => *kind,
            Self::EmptyValue
            | Self::BadMask
            | Self::BadComma
            | Self::BadAction
            | Self::BadOpt(_)
            | Self::UnknownOpt(_)
            | Self::MissingOptValue
            | Self::BadOptValue(_)
            | Self::InvalidArgs => ResultKind::InvalidArgs,
            Self::NotFoundCmd(_) | Self::NotFoundBridge(_) => ResultKind::NotFound,
            Self::FlowModOfp { .. } => ResultKind::OfpError,
        }
    }

    /// Message for the result object's `data` member, if this error
    /// carries one.
    pub fn data(&self) -> Option<String> {
        match self {
            Self::InvalidArgs => None,
            _ => Some(self.to_string()),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
