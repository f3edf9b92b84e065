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

//! OpenFlow 1.3 protocol constants used by the flow command pipeline.

use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};

// Reserved port numbers (ofp_port_no).
pub const OFPP_MAX: u32 = 0xffffff00;
pub const OFPP_IN_PORT: u32 = 0xfffffff8;
pub const OFPP_TABLE: u32 = 0xfffffff9;
pub const OFPP_NORMAL: u32 = 0xfffffffa;
pub const OFPP_FLOOD: u32 = 0xfffffffb;
pub const OFPP_ALL: u32 = 0xfffffffc;
pub const OFPP_CONTROLLER: u32 = 0xfffffffd;
pub const OFPP_LOCAL: u32 = 0xfffffffe;
pub const OFPP_ANY: u32 = 0xffffffff;

// Group numbers (ofp_group).
pub const OFPG_MAX: u32 = 0xffffff00;
pub const OFPG_ALL: u32 = 0xfffffffc;
pub const OFPG_ANY: u32 = 0xffffffff;

// Table numbering (ofp_table).
pub const OFPTT_MAX: u8 = 0xfe;
pub const OFPTT_ALL: u8 = 0xff;

pub const OFP_NO_BUFFER: u32 = 0xffffffff;

/// Bit that marks a VLAN id as present in a packet (ofp_vlan_id).
pub const OFPVID_PRESENT: u16 = 0x1000;

// EtherTypes with a textual form on the command line.
pub const ETH_TYPE_IP: u16 = 0x0800;
pub const ETH_TYPE_ARP: u16 = 0x0806;
pub const ETH_TYPE_VLAN: u16 = 0x8100;
pub const ETH_TYPE_IPV6: u16 = 0x86dd;
pub const ETH_TYPE_MPLS: u16 = 0x8847;
pub const ETH_TYPE_MPLS_MCAST: u16 = 0x8848;
pub const ETH_TYPE_PBB: u16 = 0x88e7;

/// OXM match field ids (OFPXMT_OFB_*), extended with the tunnel and
/// pseudo-wire fields following the standard block. Ordering here fixes
/// both match-list sorting and dump ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, IntoPrimitive, TryFromPrimitive,
)]
#[repr(u8)]
pub enum OxmField {
    InPort = 0,
    InPhyPort = 1,
    Metadata = 2,
    EthDst = 3,
    EthSrc = 4,
    EthType = 5,
    VlanVid = 6,
    VlanPcp = 7,
    IpDscp = 8,
    IpEcn = 9,
    IpProto = 10,
    Ipv4Src = 11,
    Ipv4Dst = 12,
    TcpSrc = 13,
    TcpDst = 14,
    UdpSrc = 15,
    UdpDst = 16,
    SctpSrc = 17,
    SctpDst = 18,
    Icmpv4Type = 19,
    Icmpv4Code = 20,
    ArpOp = 21,
    ArpSpa = 22,
    ArpTpa = 23,
    ArpSha = 24,
    ArpTha = 25,
    Ipv6Src = 26,
    Ipv6Dst = 27,
    Ipv6Flabel = 28,
    Icmpv6Type = 29,
    Icmpv6Code = 30,
    Ipv6NdTarget = 31,
    Ipv6NdSll = 32,
    Ipv6NdTll = 33,
    MplsLabel = 34,
    MplsTc = 35,
    MplsBos = 36,
    PbbIsid = 37,
    TunnelId = 38,
    Ipv6Exthdr = 39,
    PbbUca = 41,
    PacketType = 42,
    GreFlags = 43,
    GreVer = 44,
    GreProtocol = 45,
    GreKey = 46,
    GreSeqnum = 47,
    LispFlags = 48,
    LispNonce = 49,
    LispId = 50,
    VxlanFlags = 51,
    VxlanVni = 52,
    MplsDataFirstNibble = 53,
    MplsAchVersion = 54,
    MplsAchChannel = 55,
    MplsPwMetadata = 56,
    MplsCwFlags = 57,
    MplsCwFrag = 58,
    MplsCwLen = 59,
    MplsCwSeqNum = 60,
}

/// Flow-mod command codes (ofp_flow_mod_command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FlowModCommand {
    Add = 0,
    Modify = 1,
    ModifyStrict = 2,
    Delete = 3,
    DeleteStrict = 4,
}

impl FlowModCommand {
    /// Verb embedded in "Can't flow mod (...)" messages.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Modify | Self::ModifyStrict => "MOD",
            Self::Delete | Self::DeleteStrict => "DEL",
        }
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::ModifyStrict | Self::DeleteStrict)
    }

    /// Strict variant of this command, if one exists.
    pub fn into_strict(self) -> Option<Self> {
        match self {
            Self::Modify | Self::ModifyStrict => Some(Self::ModifyStrict),
            Self::Delete | Self::DeleteStrict => Some(Self::DeleteStrict),
            Self::Add => None,
        }
    }
}

bitflags! {
    /// Flow-mod flags (ofp_flow_mod_flags).
    #[derive(Default)]
    pub struct FlowModFlags: u16 {
        const SEND_FLOW_REM = 1 << 0;
        const CHECK_OVERLAP = 1 << 1;
        const RESET_COUNTS = 1 << 2;
        const NO_PKT_COUNTS = 1 << 3;
        const NO_BYT_COUNTS = 1 << 4;
    }
}

/// Protocol error reported by the flow table on a rule-level violation.
/// Only the names cross the boundary, in
/// "ofp_error[type = ..., code = ...]" messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfpError {
    BadMatch(BadMatchCode),
    FlowModFailed(FlowModFailedCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadMatchCode {
    BadType,
    BadLen,
    DupField,
    BadValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowModFailedCode {
    Unknown,
    TableFull,
    BadTableId,
    BadCommand,
}

impl OfpError {
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::BadMatch(_) => "OFPET_BAD_MATCH",
            Self::FlowModFailed(_) => "OFPET_FLOW_MOD_FAILED",
        }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            Self::BadMatch(c) => match c {
                BadMatchCode::BadType => "OFPBMC_BAD_TYPE",
                BadMatchCode::BadLen => "OFPBMC_BAD_LEN",
                BadMatchCode::DupField => "OFPBMC_DUP_FIELD",
                BadMatchCode::BadValue => "OFPBMC_BAD_VALUE",
            },
            Self::FlowModFailed(c) => match c {
                FlowModFailedCode::Unknown => "OFPFMFC_UNKNOWN",
                FlowModFailedCode::TableFull => "OFPFMFC_TABLE_FULL",
                FlowModFailedCode::BadTableId => "OFPFMFC_BAD_TABLE_ID",
                FlowModFailedCode::BadCommand => "OFPFMFC_BAD_COMMAND",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oxm_ordering_follows_declaration() {
        assert!(OxmField::InPort < OxmField::InPhyPort);
        assert!(OxmField::VlanVid < OxmField::Ipv4Src);
        assert!(OxmField::Ipv6Exthdr < OxmField::PbbUca);
        assert!(OxmField::PacketType < OxmField::MplsCwSeqNum);
        assert_eq!(u8::from(OxmField::PbbUca), 41);
    }

    #[test]
    fn command_verbs() {
        assert_eq!(FlowModCommand::Add.verb(), "ADD");
        assert_eq!(FlowModCommand::ModifyStrict.verb(), "MOD");
        assert_eq!(FlowModCommand::Delete.verb(), "DEL");
        assert_eq!(
            FlowModCommand::Delete.into_strict(),
            Some(FlowModCommand::DeleteStrict)
        );
        assert_eq!(FlowModCommand::Add.into_strict(), None);
    }

    #[test]
    fn ofp_error_names() {
        let e = OfpError::BadMatch(BadMatchCode::DupField);
        assert_eq!(e.type_str(), "OFPET_BAD_MATCH");
        assert_eq!(e.code_str(), "OFPBMC_DUP_FIELD");
    }
}
