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

//! Field descriptor tables: one spec per match field, action, instruction
//! and top-level flow option, plus the symbolic alias maps. The tables are
//! pure data; the compiler drives all parsing off them.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::openflow::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Numeric field. `max` bounds the parsed value; `len` is the OXM
    /// payload length in bytes and sizes the mask hex rendering on dump.
    UInt { max: u64, len: u8 },
    Mac,
    Ipv4,
    Ipv6,
}

/// Per-field symbolic value table, resolved when numeric parsing fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasTable {
    Port,
    EtherType,
    Group,
    Table,
}

impl AliasTable {
    pub fn lookup(self, name: &str) -> Option<u64> {
        let map: &HashMap<&str, u64> = match self {
            Self::Port => &PORT_ALIASES,
            Self::EtherType => &ETHER_TYPE_ALIASES,
            Self::Group => &GROUP_ALIASES,
            Self::Table => &TABLE_ALIASES,
        };
        map.get(name).copied()
    }
}

/// Post-parse value adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueHook {
    /// OR the VLAN present bit into the stored value.
    VlanVidPresent,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MatchFieldSpec {
    pub name: &'static str,
    pub oxm: OxmField,
    pub kind: FieldKind,
    pub has_mask: bool,
    pub alias: Option<AliasTable>,
    pub hook: Option<ValueHook>,
}

const U8: u64 = u8::MAX as u64;
const U16: u64 = u16::MAX as u64;
const U24: u64 = 0xff_ffff;
const U32: u64 = u32::MAX as u64;
const U64: u64 = u64::MAX;

const fn uint(max: u64, len: u8) -> FieldKind {
    FieldKind::UInt { max, len }
}

const fn mf(
    name: &'static str,
    oxm: OxmField,
    kind: FieldKind,
    has_mask: bool,
    alias: Option<AliasTable>,
    hook: Option<ValueHook>,
) -> MatchFieldSpec {
    MatchFieldSpec {
        name,
        oxm,
        kind,
        has_mask,
        alias,
        hook,
    }
}

use AliasTable::{EtherType as AtEtherType, Port as AtPort};
use OxmField::*;

/// Match field specs in declaration order.
#[rustfmt::skip]
pub static MATCH_FIELDS: &[MatchFieldSpec] = &[
    mf("in_port",      InPort,      uint(U32, 4), false, Some(AtPort),      None),
    mf("in_phy_port",  InPhyPort,   uint(U32, 4), false, Some(AtPort),      None),
    mf("metadata",     Metadata,    uint(U64, 8), true,  None,              None),
    mf("dl_dst",       EthDst,      FieldKind::Mac, true,  None,            None),
    mf("dl_src",       EthSrc,      FieldKind::Mac, true,  None,            None),
    mf("dl_type",      EthType,     uint(U16, 2), false, Some(AtEtherType), None),
    mf("vlan_vid",     VlanVid,     uint(U16, 2), true,  None, Some(ValueHook::VlanVidPresent)),
    mf("vlan_pcp",     VlanPcp,     uint(7, 1),   false, None, None),
    mf("ip_dscp",      IpDscp,      uint(63, 1),  false, None, None),
    mf("nw_ecn",       IpEcn,       uint(3, 1),   false, None, None),
    mf("nw_proto",     IpProto,     uint(U8, 1),  false, None, None),
    mf("nw_src",       Ipv4Src,     FieldKind::Ipv4, true,  None, None),
    mf("nw_dst",       Ipv4Dst,     FieldKind::Ipv4, true,  None, None),
    mf("tcp_src",      TcpSrc,      uint(U16, 2), false, None, None),
    mf("tcp_dst",      TcpDst,      uint(U16, 2), false, None, None),
    mf("udp_src",      UdpSrc,      uint(U16, 2), false, None, None),
    mf("udp_dst",      UdpDst,      uint(U16, 2), false, None, None),
    mf("sctp_src",     SctpSrc,     uint(U16, 2), false, None, None),
    mf("sctp_dst",     SctpDst,     uint(U16, 2), false, None, None),
    mf("icmp_type",    Icmpv4Type,  uint(U8, 1),  false, None, None),
    mf("icmp_code",    Icmpv4Code,  uint(U8, 1),  false, None, None),
    mf("arp_op",       ArpOp,       uint(U16, 2), false, None, None),
    mf("arp_spa",      ArpSpa,      FieldKind::Ipv4, true,  None, None),
    mf("arp_tpa",      ArpTpa,      FieldKind::Ipv4, true,  None, None),
    mf("arp_sha",      ArpSha,      FieldKind::Mac,  true,  None, None),
    mf("arp_tha",      ArpTha,      FieldKind::Mac,  true,  None, None),
    mf("ipv6_src",     Ipv6Src,     FieldKind::Ipv6, true,  None, None),
    mf("ipv6_dst",     Ipv6Dst,     FieldKind::Ipv6, true,  None, None),
    mf("ipv6_label",   Ipv6Flabel,  uint(1048575, 4), true, None, None),
    mf("icmpv6_type",  Icmpv6Type,  uint(U8, 1),  false, None, None),
    mf("icmpv6_code",  Icmpv6Code,  uint(U8, 1),  false, None, None),
    mf("nd_target",    Ipv6NdTarget, FieldKind::Ipv6, false, None, None),
    mf("nd_sll",       Ipv6NdSll,   FieldKind::Mac,  false, None, None),
    mf("nd_tll",       Ipv6NdTll,   FieldKind::Mac,  false, None, None),
    mf("mpls_label",   MplsLabel,   uint(1048575, 4), false, None, None),
    mf("mpls_tc",      MplsTc,      uint(7, 1),   false, None, None),
    mf("mpls_bos",     MplsBos,     uint(1, 1),   false, None, None),
    mf("pbb_isid",     PbbIsid,     uint(U24, 3), true,  None, None),
    mf("tunnel_id",    TunnelId,    uint(U64, 8), true,  None, None),
    mf("ipv6_exthdr",  Ipv6Exthdr,  uint(511, 2), true,  None, None),
    mf("pbb_uca",      PbbUca,      uint(1, 1),   false, None, None),
    mf("packet_type",  PacketType,  uint(U32, 4), false, None, None),
    mf("gre_flags",    GreFlags,    uint(8191, 2), true, None, None),
    mf("gre_ver",      GreVer,      uint(7, 1),   false, None, None),
    mf("gre_protocol", GreProtocol, uint(U16, 2), false, None, None),
    mf("gre_key",      GreKey,      uint(U32, 4), true,  None, None),
    mf("gre_seqnum",   GreSeqnum,   uint(U32, 4), false, None, None),
    mf("lisp_flags",   LispFlags,   uint(U8, 1),  true,  None, None),
    mf("lisp_nonce",   LispNonce,   uint(U24, 3), true,  None, None),
    mf("lisp_id",      LispId,      uint(U32, 4), false, None, None),
    mf("vxlan_flags",  VxlanFlags,  uint(U8, 1),  true,  None, None),
    mf("vxlan_vni",    VxlanVni,    uint(U24, 3), false, None, None),
    mf("mpls_data_first_nibble", MplsDataFirstNibble, uint(15, 1), true,  None, None),
    mf("mpls_ach_version",       MplsAchVersion,      uint(15, 1), false, None, None),
    mf("mpls_ach_channel",       MplsAchChannel,      uint(U16, 2), true, None, None),
    mf("mpls_pw_metadata",       MplsPwMetadata,      uint(1, 1),  true,  None, None),
    mf("mpls_cw_flags",          MplsCwFlags,         uint(15, 1), true,  None, None),
    mf("mpls_cw_frag",           MplsCwFrag,          uint(3, 1),  true,  None, None),
    mf("mpls_cw_len",            MplsCwLen,           uint(63, 1), false, None, None),
    mf("mpls_cw_seq_num",        MplsCwSeqNum,        uint(U16, 2), false, None, None),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOp {
    Output,
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl,
    DecMplsTtl,
    PushVlan,
    PopVlan,
    PushMpls,
    PopMpls,
    SetQueue,
    Group,
    SetNwTtl,
    DecNwTtl,
    PushPbb,
    PopPbb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    None,
    UInt { max: u64, alias: Option<AliasTable> },
}

#[derive(Debug, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub op: ActionOp,
    pub arg: ActionArg,
}

const fn act(name: &'static str, op: ActionOp, arg: ActionArg) -> ActionSpec {
    ActionSpec { name, op, arg }
}

const fn act_uint(name: &'static str, op: ActionOp, max: u64) -> ActionSpec {
    act(name, op, ActionArg::UInt { max, alias: None })
}

const fn act_flag(name: &'static str, op: ActionOp) -> ActionSpec {
    act(name, op, ActionArg::None)
}

#[rustfmt::skip]
pub static ACTIONS: &[ActionSpec] = &[
    act("output", ActionOp::Output,
        ActionArg::UInt { max: U32, alias: Some(AliasTable::Port) }),
    act_flag("copy_ttl_out", ActionOp::CopyTtlOut),
    act_flag("copy_ttl_in",  ActionOp::CopyTtlIn),
    act_uint("set_mpls_ttl", ActionOp::SetMplsTtl, U8),
    act_flag("dec_mpls_ttl", ActionOp::DecMplsTtl),
    act_uint("push_vlan",    ActionOp::PushVlan, U16),
    act_flag("strip_vlan",   ActionOp::PopVlan),
    act_uint("push_mpls",    ActionOp::PushMpls, U16),
    act_uint("pop_mpls",     ActionOp::PopMpls, U16),
    act_uint("set_queue",    ActionOp::SetQueue, U32),
    act("group", ActionOp::Group,
        ActionArg::UInt { max: U32, alias: Some(AliasTable::Group) }),
    act_uint("set_nw_ttl",   ActionOp::SetNwTtl, U8),
    act_flag("dec_nw_ttl",   ActionOp::DecNwTtl),
    act_uint("push_pbb",     ActionOp::PushPbb, U16),
    act_flag("pop_pbb",      ActionOp::PopPbb),
];

/// Top-level flow-mod options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowFieldKind {
    Cookie,
    Table,
    IdleTimeout,
    HardTimeout,
    Priority,
    OutPort,
    OutGroup,
    SendFlowRem,
    CheckOverlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionKind {
    GotoTable,
    WriteMetadata,
    WriteActions,
    ApplyActions,
    ClearActions,
    Meter,
}

/// What a key in the flow-mod argument list resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowModKey {
    Match(&'static MatchFieldSpec),
    Field(FlowFieldKind),
    Instruction(InstructionKind),
    /// The `-strict` option.
    StrictOpt,
}

lazy_static! {
    static ref PORT_ALIASES: HashMap<&'static str, u64> = HashMap::from([
        ("in_port", OFPP_IN_PORT as u64),
        ("table", OFPP_TABLE as u64),
        ("normal", OFPP_NORMAL as u64),
        ("flood", OFPP_FLOOD as u64),
        ("all", OFPP_ALL as u64),
        ("controller", OFPP_CONTROLLER as u64),
        ("local", OFPP_LOCAL as u64),
        ("any", OFPP_ANY as u64),
    ]);
    static ref ETHER_TYPE_ALIASES: HashMap<&'static str, u64> = HashMap::from([
        ("ip", ETH_TYPE_IP as u64),
        ("arp", ETH_TYPE_ARP as u64),
        ("vlan", ETH_TYPE_VLAN as u64),
        ("ipv6", ETH_TYPE_IPV6 as u64),
        ("mpls", ETH_TYPE_MPLS as u64),
        ("mpls_mcast", ETH_TYPE_MPLS_MCAST as u64),
        ("pbb", ETH_TYPE_PBB as u64),
    ]);
    static ref GROUP_ALIASES: HashMap<&'static str, u64> = HashMap::from([
        ("all", OFPG_ALL as u64),
        ("any", OFPG_ANY as u64),
    ]);
    static ref TABLE_ALIASES: HashMap<&'static str, u64> =
        HashMap::from([("all", OFPTT_ALL as u64)]);

    /// Key table for the outer flow-mod argument list: every match field,
    /// the top-level options, the instructions and `-strict`.
    pub static ref FLOW_MOD_TABLE: HashMap<&'static str, FlowModKey> = {
        let mut m = HashMap::new();
        for spec in MATCH_FIELDS {
            m.insert(spec.name, FlowModKey::Match(spec));
        }
        m.insert("cookie", FlowModKey::Field(FlowFieldKind::Cookie));
        m.insert("table", FlowModKey::Field(FlowFieldKind::Table));
        m.insert("idle_timeout", FlowModKey::Field(FlowFieldKind::IdleTimeout));
        m.insert("hard_timeout", FlowModKey::Field(FlowFieldKind::HardTimeout));
        m.insert("priority", FlowModKey::Field(FlowFieldKind::Priority));
        m.insert("out_port", FlowModKey::Field(FlowFieldKind::OutPort));
        m.insert("out_group", FlowModKey::Field(FlowFieldKind::OutGroup));
        m.insert("send_flow_rem", FlowModKey::Field(FlowFieldKind::SendFlowRem));
        m.insert("check_overlap", FlowModKey::Field(FlowFieldKind::CheckOverlap));
        m.insert("goto_table", FlowModKey::Instruction(InstructionKind::GotoTable));
        m.insert("write_metadata", FlowModKey::Instruction(InstructionKind::WriteMetadata));
        m.insert("write_actions", FlowModKey::Instruction(InstructionKind::WriteActions));
        m.insert("apply_actions", FlowModKey::Instruction(InstructionKind::ApplyActions));
        m.insert("clear_actions", FlowModKey::Instruction(InstructionKind::ClearActions));
        m.insert("meter", FlowModKey::Instruction(InstructionKind::Meter));
        m.insert("-strict", FlowModKey::StrictOpt);
        m
    };

    pub static ref ACTION_TABLE: HashMap<&'static str, &'static ActionSpec> =
        ACTIONS.iter().map(|spec| (spec.name, spec)).collect();

    static ref MATCH_TABLE: HashMap<&'static str, &'static MatchFieldSpec> =
        MATCH_FIELDS.iter().map(|spec| (spec.name, spec)).collect();
}

pub fn match_field_lookup(name: &str) -> Option<&'static MatchFieldSpec> {
    MATCH_TABLE.get(name).copied()
}

/// Lookup for `set_field` sub-actions. Pipeline fields cannot be set on a
/// packet, so they are not addressable here.
pub fn set_field_lookup(name: &str) -> Option<&'static MatchFieldSpec> {
    match_field_lookup(name).filter(|spec| {
        !matches!(
            spec.oxm,
            OxmField::InPort | OxmField::InPhyPort | OxmField::Metadata
        )
    })
}

/// Reserved port number back to its textual form.
pub fn port_string(port: u32) -> Option<&'static str> {
    match port {
        OFPP_IN_PORT => Some("in_port"),
        OFPP_TABLE => Some("table"),
        OFPP_NORMAL => Some("normal"),
        OFPP_FLOOD => Some("flood"),
        OFPP_ALL => Some("all"),
        OFPP_CONTROLLER => Some("controller"),
        OFPP_LOCAL => Some("local"),
        OFPP_ANY => Some("any"),
        _ => None,
    }
}

pub fn ether_type_string(eth_type: u16) -> Option<&'static str> {
    match eth_type {
        ETH_TYPE_IP => Some("ip"),
        ETH_TYPE_ARP => Some("arp"),
        ETH_TYPE_VLAN => Some("vlan"),
        ETH_TYPE_IPV6 => Some("ipv6"),
        ETH_TYPE_MPLS => Some("mpls"),
        ETH_TYPE_MPLS_MCAST => Some("mpls_mcast"),
        ETH_TYPE_PBB => Some("pbb"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_table_is_complete() {
        assert_eq!(MATCH_FIELDS.len(), 60);
        for spec in MATCH_FIELDS {
            assert_eq!(match_field_lookup(spec.name), Some(spec));
        }
    }

    #[test]
    fn mask_policy_samples() {
        assert!(match_field_lookup("metadata").unwrap().has_mask);
        assert!(match_field_lookup("dl_src").unwrap().has_mask);
        assert!(match_field_lookup("vlan_vid").unwrap().has_mask);
        assert!(!match_field_lookup("mpls_label").unwrap().has_mask);
        assert!(!match_field_lookup("nd_sll").unwrap().has_mask);
        assert!(!match_field_lookup("in_port").unwrap().has_mask);
    }

    #[test]
    fn alias_values() {
        assert_eq!(AliasTable::Port.lookup("any"), Some(OFPP_ANY as u64));
        assert_eq!(
            AliasTable::Port.lookup("controller"),
            Some(OFPP_CONTROLLER as u64)
        );
        assert_eq!(AliasTable::EtherType.lookup("ip"), Some(0x0800));
        assert_eq!(AliasTable::EtherType.lookup("pbb"), Some(0x88e7));
        assert_eq!(AliasTable::Group.lookup("all"), Some(OFPG_ALL as u64));
        assert_eq!(AliasTable::Table.lookup("all"), Some(0xff));
        assert_eq!(AliasTable::Port.lookup("hoge"), None);
    }

    #[test]
    fn set_field_excludes_pipeline_fields() {
        assert!(set_field_lookup("dl_src").is_some());
        assert!(set_field_lookup("in_port").is_none());
        assert!(set_field_lookup("in_phy_port").is_none());
        assert!(set_field_lookup("metadata").is_none());
    }

    #[test]
    fn flow_mod_table_entries() {
        assert!(matches!(
            FLOW_MOD_TABLE.get("in_port"),
            Some(FlowModKey::Match(_))
        ));
        assert!(matches!(
            FLOW_MOD_TABLE.get("priority"),
            Some(FlowModKey::Field(FlowFieldKind::Priority))
        ));
        assert!(matches!(
            FLOW_MOD_TABLE.get("apply_actions"),
            Some(FlowModKey::Instruction(InstructionKind::ApplyActions))
        ));
        assert!(matches!(
            FLOW_MOD_TABLE.get("-strict"),
            Some(FlowModKey::StrictOpt)
        ));
        assert!(FLOW_MOD_TABLE.get("hoge").is_none());
    }

    #[test]
    fn alias_reversal() {
        assert_eq!(port_string(OFPP_ANY), Some("any"));
        assert_eq!(port_string(1), None);
        assert_eq!(ether_type_string(0x0800), Some("ip"));
        assert_eq!(ether_type_string(0x1234), None);
    }
}
