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

//! Compiled flow-mod request model: typed match fields, actions,
//! instructions and the request struct handed to the flow table.

use std::net::{Ipv4Addr, Ipv6Addr};

use public::utils::net::MacAddr;

use crate::field::MatchFieldSpec;
use crate::openflow::{FlowModCommand, FlowModFlags, OFPG_ANY, OFPP_ANY, OFP_NO_BUFFER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    UInt(u64),
    Mac(MacAddr),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
}

/// One compiled match field. The spec reference carries the name, OXM id
/// and render width for the dump side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchField {
    pub spec: &'static MatchFieldSpec,
    pub value: FieldValue,
    pub mask: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Output(u32),
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl(u8),
    DecMplsTtl,
    PushVlan(u16),
    PopVlan,
    PushMpls(u16),
    PopMpls(u16),
    SetQueue(u32),
    Group(u32),
    SetNwTtl(u8),
    DecNwTtl,
    SetField(MatchField),
    PushPbb(u16),
    PopPbb,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    GotoTable(u8),
    WriteMetadata { metadata: u64, mask: Option<u64> },
    WriteActions(Vec<Action>),
    ApplyActions(Vec<Action>),
    ClearActions,
    Meter(u32),
}

/// Fully assembled flow-mod request. Built once per command invocation and
/// consumed by the table layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowModRequest {
    pub command: FlowModCommand,
    pub table_id: u8,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub cookie: u64,
    pub cookie_mask: u64,
    pub flags: FlowModFlags,
    pub out_port: u32,
    pub out_group: u32,
    pub buffer_id: u32,
    /// Kept sorted ascending by OXM field id.
    pub matches: Vec<MatchField>,
    /// Input token order.
    pub instructions: Vec<Instruction>,
}

impl FlowModRequest {
    pub fn new(command: FlowModCommand) -> Self {
        Self {
            command,
            table_id: 0,
            priority: 0,
            idle_timeout: 0,
            hard_timeout: 0,
            cookie: 0,
            cookie_mask: 0,
            flags: FlowModFlags::empty(),
            out_port: OFPP_ANY,
            out_group: OFPG_ANY,
            buffer_id: OFP_NO_BUFFER,
            matches: Vec::new(),
            instructions: Vec::new(),
        }
    }

    /// Insert before the first entry with a larger OXM id. Repeated ids
    /// stay adjacent in input order; the table layer rejects them.
    pub fn insert_match(&mut self, field: MatchField) {
        let pos = self
            .matches
            .iter()
            .position(|m| m.spec.oxm > field.spec.oxm)
            .unwrap_or(self.matches.len());
        self.matches.insert(pos, field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::match_field_lookup;
    use crate::openflow::OxmField;

    fn uint_match(name: &str, value: u64) -> MatchField {
        MatchField {
            spec: match_field_lookup(name).unwrap(),
            value: FieldValue::UInt(value),
            mask: None,
        }
    }

    #[test]
    fn defaults() {
        let req = FlowModRequest::new(FlowModCommand::Add);
        assert_eq!(req.out_port, OFPP_ANY);
        assert_eq!(req.out_group, OFPG_ANY);
        assert_eq!(req.buffer_id, OFP_NO_BUFFER);
        assert_eq!(req.table_id, 0);
        assert_eq!(req.priority, 0);
        assert!(req.flags.is_empty());
        assert!(req.matches.is_empty());
    }

    #[test]
    fn matches_stay_sorted() {
        let mut req = FlowModRequest::new(FlowModCommand::Add);
        req.insert_match(uint_match("vlan_vid", 0x1001));
        req.insert_match(uint_match("in_port", 1));
        req.insert_match(uint_match("tunnel_id", 9));
        req.insert_match(uint_match("dl_type", 0x0800));

        let order: Vec<OxmField> = req.matches.iter().map(|m| m.spec.oxm).collect();
        assert_eq!(
            order,
            vec![
                OxmField::InPort,
                OxmField::EthType,
                OxmField::VlanVid,
                OxmField::TunnelId
            ]
        );
    }

    #[test]
    fn duplicate_ids_stay_adjacent() {
        let mut req = FlowModRequest::new(FlowModCommand::Add);
        req.insert_match(uint_match("in_port", 0));
        req.insert_match(uint_match("dl_type", 0x0800));
        req.insert_match(uint_match("in_port", 1));

        assert_eq!(req.matches[0].value, FieldValue::UInt(0));
        assert_eq!(req.matches[1].value, FieldValue::UInt(1));
        assert_eq!(req.matches[2].spec.oxm, OxmField::EthType);
    }
}
