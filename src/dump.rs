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

//! Flow table dump serializer. The output is a byte-level contract:
//! member order is fixed, strings use the datastore escape table (notably
//! `/` escapes to `\/`), and every alias and mask rule from parsing is
//! applied in reverse.

use crate::field::{ether_type_string, port_string, AliasTable, FieldKind, MatchFieldSpec};
use crate::openflow::FlowModFlags;
use crate::request::{Action, FieldValue, Instruction, MatchField};
use crate::table::{Bridge, FlowEntry};

/// Append `s` with the datastore JSON escape table applied.
pub fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
}

fn quoted(out: &mut String, content: &str) {
    out.push('"');
    escape_into(out, content);
    out.push('"');
}

/// Serialize one bridge's flow tables, optionally restricted to a single
/// table id.
pub fn dump_bridge(name: &str, bridge: &Bridge, table_filter: Option<u8>) -> String {
    let mut out = String::new();
    out.push_str("{\"name\":");
    quoted(&mut out, &format!("/{}", name));
    out.push_str(",\"tables\":[");
    let mut first = true;
    for (table_id, flows) in bridge.tables() {
        if let Some(filter) = table_filter {
            if table_id != filter {
                continue;
            }
        }
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str("{\"table\":");
        out.push_str(&table_id.to_string());
        out.push_str(",\"flows\":[");
        for (i, entry) in flows.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            render_flow(&mut out, entry);
        }
        out.push_str("]}");
    }
    out.push_str("]}");
    out
}

fn render_flow(out: &mut String, entry: &FlowEntry) {
    out.push_str("{\"priority\":");
    out.push_str(&entry.priority.to_string());
    out.push_str(",\"idle_timeout\":");
    out.push_str(&entry.idle_timeout.to_string());
    out.push_str(",\"hard_timeout\":");
    out.push_str(&entry.hard_timeout.to_string());
    if entry.flags.contains(FlowModFlags::SEND_FLOW_REM) {
        out.push_str(",\"send_flow_rem\":true");
    }
    if entry.flags.contains(FlowModFlags::CHECK_OVERLAP) {
        out.push_str(",\"check_overlap\":true");
    }
    out.push_str(",\"cookie\":");
    out.push_str(&entry.cookie.to_string());
    for field in &entry.matches {
        out.push(',');
        render_match(out, field);
    }
    out.push_str(",\"actions\":[");
    for (i, instruction) in entry.instructions.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        render_instruction(out, instruction);
    }
    out.push_str("]}");
}

fn alias_name(spec: &MatchFieldSpec, value: u64) -> Option<&'static str> {
    match spec.alias {
        Some(AliasTable::Port) => port_string(value as u32),
        Some(AliasTable::EtherType) => ether_type_string(value as u16),
        _ => None,
    }
}

fn render_match(out: &mut String, field: &MatchField) {
    out.push('"');
    out.push_str(field.spec.name);
    out.push_str("\":");
    render_value(out, field);
}

fn render_value(out: &mut String, field: &MatchField) {
    match field.value {
        FieldValue::UInt(v) => {
            if field.mask.is_none() {
                if let Some(name) = alias_name(field.spec, v) {
                    quoted(out, name);
                    return;
                }
            }
            if field.spec.alias == Some(AliasTable::EtherType) {
                quoted(out, &format!("0x{:04x}", v));
                return;
            }
            if field.spec.has_mask {
                let len = match field.spec.kind {
                    FieldKind::UInt { len, .. } => len as usize,
                    _ => 0,
                };
                let mut content = v.to_string();
                if let Some(FieldValue::UInt(m)) = field.mask {
                    content.push_str(&format!("/0x{:0width$x}", m, width = len * 2));
                }
                quoted(out, &content);
            } else {
                out.push_str(&v.to_string());
            }
        }
        FieldValue::Mac(mac) => {
            let mut content = mac.to_string();
            if let Some(FieldValue::Mac(m)) = field.mask {
                content.push_str(&format!("/0x{:012x}", u64::from(m)));
            }
            quoted(out, &content);
        }
        FieldValue::Ipv4(ip) => {
            let mut content = ip.to_string();
            if let Some(FieldValue::Ipv4(m)) = field.mask {
                content.push_str(&format!("/0x{:08x}", u32::from(m)));
            }
            quoted(out, &content);
        }
        FieldValue::Ipv6(ip) => {
            let mut content = ip.to_string();
            if let Some(FieldValue::Ipv6(m)) = field.mask {
                content.push_str(&format!("/0x{:032x}", u128::from(m)));
            }
            quoted(out, &content);
        }
    }
}

fn render_action(out: &mut String, action: &Action) {
    match action {
        Action::Output(port) => {
            out.push_str("{\"output\":");
            match port_string(*port) {
                Some(name) => quoted(out, name),
                None => out.push_str(&port.to_string()),
            }
            out.push('}');
        }
        Action::CopyTtlOut => out.push_str("{\"copy_ttl_out\":null}"),
        Action::CopyTtlIn => out.push_str("{\"copy_ttl_in\":null}"),
        Action::SetMplsTtl(ttl) => {
            out.push_str("{\"set_mpls_ttl\":");
            out.push_str(&ttl.to_string());
            out.push('}');
        }
        Action::DecMplsTtl => out.push_str("{\"dec_mpls_ttl\":null}"),
        Action::PushVlan(eth_type) => render_push(out, "push_vlan", *eth_type),
        Action::PopVlan => out.push_str("{\"strip_vlan\":null}"),
        Action::PushMpls(eth_type) => render_push(out, "push_mpls", *eth_type),
        Action::PopMpls(eth_type) => render_push(out, "pop_mpls", *eth_type),
        Action::SetQueue(queue) => {
            out.push_str("{\"set_queue\":");
            out.push_str(&queue.to_string());
            out.push('}');
        }
        Action::Group(group) => {
            out.push_str("{\"group\":");
            out.push_str(&group.to_string());
            out.push('}');
        }
        Action::SetNwTtl(ttl) => {
            out.push_str("{\"set_nw_ttl\":");
            out.push_str(&ttl.to_string());
            out.push('}');
        }
        Action::DecNwTtl => out.push_str("{\"dec_nw_ttl\":null}"),
        Action::SetField(field) => {
            out.push_str("{\"set_field\":{");
            render_match(out, field);
            out.push_str("}}");
        }
        Action::PushPbb(eth_type) => render_push(out, "push_pbb", *eth_type),
        Action::PopPbb => out.push_str("{\"pop_pbb\":null}"),
    }
}

fn render_push(out: &mut String, name: &str, eth_type: u16) {
    out.push_str("{\"");
    out.push_str(name);
    out.push_str("\":");
    quoted(out, &format!("0x{:04x}", eth_type));
    out.push('}');
}

fn render_instruction(out: &mut String, instruction: &Instruction) {
    match instruction {
        Instruction::GotoTable(table_id) => {
            out.push_str("{\"goto_table\":");
            out.push_str(&table_id.to_string());
            out.push('}');
        }
        Instruction::WriteMetadata { metadata, mask } => {
            out.push_str("{\"write_metadata\":");
            let mut content = metadata.to_string();
            if let Some(m) = mask {
                content.push_str(&format!("/0x{:016x}", m));
            }
            quoted(out, &content);
            out.push('}');
        }
        Instruction::WriteActions(actions) => render_action_list(out, "write_actions", actions),
        Instruction::ApplyActions(actions) => render_action_list(out, "apply_actions", actions),
        Instruction::ClearActions => out.push_str("{\"clear_actions\":null}"),
        Instruction::Meter(meter_id) => {
            out.push_str("{\"meter\":");
            out.push_str(&meter_id.to_string());
            out.push('}');
        }
    }
}

fn render_action_list(out: &mut String, name: &str, actions: &[Action]) {
    out.push_str("{\"");
    out.push_str(name);
    out.push_str("\":[");
    for (i, action) in actions.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        render_action(out, action);
    }
    out.push_str("]}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse_flow_mod;
    use crate::openflow::FlowModCommand;
    use crate::table::FlowTable;

    fn bridge_with(flow_tokens: &[&[&str]]) -> Bridge {
        let mut bridge = Bridge::default();
        for tokens in flow_tokens {
            let req = parse_flow_mod(FlowModCommand::Add, tokens).unwrap();
            bridge.flow_mod(&req).unwrap();
        }
        bridge
    }

    #[test]
    fn escaping() {
        let mut out = String::new();
        escape_into(&mut out, "a/b\\c\"d\te\n");
        assert_eq!(out, "a\\/b\\\\c\\\"d\\te\\n");
    }

    #[test]
    fn minimal_flow() {
        let bridge = bridge_with(&[&["in_port=0", "in_phy_port=4294967295"]]);
        assert_eq!(
            dump_bridge("b1", &bridge, None),
            "{\"name\":\"\\/b1\",\"tables\":[{\"table\":0,\"flows\":[\
             {\"priority\":0,\"idle_timeout\":0,\"hard_timeout\":0,\"cookie\":0,\
             \"in_port\":0,\"in_phy_port\":\"any\",\"actions\":[]}]}]}"
        );
    }

    #[test]
    fn masked_metadata_round_trip() {
        let bridge = bridge_with(&[&["metadata=1/0x1"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(
            dump.contains("\"metadata\":\"1\\/0x0000000000000001\""),
            "{}",
            dump
        );
    }

    #[test]
    fn alias_and_hex_rendering() {
        let bridge = bridge_with(&[&["in_port=controller", "dl_type=2048"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(dump.contains("\"in_port\":\"controller\""), "{}", dump);
        assert!(dump.contains("\"dl_type\":\"ip\""), "{}", dump);

        let bridge = bridge_with(&[&["dl_type=0x1234"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(dump.contains("\"dl_type\":\"0x1234\""), "{}", dump);
    }

    #[test]
    fn vlan_vid_present_bit_rendering() {
        let bridge = bridge_with(&[&["vlan_vid=0"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(dump.contains("\"vlan_vid\":\"4096\""), "{}", dump);

        let bridge = bridge_with(&[&["vlan_vid=1/0x1"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(dump.contains("\"vlan_vid\":\"4097\\/0x1001\""), "{}", dump);
    }

    #[test]
    fn mac_and_ip_rendering() {
        let bridge = bridge_with(&[&[
            "dl_src=00:0c:29:7a:90:b3/ff:ff:ff:ff:ff:00",
            "nw_src=10.0.0.1/255.255.255.0",
        ]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(
            dump.contains("\"dl_src\":\"00:0c:29:7a:90:b3\\/0xffffffffff00\""),
            "{}",
            dump
        );
        assert!(
            dump.contains("\"nw_src\":\"10.0.0.1\\/0xffffff00\""),
            "{}",
            dump
        );

        let bridge = bridge_with(&[&["ipv6_dst=0:0:0:0:0:0:0:1"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(dump.contains("\"ipv6_dst\":\"::1\""), "{}", dump);
    }

    #[test]
    fn pad_width_follows_field_length() {
        let bridge = bridge_with(&[&["pbb_isid=1/0x1", "ipv6_label=1/0x1"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(dump.contains("\"ipv6_label\":\"1\\/0x00000001\""), "{}", dump);
        assert!(dump.contains("\"pbb_isid\":\"1\\/0x000001\""), "{}", dump);
    }

    #[test]
    fn instructions_and_actions() {
        let bridge = bridge_with(&[&[
            "in_port=1",
            "apply_actions=output:controller,group:3,push_vlan:0x8100,strip_vlan,dl_src:00:0c:29:7a:90:b3",
            "goto_table=3",
            "write_metadata=1/0xff",
            "clear_actions",
            "meter=2",
        ]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(
            dump.contains(
                "\"actions\":[{\"apply_actions\":[{\"output\":\"controller\"},\
                 {\"group\":3},{\"push_vlan\":\"0x8100\"},{\"strip_vlan\":null},\
                 {\"set_field\":{\"dl_src\":\"00:0c:29:7a:90:b3\"}}]},\
                 {\"goto_table\":3},\
                 {\"write_metadata\":\"1\\/0x00000000000000ff\"},\
                 {\"clear_actions\":null},{\"meter\":2}]"
            ),
            "{}",
            dump
        );
    }

    #[test]
    fn flags_rendering() {
        let bridge = bridge_with(&[&["send_flow_rem", "check_overlap", "in_port=1"]]);
        let dump = dump_bridge("b1", &bridge, None);
        assert!(
            dump.contains(
                "\"hard_timeout\":0,\"send_flow_rem\":true,\"check_overlap\":true,\"cookie\":0"
            ),
            "{}",
            dump
        );
    }

    #[test]
    fn table_filter() {
        let mut bridge = Bridge::default();
        for tokens in [
            ["table=0", "in_port=1"],
            ["table=1", "in_port=2"],
        ] {
            let req = parse_flow_mod(FlowModCommand::Add, &tokens).unwrap();
            bridge.flow_mod(&req).unwrap();
        }
        let dump = dump_bridge("b1", &bridge, Some(1));
        assert!(dump.contains("{\"table\":1,"), "{}", dump);
        assert!(!dump.contains("{\"table\":0,"), "{}", dump);
    }

    #[test]
    fn repeated_dump_is_identical() {
        let bridge = bridge_with(&[&["in_port=1", "apply_actions=output:2"]]);
        let a = dump_bridge("b1", &bridge, None);
        let b = dump_bridge("b1", &bridge, None);
        assert_eq!(a, b);
    }
}
