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

//! The field compiler: turns the ordered `key=value[/mask]` token list of
//! one flow-mod command into a validated [`FlowModRequest`]. The first bad
//! token aborts the whole command.

use log::debug;

use crate::error::{Error, Result};
use crate::field::{
    set_field_lookup, ActionArg, ActionOp, ActionSpec, AliasTable, FieldKind, FlowFieldKind,
    FlowModKey, InstructionKind, MatchFieldSpec, ValueHook, ACTION_TABLE, FLOW_MOD_TABLE,
};
use crate::openflow::{FlowModCommand, FlowModFlags, OFPVID_PRESENT};
use crate::request::{Action, FieldValue, FlowModRequest, Instruction, MatchField};
use crate::value::{self, trim};

/// Where a field value appears; masks are legal for mask-capable fields in
/// match position only, never in `set_field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaskContext {
    Match,
    SetField,
}

pub fn parse_flow_mod(command: FlowModCommand, tokens: &[&str]) -> Result<FlowModRequest> {
    let mut req = FlowModRequest::new(command);
    if tokens.is_empty() {
        // delete with no arguments wildcards everything
        if matches!(
            command,
            FlowModCommand::Delete | FlowModCommand::DeleteStrict
        ) {
            return Ok(req);
        }
        return Err(Error::InvalidArgs);
    }

    for token in tokens {
        let (key_raw, value_raw) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (*token, None),
        };
        let key = trim(key_raw);
        let entry = FLOW_MOD_TABLE
            .get(key)
            .ok_or_else(|| Error::NotFoundCmd(key.to_string()))?;
        match *entry {
            FlowModKey::StrictOpt => {
                req.command = req
                    .command
                    .into_strict()
                    .ok_or_else(|| Error::BadOpt("-strict".to_string()))?;
            }
            FlowModKey::Field(kind) => parse_flow_field(&mut req, kind, value_raw)?,
            FlowModKey::Instruction(kind) => {
                let instruction = parse_instruction(kind, value_raw)?;
                req.instructions.push(instruction);
            }
            FlowModKey::Match(spec) => {
                let field = parse_match_field(spec, value_raw, MaskContext::Match)?;
                req.insert_match(field);
            }
        }
    }

    debug!(
        "compiled flow mod: {} matches, {} instructions",
        req.matches.len(),
        req.instructions.len()
    );
    Ok(req)
}

fn parse_flow_field(
    req: &mut FlowModRequest,
    kind: FlowFieldKind,
    value_raw: Option<&str>,
) -> Result<()> {
    use FlowFieldKind::*;

    match kind {
        // flags never look at the value half; a supplied one is ignored
        SendFlowRem | CheckOverlap => {
            req.flags |= if kind == SendFlowRem {
                FlowModFlags::SEND_FLOW_REM
            } else {
                FlowModFlags::CHECK_OVERLAP
            };
            return Ok(());
        }
        _ => {}
    }

    let raw = value_raw.ok_or(Error::EmptyValue)?;
    let (v_tok, m_tok) = value::mask_split(trim(raw))?;
    if m_tok.is_some() && kind != Cookie {
        return Err(Error::BadMask);
    }
    match kind {
        Cookie => {
            req.cookie = value::parse_uint(v_tok, u64::MAX, None)?;
            if let Some(m) = m_tok {
                req.cookie_mask = value::parse_uint(m, u64::MAX, None)?;
            }
        }
        Table => {
            req.table_id =
                value::parse_uint(v_tok, u8::MAX as u64, Some(AliasTable::Table))? as u8;
        }
        IdleTimeout => req.idle_timeout = value::parse_uint(v_tok, u16::MAX as u64, None)? as u16,
        HardTimeout => req.hard_timeout = value::parse_uint(v_tok, u16::MAX as u64, None)? as u16,
        Priority => req.priority = value::parse_uint(v_tok, u16::MAX as u64, None)? as u16,
        OutPort => {
            req.out_port =
                value::parse_uint(v_tok, u32::MAX as u64, Some(AliasTable::Port))? as u32;
        }
        OutGroup => {
            req.out_group =
                value::parse_uint(v_tok, u32::MAX as u64, Some(AliasTable::Group))? as u32;
        }
        SendFlowRem | CheckOverlap => unreachable!(),
    }
    Ok(())
}

fn parse_instruction(kind: InstructionKind, value_raw: Option<&str>) -> Result<Instruction> {
    use InstructionKind::*;

    match kind {
        ClearActions => Ok(Instruction::ClearActions),
        WriteActions | ApplyActions => {
            let raw = value_raw.ok_or(Error::EmptyValue)?;
            let actions = parse_actions(raw)?;
            Ok(if kind == WriteActions {
                Instruction::WriteActions(actions)
            } else {
                Instruction::ApplyActions(actions)
            })
        }
        GotoTable | Meter | WriteMetadata => {
            let raw = value_raw.ok_or(Error::EmptyValue)?;
            let (v_tok, m_tok) = value::mask_split(trim(raw))?;
            if m_tok.is_some() && kind != WriteMetadata {
                return Err(Error::BadMask);
            }
            match kind {
                GotoTable => Ok(Instruction::GotoTable(
                    value::parse_uint(v_tok, 254, None)? as u8,
                )),
                Meter => Ok(Instruction::Meter(
                    value::parse_uint(v_tok, u32::MAX as u64, None)? as u32,
                )),
                WriteMetadata => {
                    let metadata = value::parse_uint(v_tok, u64::MAX, None)?;
                    let mask = m_tok
                        .map(|t| value::parse_uint(t, u64::MAX, None))
                        .transpose()?;
                    Ok(Instruction::WriteMetadata { metadata, mask })
                }
                _ => unreachable!(),
            }
        }
    }
}

fn parse_actions(raw: &str) -> Result<Vec<Action>> {
    if trim(raw).is_empty() {
        return Err(Error::EmptyValue);
    }
    let mut actions = Vec::new();
    for segment in raw.split(',') {
        if trim(segment).is_empty() {
            return Err(Error::BadComma);
        }
        actions.push(parse_action(segment)?);
    }
    Ok(actions)
}

fn parse_action(segment: &str) -> Result<Action> {
    let (key_raw, value_raw) = match segment.split_once(':') {
        Some((k, v)) => (k, Some(v)),
        None => (segment, None),
    };
    let key = trim(key_raw);
    if key.is_empty() || matches!(value_raw, Some(v) if trim(v).is_empty()) {
        return Err(Error::BadAction);
    }

    if let Some(spec) = ACTION_TABLE.get(key).copied() {
        return parse_plain_action(spec, value_raw);
    }
    if let Some(spec) = set_field_lookup(key) {
        let field = parse_match_field(spec, value_raw, MaskContext::SetField)?;
        return Ok(Action::SetField(field));
    }
    Err(Error::NotFoundCmd(key.to_string()))
}

fn parse_plain_action(spec: &ActionSpec, value_raw: Option<&str>) -> Result<Action> {
    match spec.arg {
        ActionArg::None => {
            Ok(match spec.op {
                ActionOp::CopyTtlOut => Action::CopyTtlOut,
                ActionOp::CopyTtlIn => Action::CopyTtlIn,
                ActionOp::DecMplsTtl => Action::DecMplsTtl,
                ActionOp::PopVlan => Action::PopVlan,
                ActionOp::DecNwTtl => Action::DecNwTtl,
                ActionOp::PopPbb => Action::PopPbb,
                _ => unreachable!(),
            })
        }
        ActionArg::UInt { max, alias } => {
            let raw = value_raw.ok_or(Error::EmptyValue)?;
            let (v_tok, m_tok) = value::mask_split(trim(raw))?;
            if m_tok.is_some() {
                return Err(Error::BadMask);
            }
            let v = value::parse_uint(v_tok, max, alias)?;
            Ok(match spec.op {
                ActionOp::Output => Action::Output(v as u32),
                ActionOp::SetMplsTtl => Action::SetMplsTtl(v as u8),
                ActionOp::PushVlan => Action::PushVlan(v as u16),
                ActionOp::PushMpls => Action::PushMpls(v as u16),
                ActionOp::PopMpls => Action::PopMpls(v as u16),
                ActionOp::SetQueue => Action::SetQueue(v as u32),
                ActionOp::Group => Action::Group(v as u32),
                ActionOp::SetNwTtl => Action::SetNwTtl(v as u8),
                ActionOp::PushPbb => Action::PushPbb(v as u16),
                _ => unreachable!(),
            })
        }
    }
}

fn parse_match_field(
    spec: &'static MatchFieldSpec,
    value_raw: Option<&str>,
    ctx: MaskContext,
) -> Result<MatchField> {
    let raw = value_raw.ok_or(Error::EmptyValue)?;
    let (v_tok, m_tok) = value::mask_split(trim(raw))?;
    if m_tok.is_some() && !(spec.has_mask && ctx == MaskContext::Match) {
        return Err(Error::BadMask);
    }

    let (value, mask) = match spec.kind {
        FieldKind::UInt { max, .. } => {
            let mut v = value::parse_uint(v_tok, max, spec.alias)?;
            let mut m = m_tok
                .map(|t| value::parse_uint(t, max, None))
                .transpose()?;
            // the present bit goes into both halves, so a masked match
            // still requires the bit to be set on the packet
            if spec.hook == Some(ValueHook::VlanVidPresent) {
                v |= OFPVID_PRESENT as u64;
                m = m.map(|m| m | OFPVID_PRESENT as u64);
            }
            (FieldValue::UInt(v), m.map(FieldValue::UInt))
        }
        FieldKind::Mac => (
            FieldValue::Mac(value::parse_mac(v_tok)?),
            m_tok.map(value::parse_mac).transpose()?.map(FieldValue::Mac),
        ),
        FieldKind::Ipv4 => (
            FieldValue::Ipv4(value::parse_ipv4(v_tok)?),
            m_tok
                .map(value::parse_ipv4)
                .transpose()?
                .map(FieldValue::Ipv4),
        ),
        FieldKind::Ipv6 => (
            FieldValue::Ipv6(value::parse_ipv6(v_tok)?),
            m_tok
                .map(value::parse_ipv6)
                .transpose()?
                .map(FieldValue::Ipv6),
        ),
    };
    Ok(MatchField { spec, value, mask })
}
