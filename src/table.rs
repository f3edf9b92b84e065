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

//! In-memory flow table. Validates submitted flow-mod requests at the
//! protocol level (duplicate match fields, table ids) and implements the
//! strict/non-strict selection semantics for modify and delete.

use std::collections::BTreeMap;

use log::debug;

use crate::error::{Error, Result};
use crate::openflow::{
    BadMatchCode, FlowModCommand, FlowModFailedCode, FlowModFlags, OfpError, OFPG_ANY, OFPP_ANY,
    OFPTT_ALL,
};
use crate::request::{Action, FlowModRequest, Instruction, MatchField};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEntry {
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub cookie: u64,
    pub flags: FlowModFlags,
    pub matches: Vec<MatchField>,
    pub instructions: Vec<Instruction>,
}

impl FlowEntry {
    fn from_request(req: &FlowModRequest) -> Self {
        Self {
            priority: req.priority,
            idle_timeout: req.idle_timeout,
            hard_timeout: req.hard_timeout,
            cookie: req.cookie,
            flags: req.flags,
            matches: req.matches.clone(),
            instructions: req.instructions.clone(),
        }
    }

    fn actions(&self) -> impl Iterator<Item = &Action> {
        self.instructions
            .iter()
            .flat_map(|ins| match ins {
                Instruction::ApplyActions(actions) | Instruction::WriteActions(actions) => {
                    actions.as_slice()
                }
                _ => &[],
            })
    }

    fn outputs_to(&self, port: u32) -> bool {
        self.actions()
            .any(|a| matches!(a, Action::Output(p) if *p == port))
    }

    fn groups_to(&self, group: u32) -> bool {
        self.actions()
            .any(|a| matches!(a, Action::Group(g) if *g == group))
    }
}

/// The submission contract between the command surface and a flow table.
pub trait FlowTable {
    fn flow_mod(&mut self, req: &FlowModRequest) -> Result<(), OfpError>;
}

/// One bridge's flow tables. Tables materialize on first add and flows
/// within a table are kept sorted by descending priority.
#[derive(Debug, Default)]
pub struct Bridge {
    tables: BTreeMap<u8, Vec<FlowEntry>>,
}

impl Bridge {
    pub fn tables(&self) -> impl Iterator<Item = (u8, &[FlowEntry])> {
        self.tables.iter().map(|(id, flows)| (*id, flows.as_slice()))
    }

    pub fn table(&self, table_id: u8) -> Option<&[FlowEntry]> {
        self.tables.get(&table_id).map(|flows| flows.as_slice())
    }

    fn check_duplicates(matches: &[MatchField]) -> Result<(), OfpError> {
        // the match list arrives sorted, duplicates are adjacent
        for pair in matches.windows(2) {
            if pair[0].spec.oxm == pair[1].spec.oxm {
                return Err(OfpError::BadMatch(BadMatchCode::DupField));
            }
        }
        Ok(())
    }

    fn matches_subset(sub: &[MatchField], sup: &[MatchField]) -> bool {
        sub.iter().all(|m| sup.contains(m))
    }

    fn selected(entry: &FlowEntry, req: &FlowModRequest, strict: bool) -> bool {
        if req.cookie_mask != 0
            && (entry.cookie & req.cookie_mask) != (req.cookie & req.cookie_mask)
        {
            return false;
        }
        if strict {
            entry.priority == req.priority && entry.matches == req.matches
        } else {
            Self::matches_subset(&req.matches, &entry.matches)
        }
    }

    fn port_group_filter(entry: &FlowEntry, req: &FlowModRequest) -> bool {
        (req.out_port == OFPP_ANY || entry.outputs_to(req.out_port))
            && (req.out_group == OFPG_ANY || entry.groups_to(req.out_group))
    }

    fn add(&mut self, req: &FlowModRequest) -> Result<(), OfpError> {
        if req.table_id == OFPTT_ALL {
            return Err(OfpError::FlowModFailed(FlowModFailedCode::BadTableId));
        }
        let table = self.tables.entry(req.table_id).or_default();
        let entry = FlowEntry::from_request(req);
        if let Some(existing) = table
            .iter_mut()
            .find(|e| e.priority == req.priority && e.matches == req.matches)
        {
            *existing = entry;
        } else {
            let pos = table
                .iter()
                .position(|e| e.priority < req.priority)
                .unwrap_or(table.len());
            table.insert(pos, entry);
        }
        Ok(())
    }

    fn modify(&mut self, req: &FlowModRequest) {
        let strict = req.command.is_strict();
        for (id, table) in self.tables.iter_mut() {
            if req.table_id != OFPTT_ALL && *id != req.table_id {
                continue;
            }
            for entry in table.iter_mut() {
                if Self::selected(entry, req, strict) {
                    entry.instructions = req.instructions.clone();
                }
            }
        }
    }

    fn delete(&mut self, req: &FlowModRequest) {
        let strict = req.command.is_strict();
        for (id, table) in self.tables.iter_mut() {
            if req.table_id != OFPTT_ALL && *id != req.table_id {
                continue;
            }
            table.retain(|entry| {
                !(Self::selected(entry, req, strict) && Self::port_group_filter(entry, req))
            });
        }
        // emptied tables disappear from dumps, as if never materialized
        self.tables.retain(|_, flows| !flows.is_empty());
    }
}

impl FlowTable for Bridge {
    fn flow_mod(&mut self, req: &FlowModRequest) -> Result<(), OfpError> {
        Self::check_duplicates(&req.matches)?;
        match req.command {
            FlowModCommand::Add => self.add(req)?,
            FlowModCommand::Modify | FlowModCommand::ModifyStrict => self.modify(req),
            FlowModCommand::Delete | FlowModCommand::DeleteStrict => self.delete(req),
        }
        debug!("flow {} applied", req.command.verb());
        Ok(())
    }
}

/// All bridges known to the datastore, keyed by name.
#[derive(Debug, Default)]
pub struct FlowDb {
    bridges: BTreeMap<String, Bridge>,
}

impl FlowDb {
    /// Idempotent; an existing bridge is left untouched.
    pub fn create_bridge(&mut self, name: &str) -> &mut Bridge {
        self.bridges.entry(name.to_string()).or_default()
    }

    pub fn destroy_bridge(&mut self, name: &str) -> Result<()> {
        self.bridges
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFoundBridge(name.to_string()))
    }

    pub fn bridge(&self, name: &str) -> Option<&Bridge> {
        self.bridges.get(name)
    }

    pub fn bridge_mut(&mut self, name: &str) -> Option<&mut Bridge> {
        self.bridges.get_mut(name)
    }

    pub fn bridges(&self) -> impl Iterator<Item = (&str, &Bridge)> {
        self.bridges.iter().map(|(name, b)| (name.as_str(), b))
    }
}
