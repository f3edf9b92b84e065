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

//! Command surface: dispatches `flow` and `bridge` command lines against a
//! [`FlowDb`] and renders the JSON result objects.

use log::debug;

use crate::compiler::parse_flow_mod;
use crate::dump::{dump_bridge, escape_into};
use crate::error::{Error, Result};
use crate::field::AliasTable;
use crate::openflow::{FlowModCommand, OFPTT_ALL};
use crate::table::{FlowDb, FlowTable};
use crate::value;

/// Interpreter state. Dry-run compiles and validates but never mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpState {
    AutoCommit,
    DryRun,
}

/// Execute one command line, returning the JSON written to the result
/// buffer: a dump document, `{"ret":"OK"}`, or an error object.
pub fn execute(db: &mut FlowDb, state: InterpState, argv: &[&str]) -> String {
    debug!("execute: {:?}", argv);
    match run(db, state, argv) {
        Ok(Some(json)) => json,
        Ok(None) => "{\"ret\":\"OK\"}".to_string(),
        Err(e) => error_result(&e),
    }
}

fn error_result(e: &Error) -> String {
    let mut out = format!("{{\"ret\":\"{}\"", e.kind().as_str());
    if let Some(data) = e.data() {
        out.push_str(",\"data\":\"");
        escape_into(&mut out, &data);
        out.push('"');
    }
    out.push('}');
    out
}

fn run(db: &mut FlowDb, state: InterpState, argv: &[&str]) -> Result<Option<String>> {
    match argv.first().copied() {
        Some("flow") => flow_cmd(db, state, &argv[1..]),
        Some("bridge") => bridge_cmd(db, state, &argv[1..]).map(|_| None),
        Some(other) => Err(Error::NotFoundCmd(other.to_string())),
        None => Err(Error::InvalidArgs),
    }
}

fn bridge_cmd(db: &mut FlowDb, state: InterpState, args: &[&str]) -> Result<()> {
    let name = args.first().copied().ok_or(Error::InvalidArgs)?;
    match args.get(1).copied() {
        Some("create") => {
            if state != InterpState::DryRun {
                db.create_bridge(name);
            }
            Ok(())
        }
        Some("destroy") => {
            if state == InterpState::DryRun {
                db.bridge(name)
                    .map(|_| ())
                    .ok_or_else(|| Error::NotFoundBridge(name.to_string()))
            } else {
                db.destroy_bridge(name)
            }
        }
        Some(other) => Err(Error::NotFoundCmd(other.to_string())),
        None => Err(Error::InvalidArgs),
    }
}

fn flow_cmd(db: &mut FlowDb, state: InterpState, args: &[&str]) -> Result<Option<String>> {
    let Some(bridge_name) = args.first().copied() else {
        // no bridge named: dump them all
        let mut out = String::from("[");
        for (i, (name, bridge)) in db.bridges().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&dump_bridge(name, bridge, None));
        }
        out.push(']');
        return Ok(Some(out));
    };
    let rest = &args[1..];
    match rest.first().copied() {
        Some("add") => mod_cmd(db, state, bridge_name, FlowModCommand::Add, &rest[1..]),
        Some("mod") => mod_cmd(db, state, bridge_name, FlowModCommand::Modify, &rest[1..]),
        Some("del") => mod_cmd(db, state, bridge_name, FlowModCommand::Delete, &rest[1..]),
        _ => dump_cmd(db, bridge_name, rest),
    }
}

fn mod_cmd(
    db: &mut FlowDb,
    state: InterpState,
    bridge_name: &str,
    command: FlowModCommand,
    tokens: &[&str],
) -> Result<Option<String>> {
    if db.bridge(bridge_name).is_none() {
        return Err(Error::NotFoundBridge(bridge_name.to_string()));
    }
    let req = parse_flow_mod(command, tokens)?;
    if state == InterpState::DryRun {
        return Ok(None);
    }
    let bridge = db
        .bridge_mut(bridge_name)
        .ok_or_else(|| Error::NotFoundBridge(bridge_name.to_string()))?;
    bridge.flow_mod(&req).map_err(|e| Error::FlowModOfp {
        verb: req.command.verb(),
        etype: e.type_str(),
        code: e.code_str(),
    })?;
    Ok(None)
}

fn dump_cmd(db: &FlowDb, bridge_name: &str, opts: &[&str]) -> Result<Option<String>> {
    let mut table_filter = None;
    let mut i = 0;
    while i < opts.len() {
        match opts[i] {
            "-table-id" => {
                let raw = opts.get(i + 1).copied().ok_or(Error::MissingOptValue)?;
                let id = value::parse_uint(raw, u8::MAX as u64, Some(AliasTable::Table))
                    .map_err(|_| Error::BadOptValue(raw.to_string()))?
                    as u8;
                table_filter = if id == OFPTT_ALL { None } else { Some(id) };
                i += 2;
            }
            other => return Err(Error::UnknownOpt(other.to_string())),
        }
    }
    let bridge = db
        .bridge(bridge_name)
        .ok_or_else(|| Error::NotFoundBridge(bridge_name.to_string()))?;
    Ok(Some(dump_bridge(bridge_name, bridge, table_filter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_bridge() -> FlowDb {
        let mut db = FlowDb::default();
        db.create_bridge("b1");
        db
    }

    fn exec(db: &mut FlowDb, argv: &[&str]) -> String {
        execute(db, InterpState::AutoCommit, argv)
    }

    #[test]
    fn add_and_dump_scenario() {
        let mut db = db_with_bridge();
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add", "in_port=0", "in_phy_port=4294967295"]),
            "{\"ret\":\"OK\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b1"]),
            "{\"name\":\"\\/b1\",\"tables\":[{\"table\":0,\"flows\":[\
             {\"priority\":0,\"idle_timeout\":0,\"hard_timeout\":0,\"cookie\":0,\
             \"in_port\":0,\"in_phy_port\":\"any\",\"actions\":[]}]}]}"
        );
    }

    #[test]
    fn duplicate_field_result() {
        let mut db = db_with_bridge();
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add", "in_port=0", "in_port=1"]),
            "{\"ret\":\"OFP_ERROR\",\"data\":\"Can't flow mod (ADD), \
             ofp_error[type = OFPET_BAD_MATCH, code = OFPBMC_DUP_FIELD].\"}"
        );
        // nothing was committed
        assert!(exec(&mut db, &["flow", "b1"]).contains("\"tables\":[]"));
    }

    #[test]
    fn empty_add_has_no_data_member() {
        let mut db = db_with_bridge();
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add"]),
            "{\"ret\":\"INVALID_ARGS\"}"
        );
    }

    #[test]
    fn parse_errors_are_reported_verbatim() {
        let mut db = db_with_bridge();
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add", "hoge=1"]),
            "{\"ret\":\"NOT_FOUND\",\"data\":\"Not found cmd (hoge).\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add", "vlan_pcp=8"]),
            "{\"ret\":\"TOO_LONG\",\"data\":\"Bad value (8).\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add", "mpls_label=1/0x1"]),
            "{\"ret\":\"INVALID_ARGS\",\"data\":\"Bad mask.\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b1", "add", "nw_src=10.0.0.256"]),
            "{\"ret\":\"ADDR_RESOLVER_FAILURE\",\"data\":\"Bad value (10.0.0.256).\"}"
        );
    }

    #[test]
    fn unknown_bridge() {
        let mut db = FlowDb::default();
        assert_eq!(
            exec(&mut db, &["flow", "b9", "add", "in_port=1"]),
            "{\"ret\":\"NOT_FOUND\",\"data\":\"Not found bridge (b9).\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b9"]),
            "{\"ret\":\"NOT_FOUND\",\"data\":\"Not found bridge (b9).\"}"
        );
    }

    #[test]
    fn dump_options() {
        let mut db = db_with_bridge();
        exec(&mut db, &["flow", "b1", "add", "table=1", "in_port=1"]);
        let dump = exec(&mut db, &["flow", "b1", "-table-id", "1"]);
        assert!(dump.contains("{\"table\":1,"), "{}", dump);

        assert_eq!(
            exec(&mut db, &["flow", "b1", "-hoge"]),
            "{\"ret\":\"INVALID_ARGS\",\"data\":\"opt = -hoge.\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b1", "-table-id"]),
            "{\"ret\":\"INVALID_ARGS\",\"data\":\"Bad opt value.\"}"
        );
        assert_eq!(
            exec(&mut db, &["flow", "b1", "-table-id", "hoge"]),
            "{\"ret\":\"INVALID_ARGS\",\"data\":\"Bad opt value = hoge.\"}"
        );
    }

    #[test]
    fn dry_run_gates_mutation() {
        let mut db = db_with_bridge();
        assert_eq!(
            execute(
                &mut db,
                InterpState::DryRun,
                &["flow", "b1", "add", "in_port=1"]
            ),
            "{\"ret\":\"OK\"}"
        );
        assert!(exec(&mut db, &["flow", "b1"]).contains("\"tables\":[]"));

        // compile errors still surface under dry-run
        assert_eq!(
            execute(&mut db, InterpState::DryRun, &["flow", "b1", "add", "hoge=1"]),
            "{\"ret\":\"NOT_FOUND\",\"data\":\"Not found cmd (hoge).\"}"
        );
    }

    #[test]
    fn bridge_lifecycle() {
        let mut db = FlowDb::default();
        assert_eq!(exec(&mut db, &["bridge", "b1", "create"]), "{\"ret\":\"OK\"}");
        assert_eq!(exec(&mut db, &["flow", "b1"]), "{\"name\":\"\\/b1\",\"tables\":[]}");
        assert_eq!(exec(&mut db, &["bridge", "b1", "destroy"]), "{\"ret\":\"OK\"}");
        assert_eq!(
            exec(&mut db, &["bridge", "b1", "destroy"]),
            "{\"ret\":\"NOT_FOUND\",\"data\":\"Not found bridge (b1).\"}"
        );
    }

    #[test]
    fn dump_all_bridges() {
        let mut db = FlowDb::default();
        db.create_bridge("a");
        db.create_bridge("b");
        assert_eq!(
            exec(&mut db, &["flow"]),
            "[{\"name\":\"\\/a\",\"tables\":[]},{\"name\":\"\\/b\",\"tables\":[]}]"
        );
    }
}
