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

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Parser;

use flowstore::cmd::{self, InterpState};
use flowstore::table::FlowDb;

#[derive(Parser)]
#[clap(name = "flowstore", version)]
struct Opts {
    /// Parse and validate commands without touching the flow tables.
    #[clap(short, long)]
    dry_run: bool,

    /// Log level (error, warn, info, debug, trace).
    #[clap(long, default_value = "info")]
    log_level: String,

    /// A single command line to run; reads stdin when omitted.
    tokens: Vec<String>,
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let _logger = flexi_logger::Logger::try_with_str(&opts.log_level)?
        .log_to_stderr()
        .start()?;

    let state = if opts.dry_run {
        InterpState::DryRun
    } else {
        InterpState::AutoCommit
    };
    let mut db = FlowDb::default();

    if !opts.tokens.is_empty() {
        let argv: Vec<&str> = opts.tokens.iter().map(String::as_str).collect();
        println!("{}", cmd::execute(&mut db, state, &argv));
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let argv: Vec<&str> = line.split_whitespace().collect();
        if argv.is_empty() {
            continue;
        }
        writeln!(stdout, "{}", cmd::execute(&mut db, state, &argv))?;
    }
    Ok(())
}
