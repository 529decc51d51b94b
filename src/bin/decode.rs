// nrbf-parser - A high-performance MS-NRBF binary parser and encoder.
// Copyright (C) 2026  driedpampas@proton.me
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use nrbf_graph::error::CliError;
use serde_json::json;
use std::env;
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file> [output.json]", args[0]);
        return ExitCode::from(2);
    }

    match run(&args[1], args.get(2).map(String::as_str)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Parse(e)) => {
            eprintln!("parse error: {e}");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}

fn run(input_path: &str, output_path: Option<&str>) -> Result<(), CliError> {
    let bytes = fs::read(input_path)?;
    let decoded = nrbf_graph::decode(&bytes)?;

    let root = nrbf_graph::render::render(&decoded.graph.root());
    let nested: Vec<_> = decoded
        .nested
        .iter()
        .map(|blob| {
            json!({
                "outerId": blob.outer_node_id,
                "graph": nrbf_graph::render::render(&blob.graph.root()),
            })
        })
        .collect();

    let output = json!({ "root": root, "nested": nested });
    let rendered = serde_json::to_string_pretty(&output)?;

    println!("{rendered}");
    if let Some(path) = output_path {
        fs::write(path, &rendered)?;
    }
    Ok(())
}
