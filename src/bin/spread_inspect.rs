use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use spread_columnar::{ColumnBinary, ReaderConfig, Result, SpreadReader};

#[cfg(feature = "tools-json")]
use serde::Serialize;

#[cfg_attr(feature = "tools-json", derive(Serialize))]
struct ColumnReport {
    name: String,
    column_type: String,
    codec: &'static str,
    rows: u32,
    nulls: u32,
    payload_bytes: usize,
    children: Vec<ColumnReport>,
}

#[cfg_attr(feature = "tools-json", derive(Serialize))]
struct BlockReport {
    block_id: u32,
    rows: usize,
    columns: Vec<ColumnReport>,
}

fn usage() -> &'static str {
    "\
spread_inspect\n\
\n\
Prints the header and per-block column layout of a $CLM file.\n\
\n\
Usage:\n\
  spread_inspect <path> [--json]\n\
\n\
Args:\n\
  --json              one JSON object per block (needs the tools-json feature)\n\
  --reader NAME       override the block reader named in the header\n\
"
}

fn parse_arg(args: &[String], name: &str) -> Option<String> {
    for (i, a) in args.iter().enumerate() {
        if let Some(v) = a.strip_prefix(&(name.to_string() + "=")) {
            return Some(v.to_string());
        }
        if a == name {
            return args.get(i + 1).cloned();
        }
    }
    None
}

fn column_report(binary: &ColumnBinary) -> ColumnReport {
    ColumnReport {
        name: binary.column_name.clone(),
        column_type: format!("{:?}", binary.column_type),
        codec: binary.codec.name(),
        rows: binary.row_count,
        nulls: binary.null_count,
        payload_bytes: binary.payload.len(),
        children: binary.children.iter().map(column_report).collect(),
    }
}

fn print_column(column: &ColumnReport, depth: usize) {
    println!(
        "{:indent$}{} type={} codec={} rows={} nulls={} payload_bytes={}",
        "",
        column.name,
        column.column_type,
        column.codec,
        column.rows,
        column.nulls,
        column.payload_bytes,
        indent = 2 + depth * 2
    );
    for child in &column.children {
        print_column(child, depth + 1);
    }
}

fn print_block(block: &BlockReport, json: bool) {
    #[cfg(feature = "tools-json")]
    {
        if json {
            match serde_json::to_string(block) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("block {}: {e}", block.block_id),
            }
            return;
        }
    }
    #[cfg(not(feature = "tools-json"))]
    let _ = json;

    println!("block {} rows={}", block.block_id, block.rows);
    for column in &block.columns {
        print_column(column, 0);
    }
}

fn inspect(path: &str, json: bool, reader_override: Option<String>) -> Result<()> {
    let file = File::open(path)?;
    let total_len = file.metadata()?.len();
    let mut config = ReaderConfig::default();
    if let Some(name) = reader_override {
        config.set_block_reader_override(name);
    }
    let mut reader = SpreadReader::open_stream(BufReader::new(file), total_len, config)?;
    if !json {
        println!("file={path} bytes={total_len}");
        println!(
            "block_size={} block_reader={}",
            reader.block_size(),
            reader.block_reader_name()
        );
    }

    let mut blocks = 0usize;
    let mut rows = 0usize;
    while let Some(columns) = reader.next_raw()? {
        let block = BlockReport {
            block_id: reader.current_block_id().unwrap_or_default(),
            rows: reader.current_row_count(),
            columns: columns.iter().map(column_report).collect(),
        };
        blocks += 1;
        rows += block.rows;
        print_block(&block, json);
    }
    if !json {
        println!("blocks={blocks} rows={rows}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprint!("{}", usage());
        return ExitCode::SUCCESS;
    }
    let json = args.iter().any(|a| a == "--json");
    if json && cfg!(not(feature = "tools-json")) {
        eprintln!("--json needs the tools-json feature");
        return ExitCode::from(2);
    }
    let reader_override = parse_arg(&args, "--reader");
    let path = args.iter().skip(1).enumerate().find_map(|(i, a)| {
        let after_reader = i > 0 && args[i] == "--reader";
        (!a.starts_with("--") && !after_reader).then_some(a.as_str())
    });
    let Some(path) = path else {
        eprint!("{}", usage());
        return ExitCode::from(2);
    };

    match inspect(path, json, reader_override) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{path}: {e}");
            ExitCode::FAILURE
        }
    }
}
