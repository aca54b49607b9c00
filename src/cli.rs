// Idiomatic Rust CLI for Oxips.
//
// Explicit subcommands and long-form options over the library's
// decode / apply / merge / encode operations.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use log::{LevelFilter, debug, info};

use crate::io::{self as ips_io, IoError};
use crate::ips::apply::{self, ApplyOptions, GrowthPolicy};
use crate::ips::display::RecordLine;
use crate::ips::table::{MergeMode, MergeReport, PatchTable};
use crate::ips::wire::{MAX_ADDRESS, MAX_PAYLOAD};
use crate::ips::{decoder, encoder};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Address parsing (decimal, 0x-prefixed hex or $-prefixed hex)
// ---------------------------------------------------------------------------

fn parse_address(s: &str) -> Result<u32, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty address".into());
    }
    let parsed = if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(digits, 16)
    } else if let Some(digits) = s.strip_prefix('$') {
        u32::from_str_radix(digits, 16)
    } else {
        s.parse()
    };
    let address = parsed.map_err(|e| format!("invalid address '{s}': {e}"))?;
    if address > MAX_ADDRESS {
        return Err(format!("address '{s}' exceeds 24-bit limit {MAX_ADDRESS:#X}"));
    }
    Ok(address)
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// IPS binary patch tool.
#[derive(Parser, Debug)]
#[command(
    name = "oxips",
    version,
    about = "IPS patch applier and editor",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Apply a patch to a target file.
    Apply(ApplyArgs),
    /// Print the records of a patch.
    Print(PrintArgs),
    /// Merge several patches into one, in order.
    Merge(MergeArgs),
    /// Remove records from a patch.
    Remove(RemoveArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MergeModeArg {
    Ignore,
    Replace,
    Combine,
}

impl From<MergeModeArg> for MergeMode {
    fn from(arg: MergeModeArg) -> Self {
        match arg {
            MergeModeArg::Ignore => MergeMode::Ignore,
            MergeModeArg::Replace => MergeMode::Replace,
            MergeModeArg::Combine => MergeMode::Combine,
        }
    }
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// IPS patch file.
    #[arg(long, short = 'p', value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Target file to patch.
    #[arg(value_hint = ValueHint::FilePath)]
    target: PathBuf,

    /// Output file (omit with --force to patch the target in place).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Zero-extend the target when a record reaches past its end.
    #[arg(long)]
    grow: bool,

    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// IPS patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Include payload bytes.
    #[arg(long)]
    data: bool,

    /// Include raw integer table keys.
    #[arg(long)]
    keys: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Patch files in merge order; the first is the base.
    #[arg(long = "patch", short = 'p', value_name = "PATCH", value_hint = ValueHint::FilePath, action = ArgAction::Append, required = true)]
    patches: Vec<PathBuf>,

    /// How to resolve records present in more than one patch.
    #[arg(long, value_enum, default_value_t = MergeModeArg::Replace)]
    mode: MergeModeArg,

    /// Output patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct RemoveArgs {
    /// IPS patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Logical address to remove (repeatable; decimal, 0x.. or $..).
    #[arg(long = "address", short = 'a', value_parser = parse_address, action = ArgAction::Append)]
    addresses: Vec<u32>,

    /// Record position to remove (repeatable; applied after addresses, highest first).
    #[arg(long = "index", short = 'i', action = ArgAction::Append)]
    indices: Vec<usize>,

    /// Output patch file (default: rewrite the input, requires --force).
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Apply,
    Print,
    Merge,
    Remove,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    growth: GrowthPolicy,
    no_output: bool,
    show_data: bool,
    show_keys: bool,
    merge_mode: MergeMode,
    patch_files: Vec<PathBuf>,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    addresses: Vec<u32>,
    indices: Vec<usize>,
}

impl Options {
    fn new(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            use_stdout: false,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
            growth: GrowthPolicy::Bounded,
            no_output: false,
            show_data: false,
            show_keys: false,
            merge_mode: MergeMode::default(),
            patch_files: Vec::new(),
            input_file: None,
            output_file: None,
            addresses: Vec::new(),
            indices: Vec::new(),
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match &cli.command {
        Cmd::Apply(args) => Options {
            use_stdout: args.stdout,
            growth: if args.grow {
                GrowthPolicy::Grow
            } else {
                GrowthPolicy::Bounded
            },
            no_output: args.no_output,
            patch_files: vec![args.patch.clone()],
            input_file: Some(args.target.clone()),
            output_file: args.output.clone(),
            ..Options::new(Command::Apply, &cli)
        },
        Cmd::Print(args) => Options {
            show_data: args.data,
            show_keys: args.keys,
            input_file: Some(args.input.clone()),
            ..Options::new(Command::Print, &cli)
        },
        Cmd::Merge(args) => Options {
            merge_mode: args.mode.into(),
            patch_files: args.patches.clone(),
            output_file: Some(args.output.clone()),
            ..Options::new(Command::Merge, &cli)
        },
        Cmd::Remove(args) => Options {
            input_file: Some(args.input.clone()),
            output_file: args.output.clone(),
            addresses: args.addresses.clone(),
            indices: args.indices.clone(),
            ..Options::new(Command::Remove, &cli)
        },
        Cmd::Config => Options::new(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxips".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

/// Level forced by `-q` / `-v`; `None` leaves `RUST_LOG` in charge.
fn log_level(opts: &Options) -> Option<LevelFilter> {
    if opts.quiet {
        return Some(LevelFilter::Error);
    }
    match opts.verbose {
        0 => None,
        1 => Some(LevelFilter::Info),
        _ => Some(LevelFilter::Debug),
    }
}

fn emit_json(opts: &Options, value: serde_json::Value) {
    if opts.json_output
        && let Ok(s) = serde_json::to_string_pretty(&value)
    {
        eprintln!("{s}");
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxips version {version} (Rust), Copyright (C) oxips contributors");
    eprintln!("Licensed under the MIT License");

    let file_io = cfg!(feature = "file-io") as u8;

    eprintln!("FILE_IO={file_io}");
    eprintln!("IPS_MAX_ADDRESS={MAX_ADDRESS:#X}");
    eprintln!("IPS_MAX_PAYLOAD={MAX_PAYLOAD}");
    eprintln!("sizeof(usize)={}", std::mem::size_of::<usize>());

    0
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> i32 {
    let (Some(patch_path), Some(target_path)) = (opts.patch_files.first(), &opts.input_file) else {
        eprintln!("oxips: apply requires a patch and a target");
        return 1;
    };
    let apply_opts = ApplyOptions {
        growth: opts.growth,
    };

    if opts.no_output || opts.use_stdout {
        return apply_in_memory(opts, patch_path, target_path, apply_opts);
    }

    let output_path = match &opts.output_file {
        Some(path) => path.clone(),
        None if opts.force => target_path.clone(),
        None => {
            eprintln!("oxips: no output file given, use -f to patch the target in place");
            return 1;
        }
    };

    match ips_io::apply_patch_file(patch_path, target_path, &output_path, apply_opts, opts.force) {
        Ok(stats) => {
            if opts.verbose > 0 && !opts.quiet {
                eprintln!(
                    "oxips: applied {} records ({} bytes), target size: {}, output size: {}",
                    stats.records, stats.patched_bytes, stats.target_size, stats.output_size
                );
            }
            emit_json(
                opts,
                serde_json::json!({
                    "command": "apply",
                    "records": stats.records,
                    "patched_bytes": stats.patched_bytes,
                    "target_size": stats.target_size,
                    "output_size": stats.output_size,
                    "output_sha256": stats.output_sha256.map(hex::encode),
                }),
            );
            0
        }
        Err(IoError::OutputExists { path }) => {
            eprintln!(
                "oxips: output file exists, use -f to overwrite: {}",
                path.display()
            );
            1
        }
        Err(e) => {
            eprintln!("oxips: {e}");
            1
        }
    }
}

fn apply_in_memory(opts: &Options, patch_path: &Path, target_path: &Path, apply_opts: ApplyOptions) -> i32 {
    let table = match ips_io::read_patch_file(patch_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("oxips: {e}");
            return 1;
        }
    };
    let mut target = match std::fs::read(target_path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("oxips: target file: {}: {e}", target_path.display());
            return 1;
        }
    };
    let target_size = target.len();

    if let Err(e) = apply::apply_with(&table, &mut target, apply_opts) {
        eprintln!("oxips: {e}");
        return 1;
    }

    if opts.no_output {
        if !opts.quiet {
            eprintln!(
                "oxips: patch applies cleanly: {} records, output size: {}",
                table.len(),
                target.len()
            );
        }
    } else {
        let mut out = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
        if let Err(e) = out.write_all(&target).and_then(|()| out.flush()) {
            eprintln!("oxips: write error: {e}");
            return 1;
        }
    }

    emit_json(
        opts,
        serde_json::json!({
            "command": "apply",
            "records": table.len(),
            "patched_bytes": table.total_patched_bytes(),
            "target_size": target_size,
            "output_size": target.len(),
        }),
    );
    0
}

// ---------------------------------------------------------------------------
// Print command
// ---------------------------------------------------------------------------

fn cmd_print(opts: &Options) -> i32 {
    let Some(input_file) = &opts.input_file else {
        eprintln!("oxips: print requires an input file");
        return 1;
    };

    let data = match std::fs::read(input_file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("oxips: {}: {e}", input_file.display());
            return 1;
        }
    };
    let (table, summary) = match decoder::decode_with_summary(&data) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("oxips: invalid IPS patch: {e}");
            return 1;
        }
    };

    println!("IPS patch size:          {}", data.len());
    println!("IPS records:             {}", table.len());
    println!("IPS patched bytes:       {}", table.total_patched_bytes());
    println!("IPS minimum target size: {}", table.required_len());
    println!(
        "IPS trailer:             {}",
        if summary.saw_trailer { "EOF" } else { "missing" }
    );
    if summary.trailing_bytes > 0 {
        println!("IPS trailing bytes:      {}", summary.trailing_bytes);
    }
    println!();

    for (i, record) in table.iter().enumerate() {
        let line = RecordLine {
            record,
            show_data: opts.show_data,
            show_key: opts.show_keys,
        };
        println!("{i:>6}  {line}");
    }

    emit_json(
        opts,
        serde_json::json!({
            "command": "print",
            "records": table.len(),
            "patched_bytes": table.total_patched_bytes(),
            "required_len": table.required_len(),
            "trailer": summary.saw_trailer,
        }),
    );
    0
}

// ---------------------------------------------------------------------------
// Merge command
// ---------------------------------------------------------------------------

fn cmd_merge(opts: &Options) -> i32 {
    let Some(output_file) = &opts.output_file else {
        eprintln!("oxips: merge requires an output file");
        return 1;
    };

    let mut merged = PatchTable::new();
    let mut total = MergeReport::default();
    for path in &opts.patch_files {
        let table = match ips_io::read_patch_file(path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("oxips: {e}");
                return 1;
            }
        };
        info!("merging {} ({} records)", path.display(), table.len());
        match merged.merge(&table, opts.merge_mode) {
            Ok(report) => {
                total.inserted += report.inserted;
                total.ignored += report.ignored;
                total.replaced += report.replaced;
                total.combined += report.combined;
            }
            Err(e) => {
                eprintln!("oxips: {}: {e}", path.display());
                return 1;
            }
        }
    }

    let written = match write_table(opts, output_file, &merged) {
        Some(p) => p,
        None => return 1,
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxips: merged {} patches into {}: {} records ({} inserted, {} ignored, {} replaced, {} combined)",
            opts.patch_files.len(),
            written.display(),
            merged.len(),
            total.inserted,
            total.ignored,
            total.replaced,
            total.combined
        );
    }
    emit_json(
        opts,
        serde_json::json!({
            "command": "merge",
            "patches": opts.patch_files.len(),
            "records": merged.len(),
            "inserted": total.inserted,
            "ignored": total.ignored,
            "replaced": total.replaced,
            "combined": total.combined,
            "output_size": encoder::encoded_len(&merged),
        }),
    );
    0
}

// ---------------------------------------------------------------------------
// Remove command
// ---------------------------------------------------------------------------

fn cmd_remove(opts: &Options) -> i32 {
    let Some(input_file) = &opts.input_file else {
        eprintln!("oxips: remove requires an input file");
        return 1;
    };

    let mut table = match ips_io::read_patch_file(input_file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("oxips: {e}");
            return 1;
        }
    };
    let before = table.len();

    for &address in &opts.addresses {
        if !table.remove(address) && !opts.quiet {
            eprintln!("oxips: warning: no record at {address:#08X}");
        }
    }

    let mut indices = opts.indices.clone();
    indices.sort_unstable_by(|a, b| b.cmp(a));
    indices.dedup();
    for index in indices {
        if !table.remove_at(index) && !opts.quiet {
            eprintln!("oxips: warning: no record at index {index}");
        }
    }
    debug!("removed {} records", before - table.len());

    let output_file = opts.output_file.as_ref().unwrap_or(input_file);
    if write_table(opts, output_file, &table).is_none() {
        return 1;
    }

    emit_json(
        opts,
        serde_json::json!({
            "command": "remove",
            "removed": before - table.len(),
            "records": table.len(),
        }),
    );
    0
}

fn write_table(opts: &Options, path: &Path, table: &PatchTable) -> Option<PathBuf> {
    match ips_io::write_patch_file(path, table, opts.force) {
        Ok(p) => Some(p),
        Err(IoError::OutputExists { path }) => {
            eprintln!(
                "oxips: output file exists, use -f to overwrite: {}",
                path.display()
            );
            None
        }
        Err(e) => {
            eprintln!("oxips: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = log_level(&opts) {
        logger.filter_level(level);
    }
    logger.format_timestamp(None).format_target(false).init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(output) = opts.output_file.take()
        && !opts.quiet
    {
        eprintln!(
            "oxips: warning: -c option overrides output filename: {}",
            output.display()
        );
    }

    let exit_code = match opts.command {
        Command::Apply => cmd_apply(&opts),
        Command::Print => cmd_print(&opts),
        Command::Merge => cmd_merge(&opts),
        Command::Remove => cmd_remove(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
