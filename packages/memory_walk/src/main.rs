#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the memory walk benchmark.
//!
//! Prints exactly one result line to stdout. Diagnostics (the huge page fallback warning, the
//! dead-code canary and argument errors) go to stderr.

use std::io;
use std::num::NonZero;
use std::process::ExitCode;

use argh::FromArgs;
use memory_walk::{AccessPattern, Benchmark, BenchmarkConfig, ShuffleScope, parse_size};
use tracing_subscriber::EnvFilter;

/// Measures memory read throughput of a multithreaded workload under cache and TLB pressure.
///
/// Every option may be given at most once; repeating one is an error rather than the last value
/// winning.
#[derive(Debug, FromArgs)]
struct Args {
    /// working set size in bytes, optionally suffixed with K, M or G (default 32M)
    #[argh(option, default = "32 * 1024 * 1024", from_str_fn(parse_size_arg))]
    size: usize,

    /// distance between visited elements in bytes, optionally suffixed with K, M or G (default 64)
    #[argh(option, default = "64", from_str_fn(parse_size_arg))]
    stride: usize,

    /// number of worker threads (default 1)
    #[argh(option, default = "NonZero::<usize>::MIN")]
    threads: NonZero<usize>,

    /// number of full passes each worker makes over its range (default 4)
    #[argh(option, default = "4")]
    iters: usize,

    /// access pattern, seq or random (default seq)
    #[argh(option, default = "AccessPattern::Sequential")]
    pattern: AccessPattern,

    /// back the working set with huge pages, falling back to standard pages if that fails
    #[argh(switch)]
    huge: bool,

    /// seed of the random access order (default derived from the clock)
    #[argh(option)]
    seed: Option<u64>,

    /// how the random order is shared between workers, global or per-worker (default global)
    #[argh(option, default = "ShuffleScope::Global")]
    shuffle: ShuffleScope,
}

fn parse_size_arg(value: &str) -> Result<usize, String> {
    parse_size(value).map_err(|e| e.to_string())
}

/// argh only understands `--name value`, so `--name=value` is split into two arguments.
fn split_equals_syntax<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .flat_map(|arg| match split_flag(&arg) {
            Some((name, value)) => vec![format!("--{name}"), value.to_string()],
            None => vec![arg],
        })
        .collect()
}

fn split_flag(arg: &str) -> Option<(&str, &str)> {
    arg.strip_prefix("--")?.split_once('=')
}

// Binary entry point - mutations would require subprocess testing, which lives in
// tests/integration_tests.rs.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    // Stdout carries the result line and nothing else.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let env_args = split_equals_syntax(std::env::args());
    let str_args: Vec<&str> = env_args.iter().map(String::as_str).collect();

    let program_name = str_args.first().copied().unwrap_or("memory_walk");

    let args = match Args::from_args(&[program_name], str_args.get(1..).unwrap_or(&[])) {
        Ok(args) => args,
        Err(early_exit) => {
            return if early_exit.status.is_ok() {
                println!("{}", early_exit.output);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}", early_exit.output);
                ExitCode::FAILURE
            };
        }
    };

    let mut builder = BenchmarkConfig::builder()
        .size_bytes(args.size)
        .stride_bytes(args.stride)
        .thread_count(args.threads)
        .pass_count(args.iters)
        .pattern(args.pattern)
        .shuffle_scope(args.shuffle)
        .use_large_pages(args.huge);

    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }

    match Benchmark::new(builder.build()).run() {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
