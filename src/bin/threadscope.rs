//! threadscope – print the threads of a process.
//
//  $ threadscope 1234
//  Listing threads in PID 1234
//      - thread id 00005678 - priority 08 (delta 00) - affinity 0x0000000f
//  Found 1 threads in PID 1234
use std::io;
use std::process::ExitCode;

use clap::Parser;

use threadscope::{run, Cli, NativePlatform};

fn main() -> ExitCode {
    let cli = Cli::parse();
    run(&NativePlatform::default(), &cli, io::stdout().lock()).into()
}
