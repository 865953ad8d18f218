//! Protocol-faithful analyzer stand-in.
//!
//! Implements the client side of the worker socket protocol: connect to
//! `--uds-location`, read the payload to EOF, reconnect, write the
//! result, close, exit 0. By default the result is the payload itself,
//! which makes round-trip accounting easy to verify.
//!
//! Flags for exercising failure paths:
//! - `--fail`: read the payload, then exit 1 without responding.
//! - `--drop-header`: echo everything after the first row.

use std::env;
use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::process::ExitCode;

struct Options {
    socket: String,
    fail: bool,
    drop_header: bool,
}

fn parse_args() -> Option<Options> {
    let mut socket = None;
    let mut fail = false;
    let mut drop_header = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--uds-location" => socket = args.next(),
            "--fail" => fail = true,
            "--drop-header" => drop_header = true,
            _ => return None,
        }
    }

    Some(Options {
        socket: socket?,
        fail,
        drop_header,
    })
}

fn main() -> ExitCode {
    let Some(opts) = parse_args() else {
        eprintln!("usage: uds-echo --uds-location <path> [--fail] [--drop-header]");
        return ExitCode::from(2);
    };

    match run(&opts) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("uds-echo: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: &Options) -> io::Result<ExitCode> {
    // Receive connection: the server writes `header LF rows` and closes.
    let mut payload = Vec::new();
    {
        let mut conn = UnixStream::connect(&opts.socket)?;
        conn.read_to_end(&mut payload)?;
    }

    if opts.fail {
        return Ok(ExitCode::FAILURE);
    }

    let response: &[u8] = if opts.drop_header {
        match payload.iter().position(|&b| b == b'\n') {
            Some(lf) => &payload[lf + 1..],
            None => &[],
        }
    } else {
        &payload
    };

    // Response connection: write everything back and close.
    let mut conn = UnixStream::connect(&opts.socket)?;
    conn.write_all(response)?;
    conn.flush()?;

    Ok(ExitCode::SUCCESS)
}
