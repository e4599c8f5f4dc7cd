//! Bind the PasteMD hotkey to this binary. It forwards one request to the
//! running daemon (`PASTE` unless another is given) and prints the reply.

use anyhow::{Context, Result};
use pastemd::CONTROL_PORT;
use std::io::{Read, Write};
use std::net::TcpStream;

fn main() -> Result<()> {
    let request = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "PASTE".to_string());

    let mut stream = TcpStream::connect(format!("127.0.0.1:{CONTROL_PORT}")).context(format!(
        "Could not reach the PasteMD daemon on \"127.0.0.1:{CONTROL_PORT}\", is it running?"
    ))?;

    stream
        .write_all(format!("{}\n", request.trim()).as_bytes())
        .context("Failed to write to stream when sending the request.")?;

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .context("Failed to read the daemon's reply.")?;

    println!("{response}");
    anyhow::ensure!(response != "BAD_REQUEST", "The daemon did not understand {request:?}");
    Ok(())
}
