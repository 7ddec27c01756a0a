//! Run a few commands on a remote host.
//!
//! Connects, authenticates with a password, runs `echo`, `pwd` and
//! `ls -la`, streams their output to stdout, and disconnects.
//!
//! Run with: `cargo run --example remote_exec --features ssh`
//!
//! Connection settings come from `SSHDRIVE_*` environment variables
//! (`SSHDRIVE_HOST`, `SSHDRIVE_PORT`, `SSHDRIVE_USER`, `SSHDRIVE_PASSWORD`,
//! ...). Without them the public test server `test.rebex.net` is used with
//! its demo account. The server's key must be in `~/.ssh/known_hosts`,
//! hashed or plain:
//!
//! ```text
//! ssh-keyscan -H test.rebex.net >> ~/.ssh/known_hosts
//! ```
//!
//! Set `RUST_LOG=rust_sshdrive=debug` to follow each step.

use std::process::ExitCode;

use rust_sshdrive::backend::RusshEngine;
use rust_sshdrive::config::env::EnvConfig;
use rust_sshdrive::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_HOST: &str = "test.rebex.net";
const DEFAULT_USER: &str = "demo";
const DEFAULT_PASSWORD: &str = "password";

const COMMANDS: [&str; 3] = ["echo 'Hello from rust-sshdrive!'", "pwd", "ls -la"];

fn load_config() -> Result<ClientConfig> {
    let env = EnvConfig::default();
    let base = ClientConfig::new(DEFAULT_HOST)
        .credentials(Credentials::new(DEFAULT_USER, DEFAULT_PASSWORD));
    let config = env.apply(base)?;
    config.validate()?;
    Ok(config)
}

fn run() -> Result<()> {
    let config = load_config()?;
    println!("rust-sshdrive {} ({})", rust_sshdrive::VERSION, rust_sshdrive::FRAMEWORK);
    println!("Connecting to {} as {}\n", config.address(), config.credentials.username);

    let engine = RusshEngine::new().with_host(config.host.clone(), config.port);
    let mut client = Client::from_config(engine, &config, LibraryState::global());
    client.init()?;

    let mut stdout = std::io::stdout().lock();
    let result = client.run_commands(
        &config.host,
        i32::from(config.port),
        &config.credentials,
        COMMANDS,
        &mut stdout,
    );

    client.cleanup();

    let outputs = result?;
    let total: u64 = outputs.iter().map(|o| o.bytes).sum();
    println!("\n{} commands, {total} bytes of output", outputs.len());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rust_sshdrive=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
