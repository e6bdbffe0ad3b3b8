//! vaporkit server: wallet operations over JSON lines
//!
//! Reads one request per line on stdin and writes one response per line on
//! stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! vaporkit-server --config /path/to/vaporkit-server.toml
//! vaporkit-server --validate
//! echo '{"op":"decodeAddress","params":{"address":"vp1..."}}' | vaporkit-server
//! ```

mod config;
mod dispatch;
mod hardening;

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use vaporkit_core::keystore::MemoryKeyStore;

const DEFAULT_CONFIG: &str = "vaporkit-server.toml";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut validate_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(PathBuf::from(&args[i]));
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("vaporkit-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    // An explicit path must exist; the default one may be absent
    let mut server_config = match config_path {
        Some(path) => config::ServerConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if PathBuf::from(DEFAULT_CONFIG).exists() => {
            config::ServerConfig::from_file(DEFAULT_CONFIG.as_ref())?
        }
        None => config::ServerConfig::default(),
    };

    server_config.apply_env_overrides();
    server_config
        .validate()
        .context("Configuration validation failed")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&server_config.server.log_level),
    )
    .target(env_logger::Target::Stderr)
    .init();

    let params = server_config.network_params()?;
    let kdf = server_config.kdf_params()?;

    if validate_only {
        println!("Configuration is valid.");
        println!("  Chain:     {:?}", params.chain);
        println!("  Network:   {}", params.network);
        println!("  Prefix:    {}", params.bech32_hrp);
        println!("  KDF:       {}", server_config.keystore.kdf);
        match server_config.keystore.dir {
            Some(ref dir) => println!("  Keystore:  {}", dir.display()),
            None => println!("  Keystore:  (memory only)"),
        }
        return Ok(());
    }

    hardening::disable_core_dumps();

    let store = match server_config.keystore.dir {
        Some(ref dir) => MemoryKeyStore::load_dir(dir)
            .with_context(|| format!("Failed to load keystore dir {}", dir.display()))?,
        None => MemoryKeyStore::new(),
    };
    log::info!(
        "serving {} ({:?}) with {} stored keys",
        params.network,
        params.chain,
        store.len()
    );

    let mut dispatcher = dispatch::Dispatcher::new(params, kdf, store);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read request")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = dispatcher.handle_line(&line);
        serde_json::to_writer(&mut out, &response).context("Failed to write response")?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    log::info!("input closed, exiting");
    Ok(())
}

fn print_help() {
    println!(
        r#"vaporkit server: wallet operations over JSON lines

USAGE:
    vaporkit-server [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Config file path [default: ./vaporkit-server.toml]
    --validate             Validate configuration and exit
    -h, --help             Print this help
    -V, --version          Print version

PROTOCOL:
    One JSON request per line on stdin:  {{"op": "<name>", "params": {{...}}}}
    One JSON response per line on stdout: {{"data": ...}} or {{"error": "..."}}

    Ops: createKey, resetKeyPassword, createAccount, createAccountReceiver,
         createPubkey, signTransaction, signMessage, convertArgument,
         decodeAddress, decodeRawTx

ENVIRONMENT VARIABLES:
    VAPORKIT_LOG_LEVEL     Override server.log_level
    VAPORKIT_CHAIN         Override network.chain (sidechain, mainchain)
    VAPORKIT_NETWORK       Override network.network (main, test, solo)
    VAPORKIT_KEYSTORE_DIR  Override keystore.dir
    VAPORKIT_KDF           Override keystore.kdf (standard, light)
"#
    );
}
