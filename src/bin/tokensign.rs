use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing::debug;
use zeroize::Zeroizing;

use tokensign::{
    adapters::Pkcs11Loader,
    api::{MechanismId, Pin, SlotId},
    Config, TokenWorker,
};

#[derive(Parser, Debug)]
#[command(name = "tokensign")]
#[command(about = "Sign and verify files with a PKCS#11 hardware token", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// PKCS#11 module (shared library) to load
    #[arg(long, global = true, env = "TOKENSIGN_PKCS11_MODULE")]
    pub module: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tokens currently present in a slot
    Tokens,

    /// List the signing mechanisms usable with the token's key
    Mechanisms {
        /// Slot id as printed by `tokens`
        #[arg(long)]
        slot: u64,
    },

    /// Sign FILE and write the signature to FILE.sig
    Sign {
        /// Slot id as printed by `tokens`
        #[arg(long)]
        slot: u64,

        /// Mechanism name (CKM_SHA256_RSA_PKCS), hex (0x40) or decimal code. Defaults to the first usable one
        #[arg(long)]
        mechanism: Option<MechanismId>,

        /// User PIN. Prompted on the terminal if not given
        #[arg(long, env = "TOKENSIGN_PIN", hide_env_values = true)]
        pin: Option<String>,

        /// Also print the signature as hex
        #[arg(long = "hex")]
        print_hex: bool,

        file: PathBuf,
    },

    /// Verify FILE.sig against FILE (exit code 1 if the signature does not match)
    Verify {
        /// Slot id as printed by `tokens`
        #[arg(long)]
        slot: u64,

        /// Mechanism used when signing. Defaults to the first usable one
        #[arg(long)]
        mechanism: Option<MechanismId>,

        signature: PathBuf,
    },
}

const NO_PIN: &str = "Signing cancelled: no PIN entered.";

/// Read the PIN from the controlling terminal, not stdin
fn prompt_pin() -> anyhow::Result<Zeroizing<String>> {
    let tty = std::fs::File::open("/dev/tty").context("no terminal to prompt for the PIN")?;
    prompt_on(&mut std::io::stderr(), BufReader::new(tty))
}

fn prompt_on(out: &mut impl Write, mut input: impl BufRead) -> anyhow::Result<Zeroizing<String>> {
    write!(out, "PIN: ")
        .and_then(|()| out.flush())
        .context("failed to show the PIN prompt")?;

    let mut entered = Zeroizing::new(String::new());
    input
        .read_line(&mut entered)
        .context("failed to read the PIN")?;
    Ok(entered)
}

fn read_pin(explicit: Option<String>) -> anyhow::Result<Pin> {
    let input = match explicit {
        Some(pin) => Zeroizing::new(pin),
        None => prompt_pin()?,
    };

    let entered = input.trim_end_matches(['\r', '\n']);
    if entered.is_empty() {
        bail!(NO_PIN);
    }
    Pin::from_str(entered).context("invalid PIN")
}

async fn pick_mechanism(
    worker: &TokenWorker<Pkcs11Loader>,
    slot: SlotId,
    explicit: Option<MechanismId>,
) -> anyhow::Result<MechanismId> {
    if let Some(mechanism) = explicit {
        return Ok(mechanism);
    }

    let mechanisms = worker
        .list_signing_mechanisms(slot)
        .await
        .context("failed to list mechanisms")?;
    match mechanisms.first() {
        Some(default) => {
            debug!("Using default mechanism {}", default);
            Ok(default.id)
        }
        None => bail!("No usable signing mechanism on slot {}", slot),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::resolve(cli.module.as_deref());
    debug!("Using PKCS#11 module {}", config.module_path.display());
    let worker = TokenWorker::new(Pkcs11Loader::from_config(&config));

    match cli.command {
        Commands::Tokens => {
            let tokens = worker.list_tokens().await.context("failed to list tokens")?;
            if tokens.is_empty() {
                println!("No token found in any slot.");
            }
            for token in tokens {
                println!("{}", token);
            }
        }

        Commands::Mechanisms { slot } => {
            let mechanisms = worker
                .list_signing_mechanisms(SlotId::new(slot))
                .await
                .context("failed to list mechanisms")?;
            if mechanisms.is_empty() {
                println!("No usable signing mechanism on slot {}.", slot);
            }
            for (index, mechanism) in mechanisms.iter().enumerate() {
                let marker = if index == 0 { " [default]" } else { "" };
                println!("{}{}", mechanism, marker);
            }
        }

        Commands::Sign {
            slot,
            mechanism,
            pin,
            print_hex,
            file,
        } => {
            let slot = SlotId::new(slot);
            let mechanism = pick_mechanism(&worker, slot, mechanism).await?;
            let pin = read_pin(pin)?;

            let sidecar = worker
                .sign_file(slot, mechanism, pin, file)
                .await
                .context("signing failed")?;
            println!(
                "File signed successfully. Signature saved to: {}",
                sidecar.display()
            );

            if print_hex {
                let signature = std::fs::read(&sidecar)
                    .with_context(|| format!("failed to read {}", sidecar.display()))?;
                println!("{}", hex::encode(signature));
            }
        }

        Commands::Verify {
            slot,
            mechanism,
            signature,
        } => {
            let slot = SlotId::new(slot);
            let mechanism = pick_mechanism(&worker, slot, mechanism).await?;

            let valid = worker
                .verify_file(slot, mechanism, signature)
                .await
                .context("verification failed")?;
            if valid {
                println!("Signature verified successfully.");
            } else {
                println!("Signature verification failed.");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity.tracing_level_filter())
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
