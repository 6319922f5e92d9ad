//! citadel-age: age-encryption.org/v1 file encryption
//!
//! Commands:
//!   keygen [--pq] [-o FILE]                        - generate an identity
//!   encrypt (-r RECIPIENT... | -p) [--armor] [IN]  - encrypt a file
//!   decrypt (-i IDENTITY_FILE... | -p) [IN]        - decrypt a file
//!   inspect [IN]                                   - describe a file without decrypting

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use citadel_age::{
    armor, generate_hybrid_identity, generate_identity, identity_to_recipient, inspect,
    parse_identity_file, Decrypter, Encrypter, DEFAULT_SCRYPT_WORK_FACTOR,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "citadel-age",
    version,
    about = "age-encryption.org/v1 file encryption",
    long_about = "citadel-age: encrypt and decrypt files to X25519, ML-KEM-768 + X25519, or passphrase recipients"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new identity
    ///
    /// The matching recipient is printed on stderr and recorded as a comment.
    Keygen {
        /// Generate a post-quantum (ML-KEM-768 + X25519) identity
        #[arg(long)]
        pq: bool,
        /// Write the identity here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Encrypt a file to recipients or a passphrase
    Encrypt {
        /// Recipient public key (age1... or age1pq1...), repeatable
        #[arg(long = "recipient", short = 'r', conflicts_with = "passphrase")]
        recipients: Vec<String>,
        /// Encrypt with a passphrase
        #[arg(long, short = 'p')]
        passphrase: bool,
        /// scrypt work factor (log2 N) for passphrase encryption
        #[arg(long, env = "CITADEL_AGE_WORK_FACTOR", default_value_t = DEFAULT_SCRYPT_WORK_FACTOR)]
        work_factor: u8,
        /// Produce ASCII-armored output
        #[arg(long, short = 'a')]
        armor: bool,
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Input file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Decrypt a file with identities or a passphrase
    ///
    /// Armored input is detected automatically.
    Decrypt {
        /// Identity file, repeatable
        #[arg(long = "identity", short = 'i', conflicts_with = "passphrase")]
        identities: Vec<PathBuf>,
        /// Decrypt with a passphrase
        #[arg(long, short = 'p')]
        passphrase: bool,
        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Input file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Show recipient types and sizes of an encrypted file
    Inspect {
        /// Input file (default: stdin)
        input: Option<PathBuf>,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Keygen { pq, output } => cmd_keygen(pq, output.as_deref()),
        Commands::Encrypt { recipients, passphrase, work_factor, armor, output, input } => {
            cmd_encrypt(&recipients, passphrase, work_factor, armor, output.as_deref(), input.as_deref())
        }
        Commands::Decrypt { identities, passphrase, output, input } => {
            cmd_decrypt(&identities, passphrase, output.as_deref(), input.as_deref())
        }
        Commands::Inspect { input } => cmd_inspect(input.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

// ── I/O helpers ────────────────────────────────────────────────────────────────

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(p) => {
            let f = File::open(p).with_context(|| format!("open {}", p.display()))?;
            Box::new(BufReader::new(f))
        }
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => {
            let f = File::create(p).with_context(|| format!("create {}", p.display()))?;
            Box::new(io::BufWriter::new(f))
        }
        None => Box::new(io::stdout().lock()),
    })
}

/// Replace armored input with its decoded bytes; binary input passes through.
fn dearmor(mut input: Box<dyn BufRead>) -> Result<Box<dyn BufRead>> {
    let peek = input.fill_buf().context("read input")?;
    if !peek.starts_with(armor::BEGIN_MARKER.as_bytes()) {
        return Ok(input);
    }
    let mut text = String::new();
    input.read_to_string(&mut text).context("read armored input")?;
    Ok(Box::new(Cursor::new(armor::decode(&text)?)))
}

/// `CITADEL_AGE_PASSPHRASE`, or an interactive prompt.
fn read_passphrase(confirm: bool) -> Result<String> {
    if let Ok(p) = std::env::var("CITADEL_AGE_PASSPHRASE") {
        return Ok(p);
    }
    let pass = rpassword::prompt_password("Enter passphrase: ").context("read passphrase")?;
    if pass.is_empty() {
        bail!("empty passphrase");
    }
    if confirm {
        let again = rpassword::prompt_password("Confirm passphrase: ").context("read passphrase")?;
        if again != pass {
            bail!("passphrases didn't match");
        }
    }
    Ok(pass)
}

// ── Commands ───────────────────────────────────────────────────────────────────

fn cmd_keygen(pq: bool, output: Option<&Path>) -> Result<()> {
    let identity = if pq { generate_hybrid_identity()? } else { generate_identity()? };
    let recipient = identity_to_recipient(&identity)?;

    let mut out = open_output(output)?;
    writeln!(out, "# public key: {recipient}")?;
    writeln!(out, "{identity}")?;
    out.flush()?;

    if output.is_some() {
        eprintln!("Public key: {recipient}");
    }
    Ok(())
}

fn cmd_encrypt(
    recipients: &[String],
    passphrase: bool,
    work_factor: u8,
    armored: bool,
    output: Option<&Path>,
    input: Option<&Path>,
) -> Result<()> {
    let mut encrypter = Encrypter::new();
    if passphrase {
        encrypter.set_scrypt_work_factor(work_factor)?;
        encrypter.set_passphrase(read_passphrase(true)?)?;
    } else if recipients.is_empty() {
        bail!("missing recipients: pass -r RECIPIENT or -p");
    } else {
        for r in recipients {
            encrypter.add_recipient(r).with_context(|| format!("recipient {r}"))?;
        }
    }

    let mut reader = open_input(input)?;
    let mut out = open_output(output)?;

    if armored {
        let mut writer = encrypter.encrypt_to(Vec::new())?;
        io::copy(&mut reader, &mut writer).context("encrypt")?;
        let file = writer.finish()?;
        out.write_all(armor::encode(&file).as_bytes())?;
    } else {
        let mut writer = encrypter.encrypt_to(out)?;
        io::copy(&mut reader, &mut writer).context("encrypt")?;
        out = writer.finish()?;
    }
    out.flush()?;
    Ok(())
}

fn cmd_decrypt(
    identities: &[PathBuf],
    passphrase: bool,
    output: Option<&Path>,
    input: Option<&Path>,
) -> Result<()> {
    let mut decrypter = Decrypter::new();
    if passphrase {
        decrypter.add_passphrase(read_passphrase(false)?);
    } else if identities.is_empty() {
        bail!("missing identities: pass -i FILE or -p");
    } else {
        for path in identities {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            for identity in parse_identity_file(&contents)
                .with_context(|| format!("identity file {}", path.display()))?
            {
                decrypter.add(identity);
            }
        }
    }

    let input = dearmor(open_input(input)?)?;
    let mut reader = decrypter.decrypt_from(input)?;
    let mut out = open_output(output)?;

    let copied = io::copy(&mut reader, &mut out).and_then(|_| out.flush());
    if let Err(e) = copied {
        drop(out);
        if let Some(p) = output {
            let _ = fs::remove_file(p);
        }
        return Err(e).context("decrypt");
    }
    Ok(())
}

fn cmd_inspect(input: Option<&Path>) -> Result<()> {
    let mut file = Vec::new();
    dearmor(open_input(input)?)?.read_to_end(&mut file).context("read input")?;

    let info = inspect(&file)?;
    println!("{info}");
    if info.post_quantum {
        println!("post-quantum: yes");
    }
    Ok(())
}
