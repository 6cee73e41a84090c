//! Locafoto CLI - create keys and encrypted photo containers.
//!
//! This tool wraps the container codecs with file I/O: it provisions
//! pre-shared keys, produces `.lfs` containers and `.locaphoto` bundles, and
//! opens them again on the receiving side.

mod config;
mod files;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use locafoto_crypto::wrap::{
    generate_recipient_key, private_key_from_pem, private_key_to_pem, public_key_from_pem,
    public_key_to_pem,
};
use locafoto_crypto::OsRng;
use locafoto_format::bundle::{self, BUNDLE_EXTENSION};
use locafoto_format::keyfile::{self, KEY_FILE_EXTENSION};
use locafoto_format::lfs::{self, LfsContainer, CONTAINER_EXTENSION};
use locafoto_format::{Bundle, PhotoInfo};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "locafoto")]
#[command(about = "Locafoto - Encrypted photo containers")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new pre-shared key file.
    CreateKey {
        /// Key name written into container headers.
        name: String,

        /// Output path (default: <name>.lfkey).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt a photo, or every photo in a directory, into .lfs containers.
    Encrypt {
        /// Key file to encrypt with.
        #[arg(short, long)]
        key: PathBuf,

        /// Photo file or directory of photos.
        input: PathBuf,

        /// Output file, or output directory when the input is a directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt an .lfs container.
    Decrypt {
        /// Key files to resolve the container's key name against
        /// (default: every key file in the configured key directory).
        #[arg(short, long)]
        key: Vec<PathBuf>,

        /// Container to decrypt.
        input: PathBuf,

        /// Where to write the photo (default: <input> without `.lfs`).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate an RSA recipient keypair for bundles.
    Keygen {
        /// Directory to write the PEM files into.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Encrypt a photo into a self-contained .locaphoto bundle.
    Bundle {
        /// Recipient public key (PEM).
        #[arg(short, long)]
        recipient: PathBuf,

        /// Photo to bundle.
        input: PathBuf,

        /// Width in pixels.
        #[arg(long)]
        width: u32,

        /// Height in pixels.
        #[arg(long)]
        height: u32,

        /// Format tag (default: derived from the file extension).
        #[arg(long)]
        format: Option<String>,

        /// Capture time as RFC 3339 (default: now).
        #[arg(long)]
        captured: Option<DateTime<Utc>>,

        /// Output path (default: <input>.locaphoto).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a .locaphoto bundle.
    Unbundle {
        /// Recipient private key (PEM).
        #[arg(short, long)]
        identity: PathBuf,

        /// Bundle to decrypt.
        input: PathBuf,

        /// Where to write the photo (default: <input> with the photo's format
        /// as extension).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show what a container or bundle holds without decrypting it.
    Inspect {
        /// Container or bundle file.
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CliConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::CreateKey { name, output } => cmd_create_key(&name, output).await,

        Commands::Encrypt { key, input, output } => {
            cmd_encrypt(&config, &key, &input, output).await
        }

        Commands::Decrypt { key, input, output } => {
            let output = output.unwrap_or_else(|| decrypted_path(&input));
            cmd_decrypt(&config, &key, &input, &output).await
        }

        Commands::Keygen { output } => cmd_keygen(&output).await,

        Commands::Bundle {
            recipient,
            input,
            width,
            height,
            format,
            captured,
            output,
        } => {
            let format = match format {
                Some(f) => f,
                None => format_from_extension(&input)?,
            };
            let mut info = PhotoInfo::new(width, height, format);
            if let Some(captured) = captured {
                info = info.with_capture_date(captured);
            }
            cmd_bundle(&recipient, &input, info, output).await
        }

        Commands::Unbundle {
            identity,
            input,
            output,
        } => cmd_unbundle(&identity, &input, output).await,

        Commands::Inspect { input } => cmd_inspect(&input).await,
    }
}

/// Format tag for a photo, from its file extension.
fn format_from_extension(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .context("Cannot derive format without a file extension; pass --format")?;
    Ok(match ext.to_ascii_uppercase().as_str() {
        "JPG" => "JPEG".to_string(),
        other => other.to_string(),
    })
}

/// File extension for an extracted photo.
///
/// The format tag comes from the bundle itself, so anything other than plain
/// ASCII alphanumerics falls back to `bin`.
fn photo_extension(format: &str) -> String {
    if !format.is_empty() && format.bytes().all(|b| b.is_ascii_alphanumeric()) {
        format.to_ascii_lowercase()
    } else {
        "bin".to_string()
    }
}

/// Default output for a decrypted container.
fn decrypted_path(input: &Path) -> PathBuf {
    if input.extension().and_then(|e| e.to_str()) == Some(CONTAINER_EXTENSION) {
        input.with_extension("")
    } else {
        files::ensure_extension(input.to_path_buf(), "decrypted")
    }
}

/// Create a new key file.
async fn cmd_create_key(name: &str, output: Option<PathBuf>) -> Result<()> {
    info!("Creating key: {}", name);

    let output = files::ensure_extension(
        output.unwrap_or_else(|| PathBuf::from(name)),
        KEY_FILE_EXTENSION,
    );
    if tokio::fs::try_exists(&output).await.unwrap_or(false) {
        anyhow::bail!("Refusing to overwrite existing key file {}", output.display());
    }

    let (_, encoded) = keyfile::generate(&mut OsRng, name).context("Failed to create key")?;
    tokio::fs::write(&output, &encoded)
        .await
        .context("Failed to write key file")?;

    println!("Key created successfully!");
    println!("  Name: {}", name);
    println!("  File: {}", output.display());

    Ok(())
}

/// Encrypt one file or a directory of photos.
async fn cmd_encrypt(
    config: &CliConfig,
    key_path: &Path,
    input: &Path,
    output: Option<PathBuf>,
) -> Result<()> {
    let key_file = files::read_key_file(key_path).await?;

    let metadata = tokio::fs::metadata(input)
        .await
        .with_context(|| format!("Input not found: {}", input.display()))?;

    if !metadata.is_dir() {
        let output = output.unwrap_or_else(|| files::with_extension(input, CONTAINER_EXTENSION));
        return encrypt_one(&key_file, input, &output).await;
    }

    let images = files::discover_images(input, config).await?;
    if images.is_empty() {
        anyhow::bail!("No image files found in directory: {}", input.display());
    }
    info!("Found {} image file(s) to encrypt", images.len());

    let out_dir = match output {
        Some(dir) => dir,
        None => {
            let mut name = input
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_default();
            name.push("_encrypted");
            input.with_file_name(name)
        }
    };
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    for image in &images {
        let mut name = image.file_stem().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(CONTAINER_EXTENSION);
        let target = out_dir.join(name);
        encrypt_one(&key_file, image, &target).await?;
    }

    println!("Encrypted {} file(s) into {}", images.len(), out_dir.display());

    Ok(())
}

async fn encrypt_one(key_file: &keyfile::KeyFile, input: &Path, output: &Path) -> Result<()> {
    info!("Encrypting {} -> {}", input.display(), output.display());

    let plaintext = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let container = lfs::encode(&key_file.name, &key_file.key, &plaintext)
        .context("Failed to encrypt")?;

    tokio::fs::write(output, &container)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Created {}", output.display());
    println!("  Key name: {}", key_file.name);
    println!("  File size: {} bytes", container.len());
    println!("    - Header: {} bytes", lfs::KEY_NAME_FIELD_SIZE);
    println!("    - Encrypted data: {} bytes", plaintext.len());
    println!("    - Nonce: {} bytes", locafoto_crypto::NONCE_SIZE);
    println!("    - Tag: {} bytes", locafoto_crypto::TAG_SIZE);

    Ok(())
}

/// Decrypt an LFS container.
async fn cmd_decrypt(
    config: &CliConfig,
    keys: &[PathBuf],
    input: &Path,
    output: &Path,
) -> Result<()> {
    info!("Decrypting {}", input.display());

    let keyring = if keys.is_empty() {
        let dir = config
            .key_dir()
            .context("No key files given and no key directory configured")?;
        files::load_key_dir(&dir).await?
    } else {
        files::load_key_files(keys).await?
    };

    let container = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let plaintext = lfs::decode(&container, &keyring).context("Failed to decrypt container")?;

    tokio::fs::write(output, &plaintext)
        .await
        .context("Failed to write output file")?;

    println!(
        "File decrypted successfully: {} ({} bytes)",
        output.display(),
        plaintext.len()
    );

    Ok(())
}

/// Generate a recipient keypair.
async fn cmd_keygen(out_dir: &Path) -> Result<()> {
    info!("Generating RSA recipient keypair");

    let private = tokio::task::spawn_blocking(|| generate_recipient_key(&mut OsRng))
        .await
        .context("Key generation task failed")??;
    let private_pem = private_key_to_pem(&private)?;
    let public_pem = public_key_to_pem(&private.to_public_key())?;

    let private_path = out_dir.join("recipient_private.pem");
    let public_path = out_dir.join("recipient_public.pem");

    tokio::fs::create_dir_all(out_dir).await?;
    tokio::fs::write(&private_path, private_pem.as_bytes())
        .await
        .context("Failed to write private key")?;
    tokio::fs::write(&public_path, public_pem.as_bytes())
        .await
        .context("Failed to write public key")?;

    println!("Keypair created successfully!");
    println!("  Private key: {} (keep secret)", private_path.display());
    println!("  Public key: {}", public_path.display());

    Ok(())
}

/// Create a bundle for a recipient.
async fn cmd_bundle(
    recipient: &Path,
    input: &Path,
    info: PhotoInfo,
    output: Option<PathBuf>,
) -> Result<()> {
    info!("Bundling {}", input.display());

    let pem = tokio::fs::read_to_string(recipient)
        .await
        .context("Failed to read recipient public key")?;
    let public = public_key_from_pem(&pem)?;

    let plaintext = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let bundle = bundle::encode(&plaintext, info, &public).context("Failed to create bundle")?;

    let output = output.unwrap_or_else(|| files::with_extension(input, BUNDLE_EXTENSION));
    tokio::fs::write(&output, bundle.to_json()?)
        .await
        .context("Failed to write bundle")?;

    println!("Bundle created successfully: {}", output.display());
    println!("  Photo ID: {}", bundle.photo.id);
    println!("  Original size: {} bytes", bundle.metadata.original_size);

    Ok(())
}

/// Open a bundle with the recipient's private key.
async fn cmd_unbundle(identity: &Path, input: &Path, output: Option<PathBuf>) -> Result<()> {
    info!("Opening bundle {}", input.display());

    let pem = tokio::fs::read_to_string(identity)
        .await
        .context("Failed to read private key")?;
    let private = private_key_from_pem(&pem)?;

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let bundle = Bundle::from_slice(&bytes).context("Failed to parse bundle")?;

    let plaintext = bundle::decode(&bundle, &private).context("Failed to decrypt bundle")?;

    let output = output.unwrap_or_else(|| {
        files::with_extension(input, &photo_extension(&bundle.metadata.format))
    });
    tokio::fs::write(&output, &plaintext)
        .await
        .context("Failed to write output file")?;

    println!(
        "Photo extracted successfully: {} ({} bytes)",
        output.display(),
        plaintext.len()
    );

    Ok(())
}

/// Describe a container or bundle.
async fn cmd_inspect(input: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    print!("{}", describe(&bytes)?);

    Ok(())
}

/// Render a summary of a bundle or container.
///
/// Bundles are tried first; a container whose key name happens to look like
/// JSON still falls through to the container parser.
fn describe(bytes: &[u8]) -> Result<String> {
    let bundle_err = match Bundle::from_slice(bytes) {
        Ok(bundle) => {
            let meta = &bundle.metadata;
            return Ok(format!(
                "Locaphoto bundle (version {})\n  Photo ID: {}\n  Original size: {} bytes\n  Captured: {}\n  Dimensions: {}x{}\n  Format: {}\n",
                bundle.version,
                bundle.photo.id,
                meta.original_size,
                meta.capture_date,
                meta.width,
                meta.height,
                meta.format
            ));
        }
        Err(e) => e,
    };

    match LfsContainer::parse(bytes) {
        Ok(container) => Ok(format!(
            "LFS container\n  Key name: {}\n  File size: {} bytes\n  Encrypted data: {} bytes\n",
            container.key_name(),
            bytes.len(),
            container.plaintext_len()
        )),
        Err(lfs_err) => {
            let looks_like_json = bytes
                .iter()
                .find(|b| !b.is_ascii_whitespace())
                .map(|&b| b == b'{')
                .unwrap_or(false);
            if looks_like_json {
                Err(bundle_err).context("Failed to parse bundle")
            } else {
                Err(lfs_err).context("Not a valid LFS container")
            }
        }
    }
}
