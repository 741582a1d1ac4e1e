//! Sealbox CLI - share a secret that can be read exactly once.
//!
//! This tool is the request and presentation layer around the vault: it
//! validates producer input, renders handles as shareable references, and
//! prints reveal outcomes. The one-time-use and expiry guarantees live in
//! the vault crate, not here.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use url::Url;

use sealbox_store::{create_default_registry, DirStore, SecretStore};
use sealbox_vault::{
    Handle, HandleLayout, StoreConfig, Vault, VaultOptions, KEY_TOKEN_LEN, SECRET_ID_LEN,
    STORE_CONFIG_FILENAME,
};

/// Upper bound on message size, counted in characters.
const MAX_MESSAGE_CHARS: usize = 5000;

/// Lower bound on the TTL, in seconds.
const MIN_TTL_SECS: u64 = 300;

/// Default TTL, in seconds.
const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Parser)]
#[command(name = "sealbox")]
#[command(about = "Sealbox - one-time secret sharing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seal a message; prints the reference that reveals it once.
    Seal {
        /// Message to seal. Read from a hidden prompt when omitted.
        #[arg(short, long)]
        message: Option<String>,

        /// Read the message from stdin instead of prompting.
        #[arg(long, conflicts_with = "message")]
        stdin: bool,

        /// Seconds until the secret expires unrevealed.
        #[arg(short, long, default_value_t = DEFAULT_TTL_SECS)]
        ttl: u64,

        /// Store directory (default: the user data directory).
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Handle layout for a new store: "split" or "combined".
        #[arg(long)]
        layout: Option<HandleLayout>,

        /// Render the reference as a URL under this base.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Reveal a sealed message. Works exactly once per secret.
    Reveal {
        /// Storage identifier from the seal output.
        id: String,

        /// Key token from the seal output (split-layout stores).
        key: Option<String>,

        /// Store directory (default: the user data directory).
        #[arg(short, long)]
        store: Option<PathBuf>,
    },

    /// Remove expired records from the store.
    Purge {
        /// Store directory (default: the user data directory).
        #[arg(short, long)]
        store: Option<PathBuf>,
    },

    /// Show store configuration.
    Info {
        /// Store directory (default: the user data directory).
        #[arg(short, long)]
        store: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the seal/reveal output
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Seal {
            message,
            stdin,
            ttl,
            store,
            layout,
            base_url,
        } => cmd_seal(message, stdin, ttl, store, layout, base_url).await,

        Commands::Reveal { id, key, store } => cmd_reveal(id, key, store).await,

        Commands::Purge { store } => cmd_purge(store).await,

        Commands::Info { store } => cmd_info(store).await,
    }
}

/// Resolve the store root, falling back to the user data directory.
fn store_root(store: Option<PathBuf>) -> Result<PathBuf> {
    match store {
        Some(path) => Ok(path),
        None => dirs::data_dir()
            .map(|dir| dir.join("sealbox"))
            .context("no user data directory available; pass --store"),
    }
}

/// Load the persisted store configuration, if the store exists.
fn load_config(root: &Path) -> Result<Option<StoreConfig>> {
    let path = root.join(STORE_CONFIG_FILENAME);
    match std::fs::read(&path) {
        Ok(raw) => {
            let config = StoreConfig::from_bytes(&raw)
                .with_context(|| format!("invalid store configuration at {}", path.display()))?;
            Ok(Some(config))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).context("failed to read store configuration"),
    }
}

/// Create a new store at `root` and persist its configuration.
fn init_store(root: &Path, layout: HandleLayout) -> Result<StoreConfig> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("failed to create store directory {}", root.display()))?;

    let config = StoreConfig::new(layout, "dir");
    std::fs::write(root.join(STORE_CONFIG_FILENAME), config.to_bytes()?)
        .context("failed to write store configuration")?;

    debug!(root = %root.display(), layout = %layout, "initialized new store");
    Ok(config)
}

/// Resolve the configured backend against the current root.
fn resolve_store(config: &StoreConfig, root: &Path) -> Result<Arc<dyn SecretStore>> {
    let registry = create_default_registry();
    let backend_config = serde_json::json!({ "root": root });
    registry
        .resolve(&config.store_type, backend_config)
        .context("failed to open the secret store")
}

/// Obtain the message from the argument, stdin, or a hidden prompt.
fn read_message(message: Option<String>, use_stdin: bool) -> Result<String> {
    if let Some(message) = message {
        return Ok(message);
    }

    if use_stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read message from stdin")?;
        return Ok(buf.trim_end_matches('\n').to_string());
    }

    rpassword::prompt_password("Secret message: ").context("failed to read message")
}

/// Request-boundary validation: the vault assumes these bounds hold.
fn validate_request(message: &str, ttl: u64) -> Result<()> {
    if message.is_empty() {
        bail!("the message must not be empty");
    }
    let chars = message.chars().count();
    if chars > MAX_MESSAGE_CHARS {
        bail!(
            "the message is {} characters; the maximum is {}",
            chars,
            MAX_MESSAGE_CHARS
        );
    }
    if ttl < MIN_TTL_SECS {
        bail!("the TTL must be at least {} seconds", MIN_TTL_SECS);
    }
    Ok(())
}

/// Render a handle as a shareable URL.
///
/// The key token travels in the fragment, which browsers never send to
/// servers, so the second factor stays out of access logs.
fn share_url(base: &Url, handle: &Handle) -> Result<Url> {
    let mut url = base
        .join(&format!("s/{}", handle.id))
        .context("base URL cannot carry a path")?;
    if let Some(key) = &handle.key {
        url.set_fragment(Some(key));
    }
    Ok(url)
}

/// Seal a message and print its reference.
async fn cmd_seal(
    message: Option<String>,
    stdin: bool,
    ttl: u64,
    store: Option<PathBuf>,
    layout: Option<HandleLayout>,
    base_url: Option<String>,
) -> Result<()> {
    let base = base_url
        .map(|raw| Url::parse(&raw))
        .transpose()
        .context("invalid base URL")?;

    let message = read_message(message, stdin)?;
    validate_request(&message, ttl)?;

    let root = store_root(store)?;
    let config = match load_config(&root)? {
        Some(config) => {
            if let Some(requested) = layout {
                if requested != config.layout {
                    bail!(
                        "this store uses the {} layout; handles of the two layouts are not interchangeable",
                        config.layout
                    );
                }
            }
            config
        }
        None => init_store(&root, layout.unwrap_or_default())?,
    };

    let store = resolve_store(&config, &root)?;
    let vault = Vault::new(store, VaultOptions::with_layout(config.layout));

    let handle = vault.seal(&message, Duration::from_secs(ttl)).await?;

    println!(
        "Secret sealed. It can be revealed exactly once and expires in {} seconds.",
        ttl
    );
    println!("  id:  {}", handle.id);
    if let Some(key) = &handle.key {
        println!("  key: {}", key);
    }
    if let Some(base) = base {
        println!("  url: {}", share_url(&base, &handle)?);
    }
    println!();
    println!("Anyone holding this reference can read the secret once; share it over a trusted channel.");

    Ok(())
}

/// Reveal a sealed message and print it to stdout.
async fn cmd_reveal(id: String, key: Option<String>, store: Option<PathBuf>) -> Result<()> {
    let root = store_root(store)?;
    let config = load_config(&root)?
        .with_context(|| format!("no sealbox store found at {}", root.display()))?;

    // Shape checks up front, with friendlier messages than the vault's
    match config.layout {
        HandleLayout::Split => {
            if id.len() != SECRET_ID_LEN {
                bail!("the identifier must be {} characters", SECRET_ID_LEN);
            }
            if key.as_ref().map(String::len) != Some(KEY_TOKEN_LEN) {
                bail!(
                    "this store requires a {}-character key token alongside the identifier",
                    KEY_TOKEN_LEN
                );
            }
        }
        HandleLayout::Combined => {
            if id.len() != KEY_TOKEN_LEN {
                bail!("the identifier must be {} characters", KEY_TOKEN_LEN);
            }
            if key.is_some() {
                bail!("this store does not use a separate key token");
            }
        }
    }

    let handle = match key {
        Some(key) => Handle::split(id, key),
        None => Handle::single(id),
    };

    let store = resolve_store(&config, &root)?;
    let vault = Vault::new(store, VaultOptions::with_layout(config.layout));

    let plaintext = vault.reveal(&handle).await?;
    println!("{}", plaintext);

    Ok(())
}

/// Sweep expired records from a directory-backed store.
async fn cmd_purge(store: Option<PathBuf>) -> Result<()> {
    let root = store_root(store)?;
    let config = load_config(&root)?
        .with_context(|| format!("no sealbox store found at {}", root.display()))?;

    if config.store_type != "dir" {
        bail!("purge only applies to directory-backed stores");
    }

    let store = DirStore::new(&root).context("failed to open the secret store")?;
    let removed = store.purge_expired().await?;

    println!("Removed {} expired record(s).", removed);
    Ok(())
}

/// Show store configuration.
async fn cmd_info(store: Option<PathBuf>) -> Result<()> {
    let root = store_root(store)?;
    let config = load_config(&root)?
        .with_context(|| format!("no sealbox store found at {}", root.display()))?;

    println!("Store information:");
    println!("  Location: {}", root.display());
    println!(
        "  Version:  {}.{}",
        config.version.major, config.version.minor
    );
    println!("  Layout:   {}", config.layout);
    println!("  Backend:  {}", config.store_type);
    println!("  Created:  {}", config.created_at);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_request_bounds() {
        assert!(validate_request("hello", DEFAULT_TTL_SECS).is_ok());
        assert!(validate_request("x", MIN_TTL_SECS).is_ok());

        assert!(validate_request("", DEFAULT_TTL_SECS).is_err());
        assert!(validate_request("hello", MIN_TTL_SECS - 1).is_err());
        assert!(validate_request(&"x".repeat(MAX_MESSAGE_CHARS + 1), DEFAULT_TTL_SECS).is_err());
        // The bound counts characters, not bytes
        assert!(validate_request(&"é".repeat(MAX_MESSAGE_CHARS), DEFAULT_TTL_SECS).is_ok());
    }

    #[test]
    fn test_share_url_split_puts_key_in_fragment() {
        let base = Url::parse("https://secrets.example.com/").unwrap();
        let handle = Handle::split("a".repeat(SECRET_ID_LEN), "b".repeat(KEY_TOKEN_LEN));

        let url = share_url(&base, &handle).unwrap();

        assert_eq!(url.path(), format!("/s/{}", "a".repeat(SECRET_ID_LEN)));
        assert_eq!(url.fragment(), Some("b".repeat(KEY_TOKEN_LEN).as_str()));
    }

    #[test]
    fn test_share_url_combined_has_no_fragment() {
        let base = Url::parse("https://secrets.example.com/").unwrap();
        let handle = Handle::single("a".repeat(KEY_TOKEN_LEN));

        let url = share_url(&base, &handle).unwrap();

        assert!(url.fragment().is_none());
    }

    #[test]
    fn test_init_and_load_config() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("store");

        assert!(load_config(&root).unwrap().is_none());

        let created = init_store(&root, HandleLayout::Combined).unwrap();
        let loaded = load_config(&root).unwrap().unwrap();

        assert_eq!(loaded.layout, HandleLayout::Combined);
        assert_eq!(loaded.store_type, created.store_type);
    }

    #[test]
    fn test_corrupt_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(STORE_CONFIG_FILENAME), b"not json").unwrap();

        assert!(load_config(dir.path()).is_err());
    }

    #[tokio::test]
    async fn test_seal_then_reveal_through_store_setup() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("store");

        let config = init_store(&root, HandleLayout::Split).unwrap();
        let store = resolve_store(&config, &root).unwrap();
        let vault = Vault::new(store, VaultOptions::with_layout(config.layout));

        let handle = vault
            .seal("hello world", Duration::from_secs(DEFAULT_TTL_SECS))
            .await
            .unwrap();

        // A second process resolves the same store from disk
        let config = load_config(&root).unwrap().unwrap();
        let store = resolve_store(&config, &root).unwrap();
        let vault = Vault::new(store, VaultOptions::with_layout(config.layout));

        assert_eq!(vault.reveal(&handle).await.unwrap(), "hello world");
    }
}
