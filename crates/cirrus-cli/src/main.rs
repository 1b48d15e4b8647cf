//! cirrus - launch LXD instances from Ubuntu cloud images.
//!
//! ## Commands
//!
//! - `init` / `launch`: create (and start) an instance
//! - `clone`, `delete`, `snapshot`: manage existing instances
//! - `image`: resolve release names to image references, look up serials
//! - `profile create`: load an LXD profile from a file
//! - `keygen`: generate an SSH key pair
//!
//! Configuration comes from `CIRRUS_*` environment variables; flags override
//! them. Logs go to stderr, results to stdout.

use anyhow::{Context, Result};
use cirrus_lxd::{KeyPair, LaunchSpec, Lxd, LxdConfig, StreamsConfig, Variant};
use clap::{Args, Parser, Subcommand};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cirrus")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Launch LXD instances from Ubuntu cloud images", long_about = None)]
struct Cli {
    /// Manage virtual machines instead of containers
    #[arg(long, global = true)]
    vm: bool,

    /// lxc client binary (overrides CIRRUS_LXC)
    #[arg(long, global = true)]
    lxc: Option<String>,

    /// Architecture used for image lookups (overrides CIRRUS_ARCH)
    #[arg(long, global = true)]
    arch: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an instance without starting it
    Init(LaunchArgs),

    /// Create and start an instance
    Launch {
        #[command(flatten)]
        args: LaunchArgs,

        /// Return without waiting for cloud-init
        #[arg(long)]
        no_wait: bool,
    },

    /// Copy an instance or snapshot (`instance/snapshot`)
    Clone {
        /// Instance or snapshot to copy
        base: String,

        /// Name of the new instance
        name: String,
    },

    /// Delete an instance, stopping it first if running
    Delete {
        /// Instance name
        name: String,
    },

    /// Snapshot an instance
    Snapshot {
        /// Instance name
        instance: String,

        /// Snapshot name (default: `<instance>-snapshot`)
        #[arg(short, long)]
        name: Option<String>,

        /// Keep cloud-init state instead of cleaning it first
        #[arg(long)]
        no_clean: bool,
    },

    /// Resolve and manage images
    Image {
        #[command(subcommand)]
        action: ImageAction,
    },

    /// Manage LXD profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Generate a 4096-bit RSA key pair
    Keygen {
        /// Write the private key here and the public key to `<OUT>.pub`
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ImageAction {
    /// Latest daily image for a release
    Daily {
        /// Release codename or version
        release: String,
    },

    /// Latest released image for a release
    Released {
        /// Release codename or version
        release: String,
    },

    /// Serial of an image
    Serial {
        /// `[<remote>:]<fingerprint>`
        image: String,
    },

    /// Delete an image from the local store
    Delete {
        /// Image fingerprint or alias
        image: String,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Create a profile from a YAML file
    Create {
        /// Profile name
        name: String,

        /// Profile body
        #[arg(short, long)]
        file: PathBuf,

        /// Recreate the profile if it already exists
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct LaunchArgs {
    /// Image to launch, `[<remote>:]<image>`
    image: String,

    /// Instance name (generated by LXD when omitted)
    #[arg(short, long)]
    name: Option<String>,

    /// Delete the instance when it stops
    #[arg(long)]
    ephemeral: bool,

    /// Network to attach
    #[arg(long)]
    network: Option<String>,

    /// Storage pool for the root disk
    #[arg(long)]
    storage: Option<String>,

    /// Instance type, e.g. `c2-m4`
    #[arg(long = "type")]
    instance_type: Option<String>,

    /// Profile to apply (repeatable)
    #[arg(short, long = "profile")]
    profiles: Vec<String>,

    /// Instance config `key=value` (repeatable)
    #[arg(short, long = "config", value_parser = parse_key_val)]
    config: Vec<(String, String)>,

    /// File with cloud-init user data
    #[arg(long)]
    user_data_file: Option<PathBuf>,

    /// Public key to authorize on the instance
    #[arg(long)]
    public_key: Option<PathBuf>,

    /// Private key matching `--public-key` (default: public key path without `.pub`)
    #[arg(long, requires = "public_key")]
    private_key: Option<PathBuf>,
}

impl LaunchArgs {
    async fn spec(&self) -> Result<LaunchSpec> {
        let mut spec = LaunchSpec::new(&self.image);
        spec.name = self.name.clone();
        spec.ephemeral = self.ephemeral;
        spec.network = self.network.clone();
        spec.storage = self.storage.clone();
        spec.instance_type = self.instance_type.clone();
        spec.profiles = self.profiles.clone();
        spec.config = self.config.iter().cloned().collect();

        if let Some(path) = &self.user_data_file {
            let user_data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read user data from {}", path.display()))?;
            spec.user_data = Some(user_data);
        }

        Ok(spec)
    }

    async fn key_pair(&self) -> Result<Option<KeyPair>> {
        let Some(public) = &self.public_key else {
            return Ok(None);
        };
        let private = self
            .private_key
            .clone()
            .unwrap_or_else(|| default_private_key(public));

        let key_pair = KeyPair::load(public, private)
            .await
            .with_context(|| format!("Failed to load public key {}", public.display()))?;
        Ok(Some(key_pair))
    }
}

/// `id_rsa.pub` -> `id_rsa`
fn default_private_key(public: &Path) -> PathBuf {
    match public.extension() {
        Some(ext) if ext == "pub" => public.with_extension(""),
        _ => public.to_path_buf(),
    }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

/// Write a generated key pair to `out` and `<out>.pub`.
///
/// The private key is readable by the owner only, also when `out` already
/// existed. Returns the public key path.
async fn write_key_pair(out: &Path, public: &str, private: &str) -> Result<PathBuf> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;
    tokio::fs::set_permissions(out, std::fs::Permissions::from_mode(0o600))
        .await
        .with_context(|| format!("Failed to restrict {}", out.display()))?;
    file.write_all(private.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    file.flush().await?;

    let public_path = PathBuf::from(format!("{}.pub", out.display()));
    tokio::fs::write(&public_path, format!("{public}\n"))
        .await
        .with_context(|| format!("Failed to write {}", public_path.display()))?;
    Ok(public_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "cirrus=debug"
    } else {
        "cirrus=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = LxdConfig::from_env();
    if let Some(lxc) = cli.lxc {
        config.lxc_binary = lxc;
    }
    if let Some(arch) = cli.arch {
        config.arch = arch;
    }
    let variant = if cli.vm {
        Variant::VirtualMachine
    } else {
        Variant::Container
    };
    tracing::debug!(?config, %variant, "Configuration loaded");

    let mut lxd =
        Lxd::new(variant, config, StreamsConfig::from_env()).context("Invalid configuration")?;

    match cli.command {
        Commands::Init(args) => {
            if let Some(key_pair) = args.key_pair().await? {
                lxd.use_key_pair(key_pair);
            }
            let instance = lxd.init(&args.spec().await?).await?;
            println!("{}", instance.name());
        }
        Commands::Launch { args, no_wait } => {
            if let Some(key_pair) = args.key_pair().await? {
                lxd.use_key_pair(key_pair);
            }
            let instance = lxd.launch(&args.spec().await?, !no_wait).await?;
            println!("{}", instance.name());
        }
        Commands::Clone { base, name } => {
            let instance = lxd.clone_instance(&base, &name).await?;
            println!("{}", instance.name());
        }
        Commands::Delete { name } => {
            lxd.delete_instance(&name).await?;
        }
        Commands::Snapshot {
            instance,
            name,
            no_clean,
        } => {
            let instance = lxd.get_instance(&instance).await?;
            let snapshot = lxd
                .snapshot(&instance, !no_clean, name.as_deref())
                .await?;
            println!("{snapshot}");
        }
        Commands::Image { action } => match action {
            ImageAction::Daily { release } => {
                println!("{}", lxd.daily_image(&release, None).await?);
            }
            ImageAction::Released { release } => {
                println!("{}", lxd.released_image(&release, None).await?);
            }
            ImageAction::Serial { image } => {
                if let Some(serial) = lxd.image_serial(&image).await? {
                    println!("{serial}");
                }
            }
            ImageAction::Delete { image } => {
                lxd.delete_image(&image).await?;
            }
        },
        Commands::Profile { action } => match action {
            ProfileAction::Create { name, file, force } => {
                let body = tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read profile from {}", file.display()))?;
                if lxd.create_profile(&name, &body, force).await? {
                    tracing::info!(profile = %name, "Profile created");
                } else {
                    tracing::info!(profile = %name, "Profile already exists, use --force to recreate");
                }
            }
        },
        Commands::Keygen { out } => {
            let (public, private) = lxd.create_key_pair().await?;
            match out {
                Some(path) => {
                    let public_path = write_key_pair(&path, &public, &private).await?;
                    println!("{}", public_path.display());
                }
                None => {
                    println!("{public}");
                    print!("{private}");
                }
            }
        }
    }

    Ok(())
}
