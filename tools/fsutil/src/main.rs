use std::io::Write;
use std::time::SystemTime;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use fsutil::ops::DEFAULT_MAX_CONCURRENCY;
use fsutil::{Encoding, FileContent, FsOptions, FsUtil, NodeKind, ReadOptions, RealFileSystem};

#[derive(Parser, Debug)]
#[command(name = "fsutil")]
#[command(about = "Recursive file-tree operations: rm -rf, cp -r, mkdir -p and latest mtime", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Children processed at once per directory
    /// (defaults to $FSUTIL_MAX_CONCURRENCY or 16)
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the kind, size and modification time of a path
    Stat { path: String },

    /// Print a file's contents
    Cat {
        path: String,

        /// Decode the file as text before printing
        #[arg(short, long, value_enum)]
        encoding: Option<EncodingArg>,
    },

    /// Write text to a file, creating or truncating it
    Write {
        path: String,
        content: String,

        /// Create missing parent directories first
        #[arg(short, long)]
        parents: bool,
    },

    /// List the entries of a directory
    Ls { path: String },

    /// Remove paths recursively; missing paths are ignored
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Copy a file or directory tree
    Cp {
        src: String,
        dest: String,

        /// Remove the destination first so it ends up identical to the source
        #[arg(short, long)]
        replace: bool,
    },

    /// Create a directory and any missing ancestors
    Mkdir { path: String },

    /// Print the latest modification time under a path
    Mtime { path: String },

    /// Rename a file or directory
    Mv { from: String, to: String },

    /// Create a hard link
    Ln { from: String, to: String },

    /// Set the modification time of an existing path
    Touch {
        path: String,

        /// RFC 3339 timestamp to use instead of the current time
        #[arg(short, long)]
        time: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EncodingArg {
    Utf8,
    Latin1,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Utf8 => Encoding::Utf8,
            EncodingArg::Latin1 => Encoding::Latin1,
        }
    }
}

fn resolve_max_concurrency(flag: Option<usize>) -> Result<usize> {
    if let Some(value) = flag {
        return Ok(value);
    }

    match std::env::var("FSUTIL_MAX_CONCURRENCY") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid FSUTIL_MAX_CONCURRENCY: {value}")),
        Err(_) => Ok(DEFAULT_MAX_CONCURRENCY),
    }
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

fn parse_time(value: &str) -> Result<SystemTime> {
    let time = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid RFC 3339 timestamp: {value}"))?;
    Ok(SystemTime::from(time.with_timezone(&Utc)))
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::File => "file",
        NodeKind::Directory => "directory",
        NodeKind::Symlink => "symlink",
        NodeKind::Other => "other",
    }
}

async fn run(util: &FsUtil<RealFileSystem>, command: Commands) -> Result<()> {
    match command {
        Commands::Stat { path } => {
            let metadata = util
                .stat(&path)
                .await
                .with_context(|| format!("Failed to stat {path}"))?;
            println!("kind: {}", kind_name(metadata.kind));
            println!("size: {}", metadata.len);
            println!("modified: {}", format_time(metadata.modified));
            println!("readonly: {}", metadata.readonly);
        }
        Commands::Cat { path, encoding } => {
            let mut options = ReadOptions::new();
            if let Some(encoding) = encoding {
                options = options.with_encoding(encoding.into());
            }
            let content = util
                .read_file(&path, &options)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            match content {
                FileContent::Text(text) => print!("{text}"),
                FileContent::Bytes(bytes) => std::io::stdout()
                    .write_all(&bytes)
                    .context("Failed to write to stdout")?,
            }
        }
        Commands::Write { path, content, parents } => {
            if parents {
                util.mk_parent_dirs(&path)
                    .await
                    .with_context(|| format!("Failed to create parent directories of {path}"))?;
            }
            util.write_file(&path, content)
                .await
                .with_context(|| format!("Failed to write {path}"))?;
        }
        Commands::Ls { path } => {
            let names = util
                .read_dir(&path)
                .await
                .with_context(|| format!("Failed to list {path}"))?;
            for name in names {
                println!("{name}");
            }
        }
        Commands::Rm { paths } => {
            util.rm_rf_many(paths.as_slice())
                .await
                .context("Failed to remove paths")?;
            log::info!("Removed {} path(s)", paths.len());
        }
        Commands::Cp { src, dest, replace } => {
            let copied = if replace {
                util.cp_r_replacing(&src, &dest).await
            } else {
                util.cp_r(&src, &dest).await
            };
            copied.with_context(|| format!("Failed to copy {src} -> {dest}"))?;
            log::info!("Copied: {} -> {}", src, dest);
        }
        Commands::Mkdir { path } => {
            util.mkdir_r(&path)
                .await
                .with_context(|| format!("Failed to create {path}"))?;
        }
        Commands::Mtime { path } => {
            let mtime = util
                .mtime_r(&path)
                .await
                .with_context(|| format!("Failed to compute mtime of {path}"))?;
            match mtime {
                Some(time) => println!("{}", format_time(time)),
                None => println!("absent"),
            }
        }
        Commands::Mv { from, to } => {
            util.rename(&from, &to)
                .await
                .with_context(|| format!("Failed to rename {from} -> {to}"))?;
        }
        Commands::Ln { from, to } => {
            util.link(&from, &to)
                .await
                .with_context(|| format!("Failed to link {from} -> {to}"))?;
        }
        Commands::Touch { path, time } => {
            let time = match time {
                Some(value) => parse_time(&value)?,
                None => SystemTime::now(),
            };
            util.set_mtime(&path, time)
                .await
                .with_context(|| format!("Failed to set mtime of {path}"))?;
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let log_level = if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .target(env_logger::Target::Stderr)
        .init();

    let max_concurrency = resolve_max_concurrency(cli.max_concurrency)?;
    log::debug!("Using max concurrency: {}", max_concurrency);

    let options = FsOptions::default().with_max_concurrency(max_concurrency);
    let util = FsUtil::with_options(RealFileSystem::new(), options);

    run(&util, cli.command).await
}
