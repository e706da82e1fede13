#![forbid(unsafe_code)]

//! Kanonisk CLI — Canonical XML (C14N 1.0, Exclusive C14N 1.0).

use clap::{Parser, Subcommand};
use kanonisk_c14n::{C14nConfig, C14nMode, Canonicalizer};
use kanonisk_core::Error;
use kanonisk_xml::{Document, NodeSet};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "kanonisk",
    about = "Kanonisk — Canonical XML serialization (C14N 1.0, Exclusive C14N 1.0)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize an XML document
    C14n {
        /// Input XML file
        file: PathBuf,

        /// Use Exclusive C14N
        #[arg(short = 'e', long)]
        exclusive: bool,

        /// Keep comments
        #[arg(short = 'c', long = "with-comments")]
        with_comments: bool,

        /// InclusiveNamespaces PrefixList for exclusive C14N ("#default" for the default namespace)
        #[arg(long = "inclusive-prefixes")]
        inclusive_prefixes: Option<String>,

        /// Namespace binding inherited from an enclosing context (PREFIX=URI)
        #[arg(short = 'p', long = "propagate")]
        propagate: Vec<String>,

        /// Select the variant by algorithm URI (overrides --exclusive/--with-comments)
        #[arg(long)]
        algorithm: Option<String>,

        /// Canonicalize only the subtree of the element with this ID
        #[arg(long)]
        id: Option<String>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Refuse documents nested deeper than this many elements
        #[arg(long = "max-depth")]
        max_depth: Option<usize>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported canonicalization algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::C14n {
            file,
            exclusive,
            with_comments,
            inclusive_prefixes,
            propagate,
            algorithm,
            id,
            id_attr,
            max_depth,
            output,
            verbose,
        } => {
            init_logging(verbose);
            build_config(
                exclusive,
                with_comments,
                inclusive_prefixes,
                propagate,
                algorithm,
                max_depth,
            )
            .and_then(|config| cmd_c14n(file, config, id, id_attr, output))
        }

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_config(
    exclusive: bool,
    with_comments: bool,
    inclusive_prefixes: Option<String>,
    propagate: Vec<String>,
    algorithm: Option<String>,
    max_depth: Option<usize>,
) -> Result<C14nConfig, Error> {
    let mode = match algorithm {
        Some(uri) => {
            C14nMode::from_uri(&uri).ok_or_else(|| Error::UnsupportedAlgorithm(uri.clone()))?
        }
        None => match (exclusive, with_comments) {
            (false, false) => C14nMode::Inclusive,
            (false, true) => C14nMode::InclusiveWithComments,
            (true, false) => C14nMode::Exclusive,
            (true, true) => C14nMode::ExclusiveWithComments,
        },
    };

    let mut config = C14nConfig::from_mode(mode);
    if let Some(list) = inclusive_prefixes {
        config = config.with_inclusive_prefixes(&list);
    }
    for binding in &propagate {
        let Some((prefix, uri)) = binding.split_once('=') else {
            return Err(Error::Other(format!(
                "invalid propagate format: {binding} (expected PREFIX=URI)"
            )));
        };
        config = config.with_propagated_namespace(prefix, uri);
    }
    if let Some(depth) = max_depth {
        config = config.with_max_depth(depth);
    }
    Ok(config)
}

fn cmd_c14n(
    file: PathBuf,
    config: C14nConfig,
    id: Option<String>,
    id_attr: Vec<String>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let data = read_file(&file)?;
    let mut doc = Document::parse_bytes(&data)?;
    for attr in &id_attr {
        doc.add_id_attr(attr);
    }

    tracing::info!(
        file = %file.display(),
        exclusive = config.exclusive,
        with_comments = config.with_comments,
        "canonicalizing"
    );

    let node_set = match id {
        Some(value) => {
            let element = doc
                .find_by_id(&value)
                .ok_or_else(|| Error::Other(format!("no element with ID {value}")))?;
            Some(if config.with_comments {
                NodeSet::tree_with_comments(&doc, element)
            } else {
                NodeSet::tree_without_comments(&doc, element)
            })
        }
        None => None,
    };

    let canonical = Canonicalizer::new(config).canonicalize(&mut doc, node_set.as_ref())?;
    write_output(output, &canonical)
}

fn cmd_info() -> Result<(), Error> {
    println!("Kanonisk — Canonical XML serialization");
    println!();
    println!("Supported canonicalization:");
    for mode in [
        C14nMode::Inclusive,
        C14nMode::InclusiveWithComments,
        C14nMode::Exclusive,
        C14nMode::ExclusiveWithComments,
    ] {
        println!("  {}", mode.uri());
    }
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_file(path: &PathBuf) -> Result<Vec<u8>, Error> {
    std::fs::read(path)
        .map_err(|e| Error::Other(format!("{}: {e}", path.display())))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => {
            std::fs::write(&p, data)
                .map_err(|e| Error::Other(format!("{}: {e}", p.display())))
        }
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}
