use clap::{Parser, Subcommand};
use psbshell::context::ShellContext;
use psbshell::extract::{ExtractOptions, Extractor};
use psbshell::shell::{detect_required, Registry, ShellKind};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "psbshell", about = "PSB shell container and archive extraction tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every entry of one or more `*_info.psb.m` archives
    Extract {
        /// Manifest files (`<base>_info.psb.m`; blob expected at `<base>_body.bin`)
        #[arg(required = true, num_args = 1..)]
        manifest: Vec<PathBuf>,
        /// Cipher key text; omit for unciphered archives
        #[arg(short, long, default_value = "")]
        key: String,
        /// Bounded keystream length (key material repeats with this period)
        #[arg(long)]
        key_length: Option<usize>,
        /// One worker task per entry
        #[arg(short, long)]
        parallel: bool,
        /// Write unwrapped bytes verbatim instead of decompiling
        #[arg(short, long)]
        raw: bool,
        /// Destination directory (default: `<base>/` beside the manifest)
        #[arg(short = 'C', long)]
        output_dir: Option<PathBuf>,
        /// Override the manifest's declared entry suffix
        #[arg(long)]
        suffix: Option<String>,
        /// Verify PSZ checksum trailers instead of ignoring them
        #[arg(long)]
        strict: bool,
    },
    /// Strip or apply a single shell on standalone files
    Convert {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Target shell to apply (mdf, mxb, mzs, psz, lz4); omit to strip
        #[arg(long)]
        to: Option<String>,
        #[arg(short, long, default_value = "")]
        key: String,
        #[arg(long)]
        key_length: Option<usize>,
        /// Fast deflate class instead of compact (mdf/psz)
        #[arg(long)]
        fast: bool,
        /// Compression level (mzs; clamped to 1-22)
        #[arg(short, long)]
        level: Option<i32>,
        /// Output path; defaults to the input with a suffix added/removed
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    match Cli::parse().command {

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract {
            manifest, key, key_length, parallel, raw, output_dir, suffix, strict,
        } => {
            let registry = if strict { Registry::strict() } else { Registry::new() };
            let extractor = Extractor::new(registry);
            let opts = ExtractOptions {
                parallel,
                raw,
                out_dir: output_dir,
                key_length,
                suffix_hint: suffix,
            };
            for path in &manifest {
                match extractor.extract(path, &key, &opts) {
                    Ok(summary) if summary.directory_only => {
                        println!(
                            "{}: blob missing, listed {} entries (directory only)",
                            path.display(),
                            summary.total
                        );
                    }
                    Ok(summary) => {
                        println!(
                            "{}: {} succeeded / {} total",
                            path.display(),
                            summary.succeeded,
                            summary.total
                        );
                        for failure in &summary.errors {
                            println!("  {failure}");
                        }
                    }
                    Err(e) => println!("{}: {e}", path.display()),
                }
            }
        }

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert { input, to, key, key_length, fast, level, output } => {
            let registry = Registry::new();
            let target = to.as_deref().map(|name| {
                ShellKind::from_name(name).unwrap_or_else(|| {
                    eprintln!("Unknown shell '{name}', defaulting to mdf");
                    ShellKind::Mdf
                })
            });
            let conv = Conversion { registry, target, key, key_length, fast, level, output };
            for path in &input {
                if let Err(e) = conv.run(path) {
                    println!("{}: {e}", path.display());
                }
            }
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────────────

struct Conversion {
    registry: Registry,
    target: Option<ShellKind>,
    key: String,
    key_length: Option<usize>,
    fast: bool,
    level: Option<i32>,
    output: Option<PathBuf>,
}

impl Conversion {
    fn run(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let data = std::fs::read(path)?;
        let mut ctx = ShellContext {
            key: (!self.key.is_empty()).then(|| self.key.clone()),
            key_length: self.key_length,
            fast_compression: self.fast,
            compression_level: self.level,
            ..ShellContext::default()
        };

        let (out_bytes, out_path) = match self.target {
            Some(kind) => {
                let wrapped = self.registry.wrap(kind, &data, &mut ctx)?;
                let dest = self.output.clone().unwrap_or_else(|| {
                    path.with_file_name(format!(
                        "{}.{}",
                        path.file_name().unwrap_or_default().to_string_lossy(),
                        kind.name()
                    ))
                });
                (wrapped, dest)
            }
            None => {
                let kind = detect_required(&data)?;
                let raw = self.registry.unwrap(kind, &data, &mut ctx)?;
                let dest = self.output.clone().unwrap_or_else(|| {
                    path.with_file_name(format!(
                        "{}.raw",
                        path.file_stem().unwrap_or_default().to_string_lossy()
                    ))
                });
                println!("  {kind} shell stripped from {}", path.display());
                (raw, dest)
            }
        };

        std::fs::write(&out_path, out_bytes)?;
        println!("  wrote {}", out_path.display());
        Ok(())
    }
}
