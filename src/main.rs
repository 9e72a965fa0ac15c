//! Main entry point for the streamzip CLI application.
//!
//! Lists and extracts ZIP archives from the local filesystem or from HTTP
//! URLs, reading through a single bounded scratch buffer.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use streamzip::{ByteSource, Cli, HttpRangeReader, LocalFileReader, ZipExtractor, ZipFileEntry};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.is_http_url() {
        let reader = HttpRangeReader::new(cli.file.clone())?;
        let mut extractor = ZipExtractor::with_scratch_capacity(reader, cli.scratch_size);

        process_zip(&mut extractor, &cli)?;

        // Display network transfer statistics for HTTP sources
        if !cli.is_quiet() {
            let transferred = extractor.into_inner().transferred_bytes();
            eprintln!("\nTotal bytes transferred: {}", format_size(transferred));
        }
    } else {
        let reader = LocalFileReader::open(Path::new(&cli.file))
            .with_context(|| format!("cannot open {}", cli.file))?;
        let mut extractor = ZipExtractor::with_scratch_capacity(reader, cli.scratch_size);
        process_zip(&mut extractor, &cli)?;
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the `-q` defaults.
fn init_logging(cli: &Cli) {
    let default = if cli.is_very_quiet() {
        "off"
    } else if cli.quiet > 0 {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// List or extract, depending on CLI options.
fn process_zip<S: ByteSource>(extractor: &mut ZipExtractor<S>, cli: &Cli) -> Result<()> {
    if cli.list || cli.verbose {
        return list_files(extractor, cli.verbose);
    }

    let entries = extractor.list_files()?;
    let selected: Vec<_> = entries
        .iter()
        .filter(|e| !e.is_directory && is_selected(cli, &e.file_name))
        .collect();
    debug!(total = entries.len(), selected = selected.len(), "entries chosen for extraction");

    for entry in selected {
        extract_file(extractor, entry, cli)?;
    }

    Ok(())
}

/// Whether `name` passes the positional file filters and the `-x` exclusions.
fn is_selected(cli: &Cli, name: &str) -> bool {
    if !cli.files.is_empty() {
        let matches = cli.files.iter().any(|f| {
            if has_glob_chars(f) {
                glob_match(f, name)
            } else {
                name == f.as_str() || base_name(name) == f.as_str()
            }
        });
        if !matches {
            return false;
        }
    }

    !cli
        .exclude
        .iter()
        .any(|x| name.contains(x.as_str()) || glob_match(x, name))
}

/// Print archive contents, either names only or a verbose table.
fn list_files<S: ByteSource>(extractor: &mut ZipExtractor<S>, verbose: bool) -> Result<()> {
    let entries = extractor.list_files()?;

    if !verbose {
        for entry in &entries {
            println!("{}", entry.file_name);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(62));

    let mut total_size = 0u64;
    let mut total_compressed = 0u64;
    for entry in &entries {
        let h = &entry.header;
        let ratio = if h.uncompressed_size > 0 {
            100 - (h.compressed_size as u64 * 100 / h.uncompressed_size as u64).min(100)
        } else {
            0
        };
        let (year, month, day) = h.mod_date();
        let (hour, minute, _) = h.mod_time();

        println!(
            "{:>10}  {:>10}  {:>4}%  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            h.uncompressed_size,
            h.compressed_size,
            ratio,
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );
        total_size += h.uncompressed_size as u64;
        total_compressed += h.compressed_size as u64;
    }

    println!("{}", "-".repeat(62));
    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {} files",
        total_size,
        total_compressed,
        "",
        "",
        "",
        entries.len()
    );

    Ok(())
}

/// Extract one entry to stdout or to its destination path.
fn extract_file<S: ByteSource>(
    extractor: &mut ZipExtractor<S>,
    entry: &ZipFileEntry,
    cli: &Cli,
) -> Result<()> {
    if cli.pipe {
        let mut stdout = std::io::stdout().lock();
        extractor.extract_to_writer(&entry.header, &mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    let Some(relative) = output_name(&entry.file_name, cli.junk_paths) else {
        warn!(name = %entry.file_name, "skipping entry with unsafe path");
        return Ok(());
    };
    let output_path = match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(relative),
        None => relative,
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", entry.file_name);
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.file_name);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.file_name);
    }

    extractor
        .extract_to_file(&entry.header, &output_path)
        .with_context(|| format!("failed to extract {}", entry.file_name))?;

    Ok(())
}

/// Relative output path for an entry name, or `None` if it would escape the
/// destination directory.
fn output_name(name: &str, junk_paths: bool) -> Option<PathBuf> {
    if junk_paths {
        let base = base_name(name);
        return (!base.is_empty() && base != "..").then(|| PathBuf::from(base));
    }

    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

/// Last `/`-separated component of an entry name.
fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Glob matching with `*` (any run of characters) and `?` (one character).
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    // Iterative matcher that backtracks to the most recent star.
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
