//! Main entry point for the geodrop CLI.
//!
//! This binary is an inspection tool over the library: it lists and
//! extracts KMZ archive entries, prints the extracted KML document, and
//! reads features from any file the format registry understands.

use anyhow::{Result, bail};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

use geodrop::{Archive, Cli, FormatRegistry, KmzFormat};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let bytes = fs::read(&cli.file)?;

    // List mode: display archive contents and exit
    if cli.list || cli.verbose {
        return list_entries(&bytes, cli.verbose);
    }

    // Pipe mode: extract the KML document to stdout
    if cli.pipe {
        return print_kml(&bytes);
    }

    // Feature mode: run the dropped-file dispatch and summarize
    if cli.features {
        return read_features(&bytes, &cli);
    }

    extract_entries(&bytes, &cli)
}

/// List entries of a KMZ/ZIP archive.
///
/// Simple format (`-l`) prints one entry name per line; verbose (`-v`)
/// prints a table with sizes, compression ratio and timestamps.
fn list_entries(bytes: &[u8], verbose: bool) -> Result<()> {
    let archive = Archive::parse(bytes)?;

    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in archive.entries() {
        if verbose {
            let (year, month, day) = entry.mod_date();
            let (hour, minute, _second) = entry.mod_time();

            // Compression ratio as percentage saved
            let ratio = if entry.uncompressed_size > 0 {
                format!(
                    "{:>4}%",
                    100 - (entry.compressed_size * 100 / entry.uncompressed_size)
                )
            } else {
                "  0%".to_string()
            };

            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
                entry.uncompressed_size,
                entry.compressed_size,
                ratio,
                year,
                month,
                day,
                hour,
                minute,
                entry.name
            );

            if !entry.is_directory {
                total_uncompressed += entry.uncompressed_size;
                total_compressed += entry.compressed_size;
                file_count += 1;
            }
        } else {
            println!("{}", entry.name);
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        let total_ratio = if total_uncompressed > 0 {
            format!(
                "{:>4}%",
                100 - (total_compressed * 100 / total_uncompressed)
            )
        } else {
            "  0%".to_string()
        };
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
    }

    Ok(())
}

/// Print the KML document contained in a KMZ buffer to stdout.
fn print_kml(bytes: &[u8]) -> Result<()> {
    let mut kmz = KmzFormat::new();
    match kmz.decode(bytes)? {
        Some(text) => {
            print!("{text}");
            Ok(())
        }
        None => bail!("archive contains no .kml entry"),
    }
}

/// Read features through the default format registry and summarize them.
fn read_features(bytes: &[u8], cli: &Cli) -> Result<()> {
    let mut registry = FormatRegistry::defaults();
    let dropped = registry.read(bytes)?;

    if !cli.is_quiet() {
        println!(
            "{}: {} feature(s) via {}",
            cli.file,
            dropped.features.len(),
            dropped.format
        );
    }

    for feature in &dropped.features {
        let name = feature.name.as_deref().unwrap_or("(unnamed)");
        match &feature.style {
            Some(style) if style.icon.is_some() => {
                println!("  {:<16} {} [icon]", feature.geometry_kind(), name);
            }
            _ => println!("  {:<16} {}", feature.geometry_kind(), name),
        }
    }

    Ok(())
}

/// Extract every archive entry to disk.
///
/// Directories are created as needed; existing files are skipped unless
/// `-o` was given.
fn extract_entries(bytes: &[u8], cli: &Cli) -> Result<()> {
    let archive = Archive::parse(bytes)?;

    for entry in archive.entries() {
        // Directory entries are created implicitly with their files
        if entry.is_directory {
            continue;
        }

        let file_name = if cli.junk_paths {
            Path::new(&entry.name)
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| entry.name.clone())
        } else {
            entry.name.clone()
        };

        let output_path = match &cli.extract_dir {
            Some(dir) => PathBuf::from(dir).join(&file_name),
            None => PathBuf::from(&file_name),
        };

        if output_path.exists() && !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.name);
            }
            continue;
        }

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !cli.is_quiet() {
            println!("  extracting: {}", entry.name);
        }
        fs::write(&output_path, &entry.data)?;
    }

    Ok(())
}
