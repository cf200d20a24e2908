use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use colored::Colorize;
use mempack_crypto::ObjectHasher;
use mempack_pack::{PackDecoder, PackEncoder, PackIndex, PackOptions};
use mempack_store::{MemPack, MemPackConfig, OdbBackend};
use mempack_types::{HashAlgorithm, ObjectId, ObjectType};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::HashObject(args) => {
            let hashed = hash_files(&args)?;
            match format {
                OutputFormat::Json => print_json(&hashed),
                OutputFormat::Text => {
                    for entry in &hashed {
                        println!("{}", entry.id);
                    }
                    Ok(())
                }
            }
        }
        Command::Pack(args) => {
            let report = pack_files(&args)?;
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Text => {
                    println!(
                        "{} Packed {} objects ({})",
                        "✓".green().bold(),
                        report.objects.to_string().bold(),
                        report.codec
                    );
                    println!("  Pack: {}", report.pack_path.display());
                    println!("  Index: {}", report.index_path.display());
                    println!("  Checksum: {}", report.checksum.to_string().yellow());
                    Ok(())
                }
            }
        }
        Command::Verify(args) => {
            let report = verify_pack(&args)?;
            match format {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Text => {
                    for object in &report.objects {
                        println!(
                            "{} {:<6} {:>10} {:>10}",
                            object.id.to_string().yellow(),
                            object.kind.to_string(),
                            object.size,
                            object.offset
                        );
                    }
                    let index_note = if report.index_checked {
                        "index matches".green()
                    } else {
                        "no index".dimmed()
                    };
                    println!(
                        "{} {} objects, checksum {} ({})",
                        "✓".green().bold(),
                        report.objects.len(),
                        report.checksum,
                        index_note
                    );
                    Ok(())
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HashedFile {
    pub path: PathBuf,
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct PackReport {
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
    pub objects: usize,
    pub checksum: ObjectId,
    pub codec: String,
}

#[derive(Debug, Serialize)]
pub struct ObjectReport {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub size: u64,
    pub offset: u64,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub checksum: ObjectId,
    pub index_checked: bool,
    pub objects: Vec<ObjectReport>,
}

fn hash_files(args: &HashObjectArgs) -> anyhow::Result<Vec<HashedFile>> {
    let algorithm = if args.sha256 {
        HashAlgorithm::Sha256
    } else {
        HashAlgorithm::Sha1
    };
    let hasher = ObjectHasher::new(algorithm);
    args.paths
        .iter()
        .map(|path| {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(HashedFile {
                path: path.clone(),
                id: hasher.hash_object(args.kind, &data),
                kind: args.kind,
                size: data.len() as u64,
            })
        })
        .collect()
}

fn pack_files(args: &PackArgs) -> anyhow::Result<PackReport> {
    let options = resolve_options(&args.settings)?;
    let store = MemPack::with_config(MemPackConfig {
        algorithm: options.algorithm,
        ..Default::default()
    });
    for path in &args.files {
        let data =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        store
            .write(ObjectType::Blob, &data)
            .with_context(|| format!("failed to store {}", path.display()))?;
    }

    let file = PackEncoder::new(options.clone())
        .write_files(&store, &args.output)
        .with_context(|| format!("failed to write pack to {}", args.output.display()))?;
    Ok(PackReport {
        pack_path: file.pack_path,
        index_path: file.index_path,
        objects: file.object_count,
        checksum: file.checksum,
        codec: options.codec.to_string(),
    })
}

fn verify_pack(args: &VerifyArgs) -> anyhow::Result<VerifyReport> {
    let options = resolve_options(&args.settings)?;
    let data = std::fs::read(&args.pack)
        .with_context(|| format!("failed to read {}", args.pack.display()))?;
    let pack = PackDecoder::new(options.clone())
        .decode(&data)
        .with_context(|| format!("{} is not a valid pack", args.pack.display()))?;

    let index_path = args.pack.with_extension("idx");
    let index_checked = index_path.exists();
    if index_checked {
        let raw = std::fs::read(&index_path)
            .with_context(|| format!("failed to read {}", index_path.display()))?;
        let stored = PackIndex::from_bytes(&raw, options.algorithm)
            .with_context(|| format!("{} is not a valid index", index_path.display()))?;
        if stored != pack.index() {
            bail!(
                "{} does not describe {}",
                index_path.display(),
                args.pack.display()
            );
        }
    }

    Ok(VerifyReport {
        checksum: pack.checksum,
        index_checked,
        objects: pack
            .objects
            .iter()
            .map(|o| ObjectReport {
                id: o.id,
                kind: o.kind,
                size: o.data.len() as u64,
                offset: o.offset,
            })
            .collect(),
    })
}

/// Merge the optional TOML file with command-line flags; flags win.
fn resolve_options(settings: &PackSettings) -> anyhow::Result<PackOptions> {
    let mut options = match &settings.config {
        Some(path) => load_options(path)?,
        None => PackOptions::default(),
    };
    if settings.sha256 {
        options.algorithm = HashAlgorithm::Sha256;
    }
    if let Some(codec) = settings.codec {
        options.codec = codec;
    }
    if let Some(level) = settings.level {
        options.compression_level = Some(level);
    }
    Ok(options)
}

fn load_options(path: &Path) -> anyhow::Result<PackOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    PackOptions::from_toml_str(&text)
        .with_context(|| format!("invalid pack options in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use mempack_pack::{PackCodec, PackError};

    fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mempack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn hash_object_matches_git() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "hello.txt", b"hello\n");
        let cli = parse(&["hash-object", path.to_str().unwrap()]);
        let Command::HashObject(args) = cli.command else {
            panic!("expected hash-object");
        };
        let hashed = hash_files(&args).unwrap();
        assert_eq!(
            hashed[0].id.to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
        assert_eq!(hashed[0].kind, ObjectType::Blob);
    }

    #[test]
    fn hash_object_type_and_algorithm_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty", b"");
        let cli = parse(&["hash-object", "-t", "tree", "--sha256", path.to_str().unwrap()]);
        let Command::HashObject(args) = cli.command else {
            panic!("expected hash-object");
        };
        let hashed = hash_files(&args).unwrap();
        assert_eq!(hashed[0].kind, ObjectType::Tree);
        assert_eq!(hashed[0].id.algorithm(), HashAlgorithm::Sha256);
    }

    #[test]
    fn hash_object_missing_file_fails() {
        let cli = parse(&["hash-object", "/nonexistent/mempack-test"]);
        let Command::HashObject(args) = cli.command else {
            panic!("expected hash-object");
        };
        assert!(hash_files(&args).is_err());
    }

    #[test]
    fn pack_then_verify() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"data");
        let b = write_file(dir.path(), "b", b"data\0");
        let dup = write_file(dir.path(), "dup", b"data");
        let out = dir.path().join("out");

        let cli = parse(&[
            "pack",
            "--codec",
            "zstd",
            "-o",
            out.to_str().unwrap(),
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            dup.to_str().unwrap(),
        ]);
        let Command::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        let report = pack_files(&args).unwrap();
        assert_eq!(report.objects, 2);
        assert_eq!(report.codec, "zstd");

        let cli = parse(&[
            "verify",
            "--codec",
            "zstd",
            report.pack_path.to_str().unwrap(),
        ]);
        let Command::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        let verified = verify_pack(&args).unwrap();
        assert!(verified.index_checked);
        assert_eq!(verified.checksum, report.checksum);
        let ids: Vec<String> = verified.objects.iter().map(|o| o.id.to_hex()).collect();
        assert_eq!(
            ids,
            [
                "6320cd248dd8aeaab759d5871f8781b5c0505172",
                "7b8673b52ffeb78b7540f7b7c0ca6c5e0ba08772",
            ]
        );
    }

    #[test]
    fn verify_with_wrong_codec_fails() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a", b"payload");
        let out = dir.path().join("out");
        let cli = parse(&["pack", "-o", out.to_str().unwrap(), a.to_str().unwrap()]);
        let Command::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        let report = pack_files(&args).unwrap();

        let cli = parse(&["verify", "--codec", "raw", report.pack_path.to_str().unwrap()]);
        let Command::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert!(verify_pack(&args).is_err());
    }

    #[test]
    fn options_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_file(
            dir.path(),
            "pack.toml",
            b"algorithm = \"sha256\"\ncodec = \"raw\"\n",
        );
        let settings = PackSettings {
            config: Some(config.clone()),
            ..Default::default()
        };
        let options = resolve_options(&settings).unwrap();
        assert_eq!(options.algorithm, HashAlgorithm::Sha256);
        assert_eq!(options.codec, PackCodec::Raw);

        let settings = PackSettings {
            config: Some(config),
            codec: Some(PackCodec::Zstd),
            level: Some(10),
            ..Default::default()
        };
        let options = resolve_options(&settings).unwrap();
        assert_eq!(options.codec, PackCodec::Zstd);
        assert_eq!(options.level(), 10);
    }

    #[test]
    fn bad_options_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_file(dir.path(), "pack.toml", b"codec = \"lz4\"\n");
        let err = load_options(&config).unwrap_err();
        assert!(err.downcast_ref::<PackError>().is_some());
    }

    #[test]
    fn unknown_codec_flag_is_rejected() {
        let result = Cli::try_parse_from(["mempack", "verify", "--codec", "lz4", "x.pack"]);
        assert!(result.is_err());
    }

    #[test]
    fn format_flag_is_global() {
        let cli = parse(&["hash-object", "x", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
