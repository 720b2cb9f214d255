use std::fs;
use std::io::{self, Write};

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;
use tracing::debug;
use ul_crypto::ContentHasher;
use ul_log::{FileLineSource, Log, LogEntry, LogLocation, LogParser};
use ul_server::{
    BulkImporter, CheckOptions, ConsistencyChecker, ImportOptions, StoreConfig, StoreServer,
};

use crate::cli::*;

/// Source recorded on entries created from the command line.
const CLI_SOURCE: &str = concat!("ul ", env!("CARGO_PKG_VERSION"));

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = store_config(&cli)?;
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Init => cmd_init(config, json),
        Command::Put(args) => cmd_put(config, args, json),
        Command::Get(args) => cmd_get(config, args),
        Command::Exists(args) => cmd_exists(config, args, json),
        Command::Log(args) => cmd_log(config, args, json),
        Command::Check(args) => cmd_check(config, args, cli.verbose, json),
        Command::Import(args) => cmd_import(config, args, cli.verbose, json),
    }
}

/// File settings first, then command-line overrides.
fn store_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(kind) = cli.hash_kind {
        config.hash_kind = kind;
    }
    debug!(root = %config.root.display(), kind = %config.hash_kind, "store config resolved");
    Ok(config)
}

fn open(config: StoreConfig) -> anyhow::Result<StoreServer> {
    let root = config.root.clone();
    StoreServer::open(config).with_context(|| format!("opening store at {}", root.display()))
}

fn cmd_init(config: StoreConfig, json: bool) -> anyhow::Result<()> {
    let mut server = open(config)?;
    if json {
        println!(
            "{}",
            json!({
                "root": server.root(),
                "hash_kind": server.hash_kind(),
                "node_id": server.node_id(),
                "entries": server.log().len(),
            })
        );
    } else {
        println!("{} Store ready in {}", "✓".green().bold(), server.root().display().to_string().bold());
        println!("  Node: {}", server.node_id().to_string().cyan());
        println!("  Hash: {}", server.hash_kind().to_string().yellow());
        println!("  Log entries: {}", server.log().len());
    }
    server.close()?;
    Ok(())
}

fn cmd_put(config: StoreConfig, args: PutArgs, json: bool) -> anyhow::Result<()> {
    let mut server = open(config)?;
    let key = match args.key {
        Some(key) => key,
        None => ContentHasher::new(server.hash_kind())
            .hash_file(&args.file)
            .with_context(|| format!("reading {}", args.file.display()))?
            .into_inner(),
    };
    let src = args.src.as_deref().unwrap_or(CLI_SOURCE);
    let outcome = server
        .put(&args.file, &key, src, args.path.as_deref())
        .with_context(|| format!("adding {}", args.file.display()))?;
    server.close()?;

    if json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else if outcome.already_present() {
        println!("{} {} already present", "=".dimmed(), outcome.key.to_string().yellow());
    } else {
        println!("{} {} ({} bytes)", "✓".green().bold(), outcome.key.to_string().yellow(), outcome.len);
    }
    Ok(())
}

fn cmd_get(config: StoreConfig, args: GetArgs) -> anyhow::Result<()> {
    let server = open(config)?;
    let Some(data) = server.get(&args.key)? else {
        bail!("object not found: {}", args.key);
    };
    match args.output {
        Some(path) => fs::write(&path, &data).with_context(|| format!("writing {}", path.display()))?,
        None => io::stdout().lock().write_all(&data)?,
    }
    Ok(())
}

fn cmd_exists(config: StoreConfig, args: ExistsArgs, json: bool) -> anyhow::Result<()> {
    let server = open(config)?;
    let present = server.exists(&args.key)?;
    if json {
        println!("{}", json!({ "key": args.key, "exists": present }));
    } else if present {
        println!("{} {}", "✓".green(), args.key);
    } else {
        println!("{} {}", "✗".red(), args.key);
    }
    Ok(())
}

fn cmd_log(config: StoreConfig, args: LogArgs, json: bool) -> anyhow::Result<()> {
    let location = LogLocation::new(&config.root, config.log_name.clone());
    let parsed = LogParser::new(config.hash_kind)
        .parse(&FileLineSource::new(location.clone()))
        .with_context(|| format!("reading log {}", location.path().display()))?;
    let log = Log::from_parsed(parsed);
    let skip = args.tail.map_or(0, |n| log.len().saturating_sub(n));
    let shown = &log.entries()[skip..];

    if json {
        let entries: Vec<_> = shown.iter().map(entry_json).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "timestamp": log.timestamp(),
                "prev_hash": log.prev_hash(),
                "prev_master": log.prev_master(),
                "entries": entries,
            }))?
        );
    } else {
        let mut out = io::stdout().lock();
        out.write_all(log.header_line().as_bytes())?;
        for entry in shown {
            out.write_all(entry.to_line().as_bytes())?;
        }
    }
    Ok(())
}

fn entry_json(entry: &LogEntry) -> serde_json::Value {
    let time = i64::try_from(entry.timestamp())
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339());
    json!({
        "timestamp": entry.timestamp(),
        "time": time,
        "key": entry.key(),
        "node_id": entry.node_id(),
        "src": entry.src(),
        "path": entry.path(),
    })
}

fn cmd_check(config: StoreConfig, args: CheckArgs, verbose: bool, json: bool) -> anyhow::Result<()> {
    let mut options = CheckOptions::for_config(config);
    options.repair = args.repair;
    options.verbose = verbose;
    options.start_at = args.start_at;
    options.limit = args.limit;
    let report = ConsistencyChecker::new(options).run().context("consistency check failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for key in &report.orphans {
        println!("  {} {}", "orphan:".red(), key);
    }
    let status = if report.orphans.is_empty() {
        "✓".green().bold()
    } else if report.is_consistent() {
        "✓".yellow().bold()
    } else {
        "✗".red().bold()
    };
    println!(
        "{} {} keys checked, {} log entries, {} orphans, {} repaired",
        status,
        report.keys_checked,
        report.log_entries,
        report.orphans.len(),
        report.repaired
    );
    Ok(())
}

fn cmd_import(config: StoreConfig, args: ImportArgs, verbose: bool, json: bool) -> anyhow::Result<()> {
    let mut options = ImportOptions::into_store(&args.source, config);
    options.verbose = verbose;
    let report = BulkImporter::new(options)
        .run()
        .with_context(|| format!("importing from {}", args.source.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} Imported {}, {} already present, {} skipped",
            "✓".green().bold(),
            report.imported.to_string().bold(),
            report.already_present,
            report.skipped
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::Path;
    use ul_types::HashKind;

    fn run(root: &Path, args: &[&str]) -> anyhow::Result<()> {
        let root = root.to_string_lossy().into_owned();
        let mut argv = vec!["ul", "--root", root.as_str(), "--hash", "sha1"];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn put_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("u");
        let file = dir.path().join("hello.txt");
        fs::write(&file, b"hello").unwrap();

        run(&root, &["init"]).unwrap();
        run(&root, &["put", file.to_str().unwrap(), "--src", "tester"]).unwrap();

        let key = ContentHasher::new(HashKind::Sha1).hash(b"hello");
        let out = dir.path().join("out.txt");
        run(&root, &["get", key.as_str(), "-o", out.to_str().unwrap()]).unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"hello");

        let server = StoreServer::open_at(&root, HashKind::Sha1).unwrap();
        let entry = server.log().get_entry(key.as_str()).unwrap();
        assert_eq!(entry.src(), "tester");
        assert_eq!(entry.path(), "z@hello.txt");
    }

    #[test]
    fn put_with_wrong_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a");
        fs::write(&file, b"a").unwrap();
        let wrong = "0".repeat(40);
        assert!(run(dir.path(), &["put", file.to_str().unwrap(), "--key", &wrong]).is_err());
    }

    #[test]
    fn get_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let key = "1".repeat(40);
        assert!(run(dir.path(), &["get", &key]).is_err());
    }

    #[test]
    fn check_and_log_run_on_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["init"]).unwrap();
        run(dir.path(), &["check", "--repair"]).unwrap();
        run(dir.path(), &["log", "--tail", "3"]).unwrap();
        run(dir.path(), &["--format", "json", "log"]).unwrap();
    }

    #[test]
    fn log_on_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("L"), "bogus header\n").unwrap();
        assert!(run(dir.path(), &["log"]).is_err());
    }

    #[test]
    fn check_and_import_honor_configured_log_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("u");
        let conf = dir.path().join("ul.toml");
        fs::write(&conf, "log_name = \"L2\"\nfsync = true\n").unwrap();
        let conf = conf.to_str().unwrap();

        let src = dir.path().join("src");
        let key = ContentHasher::new(HashKind::Sha1).hash(b"imported");
        let (top, mid) = key.shard();
        fs::create_dir_all(src.join(top).join(mid)).unwrap();
        fs::write(src.join(top).join(mid).join(key.as_str()), b"imported").unwrap();

        run(&root, &["--config", conf, "import", src.to_str().unwrap()]).unwrap();
        run(&root, &["--config", conf, "check", "--repair"]).unwrap();
        assert!(!root.join("L").exists());

        let mut config = StoreConfig::new(&root, HashKind::Sha1);
        config.log_name = "L2".to_string();
        let server = StoreServer::open(config).unwrap();
        assert_eq!(server.log().len(), 1);
        assert!(server.log().contains(key.as_str()));
    }

    #[test]
    fn config_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("ul.toml");
        fs::write(&conf, "root = \"/nonexistent\"\nhash_kind = \"sha3\"\n").unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        let cli = Cli::try_parse_from([
            "ul", "--config", conf.to_str().unwrap(), "--root", root.as_str(), "init",
        ])
        .unwrap();
        let config = store_config(&cli).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.hash_kind, HashKind::Sha3);
    }
}
