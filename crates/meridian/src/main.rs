//! meridian: classify SVG meridian diagrams and edit channel mappings.
//!
//! Diagrams are addressed by path relative to `--root`, the same way the
//! viewer addresses them relative to its document root. Mappings are
//! persisted per diagram and mode under `--store`.
//!
//! # Usage
//!
//! ```text
//! meridian classify assets/diagrams/front.svg
//! meridian annotate assets/diagrams/front.svg -o front.annotated.svg
//! meridian auto-map assets/diagrams/front.svg
//! meridian toggle assets/diagrams/front.svg LR s11 s12
//! meridian --mode governing show assets/diagrams/front.svg --json
//! meridian export assets/diagrams/front.svg --out-dir exports
//! meridian import assets/diagrams/front.svg exports/front-principal-mapping.json
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use meridian_core::{Category, Classification, ClassifierConfig, Mapping, MappingMode};
use meridian_io::{
    ClickOutcome, DirSource, FetchError, FileStore, LoadOutcome, Session, SessionError,
    SvgSource, write_export,
};

/// Classify meridian diagrams and edit their channel mappings.
#[derive(Parser, Debug)]
#[command(name = "meridian", version)]
struct Cli {
    /// Directory holding persisted mappings.
    #[arg(long, global = true, default_value = ".meridian")]
    store: PathBuf,

    /// Directory diagram paths are resolved against.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Mapping space (principal, extraordinary, governing).
    #[arg(long, global = true, default_value_t = MappingMode::Principal)]
    mode: MappingMode,

    /// Classifier preset.
    #[arg(long, global = true, value_enum)]
    preset: Option<Preset>,

    /// Full classifier config as JSON. Overrides --preset.
    #[arg(long, global = true)]
    config_json: Option<String>,

    /// Log at debug level (otherwise `RUST_LOG`, defaulting to warn).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List candidate segments and why noise was rejected.
    Classify {
        /// Diagram path.
        diagram: String,
    },
    /// Write the diagram with segment tags and click targets.
    Annotate {
        /// Diagram path.
        diagram: String,
        /// Output file (stdout if omitted).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the stored mapping.
    Show {
        /// Diagram path.
        diagram: String,
    },
    /// Toggle segments in a category, moving them out of any other.
    Toggle {
        /// Diagram path.
        diagram: String,
        /// Category code, e.g. `LU`.
        category: Category,
        /// Segment identifiers, e.g. `s3`.
        #[arg(required = true)]
        segments: Vec<String>,
    },
    /// Empty every category of the current mode.
    Clear {
        /// Diagram path.
        diagram: String,
    },
    /// Draft a mapping from stroke colors (principal mode only).
    AutoMap {
        /// Diagram path.
        diagram: String,
    },
    /// Repair the stored mapping against the current diagram.
    Reconcile {
        /// Diagram path.
        diagram: String,
    },
    /// Export the mapping as JSON.
    Export {
        /// Diagram path.
        diagram: String,
        /// Write `{stem}-{mode}-mapping.json` here instead of stdout.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Replace the mapping with a previously exported one.
    Import {
        /// Diagram path.
        diagram: String,
        /// Exported JSON file.
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Loose,
    Strict,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Classify(#[from] meridian_core::ClassifyError),

    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("category {category} is not part of {mode} mode")]
    ForeignCategory {
        category: Category,
        mode: MappingMode,
    },
}

/// Build a [`ClassifierConfig`] from CLI flags.
///
/// `--config-json` wins over `--preset`; with neither, the defaults apply.
fn config_from_cli(cli: &Cli) -> Result<ClassifierConfig, String> {
    if let Some(json) = &cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("invalid --config-json: {e}"));
    }
    Ok(match cli.preset {
        Some(Preset::Loose) => ClassifierConfig::LOOSE,
        Some(Preset::Strict) => ClassifierConfig::STRICT,
        None => ClassifierConfig::default(),
    })
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, mode = %cli.mode, "classifier config");

    match run(&cli, config) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Execute the subcommand and return what should be printed.
fn run(cli: &Cli, config: ClassifierConfig) -> Result<String, CliError> {
    let source = DirSource::new(&cli.root);

    match &cli.command {
        Command::Classify { diagram } => {
            let classification = meridian_core::classify(&source.fetch(diagram)?, &config)?;
            if cli.json {
                Ok(serde_json::to_string_pretty(&classification)?)
            } else {
                Ok(format_classification(&classification))
            }
        }
        Command::Annotate { diagram, out } => {
            let annotated = meridian_export::annotate(&source.fetch(diagram)?, &config)?;
            match out {
                Some(path) => {
                    std::fs::write(path, &annotated.svg).map_err(|source| CliError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                    eprintln!(
                        "Annotated {} segments into {}",
                        annotated.classification.len(),
                        path.display()
                    );
                    Ok(String::new())
                }
                None => Ok(annotated.svg),
            }
        }
        Command::Show { diagram } => {
            let session = open(cli, config, &source, diagram)?;
            render_mapping(cli, session.mapping())
        }
        Command::Toggle {
            diagram,
            category,
            segments,
        } => {
            let mut session = open(cli, config, &source, diagram)?;
            if !session.select(*category) {
                return Err(CliError::ForeignCategory {
                    category: *category,
                    mode: cli.mode,
                });
            }
            for id in segments {
                match session.click(id) {
                    ClickOutcome::Added(c) => eprintln!("{id}: added to {c}"),
                    ClickOutcome::Removed(c) => eprintln!("{id}: removed from {c}"),
                    ClickOutcome::Ignored => eprintln!("{id}: ignored (unknown or noise)"),
                }
            }
            render_mapping(cli, session.mapping())
        }
        Command::Clear { diagram } => {
            let mut session = open(cli, config, &source, diagram)?;
            session.clear();
            render_mapping(cli, session.mapping())
        }
        Command::AutoMap { diagram } => {
            let mut session = open(cli, config, &source, diagram)?;
            session.auto_map()?;
            render_mapping(cli, session.mapping())
        }
        Command::Reconcile { diagram } => {
            let (session, repaired) = open_with_outcome(cli, config, &source, diagram)?;
            eprintln!(
                "{}",
                if repaired {
                    "Stored mapping repaired"
                } else {
                    "Stored mapping already consistent"
                }
            );
            render_mapping(cli, session.mapping())
        }
        Command::Export { diagram, out_dir } => {
            let session = open(cli, config, &source, diagram)?;
            let blob = session.export()?;
            match out_dir {
                Some(dir) => {
                    let path = write_export(dir, diagram, cli.mode, &blob).map_err(|source| {
                        CliError::Io {
                            path: dir.display().to_string(),
                            source,
                        }
                    })?;
                    eprintln!("Exported to {}", path.display());
                    Ok(String::new())
                }
                None => Ok(blob),
            }
        }
        Command::Import { diagram, file } => {
            let text = std::fs::read_to_string(file).map_err(|source| CliError::Io {
                path: file.display().to_string(),
                source,
            })?;
            let mut session = open(cli, config, &source, diagram)?;
            if session.import(&text)? {
                eprintln!("Imported mapping referenced segments missing from this diagram; repaired");
            }
            render_mapping(cli, session.mapping())
        }
    }
}

fn open(
    cli: &Cli,
    config: ClassifierConfig,
    source: &DirSource,
    diagram: &str,
) -> Result<Session<FileStore>, CliError> {
    open_with_outcome(cli, config, source, diagram).map(|(session, _)| session)
}

fn open_with_outcome(
    cli: &Cli,
    config: ClassifierConfig,
    source: &DirSource,
    diagram: &str,
) -> Result<(Session<FileStore>, bool), CliError> {
    let mut session = Session::new(FileStore::new(&cli.store), config);
    session.switch_mode(cli.mode);
    let repaired = match session.open(source, diagram)? {
        LoadOutcome::Loaded { repaired } => repaired,
        // A lone fetch is always the latest.
        LoadOutcome::Stale => false,
    };
    Ok((session, repaired))
}

fn render_mapping(cli: &Cli, mapping: &Mapping) -> Result<String, CliError> {
    if cli.json {
        Ok(serde_json::to_string_pretty(mapping)?)
    } else {
        Ok(format_mapping(mapping))
    }
}

fn format_classification(classification: &Classification) -> String {
    let mut out = String::new();
    for s in classification.segments() {
        let length = s.length.map_or_else(|| "-".to_string(), |l| format!("{l:.1}"));
        let status = s
            .rejection
            .map_or_else(|| "mappable".to_string(), |r| r.to_string());
        let _ = writeln!(
            out,
            "{:<5} {:<9} {:<10} {:>6} {:>8}  {status}",
            s.id.as_str(),
            s.tag.name(),
            if s.stroke.is_empty() { "-" } else { s.stroke.as_str() },
            s.stroke_width,
            length,
        );
    }
    let mappable = classification.mappable().count();
    let _ = write!(
        out,
        "{} candidates, {mappable} mappable, {} noise",
        classification.len(),
        classification.len() - mappable
    );
    out
}

fn format_mapping(mapping: &Mapping) -> String {
    let mut out = String::new();
    for (category, ids) in mapping.iter() {
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        let _ = writeln!(out, "{:<7} {}", category.code(), ids.join(" "));
    }
    let _ = write!(out, "{} segments mapped ({} mode)", mapping.total(), mapping.mode());
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn workspace_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .to_path_buf()
    }

    fn cli(store: &std::path::Path, args: &[&str]) -> Cli {
        let root = workspace_root();
        let mut argv = vec![
            "meridian".to_string(),
            "--root".to_string(),
            root.display().to_string(),
            "--store".to_string(),
            store.display().to_string(),
        ];
        argv.extend(args.iter().map(ToString::to_string));
        Cli::try_parse_from(argv).unwrap()
    }

    fn exec(cli: &Cli) -> Result<String, CliError> {
        run(cli, config_from_cli(cli).unwrap())
    }

    const DIAGRAM: &str = "assets/diagrams/front.svg";

    #[test]
    fn config_json_overrides_preset() {
        let c = Cli::try_parse_from([
            "meridian",
            "--preset",
            "strict",
            "--config-json",
            r#"{"min_length": 3.0}"#,
            "show",
            "a.svg",
        ])
        .unwrap();
        let config = config_from_cli(&c).unwrap();
        assert!((config.min_length - 3.0).abs() < f64::EPSILON);
        assert!(
            (config.max_stroke_width - ClassifierConfig::DEFAULT_MAX_STROKE_WIDTH).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn preset_selects_config() {
        let c = Cli::try_parse_from(["meridian", "--preset", "strict", "show", "a.svg"]).unwrap();
        assert_eq!(config_from_cli(&c).unwrap(), ClassifierConfig::STRICT);
        let c = Cli::try_parse_from(["meridian", "show", "a.svg"]).unwrap();
        assert_eq!(config_from_cli(&c).unwrap(), ClassifierConfig::default());
    }

    #[test]
    fn bad_config_json_is_reported() {
        let c =
            Cli::try_parse_from(["meridian", "--config-json", "{", "show", "a.svg"]).unwrap();
        assert!(config_from_cli(&c).unwrap_err().starts_with("invalid --config-json"));
    }

    #[test]
    fn arguments_parse_into_domain_types() {
        let c = Cli::try_parse_from([
            "meridian", "--mode", "governing", "toggle", "a.svg", "ren", "s1", "s2",
        ])
        .unwrap();
        assert_eq!(c.mode, MappingMode::Governing);
        match c.command {
            Command::Toggle {
                category, segments, ..
            } => {
                assert_eq!(category, Category::Ren);
                assert_eq!(segments, ["s1", "s2"]);
            }
            other => unreachable!("parsed {other:?}"),
        }
        assert!(Cli::try_parse_from(["meridian", "toggle", "a.svg", "XX", "s1"]).is_err());
        assert!(Cli::try_parse_from(["meridian", "--mode", "minor", "show", "a.svg"]).is_err());
    }

    #[test]
    fn auto_map_then_toggle_persists() {
        let store = tempfile::tempdir().unwrap();
        exec(&cli(store.path(), &["auto-map", DIAGRAM])).unwrap();
        exec(&cli(store.path(), &["toggle", DIAGRAM, "LR", "s11"])).unwrap();

        let shown = exec(&cli(store.path(), &["--json", "show", DIAGRAM])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(value["categories"]["LR"], serde_json::json!(["s11"]));
        assert_eq!(value["categories"]["PC"], serde_json::json!([]));
    }

    #[test]
    fn toggle_rejects_foreign_category() {
        let store = tempfile::tempdir().unwrap();
        let err = exec(&cli(store.path(), &["toggle", DIAGRAM, "DU", "s2"])).unwrap_err();
        assert!(matches!(err, CliError::ForeignCategory { .. }));
    }

    #[test]
    fn export_then_import_round_trips_through_files() {
        let store = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        exec(&cli(store.path(), &["auto-map", DIAGRAM])).unwrap();
        let out_dir = out.path().display().to_string();
        exec(&cli(store.path(), &["export", DIAGRAM, "--out-dir", &out_dir])).unwrap();
        let file = out.path().join("front-principal-mapping.json");
        assert!(file.exists());

        let other = tempfile::tempdir().unwrap();
        let file = file.display().to_string();
        let imported = exec(&cli(other.path(), &["import", DIAGRAM, &file])).unwrap();
        assert!(imported.ends_with("18 segments mapped (principal mode)"));
    }

    #[test]
    fn classify_summarizes_noise() {
        let store = tempfile::tempdir().unwrap();
        let text = exec(&cli(store.path(), &["classify", DIAGRAM])).unwrap();
        assert!(text.ends_with("22 candidates, 18 mappable, 4 noise"));
        assert!(text.lines().next().unwrap().starts_with("s0"));
    }

    #[test]
    fn missing_diagram_fails() {
        let store = tempfile::tempdir().unwrap();
        let err = exec(&cli(store.path(), &["show", "nope.svg"])).unwrap_err();
        assert!(matches!(
            err,
            CliError::Session(SessionError::Fetch(FetchError::NotFound(_)))
        ));
    }
}
