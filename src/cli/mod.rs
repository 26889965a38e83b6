//! CLI command definitions for configbind
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::{ConfigLoader, EnvSnapshot, Format, LoaderOptions, ResolvedFile};
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for merged configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => Format::Yaml,
            OutputFormat::Json => Format::Json,
        }
    }
}

/// Inspect layered YAML/JSON configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by commands that resolve files.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Environment name (overrides CONFIGBIND_ENV)
    #[arg(short, long)]
    pub environment: Option<String>,

    /// Do not fall back to `<stem>.example.<ext>` for missing files
    #[arg(long)]
    pub no_example: bool,

    /// Configuration files, lowest precedence first
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the active environment name
    Env {
        /// Environment name (overrides CONFIGBIND_ENV)
        #[arg(short, long)]
        environment: Option<String>,
    },

    /// List the files that would be loaded, in load order
    Files(SourceArgs),

    /// Print the merged configuration tree
    Merge {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
}

impl SourceArgs {
    fn loader(&self, verbose: bool, vars: EnvSnapshot) -> ConfigLoader {
        let mut options = LoaderOptions::new()
            .example_fallback(!self.no_example)
            .verbose(verbose);
        if let Some(ref env) = self.environment {
            options = options.environment(env.clone());
        }
        ConfigLoader::with_snapshot(options, vars)
    }
}

/// Run a parsed command and return what it prints.
pub fn run(cli: &Cli, vars: EnvSnapshot) -> Result<String> {
    match &cli.command {
        Command::Env { environment } => {
            let mut options = LoaderOptions::new();
            if let Some(env) = environment {
                options = options.environment(env.clone());
            }
            let loader = ConfigLoader::with_snapshot(options, vars);
            Ok(format!("{}\n", loader.environment()))
        }
        Command::Files(sources) => {
            let files = sources.loader(cli.verbose, vars).resolve_files(&sources.files);
            Ok(format_files(&files))
        }
        Command::Merge { sources, output } => {
            let merged = sources.loader(cli.verbose, vars).merge_files(&sources.files)?;
            let rendered = Format::from(*output)
                .encode(&merged.tree.to_json())
                .map_err(anyhow::Error::msg)?;
            Ok(rendered)
        }
    }
}

fn format_files(files: &[ResolvedFile]) -> String {
    files
        .iter()
        .map(|f| format!("{}\t{}\n", f.source, f.path.display()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("configbind").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_env_command() {
        let cli = parse(&["env", "-e", "staging"]);
        assert_eq!(run(&cli, EnvSnapshot::empty()).unwrap(), "staging\n");

        let cli = parse(&["env"]);
        let vars = EnvSnapshot::empty().with("CONFIGBIND_ENV", "production");
        assert_eq!(run(&cli, vars).unwrap(), "production\n");
    }

    #[test]
    fn test_files_command_lists_load_order() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("app.yaml");
        let variant = temp.path().join("app.qa.yaml");
        std::fs::write(&base, "a: 1\n").unwrap();
        std::fs::write(&variant, "a: 2\n").unwrap();

        let cli = parse(&["files", "-e", "qa", base.to_str().unwrap()]);
        let out = run(&cli, EnvSnapshot::empty()).unwrap();
        assert_eq!(
            out,
            format!("base\t{}\nenvironment\t{}\n", base.display(), variant.display())
        );
    }

    #[test]
    fn test_merge_command_outputs_json() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("app.yaml");
        let variant = temp.path().join("app.qa.yaml");
        std::fs::write(&base, "db:\n  host: a\n  port: 1\n").unwrap();
        std::fs::write(&variant, "db:\n  host: b\n").unwrap();

        let cli = parse(&["merge", "-e", "qa", "-o", "json", base.to_str().unwrap()]);
        let out = run(&cli, EnvSnapshot::empty()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, serde_json::json!({"db": {"host": "b", "port": 1}}));
    }

    #[test]
    fn test_files_requires_paths() {
        assert!(Cli::try_parse_from(["configbind", "files"]).is_err());
    }
}
