use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use log::{debug, info};
use parampool::{
    Pool, PoolError, cli, serialize,
    traverse::{self, MissingKeyPolicy},
};

mod config;
mod render;

use config::{Format, ImportSpec, ToolConfig};

/// Resolve, inspect and export parameter pools.
#[derive(Parser, Debug)]
#[command(name = "poolctl", version, about)]
struct Cli {
    /// Tool config file [default: .parampool.toml]
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Import a JSON Schema document, mounted at MOUNT or the file stem
    #[arg(long = "schema", global = true, value_name = "[MOUNT=]FILE")]
    schemas: Vec<ImportSpec>,

    /// Import a plain JSON or TOML description, mounted at MOUNT or the file stem
    #[arg(long = "describe", global = true, value_name = "[MOUNT=]FILE")]
    descriptions: Vec<ImportSpec>,

    /// Merge command-line imports into existing parameters
    #[arg(long, global = true)]
    merge: bool,

    /// Pool-state file loaded before the override flags
    #[arg(long, global = true, value_name = "FILE")]
    poolfile: Option<PathBuf>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved pool as an outline
    Show {
        /// Override flags, e.g. `-- --Nx 40`
        #[arg(last = true)]
        overrides: Vec<String>,
    },
    /// Write the resolved pool as a pool-state file
    Dump {
        /// Output file [default: stdout]
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(last = true)]
        overrides: Vec<String>,
    },
    /// Print the resolved values as nested JSON
    Export {
        /// Update the values of an existing JSON document by key name instead
        #[arg(long, value_name = "FILE")]
        into: Option<PathBuf>,
        /// Output file [default: stdout, or the --into file]
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(last = true)]
        overrides: Vec<String>,
    },
    /// Print the override flags the pool accepts
    Flags,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Config file settings, extended by the global command-line options.
fn tool_config(cli: &Cli) -> Result<ToolConfig> {
    let mut config = ToolConfig::discover(cli.config.as_deref())?;
    let schemas = cli.schemas.iter().cloned().map(|spec| ImportSpec {
        format: Format::Schema,
        merge: cli.merge,
        ..spec
    });
    let descriptions = cli.descriptions.iter().cloned().map(|spec| ImportSpec {
        format: Format::for_description(&spec.file),
        merge: cli.merge,
        ..spec
    });
    config.imports.extend(schemas.chain(descriptions));
    if let Some(poolfile) = &cli.poolfile {
        config.poolfile = Some(poolfile.clone());
    }
    Ok(config)
}

/// Build the pool and apply the pool file and the override flags.
fn resolve(config: &ToolConfig, overrides: &[String]) -> Result<Pool> {
    let mut pool = config.build_pool()?;
    debug!("pool has {} parameters", pool.len());
    if let Some(poolfile) = &config.poolfile {
        serialize::set_defaults_from_file(&mut pool, poolfile)?;
    }
    cli::set_values_from_command_line(&mut pool, overrides)?;
    Ok(pool)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn export_into(
    pool: &Pool,
    into: &Path,
    output: Option<&Path>,
    policy: MissingKeyPolicy,
) -> Result<()> {
    let text =
        fs::read_to_string(into).with_context(|| format!("failed to read {}", into.display()))?;
    let mut document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", into.display()))?;
    let report = traverse::export(pool, &mut document, policy);
    info!(
        "{} values exported into {}, {} without counterpart",
        report.matched.len(),
        into.display(),
        report.unmatched.len()
    );
    let text = serde_json::to_string_pretty(&document)? + "\n";
    write_output(Some(output.unwrap_or(into)), &text)
}

fn run(cli: Cli) -> Result<()> {
    let config = tool_config(&cli)?;
    match &cli.command {
        Command::Show { overrides } => {
            let pool = resolve(&config, overrides)?;
            print!("{}", render::outline(&pool));
        }
        Command::Dump { output, overrides } => {
            let pool = resolve(&config, overrides)?;
            write_output(output.as_deref(), &serialize::render_pool_file(&pool))?;
        }
        Command::Export {
            into,
            output,
            overrides,
        } => {
            let pool = resolve(&config, overrides)?;
            match into {
                Some(into) => export_into(&pool, into, output.as_deref(), config.missing_keys)?,
                None => {
                    let text = serde_json::to_string_pretty(&traverse::to_json(&pool))? + "\n";
                    write_output(output.as_deref(), &text)?;
                }
            }
        }
        Command::Flags => {
            let pool = config.build_pool()?;
            let help = cli::pool_command(&pool, "poolctl show --")?.render_long_help();
            print!("{help}");
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(PoolError::CommandLine(usage)) = err.downcast_ref::<PoolError>() {
                usage.exit();
            }
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_trailing_overrides() {
        let cli = Cli::try_parse_from([
            "poolctl",
            "--schema",
            "dolfin=schema.json",
            "dump",
            "-o",
            "out.pool",
            "--",
            "--Nx",
            "40",
        ])
        .unwrap();
        assert_eq!(cli.schemas[0].mount(), "dolfin");
        match cli.command {
            Command::Dump { output, overrides } => {
                assert_eq!(output, Some(PathBuf::from("out.pool")));
                assert_eq!(overrides, ["--Nx", "40"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mesh.json"),
            r#"{"Nx": 10, "Ny": 10, "title": "demo"}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("dolfin.json"),
            r#"{
                "type": "object",
                "properties": {
                    "linear_solver": {"type": "string", "enum": ["lu", "gmres"], "default": "lu"}
                }
            }"#,
        )
        .unwrap();
        dir
    }

    fn parse(dir: &Path, args: &[&str]) -> Cli {
        let mesh = format!("Main menu={}", dir.join("mesh.json").display());
        let dolfin = dir.join("dolfin.json").display().to_string();
        let mut argv = vec!["poolctl", "--describe", mesh.as_str(), "--schema", dolfin.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_resolve_with_overrides() {
        let dir = workspace();
        let cli = parse(dir.path(), &["show"]);
        let config = tool_config(&cli).unwrap();
        let pool = resolve(
            &config,
            &["--Nx".into(), "40".into(), "--dolfin/linear_solver".into(), "gmres".into()],
        )
        .unwrap();
        assert_eq!(pool.get("Main menu/Nx").unwrap().as_int(), Some(40));
        assert_eq!(pool.get("dolfin/linear_solver").unwrap().as_str(), Some("gmres"));

        let err = resolve(&config, &["--Nz".into(), "5".into()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PoolError>(),
            Some(PoolError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn test_dump_then_poolfile() {
        let dir = workspace();
        let state = dir.path().join("state.pool");
        let state_arg = state.display().to_string();
        let cli = parse(dir.path(), &["dump", "-o", state_arg.as_str(), "--", "--Ny", "33"]);
        run(cli).unwrap();

        let cli = parse(dir.path(), &["--poolfile", state_arg.as_str(), "show"]);
        let config = tool_config(&cli).unwrap();
        let pool = resolve(&config, &[]).unwrap();
        assert_eq!(pool.get("Main menu/Ny").unwrap().as_int(), Some(33));

        let pool = resolve(&config, &["--Ny".into(), "1".into()]).unwrap();
        assert_eq!(pool.get("Main menu/Ny").unwrap().as_int(), Some(1));
    }

    #[test]
    fn test_export_into_document() {
        let dir = workspace();
        let target = dir.path().join("solver.json");
        fs::write(&target, r#"{"solver": {"linear_solver": "cg", "restart": 30}}"#).unwrap();

        let target_arg = target.display().to_string();
        let cli = parse(
            dir.path(),
            &["export", "--into", target_arg.as_str(), "--", "--linear_solver", "gmres"],
        );
        run(cli).unwrap();

        let updated: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(
            updated,
            serde_json::json!({"solver": {"linear_solver": "gmres", "restart": 30}})
        );
    }
}
