//! Command-line flag surface of a pool.
//!
//! Every leaf becomes a `--<path>` flag taking one value, with whitespace
//! in the path replaced by `_`. Trailing parts of a path, down to the bare
//! leaf name, work as aliases when no other leaf shares them. `--poolfile
//! <path>` loads a pool-state file before the flags are applied.

use std::{collections::HashMap, ffi::OsString, path::PathBuf};

use clap::{
    Arg, ArgAction, Command,
    error::{ContextKind, ContextValue, ErrorKind},
};

use crate::{
    data::{item::Item, pool::{Pool, flag_name}},
    error::{Origin, PoolError, Result},
    resolve::{Assignment, Source, apply_source, resolve_name},
    serialize::set_defaults_from_file,
};

/// Flag naming a pool-state file to load first.
pub const POOLFILE_FLAG: &str = "poolfile";

const POOLFILE_ID: &str = "\0poolfile";

/// Parsed command line, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    /// Value of `--poolfile`.
    pub poolfile: Option<PathBuf>,
    /// Parameter flags in traversal order.
    pub overrides: Source,
}

fn flag_help(item: &Item) -> String {
    let mut help = item.help.clone().unwrap_or_default();
    if let Some(unit) = &item.unit {
        help.push_str(&format!(" [{unit}]"));
    }
    if !help.is_empty() {
        help.push(' ');
    }
    help.push_str(&format!("(default: {}, type: {})", item.default(), item.kind()));
    help
}

/// Proper trailing parts of `flag`, longest first: `a/b/c` gives `b/c`, `c`.
fn suffixes(flag: &str) -> impl Iterator<Item = &str> {
    flag.match_indices('/').map(move |(idx, _)| &flag[idx + 1..])
}

/// Fail when two leaves are spelled the same once whitespace became `_`.
fn check_flags(paths: &[String], flags: &[String]) -> Result<()> {
    let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
    for (path, flag) in paths.iter().zip(flags) {
        owners.entry(flag).or_default().push(path);
    }
    for flag in flags {
        if let Some(paths) = owners.get(flag.as_str())
            && paths.len() > 1
        {
            return Err(PoolError::FlagCollision {
                flag: flag.clone(),
                paths: paths.iter().map(|p| p.to_string()).collect(),
            });
        }
    }
    Ok(())
}

/// Build the clap command for `pool`.
///
/// The returned command can also render help listing every parameter.
/// Fails with [`PoolError::FlagCollision`] when two leaves differ only in
/// whitespace versus `_`.
pub fn pool_command(pool: &Pool, name: &str) -> Result<Command> {
    let flags: Vec<String> = pool.leaf_paths().iter().map(|p| flag_name(p)).collect();
    check_flags(pool.leaf_paths(), &flags)?;

    let mut suffix_count: HashMap<&str, usize> = HashMap::new();
    for flag in &flags {
        for suffix in suffixes(flag) {
            *suffix_count.entry(suffix).or_default() += 1;
        }
    }
    let reserved = |s: &str| s == POOLFILE_FLAG || s == "help" || flags.iter().any(|f| f == s);
    let has_help_leaf = flags.iter().any(|f| f == "help");
    let has_poolfile_leaf = flags.iter().any(|f| f == POOLFILE_FLAG);

    let mut command = Command::new(name.to_string())
        .no_binary_name(true)
        .args_override_self(true)
        .disable_help_flag(has_help_leaf);

    if !has_poolfile_leaf {
        command = command.arg(
            Arg::new(POOLFILE_ID)
                .long(POOLFILE_FLAG)
                .value_name("FILE")
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(PathBuf))
                .help("Load a saved pool-state file before applying the flags"),
        );
    }

    for (path, flag) in pool.leaf_paths().iter().zip(&flags) {
        let Ok(item) = pool.item(path) else {
            continue;
        };
        let aliases: Vec<String> = suffixes(flag)
            .filter(|s| suffix_count.get(s) == Some(&1) && !reserved(s))
            .map(str::to_string)
            .collect();

        let mut arg = Arg::new(path.clone())
            .long(flag.clone())
            .value_name(item.kind().tag().as_str().to_uppercase())
            .action(ArgAction::Set)
            .allow_hyphen_values(true)
            .value_parser(clap::value_parser!(String))
            .help(flag_help(item));
        if let Some((short, hidden)) = aliases.split_last() {
            arg = arg.visible_alias(short.clone()).aliases(hidden.to_vec());
        }
        command = command.arg(arg);
    }
    Ok(command)
}

fn command_line_error(pool: &Pool, err: clap::Error) -> PoolError {
    if err.kind() == ErrorKind::UnknownArgument
        && let Some(ContextValue::String(arg)) = err.get(ContextKind::InvalidArg)
    {
        let name = arg.trim_start_matches('-');
        let name = name.split('=').next().unwrap_or(name);
        return match resolve_name(pool, name, &Origin::CommandLine) {
            Err(ambiguous @ PoolError::AmbiguousParameter { .. }) => ambiguous,
            _ => PoolError::UnknownParameter {
                name: name.to_string(),
                origin: Origin::CommandLine,
            },
        };
    }
    PoolError::CommandLine(err)
}

/// Parse `args` (without the program name) against the flags of `pool`.
pub fn parse_command_line<I, T>(pool: &Pool, args: I) -> Result<CommandLine>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = pool_command(pool, "pool")?
        .try_get_matches_from(args)
        .map_err(|e| command_line_error(pool, e))?;

    let poolfile = matches
        .try_get_one::<PathBuf>(POOLFILE_ID)
        .ok()
        .flatten()
        .cloned();
    let mut overrides = Source::new(Origin::CommandLine);
    for path in pool.leaf_paths() {
        if let Ok(Some(raw)) = matches.try_get_one::<String>(path) {
            overrides.push(Assignment::new(path.clone(), raw.clone()));
        }
    }
    Ok(CommandLine {
        poolfile,
        overrides,
    })
}

/// Apply `--poolfile` and then the parameter flags in `args`.
///
/// The file and the flags are two separate atomic sources: a bad flag
/// leaves the already loaded file in place.
pub fn set_values_from_command_line<I, T>(pool: &mut Pool, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let command_line = parse_command_line(pool, args)?;
    if let Some(file) = &command_line.poolfile {
        set_defaults_from_file(pool, file)?;
    }
    apply_source(pool, &command_line.overrides)?;
    Ok(())
}
