use std::{env, path::PathBuf};

use anyhow::{Result, anyhow, bail};

const USAGE: &str = "usage: clarity [--config <path>]";

/// Returns the path given with `--config`, or `None` when the flag is absent.
pub fn config_path_from_args() -> Result<Option<PathBuf>> {
    parse_config_path(env::args().skip(1))
}

fn parse_config_path(args: impl IntoIterator<Item = String>) -> Result<Option<PathBuf>> {
    let mut args = args.into_iter();
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--config expects a path. {USAGE}"))?;
                config_path = Some(PathBuf::from(value));
            }
            other => match other.strip_prefix("--config=") {
                Some(value) if !value.is_empty() => config_path = Some(PathBuf::from(value)),
                _ => bail!("unexpected argument '{other}'. {USAGE}"),
            },
        }
    }

    Ok(config_path)
}
