// src/config.rs

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
};
use tracing::error;

use crate::error::{LintError, LintResult};
use crate::transform::TransformOptions;

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("valid regex"));

/// Run-wide settings, threaded explicitly into logging, scheduling and the
/// transform pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub ignore: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub workers: usize,
    pub max_child_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".to_string(),
            ignore: None,
            target: None,
            output: None,
            workers: 10,
            max_child_depth: TransformOptions::default().max_child_depth,
        }
    }
}

impl Config {
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            max_child_depth: self.max_child_depth,
        }
    }

    /// Load the ignore and target lists. A list that cannot be read is
    /// reported and treated as empty.
    pub fn figure_filter(&self) -> FigureFilter {
        let load = |kind: &str, path: &Option<PathBuf>| match path {
            Some(path) => read_figure_list(path).unwrap_or_else(|e| {
                error!("{kind} file not found: {e}");
                HashSet::new()
            }),
            None => HashSet::new(),
        };
        FigureFilter {
            ignore: load("Ignore", &self.ignore),
            target: load("Target", &self.target),
        }
    }
}

/// Figure numbers to skip, or to keep exclusively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FigureFilter {
    pub ignore: HashSet<u32>,
    pub target: HashSet<u32>,
}

impl FigureFilter {
    /// With a non-empty target list only targets pass; otherwise anything
    /// not ignored does.
    pub fn keeps(&self, figure: u32) -> bool {
        if self.target.is_empty() {
            !self.ignore.contains(&figure)
        } else {
            self.target.contains(&figure)
        }
    }
}

/// One figure number per line; blank lines are allowed.
pub fn read_figure_list(path: &Path) -> LintResult<HashSet<u32>> {
    let text = fs::read_to_string(path).map_err(|source| LintError::MissingResource {
        path: path.to_path_buf(),
        source,
    })?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<u32>().map_err(|_| LintError::InvalidFigureList {
                path: path.to_path_buf(),
                line: line.to_string(),
            })
        })
        .collect()
}

/// Expand `$VAR`, `${VAR}` and a leading `~`, then make the path absolute.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = ENV_VAR.replace_all(raw, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });

    let path = match expanded.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match env::var("HOME") {
            Ok(home) => PathBuf::from(format!("{home}{rest}")),
            Err(_) => PathBuf::from(&*expanded),
        },
        _ => PathBuf::from(&*expanded),
    };

    if path.is_absolute() {
        path
    } else {
        env::current_dir().map(|cwd| cwd.join(&path)).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn figure_list_parses_lines() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "12\n\n 40 \n7")?;
        let figures = read_figure_list(file.path())?;
        assert_eq!(figures, HashSet::from([7, 12, 40]));
        Ok(())
    }

    #[test]
    fn figure_list_rejects_garbage() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "12\nfigure 13")?;
        let err = read_figure_list(file.path()).expect_err("bad line");
        assert!(matches!(err, LintError::InvalidFigureList { .. }));
        Ok(())
    }

    #[test]
    fn missing_lists_are_empty() {
        let config = Config {
            ignore: Some(PathBuf::from("/nonexistent/ignore.txt")),
            ..Config::default()
        };
        assert_eq!(config.figure_filter(), FigureFilter::default());
    }

    #[test]
    fn target_overrides_ignore() {
        let filter = FigureFilter {
            ignore: HashSet::from([1, 2]),
            target: HashSet::from([2, 3]),
        };
        assert!(filter.keeps(2));
        assert!(filter.keeps(3));
        assert!(!filter.keeps(4));

        let filter = FigureFilter {
            ignore: HashSet::from([1]),
            target: HashSet::new(),
        };
        assert!(!filter.keeps(1));
        assert!(filter.keeps(5));
    }

    #[test]
    fn paths_are_expanded() {
        let home = env::var("HOME").unwrap_or_default();
        if !home.is_empty() {
            assert_eq!(expand_path("~/spec.pdf"), PathBuf::from(format!("{home}/spec.pdf")));
            assert_eq!(expand_path("$HOME/spec.pdf"), PathBuf::from(format!("{home}/spec.pdf")));
        }
        assert!(expand_path("relative.pdf").is_absolute());
    }

    #[test]
    fn config_from_yaml_uses_defaults() -> Result<()> {
        let config: Config = serde_yaml::from_str("log_level: debug\nworkers: 2\n")?;
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.workers, 2);
        assert_eq!(config.max_child_depth, 4);
        assert!(config.output.is_none());
        Ok(())
    }
}
