//! Document-level driver: per-page parsing fanned out over a worker pool,
//! then the sequential transform and grouping stages.

pub mod captions;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use std::{fs, path::Path, time::Instant};
use tracing::{debug, error, info, instrument};

use crate::config::{Config, FigureFilter};
use crate::error::{LintError, LintResult};
use crate::group::{self, Groups, Pages};
use crate::output;
use crate::parse::{parse_page, PageTables, RawGrid};

/// Output of the external table extractor for a whole document.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionDump {
    /// Page height in the extractor's coordinate system.
    pub page_height: f64,
    pub pages: Vec<ExtractedPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedPage {
    pub number: u32,
    /// Page height in the caption coordinate system.
    pub height: f64,
    #[serde(default)]
    pub captions: Vec<Caption>,
    #[serde(default)]
    pub tables: Vec<ExtractedTable>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Caption {
    pub text: String,
    pub top: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedTable {
    pub top: f64,
    pub cells: RawGrid,
}

/// Read an extraction dump. This is the one failure that ends a run.
pub fn load_dump(path: &Path) -> LintResult<ExtractionDump> {
    let text = fs::read_to_string(path).map_err(|source| LintError::MissingResource {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Attach captions to a page's tables and parse them.
#[instrument(level = "debug", skip_all, fields(page = page.number))]
pub fn parse_extracted_page(
    page: &ExtractedPage,
    captions: &[String],
    page_height: f64,
) -> LintResult<PageTables> {
    if page_height <= 0.0 || page.height <= 0.0 {
        return Err(LintError::InvalidPage {
            page: page.number,
            reason: "no usable page height".to_string(),
        });
    }

    let mut tables: IndexMap<String, RawGrid> = IndexMap::new();
    for table in &page.tables {
        match captions::match_caption(table.top, page_height, &page.captions, captions, page.height)
        {
            Some(caption) if caption != captions::SKIP => {
                tables.insert(caption.to_string(), table.cells.clone());
            }
            Some(_) => {}
            None => debug!("table without any caption on page {}", page.number),
        }
    }

    Ok(parse_page(page.number, &tables))
}

/// Parse every page in parallel. A page that fails is logged and left empty.
pub fn parse_pages(dump: &ExtractionDump, filter: &FigureFilter, workers: usize) -> Result<Pages> {
    // Figure numbering runs across pages, so captions are filtered in order
    // before the pages are handed out.
    let mut current = captions::FIRST_FIGURE;
    let work: Vec<(&ExtractedPage, Vec<String>)> = dump
        .pages
        .iter()
        .filter_map(|page| {
            captions::filter_captions(page, &mut current, filter).map(|texts| (page, texts))
        })
        .collect();
    info!("{} pages with wanted figures", work.len());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("building page worker pool")?;

    let pages = pool.install(|| {
        work.par_iter()
            .map(|(page, texts)| {
                let tables = parse_extracted_page(page, texts, dump.page_height)
                    .unwrap_or_else(|e| {
                        error!("Error on page {}: {}", page.number, e);
                        PageTables::new()
                    });
                (page.number, tables)
            })
            .collect::<Vec<_>>()
    });

    let mut out = Pages::new();
    for (number, tables) in pages {
        if !tables.is_empty() {
            out.insert(number, tables);
        }
    }
    Ok(out)
}

/// Lint one extraction dump end to end, writing YAML if configured.
pub fn run(config: &Config, dump_path: &Path) -> Result<Groups> {
    let start = Instant::now();
    let dump = load_dump(dump_path)
        .with_context(|| format!("loading extraction dump {}", dump_path.display()))?;
    info!("loaded {} pages from {}", dump.pages.len(), dump_path.display());

    let filter = config.figure_filter();
    let pages = parse_pages(&dump, &filter, config.workers)?;
    let groups = group::process(pages, config.transform_options());

    if let Some(path) = &config.output {
        output::write_yaml(path, &groups)?;
        info!("wrote {} groups to {}", groups.len(), path.display());
    }

    info!("completed in {:?}", start.elapsed());
    Ok(groups)
}
