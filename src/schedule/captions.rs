// src/schedule/captions.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::warn;

use super::{Caption, ExtractedPage};
use crate::config::FigureFilter;

/// Sentinel caption for tables that must not be parsed.
pub const SKIP: &str = "skip";

/// Figure numbering starts here; a document opening on a later figure only
/// reports the figures after this one as missing.
pub const FIRST_FIGURE: u32 = 1;

static FIGURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Figure (?P<number>\d+): .+").expect("valid regex"));

/// Figure numbers skipped when the running number jumps from `current` to
/// `number`. Empty unless `number` is ahead by more than one.
pub fn missing_between(current: u32, number: u32) -> Range<u32> {
    current.saturating_add(1)..number
}

/// Walk a page's captions in order, tracking the running figure number.
///
/// Returns the updated figure number and the indices of captions to skip:
/// captions that are not figures, and figures the filter rejects. Gaps in
/// the numbering are reported, since they usually mean a caption was lost
/// during extraction.
pub fn check_figure_numbers(
    captions: &[String],
    mut current: u32,
    filter: &FigureFilter,
) -> (u32, Vec<usize>) {
    let mut skipped = Vec::new();

    for (i, caption) in captions.iter().enumerate() {
        let Some(number) = FIGURE
            .captures(caption)
            .and_then(|caps| caps["number"].parse::<u32>().ok())
        else {
            skipped.push(i);
            continue;
        };

        if number > current {
            for missing in missing_between(current, number) {
                warn!("Encountered a problem with the caption to Figure {missing}");
            }
            current = number;
        }

        if !filter.keeps(number) {
            skipped.push(i);
        }
    }

    (current, skipped)
}

/// Caption texts for a page with rejected ones replaced by [`SKIP`], or
/// `None` when nothing on the page is wanted.
pub fn filter_captions(
    page: &ExtractedPage,
    current: &mut u32,
    filter: &FigureFilter,
) -> Option<Vec<String>> {
    if page.captions.is_empty() {
        return None;
    }
    let mut texts: Vec<String> = page.captions.iter().map(|c| c.text.trim().to_string()).collect();
    let (next, skipped) = check_figure_numbers(&texts, *current, filter);
    *current = next;

    if skipped.len() == texts.len() {
        return None;
    }
    for i in skipped {
        texts[i] = SKIP.to_string();
    }
    Some(texts)
}

/// Pick the caption vertically closest to a table.
///
/// Caption tops are measured from the top of a page `caption_height` high;
/// `table_top` is measured from the bottom of a page `page_height` high.
/// Both are normalized to a fraction of the page before comparing. Ties go
/// to the earlier caption.
pub fn match_caption<'a>(
    table_top: f64,
    page_height: f64,
    captions: &[Caption],
    texts: &'a [String],
    caption_height: f64,
) -> Option<&'a str> {
    let table_y = table_top / page_height;
    captions
        .iter()
        .zip(texts)
        .map(|(caption, text)| ((1.0 - caption.top / caption_height - table_y).abs(), text))
        .fold(None::<(f64, &String)>, |best, (diff, text)| match best {
            Some((best_diff, _)) if best_diff <= diff => best,
            _ => Some((diff, text)),
        })
        .map(|(_, text)| text.as_str())
}
