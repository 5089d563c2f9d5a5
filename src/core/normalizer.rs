use crate::utils::error::{CopilotError, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};

const PAGE_BREAK: char = '\x0c';

/// Cleans raw extracted document text.
///
/// Pages are separated by form feeds. Within a page each line has control
/// characters, leading bullet glyphs and whitespace runs removed; page-number
/// lines and running headers/footers repeated across pages are dropped.
/// Blank-line runs collapse into a single paragraph break.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    repeated_line_threshold: usize,
    bullet_prefix: Regex,
    page_number: Regex,
}

impl TextNormalizer {
    pub fn new(repeated_line_threshold: usize) -> Result<Self> {
        Ok(Self {
            repeated_line_threshold: repeated_line_threshold.max(2),
            bullet_prefix: Regex::new(r"^(?:[•▪◦●■·‣∙○►➢✓]\s*|[-*–]\s+)+")?,
            // Up to three digits so that year and month/year lines survive.
            page_number: Regex::new(r"(?i)^(?:page\s+)?\d{1,3}(?:\s*(?:of|/)\s*\d{1,3})?$")?,
        })
    }

    pub fn normalize(&self, raw: &str) -> Result<String> {
        let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

        let pages: Vec<Vec<String>> = unified
            .split(PAGE_BREAK)
            .map(|page| page.split('\n').map(|line| self.clean_line(line)).collect())
            .collect();

        let repeated = self.repeated_lines(&pages);
        if !repeated.is_empty() {
            tracing::debug!("Dropping {} repeated header/footer lines", repeated.len());
        }

        let mut lines: Vec<&str> = Vec::new();
        let mut pending_break = false;
        for line in pages.iter().flatten() {
            if line.is_empty() {
                pending_break = !lines.is_empty();
                continue;
            }
            if self.page_number.is_match(line) || repeated.contains(line.as_str()) {
                continue;
            }
            if pending_break {
                lines.push("");
                pending_break = false;
            }
            lines.push(line);
        }

        let normalized = lines.join("\n");
        if normalized.is_empty() {
            return Err(CopilotError::EmptyInputError);
        }
        Ok(normalized)
    }

    fn clean_line(&self, line: &str) -> String {
        let without_controls: String = line
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let collapsed = without_controls.split_whitespace().collect::<Vec<_>>().join(" ");
        let stripped = self.bullet_prefix.replace(&collapsed, "");
        stripped.trim().to_string()
    }

    /// Lines present on at least `repeated_line_threshold` distinct pages.
    fn repeated_lines<'a>(&self, pages: &'a [Vec<String>]) -> HashSet<&'a str> {
        if pages.len() < self.repeated_line_threshold {
            return HashSet::new();
        }

        let mut page_counts: HashMap<&str, usize> = HashMap::new();
        for page in pages {
            let distinct: HashSet<&str> = page
                .iter()
                .map(String::as_str)
                .filter(|line| !line.is_empty())
                .collect();
            for line in distinct {
                *page_counts.entry(line).or_insert(0) += 1;
            }
        }

        page_counts
            .into_iter()
            .filter(|(_, count)| *count >= self.repeated_line_threshold)
            .map(|(line, _)| line)
            .collect()
    }
}
