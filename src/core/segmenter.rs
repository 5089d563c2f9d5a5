use crate::domain::model::{DocumentSection, SectionLabel};
use crate::utils::error::Result;
use regex::Regex;

const EXPERIENCE_HEADINGS: &str = r"(?i)^(?:(?:professional|work|relevant|industry)\s+)?(?:experience|employment(?:\s+history)?|work\s+history|career\s+history)$";
const EDUCATION_HEADINGS: &str = r"(?i)^(?:education(?:al)?(?:\s+background)?|academic\s+background|academics|education\s*(?:&|and)\s*(?:training|certifications?))$";
const SKILLS_HEADINGS: &str = r"(?i)^(?:(?:(?:technical|core|key|relevant)\s+)?(?:skills?|competencies|technologies|tech\s+stack|expertise)|skills?\s*(?:&|and)\s*(?:tools|technologies|expertise)|requirements?|(?:minimum|basic|preferred)?\s*qualifications?|must\s+haves?|nice\s+to\s+haves?|what\s+we(?:'|’)?re\s+looking\s+for|bonus(?:\s+points)?|preferred|pluses)$";
const SUMMARY_HEADINGS: &str = r"(?i)^(?:(?:professional|career)\s+)?(?:summary|profile|objective|overview|about\s+me)$";
const OTHER_HEADINGS: &str = r"(?i)^(?:(?:personal\s+)?projects?|certifications?|licenses?(?:\s*(?:&|and)\s*certifications?)?|awards?|honors|publications|interests|hobbies|references|languages|volunteer(?:ing|\s+experience)?|responsibilities|duties|what\s+you(?:'|’)?ll\s+do|benefits|perks|what\s+we\s+offer|about\s+us|about\s+the\s+(?:company|role|team)|company)$";

/// Splits normalized text into labeled sections using heading heuristics.
#[derive(Debug, Clone)]
pub struct SectionSegmenter {
    max_heading_chars: usize,
    patterns: Vec<(SectionLabel, Regex)>,
}

impl SectionSegmenter {
    pub fn new(max_heading_chars: usize) -> Result<Self> {
        let patterns = vec![
            (SectionLabel::Experience, Regex::new(EXPERIENCE_HEADINGS)?),
            (SectionLabel::Education, Regex::new(EDUCATION_HEADINGS)?),
            (SectionLabel::Skills, Regex::new(SKILLS_HEADINGS)?),
            (SectionLabel::Summary, Regex::new(SUMMARY_HEADINGS)?),
            (SectionLabel::Other, Regex::new(OTHER_HEADINGS)?),
        ];
        Ok(Self {
            max_heading_chars,
            patterns,
        })
    }

    /// Lazily yields sections in source order. Calling again restarts from
    /// the beginning; no state is shared between iterators.
    pub fn segment<'a>(&'a self, text: &'a str) -> Sections<'a> {
        let label = self.heading_at(text, 0).unwrap_or(SectionLabel::Summary);
        Sections {
            segmenter: self,
            text,
            start: 0,
            label,
        }
    }

    /// Heading keyword match on a single line, ignoring what follows it.
    fn candidate(&self, line: &str) -> Option<SectionLabel> {
        let heading = line.trim().trim_end_matches(':').trim_end();
        if heading.is_empty() || heading.chars().count() > self.max_heading_chars {
            return None;
        }
        self.patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(heading))
            .map(|(label, _)| *label)
    }

    /// A candidate line counts as a heading only when the next non-blank
    /// line exists and is not itself a candidate.
    fn heading_at(&self, text: &str, line_start: usize) -> Option<SectionLabel> {
        let line_end = line_end(text, line_start);
        let label = self.candidate(&text[line_start..line_end])?;

        let following = text[line_end..]
            .split('\n')
            .map(str::trim)
            .find(|line| !line.is_empty())?;

        match self.candidate(following) {
            Some(_) => None,
            None => Some(label),
        }
    }

    fn next_heading(&self, text: &str, from: usize) -> Option<(usize, SectionLabel)> {
        let mut pos = from;
        while pos < text.len() {
            let line_start = pos + 1;
            if let Some(label) = self.heading_at(text, line_start) {
                return Some((line_start, label));
            }
            pos = line_end(text, line_start);
        }
        None
    }
}

fn line_end(text: &str, line_start: usize) -> usize {
    text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len())
}

pub struct Sections<'a> {
    segmenter: &'a SectionSegmenter,
    text: &'a str,
    start: usize,
    label: SectionLabel,
}

impl Iterator for Sections<'_> {
    type Item = DocumentSection;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start >= self.text.len() {
            return None;
        }

        let first_line_end = line_end(self.text, self.start);
        let (end, next_label) = self
            .segmenter
            .next_heading(self.text, first_line_end)
            .unwrap_or((self.text.len(), SectionLabel::Summary));

        let section = DocumentSection {
            label: self.label,
            text: self.text[self.start..end].to_string(),
            start_offset: self.start,
            end_offset: end,
        };
        tracing::debug!(
            "Section {:?} at {}..{}",
            section.label,
            section.start_offset,
            section.end_offset
        );

        self.start = end;
        self.label = next_label;
        Some(section)
    }
}
