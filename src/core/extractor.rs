use crate::core::vocabulary::{phrase_key, SkillVocabulary};
use crate::domain::model::{DocumentSection, Entity, EntityKind, SectionLabel};
use crate::utils::error::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

const TITLE_ORG_SEPARATORS: [&str; 7] = [" at ", " @ ", " | ", " — ", " – ", " - ", ", "];
const CONNECTOR_WORDS: [&str; 10] = ["of", "and", "at", "for", "the", "in", "&", "to", "on", "de"];
const MAX_PHRASE_WORDS: usize = 6;

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    start: usize,
}

impl Token<'_> {
    fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Pulls typed entities out of a single section.
///
/// Skills come from the vocabulary (exact, then fuzzy), dates and degrees from
/// patterns, titles and organizations from the block layout of Experience
/// sections. Output is ordered by offset and free of duplicates.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    vocabulary: Arc<SkillVocabulary>,
    fuzzy_min_token_chars: usize,
    max_edit_distance: usize,
    token: Regex,
    month_year: Regex,
    numeric_month_year: Regex,
    iso_month: Regex,
    open_ended: Regex,
    year: Regex,
    degree_words: Regex,
    degree_abbreviations: Regex,
}

impl EntityExtractor {
    pub fn new(
        vocabulary: Arc<SkillVocabulary>,
        fuzzy_min_token_chars: usize,
        max_edit_distance: usize,
    ) -> Result<Self> {
        Ok(Self {
            vocabulary,
            fuzzy_min_token_chars,
            max_edit_distance,
            token: Regex::new(r"[\p{L}\p{N}.][\p{L}\p{N}+#./&\-]*")?,
            month_year: Regex::new(
                r"(?i)\b(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?,?\s+((?:19|20)\d{2})\b",
            )?,
            numeric_month_year: Regex::new(r"\b(\d{1,2})/((?:19|20)\d{2})\b")?,
            iso_month: Regex::new(r"\b((?:19|20)\d{2})-(\d{2})\b")?,
            open_ended: Regex::new(r"(?i)[-–—]\s*(present|current|now)\b")?,
            year: Regex::new(r"\b(19[5-9]\d|20\d{2})\b")?,
            degree_words: Regex::new(
                r"(?i)\b(bachelor(?:'s|’s|s)?|master(?:'s|’s)|masters?\s+(?:degree|of|in)|doctorate|doctoral|ph\.?\s?d|mba|associate(?:'s|’s)?\s+degree)\b",
            )?,
            degree_abbreviations: Regex::new(
                r"\b(B\.S\.|B\.A\.|M\.S\.|M\.A\.|B\.Sc\.?|M\.Sc\.?|B\.Eng\.?|M\.Eng\.?|BSc\b|MSc\b|BEng\b|MEng\b|BS\b|BA\b|MS\b|MA\b)",
            )?,
        })
    }

    pub fn vocabulary(&self) -> &SkillVocabulary {
        &self.vocabulary
    }

    pub fn extract(&self, section: &DocumentSection, section_index: usize) -> Vec<Entity> {
        let mut entities = Vec::new();
        let mut push = |kind: EntityKind, surface: &str, normalized: String, local_offset: usize| {
            entities.push(Entity {
                kind,
                surface_form: surface.to_string(),
                normalized_form: normalized,
                source_section: section_index,
                offset: section.start_offset + local_offset,
            });
        };

        let fuzzy = section.label == SectionLabel::Skills;
        for (surface, canonical, start) in self.find_skills(&section.text, fuzzy) {
            push(EntityKind::Skill, surface, canonical, start);
        }
        for (surface, normalized, start) in self.find_dates(&section.text) {
            push(EntityKind::Date, surface, normalized, start);
        }
        for (surface, normalized, start) in self.find_degrees(&section.text, section.label) {
            push(EntityKind::Degree, surface, normalized, start);
        }
        if section.label == SectionLabel::Experience {
            for (kind, surface, start) in self.find_titles_and_organizations(&section.text) {
                push(kind, surface, phrase_key(surface), start);
            }
        }

        entities.sort_by(|a, b| a.offset.cmp(&b.offset).then(a.kind.cmp(&b.kind)));
        let mut seen = HashSet::new();
        entities.retain(|e| seen.insert((e.kind, e.normalized_form.clone(), e.offset)));

        tracing::debug!(
            "Extracted {} entities from {:?} section {}",
            entities.len(),
            section.label,
            section_index
        );
        entities
    }

    fn tokenize<'a>(&self, text: &'a str) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        for m in self.token.find_iter(text) {
            let raw = m.as_str().trim_end_matches(['.', '/', '-', '&']);
            if raw.is_empty() {
                continue;
            }
            let mut token = Token {
                text: raw,
                start: m.start(),
            };

            if token.text.starts_with('.') && !self.is_known(token.text) {
                let trimmed = token.text.trim_start_matches('.');
                token = Token {
                    start: token.start + (token.text.len() - trimmed.len()),
                    text: trimmed,
                };
                if token.text.is_empty() {
                    continue;
                }
            }

            if token.text.contains('/') && !self.is_known(token.text) {
                let mut offset = token.start;
                for part in token.text.split('/') {
                    if !part.is_empty() {
                        tokens.push(Token {
                            text: part,
                            start: offset,
                        });
                    }
                    offset += part.len() + 1;
                }
            } else {
                tokens.push(token);
            }
        }
        tokens
    }

    fn is_known(&self, surface: &str) -> bool {
        self.vocabulary.lookup_exact_case(surface).is_some()
            || self.vocabulary.lookup_phrase(&surface.to_lowercase()).is_some()
    }

    /// Longest n-gram first; fuzzy lookup only for single unmatched tokens,
    /// and only when `fuzzy` is set.
    fn find_skills<'a>(&self, text: &'a str, fuzzy: bool) -> Vec<(&'a str, String, usize)> {
        let tokens = self.tokenize(text);
        let mut found = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let max_n = self.vocabulary.max_phrase_words().min(tokens.len() - i);
            let mut consumed = 0;

            for n in (1..=max_n).rev() {
                let window = &tokens[i..i + n];
                let key = window
                    .iter()
                    .map(|t| t.text.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(" ");
                let canonical = if n == 1 {
                    self.vocabulary
                        .lookup_exact_case(window[0].text)
                        .or_else(|| self.vocabulary.lookup_phrase(&key))
                } else {
                    self.vocabulary.lookup_phrase(&key)
                };

                if let Some(canonical) = canonical {
                    let start = window[0].start;
                    let end = window[n - 1].end();
                    found.push((&text[start..end], canonical.to_string(), start));
                    consumed = n;
                    break;
                }
            }

            if consumed == 0 {
                let token = tokens[i];
                let canonical = if fuzzy {
                    self.fuzzy_lookup(token.text)
                } else {
                    None
                };
                if let Some(canonical) = canonical {
                    tracing::debug!("Fuzzy skill match '{}' -> '{}'", token.text, canonical);
                    found.push((token.text, canonical, token.start));
                }
                consumed = 1;
            }
            i += consumed;
        }
        found
    }

    fn fuzzy_lookup(&self, surface: &str) -> Option<String> {
        if surface.chars().count() < self.fuzzy_min_token_chars || self.max_edit_distance == 0 {
            return None;
        }
        let key = surface.to_lowercase();
        if self.vocabulary.is_stopword(&key) {
            return None;
        }

        self.vocabulary
            .fuzzy_terms()
            .filter(|(term, _)| term.chars().count() >= self.fuzzy_min_token_chars)
            .map(|(term, canonical)| (strsim::levenshtein(&key, term), canonical))
            .filter(|(distance, _)| *distance <= self.max_edit_distance)
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)))
            .map(|(_, canonical)| canonical.to_string())
    }

    fn find_dates<'a>(&self, text: &'a str) -> Vec<(&'a str, String, usize)> {
        let mut taken: Vec<(usize, usize)> = Vec::new();
        let mut found = Vec::new();
        let overlaps = |taken: &[(usize, usize)], start: usize, end: usize| {
            taken.iter().any(|&(s, e)| start < e && s < end)
        };

        for caps in self.month_year.captures_iter(text) {
            let whole = &caps[0];
            let Some(m) = caps.get(0) else { continue };
            taken.push((m.start(), m.end()));
            let month: String = caps[1].chars().take(3).collect();
            let candidate = format!("1 {} {}", month, &caps[2]);
            if let Ok(date) = NaiveDate::parse_from_str(&candidate, "%d %b %Y") {
                found.push((
                    &text[m.start()..m.end()],
                    date.format("%Y-%m").to_string(),
                    m.start(),
                ));
            } else {
                tracing::debug!("Ignoring unparsable date '{}'", whole);
            }
        }

        for caps in self.numeric_month_year.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            if overlaps(&taken, m.start(), m.end()) {
                continue;
            }
            taken.push((m.start(), m.end()));
            if let Some(date) = numeric_date(&caps[2], &caps[1]) {
                found.push((m.as_str(), date, m.start()));
            }
        }

        for caps in self.iso_month.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            if overlaps(&taken, m.start(), m.end()) {
                continue;
            }
            taken.push((m.start(), m.end()));
            if let Some(date) = numeric_date(&caps[1], &caps[2]) {
                found.push((m.as_str(), date, m.start()));
            }
        }

        for caps in self.open_ended.captures_iter(text) {
            let Some(word) = caps.get(1) else { continue };
            if overlaps(&taken, word.start(), word.end()) {
                continue;
            }
            taken.push((word.start(), word.end()));
            found.push((word.as_str(), "present".to_string(), word.start()));
        }

        for m in self.year.find_iter(text) {
            if overlaps(&taken, m.start(), m.end()) {
                continue;
            }
            found.push((m.as_str(), m.as_str().to_string(), m.start()));
        }

        found
    }

    fn find_degrees<'a>(
        &self,
        text: &'a str,
        label: SectionLabel,
    ) -> Vec<(&'a str, String, usize)> {
        let mut found: Vec<(&'a str, String, usize)> = self
            .degree_words
            .find_iter(text)
            .filter_map(|m| degree_from_word(m.as_str()).map(|d| (m.as_str(), d, m.start())))
            .collect();

        if label == SectionLabel::Education {
            for m in self.degree_abbreviations.find_iter(text) {
                let normalized = if m.as_str().starts_with('B') {
                    "bachelor"
                } else {
                    "master"
                };
                found.push((m.as_str(), normalized.to_string(), m.start()));
            }
        }
        found
    }

    fn strip_dates(&self, line: &str) -> String {
        let mut stripped = line.to_string();
        for pattern in [
            &self.month_year,
            &self.numeric_month_year,
            &self.iso_month,
            &self.open_ended,
            &self.year,
        ] {
            stripped = pattern.replace_all(&stripped, "").into_owned();
        }
        stripped
            .trim_matches(|c: char| c.is_whitespace() || "-–—,|()".contains(c))
            .to_string()
    }

    /// Each blank-line separated block of an Experience section yields at most
    /// one title and one organization. Blocks that do not fit either layout
    /// yield nothing.
    fn find_titles_and_organizations<'a>(
        &self,
        text: &'a str,
    ) -> Vec<(EntityKind, &'a str, usize)> {
        let mut found = Vec::new();

        // The first line of an Experience section is its heading.
        let body_start = text.find('\n').map(|i| i + 1).unwrap_or(text.len());

        let mut block: Vec<(usize, &'a str)> = Vec::new();
        let mut offset = body_start;
        for line in text[body_start..].split('\n') {
            if line.trim().is_empty() {
                self.block_entities(text, &block, &mut found);
                block.clear();
            } else {
                block.push((offset, line));
            }
            offset += line.len() + 1;
        }
        self.block_entities(text, &block, &mut found);

        found
    }

    fn block_entities<'a>(
        &self,
        text: &'a str,
        block: &[(usize, &'a str)],
        found: &mut Vec<(EntityKind, &'a str, usize)>,
    ) {
        let lines: Vec<(usize, &'a str, String)> = block
            .iter()
            .map(|&(offset, line)| (offset, line, self.strip_dates(line)))
            .filter(|(_, _, stripped)| !stripped.is_empty())
            .collect();

        let Some((first_offset, first_line, first)) = lines.first() else {
            return;
        };

        if let Some((title, organization)) = split_title_organization(first) {
            found.push(locate(text, EntityKind::Title, *first_offset, *first_line, title));
            found.push(locate(
                text,
                EntityKind::Organization,
                *first_offset,
                *first_line,
                organization,
            ));
            return;
        }

        if let Some((second_offset, second_line, second)) = lines.get(1) {
            if is_capitalized_phrase(first) && is_capitalized_phrase(second) {
                found.push(locate(text, EntityKind::Title, *first_offset, *first_line, first));
                found.push(locate(
                    text,
                    EntityKind::Organization,
                    *second_offset,
                    *second_line,
                    second,
                ));
            }
        }
    }
}

/// Maps a phrase found after date stripping back to its slice of the section.
fn locate<'a>(
    text: &'a str,
    kind: EntityKind,
    line_offset: usize,
    line: &'a str,
    phrase: &str,
) -> (EntityKind, &'a str, usize) {
    match line.find(phrase) {
        Some(pos) => {
            let start = line_offset + pos;
            (kind, &text[start..start + phrase.len()], start)
        }
        None => (kind, line.trim(), line_offset),
    }
}

fn split_title_organization(line: &str) -> Option<(&str, &str)> {
    for separator in TITLE_ORG_SEPARATORS {
        let Some(idx) = line.find(separator) else {
            continue;
        };
        let title = line[..idx].trim();
        let rest = &line[idx + separator.len()..];
        let organization = TITLE_ORG_SEPARATORS
            .iter()
            .filter_map(|s| rest.find(s))
            .min()
            .map(|end| &rest[..end])
            .unwrap_or(rest)
            .trim();

        if is_capitalized_phrase(title) && is_capitalized_phrase(organization) {
            return Some((title, organization));
        }
    }
    None
}

fn is_capitalized_phrase(phrase: &str) -> bool {
    let phrase = phrase.trim();
    if phrase.is_empty() || phrase.ends_with('.') || phrase.contains(':') {
        return false;
    }
    if !phrase.chars().next().is_some_and(char::is_uppercase) {
        return false;
    }

    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.len() > MAX_PHRASE_WORDS {
        return false;
    }
    let significant: Vec<&str> = words
        .iter()
        .copied()
        .filter(|w| !CONNECTOR_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    let capitalized = significant
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase() || c.is_ascii_digit()))
        .count();
    capitalized * 2 >= significant.len()
}

fn numeric_date(year: &str, month: &str) -> Option<String> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.format("%Y-%m").to_string())
}

fn degree_from_word(word: &str) -> Option<String> {
    let lower = word.to_lowercase();
    let normalized = if lower.starts_with("bachelor") {
        "bachelor"
    } else if lower.starts_with("master") {
        "master"
    } else if lower.starts_with("doctor") || lower.starts_with("ph") {
        "phd"
    } else if lower == "mba" {
        "mba"
    } else if lower.starts_with("associate") {
        "associate"
    } else {
        return None;
    };
    Some(normalized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        let vocabulary = Arc::new(SkillVocabulary::builtin().unwrap());
        EntityExtractor::new(vocabulary, 5, 1).unwrap()
    }

    fn section(label: SectionLabel, text: &str) -> DocumentSection {
        DocumentSection {
            label,
            text: text.to_string(),
            start_offset: 100,
            end_offset: 100 + text.len(),
        }
    }

    fn normalized(entities: &[Entity], kind: EntityKind) -> Vec<String> {
        entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.normalized_form.clone())
            .collect()
    }

    #[test]
    fn test_exact_and_alias_skills() {
        let entities = extractor().extract(
            &section(SectionLabel::Skills, "Skills\nPython, JS, Google Cloud, C++ and CI/CD"),
            2,
        );
        let skills = normalized(&entities, EntityKind::Skill);
        assert_eq!(skills, vec!["python", "javascript", "gcp", "c++", "ci/cd"]);

        let gcp = entities.iter().find(|e| e.normalized_form == "gcp").unwrap();
        assert_eq!(gcp.surface_form, "Google Cloud");
        assert_eq!(gcp.source_section, 2);
        assert_eq!(gcp.offset, 100 + "Skills\nPython, JS, ".len());
    }

    #[test]
    fn test_longest_phrase_wins() {
        let entities = extractor().extract(
            &section(SectionLabel::Skills, "Google Cloud Platform and machine learning"),
            0,
        );
        let skills = normalized(&entities, EntityKind::Skill);
        assert_eq!(skills, vec!["gcp", "machine learning"]);
        assert_eq!(entities[0].surface_form, "Google Cloud Platform");
    }

    #[test]
    fn test_fuzzy_match_within_one_edit() {
        let entities =
            extractor().extract(&section(SectionLabel::Skills, "Kubernets, Terrafrom"), 0);
        let skills = normalized(&entities, EntityKind::Skill);
        assert_eq!(skills, vec!["kubernetes"]);
    }

    #[test]
    fn test_fuzzy_skips_short_tokens_and_stopwords() {
        let entities = extractor().extract(
            &section(SectionLabel::Skills, "We operate at scale and trust Rusty tools"),
            0,
        );
        assert!(normalized(&entities, EntityKind::Skill).is_empty());
    }

    #[test]
    fn test_everyday_words_are_not_fuzzy_skills() {
        let sentence = "The candidate shall spare no effort, spell out designs and tower above peers";
        for label in [SectionLabel::Summary, SectionLabel::Skills] {
            let entities = extractor().extract(&section(label, sentence), 0);
            assert!(normalized(&entities, EntityKind::Skill).is_empty(), "{:?}", label);
        }
    }

    #[test]
    fn test_fuzzy_only_inside_skills_sections() {
        let entities =
            extractor().extract(&section(SectionLabel::Experience, "Ran Kubernets clusters"), 0);
        assert!(normalized(&entities, EntityKind::Skill).is_empty());
    }

    #[test]
    fn test_case_sensitive_skills() {
        let entities = extractor().extract(
            &section(SectionLabel::Skills, "Go, R and C. Ready to go. R&D lead."),
            0,
        );
        assert_eq!(normalized(&entities, EntityKind::Skill), vec!["go", "r", "c"]);
    }

    #[test]
    fn test_slash_separated_skills() {
        let entities = extractor().extract(&section(SectionLabel::Skills, "Java/Python/SQL"), 0);
        assert_eq!(
            normalized(&entities, EntityKind::Skill),
            vec!["java", "python", "sql"]
        );
        assert_eq!(entities[1].offset, 100 + 5);
    }

    #[test]
    fn test_date_formats() {
        let entities = extractor().extract(
            &section(
                SectionLabel::Experience,
                "Experience\nJan 2019 - Present\n03/2017 - 2018-11\nSeptember 2015 to 2016\n13/2020",
            ),
            0,
        );
        let dates = normalized(&entities, EntityKind::Date);
        assert_eq!(
            dates,
            vec!["2019-01", "present", "2017-03", "2018-11", "2015-09", "2016"]
        );
    }

    #[test]
    fn test_degrees() {
        let education = extractor().extract(
            &section(
                SectionLabel::Education,
                "Education\nB.S. Computer Science\nMSc in Data\nMaster's degree, Ph.D. pending",
            ),
            0,
        );
        assert_eq!(
            normalized(&education, EntityKind::Degree),
            vec!["bachelor", "master", "master", "phd"]
        );

        let elsewhere = extractor().extract(
            &section(SectionLabel::Skills, "MS Office, Scrum Master, Bachelor's degree required"),
            0,
        );
        assert_eq!(normalized(&elsewhere, EntityKind::Degree), vec!["bachelor"]);
    }

    #[test]
    fn test_title_and_organization_on_two_lines() {
        let text = "Experience\nSenior Software Engineer\nAcme Corp\nJan 2019 - Present\nBuilt payment APIs in Rust\n\nData Analyst at Globex Inc | 2016 - 2018\nWrote SQL reports";
        let entities = extractor().extract(&section(SectionLabel::Experience, text), 0);

        let titles: Vec<_> = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Title)
            .map(|e| e.surface_form.as_str())
            .collect();
        let organizations: Vec<_> = entities
            .iter()
            .filter(|e| e.kind == EntityKind::Organization)
            .map(|e| e.surface_form.as_str())
            .collect();
        assert_eq!(titles, vec!["Senior Software Engineer", "Data Analyst"]);
        assert_eq!(organizations, vec!["Acme Corp", "Globex Inc"]);

        let globex = entities
            .iter()
            .find(|e| e.surface_form == "Globex Inc")
            .unwrap();
        assert_eq!(&text[globex.offset - 100..globex.offset - 100 + 10], "Globex Inc");
    }

    #[test]
    fn test_ambiguous_blocks_yield_no_titles() {
        let text = "Experience\nbuilt things for people\nand more things\n\nLed migration to Kubernetes";
        let entities = extractor().extract(&section(SectionLabel::Experience, text), 0);
        assert!(entities
            .iter()
            .all(|e| e.kind != EntityKind::Title && e.kind != EntityKind::Organization));
    }

    #[test]
    fn test_titles_only_in_experience_sections() {
        let text = "Skills\nSenior Engineer\nAcme Corp";
        let entities = extractor().extract(&section(SectionLabel::Skills, text), 0);
        assert!(entities.iter().all(|e| e.kind != EntityKind::Title));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let s = section(SectionLabel::Skills, "Python python PYTHON, Docker, Kubernets");
        let first = extractor().extract(&s, 0);
        let second = extractor().extract(&s, 0);
        assert_eq!(first, second);
        assert_eq!(normalized(&first, EntityKind::Skill).len(), 5);
    }
}
