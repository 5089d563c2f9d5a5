use crate::domain::model::{ContactInfo, DocumentSection, PostingDetails, SectionLabel};
use crate::utils::error::Result;
use regex::Regex;

const ROLE_NOUNS: [&str; 8] = [
    "engineer",
    "developer",
    "manager",
    "analyst",
    "specialist",
    "scientist",
    "designer",
    "architect",
];
const TITLE_SCAN_LINES: usize = 10;
const MAX_TITLE_CHARS: usize = 80;
const MIN_RESPONSIBILITY_CHARS: usize = 6;

/// Document-wide facts that do not belong to a single section: contact
/// details on resumes; title, seniority, employment, salary, company and
/// responsibilities on postings.
#[derive(Debug, Clone)]
pub struct DetailsExtractor {
    email: Regex,
    phone: Regex,
    linkedin: Regex,
    github: Regex,
    title_label: Regex,
    seniority: Vec<(Regex, &'static str)>,
    employment: Regex,
    salary: Regex,
    company: Vec<Regex>,
    location_label: Regex,
    city_region: Regex,
    company_size: Vec<Regex>,
    responsibilities_heading: Regex,
}

impl DetailsExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")?,
            phone: Regex::new(
                r"(?:\+\d{1,3}[-.\s]?)?(?:\(\d{3}\)|\b\d{3})[-.\s]?\d{3}[-.\s]\d{4}\b",
            )?,
            linkedin: Regex::new(r"(?i)linkedin\.com/in/[A-Za-z0-9_-]+")?,
            github: Regex::new(r"(?i)github\.com/[A-Za-z0-9_-]+")?,
            title_label: Regex::new(r"(?im)^(?:job\s+title|position|role)\s*:\s*(.+)$")?,
            seniority: vec![
                (Regex::new(r"(?i)\b(?:senior|sr)\b")?, "senior"),
                (Regex::new(r"(?i)\b(?:junior|jr)\b")?, "junior"),
                (Regex::new(r"(?i)\b(?:lead|principal|staff)\b")?, "lead"),
                (Regex::new(r"(?i)\b(?:entry[\s-]level|intern)\b")?, "entry-level"),
                (Regex::new(r"(?i)\b(?:mid[\s-]level|intermediate)\b")?, "mid-level"),
            ],
            employment: Regex::new(
                r"(?i)\b(full[\s-]time|part[\s-]time|contract|freelance|temporary|permanent|remote|hybrid|on[\s-]?site)\b",
            )?,
            salary: Regex::new(
                r"(?i)\$\s?(\d{1,3}(?:,\d{3})*(?:\.\d{2})?k?)\s*(?:-|–|to)\s*\$?\s?(\d{1,3}(?:,\d{3})*(?:\.\d{2})?k?)",
            )?,
            company: vec![
                Regex::new(r"(?im)^(?:company|employer)\s*:\s*(.+)$")?,
                Regex::new(r"\b(?:at|@)\s+([A-Z][A-Za-z&.,' ]*?\b(?:Inc|Corp|Ltd|LLC|Company))\b")?,
                Regex::new(r"(?m)^([A-Z][A-Za-z&.,' ]*?\b(?:Inc|Corp|Ltd|LLC|Company))\.?$")?,
            ],
            location_label: Regex::new(
                r"(?im)^(?:location|based\s+in|office|headquarters)\s*:?\s+(.+)$",
            )?,
            city_region: Regex::new(r"\b([A-Z][a-z]+(?:\s[A-Z][a-z]+)*,\s*[A-Z]{2})\b")?,
            company_size: vec![
                Regex::new(r"(?i)\b(\d[\d,]*\+?\s*(?:employees|people|staff))\b")?,
                Regex::new(r"(?i)\b(startup|enterprise|fortune\s+\d+)\b")?,
            ],
            responsibilities_heading: Regex::new(
                r"(?i)^(?:key\s+)?(?:responsibilities|duties|what\s+you(?:'|’)?ll\s+do)\s*:?$",
            )?,
        })
    }

    pub fn extract_contact(&self, text: &str) -> ContactInfo {
        let first = |re: &Regex| re.find(text).map(|m| m.as_str().to_string());
        ContactInfo {
            email: first(&self.email),
            phone: first(&self.phone).map(|p| p.trim().to_string()),
            linkedin: first(&self.linkedin),
            github: first(&self.github),
        }
    }

    pub fn extract_posting(&self, text: &str, sections: &[DocumentSection]) -> PostingDetails {
        let seniority = self
            .seniority
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, level)| level.to_string());

        let mut employment_types: Vec<String> = Vec::new();
        for m in self.employment.find_iter(text) {
            let normalized = m
                .as_str()
                .to_lowercase()
                .split(|c: char| c.is_whitespace() || c == '-')
                .collect::<Vec<_>>()
                .join("-")
                .replace("onsite", "on-site");
            if !employment_types.contains(&normalized) {
                employment_types.push(normalized);
            }
        }

        let salary_range = self
            .salary
            .captures(text)
            .map(|caps| format!("${} - ${}", &caps[1], &caps[2]));

        let first_capture = |patterns: &[Regex]| {
            patterns.iter().find_map(|re| {
                re.captures(text)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().trim().to_string())
            })
        };

        PostingDetails {
            job_title: self.job_title(text),
            seniority,
            employment_types,
            salary_range,
            company: first_capture(&self.company),
            location: self.location(text),
            company_size: first_capture(&self.company_size),
            responsibilities: self.responsibilities(sections),
        }
    }

    /// An explicit `Location:` line, else a `City, ST` pair near the top.
    fn location(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.location_label.captures(text) {
            return Some(caps[1].trim().to_string());
        }
        text.lines()
            .take(TITLE_SCAN_LINES)
            .find_map(|line| self.city_region.captures(line))
            .map(|caps| caps[1].to_string())
    }

    fn responsibilities(&self, sections: &[DocumentSection]) -> Vec<String> {
        sections
            .iter()
            .filter(|section| section.label == SectionLabel::Other)
            .filter(|section| {
                section
                    .text
                    .lines()
                    .next()
                    .is_some_and(|heading| self.responsibilities_heading.is_match(heading.trim()))
            })
            .flat_map(|section| section.text.lines().skip(1))
            .map(|line| line.trim().trim_end_matches(['.', ':', ';']).trim_end())
            .filter(|line| line.chars().count() >= MIN_RESPONSIBILITY_CHARS)
            .map(str::to_string)
            .collect()
    }

    fn job_title(&self, text: &str) -> Option<String> {
        if let Some(caps) = self.title_label.captures(text) {
            return Some(caps[1].trim().to_string());
        }
        text.lines()
            .take(TITLE_SCAN_LINES)
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.chars().count() <= MAX_TITLE_CHARS)
            .find(|line| {
                let lower = line.to_lowercase();
                ROLE_NOUNS.iter().any(|noun| lower.contains(noun))
            })
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segmenter::SectionSegmenter;

    #[test]
    fn test_contact_info() {
        let text = "Jane Doe\njane.doe@example.com | (555) 123-4567\nlinkedin.com/in/jane-doe github.com/janedoe\nWorked 2015 2019 2021";
        let contact = DetailsExtractor::new().unwrap().extract_contact(text);
        assert_eq!(contact.email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(contact.phone.as_deref(), Some("(555) 123-4567"));
        assert_eq!(contact.linkedin.as_deref(), Some("linkedin.com/in/jane-doe"));
        assert_eq!(contact.github.as_deref(), Some("github.com/janedoe"));
    }

    #[test]
    fn test_contact_info_absent() {
        let contact = DetailsExtractor::new()
            .unwrap()
            .extract_contact("Graduated 2015, joined in 2019");
        assert_eq!(contact, ContactInfo::default());
    }

    #[test]
    fn test_posting_details() {
        let text = "Acme Corp\nSenior Backend Engineer\nFull-time, Remote or hybrid\nSalary: $120,000 - $150,000\nRequirements:\nRust";
        let details = DetailsExtractor::new().unwrap().extract_posting(text, &[]);
        assert_eq!(details.job_title.as_deref(), Some("Senior Backend Engineer"));
        assert_eq!(details.seniority.as_deref(), Some("senior"));
        assert_eq!(details.employment_types, vec!["full-time", "remote", "hybrid"]);
        assert_eq!(details.salary_range.as_deref(), Some("$120,000 - $150,000"));
        assert_eq!(details.company.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn test_explicit_job_title_label_wins() {
        let text = "We need an engineer\nPosition: Platform Lead\nOnsite in Berlin";
        let details = DetailsExtractor::new().unwrap().extract_posting(text, &[]);
        assert_eq!(details.job_title.as_deref(), Some("Platform Lead"));
        assert_eq!(details.seniority.as_deref(), Some("lead"));
        assert_eq!(details.employment_types, vec!["on-site"]);
        assert_eq!(details.salary_range, None);
    }

    #[test]
    fn test_company_location_and_size() {
        let text = "Data Engineer\nAustin, TX\nJoin the data team at Globex Inc, a startup of 250+ employees.";
        let details = DetailsExtractor::new().unwrap().extract_posting(text, &[]);
        assert_eq!(details.company.as_deref(), Some("Globex Inc"));
        assert_eq!(details.location.as_deref(), Some("Austin, TX"));
        assert_eq!(details.company_size.as_deref(), Some("250+ employees"));
    }

    #[test]
    fn test_labeled_company_and_location_win() {
        let text = "Company: Initech\nLocation: Berlin, Germany\nBackend Developer at Umbrella Corp";
        let details = DetailsExtractor::new().unwrap().extract_posting(text, &[]);
        assert_eq!(details.company.as_deref(), Some("Initech"));
        assert_eq!(details.location.as_deref(), Some("Berlin, Germany"));
        assert_eq!(details.company_size, None);
    }

    #[test]
    fn test_responsibilities_from_their_section() {
        let text = "Backend Engineer\n\nResponsibilities:\nDesign and ship APIs.\nOwn on-call\nFix\n\nBenefits\nFree lunch";
        let sections: Vec<_> = SectionSegmenter::new(40).unwrap().segment(text).collect();
        let details = DetailsExtractor::new().unwrap().extract_posting(text, &sections);
        assert_eq!(details.responsibilities, vec!["Design and ship APIs", "Own on-call"]);
    }
}
