//! Local entity and pattern extraction
//!
//! A tagger proposes general entities (dates, times, amounts, organizations)
//! and a fixed set of patterns finds RFP-specific phrases. Pattern matches
//! that overlap an accepted tagger span are dropped. Every mention carries
//! the sentence it appears in.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Error, Result};
use crate::types::{EntityExtractionResult, EntityMention};

/// Sentences longer than this fall back to their line as context
const MAX_CONTEXT_CHARS: usize = 500;

/// A labeled byte span proposed by a tagger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSpan {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

impl TaggedSpan {
    fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Statistical or heuristic named-entity tagger
pub trait EntityTagger: Send + Sync {
    /// Spans over `text`, in any order. Spans may overlap.
    fn tag(&self, text: &str) -> Vec<TaggedSpan>;

    /// Name for logging
    fn name(&self) -> &str;
}

fn compile(label: &'static str, pattern: &str) -> Result<(&'static str, Regex)> {
    Regex::new(pattern)
        .map(|re| (label, re))
        .map_err(|e| Error::internal(format!("invalid {} pattern: {}", label, e)))
}

const MONTH: &str = r"(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:t(?:ember)?)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)";

const ORG_SUFFIX: &str = r"(?:Department|Agency|Administration|Office|Bureau|Commission|Authority|Council|Institute|University|Corporation|Company|Inc|LLC|Ltd|Corp|Group|Services|Center|Command|District|County|City|Board)\b\.?";

const ORG_HEAD: &str = r"(?:Department|Office|Bureau|Agency|Administration|Commission|Board|University)";

const PROPER_TAIL: &str = r"[ \t]+of[ \t]+(?:the[ \t]+)?[A-Z][\w&-]*(?:[ \t]+[A-Z][\w&-]*){0,3}";

/// Regex and capitalization based tagger for DATE, TIME, MONEY and ORG
pub struct HeuristicTagger {
    patterns: Vec<(&'static str, Regex)>,
}

impl HeuristicTagger {
    pub fn new() -> Result<Self> {
        let date = format!(
            r"\b(?:{MONTH}\.?[ \t]+(?:\d{{1,2}}(?:st|nd|rd|th)?(?:,?[ \t]+\d{{4}})?|\d{{4}})|\d{{1,2}}/\d{{1,2}}/\d{{2,4}}|\d{{4}}-\d{{2}}-\d{{2}})\b"
        );
        let org = format!(
            r"\b(?:(?:[A-Z][\w&.-]*[ \t]+){{1,5}}{ORG_SUFFIX}|{ORG_HEAD}{PROPER_TAIL})(?:{PROPER_TAIL})?"
        );

        Ok(Self {
            patterns: vec![
                compile("DATE", &date)?,
                compile(
                    "TIME",
                    r"\b(?:\d{1,2}(?::\d{2})?[ \t]?[AaPp]\.?[Mm]\b\.?|\d{1,2}:\d{2}\b)(?:[ \t]+(?:[ECMP][SD]?T|Eastern|Central|Mountain|Pacific)\b(?:[ \t]+Time)?)?",
                )?,
                compile(
                    "MONEY",
                    r"\$[ \t]?\d+(?:,\d{3})*(?:\.\d+)?(?:[ \t]?(?:million|billion|thousand|[MKB])\b)?",
                )?,
                compile("ORG", &org)?,
            ],
        })
    }
}

impl EntityTagger for HeuristicTagger {
    fn tag(&self, text: &str) -> Vec<TaggedSpan> {
        let mut spans = Vec::new();
        for (label, re) in &self.patterns {
            for m in re.find_iter(text) {
                let mut start = m.start();
                if *label == "ORG" && m.as_str().starts_with("The ") {
                    start += "The ".len();
                }
                spans.push(TaggedSpan {
                    label: label.to_string(),
                    start,
                    end: m.end(),
                });
            }
        }
        spans
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Runs the tagger and the category patterns over a full text
pub struct EntityExtractor {
    tagger: Arc<dyn EntityTagger>,
    patterns: Vec<(&'static str, Regex)>,
}

impl EntityExtractor {
    pub fn new(tagger: Arc<dyn EntityTagger>) -> Result<Self> {
        let patterns = vec![
            compile(
                "CERTIFICATION",
                r"(?i)\b(?:ISO(?:/IEC)?[\s-]?\d{4,5}(?::\d{4})?|CMMI(?:[\s-]+(?:DEV|SVC))?(?:[\s-]+(?:Level|ML)[\s-]?[1-5])?|FedRAMP(?:\s+(?:High|Moderate|Low))?|SOC\s?[123](?:\s+Type\s+(?:II|I|[12]))?|PCI[\s-]DSS|HUBZone|SDVOSB|WOSB)\b",
            )?,
            compile(
                "PAGE_LIMIT",
                r"(?i)\b(?:(?:(?:must|shall|may|should)\s+not|not\s+to)\s+exceed|no\s+more\s+than|limited\s+to|maximum\s+of|up\s+to)\s+(?:a\s+(?:total\s+of\s+)?)?(?:\w+\s+)?(?:\(\d+\)\s+)?pages?\b|\b\d+[\s-]page\s+(?:limit(?:ation)?|maximum)\b",
            )?,
            compile(
                "FONT_REQUIREMENT",
                r"(?i)\b(?:Times\s+New\s+Roman|Arial|Calibri|Helvetica|Garamond|Cambria|Courier(?:\s+New)?|Verdana|Georgia)(?:\s*,?\s+\d{1,2}(?:\.\d)?\s*-?\s*(?:pt|point)\.?)?(?:\s+font)?\b|\b\d{1,2}(?:\.\d)?\s*-?\s*(?:pt|point)\.?\s+(?:font|type(?:face)?)\b|\bfont\s+size\s+(?:of\s+)?(?:at\s+least\s+|no\s+(?:smaller|less)\s+than\s+)?\d{1,2}(?:\.\d)?(?:\s*-?\s*(?:pt|point))?\b",
            )?,
            compile(
                "SUBMISSION_METHOD",
                r"(?i)\b(?:submit(?:ted)?|deliver(?:ed)?|sent|uploaded)\s+(?:electronically\s+)?(?:via|through|by|to|using)\s+(?:the\s+)?(?:e-?mail|fedconnect|sam\.gov|piee|ebuy|grants\.gov|u\.?s\.?\s+mail|mail|courier|hand\s+delivery|hard\s+copy|(?:[\w.-]+\s+)?(?:electronic\s+)?(?:procurement\s+)?portal)\b|\b(?:electronic|e-?mail|hard[\s-]copy|paper|mailed)\s+submissions?\b",
            )?,
        ];

        tracing::debug!(tagger = tagger.name(), "Entity extractor ready");
        Ok(Self { tagger, patterns })
    }

    /// Extractor backed by [`HeuristicTagger`]
    pub fn with_heuristics() -> Result<Self> {
        Self::new(Arc::new(HeuristicTagger::new()?))
    }

    /// Extract entity mentions, grouped by label.
    pub fn extract(&self, text: &str) -> EntityExtractionResult {
        let tagged = accept_non_overlapping(self.tagger.tag(text), &[]);

        let pattern_spans: Vec<TaggedSpan> = self
            .patterns
            .iter()
            .flat_map(|(label, re)| {
                re.find_iter(text).map(move |m| TaggedSpan {
                    label: label.to_string(),
                    start: m.start(),
                    end: m.end(),
                })
            })
            .collect();
        let patterns = accept_non_overlapping(pattern_spans, &tagged);

        let mut accepted: Vec<TaggedSpan> = tagged.into_iter().chain(patterns).collect();
        accepted.sort_by_key(|s| (s.start, s.end));

        let sentences = Sentences::new(text);
        let mut seen = HashSet::new();
        let mut result: EntityExtractionResult = BTreeMap::new();

        for span in accepted {
            let Some(raw) = text.get(span.range()) else {
                continue;
            };
            let mention = EntityMention {
                text: collapse_whitespace(raw),
                context: sentences.context(span.start),
            };
            if mention.text.is_empty() {
                continue;
            }
            if seen.insert((span.label.clone(), mention.clone())) {
                result.entry(span.label).or_default().push(mention);
            }
        }

        tracing::info!(
            labels = result.len(),
            mentions = result.values().map(Vec::len).sum::<usize>(),
            "Extracted entities"
        );
        result
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Keep spans in (start, longest first) order, discarding any that overlap
/// a span already kept or one of `blocked`.
fn accept_non_overlapping(mut spans: Vec<TaggedSpan>, blocked: &[TaggedSpan]) -> Vec<TaggedSpan> {
    spans.retain(|s| s.start < s.end);
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<TaggedSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        let range = span.range();
        let clashes = blocked
            .iter()
            .chain(kept.iter())
            .any(|other| overlaps(&range, &other.range()));
        if !clashes {
            kept.push(span);
        }
    }
    kept
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sentence lookup by byte offset, with line fallback
struct Sentences<'a> {
    text: &'a str,
    bounds: Vec<Range<usize>>,
}

impl<'a> Sentences<'a> {
    fn new(text: &'a str) -> Self {
        let bounds = text
            .split_sentence_bound_indices()
            .map(|(start, sentence)| start..start + sentence.len())
            .collect();
        Self { text, bounds }
    }

    fn context(&self, offset: usize) -> String {
        let idx = self.bounds.partition_point(|r| r.end <= offset);
        let sentence = self
            .bounds
            .get(idx)
            .and_then(|r| self.text.get(r.clone()))
            .map(collapse_whitespace)
            .unwrap_or_default();

        if sentence.is_empty() || sentence.chars().count() > MAX_CONTEXT_CHARS {
            collapse_whitespace(self.line(offset))
        } else {
            sentence
        }
    }

    fn line(&self, offset: usize) -> &'a str {
        let start = self.text[..offset].rfind('\n').map_or(0, |i| i + 1);
        let end = self.text[offset..]
            .find('\n')
            .map_or(self.text.len(), |i| offset + i);
        &self.text[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(result: &EntityExtractionResult, label: &str) -> Vec<String> {
        result
            .get(label)
            .map(|mentions| mentions.iter().map(|m| m.text.clone()).collect())
            .unwrap_or_default()
    }

    /// Tags every occurrence of fixed phrases
    struct Fixed(Vec<(&'static str, &'static str)>);

    impl EntityTagger for Fixed {
        fn tag(&self, text: &str) -> Vec<TaggedSpan> {
            self.0
                .iter()
                .flat_map(|(label, phrase)| {
                    text.match_indices(phrase).map(move |(start, m)| TaggedSpan {
                        label: label.to_string(),
                        start,
                        end: start + m.len(),
                    })
                })
                .collect()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[test]
    fn test_certification_and_date_reported_once() {
        let extractor = EntityExtractor::with_heuristics().unwrap();
        let text = "ISO 9001 certification is required by March 2024.";
        let result = extractor.extract(text);

        assert_eq!(texts(&result, "CERTIFICATION"), vec!["ISO 9001"]);
        assert_eq!(texts(&result, "DATE"), vec!["March 2024"]);

        let mentions_of_year = result
            .values()
            .flatten()
            .filter(|m| m.text.contains("2024"))
            .count();
        assert_eq!(mentions_of_year, 1);
        assert_eq!(result["DATE"][0].context, text);
    }

    #[test]
    fn test_pattern_overlapping_tagger_span_is_dropped() {
        let tagger = Fixed(vec![("PRODUCT", "ISO 9001"), ("DATE", "2024")]);
        let extractor = EntityExtractor::new(Arc::new(tagger)).unwrap();
        let result = extractor.extract("ISO 9001 certification is required by March 2024.");

        assert_eq!(texts(&result, "PRODUCT"), vec!["ISO 9001"]);
        assert_eq!(texts(&result, "DATE"), vec!["2024"]);
        assert!(result.get("CERTIFICATION").is_none());
    }

    #[test]
    fn test_tagger_overlaps_prefer_earlier_then_longer() {
        let spans = vec![
            TaggedSpan { label: "A".into(), start: 4, end: 8 },
            TaggedSpan { label: "B".into(), start: 0, end: 5 },
            TaggedSpan { label: "C".into(), start: 0, end: 3 },
            TaggedSpan { label: "D".into(), start: 9, end: 12 },
        ];
        let kept = accept_non_overlapping(spans, &[]);
        let labels: Vec<&str> = kept.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "D"]);
    }

    #[test]
    fn test_rfp_patterns() {
        let extractor = EntityExtractor::with_heuristics().unwrap();
        let text = "Proposals must not exceed 30 pages for the technical volume. \
                    Use Times New Roman 12 pt font with single spacing. \
                    Proposals shall be submitted electronically via SAM.gov by 2:00 PM EST.";
        let result = extractor.extract(text);

        assert_eq!(texts(&result, "PAGE_LIMIT"), vec!["must not exceed 30 pages"]);
        assert_eq!(texts(&result, "FONT_REQUIREMENT"), vec!["Times New Roman 12 pt font"]);
        assert_eq!(
            texts(&result, "SUBMISSION_METHOD"),
            vec!["submitted electronically via SAM.gov"]
        );
        assert_eq!(texts(&result, "TIME"), vec!["2:00 PM EST"]);
        assert_eq!(
            result["PAGE_LIMIT"][0].context,
            "Proposals must not exceed 30 pages for the technical volume."
        );
    }

    #[test]
    fn test_org_and_money() {
        let tagger = HeuristicTagger::new().unwrap();
        let text = "The Department of Homeland Security expects a budget of $1,500,000 for Acme Widgets Inc. and others.";
        let spans = tagger.tag(text);

        let found: Vec<(&str, &str)> = spans
            .iter()
            .map(|s| (s.label.as_str(), &text[s.range()]))
            .collect();
        assert!(found.contains(&("ORG", "Department of Homeland Security")));
        assert!(found.contains(&("ORG", "Acme Widgets Inc.")));
        assert!(found.contains(&("MONEY", "$1,500,000")));
        // A lone acronym is not an organization
        assert!(!tagger
            .tag("Registration with SAM is required.")
            .iter()
            .any(|s| s.label == "ORG"));
    }

    #[test]
    fn test_dedup_by_text_and_context() {
        let extractor = EntityExtractor::with_heuristics().unwrap();
        let text = "ISO 9001 is required.\nISO 9001 is required.\nAlso ISO 9001 again.";
        let result = extractor.extract(text);

        let certs = &result["CERTIFICATION"];
        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].context, "ISO 9001 is required.");
        assert_eq!(certs[1].context, "Also ISO 9001 again.");
    }

    #[test]
    fn test_long_sentence_falls_back_to_line() {
        let sentences = Sentences::new("short line\nHUBZone ");
        assert_eq!(sentences.line(12), "HUBZone ");

        let long = format!("{} HUBZone\nnext line", "word ".repeat(150));
        let sentences = Sentences::new(&long);
        let offset = long.find("HUBZone").unwrap();
        let context = sentences.context(offset);
        assert!(context.ends_with("HUBZone"));
        assert!(!context.contains("next line"));
    }

    #[test]
    fn test_empty_text() {
        let extractor = EntityExtractor::with_heuristics().unwrap();
        assert!(extractor.extract("").is_empty());
    }
}
