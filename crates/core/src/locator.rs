//! PII locator: finds matches in page text, marks every region they occupy
//! and commits the marks in one apply.

use scrub_ner::EntityRecognizer;
use scrub_pdf::RedactionMark;
use scrub_rules::{pattern_rules, Category};

use crate::document::Page;
use crate::{CategoryTally, Result};

/// What one page contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// Textual matches per category
    pub tally: CategoryTally,
    /// Regions actually blacked out
    pub marks_applied: usize,
}

/// Marks every region where `needle` appears; returns how many were found.
fn mark_all<P: Page + ?Sized>(page: &mut P, needle: &str) -> Result<usize> {
    let regions = page.search_for(needle)?;
    for bbox in &regions {
        page.add_redact_mark(RedactionMark::black(*bbox));
    }
    Ok(regions.len())
}

/// Redacts all regex and entity matches on `page`.
///
/// Counts are per textual match: a match whose text cannot be found on the
/// page geometry still counts once.
pub fn locate_and_redact<P: Page + ?Sized>(
    page: &mut P,
    recognizer: &dyn EntityRecognizer,
) -> Result<PageOutcome> {
    let text = page.text()?;
    let mut tally = CategoryTally::new();
    let mut regions = 0;

    for rule in pattern_rules() {
        for m in rule.find_matches(&text) {
            regions += mark_all(page, m.text)?;
            tally.increment(m.category);
        }
    }

    for entity in recognizer.recognize(&text) {
        let Some(category) = Category::from_entity_label(&entity.label) else {
            continue;
        };
        regions += mark_all(page, &entity.text)?;
        tally.increment(category);
    }

    let marks_applied = page.apply_redactions()?;
    log::debug!(
        "[Locator] {} matches, {} regions found, {} marks applied",
        tally.total(),
        regions,
        marks_applied
    );

    Ok(PageOutcome {
        tally,
        marks_applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrub_ner::Entity;
    use scrub_pdf::BBox;

    /// In-memory page: `search_for` finds needles listed in `findable`.
    #[derive(Default)]
    struct FakePage {
        text: String,
        findable: Vec<(String, usize)>,
        searches: Vec<String>,
        pending: Vec<RedactionMark>,
        applied: Vec<RedactionMark>,
        apply_calls: usize,
    }

    impl Page for FakePage {
        fn text(&mut self) -> Result<String> {
            Ok(self.text.clone())
        }

        fn search_for(&mut self, needle: &str) -> Result<Vec<BBox>> {
            self.searches.push(needle.to_string());
            let n = self
                .findable
                .iter()
                .find(|(t, _)| t == needle)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            Ok((0..n)
                .map(|i| BBox {
                    x: i as f32 * 10.0,
                    y: 0.0,
                    w: 5.0,
                    h: 5.0,
                })
                .collect())
        }

        fn add_redact_mark(&mut self, mark: RedactionMark) {
            self.pending.push(mark);
        }

        fn apply_redactions(&mut self) -> Result<usize> {
            self.apply_calls += 1;
            let n = self.pending.len();
            self.applied.append(&mut self.pending);
            Ok(n)
        }
    }

    struct FixedRecognizer(Vec<(&'static str, &'static str)>);

    impl EntityRecognizer for FixedRecognizer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn recognize(&self, text: &str) -> Vec<Entity> {
            self.0
                .iter()
                .filter_map(|(label, needle)| {
                    text.find(needle).map(|start| Entity {
                        label: label.to_string(),
                        text: needle.to_string(),
                        start,
                        end: start + needle.len(),
                    })
                })
                .collect()
        }
    }

    fn page(text: &str, findable: &[(&str, usize)]) -> FakePage {
        FakePage {
            text: text.to_string(),
            findable: findable.iter().map(|(t, n)| (t.to_string(), *n)).collect(),
            ..FakePage::default()
        }
    }

    #[test]
    fn contact_line_redacts_email_and_phone() {
        let mut p = page(
            "Contact john@example.com or 555-123-4567",
            &[("john@example.com", 1), ("555-123-4567", 1)],
        );
        let outcome = locate_and_redact(&mut p, &FixedRecognizer(vec![])).expect("ok");
        assert_eq!(outcome.tally.summary(), "EMAIL: 1, PHONE: 1");
        assert_eq!(outcome.marks_applied, 2);
        assert_eq!(p.apply_calls, 1);
        assert!(p.applied.iter().all(|m| m.fill == RedactionMark::BLACK));
    }

    #[test]
    fn regex_categories_run_before_entities_in_fixed_order() {
        let mut p = page(
            "SSN 123-45-6789, Jane Doe, jane@x.org",
            &[("123-45-6789", 1), ("Jane Doe", 1), ("jane@x.org", 1)],
        );
        let ner = FixedRecognizer(vec![("PERSON", "Jane Doe")]);
        let outcome = locate_and_redact(&mut p, &ner).expect("ok");
        assert_eq!(outcome.tally.summary(), "EMAIL: 1, SSN: 1, PERSON: 1");
        assert_eq!(p.searches, vec!["jane@x.org", "123-45-6789", "Jane Doe"]);
    }

    #[test]
    fn match_without_regions_still_counts() {
        let mut p = page("call 555-123-4567", &[]);
        let outcome = locate_and_redact(&mut p, &FixedRecognizer(vec![])).expect("ok");
        assert_eq!(outcome.tally.get(Category::Phone), 1);
        assert_eq!(outcome.marks_applied, 0);
    }

    #[test]
    fn every_region_of_a_repeated_match_is_marked() {
        let mut p = page("555-123-4567", &[("555-123-4567", 3)]);
        let outcome = locate_and_redact(&mut p, &FixedRecognizer(vec![])).expect("ok");
        assert_eq!(outcome.tally.get(Category::Phone), 1);
        assert_eq!(outcome.marks_applied, 3);
    }

    #[test]
    fn unrelated_entity_labels_are_ignored() {
        let mut p = page("on Monday in Paris", &[("Monday", 1), ("Paris", 1)]);
        let ner = FixedRecognizer(vec![("DATE", "Monday"), ("GPE", "Paris")]);
        let outcome = locate_and_redact(&mut p, &ner).expect("ok");
        assert_eq!(outcome.tally.summary(), "GPE: 1");
        assert_eq!(p.searches, vec!["Paris"]);
    }

    #[test]
    fn empty_page_applies_nothing() {
        let mut p = page("", &[]);
        let outcome = locate_and_redact(&mut p, &FixedRecognizer(vec![])).expect("ok");
        assert!(outcome.tally.is_empty());
        assert_eq!(outcome.marks_applied, 0);
        assert_eq!(p.apply_calls, 1);
    }
}
