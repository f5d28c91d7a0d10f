use super::config::MatcherConfig;
use super::models::{KnowledgeRecord, ScoredRecord, SearchRecord};
use tracing::debug;

/// Fields the matcher reads from a record.
pub trait Scorable {
    fn title(&self) -> &str;
    fn keywords(&self) -> &[String];
    fn description(&self) -> Option<&str> {
        None
    }
}

impl Scorable for KnowledgeRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Scorable for SearchRecord {
    fn title(&self) -> &str {
        &self.title
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn description(&self) -> Option<&str> {
        Some(&self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Title and keywords only.
    Assistant,
    /// Title, keywords and description.
    Search,
}

/// Deterministic substring scorer over static tables.
///
/// The lower-cased query is used as one raw substring, never tokenized:
/// a record's title must contain the query, whereas the query must contain
/// a keyword for that keyword to count.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    weights: MatcherConfig,
}

impl Matcher {
    pub fn new(weights: MatcherConfig) -> Self {
        Self { weights }
    }

    pub fn score<R: Scorable>(&self, record: &R, query: &str, mode: MatchMode) -> u32 {
        // A blank query would be contained in every title.
        if query.trim().is_empty() {
            return 0;
        }
        self.score_lowered(record, &query.to_lowercase(), mode)
    }

    fn score_lowered<R: Scorable>(&self, record: &R, query: &str, mode: MatchMode) -> u32 {
        let mut score = 0;

        if record.title().to_lowercase().contains(query) {
            score += self.weights.title_weight;
        }

        for keyword in record.keywords() {
            if query.contains(keyword.to_lowercase().as_str()) {
                score += self.weights.keyword_weight;
            }
        }

        if mode == MatchMode::Search
            && let Some(description) = record.description()
            && description.to_lowercase().contains(query)
        {
            score += self.weights.description_weight;
        }

        score
    }

    /// Highest scoring record; ties go to the earliest in table order.
    pub fn best_match<'a, R: Scorable>(&self, query: &str, table: &'a [R]) -> Option<&'a R> {
        if query.trim().is_empty() {
            return None;
        }
        let lower = query.to_lowercase();

        let mut best: Option<(&R, u32)> = None;
        for record in table {
            let score = self.score_lowered(record, &lower, MatchMode::Assistant);
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((record, score));
            }
        }

        if let Some((record, score)) = best {
            debug!("Best match for {:?}: {:?} (score {})", query, record.title(), score);
        }
        best.map(|(record, _)| record)
    }

    /// Active records with a nonzero score, best first, table order kept among ties.
    pub fn rank(&self, query: &str, table: &[SearchRecord]) -> Vec<ScoredRecord> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let lower = query.to_lowercase();

        let mut results: Vec<ScoredRecord> = table
            .iter()
            .filter(|record| record.is_active)
            .filter_map(|record| {
                let score = self.score_lowered(record, &lower, MatchMode::Search);
                (score > 0).then(|| ScoredRecord {
                    record: record.clone(),
                    score,
                })
            })
            .collect();

        // Vec::sort_by is stable
        results.sort_by(|a, b| b.score.cmp(&a.score));
        debug!("Ranked {} results for {:?}", results.len(), query);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(id: &str, title: &str, keywords: &[&str]) -> KnowledgeRecord {
        KnowledgeRecord {
            id: id.to_string(),
            title: title.to_string(),
            category: "Test".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            details: format!("details of {id}"),
            target_id: None,
            actions: Vec::new(),
            hand_off: None,
        }
    }

    fn entry(title: &str, keywords: &[&str], description: &str) -> SearchRecord {
        SearchRecord {
            title: title.to_string(),
            category: "Test".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            description: description.to_string(),
            target_id: title.to_lowercase(),
            is_active: true,
        }
    }

    #[test]
    fn test_title_contains_query() {
        let matcher = Matcher::default();
        let record = topic("narxlar", "Narxlar", &[]);
        assert_eq!(matcher.score(&record, "NARX", MatchMode::Assistant), 3);
        assert_eq!(matcher.score(&record, "narxlar haqida", MatchMode::Assistant), 0);
    }

    #[test]
    fn test_query_contains_keyword() {
        let matcher = Matcher::default();
        let record = topic("manzil", "Manzil", &["manzil", "telefon", "aloqa"]);
        // Query contains two keywords; title does not contain the query.
        assert_eq!(
            matcher.score(&record, "manzil va telefon?", MatchMode::Assistant),
            4
        );
        // Keyword longer than the query never counts.
        let record = topic("x", "Boshqa", &["telefon"]);
        assert_eq!(matcher.score(&record, "tel", MatchMode::Assistant), 0);
    }

    #[test]
    fn test_description_only_counts_in_search_mode() {
        let matcher = Matcher::default();
        let record = entry("Kimyo", &[], "Testlar va imtihonlar");
        assert_eq!(matcher.score(&record, "imtihon", MatchMode::Search), 1);
        assert_eq!(matcher.score(&record, "imtihon", MatchMode::Assistant), 0);
    }

    #[test]
    fn test_blank_query_scores_nothing() {
        let matcher = Matcher::default();
        let table = vec![topic("a", "Alpha", &["alpha"])];
        assert_eq!(matcher.score(&table[0], "   ", MatchMode::Assistant), 0);
        assert!(matcher.best_match("", &table).is_none());
        assert!(matcher.rank(" ", &[entry("Alpha", &[], "")]).is_empty());
    }

    #[test]
    fn test_best_match_prefers_earlier_record_on_tie() {
        let matcher = Matcher::default();
        let table = vec![
            topic("first", "Birinchi", &["kurs"]),
            topic("second", "Ikkinchi", &["kurs"]),
        ];
        assert_eq!(matcher.best_match("kurs", &table).unwrap().id, "first");
    }

    #[test]
    fn test_best_match_requires_positive_score() {
        let matcher = Matcher::default();
        let table = vec![topic("a", "Alpha", &["alpha"])];
        assert!(matcher.best_match("zzz", &table).is_none());
    }

    #[test]
    fn test_rank_is_stable_and_skips_inactive() {
        let matcher = Matcher::default();
        let mut hidden = entry("Kitob", &[], "");
        hidden.is_active = false;
        let table = vec![
            entry("Tarix", &[], "kitoblar bilan"),
            entry("Kimyo", &[], ""),
            hidden,
            entry("Fizika", &[], "kimyo va fizika"),
            entry("Kino", &[], "kino haqida"),
        ];

        let results = matcher.rank("ki", &table);
        let titles: Vec<_> = results.iter().map(|r| r.record.title.as_str()).collect();
        assert_eq!(titles, vec!["Kino", "Kimyo", "Tarix", "Fizika"]);
        let scores: Vec<_> = results.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![4, 3, 1, 1]);
    }

    #[test]
    fn test_matching_is_repeatable() {
        let matcher = Matcher::default();
        let table = vec![entry("Kimyo", &["kimyo"], "kimyo fani"), entry("Tarix", &[], "")];
        assert_eq!(matcher.rank("kimyo", &table), matcher.rank("kimyo", &table));
    }

    #[test]
    fn test_custom_weights() {
        let matcher = Matcher::new(MatcherConfig {
            title_weight: 10,
            keyword_weight: 1,
            description_weight: 0,
        });
        let record = entry("Kimyo", &["kimyo"], "kimyo");
        assert_eq!(matcher.score(&record, "kimyo", MatchMode::Search), 11);
    }
}
