//! Troubleshooting knowledge base used for self-help steps.

use upkeep_core::triage::KnowledgeArticleRef;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeArticle {
    pub article_id: &'static str,
    pub title: &'static str,
    pub keywords: &'static [&'static str],
    pub steps: &'static [&'static str],
}

impl KnowledgeArticle {
    pub fn reference(&self) -> KnowledgeArticleRef {
        KnowledgeArticleRef { article_id: self.article_id.to_owned(), title: self.title.to_owned() }
    }

    pub fn steps(&self) -> Vec<String> {
        self.steps.iter().map(|step| (*step).to_owned()).collect()
    }

    fn score(&self, text: &str) -> usize {
        self.keywords.iter().filter(|keyword| text.contains(*keyword)).count()
    }
}

const ARTICLES: &[KnowledgeArticle] = &[
    KnowledgeArticle {
        article_id: "kb_hvac_01",
        title: "AC not cooling",
        keywords: &["ac", "air conditioner", "cooling", "not cold", "hvac"],
        steps: &[
            "Check if the thermostat is set to COOL and temperature lower than room temp.",
            "Ensure the filter is not clogged; clean or replace if dirty.",
            "Check if the outdoor unit is powered on and not blocked.",
        ],
    },
    KnowledgeArticle {
        article_id: "kb_leak_01",
        title: "Minor sink leak under kitchen",
        keywords: &["sink", "leak", "kitchen", "drip", "pipe"],
        steps: &[
            "Place a small bucket under the leak.",
            "Tighten the visible compression nut by hand if safe.",
            "Avoid using that sink until a plumber checks it.",
        ],
    },
    KnowledgeArticle {
        article_id: "kb_appliance_01",
        title: "Washing machine not draining",
        keywords: &["washer", "washing machine", "not draining", "drain"],
        steps: &[
            "Unplug the washing machine.",
            "Check and clean the lint filter/drain filter.",
            "Ensure the drain hose is not kinked or blocked.",
        ],
    },
    KnowledgeArticle {
        article_id: "kb_electrical_01",
        title: "Tripped breaker or room lights not working",
        keywords: &[
            "breaker",
            "tripped",
            "lights not working",
            "bedroom lights",
            "power outage",
            "circuit",
            "electrical",
            "no power",
        ],
        steps: &[
            "Check your home's electrical panel for any breakers that are in the 'off' position.",
            "If you find a tripped breaker, flip it fully to the 'off' position, then back to 'on'.",
            "If the breaker trips again immediately, do not attempt further resets and contact maintenance.",
            "If power is restored, monitor for further issues.",
        ],
    },
];

#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    articles: &'static [KnowledgeArticle],
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self { articles: ARTICLES }
    }
}

impl KnowledgeBase {
    pub fn articles(&self) -> &[KnowledgeArticle] {
        self.articles
    }

    /// Highest keyword score wins; earlier articles win ties. A zero score
    /// finds nothing.
    pub fn lookup(&self, title: &str, description: &str) -> Option<&KnowledgeArticle> {
        let text = format!("{title}\n{description}").to_lowercase();
        let mut best: Option<(&KnowledgeArticle, usize)> = None;
        for article in self.articles {
            let score = article.score(&text);
            if score > best.map_or(0, |(_, best_score)| best_score) {
                best = Some((article, score));
            }
        }
        best.map(|(article, _)| article)
    }
}

#[cfg(test)]
mod tests {
    use super::KnowledgeBase;

    #[test]
    fn kitchen_leak_finds_leak_article() {
        let kb = KnowledgeBase::default();
        let article = kb.lookup("Minor sink leak under kitchen", "slow drip from the pipe");
        assert_eq!(article.map(|article| article.article_id), Some("kb_leak_01"));
        assert_eq!(article.map(|article| article.steps().len()), Some(3));
    }

    #[test]
    fn breaker_article_matches_lights() {
        let kb = KnowledgeBase::default();
        let article = kb.lookup("Bedroom lights not working", "I think the breaker tripped");
        assert_eq!(article.map(|article| article.article_id), Some("kb_electrical_01"));
    }

    #[test]
    fn zero_score_finds_nothing() {
        let kb = KnowledgeBase::default();
        assert!(kb.lookup("Door squeaks", "front hinge").is_none());
    }
}
