use upkeep_core::domain::incident::{IssueType, Severity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssueClassification {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub must_escalate_immediately: bool,
    pub propose_self_help: bool,
}

impl IssueClassification {
    fn escalate(issue_type: IssueType, severity: Severity) -> Self {
        Self { issue_type, severity, must_escalate_immediately: true, propose_self_help: false }
    }

    fn self_help(issue_type: IssueType, severity: Severity) -> Self {
        Self { issue_type, severity, must_escalate_immediately: false, propose_self_help: true }
    }
}

/// Keyword rules over the tenant's title and description. First rule wins.
#[derive(Clone, Debug, Default)]
pub struct IssueClassifier;

impl IssueClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, title: &str, description: &str) -> IssueClassification {
        let text = normalize_text(&format!("{title} {description}"));
        let tokens = tokenize(&text);
        let has_word = |word: &str| tokens.iter().any(|token| token == word);

        if has_word("gas") {
            return IssueClassification::escalate(IssueType::Gas, Severity::Critical);
        }
        if has_word("ac")
            || has_word("air")
            || text.contains("air conditioner")
            || text.contains("cooling")
        {
            let severity = if text.contains("hot") || text.contains("40c") {
                Severity::Critical
            } else {
                Severity::High
            };
            return IssueClassification::escalate(IssueType::Hvac, severity);
        }
        if text.contains("sink") || text.contains("leak") {
            return IssueClassification::self_help(IssueType::Plumbing, Severity::High);
        }
        if text.contains("washer") || text.contains("washing machine") {
            return IssueClassification::self_help(IssueType::Appliance, Severity::High);
        }
        if text.contains("light") || text.contains("bedroom") {
            return IssueClassification::self_help(IssueType::Electrical, Severity::Medium);
        }

        IssueClassification {
            issue_type: IssueType::Other,
            severity: Severity::Medium,
            must_escalate_immediately: false,
            propose_self_help: false,
        }
    }
}

fn normalize_text(text: &str) -> String {
    text.to_ascii_lowercase()
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_ascii_alphanumeric() {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use upkeep_core::domain::incident::{IssueType, Severity};

    use super::IssueClassifier;

    #[test]
    fn gas_is_a_critical_escalation() {
        let classification = IssueClassifier::new().classify("Gas smell", "near the stove");
        assert_eq!(classification.issue_type, IssueType::Gas);
        assert_eq!(classification.severity, Severity::Critical);
        assert!(classification.must_escalate_immediately);
        assert!(!classification.propose_self_help);
    }

    #[test]
    fn hot_weather_makes_hvac_critical() {
        let classifier = IssueClassifier::new();
        let heatwave = classifier.classify("AC not cooling", "It is 40C and very hot inside");
        assert_eq!(heatwave.issue_type, IssueType::Hvac);
        assert_eq!(heatwave.severity, Severity::Critical);

        let mild = classifier.classify("AC broken", "blows warm air");
        assert_eq!(mild.issue_type, IssueType::Hvac);
        assert_eq!(mild.severity, Severity::High);
    }

    #[test]
    fn air_inside_other_words_does_not_trigger_hvac() {
        let classification =
            IssueClassifier::new().classify("Washer needs repair", "the washing machine is stuck");
        assert_eq!(classification.issue_type, IssueType::Appliance);
        assert!(classification.propose_self_help);
    }

    #[test]
    fn self_help_categories_follow_keyword_order() {
        let classifier = IssueClassifier::new();
        let leak = classifier.classify("Minor sink leak under kitchen", "slow drip");
        assert_eq!((leak.issue_type, leak.severity), (IssueType::Plumbing, Severity::High));

        let lights = classifier.classify("Bedroom lights not working", "");
        assert_eq!((lights.issue_type, lights.severity), (IssueType::Electrical, Severity::Medium));
    }

    #[test]
    fn unknown_text_is_other_medium() {
        let classification = IssueClassifier::new().classify("Door squeaks", "front door hinge");
        assert_eq!(classification.issue_type, IssueType::Other);
        assert_eq!(classification.severity, Severity::Medium);
        assert!(!classification.must_escalate_immediately);
        assert!(!classification.propose_self_help);
    }
}
