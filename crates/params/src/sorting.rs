use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

static NUMERIC_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^0-9]*([0-9]+\.?[0-9]*)[^0-9]*$").expect("numeric key pattern is valid")
});

/// A way of ordering the choices of a Table Index parameter
pub trait SortingStrategy: Send + Sync {
    /// Short name, used for logging
    fn name(&self) -> &'static str;

    /// Whether this strategy can order every one of the choices
    fn is_applicable(&self, choices: &BTreeSet<String>) -> bool;

    /// Sorted copy of the choices
    fn sort(&self, choices: &BTreeSet<String>) -> Vec<String>;
}

/// Orders keys by the number they contain, e.g. `M3 < M4 < M10`
#[derive(Debug, Default, Clone, Copy)]
pub struct Numerical;

impl Numerical {
    fn key(choice: &str) -> Option<f64> {
        NUMERIC_KEY
            .captures(choice)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl SortingStrategy for Numerical {
    fn name(&self) -> &'static str {
        "numerical"
    }

    fn is_applicable(&self, choices: &BTreeSet<String>) -> bool {
        choices.iter().all(|choice| Self::key(choice).is_some())
    }

    fn sort(&self, choices: &BTreeSet<String>) -> Vec<String> {
        let mut keyed: Vec<(f64, &String)> = choices
            .iter()
            .map(|choice| (Self::key(choice).unwrap_or(f64::INFINITY), choice))
            .collect();
        // Stable: equal numbers stay in lexicographic order
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        keyed.into_iter().map(|(_, choice)| choice.clone()).collect()
    }
}

/// Plain string ordering, applicable to anything
#[derive(Debug, Default, Clone, Copy)]
pub struct Lexicographical;

impl SortingStrategy for Lexicographical {
    fn name(&self) -> &'static str {
        "lexicographical"
    }

    fn is_applicable(&self, _choices: &BTreeSet<String>) -> bool {
        true
    }

    fn sort(&self, choices: &BTreeSet<String>) -> Vec<String> {
        choices.iter().cloned().collect()
    }
}

/// Ordered list of strategies; the first applicable one wins
pub struct SortingSet {
    strategies: Vec<Box<dyn SortingStrategy>>,
}

impl SortingSet {
    /// A set without any strategy, choices keep string order
    #[must_use]
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy with the lowest priority so far
    pub fn push(&mut self, strategy: impl SortingStrategy + 'static) {
        self.strategies.push(Box::new(strategy));
    }

    /// Builder: append a strategy
    #[must_use]
    pub fn with(mut self, strategy: impl SortingStrategy + 'static) -> Self {
        self.push(strategy);
        self
    }

    /// Strategy that would be used for these choices
    #[must_use]
    pub fn select(&self, choices: &BTreeSet<String>) -> Option<&dyn SortingStrategy> {
        self.strategies
            .iter()
            .map(|strategy| &**strategy)
            .find(|strategy| strategy.is_applicable(choices))
    }

    /// Sort choices with the first applicable strategy
    #[must_use]
    pub fn sort(&self, choices: &BTreeSet<String>) -> Vec<String> {
        match self.select(choices) {
            Some(strategy) => {
                log::trace!("Sorting {} choices {}", choices.len(), strategy.name());
                strategy.sort(choices)
            }
            None => choices.iter().cloned().collect(),
        }
    }
}

impl Default for SortingSet {
    fn default() -> Self {
        Self::empty().with(Numerical).with(Lexicographical)
    }
}

impl fmt::Debug for SortingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|s| s.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_numerical_orders_by_contained_number() {
        let choices = set(&["M10", "M3", "M4", "M2.5"]);
        assert!(Numerical.is_applicable(&choices));
        assert_eq!(Numerical.sort(&choices), vec!["M2.5", "M3", "M4", "M10"]);
    }

    #[test]
    fn test_numerical_needs_a_number_everywhere() {
        assert!(!Numerical.is_applicable(&set(&["M3", "large"])));
        assert!(!Numerical.is_applicable(&set(&["M3x10"])));
        assert!(Numerical.is_applicable(&set(&["3mm", "#10"])));
    }

    #[test]
    fn test_fallback_to_lexicographical() {
        let sortings = SortingSet::default();
        let choices = set(&["small", "large", "M3"]);
        assert_eq!(sortings.select(&choices).map(|s| s.name()), Some("lexicographical"));
        assert_eq!(sortings.sort(&choices), vec!["M3", "large", "small"]);
    }

    #[test]
    fn test_appended_strategy_is_used_when_others_decline() {
        struct Reversed;
        impl SortingStrategy for Reversed {
            fn name(&self) -> &'static str {
                "reversed"
            }
            fn is_applicable(&self, _choices: &BTreeSet<String>) -> bool {
                true
            }
            fn sort(&self, choices: &BTreeSet<String>) -> Vec<String> {
                choices.iter().rev().cloned().collect()
            }
        }

        let sortings = SortingSet::empty().with(Numerical).with(Reversed);
        assert_eq!(sortings.sort(&set(&["a", "b"])), vec!["b", "a"]);
        assert_eq!(sortings.sort(&set(&["M4", "M3"])), vec!["M3", "M4"]);
    }
}
