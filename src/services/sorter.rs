//! Deterministic display order for merged options

use crate::types::CommitOption;

/// An option together with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedOption {
    pub option: CommitOption,
    /// Index of the producing backend in configuration order
    pub branch_index: usize,
    /// Position within that backend's response
    pub position: usize,
}

/// Orders options by a fixed list of style tags
#[derive(Debug, Clone)]
pub struct Sorter {
    priority: Vec<String>,
}

impl Sorter {
    pub fn new(priority: &[String]) -> Self {
        Self {
            priority: priority.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Rank of a style tag; unknown tags rank after every listed one
    pub fn rank(&self, kind: &str) -> usize {
        let kind = kind.to_lowercase();
        self.priority
            .iter()
            .position(|p| *p == kind)
            .unwrap_or(self.priority.len())
    }

    /// Sorts by rank, then backend order, then response position.
    ///
    /// The key does not depend on arrival order, so any completion order
    /// yields the same list.
    pub fn sort(&self, options: &mut [RankedOption]) {
        options.sort_by_key(|o| (self.rank(&o.option.kind), o.branch_index, o.position));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_style_priority;

    fn ranked(kind: &str, branch_index: usize, position: usize) -> RankedOption {
        RankedOption {
            option: CommitOption::new(kind, "", &format!("{kind} {branch_index}.{position}")),
            branch_index,
            position,
        }
    }

    #[test]
    fn test_priority_then_unknown_last() {
        let sorter = Sorter::new(&default_style_priority());
        let mut options = vec![
            ranked("whimsical", 0, 0),
            ranked("Detailed", 0, 1),
            ranked("concise", 0, 2),
            ranked("conventional", 0, 3),
        ];
        sorter.sort(&mut options);
        let kinds: Vec<&str> = options.iter().map(|o| o.option.kind.as_str()).collect();
        assert_eq!(kinds, vec!["concise", "conventional", "Detailed", "whimsical"]);
    }

    #[test]
    fn test_ties_keep_response_order() {
        let sorter = Sorter::new(&default_style_priority());
        let mut options = vec![
            ranked("novel", 0, 0),
            ranked("custom", 0, 1),
            ranked("other", 0, 2),
        ];
        sorter.sort(&mut options);
        let positions: Vec<usize> = options.iter().map(|o| o.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_arrival_order_does_not_matter() {
        let sorter = Sorter::new(&default_style_priority());
        let fast = vec![ranked("concise", 0, 0), ranked("detailed", 0, 1)];
        let deep = vec![ranked("concise", 1, 0), ranked("historical", 1, 1)];

        let mut fast_first: Vec<RankedOption> = fast.iter().chain(&deep).cloned().collect();
        let mut deep_first: Vec<RankedOption> = deep.iter().chain(&fast).cloned().collect();
        sorter.sort(&mut fast_first);
        sorter.sort(&mut deep_first);
        assert_eq!(fast_first, deep_first);
        assert_eq!(fast_first[0].branch_index, 0);
        assert_eq!(fast_first[1].branch_index, 1);
    }
}
