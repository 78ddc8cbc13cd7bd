//! Headless prompt selector: filtering and keyboard navigation.

use crate::models::{PromptRecord, SelectorItem};

pub const DEFAULT_MAX_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorFocus {
    Search,
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorOutcome {
    /// Highlight, focus or filter changed; the selector stays open
    Updated,
    Selected(PromptRecord),
    Closed,
}

#[derive(Debug, Clone)]
pub struct PromptSelector {
    all: Vec<PromptRecord>,
    filtered: Vec<PromptRecord>,
    selected: i64,
    query: String,
    focus: SelectorFocus,
    max_items: usize,
}

impl PromptSelector {
    pub fn new(prompts: Vec<PromptRecord>) -> Self {
        Self::with_limit(prompts, DEFAULT_MAX_ITEMS)
    }

    /// Pinned prompts first, then most recently used
    pub fn with_limit(mut prompts: Vec<PromptRecord>, max_items: usize) -> Self {
        prompts.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.last_used.cmp(&a.last_used))
        });
        let mut selector = Self {
            all: prompts,
            filtered: Vec::new(),
            selected: -1,
            query: String::new(),
            focus: SelectorFocus::Search,
            max_items,
        };
        selector.search("");
        selector
    }

    pub fn search(&mut self, query: &str) {
        self.query = query.to_string();
        let term = query.trim();
        self.filtered = self
            .all
            .iter()
            .filter(|p| term.is_empty() || p.matches(term))
            .take(self.max_items)
            .cloned()
            .collect();
        self.selected = if self.filtered.is_empty() { -1 } else { 0 };
    }

    pub fn handle_key(&mut self, key: &str) -> SelectorOutcome {
        let len = self.filtered.len() as i64;
        match key {
            "ArrowDown" if len > 0 => {
                self.selected = (self.selected + 1).rem_euclid(len);
                SelectorOutcome::Updated
            }
            "ArrowUp" if len > 0 => {
                self.selected = if self.selected <= 0 { len - 1 } else { self.selected - 1 };
                SelectorOutcome::Updated
            }
            "Enter" => match self.selected_prompt() {
                Some(prompt) => SelectorOutcome::Selected(prompt.clone()),
                None => SelectorOutcome::Updated,
            },
            "Escape" => SelectorOutcome::Closed,
            "Tab" => {
                self.focus = match self.focus {
                    SelectorFocus::Search => {
                        if self.selected < 0 && len > 0 {
                            self.selected = 0;
                        }
                        SelectorFocus::List
                    }
                    SelectorFocus::List => SelectorFocus::Search,
                };
                SelectorOutcome::Updated
            }
            _ => SelectorOutcome::Updated,
        }
    }

    /// Pointer selection of a listed item
    pub fn select_index(&mut self, index: usize) -> Option<PromptRecord> {
        let prompt = self.filtered.get(index)?.clone();
        self.selected = index as i64;
        Some(prompt)
    }

    pub fn selected_prompt(&self) -> Option<&PromptRecord> {
        usize::try_from(self.selected)
            .ok()
            .and_then(|i| self.filtered.get(i))
    }

    pub fn items(&self) -> Vec<SelectorItem> {
        self.filtered.iter().map(SelectorItem::from).collect()
    }

    pub fn selected_index(&self) -> i64 {
        self.selected
    }

    pub fn focus(&self) -> SelectorFocus {
        self.focus
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn prompt(id: &str, title: &str, pinned: bool, age_minutes: i64) -> PromptRecord {
        let when = Utc::now() - Duration::minutes(age_minutes);
        PromptRecord {
            id: id.to_string(),
            title: title.to_string(),
            content: format!("content of {}", title),
            tags: Default::default(),
            category: "Uncategorized".to_string(),
            is_pinned: pinned,
            variables: Vec::new(),
            usage_count: 0,
            last_used: when,
            created_at: when,
            source_url: String::new(),
        }
    }

    fn ids(selector: &PromptSelector) -> Vec<String> {
        selector.items().into_iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_pinned_first_then_recent() {
        let selector = PromptSelector::new(vec![
            prompt("old", "Old", false, 30),
            prompt("pin", "Pinned", true, 60),
            prompt("new", "New", false, 1),
        ]);
        assert_eq!(ids(&selector), vec!["pin", "new", "old"]);
        assert_eq!(selector.selected_index(), 0);
    }

    #[test]
    fn test_limit_applies() {
        let prompts = (0..15).map(|i| prompt(&i.to_string(), "p", false, i)).collect();
        assert_eq!(PromptSelector::new(prompts).items().len(), DEFAULT_MAX_ITEMS);
    }

    #[test]
    fn test_search_resets_selection() {
        let mut selector = PromptSelector::new(vec![
            prompt("a", "Email reply", false, 1),
            prompt("b", "Code review", false, 2),
        ]);
        selector.handle_key("ArrowDown");
        assert_eq!(selector.selected_index(), 1);

        selector.search("CODE");
        assert_eq!(ids(&selector), vec!["b"]);
        assert_eq!(selector.selected_index(), 0);

        selector.search("nothing like this");
        assert_eq!(selector.selected_index(), -1);
        assert_eq!(selector.handle_key("Enter"), SelectorOutcome::Updated);
    }

    #[test]
    fn test_arrows_wrap() {
        let mut selector = PromptSelector::new(vec![
            prompt("a", "A", false, 1),
            prompt("b", "B", false, 2),
            prompt("c", "C", false, 3),
        ]);
        selector.handle_key("ArrowUp");
        assert_eq!(selector.selected_index(), 2);
        selector.handle_key("ArrowDown");
        assert_eq!(selector.selected_index(), 0);
    }

    #[test]
    fn test_enter_escape_and_tab() {
        let mut selector = PromptSelector::new(vec![prompt("a", "A", false, 1)]);
        selector.search("zzz");
        selector.search("");
        selector.selected = -1;

        assert_eq!(selector.handle_key("Tab"), SelectorOutcome::Updated);
        assert_eq!(selector.focus(), SelectorFocus::List);
        assert_eq!(selector.selected_index(), 0);
        selector.handle_key("Tab");
        assert_eq!(selector.focus(), SelectorFocus::Search);

        match selector.handle_key("Enter") {
            SelectorOutcome::Selected(p) => assert_eq!(p.id, "a"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(selector.handle_key("Escape"), SelectorOutcome::Closed);
    }
}
