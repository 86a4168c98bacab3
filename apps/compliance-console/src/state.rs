//! Console state and its reducer
//!
//! [`ConsoleState`] only changes through its crate-private reducer. Responses
//! that arrive after the selection moved on are recognised there and
//! discarded, so concurrent handlers cannot overwrite newer data.

use shared_types::{Document, DocumentId, QueryResult, RuleSet};

/// Independently loading parts of the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Documents,
    Rules,
    Upload,
    Extraction,
    RuleEdit,
    Query,
    DocumentDelete,
}

impl Region {
    pub const ALL: [Region; 7] = [
        Region::Documents,
        Region::Rules,
        Region::Upload,
        Region::Extraction,
        Region::RuleEdit,
        Region::Query,
        Region::DocumentDelete,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Identifies the selection a rule fetch was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub document: DocumentId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action {
    /// A call in `Region` started
    Started(Region),
    /// A call in `Region` resolved, successfully or not
    Finished(Region),
    DocumentsLoaded(Vec<Document>),
    /// Change the selection; `None` deselects
    Select(Option<DocumentId>),
    RulesLoaded { token: RequestToken, rules: RuleSet },
    QueryAnswered { document: DocumentId, result: QueryResult },
    DocumentDeleted(DocumentId),
    Failed(String),
    ClearError,
}

/// Outcome of [`ConsoleState::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Changed,
    /// The action no longer matched the state and was dropped
    Discarded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleState {
    documents: Vec<Document>,
    selected: Option<DocumentId>,
    rules: RuleSet,
    query_result: Option<QueryResult>,
    loading: [usize; Region::ALL.len()],
    error: Option<String>,
    generation: u64,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn selected(&self) -> Option<&DocumentId> {
        self.selected.as_ref()
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn query_result(&self) -> Option<&QueryResult> {
        self.query_result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Bumped on every selection change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self, region: Region) -> bool {
        self.loading[region.index()] > 0
    }

    pub fn is_busy(&self) -> bool {
        self.loading.iter().any(|&n| n > 0)
    }

    /// Token for a rule fetch against the current selection
    pub fn token(&self) -> Option<RequestToken> {
        self.selected.as_ref().map(|document| RequestToken {
            document: document.clone(),
            generation: self.generation,
        })
    }

    pub(crate) fn apply(&mut self, action: Action) -> Applied {
        match action {
            Action::Started(region) => {
                self.loading[region.index()] += 1;
            }
            Action::Finished(region) => {
                let count = &mut self.loading[region.index()];
                if *count == 0 {
                    return Applied::Discarded;
                }
                *count -= 1;
            }
            Action::DocumentsLoaded(documents) => {
                self.documents = documents;
            }
            Action::Select(document) => {
                if document != self.selected {
                    self.rules = RuleSet::empty();
                }
                self.selected = document;
                self.generation += 1;
            }
            Action::RulesLoaded { token, rules } => {
                if self.token().as_ref() != Some(&token) {
                    return Applied::Discarded;
                }
                self.rules = rules;
            }
            Action::QueryAnswered { document, result } => {
                if self.selected.as_ref() != Some(&document) {
                    return Applied::Discarded;
                }
                self.query_result = Some(result);
            }
            Action::DocumentDeleted(document) => {
                self.documents.retain(|d| d.id != document);
                if self.selected.as_ref() == Some(&document) {
                    self.selected = None;
                    self.rules = RuleSet::empty();
                    self.generation += 1;
                }
            }
            Action::Failed(message) => {
                self.error = Some(message);
            }
            Action::ClearError => {
                if self.error.take().is_none() {
                    return Applied::Discarded;
                }
            }
        }
        Applied::Changed
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn selection() -> impl Strategy<Value = Option<DocumentId>> {
        prop::option::of("[a-c]\\.pdf".prop_map(DocumentId::new))
    }

    proptest! {
        /// Property: selecting then deselecting leaves no rules behind
        #[test]
        fn select_then_deselect_is_empty(id in "[a-z]{1,8}\\.pdf", value in "[a-z ]{1,12}") {
            let mut state = ConsoleState::new();
            state.apply(Action::Select(Some(DocumentId::new(id))));
            if let Some(token) = state.token() {
                state.apply(Action::RulesLoaded {
                    token,
                    rules: RuleSet { allowed: vec![value], ..RuleSet::default() },
                });
            }
            state.apply(Action::Select(None));
            prop_assert!(state.rules().is_empty());
            prop_assert_eq!(state.selected(), None);
        }

        /// Property: only the token of the latest selection is applied
        #[test]
        fn only_latest_token_applies(selections in prop::collection::vec(selection(), 1..12)) {
            let mut state = ConsoleState::new();
            let mut tokens = Vec::new();
            for selected in selections {
                state.apply(Action::Select(selected));
                tokens.extend(state.token());
            }
            let latest = state.token();

            for token in tokens {
                let is_latest = Some(&token) == latest.as_ref();
                let applied = state.apply(Action::RulesLoaded {
                    token,
                    rules: RuleSet { forbidden: vec!["x".into()], ..RuleSet::default() },
                });
                prop_assert_eq!(applied == Applied::Changed, is_latest);
            }
        }

        /// Property: balanced start/finish leaves every region idle
        #[test]
        fn balanced_loading_returns_idle(regions in prop::collection::vec(0usize..7, 0..20)) {
            let mut state = ConsoleState::new();
            for &r in &regions {
                state.apply(Action::Started(Region::ALL[r]));
            }
            for &r in regions.iter().rev() {
                prop_assert!(state.is_loading(Region::ALL[r]));
                state.apply(Action::Finished(Region::ALL[r]));
            }
            prop_assert!(!state.is_busy());
        }
    }
}
