/// One-shot option prompt.
///
/// A bot turn that expects a choice carries an ordered set of strings. The
/// prompt hands out the chosen string exactly once; after that every choice
/// is inert. The dialog controller keeps at most one prompt and replaces it
/// whenever a new bot turn arrives, so stale prompts can never be answered.

#[derive(Debug, Clone)]
pub struct OptionPrompt {
    choices: Vec<String>,
    consumed: bool,
}

impl OptionPrompt {
    pub fn new(choices: Vec<String>) -> Self {
        Self {
            choices,
            consumed: false,
        }
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// True while the prompt can still be answered.
    pub fn is_active(&self) -> bool {
        !self.consumed && !self.choices.is_empty()
    }

    /// Consume choice `index`. Returns the chosen string the first time a
    /// valid index is selected; `None` afterwards and for out-of-range
    /// indices (those do not consume the prompt).
    pub fn select(&mut self, index: usize) -> Option<String> {
        if self.consumed {
            return None;
        }
        let chosen = self.choices.get(index)?.clone();
        self.consumed = true;
        Some(chosen)
    }

    /// Mark the prompt inert without selecting. Used when the user answers by
    /// typing free text instead of picking a choice.
    pub fn dismiss(&mut self) {
        self.consumed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> OptionPrompt {
        OptionPrompt::new(vec!["Abitur".into(), "Fachabitur".into(), "Keines".into()])
    }

    #[test]
    fn test_select_yields_choice_once() {
        let mut p = prompt();
        assert_eq!(p.select(1).as_deref(), Some("Fachabitur"));
        assert!(!p.is_active());
        // Second selection of any choice is inert
        assert_eq!(p.select(0), None);
        assert_eq!(p.select(1), None);
    }

    #[test]
    fn test_out_of_range_does_not_consume() {
        let mut p = prompt();
        assert_eq!(p.select(7), None);
        assert!(p.is_active());
        assert_eq!(p.select(0).as_deref(), Some("Abitur"));
    }

    #[test]
    fn test_dismiss_makes_prompt_inert() {
        let mut p = prompt();
        p.dismiss();
        assert!(!p.is_active());
        assert_eq!(p.select(0), None);
    }

    #[test]
    fn test_empty_prompt_is_never_active() {
        let p = OptionPrompt::new(Vec::new());
        assert!(!p.is_active());
    }
}
