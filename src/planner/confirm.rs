use crate::calc::MonthKey;
use dialoguer::theme::ColorfulTheme;

/// A synchronous yes/no gate in front of a destructive change.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Any `FnMut(&str) -> bool` can answer a prompt.
impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Answers yes without asking (`--yes`).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Asks on the terminal. A failed prompt (no tty, Ctrl-C) counts as "no".
pub struct PromptConfirm {
    theme: ColorfulTheme,
}

impl PromptConfirm {
    pub fn new() -> Self {
        PromptConfirm {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for PromptConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm for PromptConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        dialoguer::Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

pub fn destructive_change_prompt(labels: &[String]) -> String {
    format!(
        "Percentages entered for {} will be discarded. Continue?",
        labels.join(", ")
    )
}

/// Asks before discarding the values held by `removed`. Nothing to lose means yes.
pub fn confirm_destructive_change(removed: &[MonthKey], confirm: &mut dyn Confirm) -> bool {
    if removed.is_empty() {
        return true;
    }
    let labels: Vec<String> = removed.iter().map(MonthKey::label).collect();
    let accepted = confirm.confirm(&destructive_change_prompt(&labels));
    tracing::debug!(months = %labels.join(", "), accepted, "destructive change confirmation");
    accepted
}
