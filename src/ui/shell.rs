use crate::client::{Language, Prompt, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl From<Language> for Direction {
    fn from(language: Language) -> Self {
        if language.is_rtl() {
            Direction::Rtl
        } else {
            Direction::Ltr
        }
    }
}

/// How the user is expected to answer next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Affordance {
    FreeText {
        placeholder: String,
        direction: Direction,
    },
    Options {
        options: Vec<String>,
        direction: Direction,
    },
}

impl Affordance {
    pub fn direction(&self) -> Direction {
        match self {
            Affordance::FreeText { direction, .. } | Affordance::Options { direction, .. } => {
                *direction
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Modal {
    LanguageChoice,
    Summary { html: String },
    HistoryList,
    HistoryView { id: String },
    ConfirmDelete { id: String },
}

fn placeholder(language: Language, stage: Option<Stage>) -> &'static str {
    match (language, stage) {
        (Language::En, Some(Stage::Assessment)) => "Describe symptoms in detail...",
        (Language::En, _) => "Type your message here...",
        (Language::Ar, Some(Stage::Assessment)) => "صف أعراضك بالتفصيل...",
        (Language::Ar, _) => "اكتب رسالتك هنا...",
    }
}

/// Presentation state around the chat log: which modal is open and
/// what the input area looks like.
#[derive(Clone, Debug)]
pub struct Shell {
    language: Language,
    stage: Option<Stage>,
    prompt: Prompt,
    modal: Option<Modal>,
}

impl Shell {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            stage: None,
            prompt: Prompt::free_text(),
            modal: None,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn direction(&self) -> Direction {
        self.language.into()
    }

    pub fn placeholder(&self) -> &'static str {
        placeholder(self.language, self.stage)
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Switch the input area to match the latest question. The stage
    /// sticks until the backend reports a different one.
    pub fn show_prompt(&mut self, prompt: &Prompt, stage: Option<Stage>) {
        self.prompt = prompt.clone();
        if stage.is_some() {
            self.stage = stage;
        }
    }

    pub fn reset_prompt(&mut self) {
        self.prompt = Prompt::free_text();
        self.stage = None;
    }

    pub fn options(&self) -> &[String] {
        &self.prompt.options
    }

    pub fn affordance(&self) -> Affordance {
        let direction = self.direction();
        if self.prompt.is_constrained() {
            Affordance::Options {
                options: self.prompt.options.clone(),
                direction,
            }
        } else {
            Affordance::FreeText {
                placeholder: self.placeholder().to_string(),
                direction,
            }
        }
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    /// Opening a modal replaces whichever one is showing.
    pub fn open(&mut self, modal: Modal) {
        self.modal = Some(modal);
    }

    pub fn close(&mut self) -> Option<Modal> {
        self.modal.take()
    }
}

/// Render summary HTML as Markdown for display outside a browser.
pub fn summary_text(html: &str) -> String {
    match htmd::convert(html) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!("Unable to convert summary HTML: {}", e);
            html.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PromptKind, QuestionType};

    #[test]
    fn it_flips_direction_and_placeholder_for_arabic() {
        let mut shell = Shell::new(Language::En);
        assert_eq!(
            shell.affordance(),
            Affordance::FreeText {
                placeholder: String::from("Type your message here..."),
                direction: Direction::Ltr,
            }
        );

        shell.set_language(Language::Ar);
        assert_eq!(shell.direction(), Direction::Rtl);
        assert_eq!(shell.placeholder(), "اكتب رسالتك هنا...");
    }

    #[test]
    fn it_switches_between_free_text_and_options() {
        let mut shell = Shell::new(Language::En);
        let boolean = Prompt::from_parts(Some(QuestionType::Boolean), vec![]);
        assert_eq!(boolean.kind, PromptKind::Boolean);

        shell.show_prompt(&boolean, None);
        assert_eq!(
            shell.affordance(),
            Affordance::Options {
                options: vec![String::from("Yes"), String::from("No")],
                direction: Direction::Ltr,
            }
        );

        shell.show_prompt(&Prompt::free_text(), Some(Stage::Assessment));
        assert_eq!(shell.placeholder(), "Describe symptoms in detail...");
        assert!(shell.options().is_empty());
    }

    #[test]
    fn it_keeps_stage_until_reset() {
        let mut shell = Shell::new(Language::En);
        shell.show_prompt(&Prompt::free_text(), Some(Stage::Assessment));
        shell.show_prompt(&Prompt::free_text(), None);
        assert_eq!(shell.placeholder(), "Describe symptoms in detail...");

        shell.reset_prompt();
        assert_eq!(shell.placeholder(), "Type your message here...");
    }

    #[test]
    fn it_holds_one_modal_at_a_time() {
        let mut shell = Shell::new(Language::En);
        shell.open(Modal::LanguageChoice);
        shell.open(Modal::Summary {
            html: String::from("<p>ok</p>"),
        });

        assert_eq!(
            shell.close(),
            Some(Modal::Summary {
                html: String::from("<p>ok</p>")
            })
        );
        assert_eq!(shell.modal(), None);
    }

    #[test]
    fn it_converts_summary_html() {
        let text = summary_text("<h3>Summary</h3><ul><li>Tension headache</li></ul>");
        assert!(text.contains("Summary"));
        assert!(text.contains("Tension headache"));
        assert!(!text.contains("<li>"));
    }
}
