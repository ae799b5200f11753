use ratatui::style::Style;

#[derive(Clone, Debug)]
pub struct Theme {
    pub text_primary: Style,
    pub text_muted: Style,
    pub header: Style,
    pub group_header: Style,
    pub cursor: Style,
    pub selected: Style,
    pub activated: Style,
    pub editing: Style,
    pub error: Style,
    pub scrollbar: Style,
}

impl Default for Theme {
    fn default() -> Self {
        use ratatui::style::Modifier;
        use ratatui::style::Stylize;

        Self {
            text_primary: Style::default(),
            text_muted: Style::default().dark_gray(),
            header: Style::default().add_modifier(Modifier::BOLD),
            group_header: Style::default().cyan().add_modifier(Modifier::BOLD),
            cursor: Style::default().add_modifier(Modifier::REVERSED),
            selected: Style::default().add_modifier(Modifier::BOLD),
            activated: Style::default().cyan(),
            editing: Style::default().yellow().add_modifier(Modifier::UNDERLINED),
            error: Style::default().red(),
            scrollbar: Style::default().dark_gray(),
        }
    }
}
