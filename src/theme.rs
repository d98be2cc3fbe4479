use ratatui::style::{Color, Modifier, Style};

pub struct Theme {
    pub focus_border: Color,
    pub text: Color,
    pub text_secondary: Color,

    // Specific components
    pub checkbox: Style,
    pub row_cursor: Style,
    pub row_checked: Style,
    pub row_inactive: Style,
    pub user_code: Style,
    pub user_email: Style,
    pub availability: Style,
    pub filter_echo: Style,
    pub toolbar: Style,
    pub toolbar_count: Style,
    pub toolbar_key: Style,
    pub footer: Style,
    pub popup_title: Style,
    pub popup_border: Style,
    pub popup_text: Style,
    pub danger: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            focus_border: Color::Cyan,
            text: Color::White,
            text_secondary: Color::Gray,

            checkbox: Style::default().fg(Color::DarkGray),
            row_cursor: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            row_checked: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            row_inactive: Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
            user_code: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            user_email: Style::default().fg(Color::Magenta),
            availability: Style::default().fg(Color::Green),
            filter_echo: Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            toolbar: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            toolbar_count: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            toolbar_key: Style::default().fg(Color::Yellow),
            footer: Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
            popup_title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            popup_border: Style::default().bg(Color::Black),
            popup_text: Style::default().fg(Color::White),
            danger: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        }
    }
}
