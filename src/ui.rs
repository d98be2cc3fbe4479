use ratatui::{
    layout::{Constraint, Direction, Layout},
    prelude::*,
    style::Style,
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState, Wrap,
    },
};
use std::sync::{Arc, Mutex};

use crate::models::{
    select_all_state, ConfirmDelete, Filter, SelectAllState, Selection, StatusDialog, User,
};
use crate::theme::Theme;

/// Marker for the select-all control, derived from the tri-state.
pub fn select_all_mark(state: SelectAllState) -> &'static str {
    match state {
        SelectAllState::Checked => "[x]",
        SelectAllState::Indeterminate => "[-]",
        SelectAllState::Unchecked => "[ ]",
    }
}

/// Count label of the action bar; `None` means the bar is hidden.
pub fn toolbar_label(selected: usize) -> Option<String> {
    if selected == 0 {
        None
    } else {
        Some(format!("{selected} selected"))
    }
}

pub fn render(
    f: &mut Frame,
    users: &[User],
    selection: &Selection,
    cursor: usize,
    filter: &Filter,
    confirm: &ConfirmDelete,
    status: &Arc<Mutex<StatusDialog>>,
    theme: &Theme,
    server_label: &str,
) {
    let visible = filter.visible_users(users);
    let visible_ids: Vec<u64> = visible.iter().map(|u| u.id).collect();

    let area = f.area();
    let toolbar = toolbar_label(selection.len());
    let mut constraints = vec![Constraint::Length(3), Constraint::Min(1)];
    if toolbar.is_some() {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    // Header: select-all marker, counts, filter echo
    let mark = select_all_mark(select_all_state(selection, &visible_ids));
    let mut header_spans = vec![
        Span::styled(format!("{mark} "), theme.checkbox),
        Span::styled(
            format!("{} of {} users", visible.len(), users.len()),
            Style::default().fg(theme.text),
        ),
    ];
    if filter.active {
        header_spans.push(Span::styled(format!("  /{}▏", filter.query), theme.filter_echo));
    } else if !filter.query.is_empty() {
        header_spans.push(Span::styled(
            format!("  filter: {}", filter.query),
            theme.filter_echo,
        ));
    }
    let header = Paragraph::new(Line::from(header_spans)).block(
        Block::default()
            .title(format!("Users – {server_label}"))
            .borders(Borders::ALL)
            .style(Style::default().fg(theme.focus_border)),
    );
    f.render_widget(header, chunks[0]);

    // User list with scrollbar
    let list_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(1)].as_ref())
        .split(chunks[1]);

    if visible.is_empty() {
        let text = if users.is_empty() {
            "No users on the server."
        } else {
            "No users match the filter. Esc resets it."
        };
        let placeholder = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .style(Style::default().fg(theme.text_secondary));
        f.render_widget(placeholder, list_layout[0]);
    } else {
        let items: Vec<ListItem> = visible
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let checked = selection.contains(user.id);
                let line = user_line(user, checked, theme);
                let style = if i == cursor {
                    theme.row_cursor
                } else if !user.account_active {
                    theme.row_inactive
                } else {
                    Style::default()
                };
                ListItem::new(line).style(style)
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(cursor.min(visible.len() - 1)));
        let list = List::new(items)
            .highlight_symbol("→ ")
            .block(Block::default().borders(Borders::ALL));
        f.render_stateful_widget(list, list_layout[0], &mut state);

        let mut sb = ScrollbarState::default()
            .position(cursor.min(visible.len() - 1))
            .content_length(visible.len());
        f.render_stateful_widget(
            Scrollbar::default().orientation(ScrollbarOrientation::VerticalRight),
            list_layout[1],
            &mut sb,
        );
    }

    // Action bar, only while something is selected
    if let Some(count_label) = toolbar {
        let bar = Line::from(vec![
            Span::styled(count_label, theme.toolbar_count),
            Span::raw("  │  "),
            Span::styled("p", theme.toolbar_key),
            Span::raw(" PDF   "),
            Span::styled("c", theme.toolbar_key),
            Span::raw(" CSV   "),
            Span::styled("x", theme.toolbar_key),
            Span::raw(" Excel   "),
            Span::styled("d", theme.danger),
            Span::raw(" Delete   "),
            Span::styled("Esc", theme.toolbar_key),
            Span::raw(" Clear"),
        ]);
        let bar = Paragraph::new(bar)
            .block(Block::default().borders(Borders::ALL).style(theme.toolbar));
        f.render_widget(bar, chunks[2]);
    }

    // Footer
    let footer = Paragraph::new(
        "↑/↓ or j/k Move | Space Select | a Select all | / Filter | r Reload | q Quit",
    )
    .block(Block::default().borders(Borders::ALL))
    .style(theme.footer);
    f.render_widget(footer, chunks[chunks.len() - 1]);

    // Confirmation prompt before a bulk delete
    if confirm.visible {
        let popup_area = centered_rect(50, 25, f.area());
        f.render_widget(Clear, popup_area);
        let text = format!(
            "Delete {} user(s)?\nThis action is irreversible.\n\n[y] Delete   [n] Cancel",
            confirm.count
        );
        let para = Paragraph::new(text)
            .block(
                Block::default()
                    .title(Span::styled("Confirm deletion", theme.danger))
                    .borders(Borders::ALL)
                    .style(theme.popup_border),
            )
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .style(theme.popup_text);
        f.render_widget(para, popup_area);
    }

    // Status popup, shared with background tasks
    {
        let dialog = status.lock().unwrap();
        if dialog.visible {
            let popup_area = centered_rect(50, 25, f.area());
            f.render_widget(Clear, popup_area);
            let title = if dialog.loading { "Working…" } else { "Status" };
            let mut text = dialog.text.clone();
            if !dialog.loading {
                text.push_str("\n\nPress Esc to close");
            }
            let para = Paragraph::new(text)
                .block(
                    Block::default()
                        .title(Span::styled(title, theme.popup_title))
                        .borders(Borders::ALL)
                        .style(theme.popup_border),
                )
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center)
                .style(theme.popup_text);
            f.render_widget(para, popup_area);
        }
    }
}

fn user_line(user: &User, checked: bool, theme: &Theme) -> Line<'static> {
    let checkbox = if checked { "[x]" } else { "[ ]" };
    let mut spans = vec![
        Span::styled(
            format!("{checkbox} "),
            if checked { theme.row_checked } else { theme.checkbox },
        ),
        Span::styled(format!("{:<6}", user.unique_code), theme.user_code),
        Span::raw(format!(" {:<24}", user.full_name())),
        Span::styled(format!(" {}", user.email), theme.user_email),
    ];
    if let Some(availability) = &user.availability {
        spans.push(Span::styled(format!("  {availability}"), theme.availability));
    }
    let location = match (&user.city, &user.country) {
        (Some(city), Some(country)) => Some(format!("{city}, {country}")),
        (Some(city), None) => Some(city.clone()),
        (None, Some(country)) => Some(country.clone()),
        (None, None) => None,
    };
    if let Some(location) = location {
        spans.push(Span::styled(
            format!("  {location}"),
            Style::default().fg(theme.text_secondary),
        ));
    }
    if let Some(created) = user.created_at {
        spans.push(Span::styled(
            format!("  since {}", created.format("%Y-%m-%d")),
            Style::default().fg(theme.text_secondary),
        ));
    }
    if !user.account_active {
        spans.push(Span::styled("  inactive", theme.row_inactive));
    }
    Line::from(spans)
}

/// Centers a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default().direction(Direction::Vertical)
        .constraints([Constraint::Percentage((100-percent_y)/2), Constraint::Percentage(percent_y), Constraint::Percentage((100-percent_y)/2)]).split(r)[1];
    Layout::default().direction(Direction::Horizontal)
        .constraints([Constraint::Percentage((100-percent_x)/2), Constraint::Percentage(percent_x), Constraint::Percentage((100-percent_x)/2)]).split(vertical)[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toolbar_hidden_iff_selection_empty() {
        assert_eq!(toolbar_label(0), None);
        assert_eq!(toolbar_label(1), Some("1 selected".to_string()));
        assert_eq!(toolbar_label(12), Some("12 selected".to_string()));
    }

    #[test]
    fn select_all_marks() {
        assert_eq!(select_all_mark(SelectAllState::Unchecked), "[ ]");
        assert_eq!(select_all_mark(SelectAllState::Indeterminate), "[-]");
        assert_eq!(select_all_mark(SelectAllState::Checked), "[x]");
    }
}
