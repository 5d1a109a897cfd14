use crate::app::{App, ConfirmChoice, ModalState, NoticeLevel, PaneFocus};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::{Alignment, Color, Line, Modifier, Span, Style};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(outer[1]);

    draw_header(frame, app, outer[0]);
    draw_list(frame, app, main[0]);
    draw_logs(frame, app, main[1]);
    draw_status_bar(frame, app, outer[2]);
    draw_modal(frame, app);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let filter = app.collection.filter();
    let search = if filter.search_text.is_empty() {
        "-".to_string()
    } else {
        format!("\"{}\"", filter.search_text)
    };

    let line = Line::from(vec![
        Span::styled("view: ", Style::default().fg(Color::Gray)),
        Span::raw(filter.belonging_to_view.label()),
        Span::styled("  insert: ", Style::default().fg(Color::Gray)),
        Span::raw(filter.insert_type.label()),
        Span::styled("  search: ", Style::default().fg(Color::Gray)),
        Span::styled(search, Style::default().fg(Color::Yellow)),
        Span::styled("  active view: ", Style::default().fg(Color::Gray)),
        Span::raw(app.host.active_view.clone().unwrap_or_else(|| "-".to_string())),
    ]);

    let title = if app.document().is_empty() {
        " (no document) ".to_string()
    } else {
        format!(" {} ", app.document())
    };
    let paragraph = Paragraph::new(line).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let viewport_rows = area.height.saturating_sub(2) as usize;
    app.sync_list_scroll(viewport_rows);

    let items: Vec<ListItem> = app.current_items().into_iter().map(ListItem::new).collect();

    let border_style = if app.focus == PaneFocus::List {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let title = format!(
        " Imports {}/{}  selected {} ",
        app.current_len(),
        app.collection.len(),
        app.collection.selected_count()
    );
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::LightGreen)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = ListState::default().with_offset(app.list_scroll());
    if app.current_len() > 0 {
        state.select(Some(app.selected_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_logs(frame: &mut Frame, app: &App, area: Rect) {
    let border_style = if app.focus == PaneFocus::Log {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let rows = area.height.saturating_sub(2) as usize;
    let end = app.logs.len().saturating_sub(app.log_tail_offset);
    let start = end.saturating_sub(rows);
    let lines: Vec<Line> = app.logs[start..end]
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Log ")
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let busy = if app.is_busy() { "BUSY" } else { "IDLE" };
    let mut spans = vec![
        Span::styled(
            format!(" {} ", busy),
            if app.is_busy() {
                Style::default().bg(Color::Yellow).fg(Color::Black)
            } else {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            },
        ),
        Span::raw(" "),
        Span::styled(
            " TOP ",
            if app.workflow.topmost().is_on() {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            },
        ),
        Span::raw("  "),
    ];

    if !app.workflow.is_idle() {
        spans.push(Span::styled(
            format!("[{}] ", app.workflow.state().label()),
            Style::default().fg(Color::LightRed),
        ));
    }

    match &app.notice {
        Some(notice) => spans.push(Span::styled(
            notice.text.clone(),
            match notice.level {
                NoticeLevel::Info => Style::default().fg(Color::Green),
                NoticeLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            },
        )),
        None => spans.push(Span::styled(
            "space mark | A all | c clear | D delete marked | x delete | g go to view | v/t filters | / search | r reload | q quit",
            Style::default().fg(Color::Gray),
        )),
    }

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

fn draw_modal(frame: &mut Frame, app: &App) {
    match &app.modal {
        ModalState::None => {}
        ModalState::Search { value, .. } => {
            let area = centered_rect(60, 20, frame.area());
            frame.render_widget(Clear, area);

            let lines = vec![
                Line::from("name or owner view contains"),
                Line::from(format!("> {}", value)).style(Style::default().fg(Color::Yellow)),
                Line::from(format!("{} match(es)", app.current_len())),
                Line::from("Enter: keep  Esc: restore"),
            ];

            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Search ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::LightBlue)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
        ModalState::Confirm { count, choice } => {
            let area = centered_rect(50, 30, frame.area());
            frame.render_widget(Clear, area);

            let button = |label: &'static str, active: bool| {
                if active {
                    Span::styled(
                        label,
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::LightYellow)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(label)
                }
            };

            let lines = vec![
                Line::from(format!("Delete {count} import(s) from {}?", app.document())),
                Line::from("Elements hosted by them are removed too."),
                Line::from(""),
                Line::from(vec![
                    button(" Yes ", *choice == ConfirmChoice::Yes),
                    Span::raw("   "),
                    button(" No ", *choice == ConfirmChoice::No),
                ]),
                Line::from(""),
                Line::from("y: delete  n/Esc: cancel  ←/→: choose"),
            ];

            let p = Paragraph::new(lines)
                .block(
                    Block::default()
                        .title(" Delete ")
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::LightRed)),
                )
                .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
