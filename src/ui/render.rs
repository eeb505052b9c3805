use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{io, time::Duration};

use crate::app::{AppState, InputMode};
use crate::status::StatusLevel;
use crate::ui::handlers::handle_key_event;

pub fn run_app(mut app_state: AppState) -> Result<()> {
    let mut terminal = setup_terminal()?;

    while !app_state.should_quit {
        terminal.draw(|f| ui(f, &mut app_state))?;

        if app_state.run_pending_action() {
            // Keys typed while the action ran are dropped.
            while event::poll(Duration::from_millis(0))? {
                event::read()?;
            }
            continue;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key_event(&mut app_state, key);
                }
            }
        }
    }

    restore_terminal(&mut terminal)?;

    Ok(())
}

/// Setup the terminal for the application
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

/// Restore the terminal to its original state
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

fn ui(f: &mut Frame, app_state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Length(3), // File selection
            Constraint::Length(3), // Pivot filter selection
            Constraint::Min(3),    // Status log
            Constraint::Length(1), // Status bar
        ])
        .split(f.size());
    let full_area = f.size();

    draw_title(f, app_state, chunks[0]);
    draw_file_panel(f, app_state, chunks[1]);
    draw_filter_panel(f, app_state, chunks[2]);
    draw_status_log(f, app_state, chunks[3]);
    draw_status_bar(f, app_state, chunks[4]);

    match app_state.input_mode {
        InputMode::Help => draw_help_popup(f, app_state, full_area),
        InputMode::Browse => draw_browse_popup(f, app_state, full_area),
        _ => {}
    }
}

fn draw_title(f: &mut Frame, app_state: &AppState, area: Rect) {
    let workbook = app_state
        .controller
        .session()
        .and_then(|s| s.workbook_path.file_name())
        .map(|n| format!(" -> {}", n.to_string_lossy()))
        .unwrap_or_default();

    let title = Paragraph::new(format!(" Deliverables Automation{workbook} "))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(title, area);
}

fn draw_file_panel(f: &mut Frame, app_state: &AppState, area: Rect) {
    let editing = matches!(app_state.input_mode, InputMode::EditingPath);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" File Selection [b]rowse [e]dit [c]onvert ")
        .border_style(if editing {
            Style::default().fg(Color::LightCyan)
        } else {
            Style::default()
        });

    if editing {
        let inner = block.inner(area);
        f.render_widget(block, area);

        let mut text_area = app_state.text_area.clone();
        text_area.set_cursor_line_style(Style::default());
        text_area.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
        f.render_widget(text_area.widget(), inner);
        return;
    }

    let path = app_state.path_text();
    let line = if path.is_empty() {
        Line::from(Span::styled(
            "Select CSV File...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(path)
    };
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_filter_panel(f: &mut Frame, app_state: &AppState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Pivot Filter Selection [p]ivot [t] check end test [w]afermap ");

    let options = app_state.controller.filter_options();
    let selected = app_state.controller.selected_filter();

    let mut spans = vec![Span::raw("C1_MARK: ")];
    if options.is_empty() {
        spans.push(Span::styled(
            "convert a CSV to load values",
            Style::default().fg(Color::DarkGray),
        ));
    } else {
        spans.push(Span::raw("< "));
        for (i, option) in options.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            let style = if Some(option.as_str()) == selected {
                Style::default()
                    .bg(Color::LightCyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            spans.push(Span::styled(option.clone(), style));
        }
        spans.push(Span::raw(" >"));
    }

    // Values typed with :pivot may be outside the loaded list.
    if let Some(value) = selected.filter(|v| !options.iter().any(|o| o == v)) {
        spans.push(Span::styled(
            format!("  [{value}]"),
            Style::default().fg(Color::Yellow),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn level_style(level: StatusLevel) -> Style {
    match level.rgb() {
        Some((r, g, b)) => Style::default().fg(Color::Rgb(r, g, b)),
        None => Style::default(),
    }
}

fn draw_status_log(f: &mut Frame, app_state: &mut AppState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Status ");
    let visible = block.inner(area).height as usize;
    app_state.log_visible_lines = visible;

    let lines = app_state.controller.status().lines();
    let max_scroll = lines.len().saturating_sub(visible);
    if app_state.follow_log {
        app_state.log_scroll = max_scroll;
    }
    app_state.log_scroll = app_state.log_scroll.min(max_scroll);

    let text: Vec<Line> = lines
        .iter()
        .skip(app_state.log_scroll)
        .take(visible)
        .map(|line| Line::from(Span::styled(line.text.clone(), level_style(line.level))))
        .collect();

    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_status_bar(f: &mut Frame, app_state: &AppState, area: Rect) {
    if let Some(action) = app_state.pending_action {
        let working = Paragraph::new(format!("{}... please wait", action.label()))
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        f.render_widget(working, area);
        return;
    }

    match app_state.input_mode {
        InputMode::Normal => {
            let status = "?=help b=browse c=convert </>=C1_MARK p=pivot t=check w=wafermap j/k=scroll x=clear all q=exit :=command";

            let status_widget = Paragraph::new(status)
                .style(Style::default())
                .alignment(Alignment::Left);

            f.render_widget(status_widget, area);
        }

        InputMode::EditingPath => {
            let status_widget = Paragraph::new("Enter to confirm the path, Esc to cancel")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Left);

            f.render_widget(status_widget, area);
        }

        InputMode::Command => {
            let text = Line::from(vec![
                Span::styled(":", Style::default()),
                Span::styled(
                    app_state.input_buffer.clone(),
                    Style::default().fg(Color::LightCyan),
                ),
            ]);
            f.render_widget(Paragraph::new(text), area);
        }

        InputMode::Browse => {
            let status_widget =
                Paragraph::new("Enter=open/select Backspace=parent Esc=close")
                    .style(Style::default().fg(Color::DarkGray));
            f.render_widget(status_widget, area);
        }

        InputMode::Help => {
            // No status bar in help mode
        }
    }
}

fn centered_popup(area: Rect, content_width: u16, content_height: u16) -> Rect {
    let popup_width = content_width.min(area.width.saturating_sub(4));
    let popup_height = content_height.min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn draw_help_popup(f: &mut Frame, app_state: &mut AppState, area: Rect) {
    let line_count = app_state.help_text.lines().count() as u16;
    let max_line_width = app_state
        .help_text
        .lines()
        .map(|line| line.len() as u16)
        .max()
        .unwrap_or(40);

    let popup_area = centered_popup(area, max_line_width + 4, line_count + 2);
    f.render_widget(Clear, popup_area);

    let visible_lines = popup_area.height.saturating_sub(2) as usize;
    app_state.help_visible_lines = visible_lines;

    let max_scroll = (line_count as usize).saturating_sub(visible_lines);
    app_state.help_scroll = app_state.help_scroll.min(max_scroll);

    let mut title = " [ESC/Enter to close] ".to_string();

    if max_scroll > 0 {
        let scroll_indicator = if app_state.help_scroll == 0 {
            " [↓ or j to scroll] "
        } else if app_state.help_scroll >= max_scroll {
            " [↑ or k to scroll] "
        } else {
            " [↑↓ or j/k to scroll] "
        };
        title.push_str(scroll_indicator);
    }

    let help_block = Block::default()
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::LightCyan))
        .style(Style::default().bg(Color::Blue).fg(Color::White));

    let help_paragraph = Paragraph::new(app_state.help_text.clone())
        .block(help_block)
        .wrap(Wrap { trim: false })
        .scroll((app_state.help_scroll as u16, 0));

    f.render_widget(help_paragraph, popup_area);
}

fn draw_browse_popup(f: &mut Frame, app_state: &AppState, area: Rect) {
    let browser = &app_state.browser;
    let popup_area = centered_popup(area, area.width * 2 / 3, area.height * 2 / 3);
    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", browser.dir.display()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::LightCyan));

    if let Some(error) = &browser.error {
        let message = Paragraph::new(error.clone())
            .style(level_style(StatusLevel::Error))
            .block(block);
        f.render_widget(message, popup_area);
        return;
    }

    let items: Vec<ListItem> = browser
        .entries
        .iter()
        .map(|entry| ListItem::new(entry.label()))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::LightCyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(browser.selected));
    f.render_stateful_widget(list, popup_area, &mut state);
}
