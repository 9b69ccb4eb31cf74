use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use ratatui::Frame;

use crate::models::ItemStatus;

use super::forms::{ConfirmReturn, TextForm};
use super::helpers::{centered_rect, item_count, status_style};
use super::state::{Mode, ViewState};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Banner height without the detail panel.
const BANNER_HEIGHT: u16 = 4;
/// Extra rows given to the detail panel when it is expanded.
const DETAIL_HEIGHT: u16 = 6;

/// Draw one frame from `view`. Nothing here touches the ledger.
pub(crate) fn render(frame: &mut Frame, view: &ViewState) {
    let area = frame.area();
    let banner_height = if view.load_failure.is_some() && view.details_open {
        BANNER_HEIGHT + DETAIL_HEIGHT
    } else {
        BANNER_HEIGHT
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(banner_height),
            Constraint::Min(0),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(area);

    draw_banner(frame, chunks[0], view);
    draw_items(frame, chunks[1], view);
    draw_footer(frame, chunks[2], view);

    match &view.mode {
        Mode::Normal => {}
        Mode::AddingItem(form) => draw_text_form(
            frame,
            area,
            "Add Item",
            "Name",
            "New items start out available.",
            form,
        ),
        Mode::Borrowing { item, form } => draw_text_form(
            frame,
            area,
            "Borrow",
            "Borrower",
            &format!("Who is borrowing {item}?"),
            form,
        ),
        Mode::ConfirmReturn(confirm) => draw_confirm_return(frame, area, confirm),
    }
}

fn draw_banner(frame: &mut Frame, area: Rect, view: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Matériauthèque • {} ", view.title));
    frame.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let Some(failure) = &view.load_failure else {
        let line = Line::from(Span::styled(
            format!("✅ {} in the library", item_count(view.items.len())),
            Style::default().fg(Color::Green),
        ));
        frame.render_widget(Paragraph::new(line), inner);
        return;
    };

    let toggle_hint = if view.details_open {
        "[d] Hide details"
    } else {
        "[d] Show details"
    };
    let mut lines = vec![
        Line::from(Span::styled(
            "❌ Unable to load the data",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                "Check that the worksheet exists and the service account can access the sheet.  ",
                Style::default().fg(Color::Gray),
            ),
            Span::styled(toggle_hint, Style::default().fg(Color::Cyan)),
        ]),
    ];
    if view.details_open {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            failure.detail.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn draw_items(frame: &mut Frame, area: Rect, view: &ViewState) {
    if view.items.is_empty() {
        let message = if view.load_failure.is_some() {
            "Nothing to show until the sheet can be read. Press 'g' to retry."
        } else {
            "No items yet. Press '+' to add one."
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::NONE));
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Item", "Status", "Borrower"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let rows = view.items.iter().map(|item| {
        Row::new(vec![
            Cell::from(item.name.clone()),
            Cell::from(item.status.to_string()).style(status_style(item.status)),
            Cell::from(item.borrower.clone()),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(45),
            Constraint::Length(10),
            Constraint::Percentage(45),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" Items "))
    .row_highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(Some(view.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_footer(frame: &mut Frame, area: Rect, view: &ViewState) {
    let block = Block::default().borders(Borders::TOP);
    frame.render_widget(block.clone(), area);
    let inner = block.inner(area);

    let status_line = if let Some(status) = &view.status {
        Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
    } else {
        Line::from("")
    };

    let paragraph =
        Paragraph::new(vec![status_line, footer_instructions(view)]).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

/// Key hints for the current mode. Borrow and return only appear when the
/// selected item can take that transition.
fn footer_instructions(view: &ViewState) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);

    match &view.mode {
        Mode::AddingItem(_) | Mode::Borrowing { .. } => Line::from(vec![
            Span::styled("[Enter]", key_style),
            Span::raw(" Save   "),
            Span::styled("[Esc]", key_style),
            Span::raw(" Cancel"),
        ]),
        Mode::ConfirmReturn(_) => Line::from(vec![
            Span::styled("[y]", key_style),
            Span::raw(" Confirm   "),
            Span::styled("[n/Esc]", key_style),
            Span::raw(" Cancel"),
        ]),
        Mode::Normal => {
            let mut spans = vec![Span::styled("[↑↓]", key_style), Span::raw(" Select   ")];
            match view.current_item().map(|item| item.status) {
                Some(ItemStatus::Free) => {
                    spans.push(Span::styled("[b]", key_style));
                    spans.push(Span::raw(" Borrow   "));
                }
                Some(ItemStatus::OnLoan) => {
                    spans.push(Span::styled("[r]", key_style));
                    spans.push(Span::raw(" Return   "));
                }
                None => {}
            }
            spans.push(Span::styled("[+]", key_style));
            spans.push(Span::raw(" Add   "));
            spans.push(Span::styled("[g]", key_style));
            spans.push(Span::raw(" Refresh   "));
            if view.can_open_sheet {
                spans.push(Span::styled("[o]", key_style));
                spans.push(Span::raw(" Open Sheet   "));
            }
            spans.push(Span::styled("[q]", key_style));
            spans.push(Span::raw(" Quit"));
            Line::from(spans)
        }
    }
}

fn draw_text_form(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    field_name: &str,
    prompt: &str,
    form: &TextForm,
) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines = vec![
        form.build_line(field_name),
        Line::from(""),
        Line::from(Span::styled(
            prompt.to_string(),
            Style::default().fg(Color::Gray),
        )),
    ];

    if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Enter to save • Esc to cancel",
            Style::default().fg(Color::Gray),
        )));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);

    frame.set_cursor_position(input_cursor(inner, field_name, form.value_len()));
}

/// Cursor position after the typed text, kept inside `inner`.
fn input_cursor(inner: Rect, field_name: &str, value_len: usize) -> Position {
    let prefix = format!("{field_name}: ").chars().count();
    let offset = u16::try_from(prefix.saturating_add(value_len)).unwrap_or(u16::MAX);
    let last_column = inner.right().saturating_sub(1).max(inner.x);
    Position::new(inner.x.saturating_add(offset).min(last_column), inner.y)
}

fn draw_confirm_return(frame: &mut Frame, area: Rect, confirm: &ConfirmReturn) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default().title("Confirm Return").borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let mut lines = vec![
        Line::from(format!("Mark {} as returned?", confirm.item)),
        Line::from(format!("Currently borrowed by {}.", confirm.borrower)),
        Line::from(""),
    ];
    if let Some(error) = &confirm.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Press Y to confirm or N / Esc to cancel.",
        Style::default().fg(Color::Gray),
    )));

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}
