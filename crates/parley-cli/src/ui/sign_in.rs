//! The auth prompt: welcome text, account picker, new-account form.

use ratatui::{
  Frame,
  layout::{Constraint, Flex, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::{AccountForm, FormField, Picker, Prompt};

pub fn draw(f: &mut Frame, area: Rect, prompt: &Prompt) {
  let [column] = Layout::horizontal([Constraint::Max(56)])
    .flex(Flex::Center)
    .areas(area);

  match prompt {
    Prompt::Idle => draw_welcome(f, column),
    Prompt::Picker(picker) => draw_picker(f, column, picker),
    Prompt::NewAccount(form) => draw_form(f, column, form),
  }
}

fn draw_welcome(f: &mut Frame, area: Rect) {
  let [card] = Layout::vertical([Constraint::Length(6)])
    .flex(Flex::Center)
    .areas(area);

  let block = Block::default()
    .title(" Sign in ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let text = vec![
    Line::from(Span::styled(
      "Welcome to Parley",
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
    Line::from(Span::styled(
      "Press Enter to choose an account.",
      Style::default().fg(Color::DarkGray),
    )),
  ];
  f.render_widget(Paragraph::new(text).block(block).centered(), card);
}

fn draw_picker(f: &mut Frame, area: Rect, picker: &Picker) {
  let rows = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(area);

  let search = Paragraph::new(format!("/{}", picker.filter)).block(
    Block::default()
      .title(" Choose an account ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Cyan)),
  );
  f.render_widget(search, rows[0]);

  let mut items: Vec<ListItem> = picker
    .filtered()
    .into_iter()
    .map(|account| {
      let mut spans = vec![Span::raw(account.display_name.clone())];
      if let Some(email) = &account.email {
        spans.push(Span::styled(
          format!("  {email}"),
          Style::default().fg(Color::DarkGray),
        ));
      }
      ListItem::new(Line::from(spans))
    })
    .collect();
  items.push(ListItem::new(Span::styled(
    "+ Use another account",
    Style::default().fg(Color::Yellow),
  )));

  let list = List::new(items)
    .block(Block::default().borders(Borders::ALL))
    .highlight_style(
      Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▶ ");

  let mut state = ListState::default().with_selected(Some(picker.cursor));
  f.render_stateful_widget(list, rows[1], &mut state);
}

fn draw_form(f: &mut Frame, area: Rect, form: &AccountForm) {
  let [card] = Layout::vertical([Constraint::Length(8)])
    .flex(Flex::Center)
    .areas(area);

  let block = Block::default()
    .title(" Use another account ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(card);
  f.render_widget(block, card);

  let fields = Layout::vertical([Constraint::Length(3), Constraint::Length(3)]).split(inner);
  for (i, (label, value, field)) in [
    ("Name", &form.display_name, FormField::DisplayName),
    ("Email", &form.email, FormField::Email),
  ]
  .into_iter()
  .enumerate()
  {
    let border = if form.focus == field {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(value.as_str()).block(
      Block::default()
        .title(format!(" {label} "))
        .borders(Borders::ALL)
        .border_style(border),
    );
    f.render_widget(input, fields[i]);
  }
}
