//! TUI rendering — draws the screen selected by [`parley_core::shell::compose`].

pub mod chat;
pub mod sign_in;

use chrono::Local;
use parley_core::shell::Screen;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Flex, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, Prompt};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();
  let screen = app.screen();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], &screen);
  match &screen {
    Screen::Resolving => draw_resolving(f, rows[1]),
    Screen::SignIn => sign_in::draw(f, rows[1], &app.prompt),
    Screen::Chat { .. } => chat::draw(f, rows[1], &screen),
  }
  draw_status(f, rows[2], app, &screen);

  if let Some(notice) = &app.notice {
    draw_notice(f, area, notice);
  }
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, screen: &Screen) {
  let date = Local::now().format("%Y-%m-%d").to_string();

  let left = Span::styled(
    " parley",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let who = match screen {
    Screen::Chat { identity, .. } => format!("{}  {date} ", identity.display_name),
    _ => format!("{date} "),
  };
  let right = Span::styled(who, Style::default().fg(Color::Gray));

  // Simple left-right header: pad the middle.
  let left_width = left.width() as u16;
  let right_width = right.width() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_resolving(f: &mut Frame, area: Rect) {
  let [center] = Layout::vertical([Constraint::Length(1)])
    .flex(Flex::Center)
    .areas(area);
  f.render_widget(
    Paragraph::new(Span::styled("Loading…", Style::default().fg(Color::DarkGray)))
      .centered(),
    center,
  );
}

/// A blocking notice, drawn over everything else.
fn draw_notice(f: &mut Frame, area: Rect, notice: &str) {
  let [row] = Layout::vertical([Constraint::Length(5)])
    .flex(Flex::Center)
    .areas(area);
  let [popup] = Layout::horizontal([Constraint::Percentage(60)])
    .flex(Flex::Center)
    .areas(row);

  let block = Block::default()
    .title(" Authentication error ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));
  let text = vec![
    Line::from(notice.to_string()),
    Line::from(Span::styled(
      "Enter/Esc dismiss",
      Style::default().fg(Color::DarkGray),
    )),
  ];

  f.render_widget(Clear, popup);
  f.render_widget(
    Paragraph::new(text).block(block).wrap(Wrap { trim: true }),
    popup,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App, screen: &Screen) {
  let (mode_label, hints) = match screen {
    Screen::Resolving => ("LOADING", "q quit"),
    Screen::SignIn => match &app.prompt {
      Prompt::Idle => ("SIGN IN", "Enter sign in  q quit"),
      Prompt::Picker(_) => ("ACCOUNTS", "Type to filter  ↑↓ select  Enter choose  Esc cancel"),
      Prompt::NewAccount(_) => ("ACCOUNT", "Tab switch field  Enter continue  Esc cancel"),
    },
    Screen::Chat { .. } => ("CHAT", "Enter send  Esc clear  Ctrl-O sign out  Ctrl-C quit"),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::DarkGray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
