//! The chat screen: message feed above, composer below.

use parley_core::shell::{Bubble, FeedView, Screen};
use ratatui::{
  Frame,
  layout::{Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

pub fn draw(f: &mut Frame, area: Rect, screen: &Screen) {
  let Screen::Chat { feed, draft, can_submit, .. } = screen else {
    return;
  };

  let rows = Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).split(area);
  draw_feed(f, rows[0], feed);
  draw_composer(f, rows[1], draft, *can_submit);
}

fn draw_feed(f: &mut Frame, area: Rect, feed: &FeedView) {
  let block = Block::default()
    .title(" Messages ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  match feed {
    FeedView::Loading => {
      f.render_widget(placeholder("Loading…", Color::DarkGray).block(block), area);
    }
    FeedView::Failed(error) => {
      let text = format!("Couldn't load messages: {error}");
      f.render_widget(placeholder(&text, Color::Red).block(block), area);
    }
    FeedView::Empty(text) => {
      f.render_widget(placeholder(text, Color::DarkGray).block(block), area);
    }
    FeedView::Messages(bubbles) => {
      // Two columns of indent inside the borders.
      let width = block.inner(area).width.saturating_sub(2) as usize;
      let items: Vec<ListItem> = bubbles.iter().map(|b| bubble_item(b, width)).collect();
      let list = List::new(items).block(block);

      // Selecting the newest bubble keeps the list scrolled to the tail.
      let mut state = ListState::default().with_selected(bubbles.len().checked_sub(1));
      f.render_stateful_widget(list, area, &mut state);
    }
  }
}

fn placeholder(text: &str, color: Color) -> Paragraph<'static> {
  Paragraph::new(Span::styled(text.to_string(), Style::default().fg(color)))
    .wrap(Wrap { trim: true })
}

/// Break `text` into lines of at most `width` characters, at spaces where
/// possible. Words longer than a line are split.
fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
  if width == 0 {
    return vec![text.to_string()];
  }

  let mut lines = Vec::new();
  for paragraph in text.lines() {
    let mut line = String::new();
    let mut len = 0;
    for word in paragraph.split_whitespace() {
      let chars: Vec<char> = word.chars().collect();
      for chunk in chars.chunks(width) {
        if len > 0 && len + 1 + chunk.len() > width {
          lines.push(std::mem::take(&mut line));
          len = 0;
        }
        if len > 0 {
          line.push(' ');
          len += 1;
        }
        line.extend(chunk);
        len += chunk.len();
      }
    }
    lines.push(line);
  }

  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

fn bubble_item(bubble: &Bubble, width: usize) -> ListItem<'static> {
  let author_style = if bubble.own {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
  } else {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
  };
  let time = match bubble.sent_at {
    Some(at) => at.with_timezone(&chrono::Local).format("%H:%M").to_string(),
    None => "sending".to_string(),
  };

  let mut lines = vec![Line::from(vec![
    Span::styled(bubble.author.clone(), author_style),
    Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
  ])];
  lines.extend(
    wrap_to_width(&bubble.text, width)
      .into_iter()
      .map(|line| Line::from(format!("  {line}"))),
  );
  ListItem::new(lines)
}

fn draw_composer(f: &mut Frame, area: Rect, draft: &str, can_submit: bool) {
  let border = if can_submit {
    Style::default().fg(Color::Cyan)
  } else {
    Style::default().fg(Color::DarkGray)
  };
  let input = Paragraph::new(draft.to_string()).block(
    Block::default()
      .title(" Message ")
      .borders(Borders::ALL)
      .border_style(border),
  );
  f.render_widget(input, area);
}
