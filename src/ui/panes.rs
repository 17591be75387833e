//! Rendering logic for each TUI pane

use crate::animation::AnimationCommand;
use crate::memory::heap::HeapObject;
use crate::memory::stack::CallFrame;
use crate::snapshot::{Data, ExecutionStep, StepType};
use crate::ui::theme::DEFAULT_THEME;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Longest rendered value before truncation
const MAX_VALUE_CHARS: usize = 120;

/// Simple syntax highlighting for Python source
fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (at, c) = chars[i];

        if c == '#' {
            if !current_word.is_empty() {
                spans.push(Span::styled(current_word.clone(), get_keyword_style(&current_word, false)));
                current_word.clear();
            }
            spans.push(Span::styled(&line[at..], Style::default().fg(DEFAULT_THEME.comment)));
            break;
        }

        if c == '"' || c == '\'' {
            if !current_word.is_empty() {
                spans.push(Span::styled(current_word.clone(), get_keyword_style(&current_word, false)));
                current_word.clear();
            }
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != c {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            let stop = chars.get(end).map_or(line.len(), |(pos, _)| *pos);
            spans.push(Span::styled(&line[at..stop], Style::default().fg(DEFAULT_THEME.string)));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            if !current_word.is_empty() {
                let style = get_keyword_style(&current_word, c == '(');
                spans.push(Span::styled(current_word.clone(), style));
                current_word.clear();
            }
            let style = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    if !current_word.is_empty() {
        let style = get_keyword_style(&current_word, false);
        spans.push(Span::styled(current_word, style));
    }

    Line::from(spans)
}

fn get_keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "def" | "return" | "if" | "elif" | "else" | "while" | "for" | "in" | "not" | "and"
        | "or" | "is" | "break" | "continue" | "pass" | "import" | "from" | "as" | "lambda"
        | "try" | "except" | "finally" | "raise" | "global" | "nonlocal" | "del" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "True" | "False" | "None" => Style::default().fg(DEFAULT_THEME.number),
        "int" | "str" | "list" | "dict" | "set" | "tuple" | "float" | "bool" => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        _ if word.chars().all(|c| c.is_ascii_digit()) => Style::default().fg(DEFAULT_THEME.number),
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Clamp `scroll_offset` to the content and render the visible window
fn render_scrolled_list(
    frame: &mut Frame,
    area: Rect,
    block: Block<'_>,
    items: Vec<ListItem<'_>>,
    empty_text: &str,
    scroll_offset: &mut usize,
) {
    if items.is_empty() {
        let paragraph = Paragraph::new(empty_text.to_string())
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    if items.len() > visible_height {
        *scroll_offset = (*scroll_offset).min(items.len() - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let visible: Vec<ListItem> = items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();
    let list = List::new(visible).block(block.padding(Padding::new(1, 0, 0, 0)));
    frame.render_widget(list, area);
}

/// Render the source code pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current_line: usize,
    is_focused: bool,
    scroll_offset: &mut usize,
    target_line_row: &mut Option<usize>,
) {
    let block = pane_block(" Source Code ", is_focused);

    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Keep the current line at a fixed visual row; it starts centered
    let target_row = target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    *target_line_row = Some(target_row);

    if current_line > 0 && current_line <= total_lines {
        *scroll_offset = (current_line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            *scroll_offset = (*scroll_offset).min(total_lines - visible_height);
        } else {
            *scroll_offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;
            let num_style = if is_current {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut content = highlight_source_code(line);
            if is_current {
                for span in &mut content.spans {
                    span.style = span.style.bg(DEFAULT_THEME.current_line_bg);
                }
            }

            let mut spans = vec![Span::styled(format!("{:4} ", line_num), num_style)];
            spans.extend(content.spans);
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

fn truncate(text: String) -> String {
    if text.chars().count() <= MAX_VALUE_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_VALUE_CHARS).collect();
    cut.push('…');
    cut
}

/// Render the variables visible at the current step
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    step: Option<&ExecutionStep>,
    previous: Option<&ExecutionStep>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Variables ", is_focused);
    let items: Vec<ListItem> = step
        .map(|step| {
            step.variables_state
                .iter()
                .map(|(name, value)| {
                    // Bindings that changed on this step are drawn bold
                    let changed = previous
                        .and_then(|p| p.variable(name))
                        .map_or(true, |old| old != value);
                    let name_style = if changed {
                        Style::default()
                            .fg(DEFAULT_THEME.secondary)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(DEFAULT_THEME.fg)
                    };
                    let mut spans = vec![
                        Span::styled(name.clone(), name_style),
                        Span::styled(
                            format!(": {} = ", value.type_name()),
                            Style::default().fg(DEFAULT_THEME.type_name),
                        ),
                    ];
                    spans.extend(highlight_value_string(&truncate(value.to_string())));
                    ListItem::new(Line::from(spans))
                })
                .collect()
        })
        .unwrap_or_default();
    render_scrolled_list(frame, area, block, items, "(no variables)", scroll_offset);
}

/// Render the call stack, innermost frame first
pub fn render_call_stack_pane(
    frame: &mut Frame,
    area: Rect,
    call_stack: &[Arc<CallFrame>],
    expression_value: Option<&Data>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Call Stack ", is_focused);
    let mut items = Vec::new();
    for (depth, frame_record) in call_stack.iter().rev().enumerate() {
        let name_style = if depth == 0 {
            Style::default()
                .fg(DEFAULT_THEME.function)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.comment)
        };
        let args = frame_record
            .arguments
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        items.push(ListItem::new(Line::from(vec![
            Span::styled(frame_record.function_name.clone(), name_style),
            Span::styled(truncate(format!("({})", args)), Style::default().fg(DEFAULT_THEME.fg)),
            Span::styled(
                format!("  line {}", frame_record.line_number),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
        ])));
    }
    if let Some(value) = expression_value {
        let mut spans = vec![Span::styled(
            "→ ",
            Style::default().fg(DEFAULT_THEME.return_value),
        )];
        spans.extend(highlight_value_string(&truncate(value.to_string())));
        items.push(ListItem::new(Line::from(spans)));
    }
    render_scrolled_list(frame, area, block, items, "<module>", scroll_offset);
}

/// Render the live containers of the current step
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    heap_state: &BTreeMap<u64, Arc<HeapObject>>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Heap ", is_focused);
    let items: Vec<ListItem> = heap_state
        .values()
        .map(|object| {
            let mut spans = vec![
                Span::styled(
                    format!("#{} ", object.object_id),
                    Style::default().fg(DEFAULT_THEME.secondary),
                ),
                Span::styled(object.type_name, Style::default().fg(DEFAULT_THEME.type_name)),
                Span::styled(
                    format!(" {}B ", object.size),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
            ];
            spans.extend(highlight_value_string(&truncate(object.value.to_string())));
            if !object.references.is_empty() {
                let refs = object
                    .references
                    .iter()
                    .map(|id| format!("#{}", id))
                    .collect::<Vec<_>>()
                    .join(" ");
                spans.push(Span::styled(
                    format!("  → {}", refs),
                    Style::default().fg(DEFAULT_THEME.comment),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    render_scrolled_list(frame, area, block, items, "(no containers)", scroll_offset);
}

/// Render captured stdout, with stderr lines in the error color
pub fn render_output_pane(
    frame: &mut Frame,
    area: Rect,
    stdout: &str,
    stderr: &str,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Output ", is_focused);
    let items: Vec<ListItem> = stdout
        .lines()
        .map(|line| ListItem::new(line.to_string()).style(Style::default().fg(DEFAULT_THEME.fg)))
        .chain(
            stderr
                .lines()
                .map(|line| ListItem::new(line.to_string()).style(Style::default().fg(DEFAULT_THEME.error))),
        )
        .collect();
    render_scrolled_list(frame, area, block, items, "(no output)", scroll_offset);
}

/// Render the animation commands attached to the current step
pub fn render_animation_pane(
    frame: &mut Frame,
    area: Rect,
    adapter: Option<&str>,
    commands: &[&AnimationCommand],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let title = format!(" Animation: {} ", adapter.unwrap_or("none"));
    let block = pane_block(&title, is_focused);
    let items: Vec<ListItem> = commands
        .iter()
        .map(|cmd| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<12}", cmd.command_type.as_str()),
                    Style::default()
                        .fg(DEFAULT_THEME.keyword)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(truncate(cmd.to_string()), Style::default().fg(DEFAULT_THEME.fg)),
            ]))
        })
        .collect();
    render_scrolled_list(frame, area, block, items, "(no commands at this step)", scroll_offset);
}

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    step: Option<&ExecutionStep>,
    current_step: usize,
    total_steps: usize,
    is_playing: bool,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let step_kind = step.map_or("-", |s| s.step_type.as_str());
    let kind_color = match step.map(|s| s.step_type) {
        Some(StepType::Exception) => DEFAULT_THEME.error,
        Some(StepType::Condition) if step.and_then(|s| s.condition_result) == Some(false) => {
            DEFAULT_THEME.error
        }
        _ => DEFAULT_THEME.success,
    };
    let left_spans = vec![
        Span::styled(
            format!(" Step {}/{} ", (current_step + 1).min(total_steps), total_steps),
            Style::default()
                .bg(DEFAULT_THEME.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", step_kind),
            Style::default().bg(kind_color).fg(Color::Black),
        ),
        Span::styled(
            format!(" {} ", message),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.fg),
        ),
    ];
    frame.render_widget(
        Paragraph::new(Line::from(left_spans))
            .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
            .alignment(Alignment::Left),
        layout[0],
    );

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.fg);
    let sep_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.comment);

    let mut right_spans = Vec::new();
    for (key, desc) in [
        (" ←/→ ", " step "),
        (" 1-9 ", " jump "),
        (" ⎵ ", " play "),
        (" ↵ / ⌫ ", " end/start "),
        (" ⇥ ", " focus "),
        ("q", " quit "),
    ] {
        if !right_spans.is_empty() {
            right_spans.push(Span::styled("│", sep_style));
            right_spans.push(Span::styled(" ", desc_style));
        }
        right_spans.push(Span::styled(key, key_style));
        right_spans.push(Span::styled(desc, desc_style));
    }

    let badge = if is_playing {
        Some((" ▶ PLAYING ", DEFAULT_THEME.secondary))
    } else if current_step + 1 >= total_steps {
        Some((" END ", DEFAULT_THEME.error))
    } else if current_step == 0 {
        Some((" START ", DEFAULT_THEME.success))
    } else {
        None
    };
    if let Some((text, color)) = badge {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(Span::styled(
            text,
            Style::default()
                .bg(color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(right_spans))
            .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
            .alignment(Alignment::Right),
        layout[1],
    );
}

/// Tokenize a `repr` string and color its literals
fn highlight_value_string(s: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut current_token = String::new();
    let mut quote: Option<char> = None;

    for c in s.chars() {
        if let Some(q) = quote {
            current_token.push(c);
            if c == q {
                quote = None;
                spans.push(style_token(&current_token));
                current_token.clear();
            }
            continue;
        }
        if c == '\'' || c == '"' {
            quote = Some(c);
            current_token.push(c);
            continue;
        }
        if matches!(c, '[' | ']' | '{' | '}' | '(' | ')' | ',' | ':' | ' ') {
            if !current_token.is_empty() {
                spans.push(style_token(&current_token));
                current_token.clear();
            }
            spans.push(Span::styled(c.to_string(), Style::default().fg(DEFAULT_THEME.fg)));
            continue;
        }
        current_token.push(c);
    }

    if !current_token.is_empty() {
        spans.push(style_token(&current_token));
    }
    spans
}

fn style_token(token: &str) -> Span<'static> {
    let color = if token == "None" || token == "True" || token == "False" {
        DEFAULT_THEME.number
    } else if token.starts_with('\'') || token.starts_with('"') {
        DEFAULT_THEME.string
    } else if token.parse::<f64>().is_ok() {
        DEFAULT_THEME.number
    } else {
        DEFAULT_THEME.fg
    };
    Span::styled(token.to_string(), Style::default().fg(color))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[Span]) -> Vec<String> {
        spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_keeps_source_text() {
        let line = "for x in arr:  # 'loop'";
        let highlighted = highlight_source_code(line);
        assert_eq!(texts(&highlighted.spans).concat(), line);
        assert_eq!(highlighted.spans[0].style.fg, Some(DEFAULT_THEME.keyword));
    }

    #[test]
    fn test_value_string_keeps_quoted_separators() {
        let spans = highlight_value_string("['a, b', 3]");
        assert!(texts(&spans).contains(&"'a, b'".to_string()));
        assert_eq!(texts(&spans).concat(), "['a, b', 3]");
    }

    #[test]
    fn test_truncate_long_values() {
        let long = "x".repeat(MAX_VALUE_CHARS + 10);
        assert_eq!(truncate(long).chars().count(), MAX_VALUE_CHARS + 1);
        assert_eq!(truncate("short".to_string()), "short");
    }
}
