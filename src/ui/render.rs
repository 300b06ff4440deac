//! 界面渲染
//!
//! 根据 UiState 与 input_buffer 绘制：左侧对话（最终回复中的 {{label}} 替换为分类卡片或缺失标记），
//! 右侧分类卡片栏（窗口过窄时隐藏），底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

use crate::agent::TranscriptEntry;
use crate::core::{AgentPhase, UiState};
use crate::memory::{CategoryEntry, CategoryMap};
use crate::render::{missing_marker, segments, Segment};

/// 宽度不足时不显示分类栏
pub const SIDEBAR_MIN_WIDTH: u16 = 100;
const SIDEBAR_PERCENT: u16 = 32;
const MAX_QUOTE_CHARS: usize = 140;

fn card_lines(entry: &CategoryEntry) -> Vec<Line<'static>> {
    let accent = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("▣ {}", entry.label), accent),
        Span::styled(
            format!(
                "  {} reviews · avg {:.1} · {}",
                entry.count, entry.avg_score, entry.sentiment
            ),
            Style::default().fg(Color::Gray),
        ),
    ])];
    if !entry.themes.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {}", entry.themes.join(", ")),
            Style::default().fg(Color::Magenta),
        )));
    }
    if let Some(quote) = entry.quotes.first() {
        let quote: String = quote.chars().take(MAX_QUOTE_CHARS).collect();
        lines.push(Line::from(Span::styled(
            format!("  “{}”", quote),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

/// 把助手回复转为行：普通文本按换行拆分，卡片独占若干行，缺失标记内联为红色
pub fn reply_lines(text: &str, categories: &CategoryMap) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    for seg in segments(text, categories) {
        match seg {
            Segment::Text(t) => {
                let mut parts = t.split('\n').peekable();
                while let Some(part) = parts.next() {
                    if !part.is_empty() {
                        current.push(Span::raw(part.to_string()));
                    }
                    if parts.peek().is_some() {
                        lines.push(Line::from(std::mem::take(&mut current)));
                    }
                }
            }
            Segment::Card(entry) => {
                if !current.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                lines.extend(card_lines(&entry));
            }
            Segment::Missing(label) => current.push(Span::styled(
                missing_marker(&label),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn transcript_lines(state: &UiState) -> Vec<Line<'static>> {
    let mut out: Vec<Line> = Vec::new();
    for (idx, entry) in state.transcript.iter().enumerate() {
        if idx > 0 {
            out.push(Line::from(""));
        }
        let (prefix, color, body) = match entry {
            TranscriptEntry::User(t) => ("You  ", Color::Cyan, vec![Line::from(t.clone())]),
            TranscriptEntry::Assistant(t) => ("Atlas", Color::Green, reply_lines(t, &state.categories)),
            TranscriptEntry::Notice(t) => (
                "  ·  ",
                Color::Yellow,
                vec![Line::from(Span::styled(t.clone(), Style::default().fg(Color::Yellow)))],
            ),
            TranscriptEntry::Error(t) => (
                "  !  ",
                Color::Red,
                vec![Line::from(Span::styled(t.clone(), Style::default().fg(Color::Red)))],
            ),
        };
        for (i, line) in body.into_iter().enumerate() {
            let pref = if i == 0 { prefix } else { "     " };
            let mut spans = vec![
                Span::styled(pref, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
            ];
            spans.extend(line.spans);
            out.push(Line::from(spans));
        }
    }
    out
}

/// 估算换行后的行数
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    if width == 0 {
        return lines.len();
    }
    lines.iter().map(|l| l.width().max(1).div_ceil(width)).sum()
}

fn draw_sidebar(f: &mut Frame, area: Rect, categories: &CategoryMap) {
    let mut lines: Vec<Line> = Vec::new();
    if categories.is_empty() {
        lines.push(Line::from(Span::styled(
            "还没有保存的分类",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (idx, entry) in categories.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        lines.extend(card_lines(entry));
    }
    let block = Block::default()
        .title(format!(" 分类 ({}) ", categories.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    f.render_widget(
        Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// 绘制一帧；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    progress: Option<&str>,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    let input_height = 5u16;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(input_height)])
        .split(f.area());

    let (conv_area, sidebar) = if rows[0].width >= SIDEBAR_MIN_WIDTH {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(100 - SIDEBAR_PERCENT),
                Constraint::Percentage(SIDEBAR_PERCENT),
            ])
            .split(rows[0]);
        (cols[0], Some(cols[1]))
    } else {
        (rows[0], None)
    };

    let phase_str: String = match &state.phase {
        AgentPhase::Idle => "空闲".to_string(),
        AgentPhase::Thinking | AgentPhase::ToolExecuting => {
            progress.map(String::from).unwrap_or_else(|| "思考中…".to_string())
        }
        AgentPhase::Error => "错误".to_string(),
    };
    let title = format!(" Review Atlas │ {} │ {} ", state.model, phase_str);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let text_lines = transcript_lines(state);
    let inner = block.inner(conv_area);
    let content_width = inner.width.saturating_sub(1) as usize; // 滚动条
    let content_height = inner.height as usize;
    let total_lines = wrapped_height(&text_lines, content_width);
    let max_scroll = total_lines.saturating_sub(content_height);
    let scroll_offset = conversation_scroll.min(max_scroll);

    let paragraph = Paragraph::new(Text::from(text_lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((scroll_offset as u16, 0));
    f.render_widget(paragraph, conv_area);

    if total_lines > content_height {
        let mut scrollbar_state = ScrollbarState::new(total_lines)
            .position(scroll_offset)
            .viewport_content_length(content_height);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_symbol("█")
            .track_symbol(Some("░"));
        f.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
    }

    if let Some(area) = sidebar {
        draw_sidebar(f, area, &state.categories);
    }

    let input_prompt = if let Some(err) = &state.error_message {
        format!(" 错误: {} ", err.chars().take(60).collect::<String>())
    } else if state.input_locked {
        " 等待回复… ".to_string()
    } else {
        " 输入 ".to_string()
    };
    let border_color = if state.error_message.is_some() {
        Color::Red
    } else {
        Color::Blue
    };

    let hint = " Enter 发送 │ ↑↓ PgUp/PgDn 滚动 │ Ctrl+C 取消 │ Ctrl+L 清空 │ Ctrl+Q 退出 ";
    let input_block = Block::default()
        .title(input_prompt)
        .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let input = Paragraph::new(input_buffer)
        .block(input_block)
        .wrap(Wrap { trim: false })
        .style(if state.input_locked {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        });
    f.render_widget(input, rows[1]);

    out.0 = total_lines;
    out.1 = content_height;
}
