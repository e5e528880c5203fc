//! Layout and drawing: title, tower scene, sidebar, pause and game-over panels.

use crate::app::Screen;
use crate::crane::PlacementStatus;
use crate::feedback::RisingScore;
use crate::game::Game;
use crate::physics::{BLOCK_HALF_HEIGHT, BLOCK_HALF_WIDTH, PEDESTAL_HALF_WIDTH, Physics, Transform};
use crate::theme::Theme;
use glam::Vec3;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal cells are about twice as tall as wide.
const COLS_PER_UNIT: f32 = 2.0;
const ROWS_PER_UNIT: f32 = 1.0;
const SIDEBAR_WIDTH: u16 = 26;
const COMBO_FLASH_MS: u32 = 350;
/// Rising score labels climb this many world units over their lifetime.
const RISE_UNITS: f32 = 3.0;

/// Running tachyonfx effects and the time they were last advanced.
#[derive(Default)]
pub struct Effects {
    combo_flash: Option<Effect>,
    last_process: Option<Instant>,
}

/// Draw current screen with the pause overlay on top when paused.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    game: &Game,
    theme: &Theme,
    paused: bool,
    effects: &mut Effects,
    start_flash: bool,
    now: Instant,
) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());
    match screen {
        Screen::Title => draw_title(frame, theme, area),
        Screen::Playing => {
            draw_game(frame, game, theme, area, effects, start_flash, now);
            if paused {
                draw_pause_overlay(frame, theme, area);
            } else if game.score().is_finalized() {
                let text = game.hud().game_over_text.as_deref().unwrap_or("Game over");
                draw_game_over(frame, game, theme, area, text);
            }
        }
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_title(frame: &mut Frame, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("T O W E R T U I", title_style)),
        Line::from(""),
    ];
    // A little stair of blocks in the tower colours.
    for (i, offset) in [0usize, 1, 0, 2, 1].iter().enumerate().rev() {
        let pad = " ".repeat(*offset);
        lines.push(Line::from(vec![
            Span::raw(pad),
            Span::styled("████", Style::default().fg(theme.block_color(i))),
        ]));
    }
    lines.extend([
        Line::from(Span::styled("▀▀▀▀▀▀▀▀▀▀", Style::default().fg(theme.div_line))),
        Line::from(""),
        Line::from(Span::styled("Space / Enter / Click  Start", fg)),
        Line::from(Span::styled("Q / Esc  Quit", Style::default().fg(theme.inactive_fg))),
    ]);
    let popup = centered(area, 40, lines.len() as u16 + 2);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line)),
        )
        .render(popup, frame.buffer_mut());
}

/// Draw game: tower scene on the left, sidebar on the right.
fn draw_game(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    area: Rect,
    effects: &mut Effects,
    start_flash: bool,
    now: Instant,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Fill(1), Constraint::Length(SIDEBAR_WIDTH)])
        .split(area);
    draw_scene(frame, game, theme, chunks[0]);
    let combo_area = draw_sidebar(frame, game, theme, chunks[1]);
    apply_combo_flash(frame, theme, combo_area, effects, start_flash, now);
}

/// World-to-cell mapping centred on the camera; the camera sits a third of
/// the way down so the tower has room below it.
struct Viewport {
    area: Rect,
    camera: Vec3,
}

impl Viewport {
    fn to_cell(&self, p: Vec3) -> (i32, i32) {
        let col = self.area.x as i32
            + self.area.width as i32 / 2
            + ((p.x - self.camera.x) * COLS_PER_UNIT).round() as i32;
        let row = self.area.y as i32
            + self.area.height as i32 / 3
            + ((self.camera.y - p.y) * ROWS_PER_UNIT).round() as i32;
        (col, row)
    }

    fn put(&self, buf: &mut Buffer, col: i32, row: i32, ch: char, fg: Color) {
        let inside = col >= self.area.left() as i32
            && col < self.area.right() as i32
            && row >= self.area.top() as i32
            && row < self.area.bottom() as i32;
        if !inside {
            return;
        }
        if let Some(cell) = buf.cell_mut((col as u16, row as u16)) {
            cell.set_char(ch).set_fg(fg);
        }
    }

    fn text(&self, buf: &mut Buffer, col: i32, row: i32, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.put(buf, col + i as i32, row, ch, fg);
        }
    }

    /// Fill the world-space rectangle around `centre`.
    fn fill(&self, buf: &mut Buffer, centre: Vec3, half: Vec3, ch: char, fg: Color) {
        let (left, top) = self.to_cell(centre + Vec3::new(-half.x, half.y, 0.0));
        let (right, bottom) = self.to_cell(centre + Vec3::new(half.x, -half.y, 0.0));
        for row in top..bottom {
            for col in left..right {
                self.put(buf, col, row, ch, fg);
            }
        }
    }
}

fn draw_scene(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let border = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line))
        .title(Span::styled(scene_title(game), Style::default().fg(theme.title)));
    let inner = border.inner(area);
    border.render(area, frame.buffer_mut());

    let view = Viewport {
        area: inner,
        camera: game.camera().position(),
    };
    let buf = frame.buffer_mut();
    let crane = game.crane();

    // Pedestal: a slab from y=0 down to y=-2.
    view.fill(
        buf,
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(PEDESTAL_HALF_WIDTH, 1.0, 0.0),
        '▓',
        theme.div_line,
    );

    let threshold = crane.death_threshold();
    if threshold > 0.0 {
        let (_, row) = view.to_cell(Vec3::new(0.0, threshold, 0.0));
        for col in inner.left()..inner.right() {
            if col % 2 == 0 {
                view.put(buf, col as i32, row, '┄', theme.inactive_fg);
            }
        }
    }

    // Crane beam and chain down to the anchor.
    let (cx, cy) = view.to_cell(crane.position());
    view.text(buf, cx - 3, cy, "═══╦═══", theme.main_fg);
    let (_, anchor_row) = view.to_cell(crane.anchor());
    for row in cy + 1..=anchor_row {
        view.put(buf, cx, row, '│', theme.div_line);
    }

    let half = Vec3::new(BLOCK_HALF_WIDTH, BLOCK_HALF_HEIGHT, 0.0);
    for (i, block) in crane.tower().iter().enumerate() {
        let Some(t) = game.physics().transform(block.id) else {
            continue;
        };
        let color = if game.is_frozen(block.id) {
            theme.inactive_fg
        } else if block.status == PlacementStatus::Dropped {
            theme.title
        } else {
            theme.block_color(i)
        };
        view.fill(buf, t.position, half, block_glyph(&t), color);
    }
    // Mark the block the next drop will be measured against.
    let reference = if crane.holding().is_some() {
        crane.last_dropped()
    } else {
        crane.last_placed()
    };
    if let Some(t) = reference.and_then(|id| game.physics().transform(id)) {
        let (col, row) = view.to_cell(t.position + Vec3::new(-BLOCK_HALF_WIDTH, 0.0, 0.0));
        view.put(buf, col - 1, row, '▸', theme.title);
    }

    if let Some(held) = crane.holding() {
        if let Some(t) = game.physics().transform(held.id) {
            let scale = held.model_scale.sample(game.now()).max(0.0);
            view.fill(
                buf,
                t.position,
                half * scale,
                block_glyph(&t),
                theme.block_color(crane.tower().len()),
            );
        }
    }

    if let Some(at) = game.hud().last_placed_at {
        for popup in &game.hud().popups {
            draw_rising_score(&view, buf, at, popup);
        }
    }
}

fn scene_title(game: &Game) -> &'static str {
    if game.camera().is_following() {
        " Towertui "
    } else {
        " Towertui  recap "
    }
}

/// Solid while upright, shaded once a block tips over.
fn block_glyph(t: &Transform) -> char {
    if t.up().x.abs() > 0.3 { '▒' } else { '█' }
}

fn accuracy_color(accuracy: f32) -> Color {
    if accuracy >= 8.0 {
        Color::Green
    } else if accuracy >= 4.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn draw_rising_score(view: &Viewport, buf: &mut Buffer, at: Vec3, popup: &RisingScore) {
    let lift = 2.0 * BLOCK_HALF_HEIGHT + popup.progress() * RISE_UNITS;
    let (col, row) = view.to_cell(at + Vec3::new(0.0, lift, 0.0));
    let col = col - popup.label.chars().count() as i32 / 2;
    view.text(buf, col, row, &popup.label, accuracy_color(popup.accuracy));
}

fn sidebar_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

/// Returns the combo panel's area so the flash effect can target it.
fn draw_sidebar(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) -> Rect {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let hud = game.hud();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // Stats
            Constraint::Length(1),
            Constraint::Length(4), // Combo (label + timer bar)
            Constraint::Length(1),
            Constraint::Length(7), // Controls
            Constraint::Fill(1),
        ])
        .split(area);

    let stats_block = sidebar_block(theme);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score:  ", title_style),
            Span::styled(hud.score_text.as_str(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Height: ", title_style),
            Span::styled(hud.height_text.as_str(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Blocks: ", title_style),
            Span::styled(game.crane().tower().len().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Crane:  ", title_style),
            Span::styled(format!("{:?}", game.crane().phase()), fg_style),
        ]),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let combo_block = sidebar_block(theme);
    let combo_inner = combo_block.inner(chunks[2]);
    combo_block.render(chunks[2], frame.buffer_mut());
    let combo_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(combo_inner);
    let combo_label = if hud.combo_panel_visible {
        format!("Combo x{}", hud.combo_text)
    } else {
        "Combo".to_string()
    };
    let label_style = if hud.combo_panel_visible {
        title_style
    } else {
        Style::default().fg(theme.inactive_fg)
    };
    Paragraph::new(Line::from(Span::styled(combo_label, label_style)))
        .render(combo_layout[0], frame.buffer_mut());
    let ratio = game.score().combo_remaining(game.now());
    let bar_color = if ratio > 0.6 {
        Color::Green
    } else if ratio > 0.3 {
        Color::Yellow
    } else {
        Color::Red
    };
    Gauge::default()
        .ratio(ratio as f64)
        .label("")
        .gauge_style(Style::default().fg(bar_color))
        .render(combo_layout[1], frame.buffer_mut());

    let help_block = sidebar_block(theme);
    let help_inner = help_block.inner(chunks[4]);
    help_block.render(chunks[4], frame.buffer_mut());
    let hint = Style::default().fg(theme.inactive_fg);
    let help = vec![
        Line::from(vec![Span::styled("Space ", title_style), Span::styled("drop", hint)]),
        Line::from(vec![Span::styled("Click ", title_style), Span::styled("drop", hint)]),
        Line::from(vec![Span::styled("R     ", title_style), Span::styled("restart", hint)]),
        Line::from(vec![Span::styled("P     ", title_style), Span::styled("pause", hint)]),
        Line::from(vec![Span::styled("Q     ", title_style), Span::styled("quit", hint)]),
    ];
    Paragraph::new(Text::from(help)).render(help_inner, frame.buffer_mut());

    chunks[2]
}

/// Start a flash on the combo panel for each combo hit and keep it running.
fn apply_combo_flash(
    frame: &mut Frame,
    theme: &Theme,
    area: Rect,
    effects: &mut Effects,
    start_flash: bool,
    now: Instant,
) {
    let delta = effects
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    effects.last_process = Some(now);

    if start_flash {
        let effect = fx::fade_from(theme.bg, theme.title, (COMBO_FLASH_MS, Interpolation::QuadOut))
            .with_area(area);
        effects.combo_flash = Some(effect);
    }
    if let Some(effect) = effects.combo_flash.as_mut() {
        frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
    }
    if effects.combo_flash.as_ref().is_some_and(Effect::done) {
        effects.combo_flash = None;
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P  Resume    Q  Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect, text: &str) {
    let popup = centered(area, 34, 6);
    let hint = if game.camera().descent_in_progress(game.now()) {
        "Looking back down..."
    } else {
        "Space / R  Play again"
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(text, Style::default().fg(theme.title))),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(theme.main_fg))),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Game over ", Style::default().fg(Color::Red))),
        )
        .render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> Viewport {
        Viewport {
            area: Rect::new(0, 0, 40, 30),
            camera: Vec3::new(0.0, 10.0, -20.0),
        }
    }

    #[test]
    fn test_camera_maps_to_upper_third() {
        assert_eq!(view().to_cell(Vec3::new(0.0, 10.0, 0.0)), (20, 10));
    }

    #[test]
    fn test_world_up_is_screen_up() {
        let v = view();
        let (c0, r0) = v.to_cell(Vec3::new(0.0, 0.0, 0.0));
        let (c1, r1) = v.to_cell(Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(c1 - c0, 2);
        assert_eq!(r0 - r1, 2);
    }

    #[test]
    fn test_block_fill_covers_four_by_two_cells() {
        let v = view();
        let mut buf = Buffer::empty(v.area);
        v.fill(
            &mut buf,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(BLOCK_HALF_WIDTH, BLOCK_HALF_HEIGHT, 0.0),
            '█',
            Color::Red,
        );
        let filled = buf.content.iter().filter(|c| c.symbol() == "█").count();
        assert_eq!(filled, 8);
    }

    #[test]
    fn test_put_outside_area_is_ignored() {
        let v = view();
        let mut buf = Buffer::empty(v.area);
        v.put(&mut buf, -1, 5, 'x', Color::Red);
        v.put(&mut buf, 40, 5, 'x', Color::Red);
        assert!(buf.content.iter().all(|c| c.symbol() == " "));
    }

    #[test]
    fn test_accuracy_colours() {
        assert_eq!(accuracy_color(10.0), Color::Green);
        assert_eq!(accuracy_color(5.0), Color::Yellow);
        assert_eq!(accuracy_color(0.0), Color::Red);
    }
}
