//! App: terminal init, main loop, fixed-step simulation and input handling.

use crate::game::Game;
use crate::input::{key_to_action, mouse_to_action, Action};
use crate::theme::Theme;
use crate::ui::Effects;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Render roughly 60 frames per second.
const FRAME_DURATION: Duration = Duration::from_millis(16);
/// After a stall, run at most this many ticks before giving up on catching up.
const MAX_CATCH_UP_TICKS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Title,
    Playing,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    game: Game,
    screen: Screen,
    paused: bool,
    tick: Duration,
    /// Wall-clock time not yet turned into simulation ticks.
    accumulator: Duration,
    last_frame: Instant,
    effects: Effects,
}

impl App {
    pub fn new(args: &Args, config: GameConfig, theme: Theme) -> Self {
        let screen = if args.no_title {
            Screen::Playing
        } else {
            Screen::Title
        };
        Self {
            game: Game::new(&config),
            config,
            theme,
            screen,
            paused: false,
            tick: Duration::from_secs_f32(1.0 / args.tick_rate),
            accumulator: Duration::ZERO,
            last_frame: Instant::now(),
            effects: Effects::default(),
        }
    }

    fn new_game(&mut self) {
        self.game = Game::new(&self.config);
        self.screen = Screen::Playing;
        self.paused = false;
        self.accumulator = Duration::ZERO;
        self.last_frame = Instant::now();
        self.effects = Effects::default();
        log::info!("new game");
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{DisableMouseCapture, EnableMouseCapture},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), DisableMouseCapture);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        if let Err(e) = &result {
            log::error!("game loop ended with error: {e:#}");
        }
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let frame_start = Instant::now();
            let flash = self.game.hud_mut().take_combo_flash();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.game,
                    &self.theme,
                    self.paused,
                    &mut self.effects,
                    flash,
                    frame_start,
                );
            })?;

            let timeout = FRAME_DURATION.saturating_sub(frame_start.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let action = match event::read()? {
                        // Only presses; repeats and releases would double-drop.
                        Event::Key(key) if key.kind == KeyEventKind::Press => key_to_action(key),
                        Event::Mouse(mouse) => mouse_to_action(mouse),
                        _ => Action::None,
                    };
                    if !self.handle_action(action) {
                        return Ok(());
                    }
                }
            }

            self.advance()?;
        }
    }

    /// Returns false when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        if action == Action::Quit {
            return false;
        }
        match self.screen {
            Screen::Title => {
                if action == Action::Primary {
                    self.new_game();
                }
            }
            Screen::Playing if self.paused => {
                if action == Action::Pause {
                    self.paused = false;
                    self.last_frame = Instant::now();
                }
            }
            Screen::Playing => match action {
                Action::Primary => self.game.primary_action(),
                Action::Restart => self.game.restart(),
                Action::Pause => self.paused = true,
                Action::Quit | Action::None => {}
            },
        }
        true
    }

    /// Turn elapsed wall time into fixed simulation ticks.
    fn advance(&mut self) -> Result<()> {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        if self.screen != Screen::Playing || self.paused {
            return Ok(());
        }

        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= self.tick {
            if steps == MAX_CATCH_UP_TICKS {
                log::debug!("dropping {:?} of simulation time after a stall", self.accumulator);
                self.accumulator = Duration::ZERO;
                break;
            }
            self.game.tick(self.tick)?;
            self.accumulator -= self.tick;
            steps += 1;
        }
        Ok(())
    }
}
