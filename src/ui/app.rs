//! Trace player state and event loop

use crate::animation::AnimationCommand;
use crate::snapshot::ExecutionStep;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::collections::BTreeMap;
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Output,
    Variables,
    CallStack,
    Heap,
    Animation,
}

impl FocusedPane {
    /// Move focus to the next pane (left column top to bottom, then right)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Variables,
            FocusedPane::Variables => FocusedPane::CallStack,
            FocusedPane::CallStack => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Animation,
            FocusedPane::Animation => FocusedPane::Source,
        }
    }
}

/// The trace player: a recorded step list navigated forward and backward
pub struct App {
    steps: Vec<ExecutionStep>,
    /// Commands of the primary adapter
    commands: Vec<AnimationCommand>,
    adapter: Option<String>,
    source_code: String,
    position: usize,

    pub focused_pane: FocusedPane,
    source_scroll: usize,
    variables_scroll: usize,
    stack_scroll: usize,
    heap_scroll: usize,
    output_scroll: usize,
    animation_scroll: usize,

    /// Visual row the current line is pinned to (None until first render)
    target_line_row: Option<usize>,

    pub should_quit: bool,
    pub status_message: String,
    pub is_playing: bool,
    last_play_time: Instant,
    last_space_press: Instant,
}

impl App {
    pub fn new(
        steps: Vec<ExecutionStep>,
        commands: Vec<AnimationCommand>,
        adapter: Option<String>,
        source_code: String,
    ) -> Self {
        let long_ago = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        App {
            steps,
            commands,
            adapter,
            source_code,
            position: 0,
            focused_pane: FocusedPane::Source,
            source_scroll: 0,
            variables_scroll: 0,
            stack_scroll: 0,
            heap_scroll: 0,
            output_scroll: 0,
            animation_scroll: 0,
            target_line_row: None,
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: long_ago,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_step(&self) -> Option<&ExecutionStep> {
        self.steps.get(self.position)
    }

    /// Commands tagged with the current step (merged runs included)
    pub fn current_commands(&self) -> Vec<&AnimationCommand> {
        let Some(step) = self.current_step() else {
            return Vec::new();
        };
        self.commands
            .iter()
            .filter(|cmd| cmd.covers_step(step.step_number))
            .collect()
    }

    /// Advance up to `n` steps; returns how many were taken
    pub fn step_forward_by(&mut self, n: usize) -> usize {
        let last = self.steps.len().saturating_sub(1);
        let taken = n.min(last.saturating_sub(self.position));
        self.position += taken;
        if taken > 0 {
            self.output_scroll = usize::MAX;
        }
        taken
    }

    pub fn step_backward(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.position -= 1;
        self.output_scroll = usize::MAX;
        true
    }

    pub fn jump_to_end(&mut self) {
        self.position = self.steps.len().saturating_sub(1);
        self.output_scroll = usize::MAX;
    }

    pub fn jump_to_start(&mut self) {
        self.position = 0;
        self.output_scroll = usize::MAX;
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_millis(500) {
                if self.step_forward_by(1) == 1 {
                    self.status_message = "Playing...".to_string();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Source | Output
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Variables | Call stack | Heap | Animation
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(20),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
            ])
            .split(columns[1]);

        // Field borrows only: the scroll offsets below are borrowed mutably
        let step = self.steps.get(self.position);
        let previous = self.position.checked_sub(1).and_then(|i| self.steps.get(i));
        let commands: Vec<&AnimationCommand> = step
            .map(|s| {
                self.commands
                    .iter()
                    .filter(|cmd| cmd.covers_step(s.step_number))
                    .collect()
            })
            .unwrap_or_default();
        let focus = self.focused_pane;

        super::panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            step.map_or(0, |s| s.line_number),
            focus == FocusedPane::Source,
            &mut self.source_scroll,
            &mut self.target_line_row,
        );
        super::panes::render_output_pane(
            frame,
            left_rows[1],
            step.map_or("", |s| &*s.stdout_snapshot),
            step.map_or("", |s| &*s.stderr_snapshot),
            focus == FocusedPane::Output,
            &mut self.output_scroll,
        );
        super::panes::render_variables_pane(
            frame,
            right_rows[0],
            step,
            previous,
            focus == FocusedPane::Variables,
            &mut self.variables_scroll,
        );
        super::panes::render_call_stack_pane(
            frame,
            right_rows[1],
            step.map(|s| s.call_stack.as_slice()).unwrap_or(&[]),
            step.and_then(|s| s.expression_value.as_ref()),
            focus == FocusedPane::CallStack,
            &mut self.stack_scroll,
        );
        let empty_heap = BTreeMap::new();
        super::panes::render_heap_pane(
            frame,
            right_rows[2],
            step.map_or(&empty_heap, |s| &s.heap_state),
            focus == FocusedPane::Heap,
            &mut self.heap_scroll,
        );
        super::panes::render_animation_pane(
            frame,
            right_rows[3],
            self.adapter.as_deref(),
            &commands,
            focus == FocusedPane::Animation,
            &mut self.animation_scroll,
        );
        super::panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            step,
            self.position,
            self.steps.len(),
            self.is_playing,
        );
    }

    fn scroll(&mut self, down: bool) {
        let offset = match self.focused_pane {
            FocusedPane::Source => {
                // Scrolling moves the pinned current line the other way
                if let Some(row) = self.target_line_row {
                    self.target_line_row = Some(if down {
                        row.saturating_sub(1)
                    } else {
                        row.saturating_add(1)
                    });
                }
                return;
            }
            FocusedPane::Output => &mut self.output_scroll,
            FocusedPane::Variables => &mut self.variables_scroll,
            FocusedPane::CallStack => &mut self.stack_scroll,
            FocusedPane::Heap => &mut self.heap_scroll,
            FocusedPane::Animation => &mut self.animation_scroll,
        };
        *offset = if down {
            offset.saturating_add(1)
        } else {
            offset.saturating_sub(1)
        };
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1) as usize;
                let stepped = self.step_forward_by(n);
                self.status_message = format!("Stepped forward {} step(s)", stepped);
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.status_message = if self.step_backward() {
                    "Stepped backward".to_string()
                } else {
                    "Already at the first step".to_string()
                };
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.status_message = if self.step_forward_by(1) == 1 {
                    "Stepped forward".to_string()
                } else {
                    "Already at the last step".to_string()
                };
            }
            KeyCode::Up => self.scroll(false),
            KeyCode::Down => self.scroll(true),
            KeyCode::Char(' ') => {
                // 200ms debounce against key repeat
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or_else(Instant::now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.jump_to_end();
                self.status_message = "Jumped to end".to_string();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.jump_to_start();
                self.status_message = "Jumped to start".to_string();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::CommandType;
    use crate::interpreter::{trace, TracerConfig};

    fn app() -> App {
        let source = "a = [2, 1]\na[0], a[1] = a[1], a[0]\nprint(a)\n";
        let steps = trace(source, &TracerConfig::default()).unwrap();
        let commands = steps
            .iter()
            .map(|s| AnimationCommand::new(CommandType::Pause).at_step(s.step_number))
            .collect();
        App::new(steps, commands, Some("ArrayAdapter".into()), source.to_string())
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut app = app();
        let total = app.total_steps();
        assert!(total >= 3);
        assert!(!app.step_backward());
        assert_eq!(app.step_forward_by(100), total - 1);
        assert_eq!(app.step_forward_by(1), 0);
        app.jump_to_start();
        assert_eq!(app.position(), 0);
        app.jump_to_end();
        assert_eq!(app.position(), total - 1);
    }

    #[test]
    fn test_current_commands_follow_position() {
        let mut app = app();
        app.step_forward_by(1);
        let number = app.current_step().unwrap().step_number;
        let commands = app.current_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].step(), Some(number));
    }

    #[test]
    fn test_focus_cycles_through_all_panes() {
        let mut pane = FocusedPane::Source;
        for _ in 0..6 {
            pane = pane.next();
        }
        assert_eq!(pane, FocusedPane::Source);
    }
}
