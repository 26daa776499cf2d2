use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Paragraph, Widget},
};

use vip8::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, Machine, Runner, RunnerOutcome,
    debugger::{Cli, Command, CommandOutcome, Session},
    u4,
};

/// Terminal keys feeding the hex keypad, indexed by keypad value.
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Terminals on Linux deliver no key release events, so a key counts as
// held until this much time passes without a repeat.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(50);

const SIDEBAR_WIDTH: u16 = 15 + 2;

struct App {
    session: Session,
    input: String,
    console: String,
    quit: bool,
    last_tick: Instant,
    last_command: Option<Command>,
    key_deadlines: [Option<Instant>; 16],
}

impl App {
    fn new(rom: &[u8]) -> anyhow::Result<Self> {
        let mut machine = Machine::new();
        machine.load(rom).context("Failed to load ROM")?;

        Ok(Self {
            session: Session::new(Runner::new(machine)),
            input: String::new(),
            console: String::from("Type 'help' for the command list"),
            quit: false,
            last_tick: Instant::now(),
            last_command: None,
            key_deadlines: [None; 16],
        })
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.quit {
            let dt = self.last_tick.elapsed().as_secs_f32();
            self.last_tick = Instant::now();

            match self.session.poll(dt) {
                Ok(RunnerOutcome::HitBreakpoint) => {
                    self.console = format!("Breakpoint at {:#05X}", self.session.pc());
                }
                Err(e) => {
                    self.console = e.to_string();
                }
                Ok(RunnerOutcome::Ok) => {}
            }

            terminal.draw(|frame| self.draw(frame))?;

            self.release_stale_keys();

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
            {
                self.handle_key_event(key);
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn release_stale_keys(&mut self) {
        let now = Instant::now();

        for (idx, deadline) in self.key_deadlines.iter_mut().enumerate() {
            if let Some(pressed_at) = deadline
                && now.duration_since(*pressed_at) > KEY_RELEASE_TIMEOUT
            {
                *deadline = None;
                self.session.runner_mut().set_key(u4::new(idx as u8), false);
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit = true;
            return;
        }

        if self.session.is_running() {
            if key.code == KeyCode::Esc {
                self.session.pause();
                self.console = "Paused".to_string();
            } else if let Some(idx) = KEY_MAP.iter().position(|&k| k == key.code) {
                self.session.runner_mut().set_key(u4::new(idx as u8), true);
                self.key_deadlines[idx] = Some(Instant::now());
            }
        } else if key.kind == KeyEventKind::Press {
            match key.code {
                KeyCode::Esc => {
                    self.quit = true;
                }
                KeyCode::Enter => {
                    self.submit_input();
                }
                KeyCode::Char(c) => {
                    self.input.push(c);
                }
                KeyCode::Backspace => {
                    self.input.pop();
                }
                _ => {}
            }
        }
    }

    fn submit_input(&mut self) {
        // Bare enter repeats the previous command, gdb style
        if self.input.is_empty() {
            if let Some(command) = self.last_command.clone() {
                self.run_command(command);
            }
        } else {
            match Cli::try_parse_from(self.input.split_whitespace()) {
                Ok(cli) => {
                    self.last_command = Some(cli.command.clone());
                    self.run_command(cli.command);
                }
                Err(e) => {
                    self.console = e.to_string();
                    self.last_command = None;
                }
            }
        }

        self.input.clear();
    }

    fn run_command(&mut self, command: Command) {
        match self.session.dispatch(command) {
            Ok(CommandOutcome::Ok) => {
                self.console = "OK".to_string();
            }
            Ok(CommandOutcome::Quit) => {
                self.quit = true;
            }
            Ok(CommandOutcome::Breakpoints(addresses)) => {
                let list: Vec<String> = addresses.iter().map(|a| format!("{a:#05X}")).collect();
                self.console = format!("Breakpoints: {}", list.join(" "));
            }
            Ok(CommandOutcome::MemDump { data, offset }) => {
                self.console = fmt_mem_dump(&data, offset);
            }
            Ok(CommandOutcome::Disasm { listing, offset }) => {
                self.console = fmt_disasm(&listing, offset);
            }
            Err(e) => {
                self.console = e.to_string();
            }
        }
    }
}

fn fmt_mem_dump(data: &[u8], offset: u16) -> String {
    let mut out = String::new();

    for (i, byte) in data.iter().enumerate() {
        if i % 16 == 0 {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("{:03X}: ", offset as usize + i));
        }
        out.push_str(&format!("{byte:02X} "));
    }

    if out.is_empty() {
        out = "Empty range".to_string();
    }
    out
}

fn fmt_disasm(listing: &[(u16, vip8::Opcode)], offset: u16) -> String {
    let mut out = String::new();

    for (i, (word, opcode)) in listing.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "{:03X}: {:04X}  {:?}",
            offset as usize + i * 2,
            word,
            opcode
        ));
    }

    if out.is_empty() {
        out = "Empty range".to_string();
    }
    out
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        const MIN_WIDTH: u16 = DISPLAY_WIDTH as u16 + 2 + SIDEBAR_WIDTH;
        const MIN_HEIGHT: u16 = DISPLAY_HEIGHT as u16 + 2 + 1 + 2 + 1 + 2;

        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            let center = area.centered(Constraint::Length(45), Constraint::Length(3));

            Paragraph::new(format!("Terminal is too small ({MIN_WIDTH}x{MIN_HEIGHT} min)"))
                .style(Style::default().fg(Color::Red))
                .alignment(Alignment::Center)
                .block(Block::bordered())
                .render(center, buf);

            return;
        }

        let [left, right] = Layout::horizontal([
            Constraint::Min(DISPLAY_WIDTH as u16 + 2),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .areas(area);

        let [screen, console, prompt] = Layout::vertical([
            Constraint::Length(DISPLAY_HEIGHT as u16 + 2),
            Constraint::Min(1 + 2),
            Constraint::Length(1 + 2),
        ])
        .areas(left);

        let [status, registers, keypad, stack] = Layout::vertical([
            Constraint::Length(1 + 2),
            Constraint::Length(11 + 2),
            Constraint::Length(4 + 2),
            Constraint::Min(1 + 2),
        ])
        .areas(right);

        self.render_screen(screen, buf);
        self.render_status(status, buf);
        self.render_registers(registers, buf);
        self.render_keypad(keypad, buf);
        self.render_stack(stack, buf);
        self.render_console(console, buf);
        self.render_prompt(prompt, buf);
    }
}

impl App {
    fn render_screen(&self, area: Rect, buf: &mut Buffer) {
        let rows: Vec<Line> = self
            .session
            .display()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&lit| {
                        Span::styled(
                            if lit { "█" } else { " " },
                            Style::default().fg(Color::Green),
                        )
                    })
                    .collect()
            })
            .collect();

        Paragraph::new(rows)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Screen "))
            .render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let (text, color) = if self.session.is_running() {
            ("RUNNING", Color::Green)
        } else {
            ("PAUSED", Color::Yellow)
        };

        Paragraph::new(Text::styled(text, Style::default().fg(color)))
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Status "))
            .render(area, buf);
    }

    fn render_registers(&self, area: Rect, buf: &mut Buffer) {
        let mut lines = vec![
            Line::from(format!(
                "PC: {:03X}  I: {:03X}",
                self.session.pc(),
                self.session.i()
            )),
            Line::from(format!(
                "DT: {:02X}   ST: {:02X}",
                self.session.delay_timer(),
                self.session.sound_timer()
            )),
            Line::from(""),
        ];

        let v = self.session.v();
        for idx in 0..8 {
            lines.push(Line::from(format!(
                "V{:X}: {:02X}   V{:X}: {:02X}",
                idx,
                v[idx],
                idx + 8,
                v[idx + 8]
            )));
        }

        Paragraph::new(lines)
            .block(Block::bordered().title(" Registers "))
            .render(area, buf);
    }

    fn render_keypad(&self, area: Rect, buf: &mut Buffer) {
        let keypad = self.session.keypad();
        let rows = [
            [0x1, 0x2, 0x3, 0xC],
            [0x4, 0x5, 0x6, 0xD],
            [0x7, 0x8, 0x9, 0xE],
            [0xA, 0x0, 0xB, 0xF],
        ];

        let lines: Vec<Line> = rows
            .iter()
            .map(|row| {
                let spans: Vec<Span> = row
                    .iter()
                    .map(|&key| {
                        let style = if keypad[key] {
                            Style::default().fg(Color::Black).bg(Color::White)
                        } else {
                            Style::default()
                        };
                        Span::styled(format!("{key:X}"), style)
                    })
                    .collect();

                let mut padded = Vec::new();
                for (i, span) in spans.into_iter().enumerate() {
                    if i > 0 {
                        padded.push(Span::raw(" "));
                    }
                    padded.push(span);
                }
                Line::from(padded)
            })
            .collect();

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Keypad "))
            .render(area, buf);
    }

    fn render_stack(&self, area: Rect, buf: &mut Buffer) {
        let max_lines = area.height.saturating_sub(2) as usize;

        let mut lines: Vec<Line> = self
            .session
            .stack()
            .iter()
            .enumerate()
            .map(|(i, addr)| Line::from(format!("{i:02}: {addr:03X}")))
            .collect();

        if lines.is_empty() {
            lines.push(Line::from("Empty"));
        }

        if lines.len() > max_lines && max_lines > 0 {
            // Keep the newest frames visible, elide the rest
            let keep = max_lines - 1;
            let skipped = lines.len() - keep;
            lines.drain(..skipped);
            lines.insert(0, Line::from("..."));
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(" Stack "))
            .render(area, buf);
    }

    fn render_console(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.console.as_str())
            .block(Block::bordered().title(" Output "))
            .render(area, buf);
    }

    fn render_prompt(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.input.as_str())
            .block(Block::bordered().title(" Command "))
            .render(area, buf);
    }
}

/// TUI debugger for CHIP-8 programs.
///
/// While running, keys 1-4, Q-R, A-F and Z-V feed the hex keypad and
/// Escape pauses. While paused, commands are entered at the prompt.
#[derive(Parser)]
#[command(about)]
struct Args {
    /// Path to the ROM file
    rom_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;
    let mut app = App::new(&rom).context("Failed to initialize application")?;

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal);
    ratatui::restore();

    result
}
