use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use htft_terminal::config::{self, load_case};
use htft_terminal::export::{default_export_path, export_report};
use htft_terminal::model::ModelConfig;
use htft_terminal::scoreline::BucketProbs;
use htft_terminal::state::{AppState, Focus, Screen, mode_label};

const LOG_FILE: &str = "htft_terminal.log";

struct App {
    state: AppState,
    should_quit: bool,
}

impl App {
    fn new(state: AppState) -> Self {
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('l') | KeyCode::Right => {
                self.state.adjust(1)
            }
            KeyCode::Char('-') | KeyCode::Char('h') | KeyCode::Left => self.state.adjust(-1),
            KeyCode::Char('L') => self.state.adjust(10),
            KeyCode::Char('H') => self.state.adjust(-10),
            KeyCode::Tab => self.state.toggle_focus(),
            KeyCode::Char('m') => self.state.cycle_mode(),
            KeyCode::Char('g') => self.state.toggle_screen(),
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn export(&mut self) {
        let Some(report) = self.state.report.as_ref() else {
            self.state.push_log("[INFO] Nothing to export");
            return;
        };
        let path = default_export_path();
        let result = export_report(
            &path,
            &self.state.title,
            report,
            &self.state.value_bets,
            self.state.recommendation.as_ref(),
        );
        match result {
            Ok(summary) => {
                tracing::info!(path = %summary.path.display(), rows = summary.rows, "exported report");
                self.state.push_log(format!(
                    "[INFO] Exported {} sheets to {}",
                    summary.sheets,
                    summary.path.display()
                ));
            }
            Err(err) => {
                tracing::error!("export failed: {err:#}");
                self.state.push_log(format!("[ERROR] Export failed: {err:#}"));
            }
        }
    }
}

fn main() -> Result<()> {
    config::load_dotenv();

    let log_file = File::create(LOG_FILE).with_context(|| format!("create {LOG_FILE}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "htft_terminal=info".into()),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let model_config = ModelConfig::from_env()?;
    let case_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HTFT_CASE_PATH").ok())
        .map(PathBuf::from);
    let state = match case_path {
        Some(path) => {
            let case = load_case(&path)?;
            AppState::from_case(model_config, &case)
        }
        None => AppState::new(model_config),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(state);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Overview => render_overview(frame, chunks[1], &app.state),
        Screen::Scorelines => render_scorelines(frame, chunks[1], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &AppState) -> String {
    let title = match state.screen {
        Screen::Overview => format!(
            "HT/FT TERMINAL | {} | Inputs: {} | Grid 0-{}",
            state.title,
            mode_label(state.mode),
            state.config.max_goals
        ),
        Screen::Scorelines => format!("HT/FT TERMINAL | {} | Scoreline grid", state.title),
    };
    let rates = match state.report.as_ref() {
        Some(r) => format!(
            "xG FT {:.2}-{:.2} | HT {:.2}-{:.2}",
            r.full_time_rates.0, r.full_time_rates.1, r.halftime_rates.0, r.halftime_rates.1
        ),
        None => "xG unavailable".to_string(),
    };
    format!("  (o)  {title}\n       {rates}")
}

fn footer_text(state: &AppState) -> String {
    let focus = match state.focus {
        Focus::Inputs => "inputs",
        Focus::Odds => "odds",
    };
    format!(
        "j/k Move | +/- Adjust ({focus}) | Tab Focus | m Mode | g Grid | e Export | ? Help | q Quit"
    )
}

fn render_overview(frame: &mut Frame, area: Rect, state: &AppState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(5)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(30),
            Constraint::Min(34),
            Constraint::Length(52),
        ])
        .split(rows[0]);

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(10)])
        .split(columns[0]);

    let middle_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(1)])
        .split(columns[1]);

    let inputs = Paragraph::new(inputs_text(state))
        .block(focus_block("Inputs", state.focus == Focus::Inputs));
    frame.render_widget(inputs, left_chunks[0]);

    let markets = Paragraph::new(markets_text(state))
        .block(Block::default().title("Markets").borders(Borders::ALL));
    frame.render_widget(markets, left_chunks[1]);

    let bar_columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(middle_chunks[0]);
    match state.report.as_ref() {
        Some(report) => {
            frame.render_widget(
                bucket_bar_chart("Full time 1X2 %", &report.ft_buckets),
                bar_columns[0],
            );
            frame.render_widget(
                bucket_bar_chart("Half time 1X2 %", &report.ht_buckets),
                bar_columns[1],
            );
        }
        None => {
            let empty = Paragraph::new(state.last_error.clone().unwrap_or_default())
                .style(Style::default().fg(Color::Red))
                .block(Block::default().title("Model error").borders(Borders::ALL));
            frame.render_widget(empty, middle_chunks[0]);
        }
    }

    let htft = Paragraph::new(htft_text(state))
        .block(Block::default().title("HT/FT").borders(Borders::ALL));
    frame.render_widget(htft, middle_chunks[1]);

    let value = Paragraph::new(value_text(state))
        .block(focus_block("Odds & Value", state.focus == Focus::Odds));
    frame.render_widget(value, columns[2]);

    let console = Paragraph::new(console_text(state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, rows[1]);
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style)
}

fn inputs_text(state: &AppState) -> Text<'static> {
    let lines: Vec<Line> = state
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let selected = state.focus == Focus::Inputs && idx == state.selected;
            let prefix = if selected { "> " } else { "  " };
            let style = if selected {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::styled(format!("{prefix}{:<17}{:>7.2}", field.label, field.value), style)
        })
        .collect();
    Text::from(lines)
}

fn markets_text(state: &AppState) -> String {
    let Some(r) = state.report.as_ref() else {
        return "No model output".to_string();
    };
    let mut lines = Vec::new();
    for ou in &r.over_under {
        lines.push(format!(
            "O/U {:<4} {:>5.1}% / {:>5.1}%",
            ou.line,
            ou.over * 100.0,
            ou.under * 100.0
        ));
    }
    lines.push(format!(
        "BTTS     {:>5.1}% / {:>5.1}%",
        r.btts.yes * 100.0,
        r.btts.no * 100.0
    ));
    lines.push(format!(
        "Likeliest {}-{} ({:.1}%)",
        r.most_likely.home,
        r.most_likely.away,
        r.most_likely.probability * 100.0
    ));
    let top = r
        .full_time
        .top_scorelines(3)
        .iter()
        .map(|s| format!("{}-{}", s.home, s.away))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(format!("Top scores {top}"));
    lines.push(format!("Grid mass {:.4}", r.full_time.total_mass()));
    lines.join("\n")
}

fn bucket_bar_chart<'a>(title: &'a str, probs: &BucketProbs) -> BarChart<'a> {
    let bar = |label: &'static str, p: f64, color: Color| {
        Bar::default()
            .label(label.into())
            .value((p * 100.0).round() as u64)
            .style(Style::default().fg(color))
            .value_style(Style::default().fg(Color::Black).bg(color))
    };
    let bars = [
        bar("1", probs.home, Color::Green),
        bar("X", probs.draw, Color::Yellow),
        bar("2", probs.away, Color::Red),
    ];

    BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(2)
        .max(100)
}

fn htft_text(state: &AppState) -> String {
    let Some(r) = state.report.as_ref() else {
        return "No model output".to_string();
    };
    let mut lines = vec![format!("Method: {:?}", r.htft_method)];
    for chunk in r.htft.entries().collect::<Vec<_>>().chunks(3) {
        let row = chunk
            .iter()
            .map(|(outcome, p)| format!("{outcome}: {:>5.2}%", p * 100.0))
            .collect::<Vec<_>>()
            .join("   ");
        lines.push(row);
    }
    lines.push(format!("Total: {:.2}%", r.htft.total() * 100.0));
    lines.join("\n")
}

fn value_text(state: &AppState) -> Text<'static> {
    let mut lines: Vec<Line> = vec![Line::styled(
        format!(
            "{:<7}{:>6}{:>8}{:>8}{:>8}{:>8}",
            "Bet", "Odds", "Model", "Impl", "Fair", "Edge"
        ),
        Style::default().add_modifier(Modifier::BOLD),
    )];

    let fair = state.odds.fair_probabilities().unwrap_or_default();
    for (idx, entry) in state.odds.entries().iter().enumerate() {
        let selected = state.focus == Focus::Odds && idx == state.odds_selected;
        let verdict = state.value_bets.get(idx).map(|row| row.verdict);
        let fair_pct = fair
            .get(idx)
            .map(|(_, p)| format!("{p:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let (model, implied, edge, is_value) = match verdict {
            Some(v) => (
                format!("{:.2}", v.predicted_pct),
                format!("{:.2}", v.implied_pct),
                format!("{:+.2}", v.margin),
                v.is_value,
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string(), false),
        };
        let mut style = if is_value {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        if selected {
            style = style.bg(Color::DarkGray);
        }
        let marker = if is_value { " *" } else { "" };
        lines.push(Line::styled(
            format!(
                "{:<7}{:>6.2}{:>8}{:>8}{:>8}{:>8}{marker}",
                entry.outcome, entry.odds, model, implied, fair_pct, edge
            ),
            style,
        ));
    }

    lines.push(Line::raw(""));
    if let Ok(overround) = state.odds.overround_pct() {
        lines.push(Line::raw(format!("Book overround: {overround:+.2}%")));
    }
    match state.recommendation.as_ref() {
        Some(rec) => lines.push(Line::styled(
            format!(
                "Recommended: {} @ {:.2} ({:.2}%, edge {:+.2})",
                rec.outcome, rec.odds, rec.predicted_pct, rec.edge
            ),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        None => lines.push(Line::raw("No recommendation")),
    }
    Text::from(lines)
}

fn render_scorelines(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(r) = state.report.as_ref() else {
        let empty = Paragraph::new(state.last_error.clone().unwrap_or_default())
            .style(Style::default().fg(Color::Red));
        frame.render_widget(empty, area);
        return;
    };

    let best = (r.most_likely.home, r.most_likely.away);
    let mut lines: Vec<Line> = Vec::new();
    let mut header = format!("{:>6}", "H\\A");
    for j in 0..=r.full_time.max_goals() {
        header.push_str(&format!("{j:>8}"));
    }
    lines.push(Line::styled(header, Style::default().add_modifier(Modifier::BOLD)));

    for (i, row) in r.full_time.rows().enumerate() {
        let mut spans = vec![Span::styled(
            format!("{i:>6}"),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        for (j, p) in row.iter().enumerate() {
            let style = if (i as u32, j as u32) == best {
                Style::default().fg(Color::Black).bg(Color::Green)
            } else if i > j {
                Style::default().fg(Color::Green)
            } else if i < j {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Yellow)
            };
            spans.push(Span::styled(format!("{:>7.2}%", p * 100.0), style));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::raw(""));
    lines.push(Line::raw(format!(
        "Truncation deficit: {:.5}",
        r.full_time.truncation_deficit()
    )));
    for w in &r.warnings {
        lines.push(Line::styled(w.to_string(), Style::default().fg(Color::Yellow)));
    }

    let grid = Paragraph::new(Text::from(lines)).block(
        Block::default()
            .title("Full-time scorelines (green home, red away)")
            .borders(Borders::ALL),
    );
    frame.render_widget(grid, area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "HT/FT Terminal - Help",
        "",
        "  j/k or ↑/↓   Move selection",
        "  +/- or l/h   Adjust selected value",
        "  L/H          Adjust by ten steps",
        "  Tab          Switch between inputs and odds",
        "  m            Cycle input mode",
        "  g            Toggle scoreline grid",
        "  e            Export report to xlsx",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Rows marked * are value bets.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
