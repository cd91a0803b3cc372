use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Clear, Dataset, GraphType, LegendPosition, List, ListItem,
    Paragraph,
};
use ratatui::{Frame, Terminal};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::cards::CardState;
use crate::guard::{is_inspect_key, InspectGuard, KeyVerdict};
use crate::health::Health;
use crate::ticker::{ScrollOffset, TickerItem, TickerWindow, Trend};
use crate::timeline::{self, Interpolation, TimelineView};

/// Axis/legend foreground carried over from the source chart config.
const AXIS_COLOR: Color = Color::Rgb(0x62, 0x72, 0xa4);
const GRID_COLOR: Color = Color::Rgb(0xc8, 0xc8, 0xc8);

const CARD_COLUMNS: usize = 6;
const CARD_ROWS: usize = 5;

/// Snapshots flowing in from the pollers, plus the selection channel going
/// back out to the timeline worker.
pub struct Feeds {
    pub last_collection: watch::Receiver<String>,
    pub cards: watch::Receiver<Vec<CardState>>,
    pub timeline: watch::Receiver<Option<TimelineView>>,
    pub robots: watch::Receiver<Vec<String>>,
    pub ticker: watch::Receiver<Vec<TickerItem>>,
    pub select_tx: mpsc::Sender<Vec<String>>,
}

pub struct App {
    feeds: Feeds,
    guard: InspectGuard,
    /// Selection currently applied to the chart.
    selection: Vec<String>,
    selector_open: bool,
    selector_cursor: usize,
    selector_marked: HashSet<String>,
    alert: Option<String>,
    debug_open: bool,
    ticker_window: TickerWindow,
    window_period: Duration,
    last_window_tick: Instant,
    scroll: ScrollOffset,
    ticker_content_width: u16,
    should_quit: bool,
}

/// Restores the terminal even if the draw loop panics.
struct TerminalCleanup;

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
    }
}

impl App {
    pub fn new(
        feeds: Feeds,
        guard: InspectGuard,
        initial_selection: Vec<String>,
        window_period: Duration,
        scroll_speed: u16,
    ) -> Self {
        Self {
            feeds,
            guard,
            selection: initial_selection,
            selector_open: false,
            selector_cursor: 0,
            selector_marked: HashSet::new(),
            alert: None,
            debug_open: false,
            ticker_window: TickerWindow::new(),
            window_period,
            last_window_tick: Instant::now(),
            scroll: ScrollOffset::new(scroll_speed),
            ticker_content_width: 0,
            should_quit: false,
        }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>, frame: Duration) -> Result<()> {
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen)?;
        let _cleanup = TerminalCleanup;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;

        while !self.should_quit {
            if *shutdown.borrow() {
                break;
            }

            if self.last_window_tick.elapsed() >= self.window_period {
                let total = self.feeds.ticker.borrow().len();
                self.ticker_window.advance(total);
                self.last_window_tick = Instant::now();
            }
            self.scroll.step(self.ticker_content_width);

            terminal.draw(|f| self.draw(f))?;

            if event::poll(frame)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        std::mem::forget(_cleanup);
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.guard.handle_key(&key) {
            KeyVerdict::Toggled(_) | KeyVerdict::Suppressed => return,
            KeyVerdict::Pass => {}
        }

        // Raw mode disables ISIG, so Ctrl+C arrives here as a key event
        // instead of reaching the signal handler. It quits from any state.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // A blocking alert eats the next keypress.
        if self.alert.is_some() {
            self.alert = None;
            return;
        }

        if is_inspect_key(&key) {
            self.debug_open = !self.debug_open;
            debug!(target: "diag", "debug overlay {}", if self.debug_open { "opened" } else { "closed" });
            return;
        }

        if self.selector_open {
            self.handle_selector_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.debug_open {
                    self.debug_open = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Char('f') => self.open_selector(),
            _ => {}
        }
    }

    fn open_selector(&mut self) {
        self.selector_marked = self.selection.iter().cloned().collect();
        self.selector_cursor = 0;
        self.selector_open = true;
    }

    fn handle_selector_key(&mut self, key: KeyEvent) {
        let robots = self.feeds.robots.borrow().clone();
        match key.code {
            KeyCode::Esc | KeyCode::Char('f') => self.selector_open = false,
            KeyCode::Up | KeyCode::Char('k') => {
                if !robots.is_empty() {
                    self.selector_cursor =
                        (self.selector_cursor + robots.len() - 1) % robots.len();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !robots.is_empty() {
                    self.selector_cursor = (self.selector_cursor + 1) % robots.len();
                }
            }
            KeyCode::Char(' ') => {
                if let Some(robot) = robots.get(self.selector_cursor) {
                    if !self.selector_marked.remove(robot) {
                        self.selector_marked.insert(robot.clone());
                    }
                }
            }
            KeyCode::Enter | KeyCode::Char('u') => self.apply_selection(&robots),
            _ => {}
        }
    }

    /// The update action: reject oversized selections with a blocking alert
    /// before anything is fetched, otherwise hand the selection to the
    /// timeline worker.
    fn apply_selection(&mut self, robots: &[String]) {
        let selected: Vec<String> = robots
            .iter()
            .filter(|r| self.selector_marked.contains(*r))
            .cloned()
            .collect();

        if let Err(e) = timeline::check_selection(&selected) {
            self.alert = Some(e.to_string());
            return;
        }

        if self.feeds.select_tx.try_send(selected.clone()).is_ok() {
            self.selection = selected;
        }
        self.selector_open = false;
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),                    // header
                Constraint::Min(10),                      // timeline chart
                Constraint::Length(3 * CARD_ROWS as u16), // card grid
                Constraint::Length(3),                    // ticker
                Constraint::Length(1),                    // footer
            ])
            .split(f.area());

        self.draw_header(f, chunks[0]);
        self.draw_chart(f, chunks[1]);
        self.draw_cards(f, chunks[2]);
        self.draw_ticker(f, chunks[3]);
        self.draw_footer(f, chunks[4]);

        if self.selector_open {
            self.draw_selector(f);
        }
        if self.debug_open {
            self.draw_debug_overlay(f);
        }
        if let Some(msg) = self.alert.clone() {
            self.draw_alert(f, &msg);
        }
    }

    fn draw_header(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(30), Constraint::Length(42)])
            .split(area);

        let title = Paragraph::new(Span::styled(
            " MINER FLEET ",
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let last = self.feeds.last_collection.borrow().clone();
        let coleta = Paragraph::new(Line::from(vec![
            Span::styled("Last collection: ", Style::default().fg(Color::Gray)),
            Span::styled(last, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        ]))
        .alignment(Alignment::Right)
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(coleta, chunks[1]);
    }

    fn draw_chart(&self, f: &mut Frame, area: Rect) {
        let view = self.feeds.timeline.borrow().clone();
        let Some(view) = view else {
            let msg = Paragraph::new("Waiting for timeline data...")
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title(" Performance "));
            f.render_widget(msg, area);
            return;
        };

        if view.labels.is_empty() || view.series.is_empty() {
            let msg = Paragraph::new("No robots selected. Press f to pick up to 6.")
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title(" Performance "));
            f.render_widget(msg, area);
            return;
        }

        let plotted: Vec<(String, Color, Vec<(f64, f64)>)> = view
            .series
            .iter()
            .map(|s| {
                let (r, g, b) = s.color;
                (s.robot.clone(), Color::Rgb(r, g, b), series_points(&s.points, view.interpolation))
            })
            .collect();

        let y_max = plotted
            .iter()
            .flat_map(|(_, _, pts)| pts.iter().map(|(_, y)| *y))
            .fold(0.0f64, f64::max)
            .max(1.0)
            * 1.1;
        let x_max = (view.labels.len().saturating_sub(1)).max(1) as f64;

        let datasets: Vec<Dataset> = plotted
            .iter()
            .map(|(robot, color, pts)| {
                Dataset::default()
                    .name(robot.clone())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(*color))
                    .data(pts)
            })
            .collect();

        let mid = view.labels.len() / 2;
        let axis_style = Style::default().fg(AXIS_COLOR).add_modifier(Modifier::BOLD);
        let chart = Chart::new(datasets)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(GRID_COLOR))
                    .title(" Performance "),
            )
            .x_axis(
                Axis::default()
                    .style(axis_style)
                    .bounds([0.0, x_max])
                    .labels(vec![
                        Span::styled(view.labels[0].clone(), axis_style),
                        Span::styled(view.labels[mid].clone(), axis_style),
                        Span::styled(view.labels[view.labels.len() - 1].clone(), axis_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .style(axis_style)
                    .bounds([0.0, y_max])
                    .labels(vec![
                        Span::styled("0%".to_string(), axis_style),
                        Span::styled(format!("{:.0}%", y_max / 2.0), axis_style),
                        Span::styled(format!("{:.0}%", y_max), axis_style),
                    ]),
            )
            .legend_position(Some(LegendPosition::Bottom));

        f.render_widget(chart, area);
    }

    fn draw_cards(&self, f: &mut Frame, area: Rect) {
        let cards = self.feeds.cards.borrow().clone();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, CARD_ROWS as u32); CARD_ROWS])
            .split(area);

        for (row_idx, row_area) in rows.iter().enumerate() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, CARD_COLUMNS as u32); CARD_COLUMNS])
                .split(*row_area);

            for (col_idx, cell) in cols.iter().enumerate() {
                let Some(card) = cards.get(row_idx * CARD_COLUMNS + col_idx) else {
                    continue;
                };
                let bg = health_bg(card.health);
                let lines = vec![Line::from(vec![
                    Span::styled(
                        format!(" {} ", card.working),
                        Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::styled(card.mined.clone(), Style::default().fg(Color::Gray)),
                ])];
                let widget = Paragraph::new(lines).block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(Span::styled(
                            card.title.clone(),
                            Style::default().fg(Color::White),
                        )),
                );
                f.render_widget(widget, *cell);
            }
        }
    }

    fn draw_ticker(&mut self, f: &mut Frame, area: Rect) {
        let items = self.feeds.ticker.borrow().clone();
        let visible = self.ticker_window.visible(&items);

        let mut spans: Vec<Span> = Vec::new();
        for item in &visible {
            let (color, arrow) = match item.trend() {
                Trend::Up => (Color::Green, Some("▲")),
                Trend::Down => (Color::Red, Some("▼")),
                Trend::Flat => (Color::White, None),
            };
            spans.push(Span::styled(item.robot.clone(), Style::default().fg(color)));
            if let Some(arrow) = arrow {
                spans.push(Span::styled(format!(" {arrow}"), Style::default().fg(color)));
            }
            spans.push(Span::styled(
                format!(" {}", item.display_value()),
                Style::default().fg(color),
            ));
            spans.push(Span::raw("   "));
        }

        let line = Line::from(spans);
        self.ticker_content_width = line.width() as u16;

        let ticker = Paragraph::new(line)
            .scroll((0, self.scroll.position()))
            .block(Block::default().borders(Borders::ALL).title(" Ticker "));
        f.render_widget(ticker, area);
    }

    fn draw_footer(&self, f: &mut Frame, area: Rect) {
        let guard_state = if self.guard.enabled() { "on" } else { "off" };
        let help = Paragraph::new(Line::from(vec![
            Span::styled(" f", Style::default().fg(Color::Yellow)),
            Span::raw(" filter  "),
            Span::styled("space", Style::default().fg(Color::Yellow)),
            Span::raw(" mark  "),
            Span::styled("enter", Style::default().fg(Color::Yellow)),
            Span::raw(" update  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(" quit  "),
            Span::styled(format!("guard:{guard_state}"), Style::default().fg(Color::DarkGray)),
        ]));
        f.render_widget(help, area);
    }

    fn draw_selector(&self, f: &mut Frame) {
        let robots = self.feeds.robots.borrow().clone();
        let area = centered_rect(40, 60, f.area());
        f.render_widget(Clear, area);

        let items: Vec<ListItem> = robots
            .iter()
            .enumerate()
            .map(|(i, robot)| {
                let marked = self.selector_marked.contains(robot);
                let marker = if marked { "[x] " } else { "[ ] " };
                let mut style = Style::default().fg(if marked { Color::Green } else { Color::White });
                if i == self.selector_cursor {
                    style = style.bg(Color::Rgb(50, 50, 80)).add_modifier(Modifier::BOLD);
                }
                ListItem::new(Line::from(Span::styled(format!("{marker}{robot}"), style)))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Robots ({}/{} marked) ", self.selector_marked.len(), timeline::MAX_SELECTED)),
        );
        f.render_widget(list, area);
    }

    fn draw_alert(&self, f: &mut Frame, msg: &str) {
        let area = centered_rect(50, 20, f.area());
        f.render_widget(Clear, area);
        let alert = Paragraph::new(vec![
            Line::from(Span::styled(msg.to_string(), Style::default().fg(Color::White))),
            Line::from(""),
            Line::from(Span::styled("press any key", Style::default().fg(Color::Gray))),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Alert "),
        );
        f.render_widget(alert, area);
    }

    fn draw_debug_overlay(&self, f: &mut Frame) {
        let area = centered_rect(50, 40, f.area());
        f.render_widget(Clear, area);
        let robots = self.feeds.robots.borrow().len();
        let items = self.feeds.ticker.borrow().len();
        let cards = self.feeds.cards.borrow().len();
        let lines = vec![
            Line::from(format!("robots in payload : {robots}")),
            Line::from(format!("card slots        : {cards}")),
            Line::from(format!("ticker items      : {items}")),
            Line::from(format!("charted selection : {}", self.selection.join(", "))),
            Line::from(format!("interpolation     : {:?}", timeline::INTERPOLATION)),
        ];
        let para = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Diagnostics "),
        );
        f.render_widget(para, area);
    }
}

/// Chart points for one series: gaps (None) contribute no point. Stepped
/// interpolation inserts a horizontal-then-vertical corner between samples;
/// the other modes draw plain lines.
fn series_points(points: &[Option<f64>], interpolation: Interpolation) -> Vec<(f64, f64)> {
    let samples: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
        .collect();

    if interpolation != Interpolation::Step {
        return samples;
    }

    let mut out = Vec::with_capacity(samples.len() * 2);
    for window in samples.windows(2) {
        out.push(window[0]);
        out.push((window[1].0, window[0].1));
    }
    if let Some(last) = samples.last() {
        out.push(*last);
    }
    out
}

fn health_bg(health: Health) -> Color {
    match health {
        Health::Gray => Color::DarkGray,
        Health::Green => Color::Green,
        Health::Yellow => Color::Yellow,
        Health::Red => Color::Red,
    }
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
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::InspectGuard;

    fn test_app() -> App {
        let (_, last_collection) = watch::channel("--".to_string());
        let (_, cards) = watch::channel(Vec::new());
        let (_, timeline_rx) = watch::channel(None);
        let (_, robots) = watch::channel(Vec::new());
        let (_, ticker) = watch::channel(Vec::new());
        let (select_tx, _select_rx) = mpsc::channel(1);
        App::new(
            Feeds {
                last_collection,
                cards,
                timeline: timeline_rx,
                robots,
                ticker,
                select_tx,
            },
            InspectGuard::new("info", None),
            Vec::new(),
            Duration::from_secs(2),
            1,
        )
    }

    #[test]
    fn ctrl_c_key_event_requests_quit() {
        // In raw mode Ctrl+C never reaches the signal handler; the key
        // event itself must stop the app.
        let mut app = test_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn ctrl_c_quits_even_with_selector_or_alert_open() {
        let mut app = test_app();
        app.selector_open = true;
        app.alert = Some("too many".to_string());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn plain_c_does_not_quit() {
        let mut app = test_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        assert!(!app.should_quit);
    }

    #[test]
    fn step_interpolation_inserts_corners() {
        let pts = series_points(&[Some(1.0), Some(3.0)], Interpolation::Step);
        assert_eq!(pts, vec![(0.0, 1.0), (1.0, 1.0), (1.0, 3.0)]);
    }

    #[test]
    fn gaps_contribute_no_points() {
        let pts = series_points(&[Some(1.0), None, Some(3.0)], Interpolation::Linear);
        assert_eq!(pts, vec![(0.0, 1.0), (2.0, 3.0)]);
    }

    #[test]
    fn centered_rect_stays_inside_the_area() {
        let outer = Rect::new(0, 0, 100, 50);
        let inner = centered_rect(40, 60, outer);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
    }
}
