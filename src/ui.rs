use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;

use vahan_insights::{
    compute_kpis, distinct_categories, format_growth, growth_metrics, insight_lines,
    top_manufacturers, Dimension, GrowthConfig, GrowthRow, GrowthTable, Kpis, RecordFilter,
    RegistrationRecord,
};

/// Rows shown in the quarterly summary table
const SUMMARY_ROWS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Categories,
    Manufacturers,
    Summary,
}

impl Page {
    pub const ALL: [Page; 4] = [
        Page::Overview,
        Page::Categories,
        Page::Manufacturers,
        Page::Summary,
    ];

    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::Categories,
            Page::Categories => Page::Manufacturers,
            Page::Manufacturers => Page::Summary,
            Page::Summary => Page::Overview,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Overview => Page::Summary,
            Page::Categories => Page::Overview,
            Page::Manufacturers => Page::Categories,
            Page::Summary => Page::Manufacturers,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::Categories => "Categories",
            Page::Manufacturers => "Manufacturers",
            Page::Summary => "Quarterly Summary",
        }
    }
}

pub struct App {
    pub records: Vec<RegistrationRecord>,
    pub filtered: Vec<RegistrationRecord>,
    pub categories: Vec<String>,
    pub selected_categories: BTreeSet<String>,
    pub growth_config: GrowthConfig,
    pub current_page: Page,
    pub state: TableState,

    // Derived from `filtered`, rebuilt by refresh()
    pub kpis: Kpis,
    pub category_growth: GrowthTable,
    pub top_manufacturers: Vec<(String, u64)>,
    pub manufacturer_growth: GrowthTable,
}

impl App {
    pub fn new(records: Vec<RegistrationRecord>, growth_config: GrowthConfig) -> Result<Self> {
        let categories = distinct_categories(&records);
        let selected_categories = categories.iter().cloned().collect();

        let mut app = Self {
            filtered: records.clone(),
            records,
            categories,
            selected_categories,
            growth_config,
            current_page: Page::Overview,
            state: TableState::default(),
            kpis: compute_kpis(&[])?,
            category_growth: GrowthTable {
                dimensions: vec![Dimension::VehicleCategory],
                rows: Vec::new(),
            },
            top_manufacturers: Vec::new(),
            manufacturer_growth: GrowthTable {
                dimensions: vec![Dimension::Manufacturer],
                rows: Vec::new(),
            },
        };
        app.refresh()?;
        Ok(app)
    }

    /// Re-apply the category selection and recompute every derived table
    pub fn refresh(&mut self) -> Result<()> {
        let filter = RecordFilter::new().with_categories(self.selected_categories.iter().cloned());
        self.filtered = if self.selected_categories.is_empty() {
            Vec::new()
        } else {
            filter.apply(&self.records)
        };

        self.kpis = compute_kpis(&self.filtered)?;
        self.category_growth =
            growth_metrics(&self.filtered, &[Dimension::VehicleCategory], &self.growth_config)?;
        self.top_manufacturers = top_manufacturers(&self.filtered, 10)?;

        let top5: Vec<String> = self
            .top_manufacturers
            .iter()
            .take(5)
            .map(|(name, _)| name.clone())
            .collect();
        let top5_records = RecordFilter::new()
            .with_manufacturers(top5.iter().cloned())
            .apply(&self.filtered);
        self.manufacturer_growth = if top5.is_empty() {
            GrowthTable {
                dimensions: vec![Dimension::Manufacturer],
                rows: Vec::new(),
            }
        } else {
            growth_metrics(&top5_records, &[Dimension::Manufacturer], &self.growth_config)?
        };

        if self.summary_rows().is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
        Ok(())
    }

    /// Toggle the n-th category (0-based) in the selection
    pub fn toggle_category(&mut self, index: usize) -> Result<()> {
        if let Some(category) = self.categories.get(index) {
            if !self.selected_categories.remove(category) {
                self.selected_categories.insert(category.clone());
            }
            self.refresh()?;
        }
        Ok(())
    }

    pub fn clear_filter(&mut self) -> Result<()> {
        self.selected_categories = self.categories.iter().cloned().collect();
        self.refresh()
    }

    pub fn is_filtered(&self) -> bool {
        self.selected_categories.len() != self.categories.len()
    }

    pub fn summary_rows(&self) -> &[GrowthRow] {
        self.category_growth.tail(SUMMARY_ROWS)
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.summary_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.summary_rows().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "dashboard loop failed");
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => app.clear_filter()?,
                KeyCode::Char(d @ '1'..='9') => {
                    let index = d as usize - '1' as usize;
                    app.toggle_category(index)?;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    terminal.clear()?;
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.filtered.is_empty() {
        render_no_data(f, chunks[1]);
    } else {
        match app.current_page {
            Page::Overview => render_overview(f, chunks[1], app),
            Page::Categories => render_categories(f, chunks[1], app),
            Page::Manufacturers => render_manufacturers(f, chunks[1], app),
            Page::Summary => render_summary(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn growth_color(value: Option<f64>) -> Color {
    match value {
        Some(v) if v > 0.0 => Color::Green,
        Some(v) if v < 0.0 => Color::Red,
        Some(_) => Color::White,
        None => Color::DarkGray,
    }
}

fn growth_cell(value: Option<f64>) -> Cell<'static> {
    Cell::from(format_growth(value)).style(Style::default().fg(growth_color(value)))
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Records: {}", app.filtered.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Registrations: {}", app.kpis.total_registrations),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" 🚗 Vahan Vehicle Registration Analytics "),
    );

    f.render_widget(header, area);
}

fn render_no_data(f: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  No data available for the selected filters.",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Press c to clear filters.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(paragraph, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let kpis = &app.kpis;

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Key Performance Indicators",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Total Registrations:       ", label),
            Span::raw(kpis.total_registrations.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Avg Monthly Registrations: ", label),
            Span::raw(format!("{:.0}", kpis.avg_monthly_registrations)),
        ]),
        Line::from(vec![
            Span::styled("  Top Vehicle Category:      ", label),
            Span::raw(kpis.top_category.clone().unwrap_or_else(|| "N/A".to_string())),
        ]),
        Line::from(vec![
            Span::styled("  Top Manufacturer:          ", label),
            Span::raw(kpis.top_manufacturer.clone().unwrap_or_else(|| "N/A".to_string())),
        ]),
        Line::from(vec![
            Span::styled("  Overall YoY Growth:        ", label),
            Span::styled(
                format_growth(kpis.overall_yoy_growth),
                Style::default().fg(growth_color(kpis.overall_yoy_growth)),
            ),
        ]),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        Line::from(Span::styled(
            "  INSIGHTS",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        Line::from(""),
    ];

    for insight in insight_lines(kpis) {
        content.push(Line::from(format!("  • {}", insight)));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Growth shows N/A where the comparison quarter is missing or zero.",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Overview "),
    );

    f.render_widget(paragraph, area);
}

fn render_categories(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let latest = app.category_growth.latest_per_group();

    let header = Row::new(
        ["Category", "Latest", "Registrations", "YoY", "QoQ"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray));

    let rows = latest.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.group_label()),
            Cell::from(row.period_label()),
            Cell::from(row.registrations.to_string()),
            growth_cell(row.yoy_growth),
            growth_cell(row.qoq_growth),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Latest Quarter by Category "),
    );
    f.render_widget(table, chunks[0]);

    // Bar height is |YoY|; sign is carried by colour and label
    let bars: Vec<Bar> = latest
        .iter()
        .map(|row| {
            Bar::default()
                .label(Line::from(row.group_label()))
                .value(row.yoy_growth.map(|v| v.abs().round() as u64).unwrap_or(0))
                .text_value(format_growth(row.yoy_growth))
                .style(Style::default().fg(growth_color(row.yoy_growth)))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Latest YoY Growth by Category "),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(2);
    f.render_widget(chart, chunks[1]);
}

/// Quadrant label for the YoY/QoQ growth matrix
fn momentum(row: &GrowthRow) -> (&'static str, Color) {
    match (row.yoy_growth, row.qoq_growth) {
        (Some(y), Some(q)) if y >= 0.0 && q >= 0.0 => ("Growing", Color::Green),
        (Some(y), Some(_)) if y >= 0.0 => ("Cooling", Color::Yellow),
        (Some(_), Some(q)) if q >= 0.0 => ("Recovering", Color::Cyan),
        (Some(_), Some(_)) => ("Declining", Color::Red),
        _ => ("N/A", Color::DarkGray),
    }
}

fn render_manufacturers(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let header = Row::new(
        ["#", "Manufacturer", "Registrations"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray));

    let rows = app
        .top_manufacturers
        .iter()
        .enumerate()
        .map(|(i, (name, total))| {
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(truncate(name, 20)),
                Cell::from(total.to_string()),
            ])
        });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(22),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Top 10 Manufacturers by Total Registrations "),
    );
    f.render_widget(table, chunks[0]);

    let header = Row::new(
        ["Manufacturer", "YoY", "QoQ", "Registrations", "Momentum"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray));

    let rows = app.manufacturer_growth.latest_per_group().into_iter().map(|row| {
        let (label, color) = momentum(row);
        Row::new(vec![
            Cell::from(truncate(&row.group_label(), 16)),
            growth_cell(row.yoy_growth),
            growth_cell(row.qoq_growth),
            Cell::from(row.registrations.to_string()),
            Cell::from(label).style(Style::default().fg(color)),
        ])
    });

    let matrix = Table::new(
        rows,
        [
            Constraint::Length(17),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Growth Matrix: YoY vs QoQ (Top 5) "),
    );
    f.render_widget(matrix, chunks[1]);
}

fn render_summary(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(
        ["Year", "Quarter", "Category", "Registrations", "YoY", "QoQ"]
            .iter()
            .map(|h| Cell::from(*h).style(header_style())),
    )
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows: Vec<Row> = app
        .summary_rows()
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.year.to_string()),
                Cell::from(row.quarter.to_string()),
                Cell::from(row.group_label()),
                Cell::from(row.registrations.to_string()),
                growth_cell(row.yoy_growth),
                growth_cell(row.qoq_growth),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Recent Data Summary "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    for (i, category) in app.categories.iter().enumerate().take(9) {
        let selected = app.selected_categories.contains(category);
        status_spans.push(Span::styled(
            format!("{}", i + 1),
            Style::default().fg(Color::Yellow),
        ));
        status_spans.push(Span::styled(
            format!(":{} ", category),
            if selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT)
            },
        ));
    }

    if app.is_filtered() {
        status_spans.push(Span::raw("("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear) "));
    }

    status_spans.push(Span::raw("| "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use vahan_insights::SampleGenerator;

    fn app() -> App {
        let start = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let records = SampleGenerator::new(3).generate(start, end);
        App::new(records, GrowthConfig::default()).unwrap()
    }

    #[test]
    fn test_page_cycle() {
        let mut page = Page::Overview;
        for _ in 0..4 {
            page = page.next();
        }
        assert_eq!(page, Page::Overview);
        assert_eq!(Page::Overview.previous(), Page::Summary);
    }

    #[test]
    fn test_app_derives_tables() {
        let app = app();
        assert_eq!(app.categories, vec!["2W", "3W", "4W"]);
        assert_eq!(app.category_growth.latest_per_group().len(), 3);
        assert_eq!(app.top_manufacturers.len(), 10);
        assert_eq!(app.manufacturer_growth.latest_per_group().len(), 5);
        assert_eq!(app.summary_rows().len(), SUMMARY_ROWS);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_toggle_category_filters_records() {
        let mut app = app();
        app.toggle_category(0).unwrap();
        assert!(app.is_filtered());
        assert!(app.filtered.iter().all(|r| r.vehicle_category != "2W"));

        app.toggle_category(1).unwrap();
        app.toggle_category(2).unwrap();
        assert!(app.filtered.is_empty());
        assert!(app.category_growth.is_empty());
        assert_eq!(app.state.selected(), None);

        app.clear_filter().unwrap();
        assert!(!app.is_filtered());
        assert_eq!(app.filtered.len(), app.records.len());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(SUMMARY_ROWS - 1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_every_page_renders() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        for page in Page::ALL {
            app.current_page = page;
            terminal.draw(|f| ui(f, &mut app)).unwrap();
        }
    }

    #[test]
    fn test_momentum_quadrants() {
        let mut row = GrowthRow {
            keys: vec!["Honda".to_string()],
            year: 2023,
            quarter: vahan_insights::Quarter::Q1,
            registrations: 10,
            yoy_growth: Some(5.0),
            qoq_growth: Some(-1.0),
        };
        assert_eq!(momentum(&row).0, "Cooling");
        row.qoq_growth = None;
        assert_eq!(momentum(&row).0, "N/A");
        row.yoy_growth = Some(-3.0);
        row.qoq_growth = Some(2.0);
        assert_eq!(momentum(&row).0, "Recovering");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Honda", 10), "Honda");
        assert_eq!(truncate("Maruti Suzuki India", 10), "Maruti ...");
    }
}
