// ============================================================
// Interface de terminal (ratatui) do conciliador
// ============================================================

use std::collections::HashSet;
use std::io;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

use conciliador::export::write_export;
use conciliador::records::{BillingOrigin, Diagnosis};
use conciliador::view::{SortKey, ViewState};
use conciliador::{AppState, ConsolidatedEntity};

const EXPORT_PATH: &str = "conciliacao_clientes.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Explorer,
    Fontes,
    Auditoria,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Explorer => Page::Fontes,
            Page::Fontes => Page::Auditoria,
            Page::Auditoria => Page::Explorer,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Explorer => Page::Auditoria,
            Page::Fontes => Page::Explorer,
            Page::Auditoria => Page::Fontes,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Explorer => "Explorador",
            Page::Fontes => "Fontes",
            Page::Auditoria => "Auditoria",
        }
    }
}

/// What the keyboard is currently feeding into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Login,
    Search,
    Payer,
}

pub struct App {
    pub state: AppState,
    pub view: ViewState,
    pub current_page: Page,
    pub table_state: TableState,
    /// Explorer rows after search, filters and sort.
    pub visible: Vec<ConsolidatedEntity>,
    /// Normalized ids marked with the space bar.
    pub marked: HashSet<String>,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(state: AppState) -> Self {
        let mut app = App {
            state,
            view: ViewState::default(),
            current_page: Page::Explorer,
            table_state: TableState::default(),
            visible: Vec::new(),
            marked: HashSet::new(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status_message: None,
        };
        if app.state.operator.is_empty() {
            app.input_mode = InputMode::Login;
        }
        app.refresh();
        app
    }

    /// Reapplies the view over the consolidated rows and clamps the cursor.
    pub fn refresh(&mut self) {
        self.visible = self.view.apply(self.state.consolidated());
        let len = self.visible.len();
        match self.table_state.selected() {
            Some(i) if len > 0 && i >= len => self.table_state.select(Some(len - 1)),
            Some(_) if len == 0 => self.table_state.select(None),
            None if len > 0 => self.table_state.select(Some(0)),
            _ => {}
        }
    }

    pub fn next(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(i) if i + 1 >= self.visible.len() => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = match self.table_state.selected() {
            Some(0) | None => self.visible.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = self
            .table_state
            .selected()
            .map(|i| (i + 10).min(self.visible.len() - 1))
            .unwrap_or(0);
        self.table_state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.visible.is_empty() {
            return;
        }
        let i = self
            .table_state
            .selected()
            .map(|i| i.saturating_sub(10))
            .unwrap_or(0);
        self.table_state.select(Some(i));
    }

    fn selected_entity(&self) -> Option<&ConsolidatedEntity> {
        self.table_state.selected().and_then(|i| self.visible.get(i))
    }

    fn toggle_mark(&mut self) {
        if let Some(id) = self.selected_entity().map(|e| e.id.clone()) {
            if !self.marked.remove(&id) {
                self.marked.insert(id);
            }
        }
    }

    fn toggle_exclusion(&mut self) {
        if let Some(id) = self.selected_entity().map(|e| e.id.clone()) {
            self.state.toggle_matrix_exclusion(&id);
            self.status_message = Some(if self.state.matrix_exclusions.contains(&id) {
                format!("Regra matriz desativada para {id}")
            } else {
                format!("Regra matriz reativada para {id}")
            });
            self.refresh();
        }
    }

    fn remove_payer(&mut self) {
        if let Some(id) = self.selected_entity().map(|e| e.id.clone()) {
            if !self.state.payer_overrides.contains_key(&id) {
                self.status_message = Some("Sem vínculo manual nessa linha".to_string());
                return;
            }
            self.state.remove_payer(&id);
            self.status_message = Some(format!("Vínculo removido de {id}"));
            self.refresh();
        }
    }

    fn assign_payer(&mut self, payer: &str) {
        let targets: Vec<String> = if self.marked.is_empty() {
            self.selected_entity().map(|e| e.id.clone()).into_iter().collect()
        } else {
            self.marked.iter().cloned().collect()
        };
        if targets.is_empty() {
            self.status_message = Some("Nenhuma linha selecionada".to_string());
            return;
        }
        self.state.assign_payer(&targets, payer);
        self.status_message = Some(format!("Vínculo manual aplicado a {} empresa(s)", targets.len()));
        self.marked.clear();
        self.refresh();
    }

    fn export(&mut self) {
        match write_export(EXPORT_PATH, &self.visible) {
            Ok(()) => {
                self.status_message = Some(format!(
                    "{} linha(s) exportada(s) para {}",
                    self.visible.len(),
                    EXPORT_PATH
                ));
            }
            Err(e) => self.status_message = Some(format!("Erro ao exportar: {e}")),
        }
    }

    fn cycle_sort(&mut self) {
        let keys = SortKey::ALL;
        let pos = keys.iter().position(|k| *k == self.view.sort.key).unwrap_or(0);
        self.view.sort.toggle(keys[(pos + 1) % keys.len()]);
        self.refresh();
    }

    fn toggle_sort_direction(&mut self) {
        let key = self.view.sort.key;
        self.view.sort.toggle(key);
        self.refresh();
    }

    fn cycle_origin_filter(&mut self) {
        let order = [
            None,
            Some(BillingOrigin::Direto),
            Some(BillingOrigin::Manual),
            Some(BillingOrigin::Matriz),
            Some(BillingOrigin::Ignorado),
            Some(BillingOrigin::Ausente),
        ];
        let pos = order
            .iter()
            .position(|o| *o == self.view.filters.senior_origem)
            .unwrap_or(0);
        self.view.filters.senior_origem = order[(pos + 1) % order.len()];
        self.refresh();
    }

    fn cycle_diagnosis_filter(&mut self) {
        let order = [
            None,
            Some(Diagnosis::Consistente),
            Some(Diagnosis::FaltaCadastroQuestor),
            Some(Diagnosis::ClienteInativoBaixa),
            Some(Diagnosis::Divergente),
        ];
        let pos = order
            .iter()
            .position(|d| *d == self.view.filters.diagnostico)
            .unwrap_or(0);
        self.view.filters.diagnostico = order[(pos + 1) % order.len()];
        self.refresh();
    }

    fn clear_filters(&mut self) {
        self.view.search.clear();
        self.view.filters = Default::default();
        self.refresh();
        self.status_message = Some("Filtros limpos".to_string());
    }
}

// ============================================================
// Event loop
// ============================================================

pub fn run_ui(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match app.input_mode {
                InputMode::Login => match key.code {
                    KeyCode::Enter => {
                        let name = app.input_buffer.trim().to_string();
                        if app.state.login(&name).is_ok() {
                            app.input_buffer.clear();
                            app.input_mode = InputMode::Normal;
                            app.refresh();
                        }
                    }
                    KeyCode::Char(c) => app.input_buffer.push(c),
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    KeyCode::Esc => return Ok(()),
                    _ => {}
                },
                InputMode::Search => match key.code {
                    KeyCode::Enter | KeyCode::Esc => {
                        app.input_mode = InputMode::Normal;
                    }
                    KeyCode::Char(c) => {
                        app.input_buffer.push(c);
                        app.view.search = app.input_buffer.clone();
                        app.refresh();
                    }
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                        app.view.search = app.input_buffer.clone();
                        app.refresh();
                    }
                    _ => {}
                },
                InputMode::Payer => match key.code {
                    KeyCode::Enter => {
                        let payer = app.input_buffer.trim().to_string();
                        app.input_buffer.clear();
                        app.input_mode = InputMode::Normal;
                        if !payer.is_empty() {
                            app.assign_payer(&payer);
                        }
                    }
                    KeyCode::Esc => {
                        app.input_buffer.clear();
                        app.input_mode = InputMode::Normal;
                    }
                    KeyCode::Char(c) => app.input_buffer.push(c),
                    KeyCode::Backspace => {
                        app.input_buffer.pop();
                    }
                    _ => {}
                },
                InputMode::Normal => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Tab => {
                        app.current_page = app.current_page.next();
                    }
                    KeyCode::BackTab => {
                        app.current_page = app.current_page.previous();
                    }
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::PageDown => app.page_down(),
                    KeyCode::PageUp => app.page_up(),
                    KeyCode::Home => {
                        if !app.visible.is_empty() {
                            app.table_state.select(Some(0));
                        }
                    }
                    KeyCode::End => {
                        if !app.visible.is_empty() {
                            app.table_state.select(Some(app.visible.len() - 1));
                        }
                    }
                    KeyCode::Char('/') => {
                        app.input_buffer = app.view.search.clone();
                        app.input_mode = InputMode::Search;
                    }
                    KeyCode::Char(' ') => app.toggle_mark(),
                    KeyCode::Char('s') => app.cycle_sort(),
                    KeyCode::Char('S') => app.toggle_sort_direction(),
                    KeyCode::Char('o') => app.cycle_origin_filter(),
                    KeyCode::Char('d') => app.cycle_diagnosis_filter(),
                    KeyCode::Char('c') => app.clear_filters(),
                    KeyCode::Char('p') => {
                        app.input_buffer.clear();
                        app.input_mode = InputMode::Payer;
                    }
                    KeyCode::Char('r') => app.remove_payer(),
                    KeyCode::Char('x') => app.toggle_exclusion(),
                    KeyCode::Char('e') => app.export(),
                    _ => {}
                },
            }
        }
    }
}

// ============================================================
// Rendering
// ============================================================

fn ui(f: &mut Frame, app: &mut App) {
    if app.input_mode == InputMode::Login {
        render_login(f, app);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Explorer => render_explorer(f, chunks[1], app),
        Page::Fontes => render_sources(f, chunks[1], app),
        Page::Auditoria => render_audit(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_login(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 30, f.size());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Conciliador Base de Clientes",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("  Operador: {}_", app.input_buffer)),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter confirma, Esc sai",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Identificação "),
    );
    f.render_widget(block, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup[1])[1]
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Explorer, Page::Fontes, Page::Auditoria];
    let mut tab_spans = vec![Span::raw(" ")];

    for page in &pages {
        tab_spans.push(Span::raw("  "));
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(page.title(), style));
    }

    let consolidated = app.state.consolidated();
    let consistent = consolidated
        .iter()
        .filter(|e| e.diagnostico == Diagnosis::Consistente)
        .count();
    let divergent = consolidated
        .iter()
        .filter(|e| e.diagnostico == Diagnosis::Divergente)
        .count();

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", consolidated.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("✓ {consistent}"),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✗ {divergent}"),
        Style::default().fg(Color::Red),
    ));

    if !app.state.operator.is_empty() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("Operador: {}", app.state.operator),
            Style::default().fg(Color::Cyan),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_explorer(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = [
        "", "Documento", "Empresa", "Questor", "Sênior", "Origem", "Gestta", "Diagnóstico", "Confronto",
    ]
    .iter()
    .map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.visible.iter().map(|e| {
        let diag_color = match e.diagnostico {
            Diagnosis::Consistente => Color::Green,
            Diagnosis::Divergente => Color::Red,
            Diagnosis::ClienteInativoBaixa => Color::Yellow,
            Diagnosis::FaltaCadastroQuestor => Color::Magenta,
        };
        let mark = if app.marked.contains(&e.id) { "✔" } else { " " };

        let cells = vec![
            Cell::from(mark),
            Cell::from(e.id.clone()),
            Cell::from(truncate(&e.nome, 30)),
            Cell::from(sim_nao_span(e.questor)),
            Cell::from(sim_nao_span(e.senior)),
            Cell::from(e.senior_origem.as_str()),
            Cell::from(truncate(&e.gestta, 10)),
            Cell::from(e.diagnostico.as_str()).style(Style::default().fg(diag_color)),
            Cell::from(e.confronto_area.as_str()),
        ];

        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Length(16),
            Constraint::Length(32),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(24),
            Constraint::Length(22),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Empresas ({}) ", app.visible.len())),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn sim_nao_span(value: bool) -> Span<'static> {
    if value {
        Span::styled("Sim", Style::default().fg(Color::Green))
    } else {
        Span::styled("Não", Style::default().fg(Color::Red))
    }
}

fn render_sources(f: &mut Frame, area: Rect, app: &App) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Fontes carregadas",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!(
            "  Questor (ERP)       {:>6} registo(s)",
            app.state.questor.len()
        )),
        Line::from(format!(
            "  Sênior (cobrança)   {:>6} registo(s)",
            app.state.senior.len()
        )),
        Line::from(format!(
            "  Gestta (tarefas)    {:>6} registo(s)",
            app.state.gestta.len()
        )),
        Line::from(""),
        Line::from(format!(
            "  Vínculos manuais    {:>6}",
            app.state.payer_overrides.len()
        )),
        Line::from(format!(
            "  Matrizes ignoradas  {:>6}",
            app.state.matrix_exclusions.len()
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Use o subcomando `import` na linha de comando para carregar arquivos.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Fontes "),
    );
    f.render_widget(widget, area);
}

fn render_audit(f: &mut Frame, area: Rect, app: &App) {
    let header_cells = ["Quando", "Usuário", "Ação", "Detalhes"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.state.audit.iter().map(|entry| {
        let cells = vec![
            Cell::from(entry.timestamp.format("%d/%m/%Y %H:%M:%S").to_string()),
            Cell::from(entry.user.clone()),
            Cell::from(entry.action.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(truncate(&entry.details, 60)),
        ];
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(16),
            Constraint::Length(18),
            Constraint::Length(64),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Auditoria ({}) ", app.state.audit.len())),
    );

    f.render_widget(table, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    match app.input_mode {
        InputMode::Search => {
            status_spans.push(Span::styled(" Busca: ", Style::default().fg(Color::Cyan)));
            status_spans.push(Span::raw(format!("{}_", app.input_buffer)));
        }
        InputMode::Payer => {
            status_spans.push(Span::styled(
                " CNPJ do pagador: ",
                Style::default().fg(Color::Cyan),
            ));
            status_spans.push(Span::raw(format!("{}_", app.input_buffer)));
        }
        _ => {
            let selected = app.table_state.selected().map(|i| i + 1).unwrap_or(0);
            status_spans.push(Span::styled(
                format!(" Linha: {}/{} ", selected, app.visible.len()),
                Style::default().fg(Color::Cyan),
            ));

            if !app.view.search.is_empty() || app.view.filters.is_active() {
                status_spans.push(Span::raw("| "));
                status_spans.push(Span::styled(
                    "filtros ativos",
                    Style::default().fg(Color::Green),
                ));
                status_spans.push(Span::raw(" ("));
                status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
                status_spans.push(Span::raw(" limpa) "));
            }

            status_spans.push(Span::raw("| "));
            status_spans.push(Span::styled(
                format!("ordem: {} ", app.view.sort.key.title()),
                Style::default().fg(Color::White),
            ));

            if let Some(msg) = &app.status_message {
                status_spans.push(Span::raw("| "));
                status_spans.push(Span::styled(msg.clone(), Style::default().fg(Color::Green)));
                status_spans.push(Span::raw(" "));
            }

            for (key, label) in [
                ("/", "busca"),
                ("s", "ordena"),
                ("o", "origem"),
                ("d", "diag"),
                ("p", "vincular"),
                ("r", "desvincular"),
                ("x", "matriz"),
                ("e", "exportar"),
                ("q", "sair"),
            ] {
                status_spans.push(Span::raw("| "));
                status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
                status_spans.push(Span::raw(format!(" {label} ")));
            }
        }
    }

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
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conciliador::records::QuestorRecord;

    fn two_company_state() -> AppState {
        let mut state = AppState::new();
        state.login("ana").unwrap();
        state.import_questor(vec![
            QuestorRecord {
                inscricao_federal: "11222333000144".to_string(),
                nome_empresa: "Alfa Contábil".to_string(),
                codigo_empresa: "1".to_string(),
                especie_estab: String::new(),
            },
            QuestorRecord {
                inscricao_federal: "55666777000188".to_string(),
                nome_empresa: "Beta Serviços".to_string(),
                codigo_empresa: "2".to_string(),
                especie_estab: String::new(),
            },
        ]);
        state
    }

    #[test]
    fn test_page_cycle_round_trip() {
        let mut page = Page::Explorer;
        for _ in 0..3 {
            page = page.next();
        }
        assert_eq!(page, Page::Explorer);
        assert_eq!(Page::Explorer.previous(), Page::Auditoria);
    }

    #[test]
    fn test_new_app_starts_in_login_without_operator() {
        let app = App::new(AppState::new());
        assert_eq!(app.input_mode, InputMode::Login);
    }

    #[test]
    fn test_navigation_wraps_around() {
        let mut app = App::new(two_company_state());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.table_state.selected(), Some(0));
        app.next();
        assert_eq!(app.table_state.selected(), Some(1));
        app.next();
        assert_eq!(app.table_state.selected(), Some(0));
        app.previous();
        assert_eq!(app.table_state.selected(), Some(1));
    }

    #[test]
    fn test_mark_and_exclusion_follow_cursor() {
        let mut app = App::new(two_company_state());
        app.toggle_mark();
        assert_eq!(app.marked.len(), 1);
        app.toggle_mark();
        assert!(app.marked.is_empty());

        app.toggle_exclusion();
        assert_eq!(app.state.matrix_exclusions.len(), 1);
        app.toggle_exclusion();
        assert!(app.state.matrix_exclusions.is_empty());
    }

    #[test]
    fn test_search_narrows_visible_rows() {
        let mut app = App::new(two_company_state());
        assert_eq!(app.visible.len(), 2);
        app.view.search = "Beta".to_string();
        app.refresh();
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.visible[0].nome, "Beta Serviços");
    }

    #[test]
    fn test_truncate_respects_utf8() {
        assert_eq!(truncate("Sênior", 10), "Sênior");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }
}
