// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

use conciliador::{
    export_csv, load_gestta, load_questor, load_senior, load_state, open_database,
    save_state, SourceKind, ViewState,
};

fn db_path() -> PathBuf {
    env::var("CONCILIADOR_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("conciliador.db"))
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("import") => run_import(&args[2..]),
        Some("export") => run_export(&args[2..]),
        Some("clear") => run_clear(&args[2..]),
        Some("log") => run_log(),
        Some("help") | Some("--help") => {
            print_usage();
            Ok(())
        }
        _ => run_ui_mode(),
    }
}

fn print_usage() {
    println!("Conciliador Base de Clientes");
    println!();
    println!("Uso:");
    println!("  conciliador                          modo interativo (TUI)");
    println!("  conciliador import <sistema> <arquivo>   importa questor|senior|gestta");
    println!("  conciliador export [saida.csv]       exporta o confronto consolidado");
    println!("  conciliador clear <sistema>          limpa a base de um sistema");
    println!("  conciliador log                      mostra o histórico de atividades");
}

fn run_import(args: &[String]) -> Result<()> {
    let (system, file) = match args {
        [system, file] => (system, file),
        _ => bail!("Uso: conciliador import <questor|senior|gestta> <arquivo>"),
    };
    let kind = match SourceKind::from_code(system) {
        Some(kind) => kind,
        None => bail!("Sistema desconhecido: {system} (use questor, senior ou gestta)"),
    };

    let mut conn = open_database(&db_path())?;
    let mut state = load_state(&conn)?;

    let path = PathBuf::from(file);
    let imported = match kind {
        SourceKind::Questor => {
            let rows = load_questor(&path)?;
            let n = rows.len();
            state.import_questor(rows);
            n
        }
        SourceKind::Senior => {
            let rows = load_senior(&path)?;
            let n = rows.len();
            state.import_senior(rows);
            n
        }
        SourceKind::Gestta => {
            let rows = load_gestta(&path)?;
            let n = rows.len();
            state.import_gestta(rows);
            n
        }
    };

    save_state(&mut conn, &state)?;

    println!("✓ {} registos importados para {}", imported, kind.name());
    println!("✓ Base consolidada: {} entidades", state.consolidated().len());
    Ok(())
}

fn run_export(args: &[String]) -> Result<()> {
    let output = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("confronto_clientes.csv"));

    let conn = open_database(&db_path())?;
    let state = load_state(&conn)?;

    // Full set, default view ordering
    let view = ViewState::default();
    let rows = view.apply(state.consolidated());
    let document = export_csv(&rows);
    std::fs::write(&output, document)?;

    println!("✓ {} linhas exportadas para {}", rows.len(), output.display());
    Ok(())
}

fn run_clear(args: &[String]) -> Result<()> {
    let system = match args {
        [system] => system,
        _ => bail!("Uso: conciliador clear <questor|senior|gestta>"),
    };
    let kind = match SourceKind::from_code(system) {
        Some(kind) => kind,
        None => bail!("Sistema desconhecido: {system}"),
    };

    let mut conn = open_database(&db_path())?;
    let mut state = load_state(&conn)?;
    state.clear_source(kind);
    save_state(&mut conn, &state)?;

    println!("✓ Base {} limpa", kind.name());
    Ok(())
}

fn run_log() -> Result<()> {
    let conn = open_database(&db_path())?;
    let state = load_state(&conn)?;

    if state.audit.is_empty() {
        println!("Nenhum evento registrado ainda.");
        return Ok(());
    }
    for entry in &state.audit {
        println!(
            "{}  [{}]  {}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.user,
            entry.action,
            entry.details,
        );
    }
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    let mut conn = open_database(&db_path())?;
    let state = load_state(&conn)?;

    let mut app = ui::App::new(state);
    ui::run_ui(&mut app)?;

    // Persist whatever the operator changed during the session
    save_state(&mut conn, &app.state)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("Modo interativo indisponível nesta build.");
    eprintln!("  Recompile com: cargo build --features tui");
    eprintln!("  Ou use a API:  cargo run --bin conciliador-server --features server");
    print_usage();
    Ok(())
}
