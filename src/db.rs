// SQLite persistence for source bases, operator adjustments and the audit
// trail. The engine never touches the database: state is loaded into an
// AppState snapshot, mutated in memory and written back.

use crate::normalize::normalize_id;
use crate::records::{GesttaRecord, QuestorRecord, SeniorRecord};
use crate::state::{AppState, AuditEntry};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

/// Open (or create) the application database.
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS questor_records (
            id_norm TEXT PRIMARY KEY,
            inscricao_federal TEXT NOT NULL,
            nome_empresa TEXT NOT NULL,
            codigo_empresa TEXT NOT NULL,
            especie_estab TEXT NOT NULL,
            position INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS senior_records (
            id_norm TEXT PRIMARY KEY,
            cnpj TEXT NOT NULL,
            nome TEXT NOT NULL,
            codigo TEXT NOT NULL,
            position INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS gestta_records (
            id_norm TEXT PRIMARY KEY,
            cnpj TEXT NOT NULL,
            nome TEXT NOT NULL,
            codigo TEXT NOT NULL,
            status TEXT NOT NULL,
            position INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS payer_overrides (
            dependent_id TEXT PRIMARY KEY,
            payer_id TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS matrix_exclusions (
            id_norm TEXT PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            user TEXT NOT NULL,
            action TEXT NOT NULL,
            details TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS session (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);",
    )?;

    Ok(())
}

/// Persist the whole state. Source tables, overrides, exclusions and the
/// session are replaced atomically; audit entries are append-only and
/// deduplicated by entry id, so re-saving never duplicates history.
pub fn save_state(conn: &mut Connection, state: &AppState) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM questor_records", [])?;
    for (pos, r) in state.questor.iter().enumerate() {
        tx.execute(
            "INSERT OR REPLACE INTO questor_records
                (id_norm, inscricao_federal, nome_empresa, codigo_empresa, especie_estab, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                normalize_id(&r.inscricao_federal),
                r.inscricao_federal,
                r.nome_empresa,
                r.codigo_empresa,
                r.especie_estab,
                pos as i64,
            ],
        )?;
    }

    tx.execute("DELETE FROM senior_records", [])?;
    for (pos, r) in state.senior.iter().enumerate() {
        tx.execute(
            "INSERT OR REPLACE INTO senior_records (id_norm, cnpj, nome, codigo, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![normalize_id(&r.cnpj), r.cnpj, r.nome, r.codigo, pos as i64],
        )?;
    }

    tx.execute("DELETE FROM gestta_records", [])?;
    for (pos, r) in state.gestta.iter().enumerate() {
        tx.execute(
            "INSERT OR REPLACE INTO gestta_records (id_norm, cnpj, nome, codigo, status, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![normalize_id(&r.cnpj), r.cnpj, r.nome, r.codigo, r.status, pos as i64],
        )?;
    }

    tx.execute("DELETE FROM payer_overrides", [])?;
    for (dependent, payer) in &state.payer_overrides {
        tx.execute(
            "INSERT INTO payer_overrides (dependent_id, payer_id) VALUES (?1, ?2)",
            params![dependent, payer],
        )?;
    }

    tx.execute("DELETE FROM matrix_exclusions", [])?;
    for id in &state.matrix_exclusions {
        tx.execute("INSERT INTO matrix_exclusions (id_norm) VALUES (?1)", params![id])?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO session (key, value) VALUES ('operator', ?1)",
        params![state.operator],
    )?;

    // Oldest first so the autoincrement id preserves chronology
    for entry in state.audit.iter().rev() {
        tx.execute(
            "INSERT OR IGNORE INTO audit_log (entry_id, timestamp, user, action, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                entry.timestamp.to_rfc3339(),
                entry.user,
                entry.action,
                entry.details,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Load the persisted state and recompute the consolidated view.
pub fn load_state(conn: &Connection) -> Result<AppState> {
    let mut state = AppState::new();

    let mut stmt = conn.prepare(
        "SELECT inscricao_federal, nome_empresa, codigo_empresa, especie_estab
         FROM questor_records ORDER BY position",
    )?;
    state.questor = stmt
        .query_map([], |row| {
            Ok(QuestorRecord {
                inscricao_federal: row.get(0)?,
                nome_empresa: row.get(1)?,
                codigo_empresa: row.get(2)?,
                especie_estab: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT cnpj, nome, codigo FROM senior_records ORDER BY position",
    )?;
    state.senior = stmt
        .query_map([], |row| {
            Ok(SeniorRecord {
                cnpj: row.get(0)?,
                nome: row.get(1)?,
                codigo: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT cnpj, nome, codigo, status FROM gestta_records ORDER BY position",
    )?;
    state.gestta = stmt
        .query_map([], |row| {
            Ok(GesttaRecord {
                cnpj: row.get(0)?,
                nome: row.get(1)?,
                codigo: row.get(2)?,
                status: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT dependent_id, payer_id FROM payer_overrides")?;
    state.payer_overrides = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<_, _>>()?;

    let mut stmt = conn.prepare("SELECT id_norm FROM matrix_exclusions")?;
    state.matrix_exclusions = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;

    state.operator = conn
        .query_row(
            "SELECT value FROM session WHERE key = 'operator'",
            [],
            |row| row.get(0),
        )
        .unwrap_or_default();

    state.audit = load_audit(conn)?;
    state.recompute();
    Ok(state)
}

/// Full activity log, newest first.
pub fn load_audit(conn: &Connection) -> Result<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, timestamp, user, action, details
         FROM audit_log ORDER BY id DESC",
    )?;

    let entries = stmt
        .query_map([], |row| {
            let timestamp_str: String = row.get(1)?;
            Ok(AuditEntry {
                id: row.get(0)?,
                // A corrupt timestamp degrades to the epoch so the row is
                // visibly wrong instead of silently dated "now"
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                user: row.get(2)?,
                action: row.get(3)?,
                details: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BillingOrigin;

    #[test]
    fn test_state_round_trip() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut state = AppState::new();
        state.login("Carlos").unwrap();
        state.import_questor(vec![QuestorRecord {
            inscricao_federal: "12.345.678/0001-99".into(),
            nome_empresa: "ACME".into(),
            codigo_empresa: "101".into(),
            especie_estab: "INTEGRADA".into(),
        }]);
        state.import_senior(vec![SeniorRecord {
            cnpj: "11111111000100".into(),
            nome: "MATRIZ SA".into(),
            codigo: "9".into(),
        }]);
        state.assign_payer(&["12345678000199".to_string()], "11111111000100");
        state.toggle_matrix_exclusion("22222222000100");

        save_state(&mut conn, &state).unwrap();
        let loaded = load_state(&conn).unwrap();

        assert_eq!(loaded.operator, "Carlos");
        assert_eq!(loaded.questor.len(), 1);
        assert_eq!(loaded.questor[0].especie_estab, "INTEGRADA");
        assert_eq!(loaded.senior[0].nome, "MATRIZ SA");
        assert_eq!(
            loaded.payer_overrides.get("12345678000199").map(String::as_str),
            Some("11111111000100")
        );
        assert!(loaded.matrix_exclusions.contains("22222222000100"));

        // Consolidated view was recomputed on load
        let e = loaded
            .consolidated()
            .iter()
            .find(|e| e.id == "12345678000199")
            .unwrap();
        assert_eq!(e.senior_origem, BillingOrigin::Manual);
    }

    #[test]
    fn test_audit_append_only_no_duplicates() {
        let mut conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut state = AppState::new();
        state.login("Ana").unwrap();
        state.toggle_matrix_exclusion("12345678000199");

        save_state(&mut conn, &state).unwrap();
        save_state(&mut conn, &state).unwrap(); // re-save must not duplicate

        let audit = load_audit(&conn).unwrap();
        assert_eq!(audit.len(), 2);
        // Newest first
        assert_eq!(audit[0].action, "Regra Matriz");
        assert_eq!(audit[1].action, "Login");
    }

    #[test]
    fn test_corrupt_timestamp_degrades_to_epoch() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        conn.execute(
            "INSERT INTO audit_log (entry_id, timestamp, user, action, details)
             VALUES ('corrompida', 'nao-e-uma-data', 'Ana', 'Login', '')",
            [],
        )
        .unwrap();

        let audit = load_audit(&conn).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_load_from_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let state = load_state(&conn).unwrap();
        assert!(state.consolidated().is_empty());
        assert!(state.operator.is_empty());
        assert!(state.audit.is_empty());
    }
}
