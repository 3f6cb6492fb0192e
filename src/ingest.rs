// Delimited-text ingestion for the three source systems
//
// The engine never sees bytes: this layer decodes, splits and trims, and
// hands over fixed-shape records. Questor exports pipe-delimited text;
// Sênior and Gestta export comma-delimited text with quoted fields. All
// three arrive from Windows machines, so UTF-8 with a Windows-1252 fallback.

use crate::normalize::normalize_id;
use crate::records::{GesttaRecord, QuestorRecord, SeniorRecord, SourceKind};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::path::Path;

/// Read a file and decode it to UTF-8.
///
/// Tries strict UTF-8 first; if the bytes are not valid UTF-8 the export
/// came from a legacy tool and Windows-1252 is assumed (common for
/// Excel-generated CSVs in pt-BR environments).
pub fn read_file_as_utf8(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(decode_bytes(&bytes))
}

/// Decode raw bytes: strict UTF-8, else Windows-1252.
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Case-insensitive header lookup. Accepts any of the candidate names.
fn header_index(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        names.iter().any(|n| h.eq_ignore_ascii_case(n))
    })
}

fn field(record: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn make_reader(content: &str, kind: SourceKind) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .delimiter(kind.delimiter())
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes())
}

// ============================================================================
// PER-SOURCE PARSERS
// ============================================================================

/// Parse a Questor (ERP) export. Pipe-delimited, id column INSCRFEDERAL.
pub fn parse_questor(content: &str) -> Result<Vec<QuestorRecord>> {
    let mut reader = make_reader(content, SourceKind::Questor);
    let headers = reader.headers().context("Questor export has no header row")?.clone();

    let id_col = header_index(&headers, &["INSCRFEDERAL"]);
    let nome_col = header_index(&headers, &["NOMEEMPRESA"]);
    let codigo_col = header_index(&headers, &["CODIGOEMPRESA"]);
    let especie_col = header_index(&headers, &["ESPECIEESTAB"]);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to parse Questor line {}", line + 2))?;
        rows.push(QuestorRecord {
            inscricao_federal: field(&record, id_col),
            nome_empresa: field(&record, nome_col),
            codigo_empresa: field(&record, codigo_col),
            especie_estab: field(&record, especie_col),
        });
    }
    Ok(rows)
}

/// Parse a Sênior (billing) export. Comma-delimited, id column CNPJ.
pub fn parse_senior(content: &str) -> Result<Vec<SeniorRecord>> {
    let mut reader = make_reader(content, SourceKind::Senior);
    let headers = reader.headers().context("Sênior export has no header row")?.clone();

    let id_col = header_index(&headers, &["CNPJ"]);
    let nome_col = header_index(&headers, &["Nome", "NOME"]);
    let codigo_col = header_index(&headers, &["Sênior", "Senior", "Código", "Codigo"]);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to parse Sênior line {}", line + 2))?;
        rows.push(SeniorRecord {
            cnpj: field(&record, id_col),
            nome: field(&record, nome_col),
            codigo: field(&record, codigo_col),
        });
    }
    Ok(rows)
}

/// Parse a Gestta (tasks) export. Comma-delimited, id column CNPJ with a
/// lowercase "cnpj" fallback in older exports.
pub fn parse_gestta(content: &str) -> Result<Vec<GesttaRecord>> {
    let mut reader = make_reader(content, SourceKind::Gestta);
    let headers = reader.headers().context("Gestta export has no header row")?.clone();

    let id_col = header_index(&headers, &["CNPJ", "cnpj"]);
    let nome_col = header_index(&headers, &["Nome", "NOME", "nome"]);
    let codigo_col = header_index(&headers, &["Código", "Codigo"]);
    let status_col = header_index(&headers, &["Ativo/inativo", "Ativo/Inativo"]);

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to parse Gestta line {}", line + 2))?;
        rows.push(GesttaRecord {
            cnpj: field(&record, id_col),
            nome: field(&record, nome_col),
            codigo: field(&record, codigo_col),
            status: field(&record, status_col),
        });
    }
    Ok(rows)
}

// ============================================================================
// BATCH DEDUPLICATION (last writer wins, first-seen order preserved)
// ============================================================================

/// Collapse rows that normalize to the same id: the later row replaces the
/// earlier one in place, and rows with no digits at all are dropped. The
/// indexes downstream rely on this guarantee instead of re-verifying it.
pub fn dedupe_last_writer<T, F>(rows: Vec<T>, id_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut out: Vec<T> = Vec::with_capacity(rows.len());
    let mut seen: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let id = normalize_id(id_of(&row));
        if id.is_empty() {
            continue;
        }
        match seen.get(&id) {
            Some(&pos) => out[pos] = row,
            None => {
                seen.insert(id, out.len());
                out.push(row);
            }
        }
    }
    out
}

/// Load and dedupe a Questor file.
pub fn load_questor(path: &Path) -> Result<Vec<QuestorRecord>> {
    let content = read_file_as_utf8(path)?;
    Ok(dedupe_last_writer(parse_questor(&content)?, |r| {
        r.inscricao_federal.as_str()
    }))
}

/// Load and dedupe a Sênior file.
pub fn load_senior(path: &Path) -> Result<Vec<SeniorRecord>> {
    let content = read_file_as_utf8(path)?;
    Ok(dedupe_last_writer(parse_senior(&content)?, |r| r.cnpj.as_str()))
}

/// Load and dedupe a Gestta file.
pub fn load_gestta(path: &Path) -> Result<Vec<GesttaRecord>> {
    let content = read_file_as_utf8(path)?;
    Ok(dedupe_last_writer(parse_gestta(&content)?, |r| r.cnpj.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_questor_pipe_delimited() {
        let content = "CODIGOEMPRESA|NOMEEMPRESA|INSCRFEDERAL|ESPECIEESTAB\n\
                       101|ACME LTDA|12.345.678/0001-99|INTEGRADA\n\
                       102|BETA SA|98.765.432/0001-10|IN COMPANY\n";
        let rows = parse_questor(content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].inscricao_federal, "12.345.678/0001-99");
        assert_eq!(rows[0].nome_empresa, "ACME LTDA");
        assert_eq!(rows[0].especie_estab, "INTEGRADA");
        assert_eq!(rows[1].codigo_empresa, "102");
    }

    #[test]
    fn test_parse_senior_quoted_fields() {
        let content = "Sênior,Nome,CNPJ\n\
                       55,\"ACME COMERCIO, LTDA\",12345678000199\n";
        let rows = parse_senior(content).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nome, "ACME COMERCIO, LTDA");
        assert_eq!(rows[0].cnpj, "12345678000199");
        assert_eq!(rows[0].codigo, "55");
    }

    #[test]
    fn test_parse_gestta_lowercase_cnpj_fallback() {
        let content = "Código,Nome,cnpj,Ativo/inativo\n\
                       7,CLIENTE X #1,12345678000199,Ativo\n";
        let rows = parse_gestta(content).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cnpj, "12345678000199");
        assert_eq!(rows[0].status, "Ativo");
        assert_eq!(rows[0].nome, "CLIENTE X #1");
    }

    #[test]
    fn test_gestta_missing_status_column_is_empty() {
        let content = "CNPJ,Nome\n12345678000199,CLIENTE X\n";
        let rows = parse_gestta(content).unwrap();
        assert_eq!(rows[0].status, "");
    }

    #[test]
    fn test_dedupe_last_writer_wins() {
        let rows = vec![
            SeniorRecord { cnpj: "12.345.678/0001-99".into(), nome: "OLD".into(), codigo: "1".into() },
            SeniorRecord { cnpj: "98765432000110".into(), nome: "OTHER".into(), codigo: "2".into() },
            SeniorRecord { cnpj: "12345678000199".into(), nome: "NEW".into(), codigo: "3".into() },
            SeniorRecord { cnpj: "sem cnpj".into(), nome: "DROPPED".into(), codigo: "4".into() },
        ];
        let deduped = dedupe_last_writer(rows, |r| r.cnpj.as_str());
        assert_eq!(deduped.len(), 2);
        // Later row replaced the earlier one, in the earlier one's position
        assert_eq!(deduped[0].nome, "NEW");
        assert_eq!(deduped[1].nome, "OTHER");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "SÃO PAULO" encoded as Windows-1252: Ã = 0xC3 alone is invalid UTF-8
        let mut bytes = b"CNPJ,Nome\n12345678000199,S".to_vec();
        bytes.push(0xC3);
        bytes.extend_from_slice(b"O PAULO LTDA\n");

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let content = read_file_as_utf8(file.path()).unwrap();
        assert!(content.contains("SÃO PAULO"), "got: {content}");
        assert!(!content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_load_senior_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "CNPJ,Nome,Sênior\n12345678000199,ACME,77\n").unwrap();
        let rows = load_senior(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].codigo, "77");
    }
}
