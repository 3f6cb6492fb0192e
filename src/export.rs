// CSV export of the filtered/sorted view
//
// UTF-8 with a BOM so Excel on Windows opens the accents correctly,
// `\n` separators, fixed Portuguese header, booleans as "Sim"/"Não".
// Quoting is RFC-4180: any field with a comma, quote or newline is wrapped
// and internal quotes doubled, so the document re-splits losslessly.

use crate::consolidate::ConsolidatedEntity;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::path::Path;

/// Byte-order marker Excel expects on UTF-8 CSVs.
const BOM: &str = "\u{FEFF}";

/// Fixed export header, one title per consolidated column.
pub const EXPORT_HEADERS: [&str; 10] = [
    "Documento",
    "Empresa",
    "Questor",
    "Sênior",
    "Origem Fat.",
    "Gestta",
    "Diagnóstico",
    "Área Gestta",
    "Área Questor",
    "Confronto",
];

fn sim_nao(value: bool) -> &'static str {
    if value {
        "Sim"
    } else {
        "Não"
    }
}

fn row_fields(e: &ConsolidatedEntity) -> [String; 10] {
    [
        e.id.clone(),
        e.nome.clone(),
        sim_nao(e.questor).to_string(),
        sim_nao(e.senior).to_string(),
        e.senior_origem.as_str().to_string(),
        e.gestta.clone(),
        e.diagnostico.as_str().to_string(),
        e.area_gestta.map(|a| a.as_str()).unwrap_or("").to_string(),
        e.area_questor.map(|a| a.as_str()).unwrap_or("").to_string(),
        e.confronto_area.as_str().to_string(),
    ]
}

/// Serialize the rows exactly as given - the caller has already applied the
/// view's filter and sort, and the export must mirror it with no extra rows.
pub fn export_csv(rows: &[ConsolidatedEntity]) -> String {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    // The writer only fails on I/O, and Vec<u8> has none.
    let _ = writer.write_record(EXPORT_HEADERS);
    for entity in rows {
        let _ = writer.write_record(row_fields(entity));
    }

    let bytes = writer.into_inner().unwrap_or_default();
    let body = String::from_utf8(bytes).unwrap_or_default();
    format!("{BOM}{body}")
}

/// Write the export document to disk.
pub fn write_export(path: impl AsRef<Path>, rows: &[ConsolidatedEntity]) -> Result<()> {
    let path = path.as_ref();
    let document = export_csv(rows);
    std::fs::write(path, document)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AreaVerdict, BillingOrigin, Diagnosis};

    fn entity(id: &str, nome: &str) -> ConsolidatedEntity {
        ConsolidatedEntity {
            id: id.into(),
            nome: nome.into(),
            codigo_questor: String::new(),
            codigo_senior: String::new(),
            codigo_gestta: String::new(),
            questor: true,
            senior: false,
            senior_origem: BillingOrigin::Ausente,
            gestta: "AUSENTE".into(),
            diagnostico: Diagnosis::ClienteInativoBaixa,
            area_gestta: None,
            area_questor: None,
            confronto_area: AreaVerdict::FaltaAmbos,
            payer_id: None,
            is_direct_senior: false,
            is_excluded: false,
        }
    }

    #[test]
    fn test_export_starts_with_bom_and_header() {
        let doc = export_csv(&[]);
        assert!(doc.starts_with('\u{FEFF}'));
        let body = doc.trim_start_matches('\u{FEFF}');
        let first_line = body.lines().next().unwrap();
        assert_eq!(
            first_line,
            "Documento,Empresa,Questor,Sênior,Origem Fat.,Gestta,Diagnóstico,Área Gestta,Área Questor,Confronto"
        );
    }

    #[test]
    fn test_export_localized_booleans() {
        let doc = export_csv(&[entity("12345678000199", "ACME")]);
        let body = doc.trim_start_matches('\u{FEFF}');
        let row = body.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "12345678000199,ACME,Sim,Não,Ausente,AUSENTE,Cliente Inativo (Baixa),,,Falta Gestta/Questor"
        );
    }

    #[test]
    fn test_export_round_trip_with_quoting() {
        let rows = vec![
            entity("1", "ACME COMERCIO, LTDA"),
            entity("2", "JOSE \"ZE\" TRANSPORTES"),
            entity("3", "LINHA\nQUEBRADA SA"),
        ];
        let doc = export_csv(&rows);
        let body = doc.trim_start_matches('\u{FEFF}');

        // Fields with commas/quotes/newlines must come back intact
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(body.as_bytes());
        let records: Vec<csv::StringRecord> =
            reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), rows.len());
        for (record, row) in records.iter().zip(&rows) {
            assert_eq!(record.get(0), Some(row.id.as_str()));
            assert_eq!(record.get(1), Some(row.nome.as_str()));
        }
    }

    #[test]
    fn test_write_export_accepts_string_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saida.csv").to_string_lossy().into_owned();

        write_export(&path, &[entity("12345678000199", "ACME")]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with('\u{FEFF}'));
        assert!(written.contains("12345678000199,ACME"));
    }

    #[test]
    fn test_export_mirrors_input_order() {
        let rows = vec![entity("3", "C"), entity("1", "A"), entity("2", "B")];
        let doc = export_csv(&rows);
        let body = doc.trim_start_matches('\u{FEFF}');
        let ids: Vec<&str> = body
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }
}
