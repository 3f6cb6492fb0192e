// Identifier normalization - the single join key across all three sources
//
// A CNPJ arrives as "12.345.678/0001-99" from Questor, "12345678000199" from
// Sênior exports and sometimes zero-padded or truncated from Gestta. The only
// thing all variants agree on is the digit sequence, so that IS the identity.

/// Length of the head-office prefix used for group (matriz) matching.
pub const MATRIX_PREFIX_LEN: usize = 8;

/// Strip every non-ASCII-digit character from a raw identifier.
///
/// Empty output means "no identifier" and the record is dropped from
/// indexing. No length or check-digit validation happens here.
pub fn normalize_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Head-office prefix of a normalized id, if it is long enough to have one.
///
/// The first 8 digits of a CNPJ identify the legal entity; the remaining
/// digits identify the branch. Only a grouping heuristic, never identity.
pub fn matrix_prefix(id: &str) -> Option<&str> {
    if id.len() >= MATRIX_PREFIX_LEN {
        Some(&id[..MATRIX_PREFIX_LEN])
    } else {
        None
    }
}

/// Uppercase and strip combining accents for comparison purposes.
///
/// Questor classification fields are free text typed by humans:
/// "Integrada", "INTEGRADA", "intégrada" must all compare equal.
/// Covers the Latin-1 accented range that appears in pt-BR data.
pub fn fold_accents_upper(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_uppercase().chars() {
        let folded = match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            'Ñ' => 'N',
            other => other,
        };
        out.push(folded);
    }
    // Collapse runs of whitespace the same way the comparison expects
    let mut collapsed = String::with_capacity(out.len());
    let mut last_was_space = false;
    for c in out.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                collapsed.push(' ');
            }
            last_was_space = true;
        } else {
            collapsed.push(c);
            last_was_space = false;
        }
    }
    collapsed
}
