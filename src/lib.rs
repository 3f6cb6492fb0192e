// Conciliador Base de Clientes - Core Library
// Reconciles the client base across Questor (ERP), Sênior (billing) and
// Gestta (tasks), joined on the normalized CNPJ.

pub mod normalize;
pub mod records;
pub mod ingest;
pub mod index;
pub mod attribution;
pub mod diagnosis;
pub mod consolidate;
pub mod view;
pub mod export;
pub mod state;
pub mod db;

// Re-export commonly used types
pub use normalize::{fold_accents_upper, matrix_prefix, normalize_id, MATRIX_PREFIX_LEN};
pub use records::{
    Area, AreaVerdict, BillingOrigin, Diagnosis,
    GesttaRecord, QuestorRecord, SeniorRecord, SourceKind,
};
pub use ingest::{
    decode_bytes, load_gestta, load_questor, load_senior,
    parse_gestta, parse_questor, parse_senior, read_file_as_utf8,
};
pub use index::SourceIndex;
pub use attribution::{resolve_attribution, BillingAttribution};
pub use diagnosis::{
    area_verdict, derive_diagnosis, gestta_active, gestta_area, gestta_status,
    questor_area, GESTTA_ABSENT,
};
pub use consolidate::{build_consolidated, ConsolidatedEntity, UNKNOWN_NAME};
pub use view::{
    natural_cmp, ColumnFilters, GesttaStatusFilter, SortConfig, SortDirection,
    SortKey, ViewState,
};
pub use export::{export_csv, write_export, EXPORT_HEADERS};
pub use state::{AppState, AuditEntry, SYSTEM_ACTOR};
pub use db::{load_audit, load_state, open_database, save_state, setup_database};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
