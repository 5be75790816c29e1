//! Application constants for the GFIP extractor
//!
//! Sentinel and default values, plus the boundary and field patterns of the
//! GFIP/SEFIP "Relação de Trabalhadores" text report.

// =============================================================================
// Output Values
// =============================================================================

/// Placeholder written for the single field a section may lack at close.
/// Downstream writers must emit it verbatim.
pub const MISSING_SENTINEL: &str = "#[missing]";

/// Column holding the originating file name when requested
pub const SOURCE_COLUMN: &str = "source_file";

// =============================================================================
// Processing Defaults
// =============================================================================

/// Records buffered before a batch is handed to the output writer
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// File name pattern used when the input is a directory
pub const DEFAULT_INPUT_PATTERN: &str = "*.txt";

/// Refresh the progress spinner every this many records
pub const PROGRESS_UPDATE_INTERVAL: usize = 500;

// =============================================================================
// GFIP Report Dialect
// =============================================================================

/// Header section boundaries and capture rules
pub mod header {
    pub const ENTER: &str = r"^\d+ - GFIP$";
    pub const EXIT: &str = r"Totais da GFIP";

    pub const FIELDS: &[(&str, &str)] = &[
        ("cnae", r"Código CNAE Preponderante\s+(\d+)"),
        ("cnpj", r"CNPJ/CEI do Estabelecimento\s+(\d+.*)"),
        ("competencia", r"Mês\s+((?:\w+|13[°º] mês) de \d{4})"),
        ("fap", r"FAP\s+(\d+,\d+)"),
        ("rat", r"RAT: Alíquota\s+(\d+,\d+)"),
        ("rat_ajustado", r"RAT: Ajustado\s+(\d+,\d+)"),
    ];

    pub const NULLABLE: &[&str] = &[];
}

/// Worker section boundaries and capture rules.
///
/// The worker name is printed on the opening line itself.
pub mod worker {
    pub const ENTER: &str = r"^\s*Nome Trabalhador\b";
    pub const EXIT: &str = r"^\s*-{20,}\s*$";

    pub const FIELDS: &[(&str, &str)] = &[
        ("colaborador", r"Nome Trabalhador\s+(.*)"),
        ("pis", r"PIS/PASEP/CI\s+([\d.\-]+)"),
        ("admissao", r"Admissão\s+(\d{2}/\d{2}/\d{4})"),
        ("cbo", r"CBO\s+([\d\-]+)"),
        ("categoria", r"Categoria\s+(\d+)"),
        ("ocorrencia", r"Ocorrência\s*(\d*)"),
        ("base_inss", r"Base Cálc\. Prev\. Social\s+([\d.]+,\d{2})"),
        ("base_inss_13", r"Base Cálc\. 13° Prev\. Social\s+([\d.]+,\d{2})"),
    ];

    /// Most workers have no occurrence code, the label is printed blank
    pub const NULLABLE: &[&str] = &["ocorrencia"];
}
