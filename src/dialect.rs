//! GFIP report layout assembly.
//!
//! Builds the [`ReportLayout`] for the GFIP/SEFIP worker report from the
//! patterns in [`crate::constants`], plus any extra nullable fields supplied
//! through configuration.

use crate::catalog::{Boundary, ReportLayout, SectionSpec};
use crate::config::ExtractorConfig;
use crate::constants::{header, worker};
use crate::error::Result;
use crate::models::SectionKind;
use tracing::debug;

/// Build the GFIP layout honouring the config's nullable field lists
pub fn gfip_layout(config: &ExtractorConfig) -> Result<ReportLayout> {
    let header_spec = section(
        SectionKind::Header,
        (header::ENTER, header::EXIT),
        header::FIELDS,
        header::NULLABLE,
        &config.nullable_header_fields,
    )?;
    let worker_spec = section(
        SectionKind::Worker,
        (worker::ENTER, worker::EXIT),
        worker::FIELDS,
        worker::NULLABLE,
        &config.nullable_worker_fields,
    )?;

    debug!(
        "GFIP layout: {} header fields, {} worker fields",
        header_spec.rules().len(),
        worker_spec.rules().len()
    );

    ReportLayout::new(header_spec, worker_spec)
}

fn section(
    kind: SectionKind,
    (enter, exit): (&str, &str),
    fields: &[(&str, &str)],
    nullable: &[&str],
    extra_nullable: &[String],
) -> Result<SectionSpec> {
    let mut builder = SectionSpec::builder(kind, Boundary::new(enter, exit)?);
    for (name, pattern) in fields {
        builder = builder.field(name, pattern)?;
    }
    for name in nullable {
        builder = builder.nullable(*name);
    }
    for name in extra_nullable {
        builder = builder.nullable(name.clone());
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PERIOD_FIELD;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_layout_catalogs() {
        let layout = gfip_layout(&ExtractorConfig::default()).unwrap();

        assert_eq!(layout.header().rules().len(), 6);
        assert_eq!(layout.worker().rules().len(), 8);
        assert!(layout.header().declares(PERIOD_FIELD));
        assert!(layout.worker().is_nullable("ocorrencia"));
        assert!(!layout.worker().is_nullable("pis"));
    }

    #[test]
    fn test_header_patterns() {
        let layout = gfip_layout(&ExtractorConfig::default()).unwrap();
        let header = layout.header();

        assert!(header.boundary().opens("12 - GFIP"));
        assert!(header.boundary().closes("Totais da GFIP"));

        let period = header
            .rules()
            .iter()
            .find(|rule| rule.name() == PERIOD_FIELD)
            .unwrap();
        assert_eq!(period.extract("Mês  Março de 2019"), Some("Março de 2019"));
        assert_eq!(period.extract("Mês  13° mês de 2019"), Some("13° mês de 2019"));
    }

    #[test]
    fn test_worker_patterns() {
        let layout = gfip_layout(&ExtractorConfig::default()).unwrap();
        let worker = layout.worker();

        assert!(worker.boundary().opens("Nome Trabalhador   MARIA DA SILVA"));
        assert!(worker.boundary().closes("------------------------------"));
        assert!(!worker.boundary().closes("---- short ----"));

        let find = |name: &str| {
            worker
                .rules()
                .iter()
                .find(|rule| rule.name() == name)
                .unwrap()
                .clone()
        };
        assert_eq!(
            find("base_inss").extract("Base Cálc. Prev. Social   1.234,56"),
            Some("1.234,56")
        );
        assert_eq!(
            find("base_inss").extract("Base Cálc. 13° Prev. Social   100,00"),
            None
        );
        assert_eq!(find("ocorrencia").extract("Ocorrência"), Some(""));
    }

    #[test]
    fn test_extra_nullable_fields() {
        let config = ExtractorConfig::default().with_nullable_worker_field("cbo");
        let layout = gfip_layout(&config).unwrap();
        assert!(layout.worker().is_nullable("cbo"));

        let config = ExtractorConfig::default().with_nullable_header_field("salario");
        let err = gfip_layout(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
