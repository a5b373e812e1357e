use std::path::PathBuf;

use pdfrows_core::error::PdfRowsError;
use pdfrows_core::options::load_options;
use pdfrows_core::{ImportOptions, Marker};

use super::Input;
use crate::output;
use crate::page_range::parse_page_list;

pub struct ImportArgs {
    pub input_file: PathBuf,
    pub backend: Option<String>,
    pub pages: Option<String>,
    pub starts_after: Option<String>,
    pub starts_after_regex: Option<String>,
    pub ends_before: Option<String>,
    pub ends_before_regex: Option<String>,
    pub algorithm: Option<String>,
    pub config: Option<PathBuf>,
    pub output: String,
    pub out: Option<PathBuf>,
}

pub fn run(args: ImportArgs) -> Result<(), PdfRowsError> {
    let options = build_options(&args)?;
    let input = Input::open(&args.input_file)?;
    let table = pdfrows_core::import_from_pdf(input.source(), &options)?;

    let rendered = match args.output.as_str() {
        "json" => output::json::format(&table)?,
        "csv" => output::csv::format(&table)?,
        "table" => output::table::format(&table),
        other => {
            return Err(PdfRowsError::Configuration(format!(
                "unknown output format '{other}' (expected table, csv or json)"
            )))
        }
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, rendered)?;
            eprintln!(
                "Extracted {} row(s) x {} field(s), written to {}",
                table.len(),
                table.fields.len(),
                path.display()
            );
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Options from `--config` (if any), overridden by the individual flags.
fn build_options(args: &ImportArgs) -> Result<ImportOptions, PdfRowsError> {
    let mut options = match &args.config {
        Some(path) => load_options(path)?,
        None => ImportOptions::new(),
    };

    if let Some(ref backend) = args.backend {
        options.backend = backend.parse()?;
    }
    if let Some(ref algorithm) = args.algorithm {
        options.algorithm = algorithm.parse()?;
    }
    if let Some(ref pages) = args.pages {
        options.page_numbers = Some(parse_page_list(pages)?);
    }

    if let Some(marker) = marker(&args.starts_after, &args.starts_after_regex)? {
        options.starts_after = Some(marker);
    }
    if let Some(marker) = marker(&args.ends_before, &args.ends_before_regex)? {
        options.ends_before = Some(marker);
    }
    Ok(options)
}

fn marker(text: &Option<String>, regex: &Option<String>) -> Result<Option<Marker>, PdfRowsError> {
    match (text, regex) {
        (_, Some(re)) => Marker::pattern(re).map(Some),
        (Some(text), None) => Ok(Some(Marker::literal(text.as_str()))),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfrows_core::{Algorithm, BackendKind};

    fn args() -> ImportArgs {
        ImportArgs {
            input_file: PathBuf::from("milho.pdf"),
            backend: None,
            pages: None,
            starts_after: None,
            starts_after_regex: None,
            ends_before: None,
            ends_before_regex: None,
            algorithm: None,
            config: None,
            output: "table".into(),
            out: None,
        }
    }

    #[test]
    fn flags_build_options() {
        let mut a = args();
        a.backend = Some("pdftotext".into());
        a.pages = Some("2,1".into());
        a.starts_after_regex = Some("MILHO SAFRA .*".into());
        a.ends_before = Some("*Variação em pontos percentuais.".into());
        a.algorithm = Some("header-position".into());

        let options = build_options(&a).unwrap();
        assert_eq!(options.backend, BackendKind::Pdftotext);
        assert_eq!(options.page_numbers, Some(vec![2, 1]));
        assert_eq!(options.starts_after, Some(Marker::pattern("MILHO SAFRA .*").unwrap()));
        assert_eq!(
            options.ends_before,
            Some(Marker::literal("*Variação em pontos percentuais."))
        );
        assert_eq!(options.algorithm, Algorithm::HeaderPosition);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"algorithm": "header-position", "ends_before": "Fonte"}"#,
        )
        .unwrap();

        let mut a = args();
        a.config = Some(file.path().to_path_buf());
        a.algorithm = Some("y-groups".into());

        let options = build_options(&a).unwrap();
        assert_eq!(options.algorithm, Algorithm::YGroups);
        assert_eq!(options.ends_before, Some(Marker::literal("Fonte")));
    }

    #[test]
    fn bad_flags_are_configuration_errors() {
        let mut a = args();
        a.algorithm = Some("lattice".into());
        assert!(matches!(build_options(&a), Err(PdfRowsError::Configuration(_))));

        let mut a = args();
        a.starts_after_regex = Some("(".into());
        assert!(matches!(build_options(&a), Err(PdfRowsError::Configuration(_))));
    }
}
