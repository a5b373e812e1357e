use pdfrows_core::algorithms::Algorithm;
use pdfrows_core::error::PdfRowsError;
use pdfrows_core::BackendKind;

pub fn run() -> Result<(), PdfRowsError> {
    println!("{:<10}  {:<9}  {:<5}  algorithms", "backend", "available", "rects");
    for kind in BackendKind::ALL {
        let backend = kind.backend();
        let algorithms: Vec<&str> = Algorithm::ALL
            .iter()
            .filter(|a| a.check_backend(backend.as_ref()).is_ok())
            .map(|a| a.name())
            .collect();
        println!(
            "{:<10}  {:<9}  {:<5}  {}",
            kind.name(),
            if kind.is_available() { "yes" } else { "no" },
            if kind.supports_rects() { "yes" } else { "no" },
            algorithms.join(", ")
        );
    }
    Ok(())
}
