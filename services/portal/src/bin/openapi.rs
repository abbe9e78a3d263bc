//! services/portal/src/bin/openapi.rs
//!
//! Writes the portal's OpenAPI document. The output path is the first
//! argument and defaults to `openapi.json`.

use portal_lib::web::rest::ApiDoc;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let doc = ApiDoc::openapi();
    std::fs::write(&output, doc.to_pretty_json()?)?;
    println!(
        "Wrote {} paths of the access portal API to {}",
        doc.paths.paths.len(),
        output.display()
    );
    Ok(())
}
