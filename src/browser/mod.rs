use anyhow::{bail, Context, Result};

use crate::buffered_eprintln;

/// Open a URL in the user's default browser
///
/// # Errors
/// Returns error if browser cannot be opened (e.g., no browser available)
pub fn open_url(url: &str) -> Result<()> {
    webbrowser::open(url).with_context(|| format!("Failed to open browser for {}", url))?;
    Ok(())
}

/// Open every chart URL, reporting individual failures.
/// Fails only when no chart could be opened at all.
pub fn open_charts(charts: &[(&str, String)]) -> Result<usize> {
    if charts.is_empty() {
        bail!("The prediction service returned no charts");
    }

    let mut opened = 0;
    for (label, url) in charts {
        match open_url(url) {
            Ok(()) => opened += 1,
            Err(e) => buffered_eprintln!("{} chart: {:#}", label, e),
        }
    }

    if opened == 0 {
        bail!("Could not open any chart in a browser");
    }
    Ok(opened)
}
