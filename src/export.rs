use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    cli::ExportArgs,
    error::DashboardError,
    filter::apply_filters,
    frame::Frame,
    io_utils,
    session::Session,
};

pub fn execute(args: &ExportArgs) -> Result<()> {
    let session = Session::from_args(&args.data)?;
    if session.dataset().is_empty() {
        return Err(DashboardError::EmptyDataset { stage: "mapping" }.into());
    }
    let view = apply_filters(session.dataset(), &args.data.selection()?);
    if view.is_empty() {
        warn!("Filtered view is empty; writing headers only");
    }
    let output = args.output.as_deref();
    let delimiter = io_utils::resolve_output_delimiter(output, args.output_delimiter);
    write_csv(&view, output, delimiter)?;
    match output {
        Some(path) if !io_utils::is_dash(path) => {
            info!("Exported {} row(s) to {path:?}", view.len())
        }
        _ => info!("Exported {} row(s) to stdout", view.len()),
    }
    Ok(())
}

/// Writes `frame` with its own column names and order; missing cells are empty.
pub fn write_csv(frame: &Frame, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter)?;
    writer
        .write_record(frame.columns())
        .context("Writing CSV header")?;
    for (idx, row) in frame.display_rows().iter().enumerate() {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row {}", idx + 2))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}
