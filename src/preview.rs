use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, session::Session, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let session = Session::from_args(&args.data)?;
    let pass = session.render(&args.data.selection()?)?;
    let head = pass.view.head(args.rows);
    table::print_table(head.columns(), &head.display_rows());
    info!(
        "Displayed {} of {} filtered row(s)",
        head.len(),
        pass.view.len()
    );
    Ok(())
}
