use std::{collections::BTreeMap, fmt::Write as _};

use anyhow::{Context, Result};
use log::info;

use crate::{
    breakdown::Aggregate,
    cli::SummaryArgs,
    data::{Value, format_amount},
    filter::date_bounds,
    session::{RenderPass, Session},
    table,
};

pub fn execute(args: &SummaryArgs) -> Result<()> {
    let session = Session::from_args(&args.data)?;
    let selection = args.data.selection()?;
    let pass = session.snapshot().render(&selection, args.top)?;
    if args.json {
        let json = serde_json::to_string_pretty(&pass).context("Serializing summary")?;
        println!("{json}");
    } else {
        print!("{}", render_summary(&pass));
    }
    info!(
        "Summarized {} of {} row(s)",
        pass.rows,
        session.dataset().len()
    );
    Ok(())
}

pub fn render_summary(pass: &RenderPass) -> String {
    let mut out = String::new();

    if let Some((first, last)) = date_bounds(&pass.view) {
        let _ = writeln!(out, "Period {first} to {last}\n");
    }
    let _ = writeln!(out, "Data quality");
    if pass.issues.is_empty() {
        let _ = writeln!(out, "  no issues found");
    }
    for issue in &pass.issues {
        let _ = writeln!(out, "  - {issue}");
    }

    let _ = writeln!(out, "\nKPIs ({} row(s))", pass.rows);
    out.push_str(&table::render_pairs(&pass.kpis.display_rows()));

    if let Some(trend) = trend_table(pass) {
        let _ = writeln!(out, "\nDaily trend");
        out.push_str(&trend);
    }

    for aggregate in &pass.charts.breakdowns {
        let _ = writeln!(
            out,
            "\nTop {} by {}",
            aggregate.dimension, aggregate.metric
        );
        out.push_str(&table::render_table(
            &aggregate.headers(),
            &aggregate.display_rows(),
        ));
    }
    out
}

/// Sales and orders per date side by side; either series may be absent.
fn trend_table(pass: &RenderPass) -> Option<String> {
    let series = [
        pass.charts.sales_over_time.as_ref(),
        pass.charts.orders_over_time.as_ref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<&Aggregate>>();
    if series.is_empty() {
        return None;
    }
    let mut by_date: BTreeMap<&Value, Vec<String>> = BTreeMap::new();
    for (idx, aggregate) in series.iter().enumerate() {
        for row in &aggregate.rows {
            let cells = by_date
                .entry(&row.key)
                .or_insert_with(|| vec![String::new(); series.len()]);
            cells[idx] = format_amount(row.total);
        }
    }
    let mut headers = vec!["date".to_string()];
    headers.extend(series.iter().map(|aggregate| aggregate.metric.to_string()));
    let rows = by_date
        .into_iter()
        .map(|(date, cells)| {
            let mut row = vec![date.as_display()];
            row.extend(cells);
            row
        })
        .collect::<Vec<_>>();
    Some(table::render_table(&headers, &rows))
}
