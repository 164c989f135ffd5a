use log::debug;

use crate::{
    data::{Value, detect_structured_format, parse_lenient_datetime, parse_number, parse_with_format},
    frame::Frame,
    mapping::StandardField,
};

/// Types the standard columns of a mapped table. `date` becomes date/time and
/// the numeric fields become `f64`; cells that cannot be read become missing.
/// Rows are never dropped and other columns are left as loaded.
pub fn coerce_types(mut frame: Frame) -> Frame {
    if let Some(idx) = frame.column_index(StandardField::Date.as_str()) {
        coerce_date_column(&mut frame, idx);
    }
    for field in StandardField::NUMERIC {
        if let Some(idx) = frame.column_index(field.as_str()) {
            for cell in frame.column_cells_mut(idx) {
                *cell = cell.take().and_then(coerce_number);
            }
        }
    }
    frame
}

fn coerce_number(value: Value) -> Option<Value> {
    let number = match value {
        Value::Number(f) => Some(f).filter(|f| f.is_finite()),
        Value::Text(text) => parse_number(&text),
        Value::DateTime(_) => None,
    };
    number.map(Value::Number)
}

/// Structured pass first: the format that reads the first text cell must read
/// every text cell. Any miss sends the whole column through the lenient parser.
fn coerce_date_column(frame: &mut Frame, idx: usize) {
    let texts = frame
        .rows()
        .iter()
        .filter_map(|row| match &row[idx] {
            Some(Value::Text(text)) => Some(text.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    let structured = texts
        .first()
        .and_then(|first| detect_structured_format(first))
        .filter(|fmt| texts.iter().all(|t| parse_with_format(t, fmt).is_some()));
    match structured {
        Some(fmt) => debug!("Parsing date column with structured format '{fmt}'"),
        None if !texts.is_empty() => debug!("Structured date parse failed; using lenient parsing"),
        None => {}
    }

    for cell in frame.column_cells_mut(idx) {
        *cell = match cell.take() {
            Some(Value::DateTime(dt)) => Some(Value::DateTime(dt)),
            Some(Value::Text(text)) => {
                let parsed = match structured {
                    Some(fmt) => parse_with_format(&text, fmt),
                    None => parse_lenient_datetime(&text),
                };
                parsed.map(Value::DateTime)
            }
            Some(Value::Number(n)) => parse_lenient_datetime(&Value::Number(n).as_display())
                .map(Value::DateTime),
            None => None,
        };
    }
}
