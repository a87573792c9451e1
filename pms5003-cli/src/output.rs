use pms5003_lib::Measurement;
use std::fmt::Write;

const HEADERS: [&str; 3] = ["Data", "Number", "Unit"];

/// Render a measurement as a bordered three-column table.
pub fn render_table(m: &Measurement) -> String {
    let rows: Vec<[String; 3]> = m
        .rows()
        .map(|(field, value, unit)| [field.to_string(), value.to_string(), unit.to_string()])
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let border = {
        let mut line = String::from("+");
        for w in widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    let _ = writeln!(out, "{border}");
    let _ = writeln!(
        out,
        "| {:^w0$} | {:^w1$} | {:^w2$} |",
        HEADERS[0].to_uppercase(),
        HEADERS[1].to_uppercase(),
        HEADERS[2].to_uppercase(),
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    );
    let _ = writeln!(out, "{border}");
    for [label, value, unit] in &rows {
        let _ = writeln!(
            out,
            "| {:<w0$} | {:>w1$} | {:<w2$} |",
            label,
            value,
            unit,
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        );
    }
    let _ = writeln!(out, "{border}");
    out
}
