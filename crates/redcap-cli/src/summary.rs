use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use redcap_model::{Metadata, ValidRange};

/// Tabulates the fields of `metadata`, one row per raw or expanded field.
pub fn metadata_table(metadata: &Metadata, expand: bool) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Form"),
        header_cell("Type"),
        header_cell("Logical"),
        header_cell("Label"),
        header_cell("Range"),
        header_cell("Required"),
        header_cell("Hidden"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 6, CellAlignment::Center);
    align_column(&mut table, 7, CellAlignment::Center);

    for name in metadata.variables(expand) {
        let Ok(descriptor) = metadata.descriptor(name) else {
            continue;
        };
        let logical = match metadata.logical_type(name) {
            Ok(logical_type) => Cell::new(logical_type),
            Err(_) => Cell::new("unsupported").fg(Color::Red),
        };
        let range = match metadata.valid_range(name) {
            Ok(Some(range)) => Cell::new(format_range(&range)),
            Ok(None) => dim_cell("-"),
            Err(_) => Cell::new("invalid").fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(&descriptor.form),
            Cell::new(&descriptor.raw_type),
            logical,
            Cell::new(&descriptor.label),
            range,
            flag_cell(metadata.is_required(name).unwrap_or(false)),
            flag_cell(metadata.is_hidden(name).unwrap_or(false)),
        ]);
    }
    table
}

pub fn print_metadata(metadata: &Metadata, expand: bool) {
    println!("{}", metadata_table(metadata, expand));
    println!(
        "{} fields, {} variables",
        metadata.raw_fields().len(),
        metadata.expanded_fields().len()
    );
}

fn format_range(range: &ValidRange) -> String {
    let (min, max) = range.bounds();
    let bound = |value: Option<_>| value.map_or_else(String::new, ToString::to_string);
    format!("{} .. {}", bound(min), bound(max))
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).fg(Color::DarkGrey)
}

fn flag_cell(set: bool) -> Cell {
    if set {
        Cell::new("✓").fg(Color::Green)
    } else {
        dim_cell("-")
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
