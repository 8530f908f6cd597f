//! crates/meams_core/src/units.rs
//!
//! Unit pluralization for supply stock cards. The known-unit table is fixed;
//! anything outside it falls back to the trailing-`s` rules.

/// Units with an explicit plural form.
const UNIT_TABLE: &[(&str, &str)] = &[
    ("box", "boxes"),
    ("piece", "pieces"),
    ("pack", "packs"),
    ("bottle", "bottles"),
    ("gallon", "gallons"),
    ("set", "sets"),
    ("roll", "rolls"),
    ("bag", "bags"),
    ("meter", "meters"),
    ("ream", "reams"),
];

/// Renders the display unit for a quantity. A quantity of exactly one yields
/// the singular; otherwise known units use the table, an already-plural unit
/// is kept, and any other unit appends `s`. A missing or empty unit maps to
/// `unit`/`units`.
pub fn pluralize_unit(unit: Option<&str>, quantity: i64) -> String {
    let unit = unit.map(str::trim).filter(|u| !u.is_empty());

    let singular = unit.unwrap_or("unit");
    if quantity == 1 {
        return singular.to_string();
    }

    let lowered = singular.to_lowercase();
    if let Some((_, plural)) = UNIT_TABLE.iter().find(|(s, _)| *s == lowered) {
        return (*plural).to_string();
    }
    if singular.ends_with('s') {
        return singular.to_string();
    }
    format!("{}s", singular)
}
