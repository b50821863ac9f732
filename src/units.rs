//! Unit-conversion factors and named physical constants.
//!
//! Both tables are embedded TOML files parsed once per process. Unit data is grouped by
//! quantity; every unit maps to its value in SI. Derived units are generated on load:
//! `a^2` areas, `a^3` volumes, `a-b` products and `a/b` ratios.
use crate::errors::NexsysError;
use log::debug;
use std::collections::HashMap;
use std::sync::LazyLock;

pub type UnitTable = HashMap<String, HashMap<String, f64>>;

const RAW_UNITS: &str = include_str!("units/units.toml");
const RAW_CONSTS: &str = include_str!("units/consts.toml");

static UNIT_DATA: LazyLock<Result<UnitTable, String>> = LazyLock::new(build_unit_data);
static CONST_DATA: LazyLock<Result<HashMap<String, f64>, String>> =
    LazyLock::new(|| parse_const_table(RAW_CONSTS));

fn toml_number(value: &toml::Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

/// Parses a `[QUANTITY] unit = si_value` document.
pub fn parse_unit_table(text: &str) -> Result<UnitTable, String> {
    let table = text.parse::<toml::Table>().map_err(|e| e.to_string())?;
    let mut data = UnitTable::new();
    for (quantity, units) in table {
        let units = units
            .as_table()
            .ok_or_else(|| format!("quantity `{}` is not a table", quantity))?;
        let mut factors = HashMap::new();
        for (unit, value) in units {
            let factor = toml_number(value)
                .ok_or_else(|| format!("unit `{}` of `{}` is not a number", unit, quantity))?;
            factors.insert(unit.clone(), factor);
        }
        data.insert(quantity, factors);
    }
    Ok(data)
}

/// Parses a `name = { value = .., description = .. }` document (a bare number is accepted too).
pub fn parse_const_table(text: &str) -> Result<HashMap<String, f64>, String> {
    let table = text.parse::<toml::Table>().map_err(|e| e.to_string())?;
    table
        .iter()
        .map(|(name, entry)| {
            let value = match entry {
                toml::Value::Table(t) => t.get("value").and_then(toml_number),
                other => toml_number(other),
            };
            value
                .map(|v| (name.clone(), v))
                .ok_or_else(|| format!("constant `{}` has no numeric value", name))
        })
        .collect()
}

fn units_of<'a>(data: &'a UnitTable, quantity: &str) -> Vec<(&'a String, &'a f64)> {
    data.get(quantity)
        .map(|units| units.iter().collect())
        .unwrap_or_default()
}

fn extend_quantity(data: &mut UnitTable, quantity: &str, generated: HashMap<String, f64>) {
    data.entry(quantity.to_string())
        .or_default()
        .extend(generated);
}

/// `fc1-fc2` and `fc2-fc1` products, or `a^2` when both factors are the same quantity
fn generate_product_units(data: &mut UnitTable, quantity: &str, fc1: &str, fc2: &str) {
    let mut generated = HashMap::new();
    if fc1 == fc2 {
        for (unit, value) in units_of(data, fc1) {
            generated.insert(format!("{}^2", unit), value * value);
        }
    } else {
        for (u1, v1) in units_of(data, fc1) {
            for (u2, v2) in units_of(data, fc2) {
                generated.insert(format!("{}-{}", u1, u2), v1 * v2);
                generated.insert(format!("{}-{}", u2, u1), v1 * v2);
            }
        }
    }
    extend_quantity(data, quantity, generated);
}

fn generate_volume_units(data: &mut UnitTable) {
    let generated = units_of(data, "LENGTH")
        .into_iter()
        .map(|(unit, value)| (format!("{}^3", unit), value * value * value))
        .collect();
    extend_quantity(data, "VOLUME", generated);
}

fn generate_ratio_units(data: &mut UnitTable, quantity: &str, num: &str, denom: &str) {
    let mut generated = HashMap::new();
    for (u1, v1) in units_of(data, num) {
        for (u2, v2) in units_of(data, denom) {
            generated.insert(format!("{}/{}", u1, u2), v1 / v2);
        }
    }
    extend_quantity(data, quantity, generated);
}

fn build_unit_data() -> Result<UnitTable, String> {
    let mut data = parse_unit_table(RAW_UNITS)?;
    generate_product_units(&mut data, "AREA", "LENGTH", "LENGTH");
    generate_product_units(&mut data, "VISCOSITY-DYNAMIC", "PRESSURE", "TIME");
    // torque shares these units
    generate_product_units(&mut data, "ENERGY", "FORCE", "LENGTH");
    generate_volume_units(&mut data);

    generate_ratio_units(&mut data, "VELOCITY", "LENGTH", "TIME");
    generate_ratio_units(&mut data, "VOLUMETRIC-FLOW", "VOLUME", "TIME");
    generate_ratio_units(&mut data, "POWER", "ENERGY", "TIME");
    generate_ratio_units(&mut data, "PRESSURE", "FORCE", "AREA");
    generate_ratio_units(&mut data, "SPRING-RATE", "FORCE", "LENGTH");
    debug!(
        "unit table built: {} units in {} quantities",
        data.values().map(|u| u.len()).sum::<usize>(),
        data.len()
    );
    Ok(data)
}

/// Full unit table including generated units.
pub fn unit_data() -> Result<&'static UnitTable, NexsysError> {
    UNIT_DATA.as_ref().map_err(|e| NexsysError::Data(e.clone()))
}

/// Named constants table.
pub fn const_data() -> Result<&'static HashMap<String, f64>, NexsysError> {
    CONST_DATA.as_ref().map_err(|e| NexsysError::Data(e.clone()))
}

/// Factor that converts a quantity expressed in `from` into `to`:
/// `value_in_to = value_in_from * convert(from, to)`.
///
/// Fails when no quantity knows both units, or when several quantities disagree.
pub fn convert(from: &str, to: &str) -> Result<f64, NexsysError> {
    let (from, to) = (from.trim(), to.trim());
    let data = unit_data()?;
    let factors: Vec<f64> = data
        .values()
        .filter_map(|units| match (units.get(from), units.get(to)) {
            (Some(f), Some(t)) => Some(f / t),
            _ => None,
        })
        .collect();
    let conversion_error = || NexsysError::UnitConversion {
        from: from.to_string(),
        to: to.to_string(),
    };
    let first = *factors.first().ok_or_else(conversion_error)?;
    if factors
        .iter()
        .any(|f| (f - first).abs() > 1e-12 * first.abs())
    {
        return Err(conversion_error());
    }
    Ok(first)
}

/// Value of the constant written as `#name` in system text.
pub fn const_value(name: &str) -> Result<f64, NexsysError> {
    const_data()?
        .get(name)
        .copied()
        .ok_or_else(|| NexsysError::UnknownConstant(name.to_string()))
}
