//! The two values returned by `solve`: the solution itself and a report on how it was reached.
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::time::Duration;
use tabled::{builder::Builder, settings::Style};

/// Solved (or supplied) value of every variable, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    values: BTreeMap<String, f64>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, var: &str, value: f64) {
        self.values.insert(var.to_string(), value);
    }

    pub fn get(&self, var: &str) -> Option<f64> {
        self.values.get(var).copied()
    }

    pub fn contains(&self, var: &str) -> bool {
        self.values.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.values.iter()
    }
}

impl FromIterator<(String, f64)> for Solution {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Solution {
            values: iter.into_iter().collect(),
        }
    }
}

impl Index<&str> for Solution {
    type Output = f64;
    /// Panics when `var` has no value, like indexing a map.
    fn index(&self, var: &str) -> &f64 {
        &self.values[var]
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(vec!["variable".to_string(), "value".to_string()]);
        for (var, value) in self.iter() {
            builder.push_record(vec![var.clone(), format!("{}", value)]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        write!(f, "{}", table)
    }
}

/// Metadata of a solve: what was solved, in which order, and what was left over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveReport {
    /// one entry per solved equation or block, in solving order
    pub log: Vec<String>,
    /// equations never reached
    pub unsolved: Vec<String>,
    /// fully known equations whose residual exceeded the tolerance
    pub inconsistent: Vec<String>,
    /// variables accepted without convergence
    pub nonconverged: Vec<String>,
    /// scalar plus Newton block iterations
    pub iterations: usize,
    pub elapsed: Duration,
}

impl SolveReport {
    /// Every equation solved, none inconsistent, all converged.
    pub fn is_complete(&self) -> bool {
        self.unsolved.is_empty() && self.inconsistent.is_empty() && self.nonconverged.is_empty()
    }
}

fn write_section(f: &mut fmt::Formatter, title: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}:", title)?;
    for item in items {
        writeln!(f, "  {}", item)?;
    }
    Ok(())
}

impl fmt::Display for SolveReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "procedure:")?;
        for (i, step) in self.log.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, step)?;
        }
        write_section(f, "unsolved equations", &self.unsolved)?;
        write_section(f, "inconsistent equations", &self.inconsistent)?;
        write_section(f, "not converged", &self.nonconverged)?;
        write!(
            f,
            "{} iterations in {:.3} ms",
            self.iterations,
            self.elapsed.as_secs_f64() * 1e3
        )
    }
}
