//! Solver configuration: defaults, builder-style setters and TOML loading.
//!
//! ```toml
//! tolerance = 1e-10
//! max_iterations = 300
//! allow_nonconvergence = false
//! default_guess = 1.0
//! damping_factor = 1.0
//! linear_sys_method = "lu"   # or "inv"
//! loglevel = "warn"          # off, none, trace, debug, info, warn, error
//! log_to_file = false
//! ```
use crate::Utils::logger::parse_loglevel;
use crate::errors::NexsysError;
use crate::numerical::NR::LinearSysMethod;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// convergence threshold on the largest absolute residual
    pub tolerance: f64,
    pub max_iterations: usize,
    /// accept the last iterate when the iteration limit is hit
    pub allow_nonconvergence: bool,
    /// starting value of unknowns without a `guess`
    pub default_guess: f64,
    pub damping_factor: f64,
    pub linear_sys_method: LinearSysMethod,
    pub loglevel: String,
    pub log_to_file: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: 1e-10,
            max_iterations: 300,
            allow_nonconvergence: false,
            default_guess: 1.0,
            damping_factor: 1.0,
            linear_sys_method: LinearSysMethod::Lu,
            loglevel: "warn".to_string(),
            log_to_file: false,
        }
    }
}

fn expect_float(key: &str, value: &toml::Value) -> Result<f64, NexsysError> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .ok_or_else(|| NexsysError::Config(format!("`{}` must be a number", key)))
}

fn expect_bool(key: &str, value: &toml::Value) -> Result<bool, NexsysError> {
    value
        .as_bool()
        .ok_or_else(|| NexsysError::Config(format!("`{}` must be true or false", key)))
}

fn expect_str<'a>(key: &str, value: &'a toml::Value) -> Result<&'a str, NexsysError> {
    value
        .as_str()
        .ok_or_else(|| NexsysError::Config(format!("`{}` must be a string", key)))
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_allow_nonconvergence(mut self, allow: bool) -> Self {
        self.allow_nonconvergence = allow;
        self
    }

    pub fn with_default_guess(mut self, guess: f64) -> Self {
        self.default_guess = guess;
        self
    }

    pub fn with_damping_factor(mut self, damping_factor: f64) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    pub fn with_linear_sys_method(mut self, method: LinearSysMethod) -> Self {
        self.linear_sys_method = method;
        self
    }

    pub fn with_loglevel(mut self, loglevel: &str) -> Self {
        self.loglevel = loglevel.to_string();
        self
    }

    pub fn with_log_to_file(mut self, log_to_file: bool) -> Self {
        self.log_to_file = log_to_file;
        self
    }

    /// Rejects values the solver cannot work with.
    pub fn validate(&self) -> Result<(), NexsysError> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(NexsysError::Config(format!(
                "tolerance must be a positive number, found {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(NexsysError::Config("max_iterations must be positive".to_string()));
        }
        if !self.default_guess.is_finite() {
            return Err(NexsysError::Config("default_guess must be finite".to_string()));
        }
        if !(self.damping_factor > 0.0 && self.damping_factor <= 1.0) {
            return Err(NexsysError::Config(format!(
                "damping_factor must be in (0, 1], found {}",
                self.damping_factor
            )));
        }
        parse_loglevel(&self.loglevel)?;
        Ok(())
    }

    /// Defaults overridden by the keys of a TOML document. Unknown keys are errors.
    pub fn from_toml_str(text: &str) -> Result<Self, NexsysError> {
        let table = text.parse::<toml::Table>()?;
        let mut config = SolverConfig::default();
        for (key, value) in &table {
            match key.as_str() {
                "tolerance" => config.tolerance = expect_float(key, value)?,
                "max_iterations" => {
                    let n = value.as_integer().filter(|n| *n > 0).ok_or_else(|| {
                        NexsysError::Config("`max_iterations` must be a positive integer".to_string())
                    })?;
                    config.max_iterations = n as usize;
                }
                "allow_nonconvergence" => config.allow_nonconvergence = expect_bool(key, value)?,
                "default_guess" => config.default_guess = expect_float(key, value)?,
                "damping_factor" => config.damping_factor = expect_float(key, value)?,
                "linear_sys_method" => {
                    let method = expect_str(key, value)?;
                    config.linear_sys_method = LinearSysMethod::from_str(method).map_err(|_| {
                        NexsysError::Config(format!(
                            "linear_sys_method must be lu or inv, found `{}`",
                            method
                        ))
                    })?;
                }
                "loglevel" => config.loglevel = expect_str(key, value)?.to_string(),
                "log_to_file" => config.log_to_file = expect_bool(key, value)?,
                other => {
                    return Err(NexsysError::Config(format!("unknown key `{}`", other)));
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, NexsysError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tolerance, 1e-10);
        assert_eq!(config.max_iterations, 300);
        assert_eq!(config.linear_sys_method, LinearSysMethod::Lu);
    }

    #[test]
    fn test_builder_setters() {
        let config = SolverConfig::new()
            .with_tolerance(1e-6)
            .with_max_iterations(50)
            .with_allow_nonconvergence(true)
            .with_linear_sys_method(LinearSysMethod::Inv)
            .with_loglevel("off");
        assert!(config.validate().is_ok());
        assert!(config.allow_nonconvergence);
        assert!(SolverConfig::new().with_damping_factor(0.0).validate().is_err());
        assert!(SolverConfig::new().with_tolerance(-1.0).validate().is_err());
        assert!(SolverConfig::new().with_loglevel("chatty").validate().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = SolverConfig::from_toml_str(
            "tolerance = 1e-8\nmax_iterations = 20\nlinear_sys_method = \"inv\"\nloglevel = \"off\"\ndefault_guess = 2",
        )
        .unwrap();
        assert_eq!(config.tolerance, 1e-8);
        assert_eq!(config.max_iterations, 20);
        assert_eq!(config.linear_sys_method, LinearSysMethod::Inv);
        assert_eq!(config.default_guess, 2.0);
        assert!(!config.log_to_file);
    }

    #[test]
    fn test_from_toml_str_errors() {
        assert!(matches!(
            SolverConfig::from_toml_str("speed = 3"),
            Err(NexsysError::Config(_))
        ));
        assert!(SolverConfig::from_toml_str("tolerance = \"small\"").is_err());
        assert!(SolverConfig::from_toml_str("max_iterations = -3").is_err());
        assert!(SolverConfig::from_toml_str("linear_sys_method = \"qr\"").is_err());
        assert!(SolverConfig::from_toml_str("tolerance = ").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "allow_nonconvergence = true\ndamping_factor = 0.5").unwrap();
        let config = SolverConfig::from_file(file.path()).unwrap();
        assert!(config.allow_nonconvergence);
        assert_eq!(config.damping_factor, 0.5);
        assert!(matches!(
            SolverConfig::from_file("/definitely/not/here.toml"),
            Err(NexsysError::Io(_))
        ));
    }
}
