use crate::errors::NexsysError;

/// An `f64` with an optional closed domain the value is kept on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    value: f64,
    domain: Option<[f64; 2]>,
}

impl Variable {
    /// The starting value is clamped into `domain` right away.
    pub fn new(value: f64, domain: Option<[f64; 2]>) -> Variable {
        let mut var = Variable { value, domain };
        var.change(value);
        var
    }

    /// Checks the domain first: `lo < hi` is required.
    pub fn with_domain(name: &str, value: f64, domain: Option<[f64; 2]>) -> Result<Variable, NexsysError> {
        if let Some([lo, hi]) = domain {
            if !(lo < hi) {
                return Err(NexsysError::Domain { var: name.to_string(), lo, hi });
            }
        }
        Ok(Variable::new(value, domain))
    }

    pub fn clamp(&self, qty: f64) -> f64 {
        match self.domain {
            Some([lo, hi]) => qty.clamp(lo, hi),
            None => qty,
        }
    }

    /// Sets the value; out of domain values land on the nearest bound.
    pub fn change(&mut self, qty: f64) {
        self.value = self.clamp(qty);
    }

    /// Adds `qty` to the value, respecting the domain.
    pub fn step(&mut self, qty: f64) {
        self.value = self.clamp(self.value + qty);
    }

    pub fn as_f64(&self) -> f64 {
        self.value
    }

    pub fn get_domain(&self) -> Option<[f64; 2]> {
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_and_step_stay_on_domain() {
        let mut v = Variable::new(5.0, Some([-1.0, 1.0]));
        assert_eq!(v.as_f64(), 1.0);
        v.change(-3.0);
        assert_eq!(v.as_f64(), -1.0);
        v.step(0.5);
        assert_eq!(v.as_f64(), -0.5);
        v.step(10.0);
        assert_eq!(v.as_f64(), 1.0);
    }

    #[test]
    fn test_unbounded() {
        let mut v = Variable::new(2.0, None);
        v.step(-5.0);
        assert_eq!(v.as_f64(), -3.0);
        assert_eq!(v.get_domain(), None);
    }

    #[test]
    fn test_empty_domain_is_rejected() {
        assert!(Variable::with_domain("x", 0.0, Some([2.0, 1.0])).is_err());
        assert!(Variable::with_domain("x", 0.0, Some([f64::NAN, 1.0])).is_err());
        assert!(Variable::with_domain("x", 0.0, None).is_ok());
    }
}
