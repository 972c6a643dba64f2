//! Gas metering

use crate::error::{AnteError, AnteResult};
use mycel_primitives::Gas;

/// Monotonic gas counter with an optional ceiling
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasMeter {
    limit: Option<Gas>,
    consumed: Gas,
}

impl GasMeter {
    /// Meter that fails once `limit` is exceeded
    pub fn new(limit: Gas) -> Self {
        Self {
            limit: Some(limit),
            consumed: 0,
        }
    }

    /// Meter without a ceiling
    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: 0,
        }
    }

    /// Ceiling, if any
    pub fn limit(&self) -> Option<Gas> {
        self.limit
    }

    /// Gas consumed so far
    pub fn consumed(&self) -> Gas {
        self.consumed
    }

    /// Gas left before the ceiling
    pub fn remaining(&self) -> Option<Gas> {
        self.limit.map(|l| l.saturating_sub(self.consumed))
    }

    /// Replace the ceiling, keeping consumption
    pub fn set_limit(&mut self, limit: Gas) {
        self.limit = Some(limit);
    }

    /// Charge `amount`. Consumption is recorded even when the charge fails.
    pub fn consume(&mut self, amount: Gas, descriptor: &str) -> AnteResult<()> {
        let limit = self.limit.unwrap_or(Gas::MAX);
        let (used, overflow) = self.consumed.overflowing_add(amount);
        self.consumed = if overflow { Gas::MAX } else { used };
        if overflow || self.consumed > limit {
            return Err(AnteError::OutOfGas {
                descriptor: descriptor.to_string(),
                limit,
                used: self.consumed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_within_limit() {
        let mut meter = GasMeter::new(100);
        meter.consume(60, "a").unwrap();
        meter.consume(40, "b").unwrap();
        assert_eq!(meter.consumed(), 100);
        assert_eq!(meter.remaining(), Some(0));
    }

    #[test]
    fn test_exhaustion_records_consumption() {
        let mut meter = GasMeter::new(100);
        meter.consume(60, "a").unwrap();
        let err = meter.consume(50, "txSize").unwrap_err();
        assert_eq!(
            err,
            AnteError::OutOfGas {
                descriptor: "txSize".into(),
                limit: 100,
                used: 110
            }
        );
        assert_eq!(meter.consumed(), 110);
    }

    #[test]
    fn test_infinite_meter_overflow() {
        let mut meter = GasMeter::infinite();
        meter.consume(Gas::MAX, "a").unwrap();
        assert!(meter.consume(1, "b").is_err());
    }

    #[test]
    fn test_set_limit_keeps_consumption() {
        let mut meter = GasMeter::infinite();
        meter.consume(10, "a").unwrap();
        meter.set_limit(15);
        assert!(meter.consume(6, "b").is_err());
    }
}
