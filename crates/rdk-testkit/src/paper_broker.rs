use anyhow::Result;
use rdk_runtime::BrokerView;
use rdk_schemas::Position;

/// Broker double with a directly settable balance and position book.
#[derive(Clone, Debug, Default)]
pub struct StaticBroker {
    pub balance_micros: i64,
    pub positions: Vec<Position>,
    /// When set, the next fetch fails with this message (then clears).
    pub next_error: Option<String>,
}

impl StaticBroker {
    pub fn new(balance_micros: i64) -> Self {
        Self {
            balance_micros,
            positions: Vec::new(),
            next_error: None,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.positions.push(position);
        self
    }

    pub fn set_balance(&mut self, balance_micros: i64) {
        self.balance_micros = balance_micros;
    }
}

impl BrokerView for StaticBroker {
    fn account_balance_micros(&mut self) -> Result<i64> {
        if let Some(msg) = self.next_error.take() {
            anyhow::bail!("{msg}");
        }
        Ok(self.balance_micros)
    }

    fn positions(&mut self) -> Result<Vec<Position>> {
        Ok(self.positions.clone())
    }
}
