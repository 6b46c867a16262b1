use anyhow::Result;
use rdk_schemas::Position;
use rdk_signal::InstrumentSnapshot;

/// Read-only broker account view. Balance is realized account equity in
/// micros; open P&L is out of scope for drawdown purposes.
pub trait BrokerView {
    fn account_balance_micros(&mut self) -> Result<i64>;
    fn positions(&mut self) -> Result<Vec<Position>>;
}

/// Market data view: one fully-resolved snapshot per instrument. The engine
/// treats a fetch failure like an incomplete snapshot — that instrument is
/// skipped for the cycle, the rest proceed.
pub trait MarketView {
    fn instrument_snapshot(&mut self, instrument: &str) -> Result<InstrumentSnapshot>;
}
