// Scanning, allocation, order placement and position reconciliation
pub mod allocator;
pub mod executor;
pub mod fan_out;
pub mod monitor;
pub mod scanner;

pub use allocator::{allocate, AllocationPlan, AllocationRejection, Candidate, TradingConfig};
pub use executor::{ExecutionError, ExecutionReport, Executor, TradeStage};
pub use fan_out::{fan_out, FanOutResults};
pub use monitor::{should_stop_out, MonitorConfig, PositionMonitor, StatusRefreshReport, StopLossReport};
pub use scanner::{ScanReport, ScannedInstrument, Scanner, ScannerConfig, SkipReason};
