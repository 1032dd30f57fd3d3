//! Receiving side of the class load telemetry
//!
//! Listens for the UDP packets the emitter sends, counts loads per class and
//! persists the counts so classes that never load can be reported as dead.
//!
//! ## Workflow
//!
//! 1. Seed the inventory with every class in the code base (`reset`)
//! 2. Run the listener next to production traffic
//! 3. Classes still at zero are dead code candidates

mod inventory;
mod listener;
mod protocol;

pub use inventory::{Inventory, InventorySummary, SharedInventory};
pub use listener::{handle_datagram, CollectorListener};
pub use protocol::{parse_metric, parse_metrics, Metric};
