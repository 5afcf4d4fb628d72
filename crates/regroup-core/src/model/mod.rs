//! Wire rows and the shaped items the store keeps.

pub mod merged;
pub mod similar;
