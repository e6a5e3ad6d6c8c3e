mod operation_id;
mod order_id;

pub use operation_id::{derive_operation_id, sweep_operation_id};
pub use order_id::generate_order_id;
