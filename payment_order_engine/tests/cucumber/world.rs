use std::collections::HashMap;

use cucumber::World;
use payment_order_engine::{db_types::OrderId, order_objects::StatusUpdateResult, OrderFlowError};

use crate::support::TestSystem;

#[derive(Default, Debug, World)]
pub struct OrderFlowWorld {
    pub system: Option<TestSystem>,
    /// Orders created in the scenario, by the alias the feature file gave them.
    pub orders: HashMap<String, OrderId>,
    pub last_result: Option<Result<StatusUpdateResult, OrderFlowError>>,
    pub last_error: Option<OrderFlowError>,
}

impl OrderFlowWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("The system has not been initialised")
    }

    pub fn order_id(&self, alias: &str) -> OrderId {
        self.orders.get(alias).cloned().unwrap_or_else(|| panic!("No order called {alias} in this scenario"))
    }
}
