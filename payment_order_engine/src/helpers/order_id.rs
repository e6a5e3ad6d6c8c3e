use chrono::Utc;
use rand::Rng;

use crate::db_types::OrderId;

/// Generates an order id of the form `ORD` + UTC timestamp (to the second) + 6 random digits, e.g.
/// `ORD20240611143005042917`.
pub fn generate_order_id() -> OrderId {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    OrderId(format!("ORD{}{suffix:06}", Utc::now().format("%Y%m%d%H%M%S")))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generated_ids_have_the_expected_shape() {
        let id = generate_order_id();
        let s = id.as_str();
        assert!(s.starts_with("ORD"));
        assert_eq!(s.len(), 3 + 14 + 6);
        assert!(s[3..].chars().all(|c| c.is_ascii_digit()));
    }
}
