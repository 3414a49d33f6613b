use crate::data::value_as_identifier;
use serde_json::Value;

/// Picks an order number out of a user's order listing.
///
/// The last entry accepted by `matches` wins. When nothing matches, the last
/// entry of the listing is used. Entries without a usable `orderNumber` are
/// skipped in the first pass.
pub fn resolve_order_number<P>(orders: &[Value], matches: P) -> Option<String>
where
    P: Fn(&Value) -> bool,
{
    orders
        .iter()
        .rev()
        .filter(|order| matches(order))
        .find_map(order_number_of)
        .or_else(|| orders.last().and_then(order_number_of))
}

/// Matches listing entries by their `productName`.
pub fn product_name_is(product_name: &str) -> impl Fn(&Value) -> bool + '_ {
    move |order| order.get("productName").and_then(Value::as_str) == Some(product_name)
}

fn order_number_of(order: &Value) -> Option<String> {
    order.get("orderNumber").and_then(value_as_identifier)
}
