use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating transport message ids
pub fn message_id_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}"
}

/// Strategy for generating task names
pub fn task_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,40}"
}

/// Strategy for generating scalar JSON values
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 @.]{0,20}".prop_map(Value::from),
    ]
}

/// Strategy for generating positional args
pub fn args_strategy() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(json_scalar_strategy(), 0..5)
}

/// Strategy for generating keyword args
pub fn kwargs_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z_]{1,10}", json_scalar_strategy(), 0..5)
        .prop_map(|entries| entries.into_iter().collect())
}
