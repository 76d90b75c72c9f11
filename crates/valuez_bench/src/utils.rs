//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use valuez_codec::Value;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a record value with a random text payload of `size` bytes.
pub fn random_record(size: usize) -> Value {
    let mut rng = rand::thread_rng();
    let body: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect();
    Value::record([
        ("n", Value::from(rng.gen::<i64>())),
        ("body", Value::from(body)),
    ])
}

/// Generate `count` records with the specified payload size.
pub fn generate_records(count: usize, size: usize) -> Vec<Value> {
    (0..count).map(|_| random_record(size)).collect()
}

/// Returns true for records whose `n` field is even.
pub fn is_even(value: &Value) -> bool {
    value
        .get("n")
        .and_then(Value::as_integer)
        .is_some_and(|n| n % 2 == 0)
}
