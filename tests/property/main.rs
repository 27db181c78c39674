// tests/property/main.rs

mod coalesce;
mod debounce;
