pub mod harness;

pub use harness::{FakeAthena, TestHarness};
