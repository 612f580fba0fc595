pub mod retention;

pub use retention::{decide, oldest, plan, RetentionDecision};
