//! Test support: mock operations, counting suppliers, and identity
//! middleware for substituting pipeline stages in tests.

pub mod mocks;
