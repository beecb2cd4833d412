// Library root: configuration, credentials, the fetch/score pipelines and
// the one-shot commands behind the `daystar` binary, exposed for integration tests.

pub mod commands;
pub mod config;
pub mod credentials;
pub mod pipeline;
