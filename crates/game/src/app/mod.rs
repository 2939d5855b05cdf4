pub(crate) mod bootstrap;
pub(crate) mod gameplay;
pub(crate) mod loop_runner;
pub(crate) mod snapshot;
