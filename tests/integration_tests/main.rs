// We move all tests into a single tests/integration_tests directory so that we have a single test
// binary. This keeps compile times down and lets tests share one-time setup.
mod media_tests;
mod refresh_tests;
mod resolver_tests;
mod store_tests;
mod utils;
