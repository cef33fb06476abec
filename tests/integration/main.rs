//! Integration test entry point.

mod helpers;

mod gateway_test;
mod presence_test;
