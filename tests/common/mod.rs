pub use specflow_test_utils::init_tracing;
