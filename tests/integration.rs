// Integration tests module

mod integration {
    mod alerts_test;
    mod config_store_test;
    mod engine_test;
    mod persist_test;
    mod session_test;
}
