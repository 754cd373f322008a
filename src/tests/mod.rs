
mod client_tests;
mod push_tests;
