//! Integration tests driving `ProjectPackage` end to end.

mod common;

mod cache_tests;
mod concurrency_tests;
mod failure_tests;
