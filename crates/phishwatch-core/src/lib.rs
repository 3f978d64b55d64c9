pub mod allowlist;
pub mod data;
pub mod engine;
pub mod output;
pub mod resolver;
pub mod rules;
pub mod scoring;
pub mod signals;
pub mod treadmill;
pub mod url_info;
pub mod url_validate;
pub mod util;
pub mod verdict;
